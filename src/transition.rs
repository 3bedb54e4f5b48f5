//! Guarded appointment state transitions.
//!
//! `Transition::apply` is pure: it checks the guards against a record and
//! mutates it only when every guard passes. Persistence is the engine's job.

use crate::error::LifecycleError;
use crate::models::{
    validate_amount, Action, Actor, Appointment, AppointmentStatus, PaymentStatus, Role,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Approve {
        doctor: Uuid,
    },
    Reject,
    Complete {
        diagnosis: String,
        prescription: String,
        bill_amount: Decimal,
    },
    AdjustBill {
        amount: Decimal,
    },
    ConfirmPayment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Changed,
    Unchanged,
}

impl Transition {
    pub fn action(&self) -> Action {
        match self {
            Transition::Approve { .. } => Action::Approve,
            Transition::Reject => Action::Reject,
            Transition::Complete { .. } => Action::Complete,
            Transition::AdjustBill { .. } => Action::Bill,
            Transition::ConfirmPayment => Action::ConfirmPayment,
        }
    }

    /// Apply the transition to `appointment` on behalf of `actor`.
    ///
    /// Guards run in order: status, then actor, then inputs. On error the
    /// appointment is left untouched.
    pub fn apply(
        &self,
        appointment: &mut Appointment,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Applied, LifecycleError> {
        use AppointmentStatus::*;

        let action = self.action();
        let status = appointment.status;
        let invalid = || LifecycleError::invalid(status, action);
        let denied = || LifecycleError::not_authorized(actor, action);

        match (self, status) {
            (Transition::Approve { doctor }, Pending) => {
                if !actor.is(Role::Admin) {
                    return Err(denied());
                }
                appointment.doctor = Some(*doctor);
                appointment.status = Approved;
                Ok(Applied::Changed)
            }
            (Transition::Approve { .. }, Approved | Rejected | Completed) => Err(invalid()),

            // A pending appointment has no doctor yet, so only an admin can turn it down.
            (Transition::Reject, Pending) => {
                if !actor.is(Role::Admin) {
                    return Err(denied());
                }
                appointment.status = Rejected;
                Ok(Applied::Changed)
            }
            (Transition::Reject, Approved) => {
                if !actor.is(Role::Admin) && !is_assigned_doctor(appointment, actor) {
                    return Err(denied());
                }
                appointment.status = Rejected;
                Ok(Applied::Changed)
            }
            (Transition::Reject, Rejected | Completed) => Err(invalid()),

            (
                Transition::Complete {
                    diagnosis,
                    prescription,
                    bill_amount,
                },
                Approved,
            ) => {
                if !is_assigned_doctor(appointment, actor) {
                    return Err(denied());
                }
                let bill_amount = validate_amount(*bill_amount)?;

                appointment.diagnosis = Some(diagnosis.trim().to_string());
                appointment.prescription = Some(prescription.trim().to_string());
                appointment.bill_amount = bill_amount;
                appointment.status = Completed;
                appointment.completed_at = Some(now);
                appointment.issue_bill_number(now);
                Ok(Applied::Changed)
            }
            (Transition::Complete { .. }, Pending | Rejected | Completed) => Err(invalid()),

            (Transition::AdjustBill { amount }, Completed) => {
                if appointment.is_paid() {
                    return Err(invalid());
                }
                if !actor.is(Role::Admin) {
                    return Err(denied());
                }
                appointment.bill_amount = validate_amount(*amount)?;
                appointment.issue_bill_number(now);
                Ok(Applied::Changed)
            }
            (Transition::AdjustBill { .. }, Pending | Approved | Rejected) => Err(invalid()),

            (Transition::ConfirmPayment, Completed) => {
                if !is_owner(appointment, actor) {
                    return Err(denied());
                }
                match appointment.payment_status {
                    PaymentStatus::Paid => Ok(Applied::Unchanged),
                    PaymentStatus::NotPaid => {
                        appointment.payment_status = PaymentStatus::Paid;
                        Ok(Applied::Changed)
                    }
                }
            }
            (Transition::ConfirmPayment, Pending | Approved | Rejected) => Err(invalid()),
        }
    }
}

pub fn is_assigned_doctor(appointment: &Appointment, actor: &Actor) -> bool {
    actor.is(Role::Doctor) && appointment.doctor == Some(actor.id)
}

pub fn is_owner(appointment: &Appointment, actor: &Actor) -> bool {
    actor.is(Role::Patient) && appointment.patient == actor.id
}
