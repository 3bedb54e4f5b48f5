//! Appointment lifecycle engine.
//!
//! The engine is the only writer of an appointment's status, doctor, clinical
//! notes, bill and payment status. Every mutating call takes the acting
//! identity explicitly, runs the guarded transition against the current record
//! and persists it with a compare-and-set on the record's revision.

use crate::billing::PatientBills;
use crate::config::{DeskConfig, LifecycleConfig, PaymentConfig};
use crate::error::{Entity, Error, LifecycleError, StoreError};
use crate::gateway::{CheckoutRequest, PaymentGateway, PaymentIntent};
use crate::log::{LIFECYCLE, PAYMENT};
use crate::models::{
    create_appointment, validate_amount, Action, Actor, Appointment, AppointmentStatus,
    PaymentStatus, Role,
};
use crate::store::{AppointmentStore, IdentityStore};
use crate::transition::{is_owner, Applied, Transition};
use chrono::Utc;
use rust_decimal::Decimal;
use std::fmt;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NoticeLevel::Success => "success",
            NoticeLevel::Info => "info",
            NoticeLevel::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// User-visible message produced by an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// Result of a successful mutating operation.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub appointment: Appointment,
    pub notice: Notice,
}

pub struct LifecycleEngine<S, G> {
    store: S,
    gateway: G,
    payment: PaymentConfig,
    conflict_retries: u32,
}

impl<S, G> LifecycleEngine<S, G>
where
    S: AppointmentStore + IdentityStore,
    G: PaymentGateway,
{
    /// Initialize the engine with default payment and retry settings.
    pub fn new(store: S, gateway: G) -> Self {
        LifecycleEngine {
            store,
            gateway,
            payment: PaymentConfig::default(),
            conflict_retries: LifecycleConfig::default_conflict_retries(),
        }
    }

    pub fn from_config(store: S, gateway: G, config: &DeskConfig) -> Self {
        LifecycleEngine {
            store,
            gateway,
            payment: config.payment.clone(),
            conflict_retries: config.lifecycle.conflict_retries,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn payment_config(&self) -> &PaymentConfig {
        &self.payment
    }

    /// Book a new appointment for the acting patient.
    pub fn create_appointment(
        &self,
        actor: &Actor,
        doctor_type: &str,
        date: &str,
        time: &str,
    ) -> Result<Outcome, Error> {
        if !actor.is(Role::Patient) {
            return Err(LifecycleError::not_authorized(actor, Action::Book).into());
        }
        match self.store.identity(actor.id)? {
            Some(identity) if identity.role == Role::Patient => {}
            _ => return Err(LifecycleError::not_found(Entity::Patient, actor.id).into()),
        }

        let appointment = create_appointment(actor.id, doctor_type, date, time)?;
        self.store.insert_appointment(&appointment)?;

        info!(
            target: LIFECYCLE,
            msg = "Appointment booked",
            appointment_id = %appointment.id,
            patient_id = %actor.id,
            doctor_type = %appointment.doctor_type
        );

        Ok(Outcome {
            appointment,
            notice: Notice::success("Appointment booked successfully"),
        })
    }

    /// Approve a pending appointment and assign it to a doctor.
    pub fn approve(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        doctor_id: Option<Uuid>,
    ) -> Result<Outcome, Error> {
        let Some(doctor_id) = doctor_id else {
            warn!(
                target: LIFECYCLE,
                msg = "Approval without a doctor",
                appointment_id = %appointment_id
            );
            return Err(LifecycleError::MissingDoctor.into());
        };

        self.load(appointment_id)?;

        let doctor = match self.store.identity(doctor_id)? {
            Some(identity) if identity.role == Role::Doctor => identity,
            _ => return Err(LifecycleError::not_found(Entity::Doctor, doctor_id).into()),
        };

        let (appointment, _) = self.transition(
            appointment_id,
            actor,
            &Transition::Approve { doctor: doctor.id },
        )?;

        info!(
            target: LIFECYCLE,
            msg = "Appointment approved",
            appointment_id = %appointment.id,
            doctor_id = %doctor.id
        );

        let patient = self.username(appointment.patient)?;
        Ok(Outcome {
            notice: Notice::success(format!(
                "Appointment for {} approved and assigned to Dr. {}.",
                patient, doctor.username
            )),
            appointment,
        })
    }

    /// Reject a pending or approved appointment.
    pub fn reject(&self, actor: &Actor, appointment_id: Uuid) -> Result<Outcome, Error> {
        let (appointment, _) = self.transition(appointment_id, actor, &Transition::Reject)?;

        info!(
            target: LIFECYCLE,
            msg = "Appointment rejected",
            appointment_id = %appointment.id,
            actor = %actor
        );

        let notice = match actor.role {
            Role::Doctor => Notice::info("Appointment rejected."),
            Role::Admin | Role::Patient => Notice::info("Appointment has been rejected."),
        };

        Ok(Outcome {
            appointment,
            notice,
        })
    }

    /// Record the consultation outcome and bill for an approved appointment.
    pub fn complete_consultation(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        diagnosis: &str,
        prescription: &str,
        bill_amount: Decimal,
    ) -> Result<Outcome, Error> {
        let transition = Transition::Complete {
            diagnosis: diagnosis.to_string(),
            prescription: prescription.to_string(),
            bill_amount,
        };
        let (appointment, _) = self.transition(appointment_id, actor, &transition)?;

        info!(
            target: LIFECYCLE,
            msg = "Consultation completed",
            appointment_id = %appointment.id,
            doctor_id = %actor.id,
            bill_amount = %appointment.bill_amount
        );

        let patient = self.username(appointment.patient)?;
        Ok(Outcome {
            notice: Notice::success(format!(
                "Consultation for {} completed successfully.",
                patient
            )),
            appointment,
        })
    }

    /// Set or adjust the bill on a completed, unpaid appointment.
    pub fn generate_bill(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        amount: Decimal,
    ) -> Result<Outcome, Error> {
        let (appointment, _) =
            self.transition(appointment_id, actor, &Transition::AdjustBill { amount })?;

        info!(
            target: LIFECYCLE,
            msg = "Bill generated",
            appointment_id = %appointment.id,
            bill_amount = %appointment.bill_amount
        );

        let patient = self.username(appointment.patient)?;
        Ok(Outcome {
            notice: Notice::success(format!("Bill generated for {}.", patient)),
            appointment,
        })
    }

    /// Start a checkout for the patient's unpaid bill.
    ///
    /// Nothing is written: the record only changes when the gateway confirms.
    pub fn initiate_payment(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
    ) -> Result<PaymentIntent, Error> {
        let appointment = self.load(appointment_id)?;

        match appointment.status {
            AppointmentStatus::Completed => {}
            AppointmentStatus::Pending | AppointmentStatus::Approved | AppointmentStatus::Rejected => {
                return Err(LifecycleError::invalid(appointment.status, Action::Pay).into())
            }
        }
        if !is_owner(&appointment, actor) {
            return Err(LifecycleError::not_authorized(actor, Action::Pay).into());
        }
        if appointment.payment_status == PaymentStatus::Paid {
            return Err(LifecycleError::invalid(appointment.status, Action::Pay).into());
        }
        if appointment.bill_amount <= Decimal::ZERO {
            return Err(LifecycleError::Validation(
                "There is nothing to pay for this appointment".to_string(),
            )
            .into());
        }
        validate_amount(appointment.bill_amount)?;

        let request = CheckoutRequest::for_appointment(&appointment, &self.payment)?;
        let intent = self.gateway.create_checkout(&request)?;

        info!(
            target: PAYMENT,
            msg = "Checkout started",
            appointment_id = %appointment.id,
            session_id = %intent.session_id,
            amount = %intent.amount,
            currency = %intent.currency
        );

        Ok(intent)
    }

    /// Gateway success callback. Safe to repeat.
    pub fn confirm_payment(&self, actor: &Actor, appointment_id: Uuid) -> Result<Outcome, Error> {
        let (appointment, applied) =
            self.transition(appointment_id, actor, &Transition::ConfirmPayment)?;

        let notice = match applied {
            Applied::Changed => {
                info!(
                    target: PAYMENT,
                    msg = "Payment confirmed",
                    appointment_id = %appointment.id,
                    amount = %appointment.bill_amount
                );
                let reference = appointment
                    .bill_number
                    .clone()
                    .unwrap_or_else(|| appointment.id.to_string());
                Notice::success(format!("Payment received for {}.", reference))
            }
            Applied::Unchanged => {
                debug!(
                    target: PAYMENT,
                    msg = "Repeated payment confirmation",
                    appointment_id = %appointment.id
                );
                Notice::info("This bill is already paid")
            }
        };

        Ok(Outcome {
            appointment,
            notice,
        })
    }

    pub fn appointment(&self, appointment_id: Uuid) -> Result<Appointment, Error> {
        self.load(appointment_id)
    }

    /// Every appointment the patient has booked, oldest first.
    pub fn patient_appointments(&self, patient: Uuid) -> Result<Vec<Appointment>, Error> {
        Ok(self
            .store
            .appointments()?
            .into_iter()
            .filter(|apt| apt.patient == patient)
            .collect())
    }

    /// Completed appointments for a patient, most recent appointment date first.
    pub fn medical_history(&self, patient: Uuid) -> Result<Vec<Appointment>, Error> {
        let mut history: Vec<Appointment> = self
            .patient_appointments(patient)?
            .into_iter()
            .filter(|apt| apt.status == AppointmentStatus::Completed)
            .collect();
        history.sort_by(|a, b| {
            (b.appointment_date, b.appointment_time).cmp(&(a.appointment_date, a.appointment_time))
        });
        Ok(history)
    }

    pub fn patient_bills(&self, patient: Uuid) -> Result<PatientBills, Error> {
        Ok(PatientBills::for_patient(
            &self.store.appointments()?,
            patient,
        )?)
    }

    /// Appointments awaiting an admin decision, newest request first.
    pub fn pending_requests(&self) -> Result<Vec<Appointment>, Error> {
        self.newest_first(|apt| apt.status == AppointmentStatus::Pending)
    }

    /// Every appointment that has left Pending, newest first.
    pub fn appointment_history(&self) -> Result<Vec<Appointment>, Error> {
        self.newest_first(|apt| apt.status != AppointmentStatus::Pending)
    }

    /// Approved appointments assigned to a doctor, in schedule order.
    pub fn doctor_queue(&self, doctor: Uuid) -> Result<Vec<Appointment>, Error> {
        let mut queue: Vec<Appointment> = self
            .store
            .appointments()?
            .into_iter()
            .filter(|apt| apt.status == AppointmentStatus::Approved && apt.doctor == Some(doctor))
            .collect();
        queue.sort_by_key(|apt| (apt.appointment_date, apt.appointment_time));
        Ok(queue)
    }

    fn newest_first<F>(&self, keep: F) -> Result<Vec<Appointment>, Error>
    where
        F: Fn(&Appointment) -> bool,
    {
        let mut appointments: Vec<Appointment> = self
            .store
            .appointments()?
            .into_iter()
            .filter(|apt| keep(apt))
            .collect();
        appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(appointments)
    }

    fn load(&self, appointment_id: Uuid) -> Result<Appointment, Error> {
        self.store
            .appointment(appointment_id)?
            .ok_or_else(|| LifecycleError::not_found(Entity::Appointment, appointment_id).into())
    }

    fn username(&self, id: Uuid) -> Result<String, Error> {
        Ok(self
            .store
            .identity(id)?
            .map_or_else(|| id.to_string(), |identity| identity.username))
    }

    /// Read, guard and compare-and-set. A lost race re-reads the record and
    /// re-runs the guards, so the loser sees the winner's state.
    fn transition(
        &self,
        appointment_id: Uuid,
        actor: &Actor,
        transition: &Transition,
    ) -> Result<(Appointment, Applied), Error> {
        let mut attempt = 0;

        loop {
            let current = self.load(appointment_id)?;
            let mut next = current.clone();

            let applied = transition
                .apply(&mut next, actor, Utc::now())
                .inspect_err(|err| {
                    debug!(
                        target: LIFECYCLE,
                        msg = "Transition refused",
                        appointment_id = %appointment_id,
                        action = %transition.action(),
                        status = %current.status,
                        error = %err
                    );
                })?;

            if applied == Applied::Unchanged {
                return Ok((current, applied));
            }

            match self.store.replace_appointment(current.revision, &next) {
                Ok(stored) => {
                    debug!(
                        target: LIFECYCLE,
                        msg = "Transition stored",
                        appointment_id = %appointment_id,
                        from = %current.status,
                        to = %stored.status,
                        revision = stored.revision
                    );
                    return Ok((stored, applied));
                }
                Err(StoreError::Conflict { .. }) if attempt < self.conflict_retries => {
                    attempt += 1;
                    warn!(
                        target: LIFECYCLE,
                        msg = "Concurrent update, retrying",
                        appointment_id = %appointment_id,
                        action = %transition.action(),
                        attempt
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
