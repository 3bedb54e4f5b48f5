use super::{refuse, respond, Response};
use crate::error::Error;
use crate::gateway::PaymentGateway;
use crate::lifecycle::LifecycleEngine;
use crate::models::{parse_amount, Actor, Appointment, DoctorProfile};
use crate::store::{AppointmentStore, IdentityStore};
use uuid::Uuid;

/// Entry point for a signed-in doctor.
pub struct DoctorDesk<'a, S, G> {
    engine: &'a LifecycleEngine<S, G>,
    actor: Actor,
}

impl<'a, S, G> DoctorDesk<'a, S, G>
where
    S: AppointmentStore + IdentityStore,
    G: PaymentGateway,
{
    pub fn new(engine: &'a LifecycleEngine<S, G>, actor: Actor) -> Self {
        DoctorDesk { engine, actor }
    }

    /// Approved appointments waiting for this doctor.
    pub fn queue(&self) -> Result<Vec<Appointment>, Error> {
        self.engine.doctor_queue(self.actor.id)
    }

    pub fn profile(&self) -> Result<Option<DoctorProfile>, Error> {
        Ok(self.engine.store().doctor_profile(self.actor.id)?)
    }

    pub fn reject(&self, appointment_id: Uuid) -> Result<Response, Error> {
        respond(&self.actor, self.engine.reject(&self.actor, appointment_id))
    }

    /// Record diagnosis, prescription and the bill as typed at the desk.
    pub fn complete(
        &self,
        appointment_id: Uuid,
        diagnosis: &str,
        prescription: &str,
        bill_amount: &str,
    ) -> Result<Response, Error> {
        let bill_amount = match parse_amount(bill_amount) {
            Ok(amount) => amount,
            Err(err) => return refuse(&self.actor, err.into()),
        };

        respond(
            &self.actor,
            self.engine.complete_consultation(
                &self.actor,
                appointment_id,
                diagnosis,
                prescription,
                bill_amount,
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{Notice, NoticeLevel};
    use crate::models::AppointmentStatus;
    use crate::test_helpers::{approved, booked, engine, ward};
    use rust_decimal::Decimal;

    #[test]
    fn queue_lists_only_assigned_approved_appointments() {
        let engine = engine();
        let ward = ward(&engine);
        booked(&engine, &ward.patient);
        let mine = approved(&engine, &ward);
        let desk = DoctorDesk::new(&engine, ward.doctor);

        let queue = desk.queue().unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, mine.id);
        assert_eq!(desk.profile().unwrap().unwrap().full_name, "house");
    }

    #[test]
    fn completing_parses_the_bill() {
        let engine = engine();
        let ward = ward(&engine);
        let appointment = approved(&engine, &ward);
        let desk = DoctorDesk::new(&engine, ward.doctor);

        let response = desk
            .complete(appointment.id, "Migraine", "Sumatriptan", "abc")
            .unwrap();
        assert_eq!(response.notice.level, NoticeLevel::Error);
        assert_eq!(
            engine.appointment(appointment.id).unwrap().status,
            AppointmentStatus::Approved
        );

        let response = desk
            .complete(appointment.id, "Migraine", "Sumatriptan", "450.50")
            .unwrap();
        let record = response.appointment.unwrap();
        assert_eq!(record.bill_amount, Decimal::new(45050, 2));
        assert_eq!(record.diagnosis.as_deref(), Some("Migraine"));
        assert!(desk.queue().unwrap().is_empty());
    }

    #[test]
    fn doctors_cannot_turn_down_pending_requests() {
        let engine = engine();
        let ward = ward(&engine);
        let appointment = booked(&engine, &ward.patient);
        let desk = DoctorDesk::new(&engine, ward.doctor);

        let response = desk.reject(appointment.id).unwrap();
        assert_eq!(response.notice.level, NoticeLevel::Error);

        let appointment = approved(&engine, &ward);
        let response = desk.reject(appointment.id).unwrap();
        assert_eq!(response.notice, Notice::info("Appointment rejected."));
    }
}
