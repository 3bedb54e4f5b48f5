use super::registration::identity_with_role;
use super::{refuse, respond, Response};
use crate::billing::{
    appointment_stats, patient_stats, AppointmentStats, BillingDashboard, PatientStats,
};
use crate::error::{Error, LifecycleError};
use crate::gateway::PaymentGateway;
use crate::lifecycle::{LifecycleEngine, Notice};
use crate::log::DESK;
use crate::models::{
    parse_amount, Actor, Appointment, AppointmentStatus, DoctorProfile, PatientProfile, Role,
};
use crate::store::{AppointmentStore, IdentityStore};
use tracing::info;
use uuid::Uuid;

/// Figures shown on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statistics {
    pub appointments: AppointmentStats,
    pub patients: PatientStats,
    pub doctors: usize,
}

/// Entry point for a signed-in administrator.
///
/// Lifecycle calls are guarded by the engine. Account management and
/// reporting are guarded here.
pub struct AdminDesk<'a, S, G> {
    engine: &'a LifecycleEngine<S, G>,
    actor: Actor,
}

impl<'a, S, G> AdminDesk<'a, S, G>
where
    S: AppointmentStore + IdentityStore,
    G: PaymentGateway,
{
    pub fn new(engine: &'a LifecycleEngine<S, G>, actor: Actor) -> Self {
        AdminDesk { engine, actor }
    }

    fn require_admin(&self) -> Result<(), Error> {
        if self.actor.is(Role::Admin) {
            Ok(())
        } else {
            Err(LifecycleError::Validation(format!(
                "{} is not an administrator",
                self.actor
            ))
            .into())
        }
    }

    pub fn pending_requests(&self) -> Result<Vec<Appointment>, Error> {
        self.require_admin()?;
        self.engine.pending_requests()
    }

    pub fn history(&self) -> Result<Vec<Appointment>, Error> {
        self.require_admin()?;
        self.engine.appointment_history()
    }

    pub fn approve(&self, appointment_id: Uuid, doctor_id: Option<Uuid>) -> Result<Response, Error> {
        respond(
            &self.actor,
            self.engine.approve(&self.actor, appointment_id, doctor_id),
        )
    }

    pub fn reject(&self, appointment_id: Uuid) -> Result<Response, Error> {
        respond(&self.actor, self.engine.reject(&self.actor, appointment_id))
    }

    pub fn generate_bill(&self, appointment_id: Uuid, amount: &str) -> Result<Response, Error> {
        let amount = match parse_amount(amount) {
            Ok(amount) => amount,
            Err(err) => return refuse(&self.actor, err.into()),
        };

        respond(
            &self.actor,
            self.engine
                .generate_bill(&self.actor, appointment_id, amount),
        )
    }

    pub fn billing_dashboard(&self) -> Result<BillingDashboard, Error> {
        self.require_admin()?;
        let appointments = self.engine.store().appointments()?;
        Ok(BillingDashboard::build(&appointments)?)
    }

    pub fn statistics(&self) -> Result<Statistics, Error> {
        self.require_admin()?;
        let store = self.engine.store();

        Ok(Statistics {
            appointments: appointment_stats(&store.appointments()?),
            patients: patient_stats(&store.patient_profiles()?),
            doctors: store.identities(Role::Doctor)?.len(),
        })
    }

    pub fn patients(&self) -> Result<Vec<PatientProfile>, Error> {
        self.require_admin()?;
        Ok(self.engine.store().patient_profiles()?)
    }

    pub fn doctors(&self) -> Result<Vec<DoctorProfile>, Error> {
        self.require_admin()?;
        Ok(self.engine.store().doctor_profiles()?)
    }

    /// Removes the patient together with every appointment they booked.
    pub fn delete_patient(&self, patient_id: Uuid) -> Result<Response, Error> {
        let identity = match self
            .require_admin()
            .and_then(|_| identity_with_role(self.engine.store(), patient_id, Role::Patient))
        {
            Ok(identity) => identity,
            Err(err) => return refuse(&self.actor, err),
        };

        self.engine.store().delete_identity(identity.id)?;

        info!(
            target: DESK,
            msg = "Patient deleted",
            patient_id = %identity.id,
            admin_id = %self.actor.id
        );

        Ok(Response::notice(Notice::success(format!(
            "Patient {} deleted successfully.",
            identity.username
        ))))
    }

    /// Removes a doctor account. Refused while the doctor still has approved
    /// appointments, since an approved appointment always has a doctor.
    pub fn delete_doctor(&self, doctor_id: Uuid) -> Result<Response, Error> {
        let identity = match self
            .require_admin()
            .and_then(|_| identity_with_role(self.engine.store(), doctor_id, Role::Doctor))
        {
            Ok(identity) => identity,
            Err(err) => return refuse(&self.actor, err),
        };

        let open = self
            .engine
            .store()
            .appointments()?
            .into_iter()
            .filter(|apt| {
                apt.doctor == Some(identity.id) && apt.status == AppointmentStatus::Approved
            })
            .count();
        if open > 0 {
            let err = LifecycleError::Validation(format!(
                "Dr. {} still has {} approved appointment(s)",
                identity.username, open
            ));
            return refuse(&self.actor, err.into());
        }

        self.engine.store().delete_identity(identity.id)?;

        info!(
            target: DESK,
            msg = "Doctor deleted",
            doctor_id = %identity.id,
            admin_id = %self.actor.id
        );

        Ok(Response::notice(Notice::success(format!(
            "Doctor {} deleted successfully.",
            identity.username
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::NoticeLevel;
    use crate::models::PaymentStatus;
    use crate::test_helpers::{approved, booked, completed, engine, register, ward};
    use rust_decimal::Decimal;

    #[test]
    fn approving_without_a_doctor_is_reported() {
        let engine = engine();
        let ward = ward(&engine);
        let appointment = booked(&engine, &ward.patient);
        let desk = AdminDesk::new(&engine, ward.admin);

        let response = desk.approve(appointment.id, None).unwrap();
        assert_eq!(
            response.notice,
            Notice::error("Please select a doctor before approving.")
        );
        assert_eq!(desk.pending_requests().unwrap().len(), 1);

        let response = desk.approve(appointment.id, Some(ward.doctor.id)).unwrap();
        assert_eq!(response.notice.level, NoticeLevel::Success);
        assert!(desk.pending_requests().unwrap().is_empty());
        assert_eq!(desk.history().unwrap().len(), 1);
    }

    #[test]
    fn rejecting_from_the_admin_desk() {
        let engine = engine();
        let ward = ward(&engine);
        let appointment = booked(&engine, &ward.patient);
        let desk = AdminDesk::new(&engine, ward.admin);

        let response = desk.reject(appointment.id).unwrap();
        assert_eq!(response.notice, Notice::info("Appointment has been rejected."));

        let response = desk.reject(appointment.id).unwrap();
        assert_eq!(response.notice.level, NoticeLevel::Error);
    }

    #[test]
    fn billing_dashboard_counts_paid_revenue() {
        let engine = engine();
        let ward = ward(&engine);
        let paid = completed(&engine, &ward, Decimal::new(30000, 2));
        let unpaid = completed(&engine, &ward, Decimal::new(15000, 2));
        engine.confirm_payment(&ward.patient, paid.id).unwrap();
        let desk = AdminDesk::new(&engine, ward.admin);

        let response = desk.generate_bill(unpaid.id, "175.25").unwrap();
        assert_eq!(
            response.appointment.unwrap().bill_amount,
            Decimal::new(17525, 2)
        );

        let response = desk.generate_bill(paid.id, "1.00").unwrap();
        assert_eq!(response.notice.level, NoticeLevel::Error);

        let dashboard = desk.billing_dashboard().unwrap();
        assert_eq!(dashboard.appointments.len(), 2);
        assert_eq!(dashboard.total_revenue, Decimal::new(30000, 2));
        assert_eq!(dashboard.monthly.len(), 1);
        assert_eq!(
            engine.appointment(paid.id).unwrap().payment_status,
            PaymentStatus::Paid
        );
    }

    #[test]
    fn statistics_cover_appointments_and_people() {
        let engine = engine();
        let ward = ward(&engine);
        booked(&engine, &ward.patient);
        approved(&engine, &ward);
        register(engine.store(), "wilson", Role::Doctor);
        let desk = AdminDesk::new(&engine, ward.admin);

        let stats = desk.statistics().unwrap();
        assert_eq!(stats.appointments.total, 2);
        assert_eq!(stats.appointments.pending, 1);
        assert_eq!(stats.appointments.approved, 1);
        assert_eq!(stats.patients.total, 1);
        assert_eq!(stats.doctors, 2);
        assert_eq!(desk.doctors().unwrap().len(), 2);
        assert_eq!(desk.patients().unwrap().len(), 1);
    }

    #[test]
    fn only_admins_see_reports() {
        let engine = engine();
        let ward = ward(&engine);
        let desk = AdminDesk::new(&engine, ward.doctor);

        assert!(desk.statistics().unwrap_err().is_domain());
        let response = desk.delete_patient(ward.patient.id).unwrap();
        assert_eq!(response.notice.level, NoticeLevel::Error);
        assert!(engine.store().identity(ward.patient.id).unwrap().is_some());
    }

    #[test]
    fn deleting_a_patient_removes_their_appointments() {
        let engine = engine();
        let ward = ward(&engine);
        booked(&engine, &ward.patient);
        completed(&engine, &ward, Decimal::new(500, 2));
        let desk = AdminDesk::new(&engine, ward.admin);

        let response = desk.delete_patient(ward.patient.id).unwrap();
        assert_eq!(
            response.notice,
            Notice::success("Patient asha deleted successfully.")
        );
        assert!(engine.store().appointments().unwrap().is_empty());
        assert!(desk.patients().unwrap().is_empty());
    }

    #[test]
    fn doctors_with_open_appointments_are_kept() {
        let engine = engine();
        let ward = ward(&engine);
        let appointment = approved(&engine, &ward);
        let desk = AdminDesk::new(&engine, ward.admin);

        let response = desk.delete_doctor(ward.doctor.id).unwrap();
        assert_eq!(response.notice.level, NoticeLevel::Error);

        engine
            .complete_consultation(&ward.doctor, appointment.id, "Cold", "Rest", Decimal::ONE)
            .unwrap();
        let response = desk.delete_doctor(ward.doctor.id).unwrap();
        assert_eq!(
            response.notice,
            Notice::success("Doctor house deleted successfully.")
        );
        assert!(desk.doctors().unwrap().is_empty());
        assert_eq!(
            engine.appointment(appointment.id).unwrap().doctor,
            Some(ward.doctor.id)
        );
    }
}
