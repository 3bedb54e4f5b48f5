use super::registration::identity_with_role;
use super::{refuse, respond, Response};
use crate::billing::PatientBills;
use crate::error::{Entity, Error, LifecycleError};
use crate::gateway::PaymentGateway;
use crate::lifecycle::{LifecycleEngine, Notice};
use crate::log::DESK;
use crate::models::{Actor, Appointment, PatientDetails, PatientProfile, Role};
use crate::store::{AppointmentStore, IdentityStore};
use tracing::info;
use uuid::Uuid;

/// Entry point for a signed-in patient.
pub struct PatientDesk<'a, S, G> {
    engine: &'a LifecycleEngine<S, G>,
    actor: Actor,
}

impl<'a, S, G> PatientDesk<'a, S, G>
where
    S: AppointmentStore + IdentityStore,
    G: PaymentGateway,
{
    pub fn new(engine: &'a LifecycleEngine<S, G>, actor: Actor) -> Self {
        PatientDesk { engine, actor }
    }

    pub fn book(&self, doctor_type: &str, date: &str, time: &str) -> Result<Response, Error> {
        respond(
            &self.actor,
            self.engine
                .create_appointment(&self.actor, doctor_type, date, time),
        )
    }

    /// Start checkout; the response carries the gateway redirect.
    pub fn pay(&self, appointment_id: Uuid) -> Result<Response, Error> {
        match self.engine.initiate_payment(&self.actor, appointment_id) {
            Ok(intent) => Ok(Response::redirect(
                Notice::info(format!(
                    "Redirecting to checkout for {} {}",
                    intent.amount,
                    intent.currency.to_uppercase()
                )),
                intent.redirect_url,
            )),
            Err(err) => refuse(&self.actor, err),
        }
    }

    /// Landing point for the gateway's success redirect.
    pub fn payment_success(&self, appointment_id: Uuid) -> Result<Response, Error> {
        respond(
            &self.actor,
            self.engine.confirm_payment(&self.actor, appointment_id),
        )
    }

    pub fn appointments(&self) -> Result<Vec<Appointment>, Error> {
        self.engine.patient_appointments(self.actor.id)
    }

    pub fn bills(&self) -> Result<PatientBills, Error> {
        self.engine.patient_bills(self.actor.id)
    }

    pub fn medical_history(&self) -> Result<Vec<Appointment>, Error> {
        self.engine.medical_history(self.actor.id)
    }

    pub fn profile(&self) -> Result<Option<PatientProfile>, Error> {
        Ok(self.engine.store().patient_profile(self.actor.id)?)
    }

    pub fn update_profile(&self, details: PatientDetails) -> Result<Response, Error> {
        if let Err(err) = identity_with_role(self.engine.store(), self.actor.id, Role::Patient) {
            return refuse(&self.actor, err);
        }
        if self.profile()?.is_none() {
            let err = LifecycleError::not_found(Entity::Patient, self.actor.id);
            return refuse(&self.actor, err.into());
        }

        let profile = match PatientProfile::new(self.actor.id, details) {
            Ok(profile) => profile,
            Err(err) => return refuse(&self.actor, err.into()),
        };
        self.engine.store().save_patient_profile(&profile)?;

        info!(
            target: DESK,
            msg = "Patient profile updated",
            patient_id = %self.actor.id
        );

        Ok(Response::notice(Notice::success("Profile updated successfully")))
    }
}
