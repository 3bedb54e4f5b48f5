//! Role-scoped entry points.
//!
//! Each desk is bound to one acting identity and forwards to the lifecycle
//! engine. Domain errors come back as an Error-level `Notice`; store, gateway
//! and config failures still propagate as `Err`.

mod admin;
mod doctor;
mod patient;
mod registration;

pub use admin::{AdminDesk, Statistics};
pub use doctor::DoctorDesk;
pub use patient::PatientDesk;
pub use registration::{register_admin, register_doctor, register_patient, Registration};

use crate::error::Error;
use crate::lifecycle::{Notice, Outcome};
use crate::log::DESK;
use crate::models::{Actor, Appointment};
use std::fmt;
use tracing::warn;

/// What an entry point hands back to the caller.
#[derive(Debug, Clone)]
pub struct Response {
    pub notice: Notice,
    pub appointment: Option<Appointment>,
    /// Where to send the user next, such as a checkout page.
    pub redirect: Option<String>,
}

impl Response {
    pub fn notice(notice: Notice) -> Self {
        Response {
            notice,
            appointment: None,
            redirect: None,
        }
    }

    pub fn redirect(notice: Notice, url: String) -> Self {
        Response {
            notice,
            appointment: None,
            redirect: Some(url),
        }
    }
}

impl From<Outcome> for Response {
    fn from(outcome: Outcome) -> Self {
        Response {
            notice: outcome.notice,
            appointment: Some(outcome.appointment),
            redirect: None,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.notice)?;
        if let Some(appointment) = &self.appointment {
            write!(f, "\n  {}", appointment)?;
        }
        if let Some(url) = &self.redirect {
            write!(f, "\n  -> {}", url)?;
        }
        Ok(())
    }
}

pub(crate) fn respond(actor: &Actor, result: Result<Outcome, Error>) -> Result<Response, Error> {
    result.map(Response::from).or_else(|err| refuse(actor, err))
}

/// Turn a domain error into an Error notice. Anything else is returned as is.
pub(crate) fn refuse(actor: &Actor, err: Error) -> Result<Response, Error> {
    if !err.is_domain() {
        return Err(err);
    }

    warn!(
        target: DESK,
        msg = "Request refused",
        actor = %actor,
        error = %err
    );

    Ok(Response::notice(Notice::error(err.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LifecycleError, StoreError};
    use crate::lifecycle::NoticeLevel;
    use crate::models::Role;
    use uuid::Uuid;

    #[test]
    fn domain_errors_become_notices() {
        let actor = Actor::new(Uuid::new_v4(), Role::Admin);
        let response = refuse(&actor, LifecycleError::MissingDoctor.into()).unwrap();

        assert_eq!(response.notice.level, NoticeLevel::Error);
        assert_eq!(
            response.notice.message,
            "Please select a doctor before approving."
        );
        assert!(response.appointment.is_none());
    }

    #[test]
    fn hard_failures_propagate() {
        let actor = Actor::new(Uuid::new_v4(), Role::Admin);
        let result = refuse(&actor, StoreError::Unavailable.into());

        assert!(matches!(result, Err(Error::Store(StoreError::Unavailable))));
    }
}
