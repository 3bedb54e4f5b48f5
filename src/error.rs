use crate::models::{Action, Actor, AppointmentStatus};
use rust_decimal::Decimal;
use std::{fmt, io};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Billing(#[from] BillingError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    /// Domain errors leave the record unchanged and are reported back to the
    /// user. Everything else fails the request.
    pub fn is_domain(&self) -> bool {
        matches!(self, Error::Lifecycle(_))
    }

    pub fn as_lifecycle(&self) -> Option<&LifecycleError> {
        match self {
            Error::Lifecycle(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Appointment,
    Doctor,
    Patient,
    Identity,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Entity::Appointment => "Appointment",
            Entity::Doctor => "Doctor",
            Entity::Patient => "Patient",
            Entity::Identity => "User",
        };
        write!(f, "{s}")
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: Uuid },

    #[error("Cannot {action} an appointment that is {status}")]
    InvalidTransition {
        status: AppointmentStatus,
        action: Action,
    },

    #[error("Please select a doctor before approving.")]
    MissingDoctor,

    #[error("{actor} is not allowed to {action} this appointment")]
    NotAuthorized { actor: Actor, action: Action },

    #[error("{0}")]
    Validation(String),
}

impl LifecycleError {
    pub fn not_found(entity: Entity, id: Uuid) -> Self {
        LifecycleError::NotFound { entity, id }
    }

    pub fn invalid(status: AppointmentStatus, action: Action) -> Self {
        LifecycleError::InvalidTransition { status, action }
    }

    pub fn not_authorized(actor: &Actor, action: Action) -> Self {
        LifecycleError::NotAuthorized {
            actor: *actor,
            action,
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Appointment {id} was modified concurrently (expected revision {expected})")]
    Conflict { id: Uuid, expected: u64 },

    #[error("Username {username} already exists")]
    DuplicateUsername { username: String },

    #[error("Appointment {id} does not exist in the store")]
    Missing { id: Uuid },

    #[error("Store is unavailable")]
    Unavailable,

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Checkout amount must be positive, received {unit_amount} minor units")]
    InvalidAmount { unit_amount: i64 },

    #[error("Checkout amount {amount} cannot be expressed in minor units")]
    AmountOutOfRange { amount: Decimal },

    #[error("Checkout currency {currency} is not supported")]
    UnsupportedCurrency { currency: String },

    #[error("Payment gateway unavailable: {reason}")]
    Unavailable { reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    #[error("Bill total overflowed while adding {amount}")]
    Overflow { amount: Decimal },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing field {name} from configuration file or environment")]
    MissingParameter { name: String },

    #[error("Invalid value {value} for {name}")]
    InvalidParameter { name: String, value: String },

    #[error("Success URL must contain the {{appointment_id}} placeholder: {url}")]
    InvalidSuccessUrl { url: String },

    #[error(transparent)]
    FileOrEnvironment(#[from] config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn only_lifecycle_errors_are_domain_errors() {
        let domain: Error = LifecycleError::MissingDoctor.into();
        assert!(domain.is_domain());
        assert_eq!(domain.as_lifecycle(), Some(&LifecycleError::MissingDoctor));

        let hard: Error = StoreError::Unavailable.into();
        assert!(!hard.is_domain());
        assert!(hard.as_lifecycle().is_none());

        let overflow: Error = BillingError::Overflow {
            amount: Decimal::MAX,
        }
        .into();
        assert!(!overflow.is_domain());
    }

    #[test]
    fn messages_name_the_offending_state() {
        let err = LifecycleError::invalid(AppointmentStatus::Rejected, Action::Approve);
        assert_eq!(
            err.to_string(),
            "Cannot approve an appointment that is Rejected"
        );

        let id = Uuid::new_v4();
        let actor = Actor::new(id, Role::Patient);
        let err = LifecycleError::not_authorized(&actor, Action::Complete);
        assert_eq!(
            err.to_string(),
            format!("patient {id} is not allowed to complete this appointment")
        );
    }
}
