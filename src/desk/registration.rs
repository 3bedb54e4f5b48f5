use crate::error::{Entity, Error, LifecycleError, StoreError};
use crate::lifecycle::Notice;
use crate::log::DESK;
use crate::models::{DoctorProfile, Identity, PatientDetails, PatientProfile, Role};
use crate::store::IdentityStore;
use tracing::{info, warn};
use uuid::Uuid;

/// Result of a sign-up. `identity` is set only when the account was created.
#[derive(Debug, Clone)]
pub struct Registration {
    pub notice: Notice,
    pub identity: Option<Identity>,
}

impl Registration {
    fn refused(message: impl Into<String>) -> Self {
        Registration {
            notice: Notice::error(message),
            identity: None,
        }
    }
}

pub fn register_patient<S: IdentityStore>(
    store: &S,
    username: &str,
    details: PatientDetails,
) -> Result<Registration, Error> {
    let prepared = Identity::new(username, Role::Patient).and_then(|identity| {
        PatientProfile::new(identity.id, details).map(|profile| (identity, profile))
    });
    let (identity, profile) = match prepared {
        Ok(prepared) => prepared,
        Err(err) => return Ok(Registration::refused(err.to_string())),
    };

    enroll(
        store,
        identity,
        |store| store.save_patient_profile(&profile),
        "Registration successful. Please login.",
    )
}

pub fn register_doctor<S: IdentityStore>(
    store: &S,
    username: &str,
    full_name: &str,
    specialization: &str,
) -> Result<Registration, Error> {
    let prepared = Identity::new(username, Role::Doctor).and_then(|identity| {
        DoctorProfile::new(identity.id, full_name, specialization)
            .map(|profile| (identity, profile))
    });
    let (identity, profile) = match prepared {
        Ok(prepared) => prepared,
        Err(err) => return Ok(Registration::refused(err.to_string())),
    };

    enroll(
        store,
        identity,
        |store| store.save_doctor_profile(&profile),
        "Doctor registered successfully. Please login.",
    )
}

pub fn register_admin<S: IdentityStore>(store: &S, username: &str) -> Result<Registration, Error> {
    let identity = match Identity::new(username, Role::Admin) {
        Ok(identity) => identity,
        Err(err) => return Ok(Registration::refused(err.to_string())),
    };

    enroll(store, identity, |_| Ok(()), "Administrator registered successfully.")
}

fn enroll<S, F>(
    store: &S,
    identity: Identity,
    save_profile: F,
    welcome: &str,
) -> Result<Registration, Error>
where
    S: IdentityStore,
    F: FnOnce(&S) -> Result<(), StoreError>,
{
    match store.insert_identity(&identity) {
        Ok(()) => {}
        Err(StoreError::DuplicateUsername { username }) => {
            warn!(
                target: DESK,
                msg = "Username already taken",
                username = %username
            );
            return Ok(Registration::refused("Username already exists"));
        }
        Err(err) => return Err(err.into()),
    }

    save_profile(store)?;

    info!(
        target: DESK,
        msg = "Registered identity",
        user_id = %identity.id,
        role = %identity.role
    );

    Ok(Registration {
        notice: Notice::success(welcome),
        identity: Some(identity),
    })
}

/// Resolve an identity that must hold `role`.
pub(crate) fn identity_with_role<S: IdentityStore>(
    store: &S,
    id: Uuid,
    role: Role,
) -> Result<Identity, Error> {
    let entity = match role {
        Role::Patient => Entity::Patient,
        Role::Doctor => Entity::Doctor,
        Role::Admin => Entity::Identity,
    };

    match store.identity(id)? {
        Some(identity) if identity.role == role => Ok(identity),
        _ => Err(LifecycleError::not_found(entity, id).into()),
    }
}
