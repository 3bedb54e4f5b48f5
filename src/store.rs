//! Persistence for identities, profiles and appointments.
//!
//! `MemoryStore` keeps every record in process; `FileStore` wraps it and
//! rewrites a JSON snapshot on every write. A `FileStore` write is staged,
//! persisted and only then published, one writer at a time.

use crate::error::StoreError;
use crate::log::STORE;
use crate::models::{Appointment, DoctorProfile, Identity, PatientProfile, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};
use uuid::Uuid;

/// User accounts and the profile records keyed to them.
pub trait IdentityStore {
    /// Fails with `DuplicateUsername` if the username is taken.
    fn insert_identity(&self, identity: &Identity) -> Result<(), StoreError>;

    fn identity(&self, id: Uuid) -> Result<Option<Identity>, StoreError>;

    fn identity_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError>;

    fn identities(&self, role: Role) -> Result<Vec<Identity>, StoreError>;

    /// Removes the identity and its profile. Removing a patient also removes
    /// the appointments they created.
    fn delete_identity(&self, id: Uuid) -> Result<bool, StoreError>;

    fn save_patient_profile(&self, profile: &PatientProfile) -> Result<(), StoreError>;

    fn patient_profile(&self, user_id: Uuid) -> Result<Option<PatientProfile>, StoreError>;

    fn patient_profiles(&self) -> Result<Vec<PatientProfile>, StoreError>;

    fn save_doctor_profile(&self, profile: &DoctorProfile) -> Result<(), StoreError>;

    fn doctor_profile(&self, user_id: Uuid) -> Result<Option<DoctorProfile>, StoreError>;

    fn doctor_profiles(&self) -> Result<Vec<DoctorProfile>, StoreError>;
}

/// Durable appointment records.
///
/// Writes after creation go through `replace_appointment`, which is a
/// compare-and-set on the record's revision.
pub trait AppointmentStore {
    fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError>;

    fn appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError>;

    /// All appointments, oldest first.
    fn appointments(&self) -> Result<Vec<Appointment>, StoreError>;

    /// Stores `appointment` only if the stored revision still equals
    /// `expected_revision`. Returns the stored record with its new revision.
    fn replace_appointment(
        &self,
        expected_revision: u64,
        appointment: &Appointment,
    ) -> Result<Appointment, StoreError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    identities: HashMap<Uuid, Identity>,
    #[serde(default)]
    patient_profiles: HashMap<Uuid, PatientProfile>,
    #[serde(default)]
    doctor_profiles: HashMap<Uuid, DoctorProfile>,
    #[serde(default)]
    appointments: HashMap<Uuid, Appointment>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        MemoryStore {
            tables: RwLock::new(snapshot),
        }
    }

    pub fn snapshot(&self) -> Result<Snapshot, StoreError> {
        Ok(self.read()?.clone())
    }

    pub fn into_snapshot(self) -> Result<Snapshot, StoreError> {
        self.tables.into_inner().map_err(|_| StoreError::Unavailable)
    }

    /// Replace every table with `snapshot`.
    pub fn restore(&self, snapshot: Snapshot) -> Result<(), StoreError> {
        *self.write()? = snapshot;
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Snapshot>, StoreError> {
        self.tables.read().map_err(|_| StoreError::Unavailable)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Snapshot>, StoreError> {
        self.tables.write().map_err(|_| StoreError::Unavailable)
    }
}

impl IdentityStore for MemoryStore {
    fn insert_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let taken = tables
            .identities
            .values()
            .any(|existing| existing.username.eq_ignore_ascii_case(&identity.username));
        if taken {
            return Err(StoreError::DuplicateUsername {
                username: identity.username.clone(),
            });
        }
        tables.identities.insert(identity.id, identity.clone());
        Ok(())
    }

    fn identity(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        Ok(self.read()?.identities.get(&id).cloned())
    }

    fn identity_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self
            .read()?
            .identities
            .values()
            .find(|identity| identity.username.eq_ignore_ascii_case(username.trim()))
            .cloned())
    }

    fn identities(&self, role: Role) -> Result<Vec<Identity>, StoreError> {
        let mut identities: Vec<Identity> = self
            .read()?
            .identities
            .values()
            .filter(|identity| identity.role == role)
            .cloned()
            .collect();
        identities.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(identities)
    }

    fn delete_identity(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        let Some(identity) = tables.identities.remove(&id) else {
            return Ok(false);
        };

        tables.patient_profiles.remove(&id);
        tables.doctor_profiles.remove(&id);

        if identity.role == Role::Patient {
            let before = tables.appointments.len();
            tables.appointments.retain(|_, apt| apt.patient != id);
            debug!(
                target: STORE,
                msg = "Removed patient appointments",
                patient_id = %id,
                count = before - tables.appointments.len()
            );
        }

        Ok(true)
    }

    fn save_patient_profile(&self, profile: &PatientProfile) -> Result<(), StoreError> {
        self.write()?
            .patient_profiles
            .insert(profile.user_id, profile.clone());
        Ok(())
    }

    fn patient_profile(&self, user_id: Uuid) -> Result<Option<PatientProfile>, StoreError> {
        Ok(self.read()?.patient_profiles.get(&user_id).cloned())
    }

    fn patient_profiles(&self) -> Result<Vec<PatientProfile>, StoreError> {
        let mut profiles: Vec<PatientProfile> =
            self.read()?.patient_profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(profiles)
    }

    fn save_doctor_profile(&self, profile: &DoctorProfile) -> Result<(), StoreError> {
        self.write()?
            .doctor_profiles
            .insert(profile.user_id, profile.clone());
        Ok(())
    }

    fn doctor_profile(&self, user_id: Uuid) -> Result<Option<DoctorProfile>, StoreError> {
        Ok(self.read()?.doctor_profiles.get(&user_id).cloned())
    }

    fn doctor_profiles(&self) -> Result<Vec<DoctorProfile>, StoreError> {
        let mut profiles: Vec<DoctorProfile> =
            self.read()?.doctor_profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(profiles)
    }
}

impl AppointmentStore for MemoryStore {
    fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        self.write()?
            .appointments
            .insert(appointment.id, appointment.clone());
        Ok(())
    }

    fn appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.read()?.appointments.get(&id).cloned())
    }

    fn appointments(&self) -> Result<Vec<Appointment>, StoreError> {
        let mut appointments: Vec<Appointment> =
            self.read()?.appointments.values().cloned().collect();
        appointments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(appointments)
    }

    fn replace_appointment(
        &self,
        expected_revision: u64,
        appointment: &Appointment,
    ) -> Result<Appointment, StoreError> {
        let mut tables = self.write()?;
        let stored = tables
            .appointments
            .get_mut(&appointment.id)
            .ok_or(StoreError::Missing { id: appointment.id })?;

        if stored.revision != expected_revision {
            return Err(StoreError::Conflict {
                id: appointment.id,
                expected: expected_revision,
            });
        }

        let mut updated = appointment.clone();
        updated.revision = expected_revision + 1;
        *stored = updated.clone();

        Ok(updated)
    }
}

/// A `MemoryStore` mirrored to a JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
    writer: Mutex<()>,
}

impl FileStore {
    /// Open the store at `path`, loading the snapshot if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let snapshot = if path.exists() {
            let bytes = fs::read(&path)?;
            let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
            info!(
                target: STORE,
                msg = "Loaded store",
                path = %path.display(),
                appointments = snapshot.appointments.len(),
                identities = snapshot.identities.len()
            );
            snapshot
        } else {
            info!(target: STORE, msg = "Creating new store", path = %path.display());
            Snapshot::default()
        };

        Ok(FileStore {
            path,
            inner: MemoryStore::from_snapshot(snapshot),
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the tables, write the copy to disk and
    /// then publish it. Readers never see a change that failed to persist.
    fn write<T, F>(&self, change: F) -> Result<T, StoreError>
    where
        F: FnOnce(&MemoryStore) -> Result<T, StoreError>,
    {
        let _writer = self.writer.lock().map_err(|_| StoreError::Unavailable)?;

        let staged = MemoryStore::from_snapshot(self.inner.snapshot()?);
        let result = change(&staged)?;
        let snapshot = staged.into_snapshot()?;

        self.persist(&snapshot)?;
        self.inner.restore(snapshot)?;

        Ok(result)
    }

    fn persist(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self
            .path
            .with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        let written = fs::write(&tmp, bytes).and_then(|_| fs::rename(&tmp, &self.path));
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }

        debug!(target: STORE, msg = "Flushed store", path = %self.path.display());
        Ok(())
    }
}

impl IdentityStore for FileStore {
    fn insert_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        self.write(|tables| tables.insert_identity(identity))
    }

    fn identity(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        self.inner.identity(id)
    }

    fn identity_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError> {
        self.inner.identity_by_username(username)
    }

    fn identities(&self, role: Role) -> Result<Vec<Identity>, StoreError> {
        self.inner.identities(role)
    }

    fn delete_identity(&self, id: Uuid) -> Result<bool, StoreError> {
        if self.inner.identity(id)?.is_none() {
            return Ok(false);
        }
        self.write(|tables| tables.delete_identity(id))
    }

    fn save_patient_profile(&self, profile: &PatientProfile) -> Result<(), StoreError> {
        self.write(|tables| tables.save_patient_profile(profile))
    }

    fn patient_profile(&self, user_id: Uuid) -> Result<Option<PatientProfile>, StoreError> {
        self.inner.patient_profile(user_id)
    }

    fn patient_profiles(&self) -> Result<Vec<PatientProfile>, StoreError> {
        self.inner.patient_profiles()
    }

    fn save_doctor_profile(&self, profile: &DoctorProfile) -> Result<(), StoreError> {
        self.write(|tables| tables.save_doctor_profile(profile))
    }

    fn doctor_profile(&self, user_id: Uuid) -> Result<Option<DoctorProfile>, StoreError> {
        self.inner.doctor_profile(user_id)
    }

    fn doctor_profiles(&self) -> Result<Vec<DoctorProfile>, StoreError> {
        self.inner.doctor_profiles()
    }
}

impl AppointmentStore for FileStore {
    fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        self.write(|tables| tables.insert_appointment(appointment))
    }

    fn appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        self.inner.appointment(id)
    }

    fn appointments(&self) -> Result<Vec<Appointment>, StoreError> {
        self.inner.appointments()
    }

    fn replace_appointment(
        &self,
        expected_revision: u64,
        appointment: &Appointment,
    ) -> Result<Appointment, StoreError> {
        self.write(|tables| tables.replace_appointment(expected_revision, appointment))
    }
}
