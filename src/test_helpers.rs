//! Helpers shared by unit tests.

use crate::gateway::SandboxGateway;
use crate::lifecycle::LifecycleEngine;
use crate::models::{
    Actor, Appointment, DoctorProfile, Identity, PatientCategory, PatientDetails, PatientProfile,
    Role,
};
use crate::store::{IdentityStore, MemoryStore};
use rust_decimal::Decimal;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use tracing_subscriber::fmt::MakeWriter;
use uuid::Uuid;

/// Runs a function with all DESK_ environment variables unset
pub(crate) fn with_no_desk_vars<F: FnOnce() -> R, R>(f: F) -> R {
    let desk_vars = std::env::vars()
        .map(|(k, _v)| k)
        .filter(|k| k.starts_with("DESK_"))
        .collect::<Vec<_>>();

    temp_env::with_vars_unset(&desk_vars, f)
}

pub(crate) fn temp_store_path() -> PathBuf {
    std::env::temp_dir().join(format!("frontdesk-{}.json", Uuid::new_v4().simple()))
}

pub(crate) type TestEngine = LifecycleEngine<MemoryStore, SandboxGateway>;

pub(crate) fn engine() -> TestEngine {
    LifecycleEngine::new(MemoryStore::new(), SandboxGateway::default())
}

pub(crate) fn register(store: &impl IdentityStore, username: &str, role: Role) -> Actor {
    let identity = Identity::new(username, role).unwrap();
    store.insert_identity(&identity).unwrap();

    match role {
        Role::Patient => {
            let details = PatientDetails {
                full_name: username.to_string(),
                age: 34,
                gender: "Female".to_string(),
                place: "Kochi".to_string(),
                category: PatientCategory::General,
            };
            let profile = PatientProfile::new(identity.id, details).unwrap();
            store.save_patient_profile(&profile).unwrap();
        }
        Role::Doctor => {
            let profile = DoctorProfile::new(identity.id, username, "General Medicine").unwrap();
            store.save_doctor_profile(&profile).unwrap();
        }
        Role::Admin => {}
    }

    identity.actor()
}

/// The three roles an appointment passes between.
pub(crate) struct Ward {
    pub admin: Actor,
    pub doctor: Actor,
    pub patient: Actor,
}

pub(crate) fn ward(engine: &TestEngine) -> Ward {
    Ward {
        admin: register(engine.store(), "admin", Role::Admin),
        doctor: register(engine.store(), "house", Role::Doctor),
        patient: register(engine.store(), "asha", Role::Patient),
    }
}

pub(crate) fn booked(engine: &TestEngine, patient: &Actor) -> Appointment {
    engine
        .create_appointment(patient, "Cardiology", "2026-11-20", "10:00")
        .unwrap()
        .appointment
}

pub(crate) fn approved(engine: &TestEngine, ward: &Ward) -> Appointment {
    let appointment = booked(engine, &ward.patient);
    engine
        .approve(&ward.admin, appointment.id, Some(ward.doctor.id))
        .unwrap()
        .appointment
}

pub(crate) fn completed(engine: &TestEngine, ward: &Ward, amount: Decimal) -> Appointment {
    let appointment = approved(engine, ward);
    engine
        .complete_consultation(&ward.doctor, appointment.id, "Angina", "Nitroglycerin", amount)
        .unwrap()
        .appointment
}

// Collects formatted log lines so tests can assert on what a subscriber wrote.
pub(crate) struct MockWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MockWriter {
    pub(crate) fn new(buf: Arc<Mutex<Vec<u8>>>) -> Self {
        Self { buf }
    }

    pub(crate) fn map_error<Guard>(err: TryLockError<Guard>) -> io::Error {
        match err {
            TryLockError::WouldBlock => io::Error::from(io::ErrorKind::WouldBlock),
            TryLockError::Poisoned(_) => io::Error::from(io::ErrorKind::Other),
        }
    }

    pub(crate) fn buf(&self) -> io::Result<MutexGuard<'_, Vec<u8>>> {
        self.buf.try_lock().map_err(Self::map_error)
    }
}

impl Write for MockWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.buf()?.flush()
    }
}

#[derive(Clone, Default)]
pub(crate) struct MockMakeWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MockMakeWriter {
    pub(crate) fn get_string(&self) -> String {
        let mut buf = self.buf.lock().expect("lock shouldn't be poisoned");
        let string = std::str::from_utf8(&buf[..])
            .expect("formatter should not have produced invalid utf-8")
            .to_owned();
        buf.clear();
        string
    }
}

impl<'a> MakeWriter<'a> for MockMakeWriter {
    type Writer = MockWriter;

    fn make_writer(&'a self) -> Self::Writer {
        MockWriter::new(self.buf.clone())
    }
}
