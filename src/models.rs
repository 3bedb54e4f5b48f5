//! Data models for the front-desk system.
//!
//! This module defines the core data structures used throughout the system:
//! - Role / Identity / Actor: who is acting on a record
//! - PatientProfile / DoctorProfile: attribute records keyed to an identity
//! - AppointmentStatus / PaymentStatus: the closed status vocabularies
//! - Appointment: the record owned by the lifecycle engine

use crate::error::LifecycleError;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum number of decimal places a bill may carry.
pub const BILL_SCALE: u32 = 2;

/// Largest bill accepted, in major units. Keeps every bill representable in
/// minor units as an `i64`.
pub const MAX_BILL: i64 = 10_000_000_000;

/// Role tag carried by every identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl Role {
    /// Convert a string to a Role enum value.
    pub fn from_string(value: &str) -> Result<Self, LifecycleError> {
        match value.to_lowercase().trim() {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "admin" => Ok(Role::Admin),
            _ => Err(LifecycleError::Validation(format!(
                "Invalid role: '{}'. Must be one of: patient, doctor, admin",
                value
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// A user account as held by the identity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

impl Identity {
    /// Create a new identity with validation.
    pub fn new(username: &str, role: Role) -> Result<Self, LifecycleError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(LifecycleError::Validation(
                "Username cannot be empty".to_string(),
            ));
        }

        Ok(Identity {
            id: Uuid::new_v4(),
            username: username.to_string(),
            role,
        })
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.role)
    }
}

/// The identity performing an operation, passed explicitly into every
/// lifecycle call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Actor { id, role }
    }

    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.role, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PatientCategory {
    General,
    Senior,
    Child,
}

impl PatientCategory {
    pub fn from_string(value: &str) -> Result<Self, LifecycleError> {
        match value.to_lowercase().trim() {
            "general" => Ok(PatientCategory::General),
            "senior" => Ok(PatientCategory::Senior),
            "child" => Ok(PatientCategory::Child),
            _ => Err(LifecycleError::Validation(format!(
                "Invalid category: '{}'. Must be one of: general, senior, child",
                value
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PatientCategory::General => "General",
            PatientCategory::Senior => "Senior",
            PatientCategory::Child => "Child",
        }
    }
}

/// Attributes a patient supplies at registration and on profile update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientDetails {
    pub full_name: String,
    pub age: u32,
    pub gender: String,
    pub place: String,
    pub category: PatientCategory,
}

/// Represents a registered patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub user_id: Uuid,
    pub full_name: String,
    pub age: u32,
    pub gender: String,
    pub place: String,
    pub category: PatientCategory,
}

impl PatientProfile {
    /// Create a new patient profile with validation.
    pub fn new(user_id: Uuid, details: PatientDetails) -> Result<Self, LifecycleError> {
        if details.full_name.trim().is_empty() {
            return Err(LifecycleError::Validation(
                "Patient name cannot be empty".to_string(),
            ));
        }
        if details.gender.trim().is_empty() {
            return Err(LifecycleError::Validation(
                "Patient gender cannot be empty".to_string(),
            ));
        }

        Ok(PatientProfile {
            user_id,
            full_name: details.full_name.trim().to_string(),
            age: details.age,
            gender: details.gender.trim().to_string(),
            place: details.place.trim().to_string(),
            category: details.category,
        })
    }
}

/// Represents a registered doctor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub user_id: Uuid,
    pub full_name: String,
    pub specialization: String,
}

impl DoctorProfile {
    /// Create a new doctor profile with validation.
    pub fn new(
        user_id: Uuid,
        full_name: &str,
        specialization: &str,
    ) -> Result<Self, LifecycleError> {
        if full_name.trim().is_empty() {
            return Err(LifecycleError::Validation(
                "Doctor name cannot be empty".to_string(),
            ));
        }
        if specialization.trim().is_empty() {
            return Err(LifecycleError::Validation(
                "Specialization cannot be empty".to_string(),
            ));
        }

        Ok(DoctorProfile {
            user_id,
            full_name: full_name.trim().to_string(),
            specialization: specialization.trim().to_string(),
        })
    }
}

impl fmt::Display for DoctorProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dr. {} ({})", self.full_name, self.specialization)
    }
}

/// Lifecycle status of an appointment.
///
/// The variant names are external contract values: they are persisted and
/// displayed verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Approved,
        AppointmentStatus::Rejected,
        AppointmentStatus::Completed,
    ];

    pub fn from_string(value: &str) -> Result<Self, LifecycleError> {
        match value.to_lowercase().trim() {
            "pending" => Ok(AppointmentStatus::Pending),
            "approved" => Ok(AppointmentStatus::Approved),
            "rejected" => Ok(AppointmentStatus::Rejected),
            "completed" => Ok(AppointmentStatus::Completed),
            _ => Err(LifecycleError::Validation(format!(
                "Invalid status: '{}'. Must be one of: Pending, Approved, Rejected, Completed",
                value
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Approved => "Approved",
            AppointmentStatus::Rejected => "Rejected",
            AppointmentStatus::Completed => "Completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Rejected | AppointmentStatus::Completed
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Whether a bill has been settled.
///
/// The variants are `NotPaid` and `Paid`, but `NotPaid` is written to disk as
/// `"Not Paid"` so existing hospital records keep reading back. `"NotPaid"` is
/// also accepted on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[serde(rename = "Not Paid", alias = "NotPaid")]
    NotPaid,
    Paid,
}

impl PaymentStatus {
    pub fn name(&self) -> &'static str {
        match self {
            PaymentStatus::NotPaid => "Not Paid",
            PaymentStatus::Paid => "Paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Operations that act on an appointment; used in error reporting and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Book,
    Approve,
    Reject,
    Complete,
    Bill,
    Pay,
    ConfirmPayment,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Book => "book",
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::Complete => "complete",
            Action::Bill => "bill",
            Action::Pay => "pay for",
            Action::ConfirmPayment => "confirm payment for",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Represents a patient's appointment from booking through payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient: Uuid,
    pub doctor: Option<Uuid>,
    pub doctor_type: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub status: AppointmentStatus,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub bill_amount: Decimal,
    pub bill_number: Option<String>,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub revision: u64,
}

impl Appointment {
    /// Create a new pending appointment with validation.
    pub fn new(
        patient: Uuid,
        doctor_type: &str,
        appointment_date: NaiveDate,
        appointment_time: NaiveTime,
    ) -> Result<Self, LifecycleError> {
        let doctor_type = doctor_type.trim();
        if doctor_type.is_empty() {
            return Err(LifecycleError::Validation(
                "Department cannot be empty".to_string(),
            ));
        }

        Ok(Appointment {
            id: Uuid::new_v4(),
            patient,
            doctor: None,
            doctor_type: doctor_type.to_string(),
            appointment_date,
            appointment_time,
            status: AppointmentStatus::Pending,
            diagnosis: None,
            prescription: None,
            bill_amount: Decimal::ZERO,
            bill_number: None,
            payment_status: PaymentStatus::NotPaid,
            created_at: Utc::now(),
            completed_at: None,
            revision: 0,
        })
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// A completed appointment whose bill has not been settled.
    pub fn is_outstanding(&self) -> bool {
        self.status == AppointmentStatus::Completed && !self.is_paid()
    }

    /// Assign a bill number the first time a bill is issued.
    pub fn issue_bill_number(&mut self, issued_at: DateTime<Utc>) {
        if self.bill_number.is_none() {
            let short_id = self.id.simple().to_string()[..8].to_uppercase();
            self.bill_number = Some(format!(
                "BILL-{}-{}",
                issued_at.format("%Y%m%d"),
                short_id
            ));
        }
    }

    /// The month this appointment's revenue is booked against.
    pub fn revenue_date(&self) -> DateTime<Utc> {
        self.completed_at.unwrap_or(self.created_at)
    }
}

impl fmt::Display for Appointment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} ({})",
            self.id,
            self.doctor_type,
            self.appointment_date.format("%Y-%m-%d"),
            self.appointment_time.format("%H:%M"),
            self.status
        )
    }
}

/// Parse an appointment date in `YYYY-MM-DD` form.
pub fn parse_date(value: &str) -> Result<NaiveDate, LifecycleError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        LifecycleError::Validation(format!(
            "Invalid date: '{}'. Expected YYYY-MM-DD",
            value
        ))
    })
}

/// Parse an appointment time in `HH:MM` or `HH:MM:SS` form.
pub fn parse_time(value: &str) -> Result<NaiveTime, LifecycleError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| {
            LifecycleError::Validation(format!("Invalid time: '{}'. Expected HH:MM", value))
        })
}

/// Parse a bill amount entered as text.
pub fn parse_amount(value: &str) -> Result<Decimal, LifecycleError> {
    let amount = value
        .trim()
        .parse::<Decimal>()
        .map_err(|_| LifecycleError::Validation(format!("Invalid amount: '{}'", value)))?;
    validate_amount(amount)
}

/// Bills are non-negative, at most `MAX_BILL`, with at most two decimal places.
pub fn validate_amount(amount: Decimal) -> Result<Decimal, LifecycleError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(LifecycleError::Validation(format!(
            "Bill amount cannot be negative: {}",
            amount
        )));
    }
    if amount > Decimal::from(MAX_BILL) {
        return Err(LifecycleError::Validation(format!(
            "Bill amount cannot exceed {}: {}",
            MAX_BILL, amount
        )));
    }
    if amount.normalize().scale() > BILL_SCALE {
        return Err(LifecycleError::Validation(format!(
            "Bill amount has more than {} decimal places: {}",
            BILL_SCALE, amount
        )));
    }
    Ok(amount)
}

/// Factory function to create an appointment from raw request fields.
pub fn create_appointment(
    patient: Uuid,
    doctor_type: &str,
    date: &str,
    time: &str,
) -> Result<Appointment, LifecycleError> {
    let appointment_date = parse_date(date)?;
    let appointment_time = parse_time(time)?;

    Appointment::new(patient, doctor_type, appointment_date, appointment_time)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_appointment_starts_pending_and_unpaid() {
        let patient = Uuid::new_v4();
        let appointment = create_appointment(patient, "Cardiology", "2026-11-02", "10:30").unwrap();

        assert_eq!(appointment.status, AppointmentStatus::Pending);
        assert_eq!(appointment.payment_status, PaymentStatus::NotPaid);
        assert_eq!(appointment.bill_amount, Decimal::ZERO);
        assert_eq!(appointment.doctor, None);
        assert_eq!(appointment.patient, patient);
        assert_eq!(appointment.appointment_time, NaiveTime::from_hms_opt(10, 30, 0).unwrap());
    }

    #[test]
    fn malformed_request_fields_are_validation_errors() {
        let patient = Uuid::new_v4();

        for (department, date, time) in [
            ("Cardiology", "02/11/2026", "10:30"),
            ("Cardiology", "2026-02-30", "10:30"),
            ("Cardiology", "2026-11-02", "25:00"),
            ("  ", "2026-11-02", "10:30"),
        ] {
            let result = create_appointment(patient, department, date, time);
            assert!(
                matches!(result, Err(LifecycleError::Validation(_))),
                "{department} {date} {time}"
            );
        }
    }

    #[test]
    fn amounts_must_be_non_negative_cents() {
        assert_eq!(parse_amount("150.00").unwrap(), Decimal::new(15000, 2));
        assert_eq!(parse_amount("0").unwrap(), Decimal::ZERO);
        assert!(parse_amount("-1").is_err());
        assert!(parse_amount("10.005").is_err());
        assert!(parse_amount("ten").is_err());
    }

    #[test]
    fn oversized_bills_are_refused() {
        assert_eq!(
            parse_amount("10000000000.00").unwrap(),
            Decimal::from(MAX_BILL)
        );
        assert!(parse_amount("10000000000.01").is_err());
        assert!(matches!(
            parse_amount("79228162514264337593543950335"),
            Err(LifecycleError::Validation(_))
        ));
    }

    #[test]
    fn status_vocabulary_is_preserved_on_the_wire() {
        let json = serde_json::to_string(&AppointmentStatus::Completed).unwrap();
        assert_eq!(json, "\"Completed\"");

        let json = serde_json::to_string(&PaymentStatus::NotPaid).unwrap();
        assert_eq!(json, "\"Not Paid\"");

        let parsed: PaymentStatus = serde_json::from_str("\"NotPaid\"").unwrap();
        assert_eq!(parsed, PaymentStatus::NotPaid);
    }

    #[test]
    fn bill_number_is_issued_once() {
        let mut appointment =
            create_appointment(Uuid::new_v4(), "Dermatology", "2026-11-02", "09:00").unwrap();
        let issued_at = Utc::now();

        appointment.issue_bill_number(issued_at);
        let first = appointment.bill_number.clone().unwrap();
        assert!(first.starts_with(&format!("BILL-{}-", issued_at.format("%Y%m%d"))));

        appointment.issue_bill_number(issued_at + chrono::Duration::days(3));
        assert_eq!(appointment.bill_number.unwrap(), first);
    }

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!(Role::from_string("Doctor").unwrap(), Role::Doctor);
        assert_eq!(Role::from_string(" ADMIN ").unwrap(), Role::Admin);
        assert!(Role::from_string("nurse").is_err());
    }
}
