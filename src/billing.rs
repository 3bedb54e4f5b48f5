//! Billing and reporting over appointment records.
//!
//! Nothing here mutates an appointment; the functions aggregate whatever the
//! store returns. Sums are checked, so a corrupt record fails the report
//! instead of the process.

use crate::error::BillingError;
use crate::log::BILLING;
use crate::models::{Appointment, AppointmentStatus, PatientCategory, PatientProfile};
use chrono::{Datelike, Month};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

fn checked_sum<I>(amounts: I) -> Result<Decimal, BillingError>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts.into_iter().try_fold(Decimal::ZERO, |total, amount| {
        total
            .checked_add(amount)
            .ok_or(BillingError::Overflow { amount })
    })
}

/// Sum of unpaid completed bills for one patient.
pub fn outstanding_balance(
    appointments: &[Appointment],
    patient: Uuid,
) -> Result<Decimal, BillingError> {
    checked_sum(
        appointments
            .iter()
            .filter(|apt| apt.patient == patient && apt.is_outstanding())
            .map(|apt| apt.bill_amount),
    )
}

fn is_revenue(appointment: &Appointment) -> bool {
    appointment.status == AppointmentStatus::Completed && appointment.is_paid()
}

/// Sum of paid completed bills.
pub fn total_revenue(appointments: &[Appointment]) -> Result<Decimal, BillingError> {
    checked_sum(
        appointments
            .iter()
            .filter(|apt| is_revenue(apt))
            .map(|apt| apt.bill_amount),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyRevenue {
    pub year: i32,
    pub month: u32,
    pub total: Decimal,
}

impl MonthlyRevenue {
    /// Label such as `January 2026`.
    pub fn label(&self) -> String {
        let name = u8::try_from(self.month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .map_or("Unknown", |m| m.name());
        format!("{} {}", name, self.year)
    }
}

/// Paid revenue grouped by the month each appointment was completed,
/// oldest month first.
pub fn monthly_revenue(
    appointments: &[Appointment],
) -> Result<Vec<MonthlyRevenue>, BillingError> {
    let mut months: BTreeMap<(i32, u32), Decimal> = BTreeMap::new();

    for appointment in appointments.iter().filter(|apt| is_revenue(apt)) {
        let date = appointment.revenue_date();
        let total = months.entry((date.year(), date.month())).or_default();
        *total = total
            .checked_add(appointment.bill_amount)
            .ok_or(BillingError::Overflow {
                amount: appointment.bill_amount,
            })?;
    }

    Ok(months
        .into_iter()
        .map(|((year, month), total)| MonthlyRevenue { year, month, total })
        .collect())
}

/// A patient's completed bills and what is still owed.
#[derive(Debug, Clone)]
pub struct PatientBills {
    pub bills: Vec<Appointment>,
    pub total_due: Decimal,
}

impl PatientBills {
    pub fn for_patient(appointments: &[Appointment], patient: Uuid) -> Result<Self, BillingError> {
        let bills: Vec<Appointment> = appointments
            .iter()
            .filter(|apt| apt.patient == patient && apt.status == AppointmentStatus::Completed)
            .cloned()
            .collect();
        let total_due = outstanding_balance(&bills, patient)?;

        debug!(
            target: BILLING,
            msg = "Collected patient bills",
            patient_id = %patient,
            bills = bills.len(),
            total_due = %total_due
        );

        Ok(PatientBills { bills, total_due })
    }
}

/// The administrator's billing overview.
#[derive(Debug, Clone)]
pub struct BillingDashboard {
    /// Every appointment, newest first.
    pub appointments: Vec<Appointment>,
    pub total_revenue: Decimal,
    pub monthly: Vec<MonthlyRevenue>,
}

impl BillingDashboard {
    pub fn build(appointments: &[Appointment]) -> Result<Self, BillingError> {
        let mut newest_first = appointments.to_vec();
        newest_first.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let dashboard = BillingDashboard {
            total_revenue: total_revenue(appointments)?,
            monthly: monthly_revenue(appointments)?,
            appointments: newest_first,
        };

        debug!(
            target: BILLING,
            msg = "Built billing dashboard",
            appointments = dashboard.appointments.len(),
            months = dashboard.monthly.len(),
            total_revenue = %dashboard.total_revenue
        );

        Ok(dashboard)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub completed: usize,
}

pub fn appointment_stats(appointments: &[Appointment]) -> AppointmentStats {
    let mut stats = AppointmentStats {
        total: appointments.len(),
        ..AppointmentStats::default()
    };

    for appointment in appointments {
        match appointment.status {
            AppointmentStatus::Pending => stats.pending += 1,
            AppointmentStatus::Approved => stats.approved += 1,
            AppointmentStatus::Rejected => stats.rejected += 1,
            AppointmentStatus::Completed => stats.completed += 1,
        }
    }

    stats
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientStats {
    pub total: usize,
    pub by_gender: BTreeMap<String, usize>,
    pub by_category: BTreeMap<PatientCategory, usize>,
    pub by_age: BTreeMap<u32, usize>,
}

pub fn patient_stats(profiles: &[PatientProfile]) -> PatientStats {
    let mut stats = PatientStats {
        total: profiles.len(),
        ..PatientStats::default()
    };

    for profile in profiles {
        *stats.by_gender.entry(profile.gender.clone()).or_default() += 1;
        *stats.by_category.entry(profile.category).or_default() += 1;
        *stats.by_age.entry(profile.age).or_default() += 1;
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{create_appointment, PatientDetails, PaymentStatus};
    use chrono::{TimeZone, Utc};

    fn completed(patient: Uuid, amount: i64, paid: bool, month: u32) -> Appointment {
        let mut appointment = create_appointment(patient, "ENT", "2026-03-10", "09:00").unwrap();
        appointment.status = AppointmentStatus::Completed;
        appointment.doctor = Some(Uuid::new_v4());
        appointment.bill_amount = Decimal::new(amount, 2);
        appointment.completed_at = Some(Utc.with_ymd_and_hms(2026, month, 12, 10, 0, 0).unwrap());
        if paid {
            appointment.payment_status = PaymentStatus::Paid;
        }
        appointment
    }

    #[test]
    fn outstanding_balance_ignores_paid_bills() {
        let patient = Uuid::new_v4();
        let appointments = vec![
            completed(patient, 15000, false, 3),
            completed(patient, 30000, true, 3),
            completed(Uuid::new_v4(), 99900, false, 3),
        ];

        assert_eq!(
            outstanding_balance(&appointments, patient).unwrap(),
            Decimal::new(15000, 2)
        );
    }

    #[test]
    fn revenue_counts_only_paid_bills() {
        let patient = Uuid::new_v4();
        let mut approved = create_appointment(patient, "ENT", "2026-03-10", "09:00").unwrap();
        approved.status = AppointmentStatus::Approved;

        let appointments = vec![
            completed(patient, 15000, false, 1),
            completed(patient, 30000, true, 1),
            completed(patient, 12550, true, 2),
            approved,
        ];

        assert_eq!(total_revenue(&appointments).unwrap(), Decimal::new(42550, 2));
    }

    #[test]
    fn monthly_revenue_groups_by_completion_month() {
        let patient = Uuid::new_v4();
        let appointments = vec![
            completed(patient, 10000, true, 2),
            completed(patient, 5000, true, 1),
            completed(patient, 2500, true, 2),
            completed(patient, 7000, false, 2),
        ];

        let monthly = monthly_revenue(&appointments).unwrap();

        assert_eq!(monthly.len(), 2);
        assert_eq!(monthly[0].label(), "January 2026");
        assert_eq!(monthly[0].total, Decimal::new(5000, 2));
        assert_eq!(monthly[1].label(), "February 2026");
        assert_eq!(monthly[1].total, Decimal::new(12500, 2));
    }

    #[test]
    fn patient_bills_list_completed_appointments_only() {
        let patient = Uuid::new_v4();
        let pending = create_appointment(patient, "ENT", "2026-03-10", "09:00").unwrap();
        let appointments = vec![
            completed(patient, 15000, false, 3),
            completed(patient, 30000, true, 4),
            pending,
        ];

        let bills = PatientBills::for_patient(&appointments, patient).unwrap();
        assert_eq!(bills.bills.len(), 2);
        assert_eq!(bills.total_due, Decimal::new(15000, 2));
    }

    #[test]
    fn overflowing_totals_are_errors() {
        let patient = Uuid::new_v4();
        let mut appointments = vec![
            completed(patient, 100, false, 3),
            completed(patient, 100, true, 3),
            completed(patient, 100, false, 3),
            completed(patient, 100, true, 3),
        ];
        for appointment in &mut appointments {
            appointment.bill_amount = Decimal::MAX;
        }

        assert!(matches!(
            outstanding_balance(&appointments, patient),
            Err(BillingError::Overflow { .. })
        ));
        assert!(total_revenue(&appointments).is_err());
        assert!(monthly_revenue(&appointments).is_err());
        assert!(BillingDashboard::build(&appointments).is_err());
    }

    #[test]
    fn stats_count_every_status() {
        let patient = Uuid::new_v4();
        let mut rejected = create_appointment(patient, "ENT", "2026-03-10", "09:00").unwrap();
        rejected.status = AppointmentStatus::Rejected;
        let appointments = vec![
            create_appointment(patient, "ENT", "2026-03-10", "09:00").unwrap(),
            rejected,
            completed(patient, 100, true, 5),
        ];

        let stats = appointment_stats(&appointments);
        assert_eq!(
            stats,
            AppointmentStats {
                total: 3,
                pending: 1,
                approved: 0,
                rejected: 1,
                completed: 1,
            }
        );
    }

    #[test]
    fn patient_stats_group_profiles() {
        let profile = |gender: &str, age: u32, category: PatientCategory| {
            PatientProfile::new(
                Uuid::new_v4(),
                PatientDetails {
                    full_name: "Someone".to_string(),
                    age,
                    gender: gender.to_string(),
                    place: "Pune".to_string(),
                    category,
                },
            )
            .unwrap()
        };
        let profiles = vec![
            profile("Female", 70, PatientCategory::Senior),
            profile("Male", 8, PatientCategory::Child),
            profile("Female", 8, PatientCategory::Child),
        ];

        let stats = patient_stats(&profiles);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_gender["Female"], 2);
        assert_eq!(stats.by_category[&PatientCategory::Child], 2);
        assert_eq!(stats.by_age.keys().copied().collect::<Vec<_>>(), vec![8, 70]);
    }
}
