//! In-memory walkthrough of the whole appointment lifecycle.

use crate::billing::BillingDashboard;
use crate::config::DeskConfig;
use crate::desk::{
    register_admin, register_doctor, register_patient, AdminDesk, DoctorDesk, PatientDesk,
    Registration, Response,
};
use crate::error::{Error, LifecycleError};
use crate::gateway::SandboxGateway;
use crate::lifecycle::LifecycleEngine;
use crate::models::{Actor, Appointment, PatientCategory, PatientDetails};
use crate::store::{AppointmentStore, MemoryStore};
use chrono::{Duration, Utc};
use uuid::Uuid;

fn enrolled(registration: Registration) -> Result<Actor, Error> {
    registration
        .identity
        .map(|identity| identity.actor())
        .ok_or_else(|| LifecycleError::Validation(registration.notice.message).into())
}

fn patient(name: &str, age: u32, gender: &str, category: PatientCategory) -> PatientDetails {
    PatientDetails {
        full_name: name.to_string(),
        age,
        gender: gender.to_string(),
        place: "Bengaluru".to_string(),
        category,
    }
}

fn booked(response: Response) -> Result<Uuid, Error> {
    response
        .appointment
        .map(|apt| apt.id)
        .ok_or_else(|| LifecycleError::Validation(response.notice.message).into())
}

pub fn run(config: &DeskConfig) -> Result<bool, Error> {
    println!("\n--- Running Demo ---");

    let engine = LifecycleEngine::from_config(
        MemoryStore::new(),
        SandboxGateway::from_config(&config.payment),
        config,
    );
    let store = engine.store();

    let admin = enrolled(register_admin(store, "admin")?)?;
    let cardio = enrolled(register_doctor(store, "mehta", "Anil Mehta", "Cardiology")?)?;
    let ortho = enrolled(register_doctor(store, "rao", "Leela Rao", "Orthopedics")?)?;

    let john = enrolled(register_patient(
        store,
        "john",
        patient("John Smith", 58, "Male", PatientCategory::General),
    )?)?;
    let jane = enrolled(register_patient(
        store,
        "jane",
        patient("Jane Doe", 71, "Female", PatientCategory::Senior),
    )?)?;
    let bob = enrolled(register_patient(
        store,
        "bob",
        patient("Bob Wilson", 9, "Male", PatientCategory::Child),
    )?)?;

    println!("Registered 1 admin, 2 doctors and 3 patients");

    let tomorrow = (Utc::now() + Duration::days(1)).date_naive();
    let date = tomorrow.format("%Y-%m-%d").to_string();

    let john_visit = booked(PatientDesk::new(&engine, john).book("Cardiology", &date, "10:00")?)?;
    let jane_visit = booked(PatientDesk::new(&engine, jane).book("Cardiology", &date, "10:00")?)?;
    let bob_visit = booked(PatientDesk::new(&engine, bob).book("Orthopedics", &date, "14:00")?)?;

    println!("\nBooked 3 appointments for {}", date);
    println!("  - John Smith: Cardiology at 10:00");
    println!("  - Jane Doe: Cardiology at 10:00");
    println!("  - Bob Wilson: Orthopedics at 14:00");

    let desk = AdminDesk::new(&engine, admin);
    println!("\nPending requests: {}", desk.pending_requests()?.len());

    println!("\n--- Admin decisions ---");
    println!("{}", desk.approve(john_visit, None)?);
    println!("{}", desk.approve(john_visit, Some(cardio.id))?);
    println!("{}", desk.approve(jane_visit, Some(cardio.id))?);
    println!("{}", desk.approve(bob_visit, Some(ortho.id))?);

    println!("\n--- Consultations ---");
    let doctor = DoctorDesk::new(&engine, cardio);
    println!(
        "{}",
        doctor.complete(john_visit, "Stable angina", "Nitroglycerin 0.4mg", "1500.00")?
    );
    println!(
        "{}",
        doctor.complete(jane_visit, "Hypertension", "Amlodipine 5mg", "900.00")?
    );
    println!("{}", DoctorDesk::new(&engine, ortho).reject(bob_visit)?);

    println!("\n--- Billing ---");
    println!("{}", desk.generate_bill(jane_visit, "850.00")?);

    let john_desk = PatientDesk::new(&engine, john);
    println!("{}", john_desk.pay(john_visit)?);
    println!("{}", john_desk.payment_success(john_visit)?);
    println!("{}", john_desk.payment_success(john_visit)?);

    let jane_bills = PatientDesk::new(&engine, jane).bills()?;
    println!("Jane Doe owes {}", jane_bills.total_due);

    print_dashboard(&BillingDashboard::build(&store.appointments()?)?);

    let stats = desk.statistics()?;
    println!("\n--- Statistics ---");
    println!(
        "  {} appointments: {} completed, {} rejected",
        stats.appointments.total, stats.appointments.completed, stats.appointments.rejected
    );
    println!(
        "  {} patients, {} doctors",
        stats.patients.total, stats.doctors
    );

    println!("\nNote: only John Smith's paid bill counts as revenue;");
    println!("Jane Doe's adjusted bill is still outstanding.");

    Ok(true)
}

fn print_dashboard(dashboard: &BillingDashboard) {
    println!("\n--- Billing dashboard ---");
    println!("Total revenue: {}", dashboard.total_revenue);
    for month in &dashboard.monthly {
        println!("  {:<15} {:>10}", month.label(), month.total);
    }
    for apt in &dashboard.appointments {
        print_line(apt);
    }
}

fn print_line(apt: &Appointment) {
    println!(
        "  [{:9}] {:12} {:>9} {}",
        apt.status, apt.doctor_type, apt.bill_amount, apt.payment_status
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_runs_to_completion() {
        assert!(run(&DeskConfig::default()).unwrap());
    }
}
