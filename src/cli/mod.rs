mod demo;

use crate::{
    config::{DeskConfig, LogConfig, LogFormat, LogLevel, DEFAULT_CONFIG_FILE_PATH},
    desk::{
        register_admin, register_doctor, register_patient, AdminDesk, DoctorDesk, PatientDesk,
        Registration, Response,
    },
    error::{Entity, Error, LifecycleError},
    gateway::{PaymentGateway, SandboxGateway},
    lifecycle::{LifecycleEngine, NoticeLevel},
    log::DESK,
    models::{Actor, Appointment, PatientCategory, PatientDetails, Role},
    store::{AppointmentStore, FileStore, IdentityStore},
};
use clap::{Parser, Subcommand};
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Debug, Parser)]
#[command(version, about, verbatim_doc_comment)]
///
/// Hospital front desk
///
/// Book appointments, approve and complete consultations, bill and take payment.
///
pub struct Args {
    /// Path to the front desk settings, "frontdesk.toml" unless given.
    ///
    /// A missing file is fine: every setting has a default.
    /// DESK_-prefixed variables win over the file, e.g. DESK_STORE__PATH.
    #[arg(short = 'p', long, default_value = DEFAULT_CONFIG_FILE_PATH, verbatim_doc_comment, global = true)]
    pub config_file_path: String,

    /// Level for every log target without its own setting. Default is "warn".
    #[arg(short, long, value_enum, default_value_t = LogConfig::default_log_level(), env = "DESK_LOG__LEVEL", global = true)]
    pub log_level: LogLevel,

    /// Log line format. Logs go to stderr; when stdout is a terminal the
    /// default is "pretty", otherwise "structured" (one JSON object per line).
    #[arg(short='f', long, value_enum, default_value_t = LogConfig::default_log_format(), env = "DESK_LOG__FORMAT", global = true)]
    pub log_format: LogFormat,

    /// User id of the person at the desk.
    #[arg(long = "as", value_name = "USER_ID", global = true)]
    pub acting: Option<Uuid>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Create a patient account
    RegisterPatient {
        username: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: u32,
        #[arg(long)]
        gender: String,
        #[arg(long, default_value = "")]
        place: String,
        #[arg(long, value_parser = parse_category, default_value = "general")]
        category: PatientCategory,
    },

    /// Create a doctor account
    RegisterDoctor {
        username: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        specialization: String,
    },

    /// Create an administrator account
    RegisterAdmin { username: String },

    /// Book an appointment (patient)
    Book {
        doctor_type: String,
        /// YYYY-MM-DD
        date: String,
        /// HH:MM
        time: String,
    },

    /// Approve a pending appointment and assign a doctor (admin)
    Approve {
        appointment_id: Uuid,
        #[arg(long)]
        doctor: Option<Uuid>,
    },

    /// Reject an appointment (admin, or the assigned doctor)
    Reject { appointment_id: Uuid },

    /// Complete a consultation (assigned doctor)
    Complete {
        appointment_id: Uuid,
        #[arg(long)]
        diagnosis: String,
        #[arg(long)]
        prescription: String,
        #[arg(long)]
        amount: String,
    },

    /// Set the bill on a completed, unpaid appointment (admin)
    Bill { appointment_id: Uuid, amount: String },

    /// Start a checkout for a bill (patient)
    Pay { appointment_id: Uuid },

    /// Record a successful payment (patient)
    ConfirmPayment { appointment_id: Uuid },

    /// List appointments for the acting user
    List,

    /// Show bills (patient) or the billing dashboard (admin)
    Billing,

    /// Show appointment and patient statistics (admin)
    Stats,

    /// Walk through a full appointment lifecycle in memory
    Demo,
}

fn parse_category(value: &str) -> Result<PatientCategory, String> {
    PatientCategory::from_string(value).map_err(|err| err.to_string())
}

/// Run one command against the configured store.
/// `Ok(false)` means the desk refused the request and printed why.
pub fn run(args: Args, config: &DeskConfig) -> Result<bool, Error> {
    debug!(target: DESK, command = ?args.command);

    if let Commands::Demo = args.command {
        return demo::run(config);
    }

    let store = FileStore::open(&config.store.path)?;
    let gateway = SandboxGateway::from_config(&config.payment);
    let engine = LifecycleEngine::from_config(store, gateway, config);

    dispatch(&engine, args.acting, args.command)
}

fn dispatch<S, G>(
    engine: &LifecycleEngine<S, G>,
    acting: Option<Uuid>,
    command: Commands,
) -> Result<bool, Error>
where
    S: AppointmentStore + IdentityStore,
    G: PaymentGateway,
{
    let store = engine.store();

    let registration = match &command {
        Commands::RegisterPatient {
            username,
            name,
            age,
            gender,
            place,
            category,
        } => {
            let details = PatientDetails {
                full_name: name.to_owned(),
                age: *age,
                gender: gender.to_owned(),
                place: place.to_owned(),
                category: *category,
            };
            Some(register_patient(store, username, details)?)
        }
        Commands::RegisterDoctor {
            username,
            name,
            specialization,
        } => Some(register_doctor(store, username, name, specialization)?),
        Commands::RegisterAdmin { username } => Some(register_admin(store, username)?),
        _ => None,
    };
    if let Some(registration) = registration {
        return Ok(print_registration(&registration));
    }

    let actor = match acting_user(engine, acting) {
        Ok(actor) => actor,
        Err(err) if err.is_domain() => {
            println!("[error] {}", err);
            return Ok(false);
        }
        Err(err) => return Err(err),
    };

    let response = match command {
        Commands::Book {
            doctor_type,
            date,
            time,
        } => PatientDesk::new(engine, actor).book(&doctor_type, &date, &time)?,
        Commands::Approve {
            appointment_id,
            doctor,
        } => AdminDesk::new(engine, actor).approve(appointment_id, doctor)?,
        Commands::Reject { appointment_id } => match actor.role {
            Role::Doctor => DoctorDesk::new(engine, actor).reject(appointment_id)?,
            Role::Admin | Role::Patient => AdminDesk::new(engine, actor).reject(appointment_id)?,
        },
        Commands::Complete {
            appointment_id,
            diagnosis,
            prescription,
            amount,
        } => DoctorDesk::new(engine, actor).complete(
            appointment_id,
            &diagnosis,
            &prescription,
            &amount,
        )?,
        Commands::Bill {
            appointment_id,
            amount,
        } => AdminDesk::new(engine, actor).generate_bill(appointment_id, &amount)?,
        Commands::Pay { appointment_id } => PatientDesk::new(engine, actor).pay(appointment_id)?,
        Commands::ConfirmPayment { appointment_id } => {
            PatientDesk::new(engine, actor).payment_success(appointment_id)?
        }
        Commands::List => return list(engine, actor),
        Commands::Billing => return billing(engine, actor),
        Commands::Stats => return stats(engine, actor),
        Commands::RegisterPatient { .. }
        | Commands::RegisterDoctor { .. }
        | Commands::RegisterAdmin { .. }
        | Commands::Demo => return Ok(true),
    };

    Ok(print_response(&response))
}

fn acting_user<S, G>(engine: &LifecycleEngine<S, G>, acting: Option<Uuid>) -> Result<Actor, Error>
where
    S: AppointmentStore + IdentityStore,
    G: PaymentGateway,
{
    let Some(id) = acting else {
        return Err(LifecycleError::Validation(
            "This command needs the acting user: --as <USER_ID>".to_string(),
        )
        .into());
    };

    engine
        .store()
        .identity(id)?
        .map(|identity| identity.actor())
        .ok_or_else(|| LifecycleError::not_found(Entity::Identity, id).into())
}

fn list<S, G>(engine: &LifecycleEngine<S, G>, actor: Actor) -> Result<bool, Error>
where
    S: AppointmentStore + IdentityStore,
    G: PaymentGateway,
{
    match actor.role {
        Role::Patient => {
            let desk = PatientDesk::new(engine, actor);
            print_appointments("Your appointments", &desk.appointments()?);
            print_appointments("Medical history", &desk.medical_history()?);
        }
        Role::Doctor => {
            print_appointments("Your queue", &DoctorDesk::new(engine, actor).queue()?);
        }
        Role::Admin => {
            let desk = AdminDesk::new(engine, actor);
            print_appointments("Pending requests", &desk.pending_requests()?);
            print_appointments("Appointment history", &desk.history()?);
        }
    }
    Ok(true)
}

fn billing<S, G>(engine: &LifecycleEngine<S, G>, actor: Actor) -> Result<bool, Error>
where
    S: AppointmentStore + IdentityStore,
    G: PaymentGateway,
{
    match actor.role {
        Role::Patient => {
            let bills = PatientDesk::new(engine, actor).bills()?;
            println!("\n--- Bills ({}) ---", bills.bills.len());
            for bill in &bills.bills {
                println!(
                    "  {} {:>10} {:<8} {}",
                    bill.bill_number.as_deref().unwrap_or("-"),
                    bill.bill_amount,
                    bill.payment_status,
                    bill
                );
            }
            println!("Total due: {}", bills.total_due);
        }
        Role::Admin => {
            let dashboard = AdminDesk::new(engine, actor).billing_dashboard()?;
            println!("\n--- Billing ---");
            println!("Total revenue: {}", dashboard.total_revenue);
            for month in &dashboard.monthly {
                println!("  {:<15} {:>10}", month.label(), month.total);
            }
            print_appointments("All appointments", &dashboard.appointments);
        }
        Role::Doctor => {
            println!("[error] Billing is not available to doctors");
            return Ok(false);
        }
    }
    Ok(true)
}

fn stats<S, G>(engine: &LifecycleEngine<S, G>, actor: Actor) -> Result<bool, Error>
where
    S: AppointmentStore + IdentityStore,
    G: PaymentGateway,
{
    let stats = match AdminDesk::new(engine, actor).statistics() {
        Ok(stats) => stats,
        Err(err) if err.is_domain() => {
            println!("[error] {}", err);
            return Ok(false);
        }
        Err(err) => return Err(err),
    };

    let apts = &stats.appointments;
    println!("\n--- Statistics ---");
    println!("  Appointments: {}", apts.total);
    println!(
        "  Pending: {}  Approved: {}  Rejected: {}  Completed: {}",
        apts.pending, apts.approved, apts.rejected, apts.completed
    );
    println!("  Doctors: {}", stats.doctors);
    println!("  Patients: {}", stats.patients.total);
    for (gender, count) in &stats.patients.by_gender {
        println!("    {:<10} {}", gender, count);
    }
    for (category, count) in &stats.patients.by_category {
        println!("    {:<10} {}", category.name(), count);
    }
    Ok(true)
}

fn print_appointments(title: &str, appointments: &[Appointment]) {
    println!("\n--- {} ({}) ---", title, appointments.len());
    for apt in appointments {
        println!("  {}", apt);
    }
}

fn print_registration(registration: &Registration) -> bool {
    println!("{}", registration.notice);
    if let Some(identity) = &registration.identity {
        println!("  {} {} ({})", identity.id, identity.username, identity.role);
    }
    registration.notice.level != NoticeLevel::Error
}

fn print_response(response: &Response) -> bool {
    println!("{}", response);
    response.notice.level != NoticeLevel::Error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{engine, ward};

    #[test]
    fn args_parse_global_identity() {
        let id = Uuid::new_v4();
        let appointment = Uuid::nil().to_string();
        let user = id.to_string();
        let args = Args::try_parse_from([
            "frontdesk",
            "approve",
            appointment.as_str(),
            "--doctor",
            user.as_str(),
            "--as",
            user.as_str(),
        ])
        .unwrap();

        assert_eq!(args.acting, Some(id));
        assert_eq!(args.config_file_path, DEFAULT_CONFIG_FILE_PATH);
        assert!(matches!(
            args.command,
            Commands::Approve { doctor: Some(d), .. } if d == id
        ));
    }

    #[test]
    fn category_is_validated_by_the_parser() {
        let result = Args::try_parse_from([
            "frontdesk",
            "register-patient",
            "ravi",
            "--name",
            "Ravi",
            "--age",
            "40",
            "--gender",
            "Male",
            "--category",
            "infant",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn commands_need_a_known_user() {
        let engine = engine();
        let ward = ward(&engine);

        let refused = dispatch(&engine, None, Commands::List).unwrap();
        assert!(!refused);

        let refused = dispatch(&engine, Some(Uuid::new_v4()), Commands::List).unwrap();
        assert!(!refused);

        let listed = dispatch(&engine, Some(ward.admin.id), Commands::List).unwrap();
        assert!(listed);
    }

    #[test]
    fn dispatch_routes_by_role() {
        let engine = engine();
        let ward = ward(&engine);

        let booked = dispatch(
            &engine,
            Some(ward.patient.id),
            Commands::Book {
                doctor_type: "Orthopedics".to_string(),
                date: "2026-12-03".to_string(),
                time: "09:15".to_string(),
            },
        )
        .unwrap();
        assert!(booked);

        let id = engine.store().appointments().unwrap()[0].id;
        let approved = dispatch(
            &engine,
            Some(ward.admin.id),
            Commands::Approve {
                appointment_id: id,
                doctor: Some(ward.doctor.id),
            },
        )
        .unwrap();
        assert!(approved);

        let rejected = dispatch(
            &engine,
            Some(ward.doctor.id),
            Commands::Reject { appointment_id: id },
        )
        .unwrap();
        assert!(rejected);

        let again = dispatch(
            &engine,
            Some(ward.doctor.id),
            Commands::Reject { appointment_id: id },
        )
        .unwrap();
        assert!(!again);
    }
}
