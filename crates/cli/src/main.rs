use careport_core::analytics;
use careport_core::repositories::inventory::InventoryService;
use careport_core::repositories::patients::PatientsService;
use careport_core::repositories::shared::register_patient;
use careport_core::{Author, CoreConfig, EmailAddress, NonEmptyText};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "careport")]
#[command(about = "CarePort healthcare portal CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all patients
    List,
    /// Register a patient
    Register {
        /// Given names (comma-separated)
        given_names: String,
        /// Family name
        family_name: String,
        /// Date of birth (YYYY-MM-DD)
        birth_date: String,
        /// Author name for the audit journal
        #[arg(long, default_value = "CarePort CLI")]
        author_name: String,
        /// Author email for the audit journal
        #[arg(long, default_value = "cli@careport.local")]
        author_email: String,
        /// Care location for the audit journal
        #[arg(long, default_value = "CLI")]
        location: String,
    },
    /// Run the symptom checker
    Triage {
        /// Reported symptoms (e.g. Fever Cough "Sore Throat")
        symptoms: Vec<String>,
    },
    /// List the pharmacy catalogue
    Inventory,
    /// List catalogue lines at or below their reorder level
    LowStock,
    /// Print the portal summary
    Summary,
}

fn build_cfg() -> Result<Arc<CoreConfig>, Box<dyn std::error::Error>> {
    let portal_data_dir = std::env::var("PORTAL_DATA_DIR")
        .unwrap_or_else(|_| careport_core::DEFAULT_PORTAL_DATA_DIR.into());
    let portal_namespace =
        std::env::var("CAREPORT_NAMESPACE").unwrap_or_else(|_| "careport.dev.1".into());

    Ok(Arc::new(CoreConfig::new(
        PathBuf::from(portal_data_dir),
        portal_namespace,
    )?))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::List) => {
            let cfg = build_cfg()?;
            let patients = PatientsService::new(cfg).list_patients();
            if patients.is_empty() {
                println!("No patients found.");
            } else {
                for patient in patients {
                    println!(
                        "ID: {}, Name: {}, Born: {}",
                        patient.id,
                        patient.display_name(),
                        patient.birth_date.as_deref().unwrap_or("-")
                    );
                }
            }
        }
        Some(Commands::Register {
            given_names,
            family_name,
            birth_date,
            author_name,
            author_email,
            location,
        }) => {
            let cfg = build_cfg()?;
            let given_names_vec: Vec<String> = given_names
                .split(',')
                .map(|s| s.trim().to_string())
                .collect();

            let author = Author {
                name: NonEmptyText::new(&author_name)?,
                role: careport_core::PortalRole::Admin,
                email: EmailAddress::parse(&author_email)?,
            };

            match register_patient(
                cfg,
                author,
                NonEmptyText::new(&location)?,
                given_names_vec,
                family_name,
                birth_date,
                None,
            ) {
                Ok(registered) => {
                    println!("Registered patient with UUID: {}", registered.patient_uuid)
                }
                Err(e) => eprintln!("Error registering patient: {}", e),
            }
        }
        Some(Commands::Triage { symptoms }) => {
            let report = triage::assess(&symptoms);
            println!("Suggestion: {}", report.suggestion);
            println!("Severity: {}", report.severity);
        }
        Some(Commands::Inventory) => {
            let cfg = build_cfg()?;
            let medicines = InventoryService::new(cfg).list()?;
            if medicines.is_empty() {
                println!("Catalogue is empty.");
            } else {
                for medicine in medicines {
                    println!(
                        "ID: {}, {}: {} units @ {} cents (reorder at {}), expires {}",
                        medicine.id,
                        medicine.name,
                        medicine.quantity,
                        medicine.unit_price_cents,
                        medicine.reorder_level,
                        medicine.expiry_date
                    );
                }
            }
        }
        Some(Commands::LowStock) => {
            let cfg = build_cfg()?;
            let medicines = InventoryService::new(cfg).low_stock()?;
            if medicines.is_empty() {
                println!("No lines at or below their reorder level.");
            } else {
                for medicine in medicines {
                    println!(
                        "{}: {} units (reorder at {})",
                        medicine.name, medicine.quantity, medicine.reorder_level
                    );
                }
            }
        }
        Some(Commands::Summary) => {
            let cfg = build_cfg()?;
            let summary = analytics::summarise(&cfg, Utc::now().date_naive())?;
            println!("Patients: {}", summary.total_patients);
            println!(
                "Appointments: {} ({} today)",
                summary.total_appointments, summary.appointments_today
            );
            println!(
                "Prescriptions: {} active, {} completed, {} expired",
                summary.prescriptions.active,
                summary.prescriptions.completed,
                summary.prescriptions.expired
            );
            println!(
                "Inventory: {} lines ({} low stock)",
                summary.inventory_items, summary.low_stock_items
            );
            println!(
                "Orders: {} (revenue {} cents)",
                summary.total_orders, summary.revenue_cents
            );
        }
        None => {
            println!("Use 'careport --help' for commands");
        }
    }

    Ok(())
}
