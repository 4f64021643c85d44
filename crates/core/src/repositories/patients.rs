//! Patient record management.
//!
//! This module provides functionality for initialising and updating patient
//! records within the CarePort system. It handles:
//!
//! - Creation of new patient records with unique UUIDs
//! - Storage in a sharded directory structure under `portal_data/patients/`
//! - Profile updates (names, birth date, contact email)
//! - Listing all patients across the store
//!
//! ## Storage Layout
//!
//! Patient records are stored as JSON files in a sharded structure:
//!
//! ```text
//! patients/
//!   <s1>/
//!     <s2>/
//!       <uuid>/
//!         patient.json        # profile document
//!         appointments.json   # appointment entries
//!         prescriptions.json  # prescription entries
//!         audit.jsonl         # append-only audit journal
//! ```
//!
//! where `s1` and `s2` are the first four hex characters of the UUID, providing
//! scalable directory sharding.
//!
//! ## Pure Data Operations
//!
//! This module contains **only** data operations—no API concerns such as
//! HTTP servers or request shapes. API-level logic belongs in `api-rest`.

use super::helpers::{cleanup_after_failed_initialise, create_unique_shared_dir, record_dirs};
use crate::audit::{append_entry, AuditAction, AuditEntry};
use crate::config::CoreConfig;
use crate::constants::{APPOINTMENTS_FILENAME, PATIENT_PROFILE_FILENAME, PRESCRIPTIONS_FILENAME};
use crate::error::{PortalError, PortalResult};
use crate::records::appointment::Appointments;
use crate::records::patient::{PatientProfile, PatientProfileData};
use crate::records::prescription::Prescriptions;
use crate::validation::parse_iso_date;
use crate::{Author, EmailAddress, NonEmptyText, ShardableUuid};
use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Sharded record directory of a patient, whether or not it exists.
pub(crate) fn record_dir_for(cfg: &CoreConfig, patient_id: &ShardableUuid) -> PathBuf {
    patient_id.sharded_dir(&cfg.patients_dir())
}

// ============================================================================
// TYPE-STATE MARKERS
// ============================================================================

/// Marker type: patient record does not yet exist.
///
/// Used in type-state pattern to prevent operations on non-existent records.
/// Only `initialise()` can be called in this state.
#[derive(Clone, Copy, Debug)]
pub struct Uninitialised;

/// Marker type: patient record exists.
///
/// Indicates a valid patient record with a known UUID.
/// Enables operations like profile updates.
#[derive(Clone, Debug)]
pub struct Initialised {
    patient_id: ShardableUuid,
}

// ============================================================================
// PATIENTS SERVICE
// ============================================================================

/// Service for managing patient record operations.
///
/// Uses type-state pattern to enforce correct usage at compile time.
/// Generic parameter `S` is either `Uninitialised` or `Initialised`.
#[derive(Clone, Debug)]
pub struct PatientsService<S> {
    cfg: Arc<CoreConfig>,
    state: S,
}

impl PatientsService<Uninitialised> {
    /// Creates a new patients service in the uninitialised state.
    ///
    /// # Arguments
    ///
    /// * `cfg` - Core configuration containing portal data directory paths
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self {
            cfg,
            state: Uninitialised,
        }
    }

    /// Initialises a new patient record.
    ///
    /// Allocates a unique UUID, creates the sharded record directory, writes an empty
    /// profile document plus empty appointment and prescription documents, and appends
    /// the creation entry to the record's audit journal.
    ///
    /// **This method consumes `self`** and returns a new `PatientsService<Initialised>` on
    /// success, enforcing at compile time that you cannot call `initialise()` twice on the
    /// same service.
    ///
    /// # Arguments
    ///
    /// * `author` - Author recorded in the audit journal
    /// * `location` - Care location the record was created from (e.g., clinic name)
    ///
    /// # Errors
    ///
    /// Returns `PortalError` if directory allocation, any file write, or the audit
    /// append fails.
    ///
    /// # Safety & Rollback
    ///
    /// If any operation fails after the record directory was allocated, this method removes
    /// the partially-created directory. If cleanup also fails, a
    /// [`PortalError::CleanupAfterInitialiseFailed`] is returned with details of both errors.
    pub fn initialise(
        self,
        author: Author,
        location: NonEmptyText,
    ) -> PortalResult<PatientsService<Initialised>> {
        let patients_dir = self.cfg.patients_dir();
        let (patient_uuid, record_dir) =
            create_unique_shared_dir(&patients_dir, ShardableUuid::new)?;

        let created_at = Utc::now();
        let profile = PatientProfileData::empty(patient_uuid.clone(), created_at);

        let write_all = || -> PortalResult<()> {
            let profile_raw = PatientProfile::render(&profile)?;
            let appointments_raw = Appointments::render(&[])?;
            let prescriptions_raw = Prescriptions::render(&[])?;

            fs::write(record_dir.join(PATIENT_PROFILE_FILENAME), profile_raw)
                .map_err(PortalError::FileWrite)?;
            fs::write(record_dir.join(APPOINTMENTS_FILENAME), appointments_raw)
                .map_err(PortalError::FileWrite)?;
            fs::write(record_dir.join(PRESCRIPTIONS_FILENAME), prescriptions_raw)
                .map_err(PortalError::FileWrite)?;

            let entry = AuditEntry::new(
                &self.cfg,
                AuditAction::Create,
                "Patient record created",
                &author,
                &location,
            );
            append_entry(&record_dir, &entry)
        };

        if let Err(init_error) = write_all() {
            return Err(cleanup_after_failed_initialise(&record_dir, init_error));
        }

        Ok(PatientsService {
            cfg: self.cfg,
            state: Initialised {
                patient_id: patient_uuid,
            },
        })
    }
}

impl PatientsService<Initialised> {
    /// Creates a patients service for an existing record.
    ///
    /// Use this when you already have a patient record and want to perform
    /// operations on it, such as updating the profile.
    ///
    /// # Arguments
    ///
    /// * `cfg` - Core configuration containing portal data directory paths
    /// * `patient_id` - UUID string of the existing patient record
    ///
    /// # Errors
    ///
    /// Returns `PortalError::Ident` if `patient_id` is not canonical.
    pub fn with_id(cfg: Arc<CoreConfig>, patient_id: &str) -> PortalResult<Self> {
        let patient_uuid = ShardableUuid::parse(patient_id)?;
        Ok(Self {
            cfg,
            state: Initialised {
                patient_id: patient_uuid,
            },
        })
    }

    /// Returns the patient UUID.
    pub fn patient_id(&self) -> &ShardableUuid {
        &self.state.patient_id
    }

    fn record_dir(&self) -> PathBuf {
        record_dir_for(&self.cfg, self.patient_id())
    }

    /// Reads the profile of this patient record.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::PatientNotFound` if the record does not exist on disk,
    /// or a read/parse error for a corrupt document.
    pub fn get(&self) -> PortalResult<PatientProfileData> {
        let profile_path = self.record_dir().join(PATIENT_PROFILE_FILENAME);
        if !profile_path.is_file() {
            return Err(PortalError::PatientNotFound(self.patient_id().to_string()));
        }

        let contents = fs::read_to_string(&profile_path).map_err(PortalError::FileRead)?;
        PatientProfile::parse(&contents)
    }

    /// Updates the profile of an existing patient record.
    ///
    /// Reads the existing profile, replaces the name, birth date and contact fields,
    /// stamps `lastUpdated`, writes the document back, and appends an update entry to
    /// the audit journal.
    ///
    /// # Arguments
    ///
    /// * `author` - Author recorded in the audit journal
    /// * `location` - Care location the change was made from
    /// * `given_names` - Given names for the patient
    /// * `family_name` - Family/last name of the patient
    /// * `birth_date` - Birth date as a `YYYY-MM-DD` string
    /// * `contact_email` - Optional contact email for portal notifications
    ///
    /// # Errors
    ///
    /// Returns `PortalError` if the record does not exist, the birth date is malformed,
    /// or any read/write fails.
    pub fn update_profile(
        &self,
        author: &Author,
        location: &NonEmptyText,
        given_names: Vec<String>,
        family_name: &str,
        birth_date: &str,
        contact_email: Option<EmailAddress>,
    ) -> PortalResult<()> {
        parse_iso_date("birth_date", birth_date)?;

        let mut profile = self.get()?;

        profile.given = given_names;
        profile.family = Some(family_name.to_string());
        profile.birth_date = Some(birth_date.to_string());
        profile.contact_email = contact_email;
        profile.last_updated = Some(Utc::now());

        let raw = PatientProfile::render(&profile)?;
        let record_dir = self.record_dir();
        fs::write(record_dir.join(PATIENT_PROFILE_FILENAME), raw).map_err(PortalError::FileWrite)?;

        let entry = AuditEntry::new(
            &self.cfg,
            AuditAction::Update,
            "Patient profile updated",
            author,
            location,
        );
        append_entry(&record_dir, &entry)
    }
}

// ============================================================================
// SHARED OPERATIONS (AVAILABLE ON BOTH STATES)
// ============================================================================

impl<S> PatientsService<S> {
    /// Lists all patient records from the file system.
    ///
    /// Traverses the sharded directory structure under `portal_data/patients/`
    /// and reads all `patient.json` files to reconstruct patient profiles.
    ///
    /// # Returns
    ///
    /// Vector of profiles for all found patient records. Individual documents that
    /// cannot be parsed are logged as warnings and skipped.
    pub fn list_patients(&self) -> Vec<PatientProfileData> {
        let patients_dir = self.cfg.patients_dir();

        let mut patients = Vec::new();

        for record_dir in record_dirs(&patients_dir) {
            let profile_path = record_dir.join(PATIENT_PROFILE_FILENAME);
            if !profile_path.is_file() {
                continue;
            }

            if let Ok(contents) = fs::read_to_string(&profile_path) {
                match PatientProfile::parse(&contents) {
                    Ok(profile) => patients.push(profile),
                    Err(e) => {
                        tracing::warn!(
                            "failed to parse patient.json: {} - {}",
                            profile_path.display(),
                            e
                        );
                    }
                }
            }
        }

        patients
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PortalRole;
    use std::path::Path;
    use tempfile::TempDir;

    fn test_author() -> Author {
        Author {
            name: NonEmptyText::new("Test Author").unwrap(),
            role: PortalRole::Admin,
            email: EmailAddress::parse("test@example.com").unwrap(),
        }
    }

    fn test_cfg(portal_data_dir: &Path) -> Arc<CoreConfig> {
        Arc::new(
            CoreConfig::new(portal_data_dir.to_path_buf(), "careport.test".into())
                .expect("CoreConfig::new should succeed"),
        )
    }

    fn test_location() -> NonEmptyText {
        NonEmptyText::new("Test Clinic").unwrap()
    }

    #[test]
    fn test_initialise_creates_patient_record() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let service = PatientsService::new(cfg.clone());

        let patients_service = service
            .initialise(test_author(), test_location())
            .expect("initialise should succeed");

        let record_dir = record_dir_for(&cfg, patients_service.patient_id());

        assert!(record_dir.exists(), "record directory should exist");
        assert!(
            record_dir.join(PATIENT_PROFILE_FILENAME).is_file(),
            "patient.json should exist"
        );
        assert!(
            record_dir.join(APPOINTMENTS_FILENAME).is_file(),
            "appointments.json should exist"
        );
        assert!(
            record_dir.join(PRESCRIPTIONS_FILENAME).is_file(),
            "prescriptions.json should exist"
        );

        // Verify profile content
        let profile = patients_service.get().expect("should read profile");
        assert_eq!(profile.id, *patients_service.patient_id());
        assert!(profile.given.is_empty());
        assert!(profile.family.is_none());
        assert!(profile.birth_date.is_none());
        assert!(profile.last_updated.is_some());

        // Verify audit journal
        let journal = crate::audit::read_journal(&record_dir).expect("should read journal");
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].action, AuditAction::Create);
    }

    #[test]
    fn test_with_id_rejects_invalid_uuid() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());

        let err = PatientsService::with_id(cfg, "not-a-valid-uuid")
            .expect_err("with_id should fail with invalid UUID");

        assert!(matches!(err, PortalError::Ident(_)), "should return Ident error");
    }

    #[test]
    fn test_get_reports_missing_record() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());

        let missing = ShardableUuid::new();
        let service =
            PatientsService::with_id(cfg, &missing.to_string()).expect("with_id should succeed");

        let err = service.get().expect_err("get should fail");
        assert!(matches!(err, PortalError::PatientNotFound(_)));
    }

    #[test]
    fn test_update_profile_persists_changes() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let service = PatientsService::new(cfg);

        let patients_service = service
            .initialise(test_author(), test_location())
            .expect("initialise should succeed");

        patients_service
            .update_profile(
                &test_author(),
                &test_location(),
                vec!["John".to_string(), "Paul".to_string()],
                "Smith",
                "1990-01-15",
                Some(EmailAddress::parse("john.smith@example.com").unwrap()),
            )
            .expect("update should succeed");

        let profile = patients_service.get().expect("should read profile");
        assert_eq!(profile.family, Some("Smith".to_string()));
        assert_eq!(profile.given, vec!["John".to_string(), "Paul".to_string()]);
        assert_eq!(profile.birth_date, Some("1990-01-15".to_string()));
        assert_eq!(
            profile.contact_email.as_ref().map(|e| e.as_str()),
            Some("john.smith@example.com")
        );
        assert_eq!(profile.display_name(), "John Paul Smith");
    }

    #[test]
    fn test_update_profile_rejects_malformed_birth_date() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let service = PatientsService::new(cfg);

        let patients_service = service
            .initialise(test_author(), test_location())
            .expect("initialise should succeed");

        let err = patients_service
            .update_profile(
                &test_author(),
                &test_location(),
                vec!["John".to_string()],
                "Smith",
                "15/01/1990",
                None,
            )
            .expect_err("update should fail");
        assert!(matches!(err, PortalError::InvalidInput(_)));
    }

    #[test]
    fn test_list_patients_returns_empty_for_nonexistent_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let service = PatientsService::new(cfg);

        let patients = service.list_patients();
        assert_eq!(patients.len(), 0, "should return empty list");
    }

    #[test]
    fn test_list_patients_returns_created_patients() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());

        // Create first patient
        let first = PatientsService::new(cfg.clone())
            .initialise(test_author(), test_location())
            .expect("initialise should succeed");
        first
            .update_profile(
                &test_author(),
                &test_location(),
                vec!["Alice".to_string()],
                "Smith",
                "1990-01-15",
                None,
            )
            .expect("update should succeed");

        // Create second patient
        let second = PatientsService::new(cfg.clone())
            .initialise(test_author(), test_location())
            .expect("initialise should succeed");
        second
            .update_profile(
                &test_author(),
                &test_location(),
                vec!["Bob".to_string()],
                "Jones",
                "1985-06-20",
                None,
            )
            .expect("update should succeed");

        // List all patients
        let patients = PatientsService::new(cfg).list_patients();

        assert_eq!(patients.len(), 2, "should return 2 patients");

        // Verify patient data (order not guaranteed)
        let alice = patients.iter().find(|p| p.given == vec!["Alice".to_string()]);
        let bob = patients.iter().find(|p| p.given == vec!["Bob".to_string()]);

        assert!(alice.is_some(), "should find Alice");
        assert!(bob.is_some(), "should find Bob");

        assert_eq!(alice.unwrap().family, Some("Smith".to_string()));
        assert_eq!(bob.unwrap().family, Some("Jones".to_string()));
    }

    #[test]
    fn test_list_patients_skips_invalid_json() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());

        // Create valid patient
        let valid = PatientsService::new(cfg.clone())
            .initialise(test_author(), test_location())
            .expect("initialise should succeed");
        valid
            .update_profile(
                &test_author(),
                &test_location(),
                vec!["Valid".to_string()],
                "Patient",
                "1990-01-15",
                None,
            )
            .expect("update should succeed");

        // Create invalid patient.json manually
        let rogue_uuid = ShardableUuid::new();
        let rogue_dir = record_dir_for(&cfg, &rogue_uuid);
        fs::create_dir_all(&rogue_dir).expect("should create directory");
        fs::write(rogue_dir.join(PATIENT_PROFILE_FILENAME), "{ not json").expect("should write");

        // List patients should skip the invalid one
        let patients = PatientsService::new(cfg).list_patients();

        assert_eq!(
            patients.len(),
            1,
            "should return only 1 valid patient, skipping invalid"
        );
        assert_eq!(patients[0].given, vec!["Valid".to_string()]);
    }
}
