//! Prescription management within a patient record.
//!
//! Prescriptions are entries in the patient record's `prescriptions.json` document.
//! Issuing appends an entry with a monotonic [`TimestampId`]; status changes walk the
//! transition table in [`records::prescription`](crate::records::prescription). Every
//! mutation appends to the record's audit journal.

use super::helpers::record_dirs;
use super::patients::record_dir_for;
use crate::audit::{append_entry, AuditAction, AuditEntry};
use crate::config::CoreConfig;
use crate::constants::PRESCRIPTIONS_FILENAME;
use crate::error::{PortalError, PortalResult};
use crate::records::prescription::{PrescriptionData, PrescriptionStatus, Prescriptions};
use crate::validation::validate_positive_quantity;
use crate::{Author, NonEmptyText, PortalRole, ShardableUuid, TimestampId};
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// A new prescription to issue, before an id and status are assigned.
#[derive(Clone, Debug)]
pub struct NewPrescription {
    /// Diagnosis the prescription addresses.
    pub diagnosis: NonEmptyText,
    /// Medication name, including strength.
    pub medication: NonEmptyText,
    /// Dosage instruction.
    pub dosage: NonEmptyText,
    /// Course length in days; must be positive.
    pub duration_days: u32,
    /// Date the prescription is issued.
    pub issued_on: NaiveDate,
}

/// Service for managing the prescriptions of one patient record.
#[derive(Clone, Debug)]
pub struct PrescriptionsService {
    cfg: Arc<CoreConfig>,
    patient_id: ShardableUuid,
}

impl PrescriptionsService {
    /// Creates a prescriptions service for an existing patient record.
    pub fn new(cfg: Arc<CoreConfig>, patient_id: ShardableUuid) -> Self {
        Self { cfg, patient_id }
    }

    /// Creates a prescriptions service from a patient id string.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::Ident` if `patient_id` is not canonical.
    pub fn with_id(cfg: Arc<CoreConfig>, patient_id: &str) -> PortalResult<Self> {
        Ok(Self::new(cfg, ShardableUuid::parse(patient_id)?))
    }

    /// Returns the patient UUID this service operates on.
    pub fn patient_id(&self) -> &ShardableUuid {
        &self.patient_id
    }

    fn record_dir(&self) -> PathBuf {
        record_dir_for(&self.cfg, &self.patient_id)
    }

    fn load(&self) -> PortalResult<Vec<PrescriptionData>> {
        let path = self.record_dir().join(PRESCRIPTIONS_FILENAME);
        if !path.is_file() {
            return Err(PortalError::PatientNotFound(self.patient_id.to_string()));
        }

        let contents = fs::read_to_string(&path).map_err(PortalError::FileRead)?;
        Prescriptions::parse(&contents)
    }

    fn store(&self, entries: &[PrescriptionData]) -> PortalResult<()> {
        let raw = Prescriptions::render(entries)?;
        fs::write(self.record_dir().join(PRESCRIPTIONS_FILENAME), raw)
            .map_err(PortalError::FileWrite)
    }

    /// Issues a new prescription for this patient.
    ///
    /// The prescription records the issuing author's name as its prescriber, so the
    /// author must be acting in the doctor role; anything else would produce an entry
    /// whose prescriber is not a prescriber. New prescriptions start `Active`.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::InvalidInput` for a non-doctor author or a zero duration,
    /// `PortalError::PatientNotFound` if the record does not exist, or a read/write error.
    pub fn issue(
        &self,
        author: &Author,
        location: &NonEmptyText,
        new: NewPrescription,
    ) -> PortalResult<PrescriptionData> {
        if author.role != PortalRole::Doctor {
            return Err(PortalError::InvalidInput(format!(
                "prescriptions must be issued by a doctor, got role '{}'",
                author.role
            )));
        }
        validate_positive_quantity("duration_days", new.duration_days)?;

        let mut entries = self.load()?;

        let id = TimestampId::generate(entries.last().map(|e| &e.id));
        let prescription = PrescriptionData {
            id,
            diagnosis: new.diagnosis.as_str().to_owned(),
            medication: new.medication.as_str().to_owned(),
            dosage: new.dosage.as_str().to_owned(),
            duration_days: new.duration_days,
            prescribed_by: author.name.as_str().to_owned(),
            issued_on: new.issued_on,
            status: PrescriptionStatus::Active,
        };

        entries.push(prescription.clone());
        self.store(&entries)?;

        let entry = AuditEntry::new(
            &self.cfg,
            AuditAction::Create,
            format!(
                "Prescription issued: {} for {}",
                prescription.medication, prescription.diagnosis
            ),
            author,
            location,
        );
        append_entry(&self.record_dir(), &entry)?;

        Ok(prescription)
    }

    /// Lists this patient's prescriptions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `PortalError` if the patient record does not exist or the document is corrupt.
    pub fn list(&self) -> PortalResult<Vec<PrescriptionData>> {
        self.load()
    }

    /// Moves a prescription to `new_status`, enforcing the transition table.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::PrescriptionNotFound` for an unknown entry id and
    /// `PortalError::InvalidStatusTransition` for a move the table forbids.
    pub fn update_status(
        &self,
        author: &Author,
        location: &NonEmptyText,
        prescription_id: &str,
        new_status: PrescriptionStatus,
    ) -> PortalResult<PrescriptionData> {
        let mut entries = self.load()?;

        let entry = entries
            .iter_mut()
            .find(|e| e.id.to_string() == prescription_id)
            .ok_or_else(|| PortalError::PrescriptionNotFound(prescription_id.to_string()))?;

        if !entry.status.can_transition_to(new_status) {
            return Err(PortalError::InvalidStatusTransition {
                from: entry.status.to_wire().to_string(),
                to: new_status.to_wire().to_string(),
            });
        }

        let previous = entry.status;
        entry.status = new_status;
        let updated = entry.clone();

        self.store(&entries)?;

        let audit = AuditEntry::new(
            &self.cfg,
            AuditAction::Status,
            format!("Prescription {} -> {}", previous, new_status),
            author,
            location,
        );
        append_entry(&self.record_dir(), &audit)?;

        Ok(updated)
    }

    /// Expires every Active prescription whose course ran out before `today`.
    ///
    /// Returns the number of entries that were moved to `Expired`. Writes the document
    /// and one audit entry only when something actually changed.
    ///
    /// # Errors
    ///
    /// Returns `PortalError` if the patient record does not exist or a read/write fails.
    pub fn mark_expired_as_of(
        &self,
        author: &Author,
        location: &NonEmptyText,
        today: NaiveDate,
    ) -> PortalResult<usize> {
        let mut entries = self.load()?;

        let mut expired = 0usize;
        for entry in entries.iter_mut() {
            if entry.is_overdue(today) {
                entry.status = PrescriptionStatus::Expired;
                expired += 1;
            }
        }

        if expired == 0 {
            return Ok(0);
        }

        self.store(&entries)?;

        let audit = AuditEntry::new(
            &self.cfg,
            AuditAction::Status,
            format!("{expired} prescription(s) expired as of {today}"),
            author,
            location,
        );
        append_entry(&self.record_dir(), &audit)?;

        Ok(expired)
    }
}

/// Lists prescriptions across all patient records.
///
/// Walks the sharded patient store and returns `(patient_id, prescription)` pairs.
/// Records whose prescription document cannot be read or parsed are logged as warnings
/// and skipped.
pub fn list_all_prescriptions(cfg: &CoreConfig) -> Vec<(ShardableUuid, PrescriptionData)> {
    let mut all = Vec::new();

    for record_dir in record_dirs(&cfg.patients_dir()) {
        let Some(patient_id) = record_dir
            .file_name()
            .and_then(|os| os.to_str())
            .and_then(|s| ShardableUuid::parse(s).ok())
        else {
            continue;
        };

        let path = record_dir.join(PRESCRIPTIONS_FILENAME);
        if !path.is_file() {
            continue;
        }

        match fs::read_to_string(&path) {
            Ok(contents) => match Prescriptions::parse(&contents) {
                Ok(entries) => {
                    all.extend(entries.into_iter().map(|e| (patient_id.clone(), e)));
                }
                Err(e) => {
                    tracing::warn!("failed to parse prescriptions: {} - {}", path.display(), e);
                }
            },
            Err(e) => {
                tracing::warn!("failed to read prescriptions: {} - {}", path.display(), e);
            }
        }
    }

    all
}
