//! Appointment management within a patient record.
//!
//! Appointments are entries in the patient record's `appointments.json` document.
//! Booking appends an entry with a monotonic [`TimestampId`]; status changes walk the
//! transition table in [`records::appointment`](crate::records::appointment). Every
//! mutation appends to the record's audit journal.

use super::helpers::record_dirs;
use super::patients::record_dir_for;
use crate::audit::{append_entry, AuditAction, AuditEntry};
use crate::config::CoreConfig;
use crate::constants::APPOINTMENTS_FILENAME;
use crate::error::{PortalError, PortalResult};
use crate::records::appointment::{AppointmentData, AppointmentStatus, Appointments};
use crate::{Author, NonEmptyText, ShardableUuid, TimestampId};
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Service for managing the appointments of one patient record.
#[derive(Clone, Debug)]
pub struct AppointmentsService {
    cfg: Arc<CoreConfig>,
    patient_id: ShardableUuid,
}

impl AppointmentsService {
    /// Creates an appointments service for an existing patient record.
    pub fn new(cfg: Arc<CoreConfig>, patient_id: ShardableUuid) -> Self {
        Self { cfg, patient_id }
    }

    /// Creates an appointments service from a patient id string.
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

    fn load(&self) -> PortalResult<Vec<AppointmentData>> {
        let path = self.record_dir().join(APPOINTMENTS_FILENAME);
        if !path.is_file() {
            return Err(PortalError::PatientNotFound(self.patient_id.to_string()));
        }

        let contents = fs::read_to_string(&path).map_err(PortalError::FileRead)?;
        Appointments::parse(&contents)
    }

    fn store(&self, entries: &[AppointmentData]) -> PortalResult<()> {
        let raw = Appointments::render(entries)?;
        fs::write(self.record_dir().join(APPOINTMENTS_FILENAME), raw)
            .map_err(PortalError::FileWrite)
    }

    /// Books a new appointment for this patient.
    ///
    /// The entry id is generated against the last entry in the document, so ids stay
    /// chronologically ordered even under clock skew. New appointments start
    /// `Scheduled`.
    ///
    /// # Errors
    ///
    /// Returns `PortalError` if the patient record does not exist or a read/write fails.
    pub fn book(
        &self,
        author: &Author,
        location: &NonEmptyText,
        doctor: NonEmptyText,
        date: NaiveDate,
        reason: Option<String>,
    ) -> PortalResult<AppointmentData> {
        let mut entries = self.load()?;

        let id = TimestampId::generate(entries.last().map(|e| &e.id));
        let appointment = AppointmentData {
            booked_at: id.timestamp(),
            id,
            doctor: doctor.as_str().to_owned(),
            date,
            reason,
            status: AppointmentStatus::Scheduled,
        };

        entries.push(appointment.clone());
        self.store(&entries)?;

        let entry = AuditEntry::new(
            &self.cfg,
            AuditAction::Create,
            format!("Appointment booked with {} on {}", appointment.doctor, date),
            author,
            location,
        );
        append_entry(&self.record_dir(), &entry)?;

        Ok(appointment)
    }

    /// Lists this patient's appointments, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `PortalError` if the patient record does not exist or the document is corrupt.
    pub fn list(&self) -> PortalResult<Vec<AppointmentData>> {
        self.load()
    }

    /// Lists this patient's appointments falling on `today`.
    ///
    /// # Errors
    ///
    /// Returns `PortalError` if the patient record does not exist or the document is corrupt.
    pub fn list_today(&self, today: NaiveDate) -> PortalResult<Vec<AppointmentData>> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|a| a.date == today)
            .collect())
    }

    /// Moves an appointment to `new_status`, enforcing the transition table.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::AppointmentNotFound` for an unknown entry id and
    /// `PortalError::InvalidStatusTransition` for a move the table forbids.
    pub fn update_status(
        &self,
        author: &Author,
        location: &NonEmptyText,
        appointment_id: &str,
        new_status: AppointmentStatus,
    ) -> PortalResult<AppointmentData> {
        let mut entries = self.load()?;

        let entry = entries
            .iter_mut()
            .find(|e| e.id.to_string() == appointment_id)
            .ok_or_else(|| PortalError::AppointmentNotFound(appointment_id.to_string()))?;

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

        let action = if new_status == AppointmentStatus::Cancelled {
            AuditAction::Cancel
        } else {
            AuditAction::Status
        };
        let audit = AuditEntry::new(
            &self.cfg,
            action,
            format!("Appointment {} -> {}", previous, new_status),
            author,
            location,
        );
        append_entry(&self.record_dir(), &audit)?;

        Ok(updated)
    }

    /// Cancels an appointment. Equivalent to a status update to `Cancelled`.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::InvalidStatusTransition` for appointments already
    /// completed or cancelled.
    pub fn cancel(
        &self,
        author: &Author,
        location: &NonEmptyText,
        appointment_id: &str,
    ) -> PortalResult<AppointmentData> {
        self.update_status(author, location, appointment_id, AppointmentStatus::Cancelled)
    }
}

/// Lists appointments across all patient records (the doctor's view).
///
/// Walks the sharded patient store and returns `(patient_id, appointment)` pairs.
/// Records whose appointment document cannot be read or parsed are logged as warnings
/// and skipped.
pub fn list_all_appointments(cfg: &CoreConfig) -> Vec<(ShardableUuid, AppointmentData)> {
    let mut all = Vec::new();

    for record_dir in record_dirs(&cfg.patients_dir()) {
        let Some(patient_id) = record_dir
            .file_name()
            .and_then(|os| os.to_str())
            .and_then(|s| ShardableUuid::parse(s).ok())
        else {
            continue;
        };

        let path = record_dir.join(APPOINTMENTS_FILENAME);
        if !path.is_file() {
            continue;
        }

        match fs::read_to_string(&path) {
            Ok(contents) => match Appointments::parse(&contents) {
                Ok(entries) => {
                    all.extend(entries.into_iter().map(|e| (patient_id.clone(), e)));
                }
                Err(e) => {
                    tracing::warn!("failed to parse appointments: {} - {}", path.display(), e);
                }
            },
            Err(e) => {
                tracing::warn!("failed to read appointments: {} - {}", path.display(), e);
            }
        }
    }

    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::patients::PatientsService;
    use crate::{EmailAddress, PortalRole};
    use std::path::Path;
    use tempfile::TempDir;

    fn test_author() -> Author {
        Author {
            name: NonEmptyText::new("Dr Emily Chen").unwrap(),
            role: PortalRole::Doctor,
            email: EmailAddress::parse("e.chen@example.com").unwrap(),
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

    fn new_patient(cfg: Arc<CoreConfig>) -> ShardableUuid {
        PatientsService::new(cfg)
            .initialise(test_author(), test_location())
            .expect("initialise should succeed")
            .patient_id()
            .clone()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_book_appends_scheduled_entry() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let patient_id = new_patient(cfg.clone());
        let service = AppointmentsService::new(cfg, patient_id);

        let appointment = service
            .book(
                &test_author(),
                &test_location(),
                NonEmptyText::new("Dr Emily Chen").unwrap(),
                date(2026, 9, 14),
                Some("Follow-up".into()),
            )
            .expect("book should succeed");

        assert_eq!(appointment.status, AppointmentStatus::Scheduled);
        assert_eq!(appointment.doctor, "Dr Emily Chen");

        let listed = service.list().expect("list should succeed");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], appointment);
    }

    #[test]
    fn test_book_requires_existing_patient() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let service = AppointmentsService::new(cfg, ShardableUuid::new());

        let err = service
            .book(
                &test_author(),
                &test_location(),
                NonEmptyText::new("Dr Emily Chen").unwrap(),
                date(2026, 9, 14),
                None,
            )
            .expect_err("book should fail");
        assert!(matches!(err, PortalError::PatientNotFound(_)));
    }

    #[test]
    fn test_entry_ids_stay_chronological() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let patient_id = new_patient(cfg.clone());
        let service = AppointmentsService::new(cfg, patient_id);

        let first = service
            .book(
                &test_author(),
                &test_location(),
                NonEmptyText::new("Dr A").unwrap(),
                date(2026, 9, 14),
                None,
            )
            .expect("book should succeed");
        let second = service
            .book(
                &test_author(),
                &test_location(),
                NonEmptyText::new("Dr B").unwrap(),
                date(2026, 9, 15),
                None,
            )
            .expect("book should succeed");

        assert!(second.id.timestamp() > first.id.timestamp());
        assert!(second.id.to_string() > first.id.to_string());
    }

    #[test]
    fn test_list_today_filters_by_date() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let patient_id = new_patient(cfg.clone());
        let service = AppointmentsService::new(cfg, patient_id);

        service
            .book(
                &test_author(),
                &test_location(),
                NonEmptyText::new("Dr A").unwrap(),
                date(2026, 9, 14),
                None,
            )
            .expect("book should succeed");
        service
            .book(
                &test_author(),
                &test_location(),
                NonEmptyText::new("Dr B").unwrap(),
                date(2026, 9, 15),
                None,
            )
            .expect("book should succeed");

        let today = service
            .list_today(date(2026, 9, 15))
            .expect("list_today should succeed");
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].doctor, "Dr B");
    }

    #[test]
    fn test_status_walk_and_illegal_transition() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let patient_id = new_patient(cfg.clone());
        let service = AppointmentsService::new(cfg, patient_id);

        let appointment = service
            .book(
                &test_author(),
                &test_location(),
                NonEmptyText::new("Dr A").unwrap(),
                date(2026, 9, 14),
                None,
            )
            .expect("book should succeed");
        let id = appointment.id.to_string();

        // Scheduled -> Completed skips confirmation and must be rejected.
        let err = service
            .update_status(
                &test_author(),
                &test_location(),
                &id,
                AppointmentStatus::Completed,
            )
            .expect_err("should reject");
        assert!(matches!(err, PortalError::InvalidStatusTransition { .. }));

        let confirmed = service
            .update_status(
                &test_author(),
                &test_location(),
                &id,
                AppointmentStatus::Confirmed,
            )
            .expect("confirm should succeed");
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

        let completed = service
            .update_status(
                &test_author(),
                &test_location(),
                &id,
                AppointmentStatus::Completed,
            )
            .expect("complete should succeed");
        assert_eq!(completed.status, AppointmentStatus::Completed);

        // Terminal state: cancellation is no longer possible.
        let err = service
            .cancel(&test_author(), &test_location(), &id)
            .expect_err("should reject");
        assert!(matches!(err, PortalError::InvalidStatusTransition { .. }));
    }

    #[test]
    fn test_update_status_reports_unknown_entry() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let patient_id = new_patient(cfg.clone());
        let service = AppointmentsService::new(cfg, patient_id);

        let missing = TimestampId::generate(None).to_string();
        let err = service
            .update_status(
                &test_author(),
                &test_location(),
                &missing,
                AppointmentStatus::Confirmed,
            )
            .expect_err("should fail");
        assert!(matches!(err, PortalError::AppointmentNotFound(_)));
    }

    #[test]
    fn test_list_all_appointments_spans_patients() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());

        let first_patient = new_patient(cfg.clone());
        let second_patient = new_patient(cfg.clone());

        AppointmentsService::new(cfg.clone(), first_patient.clone())
            .book(
                &test_author(),
                &test_location(),
                NonEmptyText::new("Dr A").unwrap(),
                date(2026, 9, 14),
                None,
            )
            .expect("book should succeed");
        AppointmentsService::new(cfg.clone(), second_patient.clone())
            .book(
                &test_author(),
                &test_location(),
                NonEmptyText::new("Dr B").unwrap(),
                date(2026, 9, 15),
                None,
            )
            .expect("book should succeed");

        let all = list_all_appointments(&cfg);
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|(p, _)| *p == first_patient));
        assert!(all.iter().any(|(p, _)| *p == second_patient));
    }
}
