//! Appointment entry wire model and status machine.
//!
//! A patient record keeps its appointments in a single `appointments.json` document:
//! a record-typed wrapper around the ordered list of entries. Entry ids are
//! [`TimestampId`]s, so lexicographic id order is chronological booking order.

use super::{parse_strict, render_wire};
use crate::{PortalError, PortalResult};
use careport_uuid::TimestampId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an appointment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AppointmentStatus {
    /// Booked by the patient, awaiting confirmation.
    Scheduled,
    /// Confirmed by the doctor.
    Confirmed,
    /// The visit took place.
    Completed,
    /// Called off before completion.
    Cancelled,
}

impl AppointmentStatus {
    /// Convert to the wire string.
    pub fn to_wire(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "Scheduled",
            AppointmentStatus::Confirmed => "Confirmed",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }

    /// Parse from the wire string.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "Scheduled" => Some(AppointmentStatus::Scheduled),
            "Confirmed" => Some(AppointmentStatus::Confirmed),
            "Completed" => Some(AppointmentStatus::Completed),
            "Cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether this status may move to `next`.
    ///
    /// Completed and Cancelled are terminal.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Scheduled, Confirmed) | (Scheduled, Cancelled) | (Confirmed, Completed) | (Confirmed, Cancelled)
        )
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_wire())
    }
}

impl std::str::FromStr for AppointmentStatus {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppointmentStatus::from_wire(s.trim())
            .ok_or_else(|| PortalError::InvalidInput(format!("unknown appointment status: '{s}'")))
    }
}

/// Domain-level carrier for one appointment entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppointmentData {
    /// Entry id, chronological within the record.
    pub id: TimestampId,

    /// Name of the doctor the appointment is with.
    pub doctor: String,

    /// Appointment date.
    pub date: NaiveDate,

    /// Optional free-text reason for the visit.
    pub reason: Option<String>,

    /// Current lifecycle status.
    pub status: AppointmentStatus,

    /// When the appointment was booked.
    pub booked_at: DateTime<Utc>,
}

/// Appointment document operations.
pub struct Appointments;

impl Appointments {
    /// Parse a patient's appointment document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError`] on schema mismatch, an unknown status, a malformed
    /// entry id or date, or a wrong recordType tag.
    pub fn parse(json_text: &str) -> PortalResult<Vec<AppointmentData>> {
        let wire: AppointmentsWire = parse_strict("Appointments", json_text)?;

        if wire.record_type != "Appointments" {
            return Err(PortalError::InvalidInput(format!(
                "Expected recordType 'Appointments', got '{}'",
                wire.record_type
            )));
        }

        wire.entries.into_iter().map(entry_to_domain).collect()
    }

    /// Render a patient's appointment document as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError`] if serialisation fails.
    pub fn render(entries: &[AppointmentData]) -> PortalResult<String> {
        let wire = AppointmentsWire {
            record_type: "Appointments".to_string(),
            entries: entries.iter().map(entry_to_wire).collect(),
        };
        render_wire("appointments", &wire)
    }
}

/// Wire representation of the appointment document.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct AppointmentsWire {
    #[serde(rename = "recordType")]
    record_type: String,

    #[serde(default)]
    entries: Vec<AppointmentWire>,
}

/// Wire representation of one appointment entry.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct AppointmentWire {
    id: String,
    doctor: String,
    date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    status: String,
    #[serde(rename = "bookedAt")]
    booked_at: String,
}

fn entry_to_domain(wire: AppointmentWire) -> PortalResult<AppointmentData> {
    let id: TimestampId = wire
        .id
        .parse()
        .map_err(|e| PortalError::Translation(format!("Invalid appointment id: {e}")))?;

    let date = NaiveDate::parse_from_str(&wire.date, "%Y-%m-%d")
        .map_err(|e| PortalError::Translation(format!("Invalid appointment date: {e}")))?;

    let status = AppointmentStatus::from_wire(&wire.status).ok_or_else(|| {
        PortalError::Translation(format!("Unknown appointment status: '{}'", wire.status))
    })?;

    let booked_at = wire
        .booked_at
        .parse::<DateTime<Utc>>()
        .map_err(|e| PortalError::Translation(format!("Invalid bookedAt timestamp: {e}")))?;

    Ok(AppointmentData {
        id,
        doctor: wire.doctor,
        date,
        reason: wire.reason,
        status,
        booked_at,
    })
}

fn entry_to_wire(data: &AppointmentData) -> AppointmentWire {
    AppointmentWire {
        id: data.id.to_string(),
        doctor: data.doctor.clone(),
        date: data.date.format("%Y-%m-%d").to_string(),
        reason: data.reason.clone(),
        status: data.status.to_wire().to_string(),
        booked_at: data.booked_at.to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> AppointmentData {
        AppointmentData {
            id: TimestampId::generate(None),
            doctor: "Dr Emily Chen".into(),
            date: NaiveDate::from_ymd_opt(2026, 9, 14).unwrap(),
            reason: Some("Follow-up".into()),
            status: AppointmentStatus::Scheduled,
            booked_at: Utc::now(),
        }
    }

    #[test]
    fn round_trips_entries() {
        let entries = vec![sample_entry(), sample_entry()];
        let json = Appointments::render(&entries).expect("render");
        let reparsed = Appointments::parse(&json).expect("parse");

        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed[0].doctor, "Dr Emily Chen");
        assert_eq!(reparsed[0].status, AppointmentStatus::Scheduled);
        assert_eq!(reparsed[0].date, entries[0].date);
    }

    #[test]
    fn parses_empty_document() {
        let json = Appointments::render(&[]).expect("render");
        let reparsed = Appointments::parse(&json).expect("parse");
        assert!(reparsed.is_empty());
    }

    #[test]
    fn rejects_unknown_status() {
        let entries = vec![sample_entry()];
        let json = Appointments::render(&entries).expect("render");
        let broken = json.replace("\"Scheduled\"", "\"Postponed\"");

        let err = Appointments::parse(&broken).expect_err("should reject unknown status");
        assert!(matches!(err, PortalError::Translation(_)));
    }

    #[test]
    fn rejects_wrong_record_type() {
        let json = Appointments::render(&[]).expect("render");
        let broken = json.replace("\"Appointments\"", "\"Bookings\"");

        let err = Appointments::parse(&broken).expect_err("should reject recordType");
        assert!(matches!(err, PortalError::InvalidInput(_)));
    }

    #[test]
    fn status_transitions_follow_the_table() {
        use AppointmentStatus::*;

        assert!(Scheduled.can_transition_to(Confirmed));
        assert!(Scheduled.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Cancelled));

        assert!(!Scheduled.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Scheduled));
        assert!(!Confirmed.can_transition_to(Scheduled));
    }
}
