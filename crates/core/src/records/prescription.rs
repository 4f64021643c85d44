//! Prescription entry wire model and status machine.
//!
//! A patient record keeps its prescriptions in a single `prescriptions.json` document,
//! structured like the appointment document: a record-typed wrapper around the ordered
//! list of entries.

use super::{parse_strict, render_wire};
use crate::{PortalError, PortalResult};
use careport_uuid::TimestampId;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a prescription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrescriptionStatus {
    /// Currently being taken.
    Active,
    /// Course finished.
    Completed,
    /// Ran past its duration without completion.
    Expired,
}

impl PrescriptionStatus {
    /// Convert to the wire string.
    pub fn to_wire(self) -> &'static str {
        match self {
            PrescriptionStatus::Active => "Active",
            PrescriptionStatus::Completed => "Completed",
            PrescriptionStatus::Expired => "Expired",
        }
    }

    /// Parse from the wire string.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "Active" => Some(PrescriptionStatus::Active),
            "Completed" => Some(PrescriptionStatus::Completed),
            "Expired" => Some(PrescriptionStatus::Expired),
            _ => None,
        }
    }

    /// Whether this status may move to `next`. Completed and Expired are terminal.
    pub fn can_transition_to(self, next: PrescriptionStatus) -> bool {
        use PrescriptionStatus::*;
        matches!((self, next), (Active, Completed) | (Active, Expired))
    }
}

impl std::fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_wire())
    }
}

impl std::str::FromStr for PrescriptionStatus {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrescriptionStatus::from_wire(s.trim())
            .ok_or_else(|| PortalError::InvalidInput(format!("unknown prescription status: '{s}'")))
    }
}

/// Domain-level carrier for one prescription entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrescriptionData {
    /// Entry id, chronological within the record.
    pub id: TimestampId,

    /// Diagnosis the prescription addresses.
    pub diagnosis: String,

    /// Medication name, including strength (e.g. "Amlodipine 5mg").
    pub medication: String,

    /// Dosage instruction (e.g. "Once daily").
    pub dosage: String,

    /// Course length in days.
    pub duration_days: u32,

    /// Name of the prescribing doctor.
    pub prescribed_by: String,

    /// Date the prescription was issued.
    pub issued_on: NaiveDate,

    /// Current lifecycle status.
    pub status: PrescriptionStatus,
}

impl PrescriptionData {
    /// The last date the course still covers.
    pub fn expires_on(&self) -> NaiveDate {
        self.issued_on + Duration::days(i64::from(self.duration_days))
    }

    /// Whether an Active course has run past its duration as of `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == PrescriptionStatus::Active && self.expires_on() < today
    }
}

/// Prescription document operations.
pub struct Prescriptions;

impl Prescriptions {
    /// Parse a patient's prescription document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError`] on schema mismatch, an unknown status, a malformed
    /// entry id or date, or a wrong recordType tag.
    pub fn parse(json_text: &str) -> PortalResult<Vec<PrescriptionData>> {
        let wire: PrescriptionsWire = parse_strict("Prescriptions", json_text)?;

        if wire.record_type != "Prescriptions" {
            return Err(PortalError::InvalidInput(format!(
                "Expected recordType 'Prescriptions', got '{}'",
                wire.record_type
            )));
        }

        wire.entries.into_iter().map(entry_to_domain).collect()
    }

    /// Render a patient's prescription document as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError`] if serialisation fails.
    pub fn render(entries: &[PrescriptionData]) -> PortalResult<String> {
        let wire = PrescriptionsWire {
            record_type: "Prescriptions".to_string(),
            entries: entries.iter().map(entry_to_wire).collect(),
        };
        render_wire("prescriptions", &wire)
    }
}

/// Wire representation of the prescription document.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct PrescriptionsWire {
    #[serde(rename = "recordType")]
    record_type: String,

    #[serde(default)]
    entries: Vec<PrescriptionWire>,
}

/// Wire representation of one prescription entry.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct PrescriptionWire {
    id: String,
    diagnosis: String,
    medication: String,
    dosage: String,
    #[serde(rename = "durationDays")]
    duration_days: u32,
    #[serde(rename = "prescribedBy")]
    prescribed_by: String,
    #[serde(rename = "issuedOn")]
    issued_on: String,
    status: String,
}

fn entry_to_domain(wire: PrescriptionWire) -> PortalResult<PrescriptionData> {
    let id: TimestampId = wire
        .id
        .parse()
        .map_err(|e| PortalError::Translation(format!("Invalid prescription id: {e}")))?;

    let issued_on = NaiveDate::parse_from_str(&wire.issued_on, "%Y-%m-%d")
        .map_err(|e| PortalError::Translation(format!("Invalid issuedOn date: {e}")))?;

    let status = PrescriptionStatus::from_wire(&wire.status).ok_or_else(|| {
        PortalError::Translation(format!("Unknown prescription status: '{}'", wire.status))
    })?;

    Ok(PrescriptionData {
        id,
        diagnosis: wire.diagnosis,
        medication: wire.medication,
        dosage: wire.dosage,
        duration_days: wire.duration_days,
        prescribed_by: wire.prescribed_by,
        issued_on,
        status,
    })
}

fn entry_to_wire(data: &PrescriptionData) -> PrescriptionWire {
    PrescriptionWire {
        id: data.id.to_string(),
        diagnosis: data.diagnosis.clone(),
        medication: data.medication.clone(),
        dosage: data.dosage.clone(),
        duration_days: data.duration_days,
        prescribed_by: data.prescribed_by.clone(),
        issued_on: data.issued_on.format("%Y-%m-%d").to_string(),
        status: data.status.to_wire().to_string(),
    }
}
