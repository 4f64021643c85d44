//! Patient profile wire model and translation helpers.
//!
//! The profile is the identifying document of a patient record: names, birth date and
//! contact email. It says nothing about appointments or prescriptions; those are
//! separate entry files in the same record directory.
//!
//! Responsibilities:
//! - Define the public domain-level type for service and API use
//! - Define a strict wire model for serialisation/deserialisation
//! - Provide translation helpers between domain primitives and the wire model
//! - Validate profile structure and enforce the record type tag

use super::{parse_strict, render_wire};
use crate::{EmailAddress, PortalError, PortalResult};
use careport_uuid::ShardableUuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Domain-level carrier for a patient profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientProfileData {
    /// Unique identifier for this patient record.
    pub id: ShardableUuid,

    /// Given names (first name, middle names).
    pub given: Vec<String>,

    /// Family name (surname).
    pub family: Option<String>,

    /// Date of birth (ISO 8601 date format: YYYY-MM-DD).
    pub birth_date: Option<String>,

    /// Contact email address for portal notifications.
    pub contact_email: Option<EmailAddress>,

    /// Last updated timestamp.
    pub last_updated: Option<DateTime<Utc>>,
}

impl PatientProfileData {
    /// An empty profile for a freshly allocated record.
    pub fn empty(id: ShardableUuid, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            given: vec![],
            family: None,
            birth_date: None,
            contact_email: None,
            last_updated: Some(created_at),
        }
    }

    /// Display name in "Given Family" order; empty profile renders as the empty string.
    pub fn display_name(&self) -> String {
        let mut parts: Vec<&str> = self.given.iter().map(String::as_str).collect();
        if let Some(family) = self.family.as_deref() {
            parts.push(family);
        }
        parts.join(" ")
    }
}

/// Patient profile operations.
///
/// This is a zero-sized type used for namespacing profile-related operations.
/// All methods are associated functions.
pub struct PatientProfile;

impl PatientProfile {
    /// Parse a patient profile from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError`] if:
    /// - the JSON does not match the wire schema (unknown keys, wrong types),
    /// - the id is not a canonical UUID,
    /// - recordType is not "PatientProfile".
    pub fn parse(json_text: &str) -> PortalResult<PatientProfileData> {
        let wire: PatientProfileWire = parse_strict("Patient profile", json_text)?;

        if wire.record_type != "PatientProfile" {
            return Err(PortalError::InvalidInput(format!(
                "Expected recordType 'PatientProfile', got '{}'",
                wire.record_type
            )));
        }

        wire_to_domain(wire)
    }

    /// Render a patient profile as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError`] if serialisation fails.
    pub fn render(data: &PatientProfileData) -> PortalResult<String> {
        render_wire("patient profile", &domain_to_wire(data))
    }
}

/// Wire representation of a patient profile for on-disk JSON.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct PatientProfileWire {
    #[serde(rename = "recordType")]
    record_type: String,

    id: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    given: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    family: Option<String>,

    #[serde(rename = "birthDate", skip_serializing_if = "Option::is_none")]
    birth_date: Option<String>,

    #[serde(rename = "contactEmail", skip_serializing_if = "Option::is_none")]
    contact_email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<ProfileMetaWire>,
}

/// Wire representation of profile metadata.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct ProfileMetaWire {
    #[serde(rename = "lastUpdated", skip_serializing_if = "Option::is_none")]
    last_updated: Option<String>,
}

fn wire_to_domain(wire: PatientProfileWire) -> PortalResult<PatientProfileData> {
    let id = ShardableUuid::parse(&wire.id)
        .map_err(|e| PortalError::Translation(format!("Invalid patient id: {e}")))?;

    let contact_email = wire
        .contact_email
        .as_deref()
        .map(EmailAddress::parse)
        .transpose()
        .map_err(|e| PortalError::Translation(format!("Invalid contact email: {e}")))?;

    let last_updated = wire
        .meta
        .and_then(|m| m.last_updated)
        .and_then(|s| s.parse::<DateTime<Utc>>().ok());

    Ok(PatientProfileData {
        id,
        given: wire.given,
        family: wire.family,
        birth_date: wire.birth_date,
        contact_email,
        last_updated,
    })
}

fn domain_to_wire(data: &PatientProfileData) -> PatientProfileWire {
    PatientProfileWire {
        record_type: "PatientProfile".to_string(),
        id: data.id.to_string(),
        given: data.given.clone(),
        family: data.family.clone(),
        birth_date: data.birth_date.clone(),
        contact_email: data.contact_email.as_ref().map(|e| e.as_str().to_owned()),
        meta: data.last_updated.map(|lu| ProfileMetaWire {
            last_updated: Some(lu.to_rfc3339()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_sample_json() {
        let input = r#"{
  "recordType": "PatientProfile",
  "id": "90a8d1ea318041d9adb070a834d4e0f6",
  "given": ["Sarah", "Jane"],
  "family": "Williams",
  "birthDate": "1992-03-20",
  "contactEmail": "sarah.williams@example.com",
  "meta": { "lastUpdated": "2026-01-23T13:58:04.099304Z" }
}
"#;

        let profile = PatientProfile::parse(input).expect("parse json");
        let output = PatientProfile::render(&profile).expect("render profile");
        let reparsed = PatientProfile::parse(&output).expect("reparse json");
        assert_eq!(profile, reparsed);
    }

    #[test]
    fn strict_validation_rejects_unknown_keys() {
        let input = r#"{
  "recordType": "PatientProfile",
  "id": "90a8d1ea318041d9adb070a834d4e0f6",
  "unexpected_key": "should_fail"
}
"#;

        let err = PatientProfile::parse(input).expect_err("should reject unknown key");
        match err {
            PortalError::Translation(msg) => {
                assert!(msg.contains("unexpected_key"));
            }
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn strict_validation_rejects_wrong_types() {
        let input = r#"{
  "recordType": "PatientProfile",
  "id": "90a8d1ea318041d9adb070a834d4e0f6",
  "given": "not_an_array"
}
"#;

        let err = PatientProfile::parse(input).expect_err("should reject wrong type");
        match err {
            PortalError::Translation(msg) => {
                assert!(msg.contains("given"));
            }
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_record_type() {
        let input = r#"{
  "recordType": "NotAProfile",
  "id": "90a8d1ea318041d9adb070a834d4e0f6"
}
"#;

        let err = PatientProfile::parse(input).expect_err("should reject invalid recordType");
        match err {
            PortalError::InvalidInput(msg) => {
                assert!(msg.contains("PatientProfile"));
                assert!(msg.contains("NotAProfile"));
            }
            other => panic!("expected InvalidInput error, got {other:?}"),
        }
    }

    #[test]
    fn parses_minimal_valid_profile() {
        let input = r#"{
  "recordType": "PatientProfile",
  "id": "90a8d1ea318041d9adb070a834d4e0f6"
}
"#;

        let result = PatientProfile::parse(input).expect("should parse minimal profile");
        assert_eq!(result.id.to_string(), "90a8d1ea318041d9adb070a834d4e0f6");
        assert!(result.given.is_empty());
        assert!(result.family.is_none());
        assert!(result.birth_date.is_none());
        assert!(result.contact_email.is_none());
        assert!(result.last_updated.is_none());
    }

    #[test]
    fn rejects_invalid_contact_email() {
        let input = r#"{
  "recordType": "PatientProfile",
  "id": "90a8d1ea318041d9adb070a834d4e0f6",
  "contactEmail": "not-an-email"
}
"#;

        let err = PatientProfile::parse(input).expect_err("should reject bad email");
        assert!(matches!(err, PortalError::Translation(_)));
    }

    #[test]
    fn display_name_joins_given_and_family() {
        let data = PatientProfileData {
            id: ShardableUuid::parse("90a8d1ea318041d9adb070a834d4e0f6").unwrap(),
            given: vec!["Sarah".into(), "Jane".into()],
            family: Some("Williams".into()),
            birth_date: None,
            contact_email: None,
            last_updated: None,
        };
        assert_eq!(data.display_name(), "Sarah Jane Williams");

        let empty = PatientProfileData::empty(data.id.clone(), Utc::now());
        assert_eq!(empty.display_name(), "");
    }
}
