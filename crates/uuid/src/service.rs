//! Internal implementation of the identifier types.
//!
//! This module contains the implementation details for UUID and timestamp-based
//! unique identifiers used throughout the CarePort system.

use crate::{IdentError, IdentResult};
use chrono::{DateTime, Duration, DurationRound, Utc};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// CarePort's canonical UUID representation (32 lowercase hex characters, no hyphens).
///
/// This wrapper type guarantees that once constructed, the contained UUID is in CarePort's
/// canonical format. It provides type safety for UUID operations and ensures consistent
/// path derivation across the system.
///
/// # When to use this type
/// Use this wrapper whenever you are:
/// - Accepting a UUID string from *outside* the core (CLI input, API request, etc), or
/// - Deriving a sharded storage path for a patient or order record.
/// - Generating new record identifiers.
///
/// Once you have a `ShardableUuid`, you can safely assume the internal UUID is valid
/// and in canonical form.
///
/// # Construction
/// - [`ShardableUuid::new`] generates a new canonical UUID (for new records).
/// - [`ShardableUuid::parse`] validates an externally supplied identifier.
///
/// # Errors
/// [`ShardableUuid::parse`] returns [`IdentError::InvalidInput`] if the input is not already
/// canonical.
///
/// # Display format
/// When displayed or converted to string, `ShardableUuid` always produces the canonical
/// 32-character lowercase hex format without hyphens.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShardableUuid(Uuid);

impl Default for ShardableUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl ShardableUuid {
    /// Generates a new UUID in CarePort's canonical form.
    ///
    /// This is suitable for allocating a fresh identifier during record creation.
    /// The generated UUID is cryptographically secure and follows RFC 4122 version 4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses a UUID string that must already be in CarePort's canonical form.
    ///
    /// This does **not** normalise other common UUID forms (for example, hyphenated or uppercase).
    /// Callers must provide the canonical representation. This strict validation ensures
    /// consistency and prevents issues with different UUID representations.
    ///
    /// # Arguments
    ///
    /// * `input` - UUID string to validate and wrap. Must be exactly 32 lowercase hex characters.
    ///
    /// # Errors
    ///
    /// Returns [`IdentError::InvalidInput`] if `input` is not in canonical form.
    pub fn parse(input: &str) -> IdentResult<Self> {
        if Self::is_canonical(input) {
            // SAFETY: is_canonical guarantees valid hex, so parse_str will succeed
            let uuid = Uuid::parse_str(input).expect("is_canonical guarantees valid UUID");
            return Ok(Self(uuid));
        }
        Err(IdentError::InvalidInput(format!(
            "UUID must be 32 lowercase hex characters without hyphens, got: '{}'",
            input
        )))
    }

    /// Returns the UUID as a `uuid::Uuid`.
    ///
    /// This method provides access to the underlying `uuid::Uuid` for operations
    /// that require the standard UUID library interface.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is in CarePort's canonical UUID form.
    ///
    /// This is a purely syntactic check that validates:
    /// - Exactly 32 bytes long
    /// - Contains only lowercase hex characters (`0-9` and `a-f`)
    ///
    /// This method is fast and can be used for pre-validation before calling [`parse`].
    ///
    /// [`parse`]: ShardableUuid::parse
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Returns `parent_dir/<s1>/<s2>/<uuid>/` where `s1`/`s2` are derived from this UUID.
    ///
    /// This implements CarePort's sharding scheme:
    /// - `s1` is the first two hex characters of the UUID
    /// - `s2` is the next two hex characters
    /// - The full UUID forms the leaf directory
    ///
    /// This sharding prevents filesystem performance issues with large numbers of record
    /// directories in a single location.
    ///
    /// # Arguments
    ///
    /// * `parent_dir` - Base directory under which to shard the UUID.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let canonical = self.0.simple().to_string();
        let s1 = &canonical[0..2];
        let s2 = &canonical[2..4];
        parent_dir.join(s1).join(s2).join(&canonical)
    }
}

impl fmt::Display for ShardableUuid {
    /// Formats the UUID in canonical form (32 lowercase hex characters, no hyphens).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Display in canonical (simple) form
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for ShardableUuid {
    type Err = IdentError;

    /// Parses a string into a `ShardableUuid`, requiring canonical form.
    ///
    /// This is equivalent to calling [`ShardableUuid::parse`].
    ///
    /// # Errors
    ///
    /// Returns [`IdentError::InvalidInput`] if the string is not in canonical UUID form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShardableUuid::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ShardableUuid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ShardableUuid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ShardableUuid::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A time-prefixed entry identifier.
///
/// Format:
/// `YYYYMMDDTHHMMSS.mmmZ-<canonical_uuid>`
///
/// Example:
/// `20260111T143522.045Z-550e8400e29b41d4a716446655440000`
///
/// This identifier is:
/// - Globally unique (UUID)
/// - Human-readable
/// - Monotonic per record when generated against the previous entry id
///
/// # Monotonicity Guarantee
///
/// When calling [`TimestampId::generate`] with the previous id,
/// the timestamp is guaranteed to be strictly greater than the previous one
/// (incremented by at least 1ms if necessary). This ensures correct ordering
/// of entries within a record.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TimestampId {
    timestamp: DateTime<Utc>,
    uuid: ShardableUuid,
}

impl TimestampId {
    /// Returns the timestamp component of this entry id.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns a reference to the UUID component of this entry id.
    pub fn uuid(&self) -> &ShardableUuid {
        &self.uuid
    }

    /// Generate a new entry id.
    ///
    /// The timestamp is truncated to millisecond precision, the resolution of the
    /// id's canonical string form, so an id always round-trips through its string
    /// representation unchanged.
    ///
    /// If `last_id` is provided, the timestamp is guaranteed to be
    /// strictly greater than the last one (by at least 1 ms).
    pub fn generate(last_id: Option<&TimestampId>) -> Self {
        let now = Utc::now();
        let now = now
            .duration_trunc(Duration::milliseconds(1))
            .unwrap_or(now);

        let timestamp = match last_id {
            Some(prev) if now <= prev.timestamp => prev.timestamp + Duration::milliseconds(1),
            _ => now,
        };

        Self {
            timestamp,
            uuid: ShardableUuid::new(),
        }
    }

    /// Generate a new entry id, parsing the previous one from its string form.
    ///
    /// # Errors
    ///
    /// Returns [`IdentError::InvalidInput`] if `last_id` does not parse as a [`TimestampId`].
    pub fn generate_from_str(last_id: Option<&str>) -> IdentResult<Self> {
        let parsed = match last_id {
            Some(s) => Some(TimestampId::from_str(s)?),
            None => None,
        };

        Ok(Self::generate(parsed.as_ref()))
    }
}

impl FromStr for TimestampId {
    type Err = IdentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ts_str, uuid_str) = s.split_once('-').ok_or_else(|| {
            IdentError::InvalidInput(format!("Invalid entry id format: '{}'", s))
        })?;

        // Parse the timestamp portion (without the Z suffix)
        if !ts_str.ends_with('Z') {
            return Err(IdentError::InvalidInput(format!(
                "Timestamp must end with 'Z': '{}'",
                ts_str
            )));
        }

        let ts_no_z = &ts_str[..ts_str.len() - 1];
        let naive =
            chrono::NaiveDateTime::parse_from_str(ts_no_z, "%Y%m%dT%H%M%S%.3f").map_err(|e| {
                IdentError::InvalidInput(format!("Invalid timestamp format '{}': {}", ts_str, e))
            })?;

        let timestamp = DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc);

        let uuid = ShardableUuid::parse(uuid_str)?;

        Ok(Self { timestamp, uuid })
    }
}

impl fmt::Display for TimestampId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.timestamp.format("%Y%m%dT%H%M%S%.3fZ"),
            self.uuid
        )
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for TimestampId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for TimestampId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        TimestampId::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_valid_uuid() {
        let id = ShardableUuid::new();
        let canonical = id.to_string();

        // Verify the generated UUID is in canonical form
        assert_eq!(canonical.len(), 32);
        assert!(ShardableUuid::is_canonical(&canonical));
    }

    #[test]
    fn test_parse_valid_canonical_uuid() {
        let canonical = "550e8400e29b41d4a716446655440000";
        let result = ShardableUuid::parse(canonical);

        assert!(result.is_ok());
        assert_eq!(result.unwrap().to_string(), canonical);
    }

    #[test]
    fn test_parse_rejects_hyphenated_uuid() {
        let hyphenated = "550e8400-e29b-41d4-a716-446655440000";
        let result = ShardableUuid::parse(hyphenated);

        assert!(result.is_err());
        match result {
            Err(IdentError::InvalidInput(msg)) => {
                assert!(msg.contains("32 lowercase hex characters"));
            }
            _ => panic!("Expected InvalidInput error"),
        }
    }

    #[test]
    fn test_parse_rejects_uppercase_uuid() {
        let uppercase = "550E8400E29B41D4A716446655440000";
        assert!(ShardableUuid::parse(uppercase).is_err());
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        let short = "550e8400e29b41d4a71644665544000";
        let long = "550e8400e29b41d4a7164466554400000";
        assert!(ShardableUuid::parse(short).is_err());
        assert!(ShardableUuid::parse(long).is_err());
    }

    #[test]
    fn test_parse_rejects_invalid_characters() {
        let invalid = "550e8400e29b41d4a716446655440zzz";
        assert!(ShardableUuid::parse(invalid).is_err());
    }

    #[test]
    fn test_is_canonical_valid() {
        assert!(ShardableUuid::is_canonical(
            "550e8400e29b41d4a716446655440000"
        ));
        assert!(ShardableUuid::is_canonical(
            "00000000000000000000000000000000"
        ));
        assert!(ShardableUuid::is_canonical(
            "ffffffffffffffffffffffffffffffff"
        ));
    }

    #[test]
    fn test_is_canonical_invalid() {
        // Uppercase
        assert!(!ShardableUuid::is_canonical(
            "550E8400E29B41D4A716446655440000"
        ));

        // Hyphenated
        assert!(!ShardableUuid::is_canonical(
            "550e8400-e29b-41d4-a716-446655440000"
        ));

        // Wrong length
        assert!(!ShardableUuid::is_canonical(
            "550e8400e29b41d4a71644665544000"
        ));
        assert!(!ShardableUuid::is_canonical(
            "550e8400e29b41d4a7164466554400000"
        ));

        // Invalid characters
        assert!(!ShardableUuid::is_canonical(
            "550e8400e29b41d4a716446655440zzz"
        ));

        // Empty string
        assert!(!ShardableUuid::is_canonical(""));
    }

    #[test]
    fn test_sharded_dir_structure() {
        let uuid = ShardableUuid::parse("550e8400e29b41d4a716446655440000").unwrap();
        let parent = Path::new("/portal_data/patients");
        let sharded = uuid.sharded_dir(parent);

        assert_eq!(
            sharded,
            PathBuf::from("/portal_data/patients/55/0e/550e8400e29b41d4a716446655440000")
        );
    }

    #[test]
    fn test_sharded_dir_different_uuids() {
        let uuid1 = ShardableUuid::parse("00112233445566778899aabbccddeeff").unwrap();
        let uuid2 = ShardableUuid::parse("aabbccddeeff00112233445566778899").unwrap();

        let parent = Path::new("/data");

        let sharded1 = uuid1.sharded_dir(parent);
        let sharded2 = uuid2.sharded_dir(parent);

        assert_eq!(
            sharded1,
            PathBuf::from("/data/00/11/00112233445566778899aabbccddeeff")
        );
        assert_eq!(
            sharded2,
            PathBuf::from("/data/aa/bb/aabbccddeeff00112233445566778899")
        );
        assert_ne!(sharded1, sharded2);
    }

    #[test]
    fn test_display_format() {
        let uuid = ShardableUuid::parse("550e8400e29b41d4a716446655440000").unwrap();
        let displayed = format!("{}", uuid);

        assert_eq!(displayed, "550e8400e29b41d4a716446655440000");
        assert!(ShardableUuid::is_canonical(&displayed));
    }

    #[test]
    fn test_round_trip_new_to_string_to_parse() {
        let original = ShardableUuid::new();
        let as_string = original.to_string();
        let parsed = ShardableUuid::parse(&as_string).unwrap();

        assert_eq!(original, parsed);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_round_trip() {
        let original = ShardableUuid::parse("550e8400e29b41d4a716446655440000").unwrap();
        let json = serde_json::to_string(&original).unwrap();

        assert_eq!(json, "\"550e8400e29b41d4a716446655440000\"");

        let parsed: ShardableUuid = serde_json::from_str(&json).unwrap();
        assert_eq!(original, parsed);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_rejects_non_canonical() {
        let result: Result<ShardableUuid, _> =
            serde_json::from_str("\"550e8400-e29b-41d4-a716-446655440000\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_timestamp_id_round_trip() {
        let id = TimestampId::generate(None);
        let as_string = id.to_string();
        let parsed: TimestampId = as_string.parse().expect("should parse generated id");

        // Generated ids are millisecond-truncated, so the round trip is exact.
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_timestamp_id_monotonic_against_previous() {
        let first = TimestampId::generate(None);
        let second = TimestampId::generate(Some(&first));

        assert!(second.timestamp() > first.timestamp());
    }

    #[test]
    fn test_timestamp_id_monotonic_against_future_previous() {
        let mut first = TimestampId::generate(None);
        // Force the previous id into the future to exercise the bump path.
        first.timestamp = first.timestamp + Duration::seconds(60);

        let second = TimestampId::generate(Some(&first));
        assert!(second.timestamp() > first.timestamp());
    }

    #[test]
    fn test_timestamp_id_rejects_missing_separator() {
        let result: Result<TimestampId, _> = "20260111T143522.045Z".parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_timestamp_id_rejects_missing_z_suffix() {
        let result: Result<TimestampId, _> =
            "20260111T143522.045-550e8400e29b41d4a716446655440000".parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_timestamp_id_rejects_bad_uuid_component() {
        let result: Result<TimestampId, _> = "20260111T143522.045Z-not-a-uuid".parse();
        assert!(result.is_err());
    }
}
