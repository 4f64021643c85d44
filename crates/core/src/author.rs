//! Author-related types.
//!
//! Every mutating portal operation records who performed it. The portal has four
//! actor roles; the role is bookkeeping recorded in the audit journal and on the
//! records an author composes, not an access-control mechanism.

use crate::{EmailAddress, NonEmptyText, PortalError, PortalResult};

/// The portal roles an author can act in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortalRole {
    /// A patient using the portal for their own record.
    Patient,
    /// A clinician booking, confirming and prescribing.
    Doctor,
    /// Pharmacy staff managing the catalogue, orders and deliveries.
    Pharmacy,
    /// Portal administration.
    Admin,
}

impl PortalRole {
    /// Convert to the lowercase wire string.
    pub fn to_wire(self) -> &'static str {
        match self {
            PortalRole::Patient => "patient",
            PortalRole::Doctor => "doctor",
            PortalRole::Pharmacy => "pharmacy",
            PortalRole::Admin => "admin",
        }
    }

    /// Parse from the lowercase wire string.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "patient" => Some(PortalRole::Patient),
            "doctor" => Some(PortalRole::Doctor),
            "pharmacy" => Some(PortalRole::Pharmacy),
            "admin" => Some(PortalRole::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for PortalRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_wire())
    }
}

impl std::str::FromStr for PortalRole {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PortalRole::from_wire(s.trim())
            .ok_or_else(|| PortalError::InvalidInput(format!("unknown portal role: '{s}'")))
    }
}

impl serde::Serialize for PortalRole {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_wire())
    }
}

impl<'de> serde::Deserialize<'de> for PortalRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PortalRole::from_wire(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown portal role: '{s}'")))
    }
}

/// Represents the author of a record operation.
#[derive(Clone, Debug)]
pub struct Author {
    /// The full name of the author.
    pub name: NonEmptyText,

    /// The portal role the author is acting in.
    pub role: PortalRole,

    /// The email address of the author.
    pub email: EmailAddress,
}

impl Author {
    /// Build an author from raw request fields, validating each of them.
    ///
    /// # Errors
    ///
    /// Returns `PortalError` if the name is empty, the role is unknown, or the
    /// email is not a plausible address.
    pub fn from_parts(name: &str, role: &str, email: &str) -> PortalResult<Self> {
        Ok(Self {
            name: NonEmptyText::new(name)?,
            role: role.parse()?,
            email: EmailAddress::parse(email)?,
        })
    }
}
