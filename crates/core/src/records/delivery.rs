//! Delivery wire model and status machine.
//!
//! Every order record carries exactly one `delivery.json` alongside `order.json`. The
//! delivery is created with the order (in `Preparing`) and advances independently of
//! the order status, except that dispatch requires an assigned driver.

use super::{parse_strict, render_wire};
use crate::{PortalError, PortalResult};
use careport_uuid::ShardableUuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeliveryStatus {
    /// Being packed at the pharmacy.
    Preparing,
    /// Handed to the driver.
    Dispatched,
    /// On the road.
    InTransit,
    /// Arrived with the patient.
    Delivered,
    /// Could not be delivered.
    Failed,
}

impl DeliveryStatus {
    /// Convert to the wire string.
    pub fn to_wire(self) -> &'static str {
        match self {
            DeliveryStatus::Preparing => "Preparing",
            DeliveryStatus::Dispatched => "Dispatched",
            DeliveryStatus::InTransit => "In Transit",
            DeliveryStatus::Delivered => "Delivered",
            DeliveryStatus::Failed => "Failed",
        }
    }

    /// Parse from the wire string.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "Preparing" => Some(DeliveryStatus::Preparing),
            "Dispatched" => Some(DeliveryStatus::Dispatched),
            "In Transit" => Some(DeliveryStatus::InTransit),
            "Delivered" => Some(DeliveryStatus::Delivered),
            "Failed" => Some(DeliveryStatus::Failed),
            _ => None,
        }
    }

    /// Whether this status may move to `next`. Delivered and Failed are terminal.
    pub fn can_transition_to(self, next: DeliveryStatus) -> bool {
        use DeliveryStatus::*;
        matches!(
            (self, next),
            (Preparing, Dispatched)
                | (Dispatched, InTransit)
                | (Dispatched, Failed)
                | (InTransit, Delivered)
                | (InTransit, Failed)
        )
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_wire())
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeliveryStatus::from_wire(s.trim())
            .ok_or_else(|| PortalError::InvalidInput(format!("unknown delivery status: '{s}'")))
    }
}

/// Domain-level carrier for a delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryData {
    /// The order this delivery belongs to.
    pub order_id: ShardableUuid,

    /// Delivery address.
    pub address: String,

    /// Assigned driver name, once known.
    pub driver_name: Option<String>,

    /// Assigned driver phone, once known.
    pub driver_phone: Option<String>,

    /// Tracking reference shown to the patient.
    pub tracking_number: String,

    /// Current lifecycle status.
    pub status: DeliveryStatus,

    /// When the delivery document last changed.
    pub updated_at: DateTime<Utc>,
}

impl DeliveryData {
    /// A fresh `Preparing` delivery for a just-placed order.
    ///
    /// The tracking number is derived from the order id, so it is stable and unique
    /// without a separate counter.
    pub fn for_new_order(order_id: ShardableUuid, address: String, placed_at: DateTime<Utc>) -> Self {
        let tracking_number = tracking_number_for(&order_id);
        Self {
            order_id,
            address,
            driver_name: None,
            driver_phone: None,
            tracking_number,
            status: DeliveryStatus::Preparing,
            updated_at: placed_at,
        }
    }
}

/// Tracking reference for an order: `TRK-` plus the first ten hex characters of the
/// order id, uppercased.
pub fn tracking_number_for(order_id: &ShardableUuid) -> String {
    let canonical = order_id.to_string();
    format!("TRK-{}", canonical[0..10].to_uppercase())
}

/// Delivery document operations.
pub struct Delivery;

impl Delivery {
    /// Parse a delivery document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError`] on schema mismatch, a malformed order id, an unknown
    /// status, or a wrong recordType tag.
    pub fn parse(json_text: &str) -> PortalResult<DeliveryData> {
        let wire: DeliveryWire = parse_strict("Delivery", json_text)?;

        if wire.record_type != "Delivery" {
            return Err(PortalError::InvalidInput(format!(
                "Expected recordType 'Delivery', got '{}'",
                wire.record_type
            )));
        }

        let order_id = ShardableUuid::parse(&wire.order_id)
            .map_err(|e| PortalError::Translation(format!("Invalid order id: {e}")))?;

        let status = DeliveryStatus::from_wire(&wire.status).ok_or_else(|| {
            PortalError::Translation(format!("Unknown delivery status: '{}'", wire.status))
        })?;

        let updated_at = wire
            .updated_at
            .parse::<DateTime<Utc>>()
            .map_err(|e| PortalError::Translation(format!("Invalid updatedAt timestamp: {e}")))?;

        Ok(DeliveryData {
            order_id,
            address: wire.address,
            driver_name: wire.driver_name,
            driver_phone: wire.driver_phone,
            tracking_number: wire.tracking_number,
            status,
            updated_at,
        })
    }

    /// Render a delivery document as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError`] if serialisation fails.
    pub fn render(data: &DeliveryData) -> PortalResult<String> {
        let wire = DeliveryWire {
            record_type: "Delivery".to_string(),
            order_id: data.order_id.to_string(),
            address: data.address.clone(),
            driver_name: data.driver_name.clone(),
            driver_phone: data.driver_phone.clone(),
            tracking_number: data.tracking_number.clone(),
            status: data.status.to_wire().to_string(),
            updated_at: data.updated_at.to_rfc3339(),
        };
        render_wire("delivery", &wire)
    }
}

/// Wire representation of a delivery document.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct DeliveryWire {
    #[serde(rename = "recordType")]
    record_type: String,

    #[serde(rename = "orderId")]
    order_id: String,

    address: String,

    #[serde(rename = "driverName", skip_serializing_if = "Option::is_none")]
    driver_name: Option<String>,

    #[serde(rename = "driverPhone", skip_serializing_if = "Option::is_none")]
    driver_phone: Option<String>,

    #[serde(rename = "trackingNumber")]
    tracking_number: String,

    status: String,

    #[serde(rename = "updatedAt")]
    updated_at: String,
}
