//! Order wire model and status machine.
//!
//! Each order is its own sharded record directory under `pharmacy/orders/`, holding
//! `order.json` (this document), `delivery.json` and the audit journal. Line prices are
//! snapshots of the catalogue price at placement time; the total is always the sum of
//! the line totals.

use super::{parse_strict, render_wire};
use crate::{PortalError, PortalResult};
use careport_uuid::ShardableUuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    /// Placed, not yet picked up by the pharmacy.
    Pending,
    /// Being assembled.
    Processing,
    /// Assembled, awaiting handover to delivery.
    Ready,
    /// Handed over and delivered.
    Delivered,
    /// Called off; stock is returned to the catalogue.
    Cancelled,
}

impl OrderStatus {
    /// Convert to the wire string.
    pub fn to_wire(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Ready => "Ready",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Parse from the wire string.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(OrderStatus::Pending),
            "Processing" => Some(OrderStatus::Processing),
            "Ready" => Some(OrderStatus::Ready),
            "Delivered" => Some(OrderStatus::Delivered),
            "Cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether this status may move to `next`. Delivered and Cancelled are terminal.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Processing, Ready)
                | (Processing, Cancelled)
                | (Ready, Delivered)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_wire())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::from_wire(s.trim())
            .ok_or_else(|| PortalError::InvalidInput(format!("unknown order status: '{s}'")))
    }
}

/// One line of an order: a catalogue medicine at a snapshotted price.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderLine {
    /// Catalogue id of the ordered medicine.
    pub medicine_id: ShardableUuid,

    /// Medicine name at placement time.
    pub name: String,

    /// Units ordered.
    pub quantity: u32,

    /// Price per unit at placement time, in cents.
    pub unit_price_cents: u64,
}

impl OrderLine {
    /// The line total in cents.
    pub fn line_total_cents(&self) -> u64 {
        u64::from(self.quantity) * self.unit_price_cents
    }
}

/// Domain-level carrier for an order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderData {
    /// Unique identifier of this order record.
    pub id: ShardableUuid,

    /// Patient the order is for.
    pub patient_id: ShardableUuid,

    /// Patient display name at placement time.
    pub patient_name: String,

    /// Ordered lines; never empty.
    pub lines: Vec<OrderLine>,

    /// Order total in cents; equals the sum of line totals.
    pub total_cents: u64,

    /// Current lifecycle status.
    pub status: OrderStatus,

    /// When the order was placed.
    pub placed_at: DateTime<Utc>,
}

/// Sum of the line totals in cents.
pub fn compute_total_cents(lines: &[OrderLine]) -> u64 {
    lines.iter().map(OrderLine::line_total_cents).sum()
}

/// Order document operations.
pub struct Order;

impl Order {
    /// Parse an order document from JSON text.
    ///
    /// The stored total is checked against the sum of the line totals, so a document
    /// edited out-of-band cannot smuggle in an inconsistent amount.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError`] on schema mismatch, malformed ids, an unknown status,
    /// an empty line list, an inconsistent total, or a wrong recordType tag.
    pub fn parse(json_text: &str) -> PortalResult<OrderData> {
        let wire: OrderWire = parse_strict("Order", json_text)?;

        if wire.record_type != "Order" {
            return Err(PortalError::InvalidInput(format!(
                "Expected recordType 'Order', got '{}'",
                wire.record_type
            )));
        }

        wire_to_domain(wire)
    }

    /// Render an order document as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError`] if serialisation fails.
    pub fn render(data: &OrderData) -> PortalResult<String> {
        render_wire("order", &domain_to_wire(data))
    }
}

/// Wire representation of an order document.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct OrderWire {
    #[serde(rename = "recordType")]
    record_type: String,

    id: String,

    #[serde(rename = "patientId")]
    patient_id: String,

    #[serde(rename = "patientName")]
    patient_name: String,

    lines: Vec<OrderLineWire>,

    #[serde(rename = "totalCents")]
    total_cents: u64,

    status: String,

    #[serde(rename = "placedAt")]
    placed_at: String,
}

/// Wire representation of one order line.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct OrderLineWire {
    #[serde(rename = "medicineId")]
    medicine_id: String,
    name: String,
    quantity: u32,
    #[serde(rename = "unitPriceCents")]
    unit_price_cents: u64,
}

fn wire_to_domain(wire: OrderWire) -> PortalResult<OrderData> {
    let id = ShardableUuid::parse(&wire.id)
        .map_err(|e| PortalError::Translation(format!("Invalid order id: {e}")))?;
    let patient_id = ShardableUuid::parse(&wire.patient_id)
        .map_err(|e| PortalError::Translation(format!("Invalid patient id: {e}")))?;

    let status = OrderStatus::from_wire(&wire.status)
        .ok_or_else(|| PortalError::Translation(format!("Unknown order status: '{}'", wire.status)))?;

    let placed_at = wire
        .placed_at
        .parse::<DateTime<Utc>>()
        .map_err(|e| PortalError::Translation(format!("Invalid placedAt timestamp: {e}")))?;

    let lines = wire
        .lines
        .into_iter()
        .map(|l| {
            let medicine_id = ShardableUuid::parse(&l.medicine_id)
                .map_err(|e| PortalError::Translation(format!("Invalid medicine id: {e}")))?;
            Ok(OrderLine {
                medicine_id,
                name: l.name,
                quantity: l.quantity,
                unit_price_cents: l.unit_price_cents,
            })
        })
        .collect::<PortalResult<Vec<_>>>()?;

    if lines.is_empty() {
        return Err(PortalError::Translation("Order has no lines".into()));
    }

    let computed = compute_total_cents(&lines);
    if computed != wire.total_cents {
        return Err(PortalError::Translation(format!(
            "Order total {} does not match sum of lines {}",
            wire.total_cents, computed
        )));
    }

    Ok(OrderData {
        id,
        patient_id,
        patient_name: wire.patient_name,
        lines,
        total_cents: wire.total_cents,
        status,
        placed_at,
    })
}

fn domain_to_wire(data: &OrderData) -> OrderWire {
    OrderWire {
        record_type: "Order".to_string(),
        id: data.id.to_string(),
        patient_id: data.patient_id.to_string(),
        patient_name: data.patient_name.clone(),
        lines: data
            .lines
            .iter()
            .map(|l| OrderLineWire {
                medicine_id: l.medicine_id.to_string(),
                name: l.name.clone(),
                quantity: l.quantity,
                unit_price_cents: l.unit_price_cents,
            })
            .collect(),
        total_cents: data.total_cents,
        status: data.status.to_wire().to_string(),
        placed_at: data.placed_at.to_rfc3339(),
    }
}
