//! Pharmacy catalogue wire model.
//!
//! The whole medicine catalogue lives in one `inventory.json` document under the
//! pharmacy directory. Prices are stored in integer cents; the portal never does
//! floating-point money arithmetic.

use super::{parse_strict, render_wire};
use crate::{PortalError, PortalResult};
use careport_uuid::ShardableUuid;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Domain-level carrier for one catalogue medicine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MedicineData {
    /// Unique identifier of this catalogue line.
    pub id: ShardableUuid,

    /// Medicine name, including strength (e.g. "Paracetamol 500mg").
    pub name: String,

    /// Units currently in stock.
    pub quantity: u32,

    /// Stock level at or below which the line counts as low stock.
    pub reorder_level: u32,

    /// Price per unit, in cents.
    pub unit_price_cents: u64,

    /// Catalogue category (e.g. "Pain Relief").
    pub category: String,

    /// Expiry date of the current batch.
    pub expiry_date: NaiveDate,

    /// Supplier name, if recorded.
    pub supplier: Option<String>,

    /// Batch number, if recorded.
    pub batch_number: Option<String>,
}

impl MedicineData {
    /// Whether the line is at or below its reorder level.
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }

    /// Whether the batch expires within `days` days of `today` (inclusive),
    /// or has already expired.
    pub fn expires_within(&self, today: NaiveDate, days: u32) -> bool {
        self.expiry_date <= today + Duration::days(i64::from(days))
    }
}

/// Catalogue document operations.
pub struct Inventory;

impl Inventory {
    /// Parse the catalogue document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError`] on schema mismatch, a malformed id or date, or a
    /// wrong recordType tag.
    pub fn parse(json_text: &str) -> PortalResult<Vec<MedicineData>> {
        let wire: InventoryWire = parse_strict("Inventory", json_text)?;

        if wire.record_type != "Inventory" {
            return Err(PortalError::InvalidInput(format!(
                "Expected recordType 'Inventory', got '{}'",
                wire.record_type
            )));
        }

        wire.medicines.into_iter().map(line_to_domain).collect()
    }

    /// Render the catalogue document as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError`] if serialisation fails.
    pub fn render(medicines: &[MedicineData]) -> PortalResult<String> {
        let wire = InventoryWire {
            record_type: "Inventory".to_string(),
            medicines: medicines.iter().map(line_to_wire).collect(),
        };
        render_wire("inventory", &wire)
    }
}

/// Wire representation of the catalogue document.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct InventoryWire {
    #[serde(rename = "recordType")]
    record_type: String,

    #[serde(default)]
    medicines: Vec<MedicineWire>,
}

/// Wire representation of one catalogue line.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct MedicineWire {
    id: String,
    name: String,
    quantity: u32,
    #[serde(rename = "reorderLevel")]
    reorder_level: u32,
    #[serde(rename = "unitPriceCents")]
    unit_price_cents: u64,
    category: String,
    #[serde(rename = "expiryDate")]
    expiry_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    supplier: Option<String>,
    #[serde(rename = "batchNumber", skip_serializing_if = "Option::is_none")]
    batch_number: Option<String>,
}

fn line_to_domain(wire: MedicineWire) -> PortalResult<MedicineData> {
    let id = ShardableUuid::parse(&wire.id)
        .map_err(|e| PortalError::Translation(format!("Invalid medicine id: {e}")))?;

    let expiry_date = NaiveDate::parse_from_str(&wire.expiry_date, "%Y-%m-%d")
        .map_err(|e| PortalError::Translation(format!("Invalid expiryDate: {e}")))?;

    Ok(MedicineData {
        id,
        name: wire.name,
        quantity: wire.quantity,
        reorder_level: wire.reorder_level,
        unit_price_cents: wire.unit_price_cents,
        category: wire.category,
        expiry_date,
        supplier: wire.supplier,
        batch_number: wire.batch_number,
    })
}

fn line_to_wire(data: &MedicineData) -> MedicineWire {
    MedicineWire {
        id: data.id.to_string(),
        name: data.name.clone(),
        quantity: data.quantity,
        reorder_level: data.reorder_level,
        unit_price_cents: data.unit_price_cents,
        category: data.category.clone(),
        expiry_date: data.expiry_date.format("%Y-%m-%d").to_string(),
        supplier: data.supplier.clone(),
        batch_number: data.batch_number.clone(),
    }
}
