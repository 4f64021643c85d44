//! Pharmacy catalogue management.
//!
//! The catalogue is one `inventory.json` document under the pharmacy directory.
//! A missing document reads as an empty catalogue, so the first `add_medicine`
//! bootstraps the store. Catalogue mutations append to the pharmacy-level audit
//! journal (`pharmacy/audit.jsonl`).

use crate::audit::{append_entry, AuditAction, AuditEntry};
use crate::config::CoreConfig;
use crate::error::{PortalError, PortalResult};
use crate::records::medicine::{Inventory, MedicineData};
use crate::{Author, NonEmptyText, ShardableUuid};
use chrono::NaiveDate;
use std::fs;
use std::sync::Arc;

/// A new catalogue line, before an id is assigned.
#[derive(Clone, Debug)]
pub struct NewMedicine {
    /// Medicine name, including strength.
    pub name: NonEmptyText,
    /// Units initially in stock.
    pub quantity: u32,
    /// Stock level at or below which the line counts as low stock.
    pub reorder_level: u32,
    /// Price per unit, in cents.
    pub unit_price_cents: u64,
    /// Catalogue category.
    pub category: NonEmptyText,
    /// Expiry date of the current batch.
    pub expiry_date: NaiveDate,
    /// Supplier name, if recorded.
    pub supplier: Option<String>,
    /// Batch number, if recorded.
    pub batch_number: Option<String>,
}

/// Service for managing the pharmacy catalogue.
#[derive(Clone, Debug)]
pub struct InventoryService {
    cfg: Arc<CoreConfig>,
}

impl InventoryService {
    /// Creates an inventory service.
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    /// Reads the catalogue; a missing document reads as empty.
    pub(crate) fn load(&self) -> PortalResult<Vec<MedicineData>> {
        let path = self.cfg.inventory_file();
        if !path.is_file() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&path).map_err(PortalError::FileRead)?;
        Inventory::parse(&contents)
    }

    /// Writes the catalogue, creating the pharmacy directory on first use.
    pub(crate) fn store(&self, medicines: &[MedicineData]) -> PortalResult<()> {
        let pharmacy_dir = self.cfg.pharmacy_dir();
        fs::create_dir_all(&pharmacy_dir).map_err(PortalError::StorageDirCreation)?;

        let raw = Inventory::render(medicines)?;
        fs::write(self.cfg.inventory_file(), raw).map_err(PortalError::FileWrite)
    }

    fn audit(&self, action: AuditAction, summary: String, author: &Author, location: &NonEmptyText) -> PortalResult<()> {
        let entry = AuditEntry::new(&self.cfg, action, summary, author, location);
        append_entry(&self.cfg.pharmacy_dir(), &entry)
    }

    /// Adds a new medicine to the catalogue.
    ///
    /// A line is a duplicate when an existing line has the same name
    /// (case-insensitively) and the same batch number; duplicates are rejected so a
    /// batch cannot be counted twice.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::DuplicateMedicine` for a duplicate line, or a
    /// read/write error.
    pub fn add_medicine(
        &self,
        author: &Author,
        location: &NonEmptyText,
        new: NewMedicine,
    ) -> PortalResult<MedicineData> {
        let mut medicines = self.load()?;

        let duplicate = medicines.iter().any(|m| {
            m.name.eq_ignore_ascii_case(new.name.as_str()) && m.batch_number == new.batch_number
        });
        if duplicate {
            return Err(PortalError::DuplicateMedicine {
                name: new.name.as_str().to_owned(),
                batch: new.batch_number.clone().unwrap_or_else(|| "<none>".into()),
            });
        }

        let medicine = MedicineData {
            id: ShardableUuid::new(),
            name: new.name.as_str().to_owned(),
            quantity: new.quantity,
            reorder_level: new.reorder_level,
            unit_price_cents: new.unit_price_cents,
            category: new.category.as_str().to_owned(),
            expiry_date: new.expiry_date,
            supplier: new.supplier,
            batch_number: new.batch_number,
        };

        medicines.push(medicine.clone());
        self.store(&medicines)?;

        self.audit(
            AuditAction::Create,
            format!("Medicine added: {} ({} units)", medicine.name, medicine.quantity),
            author,
            location,
        )?;

        Ok(medicine)
    }

    /// Lists the whole catalogue.
    ///
    /// # Errors
    ///
    /// Returns `PortalError` if the document exists but cannot be read or parsed.
    pub fn list(&self) -> PortalResult<Vec<MedicineData>> {
        self.load()
    }

    /// Reads one catalogue line by id.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::MedicineNotFound` for an unknown id.
    pub fn get(&self, medicine_id: &ShardableUuid) -> PortalResult<MedicineData> {
        self.load()?
            .into_iter()
            .find(|m| m.id == *medicine_id)
            .ok_or_else(|| PortalError::MedicineNotFound(medicine_id.to_string()))
    }

    /// Adjusts the stock of a line by `delta` units (restock positive, correction
    /// negative).
    ///
    /// # Errors
    ///
    /// Returns `PortalError::InvalidInput` for a zero delta,
    /// `PortalError::InsufficientStock` when the adjustment would take stock below
    /// zero, or `PortalError::MedicineNotFound` for an unknown id.
    pub fn adjust_stock(
        &self,
        author: &Author,
        location: &NonEmptyText,
        medicine_id: &ShardableUuid,
        delta: i64,
    ) -> PortalResult<MedicineData> {
        if delta == 0 {
            return Err(PortalError::InvalidInput(
                "stock adjustment delta must be non-zero".into(),
            ));
        }

        let mut medicines = self.load()?;
        let line = medicines
            .iter_mut()
            .find(|m| m.id == *medicine_id)
            .ok_or_else(|| PortalError::MedicineNotFound(medicine_id.to_string()))?;

        let new_quantity = i64::from(line.quantity) + delta;
        if new_quantity < 0 {
            return Err(PortalError::InsufficientStock {
                name: line.name.clone(),
                requested: delta.unsigned_abs().min(u64::from(u32::MAX)) as u32,
                available: line.quantity,
            });
        }
        line.quantity = new_quantity as u32;
        let updated = line.clone();

        self.store(&medicines)?;

        self.audit(
            AuditAction::Update,
            format!(
                "Stock adjusted for {}: {:+} -> {} units",
                updated.name, delta, updated.quantity
            ),
            author,
            location,
        )?;

        Ok(updated)
    }

    /// Lists catalogue lines at or below their reorder level.
    ///
    /// # Errors
    ///
    /// Returns `PortalError` if the catalogue cannot be read.
    pub fn low_stock(&self) -> PortalResult<Vec<MedicineData>> {
        Ok(self
            .load()?
            .into_iter()
            .filter(MedicineData::is_low_stock)
            .collect())
    }

    /// Lists catalogue lines whose batch expires within `days` days of `today`
    /// (inclusive), including already-expired batches.
    ///
    /// # Errors
    ///
    /// Returns `PortalError` if the catalogue cannot be read.
    pub fn expiring_within(&self, today: NaiveDate, days: u32) -> PortalResult<Vec<MedicineData>> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|m| m.expires_within(today, days))
            .collect())
    }
}
