//! Order management.
//!
//! This module provides functionality for placing and progressing pharmacy orders.
//! It handles:
//!
//! - Validation of requested lines against the catalogue
//! - Price snapshotting and total computation at placement time
//! - Stock decrement on placement and restoration on cancellation
//! - Storage in a sharded directory structure under `portal_data/pharmacy/orders/`
//!
//! ## Storage Layout
//!
//! Order records are stored as JSON files in a sharded structure:
//!
//! ```text
//! pharmacy/orders/
//!   <s1>/
//!     <s2>/
//!       <uuid>/
//!         order.json      # order document
//!         delivery.json   # the order's delivery document
//!         audit.jsonl     # append-only audit journal
//! ```
//!
//! where `s1` and `s2` are the first four hex characters of the UUID.

use super::helpers::{cleanup_after_failed_initialise, create_unique_shared_dir, record_dirs};
use super::inventory::InventoryService;
use super::patients::PatientsService;
use crate::audit::{append_entry, AuditAction, AuditEntry};
use crate::config::CoreConfig;
use crate::constants::{DELIVERY_FILENAME, ORDER_FILENAME};
use crate::error::{PortalError, PortalResult};
use crate::records::delivery::{Delivery, DeliveryData};
use crate::records::order::{compute_total_cents, Order, OrderData, OrderLine, OrderStatus};
use crate::validation::validate_positive_quantity;
use crate::{Author, NonEmptyText, ShardableUuid};
use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// One requested line of a new order: a catalogue id and a unit count.
#[derive(Clone, Debug)]
pub struct OrderRequestLine {
    /// Catalogue id of the requested medicine.
    pub medicine_id: ShardableUuid,
    /// Units requested; must be positive.
    pub quantity: u32,
}

/// Sharded record directory of an order, whether or not it exists.
pub(crate) fn order_dir_for(cfg: &CoreConfig, order_id: &ShardableUuid) -> PathBuf {
    order_id.sharded_dir(&cfg.orders_dir())
}

// ============================================================================
// TYPE-STATE MARKERS
// ============================================================================

/// Marker type: order record does not yet exist. Only `place()` can be called.
#[derive(Clone, Copy, Debug)]
pub struct Uninitialised;

/// Marker type: order record exists.
#[derive(Clone, Debug)]
pub struct Initialised {
    order_id: ShardableUuid,
}

// ============================================================================
// ORDERS SERVICE
// ============================================================================

/// Service for managing order records.
///
/// Uses type-state pattern to enforce correct usage at compile time.
/// Generic parameter `S` is either `Uninitialised` or `Initialised`.
#[derive(Clone, Debug)]
pub struct OrdersService<S> {
    cfg: Arc<CoreConfig>,
    state: S,
}

impl OrdersService<Uninitialised> {
    /// Creates a new orders service in the uninitialised state.
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self {
            cfg,
            state: Uninitialised,
        }
    }

    /// Places a new order for a patient.
    ///
    /// Validates every requested line against the catalogue, snapshots names and unit
    /// prices, computes the total, decrements stock, and creates the order record with
    /// its delivery document (in `Preparing`) and audit journal. The catalogue is only
    /// persisted after the record files are safely on disk.
    ///
    /// **This method consumes `self`** and returns the initialised service together with
    /// the order document.
    ///
    /// # Errors
    ///
    /// Returns `PortalError` if:
    /// - the line list is empty or contains a zero quantity,
    /// - the patient record does not exist,
    /// - a requested medicine is unknown or under-stocked,
    /// - any file write or the audit append fails.
    ///
    /// # Safety & Rollback
    ///
    /// If anything fails after the record directory was allocated, the partial directory
    /// is removed; the catalogue decrement is persisted last, so a failed placement never
    /// leaves stock missing.
    pub fn place(
        self,
        author: &Author,
        location: &NonEmptyText,
        patient_id: &ShardableUuid,
        requested: Vec<OrderRequestLine>,
        address: NonEmptyText,
    ) -> PortalResult<(OrdersService<Initialised>, OrderData)> {
        if requested.is_empty() {
            return Err(PortalError::InvalidInput(
                "order must contain at least one line".into(),
            ));
        }
        for line in &requested {
            validate_positive_quantity("order line quantity", line.quantity)?;
        }

        // Snapshot the patient name onto the order.
        let patient = PatientsService::with_id(self.cfg.clone(), &patient_id.to_string())?.get()?;

        // Validate against the catalogue and build the priced lines.
        let inventory = InventoryService::new(self.cfg.clone());
        let mut medicines = inventory.load()?;

        let mut lines = Vec::with_capacity(requested.len());
        for request in &requested {
            let medicine = medicines
                .iter_mut()
                .find(|m| m.id == request.medicine_id)
                .ok_or_else(|| PortalError::MedicineNotFound(request.medicine_id.to_string()))?;

            if medicine.quantity < request.quantity {
                return Err(PortalError::InsufficientStock {
                    name: medicine.name.clone(),
                    requested: request.quantity,
                    available: medicine.quantity,
                });
            }

            medicine.quantity -= request.quantity;
            lines.push(OrderLine {
                medicine_id: medicine.id.clone(),
                name: medicine.name.clone(),
                quantity: request.quantity,
                unit_price_cents: medicine.unit_price_cents,
            });
        }

        let (order_uuid, record_dir) =
            create_unique_shared_dir(&self.cfg.orders_dir(), ShardableUuid::new)?;

        let placed_at = Utc::now();
        let order = OrderData {
            id: order_uuid.clone(),
            patient_id: patient_id.clone(),
            patient_name: patient.display_name(),
            total_cents: compute_total_cents(&lines),
            lines,
            status: OrderStatus::Pending,
            placed_at,
        };
        let delivery =
            DeliveryData::for_new_order(order_uuid.clone(), address.as_str().to_owned(), placed_at);

        let write_all = || -> PortalResult<()> {
            let order_raw = Order::render(&order)?;
            let delivery_raw = Delivery::render(&delivery)?;

            fs::write(record_dir.join(ORDER_FILENAME), order_raw).map_err(PortalError::FileWrite)?;
            fs::write(record_dir.join(DELIVERY_FILENAME), delivery_raw)
                .map_err(PortalError::FileWrite)?;

            let entry = AuditEntry::new(
                &self.cfg,
                AuditAction::Create,
                format!(
                    "Order placed for {}: {} line(s), total {} cents",
                    order.patient_name,
                    order.lines.len(),
                    order.total_cents
                ),
                author,
                location,
            );
            append_entry(&record_dir, &entry)?;

            // Persist the decrement last: a failure above must not cost stock.
            inventory.store(&medicines)
        };

        if let Err(init_error) = write_all() {
            return Err(cleanup_after_failed_initialise(&record_dir, init_error));
        }

        Ok((
            OrdersService {
                cfg: self.cfg,
                state: Initialised {
                    order_id: order_uuid,
                },
            },
            order,
        ))
    }
}

impl OrdersService<Initialised> {
    /// Creates an orders service for an existing record.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::Ident` if `order_id` is not canonical.
    pub fn with_id(cfg: Arc<CoreConfig>, order_id: &str) -> PortalResult<Self> {
        let order_uuid = ShardableUuid::parse(order_id)?;
        Ok(Self {
            cfg,
            state: Initialised {
                order_id: order_uuid,
            },
        })
    }

    /// Returns the order UUID.
    pub fn order_id(&self) -> &ShardableUuid {
        &self.state.order_id
    }

    fn record_dir(&self) -> PathBuf {
        order_dir_for(&self.cfg, self.order_id())
    }

    /// Reads the order document.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::OrderNotFound` if the record does not exist on disk,
    /// or a read/parse error for a corrupt document.
    pub fn get(&self) -> PortalResult<OrderData> {
        let path = self.record_dir().join(ORDER_FILENAME);
        if !path.is_file() {
            return Err(PortalError::OrderNotFound(self.order_id().to_string()));
        }

        let contents = fs::read_to_string(&path).map_err(PortalError::FileRead)?;
        Order::parse(&contents)
    }

    /// Moves the order to `new_status`, enforcing the transition table.
    ///
    /// Cancelling an order returns its lines to the catalogue. Lines whose medicine
    /// has since left the catalogue are logged as warnings and skipped.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::InvalidStatusTransition` for a move the table forbids,
    /// or a read/write error.
    pub fn update_status(
        &self,
        author: &Author,
        location: &NonEmptyText,
        new_status: OrderStatus,
    ) -> PortalResult<OrderData> {
        let mut order = self.get()?;

        if !order.status.can_transition_to(new_status) {
            return Err(PortalError::InvalidStatusTransition {
                from: order.status.to_wire().to_string(),
                to: new_status.to_wire().to_string(),
            });
        }

        let previous = order.status;
        order.status = new_status;

        if new_status == OrderStatus::Cancelled {
            self.restore_stock(&order)?;
        }

        let raw = Order::render(&order)?;
        fs::write(self.record_dir().join(ORDER_FILENAME), raw).map_err(PortalError::FileWrite)?;

        let action = if new_status == OrderStatus::Cancelled {
            AuditAction::Cancel
        } else {
            AuditAction::Status
        };
        let audit = AuditEntry::new(
            &self.cfg,
            action,
            format!("Order {} -> {}", previous, new_status),
            author,
            location,
        );
        append_entry(&self.record_dir(), &audit)?;

        Ok(order)
    }

    fn restore_stock(&self, order: &OrderData) -> PortalResult<()> {
        let inventory = InventoryService::new(self.cfg.clone());
        let mut medicines = inventory.load()?;

        for line in &order.lines {
            match medicines.iter_mut().find(|m| m.id == line.medicine_id) {
                Some(medicine) => {
                    medicine.quantity = medicine.quantity.saturating_add(line.quantity);
                }
                None => {
                    tracing::warn!(
                        "cancelled order {} references medicine {} no longer in the catalogue",
                        order.id,
                        line.medicine_id
                    );
                }
            }
        }

        inventory.store(&medicines)
    }
}

// ============================================================================
// SHARED OPERATIONS
// ============================================================================

/// Lists all order records from the file system.
///
/// Traverses the sharded directory structure under `pharmacy/orders/` and reads all
/// `order.json` files. Individual documents that cannot be parsed are logged as
/// warnings and skipped.
pub fn list_orders(cfg: &CoreConfig) -> Vec<OrderData> {
    let mut orders = Vec::new();

    for record_dir in record_dirs(&cfg.orders_dir()) {
        let order_path = record_dir.join(ORDER_FILENAME);
        if !order_path.is_file() {
            continue;
        }

        if let Ok(contents) = fs::read_to_string(&order_path) {
            match Order::parse(&contents) {
                Ok(order) => orders.push(order),
                Err(e) => {
                    tracing::warn!("failed to parse order.json: {} - {}", order_path.display(), e);
                }
            }
        }
    }

    orders
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::delivery::DeliveryStatus;
    use crate::repositories::inventory::NewMedicine;
    use crate::{EmailAddress, PortalRole};
    use chrono::NaiveDate;
    use std::path::Path;
    use tempfile::TempDir;

    fn pharmacist() -> Author {
        Author {
            name: NonEmptyText::new("Sam Patel").unwrap(),
            role: PortalRole::Pharmacy,
            email: EmailAddress::parse("s.patel@example.com").unwrap(),
        }
    }

    fn test_cfg(portal_data_dir: &Path) -> Arc<CoreConfig> {
        Arc::new(
            CoreConfig::new(portal_data_dir.to_path_buf(), "careport.test".into())
                .expect("CoreConfig::new should succeed"),
        )
    }

    fn test_location() -> NonEmptyText {
        NonEmptyText::new("Main Branch").unwrap()
    }

    fn new_patient(cfg: Arc<CoreConfig>) -> ShardableUuid {
        let service = PatientsService::new(cfg)
            .initialise(pharmacist(), test_location())
            .expect("initialise should succeed");
        service
            .update_profile(
                &pharmacist(),
                &test_location(),
                vec!["John".to_string()],
                "Doe",
                "1990-01-15",
                None,
            )
            .expect("update should succeed");
        service.patient_id().clone()
    }

    fn stocked_medicine(cfg: Arc<CoreConfig>, name: &str, quantity: u32, price: u64) -> ShardableUuid {
        InventoryService::new(cfg)
            .add_medicine(
                &pharmacist(),
                &test_location(),
                NewMedicine {
                    name: NonEmptyText::new(name).unwrap(),
                    quantity,
                    reorder_level: 10,
                    unit_price_cents: price,
                    category: NonEmptyText::new("General").unwrap(),
                    expiry_date: NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
                    supplier: None,
                    batch_number: None,
                },
            )
            .expect("add should succeed")
            .id
    }

    #[test]
    fn test_place_creates_record_and_decrements_stock() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let patient_id = new_patient(cfg.clone());
        let paracetamol = stocked_medicine(cfg.clone(), "Paracetamol 500mg", 100, 2550);
        let vitamin = stocked_medicine(cfg.clone(), "Vitamin D3", 20, 3500);

        let (service, order) = OrdersService::new(cfg.clone())
            .place(
                &pharmacist(),
                &test_location(),
                &patient_id,
                vec![
                    OrderRequestLine {
                        medicine_id: paracetamol.clone(),
                        quantity: 10,
                    },
                    OrderRequestLine {
                        medicine_id: vitamin.clone(),
                        quantity: 1,
                    },
                ],
                NonEmptyText::new("12 Rose Lane").unwrap(),
            )
            .expect("place should succeed");

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.patient_name, "John Doe");
        assert_eq!(order.total_cents, 10 * 2550 + 3500);

        let record_dir = order_dir_for(&cfg, service.order_id());
        assert!(record_dir.join(ORDER_FILENAME).is_file());
        assert!(record_dir.join(DELIVERY_FILENAME).is_file());

        // Delivery starts in Preparing.
        let delivery_raw = fs::read_to_string(record_dir.join(DELIVERY_FILENAME)).unwrap();
        let delivery = Delivery::parse(&delivery_raw).expect("delivery should parse");
        assert_eq!(delivery.status, DeliveryStatus::Preparing);
        assert_eq!(delivery.order_id, order.id);

        // Stock was decremented.
        let inventory = InventoryService::new(cfg);
        assert_eq!(inventory.get(&paracetamol).expect("get").quantity, 90);
        assert_eq!(inventory.get(&vitamin).expect("get").quantity, 19);
    }

    #[test]
    fn test_place_rejects_understocked_line_and_leaves_no_record() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let patient_id = new_patient(cfg.clone());
        let paracetamol = stocked_medicine(cfg.clone(), "Paracetamol 500mg", 5, 2550);

        let err = OrdersService::new(cfg.clone())
            .place(
                &pharmacist(),
                &test_location(),
                &patient_id,
                vec![OrderRequestLine {
                    medicine_id: paracetamol.clone(),
                    quantity: 10,
                }],
                NonEmptyText::new("12 Rose Lane").unwrap(),
            )
            .expect_err("place should fail");
        assert!(matches!(err, PortalError::InsufficientStock { .. }));

        assert!(list_orders(&cfg).is_empty(), "no order record should exist");
        assert_eq!(
            InventoryService::new(cfg).get(&paracetamol).expect("get").quantity,
            5,
            "stock must be unchanged"
        );
    }

    #[test]
    fn test_place_rejects_unknown_medicine_and_empty_lines() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let patient_id = new_patient(cfg.clone());

        let err = OrdersService::new(cfg.clone())
            .place(
                &pharmacist(),
                &test_location(),
                &patient_id,
                vec![],
                NonEmptyText::new("12 Rose Lane").unwrap(),
            )
            .expect_err("empty lines should fail");
        assert!(matches!(err, PortalError::InvalidInput(_)));

        let err = OrdersService::new(cfg)
            .place(
                &pharmacist(),
                &test_location(),
                &patient_id,
                vec![OrderRequestLine {
                    medicine_id: ShardableUuid::new(),
                    quantity: 1,
                }],
                NonEmptyText::new("12 Rose Lane").unwrap(),
            )
            .expect_err("unknown medicine should fail");
        assert!(matches!(err, PortalError::MedicineNotFound(_)));
    }

    #[test]
    fn test_place_requires_existing_patient() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let paracetamol = stocked_medicine(cfg.clone(), "Paracetamol 500mg", 100, 2550);

        let err = OrdersService::new(cfg)
            .place(
                &pharmacist(),
                &test_location(),
                &ShardableUuid::new(),
                vec![OrderRequestLine {
                    medicine_id: paracetamol,
                    quantity: 1,
                }],
                NonEmptyText::new("12 Rose Lane").unwrap(),
            )
            .expect_err("place should fail");
        assert!(matches!(err, PortalError::PatientNotFound(_)));
    }

    #[test]
    fn test_status_walk_and_illegal_transition() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let patient_id = new_patient(cfg.clone());
        let paracetamol = stocked_medicine(cfg.clone(), "Paracetamol 500mg", 100, 2550);

        let (service, _order) = OrdersService::new(cfg)
            .place(
                &pharmacist(),
                &test_location(),
                &patient_id,
                vec![OrderRequestLine {
                    medicine_id: paracetamol,
                    quantity: 10,
                }],
                NonEmptyText::new("12 Rose Lane").unwrap(),
            )
            .expect("place should succeed");

        // Pending -> Ready skips processing and must be rejected.
        let err = service
            .update_status(&pharmacist(), &test_location(), OrderStatus::Ready)
            .expect_err("should reject");
        assert!(matches!(err, PortalError::InvalidStatusTransition { .. }));

        let processing = service
            .update_status(&pharmacist(), &test_location(), OrderStatus::Processing)
            .expect("should succeed");
        assert_eq!(processing.status, OrderStatus::Processing);

        let ready = service
            .update_status(&pharmacist(), &test_location(), OrderStatus::Ready)
            .expect("should succeed");
        assert_eq!(ready.status, OrderStatus::Ready);

        let delivered = service
            .update_status(&pharmacist(), &test_location(), OrderStatus::Delivered)
            .expect("should succeed");
        assert_eq!(delivered.status, OrderStatus::Delivered);

        // Delivered is terminal.
        let err = service
            .update_status(&pharmacist(), &test_location(), OrderStatus::Cancelled)
            .expect_err("should reject");
        assert!(matches!(err, PortalError::InvalidStatusTransition { .. }));
    }

    #[test]
    fn test_cancel_restores_stock() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let patient_id = new_patient(cfg.clone());
        let paracetamol = stocked_medicine(cfg.clone(), "Paracetamol 500mg", 100, 2550);

        let (service, _order) = OrdersService::new(cfg.clone())
            .place(
                &pharmacist(),
                &test_location(),
                &patient_id,
                vec![OrderRequestLine {
                    medicine_id: paracetamol.clone(),
                    quantity: 10,
                }],
                NonEmptyText::new("12 Rose Lane").unwrap(),
            )
            .expect("place should succeed");

        let inventory = InventoryService::new(cfg);
        assert_eq!(inventory.get(&paracetamol).expect("get").quantity, 90);

        let cancelled = service
            .update_status(&pharmacist(), &test_location(), OrderStatus::Cancelled)
            .expect("cancel should succeed");
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        assert_eq!(
            inventory.get(&paracetamol).expect("get").quantity,
            100,
            "cancellation must return the stock"
        );
    }

    #[test]
    fn test_list_orders_returns_all_records() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let patient_id = new_patient(cfg.clone());
        let paracetamol = stocked_medicine(cfg.clone(), "Paracetamol 500mg", 100, 2550);

        for _ in 0..2 {
            OrdersService::new(cfg.clone())
                .place(
                    &pharmacist(),
                    &test_location(),
                    &patient_id,
                    vec![OrderRequestLine {
                        medicine_id: paracetamol.clone(),
                        quantity: 1,
                    }],
                    NonEmptyText::new("12 Rose Lane").unwrap(),
                )
                .expect("place should succeed");
        }

        assert_eq!(list_orders(&cfg).len(), 2);
    }
}
