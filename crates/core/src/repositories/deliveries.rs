//! Delivery management for order records.
//!
//! A delivery document is created together with its order (see
//! [`orders`](crate::repositories::orders)); this service progresses it. Driver
//! assignment and status changes append to the order record's audit journal.

use super::orders::order_dir_for;
use crate::audit::{append_entry, AuditAction, AuditEntry};
use crate::config::CoreConfig;
use crate::constants::DELIVERY_FILENAME;
use crate::error::{PortalError, PortalResult};
use crate::records::delivery::{Delivery, DeliveryData, DeliveryStatus};
use crate::{Author, NonEmptyText, ShardableUuid};
use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Service for managing the delivery of one order record.
#[derive(Clone, Debug)]
pub struct DeliveriesService {
    cfg: Arc<CoreConfig>,
    order_id: ShardableUuid,
}

impl DeliveriesService {
    /// Creates a deliveries service for an existing order record.
    pub fn new(cfg: Arc<CoreConfig>, order_id: ShardableUuid) -> Self {
        Self { cfg, order_id }
    }

    /// Creates a deliveries service from an order id string.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::Ident` if `order_id` is not canonical.
    pub fn with_id(cfg: Arc<CoreConfig>, order_id: &str) -> PortalResult<Self> {
        Ok(Self::new(cfg, ShardableUuid::parse(order_id)?))
    }

    /// Returns the order UUID this service operates on.
    pub fn order_id(&self) -> &ShardableUuid {
        &self.order_id
    }

    fn record_dir(&self) -> PathBuf {
        order_dir_for(&self.cfg, &self.order_id)
    }

    /// Reads the delivery document.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::OrderNotFound` if the order record does not exist on
    /// disk, or a read/parse error for a corrupt document.
    pub fn get(&self) -> PortalResult<DeliveryData> {
        let path = self.record_dir().join(DELIVERY_FILENAME);
        if !path.is_file() {
            return Err(PortalError::OrderNotFound(self.order_id.to_string()));
        }

        let contents = fs::read_to_string(&path).map_err(PortalError::FileRead)?;
        Delivery::parse(&contents)
    }

    fn store(&self, delivery: &DeliveryData) -> PortalResult<()> {
        let raw = Delivery::render(delivery)?;
        fs::write(self.record_dir().join(DELIVERY_FILENAME), raw).map_err(PortalError::FileWrite)
    }

    /// Assigns (or replaces) the delivery driver.
    ///
    /// # Errors
    ///
    /// Returns `PortalError` if the order record does not exist or a read/write fails.
    pub fn assign_driver(
        &self,
        author: &Author,
        location: &NonEmptyText,
        driver_name: NonEmptyText,
        driver_phone: Option<String>,
    ) -> PortalResult<DeliveryData> {
        let mut delivery = self.get()?;

        delivery.driver_name = Some(driver_name.as_str().to_owned());
        delivery.driver_phone = driver_phone;
        delivery.updated_at = Utc::now();

        self.store(&delivery)?;

        let entry = AuditEntry::new(
            &self.cfg,
            AuditAction::Update,
            format!("Driver assigned: {}", driver_name),
            author,
            location,
        );
        append_entry(&self.record_dir(), &entry)?;

        Ok(delivery)
    }

    /// Moves the delivery to `new_status`, enforcing the transition table.
    ///
    /// Dispatching requires a driver to have been assigned first.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::DriverNotAssigned` when dispatching without a driver,
    /// `PortalError::InvalidStatusTransition` for a move the table forbids, or a
    /// read/write error.
    pub fn update_status(
        &self,
        author: &Author,
        location: &NonEmptyText,
        new_status: DeliveryStatus,
    ) -> PortalResult<DeliveryData> {
        let mut delivery = self.get()?;

        if !delivery.status.can_transition_to(new_status) {
            return Err(PortalError::InvalidStatusTransition {
                from: delivery.status.to_wire().to_string(),
                to: new_status.to_wire().to_string(),
            });
        }

        if new_status == DeliveryStatus::Dispatched && delivery.driver_name.is_none() {
            return Err(PortalError::DriverNotAssigned);
        }

        let previous = delivery.status;
        delivery.status = new_status;
        delivery.updated_at = Utc::now();

        self.store(&delivery)?;

        let entry = AuditEntry::new(
            &self.cfg,
            AuditAction::Status,
            format!("Delivery {} -> {}", previous, new_status),
            author,
            location,
        );
        append_entry(&self.record_dir(), &entry)?;

        Ok(delivery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::inventory::{InventoryService, NewMedicine};
    use crate::repositories::orders::{OrderRequestLine, OrdersService};
    use crate::repositories::patients::PatientsService;
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

    fn placed_order(cfg: Arc<CoreConfig>) -> ShardableUuid {
        let patient = PatientsService::new(cfg.clone())
            .initialise(pharmacist(), test_location())
            .expect("initialise should succeed");

        let medicine = InventoryService::new(cfg.clone())
            .add_medicine(
                &pharmacist(),
                &test_location(),
                NewMedicine {
                    name: NonEmptyText::new("Paracetamol 500mg").unwrap(),
                    quantity: 100,
                    reorder_level: 10,
                    unit_price_cents: 2550,
                    category: NonEmptyText::new("Pain Relief").unwrap(),
                    expiry_date: NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
                    supplier: None,
                    batch_number: None,
                },
            )
            .expect("add should succeed");

        let (service, _order) = OrdersService::new(cfg)
            .place(
                &pharmacist(),
                &test_location(),
                patient.patient_id(),
                vec![OrderRequestLine {
                    medicine_id: medicine.id,
                    quantity: 2,
                }],
                NonEmptyText::new("12 Rose Lane").unwrap(),
            )
            .expect("place should succeed");

        service.order_id().clone()
    }

    #[test]
    fn test_get_reads_preparing_delivery() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let order_id = placed_order(cfg.clone());

        let service = DeliveriesService::new(cfg, order_id.clone());
        let delivery = service.get().expect("get should succeed");

        assert_eq!(delivery.status, DeliveryStatus::Preparing);
        assert_eq!(delivery.order_id, order_id);
        assert_eq!(delivery.address, "12 Rose Lane");
    }

    #[test]
    fn test_get_reports_missing_order() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());

        let service = DeliveriesService::new(cfg, ShardableUuid::new());
        let err = service.get().expect_err("get should fail");
        assert!(matches!(err, PortalError::OrderNotFound(_)));
    }

    #[test]
    fn test_dispatch_requires_driver() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let order_id = placed_order(cfg.clone());
        let service = DeliveriesService::new(cfg, order_id);

        let err = service
            .update_status(&pharmacist(), &test_location(), DeliveryStatus::Dispatched)
            .expect_err("dispatch without driver should fail");
        assert!(matches!(err, PortalError::DriverNotAssigned));

        service
            .assign_driver(
                &pharmacist(),
                &test_location(),
                NonEmptyText::new("Alex Mercer").unwrap(),
                Some("+1 (555) 777-8888".into()),
            )
            .expect("assign should succeed");

        let dispatched = service
            .update_status(&pharmacist(), &test_location(), DeliveryStatus::Dispatched)
            .expect("dispatch should succeed");
        assert_eq!(dispatched.status, DeliveryStatus::Dispatched);
        assert_eq!(dispatched.driver_name.as_deref(), Some("Alex Mercer"));
    }

    #[test]
    fn test_status_walk_to_delivered() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let order_id = placed_order(cfg.clone());
        let service = DeliveriesService::new(cfg, order_id);

        service
            .assign_driver(
                &pharmacist(),
                &test_location(),
                NonEmptyText::new("Alex Mercer").unwrap(),
                None,
            )
            .expect("assign should succeed");

        for status in [
            DeliveryStatus::Dispatched,
            DeliveryStatus::InTransit,
            DeliveryStatus::Delivered,
        ] {
            let updated = service
                .update_status(&pharmacist(), &test_location(), status)
                .expect("transition should succeed");
            assert_eq!(updated.status, status);
        }

        // Delivered is terminal.
        let err = service
            .update_status(&pharmacist(), &test_location(), DeliveryStatus::Failed)
            .expect_err("should reject");
        assert!(matches!(err, PortalError::InvalidStatusTransition { .. }));
    }

    #[test]
    fn test_failed_is_reachable_from_the_road() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let order_id = placed_order(cfg.clone());
        let service = DeliveriesService::new(cfg, order_id);

        // Preparing -> Failed is not a legal move.
        let err = service
            .update_status(&pharmacist(), &test_location(), DeliveryStatus::Failed)
            .expect_err("should reject");
        assert!(matches!(err, PortalError::InvalidStatusTransition { .. }));

        service
            .assign_driver(
                &pharmacist(),
                &test_location(),
                NonEmptyText::new("Alex Mercer").unwrap(),
                None,
            )
            .expect("assign should succeed");
        service
            .update_status(&pharmacist(), &test_location(), DeliveryStatus::Dispatched)
            .expect("dispatch should succeed");

        let failed = service
            .update_status(&pharmacist(), &test_location(), DeliveryStatus::Failed)
            .expect("fail should succeed");
        assert_eq!(failed.status, DeliveryStatus::Failed);
    }
}
