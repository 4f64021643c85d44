//! Portal-wide analytics.
//!
//! The summary is always computed from the stores at call time; nothing here is
//! cached or pre-aggregated. Revenue counts Delivered orders only: money is not
//! earned while an order can still be cancelled.

use crate::config::CoreConfig;
use crate::records::appointment::AppointmentStatus;
use crate::records::delivery::DeliveryStatus;
use crate::records::order::OrderStatus;
use crate::records::prescription::PrescriptionStatus;
use crate::repositories::appointments::list_all_appointments;
use crate::repositories::deliveries::DeliveriesService;
use crate::repositories::inventory::InventoryService;
use crate::repositories::orders::list_orders;
use crate::repositories::patients::PatientsService;
use crate::repositories::prescriptions::list_all_prescriptions;
use crate::PortalResult;
use chrono::NaiveDate;
use std::sync::Arc;

/// Appointment counts by lifecycle status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AppointmentCounts {
    pub scheduled: usize,
    pub confirmed: usize,
    pub completed: usize,
    pub cancelled: usize,
}

/// Prescription counts by lifecycle status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrescriptionCounts {
    pub active: usize,
    pub completed: usize,
    pub expired: usize,
}

/// Order counts by lifecycle status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OrderCounts {
    pub pending: usize,
    pub processing: usize,
    pub ready: usize,
    pub delivered: usize,
    pub cancelled: usize,
}

/// Delivery counts by lifecycle status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryCounts {
    pub preparing: usize,
    pub dispatched: usize,
    pub in_transit: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// A snapshot of the whole portal, computed from the stores.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PortalSummary {
    /// Number of patient records.
    pub total_patients: usize,
    /// Number of appointments across all patients.
    pub total_appointments: usize,
    /// Appointments dated `today`.
    pub appointments_today: usize,
    /// Appointment counts by status.
    pub appointments: AppointmentCounts,
    /// Prescription counts by status.
    pub prescriptions: PrescriptionCounts,
    /// Number of catalogue lines.
    pub inventory_items: usize,
    /// Catalogue lines at or below their reorder level.
    pub low_stock_items: usize,
    /// Number of orders.
    pub total_orders: usize,
    /// Order counts by status.
    pub orders: OrderCounts,
    /// Revenue from Delivered orders, in cents.
    pub revenue_cents: u64,
    /// Delivery counts by status.
    pub deliveries: DeliveryCounts,
}

/// Computes the portal summary as of `today`.
///
/// Corrupt records were already skipped (with warnings) by the underlying list
/// operations, so the summary reflects everything readable.
///
/// # Errors
///
/// Returns a `PortalError` if the catalogue exists but cannot be read.
pub fn summarise(cfg: &Arc<CoreConfig>, today: NaiveDate) -> PortalResult<PortalSummary> {
    let mut summary = PortalSummary::default();

    summary.total_patients = PatientsService::new(cfg.clone()).list_patients().len();

    for (_patient_id, appointment) in list_all_appointments(cfg) {
        summary.total_appointments += 1;
        if appointment.date == today {
            summary.appointments_today += 1;
        }
        match appointment.status {
            AppointmentStatus::Scheduled => summary.appointments.scheduled += 1,
            AppointmentStatus::Confirmed => summary.appointments.confirmed += 1,
            AppointmentStatus::Completed => summary.appointments.completed += 1,
            AppointmentStatus::Cancelled => summary.appointments.cancelled += 1,
        }
    }

    for (_patient_id, prescription) in list_all_prescriptions(cfg) {
        match prescription.status {
            PrescriptionStatus::Active => summary.prescriptions.active += 1,
            PrescriptionStatus::Completed => summary.prescriptions.completed += 1,
            PrescriptionStatus::Expired => summary.prescriptions.expired += 1,
        }
    }

    let inventory = InventoryService::new(cfg.clone()).list()?;
    summary.inventory_items = inventory.len();
    summary.low_stock_items = inventory.iter().filter(|m| m.is_low_stock()).count();

    for order in list_orders(cfg) {
        summary.total_orders += 1;
        match order.status {
            OrderStatus::Pending => summary.orders.pending += 1,
            OrderStatus::Processing => summary.orders.processing += 1,
            OrderStatus::Ready => summary.orders.ready += 1,
            OrderStatus::Delivered => {
                summary.orders.delivered += 1;
                summary.revenue_cents += order.total_cents;
            }
            OrderStatus::Cancelled => summary.orders.cancelled += 1,
        }

        // Each order carries exactly one delivery document.
        let deliveries = DeliveriesService::new(cfg.clone(), order.id.clone());
        match deliveries.get() {
            Ok(delivery) => match delivery.status {
                DeliveryStatus::Preparing => summary.deliveries.preparing += 1,
                DeliveryStatus::Dispatched => summary.deliveries.dispatched += 1,
                DeliveryStatus::InTransit => summary.deliveries.in_transit += 1,
                DeliveryStatus::Delivered => summary.deliveries.delivered += 1,
                DeliveryStatus::Failed => summary.deliveries.failed += 1,
            },
            Err(e) => {
                tracing::warn!("order {} has no readable delivery: {}", order.id, e);
            }
        }
    }

    Ok(summary)
}
