//! Request/response wire types for the CarePort REST API.
//!
//! These are plain serde structs with OpenAPI schemas. Validation happens in
//! `careport-core` when the raw fields are converted into domain types; the API
//! layer only shuttles strings and numbers.
//!
//! Every mutating request carries the author fields (`author_name`, `author_role`,
//! `author_email`) and the `location` the change is made from; both end up in the
//! record's audit journal.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============================================================================
// Health
// ============================================================================

/// Health check response.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

// ============================================================================
// Triage
// ============================================================================

/// Symptom triage request.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TriageReq {
    /// Reported symptom labels, matched case-insensitively.
    pub symptoms: Vec<String>,
}

/// Symptom triage response.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TriageRes {
    /// The suggestion string (fixed vocabulary, not a diagnosis).
    pub suggestion: String,
    /// Severity grade: "low", "medium" or "high".
    pub severity: String,
}

// ============================================================================
// Patients
// ============================================================================

/// Register a new patient.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterPatientReq {
    pub author_name: String,
    pub author_role: String,
    pub author_email: String,
    pub location: String,
    pub given_names: Vec<String>,
    pub family_name: String,
    /// Date of birth as YYYY-MM-DD.
    pub birth_date: String,
    #[serde(default)]
    pub contact_email: Option<String>,
}

/// Result of a patient registration.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterPatientRes {
    pub patient_uuid: String,
}

/// One patient profile.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub id: String,
    pub given_names: Vec<String>,
    pub family_name: String,
    pub birth_date: String,
    pub contact_email: String,
    pub last_updated: String,
}

/// All patient profiles.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientRes>,
}

/// Update an existing patient profile.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdatePatientReq {
    pub author_name: String,
    pub author_role: String,
    pub author_email: String,
    pub location: String,
    pub given_names: Vec<String>,
    pub family_name: String,
    /// Date of birth as YYYY-MM-DD.
    pub birth_date: String,
    #[serde(default)]
    pub contact_email: Option<String>,
}

/// Result of a profile update.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdatePatientRes {
    pub success: bool,
}

// ============================================================================
// Appointments
// ============================================================================

/// Book an appointment for a patient.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BookAppointmentReq {
    pub author_name: String,
    pub author_role: String,
    pub author_email: String,
    pub location: String,
    /// Name of the doctor the appointment is with.
    pub doctor: String,
    /// Appointment date as YYYY-MM-DD.
    pub date: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// One appointment entry.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AppointmentRes {
    pub id: String,
    pub doctor: String,
    pub date: String,
    pub reason: String,
    pub status: String,
    pub booked_at: String,
}

/// A patient's appointments.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListAppointmentsRes {
    pub appointments: Vec<AppointmentRes>,
}

/// One appointment with the patient it belongs to (the doctor's view).
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientAppointmentRes {
    pub patient_id: String,
    pub appointment: AppointmentRes,
}

/// Appointments across all patients.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AllAppointmentsRes {
    pub appointments: Vec<PatientAppointmentRes>,
}

/// Move an appointment to a new status.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateAppointmentStatusReq {
    pub author_name: String,
    pub author_role: String,
    pub author_email: String,
    pub location: String,
    /// Target status: Scheduled, Confirmed, Completed or Cancelled.
    pub status: String,
}

/// Result of cancelling an appointment.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CancelAppointmentRes {
    pub success: bool,
}

// ============================================================================
// Prescriptions
// ============================================================================

/// Issue a prescription for a patient.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct IssuePrescriptionReq {
    pub author_name: String,
    pub author_role: String,
    pub author_email: String,
    pub location: String,
    pub diagnosis: String,
    pub medication: String,
    pub dosage: String,
    pub duration_days: u32,
    /// Issue date as YYYY-MM-DD.
    pub issued_on: String,
}

/// One prescription entry.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PrescriptionRes {
    pub id: String,
    pub diagnosis: String,
    pub medication: String,
    pub dosage: String,
    pub duration_days: u32,
    pub prescribed_by: String,
    pub issued_on: String,
    pub status: String,
}

/// A patient's prescriptions.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListPrescriptionsRes {
    pub prescriptions: Vec<PrescriptionRes>,
}

/// One prescription with the patient it belongs to.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientPrescriptionRes {
    pub patient_id: String,
    pub prescription: PrescriptionRes,
}

/// Prescriptions across all patients.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AllPrescriptionsRes {
    pub prescriptions: Vec<PatientPrescriptionRes>,
}

/// Move a prescription to a new status.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdatePrescriptionStatusReq {
    pub author_name: String,
    pub author_role: String,
    pub author_email: String,
    pub location: String,
    /// Target status: Active, Completed or Expired.
    pub status: String,
}

// ============================================================================
// Inventory
// ============================================================================

/// Add a medicine to the pharmacy catalogue.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AddMedicineReq {
    pub author_name: String,
    pub author_role: String,
    pub author_email: String,
    pub location: String,
    pub name: String,
    pub quantity: u32,
    pub reorder_level: u32,
    pub unit_price_cents: u64,
    pub category: String,
    /// Expiry date as YYYY-MM-DD.
    pub expiry_date: String,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub batch_number: Option<String>,
}

/// One catalogue line.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MedicineRes {
    pub id: String,
    pub name: String,
    pub quantity: u32,
    pub reorder_level: u32,
    pub unit_price_cents: u64,
    pub category: String,
    pub expiry_date: String,
    pub supplier: String,
    pub batch_number: String,
    pub low_stock: bool,
}

/// The whole catalogue (or a filtered view of it).
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListInventoryRes {
    pub medicines: Vec<MedicineRes>,
}

/// Adjust the stock of a catalogue line.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AdjustStockReq {
    pub author_name: String,
    pub author_role: String,
    pub author_email: String,
    pub location: String,
    /// Units to add (positive) or remove (negative); must be non-zero.
    pub delta: i64,
}

// ============================================================================
// Orders
// ============================================================================

/// One requested order line.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderLineReq {
    pub medicine_id: String,
    pub quantity: u32,
}

/// Place an order for a patient.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PlaceOrderReq {
    pub author_name: String,
    pub author_role: String,
    pub author_email: String,
    pub location: String,
    pub patient_uuid: String,
    pub lines: Vec<OrderLineReq>,
    pub address: String,
}

/// One priced order line.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderLineRes {
    pub medicine_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price_cents: u64,
}

/// One order.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderRes {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub lines: Vec<OrderLineRes>,
    pub total_cents: u64,
    pub status: String,
    pub placed_at: String,
}

/// All orders.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListOrdersRes {
    pub orders: Vec<OrderRes>,
}

/// Move an order to a new status.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateOrderStatusReq {
    pub author_name: String,
    pub author_role: String,
    pub author_email: String,
    pub location: String,
    /// Target status: Pending, Processing, Ready, Delivered or Cancelled.
    pub status: String,
}

// ============================================================================
// Deliveries
// ============================================================================

/// One delivery.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DeliveryRes {
    pub order_id: String,
    pub address: String,
    pub driver_name: String,
    pub driver_phone: String,
    pub tracking_number: String,
    pub status: String,
    pub updated_at: String,
}

/// Assign a driver to a delivery.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AssignDriverReq {
    pub author_name: String,
    pub author_role: String,
    pub author_email: String,
    pub location: String,
    pub driver_name: String,
    #[serde(default)]
    pub driver_phone: Option<String>,
}

/// Move a delivery to a new status.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateDeliveryStatusReq {
    pub author_name: String,
    pub author_role: String,
    pub author_email: String,
    pub location: String,
    /// Target status: Preparing, Dispatched, In Transit, Delivered or Failed.
    pub status: String,
}

// ============================================================================
// Analytics
// ============================================================================

/// Appointment counts by status.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct AppointmentCountsRes {
    pub scheduled: usize,
    pub confirmed: usize,
    pub completed: usize,
    pub cancelled: usize,
}

/// Prescription counts by status.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct PrescriptionCountsRes {
    pub active: usize,
    pub completed: usize,
    pub expired: usize,
}

/// Order counts by status.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct OrderCountsRes {
    pub pending: usize,
    pub processing: usize,
    pub ready: usize,
    pub delivered: usize,
    pub cancelled: usize,
}

/// Delivery counts by status.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct DeliveryCountsRes {
    pub preparing: usize,
    pub dispatched: usize,
    pub in_transit: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Portal-wide summary computed from the stores.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsSummaryRes {
    pub total_patients: usize,
    pub total_appointments: usize,
    pub appointments_today: usize,
    pub appointments: AppointmentCountsRes,
    pub prescriptions: PrescriptionCountsRes,
    pub inventory_items: usize,
    pub low_stock_items: usize,
    pub total_orders: usize,
    pub orders: OrderCountsRes,
    pub revenue_cents: u64,
    pub deliveries: DeliveryCountsRes,
}
