//! # API REST
//!
//! REST API implementation for CarePort.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status-code mapping)
//!
//! Uses `api-shared` for the wire types and `careport-core` for all data
//! operations. The router is built by [`build_router`] so both the standalone
//! binary and the workspace's `careport-run` binary (and the integration tests)
//! serve the same application.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::models as api;
use api_shared::HealthService;
use careport_core::records::appointment::AppointmentData;
use careport_core::records::delivery::DeliveryData;
use careport_core::records::medicine::MedicineData;
use careport_core::records::order::OrderData;
use careport_core::records::patient::PatientProfileData;
use careport_core::records::prescription::PrescriptionData;
use careport_core::repositories::appointments::{self, AppointmentsService};
use careport_core::repositories::deliveries::DeliveriesService;
use careport_core::repositories::inventory::{InventoryService, NewMedicine};
use careport_core::repositories::orders::{self, OrderRequestLine, OrdersService};
use careport_core::repositories::patients::PatientsService;
use careport_core::repositories::prescriptions::{self, NewPrescription, PrescriptionsService};
use careport_core::repositories::shared::register_patient;
use careport_core::validation::parse_iso_date;
use careport_core::{
    analytics, Author, CoreConfig, EmailAddress, NonEmptyText, PortalError, ShardableUuid,
};

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<CoreConfig>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        triage_check,
        list_patients,
        register_patient_handler,
        get_patient,
        update_patient,
        book_appointment,
        list_appointments,
        list_all_appointments,
        update_appointment_status,
        cancel_appointment,
        issue_prescription,
        list_prescriptions,
        list_all_prescriptions,
        update_prescription_status,
        list_inventory,
        add_medicine,
        adjust_stock,
        low_stock,
        place_order,
        list_orders,
        get_order,
        update_order_status,
        get_delivery,
        assign_driver,
        update_delivery_status,
        analytics_summary,
    ),
    components(schemas(
        api::HealthRes,
        api::TriageReq,
        api::TriageRes,
        api::RegisterPatientReq,
        api::RegisterPatientRes,
        api::PatientRes,
        api::ListPatientsRes,
        api::UpdatePatientReq,
        api::UpdatePatientRes,
        api::BookAppointmentReq,
        api::AppointmentRes,
        api::ListAppointmentsRes,
        api::PatientAppointmentRes,
        api::AllAppointmentsRes,
        api::UpdateAppointmentStatusReq,
        api::CancelAppointmentRes,
        api::IssuePrescriptionReq,
        api::PrescriptionRes,
        api::ListPrescriptionsRes,
        api::PatientPrescriptionRes,
        api::AllPrescriptionsRes,
        api::UpdatePrescriptionStatusReq,
        api::AddMedicineReq,
        api::MedicineRes,
        api::ListInventoryRes,
        api::AdjustStockReq,
        api::OrderLineReq,
        api::PlaceOrderReq,
        api::OrderLineRes,
        api::OrderRes,
        api::ListOrdersRes,
        api::UpdateOrderStatusReq,
        api::DeliveryRes,
        api::AssignDriverReq,
        api::UpdateDeliveryStatusReq,
        api::AppointmentCountsRes,
        api::PrescriptionCountsRes,
        api::OrderCountsRes,
        api::DeliveryCountsRes,
        api::AnalyticsSummaryRes,
    ))
)]
struct ApiDoc;

/// Builds the CarePort REST router.
///
/// Includes every portal route, the Swagger UI, and a permissive CORS layer.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/triage", post(triage_check))
        .route("/patients", get(list_patients))
        .route("/patients", post(register_patient_handler))
        .route("/patients/:id", get(get_patient))
        .route("/patients/:id", put(update_patient))
        .route("/patients/:id/appointments", post(book_appointment))
        .route("/patients/:id/appointments", get(list_appointments))
        .route(
            "/patients/:id/appointments/:appointment_id/status",
            put(update_appointment_status),
        )
        .route(
            "/patients/:id/appointments/:appointment_id",
            delete(cancel_appointment),
        )
        .route("/appointments", get(list_all_appointments))
        .route("/patients/:id/prescriptions", post(issue_prescription))
        .route("/patients/:id/prescriptions", get(list_prescriptions))
        .route(
            "/patients/:id/prescriptions/:prescription_id/status",
            put(update_prescription_status),
        )
        .route("/prescriptions", get(list_all_prescriptions))
        .route("/inventory", get(list_inventory))
        .route("/inventory", post(add_medicine))
        .route("/inventory/:id/stock", put(adjust_stock))
        .route("/inventory/low-stock", get(low_stock))
        .route("/orders", post(place_order))
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", put(update_order_status))
        .route("/orders/:id/delivery", get(get_delivery))
        .route("/orders/:id/delivery/driver", put(assign_driver))
        .route("/orders/:id/delivery/status", put(update_delivery_status))
        .route("/analytics/summary", get(analytics_summary))
        .merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Error mapping & conversion helpers
// ============================================================================

/// Maps a core error onto an HTTP status, logging it at the API boundary.
fn error_response(context: &str, e: PortalError) -> (StatusCode, &'static str) {
    match e {
        PortalError::InvalidInput(_) | PortalError::Ident(_) | PortalError::Text(_) => {
            tracing::error!("{context} rejected: {e}");
            (StatusCode::BAD_REQUEST, "Invalid input")
        }
        PortalError::PatientNotFound(_)
        | PortalError::AppointmentNotFound(_)
        | PortalError::PrescriptionNotFound(_)
        | PortalError::MedicineNotFound(_)
        | PortalError::OrderNotFound(_) => {
            tracing::error!("{context} target missing: {e}");
            (StatusCode::NOT_FOUND, "Not found")
        }
        PortalError::InvalidStatusTransition { .. }
        | PortalError::InsufficientStock { .. }
        | PortalError::DuplicateMedicine { .. }
        | PortalError::DriverNotAssigned => {
            tracing::error!("{context} conflict: {e}");
            (StatusCode::CONFLICT, "Conflict")
        }
        other => {
            tracing::error!("{context} error: {other:?}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

type HandlerResult<T> = Result<Json<T>, (StatusCode, &'static str)>;

fn build_author(name: &str, role: &str, email: &str) -> Result<Author, PortalError> {
    Author::from_parts(name, role, email)
}

fn build_location(location: &str) -> Result<NonEmptyText, PortalError> {
    Ok(NonEmptyText::new(location)?)
}

fn patient_res(p: PatientProfileData) -> api::PatientRes {
    api::PatientRes {
        id: p.id.to_string(),
        given_names: p.given.clone(),
        family_name: p.family.clone().unwrap_or_default(),
        birth_date: p.birth_date.clone().unwrap_or_default(),
        contact_email: p
            .contact_email
            .as_ref()
            .map(|e| e.as_str().to_owned())
            .unwrap_or_default(),
        last_updated: p.last_updated.map(|dt| dt.to_rfc3339()).unwrap_or_default(),
    }
}

fn appointment_res(a: AppointmentData) -> api::AppointmentRes {
    api::AppointmentRes {
        id: a.id.to_string(),
        doctor: a.doctor,
        date: a.date.format("%Y-%m-%d").to_string(),
        reason: a.reason.unwrap_or_default(),
        status: a.status.to_wire().to_string(),
        booked_at: a.booked_at.to_rfc3339(),
    }
}

fn prescription_res(p: PrescriptionData) -> api::PrescriptionRes {
    api::PrescriptionRes {
        id: p.id.to_string(),
        diagnosis: p.diagnosis,
        medication: p.medication,
        dosage: p.dosage,
        duration_days: p.duration_days,
        prescribed_by: p.prescribed_by,
        issued_on: p.issued_on.format("%Y-%m-%d").to_string(),
        status: p.status.to_wire().to_string(),
    }
}

fn medicine_res(m: MedicineData) -> api::MedicineRes {
    let low_stock = m.is_low_stock();
    api::MedicineRes {
        id: m.id.to_string(),
        name: m.name,
        quantity: m.quantity,
        reorder_level: m.reorder_level,
        unit_price_cents: m.unit_price_cents,
        category: m.category,
        expiry_date: m.expiry_date.format("%Y-%m-%d").to_string(),
        supplier: m.supplier.unwrap_or_default(),
        batch_number: m.batch_number.unwrap_or_default(),
        low_stock,
    }
}

fn order_res(o: OrderData) -> api::OrderRes {
    api::OrderRes {
        id: o.id.to_string(),
        patient_id: o.patient_id.to_string(),
        patient_name: o.patient_name,
        lines: o
            .lines
            .into_iter()
            .map(|l| api::OrderLineRes {
                medicine_id: l.medicine_id.to_string(),
                name: l.name,
                quantity: l.quantity,
                unit_price_cents: l.unit_price_cents,
            })
            .collect(),
        total_cents: o.total_cents,
        status: o.status.to_wire().to_string(),
        placed_at: o.placed_at.to_rfc3339(),
    }
}

fn delivery_res(d: DeliveryData) -> api::DeliveryRes {
    api::DeliveryRes {
        order_id: d.order_id.to_string(),
        address: d.address,
        driver_name: d.driver_name.unwrap_or_default(),
        driver_phone: d.driver_phone.unwrap_or_default(),
        tracking_number: d.tracking_number,
        status: d.status.to_wire().to_string(),
        updated_at: d.updated_at.to_rfc3339(),
    }
}

// ============================================================================
// Health & triage
// ============================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = api::HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Returns the current health status of the CarePort service.
/// This endpoint is used for monitoring and load balancer health checks.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<api::HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/triage",
    request_body = api::TriageReq,
    responses(
        (status = 200, description = "Triage outcome", body = api::TriageRes)
    )
)]
/// Run the symptom checker
///
/// Maps the reported symptom labels to a single suggestion and a severity grade.
/// The check is pure: an empty symptom list is a valid input with its own outcome,
/// and this endpoint cannot fail.
#[axum::debug_handler]
async fn triage_check(
    State(_state): State<AppState>,
    Json(req): Json<api::TriageReq>,
) -> Json<api::TriageRes> {
    let report = triage::assess(&req.symptoms);
    Json(api::TriageRes {
        suggestion: report.suggestion.to_string(),
        severity: report.severity.to_string(),
    })
}

// ============================================================================
// Patients
// ============================================================================

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "List of patients", body = api::ListPatientsRes)
    )
)]
/// List all patients in the portal
#[axum::debug_handler]
async fn list_patients(State(state): State<AppState>) -> Json<api::ListPatientsRes> {
    let patients = PatientsService::new(state.cfg.clone())
        .list_patients()
        .into_iter()
        .map(patient_res)
        .collect();
    Json(api::ListPatientsRes { patients })
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = api::RegisterPatientReq,
    responses(
        (status = 200, description = "Patient registered", body = api::RegisterPatientRes),
        (status = 400, description = "Bad request"),
        (status = 500, description = "Internal server error")
    )
)]
/// Register a new patient
///
/// Initialises the record and populates the profile in one call.
#[axum::debug_handler]
async fn register_patient_handler(
    State(state): State<AppState>,
    Json(req): Json<api::RegisterPatientReq>,
) -> HandlerResult<api::RegisterPatientRes> {
    let run = || -> Result<api::RegisterPatientRes, PortalError> {
        let author = build_author(&req.author_name, &req.author_role, &req.author_email)?;
        let location = build_location(&req.location)?;
        let contact_email = req
            .contact_email
            .as_deref()
            .map(EmailAddress::parse)
            .transpose()?;

        let registered = register_patient(
            state.cfg.clone(),
            author,
            location,
            req.given_names,
            req.family_name,
            req.birth_date,
            contact_email,
        )?;

        Ok(api::RegisterPatientRes {
            patient_uuid: registered.patient_uuid,
        })
    };

    run().map(Json).map_err(|e| error_response("Register patient", e))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    responses(
        (status = 200, description = "Patient profile", body = api::PatientRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found")
    )
)]
/// Read one patient profile
#[axum::debug_handler]
async fn get_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> HandlerResult<api::PatientRes> {
    let run = || -> Result<api::PatientRes, PortalError> {
        let service = PatientsService::with_id(state.cfg.clone(), &id)?;
        Ok(patient_res(service.get()?))
    };

    run().map(Json).map_err(|e| error_response("Get patient", e))
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    request_body = api::UpdatePatientReq,
    responses(
        (status = 200, description = "Profile updated", body = api::UpdatePatientRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found")
    )
)]
/// Update a patient profile
#[axum::debug_handler]
async fn update_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<api::UpdatePatientReq>,
) -> HandlerResult<api::UpdatePatientRes> {
    let run = || -> Result<api::UpdatePatientRes, PortalError> {
        let author = build_author(&req.author_name, &req.author_role, &req.author_email)?;
        let location = build_location(&req.location)?;
        let contact_email = req
            .contact_email
            .as_deref()
            .map(EmailAddress::parse)
            .transpose()?;

        let service = PatientsService::with_id(state.cfg.clone(), &id)?;
        service.update_profile(
            &author,
            &location,
            req.given_names,
            &req.family_name,
            &req.birth_date,
            contact_email,
        )?;

        Ok(api::UpdatePatientRes { success: true })
    };

    run().map(Json).map_err(|e| error_response("Update patient", e))
}

// ============================================================================
// Appointments
// ============================================================================

#[utoipa::path(
    post,
    path = "/patients/{id}/appointments",
    request_body = api::BookAppointmentReq,
    responses(
        (status = 200, description = "Appointment booked", body = api::AppointmentRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found")
    )
)]
/// Book an appointment for a patient
#[axum::debug_handler]
async fn book_appointment(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<api::BookAppointmentReq>,
) -> HandlerResult<api::AppointmentRes> {
    let run = || -> Result<api::AppointmentRes, PortalError> {
        let author = build_author(&req.author_name, &req.author_role, &req.author_email)?;
        let location = build_location(&req.location)?;
        let doctor = NonEmptyText::new(&req.doctor)?;
        let date = parse_iso_date("date", &req.date)?;

        let service = AppointmentsService::with_id(state.cfg.clone(), &id)?;
        let appointment = service.book(&author, &location, doctor, date, req.reason)?;
        Ok(appointment_res(appointment))
    };

    run().map(Json).map_err(|e| error_response("Book appointment", e))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/appointments",
    responses(
        (status = 200, description = "The patient's appointments", body = api::ListAppointmentsRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found")
    )
)]
/// List one patient's appointments
#[axum::debug_handler]
async fn list_appointments(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> HandlerResult<api::ListAppointmentsRes> {
    let run = || -> Result<api::ListAppointmentsRes, PortalError> {
        let service = AppointmentsService::with_id(state.cfg.clone(), &id)?;
        let appointments = service.list()?.into_iter().map(appointment_res).collect();
        Ok(api::ListAppointmentsRes { appointments })
    };

    run().map(Json).map_err(|e| error_response("List appointments", e))
}

/// Optional date filter for the cross-patient appointment listing.
#[derive(Debug, Deserialize)]
struct AppointmentsFilter {
    /// When set, only appointments on this date (YYYY-MM-DD) are returned.
    date: Option<String>,
}

#[utoipa::path(
    get,
    path = "/appointments",
    params(
        ("date" = Option<String>, Query, description = "Only appointments on this YYYY-MM-DD date")
    ),
    responses(
        (status = 200, description = "Appointments across all patients", body = api::AllAppointmentsRes),
        (status = 400, description = "Bad request")
    )
)]
/// List appointments across all patients (the doctor's view)
#[axum::debug_handler]
async fn list_all_appointments(
    State(state): State<AppState>,
    Query(filter): Query<AppointmentsFilter>,
) -> HandlerResult<api::AllAppointmentsRes> {
    let run = || -> Result<api::AllAppointmentsRes, PortalError> {
        let on_date = filter
            .date
            .as_deref()
            .map(|d| parse_iso_date("date", d))
            .transpose()?;

        let appointments = appointments::list_all_appointments(&state.cfg)
            .into_iter()
            .filter(|(_, a)| on_date.map_or(true, |d| a.date == d))
            .map(|(patient_id, a)| api::PatientAppointmentRes {
                patient_id: patient_id.to_string(),
                appointment: appointment_res(a),
            })
            .collect();

        Ok(api::AllAppointmentsRes { appointments })
    };

    run().map(Json).map_err(|e| error_response("List all appointments", e))
}

#[utoipa::path(
    put,
    path = "/patients/{id}/appointments/{appointment_id}/status",
    request_body = api::UpdateAppointmentStatusReq,
    responses(
        (status = 200, description = "Appointment updated", body = api::AppointmentRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Illegal status transition")
    )
)]
/// Move an appointment to a new status
#[axum::debug_handler]
async fn update_appointment_status(
    State(state): State<AppState>,
    AxumPath((id, appointment_id)): AxumPath<(String, String)>,
    Json(req): Json<api::UpdateAppointmentStatusReq>,
) -> HandlerResult<api::AppointmentRes> {
    let run = || -> Result<api::AppointmentRes, PortalError> {
        let author = build_author(&req.author_name, &req.author_role, &req.author_email)?;
        let location = build_location(&req.location)?;
        let status = req.status.parse()?;

        let service = AppointmentsService::with_id(state.cfg.clone(), &id)?;
        let appointment = service.update_status(&author, &location, &appointment_id, status)?;
        Ok(appointment_res(appointment))
    };

    run().map(Json).map_err(|e| error_response("Update appointment status", e))
}

#[utoipa::path(
    delete,
    path = "/patients/{id}/appointments/{appointment_id}",
    request_body = api::UpdateAppointmentStatusReq,
    responses(
        (status = 200, description = "Appointment cancelled", body = api::CancelAppointmentRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Illegal status transition")
    )
)]
/// Cancel an appointment
#[axum::debug_handler]
async fn cancel_appointment(
    State(state): State<AppState>,
    AxumPath((id, appointment_id)): AxumPath<(String, String)>,
    Json(req): Json<api::UpdateAppointmentStatusReq>,
) -> HandlerResult<api::CancelAppointmentRes> {
    let run = || -> Result<api::CancelAppointmentRes, PortalError> {
        let author = build_author(&req.author_name, &req.author_role, &req.author_email)?;
        let location = build_location(&req.location)?;

        let service = AppointmentsService::with_id(state.cfg.clone(), &id)?;
        service.cancel(&author, &location, &appointment_id)?;
        Ok(api::CancelAppointmentRes { success: true })
    };

    run().map(Json).map_err(|e| error_response("Cancel appointment", e))
}

// ============================================================================
// Prescriptions
// ============================================================================

#[utoipa::path(
    post,
    path = "/patients/{id}/prescriptions",
    request_body = api::IssuePrescriptionReq,
    responses(
        (status = 200, description = "Prescription issued", body = api::PrescriptionRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found")
    )
)]
/// Issue a prescription for a patient
///
/// The author must be acting in the doctor role; the author's name is recorded
/// as the prescriber.
#[axum::debug_handler]
async fn issue_prescription(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<api::IssuePrescriptionReq>,
) -> HandlerResult<api::PrescriptionRes> {
    let run = || -> Result<api::PrescriptionRes, PortalError> {
        let author = build_author(&req.author_name, &req.author_role, &req.author_email)?;
        let location = build_location(&req.location)?;

        let new = NewPrescription {
            diagnosis: NonEmptyText::new(&req.diagnosis)?,
            medication: NonEmptyText::new(&req.medication)?,
            dosage: NonEmptyText::new(&req.dosage)?,
            duration_days: req.duration_days,
            issued_on: parse_iso_date("issued_on", &req.issued_on)?,
        };

        let service = PrescriptionsService::with_id(state.cfg.clone(), &id)?;
        let prescription = service.issue(&author, &location, new)?;
        Ok(prescription_res(prescription))
    };

    run().map(Json).map_err(|e| error_response("Issue prescription", e))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/prescriptions",
    responses(
        (status = 200, description = "The patient's prescriptions", body = api::ListPrescriptionsRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found")
    )
)]
/// List one patient's prescriptions
#[axum::debug_handler]
async fn list_prescriptions(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> HandlerResult<api::ListPrescriptionsRes> {
    let run = || -> Result<api::ListPrescriptionsRes, PortalError> {
        let service = PrescriptionsService::with_id(state.cfg.clone(), &id)?;
        let prescriptions = service.list()?.into_iter().map(prescription_res).collect();
        Ok(api::ListPrescriptionsRes { prescriptions })
    };

    run().map(Json).map_err(|e| error_response("List prescriptions", e))
}

#[utoipa::path(
    get,
    path = "/prescriptions",
    responses(
        (status = 200, description = "Prescriptions across all patients", body = api::AllPrescriptionsRes)
    )
)]
/// List prescriptions across all patients
#[axum::debug_handler]
async fn list_all_prescriptions(
    State(state): State<AppState>,
) -> Json<api::AllPrescriptionsRes> {
    let prescriptions = prescriptions::list_all_prescriptions(&state.cfg)
        .into_iter()
        .map(|(patient_id, p)| api::PatientPrescriptionRes {
            patient_id: patient_id.to_string(),
            prescription: prescription_res(p),
        })
        .collect();

    Json(api::AllPrescriptionsRes { prescriptions })
}

#[utoipa::path(
    put,
    path = "/patients/{id}/prescriptions/{prescription_id}/status",
    request_body = api::UpdatePrescriptionStatusReq,
    responses(
        (status = 200, description = "Prescription updated", body = api::PrescriptionRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Illegal status transition")
    )
)]
/// Move a prescription to a new status
#[axum::debug_handler]
async fn update_prescription_status(
    State(state): State<AppState>,
    AxumPath((id, prescription_id)): AxumPath<(String, String)>,
    Json(req): Json<api::UpdatePrescriptionStatusReq>,
) -> HandlerResult<api::PrescriptionRes> {
    let run = || -> Result<api::PrescriptionRes, PortalError> {
        let author = build_author(&req.author_name, &req.author_role, &req.author_email)?;
        let location = build_location(&req.location)?;
        let status = req.status.parse()?;

        let service = PrescriptionsService::with_id(state.cfg.clone(), &id)?;
        let prescription = service.update_status(&author, &location, &prescription_id, status)?;
        Ok(prescription_res(prescription))
    };

    run().map(Json).map_err(|e| error_response("Update prescription status", e))
}

// ============================================================================
// Inventory
// ============================================================================

#[utoipa::path(
    get,
    path = "/inventory",
    responses(
        (status = 200, description = "The pharmacy catalogue", body = api::ListInventoryRes),
        (status = 500, description = "Internal server error")
    )
)]
/// List the pharmacy catalogue
#[axum::debug_handler]
async fn list_inventory(State(state): State<AppState>) -> HandlerResult<api::ListInventoryRes> {
    let run = || -> Result<api::ListInventoryRes, PortalError> {
        let medicines = InventoryService::new(state.cfg.clone())
            .list()?
            .into_iter()
            .map(medicine_res)
            .collect();
        Ok(api::ListInventoryRes { medicines })
    };

    run().map(Json).map_err(|e| error_response("List inventory", e))
}

#[utoipa::path(
    post,
    path = "/inventory",
    request_body = api::AddMedicineReq,
    responses(
        (status = 200, description = "Medicine added", body = api::MedicineRes),
        (status = 400, description = "Bad request"),
        (status = 409, description = "Duplicate medicine")
    )
)]
/// Add a medicine to the catalogue
#[axum::debug_handler]
async fn add_medicine(
    State(state): State<AppState>,
    Json(req): Json<api::AddMedicineReq>,
) -> HandlerResult<api::MedicineRes> {
    let run = || -> Result<api::MedicineRes, PortalError> {
        let author = build_author(&req.author_name, &req.author_role, &req.author_email)?;
        let location = build_location(&req.location)?;

        let new = NewMedicine {
            name: NonEmptyText::new(&req.name)?,
            quantity: req.quantity,
            reorder_level: req.reorder_level,
            unit_price_cents: req.unit_price_cents,
            category: NonEmptyText::new(&req.category)?,
            expiry_date: parse_iso_date("expiry_date", &req.expiry_date)?,
            supplier: req.supplier,
            batch_number: req.batch_number,
        };

        let medicine = InventoryService::new(state.cfg.clone()).add_medicine(&author, &location, new)?;
        Ok(medicine_res(medicine))
    };

    run().map(Json).map_err(|e| error_response("Add medicine", e))
}

#[utoipa::path(
    put,
    path = "/inventory/{id}/stock",
    request_body = api::AdjustStockReq,
    responses(
        (status = 200, description = "Stock adjusted", body = api::MedicineRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Insufficient stock")
    )
)]
/// Adjust the stock of a catalogue line
#[axum::debug_handler]
async fn adjust_stock(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<api::AdjustStockReq>,
) -> HandlerResult<api::MedicineRes> {
    let run = || -> Result<api::MedicineRes, PortalError> {
        let author = build_author(&req.author_name, &req.author_role, &req.author_email)?;
        let location = build_location(&req.location)?;
        let medicine_id = ShardableUuid::parse(&id)?;

        let medicine = InventoryService::new(state.cfg.clone())
            .adjust_stock(&author, &location, &medicine_id, req.delta)?;
        Ok(medicine_res(medicine))
    };

    run().map(Json).map_err(|e| error_response("Adjust stock", e))
}

#[utoipa::path(
    get,
    path = "/inventory/low-stock",
    responses(
        (status = 200, description = "Catalogue lines at or below their reorder level", body = api::ListInventoryRes),
        (status = 500, description = "Internal server error")
    )
)]
/// List catalogue lines at or below their reorder level
#[axum::debug_handler]
async fn low_stock(State(state): State<AppState>) -> HandlerResult<api::ListInventoryRes> {
    let run = || -> Result<api::ListInventoryRes, PortalError> {
        let medicines = InventoryService::new(state.cfg.clone())
            .low_stock()?
            .into_iter()
            .map(medicine_res)
            .collect();
        Ok(api::ListInventoryRes { medicines })
    };

    run().map(Json).map_err(|e| error_response("Low stock", e))
}

// ============================================================================
// Orders & deliveries
// ============================================================================

#[utoipa::path(
    post,
    path = "/orders",
    request_body = api::PlaceOrderReq,
    responses(
        (status = 200, description = "Order placed", body = api::OrderRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Insufficient stock")
    )
)]
/// Place an order for a patient
///
/// Validates every line against the catalogue, decrements stock, and creates the
/// order record together with its delivery document.
#[axum::debug_handler]
async fn place_order(
    State(state): State<AppState>,
    Json(req): Json<api::PlaceOrderReq>,
) -> HandlerResult<api::OrderRes> {
    let run = || -> Result<api::OrderRes, PortalError> {
        let author = build_author(&req.author_name, &req.author_role, &req.author_email)?;
        let location = build_location(&req.location)?;
        let patient_id = ShardableUuid::parse(&req.patient_uuid)?;
        let address = NonEmptyText::new(&req.address)?;

        let lines = req
            .lines
            .into_iter()
            .map(|l| {
                Ok(OrderRequestLine {
                    medicine_id: ShardableUuid::parse(&l.medicine_id)?,
                    quantity: l.quantity,
                })
            })
            .collect::<Result<Vec<_>, PortalError>>()?;

        let (_service, order) =
            OrdersService::new(state.cfg.clone()).place(&author, &location, &patient_id, lines, address)?;
        Ok(order_res(order))
    };

    run().map(Json).map_err(|e| error_response("Place order", e))
}

#[utoipa::path(
    get,
    path = "/orders",
    responses(
        (status = 200, description = "All orders", body = api::ListOrdersRes)
    )
)]
/// List all orders
#[axum::debug_handler]
async fn list_orders(State(state): State<AppState>) -> Json<api::ListOrdersRes> {
    let orders = orders::list_orders(&state.cfg)
        .into_iter()
        .map(order_res)
        .collect();
    Json(api::ListOrdersRes { orders })
}

#[utoipa::path(
    get,
    path = "/orders/{id}",
    responses(
        (status = 200, description = "One order", body = api::OrderRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found")
    )
)]
/// Read one order
#[axum::debug_handler]
async fn get_order(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> HandlerResult<api::OrderRes> {
    let run = || -> Result<api::OrderRes, PortalError> {
        let service = OrdersService::with_id(state.cfg.clone(), &id)?;
        Ok(order_res(service.get()?))
    };

    run().map(Json).map_err(|e| error_response("Get order", e))
}

#[utoipa::path(
    put,
    path = "/orders/{id}/status",
    request_body = api::UpdateOrderStatusReq,
    responses(
        (status = 200, description = "Order updated", body = api::OrderRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Illegal status transition")
    )
)]
/// Move an order to a new status
///
/// Cancelling returns the order's lines to the catalogue.
#[axum::debug_handler]
async fn update_order_status(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<api::UpdateOrderStatusReq>,
) -> HandlerResult<api::OrderRes> {
    let run = || -> Result<api::OrderRes, PortalError> {
        let author = build_author(&req.author_name, &req.author_role, &req.author_email)?;
        let location = build_location(&req.location)?;
        let status = req.status.parse()?;

        let service = OrdersService::with_id(state.cfg.clone(), &id)?;
        let order = service.update_status(&author, &location, status)?;
        Ok(order_res(order))
    };

    run().map(Json).map_err(|e| error_response("Update order status", e))
}

#[utoipa::path(
    get,
    path = "/orders/{id}/delivery",
    responses(
        (status = 200, description = "The order's delivery", body = api::DeliveryRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found")
    )
)]
/// Read the delivery of an order
#[axum::debug_handler]
async fn get_delivery(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> HandlerResult<api::DeliveryRes> {
    let run = || -> Result<api::DeliveryRes, PortalError> {
        let service = DeliveriesService::with_id(state.cfg.clone(), &id)?;
        Ok(delivery_res(service.get()?))
    };

    run().map(Json).map_err(|e| error_response("Get delivery", e))
}

#[utoipa::path(
    put,
    path = "/orders/{id}/delivery/driver",
    request_body = api::AssignDriverReq,
    responses(
        (status = 200, description = "Driver assigned", body = api::DeliveryRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found")
    )
)]
/// Assign a driver to the delivery of an order
#[axum::debug_handler]
async fn assign_driver(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<api::AssignDriverReq>,
) -> HandlerResult<api::DeliveryRes> {
    let run = || -> Result<api::DeliveryRes, PortalError> {
        let author = build_author(&req.author_name, &req.author_role, &req.author_email)?;
        let location = build_location(&req.location)?;
        let driver_name = NonEmptyText::new(&req.driver_name)?;

        let service = DeliveriesService::with_id(state.cfg.clone(), &id)?;
        let delivery = service.assign_driver(&author, &location, driver_name, req.driver_phone)?;
        Ok(delivery_res(delivery))
    };

    run().map(Json).map_err(|e| error_response("Assign driver", e))
}

#[utoipa::path(
    put,
    path = "/orders/{id}/delivery/status",
    request_body = api::UpdateDeliveryStatusReq,
    responses(
        (status = 200, description = "Delivery updated", body = api::DeliveryRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Illegal status transition or no driver assigned")
    )
)]
/// Move a delivery to a new status
///
/// Dispatching requires a driver to have been assigned first.
#[axum::debug_handler]
async fn update_delivery_status(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<api::UpdateDeliveryStatusReq>,
) -> HandlerResult<api::DeliveryRes> {
    let run = || -> Result<api::DeliveryRes, PortalError> {
        let author = build_author(&req.author_name, &req.author_role, &req.author_email)?;
        let location = build_location(&req.location)?;
        let status = req.status.parse()?;

        let service = DeliveriesService::with_id(state.cfg.clone(), &id)?;
        let delivery = service.update_status(&author, &location, status)?;
        Ok(delivery_res(delivery))
    };

    run().map(Json).map_err(|e| error_response("Update delivery status", e))
}

// ============================================================================
// Analytics
// ============================================================================

#[utoipa::path(
    get,
    path = "/analytics/summary",
    responses(
        (status = 200, description = "Portal-wide summary", body = api::AnalyticsSummaryRes),
        (status = 500, description = "Internal server error")
    )
)]
/// Portal-wide summary computed from the stores
#[axum::debug_handler]
async fn analytics_summary(
    State(state): State<AppState>,
) -> HandlerResult<api::AnalyticsSummaryRes> {
    let run = || -> Result<api::AnalyticsSummaryRes, PortalError> {
        let summary = analytics::summarise(&state.cfg, Utc::now().date_naive())?;

        Ok(api::AnalyticsSummaryRes {
            total_patients: summary.total_patients,
            total_appointments: summary.total_appointments,
            appointments_today: summary.appointments_today,
            appointments: api::AppointmentCountsRes {
                scheduled: summary.appointments.scheduled,
                confirmed: summary.appointments.confirmed,
                completed: summary.appointments.completed,
                cancelled: summary.appointments.cancelled,
            },
            prescriptions: api::PrescriptionCountsRes {
                active: summary.prescriptions.active,
                completed: summary.prescriptions.completed,
                expired: summary.prescriptions.expired,
            },
            inventory_items: summary.inventory_items,
            low_stock_items: summary.low_stock_items,
            total_orders: summary.total_orders,
            orders: api::OrderCountsRes {
                pending: summary.orders.pending,
                processing: summary.orders.processing,
                ready: summary.orders.ready,
                delivered: summary.orders.delivered,
                cancelled: summary.orders.cancelled,
            },
            revenue_cents: summary.revenue_cents,
            deliveries: api::DeliveryCountsRes {
                preparing: summary.deliveries.preparing,
                dispatched: summary.deliveries.dispatched,
                in_transit: summary.deliveries.in_transit,
                delivered: summary.deliveries.delivered,
                failed: summary.deliveries.failed,
            },
        })
    };

    run().map(Json).map_err(|e| error_response("Analytics summary", e))
}
