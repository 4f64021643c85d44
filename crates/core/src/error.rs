#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to create record directory: {0}")]
    RecordDirCreation(std::io::Error),
    #[error(
        "initialise failed and cleanup also failed (path: {path}): init={init_error}; cleanup={cleanup_error}",
        path = path.display()
    )]
    CleanupAfterInitialiseFailed {
        path: std::path::PathBuf,
        #[source]
        init_error: Box<PortalError>,
        cleanup_error: std::io::Error,
    },
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize record: {0}")]
    Deserialization(serde_json::Error),
    #[error("record translation error: {0}")]
    Translation(String),
    #[error("failed to append audit entry: {0}")]
    AuditAppend(std::io::Error),

    #[error("identifier error: {0}")]
    Ident(#[from] careport_uuid::IdentError),
    #[error("text error: {0}")]
    Text(#[from] careport_types::TextError),

    #[error("patient record not found: {0}")]
    PatientNotFound(String),
    #[error("appointment not found: {0}")]
    AppointmentNotFound(String),
    #[error("prescription not found: {0}")]
    PrescriptionNotFound(String),
    #[error("medicine not found: {0}")]
    MedicineNotFound(String),
    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },
    #[error("insufficient stock for '{name}': requested {requested}, available {available}")]
    InsufficientStock {
        name: String,
        requested: u32,
        available: u32,
    },
    #[error("medicine '{name}' (batch {batch}) already exists in the catalogue")]
    DuplicateMedicine { name: String, batch: String },
    #[error("delivery cannot be dispatched without an assigned driver")]
    DriverNotAssigned,
}

pub type PortalResult<T> = std::result::Result<T, PortalError>;
