//! # CarePort Core
//!
//! Core business logic for the CarePort healthcare portal.
//!
//! This crate contains pure data operations and file/folder management:
//! - Patient record creation, profile updates and listing with sharded JSON storage
//! - Appointment and prescription entries kept inside each patient record
//! - Pharmacy inventory, order placement and delivery tracking
//! - An append-only audit journal per record
//! - Portal-wide analytics computed from the stores
//!
//! **No API concerns**: HTTP servers, OpenAPI documentation or request/response
//! shapes belong in `api-rest` and `api-shared`.

pub mod analytics;
pub mod audit;
pub mod author;
pub mod config;
pub mod constants;
pub mod error;
pub mod records;
pub mod repositories;
pub mod validation;

pub use audit::{AuditAction, AuditEntry};
pub use author::{Author, PortalRole};
pub use careport_types::{EmailAddress, NonEmptyText, TextError};
pub use careport_uuid::{ShardableUuid, TimestampId};
pub use config::CoreConfig;
pub use constants::DEFAULT_PORTAL_DATA_DIR;
pub use error::{PortalError, PortalResult};
