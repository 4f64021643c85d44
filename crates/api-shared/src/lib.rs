//! # API Shared
//!
//! Shared utilities and definitions for the CarePort APIs.
//!
//! Contains:
//! - Request/response wire types (`models` module)
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` (and the CLI where it prints API-shaped data) for common
//! functionality.

pub mod health;
pub mod models;

pub use health::HealthService;
pub use models::*;
