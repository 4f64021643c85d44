//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses.

use crate::constants::{
    INVENTORY_FILENAME, ORDERS_DIR_NAME, PATIENTS_DIR_NAME, PHARMACY_DIR_NAME,
};
use crate::validation::validate_namespace_safe_for_uri;
use crate::PortalResult;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    portal_data_dir: PathBuf,
    portal_namespace: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::InvalidInput` if the namespace is empty or not URI-safe.
    pub fn new(portal_data_dir: PathBuf, portal_namespace: String) -> PortalResult<Self> {
        validate_namespace_safe_for_uri(&portal_namespace)?;

        Ok(Self {
            portal_data_dir,
            portal_namespace,
        })
    }

    pub fn portal_data_dir(&self) -> &Path {
        &self.portal_data_dir
    }

    /// Base directory for sharded patient records.
    pub fn patients_dir(&self) -> PathBuf {
        self.portal_data_dir.join(PATIENTS_DIR_NAME)
    }

    /// Base directory for pharmacy data (catalogue and orders).
    pub fn pharmacy_dir(&self) -> PathBuf {
        self.portal_data_dir.join(PHARMACY_DIR_NAME)
    }

    /// Base directory for sharded order records.
    pub fn orders_dir(&self) -> PathBuf {
        self.pharmacy_dir().join(ORDERS_DIR_NAME)
    }

    /// Path of the pharmacy medicine catalogue document.
    pub fn inventory_file(&self) -> PathBuf {
        self.pharmacy_dir().join(INVENTORY_FILENAME)
    }

    pub fn portal_namespace(&self) -> &str {
        &self.portal_namespace
    }
}
