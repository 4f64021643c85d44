//! Shared composite operations spanning multiple services.

use super::patients::PatientsService;
use crate::{Author, CoreConfig, EmailAddress, NonEmptyText, PortalResult};
use std::sync::Arc;

/// Result of a full patient registration.
#[derive(Debug)]
pub struct RegisteredPatient {
    /// The UUID of the new patient record.
    pub patient_uuid: String,
}

/// Registers a complete patient: initialises the record and populates the profile.
///
/// This is the one-call path the portal's registration form uses, combining
/// [`PatientsService::initialise`] and
/// [`PatientsService::update_profile`](super::patients::PatientsService::update_profile).
///
/// # Arguments
///
/// * `cfg` - Core configuration.
/// * `author` - Author recorded in the audit journal.
/// * `location` - Care location the registration was made from.
/// * `given_names` - The patient's given names.
/// * `family_name` - The patient's family/last name.
/// * `birth_date` - The patient's date of birth as `YYYY-MM-DD`.
/// * `contact_email` - Optional contact email for portal notifications.
///
/// # Errors
///
/// Returns a `PortalError` if any step of the registration fails. A failed profile
/// update leaves the initialised (empty) record in place; its audit journal records
/// the creation.
pub fn register_patient(
    cfg: Arc<CoreConfig>,
    author: Author,
    location: NonEmptyText,
    given_names: Vec<String>,
    family_name: String,
    birth_date: String,
    contact_email: Option<EmailAddress>,
) -> PortalResult<RegisteredPatient> {
    let service = PatientsService::new(cfg).initialise(author.clone(), location.clone())?;

    service.update_profile(
        &author,
        &location,
        given_names,
        &family_name,
        &birth_date,
        contact_email,
    )?;

    Ok(RegisteredPatient {
        patient_uuid: service.patient_id().to_string(),
    })
}
