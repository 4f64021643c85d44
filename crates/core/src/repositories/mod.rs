//! Repository management modules.
//!
//! This module contains services for managing the portal's record stores:
//! patient records (with their appointment and prescription entries), the
//! pharmacy catalogue, and order records (with their deliveries).

pub mod appointments;
pub mod deliveries;
mod helpers;
pub mod inventory;
pub mod orders;
pub mod patients;
pub mod prescriptions;
pub mod shared;
