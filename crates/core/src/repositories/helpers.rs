//! Repository-related utilities.
//!
//! This module contains functions shared by the record services: allocation of
//! sharded record directories, rollback of partially created records, and the
//! shard walk used by the list operations.

use crate::{PortalError, PortalResult};
use careport_uuid::ShardableUuid;
use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

/// Creates a unique sharded directory within the base records directory.
///
/// This function generates UUIDs using the provided source function and attempts to create
/// a corresponding sharded directory. It guards against UUID collisions or pre-existing
/// directories by retrying up to 5 times with different UUIDs.
///
/// # Arguments
///
/// * `base_dir` - The base records directory.
/// * `uuid_source` - A mutable closure that generates new `ShardableUuid` instances.
///
/// # Returns
///
/// Returns a tuple of the allocated `ShardableUuid` and the `PathBuf` to the created directory.
///
/// # Errors
///
/// Returns a `PortalError::RecordDirCreation` if:
/// - directory creation fails after 5 attempts,
/// - parent directory creation fails.
pub(crate) fn create_unique_shared_dir(
    base_dir: &Path,
    mut uuid_source: impl FnMut() -> ShardableUuid,
) -> PortalResult<(ShardableUuid, PathBuf)> {
    // Allocate a new UUID, but guard against pathological UUID collisions (or pre-existing
    // directories from external interference) by limiting retries.
    for _attempt in 0..5 {
        let uuid = uuid_source();
        let candidate = uuid.sharded_dir(base_dir);

        if candidate.exists() {
            continue;
        }

        if let Some(parent) = candidate.parent() {
            fs::create_dir_all(parent).map_err(PortalError::RecordDirCreation)?;
        }

        match fs::create_dir(&candidate) {
            Ok(()) => return Ok((uuid, candidate)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(PortalError::RecordDirCreation(e)),
        }
    }

    Err(PortalError::RecordDirCreation(io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to allocate a unique record directory after 5 attempts",
    )))
}

/// Removes a partially created record directory after a failed initialise.
///
/// Returns the original error if cleanup succeeds; if cleanup also fails, both
/// errors are carried in `PortalError::CleanupAfterInitialiseFailed`.
pub(crate) fn cleanup_after_failed_initialise(
    record_dir: &Path,
    init_error: PortalError,
) -> PortalError {
    match fs::remove_dir_all(record_dir) {
        Ok(()) => init_error,
        Err(cleanup_error) => PortalError::CleanupAfterInitialiseFailed {
            path: record_dir.to_path_buf(),
            init_error: Box::new(init_error),
            cleanup_error,
        },
    }
}

/// Lists the record leaf directories under a sharded base directory.
///
/// Walks `<base>/<s1>/<s2>/<uuid>/` and returns every leaf directory found. A missing
/// base directory yields an empty list; unreadable intermediate directories are skipped.
pub(crate) fn record_dirs(base_dir: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    let s1_iter = match fs::read_dir(base_dir) {
        Ok(it) => it,
        Err(_) => return dirs,
    };
    for s1 in s1_iter.flatten() {
        let s1_path = s1.path();
        if !s1_path.is_dir() {
            continue;
        }

        let s2_iter = match fs::read_dir(&s1_path) {
            Ok(it) => it,
            Err(_) => continue,
        };

        for s2 in s2_iter.flatten() {
            let s2_path = s2.path();
            if !s2_path.is_dir() {
                continue;
            }

            let id_iter = match fs::read_dir(&s2_path) {
                Ok(it) => it,
                Err(_) => continue,
            };

            for id_ent in id_iter.flatten() {
                let id_path = id_ent.path();
                if id_path.is_dir() {
                    dirs.push(id_path);
                }
            }
        }
    }

    dirs
}
