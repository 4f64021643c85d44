//! Append-only audit journal.
//!
//! Every record directory (patient record, order record, the pharmacy root) carries an
//! `audit.jsonl` journal. Each mutating operation appends exactly one line: a JSON object
//! recording when it happened, what kind of change it was, a one-line summary, the author,
//! the care location the change was made from, and the portal namespace.
//!
//! The journal is the portal's change history. A failed append fails the whole operation,
//! so a record is never left with a change its journal does not mention.

use crate::constants::AUDIT_LOG_FILENAME;
use crate::{Author, CoreConfig, NonEmptyText, PortalError, PortalResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// The kind of change an audit entry records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    /// A record or entry was created.
    Create,
    /// Record content was updated.
    Update,
    /// A status changed.
    Status,
    /// An entry was cancelled.
    Cancel,
}

/// One line of a record's audit journal.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditEntry {
    /// When the change was recorded.
    pub at: DateTime<Utc>,
    /// The kind of change.
    pub action: AuditAction,
    /// One-line description of the change.
    pub summary: String,
    /// Author full name.
    pub author_name: String,
    /// Author portal role (wire string).
    pub author_role: String,
    /// Author email address.
    pub author_email: String,
    /// Care location the change was made from (clinic, pharmacy branch, ...).
    pub location: String,
    /// Portal namespace the entry was written under.
    pub namespace: String,
}

impl AuditEntry {
    /// Build an entry for `author` acting now, stamped with the configured namespace.
    pub fn new(
        cfg: &CoreConfig,
        action: AuditAction,
        summary: impl Into<String>,
        author: &Author,
        location: &NonEmptyText,
    ) -> Self {
        Self {
            at: Utc::now(),
            action,
            summary: summary.into(),
            author_name: author.name.as_str().to_owned(),
            author_role: author.role.to_wire().to_owned(),
            author_email: author.email.as_str().to_owned(),
            location: location.as_str().to_owned(),
            namespace: cfg.portal_namespace().to_owned(),
        }
    }
}

/// Append one entry to the journal in `record_dir`.
///
/// The journal file is created on first use. Entries are written as single JSON lines.
///
/// # Errors
///
/// Returns `PortalError::Serialization` if the entry cannot be encoded, or
/// `PortalError::AuditAppend` if the journal cannot be opened or written.
pub fn append_entry(record_dir: &Path, entry: &AuditEntry) -> PortalResult<()> {
    let line = serde_json::to_string(entry).map_err(PortalError::Serialization)?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(record_dir.join(AUDIT_LOG_FILENAME))
        .map_err(PortalError::AuditAppend)?;

    writeln!(file, "{line}").map_err(PortalError::AuditAppend)?;

    Ok(())
}

/// Read the journal in `record_dir`, oldest entry first.
///
/// A missing journal reads as empty. Unparseable lines are logged as warnings and
/// skipped so one corrupt line does not hide the rest of the history.
///
/// # Errors
///
/// Returns `PortalError::FileRead` if the journal exists but cannot be read.
pub fn read_journal(record_dir: &Path) -> PortalResult<Vec<AuditEntry>> {
    let path = record_dir.join(AUDIT_LOG_FILENAME);
    if !path.is_file() {
        return Ok(Vec::new());
    }

    let contents = std::fs::read_to_string(&path).map_err(PortalError::FileRead)?;

    let mut entries = Vec::new();
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<AuditEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!("skipping unparseable audit line in {}: {}", path.display(), e);
            }
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PortalRole;
    use careport_types::EmailAddress;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn test_cfg() -> CoreConfig {
        CoreConfig::new(PathBuf::from("/portal_data"), "careport.test".into())
            .expect("CoreConfig::new should succeed")
    }

    fn test_author() -> Author {
        Author {
            name: NonEmptyText::new("Test Author").unwrap(),
            role: PortalRole::Doctor,
            email: EmailAddress::parse("test@example.com").unwrap(),
        }
    }

    #[test]
    fn appends_and_reads_back_entries() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg();
        let author = test_author();
        let location = NonEmptyText::new("Test Clinic").unwrap();

        let first = AuditEntry::new(&cfg, AuditAction::Create, "Record created", &author, &location);
        let second = AuditEntry::new(&cfg, AuditAction::Update, "Profile updated", &author, &location);

        append_entry(temp_dir.path(), &first).expect("append should succeed");
        append_entry(temp_dir.path(), &second).expect("append should succeed");

        let entries = read_journal(temp_dir.path()).expect("read should succeed");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, AuditAction::Create);
        assert_eq!(entries[0].summary, "Record created");
        assert_eq!(entries[0].author_role, "doctor");
        assert_eq!(entries[0].namespace, "careport.test");
        assert_eq!(entries[1].action, AuditAction::Update);
    }

    #[test]
    fn missing_journal_reads_as_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let entries = read_journal(temp_dir.path()).expect("read should succeed");
        assert!(entries.is_empty());
    }

    #[test]
    fn corrupt_lines_are_skipped() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg();
        let author = test_author();
        let location = NonEmptyText::new("Test Clinic").unwrap();

        let entry = AuditEntry::new(&cfg, AuditAction::Create, "Record created", &author, &location);
        append_entry(temp_dir.path(), &entry).expect("append should succeed");

        // Inject a corrupt line by hand.
        let path = temp_dir.path().join(AUDIT_LOG_FILENAME);
        let mut contents = std::fs::read_to_string(&path).unwrap();
        contents.push_str("not json at all\n");
        std::fs::write(&path, contents).unwrap();

        let entries = read_journal(temp_dir.path()).expect("read should succeed");
        assert_eq!(entries.len(), 1);
    }
}
