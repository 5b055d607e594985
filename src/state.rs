//! Persisted metadata table keyed by extracted file name
//!
//! The table carries queue attributes from a parent archive's job to the
//! extracted NZB files, across separate hook processes. It lives as a single
//! JSON document at a fixed path under the host's temp directory. An empty
//! table and a missing file are the same state: persisting an empty table
//! removes the file.
//!
//! The table is an explicit value threaded through one invocation; the only
//! shared state between invocations is the file itself. The host serializes
//! hook invocations, so there is no locking here (see DESIGN.md).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::context::DedupContext;
use crate::error::Result;

/// Current on-disk document version. Version 1 predates the `password` field.
const STATE_VERSION: u32 = 2;

/// Records older than this are expired at load time
const MAX_RECORD_AGE_HOURS: i64 = 24;

/// Queue attributes remembered for one extracted NZB file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Member name as reported by the archive (may carry a relative path)
    pub name: String,
    /// Category inherited from the parent job
    pub category: String,
    /// Priority inherited from the parent job
    pub priority: String,
    /// Add-to-top flag inherited from the parent job
    pub top: String,
    /// Add-paused flag inherited from the parent job
    pub paused: String,
    /// Unpack password inherited from the parent job
    #[serde(default)]
    pub password: String,
    /// Dedup triple, present only when the parent job carried one
    #[serde(default)]
    pub dedup: Option<DedupContext>,
    /// Append time; drives the 24-hour expiry
    pub created_at: DateTime<Utc>,
}

/// On-disk envelope around the record list
#[derive(Debug, Deserialize)]
struct StateFile {
    version: u32,
    records: Vec<MetadataRecord>,
}

/// Borrowing counterpart of [`StateFile`] for writing
#[derive(Serialize)]
struct StateFileRef<'a> {
    version: u32,
    records: &'a [MetadataRecord],
}

/// In-memory metadata table for one invocation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataTable {
    records: Vec<MetadataRecord>,
}

impl MetadataTable {
    /// Number of records in the table
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, in insertion order
    pub fn records(&self) -> &[MetadataRecord] {
        &self.records
    }

    /// Drop records aged 24 hours or more; returns whether anything changed
    pub fn prune(&mut self, now: DateTime<Utc>) -> bool {
        let before = self.records.len();
        self.records.retain(|record| {
            now.signed_duration_since(record.created_at) < Duration::hours(MAX_RECORD_AGE_HOURS)
        });
        before != self.records.len()
    }

    /// Add a record at the end
    pub fn append(&mut self, record: MetadataRecord) {
        self.records.push(record);
    }

    /// Index of the first record whose base name matches, case-insensitively
    ///
    /// `file_name` is compared against the base-name component of each
    /// record's stored member name. First occurrence wins, so records from
    /// an earlier archive shadow later duplicates.
    pub fn find_by_name(&self, file_name: &str) -> Option<usize> {
        self.records.iter().position(|record| {
            Path::new(&record.name)
                .file_name()
                .is_some_and(|base| base.to_string_lossy().eq_ignore_ascii_case(file_name))
        })
    }

    /// Remove and return the record at `index`
    pub fn remove(&mut self, index: usize) -> MetadataRecord {
        self.records.remove(index)
    }
}

/// Owner of the table's fixed on-disk location
#[derive(Clone, Debug)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    /// Create a store rooted at the given table path
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Path of the persisted table
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the persisted table currently exists
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the table from disk
    ///
    /// A missing file yields an empty table. Corrupt or unreadable data
    /// degrades to an empty table with a warning, and the file is left in
    /// place for inspection. Version-1 records predate the stored password;
    /// they are upgraded in memory by inserting `unpack_password` into every
    /// record.
    pub fn load(&self, unpack_password: &str) -> MetadataTable {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return MetadataTable::default();
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "failed to read metadata table, treating as empty");
                return MetadataTable::default();
            }
        };

        let state: StateFile = match serde_json::from_slice(&bytes) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = ?self.path, error = %e, "corrupt metadata table, treating as empty");
                return MetadataTable::default();
            }
        };

        let mut records = state.records;
        match state.version {
            STATE_VERSION => {}
            1 => {
                debug!(
                    count = records.len(),
                    "upgrading version 1 records without a stored password"
                );
                for record in &mut records {
                    record.password = unpack_password.to_string();
                }
            }
            other => {
                warn!(path = ?self.path, version = other, "unsupported metadata table version, treating as empty");
                return MetadataTable::default();
            }
        }

        MetadataTable { records }
    }

    /// Write the table back, or remove the file when the table is empty
    ///
    /// Parent directories are created as needed. Callers treat a persist
    /// failure as non-fatal bookkeeping loss: log it and continue.
    pub fn persist(&self, table: &MetadataTable) -> Result<()> {
        if table.is_empty() {
            match std::fs::remove_file(&self.path) {
                Ok(()) => debug!(path = ?self.path, "removed empty metadata table"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let state = StateFileRef {
            version: STATE_VERSION,
            records: table.records(),
        };
        std::fs::write(&self.path, serde_json::to_vec(&state)?)?;
        debug!(path = ?self.path, count = table.len(), "persisted metadata table");
        Ok(())
    }
}
