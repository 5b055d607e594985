//! Invocation context provided by the host application
//!
//! The host hands every hook invocation its inputs through `NZBNP_*`,
//! `NZBPR_*` and `NZBOP_*` environment variables, read once at start.
//! [`ScanContext`] is the plain value the rest of the crate works with;
//! tests construct it directly without touching the environment.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Name of the unpack-password variable, also the key of the password
/// directive emitted on the lookup branch (part of the host wire contract)
pub const UNPACK_PASSWORD_KEY: &str = "NZBPR_*Unpack:Password";

/// Duplicate-detection attributes; the host supplies all three together
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupContext {
    /// Duplicate key identifying the release
    pub key: String,
    /// Duplicate score
    pub score: String,
    /// Duplicate mode (score/all/force)
    pub mode: String,
}

/// Everything the host hands a single hook invocation
#[derive(Clone, Debug)]
pub struct ScanContext {
    /// Path of the downloaded file that triggered the scan
    pub filename: PathBuf,
    /// Directory the host watches for incoming NZB files (extraction target)
    pub directory: PathBuf,
    /// Category of the triggering job
    pub category: String,
    /// Priority of the triggering job
    pub priority: String,
    /// Add-to-top flag of the triggering job
    pub top: String,
    /// Add-paused flag of the triggering job
    pub paused: String,
    /// Unpack password of the triggering job's archive
    pub password: String,
    /// Present only when the triggering job carries a dedup key
    pub dedup: Option<DedupContext>,
    /// Host temp-dir root; the metadata table lives beneath it
    pub temp_dir: PathBuf,
}

impl ScanContext {
    /// Build the context from the host environment
    ///
    /// `NZBNP_FILENAME` and `NZBOP_TEMPDIR` are required. All other values
    /// default to empty when unset. The dedup triple is keyed on the
    /// *presence* of `NZBNP_DUPEKEY`, even when its value is empty.
    pub fn from_env() -> Result<Self> {
        let filename = env::var("NZBNP_FILENAME")
            .map_err(|_| Error::MissingEnv("NZBNP_FILENAME"))?;
        let temp_dir =
            env::var("NZBOP_TEMPDIR").map_err(|_| Error::MissingEnv("NZBOP_TEMPDIR"))?;

        let dedup = env::var("NZBNP_DUPEKEY").ok().map(|key| DedupContext {
            key,
            score: env::var("NZBNP_DUPESCORE").unwrap_or_default(),
            mode: env::var("NZBNP_DUPEMODE").unwrap_or_default(),
        });

        Ok(Self {
            filename: PathBuf::from(filename),
            directory: PathBuf::from(env::var("NZBNP_DIRECTORY").unwrap_or_default()),
            category: env::var("NZBNP_CATEGORY").unwrap_or_default(),
            priority: env::var("NZBNP_PRIORITY").unwrap_or_default(),
            top: env::var("NZBNP_TOP").unwrap_or_default(),
            paused: env::var("NZBNP_PAUSED").unwrap_or_default(),
            password: env::var(UNPACK_PASSWORD_KEY).unwrap_or_default(),
            dedup,
            temp_dir: PathBuf::from(temp_dir),
        })
    }

    /// Fixed path of the persisted metadata table for this host
    pub fn state_path(&self) -> PathBuf {
        self.temp_dir.join("nzb-scan").join("metadata.json")
    }
}
