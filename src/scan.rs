//! The scan state machine
//!
//! One invocation runs exactly one branch to completion:
//!
//! - archive formats → extract target members, record their queue attributes
//! - single-file gzip → the degenerate payload path, same bookkeeping
//! - a target file with a live table → replay and delete its attributes
//! - anything else → no-op
//!
//! The metadata table is the only state shared between invocations. Pruning
//! runs before any read or write, and a prune that changes the table is
//! re-persisted immediately.

use chrono::Utc;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::archive::open_reader;
use crate::context::{ScanContext, UNPACK_PASSWORD_KEY};
use crate::detect::{Format, detect_format};
use crate::error::Result;
use crate::state::{MetadataRecord, MetadataStore};

/// One `[NZB] KEY=VALUE` line for the host's queue
///
/// The rendered form is the wire contract with the host; key names and the
/// bracket prefix must not change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueDirective {
    /// Directive key, e.g. `CATEGORY`
    pub key: String,
    /// Directive value; empty values are emitted as-is
    pub value: String,
}

impl QueueDirective {
    fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for QueueDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[NZB] {}={}", self.key, self.value)
    }
}

/// What a single invocation did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Nothing to do: source missing, unknown format, or no table to consult
    Skipped,
    /// Archive branch ran; names of the extracted target members (possibly
    /// none, in which case the source was still consumed)
    Extracted(Vec<String>),
    /// Lookup branch ran; directives for the host (empty when no record
    /// matched)
    Directives(Vec<QueueDirective>),
}

/// Run one hook invocation to completion
pub fn run_scan(ctx: &ScanContext) -> Result<ScanOutcome> {
    if !ctx.filename.is_file() {
        debug!(filename = ?ctx.filename, "source file missing, nothing to do");
        return Ok(ScanOutcome::Skipped);
    }

    let Some(format) = detect_format(&ctx.filename) else {
        debug!(filename = ?ctx.filename, "unknown extension, nothing to do");
        return Ok(ScanOutcome::Skipped);
    };

    let store = MetadataStore::new(ctx.state_path());
    match format {
        Format::Nzb if store.exists() => lookup(ctx, &store),
        Format::Nzb => {
            debug!(filename = ?ctx.filename, "no metadata table, nothing to replay");
            Ok(ScanOutcome::Skipped)
        }
        _ => unpack(ctx, &store, format),
    }
}

/// Archive and single-payload branches: extract target members, record their
/// attributes, consume the source archive
fn unpack(ctx: &ScanContext, store: &MetadataStore, format: Format) -> Result<ScanOutcome> {
    let mut table = store.load(&ctx.password);
    if table.prune(Utc::now())
        && let Err(e) = store.persist(&table)
    {
        warn!(error = %e, "failed to persist pruned metadata table");
    }

    let extracted = {
        let mut reader = open_reader(format, &ctx.filename)?;
        let members = reader.list_target_members()?;
        if members.is_empty() {
            info!(filename = ?ctx.filename, "no target members in archive");
            Vec::new()
        } else {
            reader.extract(&members, &ctx.directory)?
        }
        // reader drops here; the handle is closed before the source file
        // is removed
    };

    if !extracted.is_empty() {
        let now = Utc::now();
        for name in &extracted {
            table.append(MetadataRecord {
                name: name.clone(),
                category: ctx.category.clone(),
                priority: ctx.priority.clone(),
                top: ctx.top.clone(),
                paused: ctx.paused.clone(),
                password: ctx.password.clone(),
                dedup: ctx.dedup.clone(),
                created_at: now,
            });
        }
        if let Err(e) = store.persist(&table) {
            warn!(error = %e, "failed to persist metadata table");
        }
        info!(
            filename = ?ctx.filename,
            count = extracted.len(),
            "extracted target members and recorded their attributes"
        );
    }

    remove_source(&ctx.filename);
    Ok(ScanOutcome::Extracted(extracted))
}

/// Lookup branch: replay a recorded file's attributes and forget it
fn lookup(ctx: &ScanContext, store: &MetadataStore) -> Result<ScanOutcome> {
    let mut table = store.load(&ctx.password);
    if table.prune(Utc::now())
        && let Err(e) = store.persist(&table)
    {
        warn!(error = %e, "failed to persist pruned metadata table");
    }

    let Some(base_name) = ctx.filename.file_name().map(|n| n.to_string_lossy()) else {
        return Ok(ScanOutcome::Directives(Vec::new()));
    };
    let Some(index) = table.find_by_name(&base_name) else {
        debug!(file = %base_name, "no metadata recorded for this file");
        return Ok(ScanOutcome::Directives(Vec::new()));
    };

    let record = table.remove(index);
    let mut directives = vec![
        QueueDirective::new("CATEGORY", &record.category),
        QueueDirective::new("PRIORITY", &record.priority),
        QueueDirective::new("TOP", &record.top),
        QueueDirective::new("PAUSED", &record.paused),
        QueueDirective::new(UNPACK_PASSWORD_KEY, &record.password),
    ];
    // Dedup lines are keyed on the current invocation's context, not on what
    // the record stored: a record without a triple emits empty values, and a
    // stored triple is dropped when the current invocation has none
    if ctx.dedup.is_some() {
        let stored = record.dedup.as_ref();
        directives.push(QueueDirective::new(
            "DUPEKEY",
            stored.map(|d| d.key.as_str()).unwrap_or(""),
        ));
        directives.push(QueueDirective::new(
            "DUPESCORE",
            stored.map(|d| d.score.as_str()).unwrap_or(""),
        ));
        directives.push(QueueDirective::new(
            "DUPEMODE",
            stored.map(|d| d.mode.as_str()).unwrap_or(""),
        ));
    }

    if let Err(e) = store.persist(&table) {
        warn!(error = %e, "failed to persist metadata table after lookup");
    }
    info!(file = %base_name, "replayed queue attributes");
    Ok(ScanOutcome::Directives(directives))
}

/// Delete a consumed source archive; failure is logged, never fatal
fn remove_source(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!(?path, error = %e, "failed to delete source archive");
    }
}
