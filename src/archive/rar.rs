use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{ArchiveReader, is_target_name, safe_relative_path};
use crate::error::{Error, Result};

/// Reader for RAR archives
///
/// unrar exposes a cursor state machine rather than a random-access handle,
/// so listing and extraction each run their own pass over the archive.
#[derive(Debug)]
pub struct RarReader {
    path: PathBuf,
}

impl RarReader {
    /// Open a RAR archive for listing and extraction
    pub fn open(path: &Path) -> Result<Self> {
        // Probe now so corrupt archives fail the open contract
        unrar::Archive::new(path)
            .open_for_listing()
            .map_err(|e| Error::ArchiveOpen {
                archive: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    fn extraction_error(&self, e: unrar::error::UnrarError) -> Error {
        Error::ExtractionFailed {
            archive: self.path.clone(),
            reason: e.to_string(),
        }
    }
}

impl ArchiveReader for RarReader {
    fn list_target_members(&mut self) -> Result<Vec<String>> {
        let archive = unrar::Archive::new(&self.path)
            .open_for_listing()
            .map_err(|e| Error::ArchiveOpen {
                archive: self.path.clone(),
                reason: e.to_string(),
            })?;

        let mut members = Vec::new();
        for entry in archive {
            let header = entry.map_err(|e| self.extraction_error(e))?;
            let name = header.filename.to_string_lossy().into_owned();
            if header.is_file() && is_target_name(&name) {
                members.push(name);
            }
        }

        debug!(archive = ?self.path, count = members.len(), "listed target members");
        Ok(members)
    }

    fn extract(&mut self, members: &[String], dest: &Path) -> Result<Vec<String>> {
        let mut at_header = unrar::Archive::new(&self.path)
            .open_for_processing()
            .map_err(|e| Error::ArchiveOpen {
                archive: self.path.clone(),
                reason: e.to_string(),
            })?;

        let mut extracted = Vec::with_capacity(members.len());
        loop {
            let at_file = match at_header.read_header() {
                Ok(Some(at_file)) => at_file,
                Ok(None) => break,
                Err(e) => return Err(self.extraction_error(e)),
            };

            let entry = at_file.entry();
            let name = entry.filename.to_string_lossy().into_owned();
            let wanted = !entry.is_directory() && members.iter().any(|m| m == &name);

            at_header = if wanted {
                let out_path = dest.join(safe_relative_path(&self.path, &name)?);
                if let Some(parent) = out_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let at_header = at_file
                    .extract_to(&out_path)
                    .map_err(|e| self.extraction_error(e))?;
                extracted.push(name);
                at_header
            } else {
                at_file.skip().map_err(|e| self.extraction_error(e))?
            };
        }

        info!(archive = ?self.path, count = extracted.len(), "RAR extraction finished");
        Ok(extracted)
    }
}
