use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{ArchiveReader, is_target_name};
use crate::error::{Error, Result};

/// Reader for ZIP archives
pub struct ZipReader {
    archive: zip::ZipArchive<File>,
    path: PathBuf,
}

impl std::fmt::Debug for ZipReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipReader")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl ZipReader {
    /// Open a ZIP archive for listing and extraction
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let archive = zip::ZipArchive::new(file).map_err(|e| Error::ArchiveOpen {
            archive: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            archive,
            path: path.to_path_buf(),
        })
    }
}

impl ArchiveReader for ZipReader {
    fn list_target_members(&mut self) -> Result<Vec<String>> {
        // Walk by index: file_names() has no stable order, and member order
        // is what the metadata table later displays
        let mut members = Vec::new();
        for index in 0..self.archive.len() {
            let entry = self
                .archive
                .by_index_raw(index)
                .map_err(|e| Error::ArchiveOpen {
                    archive: self.path.clone(),
                    reason: format!("failed to read entry {index}: {e}"),
                })?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            if is_target_name(&name) {
                members.push(name);
            }
        }
        debug!(archive = ?self.path, count = members.len(), "listed target members");
        Ok(members)
    }

    fn extract(&mut self, members: &[String], dest: &Path) -> Result<Vec<String>> {
        let mut extracted = Vec::with_capacity(members.len());
        for name in members {
            let mut entry = self.archive.by_name(name).map_err(|e| Error::ExtractionFailed {
                archive: self.path.clone(),
                reason: format!("failed to read entry {name}: {e}"),
            })?;

            let relative = entry
                .enclosed_name()
                .map(Path::to_path_buf)
                .ok_or_else(|| Error::UnsafeMemberPath {
                    archive: self.path.clone(),
                    name: name.clone(),
                })?;

            let out_path = dest.join(relative);
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&out_path)?;
            io::copy(&mut entry, &mut out).map_err(|e| Error::ExtractionFailed {
                archive: self.path.clone(),
                reason: format!("failed to extract {name}: {e}"),
            })?;
            extracted.push(name.clone());
        }

        info!(archive = ?self.path, count = extracted.len(), "ZIP extraction finished");
        Ok(extracted)
    }
}
