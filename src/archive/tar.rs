use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{ArchiveReader, is_target_name};
use crate::error::{Error, Result};

/// Reader for tar archives, optionally gzip-compressed (.tar.gz / .tgz)
///
/// Tar reading is streaming, so listing and extraction each open a fresh
/// pass over the file rather than sharing a handle.
pub struct TarReader {
    path: PathBuf,
    gzipped: bool,
}

impl TarReader {
    /// Open a tar archive for listing and extraction
    pub fn open(path: &Path, gzipped: bool) -> Result<Self> {
        // Confirm readability up front so corrupt paths fail the open
        // contract rather than the first listing
        File::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            gzipped,
        })
    }

    fn archive(&self) -> Result<tar::Archive<Box<dyn Read>>> {
        let file = File::open(&self.path)?;
        let reader: Box<dyn Read> = if self.gzipped {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(tar::Archive::new(reader))
    }

    fn open_error(&self, e: std::io::Error) -> Error {
        Error::ArchiveOpen {
            archive: self.path.clone(),
            reason: e.to_string(),
        }
    }
}

impl ArchiveReader for TarReader {
    fn list_target_members(&mut self) -> Result<Vec<String>> {
        let mut archive = self.archive()?;
        let mut members = Vec::new();

        for entry in archive.entries().map_err(|e| self.open_error(e))? {
            let entry = entry.map_err(|e| self.open_error(e))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let name = entry
                .path()
                .map_err(|e| self.open_error(e))?
                .to_string_lossy()
                .into_owned();
            if is_target_name(&name) {
                members.push(name);
            }
        }

        debug!(archive = ?self.path, count = members.len(), "listed target members");
        Ok(members)
    }

    fn extract(&mut self, members: &[String], dest: &Path) -> Result<Vec<String>> {
        std::fs::create_dir_all(dest)?;
        let mut archive = self.archive()?;
        let mut extracted = Vec::with_capacity(members.len());

        for entry in archive.entries().map_err(|e| self.open_error(e))? {
            let mut entry = entry.map_err(|e| self.open_error(e))?;
            let name = entry
                .path()
                .map_err(|e| self.open_error(e))?
                .to_string_lossy()
                .into_owned();
            if !entry.header().entry_type().is_file() || !members.iter().any(|m| m == &name) {
                continue;
            }

            // unpack_in refuses paths escaping dest; that refusal aborts the
            // whole extraction rather than skipping the member
            let unpacked = entry.unpack_in(dest).map_err(|e| Error::ExtractionFailed {
                archive: self.path.clone(),
                reason: format!("failed to extract {name}: {e}"),
            })?;
            if !unpacked {
                return Err(Error::UnsafeMemberPath {
                    archive: self.path.clone(),
                    name,
                });
            }
            extracted.push(name);
        }

        info!(archive = ?self.path, count = extracted.len(), "tar extraction finished");
        Ok(extracted)
    }
}
