use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{ArchiveReader, is_target_name, safe_relative_path};
use crate::error::{Error, Result};

/// Reader for 7z archives
pub struct SevenZipReader {
    reader: sevenz_rust::SevenZReader<File>,
    path: PathBuf,
}

impl std::fmt::Debug for SevenZipReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SevenZipReader")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SevenZipReader {
    /// Open a 7z archive for listing and extraction
    pub fn open(path: &Path) -> Result<Self> {
        let reader = sevenz_rust::SevenZReader::open(path, sevenz_rust::Password::empty())
            .map_err(|e| Error::ArchiveOpen {
                archive: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            reader,
            path: path.to_path_buf(),
        })
    }
}

impl ArchiveReader for SevenZipReader {
    fn list_target_members(&mut self) -> Result<Vec<String>> {
        let members: Vec<String> = self
            .reader
            .archive()
            .files
            .iter()
            .filter(|entry| !entry.is_directory() && is_target_name(entry.name()))
            .map(|entry| entry.name().to_string())
            .collect();
        debug!(archive = ?self.path, count = members.len(), "listed target members");
        Ok(members)
    }

    fn extract(&mut self, members: &[String], dest: &Path) -> Result<Vec<String>> {
        let mut extracted = Vec::with_capacity(members.len());
        // The entry callback reports failures through `failure` so our own
        // error type survives the library's error channel
        let mut failure: Option<Error> = None;

        let archive_path = self.path.clone();
        self.reader
            .for_each_entries(|entry, reader| {
                if entry.is_directory() || !members.iter().any(|m| m == entry.name()) {
                    return Ok(true);
                }
                match write_entry(&archive_path, entry.name(), reader, dest) {
                    Ok(()) => {
                        extracted.push(entry.name().to_string());
                        Ok(true)
                    }
                    Err(e) => {
                        failure = Some(e);
                        Ok(false)
                    }
                }
            })
            .map_err(|e| Error::ExtractionFailed {
                archive: self.path.clone(),
                reason: e.to_string(),
            })?;

        if let Some(e) = failure {
            return Err(e);
        }

        info!(archive = ?self.path, count = extracted.len(), "7z extraction finished");
        Ok(extracted)
    }
}

/// Write one entry's decompressed bytes below `dest`
fn write_entry(
    archive: &Path,
    name: &str,
    reader: &mut dyn Read,
    dest: &Path,
) -> Result<()> {
    let out_path = dest.join(safe_relative_path(archive, name)?);
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = File::create(&out_path)?;
    std::io::copy(reader, &mut out).map_err(|e| Error::ExtractionFailed {
        archive: archive.to_path_buf(),
        reason: format!("failed to extract {name}: {e}"),
    })?;
    Ok(())
}
