use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{ArchiveReader, is_target_name};
use crate::error::{Error, Result};

/// Reader for single-file gzip streams
///
/// The degenerate kind: exactly one logical payload, no member table. The
/// payload's logical filename comes from the FNAME field of the gzip header
/// when present, otherwise from the archive's own name with the `.gz` suffix
/// stripped and percent-encoding decoded. Extraction is a direct
/// decompress-and-write alongside the source archive; the `dest` argument is
/// ignored.
#[derive(Debug)]
pub struct GzipReader {
    path: PathBuf,
    payload_name: String,
}

impl GzipReader {
    /// Open a gzip stream and recover its payload's logical filename
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut decoder = GzDecoder::new(file);

        // The header is parsed lazily; pulling a byte through the decoder
        // forces it and surfaces corrupt streams as open failures
        std::io::copy(&mut (&mut decoder).take(1), &mut std::io::sink()).map_err(|e| {
            Error::ArchiveOpen {
                archive: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        let header_name = decoder
            .header()
            .and_then(|header| header.filename())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .filter(|name| !name.is_empty());

        let payload_name = match header_name {
            Some(name) => name,
            None => fallback_name(path),
        };
        debug!(archive = ?path, payload = %payload_name, "recovered gzip payload name");

        Ok(Self {
            path: path.to_path_buf(),
            payload_name,
        })
    }

    /// Base-name component of the recovered payload name
    ///
    /// A header-supplied name can carry separators; only its final component
    /// is ever written to disk.
    fn payload_base_name(&self) -> String {
        Path::new(&self.payload_name)
            .file_name()
            .map(|base| base.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.payload_name.clone())
    }
}

impl ArchiveReader for GzipReader {
    fn list_target_members(&mut self) -> Result<Vec<String>> {
        // Re-verify the recovered name before treating it as a match
        if is_target_name(&self.payload_name) {
            Ok(vec![self.payload_base_name()])
        } else {
            debug!(archive = ?self.path, payload = %self.payload_name, "gzip payload is not a target file");
            Ok(Vec::new())
        }
    }

    fn extract(&mut self, members: &[String], _dest: &Path) -> Result<Vec<String>> {
        let base_name = self.payload_base_name();
        if !members.iter().any(|m| m == &base_name) {
            return Ok(Vec::new());
        }

        let out_path = match self.path.parent() {
            Some(parent) => parent.join(&base_name),
            None => PathBuf::from(&base_name),
        };
        let mut decoder = GzDecoder::new(File::open(&self.path)?);
        let mut out = File::create(&out_path)?;
        std::io::copy(&mut decoder, &mut out).map_err(|e| Error::ExtractionFailed {
            archive: self.path.clone(),
            reason: format!("failed to decompress payload: {e}"),
        })?;

        info!(archive = ?self.path, payload = %base_name, "gzip extraction finished");
        Ok(vec![base_name])
    }
}

/// Derive the payload name from the archive's own filename
///
/// Strips the `.gz` suffix and undoes percent-encoding, matching what
/// uploaders produce when the header carries no FNAME field.
fn fallback_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|base| base.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stripped = match name.to_lowercase().strip_suffix(".gz") {
        Some(_) => name[..name.len() - 3].to_string(),
        None => name,
    };
    match urlencoding::decode(&stripped) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => stripped,
    }
}
