//! Archive readers for the container formats the scan hook understands
//!
//! One implementation per format behind a single trait, selected once from
//! the detected format. Readers are scoped values: handles close on drop, on
//! every exit path, so the source archive can be deleted right after use.

mod gzip;
mod rar;
mod sevenz;
mod tar;
mod zip;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

// Re-exports
pub use gzip::GzipReader;
pub use rar::RarReader;
pub use sevenz::SevenZipReader;
pub use tar::TarReader;
pub use zip::ZipReader;

use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::detect::Format;
use crate::error::{Error, Result};

/// File extension (without the dot) marking a member as an NZB job file
pub const TARGET_EXT: &str = "nzb";

/// Uniform contract over the container formats
///
/// Listing and extraction are separate steps so the orchestrator can skip
/// bookkeeping entirely for archives without target members. Extraction
/// aborts on the first member that cannot be written; a partially extracted
/// archive never reports success.
pub trait ArchiveReader {
    /// List member names whose own extension matches the target extension
    ///
    /// The comparison is case-insensitive and looks at the final extension
    /// only, never at substrings. Directory entries never match. Names are
    /// returned as stored in the archive, relative paths included.
    fn list_target_members(&mut self) -> Result<Vec<String>>;

    /// Extract the given members into `dest`, preserving relative paths
    ///
    /// Returns the names of the extracted members. The single-file gzip
    /// reader ignores `dest` and writes its payload alongside the source
    /// archive instead.
    fn extract(&mut self, members: &[String], dest: &Path) -> Result<Vec<String>>;
}

/// Open the reader matching a detected format
pub fn open_reader(format: Format, path: &Path) -> Result<Box<dyn ArchiveReader>> {
    debug!(?format, ?path, "opening archive reader");
    match format {
        Format::Zip => Ok(Box::new(ZipReader::open(path)?)),
        Format::SevenZip => Ok(Box::new(SevenZipReader::open(path)?)),
        Format::Tar => Ok(Box::new(TarReader::open(path, false)?)),
        Format::TarGz | Format::Tgz => Ok(Box::new(TarReader::open(path, true)?)),
        Format::Gzip => Ok(Box::new(GzipReader::open(path)?)),
        Format::Rar => Ok(Box::new(RarReader::open(path)?)),
        Format::Nzb => Err(Error::ArchiveOpen {
            archive: path.to_path_buf(),
            reason: "target files are not archives".to_string(),
        }),
    }
}

/// Check whether a member name's own extension matches the target extension
pub(crate) fn is_target_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(TARGET_EXT))
}

/// Resolve a member name to a destination-relative path
///
/// Rejects absolute paths and parent-directory components instead of
/// silently skipping them: a traversal attempt aborts the extraction.
pub(crate) fn safe_relative_path(archive: &Path, name: &str) -> Result<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => {
                return Err(Error::UnsafeMemberPath {
                    archive: archive.to_path_buf(),
                    name: name.to_string(),
                });
            }
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(Error::UnsafeMemberPath {
            archive: archive.to_path_buf(),
            name: name.to_string(),
        });
    }
    Ok(relative)
}
