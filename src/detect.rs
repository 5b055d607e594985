//! Archive format detection by file extension

use std::path::Path;

/// Container formats the scan hook understands, plus the target-file kind
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// ZIP archive
    Zip,
    /// 7z archive
    SevenZip,
    /// Uncompressed tar archive
    Tar,
    /// Gzip-compressed tar archive (`.tar.gz` compound extension)
    TarGz,
    /// Gzip-compressed tar archive (`.tgz` single extension)
    Tgz,
    /// Single-file gzip stream
    Gzip,
    /// RAR archive
    Rar,
    /// An NZB job file being re-queued (the hook's own target extension)
    Nzb,
}

/// Detect the format of a downloaded file by its extension
///
/// Returns `None` for unknown extensions; the caller treats that as a no-op.
///
/// The compound `.tar.gz` suffix is checked before the single final suffix.
/// The ordering matters: a plain extension match would classify `jobs.tar.gz`
/// as a single-file gzip stream.
pub fn detect_format(path: &Path) -> Option<Format> {
    let name = path.file_name()?.to_str()?.to_lowercase();
    if name.ends_with(".tar.gz") {
        return Some(Format::TarGz);
    }

    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "zip" => Some(Format::Zip),
        "7z" => Some(Format::SevenZip),
        "tar" => Some(Format::Tar),
        "tgz" => Some(Format::Tgz),
        "gz" => Some(Format::Gzip),
        "rar" => Some(Format::Rar),
        "nzb" => Some(Format::Nzb),
        _ => None,
    }
}
