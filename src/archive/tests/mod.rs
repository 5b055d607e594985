use crate::archive::*;
use crate::detect::Format;
use crate::error::Error;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create a ZIP archive containing the given (name, content) members
fn create_zip_archive(archive_path: &Path, files: &[(&str, &[u8])]) {
    let file = std::fs::File::create(archive_path).unwrap();
    let mut writer = ::zip::ZipWriter::new(file);
    let options =
        ::zip::write::FileOptions::default().compression_method(::zip::CompressionMethod::Stored);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
}

/// Create a tar archive (optionally gzip-compressed) with the given members
fn create_tar_archive(archive_path: &Path, files: &[(&str, &[u8])], gzipped: bool) {
    let file = std::fs::File::create(archive_path).unwrap();
    let writer: Box<dyn Write> = if gzipped {
        Box::new(GzEncoder::new(file, Compression::default()))
    } else {
        Box::new(file)
    };
    let mut builder = ::tar::Builder::new(writer);
    for (name, content) in files {
        let mut header = ::tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, *name, *content).unwrap();
    }
    let writer = builder.into_inner().unwrap();
    drop(writer); // flushes the gzip trailer
}

/// Create a single-file gzip stream, optionally with an FNAME header field
fn create_gzip(archive_path: &Path, payload: &[u8], header_name: Option<&str>) {
    let file = std::fs::File::create(archive_path).unwrap();
    let mut builder = flate2::GzBuilder::new();
    if let Some(name) = header_name {
        builder = builder.filename(name);
    }
    let mut encoder = builder.write(file, Compression::default());
    encoder.write_all(payload).unwrap();
    encoder.finish().unwrap();
}

/// Create a 7z archive from a source directory
fn create_7z_archive(archive_path: &Path, source_dir: &Path) {
    sevenz_rust::compress_to_path(source_dir, archive_path).unwrap();
}

// ---------------------------------------------------------------------------
// Member filter
// ---------------------------------------------------------------------------

#[test]
fn is_target_name_matches_extension_case_insensitively() {
    assert!(is_target_name("a.nzb"));
    assert!(is_target_name("A.NZB"));
    assert!(is_target_name("sub/dir/b.NzB"));
}

#[test]
fn is_target_name_compares_extension_not_substring() {
    assert!(!is_target_name("a.nzb.bak"));
    assert!(!is_target_name("nzb"));
    assert!(!is_target_name("notannzb.txt"));
    assert!(!is_target_name("a.nzbx"));
}

#[test]
fn is_target_name_rejects_directory_entries() {
    assert!(!is_target_name("subdir/"));
    assert!(!is_target_name("releases.nzb/"));
}

// ---------------------------------------------------------------------------
// safe_relative_path
// ---------------------------------------------------------------------------

#[test]
fn safe_relative_path_accepts_nested_members() {
    let relative = safe_relative_path(Path::new("jobs.rar"), "sub/dir/a.nzb").unwrap();
    assert_eq!(relative, Path::new("sub/dir/a.nzb"));
}

#[test]
fn safe_relative_path_strips_current_dir_components() {
    let relative = safe_relative_path(Path::new("jobs.rar"), "./a.nzb").unwrap();
    assert_eq!(relative, Path::new("a.nzb"));
}

#[test]
fn safe_relative_path_rejects_parent_traversal() {
    let result = safe_relative_path(Path::new("jobs.rar"), "../escape.nzb");
    match result {
        Err(Error::UnsafeMemberPath { name, .. }) => assert_eq!(name, "../escape.nzb"),
        other => panic!("expected UnsafeMemberPath, got: {other:?}"),
    }
}

#[test]
fn safe_relative_path_rejects_absolute_paths() {
    assert!(safe_relative_path(Path::new("jobs.rar"), "/etc/evil.nzb").is_err());
}

// ---------------------------------------------------------------------------
// ZIP reader
// ---------------------------------------------------------------------------

#[test]
fn zip_lists_only_target_members() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("jobs.zip");
    create_zip_archive(
        &archive_path,
        &[
            ("a.nzb", b"<nzb a/>".as_slice()),
            ("sub/b.nzb", b"<nzb b/>".as_slice()),
            ("readme.txt", b"not a job".as_slice()),
            ("B.NZB.bak", b"backup".as_slice()),
        ],
    );

    let mut reader = ZipReader::open(&archive_path).unwrap();
    let members = reader.list_target_members().unwrap();
    assert_eq!(members, vec!["a.nzb".to_string(), "sub/b.nzb".to_string()]);
}

#[test]
fn zip_listing_matches_uppercase_extension() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("jobs.zip");
    create_zip_archive(&archive_path, &[("LOUD.NZB", b"<nzb/>".as_slice())]);

    let mut reader = ZipReader::open(&archive_path).unwrap();
    assert_eq!(reader.list_target_members().unwrap(), vec!["LOUD.NZB"]);
}

#[test]
fn zip_extracts_selected_members_preserving_relative_paths() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("jobs.zip");
    create_zip_archive(
        &archive_path,
        &[
            ("a.nzb", b"<nzb a/>".as_slice()),
            ("sub/b.nzb", b"<nzb b/>".as_slice()),
            ("readme.txt", b"not a job".as_slice()),
        ],
    );

    let dest = dir.path().join("out");
    let mut reader = ZipReader::open(&archive_path).unwrap();
    let members = reader.list_target_members().unwrap();
    let extracted = reader.extract(&members, &dest).unwrap();

    assert_eq!(extracted.len(), 2);
    assert_eq!(std::fs::read(dest.join("a.nzb")).unwrap(), b"<nzb a/>");
    assert_eq!(std::fs::read(dest.join("sub/b.nzb")).unwrap(), b"<nzb b/>");
    assert!(!dest.join("readme.txt").exists(), "non-target member must not be extracted");
}

#[test]
fn zip_corrupt_archive_fails_to_open() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("corrupt.zip");
    std::fs::write(&archive_path, b"not a zip file at all").unwrap();

    match ZipReader::open(&archive_path) {
        Err(Error::ArchiveOpen { archive, .. }) => assert_eq!(archive, archive_path),
        other => panic!("expected ArchiveOpen, got: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// 7z reader
// ---------------------------------------------------------------------------

#[test]
fn sevenz_lists_and_extracts_target_members() {
    let dir = TempDir::new().unwrap();

    let src_dir = dir.path().join("source");
    std::fs::create_dir_all(&src_dir).unwrap();
    std::fs::write(src_dir.join("a.nzb"), b"<nzb a/>").unwrap();
    std::fs::write(src_dir.join("readme.txt"), b"not a job").unwrap();

    let archive_path = dir.path().join("jobs.7z");
    create_7z_archive(&archive_path, &src_dir);

    let dest = dir.path().join("out");
    let mut reader = SevenZipReader::open(&archive_path).unwrap();
    let members = reader.list_target_members().unwrap();
    assert_eq!(members, vec!["a.nzb"]);

    let extracted = reader.extract(&members, &dest).unwrap();
    assert_eq!(extracted, vec!["a.nzb"]);
    assert_eq!(std::fs::read(dest.join("a.nzb")).unwrap(), b"<nzb a/>");
    assert!(!dest.join("readme.txt").exists());
}

#[test]
fn sevenz_corrupt_archive_fails_to_open() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("corrupt.7z");
    std::fs::write(&archive_path, b"this is not a valid 7z archive").unwrap();

    match SevenZipReader::open(&archive_path) {
        Err(Error::ArchiveOpen { archive, .. }) => assert_eq!(archive, archive_path),
        other => panic!("expected ArchiveOpen, got: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// tar reader (plain, .tar.gz, .tgz)
// ---------------------------------------------------------------------------

#[test]
fn tar_lists_and_extracts_target_members() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("jobs.tar");
    create_tar_archive(
        &archive_path,
        &[
            ("a.nzb", b"<nzb a/>".as_slice()),
            ("nested/b.nzb", b"<nzb b/>".as_slice()),
            ("notes.txt", b"not a job".as_slice()),
        ],
        false,
    );

    let dest = dir.path().join("out");
    let mut reader = TarReader::open(&archive_path, false).unwrap();
    let members = reader.list_target_members().unwrap();
    assert_eq!(members, vec!["a.nzb".to_string(), "nested/b.nzb".to_string()]);

    let extracted = reader.extract(&members, &dest).unwrap();
    assert_eq!(extracted.len(), 2);
    assert_eq!(std::fs::read(dest.join("nested/b.nzb")).unwrap(), b"<nzb b/>");
    assert!(!dest.join("notes.txt").exists());
}

#[test]
fn targz_extracts_through_open_reader() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("jobs.tar.gz");
    create_tar_archive(&archive_path, &[("a.nzb", b"<nzb a/>".as_slice())], true);

    let dest = dir.path().join("out");
    let mut reader = open_reader(Format::TarGz, &archive_path).unwrap();
    let members = reader.list_target_members().unwrap();
    let extracted = reader.extract(&members, &dest).unwrap();

    assert_eq!(extracted, vec!["a.nzb"]);
    assert_eq!(std::fs::read(dest.join("a.nzb")).unwrap(), b"<nzb a/>");
}

#[test]
fn tgz_routes_to_the_gzipped_tar_reader() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("jobs.tgz");
    create_tar_archive(&archive_path, &[("a.nzb", b"<nzb a/>".as_slice())], true);

    let mut reader = open_reader(Format::Tgz, &archive_path).unwrap();
    assert_eq!(reader.list_target_members().unwrap(), vec!["a.nzb"]);
}

#[test]
fn tar_truncated_archive_fails_on_listing() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("corrupt.tar");
    std::fs::write(&archive_path, b"definitely not 512 bytes of header").unwrap();

    let mut reader = TarReader::open(&archive_path, false).unwrap();
    assert!(reader.list_target_members().is_err());
}

#[test]
fn targz_with_invalid_gzip_stream_fails_on_listing() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("corrupt.tar.gz");
    std::fs::write(&archive_path, b"not gzip data").unwrap();

    let mut reader = TarReader::open(&archive_path, true).unwrap();
    assert!(reader.list_target_members().is_err());
}

// ---------------------------------------------------------------------------
// gzip reader (single payload)
// ---------------------------------------------------------------------------

#[test]
fn gzip_recovers_payload_name_from_header() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("data.gz");
    create_gzip(&archive_path, b"<nzb/>", Some("job one.nzb"));

    let mut reader = GzipReader::open(&archive_path).unwrap();
    assert_eq!(reader.list_target_members().unwrap(), vec!["job one.nzb"]);
}

#[test]
fn gzip_falls_back_to_percent_decoded_archive_name() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("my%20job.nzb.gz");
    create_gzip(&archive_path, b"<nzb/>", None);

    let mut reader = GzipReader::open(&archive_path).unwrap();
    assert_eq!(reader.list_target_members().unwrap(), vec!["my job.nzb"]);
}

#[test]
fn gzip_non_target_payload_lists_nothing() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("data.gz");
    create_gzip(&archive_path, b"text", Some("readme.txt"));

    let mut reader = GzipReader::open(&archive_path).unwrap();
    assert!(reader.list_target_members().unwrap().is_empty());
}

#[test]
fn gzip_extracts_payload_alongside_source_archive() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("job.nzb.gz");
    create_gzip(&archive_path, b"<nzb payload/>", None);

    let mut reader = GzipReader::open(&archive_path).unwrap();
    let members = reader.list_target_members().unwrap();
    assert_eq!(members, vec!["job.nzb"]);

    // dest is ignored for the single-payload kind
    let unused_dest = dir.path().join("elsewhere");
    let extracted = reader.extract(&members, &unused_dest).unwrap();
    assert_eq!(extracted, vec!["job.nzb"]);
    assert_eq!(
        std::fs::read(dir.path().join("job.nzb")).unwrap(),
        b"<nzb payload/>"
    );
    assert!(!unused_dest.exists());
}

#[test]
fn gzip_header_name_with_separators_is_reduced_to_base_name() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("data.gz");
    create_gzip(&archive_path, b"<nzb/>", Some("../escape.nzb"));

    let mut reader = GzipReader::open(&archive_path).unwrap();
    assert_eq!(reader.list_target_members().unwrap(), vec!["escape.nzb"]);
}

#[test]
fn gzip_corrupt_stream_fails_to_open() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("corrupt.gz");
    std::fs::write(&archive_path, b"not a gzipped file").unwrap();

    match GzipReader::open(&archive_path) {
        Err(Error::ArchiveOpen { archive, .. }) => assert_eq!(archive, archive_path),
        other => panic!("expected ArchiveOpen, got: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// RAR reader
// ---------------------------------------------------------------------------

// unrar has no writer side, so only the failure path can be exercised with a
// fabricated archive

#[test]
fn rar_corrupt_archive_fails_to_open() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("corrupt.rar");
    std::fs::write(&archive_path, b"not a rar archive").unwrap();

    match RarReader::open(&archive_path) {
        Err(Error::ArchiveOpen { archive, .. }) => assert_eq!(archive, archive_path),
        other => panic!("expected ArchiveOpen, got: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// open_reader dispatch
// ---------------------------------------------------------------------------

#[test]
fn open_reader_rejects_the_target_format() {
    let result = open_reader(Format::Nzb, Path::new("job.nzb"));
    assert!(result.is_err(), "target files are not archives");
}

#[test]
fn open_reader_routes_zip() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("jobs.zip");
    create_zip_archive(&archive_path, &[("a.nzb", b"<nzb/>".as_slice())]);

    let mut reader = open_reader(Format::Zip, &archive_path).unwrap();
    assert_eq!(reader.list_target_members().unwrap(), vec!["a.nzb"]);
}
