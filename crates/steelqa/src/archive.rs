//! Release packaging: compress a build output directory into a zip archive.
//!
//! Every regular file under the source root is stored once, named by its path
//! relative to the root with `/` separators. Directories are not stored as
//! entries of their own. A symlink to a file is stored with the target's
//! contents; symlinked directories are not descended into.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::types::{QaError, QaResult};

/// Files at or above this size need zip64 headers.
const ZIP64_THRESHOLD: u64 = 0xFFFF_FFFF;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One file slated for the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    /// Location on disk.
    pub path: PathBuf,
    /// Entry name inside the archive.
    pub archive_name: String,
}

/// Result of a completed packaging run.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveSummary {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub entries: Vec<String>,
    pub bytes: u64,
}

impl ArchiveSummary {
    pub fn megabytes(&self) -> f64 {
        bytes_to_megabytes(self.bytes)
    }
}

/// Convert a byte count to mebibytes.
pub fn bytes_to_megabytes(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Walk `source` and list every regular file with its archive name.
///
/// Entries come back sorted by archive name so repeated runs over an
/// unchanged tree yield the same manifest.
pub fn build_manifest(source: &Path) -> QaResult<Vec<ManifestEntry>> {
    if !source.is_dir() {
        return Err(QaError::SourceNotFound(source.display().to_string()));
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        // `file_type` describes the link itself; `is_file` follows it.
        if !entry.file_type().is_file() && !(entry.path_is_symlink() && path.is_file()) {
            continue;
        }
        let relative = path.strip_prefix(source).unwrap_or(path);
        entries.push(ManifestEntry {
            path: path.to_path_buf(),
            archive_name: archive_name(relative),
        });
    }

    entries.sort_by(|a, b| a.archive_name.cmp(&b.archive_name));
    Ok(entries)
}

/// Compress every file under `source` into a deflated zip at `destination`.
///
/// Fails on the first filesystem error. An interrupted run may leave a
/// partial archive behind.
pub fn pack_directory(source: &Path, destination: &Path) -> QaResult<ArchiveSummary> {
    if !source.is_dir() {
        return Err(QaError::SourceNotFound(source.display().to_string()));
    }
    let root = source.canonicalize()?;

    info!("Creating {}", destination.display());
    let file = File::create(destination)?;
    // The archive may be written into the tree it is packing.
    let own_path = destination.canonicalize()?;

    let mut writer = ZipWriter::new(file);
    let mut names = Vec::new();

    for entry in build_manifest(&root)? {
        if entry.path == own_path {
            debug!("Skipping the archive itself: {}", entry.path.display());
            continue;
        }

        let size = entry.path.metadata()?.len();
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(size >= ZIP64_THRESHOLD);
        debug!(name = %entry.archive_name, size, "adding entry");

        writer.start_file(entry.archive_name.as_str(), options)?;
        let mut input = File::open(&entry.path)?;
        io::copy(&mut input, &mut writer)?;
        names.push(entry.archive_name);
    }

    writer.finish()?;
    let bytes = std::fs::metadata(destination)?.len();
    info!(entries = names.len(), bytes, "archive written");

    Ok(ArchiveSummary {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        entries: names,
        bytes,
    })
}

fn archive_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sample_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"alpha").unwrap();
        fs::create_dir_all(dir.path().join("sub/deeper")).unwrap();
        fs::write(dir.path().join("sub/b.txt"), b"bravo").unwrap();
        fs::write(dir.path().join("sub/deeper/c.bin"), [0u8; 64]).unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        dir
    }

    fn archive_names(path: &Path) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_manifest_uses_relative_slash_names() {
        let tree = sample_tree();
        let manifest = build_manifest(tree.path()).unwrap();
        let names: Vec<_> = manifest.iter().map(|e| e.archive_name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "sub/b.txt", "sub/deeper/c.bin"]);
        assert!(manifest.iter().all(|e| e.path.is_file()));
    }

    #[test]
    fn test_pack_stores_every_file_once() {
        let tree = sample_tree();
        let out = tempfile::tempdir().unwrap();
        let dest = out.path().join("release.zip");

        let summary = pack_directory(tree.path(), &dest).unwrap();
        assert_eq!(summary.entries.len(), 3);
        assert!(summary.bytes > 0);
        assert_eq!(summary.bytes, fs::metadata(&dest).unwrap().len());

        let mut stored = archive_names(&dest);
        stored.sort();
        assert_eq!(stored, vec!["a.txt", "sub/b.txt", "sub/deeper/c.bin"]);
    }

    #[test]
    fn test_pack_deflates_contents() {
        let tree = sample_tree();
        let out = tempfile::tempdir().unwrap();
        let dest = out.path().join("release.zip");
        pack_directory(tree.path(), &dest).unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let entry = archive.by_name("sub/b.txt").unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        assert_eq!(entry.size(), 5);
    }

    #[test]
    fn test_repack_yields_same_entry_set() {
        let tree = sample_tree();
        let out = tempfile::tempdir().unwrap();
        let first = pack_directory(tree.path(), &out.path().join("one.zip")).unwrap();
        let second = pack_directory(tree.path(), &out.path().join("two.zip")).unwrap();
        assert_eq!(first.entries, second.entries);
    }

    #[test]
    fn test_missing_source_is_not_found() {
        let out = tempfile::tempdir().unwrap();
        let err = pack_directory(&out.path().join("nope"), &out.path().join("x.zip")).unwrap_err();
        assert!(matches!(err, QaError::SourceNotFound(_)));
        assert!(!out.path().join("x.zip").exists());
    }

    #[test]
    fn test_unwritable_destination_is_io_error() {
        let tree = sample_tree();
        let err = pack_directory(tree.path(), &tree.path().join("missing-dir/out.zip")).unwrap_err();
        assert!(matches!(err, QaError::Io(_)));
    }

    #[test]
    fn test_archive_inside_source_is_skipped() {
        let tree = sample_tree();
        let dest = tree.path().join("self.zip");
        let summary = pack_directory(tree.path(), &dest).unwrap();
        assert!(!summary.entries.iter().any(|n| n == "self.zip"));
        assert_eq!(summary.entries.len(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_is_stored_with_target_contents() {
        let tree = sample_tree();
        let shared = tempfile::tempdir().unwrap();
        fs::write(shared.path().join("shared.dll"), b"shared-bytes").unwrap();
        std::os::unix::fs::symlink(shared.path().join("shared.dll"), tree.path().join("shared.dll"))
            .unwrap();
        std::os::unix::fs::symlink(shared.path(), tree.path().join("linked-dir")).unwrap();

        let out = tempfile::tempdir().unwrap();
        let dest = out.path().join("release.zip");
        let summary = pack_directory(tree.path(), &dest).unwrap();
        assert_eq!(
            summary.entries,
            vec!["a.txt", "shared.dll", "sub/b.txt", "sub/deeper/c.bin"]
        );

        let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let mut entry = archive.by_name("shared.dll").unwrap();
        let mut contents = String::new();
        io::Read::read_to_string(&mut entry, &mut contents).unwrap();
        assert_eq!(contents, "shared-bytes");
    }

    #[test]
    fn test_megabytes() {
        assert!((bytes_to_megabytes(1_048_576) - 1.0).abs() < f64::EPSILON);
        assert!((bytes_to_megabytes(0)).abs() < f64::EPSILON);
    }
}
