//! Archive extraction module
//!
//! Materializes the directory tree of a ZIP-format byte stream onto
//! persistent storage, preserving entry paths. EPUB archives are plain
//! ZIP containers, so this is the first stage of every ingestion.

use std::{
    fs::{self, File},
    io::{self, Read, Seek},
    path::Path,
};

use zip::ZipArchive;

use crate::error::ShelfError;

/// Extracts every entry of a ZIP archive under a destination directory
///
/// Entry paths are preserved exactly; parent directories are created as
/// needed. Extraction is not idempotent: re-extracting into the same
/// destination silently overwrites files with identical names. On
/// failure the destination may be left partially written; the caller
/// owns cleanup of the surrounding book directory.
///
/// Every entry path is checked for containment before any write. An
/// entry that would resolve outside the destination root (absolute
/// paths, `..` traversal) aborts extraction with
/// [`ShelfError::UnsafeArchivePath`], since entry names are
/// attacker-controlled.
///
/// ## Parameters
/// - `reader`: A seekable reader over the ZIP-format byte stream
/// - `dest`: The directory to extract into
///
/// ## Return
/// - `Ok(())`: All entries were written under `dest`
/// - `Err(ShelfError)`: The stream is not a valid ZIP archive
///   (`BadArchive`), an entry path is unsafe, or a write failed
pub fn extract<R: Read + Seek>(reader: R, dest: &Path) -> Result<(), ShelfError> {
    let mut archive = ZipArchive::new(reader)?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;

        let relative = entry
            .enclosed_name()
            .ok_or_else(|| ShelfError::UnsafeArchivePath {
                path: entry.name().to_string(),
            })?;
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{fs, io::Write};

    use tempfile::TempDir;
    use zip::{ZipWriter, write::SimpleFileOptions};

    use crate::{archive::extract, error::ShelfError};

    fn zip_with_entries(entries: &[(&str, &str)]) -> std::io::Cursor<Vec<u8>> {
        let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        for (name, content) in entries {
            writer.start_file(name.to_string(), options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }

        writer.finish().unwrap()
    }

    /// Entry paths survive extraction exactly, with parents created
    #[test]
    fn test_extract_preserves_entry_paths() {
        let archive = zip_with_entries(&[
            ("mimetype", "application/epub+zip"),
            ("META-INF/container.xml", "<container/>"),
            ("OEBPS/chap1.xhtml", "<html/>"),
        ]);

        let dest = TempDir::new().unwrap();
        extract(archive, dest.path()).unwrap();

        assert_eq!(
            fs::read_to_string(dest.path().join("mimetype")).unwrap(),
            "application/epub+zip"
        );
        assert!(dest.path().join("META-INF/container.xml").is_file());
        assert_eq!(
            fs::read_to_string(dest.path().join("OEBPS/chap1.xhtml")).unwrap(),
            "<html/>"
        );
    }

    /// A stream that is not a ZIP archive is rejected up front
    #[test]
    fn test_extract_rejects_non_zip_stream() {
        let dest = TempDir::new().unwrap();
        let result = extract(std::io::Cursor::new(b"not a zip".to_vec()), dest.path());

        assert!(matches!(result, Err(ShelfError::BadArchive { .. })));
    }

    /// Entries escaping the destination root abort extraction
    #[test]
    fn test_extract_rejects_traversal_entry() {
        let archive = zip_with_entries(&[("../escape.txt", "pwned")]);

        let dest = TempDir::new().unwrap();
        let result = extract(archive, dest.path());

        assert_eq!(
            result.unwrap_err(),
            ShelfError::UnsafeArchivePath {
                path: "../escape.txt".to_string(),
            }
        );
        assert!(!dest.path().parent().unwrap().join("escape.txt").exists());
    }

    /// Re-extraction overwrites files with identical names
    #[test]
    fn test_extract_overwrites_existing_files() {
        let dest = TempDir::new().unwrap();

        extract(zip_with_entries(&[("a.txt", "first")]), dest.path()).unwrap();
        extract(zip_with_entries(&[("a.txt", "second")]), dest.path()).unwrap();

        assert_eq!(
            fs::read_to_string(dest.path().join("a.txt")).unwrap(),
            "second"
        );
    }
}
