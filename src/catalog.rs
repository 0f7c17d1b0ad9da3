//! In-memory book catalog
//!
//! The catalog is the sole mutable shared state of the crate: a
//! lock-guarded map from book identifier to [`BookRecord`], populated by
//! ingestion and read by the routing and file-serving collaborators.
//! There is no ambient singleton; construct one instance and pass it by
//! reference to every consumer.

use std::{
    collections::HashMap,
    fs::{self, File},
    io::{self, BufReader, Read},
    path::{Path, PathBuf},
    sync::RwLock,
    time::{SystemTime, UNIX_EPOCH},
};

use log::debug;
use sha1::{Digest, Sha1};

use crate::{
    archive,
    book::load_book,
    error::ShelfError,
    types::{BookRecord, BookSummary, SpineEntry, TocEntry},
};

/// Name under which the uploaded archive is kept in the book directory
const ARCHIVE_NAME: &str = "book.epub";

/// Name of the extracted copy inside the book directory
const UNPACKED_DIR: &str = "unpacked";

/// A concurrency-safe registry of ingested books
///
/// Books follow a strict lifecycle: absent, then ingesting (not
/// visible), then cataloged (terminal, visible, immutable). A failed
/// ingestion never becomes visible and leaves no on-disk artifacts.
/// Insertion is the only writer operation; lookups and listings may
/// proceed concurrently with each other, never with an insert.
///
/// On disk, each book owns `<root_dir>/<id>/` holding the original
/// archive (`book.epub`) and its fully extracted copy (`unpacked/`).
/// That directory is never moved or collected while the record exists;
/// records live until process termination.
pub struct Catalog {
    /// Directory under which per-book directories are created
    root_dir: PathBuf,

    /// Single-writer/multi-reader guarded book map
    books: RwLock<HashMap<String, BookRecord>>,
}

impl Catalog {
    /// Creates an empty catalog rooted at the given data directory
    ///
    /// The directory itself is created lazily, per book, during
    /// ingestion; `root_dir` should be an absolute path so that
    /// [`Catalog::resolve_root`] hands absolute roots to the file
    /// server.
    pub fn new<P: AsRef<Path>>(root_dir: P) -> Self {
        Self {
            root_dir: root_dir.as_ref().to_path_buf(),
            books: RwLock::new(HashMap::new()),
        }
    }

    /// Ingests one EPUB archive from a byte stream
    ///
    /// The stream is copied to disk, extracted, parsed and indexed; the
    /// resulting record becomes visible atomically at the very end, so
    /// concurrent readers never observe a partially ingested book.
    /// Multiple ingestions may run concurrently; each writes to its own
    /// identifier-named directory.
    ///
    /// `filename` and `size` are upload metadata used only to derive the
    /// book identifier. Derivation is not content-addressed: uploading
    /// byte-identical content twice yields two distinct identifiers and
    /// two catalog entries.
    ///
    /// ## Parameters
    /// - `reader`: The uploaded archive bytes
    /// - `filename`: The original upload filename
    /// - `size`: The original upload size in bytes
    ///
    /// ## Return
    /// - `Ok(BookSummary)`: The newly cataloged book
    /// - `Err(ShelfError)`: The archive or its metadata documents were
    ///   rejected; the partially written book directory has been removed
    pub fn ingest<R: Read>(
        &self,
        reader: R,
        filename: &str,
        size: u64,
    ) -> Result<BookSummary, ShelfError> {
        let id = self.derive_id(filename, size)?;
        let book_dir = self.root_dir.join(&id);
        fs::create_dir_all(&book_dir)?;

        // Scoped cleanup: any failure past this point removes the
        // partially written directory before surfacing the error.
        let record = match ingest_into(&book_dir, &id, reader) {
            Ok(record) => record,
            Err(err) => {
                let _ = fs::remove_dir_all(&book_dir);
                return Err(err);
            }
        };

        debug!(
            "cataloged book {id}: \"{}\" ({} spine items, {} toc entries)",
            record.title,
            record.spine.len(),
            record.toc.len()
        );

        let summary = record.summary();
        self.books.write()?.insert(id, record);
        Ok(summary)
    }

    /// Returns a snapshot of all cataloged books
    ///
    /// The order of the snapshot is not guaranteed to match insertion
    /// order.
    pub fn list(&self) -> Result<Vec<BookSummary>, ShelfError> {
        let books = self.books.read()?;
        Ok(books.values().map(BookRecord::summary).collect())
    }

    /// Looks up one book by identifier
    pub fn get(&self, id: &str) -> Result<BookSummary, ShelfError> {
        let books = self.books.read()?;
        books
            .get(id)
            .map(BookRecord::summary)
            .ok_or_else(|| ShelfError::NotFound { id: id.to_string() })
    }

    /// Returns the resolved linear reading order of a book
    ///
    /// Entries appear in spine order with archive-root-relative hrefs.
    /// A spine reference to an absent manifest item yields a placeholder
    /// entry with blank href and media type.
    pub fn spine(&self, id: &str) -> Result<Vec<SpineEntry>, ShelfError> {
        let books = self.books.read()?;
        books
            .get(id)
            .map(BookRecord::spine_entries)
            .ok_or_else(|| ShelfError::NotFound { id: id.to_string() })
    }

    /// Returns the extracted table of contents of a book
    ///
    /// The list may be empty; a book without a recognizable navigation
    /// document is still fully readable through its spine.
    pub fn toc(&self, id: &str) -> Result<Vec<TocEntry>, ShelfError> {
        let books = self.books.read()?;
        books
            .get(id)
            .map(|record| record.toc.clone())
            .ok_or_else(|| ShelfError::NotFound { id: id.to_string() })
    }

    /// Returns the on-disk root of a book's extracted tree
    ///
    /// Used by the file-serving collaborator to map a requested relative
    /// path to a file; the catalog itself never serves byte content.
    pub fn resolve_root(&self, id: &str) -> Result<PathBuf, ShelfError> {
        let books = self.books.read()?;
        books
            .get(id)
            .map(|record| record.root.clone())
            .ok_or_else(|| ShelfError::NotFound { id: id.to_string() })
    }

    /// Derives a fresh opaque book identifier from upload metadata
    ///
    /// The identifier is the first 12 hex characters of
    /// `sha1(filename + "-" + size + "-" + nanos)`. The timestamp keeps
    /// repeated uploads of the same file apart; on the off chance of a
    /// collision with an existing entry the derivation is retried until
    /// the identifier is unique for this process.
    fn derive_id(&self, filename: &str, size: u64) -> Result<String, ShelfError> {
        loop {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_nanos())
                .unwrap_or_default();

            let mut hasher = Sha1::new();
            hasher.update(filename.as_bytes());
            hasher.update(format!("-{size}-{nanos}").as_bytes());

            let digest = hasher.finalize();
            let id: String = digest
                .iter()
                .take(6)
                .map(|byte| format!("{byte:02x}"))
                .collect();

            if !self.books.read()?.contains_key(&id) {
                return Ok(id);
            }
        }
    }
}

/// Runs the extraction-and-parse pipeline inside a fresh book directory
///
/// Within one book, ordering is strict: the upload is fully copied to
/// disk, then fully extracted, then parsed; the record is returned only
/// once everything succeeded.
fn ingest_into<R: Read>(book_dir: &Path, id: &str, mut reader: R) -> Result<BookRecord, ShelfError> {
    let archive_path = book_dir.join(ARCHIVE_NAME);
    let mut out = File::create(&archive_path)?;
    io::copy(&mut reader, &mut out)?;

    let root = book_dir.join(UNPACKED_DIR);
    let archive_file = File::open(&archive_path)?;
    archive::extract(BufReader::new(archive_file), &root)?;

    load_book(id, &root)
}
