//! Epub shelf library
//!
//! A Rust library for ingesting, unpacking and indexing EPUB eBook
//! files on behalf of a reading server.
//!
//! This library covers the EPUB ingestion pipeline and the in-memory
//! catalog that serves the derived structure: archive extraction,
//! container and package-document parsing, reading-order resolution and
//! tolerant table-of-contents extraction. HTTP routing, upload
//! transport and byte serving are left to the embedding application;
//! they read the catalog and perform no parsing themselves.
//!
//! ## Features
//!
//! - Extract uploaded EPUB archives onto disk with traversal-safe entry
//!   paths, one directory per book.
//! - Parse container descriptor and OPF package document into title,
//!   author, manifest and spine, with all hrefs resolved relative to
//!   the archive root at ingestion time.
//! - Extract a flat TOC from the navigation document with a tolerant,
//!   line-oriented scan that survives the markup found in the wild.
//! - Serve the result through a lock-guarded catalog that never exposes
//!   a partially ingested book.
//!
//! ## Quick Start
//!
//! ```rust, ignore
//! # use std::fs::File;
//! # use epub_shelf::catalog::Catalog;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = Catalog::new("data/books");
//!
//! // Ingest an uploaded archive
//! let file = File::open("path/to/book.epub")?;
//! let size = file.metadata()?.len();
//! let summary = catalog.ingest(file, "book.epub", size)?;
//! println!("Title: {}", summary.title);
//!
//! // Read the derived structure
//! let _spine = catalog.spine(&summary.id)?;
//! let _toc = catalog.toc(&summary.id)?;
//! let _root = catalog.resolve_root(&summary.id)?;
//!
//! # Ok(())
//! # }
//! ```
//!
//! The catalog is process-lifetime only: nothing is persisted across
//! restarts, and books are immutable once cataloged.

pub(crate) mod book;
pub(crate) mod utils;

pub mod archive;
pub mod catalog;
pub mod error;
pub mod types;

pub use utils::resolve_href;
