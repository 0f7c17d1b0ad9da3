//! Error Type Definition Module
//!
//! This module defines the various error types that may be encountered
//! while ingesting and indexing EPUB files. All errors are uniformly
//! wrapped in the `ShelfError` enumeration for convenient error handling
//! by the caller.

use thiserror::Error;

/// Types of errors that can occur while ingesting and serving EPUB books
///
/// This enumeration defines the various error cases that can be
/// encountered when unpacking an EPUB archive, parsing its container and
/// package documents, and looking books up in the catalog.
#[derive(Debug, Error)]
pub enum ShelfError {
    /// Invalid ZIP archive error
    ///
    /// The uploaded byte stream is not a readable ZIP archive, or one of
    /// its entries could not be decoded.
    #[error("Bad archive: {source}")]
    BadArchive { source: zip::result::ZipError },

    /// Data Decoding Error - Empty data
    ///
    /// This error occurs when trying to decode an empty byte stream.
    #[error("Decode error: The data is empty.")]
    EmptyData,

    /// XML parsing failure error
    ///
    /// This error usually only occurs when there is an exception in the XML
    /// parsing process, the event listener ends abnormally, resulting in the
    /// root node not being initialized. This exception may be caused by an
    /// incorrect XML file.
    #[error(
        "Failed parsing XML error: Unknown problems occurred during XML parsing, causing parsing failure."
    )]
    FailedParsingXml,

    #[error("IO error: {source}")]
    IOError { source: std::io::Error },

    /// Malformed container descriptor error
    ///
    /// Triggered when `META-INF/container.xml` exists but cannot be parsed,
    /// or does not declare a rootfile with a package document path.
    #[error("Malformed container: {reason}")]
    MalformedContainer { reason: String },

    /// Malformed package document error
    ///
    /// Triggered when the package document (OPF) declared by the container
    /// is not well-formed XML or lacks a root `package` element.
    #[error("Malformed package document: {reason}")]
    MalformedPackage { reason: String },

    /// Missing container descriptor error
    ///
    /// An extracted archive must hold `META-INF/container.xml`; this error
    /// occurs when that file is absent or unreadable.
    #[error("Missing container: META-INF/container.xml could not be read: {source}")]
    MissingContainer { source: std::io::Error },

    /// Lock poisoning error
    ///
    /// This error occurs when the catalog lock is poisoned, which means
    /// that a thread has panicked while holding it.
    #[error("Mutex error: Catalog lock was poisoned.")]
    MutexError,

    /// Unknown book identifier error
    ///
    /// Returned by every catalog read operation when the given identifier
    /// does not name an ingested book.
    #[error("Not found: No book with id \"{id}\" in the catalog.")]
    NotFound { id: String },

    /// Unsafe archive entry path error
    ///
    /// This error occurs when an archive entry path would resolve outside
    /// the extraction root, which is a security protection mechanism.
    #[error("Unsafe archive path: Entry \"{path}\" escapes the extraction root.")]
    UnsafeArchivePath { path: String },

    /// UTF-8 decoding error
    ///
    /// This error occurs when attempting to decode byte data into a UTF-8
    /// string but the data is not formatted correctly.
    #[error("Decode error: {source}")]
    Utf8Decode { source: std::string::FromUtf8Error },

    /// UTF-16 decoding error
    ///
    /// This error occurs when attempting to decode byte data into a UTF-16
    /// string but the data is not formatted correctly.
    #[error("Decode error: {source}")]
    Utf16Decode { source: std::string::FromUtf16Error },

    /// QuickXml error
    ///
    /// This error occurs when parsing XML data using the QuickXml library.
    #[error("QuickXml error: {source}")]
    QuickXml { source: quick_xml::Error },
}

impl From<zip::result::ZipError> for ShelfError {
    fn from(value: zip::result::ZipError) -> Self {
        ShelfError::BadArchive { source: value }
    }
}

impl From<quick_xml::Error> for ShelfError {
    fn from(value: quick_xml::Error) -> Self {
        ShelfError::QuickXml { source: value }
    }
}

impl From<std::io::Error> for ShelfError {
    fn from(value: std::io::Error) -> Self {
        ShelfError::IOError { source: value }
    }
}

impl From<std::string::FromUtf8Error> for ShelfError {
    fn from(value: std::string::FromUtf8Error) -> Self {
        ShelfError::Utf8Decode { source: value }
    }
}

impl From<std::string::FromUtf16Error> for ShelfError {
    fn from(value: std::string::FromUtf16Error) -> Self {
        ShelfError::Utf16Decode { source: value }
    }
}

impl<T> From<std::sync::PoisonError<T>> for ShelfError {
    fn from(_value: std::sync::PoisonError<T>) -> Self {
        ShelfError::MutexError
    }
}

#[cfg(test)]
impl PartialEq for ShelfError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::MalformedContainer { reason: l_reason },
                Self::MalformedContainer { reason: r_reason },
            ) => l_reason == r_reason,
            (
                Self::MalformedPackage { reason: l_reason },
                Self::MalformedPackage { reason: r_reason },
            ) => l_reason == r_reason,
            (Self::NotFound { id: l_id }, Self::NotFound { id: r_id }) => l_id == r_id,
            (
                Self::UnsafeArchivePath { path: l_path },
                Self::UnsafeArchivePath { path: r_path },
            ) => l_path == r_path,
            (Self::Utf8Decode { source: l_source }, Self::Utf8Decode { source: r_source }) => {
                l_source == r_source
            }

            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}
