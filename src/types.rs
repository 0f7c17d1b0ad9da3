use std::{collections::HashMap, path::PathBuf};

/// Represents one ingested EPUB publication held by the catalog
///
/// A `BookRecord` is created atomically at the end of a successful
/// ingestion and is immutable thereafter. Every href stored on it
/// (manifest, TOC) has already been resolved relative to the extracted
/// archive root; no path resolution happens at read time.
#[derive(Debug, Clone)]
pub struct BookRecord {
    /// The opaque identifier assigned at ingestion time
    ///
    /// This is the sole external handle to the book. It is derived from
    /// the upload metadata and the ingestion time, not from the archive
    /// content, so identical content uploaded twice yields two records.
    pub id: String,

    /// The publication title from the Dublin Core `title` element
    ///
    /// Empty if the package document declares no title.
    pub title: String,

    /// The publication author from the Dublin Core `creator` element
    ///
    /// Empty if the package document declares no creator.
    pub author: String,

    /// The package document path declared by the container descriptor
    ///
    /// Relative to the extracted archive root, slash-separated as
    /// authored in `META-INF/container.xml`.
    pub package_path: String,

    /// The on-disk location of the extracted archive tree
    ///
    /// Never exposed to external consumers directly; the catalog hands it
    /// to the file-serving collaborator through `resolve_root`. The
    /// directory is owned exclusively by this record for its lifetime.
    pub(crate) root: PathBuf,

    /// All resources declared by the package manifest, keyed by item id
    pub manifest: HashMap<String, ManifestItem>,

    /// The manifest item ids in linear reading order
    ///
    /// The first entry, when present, is the default opening location.
    /// An id referencing no manifest item is kept as authored; readers
    /// receive a blank placeholder entry for it.
    pub spine: Vec<String>,

    /// The extracted table of contents, possibly empty
    pub toc: Vec<TocEntry>,
}

/// Represents a resource item declared in the package manifest
///
/// Identifiers are unique within one book's manifest; several items may
/// share a media type. The href has been resolved against the package
/// document's directory at ingestion time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    /// The identifier of the resource, unique within the manifest
    pub id: String,

    /// The resource path relative to the extracted archive root
    pub href: String,

    /// The declared media type of the resource
    pub media_type: String,
}

/// An entry of the linear reading order served to consumers
///
/// Produced by joining a spine id reference with its manifest item. When
/// the referenced item is absent from the manifest, `href` and
/// `media_type` are left blank rather than failing the whole spine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineEntry {
    /// The manifest item id this entry references
    pub idref: String,

    /// The resource path relative to the extracted archive root
    pub href: String,

    /// The declared media type of the referenced resource
    pub media_type: String,
}

/// A single navigation entry extracted from the navigation document
///
/// Entries keep the extraction order of the navigation document, which
/// is not guaranteed to match spine order. The href is resolved relative
/// to the archive root, except for fragment-only links which are stored
/// as authored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    /// The link target of the entry
    pub href: String,

    /// The visible label of the entry
    pub label: String,
}

/// The catalog view of a book handed to listing and lookup consumers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookSummary {
    /// The opaque identifier assigned at ingestion time
    pub id: String,

    /// The publication title, possibly empty
    pub title: String,

    /// The publication author, possibly empty
    pub author: String,

    /// The package document path relative to the archive root
    pub package_path: String,
}

impl BookRecord {
    /// Build the catalog view of this record
    pub fn summary(&self) -> BookSummary {
        BookSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            author: self.author.clone(),
            package_path: self.package_path.clone(),
        }
    }

    /// Join the spine id references with the manifest
    ///
    /// Ids referencing no manifest item yield placeholder entries with
    /// blank href and media type; such entries never abort a read.
    pub fn spine_entries(&self) -> Vec<SpineEntry> {
        self.spine
            .iter()
            .map(|idref| match self.manifest.get(idref) {
                Some(item) => SpineEntry {
                    idref: idref.clone(),
                    href: item.href.clone(),
                    media_type: item.media_type.clone(),
                },
                None => SpineEntry {
                    idref: idref.clone(),
                    href: String::new(),
                    media_type: String::new(),
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    mod book_record_tests {
        use std::{collections::HashMap, path::PathBuf};

        use crate::types::{BookRecord, ManifestItem, SpineEntry};

        fn record_with(manifest: HashMap<String, ManifestItem>, spine: Vec<String>) -> BookRecord {
            BookRecord {
                id: "b1".to_string(),
                title: "Title".to_string(),
                author: "Author".to_string(),
                package_path: "OEBPS/content.opf".to_string(),
                root: PathBuf::from("/tmp/b1/unpacked"),
                manifest,
                spine,
                toc: vec![],
            }
        }

        /// Spine entries are joined with the manifest in spine order
        #[test]
        fn test_spine_entries_join_manifest() {
            let mut manifest = HashMap::new();
            manifest.insert(
                "c2".to_string(),
                ManifestItem {
                    id: "c2".to_string(),
                    href: "OEBPS/chap2.xhtml".to_string(),
                    media_type: "application/xhtml+xml".to_string(),
                },
            );
            manifest.insert(
                "c1".to_string(),
                ManifestItem {
                    id: "c1".to_string(),
                    href: "OEBPS/chap1.xhtml".to_string(),
                    media_type: "application/xhtml+xml".to_string(),
                },
            );

            let record = record_with(manifest, vec!["c1".to_string(), "c2".to_string()]);
            let entries = record.spine_entries();

            assert_eq!(entries.len(), 2);
            assert_eq!(entries[0].idref, "c1");
            assert_eq!(entries[0].href, "OEBPS/chap1.xhtml");
            assert_eq!(entries[1].idref, "c2");
            assert_eq!(entries[1].href, "OEBPS/chap2.xhtml");
        }

        /// A spine id with no manifest item yields a blank placeholder
        #[test]
        fn test_spine_entries_missing_idref() {
            let record = record_with(HashMap::new(), vec!["ghost".to_string()]);
            let entries = record.spine_entries();

            assert_eq!(
                entries,
                vec![SpineEntry {
                    idref: "ghost".to_string(),
                    href: String::new(),
                    media_type: String::new(),
                }]
            );
        }
    }
}
