//! Per-book parse pipeline
//!
//! Turns one extracted archive tree into a [`BookRecord`]: locates the
//! package document through the container descriptor, parses its
//! metadata, manifest and spine, and extracts a flat table of contents
//! from the navigation document. All hrefs are resolved relative to the
//! archive root here, once, at ingestion time.

use std::{collections::HashMap, fs, path::Path};

use log::warn;

use crate::{
    error::ShelfError,
    types::{BookRecord, ManifestItem, TocEntry},
    utils::{DecodeBytes, XmlReader, resolve_href},
};

/// Fixed location of the container descriptor inside an EPUB archive
const CONTAINER_PATH: &str = "META-INF/container.xml";

/// The package document content before href resolution
struct PackageDoc {
    title: String,
    author: String,
    items: Vec<RawItem>,
    spine: Vec<String>,
}

/// A manifest item with its href as authored in the package document
struct RawItem {
    id: String,
    href: String,
    media_type: String,
}

/// Parses an extracted archive tree into a complete book record
///
/// This is the only entry point of the module. The `root` directory must
/// already hold the fully extracted archive; nothing is written here.
/// Container and package failures abort the load; navigation failures
/// are recovered with an empty TOC so the rest of the book stays usable.
pub(crate) fn load_book(id: &str, root: &Path) -> Result<BookRecord, ShelfError> {
    let package_path = locate_rootfile(root)?;
    let package = parse_package(&root.join(&package_path))?;
    let base = package_dir(&package_path);

    let mut manifest = HashMap::with_capacity(package.items.len());
    for item in &package.items {
        manifest.insert(
            item.id.clone(),
            ManifestItem {
                id: item.id.clone(),
                href: resolve_href(base, &item.href),
                media_type: item.media_type.clone(),
            },
        );
    }

    for idref in &package.spine {
        if !manifest.contains_key(idref) {
            warn!("Spine of book {id} references unknown manifest item \"{idref}\"");
        }
    }

    let toc = match find_nav_candidate(&package.items) {
        Some(nav_href) => {
            let nav_path = root.join(resolve_href(base, nav_href));
            match extract_toc(&nav_path, base) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("TOC extraction failed for book {id}: {err}");
                    vec![]
                }
            }
        }
        None => vec![],
    };

    Ok(BookRecord {
        id: id.to_string(),
        title: package.title,
        author: package.author,
        package_path,
        root: root.to_path_buf(),
        manifest,
        spine: package.spine,
        toc,
    })
}

/// Reads the container descriptor and returns the package document path
///
/// Only the first declared rootfile is used; multiple-rendition archives
/// are not supported.
///
/// ## Return
/// - `Ok(String)`: The package document path, relative to `root`
/// - `Err(ShelfError)`: `MissingContainer` when the descriptor is absent
///   or unreadable, `MalformedContainer` when it cannot be parsed or
///   declares no rootfile
fn locate_rootfile(root: &Path) -> Result<String, ShelfError> {
    let data = fs::read(root.join(CONTAINER_PATH))
        .map_err(|source| ShelfError::MissingContainer { source })?;
    let content = data
        .decode()
        .map_err(|err| malformed_container(err.to_string()))?;

    let container =
        XmlReader::parse(&content).map_err(|err| malformed_container(err.to_string()))?;
    let rootfile = container
        .find_first("rootfile")
        .ok_or_else(|| malformed_container("no rootfile declared".to_string()))?;

    rootfile
        .get_attr("full-path")
        .ok_or_else(|| malformed_container("rootfile has no full-path attribute".to_string()))
}

fn malformed_container(reason: String) -> ShelfError {
    ShelfError::MalformedContainer { reason }
}

/// Parses the package document (OPF) at the given on-disk path
///
/// Title and author come from the Dublin Core `title` and `creator`
/// elements, trimmed of surrounding whitespace; a missing element yields
/// an empty string, not an error. Manifest items and spine references
/// are captured with their attributes as authored.
fn parse_package(path: &Path) -> Result<PackageDoc, ShelfError> {
    let content = fs::read(path)?
        .decode()
        .map_err(|err| malformed_package(err.to_string()))?;
    let package = XmlReader::parse(&content).map_err(|err| malformed_package(err.to_string()))?;

    if package.name != "package" {
        return Err(malformed_package(format!(
            "expected a package root element, found \"{}\"",
            package.name
        )));
    }

    let (title, author) = match package.find_first("metadata") {
        Some(metadata) => (
            metadata
                .find_first("title")
                .map(|element| element.text())
                .unwrap_or_default(),
            metadata
                .find_first("creator")
                .map(|element| element.text())
                .unwrap_or_default(),
        ),
        None => (String::new(), String::new()),
    };

    let items = match package.find_first("manifest") {
        Some(manifest) => manifest
            .children_named("item")
            .map(|item| RawItem {
                id: item.get_attr("id").unwrap_or_default(),
                href: item.get_attr("href").unwrap_or_default(),
                media_type: item.get_attr("media-type").unwrap_or_default(),
            })
            .collect(),
        None => vec![],
    };

    let spine = match package.find_first("spine") {
        Some(spine) => spine
            .children_named("itemref")
            .map(|itemref| itemref.get_attr("idref").unwrap_or_default())
            .collect(),
        None => vec![],
    };

    Ok(PackageDoc {
        title,
        author,
        items,
        spine,
    })
}

fn malformed_package(reason: String) -> ShelfError {
    ShelfError::MalformedPackage { reason }
}

/// The directory containing the package document, relative to the root
fn package_dir(package_path: &str) -> &str {
    package_path
        .rsplit_once('/')
        .map(|(dir, _)| dir)
        .unwrap_or("")
}

/// Picks the manifest item most plausibly holding the navigation document
///
/// Heuristic: any href containing the substring "nav" or "toc" as
/// authored (case-sensitive) is a candidate; among candidates the
/// shortest href wins, which favors canonical `nav.xhtml`-style names
/// over deeply nested auxiliary files. No candidate means no TOC, which
/// is not an error.
fn find_nav_candidate(items: &[RawItem]) -> Option<&str> {
    items
        .iter()
        .map(|item| item.href.as_str())
        .filter(|href| href.contains("nav") || href.contains("toc"))
        .min_by_key(|href| href.len())
}

/// Extracts (link, label) entries from a navigation document
///
/// This is a deliberately lossy, line-oriented scan rather than a
/// structural HTML parse: for each line containing an anchor-opening
/// tag, the first `href="..."` value and the tag-stripped visible text
/// are taken, and the line is emitted only when both are non-empty.
/// Nested lists, multi-line anchors and unusually ordered attributes are
/// not extracted; real-world archives rely on this tolerance, so do not
/// upgrade it to a strict parser.
///
/// Hrefs are resolved against `base` except fragment-only links, which
/// are stored as authored and fall back to the first spine item by
/// convention when consumed.
fn extract_toc(path: &Path, base: &str) -> Result<Vec<TocEntry>, ShelfError> {
    let content = fs::read(path)?.decode()?;

    let mut entries = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if !line.contains("<a ") {
            continue;
        }

        let Some(href) = attr_between(line, "href=\"", "\"") else {
            continue;
        };
        let label = strip_tags(line);
        if href.is_empty() || label.is_empty() {
            continue;
        }

        entries.push(TocEntry {
            href: resolve_toc_href(base, href),
            label,
        });
    }

    Ok(entries)
}

fn resolve_toc_href(base: &str, href: &str) -> String {
    match href.split_once('#') {
        // Fragment-only link, left unresolved at ingestion time
        Some(("", _)) => href.to_string(),
        Some((path, fragment)) => format!("{}#{}", resolve_href(base, path), fragment),
        None => resolve_href(base, href),
    }
}

/// The text between the first occurrence of `open` and the next `close`
fn attr_between<'a>(line: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = line.find(open)? + open.len();
    let rest = &line[start..];
    Some(&rest[..rest.find(close)?])
}

/// Removes tag markup from a line and normalizes the visible text
///
/// Non-breaking spaces become regular spaces; surrounding whitespace is
/// trimmed.
fn strip_tags(line: &str) -> String {
    let mut out = String::new();
    let mut in_tag = false;

    for ch in line.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }

    out.replace('\u{a0}', " ").trim().to_string()
}
