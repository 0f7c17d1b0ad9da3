use std::collections::HashMap;

use quick_xml::{Reader, events::Event};

use crate::error::ShelfError;

/// Resolves an href against a base directory inside the archive
///
/// This is a pure function over slash-separated archive paths. `base` is
/// the directory containing the package document, expressed relative to
/// the extracted archive root; `rel` is an href as authored in the
/// manifest, spine or navigation document. The result is a normalized
/// path relative to the archive root with `.` and `..` segments
/// collapsed.
///
/// An empty `rel` resolves to the base directory unchanged. Leading `..`
/// segments that would climb above the archive root are kept as-is; the
/// extractor is the only place that enforces containment.
///
/// ## Parameters
/// - `base`: The directory to resolve against, relative to archive root
/// - `rel`: The relative reference to resolve
///
/// ## Return
/// - The normalized archive-root-relative path
pub fn resolve_href(base: &str, rel: &str) -> String {
    if rel.is_empty() {
        return base.to_string();
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(rel.split('/')) {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&"..") | None => segments.push(".."),
                Some(_) => {
                    segments.pop();
                }
            },
            _ => segments.push(segment),
        }
    }

    segments.join("/")
}

/// Provides functionality to decode byte data into strings
///
/// This trait is primarily used to decode raw byte data read from an
/// extracted archive (container descriptor, package document, navigation
/// document) into a string. It detects UTF-8 and UTF-16 byte order marks
/// and falls back to plain UTF-8 for unmarked data.
pub trait DecodeBytes {
    fn decode(&self) -> Result<String, ShelfError>;
}

impl DecodeBytes for Vec<u8> {
    fn decode(&self) -> Result<String, ShelfError> {
        if self.is_empty() {
            return Err(ShelfError::EmptyData);
        }

        if let Some(rest) = self.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
            return String::from_utf8(rest.to_vec()).map_err(ShelfError::from);
        }

        if let Some(rest) = self.strip_prefix(&[0xFE, 0xFF]) {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|b| u16::from_be_bytes([b[0], b[1]]))
                .collect();
            return String::from_utf16(&units).map_err(ShelfError::from);
        }

        if let Some(rest) = self.strip_prefix(&[0xFF, 0xFE]) {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|b| u16::from_le_bytes([b[0], b[1]]))
                .collect();
            return String::from_utf16(&units).map_err(ShelfError::from);
        }

        String::from_utf8(self.to_vec()).map_err(ShelfError::from)
    }
}

/// Represents an element node in an XML document
#[derive(Debug)]
pub struct XmlElement {
    /// The local name of the element (excluding namespace prefix)
    pub name: String,

    /// The attributes of the element
    ///
    /// The key is the attribute name as authored, the value is the
    /// attribute value.
    pub attributes: HashMap<String, String>,

    /// The direct text content of the element
    pub text: Option<String>,

    /// The children of the element
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn new(name: String) -> Self {
        Self {
            name,
            attributes: HashMap::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Returns the value of the specified attribute
    pub fn get_attr(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }

    /// Gets the text content of the element and all its child elements
    ///
    /// Collects the text content of the current element and the text
    /// content of all its child elements, removing leading and trailing
    /// whitespace.
    pub fn text(&self) -> String {
        let mut result = String::new();

        if let Some(text_value) = &self.text {
            result.push_str(text_value);
        }

        for child in &self.children {
            result.push_str(&child.text());
        }

        result.trim().to_string()
    }

    /// Find the first element with the specified local name, depth-first
    ///
    /// The search includes the element itself.
    pub fn find_first(&self, name: &str) -> Option<&XmlElement> {
        if self.name == name {
            return Some(self);
        }

        self.children.iter().find_map(|child| child.find_first(name))
    }

    /// Find all direct children with the specified local name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |child| child.name == name)
    }
}

/// XML parser used to parse XML content and build an XML element tree
///
/// Element names are reduced to their local part, so `dc:title` and
/// `title` compare equal; namespace declarations are dropped. This is
/// all the container and package parsers need.
pub struct XmlReader {}

impl XmlReader {
    /// Parses an XML string and builds the root element
    ///
    /// ## Parameters
    /// - `content`: The XML string to be parsed
    ///
    /// ## Return
    /// - `Ok(XmlElement)`: The root element of the XML element tree
    /// - `Err(ShelfError)`: An error occurred during parsing
    pub fn parse(content: &str) -> Result<XmlElement, ShelfError> {
        if content.is_empty() {
            return Err(ShelfError::EmptyData);
        }

        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut stack = Vec::<XmlElement>::new();
        let mut root = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Eof) => break,

                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                    let mut element = XmlElement::new(name);
                    Self::collect_attributes(&e, &mut element);
                    stack.push(element);
                }

                Ok(Event::End(_)) => {
                    if let Some(element) = stack.pop() {
                        // An empty stack means the closed element is the root
                        if stack.is_empty() {
                            root = Some(element);
                        } else if let Some(parent) = stack.last_mut() {
                            parent.children.push(element);
                        }
                    }
                }

                Ok(Event::Empty(e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                    let mut element = XmlElement::new(name);
                    Self::collect_attributes(&e, &mut element);

                    // A self-closing element cannot be the document root
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(element);
                    }
                }

                Ok(Event::Text(e)) => {
                    if let Some(element) = stack.last_mut() {
                        let text = String::from_utf8_lossy(e.as_ref()).to_string();
                        if !text.trim().is_empty() {
                            element.text = Some(text);
                        }
                    }
                }

                Err(err) => return Err(err.into()),

                // Comments, processing instructions, declarations,
                // doctypes and CDATA carry nothing we index
                _ => continue,
            }
        }

        root.ok_or(ShelfError::FailedParsingXml)
    }

    fn collect_attributes(e: &quick_xml::events::BytesStart<'_>, element: &mut XmlElement) {
        for attr in e.attributes().flatten() {
            let attr_key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            if attr_key == "xmlns" || attr_key.starts_with("xmlns:") {
                continue;
            }

            let attr_value = String::from_utf8_lossy(&attr.value).to_string();
            element.attributes.insert(attr_key, attr_value);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::ShelfError,
        utils::{DecodeBytes, XmlReader, resolve_href},
    };

    /// Plain joins against the package directory
    #[test]
    fn test_resolve_href_plain() {
        assert_eq!(resolve_href("OEBPS", "chap1.xhtml"), "OEBPS/chap1.xhtml");
        assert_eq!(resolve_href("", "chap1.xhtml"), "chap1.xhtml");
        assert_eq!(resolve_href("a/b", "c.xhtml"), "a/b/c.xhtml");
    }

    /// `.` and `..` segments are collapsed
    #[test]
    fn test_resolve_href_normalizes_segments() {
        assert_eq!(resolve_href("OEBPS", "./chap1.xhtml"), "OEBPS/chap1.xhtml");
        assert_eq!(resolve_href("OEBPS", "../style.css"), "style.css");
        assert_eq!(resolve_href("a/b/c", "../../d.xhtml"), "a/d.xhtml");
    }

    /// An empty reference resolves to the base directory unchanged
    #[test]
    fn test_resolve_href_empty_reference() {
        assert_eq!(resolve_href("OEBPS", ""), "OEBPS");
        assert_eq!(resolve_href("", ""), "");
    }

    /// Climbing above the root keeps the leading `..` segments
    #[test]
    fn test_resolve_href_above_root() {
        assert_eq!(resolve_href("OEBPS", "../../x.css"), "../x.css");
        assert_eq!(resolve_href("", "../x.css"), "../x.css");
    }

    /// Test with empty data
    #[test]
    fn test_decode_empty_data() {
        let data = vec![];
        let result = data.decode();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err(), ShelfError::EmptyData);
    }

    /// Testing text decoding with UTF-8 BOM
    #[test]
    fn test_decode_utf8_with_bom() {
        let data: Vec<u8> = vec![0xEF, 0xBB, 0xBF, b'H', b'e', b'l', b'l', b'o'];
        assert_eq!(data.decode().unwrap(), "Hello");
    }

    /// Test text decoding with UTF-16 BE BOM
    #[test]
    fn test_decode_utf16_be_with_bom() {
        let data = vec![
            0xFE, 0xFF, // BOM
            0x00, b'H', 0x00, b'i',
        ];
        assert_eq!(data.decode().unwrap(), "Hi");
    }

    /// Testing text decoding with UTF-16 LE BOM
    #[test]
    fn test_decode_utf16_le_with_bom() {
        let data = vec![
            0xFF, 0xFE, // BOM
            b'H', 0x00, b'i', 0x00,
        ];
        assert_eq!(data.decode().unwrap(), "Hi");
    }

    /// Testing ordinary UTF-8 text (without BOM)
    #[test]
    fn test_decode_plain_utf8() {
        let data = b"Hello, World!".to_vec();
        assert_eq!(data.decode().unwrap(), "Hello, World!");
    }

    /// Local names drop their namespace prefix
    #[test]
    fn test_xml_reader_local_names() {
        let content = r#"<?xml version="1.0"?>
            <package xmlns:dc="http://purl.org/dc/elements/1.1/" version="3.0">
                <metadata>
                    <dc:title> The Title </dc:title>
                    <dc:creator>An Author</dc:creator>
                </metadata>
            </package>"#;

        let root = XmlReader::parse(content).unwrap();
        assert_eq!(root.name, "package");
        assert_eq!(root.get_attr("version"), Some("3.0".to_string()));

        let title = root.find_first("title").unwrap();
        assert_eq!(title.text(), "The Title");
        assert_eq!(root.find_first("creator").unwrap().text(), "An Author");
        assert!(root.find_first("language").is_none());
    }

    /// Self-closing elements land as children with their attributes
    #[test]
    fn test_xml_reader_self_closing_elements() {
        let content = r#"<manifest>
                <item id="c1" href="chap1.xhtml" media-type="application/xhtml+xml"/>
                <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml"/>
            </manifest>"#;

        let root = XmlReader::parse(content).unwrap();
        let items: Vec<_> = root.children_named("item").collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].get_attr("id"), Some("c1".to_string()));
        assert_eq!(items[1].get_attr("href"), Some("nav.xhtml".to_string()));
    }

    /// Broken XML surfaces as a parse error, not a panic
    #[test]
    fn test_xml_reader_malformed_input() {
        assert!(XmlReader::parse("<package><metadata></package>").is_err());
        assert!(XmlReader::parse("no xml here").is_err());
    }
}
