//! Minimal XML-to-tree parsing with namespace stripping.
//!
//! Both legacy inputs (the hierarchy document and each record fragment) are
//! small enough to hold as a navigable tree once isolated; the streaming
//! concern lives in [`crate::stream`], not here.

use anyhow::{bail, Context, Result};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use rustc_hash::FxHashMap;
use std::fs;
use std::path::Path;

/// One element of a parsed document: name, attributes, children, and the
/// concatenated trimmed text content. Element and attribute names have any
/// namespace prefix stripped.
#[derive(Debug, Clone, Default)]
pub struct XmlNode {
    pub name: String,
    pub attrs: FxHashMap<String, String>,
    pub children: Vec<XmlNode>,
    pub text: String,
}

impl XmlNode {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of a named child; `None` when the child is absent or
    /// holds only whitespace.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
    }

    /// Boolean-ish field: present iff the child is, true iff its text is
    /// "true" (case-insensitive).
    pub fn child_flag(&self, name: &str) -> Option<bool> {
        self.child_text(name)
            .map(|t| t.eq_ignore_ascii_case("true"))
    }
}

/// Strips a namespace prefix from an element or attribute name.
fn local_name(raw: &[u8]) -> String {
    let raw = match raw.iter().rposition(|&b| b == b':') {
        Some(pos) => &raw[pos + 1..],
        None => raw,
    };
    String::from_utf8_lossy(raw).into_owned()
}

fn is_xmlns(key: &[u8]) -> bool {
    key == b"xmlns" || key.starts_with(b"xmlns:")
}

fn node_from_start(e: &quick_xml::events::BytesStart<'_>) -> Result<XmlNode> {
    let mut node = XmlNode {
        name: local_name(e.name().as_ref()),
        ..Default::default()
    };
    for attr in e.attributes() {
        let attr = attr.context("Malformed attribute")?;
        if is_xmlns(attr.key.as_ref()) {
            continue;
        }
        let value = attr.unescape_value().context("Malformed attribute value")?;
        node.attrs
            .insert(local_name(attr.key.as_ref()), value.into_owned());
    }
    Ok(node)
}

/// Parses one well-formed document (or fragment) into its root node.
pub fn parse_fragment(xml: &str) -> Result<XmlNode> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                stack.push(node_from_start(&e)?);
            }
            Event::Empty(e) => {
                let node = node_from_start(&e)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => return Ok(node),
                }
            }
            Event::End(_) => {
                let node = stack.pop().context("Unbalanced closing tag")?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => return Ok(node),
                }
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    let text = t.unescape().context("Malformed text content")?;
                    push_text(top, &text);
                }
            }
            Event::CData(t) => {
                if let Some(top) = stack.last_mut() {
                    let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                    push_text(top, &text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    bail!("No root element found in fragment");
}

fn push_text(node: &mut XmlNode, text: &str) {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return;
    }
    if !node.text.is_empty() {
        node.text.push(' ');
    }
    node.text.push_str(trimmed);
}

/// Parses a whole document from disk. The hierarchy document is small, so
/// it is read eagerly; the record stream never goes through this path.
pub fn parse_file(path: &str) -> Result<XmlNode> {
    let xml = fs::read_to_string(Path::new(path))
        .with_context(|| format!("Failed to read XML document: {}", path))?;
    parse_fragment(&xml).with_context(|| format!("Failed to parse XML document: {}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements() {
        let root = parse_fragment("<a><b x=\"1\"><c>hi</c></b></a>").unwrap();
        assert_eq!(root.name, "a");
        let b = root.child("b").unwrap();
        assert_eq!(b.attr("x"), Some("1"));
        assert_eq!(b.child_text("c"), Some("hi"));
    }

    #[test]
    fn strips_namespaces() {
        let root =
            parse_fragment("<ns:a xmlns:ns=\"urn:x\" ns:id=\"7\"><ns:b>v</ns:b></ns:a>").unwrap();
        assert_eq!(root.name, "a");
        assert_eq!(root.attr("id"), Some("7"));
        assert_eq!(root.child_text("b"), Some("v"));
        assert!(root.attrs.get("xmlns").is_none());
    }

    #[test]
    fn self_closing_root() {
        let root = parse_fragment("<a id=\"x\"/>").unwrap();
        assert_eq!(root.name, "a");
        assert_eq!(root.attr("id"), Some("x"));
        assert!(root.children.is_empty());
    }

    #[test]
    fn whitespace_only_text_is_missing() {
        let root = parse_fragment("<a><b>  </b></a>").unwrap();
        assert_eq!(root.child_text("b"), None);
    }

    #[test]
    fn child_flag_parses_booleans() {
        let root = parse_fragment("<a><t>TRUE</t><f>no</f></a>").unwrap();
        assert_eq!(root.child_flag("t"), Some(true));
        assert_eq!(root.child_flag("f"), Some(false));
        assert_eq!(root.child_flag("missing"), None);
    }

    #[test]
    fn entities_unescaped() {
        let root = parse_fragment("<a>Fish &amp; Chips</a>").unwrap();
        assert_eq!(root.text, "Fish & Chips");
    }

    #[test]
    fn multiple_children_same_name() {
        let root = parse_fragment("<a><b i=\"0\"/><b i=\"1\"/></a>").unwrap();
        let ids: Vec<_> = root
            .children_named("b")
            .map(|c| c.attr("i").unwrap())
            .collect();
        assert_eq!(ids, vec!["0", "1"]);
    }

    #[test]
    fn unbalanced_fragment_is_error() {
        assert!(parse_fragment("<a><b></a>").is_err());
    }
}
