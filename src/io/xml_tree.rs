//! Namespace-aware XML element tree
//!
//! Sentinel-2 metadata mixes namespace-qualified top-level elements
//! (`n1:General_Info`) with unqualified children (`SENSING_TIME`), so lookups
//! resolve prefixes through a small prefix map, the way ElementTree paths do.

use crate::types::{TileError, TileResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use std::path::{Path, PathBuf};

/// Prefix -> namespace URI pairs used to resolve lookup paths
pub type Namespaces<'a> = &'a [(&'a str, &'a str)];

#[derive(Debug, Clone, PartialEq)]
pub struct XmlAttribute {
    pub namespace: Option<String>,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub namespace: Option<String>,
    pub name: String,
    pub attributes: Vec<XmlAttribute>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn matches(&self, namespace: Option<&str>, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == namespace
    }

    /// Clark notation, `{namespace}name`
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{{{}}}{}", ns, self.name),
            None => self.name.clone(),
        }
    }

    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn child(&self, namespace: Option<&str>, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.matches(namespace, name))
    }

    pub fn attribute(&self, namespace: Option<&str>, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name && a.namespace.as_deref() == namespace)
            .map(|a| a.value.as_str())
    }

    /// First element matching a relative path such as `n1:General_Info/SENSING_TIME`
    pub fn find(&self, path: &str, namespaces: Namespaces) -> Option<&XmlElement> {
        let steps = parse_path(path, namespaces)?;
        let mut current = self;
        for (ns, name) in &steps {
            current = current.child(*ns, name)?;
        }
        Some(current)
    }

    /// All elements matching the last step of a relative path
    pub fn find_all(&self, path: &str, namespaces: Namespaces) -> Vec<&XmlElement> {
        let Some(mut steps) = parse_path(path, namespaces) else {
            return Vec::new();
        };
        let Some((last_ns, last_name)) = steps.pop() else {
            return Vec::new();
        };
        let mut current = self;
        for (ns, name) in &steps {
            match current.child(*ns, name) {
                Some(next) => current = next,
                None => return Vec::new(),
            }
        }
        current
            .children
            .iter()
            .filter(|c| c.matches(last_ns, last_name))
            .collect()
    }

    /// Depth-first search over all descendants (`.//prefix:name`)
    pub fn descendants(&self, namespace: Option<&str>, name: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        let mut stack: Vec<&XmlElement> = self.children.iter().rev().collect();
        while let Some(element) = stack.pop() {
            if element.matches(namespace, name) {
                found.push(element);
            }
            stack.extend(element.children.iter().rev());
        }
        found
    }
}

/// Resolve `prefix:name` path steps; `None` when a prefix is unknown
fn parse_path<'p>(
    path: &'p str,
    namespaces: Namespaces<'p>,
) -> Option<Vec<(Option<&'p str>, &'p str)>> {
    let path = path.strip_prefix("./").unwrap_or(path);
    let mut steps = Vec::new();
    for step in path.split('/').filter(|s| !s.is_empty() && *s != ".") {
        match step.split_once(':') {
            Some((prefix, name)) => {
                let uri = namespaces
                    .iter()
                    .find(|(p, _)| *p == prefix)
                    .map(|(_, uri)| *uri);
                match uri {
                    Some(uri) => steps.push((Some(uri), name)),
                    None => {
                        log::debug!("Unknown namespace prefix '{}' in path '{}'", prefix, path);
                        return None;
                    }
                }
            }
            None => steps.push((None, step)),
        }
    }
    Some(steps)
}

/// Parsed XML document with the path it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub path: PathBuf,
    pub root: XmlElement,
}

impl XmlDocument {
    pub fn parse_str(path: impl AsRef<Path>, content: &str) -> TileResult<Self> {
        Self::parse_bytes(path, content.as_bytes())
    }

    /// Parse raw file content, decoding it with the encoding the XML declaration names
    pub fn parse_bytes(path: impl AsRef<Path>, content: &[u8]) -> TileResult<Self> {
        let root = parse_element_tree(content)?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            root,
        })
    }

    pub fn find(&self, path: &str, namespaces: Namespaces) -> Option<&XmlElement> {
        self.root.find(path, namespaces)
    }
}

fn resolved_namespace(result: ResolveResult) -> TileResult<Option<String>> {
    match result {
        ResolveResult::Bound(Namespace(ns)) => Ok(Some(String::from_utf8_lossy(ns).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(TileError::XmlParsing(format!(
            "Undeclared namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn open_element(
    reader: &NsReader<&[u8]>,
    namespace: Option<String>,
    start: &BytesStart,
) -> TileResult<XmlElement> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();

    for attr in start.attributes() {
        let attr = attr.map_err(|e| TileError::XmlParsing(format!("Bad attribute in <{}>: {}", name, e)))?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let (attr_ns, local) = reader.resolve_attribute(attr.key);
        let value = attr
            .decode_and_unescape_value(&**reader)
            .map_err(|e| TileError::XmlParsing(format!("Bad attribute value in <{}>: {}", name, e)))?;
        attributes.push(XmlAttribute {
            namespace: resolved_namespace(attr_ns)?,
            name: String::from_utf8_lossy(local.as_ref()).into_owned(),
            value: value.into_owned(),
        });
    }

    Ok(XmlElement {
        namespace,
        name,
        attributes,
        text: String::new(),
        children: Vec::new(),
    })
}

/// Build an owned element tree from XML content
pub fn parse_element_tree(content: &[u8]) -> TileResult<XmlElement> {
    let mut reader = NsReader::from_reader(content);
    reader.trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let (namespace, event) = reader
            .read_resolved_event()
            .map_err(|e| TileError::XmlParsing(e.to_string()))?;
        // Owned copy releases the reader for attribute resolution
        let namespace = resolved_namespace(namespace)?;

        match event {
            Event::Start(start) => {
                let element = open_element(&reader, namespace, &start)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = open_element(&reader, namespace, &start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| TileError::XmlParsing("Unexpected closing tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let value = text
                        .unescape()
                        .map_err(|e| TileError::XmlParsing(format!("Bad text content: {}", e)))?;
                    current.text.push_str(&value);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    let value = reader
                        .decoder()
                        .decode(&data)
                        .map_err(|e| TileError::XmlParsing(format!("Bad CDATA content: {}", e)))?;
                    current.text.push_str(&value);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(TileError::XmlParsing(format!(
            "Unexpected end of document inside <{}>",
            stack.last().map(|e| e.name.as_str()).unwrap_or("?")
        )));
    }

    root.ok_or_else(|| TileError::XmlParsing("Document has no root element".to_string()))
}

fn attach(
    stack: &mut Vec<XmlElement>,
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> TileResult<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_some() {
                return Err(TileError::XmlParsing(format!(
                    "Multiple root elements (second is <{}>)",
                    element.name
                )));
            }
            *root = Some(element);
        }
    }
    Ok(())
}
