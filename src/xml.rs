//! Thin namespace-resolving DOM over the quick-xml event reader.
//!
//! The rest of the crate works on [`XmlElement`] trees instead of raw
//! events, so prefix handling and entity decoding happen in exactly one
//! place.

use crate::{Error, Result};
use compact_str::CompactString;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct XmlDocument {
    pub root: XmlElement,
}

#[derive(Debug, Clone)]
pub struct XmlElement {
    pub prefix: Option<CompactString>,
    pub local_name: CompactString,
    /// Resolved namespace URI of this element, if any is in scope.
    pub namespace: Option<CompactString>,
    pub attributes: Vec<XmlAttr>,
    /// `xmlns` declarations carried on this element (prefix may be empty
    /// for the default namespace).
    pub namespace_decls: Vec<(CompactString, CompactString)>,
    pub children: Vec<XmlElement>,
    text: String,
}

#[derive(Debug, Clone)]
pub struct XmlAttr {
    pub prefix: Option<CompactString>,
    pub local_name: CompactString,
    /// Resolved namespace URI; unprefixed attributes have none.
    pub namespace: Option<CompactString>,
    pub value: String,
}

impl XmlDocument {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::parse(&data)
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        // Skip BOM if present
        let data = if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
            &data[3..]
        } else {
            data
        };

        let mut reader = Reader::from_reader(data);
        reader.trim_text(true);

        let mut buf = Vec::new();
        // Each frame holds the xmlns bindings declared on one open element.
        let mut scopes: Vec<Vec<(CompactString, CompactString)>> = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    let element = read_element(e, &mut scopes, false)?;
                    stack.push(element);
                }
                Ok(Event::Empty(ref e)) => {
                    let element = read_element(e, &mut scopes, true)?;
                    attach(element, &mut stack, &mut root);
                }
                Ok(Event::End(_)) => {
                    scopes.pop();
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::XmlParse("unbalanced closing tag".into()))?;
                    attach(element, &mut stack, &mut root);
                }
                Ok(Event::Text(ref t)) => {
                    if let Some(top) = stack.last_mut() {
                        let text = t
                            .unescape()
                            .map_err(|e| Error::XmlParse(e.to_string()))?;
                        top.text.push_str(&text);
                    }
                }
                Ok(Event::CData(ref t)) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(t));
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(Error::XmlParse(e.to_string())),
            }
            buf.clear();
        }

        root.map(|root| XmlDocument { root })
            .ok_or_else(|| Error::XmlParse("document has no root element".into()))
    }
}

fn attach(element: XmlElement, stack: &mut Vec<XmlElement>, root: &mut Option<XmlElement>) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    }
}

impl XmlElement {
    /// Value of an unprefixed attribute.
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.prefix.is_none() && a.local_name == local)
            .map(|a| a.value.as_str())
    }

    /// Value of an attribute in a specific namespace.
    pub fn attr_ns(&self, namespace: &str, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.as_deref() == Some(namespace) && a.local_name == local)
            .map(|a| a.value.as_str())
    }

    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.local_name == local
    }

    pub fn child(&self, namespace: &str, local: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.is(namespace, local))
    }

    pub fn children_named<'a>(
        &'a self,
        namespace: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.is(namespace, local))
    }

    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn qname(&self) -> CompactString {
        match &self.prefix {
            Some(p) => CompactString::from(format!("{}:{}", p, self.local_name)),
            None => self.local_name.clone(),
        }
    }

    /// Serializes this element (and its subtree) back to markup. Used for
    /// typed dimension member payloads that are kept verbatim.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.qname());
        for (prefix, uri) in &self.namespace_decls {
            if prefix.is_empty() {
                out.push_str(&format!(" xmlns=\"{}\"", escape_attr(uri)));
            } else {
                out.push_str(&format!(" xmlns:{}=\"{}\"", prefix, escape_attr(uri)));
            }
        }
        for attr in &self.attributes {
            let name = match &attr.prefix {
                Some(p) => format!("{}:{}", p, attr.local_name),
                None => attr.local_name.to_string(),
            };
            out.push_str(&format!(" {}=\"{}\"", name, escape_attr(&attr.value)));
        }
        if self.children.is_empty() && self.text.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        out.push_str(&escape_text(self.text.trim()));
        for child in &self.children {
            child.write_into(out);
        }
        out.push_str(&format!("</{}>", self.qname()));
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}

fn escape_text(value: &str) -> String {
    value.replace('&', "&amp;").replace('<', "&lt;")
}

fn split_qname(qname: &[u8]) -> Result<(Option<CompactString>, CompactString)> {
    let qname = std::str::from_utf8(qname)
        .map_err(|_| Error::XmlParse("invalid UTF-8 in name".into()))?;
    match qname.split_once(':') {
        Some((prefix, local)) => Ok((Some(CompactString::from(prefix)), CompactString::from(local))),
        None => Ok((None, CompactString::from(qname))),
    }
}

fn resolve(
    scopes: &[Vec<(CompactString, CompactString)>],
    prefix: &str,
) -> Option<CompactString> {
    for frame in scopes.iter().rev() {
        if let Some((_, uri)) = frame.iter().rev().find(|(p, _)| p == prefix) {
            return Some(uri.clone());
        }
    }
    match prefix {
        "xml" => Some(CompactString::from(crate::constants::XML_NS)),
        _ => None,
    }
}

fn read_element(
    e: &quick_xml::events::BytesStart<'_>,
    scopes: &mut Vec<Vec<(CompactString, CompactString)>>,
    empty: bool,
) -> Result<XmlElement> {
    let (prefix, local_name) = split_qname(e.name().as_ref())?;

    // First pass over the attributes: xmlns declarations open the scope the
    // element itself is resolved against.
    let mut decls: Vec<(CompactString, CompactString)> = Vec::new();
    let mut raw_attrs: Vec<(Option<CompactString>, CompactString, String)> = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| Error::XmlParse(e.to_string()))?;
        let (attr_prefix, attr_local) = split_qname(attr.key.as_ref())?;
        let value = attr
            .unescape_value()
            .map_err(|e| Error::XmlParse(e.to_string()))?
            .into_owned();
        match (&attr_prefix, attr_local.as_str()) {
            (None, "xmlns") => decls.push((CompactString::const_new(""), value.into())),
            (Some(p), _) if p == "xmlns" => decls.push((attr_local.clone(), value.into())),
            _ => raw_attrs.push((attr_prefix, attr_local, value)),
        }
    }
    scopes.push(decls.clone());

    let namespace = match &prefix {
        Some(p) => resolve(scopes, p),
        None => resolve(scopes, ""),
    };
    let attributes = raw_attrs
        .into_iter()
        .map(|(prefix, local_name, value)| {
            let namespace = prefix.as_deref().and_then(|p| resolve(scopes, p));
            XmlAttr {
                prefix,
                local_name,
                namespace,
                value,
            }
        })
        .collect();

    if empty {
        scopes.pop();
    }

    Ok(XmlElement {
        prefix,
        local_name,
        namespace,
        attributes,
        namespace_decls: decls,
        children: Vec::new(),
        text: String::new(),
    })
}
