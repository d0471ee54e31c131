//! XMP packet reader.
//!
//! XMP is RDF/XML embedded anywhere in the file (APP1 for JPEG, iTXt for PNG,
//! a chunk for WebP). Rather than understanding each container, the raw bytes
//! are scanned for the `<x:xmpmeta` (or bare `<rdf:RDF`) block and the Dublin
//! Core fields are pulled out of it:
//!
//! - `dc:title`: `rdf:Alt` language alternatives, a plain value or attribute
//! - `dc:description`: same shapes as title
//! - `dc:subject`: `rdf:Bag` of keywords

use regex::Regex;
use std::sync::LazyLock;

const PACKET_MARKERS: &[(&str, &str)] = &[("<x:xmpmeta", "</x:xmpmeta>"), ("<rdf:RDF", "</rdf:RDF>")];

static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<rdf:li\b[^>]*>(.*?)</rdf:li>").expect("valid rdf:li regex")
});

static TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// How a Dublin Core property was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmpValue {
    /// Attribute or element with plain text content
    Text(String),
    /// `rdf:Alt`, `rdf:Seq` or `rdf:Bag` items in document order
    List(Vec<String>),
    /// Nested markup without list items, flattened to its text
    Structured(String),
}

impl XmpValue {
    /// The first usable string: plain text, the first list item, or the
    /// flattened structure.
    pub fn first(&self) -> Option<&str> {
        match self {
            XmpValue::Text(s) | XmpValue::Structured(s) => Some(s.as_str()),
            XmpValue::List(items) => items.first().map(String::as_str),
        }
    }

    pub fn into_list(self) -> Vec<String> {
        match self {
            XmpValue::Text(s) | XmpValue::Structured(s) => vec![s],
            XmpValue::List(items) => items,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmpFields {
    pub title: Option<XmpValue>,
    pub description: Option<XmpValue>,
    pub subject: Vec<String>,
}

/// Locate and parse the XMP packet in a file's raw bytes.
pub fn read_xmp(data: &[u8]) -> Option<XmpFields> {
    let packet = find_packet(data)?;
    let fields = XmpFields {
        title: property(&packet, "dc:title"),
        description: property(&packet, "dc:description"),
        subject: property(&packet, "dc:subject")
            .map(XmpValue::into_list)
            .unwrap_or_default(),
    };
    (fields != XmpFields::default()).then_some(fields)
}

fn find_packet(data: &[u8]) -> Option<String> {
    PACKET_MARKERS.iter().find_map(|(open, close)| {
        let start = find(data, open.as_bytes())?;
        let end = find(&data[start..], close.as_bytes())
            .map(|rel| start + rel + close.len())?;
        Some(String::from_utf8_lossy(&data[start..end]).into_owned())
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn property(packet: &str, name: &str) -> Option<XmpValue> {
    let element = Regex::new(&format!(
        r"(?s)<{name}\b[^>]*?(?:/>|>(.*?)</{name}>)",
        name = regex::escape(name)
    ))
    .ok()?;

    if let Some(inner) = element
        .captures(packet)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
    {
        let items: Vec<String> = LIST_ITEM
            .captures_iter(inner)
            .filter_map(|caps| caps.get(1))
            .filter_map(|m| clean(m.as_str()))
            .collect();
        if !items.is_empty() {
            return Some(XmpValue::List(items));
        }
        if !inner.contains('<') {
            return clean(inner).map(XmpValue::Text);
        }
        return clean(&TAGS.replace_all(inner, " ")).map(XmpValue::Structured);
    }

    let attribute = Regex::new(&format!(r#"\b{}\s*=\s*"([^"]*)""#, regex::escape(name))).ok()?;
    attribute
        .captures(packet)
        .and_then(|caps| caps.get(1))
        .and_then(|m| clean(m.as_str()))
        .map(XmpValue::Text)
}

fn clean(raw: &str) -> Option<String> {
    let text = unescape(raw);
    let text = WHITESPACE.replace_all(text.trim(), " ");
    (!text.is_empty()).then(|| text.into_owned())
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';') else {
            break;
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
