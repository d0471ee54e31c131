//! Minimal EXIF reader for JPEG files.
//!
//! Reads four IFD0 fields:
//! - ImageDescription (0x010E): description
//! - DocumentName (0x010D): title
//! - XPTitle (0x9C9B): Windows title, UTF-16LE
//! - XPKeywords (0x9C9E): Windows keywords, UTF-16LE, `;` separated
//!
//! The EXIF block lives in an APP1 segment starting with `Exif\0\0`,
//! followed by a TIFF header and IFD chain. Only IFD0 is walked.

const EXIF_HEADER: &[u8] = b"Exif\0\0";

const TAG_DOCUMENT_NAME: u16 = 0x010D;
const TAG_IMAGE_DESCRIPTION: u16 = 0x010E;
const TAG_XP_TITLE: u16 = 0x9C9B;
const TAG_XP_KEYWORDS: u16 = 0x9C9E;

const TYPE_BYTE: u16 = 1;
const TYPE_ASCII: u16 = 2;
const TYPE_UNDEFINED: u16 = 7;

/// Fields read from IFD0. Absent or blank values are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExifFields {
    pub image_description: Option<String>,
    pub document_name: Option<String>,
    pub xp_title: Option<String>,
    pub keywords: Option<String>,
}

impl ExifFields {
    /// Keyword field split on `,` or `;`.
    pub fn keyword_list(&self) -> Vec<String> {
        self.keywords
            .as_deref()
            .map(|kw| {
                kw.split([',', ';'])
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn is_empty(&self) -> bool {
        *self == ExifFields::default()
    }
}

/// Parse EXIF fields out of raw JPEG bytes.
pub fn read_exif_from_jpeg(data: &[u8]) -> Option<ExifFields> {
    let tiff = find_exif_segment(data)?;
    let fields = parse_ifd0(tiff)?;
    (!fields.is_empty()).then_some(fields)
}

/// Walk JPEG markers up to start-of-scan looking for the EXIF APP1 segment.
fn find_exif_segment(data: &[u8]) -> Option<&[u8]> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        // Fill bytes
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        if marker == 0xDA || marker == 0xD9 {
            return None;
        }

        let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if len < 2 {
            return None;
        }
        let start = pos + 4;
        let end = (pos + 2 + len).min(data.len());
        let segment = data.get(start..end)?;

        if marker == 0xE1 && segment.starts_with(EXIF_HEADER) {
            return Some(&segment[EXIF_HEADER.len()..]);
        }
        pos += 2 + len;
    }
    None
}

#[derive(Clone, Copy)]
enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    fn u16(self, bytes: &[u8], at: usize) -> Option<u16> {
        let b = bytes.get(at..at + 2)?;
        Some(match self {
            ByteOrder::Little => u16::from_le_bytes([b[0], b[1]]),
            ByteOrder::Big => u16::from_be_bytes([b[0], b[1]]),
        })
    }

    fn u32(self, bytes: &[u8], at: usize) -> Option<u32> {
        let b = bytes.get(at..at + 4)?;
        Some(match self {
            ByteOrder::Little => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            ByteOrder::Big => u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
        })
    }
}

/// IFD entry layout (12 bytes):
///   0-1: tag, 2-3: type, 4-7: count, 8-11: value or offset
fn parse_ifd0(tiff: &[u8]) -> Option<ExifFields> {
    let order = match tiff.get(0..2)? {
        b"II" => ByteOrder::Little,
        b"MM" => ByteOrder::Big,
        _ => return None,
    };
    if order.u16(tiff, 2)? != 42 {
        return None;
    }

    let ifd = order.u32(tiff, 4)? as usize;
    let count = order.u16(tiff, ifd)? as usize;
    let mut fields = ExifFields::default();

    for i in 0..count {
        let entry = ifd + 2 + i * 12;
        // A truncated IFD keeps whatever was read before the cut
        let (Some(tag), Some(kind), Some(len)) = (
            order.u16(tiff, entry),
            order.u16(tiff, entry + 2),
            order.u32(tiff, entry + 4),
        ) else {
            break;
        };
        let len = len as usize;

        let wanted = matches!(
            tag,
            TAG_DOCUMENT_NAME | TAG_IMAGE_DESCRIPTION | TAG_XP_TITLE | TAG_XP_KEYWORDS
        );
        if !wanted || !matches!(kind, TYPE_ASCII | TYPE_BYTE | TYPE_UNDEFINED) {
            continue;
        }

        let raw = if len <= 4 {
            tiff.get(entry + 8..entry + 8 + len)
        } else {
            order.u32(tiff, entry + 8).and_then(|offset| {
                let offset = offset as usize;
                tiff.get(offset..offset.checked_add(len)?)
            })
        };
        let Some(raw) = raw else {
            continue;
        };

        match tag {
            TAG_IMAGE_DESCRIPTION => fields.image_description = decode_ascii(raw),
            TAG_DOCUMENT_NAME => fields.document_name = decode_ascii(raw),
            TAG_XP_TITLE => fields.xp_title = decode_utf16le(raw),
            TAG_XP_KEYWORDS => fields.keywords = decode_utf16le(raw),
            _ => {}
        }
    }

    Some(fields)
}

fn decode_ascii(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    non_blank(text.trim_end_matches('\0'))
}

fn decode_utf16le(raw: &[u8]) -> Option<String> {
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    let text = String::from_utf16_lossy(&units);
    non_blank(text.trim_end_matches('\0'))
}

fn non_blank(text: &str) -> Option<String> {
    (!text.trim().is_empty()).then(|| text.to_string())
}
