// ABOUTME: Test helper utilities for building image fixtures and mock API responses
// ABOUTME: Provides EXIF/XMP byte builders and mockito-ready JSON bodies

use serde_json::json;

/// One IFD entry: (tag, type, count, data)
pub type IfdEntry = (u16, u16, u32, Vec<u8>);

pub fn exif_entry_ascii(tag: u16, text: &str) -> IfdEntry {
    let mut data = text.as_bytes().to_vec();
    data.push(0);
    (tag, 2, data.len() as u32, data)
}

pub fn exif_entry_utf16(tag: u16, text: &str) -> IfdEntry {
    let mut data: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
    data.extend_from_slice(&[0, 0]);
    (tag, 1, data.len() as u32, data)
}

/// Little-endian TIFF body with a single IFD0.
pub fn tiff_ifd0(entries: &[IfdEntry]) -> Vec<u8> {
    let mut out = b"II*\0".to_vec();
    out.extend_from_slice(&8u32.to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());

    let mut data_offset = 8 + 2 + entries.len() * 12 + 4;
    let mut data_area = Vec::new();

    for (tag, kind, count, data) in entries {
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&kind.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        if data.len() <= 4 {
            let mut inline = data.clone();
            inline.resize(4, 0);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&(data_offset as u32).to_le_bytes());
            data_area.extend_from_slice(data);
            data_offset += data.len();
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&data_area);
    out
}

/// A marker-only JPEG carrying optional EXIF and XMP APP1 segments.
pub fn jpeg_with_segments(tiff: Option<&[u8]>, xmp: Option<&str>) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];

    let mut push_app1 = |header: &[u8], body: &[u8]| {
        let len = (2 + header.len() + body.len()) as u16;
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(header);
        out.extend_from_slice(body);
    };

    if let Some(tiff) = tiff {
        push_app1(b"Exif\0\0", tiff);
    }
    if let Some(xmp) = xmp {
        push_app1(b"http://ns.adobe.com/xap/1.0/\0", xmp.as_bytes());
    }

    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

pub fn xmp_packet(title: Option<&str>, description: Option<&str>, subjects: &[&str]) -> String {
    let mut body = String::new();
    if let Some(title) = title {
        body.push_str(&format!(
            r#"<dc:title><rdf:Alt><rdf:li xml:lang="x-default">{title}</rdf:li></rdf:Alt></dc:title>"#
        ));
    }
    if let Some(description) = description {
        body.push_str(&format!(
            r#"<dc:description><rdf:Alt><rdf:li xml:lang="x-default">{description}</rdf:li></rdf:Alt></dc:description>"#
        ));
    }
    if !subjects.is_empty() {
        body.push_str("<dc:subject><rdf:Bag>");
        for subject in subjects {
            body.push_str(&format!("<rdf:li>{subject}</rdf:li>"));
        }
        body.push_str("</rdf:Bag></dc:subject>");
    }

    format!(
        r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"><rdf:Description xmlns:dc="http://purl.org/dc/elements/1.1/">{body}</rdf:Description></rdf:RDF></x:xmpmeta>"#
    )
}

/// Write a solid-colour PNG of the given size.
pub fn write_png(path: &std::path::Path, width: u32, height: u32) {
    image::RgbImage::from_pixel(width, height, image::Rgb([200, 120, 40]))
        .save(path)
        .unwrap();
}

pub fn smugmug_upload_response(image_uri: &str) -> serde_json::Value {
    json!({
        "stat": "ok",
        "method": "smugmug.images.upload",
        "Image": {
            "StatusImageReplaceUri": "",
            "ImageUri": image_uri,
            "AlbumImageUri": "/api/v2/album/abc123/image/xyz-0",
            "URL": "https://photos.example.com/Album/i-xyz"
        },
        "Asset": {
            "AssetComponentUri": "/api/v2/library/asset/xyz",
            "AssetUri": "/api/v2/library/asset/xyz"
        }
    })
}

pub fn smugmug_sizes_list_response() -> serde_json::Value {
    json!({
        "Response": {
            "ImageSizes": {
                "Size": [
                    { "Width": 100, "Height": 75, "Url": "https://photos.smugmug.com/Th/a.jpg" },
                    { "Width": 4000, "Height": 3000, "Url": "https://photos.smugmug.com/O/a.jpg" },
                    { "Width": "800", "Height": 600, "Url": "https://photos.smugmug.com/M/a.jpg" }
                ]
            }
        },
        "Code": 200,
        "Message": "Ok"
    })
}

pub fn smugmug_sizes_named_response() -> serde_json::Value {
    json!({
        "Response": {
            "ImageSizes": {
                "TinyImageUrl": "https://photos.smugmug.com/Ti/a.jpg",
                "LargestImageUrl": "https://photos.smugmug.com/X3/a.jpg",
                "OriginalImageUrl": "https://photos.smugmug.com/O/a.jpg"
            }
        },
        "Code": 200,
        "Message": "Ok"
    })
}

pub fn flickr_upload_response(photo_id: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\" ?>\n<rsp stat=\"ok\">\n<photoid>{photo_id}</photoid>\n</rsp>\n"
    )
}

pub fn flickr_info_response(photo_id: &str) -> serde_json::Value {
    json!({
        "photo": {
            "id": photo_id,
            "secret": "a1b2c3",
            "server": "65535",
            "farm": 66,
            "title": { "_content": "Sunset" }
        },
        "stat": "ok"
    })
}

pub fn fedi_media_response(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "type": "image",
        "url": format!("https://social.example.com/fileserver/{id}/original.jpg"),
        "preview_url": format!("https://social.example.com/fileserver/{id}/small.jpg"),
        "description": "alt"
    })
}

pub fn fedi_status_response(url: &str, media_ids: &[&str]) -> serde_json::Value {
    let attachments: Vec<_> = media_ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "type": "image",
                "url": format!("https://social.example.com/fileserver/{id}/original.jpg"),
                "preview_url": format!("https://social.example.com/fileserver/{id}/small.jpg")
            })
        })
        .collect();
    json!({
        "id": "01STATUS",
        "url": url,
        "uri": url,
        "visibility": "public",
        "media_attachments": attachments
    })
}
