//! Content sniffing by magic bytes
//!
//! The client-declared name and MIME type are not trusted; the stored type is
//! whatever the leading bytes say the file is.

const MAGIC_BYTES: &[(&[u8], &str)] = &[
    (&[0xFF, 0xD8, 0xFF], "image/jpeg"),
    (&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A], "image/png"),
    (b"%PDF-", "application/pdf"),
    // OLE2 compound document (legacy Word)
    (
        &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1],
        "application/msword",
    ),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"MZ", "application/x-msdownload"),
    (&[0x7F, b'E', b'L', b'F'], "application/x-executable"),
];

const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";
/// Fixed part of a zip local file header; the entry name follows it
const ZIP_HEADER_LEN: usize = 30;
const ZIP_NAME_LEN_OFFSET: usize = 26;
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Detect a MIME type from file content
#[must_use]
pub fn detect_mime(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(ZIP_SIGNATURE) {
        // Office Open XML word documents carry entries under word/
        return Some(if zip_entry_names(data).any(|name| name.starts_with(b"word/")) {
            DOCX_MIME
        } else {
            "application/zip"
        });
    }

    MAGIC_BYTES
        .iter()
        .find(|(magic, _)| data.starts_with(magic))
        .map(|(_, mime)| *mime)
}

/// MIME type a file with this extension is expected to carry
#[must_use]
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "pdf" => Some("application/pdf"),
        "doc" => Some("application/msword"),
        "docx" => Some(DOCX_MIME),
        "gif" => Some("image/gif"),
        "zip" => Some("application/zip"),
        _ => None,
    }
}

/// Entry names read from every local file header in the archive
fn zip_entry_names(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    data.windows(ZIP_SIGNATURE.len())
        .enumerate()
        .filter(|(_, window)| *window == ZIP_SIGNATURE)
        .filter_map(move |(start, _)| {
            let len_at = start + ZIP_NAME_LEN_OFFSET;
            let name_len = u16::from_le_bytes([*data.get(len_at)?, *data.get(len_at + 1)?]);
            let name_start = start + ZIP_HEADER_LEN;
            data.get(name_start..name_start + usize::from(name_len))
        })
}
