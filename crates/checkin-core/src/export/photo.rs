//! Photo payloads: data-URL parsing, size/type checks, and writing a
//! record's photo out as a file.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

use crate::config::PhotoPolicy;
use crate::models::AttendanceRecord;
use crate::utils::sanitize_file_component;

use super::ExportError;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PhotoError {
    #[error("Photo is {size} bytes, limit is {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("Unsupported photo type: {0}")]
    UnsupportedType(String),

    #[error("Photo is not valid base64: {0}")]
    InvalidEncoding(String),
}

/// A photo split into its MIME type (when given as a data URL) and the
/// base64 payload.
#[derive(Debug, PartialEq, Eq)]
pub struct PhotoPayload<'a> {
    pub mime: Option<&'a str>,
    pub data: &'a str,
}

/// Accepts `data:<mime>;base64,<payload>` or a bare base64 string.
pub fn parse(photo: &str) -> PhotoPayload<'_> {
    let photo = photo.trim();
    if let Some(rest) = photo.strip_prefix("data:") {
        if let Some((header, data)) = rest.split_once(',') {
            let mime = header.split(';').next().filter(|m| !m.is_empty());
            return PhotoPayload { mime, data };
        }
    }
    PhotoPayload {
        mime: None,
        data: photo,
    }
}

/// Size of the decoded payload, computed from the base64 length.
pub fn decoded_len(data: &str) -> usize {
    let padding = data.bytes().rev().take_while(|b| *b == b'=').count();
    (data.len() * 3 / 4).saturating_sub(padding)
}

/// Check a photo against the size limit and accepted MIME types, and that
/// its payload decodes. Bare base64 carries no type, so the type check is
/// skipped for it.
pub fn validate(photo: &str, policy: &PhotoPolicy) -> Result<(), PhotoError> {
    let payload = parse(photo);
    if let Some(mime) = payload.mime {
        if !policy.supported_types.iter().any(|t| t.eq_ignore_ascii_case(mime)) {
            return Err(PhotoError::UnsupportedType(mime.to_string()));
        }
    }
    let size = decoded_len(payload.data);
    if size > policy.max_bytes {
        return Err(PhotoError::TooLarge {
            size,
            max: policy.max_bytes,
        });
    }
    STANDARD
        .decode(payload.data)
        .map_err(|e| PhotoError::InvalidEncoding(e.to_string()))?;
    Ok(())
}

pub fn decode(photo: &str) -> Result<Vec<u8>, PhotoError> {
    STANDARD
        .decode(parse(photo).data)
        .map_err(|e| PhotoError::InvalidEncoding(e.to_string()))
}

pub fn encode_data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

pub fn extension_for(mime: Option<&str>) -> &'static str {
    match mime {
        Some("image/png") => "png",
        Some("image/webp") => "webp",
        _ => "jpg",
    }
}

pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// `photo_<name>_<registration>_<date>.<ext>`, with name and registration
/// reduced to `[A-Za-z0-9_]` and the date's slashes turned into dashes.
pub fn file_name(record: &AttendanceRecord) -> String {
    let mime = record.photo.as_deref().and_then(|p| parse(p).mime);
    format!(
        "photo_{}_{}_{}.{}",
        sanitize_file_component(&record.full_name),
        sanitize_file_component(&record.registration),
        record.date.replace('/', "-"),
        extension_for(mime)
    )
}

/// Decode a record's photo and write it into `dir`.
pub fn save_photo(record: &AttendanceRecord, dir: &Path) -> Result<PathBuf, ExportError> {
    let photo = record
        .photo
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ExportError::NoPhoto(record.id.clone()))?;
    let bytes = decode(photo)?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name(record));
    std::fs::write(&path, bytes)?;
    Ok(path)
}
