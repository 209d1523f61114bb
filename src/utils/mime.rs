//! MIME utilities shared across modules

use crate::core::models::MediaKind;

/// Whitelisted image MIME types accepted by the model
pub const ALLOWED_IMAGE_MIME: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Returns lowercase, parameter-stripped, canonical mime (`image/jpg` ⇒ `image/jpeg`).
#[must_use]
pub fn canonicalize_mime(mime: &str) -> String {
    let main = mime
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match main.as_str() {
        "image/jpg" => "image/jpeg".to_string(),
        "audio/mp3" => "audio/mpeg".to_string(),
        other => other.to_string(),
    }
}

/// Returns whether a given MIME type is supported for image inputs.
#[must_use]
pub fn is_supported_image_mime(mime: &str) -> bool {
    let canon = canonicalize_mime(mime);
    ALLOWED_IMAGE_MIME.contains(&canon.as_str())
}

/// Sniffs well-known signatures; falls back to the per-kind default.
#[must_use]
pub fn detect_mime(data: &[u8], kind: MediaKind) -> &'static str {
    if data.len() < 12 {
        return default_mime(kind);
    }

    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg";
    }
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return "image/png";
    }
    if data.starts_with(b"GIF8") {
        return "image/gif";
    }
    if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return "image/webp";
    }
    if data.starts_with(b"RIFF") && &data[8..12] == b"WAVE" {
        return "audio/wav";
    }
    if &data[4..8] == b"ftyp" {
        return "video/mp4";
    }
    if data.starts_with(b"#!AMR") {
        return "audio/amr";
    }
    if data.starts_with(b"%PDF") {
        return "application/pdf";
    }

    default_mime(kind)
}

#[must_use]
pub fn default_mime(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Image => "image/jpeg",
        MediaKind::Video => "video/mp4",
        MediaKind::Audio => "audio/amr",
        MediaKind::File => "application/octet-stream",
    }
}

/// Guesses a MIME type from a file name's extension.
#[must_use]
pub fn mime_from_file_name(file_name: &str) -> Option<String> {
    mime_guess::from_path(file_name)
        .first()
        .map(|m| m.essence_str().to_string())
}
