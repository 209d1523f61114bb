//! Chat message and content types shared by the adapter, buffer and prompt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::mime;

/// A normalized inbound chat message, as handed over by the chat adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub sender: String,
    pub group_key: String,
    pub content: Content,
}

/// Which kind of media a [`Media`] payload carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    File,
}

/// Raw media bytes plus what is known about them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl Media {
    /// Builds a media payload, filling in the MIME type from the file name or
    /// the leading bytes when the adapter did not provide one.
    #[must_use]
    pub fn new(kind: MediaKind, data: Vec<u8>, mime_type: &str, file_name: Option<String>) -> Self {
        let mime_type = if mime_type.trim().is_empty() {
            file_name
                .as_deref()
                .and_then(mime::mime_from_file_name)
                .unwrap_or_else(|| mime::detect_mime(&data, kind).to_string())
        } else {
            mime_type.trim().to_string()
        };

        Self {
            data,
            mime_type,
            file_name,
        }
    }
}

/// Message payload: plain text or one piece of media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text { text: String },
    Image(Media),
    Video(Media),
    Audio(Media),
    File(Media),
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text { text: text.into() }
    }

    #[must_use]
    pub fn media(kind: MediaKind, media: Media) -> Self {
        match kind {
            MediaKind::Image => Content::Image(media),
            MediaKind::Video => Content::Video(media),
            MediaKind::Audio => Content::Audio(media),
            MediaKind::File => Content::File(media),
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text { text } => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_media(&self) -> Option<(MediaKind, &Media)> {
        match self {
            Content::Text { .. } => None,
            Content::Image(m) => Some((MediaKind::Image, m)),
            Content::Video(m) => Some((MediaKind::Video, m)),
            Content::Audio(m) => Some((MediaKind::Audio, m)),
            Content::File(m) => Some((MediaKind::File, m)),
        }
    }

    /// True for media that actually carries bytes.
    #[must_use]
    pub fn is_media(&self) -> bool {
        self.as_media().is_some_and(|(_, m)| !m.data.is_empty())
    }

    /// Short human-readable stand-in, used when the model cannot take the
    /// content itself.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Content::Text { text } => text.clone(),
            Content::Image(_) => "[image]".to_string(),
            Content::Video(_) => "[video]".to_string(),
            Content::Audio(_) => "[voice]".to_string(),
            Content::File(m) => match m.file_name.as_deref() {
                Some(name) if !name.is_empty() => format!("[file: {name}]"),
                _ => "[file]".to_string(),
            },
        }
    }
}

mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&general_purpose::STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
