//! # Payload Validation
//!
//! Integrity checks on what an external call returned. Declared content types
//! from upstream APIs are not trusted by default: an error page served with
//! `200 OK` and `Content-Type: image/png` must not land in the manifest as a
//! page image, so the payload's leading bytes are checked against known
//! signatures.

use std::fmt;

use super::handler::ItemPayload;
use crate::config::ValidationConfig;
use crate::error::ItemError;
use crate::models::{ProcessedResult, WorkItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFamily {
    Image,
    Audio,
    Text,
}

/// Content types the engine can store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Png,
    Jpeg,
    Gif,
    Webp,
    Mp3,
    Wav,
    Ogg,
    PlainText,
}

impl ContentKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Mp3 => "audio/mpeg",
            Self::Wav => "audio/wav",
            Self::Ogg => "audio/ogg",
            Self::PlainText => "text/plain",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Ogg => "ogg",
            Self::PlainText => "txt",
        }
    }

    pub fn family(&self) -> ContentFamily {
        match self {
            Self::Png | Self::Jpeg | Self::Gif | Self::Webp => ContentFamily::Image,
            Self::Mp3 | Self::Wav | Self::Ogg => ContentFamily::Audio,
            Self::PlainText => ContentFamily::Text,
        }
    }

    /// Parse a declared MIME type, ignoring parameters such as `charset`
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next()?.trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::Webp),
            "audio/mpeg" | "audio/mp3" => Some(Self::Mp3),
            "audio/wav" | "audio/wave" | "audio/x-wav" => Some(Self::Wav),
            "audio/ogg" => Some(Self::Ogg),
            "text/plain" => Some(Self::PlainText),
            _ => None,
        }
    }

    /// Identify binary content by its leading signature bytes
    pub fn detect(data: &[u8]) -> Option<Self> {
        const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

        if data.starts_with(PNG) {
            Some(Self::Png)
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WAVE" {
            Some(Self::Wav)
        } else if data.starts_with(b"OggS") {
            Some(Self::Ogg)
        } else if data.starts_with(b"ID3")
            || (data.len() >= 2 && data[0] == 0xFF && data[1] & 0xE0 == 0xE0)
        {
            Some(Self::Mp3)
        } else {
            None
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

#[derive(Debug, Clone)]
pub struct PayloadValidator {
    trust_declared_content_type: bool,
    min_payload_bytes: usize,
}

impl Default for PayloadValidator {
    fn default() -> Self {
        Self::from_config(&ValidationConfig::default())
    }
}

impl PayloadValidator {
    pub fn from_config(config: &ValidationConfig) -> Self {
        Self {
            trust_declared_content_type: config.trust_declared_content_type,
            min_payload_bytes: config.min_payload_bytes,
        }
    }

    /// Check a payload's integrity and decide what it will be stored as
    pub fn validate_payload(&self, payload: &ItemPayload) -> Result<ContentKind, ItemError> {
        if payload.data.len() < self.min_payload_bytes {
            return Err(ItemError::Validation(format!(
                "payload of {} bytes is below the minimum of {}",
                payload.data.len(),
                self.min_payload_bytes
            )));
        }

        let declared = payload
            .declared_content_type
            .as_deref()
            .and_then(ContentKind::from_mime);

        if self.trust_declared_content_type {
            if let Some(kind) = declared {
                return Ok(kind);
            }
        }

        match (declared, ContentKind::detect(&payload.data)) {
            (Some(ContentKind::PlainText), None) => std::str::from_utf8(&payload.data)
                .map(|_| ContentKind::PlainText)
                .map_err(|_| {
                    ItemError::Validation(
                        "declared text/plain but payload is not UTF-8".to_string(),
                    )
                }),
            (declared, None) => Err(ItemError::Validation(format!(
                "unrecognized content signature (declared {})",
                declared
                    .map(|kind| kind.to_string())
                    .or_else(|| payload.declared_content_type.clone())
                    .unwrap_or_else(|| "nothing".to_string())
            ))),
            (Some(declared), Some(detected)) if declared.family() != detected.family() => {
                Err(ItemError::Validation(format!(
                    "declared {declared} but content signature is {detected}"
                )))
            }
            (_, Some(detected)) => Ok(detected),
        }
    }

    /// Final acceptance check of a built result before it joins the batch
    pub fn validate_result(&self, item: &WorkItem, result: &ProcessedResult) -> Result<(), String> {
        if result.index != item.index {
            return Err(format!(
                "result index {} does not match item index {}",
                result.index, item.index
            ));
        }
        if result.output_key.trim().is_empty() {
            return Err("result has an empty output key".to_string());
        }
        if !result.metric.is_finite() || result.metric < 0.0 {
            return Err(format!(
                "result metric {} is not a finite non-negative number",
                result.metric
            ));
        }
        Ok(())
    }
}
