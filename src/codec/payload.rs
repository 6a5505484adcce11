//! Payload definitions
//!
//! The shapes a caller may hand to the cache, a block store or a
//! multiplexer file.

use bytes::Bytes;

use crate::error::{BlobError, Result};

use super::EOL;

/// Data accepted for storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Opaque bytes, stored as-is
    Raw(Bytes),

    /// A single text blob
    Text(String),

    /// Text lines, joined with line terminators
    Lines(Vec<String>),

    /// Comma-separated rows, one per line
    Rows(Vec<Vec<String>>),
}

impl Payload {
    /// Whether this payload is line-oriented text
    pub fn is_text(&self) -> bool {
        !matches!(self, Payload::Raw(_))
    }

    /// Encode to the stored byte form
    pub fn encode(self) -> Result<Bytes> {
        let text = match self {
            Payload::Raw(bytes) => return Ok(bytes),
            Payload::Text(text) => text,
            Payload::Lines(lines) => lines.join("\n"),
            Payload::Rows(rows) => rows
                .iter()
                .map(|row| row.join(","))
                .collect::<Vec<_>>()
                .join("\n"),
        };

        if !text.is_ascii() {
            return Err(BlobError::Encoding(
                "text payloads must be ASCII".to_string(),
            ));
        }

        let mut bytes = text.into_bytes();
        if bytes.last().is_some_and(|&last| last != EOL) {
            bytes.push(EOL);
        }
        Ok(Bytes::from(bytes))
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Raw(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Raw(Bytes::from(bytes))
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Raw(Bytes::copy_from_slice(bytes))
    }
}

impl<const N: usize> From<&[u8; N]> for Payload {
    fn from(bytes: &[u8; N]) -> Self {
        Payload::Raw(Bytes::copy_from_slice(bytes))
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Vec<String>> for Payload {
    fn from(lines: Vec<String>) -> Self {
        Payload::Lines(lines)
    }
}

impl From<Vec<Vec<String>>> for Payload {
    fn from(rows: Vec<Vec<String>>) -> Self {
        Payload::Rows(rows)
    }
}
