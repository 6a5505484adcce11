//! Text decoding
//!
//! Turns stored bytes back into one of the text shapes.

use bytes::Bytes;

use crate::error::{BlobError, Result};

/// Requested shape when decoding stored bytes as text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextShape {
    /// One string, CRLF normalized
    Text,
    /// One string per line, terminator removed
    Lines,
    /// Lines split on commas
    Rows,
}

/// Result of a read, in the shape the caller asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Raw(Bytes),
    Text(String),
    Lines(Vec<String>),
    Rows(Vec<Vec<String>>),
}

impl Decoded {
    /// Raw bytes, if this was read without decoding
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Decoded::Raw(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Decoded::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_lines(&self) -> Option<&[String]> {
        match self {
            Decoded::Lines(lines) => Some(lines),
            _ => None,
        }
    }

    pub fn as_rows(&self) -> Option<&[Vec<String>]> {
        match self {
            Decoded::Rows(rows) => Some(rows),
            _ => None,
        }
    }
}

/// Decode stored bytes into the requested text shape
pub fn decode(bytes: &[u8], shape: TextShape) -> Result<Decoded> {
    if !bytes.is_ascii() {
        return Err(BlobError::Encoding(
            "stored text is not ASCII".to_string(),
        ));
    }
    let text = String::from_utf8_lossy(bytes).replace("\r\n", "\n");

    if shape == TextShape::Text {
        return Ok(Decoded::Text(text));
    }

    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    // A terminated buffer (or an empty one) leaves one empty tail element
    if lines.last().is_some_and(|last| last.is_empty()) {
        lines.pop();
    }

    if shape == TextShape::Rows {
        return Ok(Decoded::Rows(
            lines
                .iter()
                .map(|line| line.split(',').map(str::to_string).collect())
                .collect(),
        ));
    }
    Ok(Decoded::Lines(lines))
}
