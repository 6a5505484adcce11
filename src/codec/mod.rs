//! Codec Module
//!
//! Conversion between caller-facing payload shapes and stored bytes.
//!
//! ## Text Encoding
//! ```text
//! Text("a\nb")            ──►  "a\nb\n"
//! Lines(["a", "b"])       ──►  "a\nb\n"
//! Rows([["a","1"],["b"]]) ──►  "a,1\nb\n"
//! ```
//! - ASCII only; anything else is rejected
//! - A trailing line terminator is always ensured (empty text stays empty)
//! - On decode, CRLF is normalized to LF before splitting
//!
//! Raw bytes pass through untouched in both directions.

mod payload;
mod text;

pub use payload::Payload;
pub use text::{decode, Decoded, TextShape};

/// Line terminator used by every text encoding
pub const EOL: u8 = b'\n';
