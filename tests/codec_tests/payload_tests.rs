//! Tests for payload encoding and text decoding
//!
//! These tests verify:
//! - Raw bytes pass through untouched
//! - Text shapes are joined and always line-terminated
//! - Non-ASCII text is rejected
//! - Decoding normalizes CRLF and drops the trailing empty line

use atlasblob::codec::{decode, Decoded, Payload, TextShape};
use atlasblob::BlobError;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_raw_bytes_pass_through() {
    let encoded = Payload::from(b"no newline").encode().unwrap();
    assert_eq!(&encoded[..], b"no newline");
}

#[test]
fn test_text_gets_trailing_newline() {
    let encoded = Payload::from("hello").encode().unwrap();
    assert_eq!(&encoded[..], b"hello\n");
}

#[test]
fn test_terminated_text_is_unchanged() {
    let encoded = Payload::from("hello\n").encode().unwrap();
    assert_eq!(&encoded[..], b"hello\n");
}

#[test]
fn test_lines_are_joined() {
    let encoded = Payload::Lines(strings(&["a", "b", "c"])).encode().unwrap();
    assert_eq!(&encoded[..], b"a\nb\nc\n");
}

#[test]
fn test_rows_are_comma_joined() {
    let rows = vec![strings(&["a", "1"]), strings(&["b", "2", "x"])];
    let encoded = Payload::Rows(rows).encode().unwrap();
    assert_eq!(&encoded[..], b"a,1\nb,2,x\n");
}

#[test]
fn test_empty_text_stays_empty() {
    assert!(Payload::from("").encode().unwrap().is_empty());
    assert!(Payload::Lines(Vec::new()).encode().unwrap().is_empty());
}

#[test]
fn test_non_ascii_text_is_rejected() {
    let result = Payload::from("naïve").encode();
    assert!(matches!(result, Err(BlobError::Encoding(_))));
}

#[test]
fn test_is_text() {
    assert!(!Payload::from(vec![1u8, 2, 3]).is_text());
    assert!(Payload::from("x").is_text());
    assert!(Payload::Lines(strings(&["x"])).is_text());
    assert!(Payload::Rows(vec![strings(&["x"])]).is_text());
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_decode_text_normalizes_crlf() {
    let decoded = decode(b"a\r\nb\r\n", TextShape::Text).unwrap();
    assert_eq!(decoded.as_text(), Some("a\nb\n"));
}

#[test]
fn test_decode_lines_drops_trailing_terminator() {
    let decoded = decode(b"a\nb\n", TextShape::Lines).unwrap();
    assert_eq!(decoded, Decoded::Lines(strings(&["a", "b"])));
}

#[test]
fn test_decode_lines_keeps_unterminated_last_line() {
    let decoded = decode(b"a\nb", TextShape::Lines).unwrap();
    assert_eq!(decoded.as_lines(), Some(&strings(&["a", "b"])[..]));
}

#[test]
fn test_decode_lines_keeps_inner_blank_lines() {
    let decoded = decode(b"a\n\nb\n\n", TextShape::Lines).unwrap();
    assert_eq!(decoded.as_lines(), Some(&strings(&["a", "", "b", ""])[..]));
}

#[test]
fn test_decode_rows_with_crlf() {
    let decoded = decode(b"name,size\r\nseg,42\r\n", TextShape::Rows).unwrap();
    assert_eq!(
        decoded,
        Decoded::Rows(vec![strings(&["name", "size"]), strings(&["seg", "42"])])
    );
}

#[test]
fn test_decode_empty_buffer() {
    assert_eq!(decode(b"", TextShape::Lines).unwrap(), Decoded::Lines(Vec::new()));
    assert_eq!(decode(b"", TextShape::Rows).unwrap(), Decoded::Rows(Vec::new()));
    assert_eq!(decode(b"", TextShape::Text).unwrap().as_text(), Some(""));
}

#[test]
fn test_decode_non_ascii_is_rejected() {
    let result = decode(&[b'a', 0xC3, 0xA9, b'\n'], TextShape::Lines);
    assert!(matches!(result, Err(BlobError::Encoding(_))));
}

#[test]
fn test_rows_survive_encode_then_decode() {
    let rows = vec![strings(&["a", "0", "0", "5", "1"]), strings(&["b", "0", "5", "9", "0"])];
    let encoded = Payload::Rows(rows.clone()).encode().unwrap();
    assert_eq!(decode(&encoded, TextShape::Rows).unwrap(), Decoded::Rows(rows));
}
