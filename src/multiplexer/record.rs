//! File records
//!
//! Location of one logical file inside the backing block store, and its
//! row form in the persisted index.

use crate::error::{BlobError, Result};

/// Where a logical file's bytes live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRecord {
    /// Owning segment; equal to the persisted segment count while the
    /// bytes are still in the appendix
    pub segment: usize,
    /// Offset of the first byte within the segment
    pub start: u64,
    /// Offset one past the last byte within the segment
    pub end: u64,
    /// Stored from a text payload
    pub is_text: bool,
}

impl FileRecord {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// `name,segment,start,end,0|1`
    pub(crate) fn to_row(&self, name: &str) -> Vec<String> {
        vec![
            name.to_string(),
            self.segment.to_string(),
            self.start.to_string(),
            self.end.to_string(),
            u8::from(self.is_text).to_string(),
        ]
    }

    pub(crate) fn from_row(row: &[String]) -> Result<(String, FileRecord)> {
        let [name, segment, start, end, is_text] = row else {
            return Err(BlobError::CorruptIndex(format!(
                "expected 5 columns in file index row, got {:?}",
                row
            )));
        };

        let record = FileRecord {
            segment: parse_column(segment, "segment")?,
            start: parse_column(start, "start")?,
            end: parse_column(end, "end")?,
            is_text: match is_text.as_str() {
                "0" => false,
                "1" => true,
                other => {
                    return Err(BlobError::CorruptIndex(format!(
                        "bad text flag '{}' for file '{}'",
                        other, name
                    )))
                }
            },
        };
        if record.start > record.end {
            return Err(BlobError::CorruptIndex(format!(
                "file '{}' ends before it starts",
                name
            )));
        }
        Ok((name.clone(), record))
    }
}

fn parse_column<T: std::str::FromStr>(value: &str, column: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| BlobError::CorruptIndex(format!("bad {} value '{}'", column, value)))
}

/// Names end up as the first column of an ASCII CSV row
pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(BlobError::InvalidName("file name is empty".to_string()));
    }
    if name.contains([',', '\n', '\r']) {
        return Err(BlobError::InvalidName(format!(
            "'{}' contains a comma or line break",
            name.escape_debug()
        )));
    }
    if !name.is_ascii() {
        return Err(BlobError::InvalidName(format!(
            "'{}' is not ASCII",
            name.escape_debug()
        )));
    }
    Ok(())
}
