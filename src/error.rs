//! Error types for AtlasBlob
//!
//! Provides a unified error type for all operations.
//!
//! Absent objects and files are not errors: reads return `Ok(None)`.
//! The variants below cover I/O failures and caller mistakes that must
//! abort an operation before it mutates anything.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using BlobError
pub type Result<T> = std::result::Result<T, BlobError>;

/// Unified error type for AtlasBlob operations
#[derive(Debug, Error)]
pub enum BlobError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Object Cache Errors
    // -------------------------------------------------------------------------
    #[error("Object already cached: {}", .0.display())]
    DuplicateObject(PathBuf),

    // -------------------------------------------------------------------------
    // Block Store Errors
    // -------------------------------------------------------------------------
    #[error("Payload of {len} bytes exceeds block size {block_size}")]
    PayloadTooLarge { len: u64, block_size: u64 },

    #[error("Segment object missing from storage: {}", .0.display())]
    MissingSegment(PathBuf),

    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    // -------------------------------------------------------------------------
    // File Multiplexer Errors
    // -------------------------------------------------------------------------
    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("File already exists: {0}")]
    FileExists(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    // -------------------------------------------------------------------------
    // Encoding Errors
    // -------------------------------------------------------------------------
    #[error("Encoding error: {0}")]
    Encoding(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
