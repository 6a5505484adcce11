//! # AtlasBlob
//!
//! A layered blob storage engine with:
//! - A bounded, write-back LRU object cache
//! - A "virtual big file": one append-only stream stored as bounded segments
//! - A multiplexer packing many small named files into one such stream
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     FileMultiplexer                          │
//! │            (name → segment/offset range, 1 lock)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       BlockStore                             │
//! │        (segment offset table + appendix, 1 lock)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      ObjectCache                             │
//! │          (arena LRU, write-back on evict, 1 lock)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!                       ▼
//!                  filesystem
//! ```
//!
//! Calls only flow downward, so the three locks can never form a cycle.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod cache;
pub mod blockstore;
pub mod multiplexer;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BlobError, Result};
pub use config::Config;
pub use codec::{Decoded, Payload, TextShape};
pub use cache::{CacheStats, ObjectCache};
pub use blockstore::BlockStore;
pub use multiplexer::{FileMultiplexer, FileRecord};
pub use engine::Engine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of AtlasBlob
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
