//! Embedded asset serving module
//!
//! Wraps the read-only bundle compiled into the binary with an in-memory
//! read-through cache. Entries carry an absolute expiry and are removed by a
//! periodic background sweep; the read path itself never checks freshness.

pub mod cache;
pub mod path;
pub mod store;

pub use cache::{Asset, AssetCache, CachePolicy};
pub use store::{AssetStore, EmbeddedStore};

use thiserror::Error;

/// Errors produced by asset lookup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssetError {
    /// Requested name contains a directory traversal token
    #[error("invalid asset path: {0}")]
    InvalidPath(String),
    /// Sanitized name is absent from the backing store
    #[error("asset not found: {0}")]
    NotFound(String),
}
