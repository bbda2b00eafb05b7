//! Persistent storage
//!
//! This module handles all data persistence: the key-value backends, the
//! quote store built on top of them, settings, and JSON import/export.

pub mod kv;
pub mod quotes;
pub mod settings;
pub mod transfer;

use std::path::PathBuf;
use thiserror::Error;

pub use kv::{FileKvStore, KeyValueStore, MemoryKvStore};
pub use quotes::{ImportSummary, QuoteStore, SharedQuoteStore};

/// Key holding the JSON array of quotes
pub const QUOTES_KEY: &str = "quotes";
/// Key holding the last selected category filter
pub const SELECTED_CATEGORY_KEY: &str = "selectedCategory";
/// Session key holding the index of the last shown quote
pub const LAST_QUOTE_INDEX_KEY: &str = "lastQuoteIndex";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Could not determine a data directory")]
    NoDataDir,
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

/// Default data directory for this platform
pub fn get_data_dir() -> Result<PathBuf, StorageError> {
    directories::ProjectDirs::from("", "", "quotebook")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(StorageError::NoDataDir)
}
