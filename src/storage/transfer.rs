//! JSON import / export
//!
//! Export writes the whole store as a pretty-printed array; import accepts a
//! JSON array and merges it through [`QuoteStore::import_batch`].

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::storage::{ImportSummary, QuoteStore};
use crate::types::Quote;

/// File name used for exports
pub const EXPORT_FILE_NAME: &str = "quotes.json";

/// Import and export errors
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("File access failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Could not serialize quotes: {0}")]
    Serialize(serde_json::Error),
    #[error("Imported JSON must be an array of quote objects")]
    NotAnArray,
    #[error("No valid quotes found in file")]
    NoValidQuotes,
}

/// Serialize quotes as pretty-printed JSON
pub fn export_json(quotes: &[Quote]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(quotes)
}

/// Write `quotes.json` into `dir`, returning the written path
pub async fn export_to_file(store: &QuoteStore, dir: &Path) -> Result<PathBuf, TransferError> {
    let json = export_json(store.quotes()).map_err(TransferError::Serialize)?;
    tokio::fs::create_dir_all(dir).await?;

    let path = dir.join(EXPORT_FILE_NAME);
    tokio::fs::write(&path, json).await?;

    tracing::info!("Exported {} quotes to {}", store.len(), path.display());
    Ok(path)
}

/// Parse `text` and merge it into `store`
///
/// The store is left untouched on every error.
pub fn import_from_str(
    store: &mut QuoteStore,
    text: &str,
) -> Result<ImportSummary, TransferError> {
    let parsed: Value = serde_json::from_str(text)?;
    let Value::Array(records) = parsed else {
        return Err(TransferError::NotAnArray);
    };

    if !records
        .iter()
        .any(|record| crate::types::validate_value(record).is_ok())
    {
        return Err(TransferError::NoValidQuotes);
    }

    Ok(store.import_batch(&records))
}

/// Read a user-selected file and merge it into `store`
pub async fn import_from_file(
    store: &mut QuoteStore,
    path: &Path,
) -> Result<ImportSummary, TransferError> {
    let text = tokio::fs::read_to_string(path).await?;
    tracing::debug!("Importing quotes from {}", path.display());
    import_from_str(store, &text)
}
