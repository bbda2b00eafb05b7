//! Server synchronization
//!
//! A reconciliation cycle fetches the server's quotes, merges new ones into
//! the local store, stages per-text conflicts for manual resolution, then
//! pushes the local store back.

pub mod reconciler;
pub mod remote;
pub mod resolver;
pub mod scheduler;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Quote;

pub use reconciler::{
    classify, Classification, SyncNotice, SyncOutcome, SyncReconciler, SyncReport, SyncState,
};
pub use remote::HttpRemote;
pub use resolver::{ConflictResolver, Resolution};
pub use scheduler::SyncTask;

/// Remote data source errors
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned {status} for {url}")]
    Status { status: u16, url: String },
    #[error("Malformed server response: {0}")]
    MalformedBody(String),
}

/// Where server quotes come from and where the local store is pushed
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Current server snapshot, already mapped to quotes
    async fn fetch_quotes(&self) -> Result<Vec<Quote>, SyncError>;

    /// Send the full local store; the response body is ignored
    async fn push_quotes(&self, quotes: &[Quote]) -> Result<(), SyncError>;
}
