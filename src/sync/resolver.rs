//! Conflict resolution
//!
//! Holds the conflicts staged by the last sync cycle and applies a bulk
//! decision to the quote store. The pending list is published on a watch
//! channel so a surface can show resolution controls only while it is
//! non-empty.

use std::sync::Arc;

use tokio::sync::watch;

use crate::storage::SharedQuoteStore;
use crate::types::{Conflict, Quote};

/// Result of a resolution request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing was pending
    NothingToResolve,
    /// Pending conflicts dropped; local quotes untouched
    KeptLocal { discarded: usize },
    /// Server categories written into the store
    AcceptedServer { applied: usize },
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::NothingToResolve => write!(f, "No conflicts to resolve."),
            Resolution::KeptLocal { discarded } => {
                write!(f, "Kept local versions ({} conflicts discarded).", discarded)
            }
            Resolution::AcceptedServer { applied } => {
                write!(f, "Applied {} server versions.", applied)
            }
        }
    }
}

#[derive(Clone)]
pub struct ConflictResolver {
    store: SharedQuoteStore,
    pending: Arc<watch::Sender<Vec<Conflict>>>,
}

impl ConflictResolver {
    pub fn new(store: SharedQuoteStore) -> Self {
        let (pending, _) = watch::channel(Vec::new());
        Self {
            store,
            pending: Arc::new(pending),
        }
    }

    /// Replace the pending list wholesale
    pub fn stage(&self, conflicts: Vec<Conflict>) {
        if !conflicts.is_empty() {
            tracing::info!("{} conflicts awaiting resolution", conflicts.len());
        }
        self.pending.send_replace(conflicts);
    }

    /// Snapshot of the pending list
    pub fn pending(&self) -> Vec<Conflict> {
        self.pending.borrow().clone()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    /// Receiver that observes every change to the pending list
    pub fn subscribe(&self) -> watch::Receiver<Vec<Conflict>> {
        self.pending.subscribe()
    }

    /// Discard the pending conflicts, leaving local quotes as they are
    pub fn keep_local(&self) -> Resolution {
        let discarded = self.pending.send_replace(Vec::new()).len();
        if discarded == 0 {
            return Resolution::NothingToResolve;
        }
        tracing::info!("Kept local versions, discarded {} conflicts", discarded);
        Resolution::KeptLocal { discarded }
    }

    /// Overwrite each conflicting local quote with the server's version
    pub async fn accept_server(&self) -> Resolution {
        let mut store = self.store.lock().await;

        let conflicts = self.pending.send_replace(Vec::new());
        if conflicts.is_empty() {
            return Resolution::NothingToResolve;
        }

        let server_versions: Vec<Quote> = conflicts
            .into_iter()
            .map(|conflict| Quote {
                text: conflict.local.text,
                category: conflict.server.category,
            })
            .collect();
        let applied = store.replace_categories(&server_versions);

        tracing::info!("Accepted {} server versions", applied);
        Resolution::AcceptedServer { applied }
    }
}
