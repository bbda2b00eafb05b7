//! Sync reconciler
//!
//! Runs reconciliation cycles. Only one cycle can be in flight: a cycle
//! requested while another is running is skipped rather than queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::storage::SharedQuoteStore;
use crate::sync::{ConflictResolver, RemoteSource};
use crate::types::{validate, Conflict, Quote};

/// Whether a cycle is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Syncing,
}

/// User-facing notifications raised during a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncNotice {
    /// New server quotes were added locally
    Added(usize),
    /// Conflicts were staged for resolution
    ConflictsPending(usize),
    FetchFailed(String),
    PushFailed(String),
}

impl std::fmt::Display for SyncNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncNotice::Added(count) => write!(f, "Synced {} new quotes from server.", count),
            SyncNotice::ConflictsPending(count) => {
                write!(f, "{} conflicts detected. Choose which version to keep.", count)
            }
            SyncNotice::FetchFailed(reason) => write!(f, "Sync failed: {}", reason),
            SyncNotice::PushFailed(reason) => write!(f, "Could not push quotes: {}", reason),
        }
    }
}

/// Summary of one completed cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub added: usize,
    pub conflicts: usize,
    pub fetch_error: Option<String>,
    pub push_error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl SyncReport {
    fn fetch_failed(reason: String) -> Self {
        Self {
            added: 0,
            conflicts: 0,
            fetch_error: Some(reason),
            push_error: None,
            completed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// Another cycle was already running
    Skipped,
}

/// Server quotes split by how they relate to the local store
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Classification {
    pub additions: Vec<Quote>,
    pub conflicts: Vec<Conflict>,
}

/// Classify each server quote against `local`, matching on text
///
/// Every server quote is compared with `local` as given; additions made by
/// the same batch are not taken into account.
pub fn classify(local: &[Quote], server: Vec<Quote>) -> Classification {
    let mut classification = Classification::default();

    for server_quote in server {
        match local.iter().find(|q| q.text == server_quote.text) {
            None => classification.additions.push(server_quote),
            Some(local_quote) if local_quote.category == server_quote.category => {}
            Some(local_quote) => classification.conflicts.push(Conflict {
                local: local_quote.clone(),
                server: server_quote,
            }),
        }
    }

    classification
}

pub struct SyncReconciler {
    store: SharedQuoteStore,
    remote: Arc<dyn RemoteSource>,
    resolver: ConflictResolver,
    syncing: AtomicBool,
    notices: broadcast::Sender<SyncNotice>,
}

/// Releases the in-flight flag when the cycle ends, however it ends
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncReconciler {
    pub fn new(
        store: SharedQuoteStore,
        remote: Arc<dyn RemoteSource>,
        resolver: ConflictResolver,
    ) -> Self {
        let (notices, _) = broadcast::channel(16);
        Self {
            store,
            remote,
            resolver,
            syncing: AtomicBool::new(false),
            notices,
        }
    }

    pub fn state(&self) -> SyncState {
        if self.syncing.load(Ordering::SeqCst) {
            SyncState::Syncing
        } else {
            SyncState::Idle
        }
    }

    pub fn resolver(&self) -> &ConflictResolver {
        &self.resolver
    }

    /// Notifications raised by later cycles
    pub fn subscribe(&self) -> broadcast::Receiver<SyncNotice> {
        self.notices.subscribe()
    }

    fn try_begin(&self) -> Option<CycleGuard<'_>> {
        self.syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| CycleGuard(&self.syncing))
    }

    fn notify(&self, notice: SyncNotice) {
        tracing::debug!("{}", notice);
        // No subscribers is fine
        let _ = self.notices.send(notice);
    }

    /// Run one reconciliation cycle now, unless one is already running
    pub async fn sync_now(&self) -> SyncOutcome {
        let Some(_guard) = self.try_begin() else {
            tracing::debug!("Sync already in progress, skipping");
            return SyncOutcome::Skipped;
        };
        tracing::info!("Sync cycle started");

        let server_quotes = match self.remote.fetch_quotes().await {
            Ok(quotes) => quotes,
            Err(e) => {
                tracing::warn!("Failed to fetch server quotes: {}", e);
                self.notify(SyncNotice::FetchFailed(e.to_string()));
                return SyncOutcome::Completed(SyncReport::fetch_failed(e.to_string()));
            }
        };

        let server_quotes: Vec<Quote> = server_quotes
            .into_iter()
            .filter_map(|quote| match validate(&quote.text, &quote.category) {
                Ok(valid) => Some(valid),
                Err(e) => {
                    tracing::debug!("Ignoring invalid server quote: {}", e);
                    None
                }
            })
            .collect();

        let (added, conflicts, snapshot) = {
            let mut store = self.store.lock().await;
            let Classification {
                additions,
                conflicts,
            } = classify(store.quotes(), server_quotes);
            let added = store.apply_additions(additions);
            (added, conflicts, store.snapshot())
        };

        if added > 0 {
            tracing::info!("Added {} quotes from server", added);
            self.notify(SyncNotice::Added(added));
        }

        let conflict_count = conflicts.len();
        self.resolver.stage(conflicts);
        if conflict_count > 0 {
            self.notify(SyncNotice::ConflictsPending(conflict_count));
        }

        let push_error = match self.remote.push_quotes(&snapshot).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("Failed to push quotes to server: {}", e);
                self.notify(SyncNotice::PushFailed(e.to_string()));
                Some(e.to_string())
            }
        };

        tracing::info!(
            "Sync cycle finished: {} added, {} conflicts",
            added,
            conflict_count
        );
        SyncOutcome::Completed(SyncReport {
            added,
            conflicts: conflict_count,
            fetch_error: None,
            push_error,
            completed_at: Utc::now(),
        })
    }
}
