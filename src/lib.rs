//! Quotebook Library
//!
//! A persisted quote collection with JSON import/export and periodic
//! synchronization against a remote source, including manual conflict
//! resolution.

pub mod display;
pub mod storage;
pub mod sync;
pub mod types;

pub use display::{QuoteViewer, RenderFormat, RenderSurface};
pub use storage::{QuoteStore, SharedQuoteStore};
pub use sync::{ConflictResolver, SyncReconciler, SyncTask};
pub use types::{CategoryFilter, Conflict, Quote};
