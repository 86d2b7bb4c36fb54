//! # Swap reconciliation pipeline
//!
//! ```text
//! scheduler tick
//!     ↓
//! Reconciler::run_pass()
//!     ├─ SwapSource::fetch_new_swaps(lastBlockNumber)   (graph)
//!     ├─ drop tx hashes in the dedup window              (state_store)
//!     ├─ format_swap() → NotificationSink::notify()      (formatter, notifier)
//!     └─ StateStore::checkpoint(newest block, handled)   (state_store)
//! ```
//!
//! ## Module Organization
//!
//! - `types` - Subgraph wire types (`SwapEvent`)
//! - `state_store` - JSON state file and its locks
//! - `graph` - Paginated subgraph fetcher
//! - `formatter` - Swap → alert line
//! - `notifier` - Bark-style push delivery
//! - `backoff` - Delay after a failed fetch
//! - `reconcile` - One fetch → notify → checkpoint pass
//! - `scheduler` - Tick loop and state file watcher

pub mod types;
pub mod state_store;
pub mod graph;
pub mod formatter;
pub mod notifier;
pub mod backoff;
pub mod reconcile;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use types::SwapEvent;
pub use state_store::{PersistedState, StateStore, StoreError};
pub use graph::{FetchError, GraphSwapSource, SwapSource, PAGE_SIZE};
pub use formatter::format_swap;
pub use notifier::{BarkNotifier, NotificationSink, NotifyError};
pub use backoff::FetchBackoff;
pub use reconcile::{PassError, PassOutcome, PassReport, Reconciler};
