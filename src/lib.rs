//! Swap notifier
//!
//! Polls a subgraph for new swaps on the UNIBTC/WBTC pool, formats each one
//! into a short alert line and pushes it to Bark-style GET endpoints. Progress
//! (last block, recently notified tx hashes) lives in a single JSON file so a
//! restart resumes where the previous run stopped.
//!
//! ## Module Organization
//!
//! - `config` - Runtime settings from environment variables
//! - `pipeline` - Fetch → filter → notify → checkpoint loop and its collaborators

pub mod config;
pub mod pipeline;

pub use config::AppConfig;
