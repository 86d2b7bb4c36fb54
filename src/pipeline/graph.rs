//! Subgraph swap fetcher
//!
//! Pulls swaps newer than the checkpoint block from a GraphQL endpoint.
//!
//! ## Query
//!
//! ```graphql
//! swaps(first: 50, orderBy: blockNumber, orderDirection: desc,
//!       where: {blockNumber_gt: <cursor>}) { ...all SwapEvent fields }
//! ```
//!
//! Results come back newest-first. After each page the cursor moves to the
//! block of the page's last (oldest) swap, and fetching stops on an empty or
//! short page. Any failure aborts the whole fetch; retrying is the caller's job.

use super::types::{GraphRequest, GraphResponse, SwapEvent};
use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

/// Swaps requested per page
pub const PAGE_SIZE: usize = 50;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to encode query: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("request to subgraph failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("subgraph returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode subgraph response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("subgraph reported errors: {0}")]
    Graph(String),

    #[error("swap {tx} has invalid blockNumber {raw:?}")]
    InvalidBlockNumber { tx: String, raw: String },
}

/// Source of swaps newer than a block
///
/// The reconciler only depends on this trait; [`GraphSwapSource`] is the
/// production implementation.
#[async_trait]
pub trait SwapSource: Send + Sync {
    /// All swaps with `blockNumber > since_block`, newest first
    async fn fetch_new_swaps(&self, since_block: u64) -> Result<Vec<SwapEvent>, FetchError>;
}

/// Build the GraphQL query for one page
pub fn build_query(page_size: usize, min_block_exclusive: u64) -> String {
    format!(
        r#"
{{
  swaps(first: {page_size}, orderBy: blockNumber, orderDirection: desc, where: {{blockNumber_gt: {min_block_exclusive}}}) {{
    id
    sender
    recipient
    amount0
    amount1
    sqrtPriceX96
    liquidity
    tick
    blockNumber
    blockTimestamp
    transactionHash
    btcPrice
  }}
}}"#
    )
}

/// [`SwapSource`] backed by a subgraph HTTP endpoint
pub struct GraphSwapSource {
    client: Client,
    url: String,
}

impl GraphSwapSource {
    /// `client` should carry a request timeout
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// One POST, one page
    pub async fn fetch_page(&self, cursor: u64) -> Result<Vec<SwapEvent>, FetchError> {
        let request = GraphRequest {
            query: build_query(PAGE_SIZE, cursor),
        };
        let body = serde_json::to_vec(&request).map_err(FetchError::Encode)?;

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: text.chars().take(200).collect(),
            });
        }

        let parsed: GraphResponse = serde_json::from_str(&text).map_err(FetchError::Decode)?;

        if !parsed.errors.is_empty() {
            let messages: Vec<String> = parsed.errors.into_iter().map(|e| e.message).collect();
            return Err(FetchError::Graph(messages.join("; ")));
        }

        Ok(parsed.data.map(|d| d.swaps).unwrap_or_default())
    }
}

#[async_trait]
impl SwapSource for GraphSwapSource {
    async fn fetch_new_swaps(&self, since_block: u64) -> Result<Vec<SwapEvent>, FetchError> {
        let mut cursor = since_block;
        let mut all_swaps = Vec::new();
        let mut pages = 0usize;

        loop {
            let page = self.fetch_page(cursor).await?;
            pages += 1;

            let Some(last) = page.last() else {
                break;
            };

            let next_cursor: u64 = last.block_number.trim().parse().map_err(|_| {
                FetchError::InvalidBlockNumber {
                    tx: last.transaction_hash.clone(),
                    raw: last.block_number.clone(),
                }
            })?;

            let page_len = page.len();
            log::debug!(
                "Fetched page {} ({} swaps, blockNumber_gt {} → {})",
                pages,
                page_len,
                cursor,
                next_cursor
            );
            all_swaps.extend(page);

            if page_len < PAGE_SIZE {
                break;
            }

            if next_cursor == cursor {
                log::warn!(
                    "⚠️  Pagination cursor stuck at block {}, stopping after {} pages",
                    cursor,
                    pages
                );
                break;
            }
            cursor = next_cursor;
        }

        Ok(all_swaps)
    }
}
