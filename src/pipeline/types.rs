//! Wire types for the swap subgraph

use serde::{Deserialize, Serialize};

/// A single swap on the pool, exactly as the subgraph returns it
///
/// Numeric fields travel as decimal strings so nothing is lost to float
/// precision; only `tick` is a native integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapEvent {
    pub id: String,
    pub sender: String,
    pub recipient: String,
    pub amount0: String,
    pub amount1: String,
    #[serde(rename = "sqrtPriceX96")]
    pub sqrt_price_x96: String,
    pub liquidity: String,
    pub tick: i32,
    pub block_number: String,
    pub block_timestamp: String,
    pub transaction_hash: String,
    #[serde(default)]
    pub btc_price: Option<String>,
}

/// `{"data": {"swaps": [...]}}`
#[derive(Debug, Deserialize)]
pub struct GraphResponse {
    pub data: Option<SwapsData>,
    #[serde(default)]
    pub errors: Vec<GraphError>,
}

#[derive(Debug, Deserialize)]
pub struct SwapsData {
    #[serde(default)]
    pub swaps: Vec<SwapEvent>,
}

#[derive(Debug, Deserialize)]
pub struct GraphError {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct GraphRequest {
    pub query: String,
}

/// Swap fixture: WBTC in, priced, at `block`
#[cfg(test)]
pub(crate) fn sample_swap(block: u64, tx: &str) -> SwapEvent {
    SwapEvent {
        id: format!("{}-0", tx),
        sender: "0x1111111111111111111111111111111111111111".to_string(),
        recipient: "0x2222222222222222222222222222222222222222".to_string(),
        amount0: "-100000000".to_string(),
        amount1: "200000000".to_string(),
        sqrt_price_x96: "79228162514264337593543950336".to_string(),
        liquidity: "1000000".to_string(),
        tick: 0,
        block_number: block.to_string(),
        block_timestamp: "1700000000".to_string(),
        transaction_hash: tx.to_string(),
        btc_price: Some("100000".to_string()),
    }
}
