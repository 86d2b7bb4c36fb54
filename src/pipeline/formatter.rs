//! Swap → alert line
//!
//! ```text
//! 2023-11-15 06:13:20  2.00000 WBTC -> 1.00000 UNIBTC Vol: $200000.00
//! ```
//!
//! Both pool tokens use 8 decimals. Amounts and volume are computed with
//! `rust_decimal` so the rendered digits never depend on float rounding.

use super::types::SwapEvent;
use chrono::{DateTime, FixedOffset};
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;
use std::str::FromStr;

pub const TOKEN0_SYMBOL: &str = "UNIBTC";
pub const TOKEN1_SYMBOL: &str = "WBTC";

/// USD price used when the swap carries no usable `btcPrice`
pub const FALLBACK_BTC_PRICE: u64 = 100_000;

/// 10^8, the fixed-point scale of both tokens
const TOKEN_SCALE: u64 = 100_000_000;

/// Alerts are rendered in UTC+8
const DISPLAY_OFFSET_SECS: i32 = 8 * 3600;

/// Parsed, display-ready view of a swap
#[derive(Debug, Clone, PartialEq)]
pub struct SwapSummary {
    pub time: String,
    pub amount_in: Decimal,
    pub token_in: &'static str,
    pub amount_out: Decimal,
    pub token_out: &'static str,
    pub volume_usd: Decimal,
}

impl fmt::Display for SwapSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}  {:.5} {} -> {:.5} {} Vol: ${:.2}",
            self.time,
            round_half_even(self.amount_in, 5),
            self.token_in,
            round_half_even(self.amount_out, 5),
            self.token_out,
            round_half_even(self.volume_usd, 2),
        )
    }
}

fn round_half_even(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven)
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// USD price for the swap: its own `btcPrice` when parseable
pub fn resolve_price(swap: &SwapEvent) -> Decimal {
    match swap.btc_price.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => match parse_decimal(raw) {
            Some(price) => price,
            None => {
                log::error!(
                    "Failed to parse btcPrice {:?} for {}, using fallback",
                    raw,
                    swap.transaction_hash
                );
                Decimal::from(FALLBACK_BTC_PRICE)
            }
        },
        _ => Decimal::from(FALLBACK_BTC_PRICE),
    }
}

/// `blockTimestamp` as `YYYY-MM-DD HH:MM:SS` in UTC+8
pub fn local_time(block_timestamp: &str) -> Option<String> {
    let secs: i64 = block_timestamp.trim().parse().ok()?;
    let offset = FixedOffset::east_opt(DISPLAY_OFFSET_SECS)?;
    let time = DateTime::from_timestamp(secs, 0)?.with_timezone(&offset);
    Some(time.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Direction, amounts and volume of a swap; `None` when any input is unusable
///
/// A negative `amount0` means the pool paid out UNIBTC, so the trader sold
/// WBTC into it.
pub fn summarize(swap: &SwapEvent) -> Option<SwapSummary> {
    let amount0 = parse_decimal(&swap.amount0)?;
    let amount1 = parse_decimal(&swap.amount1)?;

    let (amount_in, amount_out, token_in, token_out) = if amount0 < Decimal::ZERO {
        (amount1, -amount0, TOKEN1_SYMBOL, TOKEN0_SYMBOL)
    } else {
        (amount0, -amount1, TOKEN0_SYMBOL, TOKEN1_SYMBOL)
    };

    let price = resolve_price(swap);
    let scale = Decimal::from(TOKEN_SCALE);
    let volume = amount_in.checked_mul(price)?;

    let time = local_time(&swap.block_timestamp)?;

    Some(SwapSummary {
        time,
        amount_in: amount_in.checked_div(scale)?,
        token_in,
        amount_out: amount_out.checked_div(scale)?,
        token_out,
        volume_usd: volume.checked_div(scale)?,
    })
}

/// Render a swap as an alert line; an empty string means "skip it"
pub fn format_swap(swap: &SwapEvent) -> String {
    summarize(swap).map(|s| s.to_string()).unwrap_or_default()
}
