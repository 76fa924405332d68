//! Trade records emitted on every fill.

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::OrderId;

/// A single fill between a resting (maker) order and an incoming (taker)
/// order. Executed at the maker's price; one record per fill event.
#[derive(Debug, Clone, Serialize)]
pub struct Trade {
    /// Unique transaction identifier, deterministic per book symbol.
    pub transaction_id: Uuid,
    /// Symbol of the book the trade occurred on.
    pub symbol: String,
    /// The resting order that provided liquidity.
    pub maker_order_id: OrderId,
    /// The incoming order that removed liquidity.
    pub taker_order_id: OrderId,
    /// Execution price (the maker's resting price).
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Shares exchanged in this fill.
    pub volume: u64,
    /// Monotonic book time at which the fill occurred.
    pub timestamp: u64,
}

/// Callback invoked by the book for every fill the matcher produces.
pub type TradeListener = Arc<dyn Fn(&Trade) + Send + Sync>;
