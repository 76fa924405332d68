//! Order record and its lifecycle types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AgentId, OrderId};

/// Price carried by market orders at creation time; market orders have no
/// price of their own until they cross.
pub const MARKET_PRICE_SENTINEL: Decimal = Decimal::NEGATIVE_ONE;

/// Side indicates the direction of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// An offer to buy at a given price.
    Bid,
    /// An offer to sell at a given price.
    Ask,
}

impl Side {
    /// The opposing side of the book.
    pub fn opposite(self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Bid => write!(f, "BID"),
            Side::Ask => write!(f, "ASK"),
        }
    }
}

/// How an order executes against the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    /// Execute immediately against the best opposing levels, no price limit.
    /// Any residual is cancelled; market orders never rest.
    Market,
    /// Execute only at prices satisfying the limit; residual rests in the
    /// book.
    Limit,
}

/// Lifecycle state of an order.
///
/// Transitions are `Open → Closed` (fully filled) and `Open → Canceled`
/// (explicit cancel, or market-order residual); both end states are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Live: resting in the book or currently being matched.
    Open,
    /// Fully filled.
    Closed,
    /// Cancelled before completion.
    Canceled,
}

impl OrderStatus {
    /// Whether the order can still trade or be cancelled.
    pub fn is_open(self) -> bool {
        self == OrderStatus::Open
    }

    /// Whether the order reached an end state.
    pub fn is_terminal(self) -> bool {
        !self.is_open()
    }
}

/// A single order: immutable identity, mutable matching state.
///
/// `reserved_shares` is only populated for ASK orders; it records the exact
/// inventory lots withdrawn from the owner's holdings when the order was
/// constructed, so cancellation or a market residual can restore them
/// losslessly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,
    /// Identifier of the owning agent.
    pub agent_id: AgentId,
    /// Limit price, or [`MARKET_PRICE_SENTINEL`] for market orders.
    pub price: Decimal,
    /// Remaining volume.
    pub volume: u64,
    /// Volume at creation; immutable afterwards.
    pub entry_volume: u64,
    /// Monotonic creation time, the price-tie breaker. Preserved across
    /// partial fills so a re-queued residual keeps its queue position.
    pub timestamp: u64,
    /// Lifecycle state.
    pub status: OrderStatus,
    /// Direction of the order.
    pub side: Side,
    /// Market or limit execution.
    pub kind: OrderKind,
    /// Inventory lots `(lot_price, lot_volume)` reserved at creation.
    /// Always empty for BID orders.
    pub reserved_shares: Vec<(Decimal, u64)>,
}

impl Order {
    /// Create a fresh OPEN order.
    pub fn new(
        id: OrderId,
        agent_id: AgentId,
        price: Decimal,
        volume: u64,
        side: Side,
        kind: OrderKind,
        timestamp: u64,
    ) -> Self {
        Self {
            id,
            agent_id,
            price,
            volume,
            entry_volume: volume,
            timestamp,
            status: OrderStatus::Open,
            side,
            kind,
            reserved_shares: Vec::new(),
        }
    }

    /// Attach the inventory lots withdrawn when this ASK was constructed.
    pub fn with_reserved_shares(mut self, lots: Vec<(Decimal, u64)>) -> Self {
        self.reserved_shares = lots;
        self
    }

    /// The lots to hand back for the remaining (unsold) volume.
    ///
    /// Reserved lots are drawn cheapest-first: the owner keeps the most
    /// valuable lots as sold and receives the lowest-priced ones back, which
    /// makes cancellation behavior deterministic.
    pub fn returnable_shares(&self) -> Vec<(Decimal, u64)> {
        let mut lots = self.reserved_shares.clone();
        lots.sort_by(|a, b| a.0.cmp(&b.0));

        let mut remaining = self.volume;
        let mut returned = Vec::new();
        for (lot_price, lot_volume) in lots {
            if remaining == 0 {
                break;
            }
            let take = lot_volume.min(remaining);
            if take > 0 {
                returned.push((lot_price, take));
                remaining -= take;
            }
        }
        returned
    }
}
