//! Convenience re-exports for the common simulation surface.
//!
//! ```
//! use marketsim_rs::prelude::*;
//! ```

pub use crate::agent::{Agent, NoiseAgent, TakerAgent};
pub use crate::book::{
    BookEntry, BookError, BookSnapshot, MatchMaker, OrderBook, PriceLevel, SnapshotPackage, Trade,
    TradeListener,
};
pub use crate::config::SimConfig;
pub use crate::ledger::AgentLedger;
pub use crate::order::{MARKET_PRICE_SENTINEL, Order, OrderKind, OrderStatus, Side};
pub use crate::sim::Simulation;
pub use crate::{AgentId, OrderId};
