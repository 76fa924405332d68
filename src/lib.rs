//! # Agent-Based Market Simulator
//!
//! A continuous double-auction market simulator written in Rust. A set of
//! autonomous trading agents interact through a shared limit order book;
//! every tick each agent submits market or limit orders, and a matching
//! engine resolves crossings under price-time priority, updating agent
//! cash and inventory alongside the book's best price levels.
//!
//! ## Key Features
//!
//! - **Price-time priority matching**: best price first, earliest order
//!   first on ties; partial fills re-queue without losing their position.
//! - **Lot-accurate inventory**: agents hold shares as `(price, volume)`
//!   lots. Posting an ask withdraws concrete lots into the order's
//!   reservation so a cancellation restores them losslessly,
//!   cheapest-first.
//! - **Reservation discipline**: limit bids reserve their full cost at
//!   creation; market orders settle through the matcher. Every monetary
//!   amount is rounded half-to-even to a configurable digit count, so
//!   rounding drift cannot accumulate across millions of fills.
//! - **Self-trade prevention**: the matcher skips an agent's own resting
//!   orders and restores them with their original queue position.
//! - **Deterministic replay**: order timestamps come from a monotonic
//!   per-book counter and agents are seeded explicitly, so a fixed seed
//!   and registration order reproduce the trade sequence bit for bit.
//! - **Observability**: aggregated top-N depth snapshots with a stable
//!   JSON shape, checksum-wrapped snapshot packages, and a per-fill trade
//!   stream for front-ends and training loops.
//!
//! ## Design Goals
//!
//! 1. **Correctness**: every book mutation keeps the order registry, the
//!    priority structures, and the agent ledgers consistent.
//! 2. **Determinism**: seeded runs replay identically; tie-breaks never
//!    depend on wall-clock time or iteration order of unordered maps.
//! 3. **Robustness**: public operations are defensive; bad ids or empty
//!    sides log and degrade instead of terminating a simulation.
//!
//! ## Use Cases
//!
//! - **Market simulation**: study emergent price dynamics under
//!   configurable agent populations.
//! - **Strategy training**: drive reinforcement-learning or evolutionary
//!   traders against realistic microstructure through the `Agent` seam.
//! - **Research and teaching**: a compact reference for double-auction
//!   matching with reserved-asset bookkeeping.
//!
//! ## Example
//!
//! ```
//! use marketsim_rs::prelude::*;
//! use rust_decimal::Decimal;
//!
//! let book = OrderBook::new(Decimal::ONE);
//! let mut sim = Simulation::new(book);
//!
//! // A seeded population of noise traders.
//! for seed in 0..10 {
//!     let agent = NoiseAgent::register(sim.book(), Decimal::from(100), seed);
//!     sim.register(Box::new(agent));
//! }
//!
//! sim.run(100);
//! let depth = sim.snapshot(10);
//! assert_eq!(depth.symbol_id, "COIN");
//! ```

pub mod agent;
pub mod book;
pub mod config;
pub mod ids;
pub mod ledger;
pub mod order;
pub mod prelude;
pub mod sim;
mod utils;

pub use agent::{Agent, NoiseAgent, TakerAgent};
pub use book::{
    BookEntry, BookError, BookKey, BookSnapshot, MatchMaker, OrderBook, PriceLevel,
    SnapshotPackage, Trade, TradeListener,
};
pub use config::SimConfig;
pub use ids::IdMinter;
pub use ledger::AgentLedger;
pub use order::{MARKET_PRICE_SENTINEL, Order, OrderKind, OrderStatus, Side};
pub use sim::Simulation;
pub use utils::{current_time_secs, round_cash};

/// Identifier of an order: `O-` followed by a zero-padded counter.
pub type OrderId = String;

/// Identifier of an agent: `A-` followed by a zero-padded counter.
pub type AgentId = String;
