//! Core order book: side-ordered priority structures, the order registry,
//! and the agent ledgers behind them.

use crossbeam::atomic::AtomicCell;
use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{trace, warn};
use uuid::Uuid;

use super::snapshot::{BookSnapshot, PriceLevel};
use super::trade::{Trade, TradeListener};
use crate::config::SimConfig;
use crate::ids::IdMinter;
use crate::ledger::AgentLedger;
use crate::order::{Order, OrderKind, OrderStatus, Side};
use crate::utils::{UuidGenerator, current_time_secs, notional};
use crate::{AgentId, OrderId};

/// Composite priority key for a resting order.
///
/// Ordering is side-aware so that the front of each side map is always the
/// highest-priority entry: bids sort by descending price, asks by ascending
/// price, and equal prices break ties on the earlier monotonic sequence
/// number. Each side map only ever holds keys of its own side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookKey {
    /// Resting price.
    pub price: Decimal,
    /// Monotonic creation time of the order (tie-breaker).
    pub seq: u64,
    /// Side the key sorts for.
    pub side: Side,
}

impl Ord for BookKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.side {
            Side::Bid => self
                .price
                .cmp(&other.price)
                .reverse()
                .then(self.seq.cmp(&other.seq)),
            Side::Ask => self.price.cmp(&other.price).then(self.seq.cmp(&other.seq)),
        }
    }
}

impl PartialOrd for BookKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// The queue view of a resting order: what the matcher needs without
/// touching the full order record.
#[derive(Debug, Clone, PartialEq)]
pub struct BookEntry {
    /// Resting price.
    pub price: Decimal,
    /// Monotonic creation time of the order.
    pub timestamp: u64,
    /// Remaining volume at the time the entry was (re-)queued.
    pub volume: u64,
    /// Identifier of the backing order.
    pub id: OrderId,
}

/// A continuous double-auction limit order book shared by all agents of a
/// simulation.
///
/// The book owns the two priority structures, the authoritative order
/// registry, and the agent ledgers. All operations take `&self`; interior
/// mutability keeps the call surface uniform for agents that only hold a
/// shared reference during a tick. Public operations are defensive: an
/// unknown id or an empty side logs and returns a sentinel rather than
/// failing.
pub struct OrderBook {
    /// The symbol this book trades.
    symbol: String,

    /// Fractional digits for cash rounding.
    round_ndigits: u32,

    /// Bid side, best (highest price, earliest) entry at the front.
    bids: SkipMap<BookKey, BookEntry>,

    /// Ask side, best (lowest price, earliest) entry at the front.
    asks: SkipMap<BookKey, BookEntry>,

    /// Order id to its current queue key, for cancellation without scans.
    order_locations: DashMap<OrderId, BookKey>,

    /// Authoritative registry of every order ever originated.
    order_history: DashMap<OrderId, Order>,

    /// Agent ledgers by id.
    agents: DashMap<AgentId, AgentLedger>,

    /// Agent ids in registration order, for the deterministic tick loop.
    agent_index: RwLock<Vec<AgentId>>,

    /// Monotonic counters backing `get_id`.
    ids: IdMinter,

    /// Monotonic clock for order timestamps and trade times.
    clock: AtomicU64,

    /// The last price at which a trade occurred.
    current_price: AtomicCell<Decimal>,

    /// Generator for trade transaction ids.
    transaction_ids: UuidGenerator,

    /// Invoked for every fill the matcher produces.
    pub trade_listener: Option<TradeListener>,
}

impl OrderBook {
    /// Create a book with default configuration and the given start price.
    pub fn new(initial_price: Decimal) -> Self {
        Self::with_config(SimConfig::with_initial_price(initial_price))
    }

    /// Create a book from a full configuration.
    pub fn with_config(config: SimConfig) -> Self {
        let namespace = Uuid::new_v5(&Uuid::NAMESPACE_OID, config.symbol_id.as_bytes());
        Self {
            symbol: config.symbol_id,
            round_ndigits: config.round_ndigits,
            bids: SkipMap::new(),
            asks: SkipMap::new(),
            order_locations: DashMap::new(),
            order_history: DashMap::new(),
            agents: DashMap::new(),
            agent_index: RwLock::new(Vec::new()),
            ids: IdMinter::new(config.max_id_digits),
            clock: AtomicU64::new(0),
            current_price: AtomicCell::new(config.initial_price),
            transaction_ids: UuidGenerator::new(namespace),
            trade_listener: None,
        }
    }

    /// The symbol this book trades.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Fractional digits used for cash rounding on this book.
    pub fn round_ndigits(&self) -> u32 {
        self.round_ndigits
    }

    /// Last trade price, or the initial price if nothing traded yet.
    pub fn current_price(&self) -> Decimal {
        self.current_price.load()
    }

    /// Mint the next monotonic order timestamp.
    pub fn next_timestamp(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Mint a unique identifier of the given kind ("ORDER" or "AGENT").
    /// An unknown kind logs and returns an empty string.
    pub fn get_id(&self, kind: &str) -> String {
        self.ids.mint(kind)
    }

    /// Revert the book to a clean state: both sides, the order registry,
    /// the clock, and the last-trade price. The agent registry is kept;
    /// callers reset individual ledgers as needed (see
    /// [`AgentLedger::reset`]). Minted ids are never reused, so the id
    /// counters keep running.
    pub fn reset(&self, initial_price: Decimal) {
        while self.bids.pop_front().is_some() {}
        while self.asks.pop_front().is_some() {}
        self.order_locations.clear();
        self.order_history.clear();
        self.clock.store(0, Ordering::Relaxed);
        self.current_price.store(initial_price);
    }

    /// Like [`Self::reset`], but also drops every registered agent.
    pub fn reset_all(&self, initial_price: Decimal) {
        self.reset(initial_price);
        self.agents.clear();
        if let Ok(mut index) = self.agent_index.write() {
            index.clear();
        }
    }

    /// Register or replace an agent ledger.
    pub fn upsert_agent(&self, ledger: AgentLedger) {
        let id = ledger.id().clone();
        let existed = self.agents.insert(id.clone(), ledger).is_some();
        if !existed
            && let Ok(mut index) = self.agent_index.write()
        {
            index.push(id);
        }
    }

    /// Snapshot of an agent ledger by id.
    pub fn get_agent(&self, agent_id: &str) -> Option<AgentLedger> {
        self.agents.get(agent_id).map(|a| a.value().clone())
    }

    /// Run a closure against an agent ledger. Returns `None` (and logs)
    /// when the agent is unknown. The guard never escapes the closure.
    pub fn with_agent<R>(&self, agent_id: &str, f: impl FnOnce(&AgentLedger) -> R) -> Option<R> {
        match self.agents.get(agent_id) {
            Some(agent) => Some(f(agent.value())),
            None => {
                warn!(agent_id, "unknown agent");
                None
            }
        }
    }

    /// Run a closure against a mutable agent ledger. Returns `None` (and
    /// logs) when the agent is unknown.
    pub fn with_agent_mut<R>(
        &self,
        agent_id: &str,
        f: impl FnOnce(&mut AgentLedger) -> R,
    ) -> Option<R> {
        match self.agents.get_mut(agent_id) {
            Some(mut agent) => Some(f(agent.value_mut())),
            None => {
                warn!(agent_id, "unknown agent");
                None
            }
        }
    }

    /// Registered agent ids in registration order.
    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.agent_index
            .read()
            .map(|index| index.clone())
            .unwrap_or_default()
    }

    /// Number of registered agents.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// A copy of an order's current state from the registry.
    pub fn order(&self, order_id: &str) -> Option<Order> {
        self.order_history.get(order_id).map(|o| o.value().clone())
    }

    /// Owner of an order, if the order is known.
    pub fn order_agent(&self, order_id: &str) -> Option<AgentId> {
        self.order_history
            .get(order_id)
            .map(|o| o.value().agent_id.clone())
    }

    /// Whether an order currently rests in a priority structure.
    pub fn contains_order(&self, order_id: &str) -> bool {
        self.order_locations.contains_key(order_id)
    }

    /// Number of entries resting on a side.
    pub fn side_len(&self, side: Side) -> usize {
        self.side_map(side).len()
    }

    /// Write an order's current state into the registry and the owning
    /// agent's history, keeping both views identical.
    pub fn record_order(&self, order: &Order) {
        self.order_history
            .insert(order.id.clone(), order.clone());
        if self.agents.contains_key(&order.agent_id) {
            self.with_agent_mut(&order.agent_id, |a| a.record_order(order.clone()));
        } else {
            trace!(order_id = %order.id, agent_id = %order.agent_id, "order owner not registered");
        }
    }

    /// Insert an order into the registry and the side queue, keyed by
    /// `(price, timestamp)`. Re-adding an id that is already queued
    /// overwrites its entry; partial fills rely on this to re-queue the
    /// residual under the original key.
    pub fn add_order(&self, order: &Order) {
        self.record_order(order);
        let key = BookKey {
            price: order.price,
            seq: order.timestamp,
            side: order.side,
        };
        let entry = BookEntry {
            price: order.price,
            timestamp: order.timestamp,
            volume: order.volume,
            id: order.id.clone(),
        };
        trace!(order_id = %order.id, side = %order.side, price = %order.price, volume = order.volume, "queueing order");
        self.side_map(order.side).insert(key, entry);
        self.order_locations.insert(order.id.clone(), key);
    }

    /// Pop and return the highest-priority entry on a side, or `None` when
    /// the side is empty (not an error; callers end their loop).
    pub fn get_best(&self, side: Side) -> Option<BookEntry> {
        match self.side_map(side).pop_front() {
            Some(entry) => {
                let best = entry.value().clone();
                self.order_locations.remove(&best.id);
                Some(best)
            }
            None => {
                trace!(side = %side, "side is empty");
                None
            }
        }
    }

    /// The highest-priority entry on a side without removing it.
    pub fn peek_entry(&self, side: Side) -> Option<BookEntry> {
        self.side_map(side).front().map(|e| e.value().clone())
    }

    /// The `n` best entries on a side, in priority order, without mutation.
    pub fn peek_best(&self, side: Side, n: usize) -> Vec<BookEntry> {
        self.side_map(side)
            .iter()
            .take(n)
            .map(|e| e.value().clone())
            .collect()
    }

    /// Re-insert an entry that was popped but not consumed (the matcher's
    /// self-trade skip). The original key is reconstructed, so the entry
    /// keeps its queue position.
    pub(super) fn requeue_entry(&self, side: Side, entry: BookEntry) {
        let key = BookKey {
            price: entry.price,
            seq: entry.timestamp,
            side,
        };
        self.order_locations.insert(entry.id.clone(), key);
        self.side_map(side).insert(key, entry);
    }

    /// Cancel an order: transition to CANCELED, drop the queue entry if
    /// one rests, and return the reserved assets to the owner. Cancelling
    /// an unknown or already-terminal order is a logged no-op.
    pub fn cancel_order(&self, order_id: &str) {
        let Some(mut order) = self.order(order_id) else {
            warn!(order_id, "cancel for unknown order");
            return;
        };
        if order.status.is_terminal() {
            trace!(order_id, status = ?order.status, "cancel on terminal order ignored");
            return;
        }
        order.status = OrderStatus::Canceled;
        if let Some((_, key)) = self.order_locations.remove(order_id) {
            self.side_map(order.side).remove(&key);
        }
        self.return_assets(&order);
        self.record_order(&order);
    }

    /// Hand a cancelled or residual order's reserved assets back to its
    /// owner, symmetric with the reservation made at construction: a limit
    /// BID refunds `price × remaining volume`, an ASK restores the
    /// returnable lots. Market bids reserve nothing up front.
    pub fn return_assets(&self, order: &Order) {
        match order.side {
            Side::Bid => {
                let refund = if order.kind == OrderKind::Limit {
                    notional(order.price, order.volume, self.round_ndigits)
                } else {
                    Decimal::ZERO
                };
                self.with_agent_mut(&order.agent_id, |a| {
                    if refund > Decimal::ZERO {
                        a.update_cash(refund);
                    }
                    a.remove_active_bid(&order.id);
                });
            }
            Side::Ask => {
                let lots = order.returnable_shares();
                self.with_agent_mut(&order.agent_id, |a| {
                    for &(lot_price, lot_volume) in &lots {
                        a.update_holdings(lot_price, lot_volume);
                    }
                    a.remove_active_ask(&order.id);
                });
            }
        }
    }

    /// Mark an order fully filled: CLOSED, volume zero, registry updated.
    /// The queue entry is assumed already popped by the matcher.
    pub fn fill_order(&self, order: &mut Order) {
        order.volume = 0;
        order.status = OrderStatus::Closed;
        self.order_locations.remove(&order.id);
        self.record_order(order);
    }

    /// Decrement an order's remaining volume and re-queue the residual.
    /// The timestamp is untouched: price-time priority requires the
    /// re-queued residual to keep its original position.
    pub fn partial_fill_order(&self, order: &mut Order, vol_filled: u64) {
        order.volume = order.volume.saturating_sub(vol_filled);
        self.add_order(order);
    }

    /// Publish a fill: update the last-trade price to the maker's resting
    /// price and notify the trade listener, if one is attached.
    pub(super) fn publish_trade(
        &self,
        maker_order_id: &str,
        taker_order_id: &str,
        price: Decimal,
        volume: u64,
    ) {
        self.current_price.store(price);
        let trade = Trade {
            transaction_id: self.transaction_ids.next(),
            symbol: self.symbol.clone(),
            maker_order_id: maker_order_id.to_string(),
            taker_order_id: taker_order_id.to_string(),
            price,
            volume,
            timestamp: self.clock.load(Ordering::Relaxed),
        };
        trace!(maker = maker_order_id, taker = taker_order_id, price = %price, volume, "trade");
        if let Some(listener) = &self.trade_listener {
            listener(&trade);
        }
    }

    /// Best bid as `(price, volume of the front entry)`.
    pub fn best_bid(&self) -> Option<(Decimal, u64)> {
        self.peek_entry(Side::Bid).map(|e| (e.price, e.volume))
    }

    /// Best ask as `(price, volume of the front entry)`.
    pub fn best_ask(&self) -> Option<(Decimal, u64)> {
        self.peek_entry(Side::Ask).map(|e| (e.price, e.volume))
    }

    /// Aggregated top-`depth` view of both sides plus the current price.
    /// Asks ascend by price, bids descend; rows sum resting volume per
    /// price level.
    pub fn get_snapshot(&self, depth: usize) -> BookSnapshot {
        let now = current_time_secs();
        BookSnapshot {
            symbol_id: self.symbol.clone(),
            time_exchange: now,
            time_coinapi: now,
            current_price: self.current_price(),
            asks: self.aggregate_levels(Side::Ask, depth),
            bids: self.aggregate_levels(Side::Bid, depth),
        }
    }

    fn aggregate_levels(&self, side: Side, depth: usize) -> Vec<PriceLevel> {
        let mut levels: Vec<PriceLevel> = Vec::new();
        for entry in self.side_map(side).iter() {
            let e = entry.value();
            if let Some(level) = levels.last_mut()
                && level.price == e.price
            {
                level.size += e.volume;
                continue;
            }
            if levels.len() == depth {
                break;
            }
            levels.push(PriceLevel {
                price: e.price,
                size: e.volume,
            });
        }
        levels
    }

    fn side_map(&self, side: Side) -> &SkipMap<BookKey, BookEntry> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }
}
