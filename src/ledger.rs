//! Per-agent bookkeeping: cash, inventory lots, active orders, history.

use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::warn;

use crate::config::DEFAULT_ROUND_NDIGITS;
use crate::order::Order;
use crate::utils::round_cash;
use crate::{AgentId, OrderId};

/// Pure bookkeeping for one trading agent.
///
/// Holdings are kept as lots: a map from acquisition price to share count.
/// A lot whose volume reaches zero is removed. Cash is rounded half-to-even
/// to the configured digit count on every update; it never goes negative in
/// a well-ordered matching run.
#[derive(Debug, Clone)]
pub struct AgentLedger {
    id: AgentId,
    cash: Decimal,
    holdings: BTreeMap<Decimal, u64>,
    active_asks: BTreeSet<OrderId>,
    active_bids: BTreeSet<OrderId>,
    history: HashMap<OrderId, Order>,
    round_ndigits: u32,
}

impl AgentLedger {
    /// Create a ledger with the given starting cash.
    pub fn new(id: AgentId, cash: Decimal) -> Self {
        Self::with_round_ndigits(id, cash, DEFAULT_ROUND_NDIGITS)
    }

    /// Create a ledger rounding cash to `round_ndigits` fractional digits.
    pub fn with_round_ndigits(id: AgentId, cash: Decimal, round_ndigits: u32) -> Self {
        Self {
            id,
            cash: round_cash(cash, round_ndigits),
            holdings: BTreeMap::new(),
            active_asks: BTreeSet::new(),
            active_bids: BTreeSet::new(),
            history: HashMap::new(),
            round_ndigits,
        }
    }

    /// The agent's identifier.
    pub fn id(&self) -> &AgentId {
        &self.id
    }

    /// Liquid cash currently available.
    pub fn cash(&self) -> Decimal {
        self.cash
    }

    /// The lot map: acquisition price to share count.
    pub fn holdings(&self) -> &BTreeMap<Decimal, u64> {
        &self.holdings
    }

    /// Identifiers of this agent's ask orders resting in the book.
    pub fn active_asks(&self) -> &BTreeSet<OrderId> {
        &self.active_asks
    }

    /// Identifiers of this agent's bid orders resting in the book.
    pub fn active_bids(&self) -> &BTreeSet<OrderId> {
        &self.active_bids
    }

    /// Every order this agent ever originated, by id.
    pub fn history(&self) -> &HashMap<OrderId, Order> {
        &self.history
    }

    /// Record (or overwrite) an originated order in the history.
    pub fn record_order(&mut self, order: Order) {
        self.history.insert(order.id.clone(), order);
    }

    /// Apply a cash delta; negative amounts decrease cash. The delta is
    /// rounded half-to-even before application.
    pub fn update_cash(&mut self, amount: Decimal) {
        self.cash += round_cash(amount, self.round_ndigits);
        if self.cash < Decimal::ZERO {
            warn!(agent = %self.id, cash = %self.cash, "agent cash went negative");
        }
    }

    /// Add `volume` shares to the lot at `price`, creating it if missing.
    pub fn update_holdings(&mut self, price: Decimal, volume: u64) {
        if volume == 0 {
            return;
        }
        *self.holdings.entry(price).or_insert(0) += volume;
    }

    /// Remove shares from the lot at `price`; `volume == 0` removes the
    /// whole lot. A lot drained to zero is dropped. Missing lots are logged
    /// and ignored.
    pub fn remove_holding(&mut self, price: Decimal, volume: u64) {
        let Some(&held) = self.holdings.get(&price) else {
            warn!(agent = %self.id, price = %price, "no holding at price");
            return;
        };
        if volume == 0 || held <= volume {
            self.holdings.remove(&price);
        } else {
            self.holdings.insert(price, held - volume);
        }
    }

    /// Withdraw `volume` shares, drawing from the lowest-priced lots first,
    /// and return exactly which lots were taken.
    ///
    /// This is the inventory reservation used when constructing an ASK: the
    /// returned list becomes the order's `reserved_shares`. Asking for more
    /// than is held drains the holdings and returns everything.
    pub fn remove_holdings(&mut self, volume: u64) -> Vec<(Decimal, u64)> {
        let mut remaining = volume;
        let mut taken = Vec::new();
        for (&price, &held) in self.holdings.iter() {
            if remaining == 0 {
                break;
            }
            let take = held.min(remaining);
            taken.push((price, take));
            remaining -= take;
        }
        for &(price, take) in &taken {
            self.remove_holding(price, take);
        }
        taken
    }

    /// The most valuable lot as `(price, volume)`, if any shares are held.
    pub fn highest_value_share(&self) -> Option<(Decimal, u64)> {
        self.holdings.iter().next_back().map(|(&p, &v)| (p, v))
    }

    /// The least valuable lot as `(price, volume)`, if any shares are held.
    pub fn lowest_value_share(&self) -> Option<(Decimal, u64)> {
        self.holdings.iter().next().map(|(&p, &v)| (p, v))
    }

    /// Total shares held across all lots.
    pub fn total_shares(&self) -> u64 {
        self.holdings.values().sum()
    }

    /// Track an ask order as resting in the book.
    pub fn upsert_active_ask(&mut self, order_id: &str) {
        self.active_asks.insert(order_id.to_string());
    }

    /// Stop tracking an ask order.
    pub fn remove_active_ask(&mut self, order_id: &str) {
        self.active_asks.remove(order_id);
    }

    /// Track a bid order as resting in the book.
    pub fn upsert_active_bid(&mut self, order_id: &str) {
        self.active_bids.insert(order_id.to_string());
    }

    /// Stop tracking a bid order.
    pub fn remove_active_bid(&mut self, order_id: &str) {
        self.active_bids.remove(order_id);
    }

    /// Clear holdings, active orders, and history, restoring `cash`.
    /// Training loops use this to reuse a registry across episodes.
    pub fn reset(&mut self, cash: Decimal) {
        self.cash = round_cash(cash, self.round_ndigits);
        self.holdings.clear();
        self.active_asks.clear();
        self.active_bids.clear();
        self.history.clear();
    }
}
