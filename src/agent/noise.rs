//! Randomized liquidity: an agent that trades noise.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Beta, Distribution};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use tracing::{error, trace};

use crate::AgentId;
use crate::agent::Agent;
use crate::book::{MatchMaker, OrderBook};
use crate::ids::{ID_KIND_AGENT, ID_KIND_ORDER};
use crate::ledger::AgentLedger;
use crate::order::{MARKET_PRICE_SENTINEL, Order, OrderKind, Side};
use crate::utils::{notional, round_cash};

/// Beta distribution shape: hugs the current price without reaching it,
/// with most mass a little away from it.
const BETA_A: f64 = 2.0;
const BETA_B: f64 = 5.0;

/// Parameters of the variance envelope: overall height, power-law decay
/// against price, and the log-periodic wiggle.
const VARIANCE_SCALE: f64 = 0.05;
const VARIANCE_DECAY: f64 = 0.25;
const VARIANCE_AMPLITUDE: f64 = 0.10;

/// Lowest price a perturbed bid can reach.
const MIN_BID_PRICE: f64 = 1e-6;

/// Largest relative deviation the sampler can produce from the current
/// price, used by construction-time sanity checks.
fn max_variance(price: f64) -> f64 {
    VARIANCE_SCALE
        * price.powf(-VARIANCE_DECAY)
        * (1.0 + VARIANCE_AMPLITUDE * (std::f64::consts::TAU * price.ln()).sin())
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum NoiseAction {
    Hold,
    Bid,
    Ask,
    Cancel,
}

/// An agent that makes random actions bounded by its holdings, cash, and
/// active orders.
///
/// Each tick it picks uniformly among the currently available actions
/// (HOLD always; BID with enough cash for one share; ASK with inventory;
/// CANCEL with at least one active order), then uniformly between market
/// and limit execution. Limit prices come from a Beta(2, 5) perturbation
/// of the current price so orders cluster near it without degenerating
/// onto it. Seeded explicitly: a fixed seed and registration order replay
/// the same trade sequence.
#[derive(Clone)]
pub struct NoiseAgent {
    agent_id: AgentId,
    rng: StdRng,
    beta: Beta<f64>,
    matchmaker: MatchMaker,
}

impl NoiseAgent {
    /// Create an agent acting for an already-registered ledger.
    pub fn new(agent_id: AgentId, seed: u64) -> Self {
        Self {
            agent_id,
            rng: StdRng::seed_from_u64(seed),
            beta: Beta::new(BETA_A, BETA_B).expect("Beta(2, 5) parameters are valid"),
            matchmaker: MatchMaker::new(),
        }
    }

    /// Mint an agent id, register a fresh ledger with `cash`, and return
    /// the strategy driving it.
    pub fn register(book: &OrderBook, cash: Decimal, seed: u64) -> Self {
        let agent_id = book.get_id(ID_KIND_AGENT);
        book.upsert_agent(AgentLedger::with_round_ndigits(
            agent_id.clone(),
            cash,
            book.round_ndigits(),
        ));
        Self::new(agent_id, seed)
    }

    fn choose_action(
        &mut self,
        cash: Decimal,
        total_shares: u64,
        has_active: bool,
        current_price: Decimal,
    ) -> NoiseAction {
        let mut available = vec![NoiseAction::Hold];
        if cash >= current_price {
            available.push(NoiseAction::Bid);
        }
        if total_shares > 0 {
            available.push(NoiseAction::Ask);
        }
        if has_active {
            available.push(NoiseAction::Cancel);
        }
        available[self.rng.gen_range(0..available.len())]
    }

    /// Perturbed limit price: below the current price for bids, above it
    /// for asks, rounded to the book's cash precision.
    fn beta_price(&mut self, current_price: Decimal, side: Side, ndigits: u32) -> Decimal {
        let p = current_price.to_f64().unwrap_or(1.0);
        let x = self.beta.sample(&mut self.rng);
        let variance = max_variance(p);
        let raw = match side {
            Side::Bid => (p * (1.0 - x * variance)).max(MIN_BID_PRICE),
            Side::Ask => p * (1.0 + x * variance),
        };
        let price = Decimal::from_f64(raw).unwrap_or(current_price);
        round_cash(price, ndigits)
    }

    fn execute_market_bid(&mut self, book: &OrderBook, cash: Decimal, current_price: Decimal) {
        let max_purchasable = (cash / current_price)
            .floor()
            .to_u64()
            .unwrap_or(0);
        if max_purchasable == 0 {
            return;
        }
        let volume = self.rng.gen_range(1..=max_purchasable);
        let mut order = Order::new(
            book.get_id(ID_KIND_ORDER),
            self.agent_id.clone(),
            MARKET_PRICE_SENTINEL,
            volume,
            Side::Bid,
            OrderKind::Market,
            book.next_timestamp(),
        );
        book.record_order(&order);
        self.matchmaker.match_market_bid(book, &mut order);
    }

    fn execute_limit_bid(&mut self, book: &OrderBook, cash: Decimal, current_price: Decimal) {
        let price = self.beta_price(current_price, Side::Bid, book.round_ndigits());
        let max_purchasable = (cash / price).floor().to_u64().unwrap_or(0);
        if max_purchasable == 0 {
            return;
        }
        let volume = self.rng.gen_range(1..=max_purchasable);
        // Reserve the full cost up front; fills never debit again and a
        // cancel refunds price times the remaining volume.
        let total_value = notional(price, volume, book.round_ndigits());
        book.with_agent_mut(&self.agent_id, |a| a.update_cash(-total_value));
        let mut order = Order::new(
            book.get_id(ID_KIND_ORDER),
            self.agent_id.clone(),
            price,
            volume,
            Side::Bid,
            OrderKind::Limit,
            book.next_timestamp(),
        );
        book.record_order(&order);
        self.matchmaker.match_limit_bid(book, &mut order);
    }

    fn execute_market_ask(&mut self, book: &OrderBook, total_shares: u64) {
        let volume = self.rng.gen_range(1..=total_shares);
        let reserved = book
            .with_agent_mut(&self.agent_id, |a| a.remove_holdings(volume))
            .unwrap_or_default();
        let mut order = Order::new(
            book.get_id(ID_KIND_ORDER),
            self.agent_id.clone(),
            MARKET_PRICE_SENTINEL,
            volume,
            Side::Ask,
            OrderKind::Market,
            book.next_timestamp(),
        )
        .with_reserved_shares(reserved);
        book.record_order(&order);
        self.matchmaker.match_market_ask(book, &mut order);
    }

    fn execute_limit_ask(&mut self, book: &OrderBook, total_shares: u64, current_price: Decimal) {
        let price = self.beta_price(current_price, Side::Ask, book.round_ndigits());
        let volume = self.rng.gen_range(1..=total_shares);
        let reserved = book
            .with_agent_mut(&self.agent_id, |a| a.remove_holdings(volume))
            .unwrap_or_default();
        let mut order = Order::new(
            book.get_id(ID_KIND_ORDER),
            self.agent_id.clone(),
            price,
            volume,
            Side::Ask,
            OrderKind::Limit,
            book.next_timestamp(),
        )
        .with_reserved_shares(reserved);
        book.record_order(&order);
        self.matchmaker.match_limit_ask(book, &mut order);
    }

    fn execute_cancel(&mut self, book: &OrderBook) {
        let Some((asks, bids)) = book.with_agent(&self.agent_id, |a| {
            (a.active_asks().clone(), a.active_bids().clone())
        }) else {
            return;
        };

        let mut sides = Vec::new();
        if !asks.is_empty() {
            sides.push(Side::Ask);
        }
        if !bids.is_empty() {
            sides.push(Side::Bid);
        }
        if sides.is_empty() {
            return;
        }
        let side = sides[self.rng.gen_range(0..sides.len())];

        let pool: Vec<&String> = match side {
            Side::Ask => asks.iter().collect(),
            Side::Bid => bids.iter().collect(),
        };
        let chosen = pool[self.rng.gen_range(0..pool.len())].clone();
        trace!(agent = %self.agent_id, order_id = %chosen, "cancelling order");
        book.cancel_order(&chosen);
    }
}

impl Agent for NoiseAgent {
    fn id(&self) -> &AgentId {
        &self.agent_id
    }

    fn act(&mut self, book: &OrderBook) {
        let Some((cash, total_shares, has_active)) = book.with_agent(&self.agent_id, |a| {
            (
                a.cash(),
                a.total_shares(),
                !a.active_asks().is_empty() || !a.active_bids().is_empty(),
            )
        }) else {
            error!(agent = %self.agent_id, "noise agent has no registered ledger");
            return;
        };
        let current_price = book.current_price();

        let action = self.choose_action(cash, total_shares, has_active, current_price);
        let kind = if self.rng.gen_bool(0.5) {
            OrderKind::Market
        } else {
            OrderKind::Limit
        };

        match (action, kind) {
            (NoiseAction::Bid, OrderKind::Market) => {
                self.execute_market_bid(book, cash, current_price)
            }
            (NoiseAction::Bid, OrderKind::Limit) => {
                self.execute_limit_bid(book, cash, current_price)
            }
            (NoiseAction::Ask, OrderKind::Market) => self.execute_market_ask(book, total_shares),
            (NoiseAction::Ask, OrderKind::Limit) => {
                self.execute_limit_ask(book, total_shares, current_price)
            }
            (NoiseAction::Cancel, _) => self.execute_cancel(book),
            (NoiseAction::Hold, _) => {}
        }
    }

    fn clone_agent(&self) -> Box<dyn Agent> {
        Box::new(self.clone())
    }
}
