//! An agent that only takes liquidity with market orders.

use rust_decimal::Decimal;
use tracing::warn;

use crate::AgentId;
use crate::agent::Agent;
use crate::book::OrderBook;
use crate::ids::{ID_KIND_AGENT, ID_KIND_ORDER};
use crate::ledger::AgentLedger;
use crate::order::{MARKET_PRICE_SENTINEL, Order, OrderKind, Side};

/// Market-order-only agent.
///
/// Used by training drivers that decide the action themselves: the driver
/// calls [`TakerAgent::make_market_bid`] / [`TakerAgent::make_market_ask`]
/// to construct a ready order, then hands it to the matchmaker. Under the
/// simulation loop it holds.
#[derive(Debug, Clone)]
pub struct TakerAgent {
    agent_id: AgentId,
}

impl TakerAgent {
    /// Create a taker acting for an already-registered ledger.
    pub fn new(agent_id: AgentId) -> Self {
        Self { agent_id }
    }

    /// Mint an agent id, register a fresh ledger with `cash`, and return
    /// the taker driving it.
    pub fn register(book: &OrderBook, cash: Decimal) -> Self {
        let agent_id = book.get_id(ID_KIND_AGENT);
        book.upsert_agent(AgentLedger::with_round_ndigits(
            agent_id.clone(),
            cash,
            book.round_ndigits(),
        ));
        Self::new(agent_id)
    }

    /// Construct a market BID for `volume` shares and record it in the
    /// owner's history. Cash is debited by the matcher, not here.
    pub fn make_market_bid(&self, book: &OrderBook, volume: u64) -> Order {
        let order = Order::new(
            book.get_id(ID_KIND_ORDER),
            self.agent_id.clone(),
            MARKET_PRICE_SENTINEL,
            volume,
            Side::Bid,
            OrderKind::Market,
            book.next_timestamp(),
        );
        book.record_order(&order);
        order
    }

    /// Construct a market ASK for `volume` shares, withdrawing the lots
    /// from the ledger into the order's reservation.
    pub fn make_market_ask(&self, book: &OrderBook, volume: u64) -> Order {
        let reserved = book
            .with_agent_mut(&self.agent_id, |a| a.remove_holdings(volume))
            .unwrap_or_else(|| {
                warn!(agent = %self.agent_id, "market ask without a registered ledger");
                Vec::new()
            });
        let order = Order::new(
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
        order
    }
}

impl Agent for TakerAgent {
    fn id(&self) -> &AgentId {
        &self.agent_id
    }

    fn act(&mut self, _book: &OrderBook) {
        // Externally driven; nothing to do on a plain tick.
    }

    fn clone_agent(&self) -> Box<dyn Agent> {
        Box::new(self.clone())
    }
}
