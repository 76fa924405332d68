//! Shared helpers for the integration suite.

use std::sync::{Arc, Mutex};

use marketsim_rs::prelude::*;
use rust_decimal::Decimal;

/// Install a minimal subscriber so defensive warnings surface in test
/// output. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

/// Register a fresh agent ledger and return its id.
pub fn register_agent(book: &OrderBook, cash: Decimal) -> String {
    let id = book.get_id("AGENT");
    book.upsert_agent(AgentLedger::with_round_ndigits(
        id.clone(),
        cash,
        book.round_ndigits(),
    ));
    id
}

/// Rest a limit order and track it in the owner's active set.
pub fn rest_limit(
    book: &OrderBook,
    agent_id: &str,
    price: Decimal,
    volume: u64,
    side: Side,
) -> String {
    let id = book.get_id("ORDER");
    let order = Order::new(
        id.clone(),
        agent_id.to_string(),
        price,
        volume,
        side,
        OrderKind::Limit,
        book.next_timestamp(),
    );
    match side {
        Side::Ask => {
            book.with_agent_mut(agent_id, |a| a.upsert_active_ask(&order.id));
        }
        Side::Bid => {
            book.with_agent_mut(agent_id, |a| a.upsert_active_bid(&order.id));
        }
    }
    book.add_order(&order);
    id
}

/// Build a market order recorded in its owner's history.
pub fn market_order(book: &OrderBook, agent_id: &str, volume: u64, side: Side) -> Order {
    let order = Order::new(
        book.get_id("ORDER"),
        agent_id.to_string(),
        MARKET_PRICE_SENTINEL,
        volume,
        side,
        OrderKind::Market,
        book.next_timestamp(),
    );
    book.record_order(&order);
    order
}

/// Attach a listener that appends every fill to a shared log and return
/// the log handle.
pub fn capture_trades(book: &mut OrderBook) -> Arc<Mutex<Vec<Trade>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    book.trade_listener = Some(Arc::new(move |trade: &Trade| {
        if let Ok(mut trades) = sink.lock() {
            trades.push(trade.clone());
        }
    }));
    log
}

/// Assert the cross-structure consistency rules that must hold after every
/// tick.
pub fn assert_book_invariants(book: &OrderBook, trades: &Arc<Mutex<Vec<Trade>>>) {
    // Ledgers: non-negative cash, strictly positive lot volumes.
    for agent_id in book.agent_ids() {
        let ledger = book.get_agent(&agent_id).expect("registered agent");
        assert!(
            ledger.cash() >= Decimal::ZERO,
            "agent {agent_id} has negative cash {}",
            ledger.cash()
        );
        for (&price, &volume) in ledger.holdings() {
            assert!(volume > 0, "agent {agent_id} holds empty lot at {price}");
        }

        // Active sets point at OPEN orders resting in the matching side.
        for order_id in ledger.active_asks() {
            let order = book.order(order_id).expect("active ask in registry");
            assert_eq!(order.status, OrderStatus::Open);
            assert_eq!(order.side, Side::Ask);
            assert!(book.contains_order(order_id), "active ask {order_id} not queued");
        }
        for order_id in ledger.active_bids() {
            let order = book.order(order_id).expect("active bid in registry");
            assert_eq!(order.status, OrderStatus::Open);
            assert_eq!(order.side, Side::Bid);
            assert!(book.contains_order(order_id), "active bid {order_id} not queued");
        }
    }

    // Every queued entry is backed by an OPEN registry order.
    for side in [Side::Ask, Side::Bid] {
        for entry in book.peek_best(side, book.side_len(side)) {
            let order = book.order(&entry.id).expect("queued order in registry");
            assert_eq!(
                order.status,
                OrderStatus::Open,
                "queued order {} is {:?}",
                entry.id,
                order.status
            );
        }
    }

    // The current price is the last executed fill's resting price.
    if let Ok(trades) = trades.lock()
        && let Some(last) = trades.last()
    {
        assert_eq!(book.current_price(), last.price);
    }
}

/// Total shares held by agents plus shares committed to resting asks.
/// Conserved across any sequence of matches and cancellations.
pub fn total_shares_in_system(book: &OrderBook) -> u64 {
    let held: u64 = book
        .agent_ids()
        .iter()
        .filter_map(|id| book.get_agent(id))
        .map(|a| a.total_shares())
        .sum();
    let resting: u64 = book
        .peek_best(Side::Ask, book.side_len(Side::Ask))
        .iter()
        .map(|e| e.volume)
        .sum();
    held + resting
}
