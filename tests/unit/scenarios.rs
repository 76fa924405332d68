//! End-to-end matching scenarios exercising the full engine surface.

use marketsim_rs::prelude::*;
use rust_decimal_macros::dec;

use crate::common::{market_order, register_agent, rest_limit};

fn two_ask_book() -> (OrderBook, String, String, String, String) {
    let book = OrderBook::new(dec!(1.00));
    let a1 = register_agent(&book, dec!(100));
    let a2 = register_agent(&book, dec!(100));
    let ao1 = rest_limit(&book, &a1, dec!(1.10), 10, Side::Ask);
    let ao2 = rest_limit(&book, &a2, dec!(1.15), 10, Side::Ask);
    (book, a1, a2, ao1, ao2)
}

#[test]
fn market_bid_partial_fill_across_two_asks() {
    let (book, _, _, ao1, ao2) = two_ask_book();
    let buyer = register_agent(&book, dec!(100));
    let mut order = market_order(&book, &buyer, 25, Side::Bid);

    MatchMaker::new().match_market_bid(&book, &mut order);

    let ledger = book.get_agent(&buyer).unwrap();
    assert_eq!(ledger.cash(), dec!(77.50));
    assert_eq!(ledger.holdings()[&dec!(1.10)], 10);
    assert_eq!(ledger.holdings()[&dec!(1.15)], 10);

    let final_order = book.order(&order.id).unwrap();
    assert_eq!(final_order.status, OrderStatus::Canceled);
    assert_eq!(final_order.volume, 5);
    assert_eq!(book.order(&ao1).unwrap().status, OrderStatus::Closed);
    assert_eq!(book.order(&ao2).unwrap().status, OrderStatus::Closed);
}

#[test]
fn market_bid_exact_fill_on_first_ask() {
    let (book, _, _, ao1, ao2) = two_ask_book();
    let buyer = register_agent(&book, dec!(100));
    let mut order = market_order(&book, &buyer, 10, Side::Bid);

    MatchMaker::new().match_market_bid(&book, &mut order);

    let ledger = book.get_agent(&buyer).unwrap();
    assert_eq!(ledger.cash(), dec!(89.00));
    assert_eq!(ledger.holdings()[&dec!(1.10)], 10);

    assert_eq!(book.order(&order.id).unwrap().status, OrderStatus::Closed);
    assert_eq!(book.order(&ao1).unwrap().status, OrderStatus::Closed);
    let second = book.order(&ao2).unwrap();
    assert_eq!(second.status, OrderStatus::Open);
    assert_eq!(second.volume, 10);
}

#[test]
fn limit_bid_partial_fill_with_residual() {
    let (book, _, _, ao1, ao2) = two_ask_book();
    let buyer = register_agent(&book, dec!(100));

    // Construction reserves the full cost: 1.20 * 25 = 30.00.
    book.with_agent_mut(&buyer, |a| a.update_cash(dec!(-30.00)));
    let mut order = Order::new(
        book.get_id("ORDER"),
        buyer.clone(),
        dec!(1.20),
        25,
        Side::Bid,
        OrderKind::Limit,
        book.next_timestamp(),
    );
    book.record_order(&order);

    MatchMaker::new().match_limit_bid(&book, &mut order);

    let ledger = book.get_agent(&buyer).unwrap();
    assert_eq!(ledger.cash(), dec!(70.00));
    assert_eq!(ledger.holdings()[&dec!(1.10)], 10);
    assert_eq!(ledger.holdings()[&dec!(1.15)], 10);
    assert!(ledger.active_bids().contains(&order.id));

    let residual = book.order(&order.id).unwrap();
    assert_eq!(residual.status, OrderStatus::Open);
    assert_eq!(residual.volume, 5);
    assert_eq!(residual.price, dec!(1.20));
    assert_eq!(book.best_bid(), Some((dec!(1.20), 5)));
    assert_eq!(book.order(&ao1).unwrap().status, OrderStatus::Closed);
    assert_eq!(book.order(&ao2).unwrap().status, OrderStatus::Closed);

    // The reserved 6.00 still sits inside the residual: cancelling the
    // order refunds exactly that.
    book.cancel_order(&order.id);
    assert_eq!(book.get_agent(&buyer).unwrap().cash(), dec!(76.00));
}

#[test]
fn market_ask_partial_fill_across_two_bids_then_cancel() {
    let book = OrderBook::new(dec!(1.00));
    let b1 = register_agent(&book, dec!(100));
    let b2 = register_agent(&book, dec!(100));
    let bo1 = rest_limit(&book, &b1, dec!(0.90), 10, Side::Bid);
    let bo2 = rest_limit(&book, &b2, dec!(0.85), 10, Side::Bid);

    let seller = register_agent(&book, dec!(0));
    book.with_agent_mut(&seller, |a| a.update_holdings(dec!(1.00), 25));
    let reserved = book
        .with_agent_mut(&seller, |a| a.remove_holdings(25))
        .unwrap();
    assert_eq!(reserved, vec![(dec!(1.00), 25)]);

    let mut order = market_order(&book, &seller, 25, Side::Ask).with_reserved_shares(reserved);
    book.record_order(&order);
    MatchMaker::new().match_market_ask(&book, &mut order);

    let ledger = book.get_agent(&seller).unwrap();
    assert_eq!(ledger.cash(), dec!(17.50));
    assert_eq!(ledger.holdings()[&dec!(1.00)], 5);
    assert_eq!(ledger.total_shares(), 5);

    let final_order = book.order(&order.id).unwrap();
    assert_eq!(final_order.status, OrderStatus::Canceled);
    assert_eq!(book.order(&bo1).unwrap().status, OrderStatus::Closed);
    assert_eq!(book.order(&bo2).unwrap().status, OrderStatus::Closed);
}

#[test]
fn cancel_limit_ask_after_partial_fill_returns_cheapest_lots() {
    let book = OrderBook::new(dec!(1.00));
    let bidder = register_agent(&book, dec!(100));
    rest_limit(&book, &bidder, dec!(0.90), 10, Side::Bid);

    let seller = register_agent(&book, dec!(0));
    book.with_agent_mut(&seller, |a| {
        a.update_holdings(dec!(1.10), 10);
        a.update_holdings(dec!(1.05), 15);
    });
    let reserved = book
        .with_agent_mut(&seller, |a| a.remove_holdings(25))
        .unwrap();
    assert_eq!(reserved, vec![(dec!(1.05), 15), (dec!(1.10), 10)]);

    let mut order = Order::new(
        book.get_id("ORDER"),
        seller.clone(),
        dec!(0.80),
        25,
        Side::Ask,
        OrderKind::Limit,
        book.next_timestamp(),
    )
    .with_reserved_shares(reserved);
    book.record_order(&order);
    MatchMaker::new().match_limit_ask(&book, &mut order);

    // One bid filled ten shares; fifteen rest.
    let resting = book.order(&order.id).unwrap();
    assert_eq!(resting.status, OrderStatus::Open);
    assert_eq!(resting.volume, 15);

    book.cancel_order(&order.id);

    // Returnable lots are drawn cheapest-first: all fifteen come back from
    // the 1.05 lot, the 1.10 lot stays consumed.
    let ledger = book.get_agent(&seller).unwrap();
    assert_eq!(ledger.holdings()[&dec!(1.05)], 15);
    assert!(!ledger.holdings().contains_key(&dec!(1.10)));
    assert_eq!(ledger.cash(), dec!(9.00));
    assert_eq!(book.order(&order.id).unwrap().status, OrderStatus::Canceled);
}

#[test]
fn self_trade_prevention_matches_next_best_counterparty() {
    let book = OrderBook::new(dec!(1.00));
    let actor = register_agent(&book, dec!(100));
    let other = register_agent(&book, dec!(100));
    let own_ask = rest_limit(&book, &actor, dec!(1.00), 10, Side::Ask);
    let other_ask = rest_limit(&book, &other, dec!(1.05), 10, Side::Ask);

    let mut order = market_order(&book, &actor, 10, Side::Bid);
    MatchMaker::new().match_market_bid(&book, &mut order);

    let ledger = book.get_agent(&actor).unwrap();
    assert_eq!(ledger.holdings()[&dec!(1.05)], 10);
    assert_eq!(book.order(&other_ask).unwrap().status, OrderStatus::Closed);
    assert_eq!(book.order(&own_ask).unwrap().status, OrderStatus::Open);
    assert!(book.contains_order(&own_ask));
}

#[test]
fn self_trade_prevention_without_counterparty_cancels() {
    let book = OrderBook::new(dec!(1.00));
    let actor = register_agent(&book, dec!(100));
    let own_ask = rest_limit(&book, &actor, dec!(1.00), 10, Side::Ask);

    let mut order = market_order(&book, &actor, 10, Side::Bid);
    MatchMaker::new().match_market_bid(&book, &mut order);

    assert_eq!(book.order(&order.id).unwrap().status, OrderStatus::Canceled);
    assert!(book.contains_order(&own_ask));
    assert_eq!(book.get_agent(&actor).unwrap().cash(), dec!(100));
}
