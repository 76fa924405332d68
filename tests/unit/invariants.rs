//! Invariant sweeps over seeded noise simulations.

use std::sync::{Arc, Mutex};

use marketsim_rs::prelude::*;
use rust_decimal_macros::dec;

use crate::common::{assert_book_invariants, capture_trades, init_tracing, total_shares_in_system};

fn seeded_sim(num_agents: u64) -> (Simulation, Arc<Mutex<Vec<Trade>>>) {
    init_tracing();
    let mut book = OrderBook::new(dec!(1.00));
    let trades = capture_trades(&mut book);
    let mut sim = Simulation::new(book);

    // One deep-pocketed maker so the noise population has liquidity to
    // trade against from the first tick.
    let maker = NoiseAgent::register(sim.book(), dec!(10_000), 1234);
    sim.book()
        .with_agent_mut(maker.id(), |a| a.update_holdings(dec!(1.00), 100_000));
    sim.register(Box::new(maker));

    for seed in 0..num_agents {
        let agent = NoiseAgent::register(sim.book(), dec!(100), seed);
        sim.book()
            .with_agent_mut(agent.id(), |a| a.update_holdings(dec!(1.00), 50));
        sim.register(Box::new(agent));
    }

    (sim, trades)
}

#[test]
fn invariants_hold_across_a_noisy_run() {
    let (mut sim, trades) = seeded_sim(25);
    let initial_shares = total_shares_in_system(sim.book());

    for _ in 0..30 {
        sim.tick();
        assert_book_invariants(sim.book(), &trades);
        assert_eq!(
            total_shares_in_system(sim.book()),
            initial_shares,
            "shares leaked at tick {}",
            sim.tick_count()
        );
    }

    // The population is active enough to actually trade.
    assert!(!trades.lock().unwrap().is_empty());
}

#[test]
fn current_price_is_initial_before_any_trade() {
    let book = OrderBook::new(dec!(1.00));
    assert_eq!(book.current_price(), dec!(1.00));
}

#[test]
fn fixed_seeds_replay_the_same_trade_sequence() {
    let (mut first, first_trades) = seeded_sim(15);
    let (mut second, second_trades) = seeded_sim(15);

    first.run(20);
    second.run(20);

    let first_trades = first_trades.lock().unwrap();
    let second_trades = second_trades.lock().unwrap();
    assert!(!first_trades.is_empty());
    assert_eq!(first_trades.len(), second_trades.len());
    for (a, b) in first_trades.iter().zip(second_trades.iter()) {
        assert_eq!(a.transaction_id, b.transaction_id);
        assert_eq!(a.maker_order_id, b.maker_order_id);
        assert_eq!(a.taker_order_id, b.taker_order_id);
        assert_eq!(a.price, b.price);
        assert_eq!(a.volume, b.volume);
        assert_eq!(a.timestamp, b.timestamp);
    }
}

#[test]
fn snapshots_between_ticks_are_consistent_with_the_book() {
    let (mut sim, _) = seeded_sim(10);
    sim.run(10);

    let snap = sim.snapshot(10);
    assert_eq!(snap.current_price, sim.book().current_price());
    for window in snap.asks.windows(2) {
        assert!(window[0].price < window[1].price, "asks must ascend");
    }
    for window in snap.bids.windows(2) {
        assert!(window[0].price > window[1].price, "bids must descend");
    }
}
