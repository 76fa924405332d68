//! The simulation loop: one book, many agents, cooperative ticks.

use tracing::trace;

use crate::agent::Agent;
use crate::book::{BookSnapshot, OrderBook};

/// Drives a set of registered agents against a shared order book.
///
/// Single-threaded and cooperative: each tick dispatches every agent
/// exactly once, in registration order, and an agent's entire book
/// mutation runs to completion before the next agent executes. With fixed
/// agent seeds and a fixed registration order the produced trade sequence
/// is identical across runs.
pub struct Simulation {
    book: OrderBook,
    agents: Vec<Box<dyn Agent>>,
    tick_count: u64,
}

impl Simulation {
    /// Create a simulation around an existing book.
    pub fn new(book: OrderBook) -> Self {
        Self {
            book,
            agents: Vec::new(),
            tick_count: 0,
        }
    }

    /// Register a strategy. Its ledger must already exist in the book
    /// under the same id.
    pub fn register(&mut self, agent: Box<dyn Agent>) {
        self.agents.push(agent);
    }

    /// The shared book.
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Number of registered strategies.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Ticks executed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Run one tick: every agent acts exactly once, in registration order.
    pub fn tick(&mut self) {
        for agent in &mut self.agents {
            agent.act(&self.book);
        }
        self.tick_count += 1;
        trace!(tick = self.tick_count, price = %self.book.current_price(), "tick complete");
    }

    /// Run `n` ticks back to back.
    pub fn run(&mut self, n: u64) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Read-only depth view; safe to call between ticks.
    pub fn snapshot(&self, depth: usize) -> BookSnapshot {
        self.book.get_snapshot(depth)
    }
}
