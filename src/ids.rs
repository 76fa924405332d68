//! Monotonic identifier minting for orders and agents.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::error;

/// Kind tag accepted by [`IdMinter::mint`] for order identifiers.
pub const ID_KIND_ORDER: &str = "ORDER";
/// Kind tag accepted by [`IdMinter::mint`] for agent identifiers.
pub const ID_KIND_AGENT: &str = "AGENT";

/// Issues stable, monotonic, zero-padded identifiers.
///
/// Two independent counters back the "ORDER" and "AGENT" kinds; minted ids
/// are never reused within a process lifetime. The emitted form is a one
/// letter prefix (`O-` / `A-`) followed by the counter value zero-padded to
/// the configured width.
#[derive(Debug)]
pub struct IdMinter {
    width: usize,
    next_order: AtomicU64,
    next_agent: AtomicU64,
}

impl IdMinter {
    /// Create a minter whose numeric part is zero-padded to `width` digits.
    pub fn new(width: usize) -> Self {
        Self {
            width,
            next_order: AtomicU64::new(1),
            next_agent: AtomicU64::new(1),
        }
    }

    /// Mint the next identifier of the given kind ("ORDER" or "AGENT").
    ///
    /// An unknown kind is logged and yields an empty string; callers must
    /// not treat the empty string as a valid identifier.
    pub fn mint(&self, kind: &str) -> String {
        match kind {
            ID_KIND_ORDER => {
                let n = self.next_order.fetch_add(1, Ordering::Relaxed);
                format!("O-{n:0width$}", width = self.width)
            }
            ID_KIND_AGENT => {
                let n = self.next_agent.fetch_add(1, Ordering::Relaxed);
                format!("A-{n:0width$}", width = self.width)
            }
            other => {
                error!(kind = other, "invalid id kind");
                String::new()
            }
        }
    }
}
