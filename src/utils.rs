//! Shared helpers: wall-clock observation times, deterministic transaction
//! id generation, and the cash rounding rule.

use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Current wall-clock time in seconds since the Unix epoch.
///
/// Only used for snapshot observation timestamps; engine-internal ordering
/// runs on the book's monotonic counter.
pub fn current_time_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Generator for unique transaction identifiers.
///
/// Produces UUIDv5 values from a fixed namespace and a monotonically
/// increasing counter, so a book constructed for the same symbol emits the
/// same transaction id sequence on every run.
#[derive(Debug)]
pub struct UuidGenerator {
    namespace: Uuid,
    counter: AtomicU64,
}

impl UuidGenerator {
    /// Create a new generator scoped to the given namespace.
    pub fn new(namespace: Uuid) -> Self {
        Self {
            namespace,
            counter: AtomicU64::new(0),
        }
    }

    /// Next unique id in the sequence.
    pub fn next(&self) -> Uuid {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        Uuid::new_v5(&self.namespace, &n.to_be_bytes())
    }
}

/// Round a cash amount half-to-even to `ndigits` fractional digits.
///
/// Applied uniformly to every monetary amount produced by a multiplication
/// and to every cash delta before it touches a ledger, so rounding drift
/// cannot accumulate across fills.
pub fn round_cash(amount: Decimal, ndigits: u32) -> Decimal {
    amount.round_dp_with_strategy(ndigits, RoundingStrategy::MidpointNearestEven)
}

/// Rounded monetary value of `volume` shares at `price`.
pub fn notional(price: Decimal, volume: u64, ndigits: u32) -> Decimal {
    round_cash(price * Decimal::from(volume), ndigits)
}
