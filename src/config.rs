//! Simulation-wide configuration surface.

use rust_decimal::Decimal;

/// Fractional digits every monetary amount is rounded to.
pub const DEFAULT_ROUND_NDIGITS: u32 = 6;

/// Ticker symbol reported in snapshots.
pub const DEFAULT_SYMBOL_ID: &str = "COIN";

/// Width of the zero-padded numeric part of minted identifiers.
pub const DEFAULT_MAX_ID_DIGITS: usize = 12;

/// Configuration for a single order book and the agents attached to it.
///
/// All fields have defaults matching the reference setup; construct with
/// `SimConfig::default()` and override what you need.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Ticker symbol for snapshots and trade records.
    pub symbol_id: String,
    /// Fractional digits used when rounding cash amounts (half-to-even).
    pub round_ndigits: u32,
    /// Zero-padded width of minted order/agent identifiers.
    pub max_id_digits: usize,
    /// Last-trade price the book starts from before any fill occurs.
    pub initial_price: Decimal,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            symbol_id: DEFAULT_SYMBOL_ID.to_string(),
            round_ndigits: DEFAULT_ROUND_NDIGITS,
            max_id_digits: DEFAULT_MAX_ID_DIGITS,
            initial_price: Decimal::ONE,
        }
    }
}

impl SimConfig {
    /// Configuration with the default ambient settings and the given
    /// starting price.
    pub fn with_initial_price(initial_price: Decimal) -> Self {
        Self {
            initial_price,
            ..Self::default()
        }
    }
}
