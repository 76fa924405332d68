//! Point-in-time depth snapshots for front-ends and training observers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::trace;

use super::error::BookError;

/// Format version for checksum-carrying snapshot packages.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// One aggregated depth row: total resting volume at a price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Price of the level.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Total resting shares at this price.
    pub size: u64,
}

/// A read-only aggregation of the top price levels on each side.
///
/// `asks` ascend by price, `bids` descend, both truncated to the requested
/// depth. The JSON shape matches the market-data feed the front-end and
/// training observers consume:
///
/// ```json
/// [{ "symbol_id": "COIN", "time_exchange": 0.0, "time_coinapi": 0.0,
///    "current_price": 1.0,
///    "asks": [{"price": 1.1, "size": 10}],
///    "bids": [{"price": 0.9, "size": 5}] }]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSnapshot {
    /// Ticker symbol of the book.
    pub symbol_id: String,
    /// Wall-clock observation time, seconds since the Unix epoch.
    pub time_exchange: f64,
    /// Wall-clock ingestion time; equals `time_exchange` for a local book.
    pub time_coinapi: f64,
    /// Last trade price (or the initial price if nothing traded yet).
    #[serde(with = "rust_decimal::serde::float")]
    pub current_price: Decimal,
    /// Ask levels in ascending price order.
    pub asks: Vec<PriceLevel>,
    /// Bid levels in descending price order.
    pub bids: Vec<PriceLevel>,
}

impl BookSnapshot {
    /// Best bid as `(price, size)`, if any bids rest.
    pub fn best_bid(&self) -> Option<(Decimal, u64)> {
        self.bids.first().map(|l| (l.price, l.size))
    }

    /// Best ask as `(price, size)`, if any asks rest.
    pub fn best_ask(&self) -> Option<(Decimal, u64)> {
        self.asks.first().map(|l| (l.price, l.size))
    }

    /// Midpoint of best bid and best ask.
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }

    /// Best ask minus best bid.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some(ask - bid),
            _ => None,
        }
    }

    /// Total resting volume across the included bid levels.
    pub fn total_bid_volume(&self) -> u64 {
        self.bids.iter().map(|l| l.size).sum()
    }

    /// Total resting volume across the included ask levels.
    pub fn total_ask_volume(&self) -> u64 {
        self.asks.iter().map(|l| l.size).sum()
    }

    /// Serialize to the feed shape: a JSON array holding this snapshot.
    pub fn to_json(&self) -> Result<String, BookError> {
        serde_json::to_string(&[self]).map_err(|error| BookError::Serialization {
            message: error.to_string(),
        })
    }
}

/// Wrapper providing integrity validation for [`BookSnapshot`] values that
/// cross a process or storage boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotPackage {
    /// Snapshot schema version for forward compatibility.
    pub version: u32,
    /// Snapshot payload.
    pub snapshot: BookSnapshot,
    /// Hex-encoded SHA-256 of the serialized snapshot.
    pub checksum: String,
}

impl SnapshotPackage {
    /// Package a snapshot, computing its checksum.
    pub fn new(snapshot: BookSnapshot) -> Result<Self, BookError> {
        let checksum = Self::compute_checksum(&snapshot)?;
        Ok(Self {
            version: SNAPSHOT_FORMAT_VERSION,
            snapshot,
            checksum,
        })
    }

    /// Serialize the package to JSON.
    pub fn to_json(&self) -> Result<String, BookError> {
        serde_json::to_string(self).map_err(|error| BookError::Serialization {
            message: error.to_string(),
        })
    }

    /// Deserialize a package from JSON.
    pub fn from_json(data: &str) -> Result<Self, BookError> {
        serde_json::from_str(data).map_err(|error| BookError::Deserialization {
            message: error.to_string(),
        })
    }

    /// Validate the version and checksum.
    pub fn validate(&self) -> Result<(), BookError> {
        if self.version != SNAPSHOT_FORMAT_VERSION {
            return Err(BookError::UnsupportedVersion {
                version: self.version,
                expected: SNAPSHOT_FORMAT_VERSION,
            });
        }

        let computed = Self::compute_checksum(&self.snapshot)?;
        if computed != self.checksum {
            return Err(BookError::ChecksumMismatch {
                expected: self.checksum.clone(),
                actual: computed,
            });
        }

        trace!(checksum = %self.checksum, "snapshot package validated");
        Ok(())
    }

    fn compute_checksum(snapshot: &BookSnapshot) -> Result<String, BookError> {
        let payload = serde_json::to_vec(snapshot).map_err(|error| BookError::Serialization {
            message: error.to_string(),
        })?;

        let mut hasher = Sha256::new();
        hasher.update(payload);
        Ok(format!("{:x}", hasher.finalize()))
    }
}
