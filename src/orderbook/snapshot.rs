//! Read-only book projections: depth snapshots, enriched metrics, and a
//! checksummed snapshot package for persistence round-trips.

use crate::orderbook::level::PriceLevel;
use crate::orderbook::trade::LastTrade;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::OrderBookError;

/// Aggregated view of one price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLevel {
    /// Level price in ticks.
    pub price: i64,
    /// Displayed quantity at the level (iceberg reserve excluded).
    pub visible_quantity: u64,
    /// Total quantity including hidden reserve.
    pub total_quantity: u64,
    /// Number of resting orders.
    pub order_count: usize,
}

impl DepthLevel {
    pub(crate) fn from_level(level: &PriceLevel) -> Self {
        Self {
            price: level.price(),
            visible_quantity: level.visible_quantity(),
            total_quantity: level.total_quantity(),
            order_count: level.order_count(),
        }
    }
}

/// Top-of-book projection taken between events.
///
/// `mid_double_ticks` is `bid + ask`, the exact mid in half-tick units;
/// `spread` and the mid are defined only when both sides are non-empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSnapshot {
    /// Instrument identifier.
    pub symbol: String,
    /// Logical timestamp of the snapshot.
    pub ts: i64,
    /// Best bid price, if any.
    pub best_bid: Option<i64>,
    /// Best ask price, if any.
    pub best_ask: Option<i64>,
    /// `best_ask - best_bid` in ticks.
    pub spread: Option<i64>,
    /// Exact mid as a doubled-tick integer.
    pub mid_double_ticks: Option<i64>,
    /// Top bid levels, best first.
    pub bid_depth: Vec<DepthLevel>,
    /// Top ask levels, best first.
    pub ask_depth: Vec<DepthLevel>,
    /// Most recent fill, if any.
    pub last_trade: Option<LastTrade>,
}

impl BookSnapshot {
    /// Mid price as a float view.
    #[must_use]
    pub fn mid_price(&self) -> Option<f64> {
        self.mid_double_ticks.map(|doubled| doubled as f64 / 2.0)
    }

    /// Total displayed quantity across the captured bid levels.
    #[must_use]
    pub fn bid_volume(&self) -> u64 {
        self.bid_depth.iter().map(|l| l.visible_quantity).sum()
    }

    /// Total displayed quantity across the captured ask levels.
    #[must_use]
    pub fn ask_volume(&self) -> u64 {
        self.ask_depth.iter().map(|l| l.visible_quantity).sum()
    }
}

bitflags! {
    /// Selects which metrics an enriched snapshot computes.
    ///
    /// Combine with bitwise OR to pay only for the metrics a consumer
    /// actually reads.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct MetricFlags: u32 {
        /// Mid price.
        const MID_PRICE = 1 << 0;

        /// Spread in basis points of the mid.
        const SPREAD_BPS = 1 << 1;

        /// Total displayed depth per side.
        const DEPTH = 1 << 2;

        /// Order book imbalance over the captured levels.
        const IMBALANCE = 1 << 3;

        /// All metrics.
        const ALL = Self::MID_PRICE.bits() | Self::SPREAD_BPS.bits()
                  | Self::DEPTH.bits() | Self::IMBALANCE.bits();
    }
}

/// One basis point = 0.01%.
const BASIS_POINTS_MULTIPLIER: f64 = 10_000.0;

/// Snapshot with pre-computed metrics, built in a single pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedSnapshot {
    /// The underlying book projection.
    pub snapshot: BookSnapshot,
    /// Which metrics were computed.
    pub flags: MetricFlags,
    /// Mid price, when `MID_PRICE` was requested and both sides exist.
    pub mid_price: Option<f64>,
    /// Spread in basis points of the mid, when `SPREAD_BPS` was requested.
    pub spread_bps: Option<f64>,
    /// Displayed bid depth, when `DEPTH` was requested.
    pub bid_depth_total: Option<u64>,
    /// Displayed ask depth, when `DEPTH` was requested.
    pub ask_depth_total: Option<u64>,
    /// `(bid - ask) / (bid + ask)` over captured levels, in `[-1, 1]`,
    /// when `IMBALANCE` was requested.
    pub imbalance: Option<f64>,
}

impl EnrichedSnapshot {
    /// Computes the requested metrics over a base snapshot.
    #[must_use]
    pub fn compute(snapshot: BookSnapshot, flags: MetricFlags) -> Self {
        let mid_price = flags
            .contains(MetricFlags::MID_PRICE)
            .then(|| snapshot.mid_price())
            .flatten();

        let spread_bps = if flags.contains(MetricFlags::SPREAD_BPS) {
            match (snapshot.spread, snapshot.mid_price()) {
                (Some(spread), Some(mid)) if mid > 0.0 => {
                    Some(spread as f64 / mid * BASIS_POINTS_MULTIPLIER)
                }
                _ => None,
            }
        } else {
            None
        };

        let (bid_depth_total, ask_depth_total) = if flags.contains(MetricFlags::DEPTH) {
            (Some(snapshot.bid_volume()), Some(snapshot.ask_volume()))
        } else {
            (None, None)
        };

        let imbalance = if flags.contains(MetricFlags::IMBALANCE) {
            let bid = snapshot.bid_volume() as f64;
            let ask = snapshot.ask_volume() as f64;
            let total = bid + ask;
            (total > 0.0).then(|| (bid - ask) / total)
        } else {
            None
        };

        Self {
            snapshot,
            flags,
            mid_price,
            spread_bps,
            bid_depth_total,
            ask_depth_total,
            imbalance,
        }
    }
}

/// Format version for checksummed snapshot packages.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Wrapper providing integrity validation for persisted snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotPackage {
    /// Schema version for forward compatibility.
    pub version: u32,
    /// Snapshot payload.
    pub snapshot: BookSnapshot,
    /// Hex-encoded SHA-256 of the serialized snapshot.
    pub checksum: String,
}

impl SnapshotPackage {
    /// Packages a snapshot, computing its checksum.
    pub fn new(snapshot: BookSnapshot) -> Result<Self, OrderBookError> {
        let checksum = Self::compute_checksum(&snapshot)?;
        Ok(Self {
            version: SNAPSHOT_FORMAT_VERSION,
            snapshot,
            checksum,
        })
    }

    /// Serializes the package to JSON.
    pub fn to_json(&self) -> Result<String, OrderBookError> {
        serde_json::to_string(self).map_err(|error| OrderBookError::InvalidConfiguration {
            message: format!("snapshot serialization failed: {error}"),
        })
    }

    /// Deserializes a package from JSON.
    pub fn from_json(data: &str) -> Result<Self, OrderBookError> {
        serde_json::from_str(data).map_err(|error| OrderBookError::InvalidConfiguration {
            message: format!("snapshot deserialization failed: {error}"),
        })
    }

    /// Validates version and checksum, returning the snapshot.
    pub fn into_snapshot(self) -> Result<BookSnapshot, OrderBookError> {
        if self.version != SNAPSHOT_FORMAT_VERSION {
            return Err(OrderBookError::InvalidConfiguration {
                message: format!(
                    "unsupported snapshot version {} (expected {})",
                    self.version, SNAPSHOT_FORMAT_VERSION
                ),
            });
        }
        let computed = Self::compute_checksum(&self.snapshot)?;
        if computed != self.checksum {
            return Err(OrderBookError::InvalidConfiguration {
                message: format!(
                    "snapshot checksum mismatch: expected {}, computed {computed}",
                    self.checksum
                ),
            });
        }
        Ok(self.snapshot)
    }

    fn compute_checksum(snapshot: &BookSnapshot) -> Result<String, OrderBookError> {
        let payload =
            serde_json::to_vec(snapshot).map_err(|error| OrderBookError::InvalidConfiguration {
                message: format!("snapshot serialization failed: {error}"),
            })?;
        let mut hasher = Sha256::new();
        hasher.update(payload);
        Ok(format!("{:x}", hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> BookSnapshot {
        BookSnapshot {
            symbol: "SIM".to_string(),
            ts: 10,
            best_bid: Some(9_900),
            best_ask: Some(10_000),
            spread: Some(100),
            mid_double_ticks: Some(19_900),
            bid_depth: vec![DepthLevel {
                price: 9_900,
                visible_quantity: 60,
                total_quantity: 60,
                order_count: 2,
            }],
            ask_depth: vec![DepthLevel {
                price: 10_000,
                visible_quantity: 40,
                total_quantity: 140,
                order_count: 1,
            }],
            last_trade: None,
        }
    }

    #[test]
    fn test_mid_price_is_half_the_doubled_mid() {
        let snapshot = sample_snapshot();
        assert_eq!(snapshot.mid_price(), Some(9_950.0));
    }

    #[test]
    fn test_enriched_computes_only_requested_metrics() {
        let enriched =
            EnrichedSnapshot::compute(sample_snapshot(), MetricFlags::MID_PRICE);
        assert_eq!(enriched.mid_price, Some(9_950.0));
        assert!(enriched.spread_bps.is_none());
        assert!(enriched.imbalance.is_none());
    }

    #[test]
    fn test_enriched_all_metrics() {
        let enriched = EnrichedSnapshot::compute(sample_snapshot(), MetricFlags::ALL);
        assert_eq!(enriched.bid_depth_total, Some(60));
        assert_eq!(enriched.ask_depth_total, Some(40));
        let imbalance = enriched.imbalance.unwrap();
        assert!((imbalance - 0.2).abs() < 1e-12);
        let spread_bps = enriched.spread_bps.unwrap();
        assert!((spread_bps - 100.0 / 9_950.0 * 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_package_round_trip() {
        let package = SnapshotPackage::new(sample_snapshot()).unwrap();
        let json = package.to_json().unwrap();
        let restored = SnapshotPackage::from_json(&json).unwrap();
        let snapshot = restored.into_snapshot().unwrap();
        assert_eq!(snapshot.best_bid, Some(9_900));
    }

    #[test]
    fn test_snapshot_package_detects_tampering() {
        let mut package = SnapshotPackage::new(sample_snapshot()).unwrap();
        package.snapshot.best_bid = Some(1);
        assert!(package.into_snapshot().is_err());
    }
}
