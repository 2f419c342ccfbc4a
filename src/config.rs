//! Simulator configuration, supplied once at construction.
//!
//! Deserialization rejects unknown keys, so a typoed setting fails loudly
//! instead of silently running with a default.

use crate::impact::ImpactParams;
use crate::orderbook::error::OrderBookError;
use crate::orderbook::stp::SelfTradePolicy;
use serde::{Deserialize, Serialize};

fn default_allow_market_orders() -> bool {
    true
}

fn default_max_stop_cascade_depth() -> u32 {
    16
}

/// Construction-time configuration for one simulated book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulatorConfig {
    /// Minimum price increment; every book price must be a non-negative
    /// exact multiple. Must be positive.
    pub tick_size: i64,

    /// What to do when an order would trade against its own owner.
    #[serde(default)]
    pub self_trade_policy: SelfTradePolicy,

    /// Whether `MARKET` submissions are accepted.
    #[serde(default = "default_allow_market_orders")]
    pub allow_market_orders: bool,

    /// Almgren-Chriss impact parameters. No defaults are prescribed.
    pub impact: ImpactParams,

    /// Delay, in ticks of logical time, between an iceberg slice's
    /// exhaustion and the refresh event posting the next slice. Zero
    /// gives in-order refresh behavior.
    pub iceberg_refresh_delay: i64,

    /// Per-event cap on stop-trigger feedback: a trade at cascade depth
    /// `d` may arm triggers at `d + 1` only while `d + 1` is within this
    /// cap.
    #[serde(default = "default_max_stop_cascade_depth")]
    pub max_stop_cascade_depth: u32,
}

impl SimulatorConfig {
    /// Validates value ranges.
    ///
    /// # Errors
    /// `InvalidConfiguration` naming the offending key.
    pub fn validate(&self) -> Result<(), OrderBookError> {
        if self.tick_size <= 0 {
            return Err(OrderBookError::InvalidConfiguration {
                message: format!("tick_size must be positive, got {}", self.tick_size),
            });
        }
        if !(self.impact.adv > 0.0) {
            return Err(OrderBookError::InvalidConfiguration {
                message: format!("impact.adv must be positive, got {}", self.impact.adv),
            });
        }
        if self.impact.decay_half_life < 0 {
            return Err(OrderBookError::InvalidConfiguration {
                message: format!(
                    "impact.decay_half_life must be non-negative, got {}",
                    self.impact.decay_half_life
                ),
            });
        }
        if self.iceberg_refresh_delay < 0 {
            return Err(OrderBookError::InvalidConfiguration {
                message: format!(
                    "iceberg_refresh_delay must be non-negative, got {}",
                    self.iceberg_refresh_delay
                ),
            });
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration object. Unknown keys are
    /// rejected.
    pub fn from_json(data: &str) -> Result<Self, OrderBookError> {
        let config: SimulatorConfig =
            serde_json::from_str(data).map_err(|error| OrderBookError::InvalidConfiguration {
                message: error.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }
}
