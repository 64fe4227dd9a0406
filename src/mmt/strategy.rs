//! Market-making strategy configuration.
//!
//! A `StrategyConfig` is the full tunable parameter set for one pool's
//! market making. It is pure configuration state: created and edited by an
//! operator through the HTTP API, persisted by the strategy repository, and
//! read by the quoting path on every evaluation cycle.

use serde::{Deserialize, Serialize};

use crate::mmt::error::MmtError;

/// Tunable parameters governing one pool's market-making behavior.
///
/// All percentage fields are expressed in percentage-points (`1.5` means
/// 1.5%), never fractions. The quoting computation divides by 100
/// internally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Base spread applied symmetrically around the reference price.
    pub base_spread: f64,
    /// Extra spread added on the bid side, allowing asymmetric skew.
    pub bid_adjustment: f64,
    /// Extra spread added on the ask side.
    pub ask_adjustment: f64,

    /// Seconds between strategy re-evaluations by the engine.
    pub check_interval: u64,

    /// Lower bound on a single order size, in base units.
    pub min_trade_size: f64,
    /// Upper bound on a single order size, in base units.
    pub max_trade_size: f64,
    /// Fraction of current inventory quoted per cycle, in pct-points.
    pub trade_size_percentage: f64,

    /// Target share of portfolio value held in the base asset, in pct-points.
    pub target_ratio: f64,
    /// Allowed drift from `target_ratio` before a rebalance is signalled.
    pub rebalance_threshold: f64,
    /// Cap on total base-asset exposure, in base units.
    pub max_position_size: f64,

    /// Maximum tolerated slippage on any resulting order, in pct-points.
    pub max_slippage: f64,
    /// Drop from the session entry price that trips the emergency stop.
    pub stop_loss_percentage: f64,

    /// When set, the engine must not quote or trade. Checked by the
    /// engine, never by the quoting function itself.
    pub emergency_stop: bool,
    /// Master on/off switch, same convention as `emergency_stop`.
    pub enabled: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            base_spread: 0.5,
            bid_adjustment: 0.0,
            ask_adjustment: 0.0,
            check_interval: 30,
            min_trade_size: 0.1,
            max_trade_size: 10.0,
            trade_size_percentage: 5.0,
            target_ratio: 50.0,
            rebalance_threshold: 5.0,
            max_position_size: 100.0,
            max_slippage: 1.0,
            stop_loss_percentage: 10.0,
            emergency_stop: false,
            enabled: false,
        }
    }
}

impl StrategyConfig {
    /// Whether the engine may act on this configuration.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.emergency_stop
    }

    /// Caller-side sanity checks, used by the routes and the engine before
    /// a config is persisted or acted on. The quoting function deliberately
    /// never calls this: it stays permissive and unconditional.
    pub fn validate(&self) -> Result<(), MmtError> {
        for (name, value) in [
            ("base_spread", self.base_spread),
            ("bid_adjustment", self.bid_adjustment),
            ("ask_adjustment", self.ask_adjustment),
            ("min_trade_size", self.min_trade_size),
            ("max_trade_size", self.max_trade_size),
            ("trade_size_percentage", self.trade_size_percentage),
            ("target_ratio", self.target_ratio),
            ("rebalance_threshold", self.rebalance_threshold),
            ("max_position_size", self.max_position_size),
            ("max_slippage", self.max_slippage),
            ("stop_loss_percentage", self.stop_loss_percentage),
        ] {
            if !value.is_finite() {
                return Err(MmtError::Configuration(format!(
                    "{name} must be a finite number, got {value}"
                )));
            }
        }

        if self.check_interval == 0 {
            return Err(MmtError::Configuration(
                "check_interval must be at least 1 second".to_string(),
            ));
        }
        if self.min_trade_size < 0.0 {
            return Err(MmtError::Configuration(
                "min_trade_size must be non-negative".to_string(),
            ));
        }
        if self.min_trade_size > self.max_trade_size {
            return Err(MmtError::Configuration(format!(
                "min_trade_size {} exceeds max_trade_size {}",
                self.min_trade_size, self.max_trade_size
            )));
        }
        if self.base_spread + self.bid_adjustment >= 100.0 {
            return Err(MmtError::Configuration(
                "bid-side spread of 100% or more quotes a zero or negative bid".to_string(),
            ));
        }

        Ok(())
    }

    /// Apply a partial update, returning the patched configuration.
    pub fn apply(&self, patch: &StrategyPatch) -> Self {
        let mut next = self.clone();
        macro_rules! patch_field {
            ($($field:ident),+ $(,)?) => {
                $(if let Some(v) = patch.$field {
                    next.$field = v;
                })+
            };
        }
        patch_field!(
            base_spread,
            bid_adjustment,
            ask_adjustment,
            check_interval,
            min_trade_size,
            max_trade_size,
            trade_size_percentage,
            target_ratio,
            rebalance_threshold,
            max_position_size,
            max_slippage,
            stop_loss_percentage,
            emergency_stop,
            enabled,
        );
        next
    }
}

/// Partial strategy update, every field optional. Used by the
/// `update_strategy` repository operation and its HTTP endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyPatch {
    pub base_spread: Option<f64>,
    pub bid_adjustment: Option<f64>,
    pub ask_adjustment: Option<f64>,
    pub check_interval: Option<u64>,
    pub min_trade_size: Option<f64>,
    pub max_trade_size: Option<f64>,
    pub trade_size_percentage: Option<f64>,
    pub target_ratio: Option<f64>,
    pub rebalance_threshold: Option<f64>,
    pub max_position_size: Option<f64>,
    pub max_slippage: Option<f64>,
    pub stop_loss_percentage: Option<f64>,
    pub emergency_stop: Option<bool>,
    pub enabled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        StrategyConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_inverted_trade_size_bounds() {
        let config = StrategyConfig {
            min_trade_size: 5.0,
            max_trade_size: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MmtError::Configuration(_))
        ));
    }

    #[test]
    fn rejects_non_finite_spread() {
        let config = StrategyConfig {
            base_spread: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_check_interval() {
        let config = StrategyConfig {
            check_interval: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn emergency_stop_deactivates() {
        let config = StrategyConfig {
            enabled: true,
            emergency_stop: true,
            ..Default::default()
        };
        assert!(!config.is_active());

        let config = StrategyConfig {
            enabled: true,
            emergency_stop: false,
            ..Default::default()
        };
        assert!(config.is_active());
    }

    #[test]
    fn patch_applies_only_set_fields() {
        let base = StrategyConfig::default();
        let patch = StrategyPatch {
            base_spread: Some(2.0),
            enabled: Some(true),
            ..Default::default()
        };

        let next = base.apply(&patch);
        assert_eq!(next.base_spread, 2.0);
        assert!(next.enabled);
        assert_eq!(next.check_interval, base.check_interval);
        assert_eq!(next.max_trade_size, base.max_trade_size);
    }

    #[test]
    fn patched_config_can_fail_validation() {
        // A patch that inverts the trade-size bounds must be caught by
        // validating the patched result, not the patch in isolation.
        let base = StrategyConfig::default();
        let patch = StrategyPatch {
            min_trade_size: Some(base.max_trade_size + 1.0),
            ..Default::default()
        };

        let next = base.apply(&patch);
        assert!(matches!(next.validate(), Err(MmtError::Configuration(_))));
    }

    #[test]
    fn empty_patch_is_identity() {
        let base = StrategyConfig::default();
        assert_eq!(base.apply(&StrategyPatch::default()), base);
    }
}
