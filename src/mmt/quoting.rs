//! Bid/ask quote derivation.
//!
//! The quoter is a pure function of a strategy configuration and a
//! reference price. It is deliberately permissive: no clamping, no
//! validation, no I/O. Spread parameters over 100% produce zero or negative
//! bids and very negative parameters push the bid above the reference
//! price; guarding against that belongs to the layers that own the
//! configuration, not here.

use serde::{Deserialize, Serialize};

use crate::mmt::error::MmtError;
use crate::mmt::strategy::StrategyConfig;

/// A bid/ask price pair around a reference price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bid_price: f64,
    pub ask_price: f64,
}

impl Quote {
    /// Ask minus bid, in quote-currency units.
    pub fn spread(&self) -> f64 {
        self.ask_price - self.bid_price
    }
}

/// Derive bid and ask quotes from the strategy's spread configuration.
///
/// Spread fields are percentage-points:
///
/// ```text
/// bid = reference_price * (1 - (base_spread + bid_adjustment) / 100)
/// ask = reference_price * (1 + (base_spread + ask_adjustment) / 100)
/// ```
///
/// Pure and deterministic: identical inputs yield bit-identical outputs.
/// A non-finite `reference_price` propagates into non-finite quotes rather
/// than failing; use [`quote_checked`] where corrupt quotes must not reach
/// order handling.
pub fn quote(config: &StrategyConfig, reference_price: f64) -> Quote {
    let bid_price = reference_price * (1.0 - (config.base_spread + config.bid_adjustment) / 100.0);
    let ask_price = reference_price * (1.0 + (config.base_spread + config.ask_adjustment) / 100.0);
    Quote {
        bid_price,
        ask_price,
    }
}

/// Validating wrapper around [`quote`].
///
/// Rejects non-finite and non-positive reference prices eagerly instead of
/// letting `NaN` flow downstream. The engine and the quote-preview endpoint
/// go through this; the underlying formula is unchanged.
pub fn quote_checked(config: &StrategyConfig, reference_price: f64) -> Result<Quote, MmtError> {
    if !reference_price.is_finite() {
        return Err(MmtError::InvalidInput(format!(
            "reference price must be finite, got {reference_price}"
        )));
    }
    if reference_price <= 0.0 {
        return Err(MmtError::InvalidInput(format!(
            "reference price must be positive, got {reference_price}"
        )));
    }
    Ok(quote(config, reference_price))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_spread: f64, bid_adjustment: f64, ask_adjustment: f64) -> StrategyConfig {
        StrategyConfig {
            base_spread,
            bid_adjustment,
            ask_adjustment,
            ..Default::default()
        }
    }

    #[test]
    fn zero_spread_quotes_at_reference() {
        let q = quote(&config(0.0, 0.0, 0.0), 50.0);
        assert_eq!(q.bid_price, 50.0);
        assert_eq!(q.ask_price, 50.0);
    }

    #[test]
    fn known_spread_values() {
        // 1.5% effective spread on both sides of 100.
        let q = quote(&config(1.0, 0.5, 0.5), 100.0);
        assert_eq!(q.bid_price, 98.5);
        assert_eq!(q.ask_price, 101.5);
    }

    #[test]
    fn symmetric_when_adjustments_are_zero() {
        let reference = 137.25;
        let q = quote(&config(2.3, 0.0, 0.0), reference);
        let bid_distance = reference - q.bid_price;
        let ask_distance = q.ask_price - reference;
        assert!((bid_distance - ask_distance).abs() < 1e-9);
    }

    #[test]
    fn ask_monotone_in_ask_adjustment() {
        let mut last = f64::NEG_INFINITY;
        for adj in [0.0, 0.1, 0.5, 1.0, 5.0, 25.0] {
            let q = quote(&config(1.0, 0.0, adj), 100.0);
            assert!(q.ask_price > last, "ask must grow with ask_adjustment");
            last = q.ask_price;
        }
    }

    #[test]
    fn bid_monotone_in_bid_adjustment() {
        let mut last = f64::INFINITY;
        for adj in [0.0, 0.1, 0.5, 1.0, 5.0, 25.0] {
            let q = quote(&config(1.0, adj, 0.0), 100.0);
            assert!(q.bid_price < last, "bid must shrink with bid_adjustment");
            last = q.bid_price;
        }
    }

    #[test]
    fn full_spread_yields_exactly_zero_bid() {
        // 100% bid-side spread: permissive by design, no error, no panic.
        let q = quote(&config(100.0, 0.0, 0.0), 10.0);
        assert_eq!(q.bid_price, 0.0);
        assert_eq!(q.ask_price, 20.0);
    }

    #[test]
    fn negative_spread_inverts_without_clamping() {
        let q = quote(&config(-5.0, 0.0, 0.0), 100.0);
        assert!(q.bid_price > 100.0);
        assert!(q.ask_price < 100.0);
    }

    #[test]
    fn non_finite_reference_propagates() {
        let q = quote(&config(1.0, 0.0, 0.0), f64::NAN);
        assert!(q.bid_price.is_nan());
        assert!(q.ask_price.is_nan());
    }

    #[test]
    fn idempotent_bit_for_bit() {
        let c = config(0.37, 0.11, 0.29);
        let a = quote(&c, 123.456789);
        let b = quote(&c, 123.456789);
        assert_eq!(a.bid_price.to_bits(), b.bid_price.to_bits());
        assert_eq!(a.ask_price.to_bits(), b.ask_price.to_bits());
    }

    #[test]
    fn checked_rejects_bad_reference_prices() {
        let c = config(1.0, 0.0, 0.0);
        assert!(quote_checked(&c, f64::NAN).is_err());
        assert!(quote_checked(&c, f64::INFINITY).is_err());
        assert!(quote_checked(&c, 0.0).is_err());
        assert!(quote_checked(&c, -1.0).is_err());
        assert!(quote_checked(&c, 100.0).is_ok());
    }

    #[test]
    fn checked_matches_raw_on_valid_input() {
        let c = config(1.0, 0.5, 0.5);
        let raw = quote(&c, 100.0);
        let checked = quote_checked(&c, 100.0).unwrap();
        assert_eq!(raw, checked);
    }

    #[test]
    fn spread_helper() {
        let q = quote(&config(1.0, 0.5, 0.5), 100.0);
        assert!((q.spread() - 3.0).abs() < 1e-12);
    }
}
