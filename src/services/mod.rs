//! # Services Module
//!
//! Supporting services for the MMT server, currently the price feeds that
//! supply reference prices to the engines and the pool price endpoint.

pub mod price_feed;

pub use price_feed::{FixedPriceFeed, HttpPriceFeed, PoolReservePriceFeed, PriceFeed};
