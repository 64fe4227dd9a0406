//! # Database Module
//!
//! PostgreSQL integration on tokio-postgres/deadpool: connection pooling,
//! row-mapped models, the strategy repository, and refinery migrations.

pub mod connection;
pub mod migrations;
pub mod models;

pub use connection::{DatabaseConfig, DatabaseConnection};
pub use models::*;
