//! # Authentication Module
//!
//! Handles JWT token issuance, validation, and middleware for securing API
//! endpoints of the MMT server.

pub mod jwt;
pub mod middleware;
pub mod models;
