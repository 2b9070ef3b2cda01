// storefront/src/lib.rs

//! Checkout reconciliation for the storefront: turns confirmed payments into
//! exactly one commerce-backend order each, and lets the success page find
//! that order afterwards.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod web;
