//! # Earnings Hex
//!
//! Application service layer and HTTP adapter for the provider earnings
//! ledger.
//!
//! ## Architecture
//!
//! - `ingest` - Charge ingest pipeline (idempotent by source charge id)
//! - `payout` - Payout processor (idempotent by caller key) and the
//!   reconciliation pass for ambiguous gateway outcomes
//! - `analytics` - Single-pass time-bucketed aggregation
//! - `service` - Application service tying the pieces together
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The service is generic over `R: LedgerRepository` and
//! `G: PaymentGateway`, allowing different adapters to be injected.

pub mod analytics;
pub mod inbound;
mod ingest;
pub mod openapi;
mod payout;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use service::EarningsService;
