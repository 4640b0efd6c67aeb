//! # Earnings Types
//!
//! Domain types and port traits for the provider earnings ledger and
//! reconciliation/analytics engine. This crate has ZERO external IO
//! dependencies - only data structures, business rules, and trait
//! definitions.
//!
//! ## Architecture
//!
//! This crate is the innermost core of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, ChargeRecord, ProviderAccount,
//!   PayoutRequest, analytics buckets)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto` - Data Transfer Objects for API boundaries
//! - `error` - Domain, repository, gateway, and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    AnalyticsBucket, AnalyticsReport, ChargeId, ChargeRecord, ChargeStatus, CustomerId,
    FunnelMetrics, Granularity, LedgerAdjustment, MethodBreakdown, Money, PaymentMethod,
    PayoutRequest, PayoutStatus, ProviderAccount, ProviderBalance, ProviderId, Reservation,
    ReservationToken,
};
pub use dto::*;
pub use error::{AppError, DomainError, GatewayError, RepoError};
pub use ports::{LedgerRepository, PaymentGateway, TransferReceipt, TransferStatus};
