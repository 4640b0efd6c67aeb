//! Error types for the earnings ledger.

use crate::domain::{ChargeStatus, ProviderId};

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("integer overflow in money arithmetic")]
    Overflow,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error("a reservation is already outstanding for provider {0}")]
    ReservationHeld(ProviderId),

    #[error("no reservation outstanding for provider {0}")]
    NoReservation(ProviderId),

    #[error("reservation token does not match the outstanding reservation")]
    ReservationMismatch,

    #[error("ledger for provider {provider_id} is frozen pending operator review")]
    ProviderFrozen { provider_id: ProviderId },

    #[error(
        "reconciliation mismatch for provider {provider_id}: \
         earnings delta {delta} against available {available}"
    )]
    ReconciliationMismatch {
        provider_id: ProviderId,
        delta: i64,
        available: i64,
    },

    #[error("invalid charge status transition: {from} -> {to}")]
    InvalidChargeTransition { from: ChargeStatus, to: ChargeStatus },
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("database error: {0}")]
    Database(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// External payment gateway errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway transfer failed: {reason}")]
    Transfer { retryable: bool, reason: String },
}

impl GatewayError {
    pub fn retryable(&self) -> bool {
        match self {
            GatewayError::Transfer { retryable, .. } => *retryable,
        }
    }
}

/// Application-level errors, mapped to HTTP status codes at the inbound
/// adapter.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("amount exceeds available balance of {available}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error("provider {0} is frozen pending reconciliation review")]
    ProviderFrozen(ProviderId),

    #[error("gateway error: {reason} (retryable: {retryable})")]
    Gateway { retryable: bool, reason: String },

    #[error(
        "gateway outcome for payout {idempotency_key} is ambiguous after timeout; \
         awaiting reconciliation"
    )]
    TimeoutAmbiguous { idempotency_key: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InsufficientFunds {
                available,
                requested,
            } => AppError::InsufficientFunds {
                available,
                requested,
            },
            DomainError::ProviderFrozen { provider_id } => AppError::ProviderFrozen(provider_id),
            DomainError::ReconciliationMismatch { provider_id, .. } => {
                AppError::ProviderFrozen(provider_id)
            }
            DomainError::Validation(msg) => AppError::BadRequest(msg),
            DomainError::Overflow => AppError::Internal("money arithmetic overflow".into()),
            e => AppError::BadRequest(e.to_string()),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => e.into(),
            RepoError::NotFound => AppError::NotFound("resource not found".into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Conflict(e) => AppError::BadRequest(e),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Transfer { retryable, reason } => {
                AppError::Gateway { retryable, reason }
            }
        }
    }
}
