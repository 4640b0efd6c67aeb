//! Database row structs and conversion helpers for the SQLite adapter.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use earnings_types::{
    ChargeId, ChargeRecord, CustomerId, Money, PayoutRequest, ProviderAccount, ProviderId,
    RepoError, Reservation,
};

/// Uniform fixed-width RFC3339 so stored timestamps compare
/// lexicographically in range queries.
pub fn fmt_ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_ts(s: &str) -> Result<DateTime<Utc>, RepoError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepoError::Database(e.to_string()))
}

fn parse_uuid(s: &str) -> Result<Uuid, RepoError> {
    Uuid::parse_str(s).map_err(|e| RepoError::Database(e.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Row structs
// ─────────────────────────────────────────────────────────────────────────────

/// Charge row from database.
#[derive(FromRow)]
pub struct DbCharge {
    pub id: String,
    pub provider_id: String,
    pub customer_id: String,
    pub requested_amount: i64,
    pub paid_amount: i64,
    pub status: String,
    pub payment_method: String,
    pub created_at: String,
}

impl DbCharge {
    /// Convert database row to a domain ChargeRecord.
    pub fn into_domain(self) -> Result<ChargeRecord, RepoError> {
        Ok(ChargeRecord {
            id: ChargeId::new(self.id),
            provider_id: ProviderId::from_uuid(parse_uuid(&self.provider_id)?),
            customer_id: CustomerId::new(self.customer_id),
            requested_amount: Money::from_cents(self.requested_amount),
            paid_amount: Money::from_cents(self.paid_amount),
            status: self
                .status
                .parse()
                .map_err(|e: earnings_types::DomainError| RepoError::Database(e.to_string()))?,
            payment_method: self
                .payment_method
                .parse()
                .map_err(|e: earnings_types::DomainError| RepoError::Database(e.to_string()))?,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

/// Ledger account row from database.
#[derive(FromRow)]
pub struct DbLedger {
    pub provider_id: String,
    pub total_earnings: i64,
    pub paid_out: i64,
    pub reservation_id: Option<String>,
    pub reserved_amount: i64,
    pub reservation_created_at: Option<String>,
    pub frozen: i64,
    pub created_at: String,
}

impl DbLedger {
    /// Convert database row to a domain ProviderAccount.
    pub fn into_domain(self) -> Result<ProviderAccount, RepoError> {
        let reservation = match (self.reservation_id, self.reservation_created_at) {
            (Some(id), Some(created_at)) => Some(Reservation {
                id: parse_uuid(&id)?,
                amount: Money::from_cents(self.reserved_amount),
                created_at: parse_ts(&created_at)?,
            }),
            _ => None,
        };

        Ok(ProviderAccount {
            provider_id: ProviderId::from_uuid(parse_uuid(&self.provider_id)?),
            total_earnings: Money::from_cents(self.total_earnings),
            paid_out: Money::from_cents(self.paid_out),
            reservation,
            frozen: self.frozen != 0,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

/// Payout request row from database.
#[derive(FromRow)]
pub struct DbPayout {
    pub idempotency_key: String,
    pub provider_id: String,
    pub amount: i64,
    pub method: String,
    pub description: String,
    pub status: String,
    pub gateway_transfer_id: Option<String>,
    pub failure_reason: Option<String>,
    pub retryable: Option<i64>,
    pub dispatched_at: Option<String>,
    pub created_at: String,
}

impl DbPayout {
    /// Convert database row to a domain PayoutRequest.
    pub fn into_domain(self) -> Result<PayoutRequest, RepoError> {
        Ok(PayoutRequest {
            idempotency_key: self.idempotency_key,
            provider_id: ProviderId::from_uuid(parse_uuid(&self.provider_id)?),
            amount: Money::from_cents(self.amount),
            method: self
                .method
                .parse()
                .map_err(|e: earnings_types::DomainError| RepoError::Database(e.to_string()))?,
            description: self.description,
            status: self
                .status
                .parse()
                .map_err(|e: earnings_types::DomainError| RepoError::Database(e.to_string()))?,
            gateway_transfer_id: self.gateway_transfer_id,
            failure_reason: self.failure_reason,
            retryable: self.retryable.map(|v| v != 0),
            dispatched_at: self.dispatched_at.as_deref().map(parse_ts).transpose()?,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}
