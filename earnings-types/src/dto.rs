//! Data Transfer Objects for the query API and charge ingest boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    AnalyticsBucket, FunnelMetrics, Granularity, MethodBreakdown, PaymentMethod, PayoutRequest,
    PayoutStatus, ProviderBalance, ProviderId,
};

// ─────────────────────────────────────────────────────────────────────────────
// Charge ingest DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Raw charge payload as delivered by the charge source collaborator
/// (webhook push or poll). Amounts arrive as decimal strings and are
/// converted to integer cents at this boundary, never floats.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RawCharge {
    /// Source-system charge id
    #[schema(example = "ch_8f3a21")]
    pub id: String,
    /// Provider the earnings belong to (UUID)
    pub provider_id: String,
    /// Source-system customer id
    #[schema(example = "cus_77")]
    pub customer_id: String,
    /// Requested amount as a decimal string
    #[schema(example = "150.00")]
    pub requested_amount: String,
    /// Settled amount as a decimal string; absent until paid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_amount: Option<String>,
    #[schema(example = "paid")]
    pub status: String,
    #[schema(example = "pix")]
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
}

/// What ingest did with a raw charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IngestOutcome {
    /// First sight of this source id
    Created,
    /// Status advanced along a legal edge
    Updated,
    /// Re-delivery with no status change
    Unchanged,
}

/// Response after ingesting one raw charge.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngestResponse {
    pub charge_id: String,
    pub outcome: IngestOutcome,
}

// ─────────────────────────────────────────────────────────────────────────────
// Payout DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to pay a provider out of their available balance.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePayoutRequest {
    pub provider_id: ProviderId,
    /// Amount in cents, must be positive
    #[schema(example = 20000)]
    pub amount_cents: i64,
    pub method: PaymentMethod,
    /// Free-form description forwarded to the gateway
    #[serde(default)]
    pub description: String,
    /// Caller-supplied token making the request exactly-once across
    /// retries. Required.
    #[schema(example = "payout-2024-07-01-prov42")]
    pub idempotency_key: String,
}

/// State of a payout request as seen by the dashboard collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PayoutResponse {
    pub idempotency_key: String,
    pub provider_id: ProviderId,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub description: String,
    pub status: PayoutStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_transfer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl From<PayoutRequest> for PayoutResponse {
    fn from(req: PayoutRequest) -> Self {
        Self {
            idempotency_key: req.idempotency_key,
            provider_id: req.provider_id,
            amount_cents: req.amount.cents(),
            method: req.method,
            description: req.description,
            status: req.status,
            gateway_transfer_id: req.gateway_transfer_id,
            failure_reason: req.failure_reason,
            retryable: req.retryable,
            created_at: req.created_at,
        }
    }
}

/// Filter for listing payout requests.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PayoutFilter {
    pub status: Option<PayoutStatus>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Balance DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Provider balance snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    pub provider_id: ProviderId,
    #[schema(example = 20000)]
    pub total_earnings_cents: i64,
    pub paid_out_cents: i64,
    pub reserved_cents: i64,
    pub available_cents: i64,
    pub frozen: bool,
}

impl From<ProviderBalance> for BalanceResponse {
    fn from(b: ProviderBalance) -> Self {
        Self {
            provider_id: b.provider_id,
            total_earnings_cents: b.total_earnings.cents(),
            paid_out_cents: b.paid_out.cents(),
            reserved_cents: b.reserved.cents(),
            available_cents: b.available.cents(),
            frozen: b.frozen,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Analytics DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Query parameters for the analytics endpoint.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AnalyticsParams {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Which time series to return; breakdown and funnel always come
    /// from the same aggregation pass either way.
    pub granularity: Option<Granularity>,
}

/// Analytics report sliced for one granularity.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsResponse {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub granularity: Granularity,
    pub buckets: Vec<AnalyticsBucket>,
    pub methods: Vec<MethodBreakdown>,
    pub funnel: FunnelMetrics,
    pub total_revenue_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_hour: Option<usize>,
}
