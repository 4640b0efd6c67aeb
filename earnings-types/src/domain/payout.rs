//! Payout request domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::charge::PaymentMethod;
use super::money::Money;
use super::provider::ProviderId;

/// Lifecycle status of a payout request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    /// Gateway call timed out; the true outcome is unknown until a
    /// reconciliation pass resolves it. The reservation stays held.
    PendingExternal,
    Completed,
    Failed,
}

impl PayoutStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PayoutStatus::Completed | PayoutStatus::Failed)
    }
}

impl std::fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::PendingExternal => "pending_external",
            PayoutStatus::Completed => "completed",
            PayoutStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PayoutStatus {
    type Err = crate::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PayoutStatus::Pending),
            "pending_external" => Ok(PayoutStatus::PendingExternal),
            "completed" => Ok(PayoutStatus::Completed),
            "failed" => Ok(PayoutStatus::Failed),
            other => Err(crate::error::DomainError::Validation(format!(
                "unknown payout status: {other:?}"
            ))),
        }
    }
}

/// A request to pay a provider out of their earned balance.
///
/// The caller-supplied idempotency key is the primary identity: retries
/// with the same key observe the stored request instead of creating a new
/// one. Transitions pending -> {completed | failed} exactly once, with
/// `pending_external` as the only detour (ambiguous gateway timeout).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub idempotency_key: String,
    pub provider_id: ProviderId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub description: String,
    pub status: PayoutStatus,
    pub gateway_transfer_id: Option<String>,
    pub failure_reason: Option<String>,
    /// For failed requests, whether the caller may retry.
    pub retryable: Option<bool>,
    /// Set once the request has been handed to the gateway; cancellation
    /// is only possible before this point.
    pub dispatched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PayoutRequest {
    /// Creates a new pending payout request.
    pub fn new(
        idempotency_key: String,
        provider_id: ProviderId,
        amount: Money,
        method: PaymentMethod,
        description: String,
    ) -> Self {
        Self {
            idempotency_key,
            provider_id,
            amount,
            method,
            description,
            status: PayoutStatus::Pending,
            gateway_transfer_id: None,
            failure_reason: None,
            retryable: None,
            dispatched_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn was_dispatched(&self) -> bool {
        self.dispatched_at.is_some()
    }

    /// Marks the request as handed to the gateway.
    pub fn dispatched(mut self) -> Self {
        self.dispatched_at = Some(Utc::now());
        self
    }

    /// Terminal success with the gateway's transfer id.
    pub fn completed(mut self, transfer_id: String) -> Self {
        self.status = PayoutStatus::Completed;
        self.gateway_transfer_id = Some(transfer_id);
        self.failure_reason = None;
        self.retryable = None;
        self
    }

    /// Terminal failure.
    pub fn failed(mut self, reason: String, retryable: bool) -> Self {
        self.status = PayoutStatus::Failed;
        self.failure_reason = Some(reason);
        self.retryable = Some(retryable);
        self
    }

    /// Ambiguous gateway timeout; awaits reconciliation.
    pub fn pending_external(mut self) -> Self {
        self.status = PayoutStatus::PendingExternal;
        self
    }
}
