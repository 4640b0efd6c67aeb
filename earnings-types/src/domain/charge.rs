//! Charge record domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::money::Money;
use super::provider::ProviderId;
use crate::error::DomainError;

/// Source-system charge identifier. Opaque, unique per charge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ChargeId(String);

impl ChargeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChargeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source-system customer identifier. Opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct CustomerId(String);

impl CustomerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    Pending,
    Paid,
    Failed,
    Canceled,
    Refunded,
}

impl ChargeStatus {
    /// Whether a status transition is legal. Everything but `Pending` is
    /// terminal, with the single exception of `Paid -> Refunded`.
    pub fn can_transition_to(&self, to: ChargeStatus) -> bool {
        match (self, to) {
            (ChargeStatus::Pending, ChargeStatus::Paid)
            | (ChargeStatus::Pending, ChargeStatus::Failed)
            | (ChargeStatus::Pending, ChargeStatus::Canceled)
            | (ChargeStatus::Paid, ChargeStatus::Refunded) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChargeStatus::Pending => "pending",
            ChargeStatus::Paid => "paid",
            ChargeStatus::Failed => "failed",
            ChargeStatus::Canceled => "canceled",
            ChargeStatus::Refunded => "refunded",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ChargeStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ChargeStatus::Pending),
            "paid" => Ok(ChargeStatus::Paid),
            "failed" => Ok(ChargeStatus::Failed),
            "canceled" => Ok(ChargeStatus::Canceled),
            "refunded" => Ok(ChargeStatus::Refunded),
            other => Err(DomainError::Validation(format!(
                "unknown charge status: {other:?}"
            ))),
        }
    }
}

/// Payment method used for a charge, also the channel for payouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Pix,
    CreditCard,
    DebitCard,
    Boleto,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentMethod::Pix => "pix",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::Boleto => "boleto",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pix" => Ok(PaymentMethod::Pix),
            "credit_card" => Ok(PaymentMethod::CreditCard),
            "debit_card" => Ok(PaymentMethod::DebitCard),
            "boleto" => Ok(PaymentMethod::Boleto),
            other => Err(DomainError::Validation(format!(
                "unknown payment method: {other:?}"
            ))),
        }
    }
}

/// Canonical, deduplicated charge record.
///
/// Created on first sight of a source charge id and updated in place until
/// terminal. Amounts are integer cents; `paid_amount` is zero until the
/// charge settles.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChargeRecord {
    /// Source-system charge id (unique)
    pub id: ChargeId,
    /// Provider the earnings are attributable to
    pub provider_id: ProviderId,
    /// Paying customer
    pub customer_id: CustomerId,
    /// Amount originally requested
    pub requested_amount: Money,
    /// Amount actually settled (zero unless paid/refunded)
    pub paid_amount: Money,
    pub status: ChargeStatus,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

impl ChargeRecord {
    /// Returns a copy of this record with a new status (and settled amount,
    /// when transitioning into `Paid`). Fails on an illegal transition.
    pub fn with_status(
        &self,
        status: ChargeStatus,
        paid_amount: Option<Money>,
    ) -> Result<Self, DomainError> {
        if !self.status.can_transition_to(status) {
            return Err(DomainError::InvalidChargeTransition {
                from: self.status,
                to: status,
            });
        }
        let mut next = self.clone();
        next.status = status;
        if status == ChargeStatus::Paid {
            next.paid_amount = paid_amount.unwrap_or(self.requested_amount);
        }
        Ok(next)
    }
}

/// Ledger delta emitted by ingest when a settled charge is refunded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerAdjustment {
    pub provider_id: ProviderId,
    pub charge_id: ChargeId,
    /// Negative for refunds.
    pub delta: Money,
}
