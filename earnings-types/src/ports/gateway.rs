//! Payment gateway port.
//!
//! The wire protocol of the real gateway is out of scope; this trait is
//! the only surface the payout processor sees. Implementations can be
//! HTTP clients, sandbox stubs, or test mocks.

use crate::domain::{Money, PaymentMethod, ProviderId};
use crate::error::GatewayError;

/// Successful transfer acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub transfer_id: String,
}

/// Outcome of a reconciliation lookup for a previously dispatched
/// transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    Completed { transfer_id: String },
    Failed { retryable: bool, reason: String },
    /// The gateway has no record (or no decision) yet. The caller must
    /// keep waiting; guessing would corrupt the ledger.
    Unknown,
}

/// Port trait for the external payment gateway.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    /// Executes a transfer to the provider. The idempotency key is
    /// forwarded so gateway-side retries are also exactly-once.
    async fn execute_transfer(
        &self,
        provider_id: ProviderId,
        amount: Money,
        method: PaymentMethod,
        description: &str,
        idempotency_key: &str,
    ) -> Result<TransferReceipt, GatewayError>;

    /// Queries the true outcome of a transfer whose original call timed
    /// out. Used only by the reconciliation pass.
    async fn lookup_transfer(&self, idempotency_key: &str)
    -> Result<TransferStatus, GatewayError>;
}
