//! Stand-in payment gateway adapter.
//!
//! The real gateway wire protocol is a separate collaborator; this
//! adapter satisfies the port for local runs and demos by acknowledging
//! every transfer with a fabricated id.

use async_trait::async_trait;
use uuid::Uuid;

use earnings_types::{
    GatewayError, Money, PaymentGateway, PaymentMethod, ProviderId, TransferReceipt,
    TransferStatus,
};

/// Gateway that accepts every transfer without moving real money.
#[derive(Debug, Default)]
pub struct DryRunGateway;

impl DryRunGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentGateway for DryRunGateway {
    async fn execute_transfer(
        &self,
        provider_id: ProviderId,
        amount: Money,
        method: PaymentMethod,
        _description: &str,
        idempotency_key: &str,
    ) -> Result<TransferReceipt, GatewayError> {
        let transfer_id = format!("dryrun-{}", Uuid::new_v4());
        tracing::info!(
            %provider_id,
            amount_cents = amount.cents(),
            %method,
            idempotency_key,
            %transfer_id,
            "dry-run transfer accepted"
        );
        Ok(TransferReceipt { transfer_id })
    }

    async fn lookup_transfer(
        &self,
        _idempotency_key: &str,
    ) -> Result<TransferStatus, GatewayError> {
        // Nothing was really dispatched, so there is nothing to look up.
        Ok(TransferStatus::Unknown)
    }
}
