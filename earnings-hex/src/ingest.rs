//! Charge ingest pipeline.
//!
//! Raw payloads from the charge source arrive with decimal string amounts
//! and free-form status/method strings; everything is normalized at this
//! boundary. Ingest is idempotent by source charge id: re-deliveries only
//! touch the record when the status actually advanced, and the ledger is
//! credited exactly once per settlement.

use std::str::FromStr;

use earnings_types::{
    AppError, ChargeId, ChargeRecord, ChargeStatus, CustomerId, DomainError, IngestOutcome,
    IngestResponse, LedgerAdjustment, LedgerRepository, Money, PaymentMethod, ProviderId,
    RawCharge, RepoError,
};

/// Converts a raw payload into a canonical record, rejecting malformed
/// amounts, ids, and enums. Settled charges with no explicit paid amount
/// settle at the requested amount.
fn normalize(raw: &RawCharge) -> Result<ChargeRecord, AppError> {
    if raw.id.trim().is_empty() {
        return Err(AppError::BadRequest("charge id is required".into()));
    }
    let provider_id = ProviderId::from_str(&raw.provider_id)
        .map_err(|_| AppError::BadRequest(format!("invalid provider id: {:?}", raw.provider_id)))?;
    let status = ChargeStatus::from_str(&raw.status)?;
    let payment_method = PaymentMethod::from_str(&raw.payment_method)?;

    let requested_amount = Money::parse_decimal(&raw.requested_amount)?;
    if requested_amount.is_negative() {
        return Err(AppError::BadRequest(
            "requested amount cannot be negative".into(),
        ));
    }
    let settled = match raw.paid_amount.as_deref() {
        Some(s) => Money::parse_decimal(s)?,
        None => Money::ZERO,
    };
    if settled.is_negative() {
        return Err(AppError::BadRequest("paid amount cannot be negative".into()));
    }
    let paid_amount = match status {
        ChargeStatus::Paid | ChargeStatus::Refunded => {
            if settled.is_positive() {
                settled
            } else {
                requested_amount
            }
        }
        _ => Money::ZERO,
    };

    Ok(ChargeRecord {
        id: ChargeId::new(raw.id.clone()),
        provider_id,
        customer_id: CustomerId::new(raw.customer_id.clone()),
        requested_amount,
        paid_amount,
        status,
        payment_method,
        created_at: raw.created_at,
    })
}

/// Ingests one raw charge.
///
/// Concurrency-safe without holding any lock across the calls: both the
/// first-sight insert and the status update are first-writer-wins in the
/// store, and a lost race simply re-reads and re-evaluates. The ledger is
/// touched only by the writer that won, so a settlement is credited once
/// no matter how many times the source re-delivers it.
pub(crate) async fn ingest_charge<R: LedgerRepository>(
    repo: &R,
    raw: RawCharge,
) -> Result<IngestResponse, AppError> {
    let incoming = normalize(&raw)?;

    loop {
        match repo.get_charge(&incoming.id).await? {
            None => {
                if !repo.insert_charge(incoming.clone()).await? {
                    // Lost the first-sight race; re-read and reconcile.
                    continue;
                }
                if incoming.status == ChargeStatus::Paid {
                    repo.apply_earning(incoming.provider_id, incoming.paid_amount)
                        .await?;
                }
                tracing::info!(charge_id = %incoming.id, status = %incoming.status, "charge created");
                return Ok(IngestResponse {
                    charge_id: incoming.id.to_string(),
                    outcome: IngestOutcome::Created,
                });
            }
            Some(existing) => {
                if existing.status == incoming.status {
                    return Ok(IngestResponse {
                        charge_id: incoming.id.to_string(),
                        outcome: IngestOutcome::Unchanged,
                    });
                }
                if !existing.status.can_transition_to(incoming.status) {
                    // Out-of-order or duplicate delivery of an older
                    // event; the stored record is already further along.
                    tracing::warn!(
                        charge_id = %incoming.id,
                        stored = %existing.status,
                        received = %incoming.status,
                        "ignoring stale charge status"
                    );
                    return Ok(IngestResponse {
                        charge_id: incoming.id.to_string(),
                        outcome: IngestOutcome::Unchanged,
                    });
                }

                let paid_amount = incoming
                    .paid_amount
                    .is_positive()
                    .then_some(incoming.paid_amount);
                let updated = existing.with_status(incoming.status, paid_amount)?;
                if !repo.update_charge(existing.status, updated.clone()).await? {
                    continue;
                }

                match (existing.status, updated.status) {
                    (ChargeStatus::Pending, ChargeStatus::Paid) => {
                        repo.apply_earning(updated.provider_id, updated.paid_amount)
                            .await?;
                    }
                    (ChargeStatus::Paid, ChargeStatus::Refunded) => {
                        let adjustment = LedgerAdjustment {
                            provider_id: existing.provider_id,
                            charge_id: existing.id.clone(),
                            delta: existing.paid_amount.negated()?,
                        };
                        apply_adjustment(repo, adjustment).await?;
                    }
                    _ => {}
                }
                tracing::info!(
                    charge_id = %updated.id,
                    from = %existing.status,
                    to = %updated.status,
                    "charge updated"
                );
                return Ok(IngestResponse {
                    charge_id: updated.id.to_string(),
                    outcome: IngestOutcome::Updated,
                });
            }
        }
    }
}

/// Feeds a refund delta into the ledger. A refund the ledger cannot
/// honor freezes the provider account; the charge stays refunded and the
/// mismatch is surfaced for an operator.
async fn apply_adjustment<R: LedgerRepository>(
    repo: &R,
    adjustment: LedgerAdjustment,
) -> Result<(), AppError> {
    match repo
        .apply_earning(adjustment.provider_id, adjustment.delta)
        .await
    {
        Ok(()) => Ok(()),
        Err(RepoError::Domain(DomainError::ReconciliationMismatch {
            provider_id,
            delta,
            available,
        })) => {
            tracing::error!(
                %provider_id,
                charge_id = %adjustment.charge_id,
                delta,
                available,
                "refund exceeds attributable earnings; provider ledger frozen"
            );
            Err(AppError::ProviderFrozen(provider_id))
        }
        Err(err) => Err(err.into()),
    }
}
