//! Payout processor.
//!
//! Creation is idempotent by the caller-supplied key: the payout record
//! itself doubles as the idempotency store, inserted first-writer-wins
//! before any money moves. The ledger hold is taken before the gateway
//! call and resolved strictly after its outcome is known; a timed-out
//! call resolves nothing and leaves the hold for the reconciliation pass.

use std::time::Duration;

use earnings_types::{
    AppError, CreatePayoutRequest, LedgerRepository, Money, PaymentGateway, PayoutRequest,
    PayoutResponse, PayoutStatus, ProviderId, ReservationToken, TransferStatus,
};

/// Creates (or re-observes) a payout request.
///
/// A duplicate idempotency key returns the stored request in whatever
/// state it reached, with no second ledger mutation and no second
/// gateway call. The gateway call itself runs under `gateway_timeout`
/// and outside any lock.
pub(crate) async fn create_payout<R: LedgerRepository, G: PaymentGateway>(
    repo: &R,
    gateway: &G,
    gateway_timeout: Duration,
    req: CreatePayoutRequest,
) -> Result<PayoutResponse, AppError> {
    if req.idempotency_key.trim().is_empty() {
        return Err(AppError::BadRequest("idempotency key is required".into()));
    }
    if req.amount_cents <= 0 {
        return Err(AppError::BadRequest(
            "payout amount must be positive".into(),
        ));
    }
    let amount = Money::from_cents(req.amount_cents);

    let request = PayoutRequest::new(
        req.idempotency_key.clone(),
        req.provider_id,
        amount,
        req.method,
        req.description.clone(),
    );
    if let Some(existing) = repo.insert_payout(request.clone()).await? {
        tracing::info!(
            idempotency_key = %existing.idempotency_key,
            status = %existing.status,
            "duplicate payout request; returning stored state"
        );
        return Ok(existing.into());
    }

    // This call owns the request from here on. Reserve before dispatch;
    // any reservation failure terminates the request synchronously.
    let token = match repo.reserve(req.provider_id, amount).await {
        Ok(token) => token,
        Err(err) => {
            let app_err = AppError::from(err);
            let failed = request.failed(app_err.to_string(), false);
            repo.update_payout(PayoutStatus::Pending, false, failed)
                .await?;
            return Err(app_err);
        }
    };

    // Mark dispatch before calling out. If a cancel won this race the
    // hold is returned and the caller sees the canceled record.
    let dispatched = request.dispatched();
    if !repo
        .update_payout(PayoutStatus::Pending, true, dispatched.clone())
        .await?
    {
        repo.release_reservation(&token).await?;
        let stored = repo
            .get_payout(&req.idempotency_key)
            .await?
            .ok_or_else(|| AppError::Internal("payout record vanished".into()))?;
        return Ok(stored.into());
    }

    let outcome = tokio::time::timeout(
        gateway_timeout,
        gateway.execute_transfer(
            req.provider_id,
            amount,
            req.method,
            &req.description,
            &req.idempotency_key,
        ),
    )
    .await;

    match outcome {
        Ok(Ok(receipt)) => {
            repo.commit_reservation(&token).await?;
            let completed = dispatched.completed(receipt.transfer_id);
            repo.update_payout(PayoutStatus::Pending, false, completed.clone())
                .await?;
            tracing::info!(
                idempotency_key = %completed.idempotency_key,
                provider_id = %completed.provider_id,
                amount_cents = completed.amount.cents(),
                "payout completed"
            );
            Ok(completed.into())
        }
        Ok(Err(err)) => {
            repo.release_reservation(&token).await?;
            let retryable = err.retryable();
            let failed = dispatched.failed(err.to_string(), retryable);
            repo.update_payout(PayoutStatus::Pending, false, failed)
                .await?;
            tracing::warn!(
                idempotency_key = %req.idempotency_key,
                retryable,
                "gateway rejected payout"
            );
            Err(err.into())
        }
        Err(_elapsed) => {
            // The transfer may or may not have gone through. Keep the
            // hold; only the reconciliation pass may resolve it.
            let pending_external = dispatched.pending_external();
            repo.update_payout(PayoutStatus::Pending, false, pending_external)
                .await?;
            tracing::warn!(
                idempotency_key = %req.idempotency_key,
                timeout_secs = gateway_timeout.as_secs(),
                "gateway call timed out; payout awaits reconciliation"
            );
            Err(AppError::TimeoutAmbiguous {
                idempotency_key: req.idempotency_key,
            })
        }
    }
}

/// Cancels a payout request that has not yet been handed to the gateway.
///
/// Races against the in-flight creator via the dispatch guard: whichever
/// update lands first wins, and a creator that loses releases its hold.
pub(crate) async fn cancel_payout<R: LedgerRepository>(
    repo: &R,
    idempotency_key: &str,
) -> Result<PayoutResponse, AppError> {
    let request = repo
        .get_payout(idempotency_key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("payout {idempotency_key}")))?;

    if request.status != PayoutStatus::Pending || request.was_dispatched() {
        return Err(AppError::BadRequest(
            "payout can no longer be canceled".into(),
        ));
    }

    let canceled = request.failed("canceled by caller".into(), false);
    if repo
        .update_payout(PayoutStatus::Pending, true, canceled.clone())
        .await?
    {
        tracing::info!(idempotency_key, "payout canceled before dispatch");
        Ok(canceled.into())
    } else {
        Err(AppError::BadRequest(
            "payout can no longer be canceled".into(),
        ))
    }
}

/// Resolves payouts stranded by ambiguous gateway timeouts.
///
/// For each `pending_external` request the gateway is asked for the
/// truth: a completed transfer commits the hold, a failed one releases
/// it, and an unknown outcome leaves everything untouched for the next
/// pass. Returns the requests that were resolved.
pub(crate) async fn reconcile_pending<R: LedgerRepository, G: PaymentGateway>(
    repo: &R,
    gateway: &G,
    provider_id: ProviderId,
) -> Result<Vec<PayoutResponse>, AppError> {
    let stranded = repo
        .list_payouts(provider_id, Some(PayoutStatus::PendingExternal))
        .await?;
    let mut resolved = Vec::new();

    for request in stranded {
        match gateway.lookup_transfer(&request.idempotency_key).await? {
            TransferStatus::Unknown => {
                // No verdict yet. Guessing either way would corrupt the
                // ledger, so the request stays stranded.
                tracing::debug!(
                    idempotency_key = %request.idempotency_key,
                    "transfer outcome still unknown"
                );
            }
            TransferStatus::Completed { transfer_id } => {
                let Some(token) = stranded_token(repo, &request).await? else {
                    continue;
                };
                repo.commit_reservation(&token).await?;
                let completed = request.completed(transfer_id);
                repo.update_payout(PayoutStatus::PendingExternal, false, completed.clone())
                    .await?;
                tracing::info!(
                    idempotency_key = %completed.idempotency_key,
                    "reconciliation confirmed transfer; payout completed"
                );
                resolved.push(completed.into());
            }
            TransferStatus::Failed { retryable, reason } => {
                let Some(token) = stranded_token(repo, &request).await? else {
                    continue;
                };
                repo.release_reservation(&token).await?;
                let failed = request.failed(reason, retryable);
                repo.update_payout(PayoutStatus::PendingExternal, false, failed.clone())
                    .await?;
                tracing::info!(
                    idempotency_key = %failed.idempotency_key,
                    "reconciliation found failed transfer; hold released"
                );
                resolved.push(failed.into());
            }
        }
    }

    Ok(resolved)
}

/// Rebuilds the reservation token for a stranded payout from the ledger's
/// outstanding hold. A missing or mismatched hold means the ledger and
/// the payout store disagree; the record is skipped and reported.
async fn stranded_token<R: LedgerRepository>(
    repo: &R,
    request: &PayoutRequest,
) -> Result<Option<ReservationToken>, AppError> {
    match repo.current_reservation(request.provider_id).await {
        Ok(Some(reservation)) if reservation.amount == request.amount => Ok(Some(ReservationToken {
            provider_id: request.provider_id,
            reservation_id: reservation.id,
            amount: reservation.amount,
        })),
        Ok(_) => {
            tracing::error!(
                idempotency_key = %request.idempotency_key,
                provider_id = %request.provider_id,
                "stranded payout has no matching ledger hold"
            );
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}
