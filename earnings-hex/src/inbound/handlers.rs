//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use earnings_types::{
    AnalyticsParams, AppError, CreatePayoutRequest, IngestOutcome, LedgerRepository,
    PaymentGateway, PayoutFilter, ProviderId, RawCharge,
};

use crate::EarningsService;

/// Application state shared across handlers.
pub struct AppState<R: LedgerRepository, G: PaymentGateway> {
    pub service: EarningsService<R, G>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::BadRequest(_) | AppError::InsufficientFunds { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ProviderFrozen(_) => StatusCode::CONFLICT,
            AppError::Gateway { .. } => StatusCode::BAD_GATEWAY,
            AppError::TimeoutAmbiguous { .. } => StatusCode::GATEWAY_TIMEOUT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let mut body = serde_json::json!({
            "error": self.0.to_string(),
            "code": status.as_u16(),
        });
        match &self.0 {
            // The dashboard offers a retry affordance on retryable
            // gateway failures, so the flag is part of the payload.
            AppError::Gateway { retryable, .. } => {
                body["retryable"] = serde_json::json!(retryable);
            }
            // An ambiguous outcome must never render as completed.
            AppError::TimeoutAmbiguous { idempotency_key } => {
                body["payout_status"] = serde_json::json!("pending_external");
                body["idempotency_key"] = serde_json::json!(idempotency_key);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Ingest one raw charge from the source system.
#[tracing::instrument(skip(state, raw), fields(charge_id = %raw.id))]
pub async fn ingest_charge<R: LedgerRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Json(raw): Json<RawCharge>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.service.ingest_charge(raw).await?;
    let status = if response.outcome == IngestOutcome::Created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(response)))
}

/// Balance snapshot for a provider.
#[tracing::instrument(skip(state), fields(provider_id = %id))]
pub async fn get_balance<R: LedgerRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let provider_id: ProviderId = id
        .parse()
        .map_err(|_| AppError::BadRequest("invalid provider id".into()))?;

    let balance = state.service.get_balance(provider_id).await?;
    Ok(Json(balance))
}

/// Create a payout (idempotent by the caller-supplied key).
#[tracing::instrument(
    skip(state, req),
    fields(provider_id = %req.provider_id, amount_cents = req.amount_cents)
)]
pub async fn create_payout<R: LedgerRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Json(req): Json<CreatePayoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let payout = state.service.create_payout(req).await?;
    Ok(Json(payout))
}

/// Cancel a payout before it is handed to the gateway.
#[tracing::instrument(skip(state))]
pub async fn cancel_payout<R: LedgerRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let payout = state.service.cancel_payout(&key).await?;
    Ok(Json(payout))
}

/// Resolve a provider's payouts stranded by gateway timeouts.
#[tracing::instrument(skip(state), fields(provider_id = %id))]
pub async fn reconcile_provider<R: LedgerRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let provider_id: ProviderId = id
        .parse()
        .map_err(|_| AppError::BadRequest("invalid provider id".into()))?;

    let resolved = state.service.reconcile_provider(provider_id).await?;
    Ok(Json(resolved))
}

/// List payout requests for a provider, newest first.
#[tracing::instrument(skip(state, filter), fields(provider_id = %id))]
pub async fn list_payouts<R: LedgerRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path(id): Path<String>,
    Query(filter): Query<PayoutFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let provider_id: ProviderId = id
        .parse()
        .map_err(|_| AppError::BadRequest("invalid provider id".into()))?;

    let payouts = state.service.list_payouts(provider_id, filter).await?;
    Ok(Json(payouts))
}

/// Time-bucketed analytics over a half-open window.
#[tracing::instrument(skip(state, params))]
pub async fn get_analytics<R: LedgerRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Query(params): Query<AnalyticsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.service.get_analytics(params).await?;
    Ok(Json(report))
}
