//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use earnings_types::domain::{ChargeId, CustomerId, ProviderId};
use earnings_types::dto::{
    AnalyticsResponse, BalanceResponse, CreatePayoutRequest, IngestOutcome, IngestResponse,
    PayoutResponse, RawCharge,
};
use earnings_types::{
    AnalyticsBucket, ChargeStatus, FunnelMetrics, Granularity, MethodBreakdown, Money,
    PaymentMethod, PayoutStatus,
};
use utoipa::OpenApi;

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = inline(serde_json::Value), example = json!({"status": "healthy"}))
    )
)]
async fn health() {}

/// Ingest a raw charge from the source system
#[utoipa::path(
    post,
    path = "/api/charges",
    tag = "charges",
    request_body = RawCharge,
    responses(
        (status = 201, description = "Charge created", body = IngestResponse),
        (status = 200, description = "Charge updated or unchanged (idempotent re-delivery)", body = IngestResponse),
        (status = 400, description = "Malformed payload"),
        (status = 409, description = "Refund froze the provider ledger")
    )
)]
async fn ingest_charge() {}

/// Get a provider's balance snapshot
#[utoipa::path(
    get,
    path = "/api/providers/{id}/balance",
    tag = "ledger",
    params(
        ("id" = ProviderId, Path, description = "Provider ID (UUID)")
    ),
    responses(
        (status = 200, description = "Balance snapshot (zero for unseen providers)", body = BalanceResponse),
        (status = 400, description = "Invalid provider id")
    )
)]
async fn get_balance() {}

/// Create a payout (idempotent by key)
#[utoipa::path(
    post,
    path = "/api/payouts",
    tag = "payouts",
    request_body = CreatePayoutRequest,
    responses(
        (status = 200, description = "Payout state (newly completed, or stored state for a repeated key)", body = PayoutResponse),
        (status = 400, description = "Validation failure or insufficient funds"),
        (status = 409, description = "Provider ledger is frozen"),
        (status = 502, description = "Gateway rejected the transfer"),
        (status = 504, description = "Gateway timed out; outcome pending reconciliation")
    )
)]
async fn create_payout() {}

/// Cancel a payout before dispatch
#[utoipa::path(
    post,
    path = "/api/payouts/{key}/cancel",
    tag = "payouts",
    params(
        ("key" = String, Path, description = "Idempotency key of the payout")
    ),
    responses(
        (status = 200, description = "Payout canceled", body = PayoutResponse),
        (status = 400, description = "Payout already dispatched or terminal"),
        (status = 404, description = "Unknown idempotency key")
    )
)]
async fn cancel_payout() {}

/// List a provider's payout requests
#[utoipa::path(
    get,
    path = "/api/providers/{id}/payouts",
    tag = "payouts",
    params(
        ("id" = ProviderId, Path, description = "Provider ID (UUID)"),
        ("status" = Option<PayoutStatus>, Query, description = "Filter by payout status")
    ),
    responses(
        (status = 200, description = "Payout requests, newest first", body = Vec<PayoutResponse>),
        (status = 400, description = "Invalid provider id")
    )
)]
async fn list_payouts() {}

/// Reconcile payouts stranded by gateway timeouts
#[utoipa::path(
    post,
    path = "/api/providers/{id}/reconcile",
    tag = "payouts",
    params(
        ("id" = ProviderId, Path, description = "Provider ID (UUID)")
    ),
    responses(
        (status = 200, description = "Payouts resolved by this pass", body = Vec<PayoutResponse>),
        (status = 400, description = "Invalid provider id")
    )
)]
async fn reconcile_provider() {}

/// Time-bucketed analytics over a half-open window
#[utoipa::path(
    get,
    path = "/api/analytics",
    tag = "analytics",
    params(
        ("start" = String, Query, description = "Window start (RFC 3339, inclusive)"),
        ("end" = String, Query, description = "Window end (RFC 3339, exclusive)"),
        ("granularity" = Option<Granularity>, Query, description = "Bucket width for the time series (default: day)")
    ),
    responses(
        (status = 200, description = "Aggregated report", body = AnalyticsResponse),
        (status = 400, description = "Invalid window")
    )
)]
async fn get_analytics() {}

/// OpenAPI documentation for the Earnings Ledger API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Provider Earnings Ledger API",
        version = "1.0.0",
        description = "Earnings ledger and reconciliation engine: idempotent charge ingest, per-provider balances with payout reservations, an idempotent payout processor, and single-pass time-bucketed analytics.",
        license(name = "MIT"),
    ),
    paths(
        health,
        ingest_charge,
        get_balance,
        create_payout,
        cancel_payout,
        list_payouts,
        reconcile_provider,
        get_analytics,
    ),
    components(
        schemas(
            RawCharge,
            IngestResponse,
            IngestOutcome,
            BalanceResponse,
            CreatePayoutRequest,
            PayoutResponse,
            AnalyticsResponse,
            AnalyticsBucket,
            MethodBreakdown,
            FunnelMetrics,
            Money,
            ChargeId,
            CustomerId,
            ProviderId,
            ChargeStatus,
            PaymentMethod,
            PayoutStatus,
            Granularity,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "charges", description = "Charge ingest"),
        (name = "ledger", description = "Provider balances"),
        (name = "payouts", description = "Payout creation, cancellation, and reconciliation"),
        (name = "analytics", description = "Time-bucketed aggregation")
    )
)]
pub struct ApiDoc;
