//! Application service orchestrating ingest, ledger, payouts, and
//! analytics over the injected repository and gateway ports.

use std::time::Duration;

use earnings_types::{
    AnalyticsParams, AnalyticsResponse, AppError, BalanceResponse, CreatePayoutRequest,
    Granularity, IngestResponse, LedgerRepository, PaymentGateway, PayoutFilter, PayoutResponse,
    ProviderId, RawCharge,
};

use crate::{analytics, ingest, payout};

/// Generic application service.
pub struct EarningsService<R: LedgerRepository, G: PaymentGateway> {
    repo: R,
    gateway: G,
    gateway_timeout: Duration,
}

impl<R: LedgerRepository, G: PaymentGateway> EarningsService<R, G> {
    pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a new service with the default gateway timeout.
    pub fn new(repo: R, gateway: G) -> Self {
        Self {
            repo,
            gateway,
            gateway_timeout: Self::DEFAULT_GATEWAY_TIMEOUT,
        }
    }

    /// Overrides the bound on a single gateway transfer call.
    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    /// Returns a reference to the repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Ingests one raw charge from the source system.
    pub async fn ingest_charge(&self, raw: RawCharge) -> Result<IngestResponse, AppError> {
        ingest::ingest_charge(&self.repo, raw).await
    }

    /// Balance snapshot for a provider; zero for unseen providers.
    pub async fn get_balance(&self, provider_id: ProviderId) -> Result<BalanceResponse, AppError> {
        Ok(self.repo.get_balance(provider_id).await?.into())
    }

    /// Creates a payout, or returns the stored state for a repeated
    /// idempotency key.
    pub async fn create_payout(
        &self,
        req: CreatePayoutRequest,
    ) -> Result<PayoutResponse, AppError> {
        payout::create_payout(&self.repo, &self.gateway, self.gateway_timeout, req).await
    }

    /// Cancels a payout that has not yet been handed to the gateway.
    pub async fn cancel_payout(&self, idempotency_key: &str) -> Result<PayoutResponse, AppError> {
        payout::cancel_payout(&self.repo, idempotency_key).await
    }

    /// Runs the reconciliation pass for a provider's stranded payouts.
    pub async fn reconcile_provider(
        &self,
        provider_id: ProviderId,
    ) -> Result<Vec<PayoutResponse>, AppError> {
        payout::reconcile_pending(&self.repo, &self.gateway, provider_id).await
    }

    /// Payout requests for a provider, newest first.
    pub async fn list_payouts(
        &self,
        provider_id: ProviderId,
        filter: PayoutFilter,
    ) -> Result<Vec<PayoutResponse>, AppError> {
        let requests = self.repo.list_payouts(provider_id, filter.status).await?;
        Ok(requests.into_iter().map(Into::into).collect())
    }

    /// Aggregates analytics over `[start, end)` and slices the requested
    /// granularity out of the single-pass report.
    pub async fn get_analytics(
        &self,
        params: AnalyticsParams,
    ) -> Result<AnalyticsResponse, AppError> {
        if params.end <= params.start {
            return Err(AppError::BadRequest(
                "analytics window requires start < end".into(),
            ));
        }
        let charges = self.repo.charges_in_range(params.start, params.end).await?;
        let report = analytics::aggregate(&charges, params.start, params.end)?;

        let granularity = params.granularity.unwrap_or(Granularity::Day);
        let peak_hour = report.peak_hour();
        let buckets = match granularity {
            Granularity::Day => report.daily,
            Granularity::Hour => report.hourly,
        };

        Ok(AnalyticsResponse {
            start: params.start,
            end: params.end,
            granularity,
            buckets,
            methods: report.methods,
            funnel: report.funnel,
            total_revenue_cents: report.total_revenue.cents(),
            peak_hour,
        })
    }
}
