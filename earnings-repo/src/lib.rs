//! # Earnings Repository
//!
//! Concrete store adapters for the earnings ledger. This crate provides
//! implementations of the `LedgerRepository` port: an in-memory adapter
//! (default) and a SQLite adapter behind the `sqlite` feature.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use earnings_types::{
    ChargeId, ChargeRecord, ChargeStatus, LedgerRepository, Money, PayoutRequest, PayoutStatus,
    ProviderBalance, ProviderId, RepoError, Reservation, ReservationToken,
};

pub mod gateway;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
mod types;


pub use gateway::DryRunGateway;
pub use memory::MemoryRepo;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRepo;

/// Unified repository wrapper selecting the backend from the database URL.
pub enum Repo {
    Memory(MemoryRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteRepo),
}

/// Build and initialize a repository from a database URL.
///
/// `memory://` (or an empty URL) selects the in-memory store;
/// `sqlite://...` selects the SQLite adapter and runs its migration.
pub async fn build_repo(database_url: &str) -> anyhow::Result<Repo> {
    if database_url.is_empty() || database_url.starts_with("memory") {
        return Ok(Repo::Memory(MemoryRepo::new()));
    }

    #[cfg(feature = "sqlite")]
    if database_url.starts_with("sqlite") {
        return Ok(Repo::Sqlite(SqliteRepo::new(database_url).await?));
    }

    anyhow::bail!("unsupported database url: {database_url}")
}

macro_rules! delegate {
    ($self:ident, $inner:ident => $body:expr) => {
        match $self {
            Repo::Memory($inner) => $body,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite($inner) => $body,
        }
    };
}

#[async_trait]
impl LedgerRepository for Repo {
    async fn insert_charge(&self, record: ChargeRecord) -> Result<bool, RepoError> {
        delegate!(self, inner => inner.insert_charge(record).await)
    }

    async fn get_charge(&self, id: &ChargeId) -> Result<Option<ChargeRecord>, RepoError> {
        delegate!(self, inner => inner.get_charge(id).await)
    }

    async fn update_charge(
        &self,
        expected: ChargeStatus,
        updated: ChargeRecord,
    ) -> Result<bool, RepoError> {
        delegate!(self, inner => inner.update_charge(expected, updated).await)
    }

    async fn charges_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ChargeRecord>, RepoError> {
        delegate!(self, inner => inner.charges_in_range(start, end).await)
    }

    async fn get_balance(&self, provider_id: ProviderId) -> Result<ProviderBalance, RepoError> {
        delegate!(self, inner => inner.get_balance(provider_id).await)
    }

    async fn apply_earning(&self, provider_id: ProviderId, delta: Money) -> Result<(), RepoError> {
        delegate!(self, inner => inner.apply_earning(provider_id, delta).await)
    }

    async fn reserve(
        &self,
        provider_id: ProviderId,
        amount: Money,
    ) -> Result<ReservationToken, RepoError> {
        delegate!(self, inner => inner.reserve(provider_id, amount).await)
    }

    async fn commit_reservation(&self, token: &ReservationToken) -> Result<(), RepoError> {
        delegate!(self, inner => inner.commit_reservation(token).await)
    }

    async fn release_reservation(&self, token: &ReservationToken) -> Result<(), RepoError> {
        delegate!(self, inner => inner.release_reservation(token).await)
    }

    async fn current_reservation(
        &self,
        provider_id: ProviderId,
    ) -> Result<Option<Reservation>, RepoError> {
        delegate!(self, inner => inner.current_reservation(provider_id).await)
    }

    async fn insert_payout(
        &self,
        request: PayoutRequest,
    ) -> Result<Option<PayoutRequest>, RepoError> {
        delegate!(self, inner => inner.insert_payout(request).await)
    }

    async fn get_payout(&self, idempotency_key: &str) -> Result<Option<PayoutRequest>, RepoError> {
        delegate!(self, inner => inner.get_payout(idempotency_key).await)
    }

    async fn update_payout(
        &self,
        expected: PayoutStatus,
        only_if_undispatched: bool,
        updated: PayoutRequest,
    ) -> Result<bool, RepoError> {
        delegate!(self, inner => inner.update_payout(expected, only_if_undispatched, updated).await)
    }

    async fn list_payouts(
        &self,
        provider_id: ProviderId,
        status: Option<PayoutStatus>,
    ) -> Result<Vec<PayoutRequest>, RepoError> {
        delegate!(self, inner => inner.list_payouts(provider_id, status).await)
    }
}
