//! In-memory ledger repository adapter.
//!
//! Backed by `DashMap`, whose per-key entry locks give exactly the
//! per-provider serialization the port demands: two mutations for the
//! same provider queue behind the same shard entry, while distinct
//! providers proceed in parallel. Reads use `get()` and never wait on a
//! reservation held by an in-flight payout.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use earnings_types::{
    ChargeId, ChargeRecord, ChargeStatus, DomainError, LedgerRepository, Money, PayoutRequest,
    PayoutStatus, ProviderAccount, ProviderBalance, ProviderId, RepoError, Reservation,
    ReservationToken,
};

/// In-memory repository. The default store for tests and local runs.
#[derive(Default)]
pub struct MemoryRepo {
    charges: DashMap<ChargeId, ChargeRecord>,
    ledgers: DashMap<ProviderId, ProviderAccount>,
    payouts: DashMap<String, PayoutRequest>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerRepository for MemoryRepo {
    async fn insert_charge(&self, record: ChargeRecord) -> Result<bool, RepoError> {
        match self.charges.entry(record.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(true)
            }
        }
    }

    async fn get_charge(&self, id: &ChargeId) -> Result<Option<ChargeRecord>, RepoError> {
        Ok(self.charges.get(id).map(|r| r.clone()))
    }

    async fn update_charge(
        &self,
        expected: ChargeStatus,
        updated: ChargeRecord,
    ) -> Result<bool, RepoError> {
        match self.charges.get_mut(&updated.id) {
            Some(mut entry) if entry.status == expected => {
                *entry = updated;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(RepoError::NotFound),
        }
    }

    async fn charges_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ChargeRecord>, RepoError> {
        Ok(self
            .charges
            .iter()
            .filter(|r| r.created_at >= start && r.created_at < end)
            .map(|r| r.clone())
            .collect())
    }

    async fn get_balance(&self, provider_id: ProviderId) -> Result<ProviderBalance, RepoError> {
        Ok(self
            .ledgers
            .get(&provider_id)
            .map(|a| a.balance())
            .unwrap_or_else(|| ProviderBalance::empty(provider_id)))
    }

    async fn apply_earning(&self, provider_id: ProviderId, delta: Money) -> Result<(), RepoError> {
        let mut account = self
            .ledgers
            .entry(provider_id)
            .or_insert_with(|| ProviderAccount::new(provider_id));
        account.apply_earning(delta).map_err(RepoError::from)
    }

    async fn reserve(
        &self,
        provider_id: ProviderId,
        amount: Money,
    ) -> Result<ReservationToken, RepoError> {
        match self.ledgers.get_mut(&provider_id) {
            Some(mut account) => account.reserve(amount).map_err(RepoError::from),
            // No attributable earnings yet, so nothing is available.
            None => Err(RepoError::Domain(DomainError::InsufficientFunds {
                available: 0,
                requested: amount.cents(),
            })),
        }
    }

    async fn commit_reservation(&self, token: &ReservationToken) -> Result<(), RepoError> {
        let mut account = self
            .ledgers
            .get_mut(&token.provider_id)
            .ok_or(RepoError::NotFound)?;
        account.commit_reservation(token).map_err(RepoError::from)
    }

    async fn release_reservation(&self, token: &ReservationToken) -> Result<(), RepoError> {
        let mut account = self
            .ledgers
            .get_mut(&token.provider_id)
            .ok_or(RepoError::NotFound)?;
        account.release_reservation(token).map_err(RepoError::from)
    }

    async fn current_reservation(
        &self,
        provider_id: ProviderId,
    ) -> Result<Option<Reservation>, RepoError> {
        Ok(self.ledgers.get(&provider_id).and_then(|a| a.reservation))
    }

    async fn insert_payout(
        &self,
        request: PayoutRequest,
    ) -> Result<Option<PayoutRequest>, RepoError> {
        match self.payouts.entry(request.idempotency_key.clone()) {
            Entry::Occupied(existing) => Ok(Some(existing.get().clone())),
            Entry::Vacant(slot) => {
                slot.insert(request);
                Ok(None)
            }
        }
    }

    async fn get_payout(&self, idempotency_key: &str) -> Result<Option<PayoutRequest>, RepoError> {
        Ok(self.payouts.get(idempotency_key).map(|r| r.clone()))
    }

    async fn update_payout(
        &self,
        expected: PayoutStatus,
        only_if_undispatched: bool,
        updated: PayoutRequest,
    ) -> Result<bool, RepoError> {
        match self.payouts.get_mut(&updated.idempotency_key) {
            Some(mut entry) => {
                if entry.status != expected || (only_if_undispatched && entry.was_dispatched()) {
                    return Ok(false);
                }
                *entry = updated;
                Ok(true)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn list_payouts(
        &self,
        provider_id: ProviderId,
        status: Option<PayoutStatus>,
    ) -> Result<Vec<PayoutRequest>, RepoError> {
        let mut requests: Vec<PayoutRequest> = self
            .payouts
            .iter()
            .filter(|r| r.provider_id == provider_id)
            .filter(|r| status.is_none_or(|s| r.status == s))
            .map(|r| r.clone())
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }
}
