//! Ledger repository port.
//!
//! This is the primary port in the hexagonal architecture. Adapters
//! (in-memory, SQLite) implement this trait over three keyed stores:
//! charges by source charge id, ledger accounts by provider id, payout
//! requests by idempotency key with a (provider, created_at) index.

use chrono::{DateTime, Utc};

use crate::domain::{
    ChargeId, ChargeRecord, ChargeStatus, Money, PayoutRequest, PayoutStatus, ProviderBalance,
    ProviderId, Reservation, ReservationToken,
};
use crate::error::RepoError;

/// The main repository port for ledger state.
///
/// Balance-mutating operations MUST be atomic per provider: adapters
/// serialize them with a per-provider lock (or an equivalent guarded
/// update), never a global one, so unrelated providers proceed in
/// parallel. Reads never wait behind an outstanding reservation.
#[async_trait::async_trait]
pub trait LedgerRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────
    // Charge store (keyed by source charge id)
    // ─────────────────────────────────────────────────────────────────────────

    /// Inserts a charge if the id is unseen. Returns `false` when a record
    /// with the same id already exists (first writer wins).
    async fn insert_charge(&self, record: ChargeRecord) -> Result<bool, RepoError>;

    /// Gets a charge by source id.
    async fn get_charge(&self, id: &ChargeId) -> Result<Option<ChargeRecord>, RepoError>;

    /// Compare-and-swap status update: applies `updated` only while the
    /// stored status still equals `expected`. Returns `false` on a lost
    /// race so the caller can re-read and retry.
    async fn update_charge(
        &self,
        expected: ChargeStatus,
        updated: ChargeRecord,
    ) -> Result<bool, RepoError>;

    /// Snapshot of charges with `created_at` in `[start, end)`.
    async fn charges_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ChargeRecord>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Ledger store (keyed by provider id; atomic per provider)
    // ─────────────────────────────────────────────────────────────────────────

    /// Read-only balance snapshot; zero balance for unseen providers.
    async fn get_balance(&self, provider_id: ProviderId) -> Result<ProviderBalance, RepoError>;

    /// Applies a settled-charge delta (negative for refunds), creating the
    /// ledger account lazily.
    async fn apply_earning(&self, provider_id: ProviderId, delta: Money) -> Result<(), RepoError>;

    /// Places the single allowed hold for an in-flight payout.
    async fn reserve(
        &self,
        provider_id: ProviderId,
        amount: Money,
    ) -> Result<ReservationToken, RepoError>;

    /// Moves the reserved amount into paid-out.
    async fn commit_reservation(&self, token: &ReservationToken) -> Result<(), RepoError>;

    /// Drops the hold, restoring available funds.
    async fn release_reservation(&self, token: &ReservationToken) -> Result<(), RepoError>;

    /// The outstanding hold, if any. Reconciliation uses this to rebuild
    /// a token for a hold left behind by an ambiguous gateway call.
    async fn current_reservation(
        &self,
        provider_id: ProviderId,
    ) -> Result<Option<Reservation>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Payout store (keyed by idempotency key)
    // ─────────────────────────────────────────────────────────────────────────

    /// First-writer-wins insert. Returns `None` when this call stored the
    /// request, or `Some(existing)` when the idempotency key was already
    /// taken (by an earlier request or a concurrent one).
    async fn insert_payout(
        &self,
        request: PayoutRequest,
    ) -> Result<Option<PayoutRequest>, RepoError>;

    /// Gets a payout request by idempotency key.
    async fn get_payout(&self, idempotency_key: &str) -> Result<Option<PayoutRequest>, RepoError>;

    /// Compare-and-swap update keyed by `updated.idempotency_key`: applies
    /// only while the stored status equals `expected` and, when
    /// `only_if_undispatched`, no dispatch has been recorded. Returns
    /// `false` on a lost race.
    async fn update_payout(
        &self,
        expected: PayoutStatus,
        only_if_undispatched: bool,
        updated: PayoutRequest,
    ) -> Result<bool, RepoError>;

    /// Payout requests for a provider, newest first, optionally filtered
    /// by status.
    async fn list_payouts(
        &self,
        provider_id: ProviderId,
        status: Option<PayoutStatus>,
    ) -> Result<Vec<PayoutRequest>, RepoError>;
}
