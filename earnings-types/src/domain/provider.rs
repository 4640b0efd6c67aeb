//! Provider ledger domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::money::Money;
use crate::error::DomainError;

/// Unique identifier for a service provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ProviderId(Uuid);

impl ProviderId {
    /// Creates a new random ProviderId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a ProviderId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProviderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProviderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A provisional hold on ledger funds during an in-flight payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
}

/// Capability handle returned by a successful reserve. Committing or
/// releasing requires the matching token, not a held lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationToken {
    pub provider_id: ProviderId,
    pub reservation_id: Uuid,
    pub amount: Money,
}

/// Read-only balance snapshot for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderBalance {
    pub provider_id: ProviderId,
    pub total_earnings: Money,
    pub paid_out: Money,
    pub reserved: Money,
    pub available: Money,
    pub frozen: bool,
}

impl ProviderBalance {
    /// Zero balance for a provider with no attributable charges yet.
    pub fn empty(provider_id: ProviderId) -> Self {
        Self {
            provider_id,
            total_earnings: Money::ZERO,
            paid_out: Money::ZERO,
            reserved: Money::ZERO,
            available: Money::ZERO,
            frozen: false,
        }
    }
}

/// Per-provider running balance derived from settled charges and payouts.
///
/// All mutators are pure domain logic returning `Result`; adapters are
/// responsible for running them atomically under per-provider
/// serialization. Invariants:
/// - `available() >= 0` after every successful mutation
/// - `paid_out` only ever grows
/// - at most one outstanding reservation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderAccount {
    pub provider_id: ProviderId,
    pub total_earnings: Money,
    pub paid_out: Money,
    pub reservation: Option<Reservation>,
    /// Set on reconciliation mismatch; frozen accounts refuse payouts
    /// until an operator intervenes.
    pub frozen: bool,
    pub created_at: DateTime<Utc>,
}

impl ProviderAccount {
    /// Creates an empty ledger account (lazily, on first earning).
    pub fn new(provider_id: ProviderId) -> Self {
        Self {
            provider_id,
            total_earnings: Money::ZERO,
            paid_out: Money::ZERO,
            reservation: None,
            frozen: false,
            created_at: Utc::now(),
        }
    }

    /// Amount currently held by an in-flight payout.
    pub fn reserved(&self) -> Money {
        self.reservation.map(|r| r.amount).unwrap_or(Money::ZERO)
    }

    /// Funds the provider could withdraw right now.
    pub fn available(&self) -> Money {
        Money::from_cents(
            self.total_earnings.cents() - self.paid_out.cents() - self.reserved().cents(),
        )
    }

    /// Balance snapshot for reads.
    pub fn balance(&self) -> ProviderBalance {
        ProviderBalance {
            provider_id: self.provider_id,
            total_earnings: self.total_earnings,
            paid_out: self.paid_out,
            reserved: self.reserved(),
            available: self.available(),
            frozen: self.frozen,
        }
    }

    /// Applies a settled-charge earning (negative delta for refunds).
    ///
    /// A delta that would drive `available()` negative signals that the
    /// ledger no longer matches the charge history; the account freezes
    /// and the caller gets `ReconciliationMismatch`.
    pub fn apply_earning(&mut self, delta: Money) -> Result<(), DomainError> {
        let new_total = self.total_earnings.checked_add(delta)?;
        let new_available =
            new_total.cents() - self.paid_out.cents() - self.reserved().cents();
        if new_available < 0 {
            self.frozen = true;
            return Err(DomainError::ReconciliationMismatch {
                provider_id: self.provider_id,
                delta: delta.cents(),
                available: self.available().cents(),
            });
        }
        self.total_earnings = new_total;
        Ok(())
    }

    /// Places a hold on `amount` for an in-flight payout.
    ///
    /// Fails fast while another reservation is outstanding; it never
    /// blocks. The returned token is the only way to resolve the hold.
    pub fn reserve(&mut self, amount: Money) -> Result<ReservationToken, DomainError> {
        if self.frozen {
            return Err(DomainError::ProviderFrozen {
                provider_id: self.provider_id,
            });
        }
        if !amount.is_positive() {
            return Err(DomainError::Validation(
                "reservation amount must be positive".into(),
            ));
        }
        if self.reservation.is_some() {
            return Err(DomainError::ReservationHeld(self.provider_id));
        }
        if amount > self.available() {
            return Err(DomainError::InsufficientFunds {
                available: self.available().cents(),
                requested: amount.cents(),
            });
        }
        let reservation = Reservation {
            id: Uuid::new_v4(),
            amount,
            created_at: Utc::now(),
        };
        self.reservation = Some(reservation);
        Ok(ReservationToken {
            provider_id: self.provider_id,
            reservation_id: reservation.id,
            amount,
        })
    }

    /// Moves the reserved amount into `paid_out`.
    pub fn commit_reservation(&mut self, token: &ReservationToken) -> Result<(), DomainError> {
        let reservation = self.take_matching(token)?;
        self.paid_out = self.paid_out.checked_add(reservation.amount)?;
        Ok(())
    }

    /// Returns the reserved amount to `available` with no other effects.
    pub fn release_reservation(&mut self, token: &ReservationToken) -> Result<(), DomainError> {
        self.take_matching(token)?;
        Ok(())
    }

    fn take_matching(&mut self, token: &ReservationToken) -> Result<Reservation, DomainError> {
        match self.reservation {
            Some(r) if r.id == token.reservation_id => {
                self.reservation = None;
                Ok(r)
            }
            Some(_) => Err(DomainError::ReservationMismatch),
            None => Err(DomainError::NoReservation(self.provider_id)),
        }
    }
}
