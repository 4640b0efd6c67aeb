//! SQLite ledger repository adapter.
//!
//! SQLite serializes writers globally, which subsumes the per-provider
//! serialization the port requires; the fail-fast reservation semantics
//! are preserved by re-running the domain mutators inside a write
//! transaction and persisting their result.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

use earnings_types::{
    ChargeId, ChargeRecord, ChargeStatus, DomainError, LedgerRepository, Money, PayoutRequest,
    PayoutStatus, ProviderBalance, ProviderId, RepoError, Reservation, ReservationToken,
};

use crate::types::{DbCharge, DbLedger, DbPayout, fmt_ts};

/// SQLite repository implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Single connection: SQLite allows one writer anyway, and a single
        // connection keeps read-modify-write transactions conflict-free.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let ddl = include_str!("../migrations/0001_create_tables.sql");
        sqlx::query(ddl).execute(&pool).await?;

        Ok(Self { pool })
    }

    async fn fetch_ledger_row(
        &self,
        tx: &mut sqlx::SqliteConnection,
        provider_id: &str,
    ) -> Result<Option<DbLedger>, RepoError> {
        sqlx::query_as(
            r#"SELECT provider_id, total_earnings, paid_out, reservation_id,
                      reserved_amount, reservation_created_at, frozen, created_at
               FROM ledgers WHERE provider_id = ?"#,
        )
        .bind(provider_id)
        .fetch_optional(tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))
    }

    async fn persist_reservation_state(
        tx: &mut sqlx::SqliteConnection,
        account: &earnings_types::ProviderAccount,
    ) -> Result<(), RepoError> {
        let (res_id, res_amount, res_created) = match &account.reservation {
            Some(r) => (
                Some(r.id.to_string()),
                r.amount.cents(),
                Some(fmt_ts(&r.created_at)),
            ),
            None => (None, 0, None),
        };

        sqlx::query(
            r#"UPDATE ledgers
               SET total_earnings = ?, paid_out = ?, reservation_id = ?,
                   reserved_amount = ?, reservation_created_at = ?, frozen = ?
               WHERE provider_id = ?"#,
        )
        .bind(account.total_earnings.cents())
        .bind(account.paid_out.cents())
        .bind(&res_id)
        .bind(res_amount)
        .bind(&res_created)
        .bind(account.frozen as i64)
        .bind(account.provider_id.to_string())
        .execute(tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl LedgerRepository for SqliteRepo {
    async fn insert_charge(&self, record: ChargeRecord) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"INSERT OR IGNORE INTO charges
               (id, provider_id, customer_id, requested_amount, paid_amount,
                status, payment_method, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(record.id.as_str())
        .bind(record.provider_id.to_string())
        .bind(record.customer_id.as_str())
        .bind(record.requested_amount.cents())
        .bind(record.paid_amount.cents())
        .bind(record.status.to_string())
        .bind(record.payment_method.to_string())
        .bind(fmt_ts(&record.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_charge(&self, id: &ChargeId) -> Result<Option<ChargeRecord>, RepoError> {
        let row: Option<DbCharge> = sqlx::query_as(
            r#"SELECT id, provider_id, customer_id, requested_amount, paid_amount,
                      status, payment_method, created_at
               FROM charges WHERE id = ?"#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbCharge::into_domain).transpose()
    }

    async fn update_charge(
        &self,
        expected: ChargeStatus,
        updated: ChargeRecord,
    ) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"UPDATE charges
               SET paid_amount = ?, status = ?
               WHERE id = ? AND status = ?"#,
        )
        .bind(updated.paid_amount.cents())
        .bind(updated.status.to_string())
        .bind(updated.id.as_str())
        .bind(expected.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }
        // Lost race vs unknown id.
        match self.get_charge(&updated.id).await? {
            Some(_) => Ok(false),
            None => Err(RepoError::NotFound),
        }
    }

    async fn charges_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ChargeRecord>, RepoError> {
        let rows: Vec<DbCharge> = sqlx::query_as(
            r#"SELECT id, provider_id, customer_id, requested_amount, paid_amount,
                      status, payment_method, created_at
               FROM charges
               WHERE created_at >= ? AND created_at < ?
               ORDER BY created_at"#,
        )
        .bind(fmt_ts(&start))
        .bind(fmt_ts(&end))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbCharge::into_domain).collect()
    }

    async fn get_balance(&self, provider_id: ProviderId) -> Result<ProviderBalance, RepoError> {
        let row: Option<DbLedger> = sqlx::query_as(
            r#"SELECT provider_id, total_earnings, paid_out, reservation_id,
                      reserved_amount, reservation_created_at, frozen, created_at
               FROM ledgers WHERE provider_id = ?"#,
        )
        .bind(provider_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        match row {
            Some(row) => Ok(row.into_domain()?.balance()),
            None => Ok(ProviderBalance::empty(provider_id)),
        }
    }

    async fn apply_earning(&self, provider_id: ProviderId, delta: Money) -> Result<(), RepoError> {
        let id_str = provider_id.to_string();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO ledgers (provider_id, created_at) VALUES (?, ?)
               ON CONFLICT(provider_id) DO NOTHING"#,
        )
        .bind(&id_str)
        .bind(fmt_ts(&Utc::now()))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        let row = self
            .fetch_ledger_row(&mut *tx, &id_str)
            .await?
            .ok_or(RepoError::NotFound)?;
        let mut account = row.into_domain()?;

        match account.apply_earning(delta) {
            Ok(()) => {
                Self::persist_reservation_state(&mut *tx, &account).await?;
                tx.commit()
                    .await
                    .map_err(|e| RepoError::Database(e.to_string()))?;
                Ok(())
            }
            Err(err) => {
                // A mismatch freezes the account; persist the freeze even
                // though the delta is rejected.
                if account.frozen {
                    Self::persist_reservation_state(&mut *tx, &account).await?;
                    tx.commit()
                        .await
                        .map_err(|e| RepoError::Database(e.to_string()))?;
                }
                Err(RepoError::Domain(err))
            }
        }
    }

    async fn reserve(
        &self,
        provider_id: ProviderId,
        amount: Money,
    ) -> Result<ReservationToken, RepoError> {
        let id_str = provider_id.to_string();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        let row = match self.fetch_ledger_row(&mut *tx, &id_str).await? {
            Some(row) => row,
            None => {
                return Err(RepoError::Domain(DomainError::InsufficientFunds {
                    available: 0,
                    requested: amount.cents(),
                }));
            }
        };

        let mut account = row.into_domain()?;
        let token = account.reserve(amount).map_err(RepoError::Domain)?;
        Self::persist_reservation_state(&mut *tx, &account).await?;
        tx.commit()
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        Ok(token)
    }

    async fn commit_reservation(&self, token: &ReservationToken) -> Result<(), RepoError> {
        let id_str = token.provider_id.to_string();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        let row = self
            .fetch_ledger_row(&mut *tx, &id_str)
            .await?
            .ok_or(RepoError::NotFound)?;
        let mut account = row.into_domain()?;
        account.commit_reservation(token).map_err(RepoError::Domain)?;

        Self::persist_reservation_state(&mut *tx, &account).await?;
        tx.commit()
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        Ok(())
    }

    async fn release_reservation(&self, token: &ReservationToken) -> Result<(), RepoError> {
        let id_str = token.provider_id.to_string();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        let row = self
            .fetch_ledger_row(&mut *tx, &id_str)
            .await?
            .ok_or(RepoError::NotFound)?;
        let mut account = row.into_domain()?;
        account
            .release_reservation(token)
            .map_err(RepoError::Domain)?;

        Self::persist_reservation_state(&mut *tx, &account).await?;
        tx.commit()
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        Ok(())
    }

    async fn current_reservation(
        &self,
        provider_id: ProviderId,
    ) -> Result<Option<Reservation>, RepoError> {
        let row: Option<DbLedger> = sqlx::query_as(
            r#"SELECT provider_id, total_earnings, paid_out, reservation_id,
                      reserved_amount, reservation_created_at, frozen, created_at
               FROM ledgers WHERE provider_id = ?"#,
        )
        .bind(provider_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        match row {
            Some(row) => Ok(row.into_domain()?.reservation),
            None => Ok(None),
        }
    }

    async fn insert_payout(
        &self,
        request: PayoutRequest,
    ) -> Result<Option<PayoutRequest>, RepoError> {
        let result = sqlx::query(
            r#"INSERT OR IGNORE INTO payout_requests
               (idempotency_key, provider_id, amount, method, description, status,
                gateway_transfer_id, failure_reason, retryable, dispatched_at, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&request.idempotency_key)
        .bind(request.provider_id.to_string())
        .bind(request.amount.cents())
        .bind(request.method.to_string())
        .bind(&request.description)
        .bind(request.status.to_string())
        .bind(&request.gateway_transfer_id)
        .bind(&request.failure_reason)
        .bind(request.retryable.map(|v| v as i64))
        .bind(request.dispatched_at.as_ref().map(fmt_ts))
        .bind(fmt_ts(&request.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 1 {
            return Ok(None);
        }
        // First writer won; hand back what they stored.
        self.get_payout(&request.idempotency_key).await
    }

    async fn get_payout(&self, idempotency_key: &str) -> Result<Option<PayoutRequest>, RepoError> {
        let row: Option<DbPayout> = sqlx::query_as(
            r#"SELECT idempotency_key, provider_id, amount, method, description, status,
                      gateway_transfer_id, failure_reason, retryable, dispatched_at, created_at
               FROM payout_requests WHERE idempotency_key = ?"#,
        )
        .bind(idempotency_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbPayout::into_domain).transpose()
    }

    async fn update_payout(
        &self,
        expected: PayoutStatus,
        only_if_undispatched: bool,
        updated: PayoutRequest,
    ) -> Result<bool, RepoError> {
        let guard = if only_if_undispatched {
            r#"UPDATE payout_requests
               SET status = ?, gateway_transfer_id = ?, failure_reason = ?,
                   retryable = ?, dispatched_at = ?
               WHERE idempotency_key = ? AND status = ? AND dispatched_at IS NULL"#
        } else {
            r#"UPDATE payout_requests
               SET status = ?, gateway_transfer_id = ?, failure_reason = ?,
                   retryable = ?, dispatched_at = ?
               WHERE idempotency_key = ? AND status = ?"#
        };

        let result = sqlx::query(guard)
            .bind(updated.status.to_string())
            .bind(&updated.gateway_transfer_id)
            .bind(&updated.failure_reason)
            .bind(updated.retryable.map(|v| v as i64))
            .bind(updated.dispatched_at.as_ref().map(fmt_ts))
            .bind(&updated.idempotency_key)
            .bind(expected.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }
        match self.get_payout(&updated.idempotency_key).await? {
            Some(_) => Ok(false),
            None => Err(RepoError::NotFound),
        }
    }

    async fn list_payouts(
        &self,
        provider_id: ProviderId,
        status: Option<PayoutStatus>,
    ) -> Result<Vec<PayoutRequest>, RepoError> {
        let rows: Vec<DbPayout> = match status {
            Some(status) => sqlx::query_as(
                r#"SELECT idempotency_key, provider_id, amount, method, description, status,
                          gateway_transfer_id, failure_reason, retryable, dispatched_at, created_at
                   FROM payout_requests
                   WHERE provider_id = ? AND status = ?
                   ORDER BY created_at DESC"#,
            )
            .bind(provider_id.to_string())
            .bind(status.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?,
            None => sqlx::query_as(
                r#"SELECT idempotency_key, provider_id, amount, method, description, status,
                          gateway_transfer_id, failure_reason, retryable, dispatched_at, created_at
                   FROM payout_requests
                   WHERE provider_id = ?
                   ORDER BY created_at DESC"#,
            )
            .bind(provider_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?,
        };

        rows.into_iter().map(DbPayout::into_domain).collect()
    }
}
