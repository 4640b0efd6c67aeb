//! EarningsService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use earnings_repo::MemoryRepo;
    use earnings_types::{
        AnalyticsParams, AppError, CreatePayoutRequest, GatewayError, Granularity, IngestOutcome,
        LedgerRepository, Money, PaymentGateway, PaymentMethod, PayoutFilter, PayoutStatus,
        ProviderId, RawCharge, TransferReceipt, TransferStatus,
    };

    use crate::EarningsService;

    /// What the mock gateway does with each transfer call.
    #[derive(Clone, Copy)]
    enum Script {
        Succeed,
        Fail { retryable: bool },
        /// Never answers; forces the caller's timeout to fire.
        Hang,
    }

    /// Scripted gateway for driving the payout processor through its
    /// branches.
    pub struct MockGateway {
        script: Script,
        lookup_result: Mutex<TransferStatus>,
    }

    impl MockGateway {
        fn with_script(script: Script) -> Self {
            Self {
                script,
                lookup_result: Mutex::new(TransferStatus::Unknown),
            }
        }

        fn succeeding() -> Self {
            Self::with_script(Script::Succeed)
        }

        fn set_lookup(&self, status: TransferStatus) {
            *self.lookup_result.lock().unwrap() = status;
        }
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        async fn execute_transfer(
            &self,
            _provider_id: ProviderId,
            _amount: Money,
            _method: PaymentMethod,
            _description: &str,
            idempotency_key: &str,
        ) -> Result<TransferReceipt, GatewayError> {
            match self.script {
                Script::Succeed => Ok(TransferReceipt {
                    transfer_id: format!("tr-{idempotency_key}"),
                }),
                Script::Fail { retryable } => Err(GatewayError::Transfer {
                    retryable,
                    reason: "scripted failure".into(),
                }),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!("hung transfer should have been timed out")
                }
            }
        }

        async fn lookup_transfer(
            &self,
            _idempotency_key: &str,
        ) -> Result<TransferStatus, GatewayError> {
            Ok(self.lookup_result.lock().unwrap().clone())
        }
    }

    type TestService = EarningsService<MemoryRepo, MockGateway>;

    fn service(gateway: MockGateway) -> TestService {
        EarningsService::new(MemoryRepo::new(), gateway)
    }

    fn raw_charge(id: &str, provider: ProviderId, status: &str, amount: &str) -> RawCharge {
        RawCharge {
            id: id.into(),
            provider_id: provider.to_string(),
            customer_id: format!("cus-{id}"),
            requested_amount: amount.into(),
            paid_amount: None,
            status: status.into(),
            payment_method: "pix".into(),
            created_at: Utc::now(),
        }
    }

    fn payout_req(provider: ProviderId, cents: i64, key: &str) -> CreatePayoutRequest {
        CreatePayoutRequest {
            provider_id: provider,
            amount_cents: cents,
            method: PaymentMethod::Pix,
            description: "weekly payout".into(),
            idempotency_key: key.into(),
        }
    }

    /// Ingests a paid charge so the provider has available funds.
    async fn fund(svc: &TestService, provider: ProviderId, id: &str, amount: &str) {
        svc.ingest_charge(raw_charge(id, provider, "paid", amount))
            .await
            .unwrap();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Ingest
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_ingest_credits_ledger_once_per_settlement() {
        let svc = service(MockGateway::succeeding());
        let provider = ProviderId::new();

        let first = svc
            .ingest_charge(raw_charge("ch_1", provider, "paid", "150.00"))
            .await
            .unwrap();
        assert_eq!(first.outcome, IngestOutcome::Created);

        // Webhook re-delivery of the same event.
        let again = svc
            .ingest_charge(raw_charge("ch_1", provider, "paid", "150.00"))
            .await
            .unwrap();
        assert_eq!(again.outcome, IngestOutcome::Unchanged);

        let balance = svc.get_balance(provider).await.unwrap();
        assert_eq!(balance.total_earnings_cents, 15000);
        assert_eq!(balance.available_cents, 15000);
    }

    #[tokio::test]
    async fn test_ingest_pending_then_paid_credits_on_settlement() {
        let svc = service(MockGateway::succeeding());
        let provider = ProviderId::new();

        svc.ingest_charge(raw_charge("ch_1", provider, "pending", "99.90"))
            .await
            .unwrap();
        assert_eq!(svc.get_balance(provider).await.unwrap().total_earnings_cents, 0);

        let updated = svc
            .ingest_charge(raw_charge("ch_1", provider, "paid", "99.90"))
            .await
            .unwrap();
        assert_eq!(updated.outcome, IngestOutcome::Updated);
        assert_eq!(
            svc.get_balance(provider).await.unwrap().total_earnings_cents,
            9990
        );
    }

    #[tokio::test]
    async fn test_refund_debits_exactly_once() {
        let svc = service(MockGateway::succeeding());
        let provider = ProviderId::new();
        fund(&svc, provider, "ch_1", "100.00").await;
        fund(&svc, provider, "ch_2", "50.00").await;

        let refunded = svc
            .ingest_charge(raw_charge("ch_1", provider, "refunded", "100.00"))
            .await
            .unwrap();
        assert_eq!(refunded.outcome, IngestOutcome::Updated);
        assert_eq!(
            svc.get_balance(provider).await.unwrap().total_earnings_cents,
            5000
        );

        // Re-delivery of the refund must not debit again.
        let again = svc
            .ingest_charge(raw_charge("ch_1", provider, "refunded", "100.00"))
            .await
            .unwrap();
        assert_eq!(again.outcome, IngestOutcome::Unchanged);
        assert_eq!(
            svc.get_balance(provider).await.unwrap().total_earnings_cents,
            5000
        );
    }

    #[tokio::test]
    async fn test_ingest_ignores_stale_status_regression() {
        let svc = service(MockGateway::succeeding());
        let provider = ProviderId::new();
        fund(&svc, provider, "ch_1", "100.00").await;

        // A delayed pending event for an already settled charge.
        let stale = svc
            .ingest_charge(raw_charge("ch_1", provider, "pending", "100.00"))
            .await
            .unwrap();
        assert_eq!(stale.outcome, IngestOutcome::Unchanged);
        assert_eq!(
            svc.get_balance(provider).await.unwrap().total_earnings_cents,
            10000
        );
    }

    #[tokio::test]
    async fn test_ingest_rejects_malformed_payloads() {
        let svc = service(MockGateway::succeeding());
        let provider = ProviderId::new();

        let mut bad_amount = raw_charge("ch_1", provider, "paid", "ten bucks");
        bad_amount.paid_amount = None;
        assert!(matches!(
            svc.ingest_charge(bad_amount).await,
            Err(AppError::BadRequest(_))
        ));

        let mut bad_provider = raw_charge("ch_2", provider, "paid", "10.00");
        bad_provider.provider_id = "not-a-uuid".into();
        assert!(matches!(
            svc.ingest_charge(bad_provider).await,
            Err(AppError::BadRequest(_))
        ));

        assert!(matches!(
            svc.ingest_charge(raw_charge("ch_3", provider, "teleported", "10.00"))
                .await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_refund_past_available_freezes_provider() {
        let svc = service(MockGateway::succeeding());
        let provider = ProviderId::new();
        fund(&svc, provider, "ch_1", "100.00").await;

        // Pay the earnings out, then refund the original charge.
        svc.create_payout(payout_req(provider, 10000, "key-1"))
            .await
            .unwrap();
        let result = svc
            .ingest_charge(raw_charge("ch_1", provider, "refunded", "100.00"))
            .await;
        assert!(matches!(result, Err(AppError::ProviderFrozen(_))));

        let balance = svc.get_balance(provider).await.unwrap();
        assert!(balance.frozen);

        // Frozen ledgers refuse further payouts.
        fund(&svc, provider, "ch_2", "50.00").await;
        assert!(matches!(
            svc.create_payout(payout_req(provider, 1000, "key-2")).await,
            Err(AppError::ProviderFrozen(_))
        ));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Payouts
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_payout_happy_path_moves_reserved_to_paid_out() {
        let svc = service(MockGateway::succeeding());
        let provider = ProviderId::new();
        fund(&svc, provider, "ch_1", "200.00").await;

        let payout = svc
            .create_payout(payout_req(provider, 20000, "key-1"))
            .await
            .unwrap();
        assert_eq!(payout.status, PayoutStatus::Completed);
        assert_eq!(payout.gateway_transfer_id.as_deref(), Some("tr-key-1"));

        let balance = svc.get_balance(provider).await.unwrap();
        assert_eq!(balance.paid_out_cents, 20000);
        assert_eq!(balance.available_cents, 0);
        assert_eq!(balance.reserved_cents, 0);

        // Even one more cent is now too much.
        assert!(matches!(
            svc.create_payout(payout_req(provider, 1, "key-2")).await,
            Err(AppError::InsufficientFunds {
                available: 0,
                requested: 1
            })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_key_returns_stored_result_without_second_transfer() {
        let svc = service(MockGateway::succeeding());
        let provider = ProviderId::new();
        fund(&svc, provider, "ch_1", "200.00").await;

        let first = svc
            .create_payout(payout_req(provider, 5000, "key-1"))
            .await
            .unwrap();
        let second = svc
            .create_payout(payout_req(provider, 5000, "key-1"))
            .await
            .unwrap();

        assert_eq!(first.status, PayoutStatus::Completed);
        assert_eq!(second.status, PayoutStatus::Completed);
        assert_eq!(first.gateway_transfer_id, second.gateway_transfer_id);

        // One transfer, one ledger mutation.
        assert_eq!(svc.repo().list_payouts(provider, None).await.unwrap().len(), 1);
        let balance = svc.get_balance(provider).await.unwrap();
        assert_eq!(balance.paid_out_cents, 5000);
        assert_eq!(balance.available_cents, 15000);
    }

    #[tokio::test]
    async fn test_concurrent_same_key_payouts_mutate_ledger_once() {
        use std::sync::Arc;

        let svc = Arc::new(service(MockGateway::succeeding()));
        let provider = ProviderId::new();
        fund(&svc, provider, "ch_1", "100.00").await;

        let a = {
            let svc = svc.clone();
            tokio::spawn(
                async move { svc.create_payout(payout_req(provider, 10000, "key-1")).await },
            )
        };
        let b = {
            let svc = svc.clone();
            tokio::spawn(
                async move { svc.create_payout(payout_req(provider, 10000, "key-1")).await },
            )
        };
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        // Both observers see the request; the loser may briefly see it
        // pending, but the ledger moved exactly once.
        let (a, b) = (a.unwrap(), b.unwrap());
        if a.status.is_terminal() && b.status.is_terminal() {
            assert_eq!(a.status, b.status);
            assert_eq!(a.gateway_transfer_id, b.gateway_transfer_id);
        }

        // The stored record settles on the winner's single transfer.
        let stored = svc.repo().get_payout("key-1").await.unwrap().unwrap();
        assert_eq!(stored.status, PayoutStatus::Completed);
        assert_eq!(stored.gateway_transfer_id.as_deref(), Some("tr-key-1"));

        let balance = svc.get_balance(provider).await.unwrap();
        assert_eq!(balance.paid_out_cents, 10000);
        assert_eq!(balance.available_cents, 0);
        assert_eq!(balance.reserved_cents, 0);
    }

    #[tokio::test]
    async fn test_insufficient_funds_rejects_without_ledger_mutation() {
        let svc = service(MockGateway::succeeding());
        let provider = ProviderId::new();
        fund(&svc, provider, "ch_1", "10.00").await;

        let result = svc.create_payout(payout_req(provider, 2000, "key-1")).await;
        assert!(matches!(
            result,
            Err(AppError::InsufficientFunds {
                available: 1000,
                requested: 2000
            })
        ));

        let balance = svc.get_balance(provider).await.unwrap();
        assert_eq!(balance.available_cents, 1000);
        assert_eq!(balance.reserved_cents, 0);

        // The request is recorded as failed, not lost.
        let stored = svc.repo().get_payout("key-1").await.unwrap().unwrap();
        assert_eq!(stored.status, PayoutStatus::Failed);
        assert_eq!(stored.retryable, Some(false));
    }

    #[tokio::test]
    async fn test_validation_rejects_bad_requests_synchronously() {
        let svc = service(MockGateway::succeeding());
        let provider = ProviderId::new();

        assert!(matches!(
            svc.create_payout(payout_req(provider, 0, "key-1")).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            svc.create_payout(payout_req(provider, -5, "key-2")).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            svc.create_payout(payout_req(provider, 100, "  ")).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_gateway_failure_releases_hold_and_is_retryable() {
        let svc = service(MockGateway::with_script(Script::Fail { retryable: true }));
        let provider = ProviderId::new();
        fund(&svc, provider, "ch_1", "100.00").await;

        let result = svc.create_payout(payout_req(provider, 10000, "key-1")).await;
        assert!(matches!(
            result,
            Err(AppError::Gateway {
                retryable: true,
                ..
            })
        ));

        // Hold released; funds stay withdrawable.
        let balance = svc.get_balance(provider).await.unwrap();
        assert_eq!(balance.available_cents, 10000);
        assert_eq!(balance.reserved_cents, 0);

        let stored = svc.repo().get_payout("key-1").await.unwrap().unwrap();
        assert_eq!(stored.status, PayoutStatus::Failed);
        assert_eq!(stored.retryable, Some(true));
    }

    #[tokio::test]
    async fn test_timeout_leaves_payout_pending_external_with_hold() {
        let svc = service(MockGateway::with_script(Script::Hang))
            .with_gateway_timeout(Duration::from_millis(50));
        let provider = ProviderId::new();
        fund(&svc, provider, "ch_1", "100.00").await;

        let result = svc.create_payout(payout_req(provider, 10000, "key-1")).await;
        assert!(matches!(result, Err(AppError::TimeoutAmbiguous { .. })));

        // Neither success nor failure was assumed: the hold survives and
        // the request awaits reconciliation.
        let stored = svc.repo().get_payout("key-1").await.unwrap().unwrap();
        assert_eq!(stored.status, PayoutStatus::PendingExternal);
        let balance = svc.get_balance(provider).await.unwrap();
        assert_eq!(balance.reserved_cents, 10000);
        assert_eq!(balance.available_cents, 0);
        assert_eq!(balance.paid_out_cents, 0);
    }

    #[tokio::test]
    async fn test_reconcile_commits_stranded_payout_that_went_through() {
        let gateway = MockGateway::with_script(Script::Hang);
        gateway.set_lookup(TransferStatus::Completed {
            transfer_id: "tr-found".into(),
        });
        let svc = service(gateway).with_gateway_timeout(Duration::from_millis(50));
        let provider = ProviderId::new();
        fund(&svc, provider, "ch_1", "100.00").await;

        let _ = svc.create_payout(payout_req(provider, 10000, "key-1")).await;
        let resolved = svc.reconcile_provider(provider).await.unwrap();

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].status, PayoutStatus::Completed);
        assert_eq!(resolved[0].gateway_transfer_id.as_deref(), Some("tr-found"));

        let balance = svc.get_balance(provider).await.unwrap();
        assert_eq!(balance.paid_out_cents, 10000);
        assert_eq!(balance.reserved_cents, 0);
    }

    #[tokio::test]
    async fn test_reconcile_releases_stranded_payout_that_failed() {
        let gateway = MockGateway::with_script(Script::Hang);
        gateway.set_lookup(TransferStatus::Failed {
            retryable: true,
            reason: "insufficient gateway float".into(),
        });
        let svc = service(gateway).with_gateway_timeout(Duration::from_millis(50));
        let provider = ProviderId::new();
        fund(&svc, provider, "ch_1", "100.00").await;

        let _ = svc.create_payout(payout_req(provider, 10000, "key-1")).await;
        let resolved = svc.reconcile_provider(provider).await.unwrap();

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].status, PayoutStatus::Failed);

        let balance = svc.get_balance(provider).await.unwrap();
        assert_eq!(balance.available_cents, 10000);
        assert_eq!(balance.paid_out_cents, 0);
    }

    #[tokio::test]
    async fn test_reconcile_leaves_unknown_outcomes_stranded() {
        let svc = service(MockGateway::with_script(Script::Hang))
            .with_gateway_timeout(Duration::from_millis(50));
        let provider = ProviderId::new();
        fund(&svc, provider, "ch_1", "100.00").await;

        let _ = svc.create_payout(payout_req(provider, 10000, "key-1")).await;
        let resolved = svc.reconcile_provider(provider).await.unwrap();

        assert!(resolved.is_empty());
        let stored = svc.repo().get_payout("key-1").await.unwrap().unwrap();
        assert_eq!(stored.status, PayoutStatus::PendingExternal);
        assert_eq!(svc.get_balance(provider).await.unwrap().reserved_cents, 10000);
    }

    #[tokio::test]
    async fn test_cancel_only_before_dispatch() {
        let svc = service(MockGateway::succeeding());
        let provider = ProviderId::new();
        fund(&svc, provider, "ch_1", "100.00").await;

        let completed = svc
            .create_payout(payout_req(provider, 5000, "key-1"))
            .await
            .unwrap();
        assert_eq!(completed.status, PayoutStatus::Completed);

        // Already dispatched and completed.
        assert!(matches!(
            svc.cancel_payout("key-1").await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            svc.cancel_payout("no-such-key").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_payouts_filters_by_status() {
        let svc = service(MockGateway::succeeding());
        let provider = ProviderId::new();
        fund(&svc, provider, "ch_1", "100.00").await;

        svc.create_payout(payout_req(provider, 1000, "key-1"))
            .await
            .unwrap();
        svc.create_payout(payout_req(provider, 2000, "key-2"))
            .await
            .unwrap();
        let _ = svc.create_payout(payout_req(provider, 999999, "key-3")).await;

        let all = svc
            .list_payouts(provider, PayoutFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let completed = svc
            .list_payouts(
                provider,
                PayoutFilter {
                    status: Some(PayoutStatus::Completed),
                },
            )
            .await
            .unwrap();
        assert_eq!(completed.len(), 2);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Conservation and analytics
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_ledger_totals_track_paid_charges_net_of_refunds() {
        let svc = service(MockGateway::succeeding());
        let provider = ProviderId::new();

        fund(&svc, provider, "ch_1", "100.00").await;
        fund(&svc, provider, "ch_2", "40.00").await;
        svc.ingest_charge(raw_charge("ch_3", provider, "pending", "75.00"))
            .await
            .unwrap();
        svc.ingest_charge(raw_charge("ch_2", provider, "refunded", "40.00"))
            .await
            .unwrap();
        svc.create_payout(payout_req(provider, 2500, "key-1"))
            .await
            .unwrap();

        // ch_2's +40.00 credit is canceled by its -40.00 refund debit,
        // leaving ch_1's 100.00 earned; 25.00 of that is paid out.
        let balance = svc.get_balance(provider).await.unwrap();
        assert_eq!(balance.total_earnings_cents, 10000);
        assert_eq!(balance.paid_out_cents, 2500);
        assert_eq!(balance.available_cents, 7500);
    }

    #[tokio::test]
    async fn test_analytics_slices_granularity_from_one_pass() {
        let svc = service(MockGateway::succeeding());
        let provider = ProviderId::new();

        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        for (id, hour, amount) in [("ch_1", 9, "100.00"), ("ch_2", 9, "50.00"), ("ch_3", 15, "25.00")] {
            let mut raw = raw_charge(id, provider, "paid", amount);
            raw.created_at = Utc.with_ymd_and_hms(2024, 3, 1, hour, 30, 0).unwrap();
            svc.ingest_charge(raw).await.unwrap();
        }

        let daily = svc
            .get_analytics(AnalyticsParams {
                start,
                end: start + chrono::Duration::days(3),
                granularity: None,
            })
            .await
            .unwrap();
        assert_eq!(daily.granularity, Granularity::Day);
        assert_eq!(daily.buckets.len(), 3);
        assert_eq!(daily.buckets[0].revenue.cents(), 17500);
        assert_eq!(daily.total_revenue_cents, 17500);

        let hourly = svc
            .get_analytics(AnalyticsParams {
                start,
                end: start + chrono::Duration::days(3),
                granularity: Some(Granularity::Hour),
            })
            .await
            .unwrap();
        assert_eq!(hourly.buckets.len(), 24);
        assert_eq!(hourly.buckets[9].revenue.cents(), 15000);
        assert_eq!(hourly.peak_hour, Some(9));
        assert_eq!(hourly.total_revenue_cents, daily.total_revenue_cents);

        assert!(matches!(
            svc.get_analytics(AnalyticsParams {
                start,
                end: start,
                granularity: None,
            })
            .await,
            Err(AppError::BadRequest(_))
        ));
    }
}
