//! Manager behaviour with instantly answering stubs
//!
//! Tests cover:
//! - Best provider selection and tie-breaking
//! - Settling without network calls (idle, unsupported pair, zero amount)
//! - Aggregate failures
//! - Approve policy, fee option and provider switches
//! - Refresh and shutdown

mod common;

use common::Harness;
use express::{
    ExpressError, ExpressManagerState, ExpressProviderUpdateSource, ExpressStatus, ManagerConfig,
};
use express_resilience::TimeoutConfig;
use express_testing::{fixtures, StubFeeProvider, StubQuoteProvider};
use express_traits::{Amount, ExpressApprovePolicy, ExpressFee, ExpressFeeOption, Fee};
use std::time::Duration;

fn ids(state: &ExpressManagerState) -> Vec<&str> {
    state.providers.iter().map(|p| p.provider.id.as_str()).collect()
}

// ============================================================================
// Resolution
// ============================================================================

mod resolution {
    use super::*;

    #[tokio::test]
    async fn test_selects_highest_rate() {
        let harness = Harness::new(vec![
            StubQuoteProvider::new(fixtures::cex("a")).with_expect_amount(fixtures::usdt_units(100)),
            StubQuoteProvider::new(fixtures::cex("b")).with_expect_amount(fixtures::usdt_units(300)),
            StubQuoteProvider::new(fixtures::dex("c")).with_expect_amount(fixtures::usdt_units(200)),
        ]);

        let state = harness.resolve(fixtures::eth_to_usdt(), fixtures::one_eth()).await;

        let ready = state.status.ready().expect("ready quote");
        assert_eq!(ready.provider.id, "b");
        assert_eq!(ready.quote.expect_amount, fixtures::usdt_units(300));
        assert_eq!(state.selected_provider.as_ref().map(|p| p.id.as_str()), Some("b"));
        assert_eq!(ids(&state), vec!["a", "b", "c"]);
        assert_eq!(
            state.providers.iter().filter(|p| p.is_best).map(|p| p.provider.id.as_str()).collect::<Vec<_>>(),
            vec!["b"]
        );
        assert_eq!(state.update_source, Some(ExpressProviderUpdateSource::AmountChange));
    }

    #[tokio::test]
    async fn test_ties_prefer_priority_then_registration() {
        let harness = Harness::new(vec![
            StubQuoteProvider::new(fixtures::cex("a").with_priority(10)),
            StubQuoteProvider::new(fixtures::cex("b").with_priority(1)),
            StubQuoteProvider::new(fixtures::cex("c").with_priority(1)),
        ]);
        let state = harness.resolve(fixtures::eth_to_usdt(), fixtures::one_eth()).await;
        assert_eq!(state.status.ready().unwrap().provider.id, "b");

        let harness = Harness::new(vec![
            StubQuoteProvider::new(fixtures::cex("x")),
            StubQuoteProvider::new(fixtures::cex("y")),
        ]);
        let state = harness.resolve(fixtures::eth_to_usdt(), fixtures::one_eth()).await;
        assert_eq!(state.status.ready().unwrap().provider.id, "x");
    }

    #[tokio::test]
    async fn test_keeps_previous_selection_while_available() {
        let harness = Harness::new(vec![
            StubQuoteProvider::new(fixtures::cex("a")).with_expect_amount(fixtures::usdt_units(100)),
            StubQuoteProvider::new(fixtures::cex("b")).with_expect_amount(fixtures::usdt_units(300)),
        ]);
        harness.resolve(fixtures::eth_to_usdt(), fixtures::one_eth()).await;
        harness.manager.update_selected_provider("a").await.unwrap();

        let state = harness
            .manager
            .update_amount(Some(fixtures::wei(2_000)), ExpressProviderUpdateSource::AmountChange)
            .await
            .unwrap();
        assert_eq!(state.status.ready().unwrap().provider.id, "a");
        assert!(state.provider("b").unwrap().is_best);

        harness.provider("a").set_failure(Some(ExpressError::NetworkError("down".into())));
        let state = harness
            .manager
            .refresh(ExpressProviderUpdateSource::ManualRefresh)
            .await
            .unwrap();
        assert_eq!(state.status.ready().unwrap().provider.id, "b");
        assert_eq!(harness.manager.get_selected_provider().unwrap().id, "b");
    }

    #[tokio::test]
    async fn test_unsupported_pair_makes_no_calls() {
        let harness = Harness::new(vec![
            StubQuoteProvider::new(fixtures::cex("a")).with_supported_pairs(vec![fixtures::eth_to_usdt()]),
        ]);

        let state = harness.manager.update_pair(fixtures::btc_to_eth()).await.unwrap();
        assert!(matches!(
            state.status,
            ExpressStatus::Failed(ExpressError::PairUnsupported { .. })
        ));

        let state = harness
            .manager
            .update_amount(Some(fixtures::one_eth()), ExpressProviderUpdateSource::AmountChange)
            .await
            .unwrap();
        assert!(matches!(
            state.status,
            ExpressStatus::Failed(ExpressError::PairUnsupported { .. })
        ));
        assert_eq!(harness.total_quote_calls(), 0);
        assert_eq!(harness.fees.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_zero_amount_is_invalid() {
        let harness = Harness::new(vec![StubQuoteProvider::new(fixtures::cex("a"))]);
        let state = harness.resolve(fixtures::eth_to_usdt(), Amount::zero(18)).await;

        assert!(matches!(state.status, ExpressStatus::Failed(ExpressError::InvalidAmount(_))));
        assert_eq!(harness.total_quote_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_inputs_stay_idle() {
        let harness = Harness::new(vec![StubQuoteProvider::new(fixtures::cex("a"))]);

        let state = harness
            .manager
            .update_amount(Some(fixtures::one_eth()), ExpressProviderUpdateSource::AmountChange)
            .await
            .unwrap();
        assert_eq!(state.status, ExpressStatus::Idle);
        assert_eq!(harness.manager.get_amount(), Some(fixtures::one_eth()));

        let state = harness.manager.update_pair(fixtures::eth_to_usdt()).await.unwrap();
        assert!(state.status.ready().is_some());

        let state = harness
            .manager
            .update_amount(None, ExpressProviderUpdateSource::AmountChange)
            .await
            .unwrap();
        assert_eq!(state.status, ExpressStatus::Idle);
        assert!(state.providers.is_empty());
        assert_eq!(harness.total_quote_calls(), 1);
    }

    #[tokio::test]
    async fn test_all_failures_give_no_providers_available() {
        let harness = Harness::new(vec![
            StubQuoteProvider::new(fixtures::cex("a")).with_failure(ExpressError::NetworkError("refused".into())),
            StubQuoteProvider::new(fixtures::cex("b")).with_failure(ExpressError::AmountTooSmall { minimum: 10 }),
        ]);

        let state = harness.resolve(fixtures::eth_to_usdt(), fixtures::one_eth()).await;

        assert_eq!(state.status, ExpressStatus::Failed(ExpressError::NoProvidersAvailable));
        assert_eq!(state.selected_provider, None);
        assert_eq!(ids(&state), vec!["a", "b"]);
        assert!(state.providers.iter().all(|p| !p.is_available() && !p.is_best));
        assert_eq!(harness.manager.get_all_providers(), state.providers);
    }

    #[tokio::test]
    async fn test_amount_restrictions_give_invalid_amount() {
        let harness = Harness::new(vec![
            StubQuoteProvider::new(fixtures::cex("a")).with_failure(ExpressError::AmountTooSmall {
                minimum: 500_000_000_000_000_000,
            }),
            StubQuoteProvider::new(fixtures::cex("b")).with_failure(ExpressError::AmountTooSmall {
                minimum: 250_000_000_000_000_000,
            }),
        ]);

        let state = harness.resolve(fixtures::eth_to_usdt(), fixtures::wei(1_000)).await;

        assert_eq!(
            state.status,
            ExpressStatus::Failed(ExpressError::InvalidAmount(
                "amount is below the minimum of 0.25".into()
            ))
        );
    }

    #[tokio::test]
    async fn test_fee_failures_are_captured_per_entry() {
        let harness = Harness::new(vec![
            StubQuoteProvider::new(fixtures::cex("cex")).with_expect_amount(fixtures::usdt_units(500)),
            StubQuoteProvider::new(fixtures::dex("dex")).with_expect_amount(fixtures::usdt_units(100)),
        ]);
        harness.fees.set_failure(Some(ExpressError::InsufficientFunds("0 ETH".into())));

        let state = harness.resolve(fixtures::eth_to_usdt(), fixtures::one_eth()).await;
        assert_eq!(state.status, ExpressStatus::Failed(ExpressError::NoProvidersAvailable));
        assert!(matches!(
            state.provider("cex").unwrap().error(),
            Some(ExpressError::InsufficientFunds(_))
        ));

        harness.fees.set_failure(None);
        let state = harness
            .manager
            .refresh(ExpressProviderUpdateSource::ManualRefresh)
            .await
            .unwrap();
        assert_eq!(state.status.ready().unwrap().provider.id, "cex");
    }

    #[tokio::test]
    async fn test_dex_fee_uses_gas_limit() {
        let harness = Harness::new(vec![StubQuoteProvider::new(fixtures::dex("uni")).with_gas_limit(180_000)]);
        let state = harness.resolve(fixtures::eth_to_usdt(), fixtures::one_eth()).await;

        let ready = state.status.ready().unwrap();
        assert!(matches!(ready.fee, ExpressFee::Single(_)));
        assert_eq!(ready.selected_fee.gas_limit, Some(180_000));
        assert_eq!(harness.fees.gas_limit_calls(), 1);
        assert_eq!(harness.fees.estimated_fee_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quote_timeout_fails_only_that_provider() {
        let config = ManagerConfig::default().with_timeouts(TimeoutConfig::default().with_quote(Duration::from_secs(3)));
        let harness = Harness::with_config(
            vec![
                StubQuoteProvider::new(fixtures::cex("slow"))
                    .with_expect_amount(fixtures::usdt_units(900))
                    .with_delay(Duration::from_secs(60)),
                StubQuoteProvider::new(fixtures::cex("fast")).with_expect_amount(fixtures::usdt_units(100)),
            ],
            StubFeeProvider::new(),
            config,
        );

        let state = harness.resolve(fixtures::eth_to_usdt(), fixtures::one_eth()).await;

        assert_eq!(state.status.ready().unwrap().provider.id, "fast");
        assert_eq!(
            state.provider("slow").unwrap().error(),
            Some(&ExpressError::Timeout {
                operation: "quote".into(),
                millis: 3_000
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_is_registration_not_completion() {
        let harness = Harness::new(vec![
            StubQuoteProvider::new(fixtures::cex("first")).with_delay(Duration::from_secs(3)),
            StubQuoteProvider::new(fixtures::cex("second")).with_delay(Duration::from_secs(2)),
            StubQuoteProvider::new(fixtures::cex("third")),
        ]);

        let state = harness.resolve(fixtures::eth_to_usdt(), fixtures::one_eth()).await;
        assert_eq!(ids(&state), vec!["first", "second", "third"]);
    }
}

// ============================================================================
// Updates without re-quoting
// ============================================================================

mod updates {
    use super::*;

    fn approve_harness() -> Harness {
        Harness::with_config(
            vec![
                StubQuoteProvider::new(fixtures::dex("uni")).with_allowance("0xrouter"),
                StubQuoteProvider::new(fixtures::cex("cex")),
            ],
            StubFeeProvider::new().with_approve_fee(ExpressFee::Single(Fee::new(fixtures::wei(46_000)))),
            ManagerConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_approve_policy_reestimates_only_allowance_fees() {
        let harness = approve_harness();
        let state = harness.resolve(fixtures::usdt_to_eth(), fixtures::usdt_units(1_000)).await;
        let ready = state.status.ready().unwrap();
        assert_eq!(ready.provider.id, "uni");
        assert_eq!(ready.approve.as_ref().unwrap().amount, Amount::max(6));
        assert_eq!(harness.fees.get_fee_calls(), 1);
        let transfer_fee_calls = harness.fees.estimated_fee_calls();

        let state = harness
            .manager
            .update_approve_policy(ExpressApprovePolicy::Specified)
            .await
            .unwrap();

        let approve = state.status.ready().unwrap().approve.clone().unwrap();
        assert_eq!(approve.policy, ExpressApprovePolicy::Specified);
        assert_eq!(approve.amount, fixtures::usdt_units(1_000));
        assert_eq!(state.approve_policy, ExpressApprovePolicy::Specified);
        assert_eq!(state.update_source, Some(ExpressProviderUpdateSource::ApprovePolicyChange));

        assert_eq!(harness.fees.get_fee_calls(), 2);
        assert_eq!(harness.fees.estimated_fee_calls(), transfer_fee_calls);
        assert_eq!(harness.provider("uni").quote_calls(), 1);
        assert_eq!(harness.provider("cex").quote_calls(), 1);
    }

    #[tokio::test]
    async fn test_approve_policy_without_allowance_is_local() {
        let harness = Harness::new(vec![StubQuoteProvider::new(fixtures::cex("cex"))]);
        let before = harness.resolve(fixtures::eth_to_usdt(), fixtures::one_eth()).await;
        let fee_calls = harness.fees.total_calls();

        let state = harness
            .manager
            .update_approve_policy(ExpressApprovePolicy::Specified)
            .await
            .unwrap();

        assert_eq!(state.approve_policy, ExpressApprovePolicy::Specified);
        assert_eq!(state.status, before.status);
        assert_eq!(harness.fees.total_calls(), fee_calls);
        assert_eq!(harness.total_quote_calls(), 1);
    }

    #[tokio::test]
    async fn test_approve_policy_applies_to_next_quote() {
        let harness = approve_harness();
        harness
            .manager
            .update_approve_policy(ExpressApprovePolicy::Specified)
            .await
            .unwrap();
        assert_eq!(harness.fees.total_calls(), 0);

        harness.resolve(fixtures::usdt_to_eth(), fixtures::usdt_units(1_000)).await;
        assert_eq!(harness.provider("uni").last_policy(), Some(ExpressApprovePolicy::Specified));
        assert_eq!(
            harness.fees.get_fee_requests(),
            vec![(fixtures::usdt_units(1_000), "0xrouter".to_string())]
        );
    }

    #[tokio::test]
    async fn test_fee_option_reads_cached_fee() {
        let harness = Harness::new(vec![StubQuoteProvider::new(fixtures::cex("cex"))]);
        let state = harness.resolve(fixtures::eth_to_usdt(), fixtures::one_eth()).await;
        let ready = state.status.ready().unwrap();
        let ExpressFee::Double { market, fast } = ready.fee else {
            panic!("expected dual-rate fee");
        };
        assert_eq!(ready.selected_fee, market);
        let fee_calls = harness.fees.total_calls();

        let state = harness
            .manager
            .update_fee_option(ExpressFeeOption::Fast)
            .await
            .unwrap();

        assert_eq!(state.status.ready().unwrap().selected_fee, fast);
        assert_eq!(state.fee_option, ExpressFeeOption::Fast);
        assert_eq!(harness.fees.total_calls(), fee_calls);
        assert_eq!(harness.total_quote_calls(), 1);
    }

    #[tokio::test]
    async fn test_fee_option_recorded_before_resolution() {
        let harness = Harness::new(vec![StubQuoteProvider::new(fixtures::cex("cex"))]);
        let state = harness
            .manager
            .update_fee_option(ExpressFeeOption::Fast)
            .await
            .unwrap();
        assert_eq!(state.status, ExpressStatus::Idle);
        assert_eq!(harness.fees.total_calls(), 0);

        let state = harness.resolve(fixtures::eth_to_usdt(), fixtures::one_eth()).await;
        let ready = state.status.ready().unwrap();
        assert_eq!(&ready.selected_fee, ready.fee.fee(ExpressFeeOption::Fast));
    }

    #[tokio::test]
    async fn test_unknown_provider_is_rejected_without_mutation() {
        let harness = Harness::new(vec![StubQuoteProvider::new(fixtures::cex("a"))]);
        let before = harness.resolve(fixtures::eth_to_usdt(), fixtures::one_eth()).await;

        let err = harness.manager.update_selected_provider("nope").await.unwrap_err();

        assert_eq!(err, ExpressError::ProviderNotEligible("nope".into()));
        assert_eq!(harness.manager.state(), before);
    }

    #[tokio::test]
    async fn test_selection_before_resolution_is_rejected() {
        let harness = Harness::new(vec![StubQuoteProvider::new(fixtures::cex("a"))]);
        let err = harness.manager.update_selected_provider("a").await.unwrap_err();
        assert!(matches!(err, ExpressError::ProviderNotEligible(_)));
    }

    #[tokio::test]
    async fn test_switch_to_failed_provider_reports_its_error() {
        let harness = Harness::new(vec![
            StubQuoteProvider::new(fixtures::cex("ok")),
            StubQuoteProvider::new(fixtures::cex("broken")).with_failure(ExpressError::AmountTooBig { maximum: 5 }),
        ]);
        harness.resolve(fixtures::eth_to_usdt(), fixtures::one_eth()).await;

        let state = harness.manager.update_selected_provider("broken").await.unwrap();

        assert_eq!(state.status, ExpressStatus::Failed(ExpressError::AmountTooBig { maximum: 5 }));
        assert_eq!(state.selected_provider.unwrap().id, "broken");
        assert_eq!(state.update_source, Some(ExpressProviderUpdateSource::ProviderSwitch));
        assert_eq!(harness.total_quote_calls(), 2);

        let state = harness.manager.update_selected_provider("ok").await.unwrap();
        assert_eq!(state.status.ready().unwrap().provider.id, "ok");
        assert_eq!(harness.total_quote_calls(), 2);
    }

    #[tokio::test]
    async fn test_refresh_requotes() {
        let harness = Harness::new(vec![StubQuoteProvider::new(fixtures::cex("a"))
            .with_expect_amount(fixtures::usdt_units(100))]);
        harness.resolve(fixtures::eth_to_usdt(), fixtures::one_eth()).await;

        harness.provider("a").set_expect_amount(fixtures::usdt_units(120));
        let state = harness
            .manager
            .refresh(ExpressProviderUpdateSource::ManualRefresh)
            .await
            .unwrap();

        assert_eq!(state.status.ready().unwrap().quote.expect_amount, fixtures::usdt_units(120));
        assert_eq!(state.update_source, Some(ExpressProviderUpdateSource::ManualRefresh));
        assert_eq!(harness.provider("a").quote_calls(), 2);
    }

    #[tokio::test]
    async fn test_pair_change_clears_snapshot() {
        let harness = Harness::new(vec![
            StubQuoteProvider::new(fixtures::cex("eth-only")).with_supported_pairs(vec![fixtures::eth_to_usdt()]),
            StubQuoteProvider::new(fixtures::cex("any")),
        ]);
        let state = harness.resolve(fixtures::eth_to_usdt(), fixtures::one_eth()).await;
        assert_eq!(ids(&state), vec!["eth-only", "any"]);

        let state = harness.manager.update_pair(fixtures::btc_to_eth()).await.unwrap();
        assert_eq!(ids(&state), vec!["any"]);
        assert_eq!(harness.manager.get_pair(), Some(fixtures::btc_to_eth()));
        assert_eq!(state.update_source, Some(ExpressProviderUpdateSource::PairChange));
    }

    #[tokio::test]
    async fn test_settling_without_quotes_drops_selection() {
        let harness = Harness::new(vec![
            StubQuoteProvider::new(fixtures::cex("a")).with_supported_pairs(vec![fixtures::eth_to_usdt()]),
        ]);
        let state = harness.resolve(fixtures::eth_to_usdt(), fixtures::one_eth()).await;
        assert_eq!(state.selected_provider.unwrap().id, "a");

        let state = harness.manager.update_pair(fixtures::btc_to_eth()).await.unwrap();
        assert!(matches!(
            state.status,
            ExpressStatus::Failed(ExpressError::PairUnsupported { .. })
        ));
        assert_eq!(state.selected_provider, None);
        assert_eq!(harness.manager.get_selected_provider(), None);

        let state = harness
            .manager
            .update_amount(None, ExpressProviderUpdateSource::AmountChange)
            .await
            .unwrap();
        assert_eq!(state.selected_provider, None);
        assert!(harness.manager.get_all_providers().is_empty());

        harness.manager.update_pair(fixtures::eth_to_usdt()).await.unwrap();
        let state = harness
            .manager
            .update_amount(Some(Amount::zero(18)), ExpressProviderUpdateSource::AmountChange)
            .await
            .unwrap();
        assert!(matches!(state.status, ExpressStatus::Failed(ExpressError::InvalidAmount(_))));
        assert_eq!(state.selected_provider, None);
    }

    #[tokio::test]
    async fn test_cleared_selection_is_restored_by_next_quote() {
        let harness = Harness::new(vec![
            StubQuoteProvider::new(fixtures::cex("a")).with_expect_amount(fixtures::usdt_units(100)),
            StubQuoteProvider::new(fixtures::cex("b")).with_expect_amount(fixtures::usdt_units(300)),
        ]);
        harness.resolve(fixtures::eth_to_usdt(), fixtures::one_eth()).await;
        harness.manager.update_selected_provider("a").await.unwrap();

        let state = harness
            .manager
            .update_amount(None, ExpressProviderUpdateSource::AmountChange)
            .await
            .unwrap();
        assert_eq!(state.status, ExpressStatus::Idle);
        assert_eq!(state.selected_provider, None);

        let state = harness
            .manager
            .update_amount(Some(fixtures::wei(5_000)), ExpressProviderUpdateSource::AmountChange)
            .await
            .unwrap();
        assert_eq!(state.status.ready().unwrap().provider.id, "a");
        assert_eq!(harness.manager.get_selected_provider().unwrap().id, "a");
    }
}

// ============================================================================
// Shutdown
// ============================================================================

mod shutdown {
    use super::*;

    #[tokio::test]
    async fn test_calls_after_shutdown_fail() {
        let harness = Harness::new(vec![StubQuoteProvider::new(fixtures::cex("a"))]);
        let last = harness.resolve(fixtures::eth_to_usdt(), fixtures::one_eth()).await;
        let mut updates = harness.manager.subscribe();
        updates.borrow_and_update();

        harness.manager.shutdown().await.unwrap();

        assert!(harness.manager.is_closed());
        assert_eq!(
            harness.manager.update_pair(fixtures::eth_to_usdt()).await,
            Err(ExpressError::ManagerClosed)
        );
        assert_eq!(
            harness
                .manager
                .update_fee_option(ExpressFeeOption::Fast)
                .await,
            Err(ExpressError::ManagerClosed)
        );
        assert_eq!(harness.manager.request_data().await, Err(ExpressError::ManagerClosed));
        assert_eq!(harness.manager.shutdown().await, Err(ExpressError::ManagerClosed));

        assert_eq!(harness.manager.state(), last);
        assert!(updates.changed().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_resolution() {
        let harness = Harness::new(vec![
            StubQuoteProvider::new(fixtures::cex("slow")).with_delay(Duration::from_secs(30))
        ]);
        harness.manager.update_pair(fixtures::eth_to_usdt()).await.unwrap();

        let pending = {
            let manager = harness.manager.clone();
            tokio::spawn(async move {
                manager
                    .update_amount(Some(fixtures::one_eth()), ExpressProviderUpdateSource::AmountChange)
                    .await
            })
        };
        let slow = harness.provider("slow").clone();
        common::until(|| slow.quote_calls() == 1).await;

        harness.manager.shutdown().await.unwrap();

        assert_eq!(pending.await.unwrap(), Err(ExpressError::ManagerClosed));
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(slow.completed_quotes(), 0);
        assert!(harness.manager.state().status.is_resolving());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_pending_trade_data() {
        let harness = Harness::new(vec![
            StubQuoteProvider::new(fixtures::cex("a")).with_exchange_delay(Duration::from_secs(30))
        ]);
        harness.resolve(fixtures::eth_to_usdt(), fixtures::one_eth()).await;
        let stub = harness.provider("a").clone();

        let pending = {
            let manager = harness.manager.clone();
            tokio::spawn(async move { manager.request_data().await })
        };
        common::until(|| stub.exchange_calls() == 1).await;

        harness.manager.shutdown().await.unwrap();

        assert_eq!(pending.await.unwrap(), Err(ExpressError::ManagerClosed));
        assert!(harness.manager.is_closed());
    }
}
