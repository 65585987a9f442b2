use api_client::testkit::InMemoryExchange;
use api_client::ExchangeClient;
use async_trait::async_trait;
use configuration::{AccountConfig, ScenarioConfig};
use core_types::{AccountRef, CoreError, OrderSide};
use events::{ChannelEventSource, EventRecord, EventSource, EventsError, Topic};
use rust_decimal_macros::dec;
use scenario::builder::{ASK_LABEL, BID_LABEL, PROBE_LABEL};
use scenario::{
    run_trade_lifecycle, trade_lifecycle, Action, Expectation, ScenarioError, Step, StepRunner,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

fn composite(user_id: u32, broker: &str, account: &str) -> AccountConfig {
    AccountConfig {
        user_id,
        broker_id: Some(broker.to_string()),
        account_id: Some(account.to_string()),
        l1_address: Some(format!("0x{:040x}", user_id)),
        l2_pubkey: Some(format!("0x{:064x}", user_id)),
    }
}

#[tokio::test]
async fn full_lifecycle_passes_against_a_consistent_exchange() {
    let exchange = InMemoryExchange::eth_usdt();
    let report = run_trade_lifecycle(&exchange, &ScenarioConfig::default(), None)
        .await
        .unwrap();

    assert_eq!(report.orders.len(), 3);
    assert!(report.orders[ASK_LABEL] < report.orders[BID_LABEL]);
    assert!(report.orders.contains_key(PROBE_LABEL));
    assert!(report.events.is_none());

    let bidder = ScenarioConfig::default().bid_account.account_ref();
    let usdt = exchange.get_balance(&bidder).await.unwrap().get_or_zero("USDT");
    assert_eq!(usdt.frozen, "6.6");
}

#[tokio::test]
async fn multi_account_variant_registers_and_survives_reload() {
    let exchange = InMemoryExchange::eth_usdt();
    let cfg = ScenarioConfig {
        ask_account: composite(1, "b1", "a1"),
        bid_account: composite(6, "b1", "a6"),
        register_accounts: true,
        verify_reload: true,
        ..ScenarioConfig::default()
    };

    let report = run_trade_lifecycle(&exchange, &cfg, None).await.unwrap();

    assert_eq!(exchange.reloads(), 1);
    assert_eq!(report.steps, trade_lifecycle(&cfg, 2).len());
}

#[tokio::test]
async fn leftover_balance_is_reported_as_dirty_state() {
    let exchange = InMemoryExchange::eth_usdt();
    let cfg = ScenarioConfig::default();
    exchange.credit(&AccountRef::simple(2), "ETH", dec!(0.5)).await;

    // Everything but the reset.
    let steps = trade_lifecycle(&cfg, 2);
    let mut runner = StepRunner::new(&exchange, "ETH_USDT", 100);
    let err = runner.run(&steps[1..]).await.unwrap_err();

    match err {
        ScenarioError::DirtyState { account, asset, available, .. } => {
            assert_eq!(account, AccountRef::simple(2));
            assert_eq!(asset, "ETH");
            assert_eq!(available, "0.5");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn wrong_balance_aborts_with_context() {
    let exchange = InMemoryExchange::eth_usdt();
    let alice = AccountRef::simple(1);
    let steps = vec![
        Step::new("deposit")
            .act(Action::Deposit {
                account: alice.clone(),
                assets: vec![("USDT".to_string(), dec!(100))],
            })
            .expect(Expectation::Balance {
                account: alice.clone(),
                asset: "USDT".to_string(),
                available: dec!(99),
                frozen: dec!(0),
            }),
        Step::new("never reached").act(Action::Reset),
    ];

    let err = StepRunner::new(&exchange, "ETH_USDT", 100)
        .run(&steps)
        .await
        .unwrap_err();

    match err {
        ScenarioError::ValueMismatch(CoreError::ValueMismatch { context, expected, actual }) => {
            assert_eq!(context, "user:1 USDT available");
            assert_eq!(expected, "99");
            assert_eq!(actual, "100");
        }
        other => panic!("unexpected error: {other}"),
    }
    // The reset step did not run.
    let usdt = exchange.get_balance(&alice).await.unwrap().get_or_zero("USDT");
    assert_eq!(usdt.available, "100");
}

#[tokio::test]
async fn resting_order_is_not_unknown() {
    let exchange = InMemoryExchange::eth_usdt();
    let alice = AccountRef::simple(1);
    exchange.credit(&alice, "USDT", dec!(100)).await;
    let steps = vec![
        Step::new("place")
            .act(Action::PlaceLimit {
                label: "resting".to_string(),
                account: alice,
                side: core_types::OrderSide::Bid,
                amount: dec!(1),
                price: dec!(2),
                fee: dec!(0),
            })
            .expect(Expectation::OrderUnknown {
                label: "resting".to_string(),
            }),
    ];

    let err = StepRunner::new(&exchange, "ETH_USDT", 100)
        .run(&steps)
        .await
        .unwrap_err();
    assert!(matches!(err, ScenarioError::OrderStillQueryable { order_id: 1, .. }));
}

/// A funded account with a single resting bid of 1 @ 2.
async fn resting_bid(exchange: &InMemoryExchange) -> Step {
    let alice = AccountRef::simple(1);
    exchange.credit(&alice, "USDT", dec!(100)).await;
    Step::new("place").act(Action::PlaceLimit {
        label: "resting".to_string(),
        account: alice,
        side: OrderSide::Bid,
        amount: dec!(1),
        price: dec!(2),
        fee: dec!(0),
    })
}

async fn run_one(exchange: &InMemoryExchange, step: Step) -> ScenarioError {
    StepRunner::new(exchange, "ETH_USDT", 100)
        .run(&[step])
        .await
        .unwrap_err()
}

#[tokio::test]
async fn wrong_summary_count_is_a_structure_mismatch() {
    let exchange = InMemoryExchange::eth_usdt();
    let step = resting_bid(&exchange).await.expect(Expectation::Summary {
        bid_count: 2,
        bid_amount: dec!(1),
        ask_count: 0,
        ask_amount: dec!(0),
    });

    match run_one(&exchange, step).await {
        ScenarioError::StructureMismatch { context, expected, actual } => {
            assert_eq!(context, "ETH_USDT summary counts (bid, ask)");
            assert_eq!(expected, "(2, 0)");
            assert_eq!(actual, "(1, 0)");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn extra_depth_level_is_a_structure_mismatch() {
    let exchange = InMemoryExchange::eth_usdt();
    let step = resting_bid(&exchange).await.expect(Expectation::Depth {
        bids: vec![(dec!(2), dec!(1)), (dec!(1.5), dec!(1))],
        asks: vec![],
    });

    let err = run_one(&exchange, step).await;
    assert!(matches!(err, ScenarioError::StructureMismatch { ref context, .. } if context == "depth bids levels"));
}

#[tokio::test]
async fn missing_depth_level_is_a_structure_mismatch() {
    let exchange = InMemoryExchange::eth_usdt();
    let step = resting_bid(&exchange).await.expect(Expectation::Depth {
        bids: vec![],
        asks: vec![],
    });

    let err = run_one(&exchange, step).await;
    assert!(matches!(err, ScenarioError::StructureMismatch { ref context, .. } if context == "depth bids levels"));
}

#[tokio::test]
async fn wrong_depth_amount_is_a_value_mismatch() {
    let exchange = InMemoryExchange::eth_usdt();
    let step = resting_bid(&exchange).await.expect(Expectation::Depth {
        bids: vec![(dec!(2), dec!(3))],
        asks: vec![],
    });

    match run_one(&exchange, step).await {
        ScenarioError::ValueMismatch(CoreError::ValueMismatch { context, expected, .. }) => {
            assert_eq!(context, "depth bids[0] amount");
            assert_eq!(expected, "3");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn order_changed_since_placement_is_a_structure_mismatch() {
    let exchange = InMemoryExchange::eth_usdt();
    let (alice, bob) = (AccountRef::simple(1), AccountRef::simple(2));
    exchange.credit(&alice, "ETH", dec!(10)).await;
    exchange.credit(&bob, "USDT", dec!(100)).await;
    let place = |label: &str, account: &AccountRef, side, amount| Action::PlaceLimit {
        label: label.to_string(),
        account: account.clone(),
        side,
        amount,
        price: dec!(1.1),
        fee: dec!(0),
    };
    let steps = vec![
        Step::new("rest ask")
            .act(place("ask", &alice, OrderSide::Ask, dec!(4)))
            .expect(Expectation::OrderMatchesPlacement {
                label: "ask".to_string(),
            }),
        // A partial fill changes the resting ask's remain.
        Step::new("partial fill")
            .act(place("taker", &bob, OrderSide::Bid, dec!(1)))
            .expect(Expectation::OrderMatchesPlacement {
                label: "ask".to_string(),
            }),
    ];

    let err = StepRunner::new(&exchange, "ETH_USDT", 100)
        .run(&steps)
        .await
        .unwrap_err();
    assert!(matches!(err, ScenarioError::StructureMismatch { ref context, .. } if context == "order 'ask' detail"));
}

#[tokio::test]
async fn cancel_of_unplaced_label_fails() {
    let exchange = InMemoryExchange::eth_usdt();
    let steps = vec![Step::new("cancel").act(Action::Cancel {
        label: "ghost".to_string(),
    })];
    let err = StepRunner::new(&exchange, "ETH_USDT", 100)
        .run(&steps)
        .await
        .unwrap_err();
    assert!(matches!(err, ScenarioError::UnknownLabel(label) if label == "ghost"));
}

async fn publish(tx: tokio::sync::mpsc::Sender<EventRecord>, orders: usize, balances: usize, trades: usize) {
    for (topic, n) in [(Topic::Orders, orders), (Topic::Balances, balances), (Topic::Trades, trades)] {
        for i in 0..n {
            tx.send(EventRecord::new(topic, json!({ "n": i }))).await.unwrap();
        }
    }
}

#[tokio::test]
async fn captured_events_are_counted_after_the_run() {
    let exchange = InMemoryExchange::eth_usdt();
    let cfg = ScenarioConfig {
        with_mq: true,
        settle_delay_secs: 0,
        ..ScenarioConfig::default()
    };
    let (tx, source) = ChannelEventSource::new();
    publish(tx, 5, 2, 1).await;

    let report = run_trade_lifecycle(&exchange, &cfg, Some(&source)).await.unwrap();
    let events = report.events.unwrap();
    assert_eq!(events.count(Topic::Orders), 5);
}

#[tokio::test]
async fn missing_events_fail_the_run() {
    let exchange = InMemoryExchange::eth_usdt();
    let cfg = ScenarioConfig {
        ask_account: composite(1, "b1", "a1"),
        bid_account: composite(6, "b1", "a6"),
        with_mq: true,
        settle_delay_secs: 0,
        ..ScenarioConfig::default()
    };
    let (tx, source) = ChannelEventSource::new();
    // Single-account totals, but the multi-account variant expects 8 balance events.
    publish(tx, 5, 2, 1).await;

    let err = run_trade_lifecycle(&exchange, &cfg, Some(&source)).await.unwrap_err();
    assert!(matches!(
        err,
        ScenarioError::Events(EventsError::CountMismatch {
            topic: Topic::Balances,
            expected: 8,
            actual: 2,
        })
    ));
}

/// Remembers how many resets the exchange had seen when the capture opened.
struct ResetWatch {
    exchange: Arc<InMemoryExchange>,
    resets_at_subscribe: AtomicUsize,
    inner: ChannelEventSource,
}

#[async_trait]
impl EventSource for ResetWatch {
    async fn subscribe(&self) -> Result<mpsc::Receiver<EventRecord>, EventsError> {
        self.resets_at_subscribe
            .store(self.exchange.resets(), Ordering::SeqCst);
        self.inner.subscribe().await
    }
}

#[tokio::test]
async fn reset_happens_before_the_capture_window() {
    let exchange = Arc::new(InMemoryExchange::eth_usdt());
    let cfg = ScenarioConfig {
        with_mq: true,
        settle_delay_secs: 0,
        ..ScenarioConfig::default()
    };
    let (tx, inner) = ChannelEventSource::new();
    publish(tx, 5, 2, 1).await;
    let source = ResetWatch {
        exchange: exchange.clone(),
        resets_at_subscribe: AtomicUsize::new(0),
        inner,
    };

    let report = run_trade_lifecycle(exchange.as_ref(), &cfg, Some(&source)).await.unwrap();

    assert_eq!(source.resets_at_subscribe.load(Ordering::SeqCst), 1);
    assert_eq!(exchange.resets(), 1);
    assert_eq!(report.steps, trade_lifecycle(&cfg, 2).len());
}
