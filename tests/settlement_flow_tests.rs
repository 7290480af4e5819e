//! End-to-end flows across refresh, streaming, reconstruction and settlement.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use settler::adapter::outbound::chain::CtfTransferSource;
use settler::adapter::outbound::polymarket::GammaClient;
use settler::application::{
    Backoff, BalanceReconstructor, ChannelState, DispatchPolicy, MarketRefresher, MarketState,
    RequestDispatcher, SettlementService, SubscriberSet, UpdateChannel,
};
use settler::domain::{DomainEvent, MarketStatus};
use settler::error::DispatchError;
use settler::port::{MarketPage, Target};
use settler::testkit::chain::MemoryTransferSource;
use settler::testkit::domain::{addr, binary_market, event, event_id, market_id, mint, transfer};
use settler::testkit::market::PagedMarketSource;
use settler::testkit::rpc::{batch_log, rpc_result, single_log};
use settler::testkit::store::MemoryStore;
use settler::testkit::stream::{LineCodec, ScriptedTransport};
use settler::testkit::subscriber::RecordingSubscriber;
use settler::testkit::upstream::ScriptedUpstream;
use tokio_util::sync::CancellationToken;

fn quick_policy() -> DispatchPolicy {
    DispatchPolicy {
        min_spacing: Duration::from_millis(100),
        max_retries: 2,
        retry_delay: Duration::from_millis(500),
    }
}

fn hex_param(target: &Target, key: &str) -> u64 {
    let raw = target.body().unwrap()["params"][0][key].as_str().unwrap();
    u64::from_str_radix(raw.trim_start_matches("0x"), 16).unwrap()
}

#[tokio::test(start_paused = true)]
async fn streamed_resolution_is_settled_from_transfer_history() {
    let page = MarketPage {
        events: vec![event("e1", "Sample event")],
        markets: vec![
            binary_market("m1", "e1", "11", "12", Some(dec!(0.5))),
            binary_market("m2", "e1", "21", "22", Some(dec!(0.5))),
        ],
        raw_count: 1,
    };
    let state = Arc::new(MarketState::new());
    let store = Arc::new(MemoryStore::new());
    let summary = MarketRefresher::new(PagedMarketSource::new(vec![page]), state.clone(), 10, 5)
        .with_store(store.clone())
        .refresh()
        .await
        .unwrap();
    assert_eq!((summary.pages, summary.markets), (1, 2));

    let transport = ScriptedTransport::new().with_frames(vec![
        Some(Ok("price 11 0.98".into())),
        Some(Ok("resolved m1 Yes".into())),
    ]);
    let recorder = Arc::new(RecordingSubscriber::new());
    let subscribers = Arc::new(SubscriberSet::new());
    subscribers.subscribe(recorder.clone());
    let (_, mut rx) = subscribers.channel(16);
    let channel = UpdateChannel::new(
        transport,
        Arc::new(LineCodec),
        state.clone(),
        subscribers,
        Backoff::new(Duration::from_secs(5), 3),
    )
    .with_store(store.clone());
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(channel.run(cancel.clone()));

    let resolved = loop {
        let next = rx.recv().await.unwrap();
        if let DomainEvent::MarketResolved { market_id, .. } = next {
            break market_id;
        }
    };
    assert_eq!(resolved, market_id("m1"));

    let source = MemoryTransferSource::new(vec![
        mint("11", addr(1), 10, 3),
        mint("11", addr(2), 5, 4),
        mint("12", addr(4), 9, 5),
        transfer("11", addr(1), addr(3), 4, 7),
    ])
    .with_head(8);
    let settlement = SettlementService::new(
        BalanceReconstructor::new(source, 3),
        state.clone(),
        dec!(0.9),
    );
    let record = settlement
        .winners_for_market(&resolved, None, None)
        .await
        .unwrap();

    cancel.cancel();
    assert_eq!(handle.await.unwrap(), ChannelState::Stopped);

    assert_eq!(record.outcome_label, "Yes");
    assert_eq!(record.resolution_sequence_number, 8);
    let holders: Vec<(Address, U256)> = record.winners.iter().map(|w| (w.address, w.payout)).collect();
    assert_eq!(
        holders,
        vec![
            (addr(1), U256::from(6)),
            (addr(2), U256::from(5)),
            (addr(3), U256::from(4)),
        ]
    );
    assert_eq!(record.total_payout, U256::from(15));

    assert_eq!(recorder.events_of("price_update").len(), 1);
    assert_eq!(recorder.events_of("market_resolved").len(), 1);
    state.read(|t| {
        let e1 = t.event(&event_id("e1")).unwrap();
        assert_eq!((e1.active_markets, e1.resolved_markets), (1, 1));
    });
    assert!(state.winners(&market_id("m1")).is_some());
    assert!(store.save_count() >= 2);
}

#[tokio::test(start_paused = true)]
async fn chain_adapter_replays_windows_through_the_dispatcher() {
    let logs: Vec<(u64, Value)> = vec![
        (3, single_log(Address::ZERO, addr(1), 7, 100, 3, 0)),
        (12, batch_log(Address::ZERO, addr(2), &[(7, 40), (8, 60)], 12)),
        (15, single_log(addr(1), addr(3), 7, 30, 15, 1)),
        (25, single_log(addr(2), Address::ZERO, 7, 40, 25, 0)),
    ];
    let upstream = Arc::new(ScriptedUpstream::new().with_handler(move |target| {
        match target.body().unwrap()["method"].as_str().unwrap() {
            "eth_blockNumber" => Ok(rpc_result(json!("0x1e"))),
            "eth_getLogs" => {
                let from = hex_param(target, "fromBlock");
                let to = hex_param(target, "toBlock");
                let window: Vec<Value> = logs
                    .iter()
                    .filter(|(block, _)| (from..=to).contains(block))
                    .map(|(_, log)| log.clone())
                    .collect();
                Ok(rpc_result(Value::Array(window)))
            }
            other => panic!("unexpected rpc method {other}"),
        }
    }));
    upstream.push_err(DispatchError::RateLimited {
        target: "POST https://rpc.test".into(),
    });
    let dispatcher = RequestDispatcher::spawn(upstream.clone(), quick_policy());
    let source = CtfTransferSource::new(
        dispatcher,
        "https://rpc.test",
        "0x4d97dcd97ec945f40cf65f87097ace5ea0476045".parse().unwrap(),
    );

    let state = Arc::new(MarketState::new());
    state.replace(settler::domain::MarketTable::from_parts(
        vec![event("e1", "Chain event")],
        vec![binary_market("m7", "e1", "7", "8", None)],
    ));
    state.write(|t| t.resolve(&market_id("m7"), Some("Yes".into())));
    let settlement =
        SettlementService::new(BalanceReconstructor::new(source, 10), state.clone(), dec!(0.9));

    let record = settlement
        .winners_for_market(&market_id("m7"), None, None)
        .await
        .unwrap();

    assert_eq!(record.resolution_sequence_number, 30);
    let holders: Vec<(Address, U256)> = record.winners.iter().map(|w| (w.address, w.tokens)).collect();
    assert_eq!(holders, vec![(addr(1), U256::from(70)), (addr(3), U256::from(30))]);
    // rate-limited head query, its retry, then four windows
    assert_eq!(upstream.call_count(), 6);
    let times = upstream.call_times();
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(100));
    }
}

#[tokio::test]
async fn gamma_refresh_marks_settled_closed_markets_resolved() {
    let upstream = Arc::new(ScriptedUpstream::new());
    upstream.push_ok(json!([{
        "id": 42,
        "title": "Election",
        "volume": "1000.5",
        "markets": [
            {
                "conditionId": "0xopen",
                "question": "Open?",
                "outcomes": "[\"Yes\",\"No\"]",
                "outcomePrices": "[\"0.4\",\"0.6\"]",
                "clobTokenIds": "[\"1\",\"2\"]"
            },
            {
                "conditionId": "0xdone",
                "question": "Done?",
                "closed": true,
                "outcomes": "[\"Yes\",\"No\"]",
                "outcomePrices": "[\"0.995\",\"0.005\"]",
                "clobTokenIds": "[\"3\",\"4\"]"
            }
        ]
    }]));
    let dispatcher = RequestDispatcher::spawn(
        upstream.clone(),
        DispatchPolicy {
            min_spacing: Duration::ZERO,
            max_retries: 0,
            retry_delay: Duration::ZERO,
        },
    );
    let state = Arc::new(MarketState::new());
    let refresher = MarketRefresher::new(
        GammaClient::new(dispatcher, "https://gamma.test"),
        state.clone(),
        50,
        10,
    );

    let summary = refresher.refresh().await.unwrap();

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.inferred_resolved, 1);
    assert_eq!(upstream.call_count(), 1);
    state.read(|t| {
        assert!(t.market(&market_id("0xopen")).unwrap().is_active());
        assert_eq!(
            t.market(&market_id("0xdone")).unwrap().status,
            MarketStatus::Resolved {
                winning_outcome: Some("Yes".into())
            }
        );
        let event = t.event(&event_id("42")).unwrap();
        assert_eq!((event.active_markets, event.resolved_markets), (1, 1));
    });
}
