use events::{
    check_counts, ChannelEventSource, EventCapture, EventRecord, EventsError, ExpectedCounts, Topic,
    WsEventSource,
};
use futures_util::SinkExt;
use serde_json::json;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message};

#[tokio::test]
async fn capture_returns_events_in_arrival_order() {
    let (tx, source) = ChannelEventSource::new();
    let capture = EventCapture::start(&source).await.unwrap();

    for (i, topic) in [Topic::Orders, Topic::Balances, Topic::Orders, Topic::Trades]
        .into_iter()
        .enumerate()
    {
        tx.send(EventRecord::new(topic, json!({ "seq": i }))).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    let captured = capture.stop().await.unwrap();
    let seqs: Vec<_> = captured.records.iter().map(|r| r.payload["seq"].clone()).collect();
    assert_eq!(seqs, vec![json!(0), json!(1), json!(2), json!(3)]);
    assert_eq!(captured.count(Topic::Orders), 2);
    assert_eq!(captured.count(Topic::Trades), 1);
}

#[tokio::test]
async fn events_after_stop_are_not_captured() {
    let (tx, source) = ChannelEventSource::new();
    let capture = EventCapture::start(&source).await.unwrap();
    tx.send(EventRecord::new(Topic::Orders, json!({}))).await.unwrap();

    let captured = capture.stop().await.unwrap();
    assert_eq!(captured.records.len(), 1);
    assert!(tx.send(EventRecord::new(Topic::Orders, json!({}))).await.is_err());
}

#[tokio::test]
async fn channel_source_subscribes_once() {
    let (_tx, source) = ChannelEventSource::new();
    let _capture = EventCapture::start(&source).await.unwrap();
    assert!(matches!(
        EventCapture::start(&source).await,
        Err(EventsError::Connect { .. })
    ));
}

#[tokio::test]
async fn websocket_frames_are_decoded_and_counted() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        let frames = [
            r#"{"topic":"orders","payload":{"id":1}}"#,
            r#"{"topic":"balances","payload":{"user_id":1}}"#,
            "not json",
            r#"{"topic":"orders","payload":{"id":1}}"#,
            r#"{"topic":"trades","payload":{"id":7}}"#,
            r#"{"topic":"orders","payload":{"id":2}}"#,
            r#"{"topic":"balances","payload":{"user_id":2}}"#,
            r#"{"topic":"orders","payload":{"id":3}}"#,
            r#"{"topic":"orders","payload":{"id":2}}"#,
        ];
        for frame in frames {
            ws.send(Message::Text(frame.to_string())).await.unwrap();
        }
        ws.close(None).await.ok();
    });

    let source = WsEventSource::new(&format!("ws://{}", addr)).unwrap();
    let capture = EventCapture::start(&source).await.unwrap();
    server.await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let captured = capture.stop().await.unwrap();
    assert_eq!(captured.records.len(), 8);
    check_counts(&captured, &ExpectedCounts::SINGLE_ACCOUNT).unwrap();
}

#[tokio::test]
async fn unreachable_stream_is_a_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source = WsEventSource::new(&format!("ws://{}", addr)).unwrap();
    assert!(matches!(
        EventCapture::start(&source).await,
        Err(EventsError::Connect { .. })
    ));
}
