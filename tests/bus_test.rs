//! Remote bus client tests against a minimal in-test relay server

use algotrader::bus::{MessageBus, RemoteBus, RemoteBusConfig};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};

type Topics = Arc<Mutex<HashMap<String, Vec<mpsc::Sender<String>>>>>;

/// Minimal relay speaking the op-tagged frame protocol: routes `publish`
/// frames to every connection subscribed to the channel and acknowledges
/// each publish with the receiver count.
async fn run_relay(listener: TcpListener) {
    let topics: Topics = Arc::new(Mutex::new(HashMap::new()));
    loop {
        let (stream, _) = match listener.accept().await {
            Ok(conn) => conn,
            Err(_) => return,
        };
        let topics = topics.clone();
        tokio::spawn(async move {
            if let Ok(ws) = accept_async(stream).await {
                handle_client(ws, topics).await;
            }
        });
    }
}

async fn handle_client(ws: WebSocketStream<TcpStream>, topics: Topics) {
    let (mut write, mut read) = ws.split();
    let (out_tx, mut out_rx) = mpsc::channel::<String>(64);

    loop {
        tokio::select! {
            Some(text) = out_rx.recv() => {
                if write.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let frame: serde_json::Value = serde_json::from_str(&text).unwrap();
                        match frame["op"].as_str() {
                            Some("subscribe") => {
                                let channel = frame["channel"].as_str().unwrap().to_string();
                                topics
                                    .lock()
                                    .unwrap()
                                    .entry(channel)
                                    .or_default()
                                    .push(out_tx.clone());
                            }
                            Some("publish") => {
                                let channel = frame["channel"].as_str().unwrap().to_string();
                                let payload = frame["payload"].as_str().unwrap().to_string();

                                let sinks: Vec<mpsc::Sender<String>> = topics
                                    .lock()
                                    .unwrap()
                                    .get(&channel)
                                    .cloned()
                                    .unwrap_or_default();

                                let delivery = serde_json::json!({
                                    "op": "message",
                                    "channel": channel,
                                    "payload": payload,
                                })
                                .to_string();

                                let mut receivers = 0u64;
                                for sink in &sinks {
                                    if sink.send(delivery.clone()).await.is_ok() {
                                        receivers += 1;
                                    }
                                }

                                let ack = serde_json::json!({
                                    "op": "published",
                                    "receivers": receivers,
                                })
                                .to_string();
                                if write.send(Message::Text(ack)).await.is_err() {
                                    break;
                                }
                            }
                            _ => {}
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if write.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }
}

async fn start_relay() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(run_relay(listener));
    format!("ws://{}", addr)
}

/// Publish until the relay reports a receiver; subscription registration on
/// another connection races the first publish.
async fn publish_until_received(bus: &RemoteBus, channel: &str, payload: &str) -> u64 {
    for _ in 0..50 {
        let receivers = bus.publish(channel, payload.to_string()).await.unwrap();
        if receivers > 0 {
            return receivers;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("relay never reported a receiver for {}", channel);
}

#[tokio::test]
async fn test_publish_reaches_subscriber_through_relay() {
    let url = start_relay().await;

    let subscriber = RemoteBus::connect(RemoteBusConfig::new(&url)).await.unwrap();
    let mut ticks = subscriber.subscribe("market_data").await.unwrap();

    let publisher = RemoteBus::connect(RemoteBusConfig::new(&url)).await.unwrap();
    let receivers = publish_until_received(&publisher, "market_data", "tick-1").await;
    assert_eq!(receivers, 1);

    let msg = tokio::time::timeout(Duration::from_secs(2), ticks.recv())
        .await
        .expect("timed out waiting for message")
        .expect("subscription closed");
    assert_eq!(msg, "tick-1");

    assert!(subscriber.is_connected());
    assert!(publisher.is_connected());
}

#[tokio::test]
async fn test_publish_without_subscribers_notifies_nobody() {
    let url = start_relay().await;

    let publisher = RemoteBus::connect(RemoteBusConfig::new(&url)).await.unwrap();
    let receivers = publisher
        .publish("market_data", "tick".to_string())
        .await
        .unwrap();
    assert_eq!(receivers, 0);
}

#[tokio::test]
async fn test_messages_arrive_in_publish_order() {
    let url = start_relay().await;

    let subscriber = RemoteBus::connect(RemoteBusConfig::new(&url)).await.unwrap();
    let mut stream = subscriber.subscribe("market_data").await.unwrap();

    let publisher = RemoteBus::connect(RemoteBusConfig::new(&url)).await.unwrap();
    publish_until_received(&publisher, "market_data", "probe").await;

    for i in 0..5 {
        publisher
            .publish("market_data", format!("msg-{}", i))
            .await
            .unwrap();
    }

    let first = tokio::time::timeout(Duration::from_secs(2), stream.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first, "probe");

    for i in 0..5 {
        let msg = tokio::time::timeout(Duration::from_secs(2), stream.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg, format!("msg-{}", i));
    }
}

#[tokio::test]
async fn test_channels_are_isolated() {
    let url = start_relay().await;

    let subscriber = RemoteBus::connect(RemoteBusConfig::new(&url)).await.unwrap();
    let mut ticks = subscriber.subscribe("market_data").await.unwrap();
    let mut signals = subscriber.subscribe("trading_signals").await.unwrap();

    let publisher = RemoteBus::connect(RemoteBusConfig::new(&url)).await.unwrap();
    publish_until_received(&publisher, "trading_signals", "signal-1").await;

    let msg = tokio::time::timeout(Duration::from_secs(2), signals.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(msg, "signal-1");

    // Nothing was published to market_data
    let result = tokio::time::timeout(Duration::from_millis(300), ticks.recv()).await;
    assert!(result.is_err());
}
