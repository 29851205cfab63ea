//! Remote message bus client
//!
//! Connects to an external relay over WebSocket with automatic reconnection
//! and keepalive pings. Frames are JSON tagged by `op`: the client sends
//! `subscribe` and `publish`, the relay sends `message` deliveries and
//! `published` acknowledgments. Acknowledgments arrive in publish order on
//! the socket, so they correlate FIFO with in-flight publishes.

use super::{BusError, MessageBus};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SUBSCRIBER_CAPACITY: usize = 1024;
const COMMAND_CAPACITY: usize = 256;

/// Remote bus client configuration
#[derive(Debug, Clone)]
pub struct RemoteBusConfig {
    /// Relay endpoint to connect to
    pub url: String,
    /// Maximum reconnection attempts before giving up (0 = infinite)
    pub max_reconnect_attempts: u32,
    /// Initial delay before first reconnection attempt
    pub initial_reconnect_delay: Duration,
    /// Maximum delay between reconnection attempts
    pub max_reconnect_delay: Duration,
    /// Interval for sending ping frames
    pub ping_interval: Duration,
}

impl Default for RemoteBusConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_reconnect_attempts: 0,
            initial_reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(60),
            ping_interval: Duration::from_secs(30),
        }
    }
}

impl RemoteBusConfig {
    /// Create a new config with the given relay URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set maximum reconnection attempts
    pub fn max_reconnects(mut self, n: u32) -> Self {
        self.max_reconnect_attempts = n;
        self
    }

    /// Set initial reconnection delay
    pub fn initial_delay(mut self, d: Duration) -> Self {
        self.initial_reconnect_delay = d;
        self
    }

    /// Set maximum reconnection delay
    pub fn max_delay(mut self, d: Duration) -> Self {
        self.max_reconnect_delay = d;
        self
    }

    /// Set ping interval
    pub fn ping_interval(mut self, d: Duration) -> Self {
        self.ping_interval = d;
        self
    }
}

/// Wire frames exchanged with the relay
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Frame {
    Subscribe { channel: String },
    Publish { channel: String, payload: String },
    Message { channel: String, payload: String },
    Published { receivers: u64 },
}

enum Command {
    Publish {
        channel: String,
        payload: String,
        ack: oneshot::Sender<u64>,
    },
    Subscribe {
        channel: String,
        sink: mpsc::Sender<String>,
    },
}

/// Message bus backed by a WebSocket relay connection
pub struct RemoteBus {
    cmd_tx: mpsc::Sender<Command>,
    connected: Arc<AtomicBool>,
}

impl RemoteBus {
    /// Connect to the relay endpoint
    ///
    /// Fails if the relay is unreachable; callers treat that as a startup
    /// error. After the initial connection, a dropped connection is retried
    /// in the background with exponential backoff, and active subscriptions
    /// are re-established on reconnect. Messages published by others during
    /// an outage are lost.
    pub async fn connect(config: RemoteBusConfig) -> anyhow::Result<Self> {
        let (stream, _response) = connect_async(&config.url)
            .await
            .map_err(|e| anyhow::anyhow!("bus unreachable at {}: {}", config.url, e))?;

        tracing::info!(url = %config.url, "Connected to message bus");

        let connected = Arc::new(AtomicBool::new(true));
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CAPACITY);

        let worker = Worker {
            config,
            connected: connected.clone(),
            subscribers: HashMap::new(),
            pending_acks: VecDeque::new(),
        };
        tokio::spawn(worker.run(stream, cmd_rx));

        Ok(Self { cmd_tx, connected })
    }
}

#[async_trait]
impl MessageBus for RemoteBus {
    async fn publish(&self, channel: &str, payload: String) -> anyhow::Result<u64> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Publish {
                channel: channel.to_string(),
                payload,
                ack: ack_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("bus worker stopped"))?;

        let receivers = ack_rx
            .await
            .map_err(|_| anyhow::anyhow!("bus connection lost before publish was acknowledged"))?;
        Ok(receivers)
    }

    async fn subscribe(&self, channel: &str) -> anyhow::Result<mpsc::Receiver<String>> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        self.cmd_tx
            .send(Command::Subscribe {
                channel: channel.to_string(),
                sink: tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("bus worker stopped"))?;
        Ok(rx)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Owns the socket and all per-connection state
struct Worker {
    config: RemoteBusConfig,
    connected: Arc<AtomicBool>,
    subscribers: HashMap<String, Vec<mpsc::Sender<String>>>,
    pending_acks: VecDeque<oneshot::Sender<u64>>,
}

impl Worker {
    async fn run(mut self, stream: WsStream, mut cmd_rx: mpsc::Receiver<Command>) {
        let mut stream = Some(stream);
        let mut reconnect_attempts = 0;
        let mut reconnect_delay = self.config.initial_reconnect_delay;

        loop {
            let ws = match stream.take() {
                Some(ws) => ws,
                None => match connect_async(&self.config.url).await {
                    Ok((ws, _response)) => {
                        tracing::info!(url = %self.config.url, "Bus reconnected");
                        reconnect_attempts = 0;
                        reconnect_delay = self.config.initial_reconnect_delay;
                        ws
                    }
                    Err(e) => {
                        reconnect_attempts += 1;
                        tracing::warn!(
                            error = %e,
                            attempt = reconnect_attempts,
                            "Bus reconnection failed"
                        );

                        if self.config.max_reconnect_attempts > 0
                            && reconnect_attempts >= self.config.max_reconnect_attempts
                        {
                            tracing::error!("Max bus reconnection attempts reached, giving up");
                            break;
                        }

                        sleep(reconnect_delay).await;
                        reconnect_delay = (reconnect_delay * 2).min(self.config.max_reconnect_delay);
                        continue;
                    }
                },
            };

            self.connected.store(true, Ordering::SeqCst);

            match self.drive(ws, &mut cmd_rx).await {
                Ok(()) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Bus connection lost");
                    self.connected.store(false, Ordering::SeqCst);
                    // In-flight publishes can no longer be acknowledged
                    self.pending_acks.clear();
                }
            }
        }

        self.connected.store(false, Ordering::SeqCst);
    }

    /// Pump one connection until it fails or every bus handle is dropped
    async fn drive(
        &mut self,
        ws: WsStream,
        cmd_rx: &mut mpsc::Receiver<Command>,
    ) -> Result<(), BusError> {
        let (mut write, mut read) = ws.split();

        // Re-establish subscriptions on this connection
        let channels: Vec<String> = self.subscribers.keys().cloned().collect();
        for channel in channels {
            let text = encode_frame(&Frame::Subscribe { channel })?;
            write
                .send(Message::Text(text))
                .await
                .map_err(|e| BusError::SendFailed(e.to_string()))?;
        }

        let mut ping_interval = tokio::time::interval(self.config.ping_interval);
        ping_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_frame(&text);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await
                                .map_err(|e| BusError::SendFailed(e.to_string()))?;
                        }
                        Some(Ok(Message::Pong(_))) => {}
                        Some(Ok(Message::Close(_))) => {
                            return Err(BusError::ConnectionFailed("relay closed the connection".into()));
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return Err(BusError::ConnectionFailed(e.to_string()));
                        }
                        None => {
                            return Err(BusError::ConnectionFailed("stream ended unexpectedly".into()));
                        }
                    }
                }

                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(Command::Publish { channel, payload, ack }) => {
                            let text = encode_frame(&Frame::Publish { channel, payload })?;
                            write.send(Message::Text(text)).await
                                .map_err(|e| BusError::SendFailed(e.to_string()))?;
                            self.pending_acks.push_back(ack);
                        }
                        Some(Command::Subscribe { channel, sink }) => {
                            let known = self.subscribers.contains_key(&channel);
                            self.subscribers.entry(channel.clone()).or_default().push(sink);
                            if !known {
                                let text = encode_frame(&Frame::Subscribe { channel })?;
                                write.send(Message::Text(text)).await
                                    .map_err(|e| BusError::SendFailed(e.to_string()))?;
                            }
                        }
                        None => {
                            // All bus handles dropped, shut the worker down
                            return Ok(());
                        }
                    }
                }

                _ = ping_interval.tick() => {
                    write.send(Message::Ping(vec![])).await
                        .map_err(|e| BusError::SendFailed(e.to_string()))?;
                }
            }
        }
    }

    fn handle_frame(&mut self, text: &str) {
        match serde_json::from_str::<Frame>(text) {
            Ok(Frame::Message { channel, payload }) => {
                let drained = if let Some(sinks) = self.subscribers.get_mut(&channel) {
                    sinks.retain(|sink| match sink.try_send(payload.clone()) {
                        Ok(()) => true,
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            tracing::warn!(%channel, "Subscriber lagging, message dropped");
                            true
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => false,
                    });
                    sinks.is_empty()
                } else {
                    false
                };
                if drained {
                    self.subscribers.remove(&channel);
                }
            }
            Ok(Frame::Published { receivers }) => {
                if let Some(ack) = self.pending_acks.pop_front() {
                    let _ = ack.send(receivers);
                }
            }
            Ok(_) => {
                // subscribe/publish frames only flow client -> relay
            }
            Err(e) => {
                tracing::error!(error = %e, "Discarding undecodable bus frame");
            }
        }
    }
}

fn encode_frame(frame: &Frame) -> Result<String, BusError> {
    serde_json::to_string(frame).map_err(|e| BusError::Codec(e.to_string()))
}
