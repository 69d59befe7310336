//! # Fleet Channel
//!
//! Client side of the telemetry feed. Connects to the feed over WebSocket,
//! decodes each text frame into a [`TelemetryMessage`] and forwards it to
//! the session as a [`ChannelEvent`].
//!
//! ## Behaviour
//!
//! - Undecodable frames are reported and skipped; the connection stays up
//! - On close or transport error the channel reconnects with exponential
//!   backoff
//! - Nothing missed while disconnected is replayed

pub mod error;

pub use error::{ChannelError, ChannelResult};

use chrono::{DateTime, Utc};
use fleet_core::TelemetryMessage;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Feed endpoint, `ws://` or `wss://`
    pub url: String,
    /// First reconnect delay
    pub reconnect_delay_ms: u64,
    /// Reconnect delay ceiling
    pub max_reconnect_delay_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:9013".to_string(),
            reconnect_delay_ms: 500,
            max_reconnect_delay_ms: 30_000,
        }
    }
}

impl ChannelConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> ChannelResult<()> {
        if self.url.starts_with("ws://") || self.url.starts_with("wss://") {
            Ok(())
        } else {
            Err(ChannelError::InvalidUrl(self.url.clone()))
        }
    }
}

// ============================================================================
// EVENTS
// ============================================================================

/// What the channel reports to the session
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    Connected {
        connection_id: Uuid,
        at: DateTime<Utc>,
    },
    Message(TelemetryMessage),
    Disconnected,
    Error(String),
}

impl ChannelEvent {
    /// Decode a text frame, turning decode failures into an error event
    pub fn from_text(text: &str) -> Self {
        match TelemetryMessage::parse(text) {
            Ok(message) => ChannelEvent::Message(message),
            Err(e) => ChannelEvent::Error(ChannelError::from(e).to_string()),
        }
    }
}

// ============================================================================
// BACKOFF
// ============================================================================

/// Doubling reconnect delay, capped
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay to wait now; doubles the next one
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

// ============================================================================
// CHANNEL
// ============================================================================

pub struct TelemetryChannel {
    config: ChannelConfig,
}

impl TelemetryChannel {
    pub fn new(config: ChannelConfig) -> Self {
        Self { config }
    }

    /// Run until the event receiver is dropped
    pub async fn run(self, tx: mpsc::Sender<ChannelEvent>) -> ChannelResult<()> {
        self.config.validate()?;

        let mut backoff = Backoff::new(
            Duration::from_millis(self.config.reconnect_delay_ms),
            Duration::from_millis(self.config.max_reconnect_delay_ms),
        );

        loop {
            match self.connection(&tx, &mut backoff).await {
                Ok(()) => {}
                Err(ChannelError::ReceiverDropped) => break,
                Err(e) => {
                    error!("Telemetry channel error: {}", e);
                    if tx.send(ChannelEvent::Error(e.to_string())).await.is_err() {
                        break;
                    }
                }
            }

            let delay = backoff.next_delay();
            debug!("Reconnecting to {} in {:?}", self.config.url, delay);
            tokio::time::sleep(delay).await;
        }

        info!("Telemetry channel stopped");
        Ok(())
    }

    /// One connection lifetime; returns once the feed closes
    async fn connection(
        &self,
        tx: &mpsc::Sender<ChannelEvent>,
        backoff: &mut Backoff,
    ) -> ChannelResult<()> {
        let (mut ws, _) = connect_async(self.config.url.as_str()).await?;
        backoff.reset();

        let connection_id = Uuid::new_v4();
        info!("🔗 Telemetry feed {} connected ({})", self.config.url, connection_id);
        send(
            tx,
            ChannelEvent::Connected {
                connection_id,
                at: Utc::now(),
            },
        )
        .await?;

        let result = loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    let event = ChannelEvent::from_text(text.as_str());
                    if let ChannelEvent::Error(reason) = &event {
                        warn!("Skipping telemetry frame: {}", reason);
                    }
                    if let Err(e) = send(tx, event).await {
                        break Err(e);
                    }
                }
                Some(Ok(Message::Binary(_))) => {
                    warn!("Ignoring binary frame from telemetry feed");
                }
                Some(Ok(Message::Close(frame))) => {
                    info!("Telemetry feed closed: {:?}", frame);
                    break Ok(());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(ChannelError::from(e)),
                None => break Ok(()),
            }
        };

        info!("🔌 Telemetry feed {} disconnected", connection_id);
        match result {
            Err(ChannelError::ReceiverDropped) => Err(ChannelError::ReceiverDropped),
            other => {
                send(tx, ChannelEvent::Disconnected).await?;
                other
            }
        }
    }
}

async fn send(tx: &mpsc::Sender<ChannelEvent>, event: ChannelEvent) -> ChannelResult<()> {
    tx.send(event)
        .await
        .map_err(|_| ChannelError::ReceiverDropped)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::SinkExt;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    const VALID: &str = r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{"registration":"SD-B1","Name":"Scout","altitude":50},"geometry":{"type":"Point","coordinates":[35.9,31.9]}}]}"#;

    #[test]
    fn test_config_validation() {
        assert!(ChannelConfig::default().validate().is_ok());
        assert!(ChannelConfig::new("wss://feed.example").validate().is_ok());
        assert!(matches!(
            ChannelConfig::new("http://localhost:9013").validate(),
            Err(ChannelError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(350));
        assert_eq!(backoff.next_delay(), Duration::from_millis(350));

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_event_from_text() {
        match ChannelEvent::from_text(VALID) {
            ChannelEvent::Message(msg) => assert_eq!(msg.features.len(), 1),
            other => panic!("expected message, got {:?}", other),
        }
        assert!(matches!(
            ChannelEvent::from_text("not json"),
            ChannelEvent::Error(_)
        ));
    }

    #[tokio::test]
    async fn test_run_rejects_invalid_url() {
        let (tx, _rx) = mpsc::channel(1);
        let result = TelemetryChannel::new(ChannelConfig::new("localhost")).run(tx).await;
        assert!(matches!(result, Err(ChannelError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_channel_forwards_frames() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            ws.send(Message::Text(VALID.into())).await.unwrap();
            ws.send(Message::Text("garbage".into())).await.unwrap();
            ws.send(Message::Text(VALID.into())).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let (tx, mut rx) = mpsc::channel(16);
        let channel = TelemetryChannel::new(ChannelConfig::new(format!("ws://{}", addr)));
        let client = tokio::spawn(channel.run(tx));

        assert!(matches!(rx.recv().await, Some(ChannelEvent::Connected { .. })));
        assert!(matches!(rx.recv().await, Some(ChannelEvent::Message(_))));
        assert!(matches!(rx.recv().await, Some(ChannelEvent::Error(_))));
        assert!(matches!(rx.recv().await, Some(ChannelEvent::Message(_))));
        assert!(matches!(rx.recv().await, Some(ChannelEvent::Disconnected)));

        server.await.unwrap();
        drop(rx);
        client.abort();
    }
}
