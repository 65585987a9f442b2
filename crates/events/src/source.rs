use crate::error::EventsError;
use crate::record::EventRecord;
use async_trait::async_trait;
use futures_util::stream::StreamExt;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

const CHANNEL_CAPACITY: usize = 1024;

/// A subscribable stream of topic-tagged exchange events.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Opens the subscription. Records arrive on the receiver in stream order;
    /// the channel closes when the underlying stream ends.
    async fn subscribe(&self) -> Result<mpsc::Receiver<EventRecord>, EventsError>;
}

/// Reads relay frames from a WebSocket endpoint.
pub struct WsEventSource {
    url: Url,
}

impl WsEventSource {
    pub fn new(url: &str) -> Result<Self, EventsError> {
        let url = Url::parse(url).map_err(|e| EventsError::Connect {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { url })
    }
}

#[async_trait]
impl EventSource for WsEventSource {
    async fn subscribe(&self) -> Result<mpsc::Receiver<EventRecord>, EventsError> {
        let (mut stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| EventsError::Connect {
                url: self.url.to_string(),
                reason: e.to_string(),
            })?;
        tracing::info!(url = %self.url, "[WS-Events] Connection established.");

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(Message::Text(text)) => match EventRecord::from_json(&text) {
                        Ok(record) => {
                            if tx.send(record).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "[WS-Events] Skipping frame"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "[WS-Events] Stream error");
                        break;
                    }
                }
            }
            tracing::info!("[WS-Events] Disconnected.");
        });

        Ok(rx)
    }
}

/// An in-process source fed through an `mpsc::Sender`. It can be subscribed once.
pub struct ChannelEventSource {
    rx: Mutex<Option<mpsc::Receiver<EventRecord>>>,
}

impl ChannelEventSource {
    pub fn new() -> (mpsc::Sender<EventRecord>, Self) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        (tx, Self { rx: Mutex::new(Some(rx)) })
    }
}

#[async_trait]
impl EventSource for ChannelEventSource {
    async fn subscribe(&self) -> Result<mpsc::Receiver<EventRecord>, EventsError> {
        self.rx.lock().await.take().ok_or_else(|| EventsError::Connect {
            url: "channel".to_string(),
            reason: "already subscribed".to_string(),
        })
    }
}
