//! WebSocket relay client
//!
//! Connects a session to a running relay over tokio-tungstenite. Outbound
//! messages go through [`RelaySender`], a cheap clonable handle that the
//! session holds behind its outbound port; inbound frames are decoded and
//! surfaced one at a time through [`RelayClient::next_event`].

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::application::ports::RelayOutbound;
use crate::infrastructure::protocol::{ClientMessage, ServerMessage};

/// Handle for sending messages toward the relay. Sends are fire-and-forget;
/// once the connection is gone the message is dropped with a warn log.
#[derive(Clone)]
pub struct RelaySender {
    tx: mpsc::UnboundedSender<ClientMessage>,
}

impl RelayOutbound for RelaySender {
    fn send(&self, message: ClientMessage) {
        if self.tx.send(message).is_err() {
            tracing::warn!("Relay connection closed, dropping outbound message");
        }
    }
}

/// A live connection to the relay.
pub struct RelayClient {
    sender: RelaySender,
    events: mpsc::UnboundedReceiver<ServerMessage>,
}

impl RelayClient {
    /// Open a WebSocket connection to the relay at `url` and spawn the
    /// read and write pump tasks.
    pub async fn connect(url: &str) -> Result<Self> {
        let (socket, _) = connect_async(url)
            .await
            .with_context(|| format!("Failed to connect to relay at {url}"))?;
        let (mut ws_sender, mut ws_receiver) = socket.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientMessage>();
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::warn!("Failed to serialize outbound message: {}", e);
                        continue;
                    }
                };
                if ws_sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        });

        let (event_tx, event_rx) = mpsc::unbounded_channel::<ServerMessage>();
        tokio::spawn(async move {
            while let Some(result) = ws_receiver.next().await {
                match result {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerMessage>(text.as_str()) {
                            Ok(event) => {
                                if event_tx.send(event).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::warn!("Dropping malformed relay event: {}", e);
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        tracing::info!("Relay closed the connection");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!("Relay connection error: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            sender: RelaySender { tx: out_tx },
            events: event_rx,
        })
    }

    pub fn sender(&self) -> RelaySender {
        self.sender.clone()
    }

    /// Next decoded relay event, or `None` once the connection is gone.
    pub async fn next_event(&mut self) -> Option<ServerMessage> {
        self.events.recv().await
    }
}
