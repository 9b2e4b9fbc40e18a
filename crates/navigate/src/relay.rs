//! Live note relay: every text frame one client sends goes to all clients.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::api::AppState;

/// Fan-out hub for relayed frames. Lagging subscribers drop messages.
#[derive(Clone)]
pub struct Relay {
    tx: broadcast::Sender<String>,
}

impl Relay {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Returns how many subscribers will see the message.
    pub fn publish(&self, message: String) -> usize {
        self.tx.send(message).unwrap_or(0)
    }

    pub fn listeners(&self) -> usize {
        self.tx.receiver_count()
    }
}

pub async fn midi_socket(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| relay_connection(socket, state.relay))
}

async fn relay_connection(socket: WebSocket, relay: Relay) {
    let (mut sender, mut receiver) = socket.split();
    let mut inbox = relay.subscribe();
    debug!(listeners = relay.listeners(), "relay client connected");

    let mut forward = tokio::spawn(async move {
        loop {
            match inbox.recv().await {
                Ok(text) => {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "relay client lagging, frames dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let publisher = relay.clone();
    let mut listen = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    publisher.publish(text.as_str().to_owned());
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut forward => listen.abort(),
        _ = &mut listen => forward.abort(),
    }

    debug!(listeners = relay.listeners().saturating_sub(1), "relay client disconnected");
}
