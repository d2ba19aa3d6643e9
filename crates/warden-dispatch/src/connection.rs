use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn};

use warden_types::events::InboundEvent;

use crate::dispatcher::Dispatcher;

/// One platform-adapter connection over the gateway WebSocket.
///
/// Inbound frames are JSON `InboundEvent`s; each one is handed to the
/// dispatcher without waiting, so a slow handler never backs up the
/// socket. Outbound frames are whatever the sink emits while we're
/// connected.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher) {
    let (mut sender, mut receiver) = socket.split();

    info!("platform adapter connected");

    let mut frames = dispatcher.sink().subscribe();
    let send_task = tokio::spawn(async move {
        while let Ok(frame) = frames.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(e) => {
                    warn!("unserializable outbound frame: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<InboundEvent>(&text) {
                Ok(event) => dispatcher.dispatch(event),
                Err(e) => warn!("dropping undecodable event: {}", e),
            },
            Message::Close(_) => break,
            // Pings are answered by axum; binary frames are not part of
            // the protocol.
            _ => {}
        }
    }

    info!("platform adapter disconnected");
    send_task.abort();
}
