//! Realtime channel endpoint.
//!
//! Each socket gets one [`Subscriber`] whose queue is drained by a writer
//! task; a reader task handles `join`/`leave` frames. When either side ends,
//! the subscriber is detached from every channel it joined.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};

use crate::polls::broadcaster::{channel_key, Broadcaster, ChannelEvent, Subscriber, SubscriberId};
use crate::polls::code_generator::is_valid_code;
use crate::state::AppState;

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ClientEvent {
    #[serde(alias = "joinPoll")]
    Join { code: String },
    #[serde(alias = "leavePoll")]
    Leave { code: String },
}

pub async fn poll_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let buffer = state.config.broadcast_buffer;
    ws.on_upgrade(move |socket| handle_socket(socket, state, buffer))
}

async fn handle_socket(socket: WebSocket, state: AppState, buffer: usize) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ChannelEvent>(buffer);
    let subscriber = Subscriber::new(tx);
    let subscriber_id = subscriber.id();
    debug!(subscriber = %subscriber_id, "socket connected");

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let frame = match serde_json::to_string(&event) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, "failed to encode channel event");
                    continue;
                }
            };
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    let broadcaster = state.broadcaster.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => handle_client_event(&broadcaster, &subscriber, &text),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    let left = tokio::select! {
        _ = &mut send_task => finish_session(&state.broadcaster, subscriber_id, recv_task).await,
        _ = &mut recv_task => finish_session(&state.broadcaster, subscriber_id, send_task).await,
    };
    debug!(subscriber = %subscriber_id, channels = left, "socket disconnected");
}

/// Stops the surviving half of a socket and waits for it to wind down before
/// detaching the subscriber, so a join still in flight cannot outlive cleanup.
async fn finish_session(
    broadcaster: &Broadcaster,
    subscriber: SubscriberId,
    task: JoinHandle<()>,
) -> usize {
    task.abort();
    let _ = task.await;
    broadcaster.unsubscribe_all(subscriber)
}

/// Applies one client frame. Replies go to this subscriber only.
pub fn handle_client_event(broadcaster: &Broadcaster, subscriber: &Subscriber, frame: &str) {
    let event = match serde_json::from_str::<ClientEvent>(frame) {
        Ok(event) => event,
        Err(_) => {
            subscriber.notify(ChannelEvent::Error {
                message: "Unrecognized event".to_string(),
            });
            return;
        }
    };

    match event {
        ClientEvent::Join { code } => {
            if !is_valid_code(&code) {
                subscriber.notify(ChannelEvent::Error {
                    message: "Invalid poll code".to_string(),
                });
                return;
            }
            broadcaster.subscribe(&channel_key(&code), subscriber);
            subscriber.notify(ChannelEvent::Joined { code });
        }
        ClientEvent::Leave { code } => {
            broadcaster.unsubscribe(&channel_key(&code), subscriber.id());
            subscriber.notify(ChannelEvent::Left { code });
        }
    }
}
