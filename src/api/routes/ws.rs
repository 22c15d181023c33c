use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::state::AppState;
use crate::domain::{ports::DeliveryChannel, RespondRequest};
use crate::infrastructure::SocketDelivery;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsInbound {
    Query { query: String },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsOutbound {
    Error { message: String },
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_session(socket, state))
}

/// One session per connection. Queries run in their own tasks so the loop
/// keeps polling the socket; a disconnect cancels whatever is in flight.
async fn handle_session(socket: WebSocket, state: AppState) {
    let cancel = CancellationToken::new();
    let (out_tx, mut out_rx) = mpsc::channel::<String>(16);
    let (mut ws_tx, mut ws_rx) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = ws_rx.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<WsInbound>(text.as_str()) {
                Ok(WsInbound::Query { query }) => {
                    spawn_query(&state, &cancel, &out_tx, query);
                }
                Err(e) => {
                    send_error(&out_tx, format!("unrecognized message: {e}")).await;
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    debug!("socket session ended, cancelling in-flight work");
    cancel.cancel();
    drop(out_tx);
    let _ = writer.await;
}

fn spawn_query(
    state: &AppState,
    cancel: &CancellationToken,
    out_tx: &mpsc::Sender<String>,
    query: String,
) {
    let responder = state.responder.clone();
    let delivery = SocketDelivery::new(out_tx.clone());
    let out_tx = out_tx.clone();
    let cancel = cancel.clone();

    tokio::spawn(async move {
        let request = RespondRequest::new(query);
        match responder.respond(&request, &cancel).await {
            Ok(answer) => {
                if let Err(e) = delivery.deliver(&request, &answer).await {
                    warn!(error = %e, "socket delivery failed");
                }
            }
            Err(e) => {
                send_error(&out_tx, e.to_string()).await;
            }
        }
    });
}

async fn send_error(out_tx: &mpsc::Sender<String>, message: String) {
    if let Ok(frame) = serde_json::to_string(&WsOutbound::Error { message }) {
        let _ = out_tx.send(frame).await;
    }
}
