use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use common::EngineEvent;

use crate::{
    auth::{token_matches, unauthorized},
    AppState,
};

pub fn ws_router() -> Router<AppState> {
    Router::new().route("/ws/events", get(ws_events_handler))
}

#[derive(Deserialize)]
struct WsQuery {
    token: Option<String>,
}

/// Streams engine events (trades, rejections, arm/disarm) as JSON text frames.
/// Auth via query param `?token=<DASHBOARD_TOKEN>` since browsers cannot set
/// headers on WebSocket requests.
async fn ws_events_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(q): Query<WsQuery>,
) -> Response {
    if !token_matches(&state, q.token.as_deref()) {
        return unauthorized();
    }

    let events = state.engine.subscribe();
    ws.on_upgrade(move |socket| stream_events(socket, events))
}

async fn stream_events(mut socket: WebSocket, mut events: broadcast::Receiver<EngineEvent>) {
    debug!("Event stream client connected");
    loop {
        match events.recv().await {
            Ok(event) => {
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "Failed to encode engine event");
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(n)) => {
                warn!(dropped = n, "WebSocket event client lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
    debug!("Event stream client disconnected");
}
