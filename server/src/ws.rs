use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tower_http::cors::CorsLayer;

use crate::config::ServerConfig;
use crate::hub::Hub;
use crate::session::{ClientSession, SessionId};
use pong_shared::protocol::{ClientMsg, ErrorMsg, ServerMsg};

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub config: Arc<ServerConfig>,
    pub connection_semaphore: Arc<Semaphore>,
}

impl AppState {
    pub fn new(hub: Arc<Hub>, config: ServerConfig) -> Self {
        Self {
            hub,
            connection_semaphore: Arc::new(Semaphore::new(config.max_connections)),
            config: Arc::new(config),
        }
    }
}

/// `/ws` upgrade endpoint plus `/healthz`.
pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(healthz))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

async fn healthz() -> &'static str {
    "ok"
}

fn origin_allowed(allowed: &[String], origin: Option<&HeaderValue>) -> bool {
    if allowed.is_empty() {
        return true;
    }
    origin
        .and_then(|o| o.to_str().ok())
        .is_some_and(|o| allowed.iter().any(|a| a == o))
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(app_state): State<AppState>,
) -> Response {
    let origin = headers.get(header::ORIGIN);
    if !origin_allowed(&app_state.config.allowed_origins, origin) {
        tracing::warn!("Rejected websocket from origin {:?}", origin);
        return StatusCode::FORBIDDEN.into_response();
    }

    let Ok(permit) = app_state.connection_semaphore.clone().try_acquire_owned() else {
        tracing::warn!("Connection limit reached, rejecting websocket");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    let max_bytes = app_state.config.max_message_bytes;
    ws.max_message_size(max_bytes)
        .max_frame_size(max_bytes)
        .on_upgrade(move |socket| async move {
            handle_socket(socket, app_state).await;
            drop(permit);
        })
}

async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let config = app_state.config.clone();
    let (session, mut outbox) = ClientSession::new(SessionId::next(), config.outbox_capacity);
    tracing::info!("{} connected", session.id());

    app_state.hub.register_for_match(&session);

    let (mut sink, mut stream) = socket.split();

    let mut ping = tokio::time::interval_at(
        Instant::now() + config.ping_interval,
        config.ping_interval,
    );
    let idle = tokio::time::sleep(config.idle_timeout);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            // Client -> Server
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        idle.as_mut().reset(Instant::now() + config.idle_timeout);
                        handle_client_text(&app_state.hub, &session, &text);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Pong, ping or binary: still proof of life
                        idle.as_mut().reset(Instant::now() + config.idle_timeout);
                    }
                    Some(Err(e)) => {
                        tracing::debug!("{} read error: {}", session.id(), e);
                        break;
                    }
                }
            }

            // Server -> Client
            Some(out) = outbox.recv() => {
                let json = match serde_json::to_string(out.as_ref()) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::warn!("Failed to encode message for {}: {}", session.id(), e);
                        continue;
                    }
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }

            _ = ping.tick() => {
                if sink.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }

            _ = &mut idle => {
                tracing::info!("{} idle, closing", session.id());
                break;
            }
        }
    }

    // Cleanup on disconnect
    app_state.hub.unregister(&session);
    let _ = sink.close().await;
    tracing::info!("{} disconnected", session.id());
}

/// Apply one inbound text frame. Frames that do not parse are dropped.
pub fn handle_client_text(hub: &Hub, session: &Arc<ClientSession>, text: &str) {
    let msg = match serde_json::from_str::<ClientMsg>(text) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::debug!("Dropping malformed input from {}: {}", session.id(), e);
            return;
        }
    };

    match msg {
        ClientMsg::Join(join) => {
            if join.name.is_some() {
                session.set_name(join.name.as_deref());
            }
            if let Err(e) = hub.join_as_spectator(session, &join.room_id) {
                tracing::info!("{} join {} failed: {}", session.id(), join.room_id, e);
                session.send(Arc::new(ServerMsg::Error(ErrorMsg {
                    code: e.code(),
                    message: e.to_string(),
                })));
            }
        }
        ClientMsg::Move(m) => session.set_direction(m.dir),
        ClientMsg::Mouse(m) => {
            if !session.set_target_y(m.y) {
                tracing::debug!("Dropping non-finite pointer target from {}", session.id());
            }
        }
        ClientMsg::Name(n) => session.set_name(Some(&n.name)),
    }
}
