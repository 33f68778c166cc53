//! HTTP/WebSocket surface. `Router::new().route(...).with_state(...)`
//! construction, with a split sender/receiver loop driving each socket.

use crate::auth::AuthGate;
use crate::config::Config;
use crate::error::ServerError;
use crate::game::Action as GameAction;
use crate::messages::{ClientMessage, RoomActionRequest, ServerMessage};
use crate::registry::{ExpiryEvent, RoomRegistry};
use crate::scheduler;
use crate::session::SessionHub;
use crate::user_store::UserStore;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

pub struct AppState {
    pub registry: Arc<RoomRegistry>,
    pub hub: Arc<SessionHub>,
    pub auth: AuthGate,
    pub user_store: Arc<dyn UserStore>,
    pub config: Config,
}

pub fn router(state: Arc<AppState>) -> Router {
    let governor_conf = Box::new(
        GovernorConfigBuilder::default()
            .per_second(2)
            .burst_size(20)
            .finish()
            .expect("governor config is valid"),
    );

    Router::new()
        .route("/rooms", post(create_room).get(list_rooms))
        .route("/game/:room_id", get(ws_upgrade))
        .layer(GovernorLayer {
            config: Box::leak(governor_conf),
        })
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CreateRoomRequest {
    id: String,
    name: String,
    owner: String,
    #[serde(default = "default_small_blind")]
    small_blind: i64,
    #[serde(default = "default_big_blind")]
    big_blind: i64,
    #[serde(default = "default_buy_in_min")]
    buy_in_min: i64,
    #[serde(default = "default_buy_in_max")]
    buy_in_max: i64,
}

fn default_small_blind() -> i64 {
    50
}
fn default_big_blind() -> i64 {
    100
}
fn default_buy_in_min() -> i64 {
    1_000
}
fn default_buy_in_max() -> i64 {
    50_000
}

async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let room = state
        .registry
        .create_room(
            req.id.clone(),
            req.name,
            req.owner,
            req.small_blind,
            req.big_blind,
            req.buy_in_min,
            req.buy_in_max,
            state.config.turn_seconds,
        )
        .await
        .map_err(ServerError::from)?;

    let room_id = req.id;
    tokio::spawn(scheduler::run_turn_timer(
        room_id.clone(),
        room.clone(),
        state.hub.clone(),
    ));
    tokio::spawn(scheduler::run_hand_gap_loop(
        room_id.clone(),
        room.clone(),
        state.hub.clone(),
    ));
    tokio::spawn(scheduler::run_broadcast_sampler(
        room_id.clone(),
        room,
        state.hub.clone(),
    ));

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": room_id }))))
}

async fn list_rooms(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.registry.list_rooms().await)
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    token: String,
}

async fn ws_upgrade(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    let username = state.auth.authenticate(&query.token)?;
    let room = state
        .registry
        .get_room(&room_id)
        .await
        .ok_or_else(|| ServerError::Validation(format!("no such room: {room_id}")))?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, room_id, room, username)))
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    room_id: String,
    room: Arc<tokio::sync::Mutex<crate::room::Room>>,
    username: String,
) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ServerMessage>();

    {
        let mut guard = room.lock().await;
        let _ = guard.add_player(&username);
        guard.set_online(&username, true);
    }
    state.hub.connect(&username, &room_id, tx.clone()).await;
    state
        .hub
        .broadcast_to_room(&room_id, ServerMessage::PlayerConnected { username: username.clone() })
        .await;

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let is_eviction = matches!(message, ServerMessage::SessionReplaced);
            let Ok(text) = serde_json::to_string(&message) else {
                continue;
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
            if is_eviction {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => {
                if let Err(err) = handle_client_message(&text, &room, &state, &username).await {
                    let _ = state
                        .hub
                        .send_to_user(&username, ServerMessage::Error { message: err.user_message() })
                        .await;
                    if err.close_code().is_some() {
                        break;
                    }
                }
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
        }
    }

    writer.abort();
    state.hub.disconnect(&username).await;
    {
        let mut guard = room.lock().await;
        guard.set_online(&username, false);
    }
    state
        .hub
        .broadcast_to_room(&room_id, ServerMessage::PlayerDisconnected { username })
        .await;
}

async fn handle_client_message(
    text: &str,
    room: &Arc<tokio::sync::Mutex<crate::room::Room>>,
    state: &Arc<AppState>,
    username: &str,
) -> Result<(), ServerError> {
    let msg: ClientMessage = serde_json::from_str(text)
        .map_err(|e| ServerError::Validation(format!("malformed message: {e}")))?;

    match msg {
        ClientMessage::Ping => {
            state.hub.send_to_user(username, ServerMessage::Pong).await;
        }
        ClientMessage::Chat { text } => {
            state
                .hub
                .broadcast_to_room(
                    &room.lock().await.id.clone(),
                    ServerMessage::Chat {
                        username: username.to_string(),
                        text,
                    },
                )
                .await;
        }
        ClientMessage::RoomAction { action } => {
            let leave_credit = {
                let mut guard = room.lock().await;
                match action {
                    RoomActionRequest::SitDown { seat, buy_in } => {
                        guard.sit_down(username, seat, buy_in)?;
                        None
                    }
                    RoomActionRequest::StandUp => {
                        guard.stand_up(username)?;
                        None
                    }
                    RoomActionRequest::ChangeSeat { seat } => {
                        guard.change_seat(username, seat)?;
                        None
                    }
                    RoomActionRequest::StartGame => {
                        let mut rng = rand::thread_rng();
                        guard.start_game(&mut rng)?;
                        None
                    }
                    RoomActionRequest::Leave => {
                        let chips = guard.players.get(username).map(|p| p.chips).unwrap_or(0);
                        guard.remove_player(username)?;
                        Some(chips)
                    }
                }
            };
            // Crediting the leaving player's stack back to their external
            // balance happens outside the room lock (§9 open-question
            // decision: no total_buy_in reconciliation, just the raw credit).
            if let Some(chips) = leave_credit {
                if chips != 0 {
                    state.user_store.update_balance(username, chips).await;
                }
            }
        }
        ClientMessage::GameAction { action } => {
            let action: GameAction = action.into();
            room.lock().await.handle_action(username, action)?;
        }
    }
    Ok(())
}

struct ApiError(ServerError);

impl From<ServerError> for ApiError {
    fn from(err: ServerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            ServerError::Authentication(_) | ServerError::Authorization(_) => StatusCode::UNAUTHORIZED,
            ServerError::Validation(_) => StatusCode::BAD_REQUEST,
            ServerError::Capacity(_) => StatusCode::CONFLICT,
            ServerError::State(_) | ServerError::Lifecycle(_) => StatusCode::CONFLICT,
            ServerError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.0.user_message() }))).into_response()
    }
}

/// Spawned once at startup; forwards registry expiry sweeps into room-wide broadcasts.
pub async fn run_expiry_notifier(mut events: tokio::sync::mpsc::Receiver<ExpiryEvent>, hub: Arc<SessionHub>) {
    while let Some(event) = events.recv().await {
        match event {
            ExpiryEvent::Warning { room_id, members } => {
                for member in members {
                    hub.send_to_user(
                        &member,
                        ServerMessage::RoomExpiring {
                            room_id: room_id.clone(),
                            minutes_remaining: crate::constants::EXPIRY_WARNING_MINUTES,
                        },
                    )
                    .await;
                }
            }
            ExpiryEvent::Expired { room_id, members } => {
                info!(room = %room_id, "notifying members of room expiry");
                for member in members {
                    hub.send_to_user(
                        &member,
                        ServerMessage::RoomExpired {
                            room_id: room_id.clone(),
                        },
                    )
                    .await;
                }
            }
        }
    }
    warn!("expiry notifier channel closed");
}
