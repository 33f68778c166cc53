//! End-to-end coverage over a real `axum::Router`, bound to an ephemeral
//! port and driven with `tokio-tungstenite` clients — covering §8 scenarios
//! 1 (heads-up preflop) and 7 (reconnection replaces prior socket).

use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use pineapple_server::auth::AuthGate;
use pineapple_server::config::Config;
use pineapple_server::registry::RoomRegistry;
use pineapple_server::server::{self, AppState};
use pineapple_server::session::SessionHub;
use pineapple_server::user_store::InMemoryUserStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as WsMessage;

const JWT_SECRET: &str = "test-secret";

#[derive(serde::Serialize)]
struct Claims {
    sub: String,
    exp: usize,
}

fn token_for(username: &str) -> String {
    let exp = (std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
        + 3600) as usize;
    let claims = Claims {
        sub: username.to_string(),
        exp,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

async fn spawn_server() -> (String, reqwest::Client) {
    let config = Config {
        port: 0,
        bind: "127.0.0.1".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        storage_root: std::env::temp_dir()
            .join(format!("pineapple-e2e-{}", std::process::id()))
            .to_string_lossy()
            .to_string(),
        turn_seconds: 30,
        idle_limit_minutes: 30,
        expiry_warning_minutes: 5,
        save_interval_secs: 3600,
        cleanup_interval_secs: 3600,
        log_level: "error".to_string(),
    };

    let state = Arc::new(AppState {
        registry: Arc::new(RoomRegistry::new()),
        hub: Arc::new(SessionHub::new()),
        auth: AuthGate::new(&config.jwt_secret),
        user_store: Arc::new(InMemoryUserStore::new()),
        config,
    });

    let app = server::router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>())
            .await
            .unwrap();
    });

    (format!("http://{addr}"), reqwest::Client::new())
}

async fn recv_json(
    ws: &mut tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
) -> Value {
    loop {
        match ws.next().await.unwrap().unwrap() {
            WsMessage::Text(text) => return serde_json::from_str(&text).unwrap(),
            _ => continue,
        }
    }
}

#[tokio::test]
async fn heads_up_preflop_over_the_wire() {
    let (base, http) = spawn_server().await;

    http.post(format!("{base}/rooms"))
        .json(&json!({
            "id": "table-1",
            "name": "heads up",
            "owner": "alice",
            "small_blind": 50,
            "big_blind": 100,
            "buy_in_min": 1000,
            "buy_in_max": 50000
        }))
        .send()
        .await
        .unwrap();

    let ws_base = base.replacen("http://", "ws://", 1);

    let alice_token = token_for("alice");
    let bob_token = token_for("bob");

    let (mut alice_ws, _) = tokio_tungstenite::connect_async(format!(
        "{ws_base}/game/table-1?token={alice_token}"
    ))
    .await
    .unwrap();
    let (mut bob_ws, _) = tokio_tungstenite::connect_async(format!(
        "{ws_base}/game/table-1?token={bob_token}"
    ))
    .await
    .unwrap();

    send(&mut alice_ws, json!({"type":"room_action","action":{"kind":"sit_down","seat":0,"buy_in":10000}})).await;
    send(&mut bob_ws, json!({"type":"room_action","action":{"kind":"sit_down","seat":1,"buy_in":10000}})).await;
    send(&mut alice_ws, json!({"type":"room_action","action":{"kind":"start_game"}})).await;

    send(&mut alice_ws, json!({"type":"game_action","action":{"kind":"discard","index":0}})).await;
    send(&mut alice_ws, json!({"type":"game_action","action":{"kind":"call"}})).await;
    send(&mut bob_ws, json!({"type":"game_action","action":{"kind":"discard","index":0}})).await;
    send(&mut bob_ws, json!({"type":"game_action","action":{"kind":"check"}})).await;

    let mut saw_flop = false;
    for _ in 0..20 {
        let msg = recv_json(&mut alice_ws).await;
        if msg.get("type").and_then(Value::as_str) == Some("game_update") {
            let community = msg["community_cards"].as_array().unwrap();
            if community.len() == 3 {
                assert_eq!(msg["pot"], 200);
                assert_eq!(msg["current_player"], 1);
                saw_flop = true;
                break;
            }
        }
    }
    assert!(saw_flop, "expected a game_update showing the flop dealt");
}

#[tokio::test]
async fn reconnection_replaces_prior_socket() {
    let (base, http) = spawn_server().await;

    http.post(format!("{base}/rooms"))
        .json(&json!({
            "id": "table-2",
            "name": "reconnect",
            "owner": "alice",
            "small_blind": 50,
            "big_blind": 100,
            "buy_in_min": 1000,
            "buy_in_max": 50000
        }))
        .send()
        .await
        .unwrap();

    let ws_base = base.replacen("http://", "ws://", 1);
    let token = token_for("alice");

    let (mut socket_a, _) =
        tokio_tungstenite::connect_async(format!("{ws_base}/game/table-2?token={token}"))
            .await
            .unwrap();
    let (mut socket_b, _) =
        tokio_tungstenite::connect_async(format!("{ws_base}/game/table-2?token={token}"))
            .await
            .unwrap();

    // Socket A should be sent a close frame by the server after B connects.
    let mut closed = false;
    for _ in 0..10 {
        match tokio::time::timeout(std::time::Duration::from_millis(500), socket_a.next()).await {
            Ok(Some(Ok(WsMessage::Close(_)))) => {
                closed = true;
                break;
            }
            Ok(Some(Ok(_))) => continue,
            _ => break,
        }
    }
    assert!(closed, "prior socket should be closed by the server");

    send(&mut socket_b, json!({"type":"ping"})).await;
    let msg = recv_json(&mut socket_b).await;
    assert_eq!(msg["type"], "pong");
}

async fn send(
    ws: &mut tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    value: Value,
) {
    ws.send(WsMessage::Text(value.to_string())).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
}
