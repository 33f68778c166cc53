//! §4.6 Broadcast Scheduler and the per-room turn timer. The original fired
//! threading.Timer callbacks straight into a fresh asyncio event loop to
//! push notifications (see §9's re-architecture note); here both concerns
//! are plain tokio tasks that re-acquire the Room's own mutex, so there is
//! no second event loop and no lock-order surprise.

use crate::messages::{PublicSeatView, ServerMessage};
use crate::room::Room;
use crate::session::SessionHub;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant as TokioInstant;

/// Drives one room's turn clock: wakes at the current turn's deadline, and
/// auto-acts if the turn token hasn't moved on by then.
pub async fn run_turn_timer(room_id: String, room: Arc<Mutex<Room>>, hub: Arc<SessionHub>) {
    loop {
        let wait_target = {
            let guard = room.lock().await;
            match &guard.game {
                Some(game) if game.current_player.is_some() && !game.is_settled() => {
                    let started = game.turn_started_at.unwrap_or_else(std::time::Instant::now);
                    Some((started + Duration::from_secs(game.turn_seconds), game.turn_token))
                }
                _ => None,
            }
        };

        let Some((deadline, token)) = wait_target else {
            tokio::time::sleep(Duration::from_millis(250)).await;
            continue;
        };

        let now = std::time::Instant::now();
        let sleep_for = deadline.saturating_duration_since(now);
        tokio::time::sleep_until(TokioInstant::now() + sleep_for).await;

        let mut guard = room.lock().await;
        let still_due = guard
            .game
            .as_ref()
            .map(|g| g.turn_token == token && !g.is_settled())
            .unwrap_or(false);
        if still_due {
            let mut rng = rand::thread_rng();
            guard.apply_turn_timeout(&mut rng);
            drop(guard);
            broadcast_game_update(&room_id, &room, &hub).await;
        }
    }
}

/// Once a hand settles, the next hand begins after a fixed gap (§4.2/§4.3).
/// This loop polls for that gap elapsing and deals the next hand.
pub async fn run_hand_gap_loop(room_id: String, room: Arc<Mutex<Room>>, hub: Arc<SessionHub>) {
    loop {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let advanced = {
            let mut guard = room.lock().await;
            let mut rng = rand::thread_rng();
            guard.try_advance_past_gap(&mut rng)
        };
        if advanced {
            broadcast_game_update(&room_id, &room, &hub).await;
        }
    }
}

/// 1Hz sampler: computes a cheap fingerprint of the public game state and
/// only broadcasts (and sends private hands) when it changes, per §4.6.
pub async fn run_broadcast_sampler(room_id: String, room: Arc<Mutex<Room>>, hub: Arc<SessionHub>) {
    let mut last_fingerprint: Option<u64> = None;
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        ticker.tick().await;
        let fingerprint = {
            let guard = room.lock().await;
            fingerprint_of(&guard)
        };
        if Some(fingerprint) != last_fingerprint {
            last_fingerprint = Some(fingerprint);
            broadcast_game_update(&room_id, &room, &hub).await;
            send_private_hands(&room, &hub).await;
        }
    }
}

fn fingerprint_of(room: &Room) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    room.status.hash(&mut hasher);
    if let Some(game) = &room.game {
        game.hand_id.hash(&mut hasher);
        game.phase.hash(&mut hasher);
        game.pot.hash(&mut hasher);
        game.current_bet.hash(&mut hasher);
        game.current_player.hash(&mut hasher);
        game.community_cards.len().hash(&mut hasher);
        for seat in &game.seats {
            seat.seat.hash(&mut hasher);
            seat.chips.hash(&mut hasher);
            seat.bet_amount.hash(&mut hasher);
            seat.has_discarded.hash(&mut hasher);
        }
    }
    hasher.finish()
}

async fn broadcast_game_update(room_id: &str, room: &Arc<Mutex<Room>>, hub: &Arc<SessionHub>) {
    let message = {
        let guard = room.lock().await;
        let Some(game) = &guard.game else {
            return;
        };
        let turn_deadline_unix_ms = game.turn_started_at.map(|started| {
            let deadline = started + Duration::from_secs(game.turn_seconds);
            let now = std::time::Instant::now();
            let now_unix_ms = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0);
            now_unix_ms + deadline.saturating_duration_since(now).as_millis() as i64
        });
        ServerMessage::GameUpdate {
            room_id: room_id.to_string(),
            hand_id: game.hand_id,
            phase: game.phase,
            pot: game.pot,
            current_bet: game.current_bet,
            community_cards: game.community_cards.clone(),
            current_player: game.current_player,
            turn_deadline_unix_ms,
            seats: game.seats.iter().map(PublicSeatView::from).collect(),
        }
    };
    hub.broadcast_to_room(room_id, message).await;
}

async fn send_private_hands(room: &Arc<Mutex<Room>>, hub: &Arc<SessionHub>) {
    let guard = room.lock().await;
    let Some(game) = &guard.game else {
        return;
    };
    for seat in &game.seats {
        let message = ServerMessage::PlayerHand {
            seat: seat.seat,
            hole_cards: seat.hole_cards.clone(),
        };
        hub.send_to_user(&seat.username, message).await;
    }
}
