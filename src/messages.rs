//! §6 wire protocol. JSON-over-WebSocket, tagged on a `"type"` field,
//! replacing the original's ad hoc `{"type": ..., ...}` dicts with a typed,
//! exhaustively-matched enum on both sides.

use crate::card::Card;
use crate::game::{Action as GameAction, HandWinner, Phase};
use crate::player::{PlayerStatus, SeatState};
use crate::room::RoomStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
    Chat {
        text: String,
    },
    RoomAction {
        action: RoomActionRequest,
    },
    GameAction {
        action: GameActionRequest,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoomActionRequest {
    SitDown { seat: usize, buy_in: i64 },
    StandUp,
    ChangeSeat { seat: usize },
    StartGame,
    Leave,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameActionRequest {
    Fold,
    Check,
    Call,
    Raise { amount: i64 },
    AllIn,
    Discard { index: usize },
}

impl From<GameActionRequest> for GameAction {
    fn from(req: GameActionRequest) -> Self {
        match req {
            GameActionRequest::Fold => GameAction::Fold,
            GameActionRequest::Check => GameAction::Check,
            GameActionRequest::Call => GameAction::Call,
            GameActionRequest::Raise { amount } => GameAction::Raise(amount),
            GameActionRequest::AllIn => GameAction::AllIn,
            GameActionRequest::Discard { index } => GameAction::Discard(index),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Pong,
    Chat {
        username: String,
        text: String,
    },
    RoomUpdate {
        room_id: String,
        status: RoomStatus,
        players: Vec<PlayerSummary>,
    },
    GameUpdate {
        room_id: String,
        hand_id: uuid::Uuid,
        phase: Phase,
        pot: i64,
        current_bet: i64,
        community_cards: Vec<Card>,
        current_player: Option<usize>,
        turn_deadline_unix_ms: Option<i64>,
        seats: Vec<PublicSeatView>,
    },
    /// Sent only to the seat's own socket; `hole_cards` is never broadcast room-wide.
    PlayerHand {
        seat: usize,
        hole_cards: Vec<Card>,
    },
    GameEnd {
        room_id: String,
        hand_id: uuid::Uuid,
        pot: i64,
        winners: Vec<HandWinner>,
    },
    PlayerConnected {
        username: String,
    },
    PlayerDisconnected {
        username: String,
    },
    RoomExpiring {
        room_id: String,
        minutes_remaining: i64,
    },
    RoomExpired {
        room_id: String,
    },
    /// Sent to a socket that is about to be evicted because the same user
    /// opened a newer connection elsewhere; the writer closes the socket
    /// right after flushing this.
    SessionReplaced,
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerSummary {
    pub username: String,
    pub seat: Option<usize>,
    pub chips: i64,
    pub online: bool,
}

/// A seat's broadcastable state: everything but the hole cards, which only
/// ever go out over `PlayerHand` to that seat's own socket.
#[derive(Debug, Clone, Serialize)]
pub struct PublicSeatView {
    pub seat: usize,
    pub username: String,
    pub chips: i64,
    pub bet_amount: i64,
    pub total_bet: i64,
    pub status: PlayerStatus,
    pub has_discarded: bool,
    pub online: bool,
}

impl From<&SeatState> for PublicSeatView {
    fn from(seat: &SeatState) -> Self {
        Self {
            seat: seat.seat,
            username: seat.username.clone(),
            chips: seat.chips,
            bet_amount: seat.bet_amount,
            total_bet: seat.total_bet,
            status: seat.status,
            has_discarded: seat.has_discarded,
            online: seat.online,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_message_room_action_parses() {
        let json = r#"{"type":"room_action","action":{"kind":"sit_down","seat":2,"buy_in":1000}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::RoomAction {
                action: RoomActionRequest::SitDown { seat, buy_in },
            } => {
                assert_eq!(seat, 2);
                assert_eq!(buy_in, 1000);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn client_message_game_action_raise_parses() {
        let json = r#"{"type":"game_action","action":{"kind":"raise","amount":300}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::GameAction {
                action: GameActionRequest::Raise { amount },
            } => assert_eq!(amount, 300),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn server_message_serializes_tagged() {
        let msg = ServerMessage::Error {
            message: "nope".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"error\""));
    }
}
