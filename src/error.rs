//! The §7 error taxonomy. `GameError`/`RoomError` are plain per-module enums;
//! `ServerError` is the boundary type every handler converts into either a
//! client-visible `error` message or a socket close code.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("not enough seated players with chips to start a round")]
    NotEnoughPlayers,
    #[error("玩家必须先弃掉一张牌")]
    MustDiscardFirst,
    #[error("seat already discarded")]
    AlreadyDiscarded,
    #[error("discard index out of range")]
    InvalidDiscardIndex,
    #[error("it is not this seat's turn")]
    NotYourTurn,
    #[error("check is not legal while a bet is outstanding")]
    CannotCheck,
    #[error("raise amount {amount} is below the minimum raise {min_raise}")]
    RaiseTooSmall { amount: i64, min_raise: i64 },
    #[error("seat is not active in this hand")]
    SeatNotActive,
    #[error("no hand is currently in progress")]
    NoActiveHand,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("room is full")]
    RoomFull,
    #[error("player already in room")]
    AlreadyInRoom,
    #[error("player is not in this room")]
    NotInRoom,
    #[error("seat {0} is already taken")]
    SeatTaken(usize),
    #[error("seat index out of range")]
    InvalidSeat,
    #[error("buy-in {amount} is outside the allowed range [{min}, {max}]")]
    BuyInOutOfRange { amount: i64, min: i64, max: i64 },
    #[error("cannot stand up while seated in the active hand")]
    CannotStandMidHand,
    #[error("cannot change seat while in the active hand")]
    CannotChangeSeatMidHand,
    #[error("need at least two seated players with chips to start")]
    NotEnoughPlayersToStart,
    #[error("a game is already in progress")]
    GameAlreadyInProgress,
    #[error(transparent)]
    Game(#[from] GameError),
}

/// The socket/HTTP boundary error, matching §7's kinds exactly.
#[derive(Debug, Clone, Error)]
pub enum ServerError {
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("authorization failed: {0}")]
    Authorization(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("illegal state: {0}")]
    State(String),
    #[error("capacity exceeded: {0}")]
    Capacity(String),
    #[error("lifecycle: {0}")]
    Lifecycle(String),
    #[error("internal error (correlation_id={correlation_id}): {message}")]
    Internal {
        message: String,
        correlation_id: String,
    },
}

impl ServerError {
    /// WebSocket close code for taxonomy kinds that terminate the session;
    /// `None` means the session stays open and an `error` message is sent instead.
    pub fn close_code(&self) -> Option<u16> {
        match self {
            ServerError::Authentication(_) | ServerError::Authorization(_) => Some(1008),
            _ => None,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ServerError::Internal { .. } => "an internal error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<RoomError> for ServerError {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::RoomFull
            | RoomError::AlreadyInRoom
            | RoomError::SeatTaken(_)
            | RoomError::GameAlreadyInProgress => ServerError::Capacity(err.to_string()),
            RoomError::InvalidSeat | RoomError::BuyInOutOfRange { .. } => {
                ServerError::Validation(err.to_string())
            }
            RoomError::NotInRoom => ServerError::Authorization(err.to_string()),
            RoomError::CannotStandMidHand
            | RoomError::CannotChangeSeatMidHand
            | RoomError::NotEnoughPlayersToStart => ServerError::State(err.to_string()),
            RoomError::Game(game_err) => ServerError::from(game_err),
        }
    }
}

impl From<GameError> for ServerError {
    fn from(err: GameError) -> Self {
        match err {
            GameError::InvalidDiscardIndex | GameError::RaiseTooSmall { .. } => {
                ServerError::Validation(err.to_string())
            }
            _ => ServerError::State(err.to_string()),
        }
    }
}
