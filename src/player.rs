//! Per-seat player record, grounded on the original source's `Player` model
//! (chips/total_buy_in/pending_buy_in/status) but reshaped into a plain
//! data struct mutated only through `Room`/`Game`.

use crate::card::Card;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerStatus {
    Active,
    Folded,
    AllIn,
}

/// A player attached to a Room; `seat` is `None` until they sit down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub username: String,
    pub chips: i64,
    pub seat: Option<usize>,
    pub total_buy_in: i64,
    pub pending_buy_in: i64,
    pub online: bool,
}

impl Player {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            chips: 0,
            seat: None,
            total_buy_in: 0,
            pending_buy_in: 0,
            online: true,
        }
    }
}

/// A seat's per-hand state inside the running `Game`. Distinct from `Player`
/// because a Game snapshot must be self-contained even if the Room's
/// `Player` record changes (e.g. a pending buy-in) mid-hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatState {
    pub seat: usize,
    pub username: String,
    pub chips: i64,
    pub hole_cards: Vec<Card>,
    pub discarded_card: Option<Card>,
    pub has_discarded: bool,
    pub bet_amount: i64,
    pub total_bet: i64,
    pub status: PlayerStatus,
    pub player_acted: bool,
    pub online: bool,
}

impl SeatState {
    pub fn new(seat: usize, username: impl Into<String>, chips: i64, online: bool) -> Self {
        Self {
            seat,
            username: username.into(),
            chips,
            hole_cards: Vec::new(),
            discarded_card: None,
            has_discarded: false,
            bet_amount: 0,
            total_bet: 0,
            status: PlayerStatus::Active,
            player_acted: false,
            online,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status != PlayerStatus::Folded
    }

    pub fn is_all_in(&self) -> bool {
        self.status == PlayerStatus::AllIn
    }

    /// Moves chips from the seat's stack into its current-round contribution,
    /// upgrading to all-in if the stack can't cover the full amount.
    pub fn contribute(&mut self, amount: i64) -> i64 {
        let actual = amount.min(self.chips);
        self.chips -= actual;
        self.bet_amount += actual;
        self.total_bet += actual;
        if self.chips == 0 {
            self.status = PlayerStatus::AllIn;
        }
        actual
    }
}
