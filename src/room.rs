//! A table: membership, seating, and the single `Game` in flight. Grounded
//! on the original `Room` model (add_player/remove_player/start_game,
//! owner-is-first-player, idle/expiry tracking) but reworked around
//! `Result`-returning seat operations and an explicit `RoomStatus` instead
//! of a free-form status string.

use crate::constants::{HAND_HISTORY_RING_SIZE, MAX_PLAYERS};
use crate::error::{GameError, RoomError};
use crate::game::{Action, Game, HandHistoryEntry, SeatInput};
use crate::player::Player;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomStatus {
    Waiting,
    Playing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomMetadata {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub player_count: usize,
    pub max_players: usize,
    pub status: RoomStatus,
    pub created_at_unix: i64,
    pub last_activity_unix: i64,
}

pub struct Room {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub max_players: usize,
    pub small_blind: i64,
    pub big_blind: i64,
    pub buy_in_min: i64,
    pub buy_in_max: i64,
    pub turn_seconds: u64,
    pub status: RoomStatus,
    pub players: HashMap<String, Player>,
    pub game: Option<Game>,
    pub dealer_seat: usize,
    history: VecDeque<HandHistoryEntry>,
    created_at: Instant,
    last_activity: Instant,
    pub hand_gap_until: Option<Instant>,
}

impl Room {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        owner: impl Into<String>,
        small_blind: i64,
        big_blind: i64,
        buy_in_min: i64,
        buy_in_max: i64,
        turn_seconds: u64,
    ) -> Self {
        let now = Instant::now();
        Self {
            id: id.into(),
            name: name.into(),
            owner: owner.into(),
            max_players: MAX_PLAYERS,
            small_blind,
            big_blind,
            buy_in_min,
            buy_in_max,
            turn_seconds,
            status: RoomStatus::Waiting,
            players: HashMap::new(),
            game: None,
            dealer_seat: 0,
            history: VecDeque::with_capacity(HAND_HISTORY_RING_SIZE),
            created_at: now,
            last_activity: now,
            hand_gap_until: None,
        }
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn add_player(&mut self, username: &str) -> Result<(), RoomError> {
        if self.players.contains_key(username) {
            return Err(RoomError::AlreadyInRoom);
        }
        if self.players.len() >= self.max_players {
            return Err(RoomError::RoomFull);
        }
        self.players
            .insert(username.to_string(), Player::new(username));
        self.touch();
        Ok(())
    }

    /// Vacates a player's seat (if any) and removes them from the room.
    /// Returns `true` if the room is now empty.
    pub fn remove_player(&mut self, username: &str) -> Result<bool, RoomError> {
        if !self.players.contains_key(username) {
            return Err(RoomError::NotInRoom);
        }
        if let Some(player) = self.players.get(username) {
            if player.seat.is_some() && self.hand_in_progress_for_seat(player.seat) {
                // Leaving mid-hand auto-folds rather than blocking the leave.
                if let Some(game) = self.game.as_mut() {
                    if let Some(seat) = player.seat {
                        game.force_fold(seat);
                    }
                }
            }
        }
        self.players.remove(username);
        self.touch();
        Ok(self.players.is_empty())
    }

    fn hand_in_progress_for_seat(&self, seat: Option<usize>) -> bool {
        match (seat, &self.game) {
            (Some(s), Some(game)) => {
                !game.is_settled() && game.seats.iter().any(|gs| gs.seat == s && gs.is_active())
            }
            _ => false,
        }
    }

    fn seat_taken(&self, seat: usize) -> bool {
        self.players.values().any(|p| p.seat == Some(seat))
    }

    pub fn sit_down(&mut self, username: &str, seat: usize, buy_in: i64) -> Result<(), RoomError> {
        if seat >= self.max_players {
            return Err(RoomError::InvalidSeat);
        }
        if buy_in < self.buy_in_min || buy_in > self.buy_in_max {
            return Err(RoomError::BuyInOutOfRange {
                amount: buy_in,
                min: self.buy_in_min,
                max: self.buy_in_max,
            });
        }
        if self.seat_taken(seat) {
            return Err(RoomError::SeatTaken(seat));
        }
        let player = self.players.get_mut(username).ok_or(RoomError::NotInRoom)?;
        player.seat = Some(seat);
        player.chips += buy_in;
        player.total_buy_in += buy_in;
        self.touch();
        Ok(())
    }

    pub fn stand_up(&mut self, username: &str) -> Result<(), RoomError> {
        let player = self.players.get(username).ok_or(RoomError::NotInRoom)?;
        if self.hand_in_progress_for_seat(player.seat) {
            return Err(RoomError::CannotStandMidHand);
        }
        let player = self.players.get_mut(username).unwrap();
        player.seat = None;
        self.touch();
        Ok(())
    }

    pub fn change_seat(&mut self, username: &str, new_seat: usize) -> Result<(), RoomError> {
        if new_seat >= self.max_players {
            return Err(RoomError::InvalidSeat);
        }
        let player = self.players.get(username).ok_or(RoomError::NotInRoom)?;
        if self.hand_in_progress_for_seat(player.seat) {
            return Err(RoomError::CannotChangeSeatMidHand);
        }
        if self.seat_taken(new_seat) {
            return Err(RoomError::SeatTaken(new_seat));
        }
        self.players.get_mut(username).unwrap().seat = Some(new_seat);
        self.touch();
        Ok(())
    }

    pub fn set_online(&mut self, username: &str, online: bool) {
        if let Some(player) = self.players.get_mut(username) {
            player.online = online;
        }
        if let Some(game) = self.game.as_mut() {
            if let Some(seat) = self.players.get(username).and_then(|p| p.seat) {
                if let Some(gs) = game.seats.iter_mut().find(|s| s.seat == seat) {
                    gs.online = online;
                }
            }
        }
    }

    fn seated_players(&self) -> Vec<(&String, &Player)> {
        self.players
            .iter()
            .filter(|(_, p)| p.seat.is_some() && p.chips > 0)
            .collect()
    }

    /// §4.3 `startGame`. Advances the dealer button and deals a fresh round.
    pub fn start_game<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), RoomError> {
        if self.status == RoomStatus::Playing {
            return Err(RoomError::GameAlreadyInProgress);
        }
        if self.seated_players().len() < 2 {
            return Err(RoomError::NotEnoughPlayersToStart);
        }
        self.start_hand(rng)?;
        self.status = RoomStatus::Playing;
        Ok(())
    }

    /// Deals the next hand, rotating the dealer button among currently
    /// seated-with-chips players. Used by both `startGame` and the
    /// post-gap automatic re-deal.
    pub fn start_hand<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), RoomError> {
        let mut seats: Vec<usize> = self
            .seated_players()
            .into_iter()
            .filter_map(|(_, p)| p.seat)
            .collect();
        seats.sort_unstable();
        if seats.len() < 2 {
            return Err(RoomError::NotEnoughPlayersToStart);
        }
        let next_dealer = seats
            .iter()
            .copied()
            .find(|&s| s > self.dealer_seat)
            .unwrap_or(seats[0]);
        self.dealer_seat = next_dealer;

        let inputs: Vec<SeatInput> = self
            .players
            .iter()
            .filter(|(_, p)| p.seat.is_some() && p.chips > 0)
            .map(|(username, p)| SeatInput {
                seat: p.seat.unwrap(),
                username: username.clone(),
                chips: p.chips,
                online: p.online,
            })
            .collect();

        let game = Game::start_round(
            rng,
            self.max_players,
            self.dealer_seat,
            self.small_blind,
            self.big_blind,
            self.turn_seconds,
            inputs,
        )
        .map_err(RoomError::Game)?;
        self.game = Some(game);
        self.hand_gap_until = None;
        self.touch();
        Ok(())
    }

    pub fn handle_action(&mut self, username: &str, action: Action) -> Result<(), RoomError> {
        let seat = self
            .players
            .get(username)
            .and_then(|p| p.seat)
            .ok_or(RoomError::NotInRoom)?;
        let game = self.game.as_mut().ok_or(GameError::NoActiveHand)?;
        game.handle_action(seat, action)?;
        self.touch();
        self.sync_chips_from_game();
        if self.game.as_ref().map(|g| g.is_settled()).unwrap_or(false) {
            self.settle_current_hand();
        }
        Ok(())
    }

    /// Invoked by the turn-timer task when a seat's think time has expired.
    pub fn apply_turn_timeout<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let Some(game) = self.game.as_mut() else {
            return;
        };
        game.apply_turn_timeout(rng);
        self.touch();
        self.sync_chips_from_game();
        if self.game.as_ref().map(|g| g.is_settled()).unwrap_or(false) {
            self.settle_current_hand();
        }
    }

    fn sync_chips_from_game(&mut self) {
        let Some(game) = &self.game else { return };
        for seat_state in &game.seats {
            if let Some(player) = self
                .players
                .values_mut()
                .find(|p| p.seat == Some(seat_state.seat))
            {
                player.chips = seat_state.chips;
            }
        }
    }

    fn settle_current_hand(&mut self) {
        if let Some(game) = self.game.as_mut() {
            if let Some(entry) = game.take_completed_history() {
                if self.history.len() == HAND_HISTORY_RING_SIZE {
                    self.history.pop_front();
                }
                self.history.push_back(entry);
            }
        }
        self.hand_gap_until = Some(Instant::now() + crate::constants::hand_gap_duration());
    }

    /// Called by the scheduler once the post-hand gap has elapsed. Deals the
    /// next hand if enough players remain seated with chips, otherwise
    /// drops the room back to `Waiting`.
    pub fn try_advance_past_gap<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        let Some(until) = self.hand_gap_until else {
            return false;
        };
        if Instant::now() < until {
            return false;
        }
        match self.start_hand(rng) {
            Ok(()) => true,
            Err(_) => {
                self.status = RoomStatus::Waiting;
                self.game = None;
                self.hand_gap_until = None;
                true
            }
        }
    }

    pub fn get_game_history(&self) -> &VecDeque<HandHistoryEntry> {
        &self.history
    }

    pub fn is_expired(&self, idle_limit_minutes: i64) -> bool {
        self.last_activity.elapsed().as_secs() as i64 > idle_limit_minutes * 60
    }

    pub fn is_expiring(&self, idle_limit_minutes: i64, warning_minutes: i64) -> bool {
        let remaining = idle_limit_minutes * 60 - self.last_activity.elapsed().as_secs() as i64;
        remaining > 0 && remaining <= warning_minutes * 60
    }

    pub fn snapshot(&self) -> RoomMetadata {
        let created_unix = unix_seconds_ago(self.created_at.elapsed());
        let activity_unix = unix_seconds_ago(self.last_activity.elapsed());
        RoomMetadata {
            id: self.id.clone(),
            name: self.name.clone(),
            owner: self.owner.clone(),
            player_count: self.players.len(),
            max_players: self.max_players,
            status: self.status,
            created_at_unix: created_unix,
            last_activity_unix: activity_unix,
        }
    }
}

fn unix_seconds_ago(elapsed: std::time::Duration) -> i64 {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    (now.as_secs() as i64) - elapsed.as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn room_with_two_players() -> Room {
        let mut room = Room::new("r1", "table", "alice", 50, 100, 1000, 50_000, 30);
        room.add_player("alice").unwrap();
        room.add_player("bob").unwrap();
        room.sit_down("alice", 0, 10_000).unwrap();
        room.sit_down("bob", 1, 10_000).unwrap();
        room
    }

    #[test]
    fn owner_is_first_player_and_seating_rejects_duplicate_seat() {
        let mut room = room_with_two_players();
        assert_eq!(room.owner, "alice");
        let err = room.sit_down("bob", 0, 1000).unwrap_err();
        assert_eq!(err, RoomError::SeatTaken(0));
    }

    #[test]
    fn start_game_requires_two_seated_players() {
        let mut room = Room::new("r1", "table", "alice", 50, 100, 1000, 50_000, 30);
        room.add_player("alice").unwrap();
        room.sit_down("alice", 0, 10_000).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = room.start_game(&mut rng).unwrap_err();
        assert_eq!(err, RoomError::NotEnoughPlayersToStart);
    }

    #[test]
    fn leaving_mid_hand_folds_the_seat() {
        let mut room = room_with_two_players();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        room.start_game(&mut rng).unwrap();
        let empty = room.remove_player("bob").unwrap();
        assert!(!empty);
        assert!(room.game.as_ref().unwrap().is_settled());
    }
}
