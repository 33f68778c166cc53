//! The betting-round state machine for a single hand. Grounded on the
//! original `Game` model (deal_cards/post_blinds/handle_action/
//! find_next_player_with_chips/pot split) but reshaped around an explicit
//! `Action` enum and a `Result`-returning mutation API instead of dict
//! mutation with string error returns.

use crate::card::{Card, Deck};
use crate::error::GameError;
use crate::evaluator::{self, HandValue};
use crate::player::{PlayerStatus, SeatState};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    PreFlop,
    Flop,
    Turn,
    River,
    Showdown,
    Settled,
}

impl Phase {
    pub fn betting_round(self) -> u8 {
        match self {
            Phase::PreFlop => 0,
            Phase::Flop => 1,
            Phase::Turn => 2,
            Phase::River => 3,
            Phase::Showdown | Phase::Settled => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Fold,
    Check,
    Call,
    Raise(i64),
    AllIn,
    Discard(usize),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandWinner {
    pub seat: usize,
    pub username: String,
    pub amount: i64,
    pub hand_description: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandHistoryEntry {
    pub hand_id: Uuid,
    pub pot: i64,
    pub community_cards: Vec<Card>,
    pub winners: Vec<HandWinner>,
}

/// Input used to seat players into a fresh `Game` at `start_round`.
#[derive(Debug, Clone)]
pub struct SeatInput {
    pub seat: usize,
    pub username: String,
    pub chips: i64,
    pub online: bool,
}

pub struct Game {
    pub hand_id: Uuid,
    pub table_size: usize,
    pub dealer_seat: usize,
    pub small_blind: i64,
    pub big_blind: i64,
    pub turn_seconds: u64,

    deck: Deck,
    pub seats: Vec<SeatState>,
    pub community_cards: Vec<Card>,
    pub pot: i64,
    pub current_bet: i64,
    pub phase: Phase,
    pub current_player: Option<usize>,
    pub turn_started_at: Option<std::time::Instant>,
    /// Bumped every time `current_player` changes; lets a timer task notice
    /// a turn has already moved on before it fires.
    pub turn_token: u64,
    last_completed_hand: Option<HandHistoryEntry>,
}

impl Game {
    /// §4.2 `startRound()`. Fails if fewer than 2 seated players with chips.
    pub fn start_round<R: Rng + ?Sized>(
        rng: &mut R,
        table_size: usize,
        dealer_seat: usize,
        small_blind: i64,
        big_blind: i64,
        turn_seconds: u64,
        players: Vec<SeatInput>,
    ) -> Result<Self, GameError> {
        let eligible: Vec<&SeatInput> = players.iter().filter(|p| p.chips > 0).collect();
        if eligible.len() < 2 {
            return Err(GameError::NotEnoughPlayers);
        }

        let mut deck = Deck::new();
        deck.shuffle(rng);

        let mut seats: Vec<SeatState> = players
            .into_iter()
            .filter(|p| p.chips > 0)
            .map(|p| SeatState::new(p.seat, p.username, p.chips, p.online))
            .collect();
        seats.sort_by_key(|s| s.seat);

        for seat in seats.iter_mut() {
            let mut hole = Vec::with_capacity(3);
            for _ in 0..3 {
                if let Some(card) = deck.deal() {
                    hole.push(card);
                }
            }
            hole.sort_by(|a, b| a.display_cmp(b));
            seat.hole_cards = hole;
        }

        let mut game = Self {
            hand_id: Uuid::new_v4(),
            table_size,
            dealer_seat,
            small_blind,
            big_blind,
            turn_seconds,
            deck,
            seats,
            community_cards: Vec::new(),
            pot: 0,
            current_bet: 0,
            phase: Phase::PreFlop,
            current_player: None,
            turn_started_at: None,
            turn_token: 0,
            last_completed_hand: None,
        };

        game.post_blinds();
        let first_actor = game.preflop_first_actor();
        game.set_current_player(first_actor);
        Ok(game)
    }

    fn seat_index_of(&self, seat: usize) -> Option<usize> {
        self.seats.iter().position(|s| s.seat == seat)
    }

    fn active_seats(&self) -> Vec<&SeatState> {
        self.seats.iter().filter(|s| s.is_active()).collect()
    }

    /// Circular distance from `dealer_seat + 1`, used both for action order
    /// and for remainder-of-split ordering (§4.2 numeric semantics).
    fn seat_order_key(&self, seat: usize) -> usize {
        let first = (self.dealer_seat + 1) % self.table_size;
        (seat + self.table_size - first) % self.table_size
    }

    fn post_blinds(&mut self) {
        let heads_up = self.seats.len() == 2;
        let (sb_seat, bb_seat) = if heads_up {
            // Two-handed special case: dealer posts the small blind.
            let dealer = self.dealer_seat;
            let other = self
                .seats
                .iter()
                .map(|s| s.seat)
                .find(|&s| s != dealer)
                .unwrap_or(dealer);
            (dealer, other)
        } else {
            let mut ordered: Vec<usize> = self.seats.iter().map(|s| s.seat).collect();
            ordered.sort_by_key(|&s| self.seat_order_key(s));
            let sb = ordered[0];
            let bb = if ordered.len() > 1 { ordered[1] } else { ordered[0] };
            (sb, bb)
        };

        if let Some(idx) = self.seat_index_of(sb_seat) {
            self.seats[idx].contribute(self.small_blind);
        }
        if let Some(idx) = self.seat_index_of(bb_seat) {
            self.seats[idx].contribute(self.big_blind);
        }
        self.current_bet = self
            .seats
            .iter()
            .map(|s| s.bet_amount)
            .max()
            .unwrap_or(self.big_blind);
    }

    fn preflop_first_actor(&self) -> Option<usize> {
        if self.seats.len() == 2 {
            // Heads-up preflop: dealer (small blind) acts first.
            return Some(self.dealer_seat);
        }
        self.first_actionable_from(self.dealer_seat + 1)
    }

    fn postflop_first_actor(&self) -> Option<usize> {
        if self.seats.len() == 2 {
            let dealer = self.dealer_seat;
            let other = self
                .active_seats()
                .into_iter()
                .map(|s| s.seat)
                .find(|&s| s != dealer);
            return other.or(Some(dealer)).filter(|&s| self.can_act(s));
        }
        self.first_actionable_from(self.dealer_seat + 1)
    }

    fn can_act(&self, seat: usize) -> bool {
        self.seats
            .iter()
            .find(|s| s.seat == seat)
            .map(|s| s.is_active() && !s.is_all_in())
            .unwrap_or(false)
    }

    fn first_actionable_from(&self, from_seat: usize) -> Option<usize> {
        let mut candidates: Vec<usize> = self
            .seats
            .iter()
            .filter(|s| s.is_active() && !s.is_all_in())
            .map(|s| s.seat)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        candidates.sort_by_key(|&seat| {
            (seat + self.table_size - (from_seat % self.table_size)) % self.table_size
        });
        candidates.into_iter().next()
    }

    fn set_current_player(&mut self, seat: Option<usize>) {
        self.current_player = seat;
        self.turn_started_at = seat.map(|_| std::time::Instant::now());
        self.turn_token = self.turn_token.wrapping_add(1);
    }

    fn min_raise(&self) -> i64 {
        if self.current_bet == 0 {
            self.big_blind
        } else {
            self.current_bet * 2
        }
    }

    /// §4.2 `handleAction`.
    pub fn handle_action(&mut self, seat: usize, action: Action) -> Result<(), GameError> {
        if self.phase == Phase::Settled || self.phase == Phase::Showdown {
            return Err(GameError::NoActiveHand);
        }
        let idx = self.seat_index_of(seat).ok_or(GameError::SeatNotActive)?;
        if !self.seats[idx].is_active() {
            return Err(GameError::SeatNotActive);
        }
        if self.current_player != Some(seat) {
            return Err(GameError::NotYourTurn);
        }

        if let Action::Discard(card_index) = action {
            return self.handle_discard(idx, card_index);
        }

        if self.seats[idx].hole_cards.len() == 3 {
            return Err(GameError::MustDiscardFirst);
        }

        match action {
            Action::Fold => {
                self.seats[idx].status = PlayerStatus::Folded;
                self.seats[idx].player_acted = true;
            }
            Action::Check => {
                if self.current_bet != self.seats[idx].bet_amount {
                    return Err(GameError::CannotCheck);
                }
                self.seats[idx].player_acted = true;
            }
            Action::Call => {
                let target = self.current_bet - self.seats[idx].bet_amount;
                self.seats[idx].contribute(target.max(0));
                self.seats[idx].player_acted = true;
            }
            Action::AllIn => {
                let chips = self.seats[idx].chips;
                self.seats[idx].contribute(chips);
                self.seats[idx].player_acted = true;
                self.maybe_reopen_betting(idx);
            }
            Action::Raise(to_amount) => {
                self.apply_raise(idx, to_amount)?;
            }
            Action::Discard(_) => unreachable!("handled above"),
        }

        self.resolve_after_action();
        Ok(())
    }

    fn handle_discard(&mut self, idx: usize, card_index: usize) -> Result<(), GameError> {
        let seat = &mut self.seats[idx];
        if seat.has_discarded {
            return Err(GameError::AlreadyDiscarded);
        }
        if card_index >= seat.hole_cards.len() {
            return Err(GameError::InvalidDiscardIndex);
        }
        let discarded = seat.hole_cards.remove(card_index);
        seat.discarded_card = Some(discarded);
        seat.has_discarded = true;
        Ok(())
    }

    fn apply_raise(&mut self, idx: usize, to_amount: i64) -> Result<(), GameError> {
        let seat = &self.seats[idx];
        let max_possible = seat.bet_amount + seat.chips;
        let is_all_in_push = to_amount >= max_possible;
        let effective_to = to_amount.min(max_possible);

        if !is_all_in_push {
            if to_amount <= self.current_bet {
                return Err(GameError::RaiseTooSmall {
                    amount: to_amount,
                    min_raise: self.min_raise(),
                });
            }
            if to_amount < self.min_raise() {
                return Err(GameError::RaiseTooSmall {
                    amount: to_amount,
                    min_raise: self.min_raise(),
                });
            }
        }

        let delta = effective_to - seat.bet_amount;
        self.seats[idx].contribute(delta.max(0));
        self.seats[idx].player_acted = true;
        self.maybe_reopen_betting(idx);
        Ok(())
    }

    /// A raise (or a self-raising all-in) reopens the action: reset every
    /// other active, non-all-in seat's `player_acted` flag.
    fn maybe_reopen_betting(&mut self, raiser_idx: usize) {
        let new_level = self.seats[raiser_idx].bet_amount;
        if new_level > self.current_bet {
            self.current_bet = new_level;
            for (i, seat) in self.seats.iter_mut().enumerate() {
                if i != raiser_idx && seat.is_active() && !seat.is_all_in() {
                    seat.player_acted = false;
                }
            }
        }
    }

    fn is_round_closed(&self) -> bool {
        self.active_seats()
            .iter()
            .all(|s| s.is_all_in() || (s.player_acted && s.bet_amount == self.current_bet))
    }

    fn resolve_after_action(&mut self) {
        let active = self.active_seats();
        if active.len() <= 1 {
            self.finish_hand();
            return;
        }
        if self.is_round_closed() {
            let all_in_or_done = active.iter().all(|s| s.is_all_in());
            if all_in_or_done {
                self.deal_remaining_community_cards();
                self.finish_hand();
            } else {
                self.advance_betting_round();
            }
        } else {
            let next = self.next_actionable_seat();
            self.set_current_player(next);
        }
    }

    fn next_actionable_seat(&self) -> Option<usize> {
        let current = self.current_player.unwrap_or(self.dealer_seat);
        let mut candidates: Vec<usize> = self
            .active_seats()
            .into_iter()
            .filter(|s| !s.is_all_in() && !s.player_acted)
            .map(|s| s.seat)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        candidates.sort_by_key(|&seat| {
            (seat + self.table_size - ((current + 1) % self.table_size)) % self.table_size
        });
        candidates.into_iter().next()
    }

    /// §4.2 `advanceBettingRound()`.
    pub fn advance_betting_round(&mut self) {
        let collected: i64 = self.seats.iter().map(|s| s.bet_amount).sum();
        self.pot += collected;
        for seat in self.seats.iter_mut() {
            seat.bet_amount = 0;
            if !seat.is_all_in() {
                seat.player_acted = false;
            }
        }
        self.current_bet = 0;

        match self.phase {
            Phase::PreFlop => {
                self.deck.deal(); // burn
                for _ in 0..3 {
                    if let Some(c) = self.deck.deal() {
                        self.community_cards.push(c);
                    }
                }
                self.phase = Phase::Flop;
            }
            Phase::Flop => {
                self.deck.deal();
                if let Some(c) = self.deck.deal() {
                    self.community_cards.push(c);
                }
                self.phase = Phase::Turn;
            }
            Phase::Turn => {
                self.deck.deal();
                if let Some(c) = self.deck.deal() {
                    self.community_cards.push(c);
                }
                self.phase = Phase::River;
            }
            Phase::River => {
                self.finish_hand();
                return;
            }
            Phase::Showdown | Phase::Settled => return,
        }

        let active_non_all_in = self
            .active_seats()
            .iter()
            .filter(|s| !s.is_all_in())
            .count();
        if active_non_all_in < 2 {
            self.deal_remaining_community_cards();
            self.finish_hand();
            return;
        }

        let first_actor = self.postflop_first_actor();
        self.set_current_player(first_actor);
    }

    fn deal_remaining_community_cards(&mut self) {
        while self.community_cards.len() < 5 {
            let needs_burn = matches!(self.community_cards.len(), 0 | 3 | 4);
            if needs_burn {
                self.deck.deal();
            }
            let to_deal = if self.community_cards.is_empty() { 3 } else { 1 };
            for _ in 0..to_deal {
                if self.community_cards.len() >= 5 {
                    break;
                }
                match self.deck.deal() {
                    Some(c) => self.community_cards.push(c),
                    None => return,
                }
            }
        }
    }

    /// §4.2 `finishHand()`.
    pub fn finish_hand(&mut self) {
        if self.phase == Phase::Settled {
            return;
        }
        self.phase = Phase::Showdown;
        let collected: i64 = self.seats.iter().map(|s| s.bet_amount).sum();
        self.pot += collected;
        for seat in self.seats.iter_mut() {
            seat.bet_amount = 0;
        }

        let active_indices: Vec<usize> = self
            .seats
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_active())
            .map(|(i, _)| i)
            .collect();

        let winners = if active_indices.len() == 1 {
            vec![active_indices[0]]
        } else {
            self.deal_remaining_community_cards();
            let values: Vec<(usize, HandValue)> = active_indices
                .iter()
                .map(|&i| {
                    (
                        i,
                        evaluator::evaluate(&self.seats[i].hole_cards, &self.community_cards),
                    )
                })
                .collect();
            let best = values.iter().map(|(_, v)| v).max().cloned();
            values
                .into_iter()
                .filter(|(_, v)| Some(v) == best.as_ref())
                .map(|(i, _)| i)
                .collect()
        };

        let mut ordered_winners = winners.clone();
        ordered_winners.sort_by_key(|&i| self.seat_order_key(self.seats[i].seat));

        let pot = self.pot;
        let share = pot / ordered_winners.len() as i64;
        let remainder = pot % ordered_winners.len() as i64;

        let mut hand_winners = Vec::with_capacity(ordered_winners.len());
        for (rank, &idx) in ordered_winners.iter().enumerate() {
            let extra = if (rank as i64) < remainder { 1 } else { 0 };
            let amount = share + extra;
            self.seats[idx].chips += amount;
            let description = if active_indices.len() == 1 {
                "uncontested"
            } else {
                evaluator::evaluate(&self.seats[idx].hole_cards, &self.community_cards)
                    .description
            };
            hand_winners.push(HandWinner {
                seat: self.seats[idx].seat,
                username: self.seats[idx].username.clone(),
                amount,
                hand_description: description,
            });
        }

        self.last_completed_hand = Some(HandHistoryEntry {
            hand_id: self.hand_id,
            pot,
            community_cards: self.community_cards.clone(),
            winners: hand_winners,
        });

        self.pot = 0;
        self.phase = Phase::Settled;
        self.current_player = None;
        self.turn_started_at = None;
    }

    /// Folds a seat regardless of whose turn it is. Used when a player
    /// leaves the room mid-hand instead of acting normally.
    pub fn force_fold(&mut self, seat: usize) {
        if self.phase == Phase::Settled {
            return;
        }
        let Some(idx) = self.seat_index_of(seat) else {
            return;
        };
        if !self.seats[idx].is_active() {
            return;
        }
        self.seats[idx].status = PlayerStatus::Folded;
        self.seats[idx].player_acted = true;
        self.resolve_after_action();
    }

    pub fn take_completed_history(&mut self) -> Option<HandHistoryEntry> {
        self.last_completed_hand.take()
    }

    pub fn is_settled(&self) -> bool {
        self.phase == Phase::Settled
    }

    /// Applies the turn timer's timeout behavior (§4.2): random discard if
    /// still holding 3 cards, then auto-check if legal else auto-fold.
    pub fn apply_turn_timeout<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let Some(seat) = self.current_player else {
            return;
        };
        let Some(idx) = self.seat_index_of(seat) else {
            return;
        };
        if !self.seats[idx].has_discarded && self.seats[idx].hole_cards.len() == 3 {
            let random_index = rng.gen_range(0..self.seats[idx].hole_cards.len());
            let _ = self.handle_discard(idx, random_index);
        }
        let can_check = self.current_bet == self.seats[idx].bet_amount;
        let action = if can_check { Action::Check } else { Action::Fold };
        let _ = self.handle_action(seat, action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn seats(list: &[(usize, &str, i64)]) -> Vec<SeatInput> {
        list.iter()
            .map(|&(seat, name, chips)| SeatInput {
                seat,
                username: name.to_string(),
                chips,
                online: true,
            })
            .collect()
    }

    #[test]
    fn heads_up_preflop_scenario() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut game = Game::start_round(
            &mut rng,
            8,
            0,
            50, // 0.5 in minor units of 100
            100,
            30,
            seats(&[(0, "alice", 10_000), (1, "bob", 10_000)]),
        )
        .unwrap();

        assert_eq!(game.current_player, Some(0));
        assert_eq!(game.current_bet, 100);
        assert_eq!(game.seats.iter().map(|s| s.bet_amount).sum::<i64>(), 150);

        game.handle_action(0, Action::Discard(0)).unwrap();
        game.handle_action(0, Action::Call).unwrap();
        game.handle_action(1, Action::Discard(0)).unwrap();
        game.handle_action(1, Action::Check).unwrap();

        assert_eq!(game.community_cards.len(), 3);
        assert_eq!(game.pot, 200);
        assert_eq!(game.phase, Phase::Flop);
        assert_eq!(game.current_player, Some(1));
    }

    #[test]
    fn discard_enforced_before_wagering_action() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut game = Game::start_round(
            &mut rng,
            8,
            0,
            50,
            100,
            30,
            seats(&[(0, "p1", 10_000), (1, "p2", 10_000), (2, "p3", 10_000)]),
        )
        .unwrap();

        let utg = game.current_player.unwrap();
        let err = game.handle_action(utg, Action::Call).unwrap_err();
        assert_eq!(err, GameError::MustDiscardFirst);

        game.handle_action(utg, Action::Discard(1)).unwrap();
        game.handle_action(utg, Action::Call).unwrap();
    }

    #[test]
    fn raise_resets_acted_flags() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut game = Game::start_round(
            &mut rng,
            8,
            0,
            50,
            100,
            30,
            seats(&[(0, "p1", 10_000), (1, "p2", 10_000), (2, "p3", 10_000)]),
        )
        .unwrap();

        for seat in [0usize, 1, 2] {
            let s = game.seats.iter().find(|s| s.seat == seat).unwrap();
            assert!(!s.has_discarded);
        }

        let p1 = game.current_player.unwrap();
        game.handle_action(p1, Action::Discard(0)).unwrap();
        game.handle_action(p1, Action::Call).unwrap();

        let p2 = game.current_player.unwrap();
        game.handle_action(p2, Action::Discard(0)).unwrap();
        game.handle_action(p2, Action::Call).unwrap();

        let p3 = game.current_player.unwrap();
        game.handle_action(p3, Action::Discard(0)).unwrap();
        game.handle_action(p3, Action::Raise(300)).unwrap();

        assert_eq!(game.current_player, Some(0));
        assert!(!game.seats.iter().find(|s| s.seat == 0).unwrap().player_acted);
        assert!(!game.seats.iter().find(|s| s.seat == 1).unwrap().player_acted);
    }

    #[test]
    fn all_in_skips_to_showdown() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut game = Game::start_round(
            &mut rng,
            8,
            0,
            50,
            100,
            30,
            seats(&[(0, "short", 500), (1, "deep", 10_000)]),
        )
        .unwrap();

        let first = game.current_player.unwrap();
        game.handle_action(first, Action::Discard(0)).unwrap();
        game.handle_action(first, Action::AllIn).unwrap();
        let second = game.current_player.unwrap();
        game.handle_action(second, Action::Discard(0)).unwrap();
        game.handle_action(second, Action::Call).unwrap();

        assert!(game.is_settled());
        assert_eq!(game.community_cards.len(), 5);
        let total_chips: i64 = game.seats.iter().map(|s| s.chips).sum();
        assert_eq!(total_chips, 500 + 10_000);
    }

    #[test]
    fn split_pot_remainder_goes_to_dealer_plus_one_first() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut game = Game::start_round(
            &mut rng,
            8,
            0,
            50,
            100,
            30,
            seats(&[(0, "a", 10_000), (1, "b", 10_000)]),
        )
        .unwrap();
        game.dealer_seat = 4;
        game.pot = 7;
        game.phase = Phase::River;
        game.seats[0].seat = 2;
        game.seats[1].seat = 5;
        game.seats[0].status = PlayerStatus::Active;
        game.seats[1].status = PlayerStatus::Active;
        game.seats[0].hole_cards = vec![Card::new(crate::card::Rank::Ace, crate::card::Suit::Hearts)];
        game.seats[1].hole_cards = vec![Card::new(crate::card::Rank::Ace, crate::card::Suit::Clubs)];
        game.community_cards = vec![
            Card::new(crate::card::Rank::King, crate::card::Suit::Hearts),
            Card::new(crate::card::Rank::Queen, crate::card::Suit::Clubs),
            Card::new(crate::card::Rank::Jack, crate::card::Suit::Diamonds),
            Card::new(crate::card::Rank::Nine, crate::card::Suit::Spades),
            Card::new(crate::card::Rank::Two, crate::card::Suit::Hearts),
        ];

        game.finish_hand();
        let history = game.take_completed_history().unwrap();
        let seat5 = history.winners.iter().find(|w| w.seat == 5).unwrap();
        let seat2 = history.winners.iter().find(|w| w.seat == 2).unwrap();
        assert_eq!(seat5.amount, 4);
        assert_eq!(seat2.amount, 3);
    }
}
