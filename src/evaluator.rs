//! 7 (or 8, pre-discard) card hand evaluation.
//!
//! Structurally grounded on the casino module's `evaluate_best_hand`/
//! `evaluate_5_card_fast` combination search, generalized to a variable-size
//! subset so it also copes with the Pineapple edge case of a still-undiscarded
//! 3-card hand reaching showdown, and extended with wheel (A-2-3-4-5) support
//! that the original evaluator never implemented.

use crate::card::{Card, Rank};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum HandCategory {
    HighCard = 0,
    OnePair = 1,
    TwoPair = 2,
    Trips = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    Quads = 7,
    StraightFlush = 8,
}

impl HandCategory {
    pub fn description(self) -> &'static str {
        match self {
            HandCategory::HighCard => "High Card",
            HandCategory::OnePair => "One Pair",
            HandCategory::TwoPair => "Two Pair",
            HandCategory::Trips => "Three of a Kind",
            HandCategory::Straight => "Straight",
            HandCategory::Flush => "Flush",
            HandCategory::FullHouse => "Full House",
            HandCategory::Quads => "Four of a Kind",
            HandCategory::StraightFlush => "Straight Flush",
        }
    }
}

/// (category, primary_value, kickers, description) — the evaluator's ordered hand value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandValue {
    pub category: HandCategory,
    pub primary_value: u8,
    pub kickers: Vec<u8>,
    pub description: &'static str,
}

impl HandValue {
    fn new(category: HandCategory, primary_value: u8, kickers: Vec<u8>) -> Self {
        Self {
            category,
            primary_value,
            kickers,
            description: category.description(),
        }
    }

    /// The primary_value reported for a royal flush is simply Ace (14); the
    /// category stays StraightFlush, matching the closed category set in §4.1.
    pub fn is_royal_flush(&self) -> bool {
        self.category == HandCategory::StraightFlush && self.primary_value == Rank::Ace.value()
    }
}

impl PartialOrd for HandValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HandValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.category
            .cmp(&other.category)
            .then_with(|| self.primary_value.cmp(&other.primary_value))
            .then_with(|| self.kickers.cmp(&other.kickers))
    }
}

/// Evaluate the best hand from 2..8 combined hole + community cards.
///
/// Out-of-range inputs (the failure mode in §4.1) return the weakest possible
/// high card instead of propagating an error to the Game.
pub fn evaluate(hole: &[Card], community: &[Card]) -> HandValue {
    let mut all: Vec<Card> = Vec::with_capacity(hole.len() + community.len());
    all.extend_from_slice(hole);
    all.extend_from_slice(community);

    if all.is_empty() || all.len() > 8 {
        return HandValue::new(HandCategory::HighCard, 0, vec![0, 0, 0, 0, 0]);
    }

    let take = all.len().min(5);
    let mut best: Option<HandValue> = None;
    for combo in combinations(&all, take) {
        let value = evaluate_subset(&combo);
        best = Some(match best {
            None => value,
            Some(current) if value > current => value,
            Some(current) => current,
        });
    }
    best.expect("at least one combination exists for a non-empty hand")
}

/// Compare two hands; mirrors the original `compare_hands` contract
/// (>0 if `a` beats `b`, <0 if `b` beats `a`, 0 on a tie / split).
pub fn compare(a: &HandValue, b: &HandValue) -> Ordering {
    a.cmp(b)
}

fn combinations(cards: &[Card], k: usize) -> Vec<Vec<Card>> {
    if k == 0 {
        return vec![vec![]];
    }
    if k > cards.len() {
        return vec![];
    }
    if k == cards.len() {
        return vec![cards.to_vec()];
    }
    let mut result = Vec::new();
    let mut indices: Vec<usize> = (0..k).collect();
    loop {
        result.push(indices.iter().map(|&i| cards[i]).collect());
        let mut i = k;
        loop {
            if i == 0 {
                return result;
            }
            i -= 1;
            if indices[i] != i + cards.len() - k {
                break;
            }
            if i == 0 {
                return result;
            }
        }
        indices[i] += 1;
        for j in (i + 1)..k {
            indices[j] = indices[j - 1] + 1;
        }
    }
}

/// Evaluate a subset of 1..=5 cards. Flush/straight are only possible at
/// exactly 5 cards; rank-count categories work at any size.
fn evaluate_subset(cards: &[Card]) -> HandValue {
    let mut values: Vec<u8> = cards.iter().map(|c| c.rank.value()).collect();
    values.sort_unstable_by(|a, b| b.cmp(a));

    let is_flush = cards.len() == 5 && cards.iter().all(|c| c.suit == cards[0].suit);

    let (is_straight, straight_high) = straight_high(&values);

    if is_flush && is_straight {
        return HandValue::new(HandCategory::StraightFlush, straight_high, vec![]);
    }

    let mut counts = [0u8; 15];
    for &v in &values {
        counts[v as usize] += 1;
    }

    let mut quads = None;
    let mut trips: Vec<u8> = Vec::new();
    let mut pairs: Vec<u8> = Vec::new();
    let mut singles: Vec<u8> = Vec::new();
    for v in (2..=14u8).rev() {
        match counts[v as usize] {
            4 => quads = Some(v),
            3 => trips.push(v),
            2 => pairs.push(v),
            1 => singles.push(v),
            _ => {}
        }
    }

    if let Some(q) = quads {
        let kicker = values.iter().copied().find(|&v| v != q).unwrap_or(0);
        return HandValue::new(HandCategory::Quads, q, vec![kicker, 0, 0, 0]);
    }

    if !trips.is_empty() && (trips.len() > 1 || !pairs.is_empty()) {
        let trip_rank = trips[0];
        let pair_rank = if trips.len() > 1 { trips[1] } else { pairs[0] };
        return HandValue::new(HandCategory::FullHouse, trip_rank, vec![pair_rank, 0, 0, 0]);
    }

    if is_flush {
        return HandValue::new(HandCategory::Flush, values[0], values[1..].to_vec());
    }

    if is_straight {
        return HandValue::new(HandCategory::Straight, straight_high, vec![]);
    }

    if let Some(&trip_rank) = trips.first() {
        let kickers: Vec<u8> = singles.iter().copied().take(2).collect();
        return HandValue::new(HandCategory::Trips, trip_rank, pad(kickers, 2));
    }

    if pairs.len() >= 2 {
        let kicker = singles.first().copied().unwrap_or(0);
        return HandValue::new(
            HandCategory::TwoPair,
            pairs[0],
            vec![pairs[1], kicker, 0, 0],
        );
    }

    if let Some(&pair_rank) = pairs.first() {
        let kickers: Vec<u8> = singles.iter().copied().take(3).collect();
        return HandValue::new(HandCategory::OnePair, pair_rank, pad(kickers, 3));
    }

    let kickers: Vec<u8> = values.iter().copied().skip(1).take(4).collect();
    HandValue::new(HandCategory::HighCard, values[0], pad(kickers, 4))
}

fn pad(mut v: Vec<u8>, len: usize) -> Vec<u8> {
    while v.len() < len {
        v.push(0);
    }
    v
}

/// Detects a 5-consecutive-value run (wheel A-2-3-4-5 permitted, high=5).
fn straight_high(sorted_desc_values: &[u8]) -> (bool, u8) {
    if sorted_desc_values.len() != 5 {
        return (false, 0);
    }
    let mut unique: Vec<u8> = sorted_desc_values.to_vec();
    unique.dedup();
    if unique.len() != 5 {
        return (false, 0);
    }
    if unique[0] - unique[4] == 4 {
        return (true, unique[0]);
    }
    // wheel: A,5,4,3,2 sorted descending
    if unique == [14, 5, 4, 3, 2] {
        return (true, 5);
    }
    (false, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Suit;

    fn c(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    #[test]
    fn high_card_on_missing_input() {
        let value = evaluate(&[], &[]);
        assert_eq!(value.category, HandCategory::HighCard);
        assert_eq!(value.primary_value, 0);
    }

    #[test]
    fn wheel_straight_is_five_high() {
        let hole = [c(Rank::Ace, Suit::Hearts), c(Rank::Two, Suit::Diamonds)];
        let community = [
            c(Rank::Three, Suit::Clubs),
            c(Rank::Four, Suit::Spades),
            c(Rank::Five, Suit::Hearts),
            c(Rank::King, Suit::Diamonds),
            c(Rank::Queen, Suit::Clubs),
        ];
        let value = evaluate(&hole, &community);
        assert_eq!(value.category, HandCategory::Straight);
        assert_eq!(value.primary_value, 5);
    }

    #[test]
    fn wheel_straight_flush() {
        let hole = [c(Rank::Ace, Suit::Hearts), c(Rank::Two, Suit::Hearts)];
        let community = [
            c(Rank::Three, Suit::Hearts),
            c(Rank::Four, Suit::Hearts),
            c(Rank::Five, Suit::Hearts),
            c(Rank::King, Suit::Diamonds),
            c(Rank::Queen, Suit::Clubs),
        ];
        let value = evaluate(&hole, &community);
        assert_eq!(value.category, HandCategory::StraightFlush);
        assert_eq!(value.primary_value, 5);
    }

    #[test]
    fn royal_flush_reported_as_straight_flush_ace_high() {
        let hole = [c(Rank::Ace, Suit::Spades), c(Rank::King, Suit::Spades)];
        let community = [
            c(Rank::Queen, Suit::Spades),
            c(Rank::Jack, Suit::Spades),
            c(Rank::Ten, Suit::Spades),
            c(Rank::Two, Suit::Diamonds),
            c(Rank::Three, Suit::Clubs),
        ];
        let value = evaluate(&hole, &community);
        assert_eq!(value.category, HandCategory::StraightFlush);
        assert!(value.is_royal_flush());
    }

    #[test]
    fn four_of_a_kind_beats_full_house() {
        let quads_hole = [c(Rank::Ace, Suit::Hearts), c(Rank::Ace, Suit::Diamonds)];
        let quads_community = [
            c(Rank::Ace, Suit::Clubs),
            c(Rank::Ace, Suit::Spades),
            c(Rank::King, Suit::Hearts),
            c(Rank::Two, Suit::Diamonds),
            c(Rank::Three, Suit::Clubs),
        ];
        let full_house_hole = [c(Rank::King, Suit::Diamonds), c(Rank::King, Suit::Clubs)];
        let full_house_community = [
            c(Rank::King, Suit::Spades),
            c(Rank::Queen, Suit::Hearts),
            c(Rank::Queen, Suit::Diamonds),
            c(Rank::Two, Suit::Clubs),
            c(Rank::Three, Suit::Hearts),
        ];
        let quads = evaluate(&quads_hole, &quads_community);
        let full_house = evaluate(&full_house_hole, &full_house_community);
        assert_eq!(compare(&quads, &full_house), Ordering::Greater);
    }

    #[test]
    fn permutation_invariance() {
        let hole = [c(Rank::Ace, Suit::Hearts), c(Rank::King, Suit::Hearts)];
        let mut community = vec![
            c(Rank::Queen, Suit::Hearts),
            c(Rank::Jack, Suit::Hearts),
            c(Rank::Ten, Suit::Hearts),
            c(Rank::Two, Suit::Diamonds),
            c(Rank::Three, Suit::Clubs),
        ];
        let baseline = evaluate(&hole, &community);
        community.reverse();
        let reversed = evaluate(&hole, &community);
        assert_eq!(baseline, reversed);
    }

    #[test]
    fn compare_is_antisymmetric() {
        let a = evaluate(
            &[c(Rank::Ace, Suit::Hearts), c(Rank::Ace, Suit::Diamonds)],
            &[
                c(Rank::Two, Suit::Clubs),
                c(Rank::Three, Suit::Spades),
                c(Rank::Four, Suit::Hearts),
                c(Rank::Five, Suit::Diamonds),
                c(Rank::Nine, Suit::Clubs),
            ],
        );
        let b = evaluate(
            &[c(Rank::King, Suit::Hearts), c(Rank::King, Suit::Diamonds)],
            &[
                c(Rank::Two, Suit::Clubs),
                c(Rank::Three, Suit::Spades),
                c(Rank::Four, Suit::Hearts),
                c(Rank::Five, Suit::Diamonds),
                c(Rank::Nine, Suit::Clubs),
            ],
        );
        assert_eq!(compare(&a, &b), compare(&b, &a).reverse());
    }

    #[test]
    fn eight_card_subset_search_handles_undiscarded_hand() {
        // A player forced to showdown still holding all 3 hole cards.
        let hole = [
            c(Rank::Two, Suit::Clubs),
            c(Rank::Seven, Suit::Diamonds),
            c(Rank::Ace, Suit::Hearts),
        ];
        let community = [
            c(Rank::Ace, Suit::Clubs),
            c(Rank::King, Suit::Spades),
            c(Rank::King, Suit::Hearts),
            c(Rank::Nine, Suit::Diamonds),
            c(Rank::Four, Suit::Clubs),
        ];
        let value = evaluate(&hole, &community);
        assert_eq!(value.category, HandCategory::TwoPair);
        assert_eq!(value.primary_value, 14);
    }
}
