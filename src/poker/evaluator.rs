//! 5/6/7-card hand evaluation.
//!
//! A hand is ranked into a single `u32` so that integer comparison is the
//! total order on hands: the top 4 bits hold the category (1 = high card up
//! to 9 = straight flush) and the bits below hold up to five 4-bit
//! tiebreakers in descending significance. Equal ranks chop.

use crate::poker::hands::{rank, suit, Card, Combo};

/// A totally ordered hand strength.
pub type HandRank = u32;

pub const RANK_HIGH_CARD: u32 = 1;
pub const RANK_ONE_PAIR: u32 = 2;
pub const RANK_TWO_PAIR: u32 = 3;
pub const RANK_THREE_OF_A_KIND: u32 = 4;
pub const RANK_STRAIGHT: u32 = 5;
pub const RANK_FLUSH: u32 = 6;
pub const RANK_FULL_HOUSE: u32 = 7;
pub const RANK_FOUR_OF_A_KIND: u32 = 8;
pub const RANK_STRAIGHT_FLUSH: u32 = 9;

/// Pack a category and up to five 4-bit tiebreakers into a `HandRank`.
#[inline]
pub const fn make_hand_rank(category: u32, tb1: u32, tb2: u32, tb3: u32, tb4: u32, tb5: u32) -> HandRank {
    (category << 28)
        | ((tb1 & 0xF) << 20)
        | ((tb2 & 0xF) << 16)
        | ((tb3 & 0xF) << 12)
        | ((tb4 & 0xF) << 8)
        | ((tb5 & 0xF) << 4)
}

/// Extract the category from a `HandRank`.
#[inline]
pub fn hand_category(rank: HandRank) -> u32 {
    rank >> 28
}

/// Rank five distinct cards.
///
/// Pure function; behavior on duplicate cards is the caller's problem.
pub fn evaluate_five(cards: &[Card; 5]) -> HandRank {
    let mut ranks = [0u32; 5];
    for (i, &c) in cards.iter().enumerate() {
        ranks[i] = rank(c) as u32;
    }
    ranks.sort_unstable_by(|a, b| b.cmp(a));

    let is_flush = {
        let s = suit(cards[0]);
        cards[1..].iter().all(|&c| suit(c) == s)
    };

    let mut rank_counts = [0u8; 13];
    for &r in &ranks {
        rank_counts[r as usize] += 1;
    }

    // Straights need five distinct ranks; the wheel is ranked 5-high.
    let num_unique = rank_counts.iter().filter(|&&c| c > 0).count();
    let mut straight_high = 0u32;
    let is_straight = num_unique == 5
        && if ranks[0] - ranks[4] == 4 {
            straight_high = ranks[0];
            true
        } else if ranks == [12, 3, 2, 1, 0] {
            straight_high = 3;
            true
        } else {
            false
        };

    if is_flush && is_straight {
        return make_hand_rank(RANK_STRAIGHT_FLUSH, straight_high, 0, 0, 0, 0);
    }

    let mut counts: Vec<u8> = rank_counts.iter().copied().filter(|&c| c > 0).collect();
    counts.sort_unstable_by(|a, b| b.cmp(a));

    if counts[0] == 4 {
        let (mut quad, mut kicker) = (0u32, 0u32);
        for r in (0..13usize).rev() {
            match rank_counts[r] {
                4 => quad = r as u32,
                1 => kicker = r as u32,
                _ => {}
            }
        }
        return make_hand_rank(RANK_FOUR_OF_A_KIND, quad, kicker, 0, 0, 0);
    }

    if counts[0] == 3 && counts[1] == 2 {
        let (mut trips, mut pair) = (0u32, 0u32);
        for r in (0..13usize).rev() {
            match rank_counts[r] {
                3 => trips = r as u32,
                2 => pair = r as u32,
                _ => {}
            }
        }
        return make_hand_rank(RANK_FULL_HOUSE, trips, pair, 0, 0, 0);
    }

    if is_flush {
        return make_hand_rank(RANK_FLUSH, ranks[0], ranks[1], ranks[2], ranks[3], ranks[4]);
    }

    if is_straight {
        return make_hand_rank(RANK_STRAIGHT, straight_high, 0, 0, 0, 0);
    }

    if counts[0] == 3 {
        let mut trips = 0u32;
        let mut kickers = Vec::with_capacity(2);
        for r in (0..13usize).rev() {
            match rank_counts[r] {
                3 => trips = r as u32,
                1 => kickers.push(r as u32),
                _ => {}
            }
        }
        return make_hand_rank(RANK_THREE_OF_A_KIND, trips, kickers[0], kickers[1], 0, 0);
    }

    if counts[0] == 2 && counts[1] == 2 {
        let mut pairs = Vec::with_capacity(2);
        let mut kicker = 0u32;
        for r in (0..13usize).rev() {
            match rank_counts[r] {
                2 => pairs.push(r as u32),
                1 => kicker = r as u32,
                _ => {}
            }
        }
        return make_hand_rank(RANK_TWO_PAIR, pairs[0], pairs[1], kicker, 0, 0);
    }

    if counts[0] == 2 {
        let mut pair = 0u32;
        let mut kickers = Vec::with_capacity(3);
        for r in (0..13usize).rev() {
            match rank_counts[r] {
                2 => pair = r as u32,
                1 => kickers.push(r as u32),
                _ => {}
            }
        }
        return make_hand_rank(RANK_ONE_PAIR, pair, kickers[0], kickers[1], kickers[2], 0);
    }

    make_hand_rank(RANK_HIGH_CARD, ranks[0], ranks[1], ranks[2], ranks[3], ranks[4])
}

/// Rank the best 5-card hand out of 6 cards (C(6,5) = 6 subsets).
pub fn evaluate_six(cards: &[Card; 6]) -> HandRank {
    let mut best = 0;
    for skip in 0..6 {
        let mut five = [0u8; 5];
        let mut idx = 0;
        for (i, &c) in cards.iter().enumerate() {
            if i != skip {
                five[idx] = c;
                idx += 1;
            }
        }
        best = best.max(evaluate_five(&five));
    }
    best
}

/// Rank the best 5-card hand out of 7 cards (C(7,5) = 21 subsets).
pub fn evaluate_seven(cards: &[Card; 7]) -> HandRank {
    let mut best = 0;
    for i in 0..7 {
        for j in (i + 1)..7 {
            let mut five = [0u8; 5];
            let mut idx = 0;
            for (k, &c) in cards.iter().enumerate() {
                if k != i && k != j {
                    five[idx] = c;
                    idx += 1;
                }
            }
            best = best.max(evaluate_five(&five));
        }
    }
    best
}

/// Rank hole cards against a partial or full board.
///
/// Returns 0 when fewer than 5 cards are available.
pub fn evaluate_hand(hole: Combo, board: &[Card]) -> HandRank {
    let total = 2 + board.len();
    match total {
        0..=4 => 0,
        5 => {
            let cards = [hole.c0, hole.c1, board[0], board[1], board[2]];
            evaluate_five(&cards)
        }
        6 => {
            let cards = [hole.c0, hole.c1, board[0], board[1], board[2], board[3]];
            evaluate_six(&cards)
        }
        _ => {
            let cards = [
                hole.c0, hole.c1, board[0], board[1], board[2], board[3], board[4],
            ];
            evaluate_seven(&cards)
        }
    }
}
