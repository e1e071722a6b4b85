//! Monte Carlo equity estimation for incomplete boards.

use rand::prelude::*;
use rayon::prelude::*;

use crate::poker::evaluator::evaluate_hand;
use crate::poker::hands::{cards_to_mask, mask_has_card, Card, Combo, RangeEntry, DECK_SIZE};

/// All cards not present in the dead mask.
fn make_deck(dead: u64) -> Vec<Card> {
    (0..DECK_SIZE as Card)
        .filter(|&c| !mask_has_card(dead, c))
        .collect()
}

/// Estimate hero's equity against one villain hand by sampling run-outs.
///
/// With a full board the comparison is exact. Conflicting inputs (a card
/// appearing twice across hands and board) return 0.5 rather than erroring;
/// the CFR sampler treats that as a degenerate matchup.
pub fn monte_carlo_equity(
    hero: Combo,
    villain: Combo,
    board: &[Card],
    num_simulations: u32,
    rng: &mut impl Rng,
) -> f32 {
    let dead = hero.to_mask() | villain.to_mask() | cards_to_mask(board);
    if dead.count_ones() as usize != 4 + board.len() {
        return 0.5;
    }

    let cards_needed = 5usize.saturating_sub(board.len());
    if cards_needed == 0 {
        let hero_rank = evaluate_hand(hero, board);
        let villain_rank = evaluate_hand(villain, board);
        return if hero_rank > villain_rank {
            1.0
        } else if hero_rank < villain_rank {
            0.0
        } else {
            0.5
        };
    }

    let mut deck = make_deck(dead);
    let deck_size = deck.len();
    let mut full_board = [0u8; 5];
    full_board[..board.len()].copy_from_slice(board);

    let mut wins = 0u32;
    let mut ties = 0u32;

    for _ in 0..num_simulations {
        // Partial Fisher-Yates: only the first `cards_needed` draws matter.
        for i in 0..cards_needed {
            let j = rng.gen_range(i..deck_size);
            deck.swap(i, j);
            full_board[board.len() + i] = deck[i];
        }

        let hero_rank = evaluate_hand(hero, &full_board);
        let villain_rank = evaluate_hand(villain, &full_board);
        if hero_rank > villain_rank {
            wins += 1;
        } else if hero_rank == villain_rank {
            ties += 1;
        }
    }

    (wins as f32 + ties as f32 * 0.5) / num_simulations as f32
}

/// Weighted equity of one hero hand against a whole range.
///
/// Villain combos that conflict with the hero or the board are skipped. The
/// per-villain simulation budget splits the total evenly, matching how the
/// range view averages matchups.
pub fn equity_vs_range(
    hero: Combo,
    villains: &[RangeEntry],
    board: &[Card],
    num_simulations: u32,
    rng: &mut impl Rng,
) -> f32 {
    let board_mask = cards_to_mask(board);
    let per_villain = (num_simulations / villains.len().max(1) as u32).max(1);

    let mut total_equity = 0.0f32;
    let mut total_weight = 0.0f32;
    for villain in villains {
        if villain.combo.conflicts_with(&hero) || villain.combo.conflicts_with_mask(board_mask) {
            continue;
        }
        let eq = monte_carlo_equity(hero, villain.combo, board, per_villain, rng);
        total_equity += eq * villain.weight;
        total_weight += villain.weight;
    }

    if total_weight > 0.0 {
        total_equity / total_weight
    } else {
        0.5
    }
}

/// Range-vs-range equities for a batch of hero hands, one worker per hand.
pub fn batch_equity(
    heroes: &[Combo],
    villains: &[RangeEntry],
    board: &[Card],
    num_simulations: u32,
) -> Vec<f32> {
    heroes
        .par_iter()
        .map(|&hero| {
            let mut rng = SmallRng::from_entropy();
            equity_vs_range(hero, villains, board, num_simulations, &mut rng)
        })
        .collect()
}
