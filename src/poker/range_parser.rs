//! Range string parsing (PIO format).
//!
//! Supports formats like:
//! - "AA,KK,QQ" - All combos of these hands at weight 1.0
//! - "AKs,AQs" - Suited hands only
//! - "AKo,AQo" - Offsuit hands only
//! - "AA:0.5,KK:0.75" - Weighted hands
//! - "AsKs,AhKh" - Specific combos

use crate::error::{SolverError, SolverResult};
use crate::poker::board_parser::{parse_rank_char, parse_suit_char};
use crate::poker::hands::{make_card, Combo, RangeEntry};

/// Parse a range string in PIO format into concrete weighted combos.
///
/// Hand groups are separated by commas, with an optional `:weight` suffix
/// (e.g. "QQ:0.5"). Hand types:
/// - "AA" - pair (6 combos)
/// - "AKs" - suited (4 combos)
/// - "AKo" - offsuit (12 combos)
/// - "AK" - both suited and offsuit (16 combos)
/// - "AsKs" - a specific combo
///
/// A later mention of a combo overrides an earlier one.
pub fn parse_range(s: &str) -> SolverResult<Vec<RangeEntry>> {
    let mut entries: Vec<RangeEntry> = Vec::new();

    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let (hand_str, weight) = if let Some(idx) = part.find(':') {
            let weight_str = &part[idx + 1..];
            let weight: f32 = weight_str
                .parse()
                .map_err(|_| SolverError::InvalidHandNotation(part.to_string()))?;
            if !(0.0..=1.0).contains(&weight) {
                return Err(SolverError::InvalidWeight(weight));
            }
            (&part[..idx], weight)
        } else {
            (part, 1.0)
        };

        for combo in expand_hand(hand_str)? {
            push_entry(&mut entries, combo, weight);
        }
    }

    Ok(entries)
}

/// Insert or overwrite one concrete combo.
///
/// The stored shorthand is always derived from the combo itself, so "AK"
/// splits into "AKs" and "AKo" groups and input casing never leaks through.
fn push_entry(entries: &mut Vec<RangeEntry>, combo: Combo, weight: f32) {
    let hand = combo.shorthand();
    if let Some(existing) = entries.iter_mut().find(|e| e.combo == combo) {
        existing.weight = weight;
        existing.hand = hand;
    } else {
        entries.push(RangeEntry { combo, weight, hand });
    }
}

/// Expand a hand-class string into its concrete combos.
fn expand_hand(hand_str: &str) -> SolverResult<Vec<Combo>> {
    let chars: Vec<char> = hand_str.chars().collect();

    match chars.len() {
        // Pair or two-rank class: "AA", "AK"
        2 => {
            let rank1 = parse_rank_char(chars[0])?;
            let rank2 = parse_rank_char(chars[1])?;
            if rank1 == rank2 {
                Ok(pair_combos(rank1))
            } else {
                let mut combos = suited_combos(rank1, rank2);
                combos.extend(offsuit_combos(rank1, rank2));
                Ok(combos)
            }
        }
        // Suited or offsuit: "AKs" or "AKo"
        3 => {
            let rank1 = parse_rank_char(chars[0])?;
            let rank2 = parse_rank_char(chars[1])?;
            if rank1 == rank2 {
                return Err(SolverError::InvalidHandNotation(hand_str.to_string()));
            }
            match chars[2] {
                's' | 'S' => Ok(suited_combos(rank1, rank2)),
                'o' | 'O' => Ok(offsuit_combos(rank1, rank2)),
                _ => Err(SolverError::InvalidHandNotation(hand_str.to_string())),
            }
        }
        // Specific combo: "AsKs"
        4 => {
            let c0 = make_card(parse_rank_char(chars[0])?, parse_suit_char(chars[1])?);
            let c1 = make_card(parse_rank_char(chars[2])?, parse_suit_char(chars[3])?);
            if c0 == c1 {
                return Err(SolverError::InvalidHandNotation(hand_str.to_string()));
            }
            Ok(vec![Combo::new(c0, c1)])
        }
        _ => Err(SolverError::InvalidHandNotation(hand_str.to_string())),
    }
}

/// All 6 pair combos of a rank.
fn pair_combos(rank: u8) -> Vec<Combo> {
    let mut combos = Vec::with_capacity(6);
    for s1 in 0..4u8 {
        for s2 in (s1 + 1)..4u8 {
            combos.push(Combo::new(make_card(rank, s1), make_card(rank, s2)));
        }
    }
    combos
}

/// All 4 suited combos of two ranks.
fn suited_combos(rank1: u8, rank2: u8) -> Vec<Combo> {
    (0..4u8)
        .map(|s| Combo::new(make_card(rank1, s), make_card(rank2, s)))
        .collect()
}

/// All 12 offsuit combos of two ranks.
fn offsuit_combos(rank1: u8, rank2: u8) -> Vec<Combo> {
    let mut combos = Vec::with_capacity(12);
    for s1 in 0..4u8 {
        for s2 in 0..4u8 {
            if s1 != s2 {
                combos.push(Combo::new(make_card(rank1, s1), make_card(rank2, s2)));
            }
        }
    }
    combos
}
