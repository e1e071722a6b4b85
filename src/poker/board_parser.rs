//! Board string parsing (e.g., "Ah7d2c" -> cards).

use crate::error::{SolverError, SolverResult};
use crate::poker::hands::{card_to_string, make_card, Card};

/// Parse a board string like "KhQsJs" or "Kh Qs Js".
///
/// Each card is 2 characters: rank + suit. Ranks: 2-9, T, J, Q, K, A;
/// suits: c, d, h, s. Whitespace is ignored. The board must hold 3-5
/// distinct cards.
pub fn parse_board(s: &str) -> SolverResult<Vec<Card>> {
    let cards = parse_cards(s)?;
    if !(3..=5).contains(&cards.len()) {
        return Err(SolverError::InvalidBoardSize(cards.len()));
    }
    Ok(cards)
}

/// Parse a string of cards into a vector.
pub fn parse_cards(s: &str) -> SolverResult<Vec<Card>> {
    let s = s.replace(' ', "");
    if s.len() % 2 != 0 {
        return Err(SolverError::InvalidCardString(s));
    }

    let chars: Vec<char> = s.chars().collect();
    let mut cards = Vec::with_capacity(chars.len() / 2);
    for chunk in chars.chunks(2) {
        cards.push(parse_card(chunk[0], chunk[1])?);
    }

    for i in 0..cards.len() {
        for j in (i + 1)..cards.len() {
            if cards[i] == cards[j] {
                return Err(SolverError::DuplicateCard(card_to_string(cards[i])));
            }
        }
    }

    Ok(cards)
}

/// Parse a single card from rank and suit characters.
pub fn parse_card(rank_char: char, suit_char: char) -> SolverResult<Card> {
    Ok(make_card(parse_rank_char(rank_char)?, parse_suit_char(suit_char)?))
}

/// Parse a rank character (2-9, T, J, Q, K, A) to rank index (0-12).
pub fn parse_rank_char(c: char) -> SolverResult<u8> {
    match c {
        '2'..='9' => Ok(c as u8 - b'2'),
        'T' | 't' => Ok(8),
        'J' | 'j' => Ok(9),
        'Q' | 'q' => Ok(10),
        'K' | 'k' => Ok(11),
        'A' | 'a' => Ok(12),
        _ => Err(SolverError::InvalidRank(c)),
    }
}

/// Parse a suit character (c, d, h, s) to suit index (0-3).
pub fn parse_suit_char(c: char) -> SolverResult<u8> {
    match c {
        'c' | 'C' => Ok(0),
        'd' | 'D' => Ok(1),
        'h' | 'H' => Ok(2),
        's' | 'S' => Ok(3),
        _ => Err(SolverError::InvalidSuit(c)),
    }
}
