//! Card primitives, hand evaluation, equity estimation, and range parsing.

pub mod board_parser;
pub mod equity;
pub mod evaluator;
pub mod hands;
pub mod range_parser;

pub use board_parser::{parse_board, parse_cards};
pub use equity::{batch_equity, equity_vs_range, monte_carlo_equity};
pub use evaluator::{evaluate_five, evaluate_hand, evaluate_seven, evaluate_six, HandRank};
pub use hands::{card_to_string, make_card, Card, CardMask, Combo, RangeEntry, CARD_NONE};
pub use range_parser::parse_range;
