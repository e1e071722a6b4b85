//! Plain-old-data node layout for the disk-backed tree arena.
//!
//! A `Node` must be trivially copyable and fixed size so that the arena can
//! live in a raw memory-mapped file. All variable-length data (actions,
//! children, chance cards) lives in the pool's side buffers, referenced by
//! `(start, count)` slices.

use serde::Serialize;

use crate::poker::hands::{Card, CARD_NONE};
use crate::tree::config::Street;

/// Action kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum ActionKind {
    Fold = 0,
    Check = 1,
    Call = 2,
    Bet = 3,
    Raise = 4,
    AllIn = 5,
}

/// A betting action. `amount` is the total chips the actor has invested
/// this street for call/bet/raise/all-in; zero for fold/check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[repr(C)]
pub struct Action {
    pub kind: ActionKind,
    pub amount: f32,
}

impl Action {
    pub fn new(kind: ActionKind, amount: f32) -> Self {
        Action { kind, amount }
    }

    /// Format for display ("bet 50", "call (25)").
    pub fn display(&self) -> String {
        match self.kind {
            ActionKind::Fold => "fold".to_string(),
            ActionKind::Check => "check".to_string(),
            ActionKind::Call => format!("call ({})", self.amount as i64),
            ActionKind::Bet => format!("bet {}", self.amount as i64),
            ActionKind::Raise => format!("raise {}", self.amount as i64),
            ActionKind::AllIn => format!("allin ({})", self.amount as i64),
        }
    }
}

/// Node type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum NodeKind {
    Player = 0,
    Chance = 1,
    Terminal = 2,
}

/// Chance player marker for `Node::player`.
pub const PLAYER_CHANCE: i8 = -1;

/// A fixed-size tree node.
///
/// Player nodes use `action_start`/`action_count` (actions buffer) and
/// `child_start` (child-id buffer, one entry per action). Chance nodes use
/// `chance_card_start`/`chance_count` (chance-card buffer) and
/// `chance_child_start` (child-id buffer, one entry per card).
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Node {
    pub node_id: i32,
    pub pot: f32,
    pub stacks: [f32; 2],
    pub to_call: f32,

    pub action_start: u32,
    pub child_start: u32,
    pub chance_card_start: u32,
    pub chance_child_start: u32,
    pub chance_count: u16,
    pub action_count: u8,

    pub kind: NodeKind,
    /// 0 = OOP, 1 = IP, -1 = chance.
    pub player: i8,
    pub street: Street,
    pub board_len: u8,
    pub board: [Card; 5],
}

impl Node {
    /// Zeroed placeholder occupying arena slot 0 until the real root is
    /// copied over it.
    pub fn placeholder() -> Self {
        Node {
            node_id: 0,
            pot: 0.0,
            stacks: [0.0; 2],
            to_call: 0.0,
            action_start: 0,
            child_start: 0,
            chance_card_start: 0,
            chance_child_start: 0,
            chance_count: 0,
            action_count: 0,
            kind: NodeKind::Terminal,
            player: PLAYER_CHANCE,
            street: Street::Flop,
            board_len: 0,
            board: [CARD_NONE; 5],
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.kind == NodeKind::Terminal
    }

    #[inline]
    pub fn is_chance(&self) -> bool {
        self.kind == NodeKind::Chance
    }

    #[inline]
    pub fn is_player(&self) -> bool {
        self.kind == NodeKind::Player
    }

    /// Board cards actually dealt at this node.
    #[inline]
    pub fn board_cards(&self) -> &[Card] {
        &self.board[..self.board_len as usize]
    }
}
