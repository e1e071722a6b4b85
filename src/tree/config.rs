//! Betting configuration for post-flop game trees.

use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};

/// Street (betting round). Post-flop only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Street {
    #[default]
    Flop = 0,
    Turn = 1,
    River = 2,
}

impl Street {
    /// Get the next street, if any.
    pub fn next(&self) -> Option<Street> {
        match self {
            Street::Flop => Some(Street::Turn),
            Street::Turn => Some(Street::River),
            Street::River => None,
        }
    }

    /// Starting street implied by a board size.
    pub fn from_board_len(len: usize) -> SolverResult<Street> {
        match len {
            3 => Ok(Street::Flop),
            4 => Ok(Street::Turn),
            5 => Ok(Street::River),
            _ => Err(SolverError::InvalidBoardSize(len)),
        }
    }

    /// Get short name for display.
    pub fn short_name(&self) -> &'static str {
        match self {
            Street::Flop => "Flop",
            Street::Turn => "Turn",
            Street::River => "River",
        }
    }
}

/// Betting structure driving tree enumeration.
///
/// Bet sizes are pot fractions used when opening the betting on a street;
/// raise sizes are fractions of `pot + to_call` used when raising over a
/// bet. An all-in option is always generated independently of these lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BettingConfig {
    pub initial_pot: f32,
    pub oop_stack: f32,
    pub ip_stack: f32,

    pub flop_bet_sizes: Vec<f32>,
    pub turn_bet_sizes: Vec<f32>,
    pub river_bet_sizes: Vec<f32>,

    pub flop_raise_sizes: Vec<f32>,
    pub turn_raise_sizes: Vec<f32>,
    pub river_raise_sizes: Vec<f32>,

    /// Maximum bets/raises per street.
    pub max_raises: u8,
}

impl Default for BettingConfig {
    fn default() -> Self {
        Self {
            initial_pot: 100.0,
            oop_stack: 100.0,
            ip_stack: 100.0,
            flop_bet_sizes: vec![0.33, 0.75],
            turn_bet_sizes: vec![0.75],
            river_bet_sizes: vec![0.75],
            flop_raise_sizes: vec![1.0],
            turn_raise_sizes: vec![1.0],
            river_raise_sizes: vec![1.0],
            max_raises: 3,
        }
    }
}

impl BettingConfig {
    /// Create a config with the given pot and stacks and default sizings.
    pub fn new(initial_pot: f32, oop_stack: f32, ip_stack: f32) -> Self {
        Self {
            initial_pot,
            oop_stack,
            ip_stack,
            ..Default::default()
        }
    }

    /// Set bet sizes (pot fractions) for every street.
    pub fn with_bet_sizes(mut self, sizes: &[f32]) -> Self {
        self.flop_bet_sizes = sizes.to_vec();
        self.turn_bet_sizes = sizes.to_vec();
        self.river_bet_sizes = sizes.to_vec();
        self
    }

    /// Set raise sizes (pot fractions) for every street.
    pub fn with_raise_sizes(mut self, sizes: &[f32]) -> Self {
        self.flop_raise_sizes = sizes.to_vec();
        self.turn_raise_sizes = sizes.to_vec();
        self.river_raise_sizes = sizes.to_vec();
        self
    }

    /// Set the per-street raise cap.
    pub fn with_max_raises(mut self, max_raises: u8) -> Self {
        self.max_raises = max_raises;
        self
    }

    /// First-in bet sizes for a street.
    pub fn bet_sizes(&self, street: Street) -> &[f32] {
        match street {
            Street::Flop => &self.flop_bet_sizes,
            Street::Turn => &self.turn_bet_sizes,
            Street::River => &self.river_bet_sizes,
        }
    }

    /// Raise-over-bet sizes for a street.
    pub fn raise_sizes(&self, street: Street) -> &[f32] {
        match street {
            Street::Flop => &self.flop_raise_sizes,
            Street::Turn => &self.turn_raise_sizes,
            Street::River => &self.river_raise_sizes,
        }
    }

    /// Validate amounts and size fractions.
    pub fn validate(&self) -> SolverResult<()> {
        if self.initial_pot < 0.0 {
            return Err(SolverError::InvalidConfig(format!(
                "initial_pot must be non-negative, got {}",
                self.initial_pot
            )));
        }
        if self.oop_stack < 0.0 || self.ip_stack < 0.0 {
            return Err(SolverError::InvalidConfig(format!(
                "stacks must be non-negative, got ({}, {})",
                self.oop_stack, self.ip_stack
            )));
        }
        for sizes in [
            &self.flop_bet_sizes,
            &self.turn_bet_sizes,
            &self.river_bet_sizes,
            &self.flop_raise_sizes,
            &self.turn_raise_sizes,
            &self.river_raise_sizes,
        ] {
            if sizes.iter().any(|&s| s <= 0.0 || !s.is_finite()) {
                return Err(SolverError::InvalidConfig(
                    "bet/raise size fractions must be positive and finite".to_string(),
                ));
            }
        }
        Ok(())
    }
}
