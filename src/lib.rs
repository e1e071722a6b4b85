//! A heads-up no-limit post-flop poker solver core.
//!
//! Three subsystems, consumed leaf to root:
//! - [`poker`]: card primitives, 5/6/7-card hand evaluation, Monte Carlo
//!   equity, range and board parsing
//! - [`tree`]: a disk-backed arena ([`TreeDataPool`]) and the
//!   [`GameTreeBuilder`] that enumerates and deduplicates every reachable
//!   betting/dealing state
//! - [`cfr`]: an external-sampling Monte Carlo CFR engine with DCFR
//!   discounting ([`CfrEngine`])
//!
//! The crate is a library; a thin host process owns its lifetime. Typical
//! use:
//!
//! ```no_run
//! use solver_core::{BettingConfig, CfrConfig, CfrEngine};
//! use solver_core::poker::{parse_board, parse_range};
//!
//! # fn main() -> Result<(), solver_core::SolverError> {
//! let board = parse_board("Ah7d2c")?;
//! let betting = BettingConfig::new(100.0, 1000.0, 1000.0)
//!     .with_bet_sizes(&[0.33, 0.75])
//!     .with_raise_sizes(&[1.0]);
//!
//! let mut engine = CfrEngine::new(CfrConfig::default())?;
//! engine.build_tree(&betting, &board)?;
//! engine.set_oop_range(parse_range("AA,KK,AKs")?);
//! engine.set_ip_range(parse_range("QQ,JJ,AKo")?);
//! engine.set_board(&board)?;
//! engine.solve(500, None)?;
//!
//! let root_strategy = engine.get_node_hand_strategies(0)?;
//! # let _ = root_strategy;
//! # Ok(())
//! # }
//! ```

pub mod cfr;
pub mod error;
pub mod poker;
pub mod tree;

pub use cfr::{CfrConfig, CfrEngine, NodeData, StopHandle};
pub use error::{SolverError, SolverResult};
pub use poker::{Card, Combo, HandRank, RangeEntry};
pub use tree::{
    Action, ActionKind, BettingConfig, GameTreeBuilder, MmapBuffer, Node, NodeKind, PoolCapacity,
    Street, TreeDataPool,
};
