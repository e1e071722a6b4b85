//! Game-tree construction and storage.
//!
//! This module provides:
//! - [`BettingConfig`] describing the betting structure
//! - [`MmapBuffer`] and [`TreeDataPool`], the disk-backed arenas
//! - [`GameTreeBuilder`], which enumerates and deduplicates the full tree

pub mod arena;
pub mod builder;
pub mod config;
pub mod node;

pub use arena::{MmapBuffer, PoolCapacity, TreeDataPool};
pub use builder::GameTreeBuilder;
pub use config::{BettingConfig, Street};
pub use node::{Action, ActionKind, Node, NodeKind, PLAYER_CHANCE};
