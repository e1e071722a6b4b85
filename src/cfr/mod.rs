//! The MCCFR solver: configuration, regret storage, and the engine.

pub mod config;
pub mod engine;
pub mod regrets;

pub use config::CfrConfig;
pub use engine::{CfrEngine, NodeData, StopHandle};
pub use regrets::{NodeRegrets, RegretTable, NUM_STRIPES};
