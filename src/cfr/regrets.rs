//! Stripe-locked regret and cumulative-strategy storage.
//!
//! One entry per tree node, each holding two maps keyed by combo index into
//! the acting player's range: cumulative regrets and cumulative strategy,
//! one `f32` per action. Entries are created lazily on first touch.
//!
//! Per-node mutexes would waste memory at tens of millions of nodes and a
//! global lock would serialize the hot path, so updates go through a fixed
//! pool of [`NUM_STRIPES`] mutexes, with node `id` mapped to stripe
//! `id % NUM_STRIPES`.

use std::cell::UnsafeCell;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Number of stripe mutexes guarding the table.
pub const NUM_STRIPES: usize = 2048;

/// Per-node accumulation state.
#[derive(Default)]
pub struct NodeRegrets {
    /// Cumulative regrets per combo index, one value per action.
    pub regrets: FxHashMap<u32, Vec<f32>>,
    /// Cumulative strategy per combo index, one value per action.
    pub cumulative_strategy: FxHashMap<u32, Vec<f32>>,
}

impl NodeRegrets {
    /// Regret and strategy vectors for a combo, zero-initialized to the
    /// node's action count on first touch.
    pub fn vectors_mut(&mut self, combo_idx: u32, num_actions: usize) -> (&mut [f32], &mut [f32]) {
        let regrets = self
            .regrets
            .entry(combo_idx)
            .or_insert_with(|| vec![0.0; num_actions]);
        let cum = self
            .cumulative_strategy
            .entry(combo_idx)
            .or_insert_with(|| vec![0.0; num_actions]);
        (regrets.as_mut_slice(), cum.as_mut_slice())
    }
}

/// Regret table shared by the sampling workers.
pub struct RegretTable {
    entries: Vec<UnsafeCell<NodeRegrets>>,
    stripes: Vec<Mutex<()>>,
}

// SAFETY: entries[i] is only ever dereferenced inside `with`, which holds
// stripes[i % NUM_STRIPES] for the whole access.
unsafe impl Sync for RegretTable {}
unsafe impl Send for RegretTable {}

impl RegretTable {
    /// One empty entry per tree node.
    pub fn new(num_nodes: usize) -> Self {
        let mut entries = Vec::with_capacity(num_nodes);
        entries.resize_with(num_nodes, || UnsafeCell::new(NodeRegrets::default()));
        let mut stripes = Vec::with_capacity(NUM_STRIPES);
        stripes.resize_with(NUM_STRIPES, || Mutex::new(()));
        Self { entries, stripes }
    }

    /// Number of node entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run `f` against a node's entry under its stripe lock.
    ///
    /// Updates for a given (node, combo) are linearizable under this lock;
    /// updates across nodes are independent.
    pub fn with<R>(&self, node_id: usize, f: impl FnOnce(&mut NodeRegrets) -> R) -> R {
        let _guard = self.stripes[node_id % NUM_STRIPES].lock();
        // SAFETY: the stripe for this node is held; see the Sync impl note.
        let entry = unsafe { &mut *self.entries[node_id].get() };
        f(entry)
    }

    /// Visit every entry in turn, each under its stripe lock.
    pub fn for_each(&self, mut f: impl FnMut(&mut NodeRegrets)) {
        for node_id in 0..self.entries.len() {
            self.with(node_id, &mut f);
        }
    }

    /// Apply DCFR discount factors in place: `d_pos` to positive regrets,
    /// `d_neg` to negative regrets, `d_strategy` to cumulative strategy.
    pub fn apply_discount(&self, d_pos: f32, d_neg: f32, d_strategy: f32) {
        self.for_each(|entry| {
            for regrets in entry.regrets.values_mut() {
                for r in regrets.iter_mut() {
                    if *r < 0.0 {
                        *r *= d_neg;
                    } else {
                        *r *= d_pos;
                    }
                }
            }
            for cum in entry.cumulative_strategy.values_mut() {
                for c in cum.iter_mut() {
                    *c *= d_strategy;
                }
            }
        });
    }
}

/// Regret matching: positive regrets normalized to a distribution, uniform
/// when no positive regret exists.
pub fn regret_matching(regrets: &[f32]) -> Vec<f32> {
    let sum: f32 = regrets.iter().map(|&r| r.max(0.0)).sum();
    if sum > 0.0 {
        regrets.iter().map(|&r| r.max(0.0) / sum).collect()
    } else {
        vec![1.0 / regrets.len() as f32; regrets.len()]
    }
}
