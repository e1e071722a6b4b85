//! External-sampling Monte Carlo CFR with DCFR discounting.
//!
//! Each iteration runs `base_sample_size` independent samples per traverser
//! role. A sample draws one combo per player from the ranges, rejects card
//! conflicts, then walks the tree: the traverser's actions are enumerated
//! and regret-matched, the opponent's action and the chance card are
//! sampled. Regret and cumulative-strategy updates go through the
//! stripe-locked [`RegretTable`].
//!
//! Every two iterations DCFR discounting is applied: positive regrets decay
//! by `t^alpha / (t^alpha + 1)`, negative regrets are halved, and the
//! cumulative strategy decays by `t^gamma / (t^gamma + 1)`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};
use rand::prelude::*;
use rand::rngs::SmallRng;
use rayon::prelude::*;
use serde::Serialize;

use crate::cfr::config::CfrConfig;
use crate::cfr::regrets::{regret_matching, NodeRegrets, RegretTable};
use crate::error::{SolverError, SolverResult};
use crate::poker::equity::monte_carlo_equity;
use crate::poker::evaluator::{evaluate_hand, HandRank};
use crate::poker::hands::{cards_to_mask, rank, suit, Card, CardMask, RangeEntry};
use crate::tree::arena::TreeDataPool;
use crate::tree::builder::GameTreeBuilder;
use crate::tree::config::BettingConfig;
use crate::tree::node::Node;

/// Cloneable handle signalling cooperative cancellation from another thread.
#[derive(Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// Ask the running solve to stop after its current iteration.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

/// Snapshot of one node for host-side inspection.
#[derive(Debug, Clone, Serialize)]
pub struct NodeData {
    pub id: i32,
    pub player: i8,
    pub street: u8,
    pub pot: f32,
    pub stacks: [f32; 2],
    pub to_call: f32,
    #[serde(rename = "type")]
    pub kind: String,
    pub actions: Vec<String>,
    pub child_ids: Vec<i32>,
    pub board: Vec<(u8, u8)>,
    pub chance_cards: Vec<(u8, u8)>,
    pub chance_child_ids: Vec<i32>,
}

/// The MCCFR engine.
///
/// Lifecycle: [`build_tree`](Self::build_tree), then set both ranges and the
/// board, then [`solve`](Self::solve). The tree pool is read-only during the
/// solve; ranges and board must not change while it runs.
pub struct CfrEngine {
    config: CfrConfig,
    pool: Option<TreeDataPool>,
    regrets: Option<RegretTable>,

    oop_combos: Vec<RangeEntry>,
    ip_combos: Vec<RangeEntry>,

    initial_board: Vec<Card>,
    initial_board_mask: CardMask,

    oop_river_ranks: Vec<HandRank>,
    ip_river_ranks: Vec<HandRank>,
    river_ranks_ready: bool,

    regret_history: Vec<f32>,
    should_stop: Arc<AtomicBool>,
    thread_pool: Option<rayon::ThreadPool>,
}

impl CfrEngine {
    pub fn new(config: CfrConfig) -> SolverResult<Self> {
        let thread_pool = if config.num_threads > 0 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.num_threads)
                    .build()
                    .map_err(|e| SolverError::ThreadPool(e.to_string()))?,
            )
        } else {
            None
        };

        Ok(Self {
            config,
            pool: None,
            regrets: None,
            oop_combos: Vec::new(),
            ip_combos: Vec::new(),
            initial_board: Vec::new(),
            initial_board_mask: 0,
            oop_river_ranks: Vec::new(),
            ip_river_ranks: Vec::new(),
            river_ranks_ready: false,
            regret_history: Vec::new(),
            should_stop: Arc::new(AtomicBool::new(false)),
            thread_pool,
        })
    }

    /// Build the game tree into a default pool under `tmp/`.
    pub fn build_tree(&mut self, config: &BettingConfig, board: &[Card]) -> SolverResult<()> {
        let pool = GameTreeBuilder::new(config.clone())?.build_tree(board)?;
        self.install_pool(pool);
        Ok(())
    }

    /// Build the game tree into a caller-provided pool.
    pub fn build_tree_in(
        &mut self,
        config: &BettingConfig,
        board: &[Card],
        pool: TreeDataPool,
    ) -> SolverResult<()> {
        let pool = GameTreeBuilder::with_pool(config.clone(), pool).build_tree(board)?;
        self.install_pool(pool);
        Ok(())
    }

    fn install_pool(&mut self, pool: TreeDataPool) {
        let num_nodes = pool.nodes.len();
        self.regrets = Some(RegretTable::new(num_nodes));
        self.pool = Some(pool);
        self.regret_history.clear();
        debug!("tree installed: {} nodes", num_nodes);
    }

    pub fn set_oop_range(&mut self, combos: Vec<RangeEntry>) {
        self.oop_combos = combos;
        self.river_ranks_ready = false;
    }

    pub fn set_ip_range(&mut self, combos: Vec<RangeEntry>) {
        self.ip_combos = combos;
        self.river_ranks_ready = false;
    }

    /// Set the public board the ranges are conditioned on.
    pub fn set_board(&mut self, board: &[Card]) -> SolverResult<()> {
        if !(3..=5).contains(&board.len()) {
            return Err(SolverError::InvalidBoardSize(board.len()));
        }
        let mask = cards_to_mask(board);
        if mask.count_ones() as usize != board.len() {
            return Err(SolverError::DuplicateCard(format!("{:?}", board)));
        }
        self.initial_board = board.to_vec();
        self.initial_board_mask = mask;
        self.river_ranks_ready = false;
        Ok(())
    }

    /// Run `iterations` of MCCFR. The progress callback, when present, is
    /// invoked at every iteration boundary with `(current, total)`.
    pub fn solve(
        &mut self,
        iterations: u32,
        progress_callback: Option<&dyn Fn(u32, u32)>,
    ) -> SolverResult<()> {
        if self.pool.is_none() || self.regrets.is_none() {
            return Err(SolverError::TreeNotBuilt);
        }
        if self.oop_combos.is_empty() {
            return Err(SolverError::EmptyRange("OOP"));
        }
        if self.ip_combos.is_empty() {
            return Err(SolverError::EmptyRange("IP"));
        }

        info!(
            "solving: {} iterations, {} samples per player per iteration",
            iterations, self.config.base_sample_size
        );
        self.regret_history.clear();
        self.regret_history.reserve(iterations as usize);
        self.should_stop.store(false, Ordering::Relaxed);
        self.precompute_river_ranks();

        for t in 1..=iterations {
            if self.should_stop.load(Ordering::Relaxed) {
                info!("solve stopped at iteration {}", t);
                break;
            }

            let metric = self.run_iteration(t);
            self.regret_history.push(metric);

            if t % 2 == 0 {
                self.apply_discount(t);
            }
            if let Some(callback) = progress_callback {
                callback(t, iterations);
            }
            if t % 50 == 0 || t == 1 {
                debug!("iter {}/{}, average regret {:.4}", t, iterations, metric);
            }
        }

        info!("solve finished after {} iterations", self.regret_history.len());
        Ok(())
    }

    /// Signal cancellation; the solve returns after the current iteration.
    pub fn stop(&self) {
        self.should_stop.store(true, Ordering::Relaxed);
    }

    /// Handle for signalling [`stop`](Self::stop) from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: Arc::clone(&self.should_stop),
        }
    }

    /// Cache exact river ranks for both ranges when the initial board is
    /// already complete; showdown evaluation then skips re-ranking.
    fn precompute_river_ranks(&mut self) {
        if self.initial_board.len() != 5 || self.river_ranks_ready {
            return;
        }
        debug!("precomputing river ranks");
        let board = &self.initial_board;
        let rank_all = |combos: &[RangeEntry]| -> Vec<HandRank> {
            combos
                .par_iter()
                .map(|entry| evaluate_hand(entry.combo, board))
                .collect()
        };
        self.oop_river_ranks = rank_all(&self.oop_combos);
        self.ip_river_ranks = rank_all(&self.ip_combos);
        self.river_ranks_ready = true;
    }

    /// One iteration: both traverser roles, `base_sample_size` samples each.
    /// Returns the average-regret progress metric sampled at the root.
    fn run_iteration(&self, t: u32) -> f32 {
        let traversal = self.traversal();
        let num_samples = self.config.base_sample_size;
        let board_mask = self.initial_board_mask;

        for p in 0..2usize {
            let (my_combos, opp_combos) = if p == 0 {
                (&self.oop_combos, &self.ip_combos)
            } else {
                (&self.ip_combos, &self.oop_combos)
            };

            let sample = |_: usize| {
                let mut rng = SmallRng::from_entropy();
                let my_idx = rng.gen_range(0..my_combos.len());
                let opp_idx = rng.gen_range(0..opp_combos.len());
                let my = &my_combos[my_idx];
                let opp = &opp_combos[opp_idx];
                // Degenerate sample: shared card somewhere. Skip, keep going.
                if my.combo.conflicts_with(&opp.combo)
                    || my.combo.conflicts_with_mask(board_mask)
                    || opp.combo.conflicts_with_mask(board_mask)
                {
                    return;
                }
                traversal.traverse(0, p, my_idx, opp_idx, 1.0, t, &mut rng);
            };

            if self.config.use_parallel {
                match &self.thread_pool {
                    Some(pool) => {
                        pool.install(|| (0..num_samples).into_par_iter().for_each(sample))
                    }
                    None => (0..num_samples).into_par_iter().for_each(sample),
                }
            } else {
                (0..num_samples).for_each(sample);
            }
        }

        // Progress proxy: mean positive root regret per combo, normalized by
        // total samples so far. Not a best-response bound.
        let (total_max_regret, hands_counted) = traversal.regrets.with(0, |entry| {
            let mut total = 0.0f32;
            let mut count = 0usize;
            for regrets in entry.regrets.values() {
                total += regrets.iter().fold(0.0f32, |m, &r| m.max(r));
                count += 1;
            }
            (total, count)
        });

        let samples_so_far = t as f32 * self.config.base_sample_size as f32;
        if hands_counted > 0 {
            (total_max_regret / hands_counted as f32) / samples_so_far
        } else {
            0.0
        }
    }

    fn apply_discount(&self, t: u32) {
        if let Some(regrets) = &self.regrets {
            let d_pos = positive_regret_discount(t as f32, self.config.alpha);
            let d_strat = strategy_discount(t as f32, self.config.gamma);
            regrets.apply_discount(d_pos, NEGATIVE_REGRET_DISCOUNT, d_strat);
        }
    }

    /// Borrow the traversal view. Callers must have installed a pool.
    fn traversal(&self) -> Traversal<'_> {
        Traversal {
            pool: self.pool.as_ref().expect("tree must be built"),
            regrets: self.regrets.as_ref().expect("tree must be built"),
            oop: &self.oop_combos,
            ip: &self.ip_combos,
            equity_samples: self.config.equity_samples,
            oop_river_ranks: &self.oop_river_ranks,
            ip_river_ranks: &self.ip_river_ranks,
            river_ranks_ready: self.river_ranks_ready,
        }
    }

    // === Query operations ===

    /// Number of nodes in the built tree (0 before a build).
    pub fn node_count(&self) -> usize {
        self.pool.as_ref().map_or(0, |p| p.nodes.len())
    }

    pub fn oop_combo_count(&self) -> usize {
        self.oop_combos.len()
    }

    pub fn ip_combo_count(&self) -> usize {
        self.ip_combos.len()
    }

    /// Per-iteration average-regret history.
    pub fn get_regret_history(&self) -> &[f32] {
        &self.regret_history
    }

    /// Latest average-regret reading (0 before any iteration).
    pub fn get_average_regret(&self) -> f32 {
        self.regret_history.last().copied().unwrap_or(0.0)
    }

    /// Cumulative strategy at a node, grouped by hand shorthand.
    ///
    /// Vectors are summed element-wise across the combos sharing a
    /// shorthand and are not normalized.
    pub fn get_node_hand_strategies(
        &self,
        node_id: i32,
    ) -> SolverResult<HashMap<String, Vec<f32>>> {
        let pool = self.pool.as_ref().ok_or(SolverError::TreeNotBuilt)?;
        let regrets = self.regrets.as_ref().ok_or(SolverError::TreeNotBuilt)?;
        if node_id < 0 || node_id as usize >= pool.nodes.len() {
            return Err(SolverError::UnknownNode(node_id));
        }

        let node = pool.nodes[node_id as usize];
        let combos = if node.player == 0 {
            &self.oop_combos
        } else {
            &self.ip_combos
        };

        let mut result: HashMap<String, Vec<f32>> = HashMap::new();
        regrets.with(node_id as usize, |entry: &mut NodeRegrets| {
            for (&idx, cum) in &entry.cumulative_strategy {
                let Some(combo) = combos.get(idx as usize) else {
                    continue;
                };
                match result.get_mut(&combo.hand) {
                    Some(acc) => {
                        for (a, &v) in cum.iter().enumerate() {
                            acc[a] += v;
                        }
                    }
                    None => {
                        result.insert(combo.hand.clone(), cum.clone());
                    }
                }
            }
        });
        Ok(result)
    }

    /// Full snapshot of one node for the host.
    pub fn get_node_data(&self, node_id: i32) -> SolverResult<NodeData> {
        let pool = self.pool.as_ref().ok_or(SolverError::TreeNotBuilt)?;
        if node_id < 0 || node_id as usize >= pool.nodes.len() {
            return Err(SolverError::UnknownNode(node_id));
        }
        let node = pool.nodes[node_id as usize];

        let kind = if node.is_terminal() {
            "terminal"
        } else if node.is_chance() {
            "chance"
        } else {
            "player"
        };

        let mut actions = Vec::with_capacity(node.action_count as usize);
        let mut child_ids = Vec::with_capacity(node.action_count as usize);
        for i in 0..node.action_count as usize {
            actions.push(pool.actions[node.action_start as usize + i].display());
            child_ids.push(pool.child_ids[node.child_start as usize + i]);
        }

        let mut chance_cards = Vec::with_capacity(node.chance_count as usize);
        let mut chance_child_ids = Vec::with_capacity(node.chance_count as usize);
        if node.is_chance() {
            for i in 0..node.chance_count as usize {
                let card = pool.chance_cards[node.chance_card_start as usize + i];
                chance_cards.push((rank(card), suit(card)));
                chance_child_ids.push(pool.child_ids[node.chance_child_start as usize + i]);
            }
        }

        Ok(NodeData {
            id: node.node_id,
            player: node.player,
            street: node.street as u8,
            pot: node.pot,
            stacks: node.stacks,
            to_call: node.to_call,
            kind: kind.to_string(),
            actions,
            child_ids,
            board: node
                .board_cards()
                .iter()
                .map(|&c| (rank(c), suit(c)))
                .collect(),
            chance_cards,
            chance_child_ids,
        })
    }
}

/// Fixed multiplier applied to negative regrets at every discount step.
const NEGATIVE_REGRET_DISCOUNT: f32 = 0.5;

/// `t^alpha / (t^alpha + 1)` applied to positive regrets.
fn positive_regret_discount(t: f32, alpha: f32) -> f32 {
    let ta = t.powf(alpha);
    ta / (ta + 1.0)
}

/// `t^gamma / (t^gamma + 1)` applied to the cumulative strategy.
fn strategy_discount(t: f32, gamma: f32) -> f32 {
    let tg = t.powf(gamma);
    tg / (tg + 1.0)
}

/// Immutable view of everything one sampled traversal needs.
struct Traversal<'a> {
    pool: &'a TreeDataPool,
    regrets: &'a RegretTable,
    oop: &'a [RangeEntry],
    ip: &'a [RangeEntry],
    equity_samples: u32,
    oop_river_ranks: &'a [HandRank],
    ip_river_ranks: &'a [HandRank],
    river_ranks_ready: bool,
}

impl Traversal<'_> {
    /// Dispatch on node type. `my_idx` indexes the traverser's range,
    /// `opp_idx` the opponent's.
    #[allow(clippy::too_many_arguments)]
    fn traverse(
        &self,
        node_id: i32,
        player: usize,
        my_idx: usize,
        opp_idx: usize,
        reach: f32,
        t: u32,
        rng: &mut SmallRng,
    ) -> f32 {
        if node_id < 0 {
            return 0.0;
        }
        let node = self.pool.nodes[node_id as usize];
        if node.is_terminal() {
            return self.terminal_ev(&node, player, my_idx, opp_idx, rng);
        }
        if node.is_chance() {
            return self.chance_node(&node, player, my_idx, opp_idx, reach, t, rng);
        }
        if node.player as usize == player {
            self.player_node(&node, player, my_idx, opp_idx, reach, t, rng)
        } else {
            self.opponent_node(&node, player, my_idx, opp_idx, reach, t, rng)
        }
    }

    /// Traverser decision: enumerate actions, regret-match, accumulate.
    #[allow(clippy::too_many_arguments)]
    fn player_node(
        &self,
        node: &Node,
        player: usize,
        my_idx: usize,
        opp_idx: usize,
        reach: f32,
        t: u32,
        rng: &mut SmallRng,
    ) -> f32 {
        let num_actions = node.action_count as usize;
        let strategy = self.current_strategy(node, my_idx);

        let mut action_utils = vec![0.0f32; num_actions];
        let mut node_util = 0.0f32;
        for a in 0..num_actions {
            let child_id = self.pool.child_ids[node.child_start as usize + a];
            action_utils[a] = self.traverse(child_id, player, my_idx, opp_idx, reach, t, rng);
            node_util += strategy[a] * action_utils[a];
        }

        self.regrets.with(node.node_id as usize, |entry| {
            let (regrets, cum_strategy) = entry.vectors_mut(my_idx as u32, num_actions);
            for a in 0..num_actions {
                regrets[a] += action_utils[a] - node_util;
                // External sampling: accumulate the sampled current strategy
                // without reach weighting.
                cum_strategy[a] += strategy[a];
            }
        });

        node_util
    }

    /// Opponent decision: sample one action from their current strategy.
    /// No update here (external sampling).
    #[allow(clippy::too_many_arguments)]
    fn opponent_node(
        &self,
        node: &Node,
        player: usize,
        my_idx: usize,
        opp_idx: usize,
        reach: f32,
        t: u32,
        rng: &mut SmallRng,
    ) -> f32 {
        let num_actions = node.action_count as usize;
        let strategy = self.current_strategy(node, opp_idx);

        let roll: f32 = rng.gen();
        let mut cumulative = 0.0f32;
        let mut choice = num_actions - 1;
        for (a, &p) in strategy.iter().enumerate() {
            cumulative += p;
            if roll < cumulative {
                choice = a;
                break;
            }
        }

        let child_id = self.pool.child_ids[node.child_start as usize + choice];
        self.traverse(child_id, player, my_idx, opp_idx, reach, t, rng)
    }

    /// Chance: sample one dealt card not colliding with either hole pair.
    #[allow(clippy::too_many_arguments)]
    fn chance_node(
        &self,
        node: &Node,
        player: usize,
        my_idx: usize,
        opp_idx: usize,
        reach: f32,
        t: u32,
        rng: &mut SmallRng,
    ) -> f32 {
        let (my, opp) = self.matchup(player, my_idx, opp_idx);

        let mut valid: Vec<usize> = Vec::with_capacity(node.chance_count as usize);
        for i in 0..node.chance_count as usize {
            let card = self.pool.chance_cards[node.chance_card_start as usize + i];
            if !my.combo.conflicts_with_card(card) && !opp.combo.conflicts_with_card(card) {
                valid.push(i);
            }
        }
        if valid.is_empty() {
            return 0.0;
        }

        let pick = valid[rng.gen_range(0..valid.len())];
        let child_id = self.pool.child_ids[node.chance_child_start as usize + pick];
        self.traverse(child_id, player, my_idx, opp_idx, reach, t, rng)
    }

    /// Terminal value in signed chips for the traverser.
    fn terminal_ev(
        &self,
        node: &Node,
        player: usize,
        my_idx: usize,
        opp_idx: usize,
        rng: &mut SmallRng,
    ) -> f32 {
        let initial_stack = self.pool.nodes[0].stacks[player];

        // Fold terminals carry a zeroed pot; the stacks already reflect the
        // non-folding player collecting.
        if node.pot < 0.01 {
            return node.stacks[player] - initial_stack;
        }

        let (my, opp) = self.matchup(player, my_idx, opp_idx);
        let board = node.board_cards();

        let equity = if node.board_len == 5 {
            let (my_rank, opp_rank) = if self.river_ranks_ready {
                let (mine, theirs) = if player == 0 {
                    (self.oop_river_ranks, self.ip_river_ranks)
                } else {
                    (self.ip_river_ranks, self.oop_river_ranks)
                };
                (mine[my_idx], theirs[opp_idx])
            } else {
                (evaluate_hand(my.combo, board), evaluate_hand(opp.combo, board))
            };
            if my_rank > opp_rank {
                1.0
            } else if my_rank < opp_rank {
                0.0
            } else {
                0.5
            }
        } else {
            monte_carlo_equity(my.combo, opp.combo, board, self.equity_samples, rng)
        };

        equity * node.pot - (initial_stack - node.stacks[player])
    }

    /// Regret-matched strategy for a combo at a node.
    fn current_strategy(&self, node: &Node, combo_idx: usize) -> Vec<f32> {
        let num_actions = node.action_count as usize;
        let regrets = self
            .regrets
            .with(node.node_id as usize, |entry| {
                entry.regrets.get(&(combo_idx as u32)).cloned()
            });
        match regrets {
            Some(r) => regret_matching(&r),
            None => vec![1.0 / num_actions as f32; num_actions],
        }
    }

    fn matchup(&self, player: usize, my_idx: usize, opp_idx: usize) -> (&RangeEntry, &RangeEntry) {
        if player == 0 {
            (&self.oop[my_idx], &self.ip[opp_idx])
        } else {
            (&self.ip[my_idx], &self.oop[opp_idx])
        }
    }
}
