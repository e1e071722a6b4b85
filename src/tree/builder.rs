//! Game-tree construction.
//!
//! Recursively materializes every reachable betting/dealing state for a
//! heads-up post-flop game into a [`TreeDataPool`], sharing identical
//! subgames through a transposition table. The tree is acyclic by
//! construction: stacks strictly decrease along any action path and the
//! street only advances on chance nodes, so merging identical states never
//! introduces a cycle.
//!
//! Chance nodes collapse suits at the structural level: one representative
//! card per rank that still has a free suit, at most 13 children per deal.
//! The solver still samples concrete cards and enforces suit-level card
//! conflicts against sampled hole cards.

use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::error::SolverResult;
use crate::poker::hands::{cards_to_mask, make_card, mask_has_card, Card};
use crate::tree::arena::TreeDataPool;
use crate::tree::config::{BettingConfig, Street};
use crate::tree::node::{Action, ActionKind, Node, NodeKind, PLAYER_CHANCE};

/// Builds a [`TreeDataPool`] from a betting config and an initial board.
///
/// Construction is single-threaded; the transposition table and the arena
/// appends are not synchronized.
pub struct GameTreeBuilder {
    config: BettingConfig,
    pool: TreeDataPool,
    transposition_table: FxHashMap<String, i32>,
}

impl GameTreeBuilder {
    /// Create a builder writing into a default pool under `tmp/`.
    pub fn new(config: BettingConfig) -> SolverResult<Self> {
        Ok(Self::with_pool(config, TreeDataPool::new()?))
    }

    /// Create a builder writing into a preconfigured pool.
    pub fn with_pool(config: BettingConfig, pool: TreeDataPool) -> Self {
        Self {
            config,
            pool,
            transposition_table: FxHashMap::default(),
        }
    }

    /// Build the full tree for `board` (3-5 cards) and return the pool.
    ///
    /// Node 0 always holds the root: the recursion assigns the real root its
    /// own id, then its contents are copied into the reserved slot.
    pub fn build_tree(mut self, board: &[Card]) -> SolverResult<TreeDataPool> {
        self.config.validate()?;
        let initial_street = Street::from_board_len(board.len())?;

        self.pool.clear();
        self.transposition_table.clear();

        info!(
            "building tree: pot={} stacks=({}, {}) board_len={}",
            self.config.initial_pot,
            self.config.oop_stack,
            self.config.ip_stack,
            board.len()
        );

        self.pool.nodes.push(Node::placeholder())?;

        let real_root_id = self.build_recursive(
            self.config.oop_stack,
            self.config.ip_stack,
            self.config.initial_pot,
            0,
            initial_street,
            board,
            0,
            0.0,
            0.0,
            false,
        )?;

        if real_root_id != 0 {
            let mut root = self.pool.nodes[real_root_id as usize];
            root.node_id = 0;
            self.pool.nodes[0] = root;
        }

        info!(
            "tree built: {} nodes, {} actions, {} child ids, {} chance cards",
            self.pool.nodes.len(),
            self.pool.actions.len(),
            self.pool.child_ids.len(),
            self.pool.chance_cards.len()
        );

        Ok(self.pool)
    }

    /// Canonical state key for deduplication. Rounds chip amounts to two
    /// decimals so float noise cannot split identical states.
    fn state_key(
        oop_stack: f32,
        ip_stack: f32,
        pot: f32,
        player: usize,
        street: Street,
        board: &[Card],
        current_bet: f32,
        actor_invested: f32,
        raise_count: u8,
        is_all_in: bool,
    ) -> String {
        use std::fmt::Write;

        let to_call = current_bet - actor_invested;
        let mut key = format!(
            "{:.2}|{:.2}|{:.2}|{}|{}|{:.2}|{}|{}",
            oop_stack, ip_stack, pot, player, street as u8, to_call, raise_count, is_all_in as u8
        );
        for &c in board {
            let _ = write!(key, ",{}", c);
        }
        key
    }

    #[allow(clippy::too_many_arguments)]
    fn build_recursive(
        &mut self,
        oop_stack: f32,
        ip_stack: f32,
        pot: f32,
        player: usize,
        street: Street,
        board: &[Card],
        raise_count: u8,
        current_bet: f32,
        actor_invested: f32,
        is_all_in: bool,
    ) -> SolverResult<i32> {
        let key = Self::state_key(
            oop_stack,
            ip_stack,
            pot,
            player,
            street,
            board,
            current_bet,
            actor_invested,
            raise_count,
            is_all_in,
        );
        if let Some(&id) = self.transposition_table.get(&key) {
            return Ok(id);
        }

        let mut actions: Vec<Action> = Vec::new();
        let mut child_ids: Vec<i32> = Vec::new();
        let to_call = current_bet - actor_invested;

        // A shove has been called and it is nominally our turn: the street
        // is closed without further action. On the river that is a showdown;
        // earlier streets run out via a placeholder child into a chance node.
        if is_all_in && to_call < 0.01 {
            if street == Street::River {
                return self.write_node(
                    &key, player, street, pot, oop_stack, ip_stack, to_call, &[], &[], board,
                );
            }
            let next = street.next().unwrap();
            let chance_id = self.add_chance_node(oop_stack, ip_stack, pot, next, board)?;
            actions.push(Action::new(ActionKind::Call, 0.0));
            child_ids.push(chance_id);
            return self.write_node(
                &key, player, street, pot, oop_stack, ip_stack, to_call, &actions, &child_ids,
                board,
            );
        }

        let actor_stack = if player == 0 { oop_stack } else { ip_stack };

        // 1. Fold: only when facing a bet. The folder's committed chips are
        // already gone from their stack; the opponent collects the pot and
        // the terminal carries pot = 0.
        if to_call > 0.1 {
            actions.push(Action::new(ActionKind::Fold, 0.0));
            let (next_oop, next_ip) = if player == 0 {
                (oop_stack, ip_stack + pot)
            } else {
                (oop_stack + pot, ip_stack)
            };
            let fold_key = format!("TERM_FOLD_{}", self.pool.nodes.len());
            let fold_id = self.write_node(
                &fold_key, player, street, 0.0, next_oop, next_ip, 0.0, &[], &[], board,
            )?;
            child_ids.push(fold_id);
        }

        // 2. Check / Call.
        if to_call < 0.1 {
            actions.push(Action::new(ActionKind::Check, 0.0));
            if player == 1 {
                // IP check closes the street.
                if street == Street::River {
                    let term_key = format!("TERM_SD_{}", self.pool.nodes.len());
                    let term_id = self.write_node(
                        &term_key, player, street, pot, oop_stack, ip_stack, 0.0, &[], &[], board,
                    )?;
                    child_ids.push(term_id);
                } else {
                    let next = street.next().unwrap();
                    let chance_id = self.add_chance_node(oop_stack, ip_stack, pot, next, board)?;
                    child_ids.push(chance_id);
                }
            } else {
                // OOP check hands the turn to IP on the same street.
                let check_id = self.build_recursive(
                    oop_stack, ip_stack, pot, 1, street, board, 0, 0.0, 0.0, false,
                )?;
                child_ids.push(check_id);
            }
        } else {
            let call_amount = actor_stack.min(to_call);
            actions.push(Action::new(ActionKind::Call, call_amount));
            let next_oop = if player == 0 { oop_stack - call_amount } else { oop_stack };
            let next_ip = if player == 1 { ip_stack - call_amount } else { ip_stack };
            let next_pot = pot + call_amount;

            if street == Street::River {
                let term_key = format!("TERM_SD_{}", self.pool.nodes.len());
                let term_id = self.write_node(
                    &term_key, player, street, next_pot, next_oop, next_ip, 0.0, &[], &[], board,
                )?;
                child_ids.push(term_id);
            } else {
                // The call closed the street (possibly an all-in call);
                // either way the board runs on through a chance node.
                let next = street.next().unwrap();
                let chance_id =
                    self.add_chance_node(next_oop, next_ip, next_pot, next, board)?;
                child_ids.push(chance_id);
            }
        }

        // 3. Bet / Raise / All-in.
        if raise_count < self.config.max_raises && actor_stack > to_call + 0.01 {
            let is_bet = to_call < 0.01;
            let sizes = if is_bet {
                self.config.bet_sizes(street)
            } else {
                self.config.raise_sizes(street)
            }
            .to_vec();

            for s in sizes {
                let bet_value = if is_bet {
                    (pot * s).floor().max(1.0)
                } else {
                    ((pot + to_call) * s).floor().max(1.0)
                };
                let invest = actor_stack.min(to_call + bet_value);
                if invest <= to_call + 0.01 {
                    continue;
                }

                let kind = if is_bet { ActionKind::Bet } else { ActionKind::Raise };
                actions.push(Action::new(kind, invest));
                let next_oop = if player == 0 { oop_stack - invest } else { oop_stack };
                let next_ip = if player == 1 { ip_stack - invest } else { ip_stack };
                let child_id = self.build_recursive(
                    next_oop,
                    next_ip,
                    pot + invest,
                    1 - player,
                    street,
                    board,
                    raise_count + 1,
                    invest,
                    current_bet,
                    invest >= actor_stack - 0.01,
                )?;
                child_ids.push(child_id);
            }

            if actor_stack > to_call + 1.0 {
                actions.push(Action::new(ActionKind::AllIn, actor_stack));
                let next_oop = if player == 0 { 0.0 } else { oop_stack };
                let next_ip = if player == 1 { 0.0 } else { ip_stack };
                let child_id = self.build_recursive(
                    next_oop,
                    next_ip,
                    pot + actor_stack,
                    1 - player,
                    street,
                    board,
                    raise_count + 1,
                    actor_stack,
                    current_bet,
                    true,
                )?;
                child_ids.push(child_id);
            }
        }

        self.write_node(
            &key, player, street, pot, oop_stack, ip_stack, to_call, &actions, &child_ids, board,
        )
    }

    /// Deal one representative card per rank still available given the
    /// parent board, build the child subtrees, then write the chance node so
    /// its card slice and child slice land contiguously in the arenas.
    fn add_chance_node(
        &mut self,
        oop_stack: f32,
        ip_stack: f32,
        pot: f32,
        next_street: Street,
        board: &[Card],
    ) -> SolverResult<i32> {
        let mask = cards_to_mask(board);
        let mut chance_cards: Vec<Card> = Vec::with_capacity(13);
        let mut chance_child_ids: Vec<i32> = Vec::with_capacity(13);

        for r in 0..13u8 {
            let representative = (0..4u8)
                .map(|s| make_card(r, s))
                .find(|&c| !mask_has_card(mask, c));
            if let Some(card) = representative {
                chance_cards.push(card);
                let mut next_board = board.to_vec();
                next_board.push(card);
                let child_id = self.build_recursive(
                    oop_stack,
                    ip_stack,
                    pot,
                    0,
                    next_street,
                    &next_board,
                    0,
                    0.0,
                    0.0,
                    oop_stack < 0.01 || ip_stack < 0.01,
                )?;
                chance_child_ids.push(child_id);
            }
        }

        let chance_id = self.pool.nodes.len() as i32;
        let mut node = Node::placeholder();
        node.node_id = chance_id;
        node.kind = NodeKind::Chance;
        node.player = PLAYER_CHANCE;
        node.street = next_street;
        node.pot = pot;
        node.stacks = [oop_stack, ip_stack];
        node.board_len = board.len() as u8;
        node.board[..board.len()].copy_from_slice(board);

        node.chance_card_start = self.pool.chance_cards.len() as u32;
        node.chance_count = chance_cards.len() as u16;
        for c in chance_cards {
            self.pool.chance_cards.push(c)?;
        }

        node.chance_child_start = self.pool.child_ids.len() as u32;
        for id in chance_child_ids {
            self.pool.child_ids.push(id)?;
        }

        self.pool.nodes.push(node)?;
        debug!("chance node {} -> {:?}", chance_id, next_street);
        Ok(chance_id)
    }

    /// Append a node, registering its key in the transposition table.
    ///
    /// Offsets into the action and child buffers are taken at the moment of
    /// the write so each node's slices are contiguous.
    #[allow(clippy::too_many_arguments)]
    fn write_node(
        &mut self,
        key: &str,
        player: usize,
        street: Street,
        pot: f32,
        oop_stack: f32,
        ip_stack: f32,
        to_call: f32,
        actions: &[Action],
        child_ids: &[i32],
        board: &[Card],
    ) -> SolverResult<i32> {
        let node_id = self.pool.nodes.len() as i32;
        let mut node = Node::placeholder();
        node.node_id = node_id;
        node.player = player as i8;
        node.street = street;
        node.pot = pot;
        node.stacks = [oop_stack, ip_stack];
        node.to_call = to_call.max(0.0);
        node.kind = if actions.is_empty() {
            NodeKind::Terminal
        } else {
            NodeKind::Player
        };
        node.board_len = board.len() as u8;
        node.board[..board.len()].copy_from_slice(board);

        node.action_start = self.pool.actions.len() as u32;
        node.action_count = actions.len() as u8;
        for &a in actions {
            self.pool.actions.push(a)?;
        }

        node.child_start = self.pool.child_ids.len() as u32;
        for &id in child_ids {
            self.pool.child_ids.push(id)?;
        }

        self.pool.nodes.push(node)?;
        self.transposition_table.insert(key.to_string(), node_id);
        Ok(node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SolverError;
    use crate::poker::board_parser::parse_board;
    use crate::tree::arena::PoolCapacity;
    use std::path::PathBuf;

    fn temp_pool(tag: &str) -> TreeDataPool {
        let dir: PathBuf =
            std::env::temp_dir().join(format!("solver-core-{}-{}", std::process::id(), tag));
        let capacity = PoolCapacity {
            nodes: 1 << 20,
            actions: 1 << 21,
            child_ids: 1 << 21,
            chance_cards: 1 << 18,
        };
        TreeDataPool::with_capacity(&dir, capacity).unwrap()
    }

    fn river_config(bet_sizes: &[f32], max_raises: u8) -> BettingConfig {
        BettingConfig::new(100.0, 100.0, 100.0)
            .with_bet_sizes(bet_sizes)
            .with_raise_sizes(&[])
            .with_max_raises(max_raises)
    }

    #[test]
    fn test_check_only_river_tree() {
        // With no bets allowed the tree is: root check -> IP check -> showdown,
        // plus the reserved root slot.
        let board = parse_board("2c7d9hAhKd").unwrap();
        let builder =
            GameTreeBuilder::with_pool(river_config(&[0.5], 0), temp_pool("check-only"));
        let pool = builder.build_tree(&board).unwrap();
        assert_eq!(pool.nodes.len(), 4);

        let root = pool.nodes[0];
        assert!(root.is_player());
        assert_eq!(root.player, 0);
        assert_eq!(root.action_count, 1);
        assert_eq!(pool.actions[root.action_start as usize].kind, ActionKind::Check);
    }

    #[test]
    fn test_single_bet_river_node_count() {
        // Hand-enumerated: root {check, bet 50, all-in} with one raise cap.
        // 16 nodes total including the reserved root copy.
        let board = parse_board("2c7d9hAhKd").unwrap();
        let builder =
            GameTreeBuilder::with_pool(river_config(&[0.5], 1), temp_pool("single-bet"));
        let pool = builder.build_tree(&board).unwrap();
        assert_eq!(pool.nodes.len(), 16);

        let root = pool.nodes[0];
        assert_eq!(root.action_count, 3);
        let kinds: Vec<ActionKind> = (0..3)
            .map(|i| pool.actions[root.action_start as usize + i].kind)
            .collect();
        assert_eq!(kinds, vec![ActionKind::Check, ActionKind::Bet, ActionKind::AllIn]);
    }

    #[test]
    fn test_pot_sized_bet_shares_all_in_subtree() {
        // A bet equal to the remaining stack reaches the same state as the
        // explicit all-in, so the transposition table must merge the children.
        let board = parse_board("2c7d9hAhKd").unwrap();
        let config = BettingConfig::new(200.0, 100.0, 100.0)
            .with_bet_sizes(&[0.5])
            .with_raise_sizes(&[])
            .with_max_raises(1);
        let builder = GameTreeBuilder::with_pool(config, temp_pool("dedup"));
        let pool = builder.build_tree(&board).unwrap();

        let root = pool.nodes[0];
        assert_eq!(root.action_count, 3);
        let bet_child = pool.child_ids[root.child_start as usize + 1];
        let all_in_child = pool.child_ids[root.child_start as usize + 2];
        assert_eq!(bet_child, all_in_child);
    }

    #[test]
    fn test_flop_tree_invariants() {
        let board = parse_board("Ah7d2c").unwrap();
        let config = BettingConfig::new(10.0, 50.0, 50.0)
            .with_bet_sizes(&[0.5])
            .with_raise_sizes(&[1.0])
            .with_max_raises(2);
        let builder = GameTreeBuilder::with_pool(config, temp_pool("flop-invariants"));
        let pool = builder.build_tree(&board).unwrap();
        assert!(pool.nodes.len() > 100);

        for i in 0..pool.nodes.len() {
            let node = pool.nodes[i];
            assert!(node.to_call >= 0.0);

            match node.kind {
                NodeKind::Player => {
                    assert!(node.action_count >= 1);
                    for a in 0..node.action_count as usize {
                        let child = pool.child_ids[node.child_start as usize + a];
                        assert!((child as usize) < pool.nodes.len());
                    }
                }
                NodeKind::Chance => {
                    assert!(node.chance_count >= 1);
                    assert!(node.chance_count <= 13);
                    let parent_mask = cards_to_mask(node.board_cards());
                    for c in 0..node.chance_count as usize {
                        let card = pool.chance_cards[node.chance_card_start as usize + c];
                        assert!(!mask_has_card(parent_mask, card));
                        let child = pool.child_ids[node.chance_child_start as usize + c];
                        assert!((child as usize) < pool.nodes.len());
                    }
                }
                NodeKind::Terminal => {
                    assert_eq!(node.action_count, 0);
                }
            }

            // Board cards are always distinct.
            let board_cards = node.board_cards();
            let mask = cards_to_mask(board_cards);
            assert_eq!(mask.count_ones() as usize, board_cards.len());
        }
    }

    #[test]
    fn test_fold_terminal_shape() {
        let board = parse_board("2c7d9hAhKd").unwrap();
        let builder = GameTreeBuilder::with_pool(river_config(&[0.5], 1), temp_pool("fold"));
        let pool = builder.build_tree(&board).unwrap();

        let root = pool.nodes[0];
        // Root bet child: IP faces the bet with fold first.
        let facing = pool.nodes[pool.child_ids[root.child_start as usize + 1] as usize];
        assert!(facing.is_player());
        assert_eq!(facing.player, 1);
        assert!(facing.to_call > 0.0);
        assert_eq!(pool.actions[facing.action_start as usize].kind, ActionKind::Fold);

        let fold_terminal = pool.nodes[pool.child_ids[facing.child_start as usize] as usize];
        assert!(fold_terminal.is_terminal());
        assert_eq!(fold_terminal.pot, 0.0);
        // OOP bet 50 off a 100 stack into the 100 pot, then collected the
        // 150 pot when IP folded without investing.
        assert_eq!(fold_terminal.stacks, [200.0, 100.0]);
    }

    #[test]
    fn test_deterministic_build() {
        let board = parse_board("Ah7d2c").unwrap();
        let config = BettingConfig::new(10.0, 100.0, 100.0)
            .with_bet_sizes(&[0.5, 1.0])
            .with_raise_sizes(&[1.0])
            .with_max_raises(2);

        let pool_a = GameTreeBuilder::with_pool(config.clone(), temp_pool("det-a"))
            .build_tree(&board)
            .unwrap();
        let pool_b = GameTreeBuilder::with_pool(config, temp_pool("det-b"))
            .build_tree(&board)
            .unwrap();

        assert_eq!(pool_a.nodes.len(), pool_b.nodes.len());
        assert_eq!(pool_a.nodes.as_slice(), pool_b.nodes.as_slice());
        assert_eq!(pool_a.actions.as_slice(), pool_b.actions.as_slice());
        assert_eq!(pool_a.child_ids.as_slice(), pool_b.child_ids.as_slice());
        assert_eq!(pool_a.chance_cards.as_slice(), pool_b.chance_cards.as_slice());
    }

    #[test]
    fn test_node_capacity_overflow_names_file() {
        let dir = std::env::temp_dir().join(format!("solver-core-{}-ovf", std::process::id()));
        let capacity = PoolCapacity {
            nodes: 100,
            actions: 1 << 16,
            child_ids: 1 << 16,
            chance_cards: 1 << 12,
        };
        let pool = TreeDataPool::with_capacity(&dir, capacity).unwrap();
        let config = BettingConfig::new(10.0, 100.0, 100.0)
            .with_bet_sizes(&[0.5, 1.0])
            .with_raise_sizes(&[1.0])
            .with_max_raises(3);
        let board = parse_board("Ah7d2c").unwrap();

        let err = GameTreeBuilder::with_pool(config, pool)
            .build_tree(&board)
            .unwrap_err();
        match err {
            SolverError::BufferOverflow { file, limit } => {
                assert_eq!(file, "nodes.bin");
                assert_eq!(limit, 100);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_invalid_board_size_rejected() {
        let builder = GameTreeBuilder::with_pool(river_config(&[0.5], 1), temp_pool("bad-board"));
        let err = builder.build_tree(&[0, 4]).unwrap_err();
        assert!(matches!(err, SolverError::InvalidBoardSize(2)));
    }
}
