//! End-to-end scenarios exercising the builder and the solver together.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use solver_core::poker::{parse_board, parse_range};
use solver_core::{
    BettingConfig, CfrConfig, CfrEngine, PoolCapacity, SolverError, TreeDataPool,
};

fn temp_pool(tag: &str) -> TreeDataPool {
    let dir: PathBuf =
        std::env::temp_dir().join(format!("solver-core-e2e-{}-{}", std::process::id(), tag));
    let capacity = PoolCapacity {
        nodes: 1 << 21,
        actions: 1 << 22,
        child_ids: 1 << 22,
        chance_cards: 1 << 19,
    };
    TreeDataPool::with_capacity(&dir, capacity).unwrap()
}

fn engine_with(
    tag: &str,
    config: &BettingConfig,
    board_str: &str,
    oop: &str,
    ip: &str,
    samples: usize,
) -> CfrEngine {
    let board = parse_board(board_str).unwrap();
    let mut engine = CfrEngine::new(CfrConfig {
        base_sample_size: samples,
        ..CfrConfig::default()
    })
    .unwrap();
    engine.build_tree_in(config, &board, temp_pool(tag)).unwrap();
    engine.set_oop_range(parse_range(oop).unwrap());
    engine.set_ip_range(parse_range(ip).unwrap());
    engine.set_board(&board).unwrap();
    engine
}

/// Check-only river: a single forced line, so nothing can accumulate regret.
#[test]
fn single_action_river_has_zero_regret() {
    let config = BettingConfig::new(100.0, 100.0, 100.0)
        .with_bet_sizes(&[0.5])
        .with_raise_sizes(&[])
        .with_max_raises(0);
    let mut engine = engine_with("single-action", &config, "2c2d2h7s9c", "AA", "KK", 32);

    engine.solve(1, None).unwrap();

    assert_eq!(engine.get_regret_history().len(), 1);
    assert!(engine.get_average_regret().abs() < 1e-6);

    // The lone path still defines an average strategy for every live combo.
    let strategies = engine.get_node_hand_strategies(0).unwrap();
    let aa = strategies.get("AA").expect("AA should be present");
    assert_eq!(aa.len(), 1);
    assert!(aa[0] > 0.0);
}

/// Nut-heavy range versus air: the favorite has to bet.
#[test]
fn ak_versus_trash_bets_the_flop() {
    let config = BettingConfig::new(100.0, 100.0, 100.0)
        .with_bet_sizes(&[0.5])
        .with_raise_sizes(&[1.0])
        .with_max_raises(2);
    let mut engine = engine_with("ak-vs-72", &config, "AcKcQh", "AKo,AA", "72o", 16);

    engine.solve(500, None).unwrap();

    let root = engine.get_node_data(0).unwrap();
    assert_eq!(root.kind, "player");
    assert_eq!(root.player, 0);

    let strategies = engine.get_node_hand_strategies(0).unwrap();
    let ak = strategies.get("AKo").expect("AKo should have a strategy");
    assert_eq!(ak.len(), root.actions.len());

    let total: f32 = ak.iter().sum();
    assert!(total > 0.0);
    let aggressive: f32 = root
        .actions
        .iter()
        .zip(ak.iter())
        .filter(|(name, _)| {
            name.starts_with("bet") || name.starts_with("raise") || name.starts_with("allin")
        })
        .map(|(_, &mass)| mass)
        .sum();
    assert!(
        aggressive / total > 0.5,
        "AKo should bet most of the time, got {:.3}",
        aggressive / total
    );

    // Every shorthand of the OOP range shows up with a full-length vector.
    for hand in ["AKo", "AA"] {
        let strategy = strategies.get(hand).expect("missing shorthand");
        assert_eq!(strategy.len(), root.actions.len());
    }
}

/// Identical configs must produce bitwise-identical arenas.
#[test]
fn repeated_builds_are_deterministic() {
    let board = parse_board("Ah7d2c").unwrap();
    let config = BettingConfig::new(10.0, 100.0, 100.0)
        .with_bet_sizes(&[0.5, 1.0])
        .with_raise_sizes(&[1.0])
        .with_max_raises(3);
    // Spot-tune the later streets the way a host would.
    let config = BettingConfig {
        turn_bet_sizes: vec![0.75],
        turn_raise_sizes: vec![0.75],
        river_bet_sizes: vec![0.75],
        river_raise_sizes: vec![0.75],
        ..config
    };

    let mut first = CfrEngine::new(CfrConfig::default()).unwrap();
    first
        .build_tree_in(&config, &board, temp_pool("det-1"))
        .unwrap();
    let mut second = CfrEngine::new(CfrConfig::default()).unwrap();
    second
        .build_tree_in(&config, &board, temp_pool("det-2"))
        .unwrap();

    assert!(first.node_count() > 1000);
    assert_eq!(first.node_count(), second.node_count());
    for id in (0..first.node_count()).step_by(97) {
        let a = first.get_node_data(id as i32).unwrap();
        let b = second.get_node_data(id as i32).unwrap();
        assert_eq!(a.pot, b.pot);
        assert_eq!(a.stacks, b.stacks);
        assert_eq!(a.actions, b.actions);
        assert_eq!(a.child_ids, b.child_ids);
        assert_eq!(a.chance_child_ids, b.chance_child_ids);
    }
}

/// A 100-node budget cannot hold a real flop tree.
#[test]
fn tiny_node_capacity_overflows_with_file_name() {
    let dir: PathBuf =
        std::env::temp_dir().join(format!("solver-core-e2e-{}-overflow", std::process::id()));
    let pool = TreeDataPool::with_capacity(
        &dir,
        PoolCapacity {
            nodes: 100,
            actions: 1 << 16,
            child_ids: 1 << 16,
            chance_cards: 1 << 12,
        },
    )
    .unwrap();

    let board = parse_board("Ah7d2c").unwrap();
    let config = BettingConfig::new(10.0, 100.0, 100.0)
        .with_bet_sizes(&[0.5, 1.0])
        .with_raise_sizes(&[1.0])
        .with_max_raises(3);

    let mut engine = CfrEngine::new(CfrConfig::default()).unwrap();
    let err = engine.build_tree_in(&config, &board, pool).unwrap_err();
    match err {
        SolverError::BufferOverflow { file, limit } => {
            assert_eq!(file, "nodes.bin");
            assert_eq!(limit, 100);
        }
        other => panic!("unexpected error: {}", other),
    }
}

/// `stop()` from another thread lands within one iteration.
#[test]
fn cancellation_returns_promptly() {
    let config = BettingConfig::new(100.0, 100.0, 100.0)
        .with_bet_sizes(&[0.5])
        .with_raise_sizes(&[1.0])
        .with_max_raises(2);
    let mut engine = engine_with("cancel", &config, "2c7d9hTsKd", "AA,KK,QQ", "JJ,TT", 8);

    let handle = engine.stop_handle();
    let progress = Arc::new(AtomicU32::new(0));
    let progress_in_thread = Arc::clone(&progress);

    let worker = std::thread::spawn(move || {
        let callback = move |current: u32, _total: u32| {
            progress_in_thread.store(current, Ordering::SeqCst);
        };
        engine.solve(10_000, Some(&callback)).unwrap();
        engine.get_regret_history().len() as u32
    });

    // Wait until the solve has demonstrably made progress, then cancel.
    while progress.load(Ordering::SeqCst) < 20 {
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
    handle.stop();
    let seen_after_stop = progress.load(Ordering::SeqCst);

    let completed = worker.join().expect("solver thread panicked");
    assert!(completed >= 20);
    assert!(completed < 10_000, "stop was ignored");
    assert!(
        completed <= seen_after_stop + 1,
        "solve ran {} iterations past the stop signal",
        completed.saturating_sub(seen_after_stop)
    );
}

/// The average-regret proxy trends down as sampling accumulates.
#[test]
fn average_regret_trends_down() {
    let config = BettingConfig::new(100.0, 100.0, 100.0)
        .with_bet_sizes(&[0.5])
        .with_raise_sizes(&[1.0])
        .with_max_raises(2);
    let mut engine = engine_with(
        "monotone",
        &config,
        "2c7d9hTsKd",
        "AA,KK,QQ,AKs",
        "JJ,TT,99",
        32,
    );

    engine.solve(240, None).unwrap();
    let history = engine.get_regret_history();
    assert_eq!(history.len(), 240);

    let window = 20;
    let early: f32 = history[20..20 + window].iter().sum::<f32>() / window as f32;
    let late: f32 = history[history.len() - window..].iter().sum::<f32>() / window as f32;
    assert!(
        late <= early * 1.05,
        "average regret should not trend up: early {:.5}, late {:.5}",
        early,
        late
    );
}
