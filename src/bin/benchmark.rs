use clap::Parser;
use flexi_logger::Logger;
use hexfort::{BoardState, Mcts, PlayoutPolicy, SearchConfig, SearchStatistics};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about = "Measure MCTS throughput on the opening position")]
struct Args {
    /// Board size (default: 12)
    #[arg(long, default_value_t = 12)]
    board_size: usize,

    /// Search duration in seconds (default: 5)
    #[arg(long, default_value_t = 5)]
    duration: u64,

    /// Thread counts to compare, e.g. `--threads 1 --threads 8` (0 = all cores)
    #[arg(long, default_values_t = [1, 0])]
    threads: Vec<usize>,

    /// Use uniformly random playouts instead of heuristic ones.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    random_playouts: bool,

    /// Also time cloning and undo-log replay of a random game.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    board_ops: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    Logger::try_with_env_or_str("warn")?.start()?;

    println!("Hexfort - Benchmark Tool");
    println!("========================");
    println!("Board: {}x{}", args.board_size, args.board_size);
    println!("Duration: {} seconds", args.duration);
    println!(
        "Playouts: {}",
        if args.random_playouts { "random" } else { "heuristic" }
    );
    println!("------------------------");

    #[cfg(debug_assertions)]
    println!(
        "WARNING: Running in debug mode. Performance will be significantly lower.\n\
         Use --release for accurate benchmarks.\n"
    );

    let board = BoardState::new(args.board_size)?;

    for &threads in &args.threads {
        let config = SearchConfig {
            time_budget: Duration::from_secs(args.duration),
            parallelism: threads,
            playout: if args.random_playouts {
                PlayoutPolicy::Random
            } else {
                PlayoutPolicy::Heuristic
            },
            seed: Some(42),
            ..SearchConfig::default()
        };
        let label = match threads {
            0 => format!("{} threads (all cores)", num_cpus::get()),
            1 => "1 thread".to_string(),
            n => format!("{n} threads"),
        };
        println!("\nRunning search with {label}...");
        let mcts = Mcts::new(&board, config);
        let (mv, stats) = mcts.search();
        if let Some(mv) = mv {
            println!("  Chosen move: {mv}");
        }
        print_stats(&label, &stats);
    }

    if args.board_ops {
        bench_board_ops(&board);
    }
    Ok(())
}

fn print_stats(name: &str, stats: &SearchStatistics) {
    let secs = stats.elapsed.as_secs_f64();
    println!("{} Results:", name);
    println!("  Iterations: {}", stats.iterations);
    println!("  Tree Nodes: {}", stats.tree_nodes);
    println!("  Time: {:.3}s", secs);
    println!("  IPS: {:.0} iterations/sec", stats.iterations_per_second());
    println!("  Root Games: {}", stats.root_games);
}

/// Compare full clones with undo-log replay over one random game.
fn bench_board_ops(board: &BoardState) {
    use rand::seq::IndexedRandom;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
    let mut game = board.clone();
    game.enable_undo_log();
    let mut moves = 0;
    let start = Instant::now();
    while game.status().is_ok() && moves < 1_000 {
        let mv = game.all_possible_moves(game.turn()).choose(&mut rng).copied();
        game.apply_move(mv);
        moves += 1;
    }
    let play = start.elapsed();

    let start = Instant::now();
    while game.undo_move() {}
    let undo = start.elapsed();

    let start = Instant::now();
    for _ in 0..moves {
        std::hint::black_box(board.clone());
    }
    let clone = start.elapsed();

    println!("\nBoard operations over {moves} moves:");
    println!("  Apply (logged): {:?}/move", play / moves.max(1));
    println!("  Undo:           {:?}/move", undo / moves.max(1));
    println!("  Clone:          {:?}/copy", clone / moves.max(1));
}
