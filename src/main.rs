//! # Hexfort Match Runner
//!
//! Plays one game between two built-in move sources and prints every move
//! and the final board.
//!
//! ## Usage
//! ```text
//! play --size 9 --white mcts --black heuristic --budget-ms 500 --threads 4
//! ```
//! Set `RUST_LOG=debug` to see per-move search statistics.

use clap::{Parser, ValueEnum};
use colored::Colorize;
use flexi_logger::Logger;
use hexfort::game::{BoardView, MAX_SIZE, MIN_SIZE};
use hexfort::strategies::{HeuristicSource, LookaheadSource, MctsSource, RandomSource};
use hexfort::{
    play_match, Color, FinalSelection, MoveSource, PlayoutPolicy, Player, Position,
    SearchConfig,
};
use std::time::Duration;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SourceKind {
    Random,
    Heuristic,
    Lookahead,
    Mcts,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Playout {
    Random,
    Heuristic,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Selection {
    Max,
    Robust,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Play one hexfort game between two engines")]
struct Args {
    #[arg(short, long, default_value_t = 9,
          value_parser = clap::value_parser!(u8).range(MIN_SIZE as i64..=MAX_SIZE as i64))]
    size: u8,

    #[arg(short, long, value_enum, default_value_t = SourceKind::Mcts)]
    white: SourceKind,

    #[arg(short, long, value_enum, default_value_t = SourceKind::Heuristic)]
    black: SourceKind,

    /// Thinking time per MCTS move.
    #[arg(long, default_value_t = 1000)]
    budget_ms: u64,

    /// Search threads per MCTS player (0 = one per core).
    #[arg(short, long, default_value_t = 1)]
    threads: usize,

    #[arg(short = 'e', long, default_value_t = std::f64::consts::SQRT_2)]
    exploration: f64,

    #[arg(long, value_enum, default_value_t = Playout::Heuristic)]
    playout: Playout,

    #[arg(long, value_enum, default_value_t = Selection::Robust)]
    selection: Selection,

    /// Let MCTS players search during the opponent's turn.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    ponder: bool,

    #[arg(long, default_value_t = 400)]
    max_turns: usize,

    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn search_config(&self, offset: u64) -> SearchConfig {
        SearchConfig {
            time_budget: Duration::from_millis(self.budget_ms),
            exploration: self.exploration,
            parallelism: self.threads,
            playout: match self.playout {
                Playout::Random => PlayoutPolicy::Random,
                Playout::Heuristic => PlayoutPolicy::Heuristic,
            },
            final_selection: match self.selection {
                Selection::Max => FinalSelection::Max,
                Selection::Robust => FinalSelection::Robust,
            },
            ponder: self.ponder,
            seed: self.seed.map(|s| s.wrapping_add(offset)),
            ..SearchConfig::default()
        }
    }

    fn source(&self, kind: SourceKind, offset: u64) -> Box<dyn MoveSource> {
        let seed = self.seed.map(|s| s.wrapping_add(offset));
        match kind {
            SourceKind::Random => Box::new(RandomSource::new(seed)),
            SourceKind::Heuristic => Box::new(HeuristicSource::new(seed)),
            SourceKind::Lookahead => Box::new(LookaheadSource::new(seed)),
            SourceKind::Mcts => Box::new(MctsSource::new(self.search_config(offset))),
        }
    }
}

fn paint(text: String, color: Color) -> String {
    match color {
        Color::White => text.yellow().bold().to_string(),
        Color::Black => text.red().bold().to_string(),
    }
}

/// Rhombus rendering: each row is shifted right by one more half cell.
fn render(view: &dyn BoardView) -> String {
    let size = view.size();
    let mut out = String::from("   ");
    for col in 0..size {
        out.push_str(&format!(" {}", (b'A' + col as u8) as char));
    }
    out.push('\n');
    for row in 1..=size as u8 {
        out.push_str(&format!("{row:>2} {}", " ".repeat(row as usize - 1)));
        for col in 1..=size as u8 {
            let cell = match view.cell(Position::new(col, row)) {
                None => " .".dimmed().to_string(),
                Some(c) if c.is_base => paint(" @".to_string(), c.color),
                Some(c) if c.blocked => {
                    paint(format!(" {}", c.height).underline().to_string(), c.color)
                }
                Some(c) if c.height > 0 => paint(format!(" {}", c.height), c.color),
                Some(c) => paint(" o".to_string(), c.color),
            };
            out.push_str(&cell);
        }
        out.push('\n');
    }
    out
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    Logger::try_with_env_or_str("info")?
        .format(flexi_logger::colored_default_format)
        .start()?;

    let size = args.size as usize;
    let mut white = Player::new(args.source(args.white, 0));
    let mut black = Player::new(args.source(args.black, 1));
    white.init(size, Color::White)?;
    black.init(size, Color::Black)?;

    println!(
        "{} ({}) vs {} ({}) on a {size}x{size} board",
        paint("White".to_string(), Color::White),
        white.name(),
        paint("Black".to_string(), Color::Black),
        black.name()
    );

    let report = play_match(&mut white, &mut black, args.max_turns)?;
    print!("{}", report.controller.format_history());
    println!("{}", render(report.controller.view()));

    match report.outcome {
        Some(outcome) => println!(
            "{} wins by {:?} after {} moves",
            paint(outcome.winner.to_string(), outcome.winner),
            outcome.cause,
            report.turns
        ),
        None => println!("No result after {} moves", report.turns),
    }
    Ok(())
}
