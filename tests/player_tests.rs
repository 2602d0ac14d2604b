use assert_matches::assert_matches;
use hexfort::game::{BoardState, BoardView, Color, Move, Position, Status, WinCause};
use hexfort::player::Phase;
use hexfort::strategies::{HeuristicSource, LookaheadSource, MctsSource, RandomSource};
use hexfort::{play_match, MoveSource, Player, PlayerError, SearchConfig};
use std::time::Duration;

/// Replays a fixed list of moves, then surrenders.
struct Scripted(Vec<Option<Move>>);

impl MoveSource for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn next_move(&mut self, _board: &BoardState) -> Result<Option<Move>, PlayerError> {
        Ok(if self.0.is_empty() { None } else { self.0.remove(0) })
    }
}

fn ready(source: Box<dyn MoveSource>, size: usize, color: Color) -> Player {
    let mut player = Player::new(source);
    player.init(size, color).unwrap();
    player
}

fn mv(from: (u8, u8), to: (u8, u8)) -> Move {
    Move::new(Position::new(from.0, from.1), Position::new(to.0, to.1))
}

#[test]
fn test_random_players_finish_a_match() {
    let mut white = ready(Box::new(RandomSource::new(Some(1))), 7, Color::White);
    let mut black = ready(Box::new(RandomSource::new(Some(2))), 7, Color::Black);
    let report = play_match(&mut white, &mut black, 20_000).unwrap();

    let outcome = report.outcome.expect("random games end well within the limit");
    let board = report.controller.board();
    assert_eq!(board.status(), Status::Win(outcome.winner));
    assert_ne!(outcome.cause, WinCause::IllegalMove);
    assert_eq!(white.phase(), Phase::Finished);
    assert_eq!(black.phase(), Phase::Finished);
}

#[test]
fn test_turn_limit_leaves_match_open() {
    let mut white = ready(Box::new(HeuristicSource::new(Some(3))), 9, Color::White);
    let mut black = ready(Box::new(LookaheadSource::new(Some(4))), 9, Color::Black);
    let report = play_match(&mut white, &mut black, 4).unwrap();
    assert_eq!(report.turns, 4);
    assert_eq!(report.outcome, None);
    assert_eq!(white.phase(), Phase::Request);
    assert_eq!(black.phase(), Phase::Update);
}

#[test]
fn test_illegal_move_forfeits() {
    // White's first move tries to move Black's stone.
    let mut white = ready(Box::new(Scripted(vec![Some(mv((5, 6), (4, 6)))])), 6, Color::White);
    let mut black = ready(Box::new(RandomSource::new(Some(5))), 6, Color::Black);
    let report = play_match(&mut white, &mut black, 10).unwrap();

    let outcome = report.outcome.unwrap();
    assert_eq!(outcome.winner, Color::Black);
    assert_eq!(outcome.cause, WinCause::IllegalMove);
    assert_eq!(report.turns, 1);
    assert_eq!(white.phase(), Phase::Finished);
    assert_eq!(black.phase(), Phase::Finished);
}

#[test]
fn test_surrender_ends_match() {
    let mut white = ready(Box::new(RandomSource::new(Some(6))), 6, Color::White);
    let mut black = ready(Box::new(Scripted(Vec::new())), 6, Color::Black);
    let report = play_match(&mut white, &mut black, 10).unwrap();
    let outcome = report.outcome.unwrap();
    assert_eq!(outcome.winner, Color::White);
    assert_eq!(outcome.cause, WinCause::Surrender);
    assert_eq!(report.turns, 2);
}

#[test]
fn test_out_of_cycle_calls_fail_loudly() {
    let mut player = ready(Box::new(RandomSource::new(Some(7))), 6, Color::White);
    assert_matches!(
        player.update(None, Status::Ok),
        Err(PlayerError::Protocol { call: "update", phase: Phase::Request })
    );
    assert_matches!(
        player.confirm(Status::Ok),
        Err(PlayerError::Protocol { call: "confirm", .. })
    );

    player.request().unwrap();
    assert_matches!(
        player.request(),
        Err(PlayerError::Protocol { call: "request", phase: Phase::Confirm })
    );
    player.confirm(Status::Ok).unwrap();
    assert_eq!(player.phase(), Phase::Update);
}

#[test]
fn test_status_disagreement_is_reported() {
    let mut black = ready(Box::new(RandomSource::new(Some(8))), 6, Color::Black);
    let opening = mv((2, 1), (2, 2));
    assert_matches!(
        black.update(Some(opening), Status::Win(Color::White)),
        Err(PlayerError::StatusMismatch { reported: Status::Win(Color::White), local: Status::Ok })
    );
}

#[test]
fn test_restart_with_init() {
    let mut player = ready(Box::new(RandomSource::new(Some(9))), 6, Color::White);
    player.request().unwrap();
    player.init(8, Color::Black).unwrap();
    assert_eq!(player.phase(), Phase::Update);
    assert_eq!(player.view().unwrap().size(), 8);
    assert_matches!(player.init(30, Color::White), Err(PlayerError::Board(_)));
}

#[test]
fn test_search_player_follows_the_game() {
    let config = SearchConfig {
        time_budget: Duration::from_millis(30),
        ponder: true,
        seed: Some(10),
        ..SearchConfig::default()
    };
    let mut white = ready(Box::new(MctsSource::new(config)), 7, Color::White);
    let mut black = ready(Box::new(HeuristicSource::new(Some(11))), 7, Color::Black);
    let report = play_match(&mut white, &mut black, 12).unwrap();
    assert!(report.turns > 0);
    if let Some(outcome) = report.outcome {
        assert_ne!(outcome.cause, WinCause::IllegalMove);
    }
}
