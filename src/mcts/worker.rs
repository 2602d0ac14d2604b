//! Background search thread.
//!
//! A [`SearchWorker`] owns an [`Mcts`] engine on a dedicated thread and talks
//! to its owner over a pair of channels. With pondering enabled the thread
//! keeps growing the tree in short slices whenever no request is waiting.

use super::{Mcts, SearchConfig, SearchStatistics};
use crate::game::{BoardState, Move};
use log::{debug, trace};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Length of one background search slice between mailbox checks.
const PONDER_SLICE: Duration = Duration::from_millis(20);

/// Messages sent to the search thread.
#[derive(Debug)]
pub enum SearchRequest {
    /// Decide a move for the root position within `budget`. The answer
    /// carries the same `request_id`.
    Search { budget: Duration, request_id: u64 },
    /// A move was played on the real board.
    Advance(Option<Move>),
    /// Start over from another position.
    Reset(BoardState),
    Stop,
}

/// Messages sent back by the search thread.
#[derive(Debug)]
pub enum SearchResponse {
    /// Move, statistics, request_id.
    MoveReady(Option<Move>, SearchStatistics, u64),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkerError {
    #[error("search thread is no longer running")]
    Disconnected,
    #[error("search thread did not answer within {0:?}")]
    Timeout(Duration),
}

/// Handle to a search thread. Dropping it stops and joins the thread.
pub struct SearchWorker {
    handle: Option<JoinHandle<()>>,
    tx: Sender<SearchRequest>,
    rx: Receiver<SearchResponse>,
    next_request_id: AtomicU64,
}

impl SearchWorker {
    pub fn spawn(board: &BoardState, config: SearchConfig) -> Self {
        let (tx_req, rx_req) = channel();
        let (tx_resp, rx_resp) = channel();
        let board = board.clone();

        let handle = std::thread::spawn(move || {
            let ponder = config.ponder;
            let engine = Mcts::new(&board, config);
            run(engine, ponder, rx_req, tx_resp);
        });

        Self {
            handle: Some(handle),
            tx: tx_req,
            rx: rx_resp,
            next_request_id: AtomicU64::new(0),
        }
    }

    /// Ask for a move and block until it arrives. Allows the thread some
    /// slack past `budget` for the final decision. Answers to earlier,
    /// timed-out requests are discarded.
    pub fn request_move(
        &self,
        budget: Duration,
    ) -> Result<(Option<Move>, SearchStatistics), WorkerError> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.send(SearchRequest::Search { budget, request_id })?;
        await_reply(&self.rx, request_id, budget + Duration::from_secs(5))
    }

    pub fn advance(&self, mv: Option<Move>) -> Result<(), WorkerError> {
        self.send(SearchRequest::Advance(mv))
    }

    pub fn reset(&self, board: &BoardState) -> Result<(), WorkerError> {
        self.send(SearchRequest::Reset(board.clone()))
    }

    pub fn stop(&self) {
        let _ = self.tx.send(SearchRequest::Stop);
    }

    fn send(&self, request: SearchRequest) -> Result<(), WorkerError> {
        self.tx.send(request).map_err(|_| WorkerError::Disconnected)
    }
}

impl Drop for SearchWorker {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Wait up to `patience` for the answer to `request_id`, dropping any
/// answer to an older request found on the way.
fn await_reply(
    rx: &Receiver<SearchResponse>,
    request_id: u64,
    patience: Duration,
) -> Result<(Option<Move>, SearchStatistics), WorkerError> {
    let deadline = Instant::now() + patience;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(SearchResponse::MoveReady(mv, stats, id)) if id == request_id => {
                return Ok((mv, stats));
            }
            Ok(SearchResponse::MoveReady(mv, _, id)) => {
                trace!("dropping stale answer {mv:?} to request {id}, waiting for {request_id}");
            }
            Err(RecvTimeoutError::Timeout) => return Err(WorkerError::Timeout(patience)),
            Err(RecvTimeoutError::Disconnected) => return Err(WorkerError::Disconnected),
        }
    }
}

/// Main loop of the search thread. Runs until `Stop` or until the owner
/// hangs up.
fn run(
    mut engine: Mcts,
    ponder: bool,
    rx: Receiver<SearchRequest>,
    tx: Sender<SearchResponse>,
) {
    loop {
        let request = if ponder && engine.board().status().is_ok() {
            match rx.try_recv() {
                Ok(request) => request,
                Err(TryRecvError::Empty) => {
                    let iterations = engine.ponder(PONDER_SLICE);
                    trace!("pondered {iterations} iterations");
                    continue;
                }
                Err(TryRecvError::Disconnected) => break,
            }
        } else {
            match rx.recv() {
                Ok(request) => request,
                Err(_) => break,
            }
        };

        match request {
            SearchRequest::Search { budget, request_id } => {
                let (mv, stats) = engine.search_for(budget);
                if tx.send(SearchResponse::MoveReady(mv, stats, request_id)).is_err() {
                    break;
                }
            }
            SearchRequest::Advance(mv) => {
                engine.advance(mv);
            }
            SearchRequest::Reset(board) => engine.reset(&board),
            SearchRequest::Stop => break,
        }
    }
    debug!("search thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Color, Position};

    fn config(ponder: bool) -> SearchConfig {
        SearchConfig {
            time_budget: Duration::from_millis(30),
            ponder,
            seed: Some(5),
            ..SearchConfig::default()
        }
    }

    #[test]
    fn test_worker_follows_the_game() {
        let mut board = BoardState::new(8).unwrap();
        let worker = SearchWorker::spawn(&board, config(false));
        for _ in 0..4 {
            let (mv, _) = worker.request_move(Duration::from_millis(30)).unwrap();
            let mv = mv.expect("opening positions always have moves");
            assert!(board.is_legal(&mv), "{mv} is not legal for {}", board.turn());
            board.apply_move(Some(mv));
            worker.advance(Some(mv)).unwrap();
        }
        assert_eq!(board.turn(), Color::White);
    }

    #[test]
    fn test_pondering_worker_answers() {
        let board = BoardState::new(8).unwrap();
        let worker = SearchWorker::spawn(&board, config(true));
        std::thread::sleep(Duration::from_millis(60));
        let (mv, stats) = worker.request_move(Duration::from_millis(30)).unwrap();
        assert!(board.is_legal(&mv.unwrap()));
        assert!(stats.root_games as u64 >= stats.iterations);
    }

    #[test]
    fn test_reset_switches_position() {
        let worker = SearchWorker::spawn(&BoardState::new(8).unwrap(), config(false));
        let other = BoardState::new(10).unwrap();
        worker.reset(&other).unwrap();
        let (mv, _) = worker.request_move(Duration::from_millis(30)).unwrap();
        assert!(other.is_legal(&mv.unwrap()));
    }

    #[test]
    fn test_answers_to_older_requests_are_dropped() {
        let stale = Move::new(Position::new(2, 1), Position::new(2, 2));
        let fresh = Move::new(Position::new(1, 2), Position::new(1, 3));
        let (tx, rx) = channel();
        tx.send(SearchResponse::MoveReady(Some(stale), SearchStatistics::default(), 1))
            .unwrap();
        tx.send(SearchResponse::MoveReady(Some(fresh), SearchStatistics::default(), 2))
            .unwrap();

        let (mv, _) = await_reply(&rx, 2, Duration::from_millis(100)).unwrap();
        assert_eq!(mv, Some(fresh));

        tx.send(SearchResponse::MoveReady(Some(stale), SearchStatistics::default(), 2))
            .unwrap();
        let patience = Duration::from_millis(20);
        assert_eq!(await_reply(&rx, 3, patience), Err(WorkerError::Timeout(patience)));
    }
}
