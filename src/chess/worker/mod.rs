//! Background worker that owns the loaded games. Splitting, metadata,
//! filtering and per-game parsing all run on its thread; callers talk to it
//! through [`WorkerClient`] and correlate responses by request id.

mod protocol;

pub use protocol::{GamePayload, LoadSummary, Request, Response};

use super::error::WorkerError;
use super::filter::{FilterCriteria, MoveCache, filter};
use super::loader::load_game;
use super::metadata::extract;
use super::reader::split;
use super::types::{GameMetadata, GameRecord};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const THREAD_NAME: &str = "pgn-worker";

/// Everything the worker keeps between requests. A load replaces all of it.
#[derive(Default)]
struct WorkerState {
    games: Vec<GameRecord>,
    metadata: Vec<GameMetadata>,
    cache: MoveCache,
}

impl WorkerState {
    fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::Load { payload, id } => Response::Load {
                payload: self.load(&payload),
                id,
            },
            Request::Filter { payload, id } => Response::Filter {
                payload: filter(&payload, &self.games, &self.metadata, &mut self.cache),
                id,
            },
            Request::LoadGame { payload, id } => match self.games.get(payload) {
                Some(record) => Response::LoadGame {
                    payload: match load_game(record) {
                        Ok(game) => game.into(),
                        Err(err) => GamePayload::failed(err.raw_pgn, err.reasons),
                    },
                    id,
                },
                None => Response::Error {
                    payload: format!(
                        "Game index {} out of range ({} games loaded)",
                        payload,
                        self.games.len()
                    ),
                    id,
                },
            },
        }
    }

    fn load(&mut self, blob: &str) -> LoadSummary {
        self.cache.clear();
        self.games = split(blob);
        self.metadata = self
            .games
            .iter()
            .map(|game| extract(&game.raw_pgn, game.index))
            .collect();

        info!(games = self.games.len(), bytes = blob.len(), "PGN loaded");
        LoadSummary::from_metadata(self.metadata.clone())
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "worker handler panicked".to_string()
    }
}

/// Runs `handler`, turning a panic into an `error` response. Only a load
/// can leave the state half-built, so only a failed load resets it.
fn respond<H>(state: &mut WorkerState, request: Request, handler: H) -> Response
where
    H: FnOnce(&mut WorkerState, Request) -> Response,
{
    let id = request.id();
    let reloads = matches!(request, Request::Load { .. });
    panic::catch_unwind(AssertUnwindSafe(|| handler(state, request))).unwrap_or_else(|panic| {
        let payload = panic_message(panic);
        warn!(id, error = %payload, "worker request failed");
        if reloads {
            *state = WorkerState::default();
        }
        Response::Error { payload, id }
    })
}

fn run(mut requests: mpsc::UnboundedReceiver<Request>, responses: mpsc::UnboundedSender<Response>) {
    let mut state = WorkerState::default();

    while let Some(request) = requests.blocking_recv() {
        let response = respond(&mut state, request, WorkerState::handle);
        if responses.send(response).is_err() {
            break;
        }
    }

    debug!("worker channel closed, exiting");
}

/// Handle to one background worker. Dropping it shuts the worker down.
pub struct WorkerClient {
    requests: mpsc::UnboundedSender<Request>,
    responses: mpsc::UnboundedReceiver<Response>,
    next_id: u64,
}

impl WorkerClient {
    /// Starts the worker thread. Fails with `Unavailable` when the thread
    /// cannot be created.
    pub fn spawn() -> Result<Self, WorkerError> {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();

        thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run(request_rx, response_tx))
            .map_err(|err| WorkerError::Unavailable(err.to_string()))?;

        Ok(Self {
            requests: request_tx,
            responses: response_rx,
            next_id: 0,
        })
    }

    /// Sends a request without waiting for its answer and returns its id.
    /// Ids increase with every call.
    pub fn submit(&mut self, build: impl FnOnce(u64) -> Request) -> Result<u64, WorkerError> {
        self.next_id += 1;
        let id = self.next_id;
        self.requests
            .send(build(id))
            .map_err(|_| WorkerError::Disconnected)?;
        Ok(id)
    }

    /// Waits for the response to request `id`. Responses to any other id are
    /// stale and dropped.
    pub async fn response_to(&mut self, id: u64) -> Result<Response, WorkerError> {
        loop {
            let response = self.responses.recv().await.ok_or(WorkerError::Disconnected)?;
            if response.id() == id {
                return Ok(response);
            }
            debug!(id = response.id(), kind = response.kind(), "dropping stale worker response");
        }
    }

    async fn call(&mut self, build: impl FnOnce(u64) -> Request) -> Result<Response, WorkerError> {
        let id = self.submit(build)?;
        match self.response_to(id).await? {
            Response::Error { payload, .. } => Err(WorkerError::Remote(payload)),
            response => Ok(response),
        }
    }

    pub async fn load(&mut self, pgn: String) -> Result<LoadSummary, WorkerError> {
        match self.call(|id| Request::Load { payload: pgn, id }).await? {
            Response::Load { payload, .. } => Ok(payload),
            other => Err(WorkerError::UnexpectedResponse(other.id())),
        }
    }

    pub async fn filter(&mut self, criteria: FilterCriteria) -> Result<Vec<usize>, WorkerError> {
        match self.call(|id| Request::Filter { payload: criteria, id }).await? {
            Response::Filter { payload, .. } => Ok(payload),
            other => Err(WorkerError::UnexpectedResponse(other.id())),
        }
    }

    pub async fn load_game(&mut self, index: usize) -> Result<GamePayload, WorkerError> {
        match self.call(|id| Request::LoadGame { payload: index, id }).await? {
            Response::LoadGame { payload, .. } => Ok(payload),
            other => Err(WorkerError::UnexpectedResponse(other.id())),
        }
    }
}
