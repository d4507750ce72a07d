use super::plan;
use crate::chess::error::ReplayError;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, trace};

/// Receives each scheduled ply. Returning `Break` stops the replay early.
pub trait ReplayTarget: Send + 'static {
    fn advance(&mut self, ply: usize) -> ControlFlow<()>;
}

impl<F> ReplayTarget for F
where
    F: FnMut(usize) -> ControlFlow<()> + Send + 'static,
{
    fn advance(&mut self, ply: usize) -> ControlFlow<()> {
        self(ply)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    Idle,
    Scheduled,
    Running,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// Every ply fired and the grace delay passed.
    Completed,
    Cancelled,
    /// The target asked to stop after applying `ply`.
    Stopped { ply: usize },
}

/// Resolves once the schedule it belongs to completes, stops, or is
/// cancelled. Cancellation always resolves it.
pub struct Completion(oneshot::Receiver<ReplayOutcome>);

impl Completion {
    pub async fn wait(self) -> ReplayOutcome {
        self.0.await.unwrap_or(ReplayOutcome::Cancelled)
    }
}

struct Inner {
    state: ReplayState,
    /// Bumped on every schedule and cancel; a driver only reports while its
    /// generation is current.
    generation: u64,
    done: Option<oneshot::Sender<ReplayOutcome>>,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

fn report(inner: &Mutex<Inner>, generation: u64, outcome: ReplayOutcome) {
    let mut guard = lock(inner);
    if guard.generation != generation {
        return;
    }
    guard.state = ReplayState::Idle;
    if let Some(done) = guard.done.take() {
        let _ = done.send(outcome);
    }
}

fn mark_running(inner: &Mutex<Inner>, generation: u64) -> bool {
    let mut guard = lock(inner);
    if guard.generation != generation {
        return false;
    }
    guard.state = ReplayState::Running;
    true
}

/// Owns at most one active replay. Timers run on the Tokio runtime the
/// schedule was created from.
pub struct ReplayScheduler {
    grace: Duration,
    inner: Arc<Mutex<Inner>>,
    driver: Option<JoinHandle<()>>,
}

impl ReplayScheduler {
    /// `grace` is the pause after the final ply before completion resolves.
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            inner: Arc::new(Mutex::new(Inner {
                state: ReplayState::Idle,
                generation: 0,
                done: None,
            })),
            driver: None,
        }
    }

    pub fn state(&self) -> ReplayState {
        lock(&self.inner).state
    }

    /// Schedules plies `start_ply..timeouts.len()`, replacing any active
    /// replay. Must be called from within a Tokio runtime.
    pub fn schedule<T: ReplayTarget>(
        &mut self,
        timeouts: &[f64],
        start_ply: usize,
        mut target: T,
    ) -> Result<Completion, ReplayError> {
        let delays = plan(timeouts, start_ply)?;
        self.cancel();

        let (done, completion) = oneshot::channel();
        let generation = {
            let mut guard = lock(&self.inner);
            guard.generation += 1;
            guard.state = ReplayState::Scheduled;
            guard.done = Some(done);
            guard.generation
        };

        if delays.is_empty() {
            report(&self.inner, generation, ReplayOutcome::Completed);
            return Ok(Completion(completion));
        }

        debug!(start_ply, plies = delays.len(), "replay scheduled");

        let inner = Arc::clone(&self.inner);
        let grace = self.grace;
        let origin = Instant::now();
        self.driver = Some(tokio::spawn(async move {
            for (offset, delay) in delays.into_iter().enumerate() {
                sleep_until(origin + delay).await;
                if !mark_running(&inner, generation) {
                    return;
                }

                let ply = start_ply + offset;
                trace!(ply, "replay tick");
                if target.advance(ply).is_break() {
                    debug!(ply, "replay stopped by target");
                    report(&inner, generation, ReplayOutcome::Stopped { ply });
                    return;
                }
            }

            sleep(grace).await;
            report(&inner, generation, ReplayOutcome::Completed);
        }));

        Ok(Completion(completion))
    }

    /// Drops every pending tick and resolves the outstanding completion.
    pub fn cancel(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }

        let mut guard = lock(&self.inner);
        guard.generation += 1;
        if matches!(guard.state, ReplayState::Scheduled | ReplayState::Running) {
            guard.state = ReplayState::Cancelled;
            debug!("replay cancelled");
        }
        if let Some(done) = guard.done.take() {
            let _ = done.send(ReplayOutcome::Cancelled);
        }
    }
}

impl Drop for ReplayScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
