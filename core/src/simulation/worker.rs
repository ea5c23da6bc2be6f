//! Off-thread simulation runs.
//!
//! A simulation is CPU-bound, so callers that serve requests hand it to
//! a worker thread and keep a `SimulationHandle`. Cancelling the handle
//! flips a shared flag that the sampler polls between batches; the run
//! then returns `Cancelled` without touching anything outside itself.

use super::{MonteCarloSimulator, SimulationRequest, SimulationResult};
use crate::{
    error::{QuantError, QuantResult},
    rng::RandomSource,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Shared, cloneable cancel flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

pub struct SimulationHandle {
    cancel: CancellationToken,
    thread: JoinHandle<QuantResult<SimulationResult>>,
}

impl SimulationHandle {
    /// Best effort: the worker stops at its next batch boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Block until the run finishes, is cancelled, or fails.
    pub fn join(self) -> QuantResult<SimulationResult> {
        self.thread.join().map_err(|_| QuantError::WorkerFailed)?
    }
}

/// Start `request` on its own thread with its own random stream.
///
/// The request is validated up front so bad input fails on the caller's
/// thread instead of inside the worker.
pub fn spawn_simulation<R>(
    simulator: MonteCarloSimulator,
    request: SimulationRequest,
    mut rng: R,
) -> QuantResult<SimulationHandle>
where
    R: RandomSource + Send + 'static,
{
    simulator.validate(&request)?;

    let cancel = CancellationToken::new();
    let worker_cancel = cancel.clone();
    let thread = thread::Builder::new()
        .name("monte-carlo".into())
        .spawn(move || simulator.run_cancellable(&request, &mut rng, &worker_cancel))?;

    Ok(SimulationHandle { cancel, thread })
}
