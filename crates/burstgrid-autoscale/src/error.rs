//! Iteration-level errors.

use thiserror::Error;

use burstgrid_pool::PoolError;
use burstgrid_queue::QueueError;

/// A failure that aborts the whole iteration. Provisioning on a partial
/// measurement is never attempted; the next iteration retries from
/// scratch. Per-class submit failures are not in here, they are handled
/// and logged class-locally by the engine.
#[derive(Debug, Error)]
pub enum IterationError {
    #[error("demand-side query failed: {0}")]
    Demand(#[from] QueueError),

    #[error("supply-side query failed: {0}")]
    Supply(#[from] PoolError),
}
