//! Queue client errors.

use thiserror::Error;

/// Demand-side failures. Any of these aborts the whole measurement; a
/// partial demand picture must never drive provisioning.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("failed to run {bin}: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{bin} exited with {status}: {stderr}")]
    Exit {
        bin: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("unparsable response from {bin}: {source}")]
    Parse {
        bin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid pattern {pattern:?}: {source}")]
    BadPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

pub type QueueResult<T> = Result<T, QueueError>;
