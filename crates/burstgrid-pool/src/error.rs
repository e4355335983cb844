//! Pool client errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
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

    #[error("unparsable pod listing: {detail}")]
    Parse { detail: String },

    #[error("launching pod {name}: {source}")]
    Launch {
        name: String,
        #[source]
        source: Box<PoolError>,
    },
}

pub type PoolResult<T> = Result<T, PoolError>;
