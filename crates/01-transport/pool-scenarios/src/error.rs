use std::path::PathBuf;

use block_pool::PoolError;
use thiserror::Error;

pub type ScenarioResult<T> = Result<T, ScenarioError>;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("invalid scenario config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scenario asks for {requested} items, more than the limit of {limit}")]
    TooManyItems { requested: u64, limit: u32 },

    #[error("{role} gave up waiting after {completed} of {expected} items")]
    Starved {
        role: &'static str,
        completed: u32,
        expected: u32,
    },

    #[error("{role} thread panicked")]
    Panicked { role: &'static str },

    #[error("scenario check failed: {0}")]
    Check(String),
}
