use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::data::model::BaselineKey;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong between the raw statistics file and the
/// differenced cache.
#[derive(Debug, Error)]
pub enum Error {
    /// Raw or cache file missing, unreadable or missing required columns.
    #[error("cannot load {}: {reason}", path.display())]
    DataLoad { path: PathBuf, reason: String },

    /// A projected row has no historical row sharing its key.
    #[error("no historical baseline for {key}")]
    JoinFailure { key: BaselineKey },

    /// More than one historical row shares a key.
    #[error("{count} historical baselines match {key}")]
    AmbiguousBaseline { key: BaselineKey, count: usize },

    /// The computed table could not be written to the cache path.
    #[error("cannot persist cache to {}: {reason}", path.display())]
    CachePersist { path: PathBuf, reason: String },

    #[error("invalid configuration {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },
}

impl Error {
    /// Fold an `anyhow` chain into a [`Error::DataLoad`], keeping every
    /// context layer in the reason.
    pub fn data_load(path: &Path, err: anyhow::Error) -> Self {
        Error::DataLoad {
            path: path.to_path_buf(),
            reason: format!("{err:#}"),
        }
    }

    pub fn cache_persist(path: &Path, err: anyhow::Error) -> Self {
        Error::CachePersist {
            path: path.to_path_buf(),
            reason: format!("{err:#}"),
        }
    }
}
