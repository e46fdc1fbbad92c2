use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the dataset, feed and metrics layers.
#[derive(Debug, Error)]
pub enum DataError {
    /// The catalog has no dataset under this name.
    #[error("dataset not found in catalog: {name}")]
    NotFound { name: String },
    /// A feed resolver was called before the pipeline initializer ran.
    #[error("feed resolver used before the pipeline was initialized")]
    NotInitialized,
    /// The feed pointed at an iterator handle the session does not own.
    #[error("unknown iterator handle: {0}")]
    UnknownHandle(String),
    /// The feed carried no value for the iterator placeholder.
    #[error("feed has no iterator handle for placeholder {0}")]
    MissingFeed(String),
    /// The producer behind an iterator stopped.
    #[error("stream {0} is closed")]
    StreamClosed(String),
    #[error("split {split} of dataset {name} has no examples")]
    EmptySplit { name: String, split: &'static str },
    #[error("invalid batch size {0}")]
    InvalidBatchSize(usize),
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("malformed record in {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type DataResult<T> = Result<T, DataError>;

/// Errors raised by subplot layout and figure output.
#[derive(Debug, Error)]
pub enum PlotError {
    #[error("no canonical subplot grid for {0} axes; pass an explicit rows/cols override")]
    UnsupportedSubplotCount(usize),
    #[error("cannot place {count} axes on a {rows}x{cols} grid")]
    GridTooSmall { count: usize, rows: usize, cols: usize },
    #[error("failed to save figure to {}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
