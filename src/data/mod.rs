//! Dataset side of an experiment: catalogs, batched streams, the session
//! that owns them, and the feeds that pick a stream per run.
//!
//! # Submodules
//! - [`catalog`]  named train/test splits (in-memory, CSV directory)
//! - [`stream`]   repeating batched streams with background prefetch
//! - [`session`]  one-shot iterators addressed by string handles
//! - [`feed`]     feed mappings and lazy positional merging
//! - [`pipeline`] two-phase train/test pipeline construction
//! - [`arrays`]   permutation, subsets and batch generation over arrays

pub mod arrays;
pub mod catalog;
pub mod feed;
pub mod pipeline;
pub mod session;
pub mod stream;

pub use catalog::{CsvCatalog, DatasetCatalog, DatasetInfo, DatasetSplits, Example, InMemoryCatalog};
pub use feed::{FeedDict, FeedSource, FeedValue, MergedFeed, ResolveFeed, merge_feed_dicts};
pub use pipeline::{
    DatasetPipeline, FeedResolver, Mode, PipelineConfig, PipelineInit, get_dataset_pipeline,
    load_datasets, prep_iterator,
};
pub use session::{IteratorHandle, NextBatch, Session};
pub use stream::{Batch, BatchStream};
