//! Train/test dataset pipelines switched by iterator handle.
//!
//! Building a pipeline is two-phase. [`get_dataset_pipeline`] plans the
//! streams and hands back feed resolvers that are not usable yet; running
//! [`PipelineInit::run`] against a [`Session`] starts the streams, binds
//! their handles and makes the resolvers live.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::info;

use crate::data::catalog::DatasetCatalog;
use crate::data::feed::{FeedDict, FeedSource, FeedValue, ResolveFeed};
use crate::data::session::{IteratorHandle, NextBatch, Session};
use crate::data::stream::{StreamPlan, StreamSpec};
use crate::error::{DataError, DataResult};

/// Feed key of the iterator-handle placeholder.
pub const HANDLE_KEY: &str = "iterator_handle";

pub const TRAIN_PREFETCH: usize = 4;
pub const TEST_PREFETCH: usize = 2;

/// Batching policy for both splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub batch_size: usize,
    /// `<= 0` serves the whole shuffled test split as a single batch.
    pub test_batch_size: i64,
    pub train_prefetch: usize,
    pub test_prefetch: usize,
    pub seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            test_batch_size: 0,
            train_prefetch: TRAIN_PREFETCH,
            test_prefetch: TEST_PREFETCH,
            seed: None,
        }
    }
}

/// Which split a feed selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Test,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Train => f.write_str("train"),
            Mode::Test => f.write_str("test"),
        }
    }
}

/// Planned (not yet running) train and test streams.
#[derive(Debug, Clone)]
pub struct DatasetStreams {
    pub train: StreamPlan,
    pub test: StreamPlan,
}

/// Load `name` from the catalog and plan its train and test streams.
///
/// Train: shuffled over the full split, repeated, batched at `batch_size`.
/// Test: when `test_batch_size <= 0`, shuffled and batched as one block
/// holding the whole split; otherwise repeated and batched in order.
pub fn load_datasets(
    catalog: &dyn DatasetCatalog,
    name: &str,
    config: &PipelineConfig,
) -> DataResult<DatasetStreams> {
    if config.batch_size == 0 {
        return Err(DataError::InvalidBatchSize(0));
    }
    let splits = catalog.load(name)?;
    let test_size = splits.info.test.num_examples;
    let feature_len = splits.info.feature_len;

    let train = StreamPlan {
        name: format!("{name}-train"),
        examples: Arc::new(splits.train),
        feature_len,
        spec: StreamSpec {
            shuffle: true,
            batch_size: config.batch_size,
            prefetch: config.train_prefetch,
            seed: config.seed,
        },
    };

    let whole_split = config.test_batch_size <= 0;
    let test = StreamPlan {
        name: format!("{name}-test"),
        examples: Arc::new(splits.test),
        feature_len,
        spec: StreamSpec {
            shuffle: whole_split,
            batch_size: if whole_split {
                test_size
            } else {
                config.test_batch_size as usize
            },
            prefetch: config.test_prefetch,
            seed: config.seed.map(|s| s.wrapping_add(1)),
        },
    };

    info!(
        name,
        batch_size = train.spec.batch_size,
        test_batch_size = test.spec.batch_size,
        "planned dataset streams"
    );
    Ok(DatasetStreams { train, test })
}

#[derive(Debug, Clone)]
struct BoundHandles {
    train: IteratorHandle,
    test: IteratorHandle,
}

/// Zero-argument resolver producing the feed that selects one split.
#[derive(Debug, Clone)]
pub struct FeedResolver {
    mode: Mode,
    handles: Arc<OnceLock<BoundHandles>>,
}

impl FeedResolver {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The feed for this split, or [`DataError::NotInitialized`] before init.
    pub fn resolve(&self) -> DataResult<FeedDict> {
        let handles = self.handles.get().ok_or(DataError::NotInitialized)?;
        let handle = match self.mode {
            Mode::Train => &handles.train,
            Mode::Test => &handles.test,
        };
        let mut feed = FeedDict::new();
        feed.insert(HANDLE_KEY.to_string(), FeedValue::Handle(handle.clone()));
        Ok(feed)
    }
}

impl ResolveFeed for FeedResolver {
    fn resolve(&self) -> DataResult<FeedDict> {
        FeedResolver::resolve(self)
    }
}

impl From<FeedResolver> for FeedSource {
    fn from(resolver: FeedResolver) -> Self {
        FeedSource::Deferred(Arc::new(resolver))
    }
}

/// One-shot initializer binding the planned streams to a session.
#[derive(Debug)]
pub struct PipelineInit {
    streams: DatasetStreams,
    handles: Arc<OnceLock<BoundHandles>>,
}

impl PipelineInit {
    /// Start both streams inside `session` and bind their handles.
    ///
    /// Nothing is registered unless both streams start.
    pub fn run(self, session: &mut Session) -> DataResult<()> {
        let train = self.streams.train.start()?;
        let test = self.streams.test.start()?;
        let train = session.register(train);
        let test = session.register(test);
        info!(%train, %test, "bound pipeline iterators");
        // A fresh OnceLock is only ever set here, and `self` is consumed.
        let _ = self.handles.set(BoundHandles { train, test });
        Ok(())
    }
}

/// Symbolic inputs, the two mode resolvers and their initializer.
#[derive(Debug)]
pub struct DatasetPipeline {
    pub next_batch: NextBatch,
    pub train_feed: FeedResolver,
    pub test_feed: FeedResolver,
    pub init: PipelineInit,
}

impl DatasetPipeline {
    /// `[train, test]` as a feed sequence for [`merge_feed_dicts`](crate::data::feed::merge_feed_dicts).
    pub fn feed_sequence(&self) -> Vec<FeedSource> {
        vec![self.train_feed.clone().into(), self.test_feed.clone().into()]
    }
}

/// Wrap planned streams into a handle-switched pipeline.
pub fn prep_iterator(streams: DatasetStreams) -> DatasetPipeline {
    let handles = Arc::new(OnceLock::new());
    let next_batch = NextBatch {
        handle_key: HANDLE_KEY.to_string(),
        feature_len: streams.train.feature_len,
    };
    DatasetPipeline {
        next_batch,
        train_feed: FeedResolver {
            mode: Mode::Train,
            handles: Arc::clone(&handles),
        },
        test_feed: FeedResolver {
            mode: Mode::Test,
            handles: Arc::clone(&handles),
        },
        init: PipelineInit { streams, handles },
    }
}

/// Load, plan and wrap a named dataset in one call.
pub fn get_dataset_pipeline(
    catalog: &dyn DatasetCatalog,
    name: &str,
    config: &PipelineConfig,
) -> DataResult<DatasetPipeline> {
    Ok(prep_iterator(load_datasets(catalog, name, config)?))
}
