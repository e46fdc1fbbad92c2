//! Feed mappings and their lazy composition.
//!
//! A feed maps placeholder names to values for one session run. Sources
//! are either static mappings or deferred resolvers; merging keeps them
//! unresolved until the merged feed itself is resolved, so resolvers
//! bound at initialization time see the session state of that moment.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::data::session::IteratorHandle;
use crate::error::DataResult;

/// A value fed into one placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedValue {
    Handle(IteratorHandle),
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Placeholder name → value for one run.
pub type FeedDict = BTreeMap<String, FeedValue>;

/// Anything that can produce a feed at call time.
pub trait ResolveFeed: Send + Sync {
    fn resolve(&self) -> DataResult<FeedDict>;
}

struct FnResolver<F>(F);

impl<F> ResolveFeed for FnResolver<F>
where
    F: Fn() -> DataResult<FeedDict> + Send + Sync,
{
    fn resolve(&self) -> DataResult<FeedDict> {
        (self.0)()
    }
}

/// One element of a feed sequence.
#[derive(Clone)]
pub enum FeedSource {
    Static(FeedDict),
    Deferred(Arc<dyn ResolveFeed>),
}

impl FeedSource {
    /// Wrap a closure as a deferred source.
    pub fn deferred<F>(f: F) -> Self
    where
        F: Fn() -> DataResult<FeedDict> + Send + Sync + 'static,
    {
        FeedSource::Deferred(Arc::new(FnResolver(f)))
    }

    pub fn resolve(&self) -> DataResult<FeedDict> {
        match self {
            FeedSource::Static(dict) => Ok(dict.clone()),
            FeedSource::Deferred(resolver) => resolver.resolve(),
        }
    }
}

impl fmt::Debug for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedSource::Static(dict) => f.debug_tuple("Static").field(dict).finish(),
            FeedSource::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<FeedDict> for FeedSource {
    fn from(dict: FeedDict) -> Self {
        FeedSource::Static(dict)
    }
}

impl From<MergedFeed> for FeedSource {
    fn from(feed: MergedFeed) -> Self {
        FeedSource::Deferred(Arc::new(feed))
    }
}

/// Feed sources merged in order; later sources win on key conflicts.
#[derive(Debug, Clone, Default)]
pub struct MergedFeed {
    sources: Vec<FeedSource>,
}

impl MergedFeed {
    pub fn new(sources: Vec<FeedSource>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    /// Resolve every source now and fold them into one feed.
    pub fn resolve(&self) -> DataResult<FeedDict> {
        let mut merged = FeedDict::new();
        for source in &self.sources {
            merged.extend(source.resolve()?);
        }
        Ok(merged)
    }
}

impl ResolveFeed for MergedFeed {
    fn resolve(&self) -> DataResult<FeedDict> {
        MergedFeed::resolve(self)
    }
}

/// Zip feed sequences position by position into merged feeds.
///
/// The `i`-th result merges the `i`-th source of every sequence, in
/// argument order. The output is as long as the shortest sequence; no
/// sequences give no feeds.
pub fn merge_feed_dicts<I, S>(sequences: I) -> Vec<MergedFeed>
where
    I: IntoIterator<Item = S>,
    S: IntoIterator<Item = FeedSource>,
{
    let columns: Vec<Vec<FeedSource>> = sequences
        .into_iter()
        .map(|seq| seq.into_iter().collect())
        .collect();
    let width = columns.iter().map(Vec::len).min().unwrap_or(0);

    (0..width)
        .map(|i| MergedFeed::new(columns.iter().map(|col| col[i].clone()).collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::*;
    use crate::error::DataError;

    fn dict(pairs: &[(&str, FeedValue)]) -> FeedDict {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn one_merged_feed_per_position() {
        let a = vec![
            FeedSource::from(dict(&[("lr", FeedValue::Float(0.1))])),
            FeedSource::from(dict(&[("lr", FeedValue::Float(0.0))])),
        ];
        let b = vec![
            FeedSource::from(dict(&[("train", FeedValue::Bool(true))])),
            FeedSource::from(dict(&[("train", FeedValue::Bool(false))])),
        ];
        let merged = merge_feed_dicts([a, b]);
        assert_eq!(merged.len(), 2);

        let test_feed = merged[1].resolve().unwrap();
        assert_eq!(
            test_feed,
            dict(&[("lr", FeedValue::Float(0.0)), ("train", FeedValue::Bool(false))])
        );
    }

    #[test]
    fn later_sequences_win_conflicts() {
        let first = vec![FeedSource::from(dict(&[("k", FeedValue::Int(1))]))];
        let second = vec![FeedSource::from(dict(&[("k", FeedValue::Int(2))]))];
        let merged = merge_feed_dicts([first, second]);
        assert_eq!(merged[0].resolve().unwrap()["k"], FeedValue::Int(2));
    }

    #[test]
    fn deferred_sources_resolve_at_call_time() {
        let counter = Arc::new(AtomicI64::new(0));
        let seen = Arc::clone(&counter);
        let source = FeedSource::deferred(move || {
            Ok(dict(&[("step", FeedValue::Int(seen.load(Ordering::SeqCst)))]))
        });
        let merged = merge_feed_dicts([vec![source]]);

        counter.store(5, Ordering::SeqCst);
        assert_eq!(merged[0].resolve().unwrap()["step"], FeedValue::Int(5));
        counter.store(6, Ordering::SeqCst);
        assert_eq!(merged[0].resolve().unwrap()["step"], FeedValue::Int(6));
    }

    #[test]
    fn resolver_errors_propagate() {
        let failing = FeedSource::deferred(|| Err(DataError::NotInitialized));
        let merged = merge_feed_dicts([vec![failing]]);
        assert!(matches!(
            merged[0].resolve(),
            Err(DataError::NotInitialized)
        ));
    }

    #[test]
    fn no_sequences_no_feeds() {
        let merged = merge_feed_dicts(Vec::<Vec<FeedSource>>::new());
        assert!(merged.is_empty());
    }

    #[test]
    fn shortest_sequence_sets_length() {
        let long = vec![FeedSource::from(FeedDict::new()); 3];
        let short = vec![FeedSource::from(FeedDict::new())];
        assert_eq!(merge_feed_dicts([long, short]).len(), 1);
    }

    #[test]
    fn empty_merge_resolves_to_empty_feed() {
        assert!(MergedFeed::default().resolve().unwrap().is_empty());
    }

    #[test]
    fn merged_feeds_nest() {
        let inner = merge_feed_dicts([vec![FeedSource::from(dict(&[("a", FeedValue::Int(1))]))]]);
        let outer = merge_feed_dicts([
            inner.into_iter().map(FeedSource::from).collect::<Vec<_>>(),
            vec![FeedSource::from(dict(&[("b", FeedValue::Int(2))]))],
        ]);
        let feed = outer[0].resolve().unwrap();
        assert_eq!(feed.len(), 2);
    }
}
