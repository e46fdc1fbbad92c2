//! Execution session owning one-shot iterators addressed by string handles.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::data::feed::{FeedDict, FeedValue};
use crate::data::stream::{Batch, BatchStream};
use crate::error::{DataError, DataResult};

/// Opaque token naming an iterator registered with a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IteratorHandle(String);

impl IteratorHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IteratorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Symbolic "next batch" output of a handle-switched iterator.
///
/// Running it in a session pulls from whichever iterator the feed's value
/// for `handle_key` names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextBatch {
    /// Feed key of the string-handle placeholder.
    pub handle_key: String,
    /// Flattened input width of every batch.
    pub feature_len: usize,
}

impl NextBatch {
    /// `[batch, features]`, with an unknown batch dimension.
    pub fn input_shape(&self) -> (Option<usize>, usize) {
        (None, self.feature_len)
    }
}

/// Owns running streams and resolves feeds to batches.
#[derive(Default)]
pub struct Session {
    iterators: HashMap<IteratorHandle, BatchStream>,
    next_id: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a stream and hand back the handle that selects it.
    pub fn register(&mut self, stream: BatchStream) -> IteratorHandle {
        let handle = IteratorHandle(format!("iterator-{}-{}", self.next_id, stream.name()));
        self.next_id += 1;
        debug!(%handle, "registered one-shot iterator");
        self.iterators.insert(handle.clone(), stream);
        handle
    }

    /// Pull the next batch from the iterator selected by `feed`.
    pub fn run(&mut self, fetch: &NextBatch, feed: &FeedDict) -> DataResult<Batch> {
        let handle = match feed.get(&fetch.handle_key) {
            Some(FeedValue::Handle(handle)) => handle,
            _ => return Err(DataError::MissingFeed(fetch.handle_key.clone())),
        };
        let stream = self
            .iterators
            .get_mut(handle)
            .ok_or_else(|| DataError::UnknownHandle(handle.to_string()))?;
        let batch = stream.next_batch()?;
        if batch.x.ncols() != fetch.feature_len {
            return Err(DataError::ShapeMismatch(format!(
                "iterator {handle} yields {} features, expected {}",
                batch.x.ncols(),
                fetch.feature_len
            )));
        }
        Ok(batch)
    }

    /// Stop and drop one iterator.
    pub fn release(&mut self, handle: &IteratorHandle) -> bool {
        self.iterators.remove(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.iterators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iterators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::data::catalog::Example;
    use crate::data::stream::{StreamPlan, StreamSpec};

    fn stream(label: i64) -> BatchStream {
        StreamPlan {
            name: format!("const{label}"),
            examples: Arc::new(vec![Example::new(vec![0, 0, 0], label)]),
            feature_len: 3,
            spec: StreamSpec {
                shuffle: false,
                batch_size: 2,
                prefetch: 1,
                seed: None,
            },
        }
        .start()
        .unwrap()
    }

    fn fetch() -> NextBatch {
        NextBatch {
            handle_key: "handle".to_string(),
            feature_len: 3,
        }
    }

    #[test]
    fn feed_selects_the_iterator() {
        let mut session = Session::new();
        let a = session.register(stream(4));
        let b = session.register(stream(9));
        assert_ne!(a, b);

        let mut feed = FeedDict::new();
        feed.insert("handle".to_string(), FeedValue::Handle(b));
        let batch = session.run(&fetch(), &feed).unwrap();
        assert_eq!(batch.y.to_vec(), vec![9, 9]);
    }

    #[test]
    fn missing_handle_in_feed() {
        let mut session = Session::new();
        session.register(stream(1));
        let err = session.run(&fetch(), &FeedDict::new()).unwrap_err();
        assert!(matches!(err, DataError::MissingFeed(key) if key == "handle"));
    }

    #[test]
    fn released_handle_is_unknown() {
        let mut session = Session::new();
        let h = session.register(stream(1));
        assert!(session.release(&h));
        assert!(session.is_empty());

        let mut feed = FeedDict::new();
        feed.insert("handle".to_string(), FeedValue::Handle(h));
        let err = session.run(&fetch(), &feed).unwrap_err();
        assert!(matches!(err, DataError::UnknownHandle(_)));
    }
}
