//! Repeating, batched example streams with background prefetch.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::thread::{self, JoinHandle};

use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::data::arrays::scale_pixels;
use crate::data::catalog::Example;
use crate::error::{DataError, DataResult};

/// One batch: inputs scaled to `[0, 1]` and integer labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// `[batch, features]`
    pub x: Array2<f32>,
    pub y: Array1<i64>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Mean label value, handy as a cheap fingerprint of a batch.
    pub fn label_mean(&self) -> f64 {
        if self.y.is_empty() {
            return 0.0;
        }
        self.y.iter().map(|&v| v as f64).sum::<f64>() / self.y.len() as f64
    }
}

/// How a split is turned into batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    /// Reshuffle the whole split at the start of every epoch.
    pub shuffle: bool,
    pub batch_size: usize,
    /// Batches produced ahead of the consumer.
    pub prefetch: usize,
    /// Fixed shuffle seed; entropy-seeded when absent.
    pub seed: Option<u64>,
}

/// A not-yet-started stream over one split.
///
/// The split repeats forever: batches are cut from the concatenation of
/// epochs, so a batch may span an epoch boundary unless the batch size
/// divides the split size.
#[derive(Debug, Clone)]
pub struct StreamPlan {
    pub name: String,
    pub examples: Arc<Vec<Example>>,
    pub feature_len: usize,
    pub spec: StreamSpec,
}

impl StreamPlan {
    /// Start the producer thread and return the consuming end.
    pub fn start(self) -> DataResult<BatchStream> {
        if self.spec.batch_size == 0 {
            return Err(DataError::InvalidBatchSize(0));
        }
        if self.examples.is_empty() {
            return Err(DataError::StreamClosed(self.name));
        }

        let (tx, rx) = sync_channel(self.spec.prefetch);
        let name = self.name.clone();
        let worker = thread::Builder::new()
            .name(format!("prefetch-{}", self.name))
            .spawn(move || produce(self, tx))?;
        debug!(stream = %name, "started batch producer");

        Ok(BatchStream {
            name,
            rx: Some(rx),
            worker: Some(worker),
        })
    }
}

fn produce(plan: StreamPlan, tx: SyncSender<Batch>) {
    let StreamPlan {
        name,
        examples,
        feature_len,
        spec,
    } = plan;
    let mut rng = match spec.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut order: Vec<usize> = (0..examples.len()).collect();
    let mut pending = Vec::with_capacity(spec.batch_size);

    loop {
        if spec.shuffle {
            order.shuffle(&mut rng);
        }
        for &idx in &order {
            pending.push(idx);
            if pending.len() < spec.batch_size {
                continue;
            }
            let batch = assemble(&examples, &pending, feature_len);
            pending.clear();
            if tx.send(batch).is_err() {
                debug!(stream = %name, "consumer dropped; stopping producer");
                return;
            }
        }
    }
}

fn assemble(examples: &[Example], indices: &[usize], feature_len: usize) -> Batch {
    let raw = Array2::from_shape_fn((indices.len(), feature_len), |(r, c)| {
        examples[indices[r]].image[c]
    });
    let x = scale_pixels(raw.view());
    let y = indices.iter().map(|&i| examples[i].label).collect();
    Batch { x, y }
}

/// Consuming end of a running stream. Dropping it stops the producer.
pub struct BatchStream {
    name: String,
    rx: Option<Receiver<Batch>>,
    worker: Option<JoinHandle<()>>,
}

impl BatchStream {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block until the next batch is ready.
    pub fn next_batch(&mut self) -> DataResult<Batch> {
        self.rx
            .as_ref()
            .and_then(|rx| rx.recv().ok())
            .ok_or_else(|| DataError::StreamClosed(self.name.clone()))
    }
}

impl Iterator for BatchStream {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        self.next_batch().ok()
    }
}

impl Drop for BatchStream {
    fn drop(&mut self) {
        // Closing the receiver unblocks a producer waiting on a full channel.
        self.rx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
