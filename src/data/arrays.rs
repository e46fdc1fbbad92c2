//! In-memory array helpers for the legacy fit-from-arrays path.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::{DataError, DataResult};

fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn check_rows(x: ArrayView2<f32>, y: ArrayView1<i64>) -> DataResult<()> {
    if x.nrows() != y.len() {
        return Err(DataError::ShapeMismatch(format!(
            "{} input rows for {} labels",
            x.nrows(),
            y.len()
        )));
    }
    Ok(())
}

/// Map raw `u8` pixels to `[0, 1]`.
pub fn scale_pixels(raw: ArrayView2<u8>) -> Array2<f32> {
    raw.mapv(|v| f32::from(v) / 255.0)
}

fn permute_with(
    x: ArrayView2<f32>,
    y: ArrayView1<i64>,
    rng: &mut StdRng,
) -> (Array2<f32>, Array1<i64>) {
    let mut order: Vec<usize> = (0..y.len()).collect();
    order.shuffle(rng);
    (x.select(Axis(0), &order), y.select(Axis(0), &order))
}

/// Apply one random row permutation to inputs and labels alike.
pub fn permute(
    x: ArrayView2<f32>,
    y: ArrayView1<i64>,
    seed: Option<u64>,
) -> DataResult<(Array2<f32>, Array1<i64>)> {
    check_rows(x, y)?;
    Ok(permute_with(x, y, &mut rng_for(seed)))
}

/// A random `test_size`-row subset (all rows if fewer are available).
pub fn random_subset(
    x: ArrayView2<f32>,
    y: ArrayView1<i64>,
    test_size: usize,
    seed: Option<u64>,
) -> DataResult<(Array2<f32>, Array1<i64>)> {
    let (x, y) = permute(x, y, seed)?;
    let n = test_size.min(y.len());
    Ok((
        x.slice_axis(Axis(0), (..n).into()).to_owned(),
        y.slice_axis(Axis(0), (..n).into()).to_owned(),
    ))
}

/// Endless batch generator that reshuffles at the start of every epoch.
///
/// Only full batches are produced; the remainder of each epoch is skipped.
#[derive(Debug, Clone)]
pub struct InputGenerator {
    x: Array2<f32>,
    y: Array1<i64>,
    batch_size: usize,
    index: usize,
    rng: StdRng,
}

impl InputGenerator {
    pub fn new(
        x: Array2<f32>,
        y: Array1<i64>,
        batch_size: usize,
        seed: Option<u64>,
    ) -> DataResult<Self> {
        check_rows(x.view(), y.view())?;
        if batch_size == 0 || batch_size > y.len() {
            return Err(DataError::InvalidBatchSize(batch_size));
        }
        Ok(Self {
            x,
            y,
            batch_size,
            // Forces a shuffle before the first batch.
            index: usize::MAX,
            rng: rng_for(seed),
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl Iterator for InputGenerator {
    type Item = (Array2<f32>, Array1<i64>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.index == usize::MAX || self.index + self.batch_size > self.y.len() {
            let (x, y) = permute_with(self.x.view(), self.y.view(), &mut self.rng);
            self.x = x;
            self.y = y;
            self.index = 0;
        }
        let range = self.index..self.index + self.batch_size;
        self.index += self.batch_size;
        Some((
            self.x.slice_axis(Axis(0), range.clone().into()).to_owned(),
            self.y.slice_axis(Axis(0), range.into()).to_owned(),
        ))
    }
}
