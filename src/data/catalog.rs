//! Dataset catalogs: named train/test splits plus size metadata.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{DataError, DataResult};
use crate::utils::ensure_cache_dir;

/// One labelled example with raw `u8` pixel features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    pub image: Vec<u8>,
    pub label: i64,
}

impl Example {
    pub fn new(image: Vec<u8>, label: i64) -> Self {
        Self { image, label }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitInfo {
    pub num_examples: usize,
}

/// Size metadata reported alongside the splits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetInfo {
    pub name: String,
    pub train: SplitInfo,
    pub test: SplitInfo,
    /// Flattened feature length shared by every example.
    pub feature_len: usize,
}

/// Train and test examples of one dataset.
#[derive(Debug, Clone)]
pub struct DatasetSplits {
    pub train: Vec<Example>,
    pub test: Vec<Example>,
    pub info: DatasetInfo,
}

impl DatasetSplits {
    /// Validate the splits and derive their metadata.
    pub fn new(name: &str, train: Vec<Example>, test: Vec<Example>) -> DataResult<Self> {
        if train.is_empty() {
            return Err(DataError::EmptySplit {
                name: name.to_string(),
                split: "train",
            });
        }
        if test.is_empty() {
            return Err(DataError::EmptySplit {
                name: name.to_string(),
                split: "test",
            });
        }
        let feature_len = train[0].image.len();
        if let Some(bad) = train
            .iter()
            .chain(test.iter())
            .find(|e| e.image.len() != feature_len)
        {
            return Err(DataError::ShapeMismatch(format!(
                "dataset {name}: expected {feature_len} features, found {}",
                bad.image.len()
            )));
        }

        let info = DatasetInfo {
            name: name.to_string(),
            train: SplitInfo {
                num_examples: train.len(),
            },
            test: SplitInfo {
                num_examples: test.len(),
            },
            feature_len,
        };
        Ok(Self { train, test, info })
    }
}

/// Source of named datasets.
pub trait DatasetCatalog {
    /// Load both splits of `name`, or [`DataError::NotFound`].
    fn load(&self, name: &str) -> DataResult<DatasetSplits>;
}

/// Catalog backed by datasets registered in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    datasets: HashMap<String, DatasetSplits>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: &str,
        train: Vec<Example>,
        test: Vec<Example>,
    ) -> DataResult<()> {
        let splits = DatasetSplits::new(name, train, test)?;
        self.datasets.insert(name.to_string(), splits);
        Ok(())
    }
}

impl DatasetCatalog for InMemoryCatalog {
    fn load(&self, name: &str) -> DataResult<DatasetSplits> {
        self.datasets
            .get(name)
            .cloned()
            .ok_or_else(|| DataError::NotFound {
                name: name.to_string(),
            })
    }
}

/// Catalog of CSV datasets laid out as `<root>/<name>/{train,test}.csv`.
///
/// Each row is `label,p0,p1,...` with pixel values in `0..=255` and no header.
#[derive(Debug, Clone)]
pub struct CsvCatalog {
    root: PathBuf,
}

impl CsvCatalog {
    /// Open a catalog rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> DataResult<Self> {
        let root = root.into();
        ensure_cache_dir(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_split(path: &Path) -> DataResult<Vec<Example>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut examples = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let malformed = |reason: String| DataError::Malformed {
                path: path.to_path_buf(),
                reason: format!("row {}: {reason}", row + 1),
            };

            let mut fields = record.iter();
            let label = fields
                .next()
                .ok_or_else(|| malformed("empty record".to_string()))?
                .trim()
                .parse::<i64>()
                .map_err(|e| malformed(format!("bad label: {e}")))?;
            let image = fields
                .map(|f| f.trim().parse::<u8>())
                .collect::<Result<Vec<u8>, _>>()
                .map_err(|e| malformed(format!("bad pixel: {e}")))?;
            examples.push(Example { image, label });
        }
        debug!(path = %path.display(), count = examples.len(), "read csv split");
        Ok(examples)
    }
}

impl DatasetCatalog for CsvCatalog {
    fn load(&self, name: &str) -> DataResult<DatasetSplits> {
        let dir = self.root.join(name);
        if !dir.is_dir() {
            return Err(DataError::NotFound {
                name: name.to_string(),
            });
        }
        let train = Self::read_split(&dir.join("train.csv"))?;
        let test = Self::read_split(&dir.join("test.csv"))?;
        let splits = DatasetSplits::new(name, train, test)?;
        info!(
            name,
            train = splits.info.train.num_examples,
            test = splits.info.test.num_examples,
            features = splits.info.feature_len,
            "loaded dataset"
        );
        Ok(splits)
    }
}
