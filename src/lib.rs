//! labkit library crate.
//!
//! Experiment-support utilities: catalog-backed batch pipelines with
//! train/test feed resolvers, feed composition, classification metrics,
//! CSV run logs, directory filtering and plot layout policy.
//!
//! The binary entry point (src/main.rs) drives these same modules.

pub mod csv_log;
pub mod data;
pub mod dir_filter;
pub mod error;
pub mod metrics;
pub mod plot;
pub mod utils;

pub use error::{DataError, DataResult, PlotError};
