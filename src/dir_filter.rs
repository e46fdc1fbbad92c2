//! Select and order experiment run directories by name.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

/// Directory selection flags, flattened into any subcommand that scans run directories.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct DirFilterArgs {
    /// Directory name AND filter: keep a directory only if every keyword is present
    #[arg(long, num_args = 0..)]
    pub kw_and: Vec<String>,
    /// Directory name OR filter: keep a directory if any keyword is present
    #[arg(long, num_args = 0..)]
    pub kw_or: Vec<String>,
    /// Re-order the directory list by ascending priority, paired with directories positionally
    #[arg(long, num_args = 1.., allow_negative_numbers = true)]
    pub dir_order: Option<Vec<f64>>,
}

/// Names of the immediate subdirectories of `root`, in filesystem order.
pub fn list_subdirectories(root: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(root)
        .with_context(|| format!("failed to read directory {}", root.display()))?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to list {}", root.display()))?;
        if !entry.path().is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => dirs.push(name),
            Err(raw) => warn!(name = ?raw, "skipping directory with non-UTF-8 name"),
        }
    }
    Ok(dirs)
}

/// Apply the AND and OR keyword filters; an empty keyword list disables its filter.
pub fn keyword_filter(mut dirs: Vec<String>, args: &DirFilterArgs) -> Vec<String> {
    if !args.kw_and.is_empty() {
        dirs.retain(|d| args.kw_and.iter().all(|kw| d.contains(kw.as_str())));
    }
    if !args.kw_or.is_empty() {
        dirs.retain(|d| args.kw_or.iter().any(|kw| d.contains(kw.as_str())));
    }
    dirs
}

/// Order directories by explicit priority or, failing that, alphabetically.
///
/// Priorities pair with directories by position; surplus entries on either
/// side are dropped. Equal priorities fall back to the directory name.
pub fn order_directories(
    mut dirs: Vec<String>,
    order: Option<&[f64]>,
    sort_by_default: bool,
) -> Vec<String> {
    match order {
        Some(order) if !order.is_empty() => {
            let mut paired: Vec<(f64, String)> =
                order.iter().copied().zip(dirs).collect();
            paired.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
            paired.into_iter().map(|(_, d)| d).collect()
        }
        _ => {
            if sort_by_default {
                dirs.sort();
            }
            dirs
        }
    }
}

/// List, filter and order the run directories under `data_dir`.
///
/// An empty selection is not an error: it is reported and returned as-is.
pub fn filter_directories(
    args: &DirFilterArgs,
    data_dir: &Path,
    sort_by_default: bool,
) -> Result<Vec<String>> {
    let dirs = keyword_filter(list_subdirectories(data_dir)?, args);

    if dirs.is_empty() {
        warn!(path = %data_dir.display(), "no matching directories found");
        return Ok(dirs);
    }

    let order = args.dir_order.as_deref();
    let listing: Vec<String> = match order {
        Some(order) => order
            .iter()
            .zip(&dirs)
            .map(|(o, d)| format!("[{o}] {d}"))
            .collect(),
        None => dirs.clone(),
    };
    info!(count = dirs.len(), "collected directories:\n{}", listing.join("\n"));

    Ok(order_directories(dirs, order, sort_by_default))
}
