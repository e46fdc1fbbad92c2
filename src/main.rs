use std::path::PathBuf;

use labkit::csv_log::{CsvFile, OpenMode};
use labkit::data::{
    CsvCatalog, DatasetPipeline, FeedDict, FeedSource, FeedValue, PipelineConfig, Session,
    get_dataset_pipeline, merge_feed_dicts,
};
use labkit::dir_filter::{DirFilterArgs, filter_directories};
use labkit::metrics::{Metrics, compute_metrics, compute_metrics_topk};
use labkit::plot::{Figure, PlotStyle, SubplotArgs, get_subplot_axes};
use labkit::utils;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use ndarray::{Array1, Array2};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "labkit",
    about = "Experiment-support utilities for ML runs",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Commands,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List run directories matching keyword filters, in priority order
    Dirs {
        /// Directory holding one subdirectory per run
        #[arg(long)]
        root: PathBuf,
        #[command(flatten)]
        filter: DirFilterArgs,
        /// Keep filesystem order when no explicit order is given
        #[arg(long, default_value_t = false)]
        no_sort: bool,
    },
    /// Print the subplot grid and figure size for a number of axes
    Layout {
        /// Number of axes to place
        #[arg(long)]
        count: usize,
        #[command(flatten)]
        subplot: SubplotArgs,
    },
    /// Print the scratch directory for a project
    DataDir {
        /// Project name
        project: String,
        /// Extra path components (used on Windows only)
        #[arg(long, num_args = 0..)]
        extra: Vec<String>,
    },
    /// Pull train and test batches from a CSV catalog dataset and log them
    Inspect {
        /// Dataset name under the catalog root
        #[arg(long)]
        dataset: String,
        /// Catalog root holding <dataset>/{train,test}.csv
        #[arg(long)]
        catalog_root: PathBuf,
        #[arg(long, default_value_t = 32)]
        batch_size: usize,
        /// Test batch size; 0 or less serves the whole test split per batch
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        test_batch_size: i64,
        /// Train/test batch pairs to pull
        #[arg(long, default_value_t = 1)]
        steps: usize,
        /// Shuffle seed
        #[arg(long)]
        seed: Option<u64>,
        /// CSV log receiving one row per batch
        #[arg(long, default_value = "inspect.csv")]
        log: PathBuf,
    },
    /// Score a predictions CSV of `target,s0,s1,...` rows
    Score {
        #[arg(long)]
        predictions: PathBuf,
        /// Count a hit when the target is within the k highest scores
        #[arg(long)]
        top_k: Option<usize>,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn inspect(
    dataset: &str,
    catalog_root: PathBuf,
    config: PipelineConfig,
    steps: usize,
    log: &std::path::Path,
) -> Result<()> {
    let catalog = CsvCatalog::open(catalog_root)?;
    let pipeline = get_dataset_pipeline(&catalog, dataset, &config)?;
    let modes = pipeline.feed_sequence();
    let DatasetPipeline {
        next_batch, init, ..
    } = pipeline;

    let flag = |training: bool| -> FeedSource {
        let mut feed = FeedDict::new();
        feed.insert("is_training".to_string(), FeedValue::Bool(training));
        feed.into()
    };
    let feeds = merge_feed_dicts([modes, vec![flag(true), flag(false)]]);

    let mut session = Session::new();
    init.run(&mut session)?;

    let mut batch_log = CsvFile::create(
        log,
        None,
        Some(&["step", "mode", "batch", "label_mean"]),
        OpenMode::Write,
    )?;
    for step in 0..steps {
        for (mode, feed) in ["train", "test"].iter().zip(&feeds) {
            let batch = session.run(&next_batch, &feed.resolve()?)?;
            batch_log.writerow(
                [
                    step.to_string(),
                    mode.to_string(),
                    batch.len().to_string(),
                    format!("{:.4}", batch.label_mean()),
                ],
                false,
            )?;
        }
    }
    batch_log.flush()?;
    info!(path = %log.display(), steps, "wrote batch log");
    Ok(())
}

fn read_predictions(path: &std::path::Path) -> Result<(Array2<f32>, Array1<i64>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("failed to open predictions {}", path.display()))?;

    let mut targets = Vec::new();
    let mut scores = Vec::new();
    let mut width = None;
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("bad csv row {}", row + 1))?;
        let mut fields = record.iter();
        let target = fields
            .next()
            .ok_or_else(|| anyhow!("row {} is empty", row + 1))?
            .trim()
            .parse::<i64>()
            .with_context(|| format!("bad target on row {}", row + 1))?;
        let row_scores = fields
            .map(|f| f.trim().parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("bad score on row {}", row + 1))?;
        if *width.get_or_insert(row_scores.len()) != row_scores.len() {
            return Err(anyhow!("row {} has a different number of scores", row + 1));
        }
        targets.push(target);
        scores.extend(row_scores);
    }

    let rows = targets.len();
    let scores = Array2::from_shape_vec((rows, width.unwrap_or(0)), scores)
        .context("predictions do not form a rectangular table")?;
    Ok((scores, Array1::from_vec(targets)))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        Commands::Dirs {
            root,
            filter,
            no_sort,
        } => {
            info!(root = %root.display(), ?filter, "filtering run directories");
            for dir in filter_directories(&filter, &root, !no_sort)? {
                println!("{dir}");
            }
        }
        Commands::Layout { count, subplot } => {
            let mut figure = Figure::new(PlotStyle::default());
            get_subplot_axes(&subplot, count, &mut figure)?;
            let grid = figure
                .grid
                .ok_or_else(|| anyhow!("no grid allocated for {count} axes"))?;
            println!("grid: {}x{}", grid.rows, grid.cols);
            println!(
                "figure: {:.2}in x {:.2}in",
                figure.size_inches.0, figure.size_inches.1
            );
        }
        Commands::DataDir { project, extra } => {
            let extra: Vec<&str> = extra.iter().map(String::as_str).collect();
            println!("{}", utils::resolve_data_dir_os(&project, &extra)?.display());
        }
        Commands::Inspect {
            dataset,
            catalog_root,
            batch_size,
            test_batch_size,
            steps,
            seed,
            log,
        } => {
            info!(
                dataset = %dataset,
                ?catalog_root,
                batch_size,
                test_batch_size,
                steps,
                "starting inspect"
            );
            let config = PipelineConfig {
                batch_size,
                test_batch_size,
                seed,
                ..Default::default()
            };
            inspect(&dataset, catalog_root, config, steps, &log)?;
        }
        Commands::Score { predictions, top_k } => {
            let (scores, targets) = read_predictions(&predictions)?;
            let Metrics {
                accuracy,
                sum_loss,
                avg_loss,
            } = match top_k {
                Some(k) => compute_metrics_topk(scores.view(), targets.view(), k)?,
                None => compute_metrics(scores.view(), targets.view())?,
            };
            info!(rows = targets.len(), ?top_k, "scored predictions");
            println!("accuracy: {accuracy:.4}");
            println!("sum_loss: {sum_loss:.4}");
            println!("avg_loss: {avg_loss:.4}");
        }
    }

    Ok(())
}
