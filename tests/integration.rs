/// Integration tests for labkit library stages.
///
/// These tests run the pieces together the way a driver script would:
///   1. A CSV catalog on disk feeds a two-phase train/test pipeline.
///   2. Merged feeds switch the session between splits per call.
///   3. Batches are scored and logged through a CSV run log.
use std::fs;
use std::path::Path;

use labkit::csv_log::{CsvFile, OpenMode};
use labkit::DataError;
use labkit::data::{
    CsvCatalog, DatasetPipeline, FeedDict, FeedSource, FeedValue, PipelineConfig, Session,
    get_dataset_pipeline, merge_feed_dicts,
};
use labkit::dir_filter::{DirFilterArgs, filter_directories};
use labkit::metrics::compute_metrics;
use labkit::plot::{Figure, PlotStyle, SubplotArgs, fmt_ax, get_subplot_axes};
use ndarray::Array2;
use tempfile::tempdir;

fn write_digits(root: &Path) {
    let dir = root.join("digits");
    fs::create_dir_all(&dir).expect("create dataset dir");
    let train: String = (0..12).map(|i| format!("{},{},{}\n", i % 3, i * 10, 255)).collect();
    let test: String = (0..5).map(|i| format!("{},{},{}\n", i % 2, i, 0)).collect();
    fs::write(dir.join("train.csv"), train).expect("write train");
    fs::write(dir.join("test.csv"), test).expect("write test");
}

fn flag_feed(key: &str, value: bool) -> FeedSource {
    let mut feed = FeedDict::new();
    feed.insert(key.to_string(), FeedValue::Bool(value));
    feed.into()
}

// ── pipeline + merged feeds ──────────────────────────────────────────────────

#[test]
fn integration_merged_feeds_switch_splits() {
    let tmp = tempdir().expect("tempdir");
    write_digits(tmp.path());
    let catalog = CsvCatalog::open(tmp.path()).expect("catalog");

    let config = PipelineConfig {
        batch_size: 4,
        test_batch_size: 0,
        seed: Some(42),
        ..Default::default()
    };
    let pipeline = get_dataset_pipeline(&catalog, "digits", &config).expect("pipeline");
    let modes = pipeline.feed_sequence();
    let DatasetPipeline {
        next_batch, init, ..
    } = pipeline;

    let feeds = merge_feed_dicts([
        modes,
        vec![flag_feed("is_training", true), flag_feed("is_training", false)],
    ]);
    assert_eq!(feeds.len(), 2);

    // Resolving before init must fail rather than yield a stale handle.
    assert!(matches!(feeds[0].resolve(), Err(DataError::NotInitialized)));

    let mut session = Session::new();
    init.run(&mut session).expect("init");
    assert_eq!(session.len(), 2);

    let train_feed = feeds[0].resolve().expect("train feed");
    assert_eq!(train_feed["is_training"], FeedValue::Bool(true));
    let train = session.run(&next_batch, &train_feed).expect("train batch");
    assert_eq!(train.x.dim(), (4, 2));

    let test = session
        .run(&next_batch, &feeds[1].resolve().expect("test feed"))
        .expect("test batch");
    // Whole test split in one shuffled batch.
    assert_eq!(test.len(), 5);
    let mut firsts: Vec<u8> = test.x.column(0).iter().map(|v| (v * 255.0).round() as u8).collect();
    firsts.sort();
    assert_eq!(firsts, vec![0, 1, 2, 3, 4]);
}

#[test]
fn integration_missing_dataset_is_not_found() {
    let tmp = tempdir().expect("tempdir");
    let catalog = CsvCatalog::open(tmp.path().join("cache")).expect("catalog");
    assert!(tmp.path().join("cache").is_dir(), "catalog root not created");

    let err = get_dataset_pipeline(&catalog, "fashion", &PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, DataError::NotFound { ref name } if name == "fashion"));
}

// ── metrics + csv log ────────────────────────────────────────────────────────

#[test]
fn integration_scored_batches_are_logged() {
    let tmp = tempdir().expect("tempdir");
    write_digits(tmp.path());
    let catalog = CsvCatalog::open(tmp.path()).expect("catalog");
    let config = PipelineConfig {
        batch_size: 6,
        test_batch_size: 2,
        seed: Some(3),
        ..Default::default()
    };
    let DatasetPipeline {
        next_batch,
        train_feed,
        init,
        ..
    } = get_dataset_pipeline(&catalog, "digits", &config).expect("pipeline");
    let mut session = Session::new();
    init.run(&mut session).expect("init");

    let log_path = tmp.path().join("metrics.csv");
    {
        let mut log = CsvFile::create(
            "metrics.csv",
            Some(tmp.path()),
            Some(&["step", "accuracy"]),
            OpenMode::Write,
        )
        .expect("log");
        for step in 0..3 {
            let batch = session
                .run(&next_batch, &train_feed.resolve().expect("feed"))
                .expect("batch");
            // Perfect scores: a large logit on the true class.
            let mut scores = Array2::<f32>::zeros((batch.len(), 3));
            for (row, &label) in batch.y.iter().enumerate() {
                scores[[row, label as usize]] = 10.0;
            }
            let m = compute_metrics(scores.view(), batch.y.view()).expect("metrics");
            log.writerow([step.to_string(), m.accuracy.to_string()], false)
                .expect("row");
        }
    }

    let text = fs::read_to_string(&log_path).expect("read log");
    assert_eq!(text, "step,accuracy\n0,1\n1,1\n2,1\n");
}

// ── directories + layout ─────────────────────────────────────────────────────

#[test]
fn integration_filtered_runs_get_one_axes_each() {
    let tmp = tempdir().expect("tempdir");
    for name in ["adam_lr1", "adam_lr2", "sgd_lr1", "adam_lr3", "notes"] {
        fs::create_dir(tmp.path().join(name)).expect("mkdir");
    }
    let args = DirFilterArgs {
        kw_and: vec!["adam".to_string()],
        kw_or: vec!["lr".to_string()],
        dir_order: Some(vec![3.0, 1.0, 2.0]),
    };
    let runs = filter_directories(&args, tmp.path(), true).expect("filter");
    assert_eq!(runs.len(), 3);

    let style = PlotStyle::init(Some(11.0), Some(9.0), true, None);
    let mut figure = Figure::new(style.clone());
    let axes = get_subplot_axes(&SubplotArgs::default(), runs.len(), &mut figure).expect("axes");
    for (ax, run) in axes.iter_mut().zip(&runs) {
        fmt_ax(ax, &style, Some("step"), Some(run.as_str()), true, true);
    }
    assert_eq!(figure.size_inches, (12.0, 3.0));
    assert_eq!(figure.axes.len(), 3);
    assert!(figure.axes.iter().all(|a| a.legend && a.grid.is_some()));
}
