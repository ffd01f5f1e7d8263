//! CLI command tests
//!
//! Each handler runs against a throwaway state root at `LogLevel::Quiet`.

use super::*;
use crate::cli::{
    parse_args, HistoryArgs, IngestArgs, InitArgs, RollbackArgs, ScheduleArgs, ScoreArgs,
};
use crate::config::PipelineConfig;
use crate::data::{Frame, Record};
use std::path::PathBuf;
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> PipelineConfig {
    PipelineConfig::default().with_root(dir.path())
}

fn record(i: usize, positive: bool) -> Record {
    Record {
        customer_id: format!("C{i:04}"),
        credit_limit: Some(5000.0),
        utilisation_pct: Some(if positive {
            85.0 + (i % 10) as f64
        } else {
            15.0 + (i % 30) as f64
        }),
        avg_payment_ratio: Some(if positive { 0.3 } else { 0.95 }),
        min_due_paid_frequency: Some(0.5),
        merchant_mix_index: Some(0.4),
        cash_withdrawal_pct: Some(if positive { 30.0 } else { 2.0 }),
        recent_spend_change_pct: Some(5.0),
        dpd_bucket_next_month: Some(f64::from(u8::from(positive))),
    }
}

fn batch(n: usize) -> Frame {
    Frame::new((0..n).map(|i| record(i, i % 5 == 0)).collect())
}

/// Write a separable batch and run the pipeline so a model is active.
fn deploy_a_model(config: &PipelineConfig) {
    let layout = config.layout();
    layout.ensure().unwrap();
    batch(100)
        .save(&layout.pending_dir().join("batch_001.csv"))
        .unwrap();
    pipeline::run_pipeline(config.clone(), LogLevel::Quiet).unwrap();
    assert!(layout.active_model().exists());
}

#[test]
fn test_init_creates_layout() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let result = init::run_init(InitArgs { corpus: None }, config.clone(), LogLevel::Quiet);
    assert!(result.is_ok());
    let layout = config.layout();
    assert!(layout.pending_dir().is_dir());
    assert!(layout.versions_dir().is_dir());
    assert!(layout.logs_dir().is_dir());
    assert!(!layout.corpus_file().exists());
}

#[test]
fn test_init_seeds_and_dedups_corpus() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let seed = dir.path().join("seed.csv");
    let mut records: Vec<Record> = (0..10).map(|i| record(i, false)).collect();
    records.push(record(0, true)); // duplicate identifier, last wins
    Frame::new(records).save(&seed).unwrap();

    let args = InitArgs { corpus: Some(seed) };
    init::run_init(args, config.clone(), LogLevel::Quiet).unwrap();

    let corpus = Frame::load(&config.layout().corpus_file()).unwrap();
    assert_eq!(corpus.len(), 10);
    assert_eq!(corpus.records[0].dpd_bucket_next_month, Some(1.0));
}

#[test]
fn test_init_never_overwrites_existing_corpus() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let layout = config.layout();
    Frame::new(vec![record(0, false)])
        .save(&layout.corpus_file())
        .unwrap();
    let seed = dir.path().join("seed.csv");
    batch(50).save(&seed).unwrap();

    let args = InitArgs { corpus: Some(seed) };
    init::run_init(args, config, LogLevel::Quiet).unwrap();

    assert_eq!(Frame::load(&layout.corpus_file()).unwrap().len(), 1);
}

#[test]
fn test_init_missing_seed_file() {
    let dir = TempDir::new().unwrap();
    let args = InitArgs {
        corpus: Some(PathBuf::from("/nonexistent/seed.csv")),
    };
    let err = init::run_init(args, test_config(&dir), LogLevel::Quiet).unwrap_err();
    assert!(err.contains("File not found"));
}

#[test]
fn test_ingest_stores_batch_under_pending() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let source = dir.path().join("upload.csv");
    batch(5).save(&source).unwrap();

    let args = IngestArgs {
        file: source,
        name: Some("august".to_string()),
    };
    ingest::run_ingest(args, config.clone(), LogLevel::Quiet).unwrap();

    let pending: Vec<_> = std::fs::read_dir(config.layout().pending_dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(pending.len(), 1);
    assert!(pending[0].starts_with("august_"));
}

#[test]
fn test_ingest_rejects_incomplete_schema() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("bad.csv");
    std::fs::write(&source, "customer_id,utilisation_pct\nC001,10\n").unwrap();

    let args = IngestArgs {
        file: source,
        name: None,
    };
    let err = ingest::run_ingest(args, test_config(&dir), LogLevel::Quiet).unwrap_err();
    assert!(err.starts_with("Ingest error:"));
    assert!(err.contains("missing required columns"));
}

#[test]
fn test_ingest_missing_file() {
    let dir = TempDir::new().unwrap();
    let args = IngestArgs {
        file: PathBuf::from("/nonexistent/upload.csv"),
        name: None,
    };
    let err = ingest::run_ingest(args, test_config(&dir), LogLevel::Quiet).unwrap_err();
    assert!(err.contains("File not found"));
}

#[test]
fn test_run_deploys_then_skips() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    deploy_a_model(&config);

    // no new batches: the follow-up run skips, still exit 0
    pipeline::run_pipeline(config, LogLevel::Quiet).unwrap();
}

#[test]
fn test_run_rejected_candidate_exits_cleanly() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let layout = config.layout();
    layout.ensure().unwrap();
    // constant features with alternating labels: fails the accuracy floor
    let noise = Frame::new(
        (0..100)
            .map(|i| {
                let mut r = record(i, false);
                r.utilisation_pct = Some(50.0);
                r.avg_payment_ratio = Some(0.5);
                r.cash_withdrawal_pct = Some(10.0);
                r.dpd_bucket_next_month = Some(f64::from(u8::from(i % 2 == 0)));
                r
            })
            .collect(),
    );
    noise
        .save(&layout.pending_dir().join("batch_001.csv"))
        .unwrap();

    let result = pipeline::run_pipeline(config, LogLevel::Quiet);
    assert!(result.is_ok());
    assert!(!layout.active_model().exists());
    assert!(layout
        .version_artifact(crate::train::ModelVersion::new(1, 0))
        .exists());
}

#[test]
fn test_history_on_fresh_root() {
    let dir = TempDir::new().unwrap();
    let result =
        history::run_history(HistoryArgs { limit: 10 }, test_config(&dir), LogLevel::Quiet);
    assert!(result.is_ok());
}

#[test]
fn test_history_after_deploy() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    deploy_a_model(&config);

    let result = history::run_history(HistoryArgs { limit: 10 }, config, LogLevel::Quiet);
    assert!(result.is_ok());
}

#[test]
fn test_rollback_without_history_fails() {
    let dir = TempDir::new().unwrap();
    let args = RollbackArgs { version: None };
    let err = rollback::run_rollback(args, test_config(&dir), LogLevel::Quiet).unwrap_err();
    assert!(err.starts_with("Rollback error:"));
    assert!(err.contains("nothing to roll back to"));
}

#[test]
fn test_status_on_fresh_root() {
    let dir = TempDir::new().unwrap();
    let result = status::run_status(test_config(&dir), LogLevel::Quiet);
    assert!(result.is_ok());
}

#[test]
fn test_status_after_deploy() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    deploy_a_model(&config);

    let result = status::run_status(config, LogLevel::Quiet);
    assert!(result.is_ok());
}

#[test]
fn test_score_without_active_model_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("customers.csv");
    batch(5).save(&input).unwrap();

    let args = ScoreArgs {
        input,
        output: dir.path().join("scored.csv"),
    };
    let err = score::run_score(args, test_config(&dir), LogLevel::Quiet).unwrap_err();
    assert!(err.starts_with("Scoring error:"));
    assert!(err.contains("no active model"));
}

#[test]
fn test_score_writes_output_file() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    deploy_a_model(&config);

    let input = dir.path().join("customers.csv");
    batch(8).save(&input).unwrap();
    let output = dir.path().join("scored.csv");
    let args = ScoreArgs {
        input,
        output: output.clone(),
    };
    score::run_score(args, config, LogLevel::Quiet).unwrap();

    let content = std::fs::read_to_string(&output).unwrap();
    let header = content.lines().next().unwrap();
    assert!(header.ends_with("risk_score,risk_tier"));
    assert_eq!(content.lines().count(), 9);
}

#[test]
fn test_schedule_rejects_bad_cadence() {
    let dir = TempDir::new().unwrap();
    let args = ScheduleArgs {
        every: "fortnightly".to_string(),
        at: "02:00".to_string(),
    };
    let err = schedule::run_schedule(args, test_config(&dir), LogLevel::Quiet).unwrap_err();
    assert!(err.contains("invalid cadence"));
}

#[test]
fn test_schedule_rejects_bad_time() {
    let dir = TempDir::new().unwrap();
    let args = ScheduleArgs {
        every: "daily".to_string(),
        at: "2am".to_string(),
    };
    let err = schedule::run_schedule(args, test_config(&dir), LogLevel::Quiet).unwrap_err();
    assert!(err.contains("invalid time"));
}

#[test]
fn test_run_command_dispatch_with_root_override() {
    let dir = TempDir::new().unwrap();
    let cli = parse_args([
        "renovar",
        "init",
        "--root",
        dir.path().to_str().unwrap(),
        "--quiet",
    ])
    .unwrap();
    run_command(cli).unwrap();
    assert!(dir.path().join("data").join("pending").is_dir());
}

#[test]
fn test_run_command_reports_config_errors() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("broken.json");
    std::fs::write(&config_path, "{not json").unwrap();

    let cli = parse_args([
        "renovar",
        "status",
        "--config",
        config_path.to_str().unwrap(),
        "--quiet",
    ])
    .unwrap();
    let err = run_command(cli).unwrap_err();
    assert!(err.starts_with("Config error:"));
}

#[test]
fn test_resolve_config_loads_file_and_applies_root() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("pipeline.json");
    std::fs::write(&config_path, r#"{"seed": 7}"#).unwrap();

    let cli = parse_args([
        "renovar",
        "run",
        "--config",
        config_path.to_str().unwrap(),
        "--root",
        dir.path().to_str().unwrap(),
    ])
    .unwrap();
    let config = resolve_config(&cli).unwrap();
    assert_eq!(config.seed, 7);
    assert_eq!(config.root, dir.path());
}

#[test]
fn test_resolve_config_rejects_invalid_thresholds() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("pipeline.json");
    std::fs::write(&config_path, r#"{"thresholds": {"min_accuracy": 1.5}}"#).unwrap();

    let cli = parse_args(["renovar", "run", "--config", config_path.to_str().unwrap()]).unwrap();
    let err = resolve_config(&cli).unwrap_err();
    assert!(err.contains("min_accuracy"));
}
