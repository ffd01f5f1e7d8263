//! One-shot pipeline orchestration.
//!
//! A run is a straight line: merge pending batches, train a candidate,
//! validate it against the active model, deploy or reject. Each step's
//! failure stops the run and lands in the report; the next scheduled run
//! starts clean. The run lock makes manual and scheduled invocations
//! mutually exclusive.

pub mod lock;
pub mod report;
pub mod schedule;

pub use lock::{LockError, RunLock};
pub use report::{RunOutcome, RunReport};
pub use schedule::{run_on_cadence, Cadence, Recurrence};

use crate::config::PipelineConfig;
use crate::data::DatasetStore;
use crate::deploy::Deployer;
use crate::oplog::OpLog;
use crate::train::{held_out, Trainer};
use crate::validate::Validator;

/// Owns every component for one state root.
pub struct Pipeline {
    config: PipelineConfig,
    store: DatasetStore,
    trainer: Trainer,
    validator: Validator,
    deployer: Deployer,
    oplog: OpLog,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let oplog = OpLog::new(config.layout().oplog_file());
        let store = DatasetStore::new(config.layout(), oplog.clone());
        let trainer = Trainer::new(&config, oplog.clone());
        let validator = Validator::new(&config, oplog.clone());
        let deployer = Deployer::new(&config, oplog.clone());
        Self {
            config,
            store,
            trainer,
            validator,
            deployer,
            oplog,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    pub fn deployer(&self) -> &Deployer {
        &self.deployer
    }

    /// One complete run. Always returns a report; never panics on bad state.
    pub fn run(&self) -> RunReport {
        let mut report = RunReport::begin();
        let layout = self.config.layout();
        if let Err(e) = layout.ensure() {
            let message = format!("cannot prepare state directories: {e}");
            self.oplog.error("pipeline", &message);
            report.fail(message);
            return report;
        }
        let _lock = match RunLock::acquire(layout.lock_file()) {
            Ok(lock) => lock,
            Err(e) => {
                let message = e.to_string();
                self.oplog.error("pipeline", &message);
                report.fail(message);
                return report;
            }
        };
        self.oplog.info("pipeline", "run started");

        let pending = match self.store.list_pending_batches() {
            Ok(pending) => pending,
            Err(e) => return self.fail(report, format!("listing pending batches failed: {e}")),
        };
        if pending.is_empty() {
            self.oplog.info("pipeline", "no pending batches; run skipped");
            report.complete(RunOutcome::Skipped);
            return report;
        }
        report.pending_batches = pending.len();

        let corpus = match self.store.merge_and_clean() {
            Ok(corpus) => corpus,
            Err(e) => return self.fail(report, format!("merge failed: {e}")),
        };
        report.corpus_rows = corpus.len();

        let outcome = match self.trainer.train(&corpus) {
            Ok(outcome) => outcome,
            Err(e) => return self.fail(report, format!("training failed: {e}")),
        };
        report.trained_version = Some(outcome.version);
        report.metrics = Some(outcome.evaluation.metrics);

        // the same fraction and seed reproduce training's held-out rows
        let held_out = match held_out(&corpus, self.config.test_fraction, self.config.seed) {
            Ok(held_out) => held_out,
            Err(e) => return self.fail(report, format!("validation split failed: {e}")),
        };
        let verdict = self.validator.validate(outcome.version, &held_out);
        let deploy_now = verdict.should_deploy();
        report.validation = Some(verdict);

        if deploy_now {
            if let Err(e) = self.deployer.deploy(outcome.version) {
                return self.fail(report, format!("deployment failed: {e}"));
            }
            report.complete(RunOutcome::Deployed);
        } else {
            report.complete(RunOutcome::Rejected);
        }
        self.oplog
            .info("pipeline", &format!("run finished: {}", report.outcome));
        report
    }

    fn fail(&self, mut report: RunReport, message: String) -> RunReport {
        self.oplog.error("pipeline", &message);
        report.fail(message);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Frame, Record};
    use crate::deploy::{Ledger, LedgerAction};
    use crate::train::ModelVersion;
    use std::fs;
    use tempfile::TempDir;

    fn pipeline(dir: &TempDir) -> Pipeline {
        Pipeline::new(PipelineConfig::default().with_root(dir.path()))
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

    /// Cleanly separable batch, one positive in five.
    fn batch(n: usize) -> Frame {
        Frame::new((0..n).map(|i| record(i, i % 5 == 0)).collect())
    }

    /// Constant features with alternating labels; nothing to learn, so the
    /// candidate lands at 0.5 accuracy and fails the floors.
    fn noise_batch(n: usize) -> Frame {
        Frame::new(
            (0..n)
                .map(|i| {
                    let mut r = record(i, false);
                    r.utilisation_pct = Some(50.0);
                    r.avg_payment_ratio = Some(0.5);
                    r.cash_withdrawal_pct = Some(10.0);
                    r.dpd_bucket_next_month = Some(f64::from(u8::from(i % 2 == 0)));
                    r
                })
                .collect(),
        )
    }

    #[test]
    fn test_run_deploys_first_candidate() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir);
        let layout = p.config.layout();
        layout.ensure().unwrap();
        batch(100)
            .save(&layout.pending_dir().join("batch_001.csv"))
            .unwrap();

        let report = p.run();
        assert_eq!(report.outcome, RunOutcome::Deployed, "{:?}", report.error);
        assert_eq!(report.pending_batches, 1);
        assert_eq!(report.corpus_rows, 100);
        assert_eq!(report.trained_version, Some(ModelVersion::new(1, 0)));
        assert!(layout.active_model().exists());

        let entries = Ledger::new(layout.ledger_file()).entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, LedgerAction::Deployed);
        // lock released on exit
        assert!(!layout.lock_file().exists());
    }

    #[test]
    fn test_run_without_new_data_skips() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir);
        let layout = p.config.layout();
        layout.ensure().unwrap();
        batch(100)
            .save(&layout.pending_dir().join("batch_001.csv"))
            .unwrap();

        assert_eq!(p.run().outcome, RunOutcome::Deployed);
        let second = p.run();
        assert_eq!(second.outcome, RunOutcome::Skipped);
        assert!(!second.is_failure());
        assert!(!layout.lock_file().exists());
    }

    #[test]
    fn test_rejected_candidate_leaves_active_slot_alone() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir);
        let layout = p.config.layout();
        layout.ensure().unwrap();
        noise_batch(100)
            .save(&layout.pending_dir().join("batch_001.csv"))
            .unwrap();

        let report = p.run();
        assert_eq!(report.outcome, RunOutcome::Rejected);
        let verdict = report.validation.unwrap();
        assert!(!verdict.reasons.is_empty());
        // the version is kept for inspection, but never activated
        assert!(layout.version_artifact(ModelVersion::new(1, 0)).exists());
        assert!(!layout.active_model().exists());
        assert!(Ledger::new(layout.ledger_file())
            .entries()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_concurrent_run_blocked_by_lock() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir);
        let layout = p.config.layout();
        layout.ensure().unwrap();
        batch(100)
            .save(&layout.pending_dir().join("batch_001.csv"))
            .unwrap();
        let _held = RunLock::acquire(layout.lock_file()).unwrap();

        let report = p.run();
        assert!(report.is_failure());
        assert!(report.error.unwrap().contains("lock"));
        // the batch was not consumed
        assert_eq!(p.store.list_pending_batches().unwrap().len(), 1);
    }

    #[test]
    fn test_merge_failure_keeps_batches_pending() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir);
        let layout = p.config.layout();
        layout.ensure().unwrap();
        batch(50)
            .save(&layout.pending_dir().join("batch_001.csv"))
            .unwrap();
        // corpus path occupied by a directory: the merge write cannot land
        fs::create_dir_all(layout.corpus_file()).unwrap();

        let report = p.run();
        assert!(report.is_failure());
        assert!(report.error.unwrap().contains("merge failed"));
        // the count reports what the run found, not what it consumed
        assert_eq!(report.pending_batches, 1);
        assert_eq!(p.store.list_pending_batches().unwrap().len(), 1);
        assert!(!layout.lock_file().exists());
    }

    #[test]
    fn test_training_failure_is_reported_not_thrown() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir);
        let layout = p.config.layout();
        layout.ensure().unwrap();
        // all-negative labels cannot be stratified
        let all_negative = Frame::new((0..50).map(|i| record(i, false)).collect());
        all_negative
            .save(&layout.pending_dir().join("batch_001.csv"))
            .unwrap();

        let report = p.run();
        assert!(report.is_failure());
        assert!(report.error.unwrap().contains("training failed"));
        // merge committed before training started
        assert!(layout.corpus_file().exists());
        assert_eq!(
            fs::read_dir(layout.versions_dir()).unwrap().count(),
            0,
            "no version persisted for a failed attempt"
        );
    }
}
