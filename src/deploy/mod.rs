//! Atomic promotion of a validated version into the active slot.
//!
//! The outgoing active model is backed up (copied, never moved) before the
//! slot changes, so there is no window with no servable model. Slot writes go
//! through a staged file in the same directory and land with one rename. The
//! staged artifact's digest must match the digest recorded at training time
//! before the rename happens.
//!
//! Failure semantics: a failing step aborts the deployment and is logged, but
//! steps that already completed (backup, slot copy) are not unwound.

pub mod ledger;

pub use ledger::{Ledger, LedgerAction, LedgerEntry, LedgerError};

use crate::config::{Layout, PipelineConfig};
use crate::model::file_digest;
use crate::oplog::OpLog;
use crate::train::{MetadataError, ModelVersion, VersionMetadata};
use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Deployment errors.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("version {0} has no persisted artifact or metadata")]
    VersionNotFound(ModelVersion),

    #[error("artifact digest mismatch for {version}: recorded {recorded}, staged copy {actual}")]
    DigestMismatch {
        version: ModelVersion,
        recorded: String,
        actual: String,
    },

    #[error("nothing to roll back to: fewer than two ledger entries")]
    NothingToRollBack,

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DeployError>;

/// Promotes versions into the active slot and keeps the ledger.
#[derive(Debug, Clone)]
pub struct Deployer {
    layout: Layout,
    ledger: Ledger,
    oplog: OpLog,
}

impl Deployer {
    pub fn new(config: &PipelineConfig, oplog: OpLog) -> Self {
        let layout = config.layout();
        let ledger = Ledger::new(layout.ledger_file());
        Self {
            layout,
            ledger,
            oplog,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Promote `version` into the active slot and append a `deployed` entry.
    pub fn deploy(&self, version: ModelVersion) -> Result<()> {
        let metadata = match self.promote(version) {
            Ok(metadata) => metadata,
            Err(e) => {
                self.oplog
                    .error("deploy", &format!("promoting {version} failed: {e}"));
                return Err(e);
            }
        };
        self.ledger.append(&LedgerEntry::new(
            version,
            LedgerAction::Deployed,
            Some(metadata.metrics),
        ))?;
        self.oplog
            .info("deploy", &format!("version {version} is now active"));
        Ok(())
    }

    /// Return to `target`, or to the version active before the most recent
    /// deployment when no target is given. Appends a `rollback` entry on top
    /// of the `deployed` entry the delegated promotion wrote.
    pub fn rollback(&self, target: Option<ModelVersion>) -> Result<ModelVersion> {
        let target = match target {
            Some(version) => version,
            None => self
                .ledger
                .previous_version()?
                .ok_or(DeployError::NothingToRollBack)?,
        };
        self.oplog
            .info("deploy", &format!("rolling back to version {target}"));
        self.deploy(target)?;
        self.ledger
            .append(&LedgerEntry::new(target, LedgerAction::Rollback, None))?;
        Ok(target)
    }

    /// Metadata of the active model, or `None` when the slot is empty or
    /// unreadable.
    pub fn active_model_info(&self) -> Option<VersionMetadata> {
        VersionMetadata::load(&self.layout.active_metadata()).ok()
    }

    /// The most recent ledger entries, oldest first.
    pub fn deployment_history(&self, limit: usize) -> Result<Vec<LedgerEntry>> {
        Ok(self.ledger.tail(limit)?)
    }

    fn promote(&self, version: ModelVersion) -> Result<VersionMetadata> {
        let artifact_path = self.layout.version_artifact(version);
        let metadata_path = self.layout.version_metadata(version);
        if !artifact_path.exists() || !metadata_path.exists() {
            return Err(DeployError::VersionNotFound(version));
        }
        let mut metadata = VersionMetadata::load(&metadata_path)?;

        fs::create_dir_all(self.layout.active_dir())?;
        self.backup_active()?;

        // stage next to the destination so the final rename is atomic
        let staged_model = self.layout.active_dir().join(".staging-model.json");
        fs::copy(&artifact_path, &staged_model)?;
        let actual = file_digest(&staged_model)?;
        if actual != metadata.artifact_sha256 {
            let _ = fs::remove_file(&staged_model);
            return Err(DeployError::DigestMismatch {
                version,
                recorded: metadata.artifact_sha256,
                actual,
            });
        }
        fs::rename(&staged_model, self.layout.active_model())?;

        metadata.deployed = true;
        metadata.deployment_date = Some(Utc::now());
        // both the versioned record and the active copy reflect deployment
        metadata.save(&metadata_path)?;
        let staged_metadata = self.layout.active_dir().join(".staging-metadata.json");
        metadata.save(&staged_metadata)?;
        fs::rename(&staged_metadata, self.layout.active_metadata())?;
        Ok(metadata)
    }

    /// Copy the current slot contents to timestamped siblings. No-op when the
    /// slot is empty.
    fn backup_active(&self) -> Result<()> {
        let model = self.layout.active_model();
        if !model.exists() {
            return Ok(());
        }
        let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let model_backup = self.backup_destination("model", &stamp);
        fs::copy(&model, &model_backup)?;
        let metadata = self.layout.active_metadata();
        if metadata.exists() {
            fs::copy(&metadata, self.backup_destination("metadata", &stamp))?;
        }
        self.oplog.info(
            "deploy",
            &format!("backed up active model to {}", model_backup.display()),
        );
        Ok(())
    }

    fn backup_destination(&self, prefix: &str, stamp: &str) -> PathBuf {
        let dir = self.layout.active_dir();
        let mut path = dir.join(format!("{prefix}_backup_{stamp}.json"));
        let mut attempt = 1;
        while path.exists() {
            path = dir.join(format!("{prefix}_backup_{stamp}_{attempt}.json"));
            attempt += 1;
        }
        path
    }
}
