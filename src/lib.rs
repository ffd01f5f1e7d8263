//! Renovar: a continuous-learning pipeline for credit-risk models.
//!
//! The pipeline retrains a binary delinquency classifier as new customer
//! batches arrive, gates every candidate against the active model, promotes
//! the ones that pass, and can roll back a bad promotion. All state lives
//! under one directory root; every deployment is recorded in an append-only
//! ledger.
//!
//! # Example
//!
//! ```no_run
//! use renovar::config::PipelineConfig;
//! use renovar::pipeline::Pipeline;
//!
//! let config = PipelineConfig::default().with_root("pipeline-state");
//! let report = Pipeline::new(config).run();
//! print!("{}", report.render());
//! ```

pub mod cli;
pub mod config;
pub mod data;
pub mod deploy;
pub mod model;
pub mod oplog;
pub mod pipeline;
pub mod score;
pub mod train;
pub mod validate;

pub use config::PipelineConfig;
pub use pipeline::{Pipeline, RunOutcome, RunReport};
