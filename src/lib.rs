//! Repeated random-partition cross-validation for genomic prediction.
//!
//! The crate owns the reproducible core of a genomic prediction study:
//! deterministic training/testing partitions derived from a root seed,
//! genomic relationship matrix construction, per-replicate prediction
//! accuracy (Pearson correlation on the held-out individuals), and the
//! aggregation of replicate accuracies into per-model summary tables.
//!
//! Model fitting itself (mixed-model solve for GBLUP, MCMC for the Bayesian
//! regressions) is delegated to an external collaborator behind the
//! [`model::ModelEvaluator`] trait; this crate never implements a solver or
//! a sampler.

pub mod accuracy;
pub mod config;
pub mod dataset;
pub mod grm;
pub mod model;
pub mod partition;
pub mod results;
pub mod runner;

pub use accuracy::{pearson, pearson_at, summarize, AccuracyError, Summary};
pub use config::{ConfigError, CvConfig};
pub use dataset::{Dataset, DatasetError};
pub use grm::{relationship_matrix, GrmError};
pub use model::{
    EvaluatorError, FitOutput, IterationControls, ModelEvaluator, ModelFamily, ModelInput,
    VarianceComponents,
};
pub use partition::{replicate_seeds, Partition};
pub use results::{summarize_families, FamilySummary, ResultError, ResultTable};
pub use runner::{run_cross_validation, CvError, CvOutcome};
