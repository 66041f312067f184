//! Replicate loop for one model family.
//!
//! Replicates are independent: each gets its own sub-seed, partition and
//! evaluator call, and writes into its own result slot. They run in
//! parallel over the rayon pool; nothing is shared mutably across them.

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use thiserror::Error;

use crate::accuracy::{pearson_at, AccuracyError};
use crate::config::{ConfigError, CvConfig};
use crate::dataset::Dataset;
use crate::model::{
    EvaluatorError, IterationControls, ModelEvaluator, ModelInput, VarianceComponents,
};
use crate::partition::{replicate_seeds, Partition};
use crate::results::ResultTable;

#[derive(Debug, Error)]
pub enum CvError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("kernel is {rows} x {cols}, but the dataset has {individuals} individuals")]
    KernelShapeMismatch {
        rows: usize,
        cols: usize,
        individuals: usize,
    },

    #[error("{failed} of {total} replicate(s) failed; see log for details")]
    ReplicatesFailed { failed: usize, total: usize },
}

/// What went wrong inside one replicate. Reported whole: a failed replicate
/// contributes nothing to the result table.
#[derive(Debug, Error)]
enum ReplicateError {
    #[error(transparent)]
    Evaluator(#[from] EvaluatorError),

    #[error(transparent)]
    Accuracy(#[from] AccuracyError),

    #[error("evaluator returned {found} predictions for {expected} individuals")]
    PredictionLength { expected: usize, found: usize },
}

/// Result of a full run for one model family.
#[derive(Debug, Clone)]
pub struct CvOutcome {
    pub table: ResultTable,
    /// Sub-seed used by each replicate, in replicate order.
    pub seeds: Vec<u64>,
    /// Variance-component estimates per replicate, where reported.
    pub variance: Vec<Option<VarianceComponents>>,
}

/// Run `config.replicates` training/testing evaluations of one model family
/// and collect the per-replicate testing-set correlations.
///
/// The kernel is consulted only for GBLUP; the Bayesian families regress on
/// the dataset's marker matrix directly. Evaluator and correlation failures
/// are logged per replicate and the run fails as a whole if any replicate
/// failed, so the persisted table is never partially trustworthy.
pub fn run_cross_validation<E>(
    dataset: &Dataset,
    kernel: &Array2<f64>,
    config: &CvConfig,
    evaluator: &E,
) -> Result<CvOutcome, CvError>
where
    E: ModelEvaluator + Sync,
{
    config.validate()?;

    let n = dataset.n_individuals();
    if config.model.uses_kernel() && (kernel.nrows() != n || kernel.ncols() != n) {
        return Err(CvError::KernelShapeMismatch {
            rows: kernel.nrows(),
            cols: kernel.ncols(),
            individuals: n,
        });
    }

    let seeds = replicate_seeds(config.replicates);
    let controls = IterationControls {
        iterations: config.iterations,
        burn_in: config.burn_in,
    };

    info!(
        "Cross-validating {}: {} replicates, {} individuals, {:.0}% held out",
        config.model,
        config.replicates,
        n,
        config.perc_tst * 100.0
    );

    let pb_style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} replicates ({percent}%) ETA: {eta}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    let pb = ProgressBar::new(config.replicates as u64).with_style(pb_style);

    let outcomes: Vec<Result<(f64, Option<VarianceComponents>), ReplicateError>> = seeds
        .par_iter()
        .enumerate()
        .map(|(k, &seed)| {
            let result = run_one_replicate(dataset, kernel, config, evaluator, &controls, k, seed);
            pb.inc(1);
            result
        })
        .collect();
    pb.finish_with_message("replicates complete");

    let total = outcomes.len();
    let mut accuracies = Vec::with_capacity(total);
    let mut variance = Vec::with_capacity(total);
    let mut failed = 0usize;

    for (k, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok((accuracy, vc)) => {
                accuracies.push(accuracy);
                variance.push(vc);
            }
            Err(e) => {
                error!("Replicate {} (seed {}) failed: {}", k + 1, seeds[k], e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(CvError::ReplicatesFailed { failed, total });
    }

    Ok(CvOutcome {
        table: ResultTable {
            model: config.model,
            accuracies,
        },
        seeds,
        variance,
    })
}

fn run_one_replicate<E>(
    dataset: &Dataset,
    kernel: &Array2<f64>,
    config: &CvConfig,
    evaluator: &E,
    controls: &IterationControls,
    k: usize,
    seed: u64,
) -> Result<(f64, Option<VarianceComponents>), ReplicateError>
where
    E: ModelEvaluator + Sync,
{
    let n = dataset.n_individuals();
    let partition = Partition::draw(n, config.perc_tst, seed);
    debug!(
        "Replicate {}: seed {}, {} training / {} testing",
        k + 1,
        seed,
        partition.training.len(),
        partition.testing.len()
    );

    // Mask the held-out phenotypes; the evaluator sees NaN there.
    let mut masked: Array1<f64> = dataset.phenotypes.clone();
    for &i in &partition.testing {
        masked[i] = f64::NAN;
    }

    let input = if config.model.uses_kernel() {
        ModelInput::Kernel(kernel)
    } else {
        ModelInput::Design(&dataset.genotypes)
    };

    let fit = evaluator.fit(&masked, input, config.model, controls)?;
    if fit.predictions.len() != n {
        return Err(ReplicateError::PredictionLength {
            expected: n,
            found: fit.predictions.len(),
        });
    }

    let accuracy = pearson_at(&fit.predictions, &dataset.phenotypes, &partition.testing)?;
    if let Some(h2) = fit.variance.as_ref().and_then(|vc| vc.heritability()) {
        debug!("Replicate {}: accuracy {:.4}, H2 {:.3}", k + 1, accuracy, h2);
    } else {
        debug!("Replicate {}: accuracy {:.4}", k + 1, accuracy);
    }

    Ok((accuracy, fit.variance))
}
