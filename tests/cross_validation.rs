//! End-to-end cross-validation runs against a stub evaluator.
//!
//! The stub stands in for the external mixed-model/MCMC collaborator: it
//! checks that the runner hands it the right input shape for the family,
//! echoes training phenotypes and produces a deterministic guess for the
//! masked individuals.

use ndarray::{Array1, Array2};

use genomic_cv::{
    relationship_matrix, run_cross_validation, summarize_families, CvConfig, CvError, Dataset,
    EvaluatorError, FitOutput, IterationControls, ModelEvaluator, ModelFamily, ModelInput,
    ResultTable, VarianceComponents,
};

fn toy_dataset(n: usize, p: usize) -> Dataset {
    let genotypes = Array2::from_shape_fn((n, p), |(i, j)| ((i * 7 + j * 3 + i * j) % 3) as f64);
    // Phenotype rises with the index plus a repeating wiggle, so any
    // index-monotone prediction correlates with it without being exact.
    let phenotypes = Array1::from_shape_fn(n, |i| i as f64 + ((i % 5) as f64) * 0.8);
    let sample_ids = (0..n).map(|i| format!("s{i}")).collect();
    Dataset {
        sample_ids,
        genotypes,
        phenotypes,
    }
}

/// Stub collaborator: passes training phenotypes through and predicts the
/// individual's index for masked entries.
struct StubEvaluator;

impl ModelEvaluator for StubEvaluator {
    fn fit(
        &self,
        phenotype: &Array1<f64>,
        input: ModelInput<'_>,
        family: ModelFamily,
        _controls: &IterationControls,
    ) -> Result<FitOutput, EvaluatorError> {
        // The runner must pair GBLUP with the kernel and everything else
        // with the design matrix.
        match (family, &input) {
            (ModelFamily::Gblup, ModelInput::Kernel(_)) => {}
            (ModelFamily::Gblup, ModelInput::Design(_)) => {
                return Err(EvaluatorError::InvalidInput(
                    "GBLUP was given a design matrix".into(),
                ))
            }
            (_, ModelInput::Kernel(_)) => {
                return Err(EvaluatorError::InvalidInput(format!(
                    "{family} was given a kernel"
                )))
            }
            (_, ModelInput::Design(_)) => {}
        }
        if input.n_individuals() != phenotype.len() {
            return Err(EvaluatorError::InvalidInput("shape mismatch".into()));
        }

        let predictions = Array1::from_shape_fn(phenotype.len(), |i| {
            if phenotype[i].is_nan() {
                i as f64
            } else {
                phenotype[i]
            }
        });

        let variance = match family {
            ModelFamily::Gblup => VarianceComponents {
                var_u: Some(0.6),
                var_e: Some(0.4),
                ..Default::default()
            },
            ModelFamily::Brr => VarianceComponents {
                var_u: Some(0.5),
                var_e: Some(0.5),
                df_b: Some(5.0),
                s_b: Some(0.01),
                ..Default::default()
            },
            ModelFamily::Lasso => VarianceComponents {
                lambda: Some(22.0),
                var_e: Some(0.5),
                ..Default::default()
            },
            ModelFamily::BayesB => VarianceComponents {
                df0: Some(5.0),
                s0: Some(0.01),
                var_e: Some(0.5),
                ..Default::default()
            },
        };

        Ok(FitOutput {
            predictions,
            variance: Some(variance),
        })
    }
}

/// Collaborator that never converges, to exercise failure reporting.
struct FailingEvaluator;

impl ModelEvaluator for FailingEvaluator {
    fn fit(
        &self,
        _phenotype: &Array1<f64>,
        _input: ModelInput<'_>,
        _family: ModelFamily,
        _controls: &IterationControls,
    ) -> Result<FitOutput, EvaluatorError> {
        Err(EvaluatorError::NotConverged("chain stuck".into()))
    }
}

fn config(model: ModelFamily) -> CvConfig {
    CvConfig {
        root_seed: 123,
        replicates: 10,
        perc_tst: 0.3,
        model,
        iterations: 12_000,
        burn_in: 2_000,
    }
}

#[test]
fn every_family_runs_to_completion() {
    let dataset = toy_dataset(100, 8);
    let (kernel, _) = relationship_matrix(&dataset.genotypes).unwrap();

    for family in ModelFamily::ALL {
        let outcome =
            run_cross_validation(&dataset, &kernel, &config(family), &StubEvaluator).unwrap();
        assert_eq!(outcome.table.model, family);
        assert_eq!(outcome.table.accuracies.len(), 10);
        assert_eq!(outcome.seeds.len(), 10);
        assert!(outcome
            .table
            .accuracies
            .iter()
            .all(|r| r.is_finite() && (-1.0..=1.0).contains(r)));
        // Index-based predictions against an index-monotone phenotype.
        assert!(outcome.table.accuracies.iter().all(|&r| r > 0.9));
    }
}

#[test]
fn runs_are_deterministic() {
    let dataset = toy_dataset(100, 8);
    let (kernel, _) = relationship_matrix(&dataset.genotypes).unwrap();
    let cfg = config(ModelFamily::Gblup);

    let a = run_cross_validation(&dataset, &kernel, &cfg, &StubEvaluator).unwrap();
    let b = run_cross_validation(&dataset, &kernel, &cfg, &StubEvaluator).unwrap();
    assert_eq!(a.table.accuracies, b.table.accuracies);
    assert_eq!(a.seeds, b.seeds);
}

#[test]
fn sub_seeds_are_the_documented_sequence() {
    let dataset = toy_dataset(50, 4);
    let (kernel, _) = relationship_matrix(&dataset.genotypes).unwrap();
    let outcome =
        run_cross_validation(&dataset, &kernel, &config(ModelFamily::Brr), &StubEvaluator).unwrap();
    assert_eq!(
        outcome.seeds,
        vec![
            1_000, 112_000, 223_000, 334_000, 445_000, 556_000, 667_000, 778_000, 889_000,
            1_000_000
        ]
    );
}

#[test]
fn variance_components_are_carried_per_replicate() {
    let dataset = toy_dataset(60, 6);
    let (kernel, _) = relationship_matrix(&dataset.genotypes).unwrap();

    let outcome =
        run_cross_validation(&dataset, &kernel, &config(ModelFamily::Gblup), &StubEvaluator)
            .unwrap();
    assert_eq!(outcome.variance.len(), 10);
    for vc in outcome.variance.iter().flatten() {
        assert_eq!(vc.heritability(), Some(0.6));
        // GBLUP reports no LASSO/BayesB parameters.
        assert_eq!(vc.lambda, None);
        assert_eq!(vc.df0, None);
    }

    let outcome =
        run_cross_validation(&dataset, &kernel, &config(ModelFamily::Lasso), &StubEvaluator)
            .unwrap();
    for vc in outcome.variance.iter().flatten() {
        assert_eq!(vc.lambda, Some(22.0));
        assert_eq!(vc.heritability(), None);
    }
}

#[test]
fn evaluator_failure_fails_the_run() {
    let dataset = toy_dataset(40, 4);
    let (kernel, _) = relationship_matrix(&dataset.genotypes).unwrap();
    let err = run_cross_validation(&dataset, &kernel, &config(ModelFamily::BayesB), &FailingEvaluator)
        .unwrap_err();
    assert!(matches!(
        err,
        CvError::ReplicatesFailed { failed: 10, total: 10 }
    ));
}

#[test]
fn invalid_config_is_rejected_before_any_fit() {
    let dataset = toy_dataset(40, 4);
    let (kernel, _) = relationship_matrix(&dataset.genotypes).unwrap();
    let cfg = CvConfig {
        perc_tst: 1.3,
        ..config(ModelFamily::Gblup)
    };
    // FailingEvaluator would blow up any replicate; the config must be
    // rejected before one is attempted.
    let err = run_cross_validation(&dataset, &kernel, &cfg, &FailingEvaluator).unwrap_err();
    assert!(matches!(err, CvError::Config(_)));
}

#[test]
fn kernel_shape_mismatch_is_rejected_for_gblup() {
    let dataset = toy_dataset(40, 4);
    let small = Array2::<f64>::eye(10);
    let err = run_cross_validation(&dataset, &small, &config(ModelFamily::Gblup), &StubEvaluator)
        .unwrap_err();
    assert!(matches!(err, CvError::KernelShapeMismatch { .. }));
}

#[test]
fn persisted_tables_aggregate_across_families() {
    let dataset = toy_dataset(80, 6);
    let (kernel, _) = relationship_matrix(&dataset.genotypes).unwrap();
    let dir = tempfile::tempdir().unwrap();

    // Run three of the four families and persist their tables; BayesB is
    // deliberately absent.
    for family in [ModelFamily::Gblup, ModelFamily::Brr, ModelFamily::Lasso] {
        let outcome =
            run_cross_validation(&dataset, &kernel, &config(family), &StubEvaluator).unwrap();
        outcome.table.save(dir.path()).unwrap();
    }

    let summaries = summarize_families(dir.path(), &ModelFamily::ALL).unwrap();
    assert_eq!(summaries.len(), 3);
    assert!(summaries.iter().all(|s| s.replicates == 10));

    // Reloading gives back exactly what the run produced.
    let reloaded = ResultTable::load(dir.path(), ModelFamily::Gblup).unwrap();
    let fresh = run_cross_validation(&dataset, &kernel, &config(ModelFamily::Gblup), &StubEvaluator)
        .unwrap();
    for (a, b) in reloaded.accuracies.iter().zip(&fresh.table.accuracies) {
        assert!((a - b).abs() < 1e-12);
    }
}
