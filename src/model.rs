//! Model families and the external evaluator interface.
//!
//! This crate never fits a model itself. The mixed-model solve (GBLUP) and
//! the MCMC samplers (BRR, Bayesian LASSO, BayesB) live behind the
//! [`ModelEvaluator`] trait and are supplied by the caller.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2};
use thiserror::Error;

/// The closed set of whole-genome regression families under comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFamily {
    /// Genomic BLUP: mixed model with a relationship kernel, closed-form solve.
    Gblup,
    /// Bayesian Ridge Regression: Gaussian marker-effect priors.
    Brr,
    /// Bayesian LASSO: double-exponential marker-effect priors.
    Lasso,
    /// BayesB: point mass at zero plus scaled-t mixture priors.
    BayesB,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 4] = [
        ModelFamily::Gblup,
        ModelFamily::Brr,
        ModelFamily::Lasso,
        ModelFamily::BayesB,
    ];

    /// Canonical name, used in result file names and summary headers.
    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::Gblup => "GBLUP",
            ModelFamily::Brr => "BRR",
            ModelFamily::Lasso => "LASSO",
            ModelFamily::BayesB => "BayesB",
        }
    }

    /// Whether the family consumes a relationship kernel rather than the
    /// raw marker design matrix.
    pub fn uses_kernel(&self) -> bool {
        matches!(self, ModelFamily::Gblup)
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GBLUP" => Ok(ModelFamily::Gblup),
            "BRR" => Ok(ModelFamily::Brr),
            "LASSO" | "BL" => Ok(ModelFamily::Lasso),
            "BAYESB" => Ok(ModelFamily::BayesB),
            other => Err(format!(
                "unknown model family '{other}' (expected GBLUP, BRR, LASSO or BayesB)"
            )),
        }
    }
}

/// What the evaluator is given to regress on. Each family takes exactly one
/// of the two shapes; the runner selects it via [`ModelFamily::uses_kernel`].
#[derive(Debug, Clone, Copy)]
pub enum ModelInput<'a> {
    /// n x n relationship matrix (GBLUP).
    Kernel(&'a Array2<f64>),
    /// n x p marker design matrix (BRR, LASSO, BayesB).
    Design(&'a Array2<f64>),
}

impl ModelInput<'_> {
    /// Number of individuals the input covers.
    pub fn n_individuals(&self) -> usize {
        match self {
            ModelInput::Kernel(g) => g.nrows(),
            ModelInput::Design(m) => m.nrows(),
        }
    }
}

/// Sampler controls. GBLUP's closed-form solve ignores them.
#[derive(Debug, Clone, Copy)]
pub struct IterationControls {
    pub iterations: usize,
    pub burn_in: usize,
}

/// Variance-component estimates reported by an evaluator.
///
/// Not every family reports every parameter; a field that does not apply to
/// the fitted model is `None`, never zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarianceComponents {
    /// Additive genetic variance (GBLUP, BRR).
    pub var_u: Option<f64>,
    /// Residual variance.
    pub var_e: Option<f64>,
    /// Regularization parameter (LASSO).
    pub lambda: Option<f64>,
    /// Prior degrees of freedom for marker effects (BRR).
    pub df_b: Option<f64>,
    /// Prior scale for marker effects (BRR).
    pub s_b: Option<f64>,
    /// Prior degrees of freedom (BayesB).
    pub df0: Option<f64>,
    /// Prior scale (BayesB).
    pub s0: Option<f64>,
}

impl VarianceComponents {
    /// Heritability estimate, available when both variance components are.
    pub fn heritability(&self) -> Option<f64> {
        match (self.var_u, self.var_e) {
            (Some(u), Some(e)) if u + e > 0.0 => Some(u / (u + e)),
            _ => None,
        }
    }
}

/// Full result of one model fit.
#[derive(Debug, Clone)]
pub struct FitOutput {
    /// Fitted/predicted values for every individual, masked entries included.
    pub predictions: Array1<f64>,
    /// Variance-component estimates, when the evaluator reports them.
    pub variance: Option<VarianceComponents>,
}

/// Failures raised by an evaluator, surfaced to the caller verbatim.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("model fit did not converge: {0}")]
    NotConverged(String),

    #[error("evaluator rejected its input: {0}")]
    InvalidInput(String),

    #[error("evaluator backend failure: {0}")]
    Backend(String),
}

/// External model-fitting collaborator.
///
/// `phenotype` carries `f64::NAN` at every held-out position; the evaluator
/// must return a prediction for every individual, masked ones included. The
/// returned vector has the same length as `phenotype`.
pub trait ModelEvaluator {
    fn fit(
        &self,
        phenotype: &Array1<f64>,
        input: ModelInput<'_>,
        family: ModelFamily,
        controls: &IterationControls,
    ) -> Result<FitOutput, EvaluatorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_names_round_trip() {
        for family in ModelFamily::ALL {
            assert_eq!(family.name().parse::<ModelFamily>().unwrap(), family);
        }
        assert_eq!("gblup".parse::<ModelFamily>().unwrap(), ModelFamily::Gblup);
        assert_eq!("BL".parse::<ModelFamily>().unwrap(), ModelFamily::Lasso);
        assert!("GBLUPX".parse::<ModelFamily>().is_err());
    }

    #[test]
    fn only_gblup_takes_the_kernel() {
        assert!(ModelFamily::Gblup.uses_kernel());
        assert!(!ModelFamily::Brr.uses_kernel());
        assert!(!ModelFamily::Lasso.uses_kernel());
        assert!(!ModelFamily::BayesB.uses_kernel());
    }

    #[test]
    fn heritability_needs_both_components() {
        let vc = VarianceComponents {
            var_u: Some(0.6),
            var_e: Some(0.4),
            ..Default::default()
        };
        assert_eq!(vc.heritability(), Some(0.6));

        let vc = VarianceComponents { var_u: Some(0.6), ..Default::default() };
        assert_eq!(vc.heritability(), None);

        // Not-applicable parameters stay absent, not zero.
        let vc = VarianceComponents::default();
        assert_eq!(vc.lambda, None);
        assert_eq!(vc.heritability(), None);
    }
}
