//! Run configuration and its validation.

use thiserror::Error;

use crate::model::ModelFamily;

/// Errors rejected before any partition is generated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("testing-set fraction must lie strictly between 0 and 1, got {0}")]
    InvalidTestFraction(f64),

    #[error("replicate count must be positive")]
    NoReplicates,

    #[error("sampler iteration count must be positive")]
    NoIterations,

    #[error("burn-in ({burn_in}) must be smaller than the iteration count ({iterations})")]
    BurnInTooLarge { burn_in: usize, iterations: usize },
}

/// Parameters of one cross-validation run for a single model family.
#[derive(Debug, Clone)]
pub struct CvConfig {
    /// Root seed recorded with the run. Sub-seeds are derived from the
    /// replicate count alone (see [`crate::partition::replicate_seeds`]),
    /// so the root seed is provenance, not an RNG input.
    pub root_seed: u64,
    /// Number of independent training/testing partitions (m).
    pub replicates: usize,
    /// Fraction of individuals held out for testing, in (0, 1).
    pub perc_tst: f64,
    /// Model family to evaluate.
    pub model: ModelFamily,
    /// Total sampler iterations. Ignored by GBLUP's closed-form solve.
    pub iterations: usize,
    /// Samples discarded before posterior averaging. Must be < `iterations`.
    pub burn_in: usize,
}

impl CvConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.perc_tst > 0.0 && self.perc_tst < 1.0) {
            return Err(ConfigError::InvalidTestFraction(self.perc_tst));
        }
        if self.replicates == 0 {
            return Err(ConfigError::NoReplicates);
        }
        if self.iterations == 0 {
            return Err(ConfigError::NoIterations);
        }
        if self.burn_in >= self.iterations {
            return Err(ConfigError::BurnInTooLarge {
                burn_in: self.burn_in,
                iterations: self.iterations,
            });
        }
        Ok(())
    }

    /// Testing-set size for a population of `n` individuals.
    pub fn testing_size(&self, n: usize) -> usize {
        (self.perc_tst * n as f64).round() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> CvConfig {
        CvConfig {
            root_seed: 123,
            replicates: 10,
            perc_tst: 0.3,
            model: ModelFamily::Gblup,
            iterations: 12_000,
            burn_in: 2_000,
        }
    }

    #[test]
    fn accepts_sane_configuration() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn rejects_test_fraction_outside_open_interval() {
        for bad in [0.0, 1.0, -0.2, 1.5, f64::NAN] {
            let cfg = CvConfig { perc_tst: bad, ..base() };
            assert!(
                matches!(cfg.validate(), Err(ConfigError::InvalidTestFraction(_))),
                "perc_tst={bad} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_zero_replicates() {
        let cfg = CvConfig { replicates: 0, ..base() };
        assert!(matches!(cfg.validate(), Err(ConfigError::NoReplicates)));
    }

    #[test]
    fn rejects_burn_in_not_below_iterations() {
        let cfg = CvConfig { burn_in: 12_000, ..base() };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::BurnInTooLarge { .. })
        ));
        let cfg = CvConfig { iterations: 100, burn_in: 100, ..base() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn testing_size_rounds_to_nearest() {
        let cfg = CvConfig { perc_tst: 0.3, ..base() };
        assert_eq!(cfg.testing_size(100), 30);
        let cfg = CvConfig { perc_tst: 0.25, ..base() };
        assert_eq!(cfg.testing_size(10), 3); // 2.5 rounds away from zero
    }
}
