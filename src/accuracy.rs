//! Prediction-accuracy computation and replicate-level reduction.

use ndarray::Array1;
use statrs::statistics::Statistics;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccuracyError {
    #[error("correlation needs at least 2 testing observations, got {0}")]
    TooFewObservations(usize),

    #[error("{side} values have zero variance on the testing set")]
    ZeroVariance { side: &'static str },

    #[error("vector length mismatch: predicted has {predicted}, observed has {observed}")]
    LengthMismatch { predicted: usize, observed: usize },

    #[error("testing index {index} out of bounds for {len} individuals")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Pearson correlation between two equal-length slices.
///
/// Fails explicitly on fewer than 2 observations or on a constant input;
/// a degenerate partition must surface here, never as a silent NaN.
pub fn pearson(x: &[f64], y: &[f64]) -> Result<f64, AccuracyError> {
    if x.len() != y.len() {
        return Err(AccuracyError::LengthMismatch {
            predicted: x.len(),
            observed: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(AccuracyError::TooFewObservations(x.len()));
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&a, &b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 {
        return Err(AccuracyError::ZeroVariance { side: "predicted" });
    }
    if var_y == 0.0 {
        return Err(AccuracyError::ZeroVariance { side: "observed" });
    }

    Ok(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Pearson correlation between predictions and observed phenotypes,
/// restricted to the testing indices of one partition.
pub fn pearson_at(
    predicted: &Array1<f64>,
    observed: &Array1<f64>,
    testing: &[usize],
) -> Result<f64, AccuracyError> {
    if predicted.len() != observed.len() {
        return Err(AccuracyError::LengthMismatch {
            predicted: predicted.len(),
            observed: observed.len(),
        });
    }
    for &i in testing {
        if i >= predicted.len() {
            return Err(AccuracyError::IndexOutOfBounds {
                index: i,
                len: predicted.len(),
            });
        }
    }
    let sub_pred: Vec<f64> = testing.iter().map(|&i| predicted[i]).collect();
    let sub_obs: Vec<f64> = testing.iter().map(|&i| observed[i]).collect();
    pearson(&sub_pred, &sub_obs)
}

/// Mean and sample standard deviation over replicate accuracies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub n: usize,
    pub mean: f64,
    /// Sample standard deviation (n-1 denominator). `NaN` for a single
    /// replicate, where the sample deviation is undefined.
    pub std_dev: f64,
}

pub fn summarize(values: &[f64]) -> Summary {
    Summary {
        n: values.len(),
        mean: values.mean(),
        std_dev: values.std_dev(),
    }
}
