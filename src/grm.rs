//! Genomic relationship matrix construction.
//!
//! G = M · Mᵗ / p, where M holds the column-standardized genotypes
//! (each marker centered and scaled to unit variance) and p is the number
//! of markers actually used. Monomorphic markers carry no information and
//! are skipped, with the divisor reduced accordingly.

use log::{debug, info};
use ndarray::{Array2, Axis};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GrmError {
    #[error("relationship matrix needs at least 2 individuals, got {0}")]
    TooFewIndividuals(usize),

    #[error("no polymorphic markers available ({total} markers, all monomorphic)")]
    NoPolymorphicMarkers { total: usize },
}

/// Build the n x n relationship matrix from an n x p genotype matrix.
///
/// The result is symmetric by construction and usable as a kernel for
/// GBLUP. Returns the matrix together with the number of markers used.
pub fn relationship_matrix(genotypes: &Array2<f64>) -> Result<(Array2<f64>, usize), GrmError> {
    let n = genotypes.nrows();
    let p = genotypes.ncols();
    if n < 2 {
        return Err(GrmError::TooFewIndividuals(n));
    }

    info!("Building relationship matrix from {} individuals x {} markers", n, p);

    // Accumulate G as a sum of standardized-marker outer products, one
    // marker at a time, then divide by the number of markers used.
    let mut g = Array2::<f64>::zeros((n, n));
    let mut used = 0usize;
    let mut skipped = 0usize;

    for col in genotypes.axis_iter(Axis(1)) {
        let mean = col.sum() / n as f64;
        let var = col.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>() / (n as f64 - 1.0);
        if var <= f64::EPSILON {
            skipped += 1;
            continue;
        }
        let sd = var.sqrt();
        let scaled = col.mapv(|v| (v - mean) / sd);
        for i in 0..n {
            for j in i..n {
                let contrib = scaled[i] * scaled[j];
                g[[i, j]] += contrib;
                if i != j {
                    g[[j, i]] += contrib;
                }
            }
        }
        used += 1;
    }

    if used == 0 {
        return Err(GrmError::NoPolymorphicMarkers { total: p });
    }
    if skipped > 0 {
        debug!("Skipped {} monomorphic marker(s) of {}", skipped, p);
    }

    g /= used as f64;
    Ok((g, used))
}
