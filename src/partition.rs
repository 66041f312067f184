//! Deterministic training/testing partitions.
//!
//! Each replicate owns its own pseudorandom source: a `ChaCha8Rng` seeded
//! with that replicate's sub-seed. No generator state is shared across
//! replicates, so parallel execution is deterministic and order-independent.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const SEED_LO: f64 = 1_000.0;
const SEED_HI: f64 = 1_000_000.0;

/// Sub-seeds for `m` replicates: `m` integers linearly spaced over
/// [1_000, 1_000_000] inclusive, rounded to nearest. A single replicate
/// gets the lower endpoint.
pub fn replicate_seeds(m: usize) -> Vec<u64> {
    if m == 0 {
        return Vec::new();
    }
    if m == 1 {
        return vec![SEED_LO as u64];
    }
    (0..m)
        .map(|k| {
            let t = k as f64 / (m - 1) as f64;
            (SEED_LO + (SEED_HI - SEED_LO) * t).round() as u64
        })
        .collect()
}

/// One training/testing split of the individuals `0..n`.
///
/// The two index sets are disjoint and their union is the full range.
/// Indices within each set are in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub testing: Vec<usize>,
    pub training: Vec<usize>,
}

impl Partition {
    /// Draw a partition of `0..n` with a testing set of exactly
    /// `round(perc_tst * n)` individuals, sampled without replacement from
    /// a generator seeded with `seed`.
    ///
    /// Degenerate fractions that round to an empty training or testing set
    /// are produced as requested; the correlation step will reject them.
    pub fn draw(n: usize, perc_tst: f64, seed: u64) -> Self {
        let n_tst = (perc_tst * n as f64).round() as usize;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut testing = rand::seq::index::sample(&mut rng, n, n_tst).into_vec();
        testing.sort_unstable();

        let mut in_testing = vec![false; n];
        for &i in &testing {
            in_testing[i] = true;
        }
        let training = (0..n).filter(|&i| !in_testing[i]).collect();

        Self { testing, training }
    }

    pub fn n(&self) -> usize {
        self.testing.len() + self.training.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_seeds_are_the_linearly_spaced_values() {
        let seeds = replicate_seeds(10);
        assert_eq!(
            seeds,
            vec![
                1_000, 112_000, 223_000, 334_000, 445_000, 556_000, 667_000, 778_000, 889_000,
                1_000_000
            ]
        );
    }

    #[test]
    fn sub_seed_edge_counts() {
        assert!(replicate_seeds(0).is_empty());
        assert_eq!(replicate_seeds(1), vec![1_000]);
        assert_eq!(replicate_seeds(2), vec![1_000, 1_000_000]);
    }

    #[test]
    fn partition_is_reproducible() {
        let a = Partition::draw(100, 0.3, 112_000);
        let b = Partition::draw(100, 0.3, 112_000);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_give_different_partitions() {
        let a = Partition::draw(100, 0.3, 1_000);
        let b = Partition::draw(100, 0.3, 112_000);
        assert_ne!(a, b);
    }

    #[test]
    fn sizes_are_exact_and_sets_partition_the_range() {
        for (k, seed) in replicate_seeds(10).into_iter().enumerate() {
            let p = Partition::draw(100, 0.3, seed);
            assert_eq!(p.testing.len(), 30, "replicate {k}");
            assert_eq!(p.training.len(), 70, "replicate {k}");

            let mut all: Vec<usize> = p.testing.iter().chain(p.training.iter()).copied().collect();
            all.sort_unstable();
            assert_eq!(all, (0..100).collect::<Vec<_>>());
        }
    }

    #[test]
    fn testing_set_has_no_duplicates() {
        let p = Partition::draw(50, 0.5, 42);
        let mut seen = vec![false; 50];
        for &i in &p.testing {
            assert!(!seen[i], "index {i} drawn twice");
            seen[i] = true;
        }
    }

    #[test]
    fn degenerate_fractions_still_execute() {
        // round(0.004 * 100) = 0: empty testing set, full training set.
        let p = Partition::draw(100, 0.004, 1_000);
        assert!(p.testing.is_empty());
        assert_eq!(p.training.len(), 100);

        // round(0.996 * 100) = 100: everything held out.
        let p = Partition::draw(100, 0.996, 1_000);
        assert_eq!(p.testing.len(), 100);
        assert!(p.training.is_empty());
    }
}
