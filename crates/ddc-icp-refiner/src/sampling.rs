//! Deterministic seeded subsampling of point clouds.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Subsamples `points` down to at most `cap` entries using a fixed seed, so
/// repeated calls on the same input and seed always pick the same subset
/// (required for the refiner's determinism invariant).
#[must_use]
pub fn subsample(points: &[(f64, f64)], cap: usize, seed: u64) -> Vec<(f64, f64)> {
    if points.len() <= cap {
        return points.to_vec();
    }
    let mut indices: Vec<usize> = (0..points.len()).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    indices.truncate(cap);
    indices.sort_unstable();
    indices.into_iter().map(|i| points[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subsample_is_deterministic_for_fixed_seed() {
        let points: Vec<_> = (0..5000).map(|i| (i as f64, (i * 3) as f64)).collect();
        let a = subsample(&points, 1500, 42);
        let b = subsample(&points, 1500, 42);
        assert_eq!(a, b);
        assert_eq!(a.len(), 1500);
    }

    #[test]
    fn subsample_is_noop_under_cap() {
        let points: Vec<_> = (0..10).map(|i| (i as f64, i as f64)).collect();
        assert_eq!(subsample(&points, 100, 1), points);
    }
}
