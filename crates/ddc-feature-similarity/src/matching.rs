//! Nearest-neighbor descriptor matching with Lowe's ratio test.

use crate::keypoint::FeatureSet;

/// One accepted correspondence between an old-image keypoint and a
/// new-image keypoint, after the ratio test.
#[derive(Debug, Clone, Copy)]
pub struct Match {
    pub old_index: usize,
    pub new_index: usize,
    pub distance: f32,
}

/// A set of index pairs after Lowe's ratio test. Invariant: each old index
/// and each new index appears in at most one match (enforced by picking, per
/// new keypoint, its best old match and then resolving collisions in favor
/// of the lower distance).
#[derive(Debug, Clone, Default)]
pub struct MatchSet {
    pub matches: Vec<Match>,
}

impl MatchSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

fn squared_distance(a: &[f32; 128], b: &[f32; 128]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Matches `new`'s descriptors against `old`'s with brute-force nearest
/// neighbor plus second-nearest-neighbor ratio test (threshold `ratio`,
/// default 0.75). Descriptor counts are capped by `n_features` upstream
/// so the O(N*M) search stays bounded.
#[must_use]
pub fn match_features(old: &FeatureSet, new: &FeatureSet, ratio: f32) -> MatchSet {
    let mut best_for_old: std::collections::HashMap<usize, Match> = std::collections::HashMap::new();

    for (new_idx, new_kp) in new.keypoints.iter().enumerate() {
        let mut best: Option<(usize, f32)> = None;
        let mut second: Option<f32> = None;

        for (old_idx, old_kp) in old.keypoints.iter().enumerate() {
            let d2 = squared_distance(&old_kp.descriptor, &new_kp.descriptor);
            match best {
                None => best = Some((old_idx, d2)),
                Some((_, best_d2)) if d2 < best_d2 => {
                    second = Some(best_d2);
                    best = Some((old_idx, d2));
                }
                Some(_) => {
                    let tighter = match second {
                        Some(s) => d2 < s,
                        None => true,
                    };
                    if tighter {
                        second = Some(d2);
                    }
                }
            }
        }

        let Some((old_idx, best_d2)) = best else { continue };
        let passes_ratio = match second {
            Some(second_d2) => best_d2 <= ratio * ratio * second_d2,
            // Only one candidate in the other image: nothing to rule it out with.
            None => true,
        };
        if !passes_ratio {
            continue;
        }

        let distance = best_d2.sqrt();
        let candidate = Match {
            old_index: old_idx,
            new_index: new_idx,
            distance,
        };
        match best_for_old.get(&old_idx) {
            Some(existing) if existing.distance <= distance => {}
            _ => {
                best_for_old.insert(old_idx, candidate);
            }
        }
    }

    let mut matches: Vec<Match> = best_for_old.into_values().collect();
    matches.sort_by(|a, b| a.old_index.cmp(&b.old_index));
    MatchSet { matches }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypoint::Keypoint;

    fn kp(descriptor: [f32; 128]) -> Keypoint {
        Keypoint {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            orientation: 0.0,
            descriptor,
        }
    }

    #[test]
    fn identical_descriptors_match_uniquely() {
        let mut d = [0.0f32; 128];
        d[0] = 1.0;
        let old = FeatureSet { keypoints: vec![kp(d), kp([0.1; 128])] };
        let new = FeatureSet { keypoints: vec![kp(d)] };
        let matches = match_features(&old, &new, 0.75);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches.matches[0].old_index, 0);
        assert_eq!(matches.matches[0].new_index, 0);
    }

    #[test]
    fn ambiguous_descriptors_fail_ratio_test() {
        let mut d1 = [0.0f32; 128];
        d1[0] = 1.0;
        let mut d2 = [0.0f32; 128];
        d2[0] = 1.01;
        let old = FeatureSet { keypoints: vec![kp(d1), kp(d2)] };
        let new = FeatureSet { keypoints: vec![kp(d1)] };
        let matches = match_features(&old, &new, 0.75);
        assert!(matches.is_empty());
    }
}
