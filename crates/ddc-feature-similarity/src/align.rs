//! Top-level `align(raster_old, raster_new) -> AlignmentResult` entry point:
//! detect, match, and RANSAC-fit a similarity transform.

use ddc_common::{AlignmentResult, SimilarityTransform};
use ddc_raster_gateway::Raster;

use crate::keypoint::{detect_features, to_luminance};
use crate::matching::match_features;
use crate::ransac::{ransac_similarity, RansacParams};

const MIN_KEYPOINTS_FOR_RANSAC: usize = 50;
const MIN_MATCHES_FOR_RANSAC: usize = 10;
const SCALE_MIN: f64 = 1.0 / 8.0;
const SCALE_MAX: f64 = 8.0;
const LOWE_RATIO_DEFAULT: f32 = 0.75;

/// Compute-effort profile: which `n_features` cap and RANSAC reprojection
/// threshold to use. The high-compute profile raises the feature cap to
/// 20000 while keeping the same 10.0 px reprojection threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignProfile {
    General,
    HighCompute,
}

impl AlignProfile {
    #[must_use]
    pub fn n_features(self) -> usize {
        match self {
            AlignProfile::General => 4000,
            AlignProfile::HighCompute => 20_000,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AlignConfig {
    pub profile: AlignProfile,
    pub lowe_ratio: f32,
    pub ransac: RansacParams,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            profile: AlignProfile::General,
            lowe_ratio: LOWE_RATIO_DEFAULT,
            ransac: RansacParams::default(),
        }
    }
}

/// Detects, matches, and RANSAC-fits a similarity transform mapping
/// `raster_old` onto `raster_new`. Never fails loudly: degenerate inputs
/// (too few keypoints, too few matches, no consensus, or a rejected scale)
/// all fall back to `AlignmentResult::identity_unmatched()` — the
/// diff stage records `changes_detected: unknown` and proceeds without a
/// warp rather than propagating an error.
#[must_use]
pub fn align(raster_old: &Raster, raster_new: &Raster, config: &AlignConfig) -> AlignmentResult {
    let gray_old = to_luminance(raster_old);
    let gray_new = to_luminance(raster_new);

    let n_features = config.profile.n_features();
    let features_old = detect_features(&gray_old, n_features);
    let features_new = detect_features(&gray_new, n_features);

    if features_old.len() < MIN_KEYPOINTS_FOR_RANSAC || features_new.len() < MIN_KEYPOINTS_FOR_RANSAC {
        return AlignmentResult::identity_unmatched();
    }

    let matches = match_features(&features_old, &features_new, config.lowe_ratio);
    if matches.len() < MIN_MATCHES_FOR_RANSAC {
        return AlignmentResult::identity_unmatched();
    }

    let src: Vec<(f64, f64)> = matches
        .matches
        .iter()
        .map(|m| (features_old.keypoints[m.old_index].x, features_old.keypoints[m.old_index].y))
        .collect();
    let dst: Vec<(f64, f64)> = matches
        .matches
        .iter()
        .map(|m| (features_new.keypoints[m.new_index].x, features_new.keypoints[m.new_index].y))
        .collect();

    let Some(outcome) = ransac_similarity(&src, &dst, &config.ransac) else {
        return AlignmentResult {
            transform: SimilarityTransform::IDENTITY,
            inlier_count: 0,
            total_matches: matches.len(),
            score: 0.0,
        };
    };

    if outcome.transform.scale < SCALE_MIN || outcome.transform.scale > SCALE_MAX {
        // Likely a spurious fit; treat an out-of-range scale as a rejection
        // rather than a noisy estimate worth keeping.
        return AlignmentResult {
            transform: SimilarityTransform::IDENTITY,
            inlier_count: 0,
            total_matches: matches.len(),
            score: 0.0,
        };
    }

    let score = AlignmentResult::score_for(outcome.inlier_count, features_old.len(), features_new.len());
    AlignmentResult {
        transform: outcome.transform,
        inlier_count: outcome.inlier_count,
        total_matches: matches.len(),
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddc_raster_gateway::Channels;

    fn textured_raster(size: u32, offset_x: i64) -> Raster {
        let mut pixels = vec![255u8; (size * size * 4) as usize];
        for y in 0..size as i64 {
            for x in 0..size as i64 {
                let sx = x - offset_x;
                if sx < 0 || sx >= size as i64 {
                    continue;
                }
                let on = ((sx / 6) + (y / 6)) % 2 == 0 && ((sx / 3) % 5 != 0);
                if on {
                    let idx = ((y as u32 * size + x as u32) * 4) as usize;
                    pixels[idx] = 0;
                    pixels[idx + 1] = 0;
                    pixels[idx + 2] = 0;
                    pixels[idx + 3] = 255;
                }
            }
        }
        Raster::new(size, size, Channels::Rgba, pixels, 1.0)
    }

    #[test]
    fn blank_rasters_return_identity_with_zero_score() {
        let blank = Raster::new(64, 64, Channels::Rgba, vec![255u8; 64 * 64 * 4], 1.0);
        let result = align(&blank, &blank, &AlignConfig::default());
        assert_eq!(result.transform, SimilarityTransform::IDENTITY);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn identical_textured_rasters_score_high_with_near_identity_transform() {
        let raster = textured_raster(256, 0);
        let result = align(&raster, &raster, &AlignConfig::default());
        assert!(result.score >= 0.9, "score was {}", result.score);
        assert!((result.transform.scale - 1.0).abs() <= 0.01);
        assert!(result.transform.rotation_deg.abs() <= 0.5);
        assert!(result.transform.tx.abs() <= 0.5);
        assert!(result.transform.ty.abs() <= 0.5);
    }
}
