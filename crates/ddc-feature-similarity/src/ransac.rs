//! RANSAC estimation of a 2D similarity transform (4 DOF) from matched point
//! pairs, the robust-fitting step of the alignment contract.

use ddc_common::SimilarityTransform;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone, Copy)]
pub struct RansacParams {
    pub reprojection_threshold_px: f64,
    pub max_iterations: u32,
    pub confidence: f64,
    pub seed: u64,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            reprojection_threshold_px: 10.0,
            max_iterations: 10_000,
            confidence: 0.99,
            seed: 0x5EED_5EED,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RansacOutcome {
    pub transform: SimilarityTransform,
    pub inlier_count: usize,
}

/// Fits a similarity transform mapping `src` points onto `dst` points with
/// RANSAC: repeatedly samples 2 correspondences (the minimal set for 4 DOF),
/// fits the closed-form similarity through them, counts inliers under
/// `params.reprojection_threshold_px`, and keeps the best consensus set.
/// Returns `None` when fewer than 4 inliers are ever found for any sample,
/// the case where no sample ever produces a consensus set of at least 4 inliers.
#[must_use]
pub fn ransac_similarity(
    src: &[(f64, f64)],
    dst: &[(f64, f64)],
    params: &RansacParams,
) -> Option<RansacOutcome> {
    let n = src.len();
    if n < 2 || n != dst.len() {
        return None;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let mut best: Option<(SimilarityTransform, Vec<usize>)> = None;
    let threshold2 = params.reprojection_threshold_px * params.reprojection_threshold_px;

    let mut iterations_budget = params.max_iterations;
    let mut iteration = 0u32;
    while iteration < iterations_budget {
        iteration += 1;
        let i = rng.gen_range(0..n);
        let mut j = rng.gen_range(0..n);
        if n > 1 {
            while j == i {
                j = rng.gen_range(0..n);
            }
        }

        let Some(candidate) = fit_from_two_points(src[i], src[j], dst[i], dst[j]) else {
            continue;
        };
        if !candidate.is_finite() || candidate.scale <= 0.0 {
            continue;
        }

        let inliers: Vec<usize> = (0..n)
            .filter(|&k| {
                let projected = candidate.apply(src[k]);
                let dx = projected.0 - dst[k].0;
                let dy = projected.1 - dst[k].1;
                dx * dx + dy * dy <= threshold2
            })
            .collect();

        let is_better = match &best {
            Some((_, best_inliers)) => inliers.len() > best_inliers.len(),
            None => true,
        };
        if is_better {
            // Adaptively shrink the iteration budget as the observed inlier
            // ratio rises, per the standard RANSAC stopping rule, capped at
            // the configured max.
            if !inliers.is_empty() {
                let inlier_ratio = inliers.len() as f64 / n as f64;
                let w2 = (inlier_ratio * inlier_ratio).max(1e-6);
                let needed = ((1.0 - params.confidence).ln() / (1.0 - w2).ln().min(-1e-12)).ceil();
                if needed.is_finite() && needed > 0.0 {
                    iterations_budget = iterations_budget.min((needed as u32).max(1));
                }
            }
            best = Some((candidate, inliers));
        }
    }

    let (best_transform, best_inliers) = best?;
    if best_inliers.len() < 4 {
        return None;
    }

    // Refit the final transform from the full inlier set via Umeyama, which
    // minimizes the least-squares residual rather than relying on the
    // minimal 2-point sample that happened to win.
    let inlier_src: Vec<_> = best_inliers.iter().map(|&k| src[k]).collect();
    let inlier_dst: Vec<_> = best_inliers.iter().map(|&k| dst[k]).collect();
    let refit = ddc_common::umeyama_fit(&inlier_src, &inlier_dst).unwrap_or(best_transform);

    Some(RansacOutcome {
        transform: refit,
        inlier_count: best_inliers.len(),
    })
}

/// Closed-form similarity fit through exactly two correspondences, treating
/// the 2D points as complex numbers: `dst = scale*e^{i*theta}*src + t` has a
/// unique solution for 2 non-coincident source points.
fn fit_from_two_points(
    src_a: (f64, f64),
    src_b: (f64, f64),
    dst_a: (f64, f64),
    dst_b: (f64, f64),
) -> Option<SimilarityTransform> {
    let (sax, say) = src_a;
    let (sbx, sby) = src_b;
    let (dax, day) = dst_a;
    let (dbx, dby) = dst_b;

    let sdx = sbx - sax;
    let sdy = sby - say;
    let denom = sdx * sdx + sdy * sdy;
    if denom < 1e-9 {
        return None;
    }

    let ddx = dbx - dax;
    let ddy = dby - day;

    // Complex division (ddx + i*ddy) / (sdx + i*sdy) gives scale*e^{i*theta}.
    let re = (ddx * sdx + ddy * sdy) / denom;
    let im = (ddy * sdx - ddx * sdy) / denom;

    let scale = (re * re + im * im).sqrt();
    if scale < 1e-9 {
        return None;
    }
    let rotation_deg = ddc_common::normalize_degrees(im.atan2(re).to_degrees());

    let theta = rotation_deg.to_radians();
    let (sin_t, cos_t) = theta.sin_cos();
    let tx = dax - scale * (cos_t * sax - sin_t * say);
    let ty = day - scale * (sin_t * sax + cos_t * say);

    Some(SimilarityTransform { scale, rotation_deg, tx, ty })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_known_transform_with_outliers() {
        let truth = SimilarityTransform { scale: 1.2, rotation_deg: 15.0, tx: 4.0, ty: -3.0 };
        let src: Vec<(f64, f64)> = (0..30).map(|i| (i as f64, (i * 2 % 7) as f64)).collect();
        let mut dst: Vec<(f64, f64)> = src.iter().map(|p| truth.apply(*p)).collect();
        // Corrupt a few points as outliers.
        for idx in [0, 5, 10] {
            dst[idx] = (dst[idx].0 + 500.0, dst[idx].1 - 400.0);
        }

        let outcome = ransac_similarity(&src, &dst, &RansacParams::default()).unwrap();
        assert!(outcome.inlier_count >= src.len() - 4);
        assert!((outcome.transform.scale - truth.scale).abs() < 0.05);
        assert!((outcome.transform.rotation_deg - truth.rotation_deg).abs() < 1.0);
        assert!((outcome.transform.tx - truth.tx).abs() < 1.0);
        assert!((outcome.transform.ty - truth.ty).abs() < 1.0);
    }

    #[test]
    fn too_few_points_returns_none() {
        assert!(ransac_similarity(&[(0.0, 0.0)], &[(1.0, 1.0)], &RansacParams::default()).is_none());
    }

    #[test]
    fn no_consensus_among_pure_outliers_returns_none() {
        let src = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0), (5.0, 5.0)];
        let dst = [(0.0, 0.0), (1.0, 97.0), (53.0, -12.0), (-40.0, 8.0), (17.0, 64.0)];
        let params = RansacParams { max_iterations: 200, reprojection_threshold_px: 0.5, ..RansacParams::default() };
        assert!(ransac_similarity(&src, &dst, &params).is_none());
    }
}
