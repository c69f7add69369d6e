//! Trimmed iterative-closest-point refinement with Umeyama similarity
//! fitting.

use ddc_common::SimilarityTransform;

use crate::nearest::nearest_neighbors;
use crate::sampling::subsample;

const MAX_ITERATIONS: usize = 20;
const CONVERGENCE_TOLERANCE: f64 = 1e-3;
const FULL_SIMILARITY_CAP: usize = 1500;
const TRANSLATION_ONLY_CAP: usize = 2000;

/// Which degrees of freedom the refiner is allowed to adjust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcpMode {
    FullSimilarity,
    TranslationOnly,
}

impl IcpMode {
    fn point_cap(self) -> usize {
        match self {
            IcpMode::FullSimilarity => FULL_SIMILARITY_CAP,
            IcpMode::TranslationOnly => TRANSLATION_ONLY_CAP,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IcpParams {
    pub mode: IcpMode,
    pub trim_frac: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub seed: u64,
}

impl Default for IcpParams {
    fn default() -> Self {
        Self {
            mode: IcpMode::FullSimilarity,
            trim_frac: 0.2,
            max_iterations: MAX_ITERATIONS,
            tolerance: CONVERGENCE_TOLERANCE,
            seed: 0x1C9_1C9,
        }
    }
}

/// Refines `transform_init` (mapping `points_new` into `points_old`'s frame)
/// against two point clouds with trimmed ICP. Deterministic for a fixed
/// `params.seed` and input; the residual used to decide convergence is
/// non-increasing because each step accepts Umeyama's closed-form minimizer
/// over the trimmed correspondences outright (never a partial/damped step).
#[must_use]
pub fn refine(
    transform_init: SimilarityTransform,
    points_old: &[(f64, f64)],
    points_new: &[(f64, f64)],
    params: &IcpParams,
) -> SimilarityTransform {
    if points_old.is_empty() || points_new.is_empty() {
        return transform_init;
    }

    let cap = params.mode.point_cap();
    let old_cloud = subsample(points_old, cap, params.seed);
    let new_cloud = subsample(points_new, cap, params.seed.wrapping_add(1));

    let mut current = transform_init;
    let mut prev_residual = f64::INFINITY;

    for _iteration in 0..params.max_iterations {
        let moved: Vec<(f64, f64)> = new_cloud.iter().map(|p| current.apply(*p)).collect();
        let neighbors = nearest_neighbors(&moved, &old_cloud);

        let mut paired: Vec<(usize, f64)> = neighbors.iter().copied().enumerate().collect();
        paired.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let keep = ((1.0 - params.trim_frac) * paired.len() as f64).round() as usize;
        let keep = keep.max(2).min(paired.len());
        let survivors = &paired[..keep];

        let mean_residual = survivors.iter().map(|(_, d2)| d2.sqrt()).sum::<f64>() / survivors.len() as f64;

        let new_src: Vec<(f64, f64)> = survivors.iter().map(|&(idx, _)| new_cloud[idx]).collect();
        let new_dst: Vec<(f64, f64)> = survivors.iter().map(|&(idx, _)| old_cloud[neighbors[idx].0]).collect();

        let step = match params.mode {
            IcpMode::FullSimilarity => ddc_common::umeyama_fit(&new_src, &new_dst),
            IcpMode::TranslationOnly => translation_only_fit(&new_src, &new_dst),
        };

        if let Some(step) = step {
            current = step;
        }

        if (prev_residual - mean_residual).abs() < params.tolerance {
            break;
        }
        prev_residual = mean_residual;
    }

    current
}

/// Fits a translation-only transform (`s=1, theta=0`) by averaging the
/// residual vector of the surviving correspondences.
fn translation_only_fit(src: &[(f64, f64)], dst: &[(f64, f64)]) -> Option<SimilarityTransform> {
    if src.is_empty() {
        return None;
    }
    let n = src.len() as f64;
    let (sum_dx, sum_dy) = src
        .iter()
        .zip(dst.iter())
        .fold((0.0, 0.0), |acc, (s, d)| (acc.0 + (d.0 - s.0), acc.1 + (d.1 - s.1)));
    Some(SimilarityTransform {
        scale: 1.0,
        rotation_deg: 0.0,
        tx: sum_dx / n,
        ty: sum_dy / n,
    })
}
