use serde::{Deserialize, Serialize};

/// A 4-DOF similarity transform: rotate by `theta_deg`, scale uniformly by
/// `scale`, then translate by `(tx, ty)`.
///
/// Matrix form: `[[s*cos(t), -s*sin(t), tx], [s*sin(t), s*cos(t), ty]]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityTransform {
    pub scale: f64,
    pub rotation_deg: f64,
    pub tx: f64,
    pub ty: f64,
}

impl SimilarityTransform {
    pub const IDENTITY: SimilarityTransform = SimilarityTransform {
        scale: 1.0,
        rotation_deg: 0.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Builds a transform from the top two rows of its 2x3 matrix form,
    /// recovering scale/rotation/translation in closed form.
    #[must_use]
    pub fn from_matrix(m00: f64, m01: f64, m02: f64, m10: f64, m11: f64, m12: f64) -> Self {
        let _ = m01; // not needed to recover (s, theta); kept for readability of the call site
        let _ = m11;
        let scale = (m00 * m00 + m10 * m10).sqrt();
        let rotation_deg = normalize_degrees(m10.atan2(m00).to_degrees());
        SimilarityTransform {
            scale,
            rotation_deg,
            tx: m02,
            ty: m12,
        }
    }

    #[must_use]
    pub fn as_matrix(&self) -> [[f64; 3]; 2] {
        let t = self.rotation_deg.to_radians();
        let (sin_t, cos_t) = t.sin_cos();
        [
            [self.scale * cos_t, -self.scale * sin_t, self.tx],
            [self.scale * sin_t, self.scale * cos_t, self.ty],
        ]
    }

    #[must_use]
    pub fn is_identity_like(&self) -> bool {
        (self.scale - 1.0).abs() < 1e-9 && self.rotation_deg.abs() < 1e-9
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.scale.is_finite() && self.rotation_deg.is_finite() && self.tx.is_finite() && self.ty.is_finite()
    }

    #[must_use]
    pub fn apply(&self, p: (f64, f64)) -> (f64, f64) {
        let m = self.as_matrix();
        (
            m[0][0] * p.0 + m[0][1] * p.1 + m[0][2],
            m[1][0] * p.0 + m[1][1] * p.1 + m[1][2],
        )
    }

    /// Inverts the transform: `self.invert().apply(self.apply(p)) == p`.
    ///
    /// # Panics
    /// Panics if `scale <= 0`, which violates the struct's own invariant and
    /// should never occur for a transform constructed by this module.
    #[must_use]
    pub fn invert(&self) -> SimilarityTransform {
        assert!(self.scale > 0.0, "similarity transform scale must be positive to invert");
        let inv_scale = 1.0 / self.scale;
        let inv_rotation = normalize_degrees(-self.rotation_deg);
        let theta = inv_rotation.to_radians();
        let (sin_t, cos_t) = theta.sin_cos();
        // translation = -inv_scale * R(inv_rotation) * (tx, ty)
        let tx = -inv_scale * (cos_t * self.tx - sin_t * self.ty);
        let ty = -inv_scale * (sin_t * self.tx + cos_t * self.ty);
        SimilarityTransform { scale: inv_scale, rotation_deg: inv_rotation, tx, ty }
    }

    /// Composes `self` (applied first) with `delta` (applied second):
    /// returns the transform equivalent to `delta ∘ self`.
    #[must_use]
    pub fn compose(&self, delta: &SimilarityTransform) -> SimilarityTransform {
        let theta_self = self.rotation_deg.to_radians();
        let theta_delta = delta.rotation_deg.to_radians();
        let r_new_deg = normalize_degrees((theta_self + theta_delta).to_degrees());
        let scale_new = delta.scale * self.scale;

        // t_new = delta.scale * (R_delta * self.t) + delta.t
        let (sin_d, cos_d) = theta_delta.sin_cos();
        let rt_x = cos_d * self.tx - sin_d * self.ty;
        let rt_y = sin_d * self.tx + cos_d * self.ty;
        SimilarityTransform {
            scale: scale_new,
            rotation_deg: r_new_deg,
            tx: delta.scale * rt_x + delta.tx,
            ty: delta.scale * rt_y + delta.ty,
        }
    }
}

impl Default for SimilarityTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Closed-form least-squares similarity fit between two point sets (Umeyama).
///
/// `src` and `dst` must be the same length and contain at least one point.
/// Returns `None` when `src` has zero variance (all points coincide), since
/// scale is undefined in that case.
#[must_use]
pub fn umeyama_fit(src: &[(f64, f64)], dst: &[(f64, f64)]) -> Option<SimilarityTransform> {
    let n = src.len();
    if n == 0 || n != dst.len() {
        return None;
    }
    let nf = n as f64;
    let mean_src = centroid(src);
    let mean_dst = centroid(dst);

    let var_src: f64 = src
        .iter()
        .map(|p| (p.0 - mean_src.0).powi(2) + (p.1 - mean_src.1).powi(2))
        .sum::<f64>()
        / nf;
    if var_src <= 1e-12 {
        return None;
    }

    let mut cov = nalgebra::Matrix2::<f64>::zeros();
    for (p, q) in src.iter().zip(dst.iter()) {
        let xc = p.0 - mean_src.0;
        let yc = p.1 - mean_src.1;
        let xc2 = q.0 - mean_dst.0;
        let yc2 = q.1 - mean_dst.1;
        cov[(0, 0)] += xc * xc2;
        cov[(0, 1)] += xc * yc2;
        cov[(1, 0)] += yc * xc2;
        cov[(1, 1)] += yc * yc2;
    }
    cov /= nf;

    let svd = cov.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let singular_values = svd.singular_values;

    let mut r = v_t.transpose() * u.transpose();
    if r.determinant() < 0.0 {
        let mut v_t_fixed = v_t;
        let flipped_row = -v_t_fixed.row(1);
        v_t_fixed.set_row(1, &flipped_row);
        r = v_t_fixed.transpose() * u.transpose();
    }

    let scale = (singular_values[0] + singular_values[1]) / var_src;
    let mean_src_v = nalgebra::Vector2::new(mean_src.0, mean_src.1);
    let mean_dst_v = nalgebra::Vector2::new(mean_dst.0, mean_dst.1);
    let t = mean_dst_v - scale * (r * mean_src_v);

    let rotation_deg = normalize_degrees(r[(1, 0)].atan2(r[(0, 0)]).to_degrees());
    Some(SimilarityTransform {
        scale,
        rotation_deg,
        tx: t.x,
        ty: t.y,
    })
}

fn centroid(points: &[(f64, f64)]) -> (f64, f64) {
    let n = points.len() as f64;
    let (sx, sy) = points.iter().fold((0.0, 0.0), |acc, p| (acc.0 + p.0, acc.1 + p.1));
    (sx / n, sy / n)
}

/// Normalizes an angle in degrees to `(-180, 180]`.
#[must_use]
pub fn normalize_degrees(mut deg: f64) -> f64 {
    deg %= 360.0;
    if deg <= -180.0 {
        deg += 360.0;
    } else if deg > 180.0 {
        deg -= 360.0;
    }
    deg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_round_trips_through_matrix() {
        let m = SimilarityTransform::IDENTITY.as_matrix();
        let back = SimilarityTransform::from_matrix(m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2]);
        assert!((back.scale - 1.0).abs() < 1e-9);
        assert!(back.rotation_deg.abs() < 1e-9);
    }

    #[test]
    fn normalize_wraps_into_range() {
        assert!((normalize_degrees(190.0) - (-170.0)).abs() < 1e-9);
        assert!((normalize_degrees(-190.0) - 170.0).abs() < 1e-9);
        assert!((normalize_degrees(180.0) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn umeyama_recovers_known_translation() {
        let src = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)];
        let dst: Vec<_> = src.iter().map(|p| (p.0 + 5.0, p.1 - 2.0)).collect();
        let fit = umeyama_fit(&src, &dst).unwrap();
        assert!((fit.scale - 1.0).abs() < 1e-6);
        assert!(fit.rotation_deg.abs() < 1e-6);
        assert!((fit.tx - 5.0).abs() < 1e-6);
        assert!((fit.ty + 2.0).abs() < 1e-6);
    }

    #[test]
    fn umeyama_recovers_known_scale_and_rotation() {
        let src = [(0.0, 0.0), (2.0, 0.0), (0.0, 2.0), (2.0, 2.0)];
        let expected = SimilarityTransform {
            scale: 1.5,
            rotation_deg: 30.0,
            tx: 1.0,
            ty: -1.0,
        };
        let dst: Vec<_> = src.iter().map(|p| expected.apply(*p)).collect();
        let fit = umeyama_fit(&src, &dst).unwrap();
        assert!((fit.scale - expected.scale).abs() < 1e-6);
        assert!((fit.rotation_deg - expected.rotation_deg).abs() < 1e-6);
        assert!((fit.tx - expected.tx).abs() < 1e-6);
        assert!((fit.ty - expected.ty).abs() < 1e-6);
    }

    #[test]
    fn umeyama_rejects_degenerate_zero_variance_source() {
        let src = [(1.0, 1.0), (1.0, 1.0), (1.0, 1.0)];
        let dst = [(2.0, 2.0), (3.0, 3.0), (4.0, 4.0)];
        assert!(umeyama_fit(&src, &dst).is_none());
    }

    #[test]
    fn invert_round_trips_a_general_transform() {
        let t = SimilarityTransform { scale: 1.4, rotation_deg: 37.0, tx: 12.0, ty: -8.0 };
        let inv = t.invert();
        let p = (5.0, 9.0);
        let back = inv.apply(t.apply(p));
        assert!((back.0 - p.0).abs() < 1e-9);
        assert!((back.1 - p.1).abs() < 1e-9);
    }

    #[test]
    fn compose_with_identity_is_noop() {
        let t = SimilarityTransform {
            scale: 1.2,
            rotation_deg: 15.0,
            tx: 3.0,
            ty: -2.0,
        };
        let composed = t.compose(&SimilarityTransform::IDENTITY);
        assert!((composed.scale - t.scale).abs() < 1e-9);
        assert!((composed.rotation_deg - t.rotation_deg).abs() < 1e-9);
        assert!((composed.tx - t.tx).abs() < 1e-9);
        assert!((composed.ty - t.ty).abs() < 1e-9);
    }
}
