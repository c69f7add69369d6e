use ddc_raster_gateway::Raster;
use image::{GenericImageView, GrayImage};
use imageproc::corners::corners_fast9;

pub const DESCRIPTOR_LEN: usize = 128;
const PATCH_RADIUS: i64 = 8; // 16x16 patch
const GRID: usize = 4; // 4x4 cells
const ORIENTATION_BINS: usize = 8;

#[derive(Debug, Clone)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub orientation: f64,
    pub descriptor: [f32; DESCRIPTOR_LEN],
}

#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    pub keypoints: Vec<Keypoint>,
}

impl FeatureSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// Converts a raster to single-channel luminance using ITU-R BT.601 weights.
#[must_use]
pub fn to_luminance(raster: &Raster) -> GrayImage {
    let dynamic = raster.to_dynamic_image();
    let rgba = dynamic.to_rgba8();
    GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let p = rgba.get_pixel(x, y);
        let l = 0.299 * f32::from(p[0]) + 0.587 * f32::from(p[1]) + 0.114 * f32::from(p[2]);
        image::Luma([l.round() as u8])
    })
}

/// Detects scale-space corner keypoints and computes a 128-d gradient-histogram
/// descriptor for each, normalized for dominant orientation (in the spirit of
/// SIFT). Capped to `n_features`, keeping the highest-scoring corners first.
#[must_use]
pub fn detect_features(gray: &GrayImage, n_features: usize) -> FeatureSet {
    const OCTAVES: usize = 3;
    const FAST_THRESHOLD: u8 = 24;

    let mut keypoints = Vec::new();
    let mut octave_image = gray.clone();
    let mut scale = 1.0_f64;

    for _octave in 0..OCTAVES {
        if octave_image.width() < 2 * PATCH_RADIUS as u32 || octave_image.height() < 2 * PATCH_RADIUS as u32 {
            break;
        }
        let corners = corners_fast9(&octave_image, FAST_THRESHOLD);
        for corner in corners {
            let x = f64::from(corner.x) * scale;
            let y = f64::from(corner.y) * scale;
            if let Some(kp) = build_keypoint(gray, x, y, scale) {
                keypoints.push(kp);
            }
        }
        octave_image = image::imageops::resize(
            &octave_image,
            (octave_image.width() / 2).max(1),
            (octave_image.height() / 2).max(1),
            image::imageops::FilterType::Triangle,
        );
        scale *= 2.0;
    }

    keypoints.sort_by(|a, b| b.scale.partial_cmp(&a.scale).unwrap_or(std::cmp::Ordering::Equal));
    // Keep insertion (detection) order within the cap rather than biasing
    // toward coarser octaves: stable-sort by nothing further, just truncate.
    keypoints.truncate(n_features);
    FeatureSet { keypoints }
}

fn build_keypoint(gray: &GrayImage, x: f64, y: f64, scale: f64) -> Option<Keypoint> {
    let (w, h) = gray.dimensions();
    let cx = x.round() as i64;
    let cy = y.round() as i64;
    if cx - PATCH_RADIUS < 0 || cy - PATCH_RADIUS < 0 || cx + PATCH_RADIUS >= w as i64 || cy + PATCH_RADIUS >= h as i64
    {
        return None;
    }

    let orientation = dominant_orientation(gray, cx, cy);
    let descriptor = compute_descriptor(gray, cx, cy, orientation);
    Some(Keypoint {
        x,
        y,
        scale,
        orientation,
        descriptor,
    })
}

fn sample(gray: &GrayImage, x: i64, y: i64) -> f32 {
    let (w, h) = gray.dimensions();
    let cx = x.clamp(0, w as i64 - 1) as u32;
    let cy = y.clamp(0, h as i64 - 1) as u32;
    f32::from(gray.get_pixel(cx, cy)[0])
}

fn gradient_at(gray: &GrayImage, x: i64, y: i64) -> (f32, f32) {
    let gx = sample(gray, x + 1, y) - sample(gray, x - 1, y);
    let gy = sample(gray, x, y + 1) - sample(gray, x, y - 1);
    (gx, gy)
}

fn dominant_orientation(gray: &GrayImage, cx: i64, cy: i64) -> f64 {
    let mut hist = [0.0_f32; 36];
    for dy in -PATCH_RADIUS..PATCH_RADIUS {
        for dx in -PATCH_RADIUS..PATCH_RADIUS {
            let (gx, gy) = gradient_at(gray, cx + dx, cy + dy);
            let mag = (gx * gx + gy * gy).sqrt();
            if mag < 1e-3 {
                continue;
            }
            let angle = gy.atan2(gx).to_degrees();
            let bin = (((angle + 180.0) / 10.0) as usize).min(35);
            hist[bin] += mag;
        }
    }
    let (best_bin, _) = hist
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or((0, &0.0));
    best_bin as f64 * 10.0 - 180.0
}

/// 4x4 grid of 8-bin orientation histograms (128-d), rotated into the
/// keypoint's dominant orientation and L2-normalized.
fn compute_descriptor(gray: &GrayImage, cx: i64, cy: i64, orientation_deg: f64) -> [f32; DESCRIPTOR_LEN] {
    let mut descriptor = [0.0_f32; DESCRIPTOR_LEN];
    let theta = -orientation_deg.to_radians();
    let (sin_t, cos_t) = theta.sin_cos();
    let cell_size = (2 * PATCH_RADIUS) as f64 / GRID as f64;

    for dy in -PATCH_RADIUS..PATCH_RADIUS {
        for dx in -PATCH_RADIUS..PATCH_RADIUS {
            let (gx, gy) = gradient_at(gray, cx + dx, cy + dy);
            let mag = (gx * gx + gy * gy).sqrt();
            if mag < 1e-3 {
                continue;
            }
            let angle = f64::from(gy.atan2(gx));
            let rel_angle = normalize_rad(angle - theta);
            let bin = (((rel_angle + std::f64::consts::PI) / (2.0 * std::f64::consts::PI) * ORIENTATION_BINS as f64)
                as usize)
                .min(ORIENTATION_BINS - 1);

            // rotate (dx, dy) into the keypoint's canonical frame before binning spatially
            let rx = cos_t * dx as f64 - sin_t * dy as f64 + PATCH_RADIUS as f64;
            let ry = sin_t * dx as f64 + cos_t * dy as f64 + PATCH_RADIUS as f64;
            let cell_x = ((rx / cell_size) as usize).min(GRID - 1);
            let cell_y = ((ry / cell_size) as usize).min(GRID - 1);
            let idx = (cell_y * GRID + cell_x) * ORIENTATION_BINS + bin;
            descriptor[idx] += mag;
        }
    }

    let norm: f32 = descriptor.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 1e-6 {
        for v in &mut descriptor {
            *v /= norm;
        }
    }
    descriptor
}

fn normalize_rad(mut a: f64) -> f64 {
    while a > std::f64::consts::PI {
        a -= 2.0 * std::f64::consts::PI;
    }
    while a < -std::f64::consts::PI {
        a += 2.0 * std::f64::consts::PI;
    }
    a
}
