//! Top-level `compose(raster_old, raster_new, transform, params) -> PNG bytes`
//! contract.

use ddc_common::SimilarityTransform;
use ddc_raster_gateway::{Channels, Raster};
use image::{GrayImage, RgbImage};

use crate::autocorrect::best_vertical_lag;
use crate::edges::{edge_mask, union};
use crate::error::{ComposeError, ComposeResult};
use crate::mask::{InkMask, MaskParams};
use crate::params::{ComposeParams, ADDITION_COLOR, REMOVAL_COLOR};
use crate::warp::warp_to;

/// Per-pixel classification of ink into old-only (removal), new-only
/// (addition), and overlap, satisfying the coverage inequalities for each pixel.
pub struct OverlayClassification {
    pub old_only: InkMask,
    pub new_only: InkMask,
    pub overlap: InkMask,
}

/// Number of pixels with nonzero old-only or new-only ink, used to populate
/// `DiffResult::change_count`.
#[must_use]
pub fn change_count(classification: &OverlayClassification) -> u64 {
    classification
        .old_only
        .values
        .iter()
        .zip(classification.new_only.values.iter())
        .filter(|(o, n)| **o > 0 || **n > 0)
        .count() as u64
}

/// Renders `raster_old` and `raster_new` (already at the caller's chosen
/// zoom) into a tri-colored PNG per the transform and parameters. Returns
/// `ComposeError::InvalidTransform` for a non-finite transform or `scale <=
/// 0` rather than producing a nonsensical warp.
pub fn compose(
    raster_old: &Raster,
    raster_new: &Raster,
    transform: &SimilarityTransform,
    params: &ComposeParams,
) -> ComposeResult<Vec<u8>> {
    let classification = classify(raster_old, raster_new, transform, params)?;
    let canvas = render_canvas(raster_new.width, raster_new.height, &classification, raster_old, raster_new, transform, params)?;
    encode_png(&canvas)
}

/// Produces the [`OverlayClassification`] without serializing to PNG, so
/// callers (and tests) can inspect `change_count` and the raw masks.
pub fn classify(
    raster_old: &Raster,
    raster_new: &Raster,
    transform: &SimilarityTransform,
    params: &ComposeParams,
) -> ComposeResult<OverlayClassification> {
    if !transform.is_finite() || transform.scale <= 0.0 {
        return Err(ComposeError::InvalidTransform(format!("{transform:?}")));
    }

    let mask_params = MaskParams { mask_gamma: params.mask_gamma, alpha_gamma: params.alpha_gamma };

    let warped_old = warp_to(raster_old, transform, raster_new.width, raster_new.height);
    let mut mask_old = InkMask::from_raster(&warped_old, &mask_params);
    let mask_new = InkMask::from_raster(raster_new, &mask_params);

    if params.vertical_auto_correct {
        let max_lag = (f64::from(raster_new.height) * 0.1).round() as i64;
        let lag = best_vertical_lag(&mask_old, &mask_new, max_lag);
        if lag != 0 {
            let corrected = SimilarityTransform { ty: transform.ty + lag as f64, ..*transform };
            let rewarped = warp_to(raster_old, &corrected, raster_new.width, raster_new.height);
            mask_old = InkMask::from_raster(&rewarped, &mask_params);
        }
    }

    let overlap = min_mask(
        &mask_old.dilate(params.overlap_buffer_px),
        &mask_new.dilate(params.overlap_buffer_px),
    );
    let old_only = subtract_mask(&mask_old, &overlap);
    let new_only = subtract_mask(&mask_new, &overlap);

    Ok(OverlayClassification { old_only, new_only, overlap })
}

fn min_mask(a: &InkMask, b: &InkMask) -> InkMask {
    let values = a.values.iter().zip(b.values.iter()).map(|(x, y)| (*x).min(*y)).collect();
    InkMask { width: a.width, height: a.height, values }
}

fn subtract_mask(a: &InkMask, b: &InkMask) -> InkMask {
    let values = a
        .values
        .iter()
        .zip(b.values.iter())
        .map(|(x, y)| x.saturating_sub(*y))
        .collect();
    InkMask { width: a.width, height: a.height, values }
}

fn render_canvas(
    width: u32,
    height: u32,
    classification: &OverlayClassification,
    raster_old: &Raster,
    raster_new: &Raster,
    transform: &SimilarityTransform,
    params: &ComposeParams,
) -> ComposeResult<RgbImage> {
    let mut canvas = RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]));

    blend_weighted(&mut canvas, &classification.overlap, params.overlap_color.0, params.overlap_color.1, params.overlap_color.2);
    blend_weighted(&mut canvas, &classification.old_only, REMOVAL_COLOR.0, REMOVAL_COLOR.1, REMOVAL_COLOR.2);
    blend_weighted(&mut canvas, &classification.new_only, ADDITION_COLOR.0, ADDITION_COLOR.1, ADDITION_COLOR.2);

    if params.draw_lines {
        let warped_old = warp_to(raster_old, transform, width, height);
        let gray_old = to_gray(&warped_old);
        let gray_new = to_gray(raster_new);
        let mask_params = MaskParams { mask_gamma: params.mask_gamma, alpha_gamma: params.alpha_gamma };
        let ink_old = InkMask::from_raster(&warped_old, &mask_params);
        let ink_new = InkMask::from_raster(raster_new, &mask_params);

        let edges_old = edge_mask(&gray_old, &ink_old, params.edge_threshold);
        let edges_new = edge_mask(&gray_new, &ink_new, params.edge_threshold);
        let edges = union(&edges_old, &edges_new);

        blend_weighted(&mut canvas, &edges, params.line_color.0, params.line_color.1, params.line_color.2);
    }

    Ok(canvas)
}

fn to_gray(raster: &Raster) -> GrayImage {
    let channels = raster.channels.count();
    GrayImage::from_fn(raster.width, raster.height, |x, y| {
        let idx = ((y * raster.width + x) as usize) * channels;
        let (r, g, b) = match raster.channels {
            Channels::Luminance => {
                let l = raster.pixels[idx];
                return image::Luma([l]);
            }
            _ => (raster.pixels[idx], raster.pixels[idx + 1], raster.pixels[idx + 2]),
        };
        let l = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
        image::Luma([l.round() as u8])
    })
}

/// Alpha-blends `color` onto `canvas` with per-pixel weight `mask(p) / 255`.
fn blend_weighted(canvas: &mut RgbImage, mask: &InkMask, r: u8, g: u8, b: u8) {
    for y in 0..canvas.height() {
        for x in 0..canvas.width() {
            let weight = f64::from(mask.get(x, y)) / 255.0;
            if weight <= 0.0 {
                continue;
            }
            let px = canvas.get_pixel_mut(x, y);
            px[0] = blend_channel(px[0], r, weight);
            px[1] = blend_channel(px[1], g, weight);
            px[2] = blend_channel(px[2], b, weight);
        }
    }
}

fn blend_channel(base: u8, overlay: u8, weight: f64) -> u8 {
    (f64::from(base) * (1.0 - weight) + f64::from(overlay) * weight)
        .round()
        .clamp(0.0, 255.0) as u8
}

fn encode_png(canvas: &RgbImage) -> ComposeResult<Vec<u8>> {
    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(canvas.clone())
        .write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| ComposeError::InvalidTransform(format!("png encode failed: {e}")))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_raster(w: u32, h: u32, gray: u8) -> Raster {
        let mut pixels = vec![0u8; (w * h * 4) as usize];
        for chunk in pixels.chunks_mut(4) {
            chunk.copy_from_slice(&[gray, gray, gray, 255]);
        }
        Raster::new(w, h, Channels::Rgba, pixels, 1.0)
    }

    fn black_square_raster(w: u32, h: u32, square: (u32, u32, u32, u32)) -> Raster {
        let mut pixels = vec![255u8; (w * h * 4) as usize];
        for chunk in pixels.chunks_mut(4) {
            chunk[3] = 255;
        }
        let (sx, sy, sw, sh) = square;
        for y in sy..sy + sh {
            for x in sx..sx + sw {
                let idx = ((y * w + x) as usize) * 4;
                pixels[idx..idx + 4].copy_from_slice(&[0, 0, 0, 255]);
            }
        }
        Raster::new(w, h, Channels::Rgba, pixels, 1.0)
    }

    #[test]
    fn identity_inputs_produce_no_red_or_green_pixels_without_lines() {
        let raster = black_square_raster(100, 100, (30, 30, 20, 20));
        let params = ComposeParams { draw_lines: false, vertical_auto_correct: false, ..ComposeParams::default() };
        let png = compose(&raster, &raster, &SimilarityTransform::IDENTITY, &params).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgb8();
        for px in decoded.pixels() {
            let is_red = i32::from(px[0]) > i32::from(px[1]) + 50;
            let is_green = i32::from(px[1]) > i32::from(px[0]) + 50;
            assert!(!is_red && !is_green, "unexpected colored pixel: {px:?}");
        }
    }

    #[test]
    fn compose_is_deterministic() {
        let raster = black_square_raster(64, 64, (10, 10, 10, 10));
        let params = ComposeParams::default();
        let a = compose(&raster, &raster, &SimilarityTransform::IDENTITY, &params).unwrap();
        let b = compose(&raster, &raster, &SimilarityTransform::IDENTITY, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_transform_is_rejected() {
        let raster = solid_raster(10, 10, 255);
        let bad = SimilarityTransform { scale: 0.0, rotation_deg: 0.0, tx: 0.0, ty: 0.0 };
        let err = compose(&raster, &raster, &bad, &ComposeParams::default()).unwrap_err();
        assert!(matches!(err, ComposeError::InvalidTransform(_)));
    }

    #[test]
    fn addition_produces_green_region() {
        let old = black_square_raster(100, 100, (10, 10, 20, 20));
        let new = black_square_raster(100, 100, (10, 10, 20, 20));
        let mut new_pixels = new.pixels.clone();
        for y in 60..80 {
            for x in 60..80 {
                let idx = ((y * 100 + x) as usize) * 4;
                new_pixels[idx..idx + 4].copy_from_slice(&[0, 0, 0, 255]);
            }
        }
        let new = Raster::new(100, 100, Channels::Rgba, new_pixels, 1.0);

        let params = ComposeParams { draw_lines: false, vertical_auto_correct: false, ..ComposeParams::default() };
        let classification = classify(&old, &new, &SimilarityTransform::IDENTITY, &params).unwrap();
        let added_pixel_has_new_only = classification.new_only.get(70, 70) > 0;
        assert!(added_pixel_has_new_only);
        assert_eq!(classification.old_only.get(70, 70), 0);
    }
}
