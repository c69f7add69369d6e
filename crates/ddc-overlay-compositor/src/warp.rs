//! Warps the baseline raster onto the revised raster's coordinate system via
//! integer paste plus subpixel pre-shift for the common
//! pure-translation case, full inverse-bilinear sampling otherwise.

use ddc_common::SimilarityTransform;
use ddc_raster_gateway::{Channels, Raster};

/// Samples `raster` at fractional pixel coordinates with bilinear
/// interpolation. Out-of-bounds samples return fully transparent black.
fn sample_bilinear(raster: &Raster, x: f64, y: f64) -> [u8; 4] {
    let channels = raster.channels.count();
    if x < -1.0 || y < -1.0 || x > raster.width as f64 || y > raster.height as f64 {
        return [0, 0, 0, 0];
    }

    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let get = |ix: i64, iy: i64| -> [u8; 4] {
        if ix < 0 || iy < 0 || ix >= raster.width as i64 || iy >= raster.height as i64 {
            return [0, 0, 0, 0];
        }
        let idx = ((iy as u32 * raster.width + ix as u32) as usize) * channels;
        match raster.channels {
            Channels::Rgba => [
                raster.pixels[idx],
                raster.pixels[idx + 1],
                raster.pixels[idx + 2],
                raster.pixels[idx + 3],
            ],
            Channels::Rgb => [raster.pixels[idx], raster.pixels[idx + 1], raster.pixels[idx + 2], 255],
            Channels::Luminance => {
                let l = raster.pixels[idx];
                [l, l, l, 255]
            }
        }
    };

    let x0i = x0 as i64;
    let y0i = y0 as i64;
    let p00 = get(x0i, y0i);
    let p10 = get(x0i + 1, y0i);
    let p01 = get(x0i, y0i + 1);
    let p11 = get(x0i + 1, y0i + 1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = f64::from(p00[c]) * (1.0 - fx) + f64::from(p10[c]) * fx;
        let bottom = f64::from(p01[c]) * (1.0 - fx) + f64::from(p11[c]) * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Warps `old` into a raster with `(out_width, out_height)` dimensions,
/// positioned in `new`'s coordinate system per `transform` (which maps old
/// coordinates to new coordinates). Pixels with no source fall back to fully
/// transparent so the overlay compositor treats them as "no ink" rather than
/// stray color.
#[must_use]
pub fn warp_to(old: &Raster, transform: &SimilarityTransform, out_width: u32, out_height: u32) -> Raster {
    if transform.is_identity_like() {
        return warp_translation_fast(old, transform.tx, transform.ty, out_width, out_height);
    }

    let inverse = transform.invert();
    let mut pixels = vec![0u8; (out_width * out_height * 4) as usize];
    for y in 0..out_height {
        for x in 0..out_width {
            let src = inverse.apply((f64::from(x), f64::from(y)));
            let color = sample_bilinear(old, src.0, src.1);
            let idx = ((y * out_width + x) as usize) * 4;
            pixels[idx..idx + 4].copy_from_slice(&color);
        }
    }
    Raster::new(out_width, out_height, Channels::Rgba, pixels, old.scale)
}

/// Pure-translation fast path: decomposes `(tx, ty)` into an integer offset
/// and a `[0, 1)` fractional remainder, pre-shifts by the negated fractional
/// part via bilinear sampling, then pastes at the integer offset.
fn warp_translation_fast(old: &Raster, tx: f64, ty: f64, out_width: u32, out_height: u32) -> Raster {
    let oi = tx.floor() as i64;
    let oj = ty.floor() as i64;
    let dx = tx - oi as f64;
    let dy = ty - oj as f64;

    let mut pixels = vec![0u8; (out_width * out_height * 4) as usize];
    for y in 0..out_height as i64 {
        for x in 0..out_width as i64 {
            let sx = x - oi;
            let sy = y - oj;
            // Pre-shift by (-dx, -dy): sample the source half a step back so
            // the subsequent integer paste lands the fractional remainder
            // correctly.
            let color = if dx == 0.0 && dy == 0.0 {
                sample_bilinear(old, sx as f64, sy as f64)
            } else {
                sample_bilinear(old, sx as f64 - dx, sy as f64 - dy)
            };
            let idx = ((y as u32 * out_width + x as u32) as usize) * 4;
            pixels[idx..idx + 4].copy_from_slice(&color);
        }
    }
    Raster::new(out_width, out_height, Channels::Rgba, pixels, old.scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_raster(w: u32, h: u32, color: [u8; 4]) -> Raster {
        let mut pixels = vec![0u8; (w * h * 4) as usize];
        for chunk in pixels.chunks_mut(4) {
            chunk.copy_from_slice(&color);
        }
        Raster::new(w, h, Channels::Rgba, pixels, 1.0)
    }

    #[test]
    fn identity_transform_copies_pixels_unchanged() {
        let raster = solid_raster(10, 10, [10, 20, 30, 255]);
        let warped = warp_to(&raster, &SimilarityTransform::IDENTITY, 10, 10);
        assert_eq!(warped.pixels[40..44], [10, 20, 30, 255]);
    }

    #[test]
    fn integer_translation_shifts_content() {
        let mut pixels = vec![0u8; 16 * 16 * 4];
        // Single opaque black pixel at (2, 2).
        let idx = ((2 * 16 + 2) as usize) * 4;
        pixels[idx..idx + 4].copy_from_slice(&[0, 0, 0, 255]);
        let raster = Raster::new(16, 16, Channels::Rgba, pixels, 1.0);

        let transform = SimilarityTransform { scale: 1.0, rotation_deg: 0.0, tx: 3.0, ty: 0.0 };
        let warped = warp_to(&raster, &transform, 16, 16);
        let moved_idx = ((2 * 16 + 5) as usize) * 4;
        assert_eq!(warped.pixels[moved_idx + 3], 255);
    }
}
