//! Soft ink masks: per-pixel "how much drawing ink is here" weights derived
//! from luminance and alpha.

use ddc_raster_gateway::{Channels, Raster};

#[derive(Debug, Clone, Copy)]
pub struct MaskParams {
    pub mask_gamma: f64,
    pub alpha_gamma: f64,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self { mask_gamma: 1.2, alpha_gamma: 1.0 }
    }
}

/// A single-channel raster where each pixel in `[0, 255]` encodes ink
/// density. Invariant: `width`/`height` match the source raster.
#[derive(Debug, Clone)]
pub struct InkMask {
    pub width: u32,
    pub height: u32,
    pub values: Vec<u8>,
}

impl InkMask {
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.values[(y * self.width + x) as usize]
    }

    fn set(&mut self, x: u32, y: u32, v: u8) {
        self.values[(y * self.width + x) as usize] = v;
    }

    /// `((1 - luminance)^gamma_m) * (alpha^gamma_a)`.
    #[must_use]
    pub fn from_raster(raster: &Raster, params: &MaskParams) -> Self {
        let (w, h) = (raster.width, raster.height);
        let channels = raster.channels.count();
        let has_alpha = raster.channels == Channels::Rgba;
        let mut values = vec![0u8; (w * h) as usize];

        for y in 0..h {
            for x in 0..w {
                let idx = ((y * w + x) as usize) * channels;
                let (r, g, b) = match raster.channels {
                    Channels::Luminance => {
                        let l = raster.pixels[idx];
                        (l, l, l)
                    }
                    _ => (raster.pixels[idx], raster.pixels[idx + 1], raster.pixels[idx + 2]),
                };
                let alpha = if has_alpha { raster.pixels[idx + 3] } else { 255 };

                let luminance = (0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)) / 255.0;
                let ink = (1.0 - luminance).max(0.0).powf(params.mask_gamma);
                let alpha_weight = (f64::from(alpha) / 255.0).powf(params.alpha_gamma);
                let value = (ink * alpha_weight * 255.0).round().clamp(0.0, 255.0) as u8;
                values[(y * w + x) as usize] = value;
            }
        }

        InkMask { width: w, height: h, values }
    }

    /// Dilates the mask with a square max-filter of side `2*radius + 1`.
    #[must_use]
    pub fn dilate(&self, radius: u32) -> InkMask {
        if radius == 0 {
            return self.clone();
        }
        let radius = radius as i64;
        let mut out = InkMask { width: self.width, height: self.height, values: vec![0u8; self.values.len()] };
        for y in 0..self.height as i64 {
            for x in 0..self.width as i64 {
                let mut max_v = 0u8;
                for dy in -radius..=radius {
                    let sy = y + dy;
                    if sy < 0 || sy >= self.height as i64 {
                        continue;
                    }
                    for dx in -radius..=radius {
                        let sx = x + dx;
                        if sx < 0 || sx >= self.width as i64 {
                            continue;
                        }
                        let v = self.get(sx as u32, sy as u32);
                        if v > max_v {
                            max_v = v;
                        }
                    }
                }
                out.set(x as u32, y as u32, max_v);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddc_raster_gateway::Raster;

    #[test]
    fn pure_black_opaque_pixel_is_full_ink() {
        let raster = Raster::new(1, 1, Channels::Rgba, vec![0, 0, 0, 255], 1.0);
        let mask = InkMask::from_raster(&raster, &MaskParams::default());
        assert_eq!(mask.get(0, 0), 255);
    }

    #[test]
    fn white_pixel_has_no_ink() {
        let raster = Raster::new(1, 1, Channels::Rgba, vec![255, 255, 255, 255], 1.0);
        let mask = InkMask::from_raster(&raster, &MaskParams::default());
        assert_eq!(mask.get(0, 0), 0);
    }

    #[test]
    fn transparent_black_pixel_has_no_ink() {
        let raster = Raster::new(1, 1, Channels::Rgba, vec![0, 0, 0, 0], 1.0);
        let mask = InkMask::from_raster(&raster, &MaskParams::default());
        assert_eq!(mask.get(0, 0), 0);
    }

    #[test]
    fn dilate_spreads_ink_into_neighbors() {
        let mut values = vec![0u8; 9];
        values[4] = 200; // center of 3x3
        let mask = InkMask { width: 3, height: 3, values };
        let dilated = mask.dilate(1);
        assert_eq!(dilated.get(0, 0), 200);
        assert_eq!(dilated.get(2, 2), 200);
    }
}
