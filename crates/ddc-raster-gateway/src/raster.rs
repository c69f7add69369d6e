use image::{DynamicImage, RgbaImage};

/// Pixel channel layout of a [`Raster`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    Rgb,
    Rgba,
    Luminance,
}

impl Channels {
    #[must_use]
    pub fn count(self) -> usize {
        match self {
            Channels::Rgb => 3,
            Channels::Rgba => 4,
            Channels::Luminance => 1,
        }
    }
}

/// A rectangular grid of pixels plus the pixels-per-point scale factor
/// relating pixel coordinates back to source document coordinates.
///
/// Owned by the pipeline stage that produced it; the gateway never retains a
/// second decoded page in memory while producing the next.
#[derive(Debug, Clone)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub channels: Channels,
    pub pixels: Vec<u8>,
    pub scale: f64,
}

impl Raster {
    #[must_use]
    pub fn from_rgba_image(image: RgbaImage, scale: f64) -> Self {
        let (width, height) = image.dimensions();
        Raster {
            width,
            height,
            channels: Channels::Rgba,
            pixels: image.into_raw(),
            scale,
        }
    }

    /// # Panics
    /// Panics if `pixels.len()` does not match `width * height * channels.count()`,
    /// per the struct's stated invariant — callers construct rasters only from
    /// a decoded image buffer, never from hand-assembled byte vectors.
    #[must_use]
    pub fn new(width: u32, height: u32, channels: Channels, pixels: Vec<u8>, scale: f64) -> Self {
        assert_eq!(
            pixels.len(),
            width as usize * height as usize * channels.count(),
            "raster pixel buffer length does not match width*height*channels"
        );
        Raster {
            width,
            height,
            channels,
            pixels,
            scale,
        }
    }

    #[must_use]
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    #[must_use]
    pub fn to_dynamic_image(&self) -> DynamicImage {
        match self.channels {
            Channels::Rgba => DynamicImage::ImageRgba8(
                RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
                    .expect("raster invariant guarantees a valid buffer length"),
            ),
            Channels::Rgb => DynamicImage::ImageRgb8(
                image::RgbImage::from_raw(self.width, self.height, self.pixels.clone())
                    .expect("raster invariant guarantees a valid buffer length"),
            ),
            Channels::Luminance => DynamicImage::ImageLuma8(
                image::GrayImage::from_raw(self.width, self.height, self.pixels.clone())
                    .expect("raster invariant guarantees a valid buffer length"),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_count_matches_dimensions() {
        let r = Raster::new(4, 3, Channels::Luminance, vec![0u8; 12], 1.0);
        assert_eq!(r.pixel_count(), 12);
    }

    #[test]
    #[should_panic(expected = "raster pixel buffer length")]
    fn new_panics_on_mismatched_buffer() {
        let _ = Raster::new(4, 3, Channels::Rgb, vec![0u8; 5], 1.0);
    }
}
