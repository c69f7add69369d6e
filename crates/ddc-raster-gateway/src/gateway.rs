use image::imageops::FilterType;

use crate::error::{RenderError, RenderResult};
use crate::rasterizer::PdfRasterizer;
use crate::raster::Raster;

const DEFAULT_HARD_LIMIT_PIXELS: u64 = 200_000_000;

#[derive(Debug, Clone, Copy)]
pub struct GatewayConfig {
    /// Hard ceiling on decoded-raster pixel count; exceeding it is a
    /// `RenderError::TooLarge`, never a silent truncation.
    pub hard_limit_pixels: u64,
    /// Resampling filter used when downscaling to honor `max_longest_side`.
    pub downscale_filter: FilterType,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            hard_limit_pixels: DEFAULT_HARD_LIMIT_PIXELS,
            downscale_filter: FilterType::Lanczos3,
        }
    }
}

/// Converts a PDF page (or an already-rasterized image) into an RGBA raster
/// at a requested DPI, honoring an optional longest-side cap. Streams a
/// single page: only one decoded page is ever resident at a time.
pub struct RasterGateway {
    rasterizer: Box<dyn PdfRasterizer>,
    config: GatewayConfig,
}

impl RasterGateway {
    #[must_use]
    pub fn new(rasterizer: Box<dyn PdfRasterizer>, config: GatewayConfig) -> Self {
        Self { rasterizer, config }
    }

    pub fn render(
        &self,
        doc_bytes: &[u8],
        page_index: u32,
        dpi: f32,
        max_longest_side: Option<u32>,
    ) -> RenderResult<Raster> {
        let (image, scale) = if is_pdf(doc_bytes) {
            let (image, _total_pages) = self.rasterizer.render_page(doc_bytes, page_index, dpi)?;
            (image, f64::from(dpi) / 72.0)
        } else {
            if page_index != 0 {
                return Err(RenderError::PageOutOfRange {
                    page_index,
                    total_pages: 1,
                });
            }
            let decoded = image::load_from_memory(doc_bytes).map_err(|e| RenderError::Decode(e.to_string()))?;
            (decoded.to_rgba8(), 1.0)
        };

        self.check_pixel_budget(image.width(), image.height())?;

        let resized = match max_longest_side {
            Some(max_side) if image.width().max(image.height()) > max_side => {
                let (w, h) = fit_within(image.width(), image.height(), max_side);
                self.check_pixel_budget(w, h)?;
                image::imageops::resize(&image, w, h, self.config.downscale_filter)
            }
            _ => image,
        };

        Ok(Raster::from_rgba_image(resized, scale))
    }

    fn check_pixel_budget(&self, width: u32, height: u32) -> RenderResult<()> {
        let requested = u64::from(width) * u64::from(height);
        if requested > self.config.hard_limit_pixels {
            return Err(RenderError::TooLarge {
                requested,
                limit: self.config.hard_limit_pixels,
            });
        }
        Ok(())
    }
}

fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

/// Scales `(width, height)` down so the longer side equals `max_side`,
/// preserving aspect ratio. Never upscales.
fn fit_within(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let longest = width.max(height) as f64;
    let ratio = f64::from(max_side) / longest;
    (
        ((width as f64 * ratio).round() as u32).max(1),
        ((height as f64 * ratio).round() as u32).max(1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    struct FixedImageRasterizer;
    impl PdfRasterizer for FixedImageRasterizer {
        fn render_page(&self, _doc_bytes: &[u8], page_index: u32, _dpi: f32) -> RenderResult<(RgbaImage, u32)> {
            if page_index > 0 {
                return Err(RenderError::PageOutOfRange { page_index, total_pages: 1 });
            }
            Ok((RgbaImage::new(2000, 1000), 1))
        }
    }

    #[test]
    fn fit_within_preserves_aspect_ratio() {
        let (w, h) = fit_within(2000, 1000, 1000);
        assert_eq!(w, 1000);
        assert_eq!(h, 500);
    }

    #[test]
    fn too_large_is_rejected_before_downscale_when_source_exceeds_limit() {
        let gateway = RasterGateway::new(
            Box::new(FixedImageRasterizer),
            GatewayConfig {
                hard_limit_pixels: 1_000_000,
                ..GatewayConfig::default()
            },
        );
        let err = gateway.render(b"%PDF-1.4", 0, 150.0, Some(500)).unwrap_err();
        assert!(matches!(err, RenderError::TooLarge { .. }));
    }

    #[test]
    fn non_pdf_page_index_other_than_zero_is_out_of_range() {
        let gateway = RasterGateway::new(Box::new(FixedImageRasterizer), GatewayConfig::default());
        let png = {
            let img = image::DynamicImage::ImageRgba8(RgbaImage::new(4, 4));
            let mut buf = std::io::Cursor::new(Vec::new());
            img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
            buf.into_inner()
        };
        let err = gateway.render(&png, 1, 150.0, None).unwrap_err();
        assert!(matches!(err, RenderError::PageOutOfRange { .. }));
    }
}
