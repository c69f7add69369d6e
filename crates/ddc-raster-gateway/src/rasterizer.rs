//! Vendor-specific PDF library calls, isolated behind `PdfRasterizer` so
//! swapping the rasterizer backend never touches any other component.

use image::RgbaImage;
use pdfium_render::prelude::*;

use crate::error::{RenderError, RenderResult};

pub trait PdfRasterizer: Send + Sync {
    /// Renders `page_index` (0-based) of `doc_bytes` at `dpi`, returning the
    /// page image and the total page count of the document.
    fn render_page(&self, doc_bytes: &[u8], page_index: u32, dpi: f32) -> RenderResult<(RgbaImage, u32)>;
}

/// `pdfium-render`-backed rasterizer. Constructing one loads (or downloads,
/// per the library's own bundling story) the native `pdfium` shared library.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
}

impl PdfiumRasterizer {
    pub fn new() -> RenderResult<Self> {
        let bindings = Pdfium::bind_to_system_library()
            .or_else(|_| Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./")))
            .map_err(|e| RenderError::Decode(format!("failed to load pdfium: {e}")))?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl PdfRasterizer for PdfiumRasterizer {
    fn render_page(&self, doc_bytes: &[u8], page_index: u32, dpi: f32) -> RenderResult<(RgbaImage, u32)> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(doc_bytes, None)
            .map_err(|e| RenderError::Decode(e.to_string()))?;

        let pages = document.pages();
        let total_pages = u32::from(pages.len());
        let page_index_u16 =
            u16::try_from(page_index).map_err(|_| RenderError::PageOutOfRange { page_index, total_pages })?;
        let page = pages
            .get(page_index_u16)
            .map_err(|_| RenderError::PageOutOfRange { page_index, total_pages })?;

        // pdfium expresses target size in pixels; derive it from DPI and the
        // page's PostScript-point dimensions (72 points per inch).
        let scale = dpi / 72.0;
        let target_width = (page.width().value * scale).round().max(1.0) as i32;
        let target_height = (page.height().value * scale).round().max(1.0) as i32;

        let config = PdfRenderConfig::new()
            .set_target_width(target_width)
            .set_target_height(target_height);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| RenderError::Decode(e.to_string()))?;

        Ok((bitmap.as_image().to_rgba8(), total_pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeRasterizer {
        pages: u32,
    }

    impl PdfRasterizer for FakeRasterizer {
        fn render_page(&self, _doc_bytes: &[u8], page_index: u32, _dpi: f32) -> RenderResult<(RgbaImage, u32)> {
            if page_index >= self.pages {
                return Err(RenderError::PageOutOfRange {
                    page_index,
                    total_pages: self.pages,
                });
            }
            Ok((RgbaImage::new(10, 10), self.pages))
        }
    }

    #[test]
    fn fake_rasterizer_rejects_out_of_range_pages() {
        let r = FakeRasterizer { pages: 2 };
        assert!(r.render_page(b"", 0, 150.0).is_ok());
        assert!(matches!(
            r.render_page(b"", 5, 150.0),
            Err(RenderError::PageOutOfRange { .. })
        ));
    }
}
