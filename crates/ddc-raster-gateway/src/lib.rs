//! Converts a PDF page (or accepts a pre-rendered image) into an RGB(A)
//! raster at a requested DPI. A pure function from `(doc_bytes, page_index,
//! dpi)` to `Raster`; never holds more than one decoded page in memory.

mod error;
mod gateway;
mod raster;
mod rasterizer;

pub use error::{RenderError, RenderResult};
pub use gateway::{GatewayConfig, RasterGateway};
pub use raster::{Channels, Raster};
pub use rasterizer::{PdfRasterizer, PdfiumRasterizer};
