//! Compose parameters: the dynamic "dict-like" options bag from the source
//! system, reified as a validated struct.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ComposeParams {
    /// Render zoom the caller rendered both rasters at; recorded into the
    /// diff artifact but not used to re-render (compose takes rasters, not
    /// document bytes — see DESIGN.md).
    pub zoom: f32,
    pub mask_gamma: f64,
    pub alpha_gamma: f64,
    pub edge_threshold: u8,
    pub draw_lines: bool,
    pub overlap_buffer_px: u32,
    pub line_color: Rgb,
    pub overlap_color: Rgb,
    /// Enables the optional vertical cross-correlation correction.
    pub vertical_auto_correct: bool,
}

impl Default for ComposeParams {
    fn default() -> Self {
        Self {
            zoom: 4.0,
            mask_gamma: 1.2,
            alpha_gamma: 1.0,
            edge_threshold: 40,
            draw_lines: true,
            overlap_buffer_px: 2,
            line_color: Rgb(20, 20, 20),
            overlap_color: Rgb(200, 200, 200),
            vertical_auto_correct: true,
        }
    }
}

/// Fixed overlay addition/removal colors, part of the artifact contract
/// downstream compares may depend on.
pub const ADDITION_COLOR: Rgb = Rgb(0, 255, 0);
pub const REMOVAL_COLOR: Rgb = Rgb(255, 0, 0);
