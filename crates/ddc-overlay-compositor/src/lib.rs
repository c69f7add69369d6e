//! Overlay Compositor: warps the baseline raster onto the revised raster's
//! coordinate system and composites a tri-colored PNG (additions, removals,
//! unchanged ink) with optional edge reinforcement.

mod autocorrect;
mod compose;
mod edges;
mod error;
mod mask;
mod params;
mod warp;

pub use compose::{change_count, classify, compose, OverlayClassification};
pub use error::{ComposeError, ComposeResult};
pub use mask::{InkMask, MaskParams};
pub use params::{ComposeParams, Rgb, ADDITION_COLOR, REMOVAL_COLOR};
pub use warp::warp_to;
