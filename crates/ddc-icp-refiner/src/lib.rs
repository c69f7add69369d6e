//! ICP Refiner (optional path): refines an initial similarity transform
//! against two point clouds extracted from PDF vector drawing commands,
//! using trimmed iterative-closest-point with Umeyama similarity fitting.

mod icp;
mod nearest;
mod sampling;
mod vector_points;

pub use icp::{refine, IcpMode, IcpParams};
pub use sampling::subsample;
pub use vector_points::{sample_points, DrawCommand};
