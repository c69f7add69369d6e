//! Feature & Similarity Estimator: SIFT-style keypoints, ratio-test matching,
//! and a RANSAC-fit 2D similarity transform between two rasters.

mod align;
mod keypoint;
mod matching;
mod ransac;

pub use align::{align, AlignConfig, AlignProfile};
pub use keypoint::{detect_features, to_luminance, FeatureSet, Keypoint, DESCRIPTOR_LEN};
pub use matching::{match_features, Match, MatchSet};
pub use ransac::{ransac_similarity, RansacOutcome, RansacParams};
