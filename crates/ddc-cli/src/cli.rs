//! Argument parsing for the standalone batch-mode binary.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Profile {
    General,
    HighCompute,
}

#[derive(Parser)]
#[command(
    name = "ddc",
    version,
    about = "Drawing Diff Core standalone batch mode",
    long_about = "Diffs two revisions of an architectural drawing page-by-page: aligns each \
                  page pair with feature matching + RANSAC, composites a tri-colored overlay \
                  (additions green, removals red, unchanged gray), and writes the artifacts \
                  a downstream OCR/summarization pipeline expects."
)]
pub struct Cli {
    /// Path to the "old" revision (PDF or raster image).
    #[arg(long)]
    pub old: PathBuf,

    /// Path to the "new" revision (PDF or raster image).
    #[arg(long)]
    pub new: PathBuf,

    /// Directory artifacts are written under (`pages/{NNN}/...`).
    #[arg(long, default_value = "./ddc-output")]
    pub output_dir: PathBuf,

    /// Rasterization DPI for both documents.
    #[arg(long, default_value_t = 150.0)]
    pub dpi: f32,

    /// Render zoom recorded into the diff artifact.
    #[arg(long, default_value_t = 4.0)]
    pub zoom: f32,

    /// Feature-detection effort profile.
    #[arg(long, value_enum, default_value_t = Profile::General)]
    pub profile: Profile,

    /// Overall wall-clock budget before the batch aborts with exit code 4.
    #[arg(long, default_value_t = 300)]
    pub timeout_secs: u64,

    /// Enable debug-level logging.
    #[arg(short, long)]
    pub verbose: bool,
}
