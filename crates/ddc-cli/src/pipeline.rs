//! The batch-mode per-page pipeline: render -> align -> compose -> write
//! artifacts, following the component contracts and the blob-store path layout.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use ddc_common::SimilarityTransform;
use ddc_feature_similarity::{align, AlignConfig, AlignProfile};
use ddc_overlay_compositor::{change_count, classify, compose, ComposeError, ComposeParams};
use ddc_raster_gateway::{GatewayConfig, PdfiumRasterizer, RasterGateway};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::cli::{Cli, Profile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    InvalidInput = 2,
    DecodeFailure = 3,
    Timeout = 4,
    AllPagesFailed = 5,
}

/// Diff JSON record, with fixed field names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffRecord {
    pub job_id: String,
    pub page_number: u32,
    pub old_page_gcs: String,
    pub new_page_gcs: String,
    pub overlay_gcs: String,
    pub transform: TransformRecord,
    pub alignment_score: f64,
    pub change_count: u64,
    pub changes_detected: Option<bool>,
    pub generated_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformRecord {
    pub scale: f64,
    pub rotation_deg: f64,
    pub tx: f64,
    pub ty: f64,
}

impl From<SimilarityTransform> for TransformRecord {
    fn from(t: SimilarityTransform) -> Self {
        TransformRecord { scale: t.scale, rotation_deg: t.rotation_deg, tx: t.tx, ty: t.ty }
    }
}

pub struct PageOutcome {
    pub page_number: u32,
    pub failed: bool,
    pub reason: Option<String>,
}

/// Runs the full batch diff, writing artifacts under `cli.output_dir`.
/// Returns the terminal exit code and the per-page outcomes actually
/// attempted (empty if the run aborted before the page loop).
pub fn run(cli: &Cli) -> (ExitCode, Vec<PageOutcome>) {
    let deadline = Instant::now() + Duration::from_secs(cli.timeout_secs);

    let old_bytes = match std::fs::read(&cli.old) {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(path = %cli.old.display(), %e, "failed to read old document");
            return (ExitCode::InvalidInput, Vec::new());
        }
    };
    let new_bytes = match std::fs::read(&cli.new) {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(path = %cli.new.display(), %e, "failed to read new document");
            return (ExitCode::InvalidInput, Vec::new());
        }
    };
    if old_bytes.is_empty() || new_bytes.is_empty() {
        tracing::error!("old and new documents must be non-empty");
        return (ExitCode::InvalidInput, Vec::new());
    }

    let rasterizer = match PdfiumRasterizer::new() {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(%e, "failed to initialize pdf rasterizer");
            return (ExitCode::DecodeFailure, Vec::new());
        }
    };
    let gateway = RasterGateway::new(Box::new(rasterizer), GatewayConfig::default());

    let job_id = job_id_for(&old_bytes, &new_bytes);

    let old_page0 = match gateway.render(&old_bytes, 0, cli.dpi, None) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(%e, "failed to decode old document");
            return (ExitCode::DecodeFailure, Vec::new());
        }
    };
    let new_page0 = match gateway.render(&new_bytes, 0, cli.dpi, None) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(%e, "failed to decode new document");
            return (ExitCode::DecodeFailure, Vec::new());
        }
    };
    let _ = (old_page0, new_page0);

    let total_old_pages = page_count(&gateway, &old_bytes, cli.dpi);
    let total_new_pages = page_count(&gateway, &new_bytes, cli.dpi);
    let total_pages = total_old_pages.min(total_new_pages);
    if total_old_pages != total_new_pages {
        tracing::warn!(total_old_pages, total_new_pages, "document page counts differ, truncating to the shorter one");
    }

    let align_config = AlignConfig {
        profile: match cli.profile {
            Profile::General => AlignProfile::General,
            Profile::HighCompute => AlignProfile::HighCompute,
        },
        ..AlignConfig::default()
    };

    let mut outcomes = Vec::with_capacity(total_pages as usize);
    for page_index in 0..total_pages {
        if Instant::now() >= deadline {
            tracing::error!(page_index, "batch diff exceeded its timeout budget");
            return (ExitCode::Timeout, outcomes);
        }
        let page_number = page_index + 1;
        outcomes.push(process_page(&gateway, &old_bytes, &new_bytes, page_index, page_number, &job_id, cli, &align_config));
    }

    if outcomes.is_empty() {
        return (ExitCode::InvalidInput, outcomes);
    }
    if outcomes.iter().all(|o| o.failed) {
        return (ExitCode::AllPagesFailed, outcomes);
    }
    (ExitCode::Success, outcomes)
}

fn page_count(gateway: &RasterGateway, doc_bytes: &[u8], dpi: f32) -> u32 {
    let mut count = 0u32;
    loop {
        match gateway.render(doc_bytes, count, dpi, Some(64)) {
            Ok(_) => count += 1,
            Err(_) => break,
        }
        if count > 10_000 {
            break;
        }
    }
    count.max(1)
}

#[allow(clippy::too_many_arguments)]
fn process_page(
    gateway: &RasterGateway,
    old_bytes: &[u8],
    new_bytes: &[u8],
    page_index: u32,
    page_number: u32,
    job_id: &str,
    cli: &Cli,
    align_config: &AlignConfig,
) -> PageOutcome {
    let page_dir = page_dir(&cli.output_dir, page_number);
    if let Err(e) = std::fs::create_dir_all(&page_dir) {
        tracing::error!(page_number, %e, "failed to create page output directory");
        return PageOutcome { page_number, failed: true, reason: Some(e.to_string()) };
    }

    let raster_old = match gateway.render(old_bytes, page_index, cli.dpi, None) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(page_number, %e, "failed to render old page");
            return PageOutcome { page_number, failed: true, reason: Some(e.to_string()) };
        }
    };
    let raster_new = match gateway.render(new_bytes, page_index, cli.dpi, None) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(page_number, %e, "failed to render new page");
            return PageOutcome { page_number, failed: true, reason: Some(e.to_string()) };
        }
    };

    let alignment = align(&raster_old, &raster_new, align_config);
    tracing::info!(page_number, score = alignment.score, inliers = alignment.inlier_count, "page aligned");

    let mut zoom = cli.zoom;
    let params = ComposeParams { zoom, ..ComposeParams::default() };
    let mut compose_result = compose(&raster_old, &raster_new, &alignment.transform, &params);
    if let Err(ComposeError::OutOfMemory { .. }) = &compose_result {
        zoom = (zoom / 2.0).max(1.0);
        tracing::warn!(page_number, zoom, "compose ran out of memory, retrying at a lower zoom");
        let retry_params = ComposeParams { zoom, ..params };
        compose_result = compose(&raster_old, &raster_new, &alignment.transform, &retry_params);
    }

    let png_bytes = match compose_result {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(page_number, %e, "overlay compose failed permanently");
            return PageOutcome { page_number, failed: true, reason: Some(e.to_string()) };
        }
    };

    let classification = classify(&raster_old, &raster_new, &alignment.transform, &params).ok();
    let change_count = classification.as_ref().map_or(0, change_count);
    let changes_detected = if alignment.score > 0.0 { Some(change_count > 0) } else { None };

    let old_png_path = page_dir.join("old.png");
    let new_png_path = page_dir.join("new.png");
    let overlay_png_path = page_dir.join("overlay.png");
    let diff_json_path = page_dir.join("diff.json");

    if let Err(e) = write_raster_png(&raster_old, &old_png_path) {
        return PageOutcome { page_number, failed: true, reason: Some(e) };
    }
    if let Err(e) = write_raster_png(&raster_new, &new_png_path) {
        return PageOutcome { page_number, failed: true, reason: Some(e) };
    }
    if let Err(e) = std::fs::write(&overlay_png_path, &png_bytes) {
        return PageOutcome { page_number, failed: true, reason: Some(e.to_string()) };
    }

    let record = DiffRecord {
        job_id: job_id.to_string(),
        page_number,
        old_page_gcs: old_png_path.display().to_string(),
        new_page_gcs: new_png_path.display().to_string(),
        overlay_gcs: overlay_png_path.display().to_string(),
        transform: alignment.transform.into(),
        alignment_score: alignment.score,
        change_count,
        changes_detected,
        generated_at: Utc::now(),
    };
    match serde_json::to_vec_pretty(&record) {
        Ok(json) => {
            if let Err(e) = std::fs::write(&diff_json_path, json) {
                return PageOutcome { page_number, failed: true, reason: Some(e.to_string()) };
            }
        }
        Err(e) => return PageOutcome { page_number, failed: true, reason: Some(e.to_string()) },
    }

    PageOutcome { page_number, failed: false, reason: None }
}

fn write_raster_png(raster: &ddc_raster_gateway::Raster, path: &Path) -> Result<(), String> {
    raster.to_dynamic_image().save(path).map_err(|e| e.to_string())
}

fn page_dir(output_dir: &Path, page_number: u32) -> PathBuf {
    output_dir.join("pages").join(format!("{page_number:03}"))
}

fn job_id_for(old_bytes: &[u8], new_bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(old_bytes);
    hasher.update(b":");
    hasher.update(new_bytes);
    let digest = hasher.finalize();
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}
