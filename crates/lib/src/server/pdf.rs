//! PDF compression through an external Ghostscript binary.

use std::{
    io,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;

use super::{AppState, ApiError};

/// Name of the file the compression endpoint reads from the input directory.
pub const INPUT_FILE: &str = "input.pdf";

/// Errors from one Ghostscript run.
#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("Failed to start Ghostscript")]
    Spawn {
        #[source]
        source: io::Error,
    },

    #[error("Ghostscript exited with {status}: {output}")]
    Failed { status: String, output: String },

    #[error("Ghostscript did not finish within {}s", .after.as_secs())]
    TimedOut { after: Duration },
}

/// Compress `input` into `output` at a `-dPDFSETTINGS` preset.
///
/// The child is killed if `limit` elapses.
pub async fn compress_pdf(
    gs: &Path,
    input: &Path,
    output: &Path,
    level: &str,
    limit: Duration,
) -> Result<(), CompressionError> {
    let mut command = Command::new(gs);
    command
        .arg("-sDEVICE=pdfwrite")
        .arg("-dCompatibilityLevel=1.4")
        .arg(format!("-dPDFSETTINGS=/{level}"))
        .arg("-dNOPAUSE")
        .arg("-dQUIET")
        .arg("-dBATCH")
        .arg(format!("-sOutputFile={}", output.display()))
        .arg(input)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    tracing::debug!(?command, "Running Ghostscript");

    let result = tokio::time::timeout(limit, command.output())
        .await
        .map_err(|_| CompressionError::TimedOut { after: limit })?
        .map_err(|source| CompressionError::Spawn { source })?;

    if result.status.success() {
        Ok(())
    } else {
        let mut output = String::from_utf8_lossy(&result.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&result.stderr));
        Err(CompressionError::Failed {
            status: result.status.to_string(),
            output,
        })
    }
}

/// Check that `gs -v` runs within `limit`. Logs the outcome.
pub async fn verify_ghostscript(gs: &Path, limit: Duration) -> bool {
    let mut command = Command::new(gs);
    command.arg("-v").stdin(Stdio::null()).kill_on_drop(true);

    match tokio::time::timeout(limit, command.output()).await {
        Ok(Ok(out)) if out.status.success() => {
            tracing::info!("Ghostscript binary confirmed at {}", gs.display());
            true
        }
        Ok(Ok(out)) => {
            tracing::warn!("Ghostscript at {} exited with {}", gs.display(), out.status);
            false
        }
        Ok(Err(e)) => {
            tracing::warn!("Ghostscript not found at {}: {e}", gs.display());
            false
        }
        Err(_) => {
            tracing::warn!(
                "Ghostscript at {} did not answer within {}s",
                gs.display(),
                limit.as_secs()
            );
            false
        }
    }
}

/// Compression request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionRequest {
    compression_level: String,
}

/// Compression response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    output_path: Option<String>,
    message: String,
    available_compression_levels: Vec<String>,
}

/// Handler for POST /utils/pdfcompression
pub async fn handle_compress(
    State(state): State<AppState>,
    payload: Result<Json<CompressionRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = payload else {
        return ApiError::BadRequest("Invalid request body".to_string()).into_response();
    };
    let gs = &state.config.ghostscript;

    if !tokio::fs::try_exists(&gs.path).await.unwrap_or(false) {
        tracing::error!("Ghostscript binary missing at {}", gs.path.display());
        return ApiError::Internal("Ghostscript binary not found at the configured path".to_string())
            .into_response();
    }

    if !gs.compression_levels.contains(&request.compression_level) {
        let body = CompressionResponse {
            output_path: None,
            message: "Invalid compression level".to_string(),
            available_compression_levels: gs.compression_levels.clone(),
        };
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    }

    let input = gs.input_dir.join(INPUT_FILE);
    if !tokio::fs::try_exists(&input).await.unwrap_or(false) {
        return ApiError::NotFound("Input file not found".to_string()).into_response();
    }

    if let Err(e) = tokio::fs::create_dir_all(&gs.output_dir).await {
        tracing::error!("Failed to create {}: {e}", gs.output_dir.display());
        return ApiError::Internal("Failed to prepare output directory".to_string())
            .into_response();
    }
    let output: PathBuf = gs
        .output_dir
        .join(format!("{}.pdf", uuid::Uuid::new_v4()));

    let limit = state.config.timeouts.compression();
    match compress_pdf(&gs.path, &input, &output, &request.compression_level, limit).await {
        Ok(()) => {
            tracing::info!(level = %request.compression_level, "Compressed PDF to {}", output.display());
            Json(CompressionResponse {
                output_path: Some(output.display().to_string()),
                message: "PDF compressed successfully".to_string(),
                available_compression_levels: gs.compression_levels.clone(),
            })
            .into_response()
        }
        Err(e) => {
            tracing::error!("PDF compression failed: {e}");
            ApiError::Internal("Failed to compress PDF".to_string()).into_response()
        }
    }
}
