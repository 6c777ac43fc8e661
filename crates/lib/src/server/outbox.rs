//! Outgoing letter register.
//!
//! The register is maintained as a spreadsheet. An update pass converts one
//! sheet to a list of JSON objects keyed by the header row and writes it to
//! a JSON file; reads serve from that file.

use std::{
    io,
    path::{Path, PathBuf},
};

use axum::{Json, extract::State};
use calamine::{Data, Reader, Xlsx, XlsxError, open_workbook};
use serde_json::{Map, Value, json};
use thiserror::Error;

use super::{AppState, ApiError};

/// One register row, keyed by column header.
pub type OutboxRecord = Map<String, Value>;

/// Errors converting the register workbook.
#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("Failed to open workbook {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },

    #[error("Failed to read sheet '{sheet}'")]
    Sheet {
        sheet: String,
        #[source]
        source: XlsxError,
    },

    /// The sheet has no header row or no data below it.
    #[error("No data found in Excel sheet or header row is missing")]
    NoData,
}

/// Read `sheet` from the workbook at `path` as header-keyed records.
///
/// Blocking; run it off the async executor.
pub fn read_sheet(path: &Path, sheet: &str) -> Result<Vec<OutboxRecord>, OutboxError> {
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(|source| OutboxError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let range = workbook
        .worksheet_range(sheet)
        .map_err(|source| OutboxError::Sheet {
            sheet: sheet.to_string(),
            source,
        })?;

    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| {
            // Trailing blank cells are not part of the row
            let len = row
                .iter()
                .rposition(|cell| !matches!(cell, Data::Empty))
                .map_or(0, |last| last + 1);
            row[..len].iter().map(|cell| cell.to_string()).collect::<Vec<_>>()
        })
        .collect();
    records(rows)
}

/// Pair every row after the first with the first row's headers.
///
/// Cells beyond the header width are dropped; a short row simply lacks the
/// remaining keys.
fn records(rows: Vec<Vec<String>>) -> Result<Vec<OutboxRecord>, OutboxError> {
    let mut rows = rows.into_iter();
    let (Some(header), Some(first)) = (rows.next(), rows.next()) else {
        return Err(OutboxError::NoData);
    };

    Ok(std::iter::once(first)
        .chain(rows)
        .map(|row| {
            header
                .iter()
                .zip(row)
                .map(|(key, cell)| (key.clone(), Value::String(cell)))
                .collect::<OutboxRecord>()
        })
        .collect())
}

async fn write_records(path: &Path, records: &[OutboxRecord]) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    let body = serde_json::to_vec_pretty(records).map_err(io::Error::other)?;
    tokio::fs::write(path, body).await
}

/// Handler for GET /outbox/update
pub async fn handle_update(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let outbox = &state.config.outbox;
    let workbook = outbox.workbook_path.clone();
    let sheet = outbox.sheet.clone();

    let records = tokio::task::spawn_blocking(move || read_sheet(&workbook, &sheet))
        .await
        .map_err(|e| {
            tracing::error!("Outbox conversion task failed: {e}");
            ApiError::Internal("Failed to convert outbox workbook".to_string())
        })?
        .map_err(|e| match e {
            OutboxError::NoData => ApiError::BadRequest(e.to_string()),
            e => {
                tracing::error!("Outbox conversion failed: {e:?}");
                ApiError::Internal("Failed to convert outbox workbook".to_string())
            }
        })?;

    write_records(&outbox.json_path, &records).await.map_err(|e| {
        tracing::error!("Failed to write {}: {e}", outbox.json_path.display());
        ApiError::Internal("Failed to write outbox data".to_string())
    })?;

    tracing::info!(rows = records.len(), "Outbox register converted");
    Ok(Json(json!({
        "status": "success",
        "message": "Successfully converted",
        "data": records,
    })))
}

/// Handler for GET /outbox/get
pub async fn handle_get(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let path = &state.config.outbox.json_path;
    let data: Value = tokio::fs::read(path)
        .await
        .and_then(|body| {
            serde_json::from_slice(&body).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
        })
        .map_err(|e| {
            tracing::error!("Failed to load {}: {e}", path.display());
            ApiError::Internal("Failed to read outbox data".to_string())
        })?;
    Ok(Json(json!({ "status": true, "data": data })))
}
