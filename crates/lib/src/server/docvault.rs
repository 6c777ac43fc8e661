//! Scanned document index.
//!
//! Scans are named `<owner>_<title>.<ext>`. An update pass groups them by
//! lowercase owner and writes the grouping to a JSON index file; reads serve
//! from that file.

use std::{collections::BTreeMap, io, path::Path};

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{AppState, ApiError};

/// One scanned document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocItem {
    /// Title without owner prefix or extension.
    #[serde(rename = "fileName")]
    pub file_name: String,
    /// Path under the scan root, with a leading `/`.
    #[serde(rename = "fullpath")]
    pub full_path: String,
}

/// Documents grouped by lowercase owner.
pub type DocIndex = BTreeMap<String, Vec<DocItem>>;

/// Parse one scan file name; `None` if it has no `owner_` prefix.
fn parse_entry(file_name: &str) -> Option<(String, DocItem)> {
    let (owner, rest) = file_name.split_once('_')?;
    // Only the last extension is dropped; a bare ".pdf" title becomes empty
    let title = rest.rsplit_once('.').map_or(rest, |(stem, _)| stem);
    Some((
        owner.to_lowercase(),
        DocItem {
            file_name: title.to_string(),
            full_path: format!("/{file_name}"),
        },
    ))
}

/// Group the regular files in `dir` by owner.
///
/// Subdirectories and names without an `_` are skipped. Entries within an
/// owner are sorted by path so the index is stable across runs.
pub async fn categorize(dir: &Path) -> io::Result<DocIndex> {
    let mut index = DocIndex::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            tracing::debug!("Skipping non UTF-8 scan name {:?}", entry.path());
            continue;
        };
        if let Some((owner, item)) = parse_entry(name) {
            index.entry(owner).or_default().push(item);
        }
    }
    for items in index.values_mut() {
        items.sort_by(|a, b| a.full_path.cmp(&b.full_path));
    }
    Ok(index)
}

async fn write_index(path: &Path, index: &DocIndex) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    let body = serde_json::to_vec_pretty(index).map_err(io::Error::other)?;
    tokio::fs::write(path, body).await
}

async fn read_index(path: &Path) -> io::Result<DocIndex> {
    let body = tokio::fs::read(path).await?;
    serde_json::from_slice(&body).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Restrict `index` to one owner; unknown owners map to an empty list.
fn filter_owner(mut index: DocIndex, owner: &str) -> DocIndex {
    let owner = owner.to_lowercase();
    let items = index.remove(&owner).unwrap_or_default();
    DocIndex::from([(owner, items)])
}

#[derive(Debug, Deserialize)]
pub struct DocVaultQuery {
    owner: Option<String>,
}

/// Handler for GET /docvault/update
pub async fn handle_update(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let docvault = &state.config.docvault;
    let index = categorize(&docvault.scanned_dir).await.map_err(|e| {
        tracing::error!("Failed to read {}: {e}", docvault.scanned_dir.display());
        ApiError::Internal("Failed to read scanned directory".to_string())
    })?;

    write_index(&docvault.index_path, &index).await.map_err(|e| {
        tracing::error!("Failed to write {}: {e}", docvault.index_path.display());
        ApiError::Internal("Failed to write document index".to_string())
    })?;

    tracing::info!(owners = index.len(), "Document index updated");
    Ok(Json(json!({ "status": true, "data": index })))
}

/// Handler for GET /docvault/get
pub async fn handle_get(
    State(state): State<AppState>,
    Query(query): Query<DocVaultQuery>,
) -> Result<Json<Value>, ApiError> {
    let path = &state.config.docvault.index_path;
    let index = read_index(path).await.map_err(|e| {
        tracing::error!("Failed to load {}: {e}", path.display());
        ApiError::Internal("Failed to read document index".to_string())
    })?;

    let data = match query.owner.as_deref().map(str::trim) {
        Some(owner) if !owner.is_empty() => filter_owner(index, owner),
        _ => index,
    };
    Ok(Json(json!({ "status": true, "data": data })))
}
