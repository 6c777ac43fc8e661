//! Taxpayer master file lookup.
//!
//! The master file schema is not fixed, so each lookup reads the table's
//! column list first. Columns whose declared type the `Any` driver cannot
//! decode (dates, decimals, unsigned integers, ...) are cast to text in the
//! projection; the rest come back as their native JSON type.

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Map, Value};
use sqlx::{Column, Row, any::AnyRow};

use super::{AppState, ApiError};
use crate::registry::{Driver, TableColumn};

/// Logical connection holding the `masterfile` table.
pub const MFWP_DATABASE: &str = "mfwp";

const MASTERFILE_TABLE: &str = "masterfile";

/// A 15-digit taxpayer number.
pub fn is_valid_npwp(npwp: &str) -> bool {
    npwp.len() == 15 && npwp.bytes().all(|b| b.is_ascii_digit())
}

/// Handler for GET /mfwp/get/{npwp}
pub async fn handle_get(
    State(state): State<AppState>,
    Path(npwp): Path<String>,
) -> Result<Json<Map<String, Value>>, ApiError> {
    if !is_valid_npwp(&npwp) {
        return Err(ApiError::BadRequest(
            "Invalid NPWP format. It must be 15 digits.".to_string(),
        ));
    }

    let connection = state.registry.get(MFWP_DATABASE).map_err(|e| {
        tracing::error!("{e}");
        ApiError::Internal(format!("Database connection for '{MFWP_DATABASE}' not found"))
    })?;
    let query_failed = || ApiError::Internal("Failed to query master file".to_string());

    let columns = connection
        .table_columns(MASTERFILE_TABLE)
        .await
        .map_err(|e| {
            tracing::error!("Masterfile column lookup failed: {e}");
            query_failed()
        })?;
    if columns.is_empty() {
        tracing::error!("Table '{MASTERFILE_TABLE}' is missing on '{MFWP_DATABASE}'");
        return Err(query_failed());
    }

    let sql = masterfile_lookup(connection.driver(), &columns);
    let row = connection
        .run(
            "masterfile lookup",
            sqlx::query(&sql)
                .bind(npwp.as_str())
                .fetch_optional(connection.pool()),
        )
        .await
        .map_err(|e| {
            tracing::error!("Masterfile lookup failed: {e}");
            query_failed()
        })?;

    match row {
        Some(row) => Ok(Json(row_to_json(&row))),
        None => Err(ApiError::NotFound("Taxpayer not found".to_string())),
    }
}

/// Lookup statement selecting every column, text-cast where needed.
fn masterfile_lookup(driver: Driver, columns: &[TableColumn]) -> String {
    let projection = columns
        .iter()
        .map(|column| {
            let name = quote_identifier(&column.name);
            if decodes_natively(driver, &column.declared_type) {
                name
            } else {
                let text = match driver {
                    Driver::Mysql => "CHAR",
                    Driver::Sqlite => "TEXT",
                };
                format!("CAST({name} AS {text}) AS {name}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {projection} FROM {MASTERFILE_TABLE} WHERE NPWP_15 = ? LIMIT 1")
}

/// Whether values of `declared_type` decode through the `Any` driver as is.
fn decodes_natively(driver: Driver, declared_type: &str) -> bool {
    match driver {
        Driver::Mysql => {
            let base = declared_type
                .split(['(', ' '])
                .next()
                .unwrap_or_default();
            !declared_type.contains("unsigned")
                && matches!(
                    base,
                    "char"
                        | "varchar"
                        | "tinytext"
                        | "text"
                        | "mediumtext"
                        | "longtext"
                        | "smallint"
                        | "mediumint"
                        | "int"
                        | "integer"
                        | "bigint"
                        | "float"
                        | "double"
                )
        }
        // Declared types follow SQLite's affinity rules
        Driver::Sqlite => ["int", "char", "clob", "text", "real", "floa", "doub"]
            .iter()
            .any(|affinity| declared_type.contains(affinity)),
    }
}

/// Backtick-quoted identifier; both MySQL and SQLite accept this form.
fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Convert a row of unknown shape to a JSON object keyed by column name.
fn row_to_json(row: &AnyRow) -> Map<String, Value> {
    row.columns()
        .iter()
        .map(|column| (column.name().to_string(), column_value(row, column.ordinal())))
        .collect()
}

/// Decode one column, trying text first and falling back through the
/// scalar types the driver reports. Binary columns are read as lossy UTF-8.
fn column_value(row: &AnyRow, index: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v.map_or(Value::Null, Value::String);
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return v.map_or(Value::Null, Value::Bool);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return v.map_or(Value::Null, |bytes| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        });
    }
    Value::Null
}
