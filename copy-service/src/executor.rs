//! Copy executor.
//!
//! Reads the mapped source columns and inserts every row into the destination
//! one statement at a time, inside a single transaction on the destination.

use common::db::DbSession;
use common::errors::AppResult;
use common::models::mapping::ColumnMapping;
use common::models::transfer::{CopyOutcome, NothingToCopyReason};
use common::utils::TableName;

/// Copies all rows of `source_table` into `destination_table` through `mapping`.
///
/// The SELECT lists source columns in mapping key order and the INSERT lists
/// destination columns in mapping value order, so positions line up.
/// An empty mapping or an empty source is reported as `NothingToDo`.
pub async fn copy_with_mapping(
    source: &mut dyn DbSession,
    destination: &mut dyn DbSession,
    source_table: &TableName,
    destination_table: &TableName,
    mapping: &ColumnMapping,
) -> AppResult<CopyOutcome> {
    if mapping.is_empty() {
        return Ok(CopyOutcome::NothingToDo {
            reason: NothingToCopyReason::NoColumnsMapped,
        });
    }

    let select_sql = source
        .dialect()
        .select_columns(source_table, mapping.source_columns())?;
    tracing::debug!(sql = %select_sql, "reading source rows");
    let rows = source.fetch_rows(&select_sql).await?;
    if rows.is_empty() {
        return Ok(CopyOutcome::NothingToDo {
            reason: NothingToCopyReason::NoSourceRows,
        });
    }

    let insert_sql = destination
        .dialect()
        .insert_row(destination_table, mapping.destination_columns())?;
    tracing::debug!(sql = %insert_sql, rows = rows.len(), "inserting rows");
    let inserted = destination.insert_rows(&insert_sql, &rows).await?;

    tracing::info!(
        source = %source_table,
        destination = %destination_table,
        rows = inserted,
        columns = mapping.len(),
        "copy committed"
    );
    Ok(CopyOutcome::Copied {
        rows: inserted,
        columns: mapping.len(),
        source_table: source_table.to_string(),
        destination_table: destination_table.to_string(),
    })
}
