//! Mapping and copy request/response models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::connection::ConnectionTarget;
use super::mapping::ColumnMapping;

/// A table on a specific connection.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct TableSelection {
    /// Connection to the database holding the table.
    #[validate(nested)]
    pub connection: ConnectionTarget,
    /// `schema.table` or `table`.
    #[validate(length(min = 1, message = "Table is required"))]
    pub table: String,
}

/// A user edit to the proposed mapping.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct MappingOverride {
    /// Source column being edited.
    pub source: String,
    /// New destination column; `null` or `""` removes the mapping.
    #[serde(default)]
    pub destination: Option<String>,
}

/// Request body for building a mapping proposal.
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct MappingRequest {
    #[validate(nested)]
    pub source: TableSelection,
    #[validate(nested)]
    pub destination: TableSelection,
    /// Edits applied on top of the name-match defaults, in order.
    #[serde(default)]
    pub overrides: Vec<MappingOverride>,
}

/// One grid row: a source column and its current destination.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct MappingRow {
    pub source: String,
    pub destination: Option<String>,
}

/// Proposed mapping as an editable grid.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MappingProposal {
    /// One row per source column, in source ordinal order.
    pub rows: Vec<MappingRow>,
    /// Choices for the destination dropdown; the first entry is `""` (unmapped).
    pub destination_options: Vec<String>,
    /// The resolved mapping, ready to send to `/api/copy`.
    #[schema(value_type = Object)]
    pub mapping: ColumnMapping,
}

/// Request body for running a copy.
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct CopyRequest {
    #[validate(nested)]
    pub source: TableSelection,
    #[validate(nested)]
    pub destination: TableSelection,
    /// Ordered `{source_column: destination_column}` object.
    #[schema(value_type = Object)]
    pub mapping: ColumnMapping,
}

/// Why a copy had nothing to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NothingToCopyReason {
    NoColumnsMapped,
    NoSourceRows,
}

/// Result of one copy run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CopyOutcome {
    /// Rows were inserted and committed.
    Copied {
        rows: u64,
        columns: usize,
        source_table: String,
        destination_table: String,
    },
    /// Benign no-op.
    NothingToDo { reason: NothingToCopyReason },
}

impl CopyOutcome {
    /// Message shown to the user.
    pub fn message(&self) -> String {
        match self {
            CopyOutcome::Copied {
                rows,
                columns,
                source_table,
                destination_table,
            } => format!(
                "Copied {} rows from {} -> {} ({} columns).",
                rows, source_table, destination_table, columns
            ),
            CopyOutcome::NothingToDo {
                reason: NothingToCopyReason::NoColumnsMapped,
            } => "No columns mapped. Nothing to copy.".to_string(),
            CopyOutcome::NothingToDo {
                reason: NothingToCopyReason::NoSourceRows,
            } => "No rows found in source table.".to_string(),
        }
    }

    /// Rows inserted (zero for no-ops).
    pub fn rows_copied(&self) -> u64 {
        match self {
            CopyOutcome::Copied { rows, .. } => *rows,
            CopyOutcome::NothingToDo { .. } => 0,
        }
    }
}

/// Response body of `/api/copy`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CopyReport {
    #[serde(flatten)]
    pub outcome: CopyOutcome,
    pub message: String,
    pub duration_ms: u64,
}

impl CopyReport {
    pub fn new(outcome: CopyOutcome, duration_ms: u64) -> Self {
        Self {
            message: outcome.message(),
            outcome,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copied_message() {
        let outcome = CopyOutcome::Copied {
            rows: 3,
            columns: 2,
            source_table: "dbo.Employees".into(),
            destination_table: "dbo.Staff".into(),
        };
        assert_eq!(
            outcome.message(),
            "Copied 3 rows from dbo.Employees -> dbo.Staff (2 columns)."
        );
    }

    #[test]
    fn test_report_json_shape() {
        let report = CopyReport::new(
            CopyOutcome::NothingToDo {
                reason: NothingToCopyReason::NoSourceRows,
            },
            4,
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "nothing_to_do");
        assert_eq!(json["reason"], "no_source_rows");
        assert_eq!(json["message"], "No rows found in source table.");
    }

    #[test]
    fn test_copy_request_mapping_order() {
        let req: CopyRequest = serde_json::from_str(
            r#"{
                "source": {"connection": {"server": "A", "database": "HR"}, "table": "dbo.Employees"},
                "destination": {"connection": {"server": "B", "database": "HR2"}, "table": "dbo.Staff"},
                "mapping": {"Name": "FullName", "Dept": "Dept"}
            }"#,
        )
        .unwrap();
        let destinations: Vec<_> = req.mapping.destination_columns().collect();
        assert_eq!(destinations, ["FullName", "Dept"]);
        assert!(req.validate().is_ok());
    }
}
