//! Catalog browsing models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::connection::ConnectionTarget;

/// Request body for listing the columns of one table.
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct ColumnsRequest {
    /// Connection to the database holding the table.
    #[validate(nested)]
    pub connection: ConnectionTarget,
    /// `schema.table` or `table`.
    #[validate(length(min = 1, message = "Table is required"))]
    pub table: String,
}

/// Columns of one table, in ordinal order.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TableColumns {
    pub table: String,
    pub columns: Vec<String>,
}
