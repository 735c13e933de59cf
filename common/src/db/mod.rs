//! Database access layer.
//!
//! `Connector` turns a `ConnectionTarget` into a boxed `DbSession`. A session
//! wraps one physical connection; it is opened for a single operation and
//! closed at the end of it.

pub mod connector;
pub mod dialect;
pub mod mssql;
pub mod sqlite;
pub mod value;

use async_trait::async_trait;

use crate::errors::AppResult;
use crate::utils::TableName;

pub use connector::Connector;
pub use dialect::Dialect;
pub use value::{Row, SqlValue, ValueKind};

/// One open database connection.
#[async_trait]
pub trait DbSession: Send {
    /// SQL dialect spoken by this session.
    fn dialect(&self) -> Dialect;

    /// Round-trips a trivial statement.
    async fn ping(&mut self) -> AppResult<()>;

    /// Databases visible on the server, sorted by name.
    async fn list_databases(&mut self) -> AppResult<Vec<String>>;

    /// Base tables of the current database, sorted by schema then name.
    async fn list_tables(&mut self) -> AppResult<Vec<TableName>>;

    /// Column names of `table` in ordinal order.
    async fn list_columns(&mut self, table: &TableName) -> AppResult<Vec<String>>;

    /// Runs a SELECT and returns every row.
    async fn fetch_rows(&mut self, sql: &str) -> AppResult<Vec<Row>>;

    /// Executes `sql` once per row inside one transaction, committing after the
    /// last row. Returns the number of rows inserted.
    ///
    /// On error the transaction is left uncommitted; it is discarded when the
    /// connection goes away.
    async fn insert_rows(&mut self, sql: &str, rows: &[Row]) -> AppResult<u64>;

    /// Closes the underlying connection.
    async fn close(self: Box<Self>) -> AppResult<()>;
}

/// Closes `session`, logging a close failure instead of returning it.
///
/// Used once the operation's own result is known, so a failed close never
/// masks it.
pub async fn release(session: Box<dyn DbSession>) {
    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "Failed to close database connection");
    }
}
