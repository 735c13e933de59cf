//! SQLite sessions over a single `sqlx` connection.

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Connection, Row as _, TypeInfo, ValueRef};

use super::value::{format_decimal, Row, SqlValue, ValueKind};
use super::{DbSession, Dialect};
use crate::errors::{AppError, AppResult};
use crate::utils::TableName;

/// A SQLite database file opened for one operation.
pub struct SqliteSession {
    conn: SqliteConnection,
    path: String,
}

impl SqliteSession {
    /// Opens an existing database file.
    pub async fn connect(path: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(false);
        let conn = SqliteConnection::connect_with(&options)
            .await
            .map_err(|e| AppError::DatabaseConnection(format!("{}: {}", path, e)))?;
        tracing::debug!(path = %path, "sqlite connection opened");
        Ok(Self {
            conn,
            path: path.to_string(),
        })
    }
}

#[async_trait]
impl DbSession for SqliteSession {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn ping(&mut self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&mut self.conn).await?;
        Ok(())
    }

    async fn list_databases(&mut self) -> AppResult<Vec<String>> {
        let rows = sqlx::query("SELECT name FROM pragma_database_list ORDER BY name")
            .fetch_all(&mut self.conn)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(AppError::from))
            .collect()
    }

    async fn list_tables(&mut self) -> AppResult<Vec<TableName>> {
        let rows = sqlx::query(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )
        .fetch_all(&mut self.conn)
        .await?;
        rows.iter()
            .map(|row| {
                let name: String = row.try_get("name")?;
                TableName::new(None, &name)
            })
            .collect()
    }

    async fn list_columns(&mut self, table: &TableName) -> AppResult<Vec<String>> {
        let rows = match table.schema() {
            Some(schema) => {
                sqlx::query("SELECT name FROM pragma_table_info(?1, ?2) ORDER BY cid")
                    .bind(table.name())
                    .bind(schema)
                    .fetch_all(&mut self.conn)
                    .await?
            }
            None => {
                sqlx::query("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
                    .bind(table.name())
                    .fetch_all(&mut self.conn)
                    .await?
            }
        };
        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(AppError::from))
            .collect()
    }

    async fn fetch_rows(&mut self, sql: &str) -> AppResult<Vec<Row>> {
        let rows = sqlx::query(sql).fetch_all(&mut self.conn).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn insert_rows(&mut self, sql: &str, rows: &[Row]) -> AppResult<u64> {
        let mut tx = self.conn.begin().await?;
        let mut inserted = 0u64;
        for row in rows {
            let query = row.iter().fold(sqlx::query(sql), bind_value);
            query.execute(&mut *tx).await?;
            inserted += 1;
        }
        tx.commit().await?;
        tracing::debug!(path = %self.path, rows = inserted, "sqlite insert committed");
        Ok(inserted)
    }

    async fn close(self: Box<Self>) -> AppResult<()> {
        self.conn.close().await?;
        Ok(())
    }
}

fn decode_row(row: &SqliteRow) -> AppResult<Row> {
    (0..row.len()).map(|idx| decode_value(row, idx)).collect()
}

fn decode_value(row: &SqliteRow, idx: usize) -> AppResult<SqlValue> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(SqlValue::Null(ValueKind::Unknown));
    }
    let type_name = raw.type_info().name().to_ascii_uppercase();
    let value = match type_name.as_str() {
        "INTEGER" => SqlValue::Int(row.try_get(idx)?),
        "REAL" => SqlValue::Float(row.try_get(idx)?),
        "BLOB" => SqlValue::Bytes(row.try_get(idx)?),
        _ => SqlValue::Text(row.try_get(idx)?),
    };
    Ok(value)
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Null(_) => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Decimal { value, scale } => query.bind(format_decimal(*value, *scale)),
        SqlValue::Text(v) => query.bind(v.clone()),
        SqlValue::Bytes(v) => query.bind(v.clone()),
        SqlValue::Uuid(v) => query.bind(v.to_string()),
        SqlValue::Date(v) => query.bind(v.to_string()),
        SqlValue::Time(v) => query.bind(v.to_string()),
        SqlValue::DateTime(v) => query.bind(v.to_string()),
        SqlValue::DateTimeOffset(v) => query.bind(v.to_rfc3339()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded(dir: &tempfile::TempDir) -> SqliteSession {
        let path = dir.path().join("hr.db");
        let options = SqliteConnectOptions::new().filename(&path).create_if_missing(true);
        let mut conn = SqliteConnection::connect_with(&options).await.unwrap();
        sqlx::query("CREATE TABLE Employees (Id INTEGER PRIMARY KEY, Name TEXT, Dept TEXT, Salary REAL, Photo BLOB)")
            .execute(&mut conn)
            .await
            .unwrap();
        sqlx::query("INSERT INTO Employees VALUES (1, 'Ada', 'R&D', 10.5, x'CAFE'), (2, 'Linus', NULL, NULL, NULL)")
            .execute(&mut conn)
            .await
            .unwrap();
        conn.close().await.unwrap();
        SqliteSession::connect(path.to_str().unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn test_catalog_queries() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = seeded(&dir).await;
        assert_eq!(session.list_databases().await.unwrap(), ["main"]);
        let tables = session.list_tables().await.unwrap();
        assert_eq!(tables, [TableName::parse("Employees").unwrap()]);
        let columns = session.list_columns(&tables[0]).await.unwrap();
        assert_eq!(columns, ["Id", "Name", "Dept", "Salary", "Photo"]);
        let qualified = TableName::parse("main.Employees").unwrap();
        assert_eq!(session.list_columns(&qualified).await.unwrap().len(), 5);
        Box::new(session).close().await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_decodes_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = seeded(&dir).await;
        let rows = session
            .fetch_rows("SELECT [Id], [Name], [Dept], [Salary], [Photo] FROM [Employees] ORDER BY [Id]")
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            vec![
                SqlValue::Int(1),
                SqlValue::Text("Ada".into()),
                SqlValue::Text("R&D".into()),
                SqlValue::Float(10.5),
                SqlValue::Bytes(vec![0xCA, 0xFE]),
            ]
        );
        assert!(matches!(rows[1][2], SqlValue::Null(_)));
    }

    #[tokio::test]
    async fn test_insert_rows_commits() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = seeded(&dir).await;
        sqlx::query("CREATE TABLE Staff (FullName TEXT, Dept TEXT)")
            .execute(&mut session.conn)
            .await
            .unwrap();
        let rows = vec![
            vec![SqlValue::Text("Ada".into()), SqlValue::Text("R&D".into())],
            vec![SqlValue::Text("Linus".into()), SqlValue::Null(ValueKind::Text)],
        ];
        let inserted = session
            .insert_rows("INSERT INTO [Staff] ([FullName], [Dept]) VALUES (?, ?)", &rows)
            .await
            .unwrap();
        assert_eq!(inserted, 2);
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM Staff")
            .fetch_one(&mut session.conn)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_failed_insert_leaves_nothing_committed() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = seeded(&dir).await;
        sqlx::query("CREATE TABLE Uniq (Name TEXT PRIMARY KEY)")
            .execute(&mut session.conn)
            .await
            .unwrap();
        let rows = vec![
            vec![SqlValue::Text("dup".into())],
            vec![SqlValue::Text("dup".into())],
        ];
        let result = session
            .insert_rows("INSERT INTO [Uniq] ([Name]) VALUES (?)", &rows)
            .await;
        assert!(matches!(result, Err(AppError::DatabaseQuery(_))));
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM Uniq")
            .fetch_one(&mut session.conn)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_missing_file_is_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        let result = SqliteSession::connect(path.to_str().unwrap()).await;
        assert!(matches!(result, Err(AppError::DatabaseConnection(_))));
    }
}
