//! 目录浏览服务模块

use std::time::Instant;

use async_trait::async_trait;

use common::db::{release, Connector};
use common::errors::AppResult;
use common::models::catalog::{ColumnsRequest, TableColumns};
use common::models::connection::{ConnectionTarget, Engine};
use common::utils::TableName;
use validator::Validate;

/// 数据库名称列表在 SQL Server 上从该库读取
const SERVER_CATALOG_DATABASE: &str = "master";

/// 目录服务 Trait
#[async_trait]
pub trait CatalogServiceTrait: Send + Sync {
    /// 列出服务器上的数据库
    async fn list_databases(&self, target: ConnectionTarget) -> AppResult<Vec<String>>;

    /// 列出所选数据库中的基础表（`schema.table`）
    async fn list_tables(&self, target: ConnectionTarget) -> AppResult<Vec<String>>;

    /// 按序号顺序列出表的列
    async fn list_columns(&self, req: ColumnsRequest) -> AppResult<TableColumns>;

    /// 测试连接，返回延迟（毫秒）
    async fn test(&self, target: ConnectionTarget) -> AppResult<u64>;
}

/// 每次调用都新建连接，用完即关闭
pub struct CatalogService {
    connector: Connector,
}

impl CatalogService {
    pub fn new(connector: Connector) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl CatalogServiceTrait for CatalogService {
    async fn list_databases(&self, target: ConnectionTarget) -> AppResult<Vec<String>> {
        let target = match target.engine {
            Engine::SqlServer => target.with_database(SERVER_CATALOG_DATABASE),
            Engine::Sqlite => target,
        };
        let mut session = self.connector.open(&target).await?;
        let result = session.list_databases().await;
        release(session).await;

        let databases = result?;
        tracing::info!(server = %target.label(), count = databases.len(), "已列出数据库");
        Ok(databases)
    }

    async fn list_tables(&self, target: ConnectionTarget) -> AppResult<Vec<String>> {
        target.require_database()?;
        let mut session = self.connector.open(&target).await?;
        let result = session.list_tables().await;
        release(session).await;

        let tables: Vec<String> = result?.iter().map(TableName::to_string).collect();
        tracing::info!(database = %target.label(), count = tables.len(), "已列出数据表");
        Ok(tables)
    }

    async fn list_columns(&self, req: ColumnsRequest) -> AppResult<TableColumns> {
        req.validate()?;
        req.connection.require_database()?;
        let table = TableName::parse(&req.table)?;

        let mut session = self.connector.open(&req.connection).await?;
        let result = session.list_columns(&table).await;
        release(session).await;

        Ok(TableColumns {
            table: table.to_string(),
            columns: result?,
        })
    }

    async fn test(&self, target: ConnectionTarget) -> AppResult<u64> {
        let start = Instant::now();
        let mut session = self.connector.open(&target).await?;
        let result = session.ping().await;
        release(session).await;
        result?;
        Ok(start.elapsed().as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::errors::AppError;
    use sqlx::{Connection, SqliteConnection};

    async fn seeded_db(dir: &tempfile::TempDir) -> String {
        let path = dir.path().join("hr.db");
        let url = format!("sqlite://{}?mode=rwc", path.display());
        let mut conn = SqliteConnection::connect(&url).await.unwrap();
        sqlx::query("CREATE TABLE Employees (Id INTEGER, Name TEXT, Dept TEXT)")
            .execute(&mut conn)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE Staff (EmpId INTEGER, FullName TEXT, Dept TEXT)")
            .execute(&mut conn)
            .await
            .unwrap();
        conn.close().await.unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_lists_tables_and_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_db(&dir).await;
        let service = CatalogService::new(Connector::default());

        let tables = service.list_tables(ConnectionTarget::sqlite(&path)).await.unwrap();
        assert_eq!(tables, ["Employees", "Staff"]);

        let columns = service
            .list_columns(ColumnsRequest {
                connection: ConnectionTarget::sqlite(&path),
                table: "Staff".into(),
            })
            .await
            .unwrap();
        assert_eq!(columns.columns, ["EmpId", "FullName", "Dept"]);
    }

    #[tokio::test]
    async fn test_listed_tables_resolve_to_their_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_db(&dir).await;
        let url = format!("sqlite://{}", path);
        let mut conn = SqliteConnection::connect(&url).await.unwrap();
        sqlx::query("CREATE TABLE [sales.2024] (Region TEXT, Total REAL)")
            .execute(&mut conn)
            .await
            .unwrap();
        sqlx::query(r#"CREATE TABLE "[legacy]" (Code TEXT)"#)
            .execute(&mut conn)
            .await
            .unwrap();
        conn.close().await.unwrap();
        let service = CatalogService::new(Connector::default());

        let tables = service.list_tables(ConnectionTarget::sqlite(&path)).await.unwrap();
        assert!(tables.contains(&"[sales.2024]".to_string()), "{tables:?}");

        for table in tables {
            let columns = service
                .list_columns(ColumnsRequest {
                    connection: ConnectionTarget::sqlite(&path),
                    table: table.clone(),
                })
                .await
                .unwrap();
            assert_eq!(columns.table, table);
            assert!(!columns.columns.is_empty(), "no columns for {table}");
        }
    }

    #[tokio::test]
    async fn test_tables_require_database() {
        let service = CatalogService::new(Connector::default());
        let err = service
            .list_tables(ConnectionTarget::sql_server("SQL01", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_columns_reject_bad_table_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_db(&dir).await;
        let service = CatalogService::new(Connector::default());
        let err = service
            .list_columns(ColumnsRequest {
                connection: ConnectionTarget::sqlite(&path),
                table: "[Staff".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidIdentifier(_)));
    }

    #[tokio::test]
    async fn test_ping_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_db(&dir).await;
        let service = CatalogService::new(Connector::default());
        assert!(service.test(ConnectionTarget::sqlite(&path)).await.is_ok());
    }
}
