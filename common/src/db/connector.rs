//! Connection factory.
//!
//! Opens a fresh session for every request. Nothing is pooled or cached; the
//! caller closes the session when the operation ends.

use validator::Validate;

use super::mssql::MssqlSession;
use super::sqlite::SqliteSession;
use super::DbSession;
use crate::config::{AppConfig, DEFAULT_ODBC_DRIVER};
use crate::errors::AppResult;
use crate::models::connection::{ConnectionTarget, Engine};

/// Builds database sessions from connection targets.
#[derive(Debug, Clone)]
pub struct Connector {
    odbc_driver: String,
}

impl Default for Connector {
    fn default() -> Self {
        Self::new(DEFAULT_ODBC_DRIVER)
    }
}

impl Connector {
    pub fn new(odbc_driver: impl Into<String>) -> Self {
        Self {
            odbc_driver: odbc_driver.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.odbc_driver.clone())
    }

    /// Validates `target` and opens a session to it.
    pub async fn open(&self, target: &ConnectionTarget) -> AppResult<Box<dyn DbSession>> {
        target.validate()?;
        tracing::info!(
            engine = %target.engine,
            connection = %target.redacted_connection_string(&self.odbc_driver),
            "Opening database connection"
        );

        let session: Box<dyn DbSession> = match target.engine {
            Engine::SqlServer => Box::new(MssqlSession::connect(target).await?),
            Engine::Sqlite => {
                let path = target.require_database()?;
                Box::new(SqliteSession::connect(path).await?)
            }
        };
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;

    #[tokio::test]
    async fn test_open_rejects_invalid_target() {
        let connector = Connector::default();
        let target = ConnectionTarget::sql_server("", None);
        let result = connector.open(&target).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_open_sqlite_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.db");
        std::fs::File::create(&path).unwrap();
        let connector = Connector::default();
        let mut session = connector
            .open(&ConnectionTarget::sqlite(path.to_str().unwrap()))
            .await
            .unwrap();
        session.ping().await.unwrap();
        assert!(session.list_tables().await.unwrap().is_empty());
        session.close().await.unwrap();
    }
}
