//! Connection target models.
//!
//! A connection target carries everything needed to reach one database:
//! engine, server, database, and authentication.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::errors::{AppError, AppResult};

/// Database engine behind a connection target.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Microsoft SQL Server.
    #[default]
    #[serde(alias = "mssql")]
    SqlServer,
    /// SQLite database file.
    Sqlite,
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Engine::SqlServer => write!(f, "sqlserver"),
            Engine::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// How the connection authenticates.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Trusted (Windows) authentication.
    #[default]
    #[serde(alias = "windows")]
    Integrated,
    /// Username and password.
    #[serde(alias = "sql")]
    Credentialed,
}

/// A server/database pair plus credentials.
#[derive(Clone, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_target"))]
pub struct ConnectionTarget {
    /// Database engine (default: sqlserver).
    #[serde(default)]
    pub engine: Engine,
    /// SQL Server name: `host`, `host,port` or `host\instance`.
    #[serde(default)]
    #[validate(length(max = 256, message = "Server name is too long"))]
    pub server: String,
    /// Database name (for SQLite, the database file path).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Database must not be empty"))]
    pub database: Option<String>,
    /// Authentication mode (default: integrated).
    #[serde(default)]
    pub auth_mode: AuthMode,
    /// Login name for credentialed auth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password (never serialized in responses).
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
    /// Accept the server certificate without validation.
    #[serde(default)]
    pub trust_server_certificate: bool,
}

fn validate_target(target: &ConnectionTarget) -> Result<(), ValidationError> {
    if target.engine == Engine::SqlServer && target.server.trim().is_empty() {
        return Err(ValidationError::new("server_required")
            .with_message("Server name is required".into()));
    }
    if target.auth_mode == AuthMode::Credentialed
        && target.username.as_deref().map_or(true, |u| u.trim().is_empty())
    {
        return Err(ValidationError::new("username_required")
            .with_message("Username is required for credentialed authentication".into()));
    }
    Ok(())
}

impl std::fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionTarget")
            .field("engine", &self.engine)
            .field("server", &self.server)
            .field("database", &self.database)
            .field("auth_mode", &self.auth_mode)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("trust_server_certificate", &self.trust_server_certificate)
            .finish()
    }
}

impl ConnectionTarget {
    /// Integrated-auth SQL Server target.
    pub fn sql_server(server: impl Into<String>, database: Option<&str>) -> Self {
        Self {
            engine: Engine::SqlServer,
            server: server.into(),
            database: database.map(String::from),
            auth_mode: AuthMode::Integrated,
            username: None,
            password: None,
            trust_server_certificate: false,
        }
    }

    /// SQLite target for the given database file.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            engine: Engine::Sqlite,
            server: String::new(),
            database: Some(path.into()),
            auth_mode: AuthMode::Integrated,
            username: None,
            password: None,
            trust_server_certificate: false,
        }
    }

    /// Switches to credentialed auth.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth_mode = AuthMode::Credentialed;
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Same target pointed at another database.
    pub fn with_database(&self, database: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
            ..self.clone()
        }
    }

    /// Returns the database name, failing if none was selected.
    pub fn require_database(&self) -> AppResult<&str> {
        self.database
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| AppError::Validation("Select a database first".into()))
    }

    /// Short label for logs and messages.
    pub fn label(&self) -> String {
        match (self.engine, self.database.as_deref()) {
            (Engine::Sqlite, Some(path)) => format!("sqlite:{}", path),
            (_, Some(db)) => format!("{}/{}", self.server, db),
            (_, None) => self.server.clone(),
        }
    }

    /// ODBC-style connection string for this target with the password masked,
    /// safe to log.
    pub fn redacted_connection_string(&self, driver: &str) -> String {
        let mut s = format!("DRIVER={{{}}};SERVER={};", driver, self.server);
        if let Some(db) = self.database.as_deref().filter(|d| !d.is_empty()) {
            s.push_str(&format!("DATABASE={};", db));
        }
        match self.auth_mode {
            AuthMode::Integrated => s.push_str("Trusted_Connection=yes;"),
            AuthMode::Credentialed => s.push_str(&format!(
                "UID={};PWD=***;",
                self.username.as_deref().unwrap_or("")
            )),
        }
        if self.trust_server_certificate {
            s.push_str("TrustServerCertificate=yes;");
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRIVER: &str = "ODBC Driver 17 for SQL Server";

    #[test]
    fn test_integrated_connection_string() {
        let target = ConnectionTarget::sql_server("SQL01", Some("Sales"));
        assert_eq!(
            target.redacted_connection_string(DRIVER),
            "DRIVER={ODBC Driver 17 for SQL Server};SERVER=SQL01;DATABASE=Sales;Trusted_Connection=yes;"
        );
    }

    #[test]
    fn test_credentialed_connection_string() {
        let target = ConnectionTarget::sql_server("SQL01", None).with_credentials("etl", "pw");
        assert_eq!(
            target.redacted_connection_string(DRIVER),
            "DRIVER={ODBC Driver 17 for SQL Server};SERVER=SQL01;UID=etl;PWD=***;"
        );
    }

    #[test]
    fn test_auth_mode_aliases() {
        let target: ConnectionTarget =
            serde_json::from_str(r#"{"server": "SQL01", "auth_mode": "sql", "username": "sa"}"#)
                .unwrap();
        assert_eq!(target.auth_mode, AuthMode::Credentialed);
        let target: ConnectionTarget =
            serde_json::from_str(r#"{"server": "SQL01", "auth_mode": "windows"}"#).unwrap();
        assert_eq!(target.auth_mode, AuthMode::Integrated);
        assert_eq!(target.engine, Engine::SqlServer);
    }

    #[test]
    fn test_password_not_serialized() {
        let target = ConnectionTarget::sql_server("SQL01", None).with_credentials("etl", "pw");
        let json = serde_json::to_string(&target).unwrap();
        assert!(!json.contains("pw\""));
        assert!(!format!("{:?}", target).contains("\"pw\""));
    }

    #[test]
    fn test_credentialed_requires_username() {
        let mut target = ConnectionTarget::sql_server("SQL01", None);
        target.auth_mode = AuthMode::Credentialed;
        assert!(target.validate().is_err());
        target.username = Some("etl".into());
        assert!(target.validate().is_ok());
    }

    #[test]
    fn test_sql_server_requires_server() {
        assert!(ConnectionTarget::sql_server(" ", None).validate().is_err());
        assert!(ConnectionTarget::sqlite("/tmp/a.db").validate().is_ok());
    }

    #[test]
    fn test_require_database() {
        assert!(ConnectionTarget::sql_server("SQL01", None).require_database().is_err());
        let target = ConnectionTarget::sql_server("SQL01", None).with_database("master");
        assert_eq!(target.require_database().unwrap(), "master");
    }
}
