//! Service configuration.
//!
//! Server settings come from environment variables. The non-interactive CLI
//! additionally reads a fixed-credential connection profile from a JSON file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{AppError, AppResult};
use crate::models::connection::{AuthMode, ConnectionTarget, Engine};

/// ODBC driver named in generated connection strings unless `ODBC_DRIVER` is set.
pub const DEFAULT_ODBC_DRIVER: &str = "ODBC Driver 17 for SQL Server";

/// Profile file looked up when neither `--config` nor `DATACOPY_PROFILE` is given.
pub const DEFAULT_PROFILE_PATH: &str = "config.json";

/// Settings shared by every binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub service_name: String,
    pub host: String,
    pub port: u16,
    pub odbc_driver: String,
    pub profile_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "datacopy".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            odbc_driver: DEFAULT_ODBC_DRIVER.to_string(),
            profile_path: PathBuf::from(DEFAULT_PROFILE_PATH),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the environment for the named service.
    ///
    /// `SERVER_PORT` is left to the caller since each binary has its own default.
    pub fn load_with_service(service_name: &str) -> Self {
        let defaults = Self::default();
        Self {
            service_name: service_name.to_string(),
            host: env_or("APP_HOST", defaults.host),
            port: defaults.port,
            odbc_driver: env_or("ODBC_DRIVER", defaults.odbc_driver),
            profile_path: std::env::var("DATACOPY_PROFILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.profile_path),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

/// Load `.env` from the working directory (best-effort, no error if missing).
///
/// Variables already present in the environment win.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    let Ok(content) = std::fs::read_to_string(env_path) else {
        return;
    };
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            if std::env::var(key).is_err() {
                std::env::set_var(key, value.trim());
            }
        }
    }
}

/// On-disk profile file: `{"db": {...}}`.
#[derive(Debug, Deserialize)]
pub struct ProfileFile {
    pub db: ConnectionProfile,
}

/// Fixed-credential connection profile.
#[derive(Deserialize)]
pub struct ConnectionProfile {
    #[serde(default)]
    pub engine: Engine,
    pub server: String,
    pub database: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub trust_server_certificate: bool,
}

impl std::fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("engine", &self.engine)
            .field("server", &self.server)
            .field("database", &self.database)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl ProfileFile {
    /// Reads and parses the profile at `path`.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read profile {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> AppResult<Self> {
        let profile: ProfileFile = serde_json::from_str(content)?;
        if profile.db.server.trim().is_empty() && profile.db.engine == Engine::SqlServer {
            return Err(AppError::Config("profile `db.server` is empty".into()));
        }
        if profile.db.database.trim().is_empty() {
            return Err(AppError::Config("profile `db.database` is empty".into()));
        }
        Ok(profile)
    }

    /// Converts the profile into a connection target.
    ///
    /// A profile with a username uses credentialed auth, otherwise integrated.
    pub fn target(&self) -> ConnectionTarget {
        let db = &self.db;
        let target = ConnectionTarget {
            engine: db.engine,
            server: db.server.clone(),
            database: Some(db.database.clone()),
            auth_mode: AuthMode::Integrated,
            username: None,
            password: None,
            trust_server_certificate: db.trust_server_certificate,
        };
        match db.username.as_deref().filter(|u| !u.is_empty()) {
            Some(username) => {
                target.with_credentials(username, db.password.clone().unwrap_or_default())
            }
            None => target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_profile_with_credentials() {
        let profile = ProfileFile::parse(
            r#"{"db": {"server": "SQL01", "database": "Sales", "username": "etl", "password": "s3cret"}}"#,
        )
        .unwrap();
        let target = profile.target();
        assert_eq!(target.engine, Engine::SqlServer);
        assert_eq!(target.auth_mode, AuthMode::Credentialed);
        assert_eq!(target.database.as_deref(), Some("Sales"));
        assert_eq!(target.password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_profile_without_username_is_integrated() {
        let profile =
            ProfileFile::parse(r#"{"db": {"server": "SQL01", "database": "Sales"}}"#).unwrap();
        assert_eq!(profile.target().auth_mode, AuthMode::Integrated);
    }

    #[test]
    fn test_profile_requires_database() {
        let err = ProfileFile::parse(r#"{"db": {"server": "SQL01", "database": " "}}"#).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_profile_debug_hides_password() {
        let profile = ProfileFile::parse(
            r#"{"db": {"server": "SQL01", "database": "Sales", "username": "etl", "password": "s3cret"}}"#,
        )
        .unwrap();
        assert!(!format!("{:?}", profile).contains("s3cret"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"db": {{"engine": "sqlite", "server": "", "database": "/tmp/x.db"}}}}"#
        )
        .unwrap();
        let profile = ProfileFile::load(file.path()).unwrap();
        assert_eq!(profile.db.engine, Engine::Sqlite);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = ProfileFile::load("/nonexistent/config.json").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
