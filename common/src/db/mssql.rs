//! SQL Server sessions using tiberius.

use std::borrow::Cow;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use tiberius::numeric::Numeric;
use tiberius::{AuthMethod, Client, ColumnData, Config, FromSql, ToSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use super::value::{Row, SqlValue, ValueKind};
use super::{DbSession, Dialect};
use crate::errors::{AppError, AppResult};
use crate::models::connection::{AuthMode, ConnectionTarget};
use crate::utils::TableName;

const DEFAULT_PORT: u16 = 1433;

/// Parsed form of a SQL Server `SERVER=` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: Option<u16>,
    pub instance: Option<String>,
}

impl ServerAddress {
    /// Accepts `host`, `host,port`, `host\instance`, an optional `tcp:` prefix,
    /// and `.` / `(local)` for the local machine. `(localdb)` is rejected.
    pub fn parse(server: &str) -> AppResult<Self> {
        let server = server.trim();
        let server = server
            .strip_prefix("tcp:")
            .or_else(|| server.strip_prefix("TCP:"))
            .unwrap_or(server);
        if server.is_empty() {
            return Err(AppError::Validation("Server name is required".into()));
        }

        let (rest, port) = match server.rsplit_once(',') {
            Some((rest, port)) => {
                let port = port.trim().parse::<u16>().map_err(|_| {
                    AppError::Validation(format!("invalid port in server name {:?}", server))
                })?;
                (rest.trim(), Some(port))
            }
            None => (server, None),
        };

        let (host, instance) = match rest.split_once('\\') {
            Some((host, instance)) if !instance.is_empty() => (host, Some(instance.to_string())),
            Some((host, _)) => (host, None),
            None => (rest, None),
        };

        if host.eq_ignore_ascii_case("(localdb)") {
            return Err(AppError::Validation(format!(
                "LocalDB server {:?} is not reachable over TCP; use the instance's host,port",
                server
            )));
        }
        let host = match host {
            "." | "(local)" => "localhost",
            other => other,
        };
        if host.is_empty() {
            return Err(AppError::Validation(format!(
                "missing host in server name {:?}",
                server
            )));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            instance,
        })
    }
}

/// One tiberius client connection.
pub struct MssqlSession {
    client: Client<Compat<TcpStream>>,
    label: String,
}

/// Builds the tiberius login configuration for `target`.
///
/// Host and port are not set here; they depend on how the address resolves.
pub fn login_config(target: &ConnectionTarget) -> AppResult<Config> {
    let mut config = Config::new();
    if let Some(db) = target.database.as_deref().filter(|d| !d.is_empty()) {
        config.database(db);
    }
    if target.trust_server_certificate {
        config.trust_cert();
    }
    config.application_name("datacopy");

    match target.auth_mode {
        AuthMode::Credentialed => {
            let user = target.username.as_deref().unwrap_or_default();
            let pass = target.password.as_deref().unwrap_or_default();
            config.authentication(AuthMethod::sql_server(user, pass));
        }
        AuthMode::Integrated => {
            #[cfg(any(windows, all(unix, feature = "integrated-auth-gssapi")))]
            {
                config.authentication(AuthMethod::Integrated);
            }
            #[cfg(not(any(windows, all(unix, feature = "integrated-auth-gssapi"))))]
            {
                return Err(AppError::DatabaseConnection(
                    "integrated authentication needs Windows or a build with the `integrated-auth-gssapi` feature"
                        .to_string(),
                ));
            }
        }
    }
    Ok(config)
}

impl MssqlSession {
    /// Connects and logs in according to `target`.
    #[tracing::instrument(skip(target), fields(server = %target.server, database = ?target.database))]
    pub async fn connect(target: &ConnectionTarget) -> AppResult<Self> {
        let address = ServerAddress::parse(&target.server)?;
        let mut config = login_config(target)?;
        config.host(&address.host);

        let tcp = match (&address.instance, address.port) {
            (Some(instance), None) => {
                use tiberius::SqlBrowser;
                config.instance_name(instance);
                TcpStream::connect_named(&config).await?
            }
            (_, port) => {
                config.port(port.unwrap_or(DEFAULT_PORT));
                TcpStream::connect(config.get_addr()).await?
            }
        };
        tcp.set_nodelay(true)?;

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
        tracing::debug!("sql server connection opened");

        Ok(Self {
            client,
            label: target.label(),
        })
    }

    async fn query_strings(&mut self, sql: &str, params: &[&dyn ToSql]) -> AppResult<Vec<Vec<String>>> {
        let rows = self.client.query(sql, params).await?.into_first_result().await?;
        rows.into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|data| match data {
                        ColumnData::String(Some(s)) => Ok(s.into_owned()),
                        other => Err(AppError::DatabaseQuery(format!(
                            "expected a string column, got {:?}",
                            other
                        ))),
                    })
                    .collect()
            })
            .collect()
    }

    async fn batch(&mut self, sql: &str) -> AppResult<()> {
        self.client.simple_query(sql).await?.into_results().await?;
        Ok(())
    }
}

#[async_trait]
impl DbSession for MssqlSession {
    fn dialect(&self) -> Dialect {
        Dialect::SqlServer
    }

    async fn ping(&mut self) -> AppResult<()> {
        self.batch("SELECT 1").await
    }

    async fn list_databases(&mut self) -> AppResult<Vec<String>> {
        let rows = self
            .query_strings("SELECT name FROM sys.databases ORDER BY name", &[])
            .await?;
        Ok(rows.into_iter().filter_map(|r| r.into_iter().next()).collect())
    }

    async fn list_tables(&mut self) -> AppResult<Vec<TableName>> {
        let rows = self
            .query_strings(
                "SELECT TABLE_SCHEMA, TABLE_NAME
                 FROM INFORMATION_SCHEMA.TABLES
                 WHERE TABLE_TYPE = 'BASE TABLE'
                 ORDER BY TABLE_SCHEMA, TABLE_NAME",
                &[],
            )
            .await?;
        rows.iter()
            .map(|r| match r.as_slice() {
                [schema, name] => TableName::new(Some(schema), name),
                _ => Err(AppError::DatabaseQuery("unexpected INFORMATION_SCHEMA.TABLES shape".into())),
            })
            .collect()
    }

    async fn list_columns(&mut self, table: &TableName) -> AppResult<Vec<String>> {
        let name = table.name();
        let rows = match table.schema() {
            Some(schema) => {
                self.query_strings(
                    "SELECT COLUMN_NAME
                     FROM INFORMATION_SCHEMA.COLUMNS
                     WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2
                     ORDER BY ORDINAL_POSITION",
                    &[&schema, &name],
                )
                .await?
            }
            None => {
                self.query_strings(
                    "SELECT COLUMN_NAME
                     FROM INFORMATION_SCHEMA.COLUMNS
                     WHERE TABLE_NAME = @P1
                     ORDER BY ORDINAL_POSITION",
                    &[&name],
                )
                .await?
            }
        };
        Ok(rows.into_iter().filter_map(|r| r.into_iter().next()).collect())
    }

    async fn fetch_rows(&mut self, sql: &str) -> AppResult<Vec<Row>> {
        let rows = self.client.query(sql, &[]).await?.into_first_result().await?;
        rows.into_iter()
            .map(|row| row.into_iter().map(column_data_to_value).collect())
            .collect()
    }

    async fn insert_rows(&mut self, sql: &str, rows: &[Row]) -> AppResult<u64> {
        self.batch("BEGIN TRANSACTION").await?;
        let mut inserted = 0u64;
        for row in rows {
            let params: Vec<&dyn ToSql> = row.iter().map(|v| v as &dyn ToSql).collect();
            self.client.execute(sql, &params).await?;
            inserted += 1;
        }
        self.batch("COMMIT TRANSACTION").await?;
        tracing::debug!(target_db = %self.label, rows = inserted, "sql server insert committed");
        Ok(inserted)
    }

    async fn close(self: Box<Self>) -> AppResult<()> {
        self.client.close().await?;
        Ok(())
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            SqlValue::Null(kind) => typed_null(*kind),
            SqlValue::Bool(v) => ColumnData::Bit(Some(*v)),
            SqlValue::Int(v) => ColumnData::I64(Some(*v)),
            SqlValue::Float(v) => ColumnData::F64(Some(*v)),
            SqlValue::Decimal { value, scale } => {
                ColumnData::Numeric(Some(Numeric::new_with_scale(*value, *scale)))
            }
            SqlValue::Text(v) => ColumnData::String(Some(Cow::Borrowed(v.as_str()))),
            SqlValue::Bytes(v) => ColumnData::Binary(Some(Cow::Borrowed(v.as_slice()))),
            SqlValue::Uuid(v) => ColumnData::Guid(Some(*v)),
            SqlValue::Date(v) => v.to_sql(),
            SqlValue::Time(v) => v.to_sql(),
            SqlValue::DateTime(v) => v.to_sql(),
            SqlValue::DateTimeOffset(v) => v.to_sql(),
        }
    }
}

fn typed_null(kind: ValueKind) -> ColumnData<'static> {
    match kind {
        ValueKind::Bool => ColumnData::Bit(None),
        ValueKind::Int => ColumnData::I64(None),
        ValueKind::Float => ColumnData::F64(None),
        ValueKind::Decimal => ColumnData::Numeric(None),
        ValueKind::Bytes => ColumnData::Binary(None),
        ValueKind::Uuid => ColumnData::Guid(None),
        ValueKind::Date => ColumnData::Date(None),
        ValueKind::Time => ColumnData::Time(None),
        ValueKind::DateTime => ColumnData::DateTime2(None),
        ValueKind::DateTimeOffset => ColumnData::DateTimeOffset(None),
        ValueKind::Text | ValueKind::Unknown => ColumnData::String(None),
    }
}

/// Converts one tiberius cell into a `SqlValue`.
pub(crate) fn column_data_to_value(data: ColumnData<'static>) -> AppResult<SqlValue> {
    let value = match data {
        ColumnData::Bit(v) => v.map_or(SqlValue::Null(ValueKind::Bool), SqlValue::Bool),
        ColumnData::U8(v) => v.map_or(SqlValue::Null(ValueKind::Int), |v| SqlValue::Int(v.into())),
        ColumnData::I16(v) => v.map_or(SqlValue::Null(ValueKind::Int), |v| SqlValue::Int(v.into())),
        ColumnData::I32(v) => v.map_or(SqlValue::Null(ValueKind::Int), |v| SqlValue::Int(v.into())),
        ColumnData::I64(v) => v.map_or(SqlValue::Null(ValueKind::Int), SqlValue::Int),
        ColumnData::F32(v) => v.map_or(SqlValue::Null(ValueKind::Float), |v| SqlValue::Float(v.into())),
        ColumnData::F64(v) => v.map_or(SqlValue::Null(ValueKind::Float), SqlValue::Float),
        ColumnData::Numeric(v) => v.map_or(SqlValue::Null(ValueKind::Decimal), |n| {
            SqlValue::Decimal {
                value: n.value(),
                scale: n.scale(),
            }
        }),
        ColumnData::String(v) => v.map_or(SqlValue::Null(ValueKind::Text), |s| {
            SqlValue::Text(s.into_owned())
        }),
        ColumnData::Guid(v) => v.map_or(SqlValue::Null(ValueKind::Uuid), SqlValue::Uuid),
        ColumnData::Binary(v) => v.map_or(SqlValue::Null(ValueKind::Bytes), |b| {
            SqlValue::Bytes(b.into_owned())
        }),
        ColumnData::Xml(v) => v.map_or(SqlValue::Null(ValueKind::Text), |x| {
            SqlValue::Text(x.into_owned().into_string())
        }),
        ref data @ (ColumnData::DateTime(_)
        | ColumnData::SmallDateTime(_)
        | ColumnData::DateTime2(_)) => NaiveDateTime::from_sql(data)?
            .map_or(SqlValue::Null(ValueKind::DateTime), SqlValue::DateTime),
        ref data @ ColumnData::Date(_) => {
            NaiveDate::from_sql(data)?.map_or(SqlValue::Null(ValueKind::Date), SqlValue::Date)
        }
        ref data @ ColumnData::Time(_) => {
            NaiveTime::from_sql(data)?.map_or(SqlValue::Null(ValueKind::Time), SqlValue::Time)
        }
        ref data @ ColumnData::DateTimeOffset(_) => DateTime::<FixedOffset>::from_sql(data)?
            .map_or(SqlValue::Null(ValueKind::DateTimeOffset), SqlValue::DateTimeOffset),
    };
    Ok(value)
}
