//! Non-interactive table copy using a fixed connection profile.
//!
//! The profile (`config.json` by default) supplies one connection that serves as
//! both source and destination:
//!
//! ```json
//! {"db": {"server": "SQL01", "database": "HR", "username": "etl", "password": "..."}}
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use common::config::{AppConfig, ProfileFile};
use common::db::{release, Connector};
use common::models::connection::ConnectionTarget;
use common::models::mapping::ColumnMapping;
use common::models::transfer::{CopyRequest, MappingRequest, TableSelection};
use common::utils::TableName;
use copy_service::service::{CopyService, CopyServiceTrait};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Copy rows between tables of the profile database.
#[derive(Debug, Parser)]
#[command(name = "datacopy", version)]
struct Args {
    /// Connection profile file. Defaults to `DATACOPY_PROFILE`, then `config.json`.
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List base tables.
    Tables,
    /// List the columns of a table.
    Columns {
        /// `schema.table` or `table`.
        table: String,
    },
    /// Copy rows from one table to another.
    ///
    /// Without `--map`, columns with identical names are copied.
    Copy {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// `SOURCE=DESTINATION`, repeatable. Order sets the column order.
        #[arg(long = "map", value_parser = parse_pair)]
        map: Vec<(String, String)>,
    },
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((src, dst)) if !src.trim().is_empty() && !dst.trim().is_empty() => {
            Ok((src.trim().to_string(), dst.trim().to_string()))
        }
        _ => Err(format!("expected SOURCE=DESTINATION, got {:?}", s)),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let args = Args::parse();
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    match runtime.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = AppConfig::load_with_service("datacopy");
    let profile_path = args.config.unwrap_or_else(|| config.profile_path.clone());
    let profile = ProfileFile::load(&profile_path)
        .with_context(|| format!("loading profile {}", profile_path.display()))?;
    let target = profile.target();
    let connector = Connector::from_config(&config);

    match args.command {
        Command::Tables => {
            let mut session = connector.open(&target).await?;
            let tables = session.list_tables().await;
            release(session).await;
            for table in tables? {
                println!("{table}");
            }
        }
        Command::Columns { table } => {
            let table = TableName::parse(&table)?;
            let mut session = connector.open(&target).await?;
            let columns = session.list_columns(&table).await;
            release(session).await;
            let columns = columns?;
            if columns.is_empty() {
                bail!("table {table} has no columns or does not exist");
            }
            for column in columns {
                println!("{column}");
            }
        }
        Command::Copy { from, to, map } => {
            let service = CopyService::new(connector);
            let mapping = if map.is_empty() {
                service
                    .propose(MappingRequest {
                        source: selection(&target, &from),
                        destination: selection(&target, &to),
                        overrides: Vec::new(),
                    })
                    .await?
                    .mapping
            } else {
                ColumnMapping::from_pairs(map)?
            };
            let report = service
                .copy(CopyRequest {
                    source: selection(&target, &from),
                    destination: selection(&target, &to),
                    mapping,
                })
                .await?;
            println!("{}", report.message);
        }
    }
    Ok(())
}

fn selection(target: &ConnectionTarget, table: &str) -> TableSelection {
    TableSelection {
        connection: target.clone(),
        table: table.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_copy_command() {
        let args = Args::try_parse_from([
            "datacopy", "copy", "--from", "dbo.Employees", "--to", "dbo.Staff", "--map",
            "Name=FullName", "--map", "Dept=Dept",
        ])
        .unwrap();
        match args.command {
            Command::Copy { from, to, map } => {
                assert_eq!(from, "dbo.Employees");
                assert_eq!(to, "dbo.Staff");
                assert_eq!(
                    map,
                    [("Name".to_string(), "FullName".to_string()), ("Dept".to_string(), "Dept".to_string())]
                );
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_bad_pair_rejected() {
        assert!(parse_pair("Name").is_err());
        assert!(parse_pair("=FullName").is_err());
        assert_eq!(parse_pair(" A = B ").unwrap(), ("A".into(), "B".into()));
    }
}
