//! SQL dialects.
//!
//! Both supported engines accept `[bracketed]` identifiers; they differ in
//! parameter placeholders and catalog queries.

use crate::errors::{AppError, AppResult};
use crate::utils::{quote_identifier, TableName};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    SqlServer,
    Sqlite,
}

impl Dialect {
    /// Placeholder for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::SqlServer => format!("@P{}", index),
            Dialect::Sqlite => "?".to_string(),
        }
    }

    /// `SELECT [c1], [c2] FROM [schema].[table]`
    pub fn select_columns<'a>(
        &self,
        table: &TableName,
        columns: impl IntoIterator<Item = &'a str>,
    ) -> AppResult<String> {
        let column_list = quoted_list(columns)?;
        Ok(format!("SELECT {} FROM {}", column_list, table.quoted()))
    }

    /// `INSERT INTO [schema].[table] ([d1], [d2]) VALUES (p1, p2)`
    pub fn insert_row<'a>(
        &self,
        table: &TableName,
        columns: impl IntoIterator<Item = &'a str>,
    ) -> AppResult<String> {
        let columns: Vec<&str> = columns.into_iter().collect();
        let column_list = quoted_list(columns.iter().copied())?;
        let placeholders = (1..=columns.len())
            .map(|i| self.placeholder(i))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.quoted(),
            column_list,
            placeholders
        ))
    }
}

fn quoted_list<'a>(columns: impl IntoIterator<Item = &'a str>) -> AppResult<String> {
    let quoted: Vec<String> = columns.into_iter().map(quote_identifier).collect();
    if quoted.is_empty() {
        return Err(AppError::Internal(
            "refusing to build a statement with no columns".into(),
        ));
    }
    Ok(quoted.join(", "))
}
