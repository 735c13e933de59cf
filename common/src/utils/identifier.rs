//! Table and column identifier handling.
//!
//! Table names arrive as `schema.table` or `table` strings. They are validated
//! and re-emitted bracket-quoted per part, so a name can never terminate the
//! identifier it is placed in.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// Longest identifier part SQL Server accepts (`sysname`).
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Bracket-quotes an identifier, doubling any closing bracket.
///
/// ```
/// use common::utils::quote_identifier;
/// assert_eq!(quote_identifier("Full Name"), "[Full Name]");
/// assert_eq!(quote_identifier("a]b"), "[a]]b]");
/// ```
pub fn quote_identifier(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

/// Checks a single identifier part.
pub fn validate_identifier(part: &str) -> AppResult<()> {
    if part.is_empty() {
        return Err(AppError::InvalidIdentifier("identifier is empty".into()));
    }
    if part.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(AppError::InvalidIdentifier(format!(
            "identifier longer than {} characters",
            MAX_IDENTIFIER_LEN
        )));
    }
    if part.chars().any(char::is_control) {
        return Err(AppError::InvalidIdentifier(format!(
            "identifier {:?} contains control characters",
            part
        )));
    }
    Ok(())
}

/// A validated, optionally schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName {
    schema: Option<String>,
    name: String,
}

impl TableName {
    /// Builds a table name from already separated parts.
    pub fn new(schema: Option<&str>, name: &str) -> AppResult<Self> {
        if let Some(schema) = schema {
            validate_identifier(schema)?;
        }
        validate_identifier(name)?;
        Ok(Self {
            schema: schema.map(String::from),
            name: name.to_string(),
        })
    }

    /// Parses `schema.table`, `table`, or their bracketed forms.
    ///
    /// The split happens on the first dot outside brackets; everything after it
    /// belongs to the table part.
    pub fn parse(input: &str) -> AppResult<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AppError::InvalidIdentifier("table name is empty".into()));
        }
        let (first, rest) = split_first_part(input)?;
        match rest {
            Some(rest) => {
                let (table, tail) = split_first_part(rest)?;
                let table = match tail {
                    // Unbracketed remainder keeps its dots, e.g. `dbo.my.table`.
                    Some(_) if !rest.starts_with('[') => rest.to_string(),
                    Some(_) => {
                        return Err(AppError::InvalidIdentifier(format!(
                            "unexpected text after table name in {:?}",
                            input
                        )))
                    }
                    None => table,
                };
                Self::new(Some(&first), &table)
            }
            None => Self::new(None, &first),
        }
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `[schema].[table]` or `[table]`.
    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_identifier(schema), quote_identifier(&self.name)),
            None => quote_identifier(&self.name),
        }
    }
}

/// Splits off the leading identifier part, unquoting `[...]` if present.
fn split_first_part(input: &str) -> AppResult<(String, Option<&str>)> {
    if let Some(body) = input.strip_prefix('[') {
        let mut part = String::new();
        let mut chars = body.char_indices().peekable();
        while let Some((idx, ch)) = chars.next() {
            if ch == ']' {
                if matches!(chars.peek(), Some((_, ']'))) {
                    part.push(']');
                    chars.next();
                    continue;
                }
                let after = &body[idx + 1..];
                return match after.strip_prefix('.') {
                    Some(rest) => Ok((part, Some(rest))),
                    None if after.is_empty() => Ok((part, None)),
                    None => Err(AppError::InvalidIdentifier(format!(
                        "unexpected text after ] in {:?}",
                        input
                    ))),
                };
            }
            part.push(ch);
        }
        Err(AppError::InvalidIdentifier(format!(
            "unterminated [ in {:?}",
            input
        )))
    } else {
        match input.split_once('.') {
            Some((first, rest)) => Ok((first.to_string(), Some(rest))),
            None => Ok((input.to_string(), None)),
        }
    }
}

/// A part is written bare unless `parse` would read it back differently.
fn display_part(part: &str) -> Cow<'_, str> {
    let ambiguous = part.contains(['.', '[', ']'])
        || part.starts_with(char::is_whitespace)
        || part.ends_with(char::is_whitespace);
    if ambiguous {
        Cow::Owned(quote_identifier(part))
    } else {
        Cow::Borrowed(part)
    }
}

/// `schema.table` or `table`, bracketing only the parts that need it, so the
/// rendered form always parses back to the same name.
impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", display_part(schema), display_part(&self.name)),
            None => write!(f, "{}", display_part(&self.name)),
        }
    }
}

impl TryFrom<String> for TableName {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TableName> for String {
    fn from(value: TableName) -> Self {
        value.to_string()
    }
}
