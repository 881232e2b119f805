//! SQL text for provisioning and COPY.
//!
//! Every identifier goes through [`quote_ident`], so names are used exactly as
//! given (case, spaces and all).

use std::fmt;
use std::str::FromStr;

use crate::error::{ImportError, ImportResult};

/// Column type for single-column JSON imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonColumnType {
    #[default]
    Json,
    Jsonb,
}

impl JsonColumnType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JsonColumnType::Json => "JSON",
            JsonColumnType::Jsonb => "JSONB",
        }
    }
}

impl fmt::Display for JsonColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for JsonColumnType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(JsonColumnType::Json),
            "jsonb" => Ok(JsonColumnType::Jsonb),
            other => Err(format!("unsupported JSON column type '{other}'")),
        }
    }
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> ImportResult<String> {
    if name.is_empty() || name.contains('\0') {
        return Err(ImportError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

pub fn qualified_table(schema: &str, table: &str) -> ImportResult<String> {
    Ok(format!("{}.{}", quote_ident(schema)?, quote_ident(table)?))
}

fn column_list(columns: &[String]) -> ImportResult<String> {
    if columns.is_empty() {
        return Err(ImportError::InvalidIdentifier(String::new()));
    }
    let quoted = columns
        .iter()
        .map(|column| quote_ident(column))
        .collect::<ImportResult<Vec<_>>>()?;
    Ok(quoted.join(", "))
}

pub fn create_schema_sql(schema: &str) -> ImportResult<String> {
    Ok(format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(schema)?))
}

pub fn drop_table_sql(schema: &str, table: &str) -> ImportResult<String> {
    Ok(format!("DROP TABLE IF EXISTS {}", qualified_table(schema, table)?))
}

/// CSV columns are all created as TEXT.
pub fn create_table_sql(schema: &str, table: &str, columns: &[String]) -> ImportResult<String> {
    if columns.is_empty() {
        return Err(ImportError::InvalidIdentifier(String::new()));
    }
    let definitions = columns
        .iter()
        .map(|column| quote_ident(column).map(|quoted| format!("{quoted} TEXT")))
        .collect::<ImportResult<Vec<_>>>()?;

    Ok(format!(
        "CREATE TABLE {} ({})",
        qualified_table(schema, table)?,
        definitions.join(", ")
    ))
}

pub fn create_json_table_sql(
    schema: &str,
    table: &str,
    column: &str,
    data_type: JsonColumnType,
) -> ImportResult<String> {
    Ok(format!(
        "CREATE TABLE {} ({} {})",
        qualified_table(schema, table)?,
        quote_ident(column)?,
        data_type.as_sql()
    ))
}

pub fn copy_from_stdin_sql(schema: &str, table: &str, columns: &[String]) -> ImportResult<String> {
    Ok(format!(
        "COPY {} ({}) FROM STDIN",
        qualified_table(schema, table)?,
        column_list(columns)?
    ))
}
