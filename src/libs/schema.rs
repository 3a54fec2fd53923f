use serde::Serialize;

use crate::error::{TableError, TableResult};

#[derive(Debug)]
pub struct ColumnSchema {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub primary: bool,
    pub not_null: bool,
    pub default: Option<&'static str>,
}

#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub columns: &'static [ColumnSchema],
}

/// The fixed shape of every table this service creates.
pub const PEOPLE_TEMPLATE: TableSchema = TableSchema {
    columns: &[
        ColumnSchema {
            name: "id",
            sql_type: "SERIAL",
            primary: true,
            not_null: false,
            default: None,
        },
        ColumnSchema {
            name: "name",
            sql_type: "VARCHAR(100)",
            primary: false,
            not_null: true,
            default: None,
        },
        ColumnSchema {
            name: "created_at",
            sql_type: "TIMESTAMP",
            primary: false,
            not_null: false,
            default: Some("CURRENT_TIMESTAMP"),
        },
        ColumnSchema {
            name: "age",
            sql_type: "INT",
            primary: false,
            not_null: true,
            default: None,
        },
    ],
};

impl TableSchema {
    /// `CREATE TABLE` for `qualified_name`, which must already be quoted.
    ///
    /// No `IF NOT EXISTS`: a concurrent create must surface as a
    /// duplicate-table error rather than succeed silently.
    pub fn create_statement(&self, qualified_name: &str) -> String {
        let cols: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let mut col_def = format!("\"{}\" {}", c.name, c.sql_type);
                if c.primary {
                    col_def.push_str(" PRIMARY KEY")
                }
                if c.not_null {
                    col_def.push_str(" NOT NULL")
                }
                if let Some(default) = c.default {
                    col_def.push_str(" DEFAULT ");
                    col_def.push_str(default);
                }
                col_def
            })
            .collect();
        format!("CREATE TABLE {} ({})", qualified_name, cols.join(", "))
    }
}

/// A column as `information_schema.columns` reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CatalogColumn {
    pub column_name: String,
    pub data_type: String,
}

const TEXT_TYPES: [&str; 2] = ["character varying", "text"];
const INTEGER_TYPE: &str = "integer";
const PRIMARY_KEY_COLUMN: &str = "id";

impl CatalogColumn {
    pub fn new(column_name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            data_type: data_type.into(),
        }
    }

    pub fn is_text(&self) -> bool {
        TEXT_TYPES.contains(&self.data_type.as_str())
    }

    pub fn is_age_candidate(&self) -> bool {
        self.data_type == INTEGER_TYPE
            && !self.column_name.eq_ignore_ascii_case(PRIMARY_KEY_COLUMN)
    }
}

/// Which live columns play the "name" and "age" parts of the template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnRoles {
    pub name_column: Option<String>,
    pub age_column: Option<String>,
}

pub fn classify(columns: &[CatalogColumn]) -> ColumnRoles {
    ColumnRoles {
        name_column: columns
            .iter()
            .find(|c| c.is_text())
            .map(|c| c.column_name.clone()),
        age_column: columns
            .iter()
            .find(|c| c.is_age_candidate())
            .map(|c| c.column_name.clone()),
    }
}

impl ColumnRoles {
    /// Both columns, or `SchemaMismatch` naming what is missing.
    pub fn require(self, table: &str) -> TableResult<(String, String)> {
        match (self.name_column, self.age_column) {
            (Some(name), Some(age)) => Ok((name, age)),
            (None, _) => Err(TableError::SchemaMismatch(format!(
                "Table '{table}' must have a string column for names"
            ))),
            (_, None) => Err(TableError::SchemaMismatch(format!(
                "Table '{table}' must have an integer column other than 'id'"
            ))),
        }
    }
}
