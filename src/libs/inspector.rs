//! Catalog reads against `information_schema`, scoped to one target schema.
//!
//! Catalog columns are `sql_identifier` / `character_data` domains, which sqlx
//! will not decode as `String`, hence the `::text` casts.

use serde::Serialize;
use sqlx::PgConnection;

use crate::ident::Ident;
use crate::schema::CatalogColumn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct TableInfo {
    pub table_name: String,
    pub table_schema: String,
    pub table_type: String,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    schema: Ident,
}

impl Catalog {
    pub fn new(schema: Ident) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Ident {
        &self.schema
    }

    pub async fn table_exists(&self, conn: &mut PgConnection, table: &Ident) -> sqlx::Result<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = $1 AND table_name = $2
            )",
        )
        .bind(self.schema.as_str())
        .bind(table.as_str())
        .fetch_one(conn)
        .await
    }

    pub async fn column_exists(
        &self,
        conn: &mut PgConnection,
        table: &Ident,
        column: &str,
    ) -> sqlx::Result<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM information_schema.columns
                WHERE table_schema = $1 AND table_name = $2 AND column_name = $3
            )",
        )
        .bind(self.schema.as_str())
        .bind(table.as_str())
        .bind(column)
        .fetch_one(conn)
        .await
    }

    /// Columns in declaration order.
    pub async fn list_columns(
        &self,
        conn: &mut PgConnection,
        table: &Ident,
    ) -> sqlx::Result<Vec<CatalogColumn>> {
        let columns: Vec<CatalogColumn> = sqlx::query_as(
            "SELECT column_name::text AS column_name, data_type::text AS data_type
             FROM information_schema.columns
             WHERE table_schema = $1 AND table_name = $2
             ORDER BY ordinal_position",
        )
        .bind(self.schema.as_str())
        .bind(table.as_str())
        .fetch_all(conn)
        .await?;
        tracing::debug!(table = %table, count = columns.len(), "listed columns");
        Ok(columns)
    }

    pub async fn list_tables(&self, conn: &mut PgConnection) -> sqlx::Result<Vec<TableInfo>> {
        sqlx::query_as(
            "SELECT table_name::text AS table_name,
                    table_schema::text AS table_schema,
                    table_type::text AS table_type
             FROM information_schema.tables
             WHERE table_schema = $1 AND table_type = 'BASE TABLE'
             ORDER BY table_name",
        )
        .bind(self.schema.as_str())
        .fetch_all(conn)
        .await
    }
}
