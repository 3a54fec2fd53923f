use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Connection, PgConnection, Postgres, Transaction};
use tracing::{debug, info, warn};

use crate::access::{AccessGuard, OperationCategory};
use crate::config::Config;
use crate::error::{
    DUPLICATE_COLUMN, DUPLICATE_TABLE, TableError, TableResult, UNIQUE_VIOLATION, has_sqlstate,
};
use crate::ident::{Ident, MAX_IDENT_LEN, qualified, quote_ident};
use crate::inspector::{Catalog, TableInfo};
use crate::models::{UpdateOutcome, UpdateTableRequest};
use crate::rows::rows_to_json;
use crate::schema::{CatalogColumn, PEOPLE_TEMPLATE, classify};

const NAME_COLUMN: &str = "name";
const AGE_COLUMN: &str = "age";

/// Entry point for every table operation.
///
/// Cheap to clone: the pool is reference counted and the rest is immutable.
/// Each call checks out its own session and returns it when done.
#[derive(Debug, Clone)]
pub struct TableManager {
    pool: PgPool,
    catalog: Catalog,
    guard: AccessGuard,
}

impl TableManager {
    pub fn new(pool: PgPool, catalog: Catalog, guard: AccessGuard) -> Self {
        Self {
            pool,
            catalog,
            guard,
        }
    }

    pub async fn connect(config: &Config) -> TableResult<Self> {
        info!(schema = %config.schema, "connecting to database");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(
            pool,
            Catalog::new(config.schema.clone()),
            AccessGuard::new(config.roles.clone()),
        ))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn table_ref(&self, table: &Ident) -> String {
        qualified(self.catalog.schema(), table)
    }

    async fn require_table(&self, conn: &mut PgConnection, table: &Ident) -> TableResult<()> {
        if self.catalog.table_exists(conn, table).await? {
            Ok(())
        } else {
            Err(TableError::NotFound(format!("Table '{table}' does not exist")))
        }
    }

    // -------- Create table --------
    pub async fn create_table(&self, table_name: &str, username: &str) -> TableResult<String> {
        self.guard
            .authorize(OperationCategory::CreateOrInsert, username)?;

        let len = table_name.chars().count();
        if !(1..=MAX_IDENT_LEN).contains(&len) {
            return Err(TableError::InvalidName(format!(
                "Table name must be between 1 and {MAX_IDENT_LEN} characters"
            )));
        }
        let table = Ident::parse(table_name)?;

        let mut session = self.pool.acquire().await?;
        let conn: &mut PgConnection = &mut session;
        if self.catalog.table_exists(conn, &table).await? {
            return Err(already_exists(&table));
        }

        let sql = PEOPLE_TEMPLATE.create_statement(&self.table_ref(&table));
        debug!(%sql, "creating table");
        let mut tx = conn.begin().await?;
        let result = sqlx::query(&sql)
            .execute(&mut *tx)
            .await
            .map(|_| ())
            .map_err(|e| conflict(e, TABLE_NAME_TAKEN, || already_exists(&table)));
        finish(tx, result, "Error creating table").await?;

        info!(table = %table, "table created");
        Ok(format!("Table '{table}' created successfully!"))
    }

    // -------- Insert a record --------
    pub async fn insert_row(
        &self,
        table_name: &str,
        name: &str,
        age: i32,
        username: &str,
    ) -> TableResult<String> {
        self.guard
            .authorize(OperationCategory::CreateOrInsert, username)?;
        let table = Ident::parse(table_name)?;

        let mut session = self.pool.acquire().await?;
        let conn: &mut PgConnection = &mut session;
        if !self.catalog.table_exists(conn, &table).await? {
            return Err(TableError::NotFound(format!(
                "Table '{table}' does not exist. Please create the table first."
            )));
        }

        let columns = self.catalog.list_columns(conn, &table).await?;
        let (name_column, age_column) = classify(&columns).require(table.as_str())?;

        let sql = format!(
            "INSERT INTO {} ({}, {}) VALUES ($1, $2)",
            self.table_ref(&table),
            quote_ident(&name_column),
            quote_ident(&age_column)
        );
        let mut tx = conn.begin().await?;
        let result = sqlx::query(&sql)
            .bind(name)
            .bind(age)
            .execute(&mut *tx)
            .await
            .map(|_| ())
            .map_err(TableError::from);
        finish(
            tx,
            result,
            &format!("Error inserting data into table '{table}'"),
        )
        .await?;

        info!(table = %table, %name_column, %age_column, "row inserted");
        Ok(format!("Data inserted into table '{table}' successfully!"))
    }

    // -------- List tables --------
    pub async fn list_tables(&self, username: &str) -> TableResult<Vec<TableInfo>> {
        self.guard
            .authorize(OperationCategory::ReadOrDelete, username)?;
        let mut session = self.pool.acquire().await?;
        Ok(self.catalog.list_tables(&mut session).await?)
    }

    // -------- Get all records --------
    pub async fn read_table(
        &self,
        table_name: &str,
        username: &str,
    ) -> TableResult<Vec<serde_json::Map<String, serde_json::Value>>> {
        self.guard
            .authorize(OperationCategory::ReadOrDelete, username)?;
        let table = Ident::parse(table_name)?;

        let mut session = self.pool.acquire().await?;
        let conn: &mut PgConnection = &mut session;
        self.require_table(conn, &table).await?;

        let sql = format!("SELECT * FROM {}", self.table_ref(&table));
        let rows = sqlx::query(&sql).fetch_all(conn).await?;
        Ok(rows_to_json(&rows))
    }

    // -------- Drop table --------
    pub async fn delete_table(&self, table_name: &str, username: &str) -> TableResult<String> {
        self.guard
            .authorize(OperationCategory::ReadOrDelete, username)?;
        let table = Ident::parse(table_name)?;

        let mut session = self.pool.acquire().await?;
        let conn: &mut PgConnection = &mut session;
        self.require_table(conn, &table).await?;

        let sql = format!("DROP TABLE IF EXISTS {}", self.table_ref(&table));
        let mut tx = conn.begin().await?;
        let result = sqlx::query(&sql)
            .execute(&mut *tx)
            .await
            .map(|_| ())
            .map_err(TableError::from);
        finish(tx, result, "Error deleting table").await?;

        info!(table = %table, "table dropped");
        Ok(format!("Table '{table}' deleted successfully"))
    }

    // -------- Update table --------
    pub async fn update_table(
        &self,
        request: &UpdateTableRequest,
        username: &str,
    ) -> TableResult<UpdateOutcome> {
        self.guard.authorize(OperationCategory::Update, username)?;

        let table = Ident::parse(&request.table_name)?;
        let new_column = request
            .new_name()
            .map(Ident::parse)
            .transpose()
            .map_err(|e| {
                TableError::InvalidName(format!(
                    "Invalid column name. Column names must be valid SQL identifiers: {e}"
                ))
            })?;
        let new_table = request.new_table_name().map(Ident::parse).transpose()?;

        let mut session = self.pool.acquire().await?;
        let conn: &mut PgConnection = &mut session;
        if let Some(new_table) = &new_table {
            if self.catalog.table_exists(conn, new_table).await? {
                return Err(TableError::AlreadyExists(
                    "Table with the new name already exists".into(),
                ));
            }
        }
        if !self.catalog.table_exists(conn, &table).await? {
            return Err(TableError::NotFound(format!(
                "Source table '{table}' does not exist"
            )));
        }

        let mut tx = conn.begin().await?;
        let result = self
            .apply_update(&mut tx, table, new_table, new_column, request.new_age)
            .await;
        let changes = finish(tx, result, "Database error").await?;

        info!(?changes, "table updated");
        Ok(UpdateOutcome {
            message: "Changes applied successfully!".into(),
            changes,
        })
    }

    async fn apply_update(
        &self,
        conn: &mut PgConnection,
        mut table: Ident,
        new_table: Option<Ident>,
        new_column: Option<Ident>,
        new_age: Option<i32>,
    ) -> TableResult<Vec<String>> {
        let mut changes = Vec::new();

        if let Some(new_table) = new_table {
            let sql = format!(
                "ALTER TABLE {} RENAME TO {}",
                self.table_ref(&table),
                new_table.quoted()
            );
            sqlx::query(&sql)
                .execute(&mut *conn)
                .await
                .map_err(|e| conflict(e, TABLE_NAME_TAKEN, || already_exists(&new_table)))?;
            changes.push(format!("Table '{table}' renamed to '{new_table}'"));
            table = new_table;
        }

        // The catalog is transactional, so this sees the rename above.
        let columns = self.catalog.list_columns(conn, &table).await?;

        if let Some(new_column) = new_column {
            let old = column_to_rename(&columns, &new_column, &table)?;
            let sql = format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {}",
                self.table_ref(&table),
                quote_ident(&old),
                new_column.quoted()
            );
            sqlx::query(&sql)
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    conflict(e, &[DUPLICATE_COLUMN], || {
                        column_exists_error(&new_column, &table)
                    })
                })?;
            changes.push(format!("Column '{old}' renamed to '{new_column}'"));
        }

        if let Some(age) = new_age {
            if !self.catalog.column_exists(conn, &table, AGE_COLUMN).await? {
                return Err(TableError::NotFound(format!(
                    "Column '{AGE_COLUMN}' does not exist in table '{table}'"
                )));
            }
            let sql = format!(
                "UPDATE {} SET {} = $1",
                self.table_ref(&table),
                quote_ident(AGE_COLUMN)
            );
            sqlx::query(&sql).bind(age).execute(&mut *conn).await?;
            changes.push(format!("Updated all ages to {age}"));
        }

        Ok(changes)
    }
}

/// Pick the column a name-rename applies to: the literal `name` column when
/// present, otherwise the first text column.
pub fn column_to_rename(
    columns: &[CatalogColumn],
    new_name: &Ident,
    table: &Ident,
) -> TableResult<String> {
    let first_text = columns.iter().find(|c| c.is_text()).ok_or_else(|| {
        TableError::SchemaMismatch(format!(
            "No string columns found in table '{table}' to rename"
        ))
    })?;
    if columns
        .iter()
        .any(|c| c.column_name == new_name.as_str())
    {
        return Err(column_exists_error(new_name, table));
    }
    if columns.iter().any(|c| c.column_name == NAME_COLUMN) {
        return Ok(NAME_COLUMN.to_string());
    }
    Ok(first_text.column_name.clone())
}

fn already_exists(table: &Ident) -> TableError {
    TableError::AlreadyExists(format!("Table '{table}' already exists!"))
}

fn column_exists_error(column: &Ident, table: &Ident) -> TableError {
    TableError::AlreadyExists(format!(
        "Column '{column}' already exists in table '{table}'"
    ))
}

/// SQLSTATEs a lost table-name race can surface as.
const TABLE_NAME_TAKEN: &[&str] = &[DUPLICATE_TABLE, UNIQUE_VIOLATION];

/// Map a driver error carrying one of `codes` to a domain conflict.
fn conflict(
    err: sqlx::Error,
    codes: &[&str],
    on_conflict: impl FnOnce() -> TableError,
) -> TableError {
    if codes.iter().any(|code| has_sqlstate(&err, code)) {
        on_conflict()
    } else {
        TableError::from(err)
    }
}

/// Commit on success; otherwise roll back before surfacing the error.
async fn finish<T>(
    tx: Transaction<'_, Postgres>,
    result: TableResult<T>,
    context: &str,
) -> TableResult<T> {
    match result {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(|e| TableError::mutation(context, e))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "rollback failed");
            }
            Err(err.in_mutation(context))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(s: &str) -> Ident {
        Ident::parse(s).unwrap()
    }

    fn template() -> Vec<CatalogColumn> {
        vec![
            CatalogColumn::new("id", "integer"),
            CatalogColumn::new("name", "character varying"),
            CatalogColumn::new("created_at", "timestamp without time zone"),
            CatalogColumn::new("age", "integer"),
        ]
    }

    #[test]
    fn renames_literal_name_column_first() {
        let mut columns = template();
        columns.insert(1, CatalogColumn::new("nickname", "text"));
        let old = column_to_rename(&columns, &ident("label"), &ident("people")).unwrap();
        assert_eq!(old, "name");
    }

    #[test]
    fn falls_back_to_first_text_column() {
        let columns = vec![
            CatalogColumn::new("id", "integer"),
            CatalogColumn::new("title", "text"),
            CatalogColumn::new("label", "character varying"),
        ];
        let old = column_to_rename(&columns, &ident("caption"), &ident("people")).unwrap();
        assert_eq!(old, "title");
    }

    #[test]
    fn rename_requires_a_text_column() {
        let columns = vec![
            CatalogColumn::new("id", "integer"),
            CatalogColumn::new("age", "integer"),
        ];
        let err = column_to_rename(&columns, &ident("age"), &ident("people")).unwrap_err();
        assert!(matches!(err, TableError::SchemaMismatch(_)));
    }

    #[test]
    fn rename_target_must_be_free() {
        let err = column_to_rename(&template(), &ident("age"), &ident("people")).unwrap_err();
        assert!(matches!(err, TableError::AlreadyExists(_)));
        assert_eq!(
            err.to_string(),
            "Column 'age' already exists in table 'people'"
        );
    }

    #[derive(Debug)]
    struct Sqlstate(&'static str);

    impl std::fmt::Display for Sqlstate {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "sqlstate {}", self.0)
        }
    }

    impl std::error::Error for Sqlstate {}

    impl sqlx::error::DatabaseError for Sqlstate {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some(self.0.into())
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }
    }

    fn db_error(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(Sqlstate(code)))
    }

    #[test]
    fn conflict_passes_through_other_errors() {
        let err = conflict(sqlx::Error::RowNotFound, TABLE_NAME_TAKEN, || {
            already_exists(&ident("x"))
        });
        assert!(matches!(err, TableError::Database(_)));

        let err = conflict(db_error(UNIQUE_VIOLATION), &[DUPLICATE_COLUMN], || {
            already_exists(&ident("x"))
        });
        assert!(matches!(err, TableError::Database(_)));
    }

    #[test]
    fn lost_create_race_is_already_exists() {
        // Postgres reports a concurrent create either way, depending on timing.
        for code in [DUPLICATE_TABLE, UNIQUE_VIOLATION] {
            let err = conflict(db_error(code), TABLE_NAME_TAKEN, || {
                already_exists(&ident("people"))
            });
            assert!(matches!(err, TableError::AlreadyExists(_)), "{code}");
            assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        }
    }
}
