//! Error types for table operations and their HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::access::Role;
use crate::ident::IdentError;

/// SQLSTATE `duplicate_table`.
pub const DUPLICATE_TABLE: &str = "42P07";
/// SQLSTATE `duplicate_column`.
pub const DUPLICATE_COLUMN: &str = "42701";
/// SQLSTATE `unique_violation`. A concurrent `CREATE TABLE` or rename that
/// loses the race on `pg_type` reports this instead of `duplicate_table`.
pub const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE `duplicate_object` (roles and users).
pub const DUPLICATE_OBJECT: &str = "42710";

pub type TableResult<T> = Result<T, TableError>;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Permission denied: only {required} can {action}")]
    PermissionDenied { required: Role, action: &'static str },

    #[error("{0}")]
    InvalidName(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    SchemaMismatch(String),

    #[error("{context}: {source}")]
    MutationFailed {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    /// Driver failure outside a mutation (catalog reads, pool acquire).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl TableError {
    pub fn mutation(context: impl Into<String>, source: sqlx::Error) -> Self {
        Self::MutationFailed {
            context: context.into(),
            source,
        }
    }

    /// Re-tag a raw driver error raised inside a transaction. Domain errors
    /// keep their kind.
    pub fn in_mutation(self, context: &str) -> Self {
        match self {
            Self::Database(source) => Self::mutation(context, source),
            other => other,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied { .. } => "PERMISSION_DENIED",
            Self::InvalidName(_) => "INVALID_NAME",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::NotFound(_) => "NOT_FOUND",
            Self::SchemaMismatch(_) => "SCHEMA_MISMATCH",
            Self::MutationFailed { .. } => "MUTATION_FAILED",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            Self::InvalidName(_) | Self::AlreadyExists(_) | Self::SchemaMismatch(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MutationFailed { .. } | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<IdentError> for TableError {
    fn from(err: IdentError) -> Self {
        Self::InvalidName(format!("Invalid identifier: {err}"))
    }
}

/// Whether a driver error carries the given SQLSTATE.
pub fn has_sqlstate(err: &sqlx::Error, code: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(code),
        _ => false,
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    detail: String,
}

impl IntoResponse for TableError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }
        let body = ErrorBody {
            code: self.code(),
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        let denied = TableError::PermissionDenied {
            required: Role::Reader,
            action: "view and delete tables",
        };
        assert_eq!(denied.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            denied.to_string(),
            "Permission denied: only role2 can view and delete tables"
        );

        assert_eq!(
            TableError::AlreadyExists("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TableError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            TableError::mutation("boom", sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn in_mutation_only_retags_driver_errors() {
        let retagged = TableError::Database(sqlx::Error::RowNotFound).in_mutation("insert");
        assert!(matches!(retagged, TableError::MutationFailed { ref context, .. } if context == "insert"));

        let kept = TableError::SchemaMismatch("no text column".into()).in_mutation("update");
        assert!(matches!(kept, TableError::SchemaMismatch(_)));
    }

    #[test]
    fn ident_errors_become_invalid_name() {
        let err: TableError = IdentError::Empty.into();
        assert_eq!(err.code(), "INVALID_NAME");
    }

    #[test]
    fn non_database_errors_have_no_sqlstate() {
        assert!(!has_sqlstate(&sqlx::Error::RowNotFound, DUPLICATE_TABLE));
        assert!(!has_sqlstate(&sqlx::Error::RowNotFound, UNIQUE_VIOLATION));
    }
}
