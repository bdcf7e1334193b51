//! # Database Error Types
//!
//! SQLite reports constraint failures as plain text. This module turns that
//! text into variants the API can answer with a status code and a field.
//!
//! ```text
//! "UNIQUE constraint failed: products.slug"          ──► UniqueViolation { field: "slug" }
//! "UNIQUE constraint failed: index 'idx_sizes_unique'" ──► UniqueViolation { field: "dimensions" }
//! "FOREIGN KEY constraint failed"                    ──► ForeignKeyViolation
//! "CHECK constraint failed: gross_price_cents >= 0"  ──► CheckViolation
//! PoolTimedOut                                       ──► PoolExhausted
//! ```

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A slug, email, name or option combination is already taken.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A referenced row is missing, or a RESTRICT reference blocks a delete.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    #[error("Constraint violation: {0}")]
    CheckViolation(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Expression indexes have no column to report, so they get a field name here.
const NAMED_UNIQUE_INDEXES: &[(&str, &str)] = &[
    ("idx_sizes_unique", "dimensions"),
    ("idx_product_options_unique", "option"),
];

/// The field behind a `UNIQUE constraint failed: ...` detail.
///
/// For composite constraints the first column wins.
fn unique_field(detail: &str) -> String {
    if let Some(index) = detail.strip_prefix("index '").and_then(|rest| rest.strip_suffix('\'')) {
        return NAMED_UNIQUE_INDEXES
            .iter()
            .find(|(name, _)| *name == index)
            .map(|(_, field)| (*field).to_string())
            .unwrap_or_else(|| index.to_string());
    }

    detail
        .split(", ")
        .next()
        .and_then(|column| column.rsplit('.').next())
        .unwrap_or(detail)
        .to_string()
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if let Some(detail) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::duplicate(unique_field(detail), "unknown")
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_field() {
        assert_eq!(unique_field("products.slug"), "slug");
        assert_eq!(unique_field("users.email"), "email");
        assert_eq!(
            unique_field("product_options.product_id, product_options.variant_id"),
            "product_id"
        );
        assert_eq!(unique_field("index 'idx_sizes_unique'"), "dimensions");
        assert_eq!(unique_field("index 'idx_product_options_unique'"), "option");
        assert_eq!(unique_field("index 'idx_other'"), "idx_other");
    }
}
