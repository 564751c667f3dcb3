use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum HrError {
    /// A required field is missing or a value is malformed.
    #[error("{message}")]
    Validation { message: String },

    /// A unique field collides with an existing record.
    #[error("{entity} with {field} `{value}` already exists")]
    Duplicate {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// A reference names a record that does not exist.
    #[error("{entity} {id} does not exist")]
    MissingReference { entity: &'static str, id: Uuid },

    /// A delete was refused because other records still point at the target.
    #[error("{entity} {id} is still referenced by {count} employee(s)")]
    StillReferenced {
        entity: &'static str,
        id: Uuid,
        count: u64,
    },

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

pub type HrResult<T> = Result<T, HrError>;

impl HrError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Unique column of a table, as it appears in the database and on the wire.
#[derive(Clone, Copy, Debug)]
pub(crate) struct UniqueField {
    pub column: &'static str,
    pub field: &'static str,
}

/// Maps a constraint violation raised by the database on insert or update.
///
/// Unique-index violations become [`HrError::Duplicate`]. Postgres names the
/// index (`idx_employees_email`), SQLite names the column
/// (`employees.email`). A foreign-key violation means `reference` vanished
/// between the existence check and the write, and becomes
/// [`HrError::MissingReference`].
pub(crate) fn map_write_error(
    err: DbErr,
    entity: &'static str,
    table: &str,
    fields: &[(UniqueField, &str)],
    reference: Option<(&'static str, Uuid)>,
) -> HrError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => fields
            .iter()
            .find(|(unique, _)| {
                detail.contains(&format!("idx_{table}_{}", unique.column))
                    || detail.contains(&format!("{table}.{}", unique.column))
            })
            .map(|(unique, value)| HrError::Duplicate {
                entity,
                field: unique.field,
                value: value.to_string(),
            })
            .unwrap_or(HrError::Database(err)),
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => match reference {
            Some((entity, id)) => HrError::MissingReference { entity, id },
            None => HrError::Database(err),
        },
        _ => HrError::Database(err),
    }
}

pub(crate) fn is_foreign_key_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
}
