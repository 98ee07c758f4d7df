use rusqlite::ffi;
use thiserror::Error;

/// Failure of a store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A UNIQUE or PRIMARY KEY constraint fired. Carries the constraint as
    /// reported by SQLite, e.g. `posts.slug`.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("SQL error: {0}")]
    Storage(#[source] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, message)
                if code.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || code.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                StoreError::Conflict(constraint_name(message.as_deref()))
            }
            _ => StoreError::Storage(err),
        }
    }
}

/// Pulls `table.column` out of "UNIQUE constraint failed: table.column".
fn constraint_name(message: Option<&str>) -> String {
    match message {
        Some(msg) => msg
            .split_once("constraint failed: ")
            .map(|(_, cols)| cols.to_string())
            .unwrap_or_else(|| msg.to_string()),
        None => "unique constraint".to_string(),
    }
}
