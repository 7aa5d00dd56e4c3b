use rusqlite::ffi;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A UNIQUE or PRIMARY KEY constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The row was absent, or a FOREIGN KEY pointed at a missing parent.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("pagination cursor does not name an existing chat")]
    InvalidCursor,

    #[error("corrupt stored value: {0}")]
    Corrupt(String),

    #[error("database lock poisoned")]
    Poisoned,

    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        let extended_code = err.sqlite_error().map(|code| code.extended_code);

        match extended_code {
            Some(ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY) => {
                Self::Conflict(err.to_string())
            }
            Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => Self::NotFound(err.to_string()),
            _ if matches!(err, rusqlite::Error::FromSqlConversionFailure(..)) => {
                Self::Corrupt(err.to_string())
            }
            _ => Self::Sqlite(err),
        }
    }
}
