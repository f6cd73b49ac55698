use thiserror::Error;

/// Storage-level failures. `Exists` and `StateMismatch` are the two CAS
/// outcomes the state machines translate into their own taxonomy.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Record already exists in state {state}")]
    Exists { state: String },

    #[error("Record not found")]
    NotFound,

    #[error("State mismatch: expected {expected}, found {found}")]
    StateMismatch { expected: String, found: String },
}

/// Engine-level taxonomy surfaced to the request router.
///
/// `Conflict` carries the pair's current state and `NotFound` means no record
/// exists, so a caller can distinguish "already advanced" from "never
/// started". Messages never contain key, signature, or KEM material.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Signature verification failed")]
    Unauthenticated,

    #[error("Pair already has a record in state {state}")]
    Conflict { state: String },

    #[error("No record exists for the requested pair")]
    NotFound,

    #[error("Invalid state for this transition: expected {expected}, found {found}")]
    InvalidState { expected: String, found: String },

    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Exists { state } => CoreError::Conflict { state },
            StoreError::NotFound => CoreError::NotFound,
            StoreError::StateMismatch { expected, found } => {
                CoreError::InvalidState { expected, found }
            }
            other => CoreError::Store(other),
        }
    }
}
