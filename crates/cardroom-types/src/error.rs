use thiserror::Error;

/// Errors related to game operations.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("game not found")]
    NotFound,

    #[error("table is full ({0} seats)")]
    TableFull(u32),

    #[error("user '{0}' is already seated")]
    DuplicateUser(String),

    #[error("user '{0}' is not seated at this table")]
    UserNotSeated(String),

    #[error("invalid blinds: small blind {small} must be positive and below big blind {big}")]
    InvalidBlinds { small: u64, big: u64 },

    #[error("invalid seat count {0}: must be between 2 and 10")]
    InvalidSeats(u32),

    #[error("invalid game name: {0}")]
    InvalidName(String),

    #[error("message must not be empty")]
    EmptyMessage,

    #[error("message must be at most {0} characters")]
    MessageTooLong(usize),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Errors from repository operations (used by trait definitions in cardroom-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<RepositoryError> for GameError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => GameError::NotFound,
            other => GameError::Storage(other.to_string()),
        }
    }
}
