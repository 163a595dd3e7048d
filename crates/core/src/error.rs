use crate::persistence::PersistenceError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid query parameter: {0}")]
    InvalidQueryParameter(String),

    #[error("Settings update rejected: {0}")]
    ConfigUpdate(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] PersistenceError),
}
