use thiserror::Error;

/// Errors surfaced by API clients and the credential rotator.
///
/// Quota exhaustion is not queryable up front; it shows up as a failed call
/// (`Status` with 403, or `Transport`). The rotator reacts to these rather
/// than predicting them.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("all credentials failed the probe call")]
    AllCredentialsExhausted,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        ApiError::Malformed(msg.into())
    }
}
