use shared::error::{ApiError, ErrorCode, ValidationError};
use thiserror::Error;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded {status}: {}", .error.message)]
    Api { status: u16, error: ApiError },
    #[error("not signed in")]
    NotAuthenticated,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid server url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ClientError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Api { error, .. } => error.code,
            Self::NotAuthenticated => ErrorCode::Unauthorized,
            Self::Validation(_) => ErrorCode::Validation,
            Self::Transport(_) | Self::InvalidUrl { .. } => ErrorCode::Internal,
        }
    }

    /// True when the stored session is no longer accepted and the user has
    /// to sign in again.
    pub fn requires_reauth(&self) -> bool {
        matches!(self.code(), ErrorCode::Unauthorized)
    }
}
