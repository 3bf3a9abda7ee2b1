use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    RateLimited,
    #[default]
    Internal,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            400 | 409 | 422 => Self::Validation,
            429 => Self::RateLimited,
            _ => Self::Internal,
        }
    }
}

/// Error body as returned by the backend. Most endpoints only send
/// `{"message": "..."}`, so `code` is optional on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: ErrorCode,
    #[serde(alias = "error")]
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Checks performed on the client before a request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("notification message must not be empty")]
    EmptyMessage,
    #[error("priority must be between {min} and {max}, got {actual}")]
    PriorityOutOfRange { min: u8, max: u8, actual: i64 },
    #[error("unknown notification type '{0}'")]
    UnknownKind(String),
    #[error("email and password are required")]
    MissingCredentials,
    #[error("new password and confirmation do not match")]
    PasswordMismatch,
    #[error("new password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("new password must differ from the current password")]
    PasswordUnchanged,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_http_status_to_code() {
        assert_eq!(ErrorCode::from_status(401), ErrorCode::Unauthorized);
        assert_eq!(ErrorCode::from_status(422), ErrorCode::Validation);
        assert_eq!(ErrorCode::from_status(503), ErrorCode::Internal);
    }

    #[test]
    fn decodes_message_only_body() {
        let error: ApiError =
            serde_json::from_str(r#"{"message":"Invalid credentials"}"#).expect("decode");
        assert_eq!(error, ApiError::new(ErrorCode::Internal, "Invalid credentials"));

        let error: ApiError =
            serde_json::from_str(r#"{"error":"Forbidden","code":"forbidden"}"#).expect("decode");
        assert_eq!(error.code, ErrorCode::Forbidden);
    }
}
