use thiserror::Error;

/// Failure reported by (or while talking to) the auth/storage provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Invalid login credentials")]
    InvalidCredentials,
    #[error("User already registered")]
    AlreadyRegistered,
    #[error("{0}")]
    WeakPassword(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Map an error body returned by the auth API onto a variant.
    ///
    /// `error_code` wins when present; otherwise the HTTP status decides.
    #[must_use]
    pub fn from_response(status: u16, error_code: Option<&str>, message: String) -> Self {
        match error_code {
            Some("invalid_credentials" | "invalid_grant") => return Self::InvalidCredentials,
            Some("user_already_exists" | "email_exists") => return Self::AlreadyRegistered,
            Some("weak_password") => return Self::WeakPassword(message),
            Some("bad_jwt" | "session_not_found" | "refresh_token_not_found") => {
                return Self::Unauthorized(message)
            }
            _ => {}
        }

        match status {
            401 | 403 => Self::Unauthorized(message),
            500..=599 => Self::Unavailable(message),
            _ => Self::Rejected { status, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Unavailable(err.to_string())
        }
    }
}
