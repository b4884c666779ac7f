use crate::provider::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("No user logged in")]
    NoActiveSession,
}

/// Coarse classification handed to forms and HTTP handlers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthErrorKind {
    InvalidCredentials,
    AlreadyRegistered,
    WeakPassword,
    Unavailable,
    NoActiveSession,
    Rejected,
}

impl AuthError {
    #[must_use]
    pub const fn kind(&self) -> AuthErrorKind {
        match self {
            Self::NoActiveSession => AuthErrorKind::NoActiveSession,
            Self::Provider(err) => match err {
                ProviderError::InvalidCredentials => AuthErrorKind::InvalidCredentials,
                ProviderError::AlreadyRegistered => AuthErrorKind::AlreadyRegistered,
                ProviderError::WeakPassword(_) => AuthErrorKind::WeakPassword,
                ProviderError::Unavailable(_) | ProviderError::InvalidResponse(_) => {
                    AuthErrorKind::Unavailable
                }
                ProviderError::Unauthorized(_) => AuthErrorKind::NoActiveSession,
                ProviderError::Rejected { .. } => AuthErrorKind::Rejected,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(
            AuthError::from(ProviderError::InvalidCredentials).kind(),
            AuthErrorKind::InvalidCredentials
        );
        assert_eq!(
            AuthError::from(ProviderError::Unavailable("down".into())).kind(),
            AuthErrorKind::Unavailable
        );
        assert_eq!(AuthError::NoActiveSession.kind(), AuthErrorKind::NoActiveSession);
        assert_eq!(AuthError::NoActiveSession.to_string(), "No user logged in");
    }

    #[test]
    fn rejected_message_is_verbatim() {
        let err = AuthError::from(ProviderError::Rejected {
            status: 400,
            message: "Email not confirmed".to_string(),
        });
        assert_eq!(err.kind(), AuthErrorKind::Rejected);
        assert_eq!(err.to_string(), "Email not confirmed");
    }
}
