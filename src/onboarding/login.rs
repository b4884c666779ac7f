use super::{require, FieldError, SubmitError};
use crate::{auth::AuthCoordinator, provider::User};
use serde::Deserialize;
use std::fmt;
use utoipa::ToSchema;

/// Shown on the login form whenever the provider refuses the credentials.
pub const LOGIN_FAILED: &str = "Invalid email or password. Please try again.";

#[derive(ToSchema, Clone, Default, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"***")
            .field("remember_me", &self.remember_me)
            .finish()
    }
}

impl LoginForm {
    /// # Errors
    ///
    /// The first empty field, email before password.
    pub fn validate(&self) -> Result<(), FieldError> {
        require("email", &self.email, "Email is required")?;
        require("password", &self.password, "Password is required")
    }

    /// Validate, then sign in through the coordinator.
    ///
    /// # Errors
    ///
    /// A [`FieldError`] without contacting the provider, or the sign-in error.
    pub async fn submit(&self, coordinator: &AuthCoordinator) -> Result<User, SubmitError> {
        self.validate()?;
        let user = coordinator
            .sign_in(self.email.trim(), &self.password, self.remember_me)
            .await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{Notices, PageNavigator},
        provider::{MemoryBackend, ProviderClient},
    };
    use std::sync::Arc;

    fn form(email: &str, password: &str) -> LoginForm {
        LoginForm {
            email: email.to_string(),
            password: password.to_string(),
            remember_me: false,
        }
    }

    #[test]
    fn blank_email_reported_first() {
        let err = form("   ", "").validate().err();
        assert_eq!(err, Some(FieldError::new("email", "Email is required")));
    }

    #[test]
    fn blank_password_reported() {
        let err = form("chef@example.com", "").validate().err();
        assert_eq!(err, Some(FieldError::new("password", "Password is required")));
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_provider() {
        let backend = Arc::new(MemoryBackend::new());
        let coordinator = AuthCoordinator::new(
            Arc::new(ProviderClient::browser(backend.clone())),
            Arc::new(PageNavigator::new()),
            Arc::new(Notices::new()),
            "http://localhost:8080",
        );

        let result = form("", "secret123").submit(&coordinator).await;
        assert!(matches!(result, Err(SubmitError::Field(_))));
        assert_eq!(backend.call_count(), 0);
    }
}
