//! Email verification landing: decides whether the confirmation link left
//! the browser with a session.

use crate::provider::ProviderClient;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};
use utoipa::IntoParams;

pub const DEFAULT_VERIFY_DELAY: Duration = Duration::from_millis(1000);

const INVALID_LINK: &str = "Invalid verification link";
const FAILED: &str = "Email verification failed. Please try again or contact support.";
const UNEXPECTED: &str = "An unexpected error occurred during verification";

#[derive(IntoParams, Clone, Debug, Default, Deserialize)]
#[into_params(parameter_in = Query)]
pub struct VerifyParams {
    pub token: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Set by the OAuth callback redirect; not used for the decision.
    pub status: Option<String>,
}

impl VerifyParams {
    fn is_signup_link(&self) -> bool {
        self.token.as_deref().is_some_and(|token| !token.is_empty())
            && self.kind.as_deref() == Some("signup")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerificationState {
    Success,
    Error(String),
}

impl VerificationState {
    #[must_use]
    pub const fn status(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error(_) => "error",
        }
    }

    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Success => "Email Verified Successfully!",
            Self::Error(_) => "Verification Failed",
        }
    }

    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::Success => "Your account has been verified. You can now access your dashboard.",
            Self::Error(message) => message,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct VerificationPoller {
    delay: Duration,
}

impl Default for VerificationPoller {
    fn default() -> Self {
        Self::new(DEFAULT_VERIFY_DELAY)
    }
}

impl VerificationPoller {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Check for a session, and if there is none yet wait `delay` and check
    /// exactly once more.
    pub async fn run(&self, params: &VerifyParams, client: &ProviderClient) -> VerificationState {
        if !params.is_signup_link() {
            return VerificationState::Error(INVALID_LINK.to_string());
        }

        match client.get_session().await {
            Ok(Some(_)) => return VerificationState::Success,
            Ok(None) => {}
            Err(err) => {
                error!("Verification error: {err}");
                return VerificationState::Error(UNEXPECTED.to_string());
            }
        }

        tokio::time::sleep(self.delay).await;

        match client.get_session().await {
            Ok(Some(_)) => {
                info!("Email verified after re-check");
                VerificationState::Success
            }
            Ok(None) => VerificationState::Error(FAILED.to_string()),
            Err(err) => {
                error!("Verification error: {err}");
                VerificationState::Error(UNEXPECTED.to_string())
            }
        }
    }
}
