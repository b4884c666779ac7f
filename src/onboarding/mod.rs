//! Forms behind the login, sign-up and restaurant onboarding pages.
//!
//! Validation runs before any provider call; a failing field is reported as a
//! [`FieldError`] naming the form field.

use crate::auth::AuthError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub mod login;
pub mod restaurant;
pub mod signup;

pub use login::{LoginForm, LOGIN_FAILED};
pub use restaurant::{LogoFile, OnboardingWizard, RestaurantProfile, LOGO_BUCKET};
pub use signup::{SignupForm, SignupWizard};

pub const STEP_COUNT: u8 = 3;

#[derive(ToSchema, Clone, Debug, PartialEq, Eq, Serialize, Error)]
#[error("{message}")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

pub(crate) fn require(field: &str, value: &str, message: &str) -> Result<(), FieldError> {
    if value.trim().is_empty() {
        Err(FieldError::new(field, message))
    } else {
        Ok(())
    }
}

#[derive(ToSchema, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Owner,
    Manager,
    Staff,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Manager => "manager",
            Self::Staff => "staff",
        }
    }
}

#[derive(ToSchema, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Basic,
    Professional,
    Enterprise,
}

impl SubscriptionTier {
    pub const ALL: [Self; 3] = [Self::Basic, Self::Professional, Self::Enterprise];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Professional => "professional",
            Self::Enterprise => "enterprise",
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Professional => "Professional",
            Self::Enterprise => "Enterprise",
        }
    }

    #[must_use]
    pub const fn price(self) -> &'static str {
        match self {
            Self::Basic => "$19/month",
            Self::Professional => "$49/month",
            Self::Enterprise => "Custom",
        }
    }

    #[must_use]
    pub const fn summary(self) -> &'static str {
        match self {
            Self::Basic => "OCR menu text extraction, up to 100 items, standard QR codes",
            Self::Professional => "Priority OCR, up to 500 items, multi-language support, analytics",
            Self::Enterprise => "Unlimited items, multi-location management, custom AI training",
        }
    }
}
