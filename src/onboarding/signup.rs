use super::{require, valid_email, FieldError, Role, SubmitError, SubscriptionTier, STEP_COUNT};
use crate::{
    auth::AuthCoordinator,
    provider::{Metadata, User},
};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use utoipa::ToSchema;

const STEP_TITLES: [&str; 3] = ["Account Details", "Restaurant Information", "Subscription"];

#[derive(ToSchema, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub restaurant_name: String,
    pub phone_number: String,
    pub role: Role,
    pub subscription_tier: SubscriptionTier,
    pub accept_terms: bool,
}

impl fmt::Debug for SignupForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupForm")
            .field("email", &self.email)
            .field("restaurant_name", &self.restaurant_name)
            .field("role", &self.role)
            .field("subscription_tier", &self.subscription_tier)
            .field("accept_terms", &self.accept_terms)
            .finish_non_exhaustive()
    }
}

impl SignupForm {
    /// Metadata attached to the new account.
    #[must_use]
    pub fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert(
            "restaurantName".to_string(),
            Value::from(self.restaurant_name.trim()),
        );
        metadata.insert("role".to_string(), Value::from(self.role.as_str()));
        metadata.insert(
            "subscriptionTier".to_string(),
            Value::from(self.subscription_tier.as_str()),
        );
        metadata.insert(
            "phoneNumber".to_string(),
            Value::from(self.phone_number.trim()),
        );
        metadata
    }

    fn validate_account(&self) -> Result<(), FieldError> {
        require("email", &self.email, "Email is required")?;
        if !valid_email(self.email.trim()) {
            return Err(FieldError::new("email", "Enter a valid email address"));
        }
        require("password", &self.password, "Password is required")?;
        if self.password != self.confirm_password {
            return Err(FieldError::new("confirmPassword", "Passwords do not match"));
        }
        Ok(())
    }

    fn validate_restaurant(&self) -> Result<(), FieldError> {
        require(
            "restaurantName",
            &self.restaurant_name,
            "Restaurant name is required",
        )?;
        require("phoneNumber", &self.phone_number, "Phone number is required")
    }

    fn validate_terms(&self) -> Result<(), FieldError> {
        if self.accept_terms {
            Ok(())
        } else {
            Err(FieldError::new(
                "acceptTerms",
                "You must accept the terms and conditions",
            ))
        }
    }

    /// Every step plus the terms checkbox.
    ///
    /// # Errors
    ///
    /// The first failing field in step order.
    pub fn validate_all(&self) -> Result<(), FieldError> {
        self.validate_account()?;
        self.validate_restaurant()?;
        self.validate_terms()
    }
}

/// Three-step sign-up: account, restaurant, subscription.
#[derive(Debug)]
pub struct SignupWizard {
    form: SignupForm,
    step: u8,
    complete: bool,
}

impl Default for SignupWizard {
    fn default() -> Self {
        Self::new(SignupForm::default())
    }
}

impl SignupWizard {
    #[must_use]
    pub const fn new(form: SignupForm) -> Self {
        Self {
            form,
            step: 1,
            complete: false,
        }
    }

    #[must_use]
    pub const fn form(&self) -> &SignupForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut SignupForm {
        &mut self.form
    }

    #[must_use]
    pub const fn step(&self) -> u8 {
        self.step
    }

    #[must_use]
    pub fn title(&self) -> &'static str {
        STEP_TITLES[usize::from(self.step - 1)]
    }

    /// True once the sign-up was accepted and the confirmation email sent.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// # Errors
    ///
    /// The failing field of `step`; the subscription step only checks terms.
    pub fn validate_step(&self, step: u8) -> Result<(), FieldError> {
        match step {
            1 => self.form.validate_account(),
            2 => self.form.validate_restaurant(),
            _ => self.form.validate_terms(),
        }
    }

    /// Whether "Next" is enabled. The last step submits instead.
    #[must_use]
    pub fn can_advance(&self) -> bool {
        self.step < STEP_COUNT && self.validate_step(self.step).is_ok()
    }

    /// # Errors
    ///
    /// The failing field of the current step; the step is unchanged.
    pub fn next(&mut self) -> Result<u8, FieldError> {
        self.validate_step(self.step)?;
        if self.step < STEP_COUNT {
            self.step += 1;
        }
        Ok(self.step)
    }

    pub fn prev(&mut self) -> u8 {
        self.step = self.step.saturating_sub(1).max(1);
        self.step
    }

    /// Create the pending account.
    ///
    /// # Errors
    ///
    /// A [`FieldError`] before any provider call, or the sign-up error.
    pub async fn submit(&mut self, coordinator: &AuthCoordinator) -> Result<User, SubmitError> {
        self.form.validate_all()?;
        let user = coordinator
            .sign_up(self.form.email.trim(), &self.form.password, self.form.metadata())
            .await?;
        self.complete = true;
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

    fn filled() -> SignupForm {
        SignupForm {
            email: "new@example.com".to_string(),
            password: "secret123".to_string(),
            confirm_password: "secret123".to_string(),
            restaurant_name: "Trattoria".to_string(),
            phone_number: "+39 055 123".to_string(),
            accept_terms: true,
            ..SignupForm::default()
        }
    }

    #[test]
    fn step_one_needs_matching_passwords() {
        let mut wizard = SignupWizard::new(SignupForm {
            confirm_password: "other".to_string(),
            ..filled()
        });
        assert!(!wizard.can_advance());
        assert_eq!(
            wizard.next().err().map(|err| err.field),
            Some("confirmPassword".to_string())
        );
        assert_eq!(wizard.step(), 1);

        wizard.form_mut().confirm_password = "secret123".to_string();
        assert_eq!(wizard.next().ok(), Some(2));
        assert_eq!(wizard.title(), "Restaurant Information");
    }

    #[test]
    fn step_two_needs_name_and_phone() {
        let mut wizard = SignupWizard::new(SignupForm {
            phone_number: String::new(),
            ..filled()
        });
        assert_eq!(wizard.next().ok(), Some(2));
        assert!(!wizard.can_advance());
        wizard.form_mut().phone_number = "555".to_string();
        assert_eq!(wizard.next().ok(), Some(3));
        assert!(!wizard.can_advance());
        assert_eq!(wizard.prev(), 2);
        assert_eq!(wizard.prev(), 1);
        assert_eq!(wizard.prev(), 1);
    }

    #[test]
    fn metadata_uses_wire_keys() {
        let metadata = filled().metadata();
        assert_eq!(metadata.get("restaurantName"), Some(&Value::from("Trattoria")));
        assert_eq!(metadata.get("role"), Some(&Value::from("owner")));
        assert_eq!(metadata.get("subscriptionTier"), Some(&Value::from("basic")));
        assert_eq!(metadata.get("phoneNumber"), Some(&Value::from("+39 055 123")));
    }

    #[test]
    fn form_accepts_camel_case_json() -> anyhow::Result<()> {
        let form: SignupForm = serde_json::from_str(
            r#"{"email":"a@b.co","password":"p","confirmPassword":"p","restaurantName":"R","phoneNumber":"1","role":"staff","subscriptionTier":"enterprise","acceptTerms":true}"#,
        )?;
        assert_eq!(form.role, Role::Staff);
        assert_eq!(form.subscription_tier, SubscriptionTier::Enterprise);
        assert!(form.validate_all().is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn submit_requires_terms_then_completes() -> anyhow::Result<()> {
        let backend = Arc::new(MemoryBackend::new());
        let coordinator = AuthCoordinator::new(
            Arc::new(ProviderClient::browser(backend.clone())),
            Arc::new(PageNavigator::new()),
            Arc::new(Notices::new()),
            "http://localhost:8080",
        );

        let mut wizard = SignupWizard::new(SignupForm {
            accept_terms: false,
            ..filled()
        });
        assert!(matches!(
            wizard.submit(&coordinator).await,
            Err(SubmitError::Field(_))
        ));
        assert_eq!(backend.call_count(), 0);

        wizard.form_mut().accept_terms = true;
        wizard.submit(&coordinator).await?;
        assert!(wizard.is_complete());
        assert!(coordinator.client().current_session().await.is_none());
        let user = backend.user("new@example.com");
        assert_eq!(
            user.as_ref().and_then(|user| user.metadata_str("restaurantName")),
            Some("Trattoria")
        );
        Ok(())
    }
}
