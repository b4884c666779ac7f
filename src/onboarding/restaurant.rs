use super::{require, SubmitError, STEP_COUNT};
use crate::{
    auth::{AuthCoordinator, AuthError, DASHBOARD_PATH},
    provider::{NewRestaurant, ObjectUpload, ProviderError, User},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;
use utoipa::ToSchema;

pub const LOGO_BUCKET: &str = "restaurant-logos";

const MAX_EXTENSION_LEN: usize = 8;

const STEP_TITLES: [&str; 3] = ["Restaurant Details", "Branding", "Confirmation"];

/// Uploaded logo as received from the browser.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct LogoFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for LogoFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogoFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl LogoFile {
    /// Extension taken from the original file name, cut at the first
    /// character that is not ASCII alphanumeric. `png` when nothing is left.
    #[must_use]
    pub fn extension(&self) -> &str {
        let ext = self
            .file_name
            .rsplit_once('.')
            .and_then(|(_, ext)| ext.split(|c: char| !c.is_ascii_alphanumeric()).next())
            .unwrap_or_default();
        if ext.is_empty() || ext.len() > MAX_EXTENSION_LEN {
            "png"
        } else {
            ext
        }
    }

    /// Object name inside [`LOGO_BUCKET`].
    #[must_use]
    pub fn object_name(&self, owner_id: &str) -> String {
        format!("{owner_id}-logo.{}", self.extension())
    }
}

#[derive(ToSchema, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestaurantProfile {
    pub name: String,
    pub description: String,
    pub address: String,
    pub phone: String,
    pub website: String,
}

impl RestaurantProfile {
    /// Profile prefilled from what the user entered at sign-up.
    #[must_use]
    pub fn for_user(user: &User) -> Self {
        Self {
            name: user.metadata_str("restaurantName").unwrap_or_default().to_string(),
            phone: user.metadata_str("phoneNumber").unwrap_or_default().to_string(),
            ..Self::default()
        }
    }

    fn row(&self, owner_id: &str) -> NewRestaurant {
        NewRestaurant {
            name: self.name.trim().to_string(),
            description: self.description.clone(),
            address: self.address.clone(),
            phone: self.phone.clone(),
            website: self.website.clone(),
            owner_id: owner_id.to_string(),
        }
    }
}

/// Three-step restaurant setup shown after the first sign-in.
#[derive(Debug, Default)]
pub struct OnboardingWizard {
    pub profile: RestaurantProfile,
    pub logo: Option<LogoFile>,
    step: u8,
}

impl OnboardingWizard {
    #[must_use]
    pub fn new(profile: RestaurantProfile, logo: Option<LogoFile>) -> Self {
        Self {
            profile,
            logo,
            step: 1,
        }
    }

    #[must_use]
    pub fn for_user(user: &User) -> Self {
        Self::new(RestaurantProfile::for_user(user), None)
    }

    #[must_use]
    pub fn step(&self) -> u8 {
        self.step.max(1)
    }

    #[must_use]
    pub fn title(&self) -> &'static str {
        STEP_TITLES[usize::from(self.step() - 1)]
    }

    pub fn next(&mut self) -> u8 {
        self.step = (self.step() + 1).min(STEP_COUNT);
        self.step
    }

    pub fn prev(&mut self) -> u8 {
        self.step = self.step().saturating_sub(1).max(1);
        self.step
    }

    /// Insert the restaurant row, then upload the logo when one was given.
    ///
    /// # Errors
    ///
    /// A [`super::FieldError`] for a blank name, [`AuthError::NoActiveSession`] when
    /// nobody is signed in, or the provider error.
    pub async fn submit(&self, coordinator: &AuthCoordinator) -> Result<(), SubmitError> {
        require("name", &self.profile.name, "Restaurant name is required")?;

        let Some(owner) = coordinator.snapshot().user else {
            coordinator.notices().error(AuthError::NoActiveSession.to_string());
            return Err(AuthError::NoActiveSession.into());
        };

        if let Err(err) = self.create(coordinator, &owner).await {
            error!("Error creating restaurant profile: {err}");
            coordinator.notices().error("Failed to create restaurant profile");
            return Err(AuthError::from(err).into());
        }

        coordinator
            .notices()
            .success("Restaurant profile created successfully!");
        coordinator.navigator().push(DASHBOARD_PATH);
        Ok(())
    }

    async fn create(&self, coordinator: &AuthCoordinator, owner: &User) -> Result<(), ProviderError> {
        let client = coordinator.client();
        client.insert_restaurant(&self.profile.row(&owner.id)).await?;

        if let Some(logo) = &self.logo {
            client
                .upload_object(ObjectUpload {
                    bucket: LOGO_BUCKET.to_string(),
                    path: logo.object_name(&owner.id),
                    content_type: logo.content_type.clone(),
                    bytes: logo.bytes.clone(),
                })
                .await?;
        }
        Ok(())
    }
}
