use crate::{
    auth::{Notice, UserPreferences},
    provider::User,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Debug)]
pub struct ApiError {
    pub message: String,
    pub notices: Vec<Notice>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct LoginResponse {
    pub redirect: String,
    pub user: User,
    pub notices: Vec<Notice>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct SignupResponse {
    pub user: User,
    pub notices: Vec<Notice>,
}

/// Where the page should go next.
#[derive(ToSchema, Serialize, Debug)]
pub struct RedirectResponse {
    pub redirect: String,
    pub notices: Vec<Notice>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct MessageResponse {
    pub message: String,
    pub notices: Vec<Notice>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct SessionResponse {
    pub user: Option<User>,
    pub loading: bool,
    pub preferences: Option<UserPreferences>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct PreferencesResponse {
    pub preferences: UserPreferences,
    pub notices: Vec<Notice>,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub email: String,
}
