//! Restaurant onboarding submission.
//!
//! Flow Overview:
//! 1) Read the profile text fields and the optional `logo` file from the multipart body.
//! 2) Wait for the browser context's session.
//! 3) Insert the restaurant row and upload the logo.

use super::{
    auth_error, browser_context, field_error, sync_session_cookies,
    types::{ApiError, RedirectResponse},
};
use crate::{
    api::AppState,
    auth::DASHBOARD_PATH,
    onboarding::{FieldError, LogoFile, OnboardingWizard, RestaurantProfile, SubmitError},
};
use axum::{
    extract::{multipart::MultipartError, Extension, Multipart},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

#[utoipa::path(
    post,
    path = "/api/onboarding",
    request_body(
        content = RestaurantProfile,
        content_type = "multipart/form-data",
        description = "Profile fields plus an optional `logo` file"
    ),
    responses(
        (status = 200, description = "Restaurant created", body = RedirectResponse),
        (status = 400, description = "Malformed multipart body"),
        (status = 401, description = "No user logged in", body = ApiError),
        (status = 422, description = "Restaurant name is empty", body = FieldError),
    ),
    tag = "onboarding"
)]
pub async fn onboarding(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    multipart: Multipart,
) -> Response {
    let wizard = match read_wizard(multipart).await {
        Ok(wizard) => wizard,
        Err(err) => {
            warn!("Failed to read onboarding form: {err}");
            return (StatusCode::BAD_REQUEST, err.body_text()).into_response();
        }
    };

    let (context, mut response_headers) = browser_context(&state, &headers).await;
    context.snapshot().await;

    let result = wizard.submit(context.coordinator()).await;
    sync_session_cookies(&state, &headers, context.client(), &mut response_headers).await;

    match result {
        Ok(()) => {
            let body = RedirectResponse {
                redirect: context
                    .navigator()
                    .take_location()
                    .unwrap_or_else(|| DASHBOARD_PATH.to_string()),
                notices: context.coordinator().notices().drain(),
            };
            (StatusCode::OK, response_headers, Json(body)).into_response()
        }
        Err(SubmitError::Field(err)) => field_error(response_headers, err),
        Err(SubmitError::Auth(err)) => auth_error(response_headers, &err, &context),
    }
}

async fn read_wizard(mut multipart: Multipart) -> Result<OnboardingWizard, MultipartError> {
    let mut profile = RestaurantProfile::default();
    let mut logo = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "logo" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await?;
            // Browsers send an empty part when no file was picked.
            if !bytes.is_empty() {
                logo = Some(LogoFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = field.text().await?;
        match name.as_str() {
            "name" => profile.name = value,
            "description" => profile.description = value,
            "address" => profile.address = value,
            "phone" => profile.phone = value,
            "website" => profile.website = value,
            other => debug!("ignoring onboarding field {other}"),
        }
    }

    Ok(OnboardingWizard::new(profile, logo))
}
