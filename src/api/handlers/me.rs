use super::{
    auth_error, browser_context, missing_payload, sync_session_cookies,
    types::{ApiError, PreferencesResponse},
};
use crate::{
    api::AppState,
    auth::UserPreferences,
};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

#[utoipa::path(
    patch,
    path = "/api/me/preferences",
    request_body = UserPreferences,
    responses(
        (status = 200, description = "Preferences merged into the user metadata", body = PreferencesResponse),
        (status = 400, description = "Missing payload"),
        (status = 401, description = "No user logged in", body = ApiError),
    ),
    tag = "me"
)]
pub async fn update_preferences(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<UserPreferences>>,
) -> Response {
    let Some(Json(preferences)) = payload else {
        return missing_payload();
    };

    let (context, mut response_headers) = browser_context(&state, &headers).await;
    // Wait for the session restored from cookies before checking for a user.
    context.snapshot().await;

    let result = context.coordinator().update_preferences(&preferences).await;
    sync_session_cookies(&state, &headers, context.client(), &mut response_headers).await;

    match result {
        Ok(user) => {
            let body = PreferencesResponse {
                preferences: UserPreferences::from_metadata(&user.user_metadata),
                notices: context.coordinator().notices().drain(),
            };
            (StatusCode::OK, response_headers, Json(body)).into_response()
        }
        Err(err) => auth_error(response_headers, &err, &context),
    }
}
