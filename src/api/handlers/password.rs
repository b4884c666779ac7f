use super::{
    auth_error, browser_context, field_error, missing_payload,
    types::{ApiError, MessageResponse, ResetPasswordRequest},
};
use crate::{
    api::AppState,
    onboarding::{valid_email, FieldError},
};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Reset email requested", body = MessageResponse),
        (status = 400, description = "Missing payload"),
        (status = 422, description = "Invalid email", body = FieldError),
        (status = 503, description = "Auth provider unavailable", body = ApiError),
    ),
    tag = "auth"
)]
pub async fn reset_password(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return missing_payload();
    };

    let (context, response_headers) = browser_context(&state, &headers).await;

    let email = request.email.trim();
    if !valid_email(email) {
        return field_error(
            response_headers,
            FieldError::new("email", "Enter a valid email address"),
        );
    }

    match context.coordinator().reset_password(email).await {
        Ok(()) => {
            let body = MessageResponse {
                message: "Check your email for the reset link".to_string(),
                notices: context.coordinator().notices().drain(),
            };
            (StatusCode::OK, response_headers, Json(body)).into_response()
        }
        Err(err) => auth_error(response_headers, &err, &context),
    }
}
