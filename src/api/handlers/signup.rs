use super::{
    auth_error, browser_context, field_error, missing_payload,
    types::{ApiError, SignupResponse},
};
use crate::{
    api::{
        cookies::{self, CODE_VERIFIER_COOKIE, SESSION_MAX_AGE},
        AppState,
    },
    onboarding::{FieldError, SignupForm, SignupWizard, SubmitError},
};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupForm,
    responses(
        (status = 200, description = "Account created; confirmation email sent", body = SignupResponse),
        (status = 400, description = "Missing payload or rejected by the provider", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError),
        (status = 422, description = "Invalid form field or weak password", body = FieldError),
    ),
    tag = "auth"
)]
pub async fn signup(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<SignupForm>>,
) -> Response {
    let Some(Json(form)) = payload else {
        return missing_payload();
    };

    let (context, mut response_headers) = browser_context(&state, &headers).await;
    let mut wizard = SignupWizard::new(form);

    match wizard.submit(context.coordinator()).await {
        Ok(user) => {
            // The confirmation link may be opened in another browser context.
            if let Some(verifier) = context.client().code_verifier() {
                cookies::append(
                    &mut response_headers,
                    CODE_VERIFIER_COOKIE,
                    &verifier,
                    SESSION_MAX_AGE,
                    state.config().cookie_secure(),
                );
            }
            let body = SignupResponse {
                user,
                notices: context.coordinator().notices().drain(),
            };
            (StatusCode::OK, response_headers, Json(body)).into_response()
        }
        Err(SubmitError::Field(err)) => field_error(response_headers, err),
        Err(SubmitError::Auth(err)) => auth_error(response_headers, &err, &context),
    }
}
