//! Password and federated login.

use super::{
    auth_error, browser_context, field_error, missing_payload, sync_session_cookies,
    types::{ApiError, LoginResponse},
};
use crate::{
    api::{
        cookies::{self, CODE_VERIFIER_COOKIE, CODE_VERIFIER_MAX_AGE},
        AppState,
    },
    auth::DASHBOARD_PATH,
    onboarding::{FieldError, LoginForm, SubmitError, LOGIN_FAILED},
    provider::OAuthProvider,
};
use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginForm,
    responses(
        (status = 200, description = "Signed in; session cookies set", body = LoginResponse),
        (status = 400, description = "Missing payload"),
        (status = 401, description = "Credentials refused", body = ApiError),
        (status = 422, description = "Email or password is empty", body = FieldError),
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<LoginForm>>,
) -> Response {
    let Some(Json(form)) = payload else {
        return missing_payload();
    };

    let (context, mut response_headers) = browser_context(&state, &headers).await;

    match form.submit(context.coordinator()).await {
        Ok(user) => {
            sync_session_cookies(&state, &headers, context.client(), &mut response_headers).await;
            let redirect = context
                .navigator()
                .take_location()
                .unwrap_or_else(|| DASHBOARD_PATH.to_string());
            let body = LoginResponse {
                redirect,
                user,
                notices: context.coordinator().notices().drain(),
            };
            (StatusCode::OK, response_headers, Json(body)).into_response()
        }
        Err(SubmitError::Field(err)) => field_error(response_headers, err),
        Err(SubmitError::Auth(err)) => {
            debug!(kind = ?err.kind(), "login refused: {err}");
            let body = ApiError {
                message: LOGIN_FAILED.to_string(),
                notices: context.coordinator().notices().drain(),
            };
            (StatusCode::UNAUTHORIZED, response_headers, Json(body)).into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/oauth/{provider}",
    params(
        ("provider" = String, Path, description = "`google` or `microsoft`")
    ),
    responses(
        (status = 303, description = "Redirect to the provider consent page"),
        (status = 404, description = "Unknown provider"),
        (status = 503, description = "Auth provider unavailable", body = ApiError),
    ),
    tag = "auth"
)]
pub async fn oauth(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Path(provider): Path<String>,
) -> Response {
    let Ok(provider) = provider.parse::<OAuthProvider>() else {
        return (StatusCode::NOT_FOUND, format!("Unknown provider: {provider}")).into_response();
    };

    let (context, mut response_headers) = browser_context(&state, &headers).await;

    match context.coordinator().sign_in_with_provider(provider) {
        Ok(url) => {
            // The redirect below is the navigation.
            context.navigator().take_location();
            match context.client().code_verifier() {
                Some(verifier) => cookies::append(
                    &mut response_headers,
                    CODE_VERIFIER_COOKIE,
                    &verifier,
                    CODE_VERIFIER_MAX_AGE,
                    state.config().cookie_secure(),
                ),
                None => warn!("No PKCE verifier stored for {provider} sign-in"),
            }
            (response_headers, Redirect::to(url.as_str())).into_response()
        }
        Err(err) => auth_error(response_headers, &err, &context),
    }
}
