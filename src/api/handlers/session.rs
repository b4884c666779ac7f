//! Session endpoints backed by the browser context.

use super::{
    auth_error, browser_context, page_session,
    types::{ApiError, RedirectResponse, SessionResponse},
};
use crate::{api::cookies, api::AppState};
use axum::{
    extract::Extension,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Json, Redirect, Response},
};
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Current user of this browser", body = SessionResponse),
        (status = 204, description = "Nobody is signed in")
    ),
    tag = "auth"
)]
pub async fn session(headers: HeaderMap, state: Extension<Arc<AppState>>) -> Response {
    let page = page_session(&state, &headers).await;

    if page.user.is_none() && !page.loading {
        return (StatusCode::NO_CONTENT, page.headers).into_response();
    }

    let body = SessionResponse {
        preferences: page.preferences,
        user: page.user,
        loading: page.loading,
    };
    (StatusCode::OK, page.headers, Json(body)).into_response()
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Signed out; session cookies cleared", body = RedirectResponse),
        (status = 303, description = "Signed out from a plain form post; redirect to the next page"),
        (status = 503, description = "Provider sign-out failed; local session cleared", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, state: Extension<Arc<AppState>>) -> Response {
    let (context, mut response_headers) = browser_context(&state, &headers).await;
    let result = context.coordinator().sign_out().await;

    // The local session is gone either way.
    cookies::clear_session(&mut response_headers, state.config().cookie_secure());

    // A browser form post navigates instead of reading JSON; failures stay
    // in the notices and show on the next page.
    if !wants_json(&headers) {
        let location = context
            .navigator()
            .take_location()
            .unwrap_or_else(|| "/".to_string());
        return (response_headers, Redirect::to(&location)).into_response();
    }

    match result {
        Ok(()) => {
            let body = RedirectResponse {
                redirect: context
                    .navigator()
                    .take_location()
                    .unwrap_or_else(|| "/".to_string()),
                notices: context.coordinator().notices().drain(),
            };
            (StatusCode::OK, response_headers, Json(body)).into_response()
        }
        Err(err) => auth_error(response_headers, &err, &context),
    }
}

fn wants_json(headers: &HeaderMap) -> bool {
    [ACCEPT, CONTENT_TYPE].iter().any(|name| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("application/json"))
    })
}
