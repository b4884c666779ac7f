//! Route handlers and the response helpers they share.

pub mod callback;
pub mod health;
pub mod login;
pub mod me;
pub mod onboarding;
pub mod pages;
pub mod password;
pub mod root;
pub mod session;
pub mod signup;
pub mod types;
pub mod verify;

use super::{
    context::BrowserContext,
    cookies::{self, CONTEXT_COOKIE},
    state::AppState,
};
use crate::{
    auth::{AuthError, AuthErrorKind, Notice, UserPreferences},
    onboarding::FieldError,
    provider::{ProviderClient, User},
};
use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::warn;
use types::ApiError;

/// Browser context of the request plus the headers every response must
/// carry (the context cookie when the context is new).
pub(crate) async fn browser_context(
    state: &AppState,
    headers: &HeaderMap,
) -> (Arc<BrowserContext>, HeaderMap) {
    let origin = state.base_url(headers);
    let (context, created) = state.contexts().resolve(headers, &origin).await;

    let mut response_headers = HeaderMap::new();
    if created {
        cookies::append(
            &mut response_headers,
            CONTEXT_COOKIE,
            context.id(),
            state.config().context_ttl().as_secs(),
            state.config().cookie_secure(),
        );
    }
    (context, response_headers)
}

/// Write `client`'s session back to the token cookies if a refresh or
/// sign-in changed it during the request.
pub(crate) async fn sync_session_cookies(
    state: &AppState,
    headers: &HeaderMap,
    client: &ProviderClient,
    response_headers: &mut HeaderMap,
) {
    if let Some(session) = client.current_session().await {
        cookies::sync_session(
            response_headers,
            headers,
            &session,
            state.config().cookie_secure(),
        );
    }
}

/// Who is signed in, as seen by a read-only page.
#[derive(Debug, Default)]
pub(crate) struct PageSession {
    pub user: Option<User>,
    pub loading: bool,
    pub preferences: Option<UserPreferences>,
    pub notices: Vec<Notice>,
    pub headers: HeaderMap,
}

/// Session of a read-only request. A live browser context is used when the
/// request names one; otherwise a request-scoped client reads the session
/// cookies and no context is created.
pub(crate) async fn page_session(state: &AppState, headers: &HeaderMap) -> PageSession {
    let mut page = PageSession::default();

    if let Some(context) = state.contexts().lookup(headers).await {
        let snapshot = context.snapshot().await;
        sync_session_cookies(state, headers, context.client(), &mut page.headers).await;
        page.preferences = context.coordinator().preferences();
        page.notices = context.coordinator().notices().drain();
        page.user = snapshot.user;
        page.loading = snapshot.loading;
        return page;
    }

    if cookies::stored_tokens(headers).is_none() {
        return page;
    }

    let client = state.server_client(headers);
    match client.get_user().await {
        Ok(user) => {
            page.preferences = user
                .as_ref()
                .map(|user| UserPreferences::from_metadata(&user.user_metadata));
            page.user = user;
        }
        Err(err) => warn!("Failed to read session from cookies: {err}"),
    }
    sync_session_cookies(state, headers, &client, &mut page.headers).await;
    page
}

pub(crate) const fn status_for(kind: AuthErrorKind) -> StatusCode {
    match kind {
        AuthErrorKind::InvalidCredentials | AuthErrorKind::NoActiveSession => {
            StatusCode::UNAUTHORIZED
        }
        AuthErrorKind::AlreadyRegistered => StatusCode::CONFLICT,
        AuthErrorKind::WeakPassword => StatusCode::UNPROCESSABLE_ENTITY,
        AuthErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        AuthErrorKind::Rejected => StatusCode::BAD_REQUEST,
    }
}

pub(crate) fn missing_payload() -> Response {
    (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response()
}

pub(crate) fn field_error(headers: HeaderMap, err: FieldError) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, headers, Json(err)).into_response()
}

pub(crate) fn auth_error(headers: HeaderMap, err: &AuthError, context: &BrowserContext) -> Response {
    let body = ApiError {
        message: err.to_string(),
        notices: context.coordinator().notices().drain(),
    };
    (status_for(err.kind()), headers, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_failures_map_to_status_codes() {
        assert_eq!(
            status_for(AuthErrorKind::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(AuthErrorKind::AlreadyRegistered),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(AuthErrorKind::Unavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(status_for(AuthErrorKind::Rejected), StatusCode::BAD_REQUEST);
    }
}
