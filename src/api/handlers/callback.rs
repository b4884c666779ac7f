//! OAuth and email-confirmation return URL.
//!
//! Flow Overview:
//! 1) Without `code`, send the browser to the site root.
//! 2) Exchange `code` with a request-scoped client, using the PKCE verifier from
//!    the cookie or the live browser context.
//! 3) Store the session in cookies and in the live browser context, if any.
//! 4) Redirect to the verification page.
//!
//! A failed exchange is logged and still ends on the success redirect.

use crate::api::{
    cookies::{self, CODE_VERIFIER_COOKIE},
    AppState,
};
use axum::{
    extract::{Extension, Query},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use utoipa::IntoParams;

#[derive(IntoParams, Deserialize, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    pub code: Option<String>,
    /// Accepted for compatibility with the confirmation link; not followed.
    pub next: Option<String>,
}

pub async fn callback(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let base = state.base_url(&headers);
    debug!(next = ?params.next, "auth callback");

    let Some(code) = params.code.filter(|code| !code.is_empty()) else {
        return Redirect::to(&format!("{base}/")).into_response();
    };

    let secure = state.config().cookie_secure();
    let context = state.contexts().lookup(&headers).await;
    let client = state.server_client(&headers);
    client.set_code_verifier(
        cookies::read(&headers, CODE_VERIFIER_COOKIE)
            .or_else(|| context.as_ref().and_then(|context| context.client().code_verifier())),
    );

    let mut response_headers = HeaderMap::new();
    match client.exchange_code_for_session(&code).await {
        Ok(session) => {
            info!(user = %session.user.id, "auth code exchanged");
            cookies::set_session(&mut response_headers, &session, secure);
            cookies::clear(&mut response_headers, CODE_VERIFIER_COOKIE, secure);
            if let Some(context) = context {
                context.client().set_code_verifier(None);
                context.client().set_session(session).await;
            }
        }
        Err(err) => warn!("Failed to exchange auth code for session: {err}"),
    }

    (
        response_headers,
        Redirect::to(&format!("{base}/verify?status=success")),
    )
        .into_response()
}
