use crate::{
    api::AppState,
    auth::Notice,
    chrome::Chrome,
    verify::VerifyParams,
};
use askama::Template;
use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use tracing::error;

#[derive(Template)]
#[template(path = "verify.html")]
struct VerifyTemplate<'a> {
    chrome: Chrome,
    notices: Vec<Notice>,
    status: &'static str,
    title: &'static str,
    description: &'a str,
}

/// Email confirmation landing. The page is rendered once the session check
/// has settled, so the loading state never reaches the browser.
pub async fn verify(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let client = state.server_client(&headers);
    let verification = state.poller().run(&params, &client).await;
    let user = client.current_session().await.map(|session| session.user);

    let template = VerifyTemplate {
        chrome: Chrome::for_user(user.as_ref(), "/verify"),
        notices: Vec::new(),
        status: verification.status(),
        title: verification.title(),
        description: verification.description(),
    };

    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Failed to render verification page: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
