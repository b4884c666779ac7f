//! Login and sign-up pages. Both forms post JSON to the auth API.

use super::page_session;
use crate::{
    api::AppState,
    auth::Notice,
    chrome::Chrome,
    onboarding::{Role, SubscriptionTier},
};
use askama::Template;
use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

const ROLES: [Role; 3] = [Role::Owner, Role::Manager, Role::Staff];

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    chrome: Chrome,
    notices: Vec<Notice>,
}

#[derive(Template)]
#[template(path = "signup.html")]
struct SignupTemplate {
    chrome: Chrome,
    notices: Vec<Notice>,
    roles: [Role; 3],
    tiers: [SubscriptionTier; 3],
    selected_tier: SubscriptionTier,
}

#[derive(Deserialize, Debug, Default)]
pub struct SignupQuery {
    tier: Option<String>,
}

impl SignupQuery {
    /// Tier picked on the pricing section; unknown values fall back to the default.
    fn tier(&self) -> SubscriptionTier {
        self.tier
            .as_deref()
            .and_then(|tier| {
                SubscriptionTier::ALL
                    .into_iter()
                    .find(|candidate| candidate.as_str().eq_ignore_ascii_case(tier.trim()))
            })
            .unwrap_or_default()
    }
}

fn render(template: &impl Template, headers: HeaderMap, page: &str) -> Response {
    match template.render() {
        Ok(html) => (headers, Html(html)).into_response(),
        Err(e) => {
            error!("Failed to render {page} page: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub async fn login(headers: HeaderMap, state: Extension<Arc<AppState>>) -> Response {
    let page = page_session(&state, &headers).await;
    let template = LoginTemplate {
        chrome: Chrome::for_user(page.user.as_ref(), "/login"),
        notices: page.notices,
    };
    render(&template, page.headers, "login")
}

pub async fn signup(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Query(query): Query<SignupQuery>,
) -> Response {
    let page = page_session(&state, &headers).await;
    let template = SignupTemplate {
        chrome: Chrome::for_user(page.user.as_ref(), "/signup"),
        notices: page.notices,
        roles: ROLES,
        tiers: SubscriptionTier::ALL,
        selected_tier: query.tier(),
    };
    render(&template, page.headers, "signup")
}
