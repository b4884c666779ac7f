use super::page_session;
use crate::{
    api::AppState,
    assets::{slug, DEMO_ITEMS},
    auth::Notice,
    chrome::Chrome,
    onboarding::SubscriptionTier,
};
use askama::Template;
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use tracing::error;

pub struct Feature {
    pub title: &'static str,
    pub body: &'static str,
}

const FEATURES: [Feature; 3] = [
    Feature {
        title: "Picture every dish",
        body: "Upload your menu and get an image for each item.",
    },
    Feature {
        title: "Works on any table",
        body: "Guests scan a code and browse the visual menu on their phone.",
    },
    Feature {
        title: "Always up to date",
        body: "Change a dish once and every menu shows it right away.",
    },
];

const STEPS: [&str; 3] = [
    "Create your account and describe your restaurant.",
    "Upload your menu and logo.",
    "Share the visual menu with your guests.",
];

pub struct DemoImage {
    pub src: String,
    pub name: &'static str,
}

#[derive(Template)]
#[template(path = "landing.html")]
struct LandingTemplate {
    chrome: Chrome,
    notices: Vec<Notice>,
    signed_in: bool,
    features: &'static [Feature],
    steps: &'static [&'static str],
    items: Vec<DemoImage>,
    tiers: [SubscriptionTier; 3],
}

pub async fn root(headers: HeaderMap, state: Extension<Arc<AppState>>) -> Response {
    let page = page_session(&state, &headers).await;

    let template = LandingTemplate {
        chrome: Chrome::for_user(page.user.as_ref(), "/"),
        notices: page.notices,
        signed_in: page.user.is_some(),
        features: &FEATURES,
        steps: &STEPS,
        items: DEMO_ITEMS
            .iter()
            .map(|item| DemoImage {
                src: format!("/images/menu/{}.svg", slug(item.name)),
                name: item.name,
            })
            .collect(),
        tiers: SubscriptionTier::ALL,
    };

    match template.render() {
        Ok(html) => (page.headers, Html(html)).into_response(),
        Err(e) => {
            error!("Failed to render landing page: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
