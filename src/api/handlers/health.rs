use crate::{api::AppState, GIT_COMMIT_HASH};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info_span, Instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    provider: String,
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Auth provider is reachable", body = Health),
        (status = 503, description = "Auth provider is unreachable", body = Health)
    ),
    tag= "health"
)]
/// Build info plus the auth provider probe. `OPTIONS` gets headers only.
pub async fn health(method: Method, state: Extension<Arc<AppState>>) -> impl IntoResponse {
    let probe_span = info_span!("provider.health");
    let result = state.backend().health().instrument(probe_span).await;
    if let Err(err) = &result {
        error!("Auth provider health check failed: {err}");
    }

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider: if result.is_ok() {
            "ok".to_string()
        } else {
            "error".to_string()
        },
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let mut headers = HeaderMap::new();
    match HeaderValue::from_str(&health.x_app()) {
        Ok(value) => {
            debug!("X-App header: {value:?}");
            headers.insert("X-App", value);
        }
        Err(err) => error!("Failed to build X-App header: {err}"),
    }

    let status = if result.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, headers, body)
}

impl Health {
    /// `name:version:short-commit`, the commit part empty for unknown builds.
    fn x_app(&self) -> String {
        let short_hash = self.commit.get(..7).filter(|_| self.commit.len() > 7);
        format!(
            "{}:{}:{}",
            self.name,
            self.version,
            short_hash.unwrap_or_default()
        )
    }
}
