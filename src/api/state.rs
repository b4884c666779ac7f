use super::{
    context::{ContextRegistry, DEFAULT_CONTEXT_CAPACITY},
    cookies,
};
use crate::{
    provider::{AuthBackend, ProviderClient},
    verify::{VerificationPoller, DEFAULT_VERIFY_DELAY},
};
use axum::http::{header::HOST, HeaderMap};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

pub const DEFAULT_CONTEXT_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_PUBLIC_DIR: &str = "public";

#[derive(Clone, Debug)]
pub struct AppConfig {
    site_url: Option<String>,
    verify_delay: Duration,
    context_ttl: Duration,
    max_contexts: usize,
    public_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            site_url: None,
            verify_delay: DEFAULT_VERIFY_DELAY,
            context_ttl: DEFAULT_CONTEXT_TTL,
            max_contexts: DEFAULT_CONTEXT_CAPACITY,
            public_dir: PathBuf::from(DEFAULT_PUBLIC_DIR),
        }
    }

    /// Public origin used for redirects and email links. When unset the
    /// inbound request origin is used.
    #[must_use]
    pub fn with_site_url(mut self, site_url: Option<String>) -> Self {
        self.site_url = site_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        self
    }

    #[must_use]
    pub const fn with_verify_delay(mut self, delay: Duration) -> Self {
        self.verify_delay = delay;
        self
    }

    #[must_use]
    pub const fn with_context_ttl(mut self, ttl: Duration) -> Self {
        self.context_ttl = ttl;
        self
    }

    #[must_use]
    pub const fn with_max_contexts(mut self, max_contexts: usize) -> Self {
        self.max_contexts = max_contexts;
        self
    }

    /// Directory whose `images/` tree is served under `/images`.
    #[must_use]
    pub fn with_public_dir(mut self, public_dir: impl Into<PathBuf>) -> Self {
        self.public_dir = public_dir.into();
        self
    }

    #[must_use]
    pub fn site_url(&self) -> Option<&str> {
        self.site_url.as_deref()
    }

    #[must_use]
    pub const fn verify_delay(&self) -> Duration {
        self.verify_delay
    }

    #[must_use]
    pub const fn context_ttl(&self) -> Duration {
        self.context_ttl
    }

    #[must_use]
    pub const fn max_contexts(&self) -> usize {
        self.max_contexts
    }

    #[must_use]
    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    /// Cookies get the `Secure` attribute when the site is served over https.
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.site_url
            .as_deref()
            .is_some_and(|url| url.starts_with("https://"))
    }
}

/// Shared server state, handed to handlers as an `Extension`.
#[derive(Debug)]
pub struct AppState {
    backend: Arc<dyn AuthBackend>,
    config: AppConfig,
    contexts: ContextRegistry,
    poller: VerificationPoller,
}

impl AppState {
    #[must_use]
    pub fn new(backend: Arc<dyn AuthBackend>, config: AppConfig) -> Self {
        let contexts = ContextRegistry::new(
            backend.clone(),
            config.context_ttl(),
            config.max_contexts(),
        );
        let poller = VerificationPoller::new(config.verify_delay());
        Self {
            backend,
            config,
            contexts,
            poller,
        }
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn AuthBackend> {
        &self.backend
    }

    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub const fn contexts(&self) -> &ContextRegistry {
        &self.contexts
    }

    #[must_use]
    pub const fn poller(&self) -> &VerificationPoller {
        &self.poller
    }

    /// Configured site URL, or the origin the request was sent to.
    #[must_use]
    pub fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(site_url) = self.config.site_url() {
            return site_url.to_string();
        }

        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };
        let scheme = header("x-forwarded-proto").unwrap_or("http");
        let host = header(HOST.as_str()).unwrap_or("localhost");
        format!("{scheme}://{host}")
    }

    /// Request-scoped client seeded from the session cookies.
    #[must_use]
    pub fn server_client(&self, headers: &HeaderMap) -> ProviderClient {
        ProviderClient::server(self.backend.clone(), cookies::stored_tokens(headers))
    }
}
