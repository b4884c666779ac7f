//! Browser contexts: one provider client and auth coordinator per browser,
//! keyed by the `menuviz_ctx` cookie.

use super::cookies::{self, CONTEXT_COOKIE};
use crate::{
    auth::{AuthCoordinator, AuthSnapshot, Notices, PageNavigator, Subscription},
    provider::{AuthBackend, ProviderClient},
};
use axum::http::HeaderMap;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use ulid::Ulid;

/// Upper bound on waiting for the coordinator to catch up with its client.
const READY_TIMEOUT: Duration = Duration::from_secs(2);

pub const DEFAULT_CONTEXT_CAPACITY: usize = 10_000;

#[derive(Debug)]
pub struct BrowserContext {
    id: String,
    client: Arc<ProviderClient>,
    coordinator: Arc<AuthCoordinator>,
    navigator: Arc<PageNavigator>,
    subscription: Mutex<Option<Subscription>>,
    last_seen: Mutex<Instant>,
}

impl BrowserContext {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn client(&self) -> &Arc<ProviderClient> {
        &self.client
    }

    #[must_use]
    pub fn coordinator(&self) -> &Arc<AuthCoordinator> {
        &self.coordinator
    }

    #[must_use]
    pub fn navigator(&self) -> &Arc<PageNavigator> {
        &self.navigator
    }

    /// Coordinator snapshot once it has caught up with the client's session.
    ///
    /// The client emits its event before the session call returns, so the
    /// snapshot converges; after a short timeout the current one is used.
    pub async fn snapshot(&self) -> AuthSnapshot {
        let expected = self
            .client
            .current_session()
            .await
            .map(|session| session.user);
        let mut watch = self.coordinator.watch();
        let settled = tokio::time::timeout(
            READY_TIMEOUT,
            watch.wait_for(|snapshot| !snapshot.loading && snapshot.user == expected),
        )
        .await;

        match settled {
            Ok(Ok(snapshot)) => snapshot.clone(),
            _ => self.coordinator.snapshot(),
        }
    }

    fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }

    async fn close(&self) {
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe().await;
        }
    }
}

#[derive(Debug)]
pub struct ContextRegistry {
    backend: Arc<dyn AuthBackend>,
    ttl: Duration,
    capacity: usize,
    contexts: RwLock<HashMap<String, Arc<BrowserContext>>>,
}

impl ContextRegistry {
    /// Registry holding at most `capacity` contexts (at least one); the
    /// least recently seen context makes room for a new one.
    #[must_use]
    pub fn new(backend: Arc<dyn AuthBackend>, ttl: Duration, capacity: usize) -> Self {
        Self {
            backend,
            ttl,
            capacity: capacity.max(1),
            contexts: RwLock::new(HashMap::new()),
        }
    }

    /// Context named by the request cookie, or a new one hydrated from the
    /// session cookies. The flag is true when the context was created and
    /// its cookie must be sent back.
    pub async fn resolve(&self, headers: &HeaderMap, origin: &str) -> (Arc<BrowserContext>, bool) {
        self.evict_idle().await;

        if let Some(context) = self.lookup(headers).await {
            return (context, false);
        }

        let client = Arc::new(ProviderClient::browser(self.backend.clone()));
        let navigator = Arc::new(PageNavigator::new());
        let coordinator = Arc::new(AuthCoordinator::new(
            client.clone(),
            navigator.clone(),
            Arc::new(Notices::new()),
            origin,
        ));
        let subscription = coordinator.subscribe();
        client.hydrate(cookies::stored_tokens(headers)).await;

        let context = Arc::new(BrowserContext {
            id: Ulid::new().to_string(),
            client,
            coordinator,
            navigator,
            subscription: Mutex::new(Some(subscription)),
            last_seen: Mutex::new(Instant::now()),
        });
        debug!(context = %context.id, "browser context created");

        let displaced = {
            let mut contexts = self.contexts.write().await;
            let mut displaced = Vec::new();
            while contexts.len() >= self.capacity {
                let Some(oldest) = contexts
                    .iter()
                    .max_by_key(|(_, context)| context.idle_for())
                    .map(|(id, _)| id.clone())
                else {
                    break;
                };
                displaced.extend(contexts.remove(&oldest));
            }
            contexts.insert(context.id.clone(), context.clone());
            displaced
        };

        for context in &displaced {
            context.close().await;
        }
        if !displaced.is_empty() {
            warn!(
                displaced = displaced.len(),
                capacity = self.capacity,
                "browser context limit reached"
            );
        }
        (context, true)
    }

    /// Existing context for the request, without creating one.
    pub async fn lookup(&self, headers: &HeaderMap) -> Option<Arc<BrowserContext>> {
        let id = cookies::read(headers, CONTEXT_COOKIE)?;
        let context = self.contexts.read().await.get(&id).cloned()?;
        context.touch();
        Some(context)
    }

    /// Drop contexts idle longer than the TTL, stopping their coordinators.
    pub async fn evict_idle(&self) -> usize {
        let expired: Vec<Arc<BrowserContext>> = {
            let mut contexts = self.contexts.write().await;
            let ids: Vec<String> = contexts
                .iter()
                .filter(|(_, context)| context.idle_for() > self.ttl)
                .map(|(id, _)| id.clone())
                .collect();
            ids.iter().filter_map(|id| contexts.remove(id)).collect()
        };

        for context in &expired {
            context.close().await;
        }
        if !expired.is_empty() {
            info!(evicted = expired.len(), "evicted idle browser contexts");
        }
        expired.len()
    }

    pub async fn len(&self) -> usize {
        self.contexts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.contexts.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MemoryBackend, Metadata};
    use anyhow::Result;
    use axum::http::{header::COOKIE, HeaderValue};

    fn cookie_headers(cookie: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie)?);
        Ok(headers)
    }

    #[tokio::test]
    async fn same_cookie_resolves_same_context() -> Result<()> {
        let registry = ContextRegistry::new(
            Arc::new(MemoryBackend::new()),
            Duration::from_secs(60),
            DEFAULT_CONTEXT_CAPACITY,
        );

        let (first, created) = registry.resolve(&HeaderMap::new(), "http://localhost").await;
        assert!(created);

        let headers = cookie_headers(&format!("{CONTEXT_COOKIE}={}", first.id()))?;
        let (second, created) = registry.resolve(&headers, "http://localhost").await;
        assert!(!created);
        assert_eq!(first.id(), second.id());
        assert_eq!(registry.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn new_context_hydrates_from_session_cookies() -> Result<()> {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_user("chef@example.com", "secret123", Metadata::new());
        let session = backend
            .sign_in_with_password("chef@example.com", "secret123")
            .await?;
        let registry = ContextRegistry::new(backend, Duration::from_secs(60), DEFAULT_CONTEXT_CAPACITY);

        let headers = cookie_headers(&format!(
            "menuviz-access-token={}; menuviz-refresh-token={}; menuviz-expires-at={}",
            session.access_token, session.refresh_token, session.expires_at
        ))?;
        let (context, _) = registry.resolve(&headers, "http://localhost").await;
        let snapshot = context.snapshot().await;

        assert!(!snapshot.loading);
        assert_eq!(
            snapshot.user.and_then(|user| user.email),
            Some("chef@example.com".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn idle_contexts_are_evicted() {
        let registry = ContextRegistry::new(Arc::new(MemoryBackend::new()), Duration::ZERO, 8);
        let (context, _) = registry.resolve(&HeaderMap::new(), "http://localhost").await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(registry.evict_idle().await, 1);
        assert!(registry.is_empty().await);
        assert!(context
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none());
    }

    #[tokio::test]
    async fn full_registry_displaces_least_recently_seen() -> Result<()> {
        let registry = ContextRegistry::new(Arc::new(MemoryBackend::new()), Duration::from_secs(60), 2);

        let (oldest, _) = registry.resolve(&HeaderMap::new(), "http://localhost").await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let (recent, _) = registry.resolve(&HeaderMap::new(), "http://localhost").await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let (newest, created) = registry.resolve(&HeaderMap::new(), "http://localhost").await;
        assert!(created);
        assert_eq!(registry.len().await, 2);

        let gone = cookie_headers(&format!("{CONTEXT_COOKIE}={}", oldest.id()))?;
        assert!(registry.lookup(&gone).await.is_none());
        for kept in [&recent, &newest] {
            let headers = cookie_headers(&format!("{CONTEXT_COOKIE}={}", kept.id()))?;
            assert!(registry.lookup(&headers).await.is_some());
        }
        assert!(oldest
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none());
        Ok(())
    }
}
