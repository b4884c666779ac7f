//! Provider client handles.
//!
//! A browser-scoped client lives as long as its browser context, caches the
//! session and pushes [`SessionEvent`]s to subscribers. A server-scoped client
//! is built per request from the forwarded session cookies and resolves them
//! lazily on first use.

use super::{
    pkce::PkcePair, AuthBackend, Metadata, NewRestaurant, OAuthProvider, ObjectUpload,
    ProviderError, ProviderResult, Session, SessionEvent, SignUpParams, StoredTokens, User,
};
use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, instrument, warn};
use url::Url;

/// Sessions expiring within this margin are refreshed before use.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(60);

const EVENT_CAPACITY: usize = 32;
const SESSION_MISSING: &str = "Auth session missing!";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientScope {
    Browser,
    Server,
}

#[derive(Debug)]
pub struct ProviderClient {
    backend: Arc<dyn AuthBackend>,
    scope: ClientScope,
    session: RwLock<Option<Session>>,
    pending: Mutex<Option<StoredTokens>>,
    code_verifier: Mutex<Option<String>>,
    events: broadcast::Sender<SessionEvent>,
}

impl ProviderClient {
    /// Client owned by a browser context. Call [`Self::hydrate`] once to
    /// announce the initial session.
    #[must_use]
    pub fn browser(backend: Arc<dyn AuthBackend>) -> Self {
        Self::new(backend, ClientScope::Browser, None)
    }

    /// Client for a single server request, seeded from forwarded tokens.
    #[must_use]
    pub fn server(backend: Arc<dyn AuthBackend>, tokens: Option<StoredTokens>) -> Self {
        Self::new(backend, ClientScope::Server, tokens)
    }

    fn new(
        backend: Arc<dyn AuthBackend>,
        scope: ClientScope,
        tokens: Option<StoredTokens>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            backend,
            scope,
            session: RwLock::new(None),
            pending: Mutex::new(tokens),
            code_verifier: Mutex::new(None),
            events,
        }
    }

    #[must_use]
    pub const fn scope(&self) -> ClientScope {
        self.scope
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn AuthBackend> {
        &self.backend
    }

    /// Subscribe to session-change events.
    #[must_use]
    pub fn on_auth_state_change(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Cached session, without touching the provider.
    pub async fn current_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    // The event is sent while the write lock is held so that subscribers see
    // events in the same order the cache was written.
    async fn store(&self, session: Option<Session>, event: SessionEvent) {
        let mut guard = self.session.write().await;
        *guard = session;
        debug!(event = event.name(), scope = ?self.scope, "session changed");
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn take_pending(&self) -> Option<StoredTokens> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Resolve forwarded tokens into a session, emitting `InitialSession`.
    pub async fn hydrate(&self, tokens: Option<StoredTokens>) -> Option<Session> {
        let session = match tokens {
            Some(tokens) => match self.resolve(tokens).await {
                Ok(session) => Some(session),
                Err(err) => {
                    warn!("Failed to restore session from cookies: {err}");
                    None
                }
            },
            None => None,
        };
        self.store(session.clone(), SessionEvent::InitialSession(session.clone()))
            .await;
        session
    }

    async fn resolve(&self, tokens: StoredTokens) -> ProviderResult<Session> {
        if !tokens.expires_within(REFRESH_MARGIN) {
            match self.backend.get_user(&tokens.access_token).await {
                Ok(user) => {
                    return Ok(Session {
                        access_token: tokens.access_token,
                        refresh_token: tokens.refresh_token,
                        expires_at: tokens.expires_at,
                        user,
                    })
                }
                Err(ProviderError::Unauthorized(_)) => {}
                Err(err) => return Err(err),
            }
        }
        self.backend.refresh(&tokens.refresh_token).await
    }

    /// Install a session obtained elsewhere (e.g. by a server-scoped client).
    pub async fn set_session(&self, session: Session) {
        self.store(Some(session.clone()), SessionEvent::SignedIn(session))
            .await;
    }

    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> ProviderResult<Session> {
        let session = self.backend.sign_in_with_password(email, password).await?;
        self.set_session(session.clone()).await;
        Ok(session)
    }

    /// Start a federated login and return the provider authorize URL.
    ///
    /// The PKCE verifier is kept on the client until the code exchange.
    pub fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> ProviderResult<Url> {
        let pkce = PkcePair::generate();
        let url = self
            .backend
            .authorize_url(provider, redirect_to, &pkce.challenge)?;
        self.set_code_verifier(Some(pkce.verifier));
        Ok(url)
    }

    #[must_use]
    pub fn code_verifier(&self) -> Option<String> {
        self.code_verifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_code_verifier(&self, verifier: Option<String>) {
        *self
            .code_verifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = verifier;
    }

    /// Create a pending account. Never touches the cached session.
    #[instrument(skip(self, password, data))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        data: Metadata,
        redirect_to: &str,
    ) -> ProviderResult<User> {
        let pkce = PkcePair::generate();
        let user = self
            .backend
            .sign_up(SignUpParams {
                email: email.to_string(),
                password: password.to_string(),
                data,
                redirect_to: redirect_to.to_string(),
                code_challenge: Some(pkce.challenge),
            })
            .await?;
        self.set_code_verifier(Some(pkce.verifier));
        Ok(user)
    }

    /// Sign out with the provider. The local session is cleared and
    /// `SignedOut` emitted whatever the provider answers.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> ProviderResult<()> {
        let access_token = match self.current_session().await {
            Some(session) => Some(session.access_token),
            None => self.take_pending().map(|tokens| tokens.access_token),
        };

        let result = match access_token {
            Some(access_token) => self.backend.sign_out(&access_token).await,
            None => Ok(()),
        };
        self.store(None, SessionEvent::SignedOut).await;

        if let Err(err) = &result {
            warn!("Provider sign-out failed, local session cleared: {err}");
        }
        result
    }

    #[instrument(skip(self))]
    pub async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> ProviderResult<()> {
        self.backend.recover(email, redirect_to).await
    }

    /// Current session, refreshed when it is about to expire.
    pub async fn get_session(&self) -> ProviderResult<Option<Session>> {
        if let Some(session) = self.current_session().await {
            if session.expires_within(REFRESH_MARGIN) {
                return self.refresh_session().await.map(Some);
            }
            return Ok(Some(session));
        }

        let Some(tokens) = self.take_pending() else {
            return Ok(None);
        };
        match self.resolve(tokens).await {
            Ok(session) => {
                self.store(
                    Some(session.clone()),
                    SessionEvent::InitialSession(Some(session.clone())),
                )
                .await;
                Ok(Some(session))
            }
            Err(ProviderError::Unauthorized(message)) => {
                debug!("Forwarded session rejected: {message}");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Exchange the refresh token for a new session.
    ///
    /// A rejected refresh token clears the session and emits `SignedOut`.
    pub async fn refresh_session(&self) -> ProviderResult<Session> {
        let refresh_token = match self.current_session().await {
            Some(session) => session.refresh_token,
            None => self
                .take_pending()
                .map(|tokens| tokens.refresh_token)
                .ok_or_else(|| ProviderError::Unauthorized(SESSION_MISSING.to_string()))?,
        };

        match self.backend.refresh(&refresh_token).await {
            Ok(session) => {
                self.store(
                    Some(session.clone()),
                    SessionEvent::TokenRefreshed(session.clone()),
                )
                .await;
                Ok(session)
            }
            Err(err @ ProviderError::Unauthorized(_)) => {
                warn!("Session refresh rejected: {err}");
                self.store(None, SessionEvent::SignedOut).await;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Fetch the signed-in user from the provider, `None` when signed out.
    pub async fn get_user(&self) -> ProviderResult<Option<User>> {
        match self.get_session().await? {
            Some(session) => self.backend.get_user(&session.access_token).await.map(Some),
            None => Ok(None),
        }
    }

    async fn access_token(&self) -> ProviderResult<String> {
        self.get_session()
            .await?
            .map(|session| session.access_token)
            .ok_or_else(|| ProviderError::Unauthorized(SESSION_MISSING.to_string()))
    }

    /// Merge `data` into the user metadata; emits `UserUpdated`.
    #[instrument(skip(self, data))]
    pub async fn update_user(&self, data: Metadata) -> ProviderResult<User> {
        let access_token = self.access_token().await?;
        let user = self.backend.update_user(&access_token, data).await?;

        let mut guard = self.session.write().await;
        if let Some(session) = guard.as_mut() {
            session.user = user.clone();
        }
        let _ = self.events.send(SessionEvent::UserUpdated(user.clone()));
        drop(guard);

        Ok(user)
    }

    /// Trade a one-time authorization code for a session.
    #[instrument(skip(self, code))]
    pub async fn exchange_code_for_session(&self, code: &str) -> ProviderResult<Session> {
        let verifier = self.code_verifier();
        let session = self
            .backend
            .exchange_code(code, verifier.as_deref())
            .await?;
        self.set_code_verifier(None);
        self.set_session(session.clone()).await;
        Ok(session)
    }

    pub async fn insert_restaurant(&self, restaurant: &NewRestaurant) -> ProviderResult<()> {
        let access_token = self.access_token().await?;
        self.backend
            .insert_restaurant(&access_token, restaurant)
            .await
    }

    pub async fn upload_object(&self, object: ObjectUpload) -> ProviderResult<()> {
        let access_token = self.access_token().await?;
        self.backend.upload_object(&access_token, object).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{types::now_unix, MemoryBackend};
    use anyhow::Result;
    use serde_json::json;

    fn backend() -> Arc<MemoryBackend> {
        let backend = MemoryBackend::new();
        backend.add_user("chef@example.com", "secret123", Metadata::new());
        Arc::new(backend)
    }

    #[tokio::test]
    async fn expiring_session_is_refreshed() -> Result<()> {
        let backend = MemoryBackend::new().with_token_lifetime(Duration::from_secs(30));
        backend.add_user("chef@example.com", "secret123", Metadata::new());
        let client = ProviderClient::browser(Arc::new(backend));

        let session = client
            .sign_in_with_password("chef@example.com", "secret123")
            .await?;
        let current = client.get_session().await?;

        let Some(current) = current else {
            panic!("session should survive the refresh");
        };
        assert_ne!(current.access_token, session.access_token);
        assert_eq!(current.user.email, session.user.email);
        Ok(())
    }

    #[tokio::test]
    async fn sign_in_emits_signed_in() -> Result<()> {
        let client = ProviderClient::browser(backend());
        let mut events = client.on_auth_state_change();

        let session = client
            .sign_in_with_password("chef@example.com", "secret123")
            .await?;

        assert!(matches!(events.recv().await?, SessionEvent::SignedIn(_)));
        assert_eq!(client.current_session().await, Some(session));
        Ok(())
    }

    #[tokio::test]
    async fn sign_up_does_not_create_session() -> Result<()> {
        let client = ProviderClient::browser(backend());
        let mut events = client.on_auth_state_change();

        let user = client
            .sign_up("new@example.com", "secret123", Metadata::new(), "http://x/cb")
            .await?;

        assert_eq!(user.email.as_deref(), Some("new@example.com"));
        assert!(client.current_session().await.is_none());
        assert!(events.try_recv().is_err());
        assert!(client.code_verifier().is_some());
        Ok(())
    }

    #[tokio::test]
    async fn sign_out_clears_even_when_provider_fails() -> Result<()> {
        let backend = backend();
        let client = ProviderClient::browser(backend.clone());
        client
            .sign_in_with_password("chef@example.com", "secret123")
            .await?;
        let mut events = client.on_auth_state_change();

        backend.set_unavailable(true);
        assert!(client.sign_out().await.is_err());

        assert!(client.current_session().await.is_none());
        assert_eq!(events.recv().await?, SessionEvent::SignedOut);
        Ok(())
    }

    #[tokio::test]
    async fn server_client_resolves_forwarded_tokens() -> Result<()> {
        let backend = backend();
        let session = backend
            .sign_in_with_password("chef@example.com", "secret123")
            .await?;

        let client = ProviderClient::server(backend.clone(), Some(session.tokens()));
        let resolved = client.get_session().await?;
        assert_eq!(resolved.map(|s| s.user.id), Some(session.user.id));
        Ok(())
    }

    #[tokio::test]
    async fn forwarded_expiring_tokens_are_refreshed() -> Result<()> {
        let backend = backend();
        let session = backend
            .sign_in_with_password("chef@example.com", "secret123")
            .await?;
        let mut tokens = session.tokens();
        tokens.expires_at = now_unix() + 10;

        let client = ProviderClient::server(backend, Some(tokens));
        let resolved = client.get_session().await?;
        let resolved = resolved.ok_or_else(|| anyhow::anyhow!("expected a session"))?;
        assert_ne!(resolved.refresh_token, session.refresh_token);
        Ok(())
    }

    #[tokio::test]
    async fn stale_tokens_mean_signed_out() -> Result<()> {
        let tokens = StoredTokens {
            access_token: "nope".to_string(),
            refresh_token: "nope".to_string(),
            expires_at: now_unix() + 3600,
        };
        let client = ProviderClient::server(backend(), Some(tokens));
        assert!(client.get_session().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn refresh_without_session_is_unauthorized() {
        let client = ProviderClient::browser(backend());
        let err = client.refresh_session().await.err();
        assert!(matches!(err, Some(ProviderError::Unauthorized(msg)) if msg == SESSION_MISSING));
    }

    #[tokio::test]
    async fn update_user_emits_user_updated() -> Result<()> {
        let client = ProviderClient::browser(backend());
        client
            .sign_in_with_password("chef@example.com", "secret123")
            .await?;
        let mut events = client.on_auth_state_change();

        let mut data = Metadata::new();
        data.insert("language".to_string(), json!("it"));
        let user = client.update_user(data).await?;

        assert_eq!(user.metadata_str("language"), Some("it"));
        assert!(matches!(events.recv().await?, SessionEvent::UserUpdated(_)));
        let cached = client.current_session().await;
        assert_eq!(
            cached.as_ref().and_then(|s| s.user.metadata_str("language")),
            Some("it")
        );
        Ok(())
    }

    #[tokio::test]
    async fn oauth_round_trip_uses_verifier() -> Result<()> {
        let backend = backend();
        let client = ProviderClient::browser(backend.clone());
        let url = client.sign_in_with_oauth(OAuthProvider::Google, "http://localhost/auth/callback")?;
        let code = url
            .query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| anyhow::anyhow!("missing code"))?;

        let session = client.exchange_code_for_session(&code).await?;
        assert!(session.user.email.is_some());
        assert!(client.code_verifier().is_none());
        Ok(())
    }
}
