//! Per-browser-context session coordinator.
//!
//! The coordinator never writes the user snapshot from its own calls: the
//! provider client emits a [`SessionEvent`] for every session change and the
//! subscription task applies them in order (last write wins).

use super::{AuthError, Navigator, Notices, UserPreferences};
use crate::provider::{Metadata, OAuthProvider, ProviderClient, SessionEvent, User};
use serde::Serialize;
use std::sync::Arc;
use tokio::{
    sync::{broadcast::error::RecvError, watch},
    task::JoinHandle,
};
use tracing::{debug, warn};
use url::Url;
use utoipa::ToSchema;

pub const DASHBOARD_PATH: &str = "/dashboard";
pub const ONBOARDING_PATH: &str = "/dashboard/onboarding";

#[derive(ToSchema, Clone, Debug, PartialEq, Serialize)]
pub struct AuthSnapshot {
    pub user: Option<User>,
    /// True until the first session event has been applied.
    pub loading: bool,
}

#[derive(Debug)]
pub struct AuthCoordinator {
    client: Arc<ProviderClient>,
    navigator: Arc<dyn Navigator>,
    notices: Arc<Notices>,
    origin: String,
    state: watch::Sender<AuthSnapshot>,
}

/// Live event subscription; dropping it also stops the listener.
#[derive(Debug)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Stop listening. Once this returns the snapshot no longer changes.
    pub async fn unsubscribe(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl AuthCoordinator {
    /// `origin` is the public site origin used to build email and OAuth
    /// redirect targets (`https://menuviz.app`, no trailing slash).
    pub fn new(
        client: Arc<ProviderClient>,
        navigator: Arc<dyn Navigator>,
        notices: Arc<Notices>,
        origin: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(AuthSnapshot {
            user: None,
            loading: true,
        });
        Self {
            client,
            navigator,
            notices,
            origin: origin.into().trim_end_matches('/').to_string(),
            state,
        }
    }

    #[must_use]
    pub fn client(&self) -> &Arc<ProviderClient> {
        &self.client
    }

    #[must_use]
    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    #[must_use]
    pub fn notices(&self) -> &Arc<Notices> {
        &self.notices
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Start consuming the client's session-change events.
    ///
    /// The receiver is registered before this returns, so events emitted
    /// right after (e.g. by hydration) are not missed.
    #[must_use]
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let mut events = self.client.on_auth_state_change();
        let coordinator = Arc::clone(self);

        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => coordinator.apply(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Session events lagged, resynchronising");
                        let user = coordinator
                            .client
                            .current_session()
                            .await
                            .map(|session| session.user);
                        coordinator.set_user(user);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Subscription { task: Some(task) }
    }

    fn apply(&self, event: &SessionEvent) {
        debug!(event = event.name(), "applying session event");
        self.set_user(event.user().cloned());
        if matches!(event, SessionEvent::SignedIn(_) | SessionEvent::SignedOut) {
            self.navigator.refresh();
        }
    }

    fn set_user(&self, user: Option<User>) {
        self.state.send_replace(AuthSnapshot {
            user,
            loading: false,
        });
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn watch(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    /// Wait until the first session event has been applied.
    pub async fn ready(&self) -> AuthSnapshot {
        let mut receiver = self.state.subscribe();
        let settled = receiver
            .wait_for(|snapshot| !snapshot.loading)
            .await
            .map(|snapshot| snapshot.clone());
        settled.unwrap_or_else(|_| self.snapshot())
    }

    #[must_use]
    pub fn preferences(&self) -> Option<UserPreferences> {
        self.state
            .borrow()
            .user
            .as_ref()
            .map(|user| UserPreferences::from_metadata(&user.user_metadata))
    }

    fn fail(&self, err: impl Into<AuthError>) -> AuthError {
        let err = err.into();
        self.notices.error(err.to_string());
        err
    }

    /// Password sign-in. With `remember_me` the fresh session is refreshed
    /// once more; a failure there is only logged.
    ///
    /// # Errors
    ///
    /// Returns the provider error after recording it as a notice.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<User, AuthError> {
        let session = self
            .client
            .sign_in_with_password(email, password)
            .await
            .map_err(|err| self.fail(err))?;

        if remember_me {
            if let Err(err) = self.client.refresh_session().await {
                warn!("Remember-me refresh failed: {err}");
            }
        }

        self.navigator.push(DASHBOARD_PATH);
        self.notices.success("Welcome back!");
        Ok(session.user)
    }

    /// Send the browser to the provider's consent page. The session arrives
    /// later through the callback.
    ///
    /// # Errors
    ///
    /// Returns the provider error after recording it as a notice.
    pub fn sign_in_with_provider(&self, provider: OAuthProvider) -> Result<Url, AuthError> {
        let redirect_to = format!("{}/auth/callback", self.origin);
        let url = self
            .client
            .sign_in_with_oauth(provider, &redirect_to)
            .map_err(|err| self.fail(err))?;
        self.navigator.push(url.as_str());
        Ok(url)
    }

    /// Create a pending account; the user confirms it from the email link.
    ///
    /// # Errors
    ///
    /// Returns the provider error after recording it as a notice.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Metadata,
    ) -> Result<User, AuthError> {
        let redirect_to = format!("{}/auth/callback?next={ONBOARDING_PATH}", self.origin);
        let user = self
            .client
            .sign_up(email, password, metadata, &redirect_to)
            .await
            .map_err(|err| self.fail(err))?;
        self.notices.success("Check your email to confirm your account");
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns the provider error after recording it as a notice; the local
    /// session is cleared either way.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.client.sign_out().await.map_err(|err| self.fail(err))?;
        self.navigator.push("/");
        self.notices.success("Signed out successfully");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the provider error after recording it as a notice.
    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        let redirect_to = format!("{}/reset-password", self.origin);
        self.client
            .reset_password_for_email(email, &redirect_to)
            .await
            .map_err(|err| self.fail(err))?;
        self.notices.success("Check your email for the reset link");
        Ok(())
    }

    /// Merge the set fields of `preferences` into the user metadata.
    ///
    /// # Errors
    ///
    /// [`AuthError::NoActiveSession`] when nobody is signed in, otherwise the
    /// provider error. Both are recorded as notices.
    pub async fn update_preferences(
        &self,
        preferences: &UserPreferences,
    ) -> Result<User, AuthError> {
        if self.state.borrow().user.is_none() {
            return Err(self.fail(AuthError::NoActiveSession));
        }

        let user = self
            .client
            .update_user(preferences.to_metadata())
            .await
            .map_err(|err| self.fail(err))?;
        self.notices.success("Preferences updated successfully");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{AuthErrorKind, NoticeLevel, PageNavigator},
        provider::MemoryBackend,
    };
    use anyhow::Result;
    use std::time::Duration;
    use tokio::time::timeout;

    struct Fixture {
        backend: Arc<MemoryBackend>,
        navigator: Arc<PageNavigator>,
        coordinator: Arc<AuthCoordinator>,
        subscription: Subscription,
    }

    async fn fixture() -> Fixture {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_user("chef@example.com", "secret123", Metadata::new());
        let client = Arc::new(ProviderClient::browser(backend.clone()));
        let navigator = Arc::new(PageNavigator::new());
        let coordinator = Arc::new(AuthCoordinator::new(
            client.clone(),
            navigator.clone(),
            Arc::new(Notices::new()),
            "http://localhost:8080/",
        ));
        let subscription = coordinator.subscribe();
        client.hydrate(None).await;
        coordinator.ready().await;
        Fixture {
            backend,
            navigator,
            coordinator,
            subscription,
        }
    }

    async fn wait_for_user(coordinator: &AuthCoordinator, signed_in: bool) -> Result<()> {
        let mut receiver = coordinator.watch();
        timeout(
            Duration::from_secs(1),
            receiver.wait_for(|snapshot| snapshot.user.is_some() == signed_in),
        )
        .await??;
        Ok(())
    }

    #[tokio::test]
    async fn hydration_ends_loading() {
        let fixture = fixture().await;
        let snapshot = fixture.coordinator.snapshot();
        assert!(!snapshot.loading);
        assert!(snapshot.user.is_none());
    }

    #[tokio::test]
    async fn sign_in_navigates_once_to_dashboard() -> Result<()> {
        let fixture = fixture().await;
        fixture
            .coordinator
            .sign_in("chef@example.com", "secret123", false)
            .await?;
        wait_for_user(&fixture.coordinator, true).await?;

        assert_eq!(fixture.navigator.history(), vec![DASHBOARD_PATH.to_string()]);
        let notices = fixture.coordinator.notices().drain();
        assert!(notices.iter().all(|notice| notice.level == NoticeLevel::Success));
        assert_eq!(notices[0].message, "Welcome back!");
        Ok(())
    }

    #[tokio::test]
    async fn signed_in_event_refreshes_page() -> Result<()> {
        let fixture = fixture().await;
        fixture
            .coordinator
            .sign_in("chef@example.com", "secret123", true)
            .await?;
        wait_for_user(&fixture.coordinator, true).await?;
        assert!(fixture.navigator.refresh_count() >= 1);
        Ok(())
    }

    #[tokio::test]
    async fn bad_password_records_error() {
        let fixture = fixture().await;
        let err = fixture
            .coordinator
            .sign_in("chef@example.com", "wrong", false)
            .await
            .err();

        assert_eq!(err.map(|err| err.kind()), Some(AuthErrorKind::InvalidCredentials));
        assert!(fixture.navigator.history().is_empty());
        let notices = fixture.coordinator.notices().drain();
        assert_eq!(notices[0].level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn sign_up_never_authenticates() -> Result<()> {
        let fixture = fixture().await;
        let mut metadata = Metadata::new();
        metadata.insert("restaurantName".to_string(), "Trattoria".into());
        let user = fixture
            .coordinator
            .sign_up("new@example.com", "secret123", metadata)
            .await?;

        assert_eq!(user.metadata_str("restaurantName"), Some("Trattoria"));
        assert!(fixture.coordinator.client().current_session().await.is_none());
        assert!(fixture.coordinator.snapshot().user.is_none());
        assert!(fixture.navigator.history().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn provider_login_targets_callback() -> Result<()> {
        let fixture = fixture().await;
        let url = fixture
            .coordinator
            .sign_in_with_provider(OAuthProvider::Google)?;
        assert!(url
            .as_str()
            .starts_with("http://localhost:8080/auth/callback?code="));
        assert_eq!(fixture.navigator.history(), vec![url.to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn sign_out_goes_home() -> Result<()> {
        let fixture = fixture().await;
        fixture
            .coordinator
            .sign_in("chef@example.com", "secret123", false)
            .await?;
        wait_for_user(&fixture.coordinator, true).await?;

        fixture.coordinator.sign_out().await?;
        wait_for_user(&fixture.coordinator, false).await?;
        assert_eq!(fixture.navigator.history().last().map(String::as_str), Some("/"));
        Ok(())
    }

    #[tokio::test]
    async fn reset_password_targets_reset_page() -> Result<()> {
        let fixture = fixture().await;
        fixture.coordinator.reset_password("chef@example.com").await?;
        assert_eq!(
            fixture.backend.recoveries(),
            vec![(
                "chef@example.com".to_string(),
                "http://localhost:8080/reset-password".to_string()
            )]
        );
        Ok(())
    }

    #[tokio::test]
    async fn preferences_need_a_user() {
        let fixture = fixture().await;
        let calls = fixture.backend.call_count();
        let err = fixture
            .coordinator
            .update_preferences(&UserPreferences::default())
            .await
            .err();
        assert!(matches!(err, Some(AuthError::NoActiveSession)));
        assert_eq!(fixture.backend.call_count(), calls);
    }

    #[tokio::test]
    async fn update_preferences_is_idempotent() -> Result<()> {
        let fixture = fixture().await;
        fixture
            .coordinator
            .sign_in("chef@example.com", "secret123", false)
            .await?;
        wait_for_user(&fixture.coordinator, true).await?;

        let prefs = UserPreferences {
            language: Some("it".to_string()),
            dark_mode: Some(true),
            ..UserPreferences::default()
        };
        let once = fixture.coordinator.update_preferences(&prefs).await?;
        let twice = fixture.coordinator.update_preferences(&prefs).await?;
        assert_eq!(once.user_metadata, twice.user_metadata);

        let mut receiver = fixture.coordinator.watch();
        timeout(
            Duration::from_secs(1),
            receiver.wait_for(|snapshot| {
                snapshot
                    .user
                    .as_ref()
                    .and_then(|user| user.metadata_str("language"))
                    == Some("it")
            }),
        )
        .await??;
        assert_eq!(fixture.coordinator.preferences(), Some(prefs));
        Ok(())
    }

    #[tokio::test]
    async fn no_updates_after_unsubscribe() -> Result<()> {
        let fixture = fixture().await;
        fixture.subscription.unsubscribe().await;

        fixture
            .coordinator
            .client()
            .sign_in_with_password("chef@example.com", "secret123")
            .await?;
        tokio::task::yield_now().await;

        assert!(fixture.coordinator.snapshot().user.is_none());
        assert_eq!(fixture.navigator.refresh_count(), 0);
        Ok(())
    }
}
