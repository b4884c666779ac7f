//! In-process provider used for local development and tests.
//!
//! Federated logins are granted immediately: the authorize URL points
//! straight back at the callback with a fresh authorization code.

use super::{
    merge_metadata, pkce::challenge_for, types::now_unix, AuthBackend, Metadata, NewRestaurant,
    OAuthProvider, ObjectUpload, ProviderError, ProviderResult, Session, SignUpParams, User,
};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use url::Url;
use uuid::Uuid;

const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug)]
struct Account {
    id: String,
    email: String,
    password: String,
    confirmed: bool,
    metadata: Metadata,
}

impl Account {
    fn user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            user_metadata: self.metadata.clone(),
        }
    }
}

#[derive(Debug)]
struct Grant {
    email: String,
    expires_at: i64,
}

#[derive(Debug)]
struct Code {
    email: String,
    challenge: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<String, Account>,
    access: HashMap<String, Grant>,
    refresh: HashMap<String, String>,
    codes: HashMap<String, Code>,
    restaurants: Vec<NewRestaurant>,
    objects: HashMap<(String, String), ObjectUpload>,
    recoveries: Vec<(String, String)>,
    unavailable: bool,
    calls: usize,
}

impl State {
    fn issue(&mut self, email: &str, lifetime: Duration) -> ProviderResult<Session> {
        let user = self
            .accounts
            .get(email)
            .map(Account::user)
            .ok_or(ProviderError::InvalidCredentials)?;
        let access_token = Uuid::new_v4().simple().to_string();
        let refresh_token = Uuid::new_v4().simple().to_string();
        let expires_at = now_unix() + i64::try_from(lifetime.as_secs()).unwrap_or(3600);

        self.access.insert(
            access_token.clone(),
            Grant {
                email: email.to_string(),
                expires_at,
            },
        );
        self.refresh.insert(refresh_token.clone(), email.to_string());

        Ok(Session {
            access_token,
            refresh_token,
            expires_at,
            user,
        })
    }

    fn authorize(&self, access_token: &str) -> ProviderResult<String> {
        match self.access.get(access_token) {
            Some(grant) if grant.expires_at > now_unix() => Ok(grant.email.clone()),
            Some(_) => Err(ProviderError::Unauthorized(
                "invalid JWT: token is expired".to_string(),
            )),
            None => Err(ProviderError::Unauthorized(
                "invalid JWT: unable to parse or verify signature".to_string(),
            )),
        }
    }

    fn account_mut(&mut self, email: &str) -> ProviderResult<&mut Account> {
        self.accounts
            .get_mut(email)
            .ok_or_else(|| ProviderError::Unauthorized("User from sub claim in JWT does not exist".to_string()))
    }

    fn grant_code(&mut self, email: &str, challenge: Option<String>) -> String {
        let code = Uuid::new_v4().to_string();
        self.codes.insert(
            code.clone(),
            Code {
                email: email.to_string(),
                challenge,
            },
        );
        code
    }
}

#[derive(Debug)]
pub struct MemoryBackend {
    state: Mutex<State>,
    token_lifetime: Duration,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            token_lifetime: Duration::from_secs(3600),
        }
    }

    #[must_use]
    pub const fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the state for a provider call: counts it and honours the
    /// unavailable switch.
    fn enter(&self) -> ProviderResult<MutexGuard<'_, State>> {
        let mut state = self.lock();
        state.calls += 1;
        if state.unavailable {
            return Err(ProviderError::Unavailable(
                "memory provider switched off".to_string(),
            ));
        }
        Ok(state)
    }

    /// Register a confirmed account.
    pub fn add_user(&self, email: &str, password: &str, metadata: Metadata) -> User {
        let mut state = self.lock();
        let account = state
            .accounts
            .entry(email.to_lowercase())
            .or_insert_with(|| Account {
                id: Uuid::new_v4().to_string(),
                email: email.to_lowercase(),
                password: String::new(),
                confirmed: true,
                metadata: Metadata::new(),
            });
        account.password = password.to_string();
        account.confirmed = true;
        merge_metadata(&mut account.metadata, metadata);
        account.user()
    }

    /// Code carried by the confirmation link sent at sign-up.
    #[must_use]
    pub fn confirmation_code(&self, email: &str) -> Option<String> {
        let email = email.to_lowercase();
        self.lock()
            .codes
            .iter()
            .find(|(_, code)| code.email == email)
            .map(|(key, _)| key.clone())
    }

    /// Issue an authorization code for an existing account.
    pub fn grant_code(&self, email: &str, challenge: Option<String>) -> String {
        self.lock().grant_code(&email.to_lowercase(), challenge)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Number of provider calls served so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.lock().calls
    }

    #[must_use]
    pub fn restaurants(&self) -> Vec<NewRestaurant> {
        self.lock().restaurants.clone()
    }

    #[must_use]
    pub fn object(&self, bucket: &str, path: &str) -> Option<ObjectUpload> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
    }

    /// Password-reset requests as `(email, redirect_to)` pairs.
    #[must_use]
    pub fn recoveries(&self) -> Vec<(String, String)> {
        self.lock().recoveries.clone()
    }

    #[must_use]
    pub fn user(&self, email: &str) -> Option<User> {
        self.lock().accounts.get(&email.to_lowercase()).map(Account::user)
    }
}

#[async_trait]
impl AuthBackend for MemoryBackend {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> ProviderResult<Session> {
        let mut state = self.enter()?;
        let email = email.to_lowercase();
        match state.accounts.get(&email) {
            Some(account) if account.password == password => {
                if !account.confirmed {
                    return Err(ProviderError::Rejected {
                        status: 400,
                        message: "Email not confirmed".to_string(),
                    });
                }
            }
            _ => return Err(ProviderError::InvalidCredentials),
        }
        state.issue(&email, self.token_lifetime)
    }

    fn authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
        code_challenge: &str,
    ) -> ProviderResult<Url> {
        let mut url = Url::parse(redirect_to)
            .map_err(|err| ProviderError::Rejected {
                status: 400,
                message: format!("invalid redirect_to: {err}"),
            })?;

        let mut state = self.enter()?;
        let email = format!("{provider}.user@menuviz.local");
        state
            .accounts
            .entry(email.clone())
            .or_insert_with(|| Account {
                id: Uuid::new_v4().to_string(),
                email: email.clone(),
                password: Uuid::new_v4().to_string(),
                confirmed: true,
                metadata: Metadata::new(),
            });
        let code = state.grant_code(&email, Some(code_challenge.to_string()));

        url.query_pairs_mut().append_pair("code", &code);
        Ok(url)
    }

    async fn sign_up(&self, params: SignUpParams) -> ProviderResult<User> {
        let mut state = self.enter()?;
        if params.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ProviderError::WeakPassword(
                "Password should be at least 6 characters.".to_string(),
            ));
        }

        let email = params.email.to_lowercase();
        if state.accounts.contains_key(&email) {
            return Err(ProviderError::AlreadyRegistered);
        }

        let account = Account {
            id: Uuid::new_v4().to_string(),
            email: email.clone(),
            password: params.password,
            confirmed: false,
            metadata: params.data,
        };
        let user = account.user();
        state.accounts.insert(email.clone(), account);
        state.grant_code(&email, params.code_challenge);
        Ok(user)
    }

    async fn sign_out(&self, access_token: &str) -> ProviderResult<()> {
        let mut state = self.enter()?;
        let email = state.authorize(access_token)?;
        state.access.retain(|_, grant| grant.email != email);
        state.refresh.retain(|_, owner| *owner != email);
        Ok(())
    }

    async fn recover(&self, email: &str, redirect_to: &str) -> ProviderResult<()> {
        let mut state = self.enter()?;
        state
            .recoveries
            .push((email.to_lowercase(), redirect_to.to_string()));
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> ProviderResult<User> {
        let mut state = self.enter()?;
        let email = state.authorize(access_token)?;
        Ok(state.account_mut(&email)?.user())
    }

    async fn update_user(&self, access_token: &str, data: Metadata) -> ProviderResult<User> {
        let mut state = self.enter()?;
        let email = state.authorize(access_token)?;
        let account = state.account_mut(&email)?;
        merge_metadata(&mut account.metadata, data);
        Ok(account.user())
    }

    async fn refresh(&self, refresh_token: &str) -> ProviderResult<Session> {
        let mut state = self.enter()?;
        let email = state.refresh.remove(refresh_token).ok_or_else(|| {
            ProviderError::Unauthorized("Invalid Refresh Token: Refresh Token Not Found".to_string())
        })?;
        state.issue(&email, self.token_lifetime)
    }

    async fn exchange_code(&self, code: &str, verifier: Option<&str>) -> ProviderResult<Session> {
        let mut state = self.enter()?;
        let grant = state
            .codes
            .remove(code)
            .ok_or_else(|| ProviderError::Rejected {
                status: 404,
                message: "invalid flow state, no valid flow state found".to_string(),
            })?;

        if let Some(challenge) = &grant.challenge {
            if verifier.map(challenge_for).as_ref() != Some(challenge) {
                return Err(ProviderError::Rejected {
                    status: 400,
                    message: "code challenge does not match previously saved code verifier"
                        .to_string(),
                });
            }
        }

        state.account_mut(&grant.email)?.confirmed = true;
        state.issue(&grant.email, self.token_lifetime)
    }

    async fn insert_restaurant(
        &self,
        access_token: &str,
        restaurant: &NewRestaurant,
    ) -> ProviderResult<()> {
        let mut state = self.enter()?;
        let email = state.authorize(access_token)?;
        let owner = state.account_mut(&email)?.id.clone();
        if owner != restaurant.owner_id {
            return Err(ProviderError::Rejected {
                status: 403,
                message: "new row violates row-level security policy for table \"restaurants\""
                    .to_string(),
            });
        }
        state.restaurants.push(restaurant.clone());
        Ok(())
    }

    async fn upload_object(&self, access_token: &str, object: ObjectUpload) -> ProviderResult<()> {
        let mut state = self.enter()?;
        state.authorize(access_token)?;
        let key = (object.bucket.clone(), object.path.clone());
        if state.objects.contains_key(&key) {
            return Err(ProviderError::Rejected {
                status: 409,
                message: "The resource already exists".to_string(),
            });
        }
        state.objects.insert(key, object);
        Ok(())
    }

    async fn health(&self) -> ProviderResult<()> {
        self.enter().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn params(email: &str, password: &str) -> SignUpParams {
        SignUpParams {
            email: email.to_string(),
            password: password.to_string(),
            data: Metadata::new(),
            redirect_to: "http://localhost/auth/callback".to_string(),
            code_challenge: None,
        }
    }

    #[tokio::test]
    async fn unconfirmed_accounts_cannot_sign_in() -> Result<()> {
        let backend = MemoryBackend::new();
        backend.sign_up(params("new@example.com", "secret123")).await?;

        let err = backend
            .sign_in_with_password("new@example.com", "secret123")
            .await
            .err();
        assert!(matches!(err, Some(ProviderError::Rejected { status: 400, .. })));

        let code = backend
            .confirmation_code("new@example.com")
            .ok_or_else(|| anyhow::anyhow!("missing confirmation code"))?;
        backend.exchange_code(&code, None).await?;
        backend
            .sign_in_with_password("new@example.com", "secret123")
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn sign_up_rules() -> Result<()> {
        let backend = MemoryBackend::new();
        assert!(matches!(
            backend.sign_up(params("a@example.com", "123")).await,
            Err(ProviderError::WeakPassword(_))
        ));
        backend.sign_up(params("a@example.com", "secret123")).await?;
        assert!(matches!(
            backend.sign_up(params("A@example.com", "secret123")).await,
            Err(ProviderError::AlreadyRegistered)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let backend = MemoryBackend::new();
        backend.add_user("chef@example.com", "secret123", Metadata::new());
        assert!(matches!(
            backend.sign_in_with_password("chef@example.com", "nope").await,
            Err(ProviderError::InvalidCredentials)
        ));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn refresh_rotates_tokens() -> Result<()> {
        let backend = MemoryBackend::new();
        backend.add_user("chef@example.com", "secret123", Metadata::new());
        let session = backend
            .sign_in_with_password("chef@example.com", "secret123")
            .await?;

        let refreshed = backend.refresh(&session.refresh_token).await?;
        assert_ne!(refreshed.access_token, session.access_token);
        assert!(matches!(
            backend.refresh(&session.refresh_token).await,
            Err(ProviderError::Unauthorized(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn code_exchange_checks_verifier() {
        let backend = MemoryBackend::new();
        backend.add_user("chef@example.com", "secret123", Metadata::new());
        let code = backend.grant_code("chef@example.com", Some(challenge_for("right")));
        assert!(backend.exchange_code(&code, Some("wrong")).await.is_err());

        let code = backend.grant_code("chef@example.com", Some(challenge_for("right")));
        assert!(backend.exchange_code(&code, Some("right")).await.is_ok());
    }

    #[tokio::test]
    async fn restaurant_owner_must_match_token() -> Result<()> {
        let backend = MemoryBackend::new();
        let user = backend.add_user("chef@example.com", "secret123", Metadata::new());
        let session = backend
            .sign_in_with_password("chef@example.com", "secret123")
            .await?;

        let mut restaurant = NewRestaurant {
            name: "Trattoria".to_string(),
            owner_id: "someone-else".to_string(),
            ..NewRestaurant::default()
        };
        assert!(backend
            .insert_restaurant(&session.access_token, &restaurant)
            .await
            .is_err());

        restaurant.owner_id = user.id;
        backend
            .insert_restaurant(&session.access_token, &restaurant)
            .await?;
        assert_eq!(backend.restaurants(), vec![restaurant]);
        Ok(())
    }

    #[tokio::test]
    async fn unavailable_switch() {
        let backend = MemoryBackend::new();
        backend.set_unavailable(true);
        assert!(matches!(
            backend.health().await,
            Err(ProviderError::Unavailable(_))
        ));
        backend.set_unavailable(false);
        assert!(backend.health().await.is_ok());
    }
}
