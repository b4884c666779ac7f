//! Provider data model: sessions, users, metadata and session-change events.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    fmt,
    str::FromStr,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use utoipa::ToSchema;

/// Free-form per-user key/value data ("user metadata").
pub type Metadata = Map<String, Value>;

/// Merge `update` into `bag` key by key; keys absent from `update` are kept.
pub fn merge_metadata(bag: &mut Metadata, update: Metadata) {
    for (key, value) in update {
        bag.insert(key, value);
    }
}

#[derive(ToSchema, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub user_metadata: Metadata,
}

impl User {
    /// String metadata value, if present.
    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.user_metadata.get(key).and_then(Value::as_str)
    }
}

/// Provider-issued credentials for one browser context.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) at which the access token expires.
    pub expires_at: i64,
    pub user: User,
}

impl Session {
    /// True when the access token expires within `margin` from now.
    #[must_use]
    pub fn expires_within(&self, margin: Duration) -> bool {
        expires_within(self.expires_at, margin)
    }

    #[must_use]
    pub fn tokens(&self) -> StoredTokens {
        StoredTokens {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_at: self.expires_at,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Session tokens as forwarded by the browser (cookies), not yet validated.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

impl StoredTokens {
    #[must_use]
    pub fn expires_within(&self, margin: Duration) -> bool {
        expires_within(self.expires_at, margin)
    }
}

impl fmt::Debug for StoredTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredTokens")
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

pub(crate) fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|elapsed| i64::try_from(elapsed.as_secs()).ok())
        .unwrap_or(0)
}

fn expires_within(expires_at: i64, margin: Duration) -> bool {
    let margin = i64::try_from(margin.as_secs()).unwrap_or(i64::MAX);
    now_unix().saturating_add(margin) >= expires_at
}

/// Federated identity providers offered on the login page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Azure,
}

impl OAuthProvider {
    /// Provider name understood by the auth API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Azure => "azure",
        }
    }
}

impl FromStr for OAuthProvider {
    type Err = String;

    // The login page says "microsoft"; the auth API calls it "azure".
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "microsoft" | "azure" => Ok(Self::Azure),
            other => Err(format!("unsupported provider: {other}")),
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session-change notification pushed by a [`super::ProviderClient`].
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    InitialSession(Option<Session>),
    SignedIn(Session),
    SignedOut,
    TokenRefreshed(Session),
    UserUpdated(User),
}

impl SessionEvent {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::InitialSession(_) => "INITIAL_SESSION",
            Self::SignedIn(_) => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::TokenRefreshed(_) => "TOKEN_REFRESHED",
            Self::UserUpdated(_) => "USER_UPDATED",
        }
    }

    /// The user carried by the event; `None` means nobody is signed in.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::InitialSession(session) => session.as_ref().map(|session| &session.user),
            Self::SignedIn(session) | Self::TokenRefreshed(session) => Some(&session.user),
            Self::UserUpdated(user) => Some(user),
            Self::SignedOut => None,
        }
    }
}

/// Sign-up request forwarded to the auth API.
#[derive(Clone)]
pub struct SignUpParams {
    pub email: String,
    pub password: String,
    pub data: Metadata,
    /// Where the confirmation link lands.
    pub redirect_to: String,
    pub code_challenge: Option<String>,
}

impl fmt::Debug for SignUpParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignUpParams")
            .field("email", &self.email)
            .field("password", &"***")
            .field("data", &self.data)
            .field("redirect_to", &self.redirect_to)
            .finish_non_exhaustive()
    }
}

/// Row inserted into the `restaurants` table during onboarding.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRestaurant {
    pub name: String,
    pub description: String,
    pub address: String,
    pub phone: String,
    pub website: String,
    pub owner_id: String,
}

/// A single object written to a storage bucket.
#[derive(Clone, PartialEq, Eq)]
pub struct ObjectUpload {
    pub bucket: String,
    pub path: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for ObjectUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectUpload")
            .field("bucket", &self.bucket)
            .field("path", &self.path)
            .field("content_type", &self.content_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user() -> User {
        User {
            id: "b7c1".to_string(),
            email: Some("chef@example.com".to_string()),
            user_metadata: Metadata::new(),
        }
    }

    #[test]
    fn merge_keeps_untouched_keys() {
        let mut bag = Metadata::new();
        bag.insert("restaurantName".to_string(), json!("Trattoria"));
        bag.insert("language".to_string(), json!("en"));

        let mut update = Metadata::new();
        update.insert("language".to_string(), json!("it"));
        merge_metadata(&mut bag, update);

        assert_eq!(bag.get("restaurantName"), Some(&json!("Trattoria")));
        assert_eq!(bag.get("language"), Some(&json!("it")));
    }

    #[test]
    fn session_debug_redacts_tokens() {
        let session = Session {
            access_token: "secret-access".to_string(),
            refresh_token: "secret-refresh".to_string(),
            expires_at: 0,
            user: user(),
        };
        let debug = format!("{session:?}");
        assert!(!debug.contains("secret-access"));
        assert!(!debug.contains("secret-refresh"));
    }

    #[test]
    fn session_expiry_margin() {
        let mut session = Session {
            access_token: String::new(),
            refresh_token: String::new(),
            expires_at: now_unix() + 30,
            user: user(),
        };
        assert!(session.expires_within(Duration::from_secs(60)));
        session.expires_at = now_unix() + 3600;
        assert!(!session.expires_within(Duration::from_secs(60)));
    }

    #[test]
    fn login_choices_map_to_provider_names() {
        assert_eq!("google".parse::<OAuthProvider>(), Ok(OAuthProvider::Google));
        assert_eq!("microsoft".parse::<OAuthProvider>(), Ok(OAuthProvider::Azure));
        assert_eq!(OAuthProvider::Azure.as_str(), "azure");
        assert!("github".parse::<OAuthProvider>().is_err());
    }

    #[test]
    fn event_user_follows_session() {
        assert!(SessionEvent::SignedOut.user().is_none());
        assert!(SessionEvent::InitialSession(None).user().is_none());
        let event = SessionEvent::UserUpdated(user());
        assert_eq!(event.user().map(|user| user.id.as_str()), Some("b7c1"));
        assert_eq!(event.name(), "USER_UPDATED");
    }
}
