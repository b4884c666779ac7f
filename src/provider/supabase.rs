//! Supabase-compatible REST backend (GoTrue auth, PostgREST rows, storage).

use super::{
    types::now_unix, AuthBackend, Metadata, NewRestaurant, OAuthProvider, ObjectUpload,
    ProviderError, ProviderResult, Session, SignUpParams, User,
};
use crate::APP_USER_AGENT;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{fmt, time::Duration};
use tracing::{debug, instrument};
use url::Url;

const DEFAULT_EXPIRES_IN: i64 = 3600;

#[derive(Clone)]
pub struct SupabaseBackend {
    base: Url,
    api_key: SecretString,
    http: Client,
}

impl fmt::Debug for SupabaseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseBackend")
            .field("base", &self.base.as_str())
            .field("api_key", &"***")
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl From<TokenResponse> for Session {
    fn from(token: TokenResponse) -> Self {
        let expires_at = token
            .expires_at
            .unwrap_or_else(|| now_unix() + token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN));
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            user: token.user,
        }
    }
}

impl SupabaseBackend {
    /// # Errors
    ///
    /// Fails when `base_url` is not a valid URL or the HTTP client can't be built.
    pub fn new(base_url: &str, api_key: SecretString) -> Result<Self> {
        let mut base = Url::parse(base_url).context("Invalid provider URL")?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build provider HTTP client")?;

        Ok(Self {
            base,
            api_key,
            http,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> ProviderResult<Url> {
        self.base
            .join(path)
            .map_err(|err| ProviderError::InvalidResponse(format!("bad endpoint {path}: {err}")))
    }

    fn request(&self, method: Method, url: Url, bearer: Option<&str>) -> RequestBuilder {
        let key = self.api_key.expose_secret();
        self.http
            .request(method, url)
            .header("apikey", key)
            .bearer_auth(bearer.unwrap_or(key))
    }

    async fn send(builder: RequestBuilder) -> ProviderResult<Response> {
        let response = builder.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn error_from(response: Response) -> ProviderError {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let field = |key: &str| body.get(key).and_then(Value::as_str);

        let message = field("msg")
            .or_else(|| field("error_description"))
            .or_else(|| field("message"))
            .or_else(|| field("error"))
            .map_or_else(
                || status.canonical_reason().unwrap_or("request failed").to_string(),
                str::to_string,
            );

        debug!(status = status.as_u16(), error_code = ?field("error_code"), "provider error: {message}");
        ProviderError::from_response(status.as_u16(), field("error_code"), message)
    }

    async fn token(&self, grant_type: &str, body: Value) -> ProviderResult<Session> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let response = Self::send(self.request(Method::POST, url, None).json(&body)).await?;
        let token: TokenResponse = response.json().await?;
        Ok(token.into())
    }
}

#[async_trait]
impl AuthBackend for SupabaseBackend {
    #[instrument(skip(self, password))]
    async fn sign_in_with_password(&self, email: &str, password: &str) -> ProviderResult<Session> {
        self.token("password", json!({ "email": email, "password": password }))
            .await
    }

    fn authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
        code_challenge: &str,
    ) -> ProviderResult<Url> {
        let mut url = self.endpoint("auth/v1/authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", provider.as_str())
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "s256");
        Ok(url)
    }

    #[instrument(skip(self, params), fields(email = %params.email))]
    async fn sign_up(&self, params: SignUpParams) -> ProviderResult<User> {
        let mut url = self.endpoint("auth/v1/signup")?;
        url.query_pairs_mut()
            .append_pair("redirect_to", &params.redirect_to);

        let mut body = json!({
            "email": params.email,
            "password": params.password,
            "data": params.data,
        });
        if let Some(challenge) = params.code_challenge {
            body["code_challenge"] = json!(challenge);
            body["code_challenge_method"] = json!("s256");
        }

        let response = Self::send(self.request(Method::POST, url, None).json(&body)).await?;

        // With autoconfirm enabled the body is a session wrapping the user;
        // the session is ignored, sign-up never signs in.
        let mut value: Value = response.json().await?;
        let user = value.get_mut("user").map(Value::take).unwrap_or(value);
        serde_json::from_value(user).map_err(|err| ProviderError::InvalidResponse(err.to_string()))
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> ProviderResult<()> {
        let url = self.endpoint("auth/v1/logout")?;
        Self::send(self.request(Method::POST, url, Some(access_token))).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn recover(&self, email: &str, redirect_to: &str) -> ProviderResult<()> {
        let mut url = self.endpoint("auth/v1/recover")?;
        url.query_pairs_mut().append_pair("redirect_to", redirect_to);
        Self::send(
            self.request(Method::POST, url, None)
                .json(&json!({ "email": email })),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn get_user(&self, access_token: &str) -> ProviderResult<User> {
        let url = self.endpoint("auth/v1/user")?;
        let response = Self::send(self.request(Method::GET, url, Some(access_token))).await?;
        Ok(response.json().await?)
    }

    #[instrument(skip_all)]
    async fn update_user(&self, access_token: &str, data: Metadata) -> ProviderResult<User> {
        let url = self.endpoint("auth/v1/user")?;
        let response = Self::send(
            self.request(Method::PUT, url, Some(access_token))
                .json(&json!({ "data": data })),
        )
        .await?;
        Ok(response.json().await?)
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> ProviderResult<Session> {
        self.token("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    #[instrument(skip_all)]
    async fn exchange_code(&self, code: &str, verifier: Option<&str>) -> ProviderResult<Session> {
        self.token(
            "pkce",
            json!({ "auth_code": code, "code_verifier": verifier.unwrap_or_default() }),
        )
        .await
    }

    #[instrument(skip(self, access_token))]
    async fn insert_restaurant(
        &self,
        access_token: &str,
        restaurant: &NewRestaurant,
    ) -> ProviderResult<()> {
        let url = self.endpoint("rest/v1/restaurants")?;
        Self::send(
            self.request(Method::POST, url, Some(access_token))
                .header("Prefer", "return=minimal")
                .json(restaurant),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, access_token))]
    async fn upload_object(&self, access_token: &str, object: ObjectUpload) -> ProviderResult<()> {
        let mut url = self.endpoint("storage/v1/object")?;
        url.path_segments_mut()
            .map_err(|()| ProviderError::InvalidResponse(format!("bad storage URL under {}", self.base)))?
            .push(&object.bucket)
            .push(&object.path);
        Self::send(
            self.request(Method::POST, url, Some(access_token))
                .header(CONTENT_TYPE, object.content_type)
                .body(object.bytes),
        )
        .await?;
        Ok(())
    }

    async fn health(&self) -> ProviderResult<()> {
        let url = self.endpoint("auth/v1/health")?;
        Self::send(self.request(Method::GET, url, None)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> Result<SupabaseBackend> {
        SupabaseBackend::new(base, SecretString::from("anon-key".to_string()))
    }

    #[test]
    fn base_url_gets_trailing_slash() -> Result<()> {
        let backend = backend("http://localhost:54321/project")?;
        assert_eq!(backend.base_url().as_str(), "http://localhost:54321/project/");
        Ok(())
    }

    #[test]
    fn authorize_url_carries_pkce_challenge() -> Result<()> {
        let backend = backend("http://localhost:54321")?;
        let url = backend.authorize_url(
            OAuthProvider::Azure,
            "https://menuviz.app/auth/callback",
            "challenge",
        )?;
        assert_eq!(url.path(), "/auth/v1/authorize");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("provider".to_string(), "azure".to_string())));
        assert!(query.contains(&(
            "redirect_to".to_string(),
            "https://menuviz.app/auth/callback".to_string()
        )));
        assert!(query.contains(&("code_challenge_method".to_string(), "s256".to_string())));
        Ok(())
    }

    #[test]
    fn debug_hides_api_key() -> Result<()> {
        let backend = backend("http://localhost:54321")?;
        assert!(!format!("{backend:?}").contains("anon-key"));
        Ok(())
    }

    #[test]
    fn token_response_computes_expiry() {
        let session: Session = TokenResponse {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_in: Some(120),
            expires_at: None,
            user: User {
                id: "1".to_string(),
                email: None,
                user_metadata: Metadata::new(),
            },
        }
        .into();
        let remaining = session.expires_at - now_unix();
        assert!((119..=120).contains(&remaining));
    }
}
