//! Provider boundary: the hosted auth, row and file storage service.
//!
//! [`AuthBackend`] is the network seam. [`SupabaseBackend`] talks to a
//! Supabase-compatible REST API, [`MemoryBackend`] keeps everything in
//! process. [`ProviderClient`] wraps a backend with a cached session and a
//! session-change event channel.

use async_trait::async_trait;
use std::fmt::Debug;
use url::Url;

pub mod client;
pub mod error;
pub mod memory;
pub mod pkce;
pub mod supabase;
pub mod types;

pub use client::{ClientScope, ProviderClient, REFRESH_MARGIN};
pub use error::ProviderError;
pub use memory::MemoryBackend;
pub use supabase::SupabaseBackend;
pub use types::{
    merge_metadata, Metadata, NewRestaurant, OAuthProvider, ObjectUpload, Session, SessionEvent,
    SignUpParams, StoredTokens, User,
};

pub type ProviderResult<T> = Result<T, ProviderError>;

#[async_trait]
pub trait AuthBackend: Send + Sync + Debug {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> ProviderResult<Session>;

    /// URL the browser is sent to for a federated login.
    fn authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
        code_challenge: &str,
    ) -> ProviderResult<Url>;

    /// Create a pending account; confirmation happens out of band by email.
    async fn sign_up(&self, params: SignUpParams) -> ProviderResult<User>;

    async fn sign_out(&self, access_token: &str) -> ProviderResult<()>;

    async fn recover(&self, email: &str, redirect_to: &str) -> ProviderResult<()>;

    async fn get_user(&self, access_token: &str) -> ProviderResult<User>;

    /// Merge `data` into the user's metadata and return the updated user.
    async fn update_user(&self, access_token: &str, data: Metadata) -> ProviderResult<User>;

    async fn refresh(&self, refresh_token: &str) -> ProviderResult<Session>;

    async fn exchange_code(&self, code: &str, verifier: Option<&str>) -> ProviderResult<Session>;

    async fn insert_restaurant(
        &self,
        access_token: &str,
        restaurant: &NewRestaurant,
    ) -> ProviderResult<()>;

    async fn upload_object(&self, access_token: &str, object: ObjectUpload) -> ProviderResult<()>;

    async fn health(&self) -> ProviderResult<()>;
}
