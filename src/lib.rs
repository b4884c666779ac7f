//! # MenuViz (landing site, onboarding and auth)
//!
//! `menuviz` serves the marketing site of the MenuViz restaurant menu
//! visualization product together with its sign-up, login, email verification
//! and restaurant onboarding flows.
//!
//! ## Provider
//!
//! Authentication, row storage and file storage are delegated to a hosted
//! backend-as-a-service (Supabase-compatible REST API). The [`provider`]
//! module wraps it behind the [`provider::AuthBackend`] trait; an in-memory
//! backend is available for local development (`--backend memory`).
//!
//! ## Browser contexts
//!
//! A browser gets a context (cookie `menuviz_ctx`) the first time it calls an
//! auth route. The context holds its own [`provider::ProviderClient`] and
//! [`auth::AuthCoordinator`]. The client emits session-change events on a
//! channel and the coordinator is its consumer: the latest event always wins,
//! and sign-in/sign-out ask the page to refresh. Read-only pages never create
//! a context; without one they read the session cookies directly. Whenever a
//! refresh rotates the tokens, the session cookies are rewritten.
//!
//! ## Operations
//!
//! Besides the HTTP server the binary applies SQL migrations (`migrate`) and
//! writes placeholder menu images (`generate-images`).

pub mod api;
pub mod assets;
pub mod auth;
pub mod chrome;
pub mod cli;
pub mod migrate;
pub mod onboarding;
pub mod provider;
pub mod verify;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
