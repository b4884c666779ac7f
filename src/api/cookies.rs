//! Cookies carrying the browser context id and the provider session.

use crate::provider::{Session, StoredTokens};
use axum::http::{
    header::{InvalidHeaderValue, COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use tracing::error;

pub const CONTEXT_COOKIE: &str = "menuviz_ctx";
pub const ACCESS_TOKEN_COOKIE: &str = "menuviz-access-token";
pub const REFRESH_TOKEN_COOKIE: &str = "menuviz-refresh-token";
pub const EXPIRES_AT_COOKIE: &str = "menuviz-expires-at";
pub const CODE_VERIFIER_COOKIE: &str = "menuviz-code-verifier";

/// Session cookies outlive the access token; the refresh token renews it.
pub const SESSION_MAX_AGE: u64 = 60 * 60 * 24 * 30;
pub const CODE_VERIFIER_MAX_AGE: u64 = 60 * 10;

/// Value of cookie `name`, looking through every `Cookie` header.
#[must_use]
pub fn read(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            if key.trim() == name {
                let val = val.trim();
                return (!val.is_empty()).then(|| val.to_string());
            }
        }
    }
    None
}

/// Forwarded session tokens. A missing or unparsable expiry counts as
/// expired so the tokens get refreshed.
#[must_use]
pub fn stored_tokens(headers: &HeaderMap) -> Option<StoredTokens> {
    let access_token = read(headers, ACCESS_TOKEN_COOKIE)?;
    let refresh_token = read(headers, REFRESH_TOKEN_COOKIE)?;
    let expires_at = read(headers, EXPIRES_AT_COOKIE)
        .and_then(|value| value.parse().ok())
        .unwrap_or_default();
    Some(StoredTokens {
        access_token,
        refresh_token,
        expires_at,
    })
}

/// Build a `HttpOnly` cookie.
///
/// # Errors
///
/// Returns an error if `value` is not a valid header value.
pub fn cookie(
    name: &str,
    value: &str,
    max_age: u64,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Append a `Set-Cookie` header, logging values that can't be encoded.
pub fn append(headers: &mut HeaderMap, name: &str, value: &str, max_age: u64, secure: bool) {
    match cookie(name, value, max_age, secure) {
        Ok(cookie) => {
            headers.append(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build {name} cookie: {err}"),
    }
}

pub fn clear(headers: &mut HeaderMap, name: &str, secure: bool) {
    append(headers, name, "", 0, secure);
}

pub fn set_session(headers: &mut HeaderMap, session: &Session, secure: bool) {
    append(
        headers,
        ACCESS_TOKEN_COOKIE,
        &session.access_token,
        SESSION_MAX_AGE,
        secure,
    );
    append(
        headers,
        REFRESH_TOKEN_COOKIE,
        &session.refresh_token,
        SESSION_MAX_AGE,
        secure,
    );
    append(
        headers,
        EXPIRES_AT_COOKIE,
        &session.expires_at.to_string(),
        SESSION_MAX_AGE,
        secure,
    );
}

/// Re-issue the session cookies when `session` no longer matches the tokens
/// the request carried, e.g. after a refresh rotated them. Returns true when
/// cookies were written.
pub fn sync_session(
    headers: &mut HeaderMap,
    inbound: &HeaderMap,
    session: &Session,
    secure: bool,
) -> bool {
    let current = stored_tokens(inbound).is_some_and(|tokens| {
        tokens.access_token == session.access_token
            && tokens.refresh_token == session.refresh_token
            && tokens.expires_at == session.expires_at
    });
    if !current {
        set_session(headers, session, secure);
    }
    !current
}

pub fn clear_session(headers: &mut HeaderMap, secure: bool) {
    for name in [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, EXPIRES_AT_COOKIE] {
        clear(headers, name, secure);
    }
}
