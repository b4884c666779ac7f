use secrecy::SecretString;
use std::fmt;

/// Connection settings for the hosted auth provider.
#[derive(Clone)]
pub struct GlobalArgs {
    pub provider_url: String,
    pub provider_key: SecretString,
}

impl fmt::Debug for GlobalArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalArgs")
            .field("provider_url", &self.provider_url)
            .field("provider_key", &"***")
            .finish()
    }
}

impl GlobalArgs {
    #[must_use]
    pub fn new(provider_url: String) -> Self {
        Self {
            provider_url,
            provider_key: SecretString::default(),
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: SecretString) -> Self {
        self.provider_key = key;
        self
    }
}
