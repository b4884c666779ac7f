use crate::{
    api::{self, AppConfig, AppState},
    cli::{commands::server::Backend, globals::GlobalArgs},
    provider::{AuthBackend, MemoryBackend, SupabaseBackend},
};
use anyhow::{anyhow, Result};
use secrecy::SecretString;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub backend: Backend,
    pub provider_url: Option<String>,
    pub provider_key: Option<SecretString>,
    pub site_url: Option<String>,
    pub verify_delay: Duration,
    pub context_ttl: Duration,
    pub max_contexts: usize,
    pub public_dir: PathBuf,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the provider client can't be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let backend: Arc<dyn AuthBackend> = match args.backend {
        Backend::Supabase => {
            let url = args
                .provider_url
                .ok_or_else(|| anyhow!("Provider URL is required"))?;
            let key = args
                .provider_key
                .ok_or_else(|| anyhow!("Provider anon key is required"))?;
            let globals = GlobalArgs::new(url).with_key(key);

            debug!("Global args: {:?}", globals);

            Arc::new(SupabaseBackend::new(&globals.provider_url, globals.provider_key)?)
        }
        Backend::Memory => {
            warn!("Using the in-memory backend, all accounts are lost on restart");
            Arc::new(MemoryBackend::new())
        }
    };

    let config = AppConfig::new()
        .with_site_url(args.site_url)
        .with_verify_delay(args.verify_delay)
        .with_context_ttl(args.context_ttl)
        .with_max_contexts(args.max_contexts)
        .with_public_dir(args.public_dir);

    api::new(args.port, Arc::new(AppState::new(backend, config))).await
}
