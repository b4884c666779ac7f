use anyhow::{bail, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};

pub const ARG_PORT: &str = "port";
pub const ARG_BACKEND: &str = "backend";
pub const ARG_PROVIDER_URL: &str = "provider-url";
pub const ARG_PROVIDER_KEY: &str = "provider-key";
pub const ARG_SITE_URL: &str = "site-url";
pub const ARG_VERIFY_DELAY_MS: &str = "verify-delay-ms";
pub const ARG_CONTEXT_TTL_SECONDS: &str = "context-ttl-seconds";
pub const ARG_MAX_CONTEXTS: &str = "max-contexts";
pub const ARG_PUBLIC_DIR: &str = "public-dir";

/// Where auth, rows and files live.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Supabase,
    Memory,
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("MENUVIZ_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_BACKEND)
                .long(ARG_BACKEND)
                .help("Auth and storage backend")
                .default_value("supabase")
                .env("MENUVIZ_BACKEND")
                .value_parser(["supabase", "memory"]),
        )
        .arg(
            Arg::new(ARG_PROVIDER_URL)
                .long(ARG_PROVIDER_URL)
                .help("Supabase project URL, e.g. https://<ref>.supabase.co")
                .env("MENUVIZ_PROVIDER_URL"),
        )
        .arg(
            Arg::new(ARG_PROVIDER_KEY)
                .long(ARG_PROVIDER_KEY)
                .help("Supabase anon key")
                .env("MENUVIZ_PROVIDER_ANON_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_SITE_URL)
                .long(ARG_SITE_URL)
                .help("Public site URL used in redirects and email links")
                .long_help(
                    "Public site URL used in redirects and email links. Defaults to the origin of each request.",
                )
                .env("MENUVIZ_SITE_URL"),
        )
        .arg(
            Arg::new(ARG_VERIFY_DELAY_MS)
                .long(ARG_VERIFY_DELAY_MS)
                .help("Delay before the email verification page checks the session again")
                .default_value("1000")
                .env("MENUVIZ_VERIFY_DELAY_MS")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_CONTEXT_TTL_SECONDS)
                .long(ARG_CONTEXT_TTL_SECONDS)
                .help("Idle time after which a browser context is dropped")
                .default_value("3600")
                .env("MENUVIZ_CONTEXT_TTL_SECONDS")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_MAX_CONTEXTS)
                .long(ARG_MAX_CONTEXTS)
                .help("Most browser contexts kept at once; the least recently seen is dropped first")
                .default_value("10000")
                .env("MENUVIZ_MAX_CONTEXTS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_PUBLIC_DIR)
                .long(ARG_PUBLIC_DIR)
                .help("Directory holding the generated images/ tree")
                .default_value("public")
                .env("MENUVIZ_PUBLIC_DIR")
                .value_parser(clap::value_parser!(PathBuf)),
        )
}

#[derive(Debug)]
pub struct Options {
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

impl Options {
    /// Parse server arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the Supabase backend is selected without URL and key.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let backend = match matches.get_one::<String>(ARG_BACKEND).map(String::as_str) {
            Some("memory") => Backend::Memory,
            _ => Backend::Supabase,
        };

        let provider_url = get_non_empty(ARG_PROVIDER_URL);
        let provider_key = get_non_empty(ARG_PROVIDER_KEY).map(SecretString::from);

        if backend == Backend::Supabase {
            if provider_url.is_none() {
                bail!("missing required argument: --{ARG_PROVIDER_URL}");
            }
            if provider_key.is_none() {
                bail!("missing required argument: --{ARG_PROVIDER_KEY}");
            }
        }

        Ok(Self {
            port: matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080),
            backend,
            provider_url,
            provider_key,
            site_url: get_non_empty(ARG_SITE_URL),
            verify_delay: Duration::from_millis(
                matches
                    .get_one::<u64>(ARG_VERIFY_DELAY_MS)
                    .copied()
                    .unwrap_or(1000),
            ),
            context_ttl: Duration::from_secs(
                matches
                    .get_one::<u64>(ARG_CONTEXT_TTL_SECONDS)
                    .copied()
                    .unwrap_or(3600),
            ),
            max_contexts: matches
                .get_one::<u64>(ARG_MAX_CONTEXTS)
                .and_then(|max| usize::try_from(*max).ok())
                .unwrap_or(10_000),
            public_dir: matches
                .get_one::<PathBuf>(ARG_PUBLIC_DIR)
                .cloned()
                .unwrap_or_else(|| PathBuf::from("public")),
        })
    }
}
