//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the action to run: the HTTP server (also
//! when no sub-command is given), the migration runner or the image
//! generator.

use crate::cli::{
    actions::{images, migrate, server, Action},
    commands::{self, CMD_SERVER},
};
use anyhow::Result;

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some(("migrate", sub)) => {
            let options = commands::migrate::Options::parse(sub);
            Ok(Action::Migrate(migrate::Args {
                dsn: options.dsn,
                dir: options.dir,
            }))
        }
        Some(("generate-images", sub)) => Ok(Action::GenerateImages(images::Args {
            out: commands::images::out_dir(sub),
        })),
        Some((CMD_SERVER, sub)) => server_action(sub),
        _ => server_action(matches),
    }
}

fn server_action(matches: &clap::ArgMatches) -> Result<Action> {
    let options = commands::server::Options::parse(matches)?;
    Ok(Action::Server(server::Args {
        port: options.port,
        backend: options.backend,
        provider_url: options.provider_url,
        provider_key: options.provider_key,
        site_url: options.site_url,
        verify_delay: options.verify_delay,
        context_ttl: options.context_ttl,
        max_contexts: options.max_contexts,
        public_dir: options.public_dir,
    }))
}
