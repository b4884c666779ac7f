pub mod images;
pub mod logging;
pub mod migrate;
pub mod server;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    ColorChoice, Command,
};

pub const CMD_SERVER: &str = "server";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    // Running without a sub-command starts the server, so the root command
    // takes the server arguments too.
    let command = Command::new("menuviz")
        .about("Restaurant menu visualization: landing site, onboarding and auth")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .args_conflicts_with_subcommands(true)
        .subcommand(server::with_args(
            Command::new(CMD_SERVER).about("Serve the site and the JSON API (default)"),
        ))
        .subcommand(migrate::command())
        .subcommand(images::command());

    let command = server::with_args(command);
    logging::with_args(command)
}
