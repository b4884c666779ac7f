use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

pub const ARG_OUT: &str = "out";

#[must_use]
pub fn command() -> Command {
    Command::new("generate-images")
        .about("Write the placeholder SVG images used by the landing page demo")
        .arg(
            Arg::new(ARG_OUT)
                .short('o')
                .long(ARG_OUT)
                .help("Output directory, created when missing")
                .default_value("public/images/menu")
                .value_parser(clap::value_parser!(PathBuf)),
        )
}

#[must_use]
pub fn out_dir(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<PathBuf>(ARG_OUT)
        .cloned()
        .unwrap_or_else(|| PathBuf::from("public/images/menu"))
}
