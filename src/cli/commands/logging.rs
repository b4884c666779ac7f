use clap::{builder::ValueParser, Arg, ArgAction, ArgMatches, Command};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";

const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// `-v` occurrences, or a level given by number (0..=4) or by name through
/// `MENUVIZ_LOG_LEVEL`.
fn parse_level(value: &str) -> Result<u8, String> {
    let value = value.trim().to_ascii_lowercase();
    if let Ok(number) = value.parse::<u8>() {
        return Ok(number.min(4));
    }
    LEVEL_NAMES
        .iter()
        .position(|name| *name == value)
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| format!("invalid log level '{value}', expected one of {LEVEL_NAMES:?}"))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity: -v warn, -vv info, -vvv debug, -vvvv trace (default: error)")
            .env("MENUVIZ_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(ValueParser::from(parse_level)),
    )
}

/// Default tracing level, `None` meaning errors only.
#[must_use]
pub fn level(matches: &ArgMatches) -> Option<Level> {
    match matches.get_one::<u8>(ARG_VERBOSITY).copied().unwrap_or(0) {
        0 => None,
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(args: &[&str]) -> ArgMatches {
        with_args(Command::new("menuviz")).get_matches_from(args)
    }

    #[test]
    fn level_names_and_numbers() {
        assert_eq!(parse_level("error"), Ok(0));
        assert_eq!(parse_level(" DEBUG "), Ok(3));
        assert_eq!(parse_level("9"), Ok(4));
        assert!(parse_level("loud").is_err());
    }

    #[test]
    fn flags_map_to_levels() {
        temp_env::with_var_unset("MENUVIZ_LOG_LEVEL", || {
            assert_eq!(level(&matches(&["menuviz"])), None);
            assert_eq!(level(&matches(&["menuviz", "-v"])), Some(Level::WARN));
            assert_eq!(level(&matches(&["menuviz", "-vvv"])), Some(Level::DEBUG));
            assert_eq!(level(&matches(&["menuviz", "-vvvvvv"])), Some(Level::TRACE));
        });
    }
}
