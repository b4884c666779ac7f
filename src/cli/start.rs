use crate::cli::{
    actions::Action,
    commands::{self, logging},
    dispatch, telemetry,
};
use anyhow::Result;

/// Parse the command line, install logging and pick the action to run.
///
/// # Errors
///
/// Returns an error if telemetry can't be initialized or the arguments don't
/// describe a runnable action.
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    telemetry::init(logging::level(&matches))?;

    dispatch::handler(&matches)
}
