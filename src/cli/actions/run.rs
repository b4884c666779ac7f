use crate::cli::actions::{images, migrate, server, Action};
use anyhow::Result;

/// Run an action to completion.
///
/// # Errors
/// Returns the action's error.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Server(args) => server::execute(args).await,
        Action::Migrate(args) => migrate::execute(args).await,
        Action::GenerateImages(args) => images::execute(&args),
    }
}
