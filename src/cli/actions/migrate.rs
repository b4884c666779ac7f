use crate::migrate;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub dsn: String,
    pub dir: PathBuf,
}

/// Apply every pending migration found in `dir`.
/// # Errors
/// Returns an error if the directory can't be read or a migration fails.
pub async fn execute(args: Args) -> Result<()> {
    let migrations = migrate::discover(&args.dir)
        .with_context(|| format!("Failed to read migrations from {}", args.dir.display()))?;

    let applied = migrate::apply(&args.dsn, &migrations).await?;

    info!(
        found = migrations.len(),
        applied = applied.len(),
        "migrations complete"
    );
    for name in applied {
        println!("applied {name}");
    }
    Ok(())
}
