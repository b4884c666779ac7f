use crate::assets::{write_placeholders, DEMO_ITEMS};
use anyhow::Result;
use std::path::PathBuf;

#[derive(Debug)]
pub struct Args {
    pub out: PathBuf,
}

/// Write the demo placeholder images.
/// # Errors
/// Returns an error if the directory or a file can't be written.
pub fn execute(args: &Args) -> Result<()> {
    for path in write_placeholders(&args.out, &DEMO_ITEMS)? {
        println!("Generated {}", path.display());
    }
    Ok(())
}
