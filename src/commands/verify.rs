// src/commands/verify.rs

//! Verify command - check a downloaded archive

use anyhow::{Context, Result};
use hpcpkg::Checksum;
use std::path::Path;

pub fn cmd_verify(file: &Path, checksum: &str) -> Result<()> {
    let expected = Checksum::parse_prefixed(checksum)
        .with_context(|| format!("Invalid checksum '{}'", checksum))?;

    expected.verify_path(file)?;
    println!("[OK] {} matches {}", file.display(), expected);
    Ok(())
}
