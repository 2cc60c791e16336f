//! Read flash to a file.

use anyhow::{Context, Result};
use console::style;
use std::fs;
use std::path::Path;

use super::{ensure_not_interrupted, open_session};
use crate::config::Config;
use crate::{Cli, progress};

/// Read command implementation.
pub(crate) fn cmd_read(
    cli: &Cli,
    config: &Config,
    output: &Path,
    address: u32,
    size: u32,
) -> Result<()> {
    let mut session = open_session(cli, config)?;

    if !cli.quiet {
        eprintln!(
            "{} Reading {size} bytes from 0x{address:04X}",
            style("📥").cyan()
        );
    }

    let pb = progress::percent_bar(cli.quiet);
    session.seek(i64::from(address), sinoflash::SeekMode::Absolute)?;
    let data = session
        .read_with(size as usize, |p| progress::update(&pb, p))
        .context("Failed to read flash")?;
    ensure_not_interrupted()?;
    pb.finish_and_clear();

    if data.len() < size as usize {
        log::warn!(
            "Target returned {} of {size} requested bytes",
            data.len()
        );
    }

    fs::write(output, &data)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if !cli.quiet {
        eprintln!(
            "{} Saved {} bytes to {}",
            style("✓").green(),
            data.len(),
            output.display()
        );
    }

    Ok(())
}
