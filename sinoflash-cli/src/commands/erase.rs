//! Erase a block-aligned range.

use anyhow::{Context, Result};
use console::style;

use super::{ensure_not_interrupted, open_session};
use crate::config::Config;
use crate::{Cli, progress};

/// Block-aligned `[start, end)` covering `size` bytes at `address`.
fn aligned_range(address: u32, size: u32, block_size: u32) -> (u64, u64) {
    let block = u64::from(block_size.max(1));
    let start = u64::from(address) - u64::from(address) % block;
    if size == 0 {
        return (start, start);
    }
    let end = (u64::from(address) + u64::from(size)).div_ceil(block) * block;
    (start, end)
}

/// Erase command implementation.
pub(crate) fn cmd_erase(cli: &Cli, config: &Config, address: u32, size: u32) -> Result<()> {
    let mut session = open_session(cli, config)?;

    if !cli.quiet {
        let (start, end) = aligned_range(address, size, session.device().block_size());
        eprintln!(
            "{} Erasing 0x{start:04X}..0x{end:04X}",
            style("🗑").red()
        );
    }

    let pb = progress::percent_bar(cli.quiet);
    let blocks = session
        .erase_range_with(address, size as usize, |p| progress::update(&pb, p))
        .context("Failed to erase flash")?;
    ensure_not_interrupted()?;
    pb.finish_and_clear();

    if !cli.quiet {
        eprintln!("{} Erased {blocks} block(s)", style("✓").green());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_range_rounds_both_ends() {
        assert_eq!(aligned_range(100, 2000, 1024), (0, 3072));
    }

    #[test]
    fn test_aligned_range_already_aligned() {
        assert_eq!(aligned_range(1024, 1024, 1024), (1024, 2048));
    }

    #[test]
    fn test_aligned_range_empty() {
        assert_eq!(aligned_range(1500, 0, 1024), (1024, 1024));
    }
}
