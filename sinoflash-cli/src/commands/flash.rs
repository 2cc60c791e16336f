//! Flash and verify command implementations.

use anyhow::{Context, Result};
use console::style;
use indicatif::ProgressBar;
use log::warn;
use sinoflash::{FlashImage, ImageFormat, ProgramReport, ResolvedFormat, Stage};
use std::path::Path;

use super::{Session, ensure_not_interrupted, open_session};
use crate::config::Config;
use crate::{Cli, progress};

/// Load an image and print its summary.
pub(crate) fn load_image(
    cli: &Cli,
    file: &Path,
    format: ImageFormat,
    address: u32,
) -> Result<FlashImage> {
    if !cli.quiet {
        eprintln!(
            "{} Loading {}",
            style("📦").cyan(),
            file.display()
        );
    }

    let image = FlashImage::from_file(file, format, address)
        .with_context(|| format!("Failed to load image {}", file.display()))?;

    if !cli.quiet {
        let summary = match image.format {
            ResolvedFormat::IntelHex => format!(
                "Intel HEX: {} segment(s), {} bytes at 0x{:04X}",
                image.segments,
                image.len(),
                image.start
            ),
            ResolvedFormat::Binary => format!(
                "Binary: {} bytes at 0x{:04X}",
                image.len(),
                image.start
            ),
        };
        eprintln!("{} {summary}", style("ℹ").blue());
    }

    Ok(image)
}

/// Read back `image` through `session` and report the outcome.
pub(crate) fn verify_image(cli: &Cli, session: &mut Session, image: &FlashImage) -> Result<()> {
    if !cli.quiet {
        eprintln!("{} Verifying...", style("🔍").cyan());
    }

    let pb = progress::percent_bar(cli.quiet);
    pb.set_message("Verifying");
    let result = session.verify_with(image.start, &image.data, |p| progress::update(&pb, p));
    pb.finish_and_clear();
    result?;
    ensure_not_interrupted()?;

    if !cli.quiet {
        eprintln!("{} Verification PASSED", style("✓").green().bold());
    }
    Ok(())
}

fn stage_message(pb: &ProgressBar, stage: Stage) {
    pb.set_message(match stage {
        Stage::Erase => "Erasing",
        Stage::Write => "Writing",
    });
}

/// Summarize the erase stage. Refused blocks are a warning, not an error.
fn report_erase(cli: &Cli, report: &ProgramReport) {
    if report.erased_blocks < report.covered_blocks {
        warn!(
            "Target erased only {} of {} block(s)",
            report.erased_blocks, report.covered_blocks
        );
    }
    if !cli.quiet {
        eprintln!(
            "{} Erased {} block(s)",
            style("✓").green(),
            report.erased_blocks
        );
    }
}

/// Flash command implementation.
pub(crate) fn cmd_flash(
    cli: &Cli,
    config: &Config,
    file: &Path,
    address: u32,
    erase: bool,
    verify: bool,
    format: ImageFormat,
) -> Result<()> {
    let image = load_image(cli, file, format, address)?;
    if image.is_empty() {
        return Err(anyhow::anyhow!("{} holds no data", file.display()));
    }

    let mut session = open_session(cli, config)?;

    let pb = progress::percent_bar(cli.quiet);
    let mut current = None;
    let report = session
        .program_with(image.start, &image.data, erase, |stage, p| {
            if current != Some(stage) {
                current = Some(stage);
                pb.set_position(0);
                stage_message(&pb, stage);
            }
            progress::update(&pb, p);
        })
        .context("Failed to program flash")?;
    ensure_not_interrupted()?;
    pb.finish_and_clear();

    if erase {
        report_erase(cli, &report);
    }
    if !cli.quiet {
        eprintln!(
            "{} Wrote {} bytes at 0x{:04X}",
            style("✓").green(),
            report.written,
            image.start
        );
    }

    if verify {
        verify_image(cli, &mut session, &image)?;
    }

    if !cli.quiet {
        eprintln!("\n{} Flashing completed", style("🎉").green().bold());
    }

    Ok(())
}
