//! Compare flash with an image file.

use anyhow::Result;
use sinoflash::ImageFormat;
use std::path::Path;

use super::flash::{load_image, verify_image};
use super::open_session;
use crate::Cli;
use crate::config::Config;

/// Verify command implementation.
pub(crate) fn cmd_verify(
    cli: &Cli,
    config: &Config,
    file: &Path,
    address: u32,
    format: ImageFormat,
) -> Result<()> {
    let image = load_image(cli, file, format, address)?;
    let mut session = open_session(cli, config)?;
    verify_image(cli, &mut session, &image)
}
