//! Command implementations.
//!
//! Each subcommand is implemented in its own module for clean separation.

pub(crate) mod completions;
pub(crate) mod erase;
pub(crate) mod flash;
pub(crate) mod ports;
pub(crate) mod read;
pub(crate) mod verify;

use anyhow::{Context, Result};
use console::style;
use sinoflash::port::DEFAULT_BAUD;
use sinoflash::{
    DummyConfig, DummyTransport, FlashDevice, FlashStream, RpcTransport, SerialConfig, Transport,
};

use crate::config::Config;
use crate::serial::{SerialOptions, select_serial_port};
use crate::{Cli, CliError, TransportArg, was_interrupted};

/// Stream over whichever transport the user picked.
pub(crate) type Session = FlashStream<Box<dyn Transport>>;

/// Fail with `Cancelled` once Ctrl-C was pressed.
pub(crate) fn ensure_not_interrupted() -> Result<()> {
    if was_interrupted() {
        Err(CliError::Cancelled("Interrupted".to_string()).into())
    } else {
        Ok(())
    }
}

/// Get serial port from CLI args, config or interactive selection.
fn get_port(cli: &Cli, config: &Config) -> Result<String> {
    let options = SerialOptions {
        port: cli.port.clone(),
        non_interactive: cli.non_interactive,
    };
    Ok(select_serial_port(&options, config)?.port.name)
}

fn connect(cli: &Cli, config: &Config) -> Result<Box<dyn Transport>> {
    match cli.transport {
        TransportArg::Dummy => {
            if !cli.quiet {
                eprintln!("{} Using emulated target", style("ℹ").blue());
            }
            let dummy = DummyConfig {
                block_size: config.geometry().block_size as usize,
                ..Default::default()
            };
            Ok(Box::new(DummyTransport::new(dummy)))
        },
        TransportArg::Serial => {
            let port = get_port(cli, config)?;
            let baud = cli
                .baud
                .or(config.connection.baud)
                .unwrap_or(DEFAULT_BAUD);
            if !cli.quiet {
                eprintln!("{} Using port {port} at {baud} baud", style("🔌").cyan());
                eprintln!("{} Waiting for programmer...", style("⏳").yellow());
            }
            let transport = RpcTransport::open(&SerialConfig::new(&port, baud), config.boot_delay())
                .with_context(|| format!("Failed to connect to programmer on {port}"))?;
            Ok(Box::new(transport))
        },
    }
}

/// Connect, bring the link up and wrap it in a stream.
pub(crate) fn open_session(cli: &Cli, config: &Config) -> Result<Session> {
    let transport = connect(cli, config)?;
    ensure_not_interrupted()?;

    let mut device = FlashDevice::with_geometry(transport, config.geometry());
    device
        .open()
        .context("Failed to initialize programmer link")?;
    if !cli.quiet {
        eprintln!("{} Connected", style("✓").green());
    }

    Ok(FlashStream::with_config(device, config.stream_config()))
}
