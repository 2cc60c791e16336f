//! sinoflash CLI - Command-line flash programmer for SinoWealth MCUs.
//!
//! ## Features
//!
//! - Program Intel HEX or raw binary images
//! - Read flash contents to a file
//! - Erase block-aligned flash ranges
//! - Verify flash against an image
//! - Interactive serial port selection
//! - Shell completion generation
//! - Environment variable support

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use console::style;
use env_logger::Env;
use log::debug;
use sinoflash::ImageFormat;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};

mod commands;
mod config;
mod progress;
mod serial;

use config::Config;

/// Whether stderr is a terminal (set once at startup).
static STDERR_IS_TTY: AtomicBool = AtomicBool::new(true);

/// Set by the Ctrl-C handler.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Check if animations should be used (TTY and colors enabled).
fn use_fancy_output() -> bool {
    STDERR_IS_TTY.load(Ordering::Relaxed) && console::colors_enabled_stderr()
}

/// Whether the user pressed Ctrl-C.
pub(crate) fn was_interrupted() -> bool {
    INTERRUPTED.load(Ordering::Relaxed)
}

/// Failures that map to dedicated exit codes.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    /// Bad invocation or missing setup (exit code 2).
    #[error("{0}")]
    Usage(String),
    /// User aborted (exit code 130).
    #[error("{0}")]
    Cancelled(String),
}

/// sinoflash - Flash programmer for SinoWealth 8051 MCUs via an Arduino JTAG/ICP bridge.
///
/// Environment variables:
///   SINOFLASH_PORT              - Default serial port
///   SINOFLASH_BAUD              - Default baud rate (default: 115200)
///   SINOFLASH_NON_INTERACTIVE   - Non-interactive mode (disable prompts)
#[derive(Parser)]
#[command(name = "sinoflash")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Serial port to use (auto-detected if not specified).
    #[arg(short, long, global = true, env = "SINOFLASH_PORT")]
    port: Option<String>,

    /// Baud rate [default: 115200].
    #[arg(short, long, global = true, env = "SINOFLASH_BAUD")]
    baud: Option<u32>,

    /// Programmer transport.
    #[arg(short, long, global = true, value_enum, default_value_t = TransportArg::Serial)]
    transport: TransportArg,

    /// Verbose output level (-v, -vv for increasing detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-essential output).
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Non-interactive mode (fail instead of prompting).
    #[arg(long, global = true, env = "SINOFLASH_NON_INTERACTIVE")]
    non_interactive: bool,

    /// Path to a configuration file.
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Programmer link kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum TransportArg {
    /// Arduino programmer over a serial port.
    Serial,
    /// In-memory emulated target (no hardware).
    Dummy,
}

/// Image formats accepted on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    /// Detect from content.
    Auto,
    /// Intel HEX.
    #[value(alias = "hex")]
    Ihex,
    /// Raw bytes.
    #[value(alias = "bin")]
    Binary,
}

impl From<FormatArg> for ImageFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Auto => Self::Auto,
            FormatArg::Ihex => Self::IntelHex,
            FormatArg::Binary => Self::Binary,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Read flash contents to a file.
    Read {
        /// Output file.
        #[arg(short, long)]
        output: PathBuf,

        /// Start address.
        #[arg(short, long, default_value = "0", value_parser = parse_u32)]
        address: u32,

        /// Number of bytes to read.
        #[arg(short, long, value_parser = parse_u32)]
        size: u32,
    },

    /// Erase the blocks covering an address range.
    Erase {
        /// Start address.
        #[arg(short, long, default_value = "0", value_parser = parse_u32)]
        address: u32,

        /// Range length in bytes.
        #[arg(short, long, value_parser = parse_u32)]
        size: u32,
    },

    /// Program an Intel HEX or binary image.
    #[command(visible_alias = "write")]
    Flash {
        /// Image file.
        file: PathBuf,

        /// Start address (base offset for Intel HEX).
        #[arg(short, long, default_value = "0", value_parser = parse_u32)]
        address: u32,

        /// Skip erasing before writing.
        #[arg(long)]
        no_erase: bool,

        /// Read back and compare after writing.
        #[arg(long)]
        verify: bool,

        /// Image format (defaults to the config file, then auto).
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,
    },

    /// Compare flash contents with an image.
    Verify {
        /// Image file.
        file: PathBuf,

        /// Start address (base offset for Intel HEX).
        #[arg(short, long, default_value = "0", value_parser = parse_u32)]
        address: u32,

        /// Image format (defaults to the config file, then auto).
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,
    },

    /// List available serial ports.
    ListPorts {
        /// Output in JSON format.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Parse a decimal or `0x` hexadecimal number (underscores allowed).
fn parse_u32(s: &str) -> Result<u32, String> {
    let s: String = s
        .trim()
        .chars()
        .filter(|c| *c != '_')
        .collect();
    let parsed = match s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed.map_err(|e| format!("Invalid number '{s}': {e}"))
}

/// Map an error to the process exit code.
fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return match cli_err {
            CliError::Usage(_) => 2,
            CliError::Cancelled(_) => 130,
        };
    }
    if matches!(
        err.downcast_ref::<sinoflash::Error>(),
        Some(sinoflash::Error::Interrupted)
    ) || was_interrupted()
    {
        return 130;
    }
    1
}

fn main() -> ExitCode {
    // --- NO_COLOR and TTY detection ---
    let stderr_is_tty = console::Term::stderr().is_term();
    STDERR_IS_TTY.store(stderr_is_tty, Ordering::Relaxed);

    if env::var("NO_COLOR").is_ok() || !stderr_is_tty {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(if cli.verbose >= 2 {
            Some(env_logger::TimestampPrecision::Millis)
        } else {
            None
        })
        .init();

    debug!(
        "sinoflash v{} (verbose level: {})",
        env!("CARGO_PKG_VERSION"),
        cli.verbose
    );

    if let Err(e) = ctrlc::set_handler(|| INTERRUPTED.store(true, Ordering::Relaxed)) {
        debug!("Failed to install Ctrl-C handler: {e}");
    }
    sinoflash::set_interrupt_checker(was_interrupted);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", style("Error:").red().bold());
            ExitCode::from(exit_code(&err))
        },
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = if let Some(ref path) = cli.config_path {
        Config::load_from_path(path)
    } else {
        Config::load()
    };

    match &cli.command {
        Commands::Read {
            output,
            address,
            size,
        } => commands::read::cmd_read(cli, &config, output, *address, *size),
        Commands::Erase { address, size } => {
            commands::erase::cmd_erase(cli, &config, *address, *size)
        },
        Commands::Flash {
            file,
            address,
            no_erase,
            verify,
            format,
        } => commands::flash::cmd_flash(
            cli,
            &config,
            file,
            *address,
            !*no_erase,
            *verify || config.flash.verify,
            format.map_or_else(|| config.image_format(), ImageFormat::from),
        ),
        Commands::Verify {
            file,
            address,
            format,
        } => commands::verify::cmd_verify(
            cli,
            &config,
            file,
            *address,
            format.map_or_else(|| config.image_format(), ImageFormat::from),
        ),
        Commands::ListPorts { json } => {
            commands::ports::cmd_list_ports(*json);
            Ok(())
        },
        Commands::Completions { shell } => {
            commands::completions::cmd_completions(*shell);
            Ok(())
        },
    }
}
