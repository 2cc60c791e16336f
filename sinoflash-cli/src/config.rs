//! Configuration file support for sinoflash.
//!
//! Configuration is loaded from multiple sources with the following priority (highest first):
//! 1. Command-line arguments
//! 2. Environment variables (SINOFLASH_*)
//! 3. Local config file (./sinoflash.toml)
//! 4. Global config file (~/.config/sinoflash/config.toml)

use directories::ProjectDirs;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sinoflash::{Geometry, ImageFormat, StreamConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the local configuration file.
pub const LOCAL_CONFIG_FILE: &str = "sinoflash.toml";

/// Default delay for the programmer to come out of reset.
const DEFAULT_BOOT_DELAY_MS: u64 = 2000;

/// Connection configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Preferred serial port (e.g., "/dev/ttyACM0" or "COM3").
    pub serial: Option<String>,
    /// Default baud rate.
    pub baud: Option<u32>,
    /// Wait after opening the port, in milliseconds.
    pub boot_delay_ms: Option<u64>,
}

/// Flash configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlashConfig {
    /// Verify after flashing by default.
    #[serde(default)]
    pub verify: bool,
    /// Default image format (auto, ihex, binary).
    pub format: Option<String>,
    /// Erase block size in bytes.
    pub block_size: Option<u32>,
    /// Transfer chunk limit in bytes.
    pub chunk_size: Option<usize>,
    /// Zero-byte writes tolerated before giving up.
    pub stall_retries: Option<usize>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Connection configuration.
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Flash configuration.
    #[serde(default)]
    pub flash: FlashConfig,
}

impl Config {
    /// Load configuration from all available sources.
    pub fn load() -> Self {
        let mut config = Self::default();

        // Load global config
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global_config) = Self::load_from_file(&global_path) {
                debug!("Loaded global config from {}", global_path.display());
                config.merge(global_config);
            }
        }

        // Load local config (overrides global)
        if let Some(local_config) = Self::load_from_file(Path::new(LOCAL_CONFIG_FILE)) {
            debug!("Loaded local config from {LOCAL_CONFIG_FILE}");
            config.merge(local_config);
        }

        config
    }

    /// Load configuration from a specific file path (--config flag).
    pub fn load_from_path(path: &Path) -> Self {
        if let Some(config) = Self::load_from_file(path) {
            debug!("Loaded config from {}", path.display());
            config
        } else {
            warn!(
                "Could not load config from {}, using defaults",
                path.display()
            );
            Self::default()
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("Failed to parse config file {}: {}", path.display(), e);
                    None
                },
            },
            Err(e) => {
                warn!("Failed to read config file {}: {}", path.display(), e);
                None
            },
        }
    }

    /// Get the global configuration directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "sinoflash").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the global configuration file path.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Merge another config into this one.
    fn merge(&mut self, other: Self) {
        let conn = other.connection;
        if conn.serial.is_some() {
            self.connection.serial = conn.serial;
        }
        if conn.baud.is_some() {
            self.connection.baud = conn.baud;
        }
        if conn.boot_delay_ms.is_some() {
            self.connection.boot_delay_ms = conn.boot_delay_ms;
        }

        let flash = other.flash;
        if flash.verify {
            self.flash.verify = true;
        }
        if flash.format.is_some() {
            self.flash.format = flash.format;
        }
        if flash.block_size.is_some() {
            self.flash.block_size = flash.block_size;
        }
        if flash.chunk_size.is_some() {
            self.flash.chunk_size = flash.chunk_size;
        }
        if flash.stall_retries.is_some() {
            self.flash.stall_retries = flash.stall_retries;
        }
    }

    /// Delay between opening the port and talking to the programmer.
    pub fn boot_delay(&self) -> Duration {
        Duration::from_millis(
            self.connection
                .boot_delay_ms
                .unwrap_or(DEFAULT_BOOT_DELAY_MS),
        )
    }

    /// Flash geometry with configured overrides.
    pub fn geometry(&self) -> Geometry {
        let defaults = Geometry::default();
        Geometry {
            block_size: self
                .flash
                .block_size
                .unwrap_or(defaults.block_size),
            chunk_size: self
                .flash
                .chunk_size
                .unwrap_or(defaults.chunk_size),
        }
    }

    /// Stream behaviour with configured overrides.
    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            stall_retries: self
                .flash
                .stall_retries
                .unwrap_or_default(),
        }
    }

    /// Default image format; unknown names fall back to auto-detection.
    pub fn image_format(&self) -> ImageFormat {
        match self
            .flash
            .format
            .as_deref()
            .map(str::parse::<ImageFormat>)
        {
            Some(Ok(format)) => format,
            Some(Err(e)) => {
                warn!("Ignoring [flash] format: {e}");
                ImageFormat::Auto
            },
            None => ImageFormat::Auto,
        }
    }
}
