//! Serial link to the Arduino programmer.
//!
//! The RPC layer only needs a byte stream. [`Port`] adds the two line
//! controls the link uses: dropping stale input and pulsing DTR, which
//! restarts an Arduino into its sketch.

#[cfg(feature = "native")]
pub mod native;

use std::io::{Read, Write};
use std::thread;
use std::time::Duration;

use crate::error::Result;

/// Default programmer baud rate.
pub const DEFAULT_BAUD: u32 = 115_200;

/// Default serial read timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// How long DTR is held low to restart the board.
pub const RESTART_PULSE: Duration = Duration::from_millis(100);

/// Serial port settings. Framing is always 8N1 without flow control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Port name/path (e.g., "/dev/ttyACM0", "COM3").
    pub port_name: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Read timeout; a response that stalls longer fails with `Timeout`.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SerialConfig {
    /// Settings for `port_name` at `baud_rate` with the default timeout.
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            ..Default::default()
        }
    }

    /// Override the read timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Byte stream to the programmer.
pub trait Port: Read + Write + Send {
    /// Port name/path.
    fn name(&self) -> &str;

    /// Drop anything the board printed before we started talking.
    fn discard_input(&mut self) -> Result<()>;

    /// Drive the DTR line.
    fn set_dtr(&mut self, level: bool) -> Result<()>;

    /// Pulse DTR low, restarting boards with an auto-reset circuit.
    fn restart_board(&mut self, pulse: Duration) -> Result<()> {
        self.set_dtr(false)?;
        thread::sleep(pulse);
        self.set_dtr(true)
    }
}

#[cfg(feature = "native")]
pub use native::NativePort;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[derive(Default)]
    struct Lines {
        dtr: Vec<bool>,
    }

    impl Read for Lines {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    impl Write for Lines {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Port for Lines {
        fn name(&self) -> &str {
            "lines"
        }

        fn discard_input(&mut self) -> Result<()> {
            Ok(())
        }

        fn set_dtr(&mut self, level: bool) -> Result<()> {
            self.dtr.push(level);
            Ok(())
        }
    }

    #[test]
    fn test_restart_pulses_dtr_low_then_high() {
        let mut port = Lines::default();
        port.restart_board(Duration::ZERO).unwrap();
        assert_eq!(port.dtr, vec![false, true]);
    }

    #[test]
    fn test_serial_config_defaults() {
        let config = SerialConfig::new("/dev/ttyACM0", 57_600);
        assert_eq!(config.port_name, "/dev/ttyACM0");
        assert_eq!(config.baud_rate, 57_600);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(SerialConfig::default().baud_rate, DEFAULT_BAUD);
    }

    #[test]
    fn test_serial_config_timeout_override() {
        let config = SerialConfig::new("COM3", DEFAULT_BAUD).with_timeout(Duration::from_millis(250));
        assert_eq!(config.timeout, Duration::from_millis(250));
    }
}
