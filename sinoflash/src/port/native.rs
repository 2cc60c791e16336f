//! `serialport`-backed programmer link.

use crate::error::Result;
use crate::port::{Port, SerialConfig};
use log::trace;
use serialport::{ClearBuffer, SerialPort};
use std::io::{self, Read, Write};

/// OS serial port.
pub struct NativePort {
    inner: Box<dyn SerialPort>,
    name: String,
}

impl NativePort {
    /// Open `config.port_name`. Most boards restart when the port opens.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        trace!("Opening {} at {} baud", config.port_name, config.baud_rate);
        let inner = serialport::new(&config.port_name, config.baud_rate)
            .timeout(config.timeout)
            .open()?;
        Ok(Self {
            inner,
            name: config.port_name.clone(),
        })
    }
}

impl Port for NativePort {
    fn name(&self) -> &str {
        &self.name
    }

    fn discard_input(&mut self) -> Result<()> {
        self.inner.clear(ClearBuffer::Input)?;
        Ok(())
    }

    fn set_dtr(&mut self, level: bool) -> Result<()> {
        self.inner.write_data_terminal_ready(level)?;
        Ok(())
    }
}

impl Read for NativePort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for NativePort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::DEFAULT_BAUD;

    #[test]
    fn test_open_missing_port_fails() {
        let config = SerialConfig::new("/dev/sinoflash-does-not-exist", DEFAULT_BAUD);
        assert!(NativePort::open(&config).is_err());
    }
}
