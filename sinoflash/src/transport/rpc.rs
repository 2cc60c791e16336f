//! Transport backed by the Arduino programmer firmware.
//!
//! The firmware exports its ICP primitives over simpleRPC. Each
//! [`Transport`] call maps to exactly one remote call.

use crate::error::{Error, Result};
use crate::protocol::simple_rpc::{RpcValue, SimpleRpc};
use crate::transport::{MAX_TRANSFER_SIZE, Transport};
use log::{debug, trace};
use std::io::{Read, Write};

#[cfg(feature = "native")]
use {
    crate::port::{NativePort, Port, RESTART_PULSE, SerialConfig},
    log::{info, warn},
    std::{thread, time::Duration},
};

/// Default delay between opening the port and the first request.
///
/// A zero delay skips the DTR restart for boards without auto-reset.
#[cfg(feature = "native")]
pub const DEFAULT_BOOT_DELAY: Duration = Duration::from_secs(2);

/// Delay between discovery attempts.
#[cfg(feature = "native")]
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Maximum number of discovery attempts.
#[cfg(feature = "native")]
const MAX_CONNECT_ATTEMPTS: usize = 3;

/// Names of the remote methods behind each transport operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcMethods {
    /// Enter programming mode.
    pub init: String,
    /// Leave programming mode.
    pub reset: String,
    /// Release target pins.
    pub stop: String,
    /// `(address, size) -> [bytes]`
    pub read: String,
    /// `(address, [bytes]) -> count`
    pub write: String,
    /// `(address) -> bool`
    pub erase: String,
}

impl Default for RpcMethods {
    fn default() -> Self {
        Self {
            init: "phy_init".into(),
            reset: "phy_reset".into(),
            stop: "phy_stop".into(),
            read: "icp_read".into(),
            write: "icp_write".into(),
            erase: "icp_erase".into(),
        }
    }
}

impl RpcMethods {
    fn all(&self) -> [&str; 6] {
        [
            &self.init,
            &self.reset,
            &self.stop,
            &self.read,
            &self.write,
            &self.erase,
        ]
    }
}

/// [`Transport`] over a simpleRPC programmer.
pub struct RpcTransport<P: Read + Write> {
    rpc: SimpleRpc<P>,
    methods: RpcMethods,
}

impl<P: Read + Write> RpcTransport<P> {
    /// Wrap a connected client using the default method names.
    pub fn new(rpc: SimpleRpc<P>) -> Result<Self> {
        Self::with_methods(rpc, RpcMethods::default())
    }

    /// Wrap a connected client with custom method names.
    ///
    /// Fails if the firmware does not export one of them.
    pub fn with_methods(rpc: SimpleRpc<P>, methods: RpcMethods) -> Result<Self> {
        for name in methods.all() {
            if rpc.method(name).is_none() {
                return Err(Error::Rpc(format!(
                    "programmer firmware does not export '{name}'"
                )));
            }
        }
        debug!("Programmer exports all ICP methods");
        Ok(Self { rpc, methods })
    }

    /// Discover the method table on `port` and wrap it.
    pub fn connect(port: P) -> Result<Self> {
        Self::new(SimpleRpc::connect(port)?)
    }

    /// Underlying RPC client.
    pub fn rpc_mut(&mut self) -> &mut SimpleRpc<P> {
        &mut self.rpc
    }

    /// Consume the transport and return the RPC client.
    pub fn into_inner(self) -> SimpleRpc<P> {
        self.rpc
    }
}

#[cfg(feature = "native")]
impl RpcTransport<NativePort> {
    /// Open the programmer on a serial port.
    ///
    /// Waits `boot_delay` for the board to come out of reset, then discovers
    /// the method table, retrying a few times on timeouts.
    pub fn open(config: &SerialConfig, boot_delay: Duration) -> Result<Self> {
        for attempt in 1..=MAX_CONNECT_ATTEMPTS {
            let mut port = NativePort::open(config)?;
            info!("Opened {} at {} baud", port.name(), config.baud_rate);

            if !boot_delay.is_zero() {
                port.restart_board(RESTART_PULSE)?;
                debug!("Waiting {} ms for programmer boot", boot_delay.as_millis());
                thread::sleep(boot_delay);
            }
            port.discard_input()?;

            match SimpleRpc::connect(port) {
                Ok(rpc) => return Self::new(rpc),
                Err(Error::Timeout(msg)) if attempt < MAX_CONNECT_ATTEMPTS => {
                    warn!(
                        "Programmer did not answer (attempt {attempt}/{MAX_CONNECT_ATTEMPTS}): {msg}"
                    );
                    thread::sleep(CONNECT_RETRY_DELAY);
                },
                Err(e) => return Err(e),
            }
        }

        Err(Error::Timeout(format!(
            "Programmer did not answer after {MAX_CONNECT_ATTEMPTS} attempts"
        )))
    }
}

impl<P: Read + Write> Transport for RpcTransport<P> {
    fn link_init(&mut self) -> Result<()> {
        trace!("{}()", self.methods.init);
        self.rpc.call(&self.methods.init, &[])?;
        Ok(())
    }

    fn link_reset(&mut self) -> Result<()> {
        trace!("{}()", self.methods.reset);
        self.rpc.call(&self.methods.reset, &[])?;
        Ok(())
    }

    fn link_stop(&mut self) -> Result<()> {
        trace!("{}()", self.methods.stop);
        self.rpc.call(&self.methods.stop, &[])?;
        Ok(())
    }

    fn read_bytes(&mut self, address: u32, size: usize) -> Result<Vec<u8>> {
        trace!("{}(0x{address:04X}, {size})", self.methods.read);
        self.rpc
            .call(&self.methods.read, &[address.into(), size.into()])?
            .to_bytes()
    }

    fn write_bytes(&mut self, address: u32, data: &[u8]) -> Result<usize> {
        trace!("{}(0x{address:04X}, {} bytes)", self.methods.write, data.len());
        let count = self
            .rpc
            .call(&self.methods.write, &[address.into(), RpcValue::bytes(data)])?
            .as_u64()?;
        usize::try_from(count).map_err(|_| Error::Rpc(format!("write count {count} out of range")))
    }

    fn erase_region(&mut self, address: u32) -> Result<bool> {
        trace!("{}(0x{address:04X})", self.methods.erase);
        self.rpc
            .call(&self.methods.erase, &[address.into()])?
            .as_bool()
    }

    fn max_transfer_size(&self) -> usize {
        MAX_TRANSFER_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::simple_rpc::tests::{MockSerial, icp_method_table};

    fn transport() -> RpcTransport<MockSerial> {
        let mut t = RpcTransport::connect(MockSerial::new(&icp_method_table())).unwrap();
        t.rpc_mut().port_mut().write_buf.clear();
        t
    }

    #[test]
    fn test_missing_method_is_rejected() {
        let mut table = Vec::new();
        table.extend_from_slice(b"simpleRPC\0\x03\x00\x00<H\0");
        table.extend_from_slice(b": ;phy_init: Enter ICP.\0\0");
        let result = RpcTransport::connect(MockSerial::new(&table));
        assert!(matches!(result, Err(Error::Rpc(msg)) if msg.contains("phy_reset")));
    }

    #[test]
    fn test_link_calls_use_method_index() {
        let mut t = transport();
        t.link_init().unwrap();
        t.link_reset().unwrap();
        t.link_stop().unwrap();
        assert_eq!(t.rpc_mut().port_mut().write_buf, vec![0, 1, 2]);
    }

    #[test]
    fn test_read_bytes() {
        let mut t = transport();
        t.rpc_mut().port_mut().push_response(&[3, 0, 1, 2, 3]);
        assert_eq!(t.read_bytes(0x0100, 3).unwrap(), vec![1, 2, 3]);
        assert_eq!(
            t.rpc_mut().port_mut().write_buf,
            vec![3, 0x00, 0x01, 0x03, 0x00]
        );
    }

    #[test]
    fn test_write_bytes_returns_count() {
        let mut t = transport();
        t.rpc_mut().port_mut().push_response(&[2, 0]);
        assert_eq!(t.write_bytes(0, &[9, 9, 9]).unwrap(), 2);
    }

    #[test]
    fn test_erase_region() {
        let mut t = transport();
        t.rpc_mut().port_mut().push_response(&[1, 0]);
        assert!(t.erase_region(0x0400).unwrap());
        assert!(!t.erase_region(0x0800).unwrap());
    }
}
