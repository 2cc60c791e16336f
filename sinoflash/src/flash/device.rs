//! Chunk-level access to target flash.

use crate::error::Result;
use crate::transport::{MAX_TRANSFER_SIZE, Transport};
use log::{debug, trace, warn};

/// Default erase block size in bytes.
pub const ERASE_BLOCK_SIZE: u32 = 1024;

/// Flash layout parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Erase block size in bytes.
    pub block_size: u32,
    /// Upper bound for a single transfer; can only lower the transport's own
    /// ceiling.
    pub chunk_size: usize,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            block_size: ERASE_BLOCK_SIZE,
            chunk_size: MAX_TRANSFER_SIZE,
        }
    }
}

/// A programmer link with its session state.
///
/// Every request is clamped to the chunk ceiling before it reaches the
/// transport. Dropping the device closes the session if it is still open
/// and then releases the target pins, whatever happened before.
pub struct FlashDevice<T: Transport> {
    transport: T,
    geometry: Geometry,
    initialized: bool,
}

impl<T: Transport> FlashDevice<T> {
    /// Wrap a transport using the default geometry.
    pub fn new(transport: T) -> Self {
        Self::with_geometry(transport, Geometry::default())
    }

    /// Wrap a transport with a custom geometry.
    pub fn with_geometry(transport: T, geometry: Geometry) -> Self {
        Self {
            transport,
            geometry,
            initialized: false,
        }
    }

    /// Whether [`open`](Self::open) has initialized the link.
    pub fn is_open(&self) -> bool {
        self.initialized
    }

    /// Geometry in use.
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Erase block size, never zero.
    pub fn block_size(&self) -> u32 {
        self.geometry
            .block_size
            .max(1)
    }

    /// Largest chunk any single call will carry, never zero.
    pub fn max_chunk(&self) -> usize {
        self.transport
            .max_transfer_size()
            .min(self.geometry.chunk_size)
            .max(1)
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Bring the link up. Does nothing if it is already open.
    pub fn open(&mut self) -> Result<()> {
        if !self.initialized {
            debug!("Initializing programmer link");
            self.transport
                .link_init()?;
            self.initialized = true;
        }
        Ok(())
    }

    /// Return the link to idle. Does nothing if it is not open.
    pub fn close(&mut self) -> Result<()> {
        if self.initialized {
            debug!("Resetting programmer link");
            self.initialized = false;
            self.transport
                .link_reset()?;
        }
        Ok(())
    }

    /// Read at most one chunk starting at `address`.
    ///
    /// A result shorter than requested means the target had nothing more
    /// to give.
    pub fn read_chunk(&mut self, address: u32, size: usize) -> Result<Vec<u8>> {
        let size = size.min(self.max_chunk());
        if size == 0 {
            return Ok(Vec::new());
        }
        let mut data = self
            .transport
            .read_bytes(address, size)?;
        data.truncate(size);
        trace!("read 0x{address:04X}: {}/{size} bytes", data.len());
        Ok(data)
    }

    /// Write at most one chunk of `data` at `address`.
    ///
    /// Returns how many bytes the target accepted; fewer than offered means
    /// backpressure, not failure.
    pub fn write_chunk(&mut self, address: u32, data: &[u8]) -> Result<usize> {
        let data = &data[..data.len().min(self.max_chunk())];
        if data.is_empty() {
            return Ok(0);
        }
        let accepted = self
            .transport
            .write_bytes(address, data)?
            .min(data.len());
        trace!("write 0x{address:04X}: {accepted}/{} bytes", data.len());
        Ok(accepted)
    }

    /// Erase the block containing `address`.
    pub fn erase_block(&mut self, address: u32) -> Result<bool> {
        let aligned = address - address % self.block_size();
        let ok = self
            .transport
            .erase_region(aligned)?;
        trace!("erase 0x{aligned:04X}: {}", if ok { "ok" } else { "failed" });
        Ok(ok)
    }
}

impl<T: Transport> Drop for FlashDevice<T> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to reset programmer link: {e}");
        }
        if let Err(e) = self
            .transport
            .link_stop()
        {
            warn!("Failed to release target: {e}");
        }
    }
}
