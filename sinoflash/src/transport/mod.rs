//! Transport abstraction between the flash engine and the programmer.
//!
//! A transport performs the primitive, chunk-bounded flash operations on the
//! target. The flash layer never talks to a serial port directly; it only
//! issues these calls and respects [`Transport::max_transfer_size`].
//!
//! ```text
//! +------------------+
//! |   FlashStream    |  positioned, arbitrary-length I/O
//! +--------+---------+
//!          |
//! +--------+---------+
//! |   FlashDevice    |  clamping, block alignment, link lifecycle
//! +--------+---------+
//!          |
//! +--------+---------+     +------------------+
//! |  Transport trait |---->|  RpcTransport    |  simpleRPC over serial
//! +------------------+     +------------------+
//!                          |  DummyTransport  |  in-memory flash
//!                          +------------------+
//! ```

pub mod dummy;
pub mod rpc;

pub use dummy::{DummyConfig, DummyTransport};
pub use rpc::{RpcMethods, RpcTransport};

use crate::error::Result;

/// Largest payload the Arduino programmer can buffer in one round trip.
pub const MAX_TRANSFER_SIZE: usize = 64;

/// Primitive flash operations offered by a programmer link.
///
/// Every call is a blocking request/response pair. Implementations are
/// expected to enforce their own chunk ceiling downstream; callers must not
/// exceed [`max_transfer_size`](Self::max_transfer_size) anyway.
pub trait Transport {
    /// Bring the link up (enter the target's programming mode).
    fn link_init(&mut self) -> Result<()>;

    /// Return the link to its idle state.
    fn link_reset(&mut self) -> Result<()>;

    /// Release the target pins unconditionally.
    fn link_stop(&mut self) -> Result<()>;

    /// Read up to `size` bytes starting at `address`.
    ///
    /// May return fewer bytes than requested; an empty result means the
    /// target produced no more data.
    fn read_bytes(&mut self, address: u32, size: usize) -> Result<Vec<u8>>;

    /// Write `data` at `address` and return how many bytes were accepted.
    fn write_bytes(&mut self, address: u32, data: &[u8]) -> Result<usize>;

    /// Erase the region that starts at `address`.
    fn erase_region(&mut self, address: u32) -> Result<bool>;

    /// Largest chunk a single call may carry.
    fn max_transfer_size(&self) -> usize {
        MAX_TRANSFER_SIZE
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn link_init(&mut self) -> Result<()> {
        (**self).link_init()
    }

    fn link_reset(&mut self) -> Result<()> {
        (**self).link_reset()
    }

    fn link_stop(&mut self) -> Result<()> {
        (**self).link_stop()
    }

    fn read_bytes(&mut self, address: u32, size: usize) -> Result<Vec<u8>> {
        (**self).read_bytes(address, size)
    }

    fn write_bytes(&mut self, address: u32, data: &[u8]) -> Result<usize> {
        (**self).write_bytes(address, data)
    }

    fn erase_region(&mut self, address: u32) -> Result<bool> {
        (**self).erase_region(address)
    }

    fn max_transfer_size(&self) -> usize {
        (**self).max_transfer_size()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn link_init(&mut self) -> Result<()> {
        (**self).link_init()
    }

    fn link_reset(&mut self) -> Result<()> {
        (**self).link_reset()
    }

    fn link_stop(&mut self) -> Result<()> {
        (**self).link_stop()
    }

    fn read_bytes(&mut self, address: u32, size: usize) -> Result<Vec<u8>> {
        (**self).read_bytes(address, size)
    }

    fn write_bytes(&mut self, address: u32, data: &[u8]) -> Result<usize> {
        (**self).write_bytes(address, data)
    }

    fn erase_region(&mut self, address: u32) -> Result<bool> {
        (**self).erase_region(address)
    }

    fn max_transfer_size(&self) -> usize {
        (**self).max_transfer_size()
    }
}
