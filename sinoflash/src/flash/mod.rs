//! Flash transfer engine.
//!
//! [`FlashDevice`] owns the programmer session and issues single,
//! ceiling-bounded chunk calls. [`FlashStream`] layers a cursor on top and
//! turns arbitrary-length reads, writes and erases into chunk loops.
//!
//! ```rust
//! use sinoflash::flash::{FlashDevice, FlashStream};
//! use sinoflash::transport::DummyTransport;
//!
//! # fn main() -> sinoflash::Result<()> {
//! let mut device = FlashDevice::new(DummyTransport::default());
//! device.open()?;
//! let mut stream = FlashStream::new(device);
//! stream.program(0x0100, b"\x02\x00\x03", true)?;
//! stream.verify(0x0100, b"\x02\x00\x03")?;
//! # Ok(())
//! # }
//! ```

pub mod device;
pub mod stream;
pub mod verify;

pub use device::{ERASE_BLOCK_SIZE, FlashDevice, Geometry};
pub use stream::{FlashStream, ProgramReport, Progress, SeekMode, Stage, StreamConfig};
