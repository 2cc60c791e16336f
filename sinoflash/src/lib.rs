//! # sinoflash
//!
//! A library for programming the flash of SinoWealth 8051 MCUs through an
//! Arduino-based JTAG/ICP programmer.
//!
//! The programmer firmware speaks simpleRPC over a serial link and moves at
//! most 64 bytes per call. This crate provides:
//!
//! - a [`Transport`] seam with a simpleRPC implementation and an in-memory
//!   emulated target
//! - [`FlashDevice`] / [`FlashStream`]: chunked, block-aware read, write,
//!   erase, program and verify
//! - an Intel HEX decoder and image loader
//! - serial port discovery
//!
//! ## Features
//!
//! - `native` (default): serial port support via the `serialport` crate
//! - `serde`: serialization support for data types
//!
//! ## Example
//!
//! ```rust,no_run
//! use sinoflash::{FlashDevice, FlashImage, FlashStream, ImageFormat};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let image = FlashImage::from_file("firmware.hex", ImageFormat::Auto, 0)?;
//!
//!     #[cfg(feature = "native")]
//!     {
//!         use sinoflash::{RpcTransport, SerialConfig};
//!         use std::time::Duration;
//!
//!         let config = SerialConfig::new("/dev/ttyACM0", 115_200);
//!         let transport = RpcTransport::open(&config, Duration::from_secs(2))?;
//!         let mut device = FlashDevice::new(transport);
//!         device.open()?;
//!
//!         let mut stream = FlashStream::new(device);
//!         stream.program(image.start, &image.data, true)?;
//!         stream.verify(image.start, &image.data)?;
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::{Arc, OnceLock};

pub mod device;
pub mod error;
pub mod flash;
pub mod image;
pub mod port;
pub mod protocol;
pub mod transport;

static INTERRUPT_CHECKER: OnceLock<Arc<dyn Fn() -> bool + Send + Sync>> = OnceLock::new();

/// Register a global interruption checker used by long-running library loops.
///
/// The checker should return `true` when the current operation should stop
/// (for example after receiving Ctrl-C in CLI applications).
pub fn set_interrupt_checker<F>(checker: F)
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    let _ = INTERRUPT_CHECKER.set(Arc::new(checker));
}

/// Returns whether interruption was requested by the embedding application.
#[must_use]
pub fn is_interrupted_requested() -> bool {
    INTERRUPT_CHECKER
        .get()
        .is_some_and(|checker| checker())
}

#[cfg(test)]
thread_local! {
    static TEST_INTERRUPTED: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

/// Per-thread interrupt flag so parallel tests do not see each other.
#[cfg(test)]
pub(crate) fn test_set_interrupted(value: bool) {
    set_interrupt_checker(|| TEST_INTERRUPTED.with(std::cell::Cell::get));
    TEST_INTERRUPTED.with(|flag| flag.set(value));
}

#[cfg(feature = "native")]
pub use {device::auto_detect_port, port::NativePort};
pub use {
    device::{DetectedPort, DeviceKind, detect_ports},
    error::{Error, RecordError, Result},
    flash::{FlashDevice, FlashStream, Geometry, ProgramReport, Progress, SeekMode, Stage, StreamConfig},
    image::{ERASED_BYTE, FlashImage, IHexSegment, ImageFormat, ResolvedFormat},
    port::{Port, SerialConfig},
    transport::{DummyConfig, DummyTransport, RpcTransport, Transport},
};
