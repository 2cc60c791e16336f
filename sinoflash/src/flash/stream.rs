//! Positioned, arbitrary-length flash I/O.
//!
//! [`FlashStream`] keeps a cursor over a [`FlashDevice`] and splits every
//! request into chunk-sized calls. It deliberately does not implement
//! `std::io::{Read, Write, Seek}`: short transfers are reported as counts
//! and seeking from the end of flash is not possible.

use crate::error::{Error, Result};
use crate::flash::device::FlashDevice;
use crate::flash::verify;
use crate::is_interrupted_requested;
use crate::transport::Transport;
use log::{debug, warn};

/// Origin for [`FlashStream::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    /// From address 0.
    Absolute,
    /// From the current cursor.
    Relative,
    /// From the end of flash (flash size is unknown, always rejected).
    FromEnd,
}

impl SeekMode {
    /// Map a numeric whence (0, 1, 2) to a seek mode.
    pub fn from_whence(whence: i32) -> Result<Self> {
        match whence {
            0 => Ok(Self::Absolute),
            1 => Ok(Self::Relative),
            2 => Ok(Self::FromEnd),
            other => Err(Error::UnsupportedSeekMode(format!("whence {other}"))),
        }
    }
}

/// Stream behaviour knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamConfig {
    /// Consecutive zero-byte writes tolerated before giving up.
    pub stall_retries: usize,
}

/// Progress of a chunked operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Bytes processed so far.
    pub done: usize,
    /// Bytes requested in total.
    pub total: usize,
    /// Address the next chunk starts at.
    pub address: u32,
}

/// Phase reported by [`FlashStream::program_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Erasing the blocks under the image.
    Erase,
    /// Writing the image.
    Write,
}

/// Outcome of [`FlashStream::program_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgramReport {
    /// Blocks the target reported as erased. Zero when erase was skipped.
    pub erased_blocks: usize,
    /// Blocks under the image that the erase stage asked for.
    pub covered_blocks: usize,
    /// Bytes written.
    pub written: usize,
}

/// Block-aligned start and unaligned end of `[start, start + size)`.
fn block_span(start: u32, size: usize, block: u64) -> (u64, u64) {
    let first = u64::from(start) - u64::from(start) % block;
    (first, u64::from(start) + size as u64)
}

fn check_interrupted() -> Result<()> {
    if is_interrupted_requested() {
        return Err(Error::Interrupted);
    }
    Ok(())
}

/// Cursor-based flash access over a [`FlashDevice`].
pub struct FlashStream<T: Transport> {
    device: FlashDevice<T>,
    cursor: u32,
    config: StreamConfig,
}

impl<T: Transport> FlashStream<T> {
    /// Create a stream positioned at address 0.
    pub fn new(device: FlashDevice<T>) -> Self {
        Self::with_config(device, StreamConfig::default())
    }

    /// Create a stream with custom behaviour.
    pub fn with_config(device: FlashDevice<T>, config: StreamConfig) -> Self {
        Self {
            device,
            cursor: 0,
            config,
        }
    }

    /// Borrow the device.
    pub fn device(&self) -> &FlashDevice<T> {
        &self.device
    }

    /// Mutably borrow the device.
    pub fn device_mut(&mut self) -> &mut FlashDevice<T> {
        &mut self.device
    }

    /// Consume the stream and return the device.
    pub fn into_device(self) -> FlashDevice<T> {
        self.device
    }

    /// Current cursor.
    pub fn tell(&self) -> u32 {
        self.cursor
    }

    /// Move the cursor and return its new value.
    ///
    /// Negative results clamp to 0.
    pub fn seek(&mut self, offset: i64, mode: SeekMode) -> Result<u32> {
        let target = match mode {
            SeekMode::Absolute => offset,
            SeekMode::Relative => i64::from(self.cursor).saturating_add(offset),
            SeekMode::FromEnd => {
                return Err(Error::UnsupportedSeekMode(
                    "seeking from the end of flash".into(),
                ));
            },
        };
        self.cursor = u32::try_from(target.max(0)).map_err(|_| {
            Error::AddressOutOfRange(format!("seek to 0x{target:X}"))
        })?;
        Ok(self.cursor)
    }

    fn advance(&mut self, n: usize) -> Result<()> {
        let next = u64::from(self.cursor) + n as u64;
        self.cursor = u32::try_from(next)
            .map_err(|_| Error::AddressOutOfRange(format!("cursor 0x{next:X}")))?;
        Ok(())
    }

    /// Read up to `n` bytes from the cursor.
    pub fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        self.read_with(n, |_| {})
    }

    /// Read up to `n` bytes from the cursor, reporting progress per chunk.
    ///
    /// A chunk shorter than requested marks the end of readable data: it is
    /// kept and the read stops there.
    pub fn read_with<F>(&mut self, n: usize, mut progress: F) -> Result<Vec<u8>>
    where
        F: FnMut(Progress),
    {
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            check_interrupted()?;
            let want = (n - out.len()).min(self.device.max_chunk());
            let chunk = self
                .device
                .read_chunk(self.cursor, want)?;
            let short = chunk.len() < want;
            self.advance(chunk.len())?;
            out.extend_from_slice(&chunk);
            progress(Progress {
                done: out.len(),
                total: n,
                address: self.cursor,
            });
            if short {
                debug!("Read ended at 0x{:04X} after {} bytes", self.cursor, out.len());
                break;
            }
        }
        Ok(out)
    }

    /// Write `data` at the cursor and return the number of bytes accepted.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.write_with(data, |_| {})
    }

    /// Write `data` at the cursor, reporting progress per chunk.
    ///
    /// Partial accepts continue with the remainder. After more than
    /// `stall_retries` consecutive zero-byte accepts the partial count is
    /// returned.
    pub fn write_with<F>(&mut self, data: &[u8], mut progress: F) -> Result<usize>
    where
        F: FnMut(Progress),
    {
        let max_chunk = self.device.max_chunk();
        let mut written = 0;
        let mut stalls = 0;

        while written < data.len() {
            check_interrupted()?;
            let end = (written + max_chunk).min(data.len());
            let accepted = self
                .device
                .write_chunk(self.cursor, &data[written..end])?;

            if accepted == 0 {
                stalls += 1;
                if stalls > self.config.stall_retries {
                    warn!(
                        "Target stopped accepting data at 0x{:04X} ({written}/{} bytes)",
                        self.cursor,
                        data.len()
                    );
                    break;
                }
                debug!("Write stalled at 0x{:04X}, retry {stalls}", self.cursor);
                continue;
            }

            stalls = 0;
            self.advance(accepted)?;
            written += accepted;
            progress(Progress {
                done: written,
                total: data.len(),
                address: self.cursor,
            });
        }
        Ok(written)
    }

    /// Erase the block containing `address`, or the cursor if `None`.
    pub fn erase(&mut self, address: Option<u32>) -> Result<bool> {
        let address = address.unwrap_or(self.cursor);
        self.device
            .erase_block(address)
    }

    /// Erase every block overlapping `[start, start + size)`.
    ///
    /// The trailing partial block is erased whole. Returns the number of
    /// blocks the target reported as erased.
    pub fn erase_range(&mut self, start: u32, size: usize) -> Result<usize> {
        self.erase_range_with(start, size, |_| {})
    }

    /// [`erase_range`](Self::erase_range) with per-block progress in bytes.
    pub fn erase_range_with<F>(&mut self, start: u32, size: usize, mut progress: F) -> Result<usize>
    where
        F: FnMut(Progress),
    {
        if size == 0 {
            return Ok(0);
        }

        let block = u64::from(self.device.block_size());
        let (first, end) = block_span(start, size, block);
        let total = usize::try_from(end - first).unwrap_or(usize::MAX);

        let mut erased = 0;
        let mut address = first;
        while address < end {
            check_interrupted()?;
            let block_addr = u32::try_from(address)
                .map_err(|_| Error::AddressOutOfRange(format!("erase at 0x{address:X}")))?;
            if self
                .device
                .erase_block(block_addr)?
            {
                erased += 1;
            } else {
                warn!("Erase of block 0x{block_addr:04X} failed");
            }
            address += block;
            progress(Progress {
                done: usize::try_from(address.min(end) - first).unwrap_or(total),
                total,
                address: u32::try_from(address).unwrap_or(u32::MAX),
            });
        }

        debug!("Erased {erased} block(s) from 0x{first:04X}");
        Ok(erased)
    }

    /// Optionally erase, then write `data` at `address`.
    ///
    /// Not atomic: a failure leaves whatever was erased or written in place.
    pub fn program(&mut self, address: u32, data: &[u8], erase: bool) -> Result<usize> {
        self.program_with(address, data, erase, |_, _| {})
            .map(|report| report.written)
    }

    /// [`program`](Self::program) with progress for each stage.
    ///
    /// A write that stops short fails with [`Error::WriteStalled`]. Blocks
    /// the target refused to erase do not fail the call; compare
    /// [`ProgramReport::erased_blocks`] with [`ProgramReport::covered_blocks`].
    pub fn program_with<F>(
        &mut self,
        address: u32,
        data: &[u8],
        erase: bool,
        mut progress: F,
    ) -> Result<ProgramReport>
    where
        F: FnMut(Stage, Progress),
    {
        let mut report = ProgramReport::default();
        if erase && !data.is_empty() {
            let block = u64::from(self.device.block_size());
            let (first, end) = block_span(address, data.len(), block);
            report.covered_blocks = usize::try_from((end - first).div_ceil(block)).unwrap_or(usize::MAX);
            report.erased_blocks =
                self.erase_range_with(address, data.len(), |p| progress(Stage::Erase, p))?;
        }

        self.seek(i64::from(address), SeekMode::Absolute)?;
        let written = self.write_with(data, |p| progress(Stage::Write, p))?;
        if written < data.len() {
            return Err(Error::WriteStalled {
                address: self.cursor,
                written,
                expected: data.len(),
            });
        }

        debug!("Wrote {written} bytes at 0x{address:04X}");
        report.written = written;
        Ok(report)
    }

    /// Read back `expected.len()` bytes at `address` and compare.
    pub fn verify(&mut self, address: u32, expected: &[u8]) -> Result<()> {
        self.verify_with(address, expected, |_| {})
    }

    /// [`verify`](Self::verify) with read progress.
    pub fn verify_with<F>(&mut self, address: u32, expected: &[u8], progress: F) -> Result<()>
    where
        F: FnMut(Progress),
    {
        self.seek(i64::from(address), SeekMode::Absolute)?;
        let actual = self.read_with(expected.len(), progress)?;
        verify::compare(address, expected, &actual)?;
        debug!("Verified {} bytes at 0x{address:04X}", expected.len());
        Ok(())
    }
}
