//! In-memory flash emulator.
//!
//! Emulates the programmer and target flash without hardware. Useful for
//! dry runs and tests.

use crate::error::Result;
use crate::image::ERASED_BYTE;
use crate::transport::{MAX_TRANSFER_SIZE, Transport};
use log::trace;

/// Configuration for the dummy target.
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Flash size in bytes.
    pub size: usize,
    /// Erase block size in bytes.
    pub block_size: usize,
    /// Largest chunk accepted per call.
    pub max_transfer: usize,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            size: 64 * 1024,
            block_size: 1024,
            max_transfer: MAX_TRANSFER_SIZE,
        }
    }
}

/// Call counters kept by [`DummyTransport`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DummyStats {
    /// `link_init` calls.
    pub inits: usize,
    /// `link_reset` calls.
    pub resets: usize,
    /// `link_stop` calls.
    pub stops: usize,
    /// `read_bytes` calls.
    pub reads: usize,
    /// `write_bytes` calls.
    pub writes: usize,
    /// `erase_region` calls.
    pub erases: usize,
}

/// Emulated programmer backed by a byte vector.
#[derive(Debug, Clone)]
pub struct DummyTransport {
    config: DummyConfig,
    data: Vec<u8>,
    stats: DummyStats,
}

impl DummyTransport {
    /// Create a dummy target with the given configuration, fully erased.
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![ERASED_BYTE; config.size];
        Self {
            config,
            data,
            stats: DummyStats::default(),
        }
    }

    /// Create a dummy target with pre-filled contents.
    pub fn with_data(config: DummyConfig, initial: &[u8]) -> Self {
        let mut target = Self::new(config);
        let len = initial.len().min(target.data.len());
        target.data[..len].copy_from_slice(&initial[..len]);
        target
    }

    /// Flash contents.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Call counters.
    pub fn stats(&self) -> DummyStats {
        self.stats
    }

    /// Configuration in use.
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    fn bounds(&self, address: u32, len: usize) -> (usize, usize) {
        let start = (address as usize).min(self.data.len());
        let end = start.saturating_add(len).min(self.data.len());
        (start, end)
    }
}

impl Default for DummyTransport {
    fn default() -> Self {
        Self::new(DummyConfig::default())
    }
}

impl Transport for DummyTransport {
    fn link_init(&mut self) -> Result<()> {
        self.stats.inits += 1;
        Ok(())
    }

    fn link_reset(&mut self) -> Result<()> {
        self.stats.resets += 1;
        Ok(())
    }

    fn link_stop(&mut self) -> Result<()> {
        self.stats.stops += 1;
        Ok(())
    }

    fn read_bytes(&mut self, address: u32, size: usize) -> Result<Vec<u8>> {
        self.stats.reads += 1;
        let (start, end) = self.bounds(address, size.min(self.config.max_transfer));
        trace!("dummy read 0x{address:04X} +{}", end - start);
        Ok(self.data[start..end].to_vec())
    }

    fn write_bytes(&mut self, address: u32, data: &[u8]) -> Result<usize> {
        self.stats.writes += 1;
        let (start, end) = self.bounds(address, data.len().min(self.config.max_transfer));
        self.data[start..end].copy_from_slice(&data[..end - start]);
        trace!("dummy write 0x{address:04X} +{}", end - start);
        Ok(end - start)
    }

    fn erase_region(&mut self, address: u32) -> Result<bool> {
        self.stats.erases += 1;
        let block = self.config.block_size.max(1);
        let start = address as usize / block * block;
        if start >= self.data.len() {
            return Ok(false);
        }
        let end = (start + block).min(self.data.len());
        self.data[start..end].fill(ERASED_BYTE);
        trace!("dummy erase 0x{start:04X}..0x{end:04X}");
        Ok(true)
    }

    fn max_transfer_size(&self) -> usize {
        self.config.max_transfer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> DummyConfig {
        DummyConfig {
            size: 256,
            block_size: 64,
            max_transfer: 16,
        }
    }

    #[test]
    fn test_fresh_target_is_erased() {
        let target = DummyTransport::new(small());
        assert!(target.data().iter().all(|&b| b == ERASED_BYTE));
    }

    #[test]
    fn test_read_is_limited_by_ceiling_and_capacity() {
        let mut target = DummyTransport::new(small());
        assert_eq!(target.read_bytes(0, 100).unwrap().len(), 16);
        assert_eq!(target.read_bytes(250, 16).unwrap().len(), 6);
        assert!(target.read_bytes(256, 16).unwrap().is_empty());
        assert_eq!(target.stats().reads, 3);
    }

    #[test]
    fn test_write_past_end_is_partial() {
        let mut target = DummyTransport::new(small());
        assert_eq!(target.write_bytes(252, &[1; 8]).unwrap(), 4);
        assert_eq!(&target.data()[252..], &[1, 1, 1, 1]);
        assert_eq!(target.write_bytes(300, &[1; 8]).unwrap(), 0);
    }

    #[test]
    fn test_erase_clears_whole_block() {
        let mut target = DummyTransport::with_data(small(), &[0xAB; 256]);
        assert!(target.erase_region(70).unwrap());
        assert!(target.data()[64..128].iter().all(|&b| b == ERASED_BYTE));
        assert_eq!(target.data()[63], 0xAB);
        assert_eq!(target.data()[128], 0xAB);
        assert!(!target.erase_region(256).unwrap());
    }
}
