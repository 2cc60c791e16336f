//! Error types for sinoflash.

use std::io;
use thiserror::Error;

/// Result type for sinoflash operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sinoflash operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (serial port, file operations).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port error.
    #[cfg(feature = "native")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Communication timeout.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// simpleRPC discovery or call failure.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Failure reported by the transport itself.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Seek mode the flash stream cannot honour.
    #[error("Unsupported seek mode: {0}")]
    UnsupportedSeekMode(String),

    /// Address arithmetic left the 32-bit flash address space.
    #[error("Address out of range: {0}")]
    AddressOutOfRange(String),

    /// Invalid Intel HEX record.
    #[error("Invalid Intel HEX at line {line}: {kind}")]
    MalformedRecord {
        /// 1-based line number of the offending record.
        line: usize,
        /// What was wrong with it.
        kind: RecordError,
    },

    /// Intel HEX file contained no data records.
    #[error("No data in Intel HEX file")]
    EmptyImage,

    /// The target stopped accepting data before the whole image was written.
    #[error("Write stalled at 0x{address:04X}: {written} of {expected} bytes written")]
    WriteStalled {
        /// Address of the first byte that was not accepted.
        address: u32,
        /// Bytes accepted before the stall.
        written: usize,
        /// Bytes that should have been written.
        expected: usize,
    },

    /// Readback differs from the expected data.
    #[error("Verification failed at 0x{address:04X}: expected 0x{expected:02X}, got 0x{actual:02X}")]
    VerifyMismatch {
        /// Address of the first differing byte.
        address: u32,
        /// Expected byte value.
        expected: u8,
        /// Byte value read back from flash.
        actual: u8,
    },

    /// Readback returned fewer bytes than expected.
    #[error("Verification failed: size mismatch (expected {expected}, got {actual})")]
    VerifySizeMismatch {
        /// Expected length.
        expected: usize,
        /// Length actually read back.
        actual: usize,
    },

    /// Operation interrupted by the embedding application.
    #[error("Operation interrupted")]
    Interrupted,

    /// Programmer not found.
    #[error("Programmer not found")]
    DeviceNotFound,

    /// Unsupported operation.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Reason an Intel HEX record was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Input contains a non-ASCII byte.
    #[error("not ASCII text")]
    NotAscii,
    /// Line does not start with `:`.
    #[error("missing ':'")]
    MissingColon,
    /// Odd number of digits or a non-hex character.
    #[error("bad hex")]
    BadHex,
    /// Fewer than five decoded bytes.
    #[error("too short")]
    TooShort,
    /// Byte count field disagrees with the data length.
    #[error("length mismatch")]
    LengthMismatch,
    /// Checksum does not bring the record sum to zero.
    #[error("bad checksum")]
    BadChecksum,
    /// Extended address record without exactly two data bytes.
    #[error("bad type {0:02X}")]
    BadExtendedAddress(u8),
}

impl Error {
    /// Whether this error came from a readback comparison.
    pub fn is_verification(&self) -> bool {
        matches!(
            self,
            Self::VerifyMismatch { .. } | Self::VerifySizeMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_record_message_names_line() {
        let err = Error::MalformedRecord {
            line: 3,
            kind: RecordError::BadChecksum,
        };
        assert_eq!(err.to_string(), "Invalid Intel HEX at line 3: bad checksum");
    }

    #[test]
    fn test_verify_mismatch_message() {
        let err = Error::VerifyMismatch {
            address: 0x1234,
            expected: 0xAA,
            actual: 0x55,
        };
        assert_eq!(
            err.to_string(),
            "Verification failed at 0x1234: expected 0xAA, got 0x55"
        );
        assert!(err.is_verification());
        assert!(!Error::EmptyImage.is_verification());
    }

    #[test]
    fn test_bad_extended_address_message() {
        assert_eq!(RecordError::BadExtendedAddress(4).to_string(), "bad type 04");
    }
}
