//! Flash image loading.
//!
//! An image is a contiguous run of bytes with a start address. It comes
//! either from a raw binary file (placed verbatim at a caller address) or
//! from an Intel HEX file (segments merged, caller address used as offset).

pub mod ihex;

use crate::error::{Error, Result};
use log::debug;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use ihex::IHexSegment;

/// Fill value for gaps and freshly erased flash.
pub const ERASED_BYTE: u8 = 0x00;

/// Requested input format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ImageFormat {
    /// Sniff the content.
    #[default]
    Auto,
    /// Intel HEX text.
    #[cfg_attr(feature = "serde", serde(rename = "ihex", alias = "hex"))]
    IntelHex,
    /// Raw bytes.
    #[cfg_attr(feature = "serde", serde(alias = "bin"))]
    Binary,
}

/// Format after auto-detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedFormat {
    /// Intel HEX text.
    IntelHex,
    /// Raw bytes.
    Binary,
}

impl ImageFormat {
    /// Resolve `Auto` by sniffing `content`.
    #[must_use]
    pub fn resolve(self, content: &[u8]) -> ResolvedFormat {
        match self {
            Self::IntelHex => ResolvedFormat::IntelHex,
            Self::Binary => ResolvedFormat::Binary,
            Self::Auto if ihex::detect(content) => ResolvedFormat::IntelHex,
            Self::Auto => ResolvedFormat::Binary,
        }
    }
}

impl FromStr for ImageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "ihex" | "hex" => Ok(Self::IntelHex),
            "binary" | "bin" => Ok(Self::Binary),
            other => Err(Error::Config(format!(
                "unknown image format '{other}' (expected auto, ihex or binary)"
            ))),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::IntelHex => "ihex",
            Self::Binary => "binary",
        })
    }
}

impl fmt::Display for ResolvedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::IntelHex => "Intel HEX",
            Self::Binary => "binary",
        })
    }
}

/// Bytes ready to be programmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashImage {
    /// Format the image was decoded from.
    pub format: ResolvedFormat,
    /// Flash address of the first byte.
    pub start: u32,
    /// Image contents.
    pub data: Vec<u8>,
    /// Number of Intel HEX segments merged (1 for binary).
    pub segments: usize,
}

impl FlashImage {
    /// Load an image from a file.
    pub fn from_file<P: AsRef<Path>>(path: P, format: ImageFormat, address: u32) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading image from: {}", path.display());
        let content = fs::read(path)?;
        Self::from_bytes(&content, format, address)
    }

    /// Decode an image from raw file contents.
    ///
    /// For binary input `address` is the start address; for Intel HEX it is
    /// added to every record address.
    pub fn from_bytes(content: &[u8], format: ImageFormat, address: u32) -> Result<Self> {
        let format = format.resolve(content);
        debug!("Image format: {format}");

        match format {
            ResolvedFormat::IntelHex => {
                let segments = ihex::parse(content)?;
                let (start, data) = ihex::merge_segments(&segments, address)?;
                Ok(Self {
                    format,
                    start,
                    data,
                    segments: segments.len(),
                })
            },
            ResolvedFormat::Binary => {
                if u64::from(address) + content.len() as u64 > u64::from(u32::MAX) + 1 {
                    return Err(Error::AddressOutOfRange(format!(
                        "{} bytes at 0x{address:08X}",
                        content.len()
                    )));
                }
                Ok(Self {
                    format,
                    start: address,
                    data: content.to_vec(),
                    segments: 1,
                })
            },
        }
    }

    /// Image length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the image holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_resolve_auto() {
        assert_eq!(
            ImageFormat::Auto.resolve(b":0100000011EE\n"),
            ResolvedFormat::IntelHex
        );
        assert_eq!(
            ImageFormat::Auto.resolve(&[0x02, 0x10, 0x00]),
            ResolvedFormat::Binary
        );
        assert_eq!(
            ImageFormat::Binary.resolve(b":0100000011EE\n"),
            ResolvedFormat::Binary
        );
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("auto".parse::<ImageFormat>().unwrap(), ImageFormat::Auto);
        assert_eq!("HEX".parse::<ImageFormat>().unwrap(), ImageFormat::IntelHex);
        assert_eq!("bin".parse::<ImageFormat>().unwrap(), ImageFormat::Binary);
        assert!("elf".parse::<ImageFormat>().is_err());
        assert_eq!(ImageFormat::IntelHex.to_string(), "ihex");
    }

    #[test]
    fn test_binary_image_at_address() {
        let image = FlashImage::from_bytes(&[1, 2, 3], ImageFormat::Binary, 0x200).unwrap();
        assert_eq!(image.start, 0x200);
        assert_eq!(image.data, vec![1, 2, 3]);
        assert_eq!(image.format, ResolvedFormat::Binary);
    }

    #[test]
    fn test_ihex_image_uses_address_as_offset() {
        let hex = b":0100100011DE\n:00000001FF\n";
        let image = FlashImage::from_bytes(hex, ImageFormat::Auto, 0x100).unwrap();
        assert_eq!(image.format, ResolvedFormat::IntelHex);
        assert_eq!(image.start, 0x110);
        assert_eq!(image.data, vec![0x11]);
    }

    #[test]
    fn test_ihex_without_data_is_empty_image() {
        let result = FlashImage::from_bytes(b":00000001FF\n", ImageFormat::IntelHex, 0);
        assert!(matches!(result, Err(Error::EmptyImage)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b":0100000011EE\n:00000001FF\n").unwrap();
        let image = FlashImage::from_file(file.path(), ImageFormat::Auto, 0).unwrap();
        assert_eq!(image.data, vec![0x11]);
        assert_eq!(image.segments, 1);
    }
}
