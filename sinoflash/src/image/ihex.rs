//! Intel HEX decoding.
//!
//! ## Record layout
//!
//! ```text
//! :LLAAAATTDD...DDCC
//!  |  |   | |      |
//!  |  |   | |      +-- checksum (two's complement of the byte sum)
//!  |  |   | +--------- LL data bytes
//!  |  |   +----------- record type
//!  |  +--------------- 16-bit address, big-endian
//!  +------------------ data byte count
//! ```
//!
//! Supported record types:
//!
//! | type | meaning                    |
//! |------|----------------------------|
//! | 00   | data                       |
//! | 01   | end of file                |
//! | 02   | extended segment address   |
//! | 04   | extended linear address    |
//!
//! Start address records (03, 05) carry no flash contents and are skipped.

use crate::error::{Error, RecordError, Result};
use crate::image::ERASED_BYTE;
use log::{debug, trace};

/// Data record.
pub const RECORD_DATA: u8 = 0x00;
/// End-of-file record.
pub const RECORD_EOF: u8 = 0x01;
/// Extended segment address record.
pub const RECORD_EXTENDED_SEGMENT: u8 = 0x02;
/// Extended linear address record.
pub const RECORD_EXTENDED_LINEAR: u8 = 0x04;

/// Bytes inspected by [`detect`].
const DETECT_WINDOW: usize = 256;

/// Lines inspected by [`detect`].
const DETECT_LINES: usize = 3;

/// ASCII line terminators. `\r\n` counts as one.
const LINE_BREAKS: [char; 7] = ['\n', '\r', '\x0b', '\x0c', '\x1c', '\x1d', '\x1e'];

/// Split on any of [`LINE_BREAKS`]. A trailing terminator does not start
/// an extra line.
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        let current = rest;
        if current.is_empty() {
            return None;
        }
        let Some(pos) = current.find(LINE_BREAKS) else {
            rest = "";
            return Some(current);
        };
        let width = if current[pos..].starts_with("\r\n") { 2 } else { 1 };
        rest = &current[pos + width..];
        Some(&current[..pos])
    })
}

/// 1-based line number of the byte following `prefix`.
fn line_after(prefix: &[u8]) -> usize {
    let mut line = 1;
    let mut bytes = prefix.iter().peekable();
    while let Some(&b) = bytes.next() {
        if b == b'\r' && bytes.peek() == Some(&&b'\n') {
            bytes.next();
        }
        if LINE_BREAKS.contains(&char::from(b)) {
            line += 1;
        }
    }
    line
}

/// Contiguous run of bytes decoded from data records.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IHexSegment {
    /// Absolute address of the first byte.
    pub address: u32,
    /// Segment contents.
    pub data: Vec<u8>,
}

impl IHexSegment {
    /// Exclusive end address, widened so it cannot overflow.
    pub fn end(&self) -> u64 {
        u64::from(self.address) + self.data.len() as u64
    }
}

struct Record {
    kind: u8,
    address: u16,
    data: Vec<u8>,
}

fn malformed(line: usize, kind: RecordError) -> Error {
    Error::MalformedRecord { line, kind }
}

fn decode_hex(digits: &str) -> Option<Vec<u8>> {
    if digits.len() % 2 != 0 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).ok())
        .collect()
}

fn parse_record(text: &str, line: usize) -> Result<Record> {
    let digits = text
        .strip_prefix(':')
        .ok_or_else(|| malformed(line, RecordError::MissingColon))?;
    let bytes = decode_hex(digits).ok_or_else(|| malformed(line, RecordError::BadHex))?;

    if bytes.len() < 5 {
        return Err(malformed(line, RecordError::TooShort));
    }

    let sum = bytes
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b));
    if sum != 0 {
        return Err(malformed(line, RecordError::BadChecksum));
    }

    let count = usize::from(bytes[0]);
    let data = &bytes[4..bytes.len() - 1];
    if data.len() != count {
        return Err(malformed(line, RecordError::LengthMismatch));
    }

    Ok(Record {
        kind: bytes[3],
        address: u16::from_be_bytes([bytes[1], bytes[2]]),
        data: data.to_vec(),
    })
}

/// Decode Intel HEX text into address-tagged segments.
///
/// Consecutive data records that continue each other are coalesced into a
/// single segment. Any malformed line aborts the parse; the error carries
/// the 1-based line number.
pub fn parse(content: &[u8]) -> Result<Vec<IHexSegment>> {
    if let Some(pos) = content.iter().position(|b| !b.is_ascii()) {
        return Err(malformed(line_after(&content[..pos]), RecordError::NotAscii));
    }
    let text = std::str::from_utf8(content).map_err(|_| malformed(1, RecordError::NotAscii))?;

    let mut segments = Vec::new();
    let mut current: Option<IHexSegment> = None;
    let mut base: u32 = 0;

    for (idx, raw) in split_lines(text).enumerate() {
        let line = idx + 1;
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let record = parse_record(raw, line)?;
        match record.kind {
            RECORD_DATA => {
                let address = base.wrapping_add(u32::from(record.address));
                match current.as_mut() {
                    Some(seg) if seg.end() == u64::from(address) => {
                        seg.data
                            .extend_from_slice(&record.data);
                    },
                    _ => {
                        if let Some(seg) = current.take() {
                            segments.push(seg);
                        }
                        current = Some(IHexSegment {
                            address,
                            data: record.data,
                        });
                    },
                }
            },
            RECORD_EOF => {
                trace!("EOF record at line {line}");
                break;
            },
            RECORD_EXTENDED_SEGMENT | RECORD_EXTENDED_LINEAR => {
                let [hi, lo] = record.data[..] else {
                    return Err(malformed(line, RecordError::BadExtendedAddress(record.kind)));
                };
                let value = u32::from(u16::from_be_bytes([hi, lo]));
                base = if record.kind == RECORD_EXTENDED_SEGMENT {
                    value << 4
                } else {
                    value << 16
                };
                trace!("Extended base 0x{base:08X} at line {line}");
            },
            other => trace!("Skipping record type {other:02X} at line {line}"),
        }
    }

    if let Some(seg) = current {
        segments.push(seg);
    }

    debug!("Parsed {} Intel HEX segments", segments.len());
    Ok(segments)
}

/// Guess whether `content` is Intel HEX.
///
/// Looks at the first 256 bytes only: they must be ASCII, and the first
/// few non-blank lines must each be `:` followed by hex digits.
pub fn detect(content: &[u8]) -> bool {
    let window = &content[..content.len().min(DETECT_WINDOW)];
    if !window.is_ascii() {
        return false;
    }
    let Ok(text) = std::str::from_utf8(window) else {
        return false;
    };

    let mut seen = 0;
    for line in split_lines(text)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(DETECT_LINES)
    {
        let Some(digits) = line.strip_prefix(':') else {
            return false;
        };
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return false;
        }
        seen += 1;
    }
    seen > 0
}

/// Flatten segments into one contiguous image.
///
/// Returns the start address (lowest segment address plus `base_offset`)
/// and a buffer spanning every segment. Gaps hold [`ERASED_BYTE`]; where
/// segments overlap, the one with the higher address (or the later one at
/// equal addresses) wins.
pub fn merge_segments(segments: &[IHexSegment], base_offset: u32) -> Result<(u32, Vec<u8>)> {
    if segments.is_empty() {
        return Err(Error::EmptyImage);
    }

    let mut sorted: Vec<&IHexSegment> = segments.iter().collect();
    sorted.sort_by_key(|s| s.address);

    let min = sorted[0].address;
    let max_end = sorted
        .iter()
        .map(|s| s.end())
        .max()
        .unwrap_or(u64::from(min));

    let start = min.checked_add(base_offset).ok_or_else(|| {
        Error::AddressOutOfRange(format!(
            "image start 0x{min:08X} + offset 0x{base_offset:08X}"
        ))
    })?;
    let end = max_end + u64::from(base_offset);
    if end > u64::from(u32::MAX) + 1 {
        return Err(Error::AddressOutOfRange(format!(
            "image end 0x{end:X} exceeds 32-bit address space"
        )));
    }

    let len = usize::try_from(end - u64::from(start))
        .map_err(|_| Error::AddressOutOfRange(format!("image of 0x{:X} bytes", end - u64::from(start))))?;
    let mut image = vec![ERASED_BYTE; len];
    for seg in sorted {
        let offset = (seg.address - min) as usize;
        image[offset..offset + seg.data.len()].copy_from_slice(&seg.data);
    }

    debug!(
        "Merged {} segments into 0x{start:04X}..0x{end:04X}",
        segments.len()
    );
    Ok((start, image))
}
