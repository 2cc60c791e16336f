//! simpleRPC client.
//!
//! The Arduino programmer firmware exports its functions through the
//! simpleRPC protocol. The host first asks for the method table, then calls
//! methods by index with arguments packed in the device's byte order.
//!
//! ## Method discovery
//!
//! ```text
//! host -> device:  0xFF
//! device -> host:  "simpleRPC\0"
//!                  major minor patch            (3 bytes)
//!                  "<H\0"                       endianness + size_t code
//!                  "B: H;flash_read: ...\0"     one line per method
//!                  ...
//!                  "\0"                         end of table
//! ```
//!
//! ## Calls
//!
//! ```text
//! +-------+-------------------------------+
//! | index | arguments (packed, in order)  |
//! +-------+-------------------------------+
//! | 1     | variable                      |
//! +-------+-------------------------------+
//! ```
//!
//! Vectors travel as a `size_t` length followed by their elements; strings
//! are NUL-terminated.

use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, trace};
use std::io::{self, Read, Write};

/// Request byte asking the device for its method table.
pub const LIST_REQUEST: u8 = 0xFF;

/// Protocol identifier sent at the start of the method table.
pub const PROTOCOL_NAME: &str = "simpleRPC";

/// Supported protocol major version.
pub const PROTOCOL_MAJOR: u8 = 3;

/// Upper bound for any NUL-terminated string on the wire.
const MAX_STRING_LEN: usize = 1024;

/// Upper bound for the number of exported methods.
const MAX_METHODS: usize = 255;

/// Byte order announced by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// `<`
    Little,
    /// `>`
    Big,
}

impl Endianness {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            b'<' => Some(Self::Little),
            b'>' => Some(Self::Big),
            _ => None,
        }
    }
}

/// Wire type of a parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcType {
    /// `?`
    Bool,
    /// `b`
    I8,
    /// `B`
    U8,
    /// `h`
    I16,
    /// `H`
    U16,
    /// `i` / `l`
    I32,
    /// `I` / `L`
    U32,
    /// `q`
    I64,
    /// `Q`
    U64,
    /// `f`
    F32,
    /// `d`
    F64,
    /// `s`
    Str,
    /// `[T]`
    Vec(Box<RpcType>),
}

impl RpcType {
    /// Parse a type signature such as `B` or `[H]`.
    pub fn parse(sig: &str) -> Result<Self> {
        let sig = sig.trim();
        if let Some(inner) = sig
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
        {
            return Ok(Self::Vec(Box::new(Self::parse(inner)?)));
        }

        let mut chars = sig.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                Self::from_code(c).ok_or_else(|| Error::Rpc(format!("unsupported type '{sig}'")))
            },
            _ => Err(Error::Rpc(format!("unsupported type '{sig}'"))),
        }
    }

    fn from_code(code: char) -> Option<Self> {
        Some(match code {
            '?' => Self::Bool,
            'b' => Self::I8,
            'B' => Self::U8,
            'h' => Self::I16,
            'H' => Self::U16,
            'i' | 'l' => Self::I32,
            'I' | 'L' => Self::U32,
            'q' => Self::I64,
            'Q' => Self::U64,
            'f' => Self::F32,
            'd' => Self::F64,
            's' => Self::Str,
            _ => return None,
        })
    }

    /// Inclusive integer range of this type, if it is an integer.
    fn int_range(&self) -> Option<(i64, i64)> {
        Some(match self {
            Self::I8 => (i8::MIN.into(), i8::MAX.into()),
            Self::U8 => (0, u8::MAX.into()),
            Self::I16 => (i16::MIN.into(), i16::MAX.into()),
            Self::U16 => (0, u16::MAX.into()),
            Self::I32 => (i32::MIN.into(), i32::MAX.into()),
            Self::U32 => (0, u32::MAX.into()),
            Self::I64 | Self::U64 => (i64::MIN, i64::MAX),
            _ => return None,
        })
    }
}

/// A value carried in a call or a response.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcValue {
    /// No value (void return).
    Unit,
    /// Boolean.
    Bool(bool),
    /// Any integer type.
    Int(i64),
    /// Any floating point type.
    Float(f64),
    /// String.
    Str(String),
    /// Vector.
    Vec(Vec<RpcValue>),
}

impl RpcValue {
    /// Build a vector value from raw bytes.
    pub fn bytes(data: &[u8]) -> Self {
        Self::Vec(
            data.iter()
                .map(|&b| Self::Int(i64::from(b)))
                .collect(),
        )
    }

    /// Interpret the value as a byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Self::Vec(items) => items
                .iter()
                .map(|item| match item {
                    Self::Int(v) => u8::try_from(*v)
                        .map_err(|_| Error::Rpc(format!("byte value {v} out of range"))),
                    other => Err(Error::Rpc(format!("expected byte, got {other:?}"))),
                })
                .collect(),
            other => Err(Error::Rpc(format!("expected byte vector, got {other:?}"))),
        }
    }

    /// Interpret the value as an unsigned integer.
    pub fn as_u64(&self) -> Result<u64> {
        match self {
            Self::Int(v) => {
                u64::try_from(*v).map_err(|_| Error::Rpc(format!("negative count {v}")))
            },
            Self::Bool(b) => Ok(u64::from(*b)),
            other => Err(Error::Rpc(format!("expected integer, got {other:?}"))),
        }
    }

    /// Interpret the value as a boolean (integers are truthy when non-zero).
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Int(v) => Ok(*v != 0),
            other => Err(Error::Rpc(format!("expected boolean, got {other:?}"))),
        }
    }
}

impl From<u32> for RpcValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<usize> for RpcValue {
    fn from(v: usize) -> Self {
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

/// One exported method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcMethod {
    /// Index used on the wire.
    pub index: u8,
    /// Method name (first word of the documentation string).
    pub name: String,
    /// Remaining documentation.
    pub doc: String,
    /// Return type, `None` for void.
    pub ret: Option<RpcType>,
    /// Parameter types in call order.
    pub params: Vec<RpcType>,
}

impl RpcMethod {
    /// Parse a method table line: `"<ret>: <params>;<name>: <doc>"`.
    pub fn parse(index: u8, line: &str) -> Result<Self> {
        let (signature, doc) = line
            .split_once(';')
            .ok_or_else(|| Error::Rpc(format!("malformed method line '{line}'")))?;
        let (ret, params) = signature
            .split_once(':')
            .ok_or_else(|| Error::Rpc(format!("malformed signature '{signature}'")))?;

        let ret = if ret.trim().is_empty() {
            None
        } else {
            Some(RpcType::parse(ret)?)
        };
        let params = params
            .split_whitespace()
            .map(RpcType::parse)
            .collect::<Result<Vec<_>>>()?;

        let (name, doc) = doc.split_once(':').unwrap_or((doc, ""));

        Ok(Self {
            index,
            name: name.trim().to_string(),
            doc: doc.trim().to_string(),
            ret,
            params,
        })
    }
}

/// simpleRPC client over a byte stream.
pub struct SimpleRpc<P: Read + Write> {
    port: P,
    endianness: Endianness,
    size_type: RpcType,
    version: (u8, u8, u8),
    methods: Vec<RpcMethod>,
}

impl<P: Read + Write> SimpleRpc<P> {
    /// Query the method table and return a ready client.
    pub fn connect(mut port: P) -> Result<Self> {
        port.write_all(&[LIST_REQUEST])?;
        port.flush()?;

        let protocol = read_cstring(&mut port)?;
        if protocol != PROTOCOL_NAME {
            return Err(Error::Rpc(format!(
                "unexpected protocol identifier '{protocol}'"
            )));
        }

        let mut version = [0u8; 3];
        port.read_exact(&mut version)
            .map_err(read_error)?;
        if version[0] != PROTOCOL_MAJOR {
            return Err(Error::Rpc(format!(
                "unsupported protocol version {}.{}.{}",
                version[0], version[1], version[2]
            )));
        }

        let hardware = read_cstring(&mut port)?;
        let mut codes = hardware.bytes();
        let endianness = codes
            .next()
            .and_then(Endianness::from_code)
            .ok_or_else(|| Error::Rpc(format!("bad hardware descriptor '{hardware}'")))?;
        let size_type = codes
            .next()
            .and_then(|c| RpcType::from_code(char::from(c)))
            .filter(|t| t.int_range().is_some())
            .ok_or_else(|| Error::Rpc(format!("bad hardware descriptor '{hardware}'")))?;

        let mut methods = Vec::new();
        for index in 0..=MAX_METHODS {
            let line = read_cstring(&mut port)?;
            if line.is_empty() {
                break;
            }
            let Ok(index) = u8::try_from(index) else {
                return Err(Error::Rpc("method table too large".into()));
            };
            match RpcMethod::parse(index, &line) {
                Ok(method) => {
                    trace!("RPC method {index}: {} {:?}", method.name, method.params);
                    methods.push(method);
                },
                Err(e) => debug!("Skipping RPC method {index}: {e}"),
            }
        }

        debug!(
            "simpleRPC {}.{}.{} ({:?}, size_t {:?}): {} methods",
            version[0],
            version[1],
            version[2],
            endianness,
            size_type,
            methods.len()
        );

        Ok(Self {
            port,
            endianness,
            size_type,
            version: (version[0], version[1], version[2]),
            methods,
        })
    }

    /// Protocol version announced by the device.
    pub fn version(&self) -> (u8, u8, u8) {
        self.version
    }

    /// Byte order announced by the device.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// All methods the device exports.
    pub fn methods(&self) -> &[RpcMethod] {
        &self.methods
    }

    /// Look up a method by name.
    pub fn method(&self, name: &str) -> Option<&RpcMethod> {
        self.methods
            .iter()
            .find(|m| m.name == name)
    }

    /// Get a mutable reference to the underlying stream.
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Consume the client and return the underlying stream.
    pub fn into_port(self) -> P {
        self.port
    }

    /// Call `name` with `args` and return its result.
    pub fn call(&mut self, name: &str, args: &[RpcValue]) -> Result<RpcValue> {
        let method = self
            .method(name)
            .cloned()
            .ok_or_else(|| Error::Rpc(format!("device does not export '{name}'")))?;

        if args.len() != method.params.len() {
            return Err(Error::Rpc(format!(
                "'{name}' takes {} arguments, {} given",
                method.params.len(),
                args.len()
            )));
        }

        let mut frame = vec![method.index];
        for (ty, value) in method
            .params
            .iter()
            .zip(args)
        {
            match self.endianness {
                Endianness::Little => {
                    encode::<LittleEndian>(&mut frame, ty, value, &self.size_type)?;
                },
                Endianness::Big => encode::<BigEndian>(&mut frame, ty, value, &self.size_type)?,
            }
        }

        trace!("RPC call {name} ({} bytes)", frame.len());
        self.port
            .write_all(&frame)?;
        self.port
            .flush()?;

        let Some(ret) = method.ret else {
            return Ok(RpcValue::Unit);
        };
        match self.endianness {
            Endianness::Little => decode::<LittleEndian, _>(&mut self.port, &ret, &self.size_type),
            Endianness::Big => decode::<BigEndian, _>(&mut self.port, &ret, &self.size_type),
        }
    }
}

fn read_error(e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::UnexpectedEof => {
            Error::Timeout(format!("no response from programmer: {e}"))
        },
        _ => Error::Io(e),
    }
}

fn read_cstring<R: Read>(reader: &mut R) -> Result<String> {
    let mut bytes = Vec::new();
    loop {
        let byte = reader
            .read_u8()
            .map_err(read_error)?;
        if byte == 0 {
            break;
        }
        if bytes.len() >= MAX_STRING_LEN {
            return Err(Error::Rpc("unterminated string in response".into()));
        }
        bytes.push(byte);
    }
    String::from_utf8(bytes).map_err(|e| Error::Rpc(format!("non UTF-8 string: {e}")))
}

fn int_arg(ty: &RpcType, value: &RpcValue) -> Result<i64> {
    let v = match value {
        RpcValue::Int(v) => *v,
        RpcValue::Bool(b) => i64::from(*b),
        other => return Err(Error::Rpc(format!("expected integer for {ty:?}, got {other:?}"))),
    };
    let (min, max) = ty
        .int_range()
        .ok_or_else(|| Error::Rpc(format!("{ty:?} is not an integer type")))?;
    if v < min || v > max {
        return Err(Error::Rpc(format!("argument {v} out of range for {ty:?}")));
    }
    Ok(v)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn encode_int<B: ByteOrder>(out: &mut Vec<u8>, ty: &RpcType, v: i64) -> Result<()> {
    match ty {
        RpcType::I8 => out.write_i8(v as i8)?,
        RpcType::U8 => out.write_u8(v as u8)?,
        RpcType::I16 => out.write_i16::<B>(v as i16)?,
        RpcType::U16 => out.write_u16::<B>(v as u16)?,
        RpcType::I32 => out.write_i32::<B>(v as i32)?,
        RpcType::U32 => out.write_u32::<B>(v as u32)?,
        RpcType::I64 => out.write_i64::<B>(v)?,
        RpcType::U64 => out.write_u64::<B>(v as u64)?,
        other => return Err(Error::Rpc(format!("{other:?} is not an integer type"))),
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn encode<B: ByteOrder>(
    out: &mut Vec<u8>,
    ty: &RpcType,
    value: &RpcValue,
    size_type: &RpcType,
) -> Result<()> {
    match ty {
        RpcType::Bool => {
            let b = match value {
                RpcValue::Bool(b) => *b,
                RpcValue::Int(v) => *v != 0,
                other => return Err(Error::Rpc(format!("expected boolean, got {other:?}"))),
            };
            out.write_u8(u8::from(b))?;
        },
        RpcType::F32 | RpcType::F64 => {
            let f = match value {
                RpcValue::Float(f) => *f,
                #[allow(clippy::cast_precision_loss)]
                RpcValue::Int(v) => *v as f64,
                other => return Err(Error::Rpc(format!("expected float, got {other:?}"))),
            };
            if *ty == RpcType::F32 {
                out.write_f32::<B>(f as f32)?;
            } else {
                out.write_f64::<B>(f)?;
            }
        },
        RpcType::Str => {
            let RpcValue::Str(s) = value else {
                return Err(Error::Rpc(format!("expected string, got {value:?}")));
            };
            out.extend_from_slice(s.as_bytes());
            out.push(0);
        },
        RpcType::Vec(inner) => {
            let RpcValue::Vec(items) = value else {
                return Err(Error::Rpc(format!("expected vector, got {value:?}")));
            };
            let len = RpcValue::from(items.len());
            encode_int::<B>(out, size_type, int_arg(size_type, &len)?)?;
            for item in items {
                encode::<B>(out, inner, item, size_type)?;
            }
        },
        int => encode_int::<B>(out, int, int_arg(int, value)?)?,
    }
    Ok(())
}

fn decode_int<B: ByteOrder, R: Read>(reader: &mut R, ty: &RpcType) -> Result<i64> {
    let v = match ty {
        RpcType::I8 => i64::from(reader.read_i8().map_err(read_error)?),
        RpcType::U8 => i64::from(reader.read_u8().map_err(read_error)?),
        RpcType::I16 => i64::from(reader.read_i16::<B>().map_err(read_error)?),
        RpcType::U16 => i64::from(reader.read_u16::<B>().map_err(read_error)?),
        RpcType::I32 => i64::from(reader.read_i32::<B>().map_err(read_error)?),
        RpcType::U32 => i64::from(reader.read_u32::<B>().map_err(read_error)?),
        RpcType::I64 => reader.read_i64::<B>().map_err(read_error)?,
        RpcType::U64 => {
            let v = reader.read_u64::<B>().map_err(read_error)?;
            i64::try_from(v).map_err(|_| Error::Rpc(format!("value {v} out of range")))?
        },
        other => return Err(Error::Rpc(format!("{other:?} is not an integer type"))),
    };
    Ok(v)
}

fn decode<B: ByteOrder, R: Read>(
    reader: &mut R,
    ty: &RpcType,
    size_type: &RpcType,
) -> Result<RpcValue> {
    Ok(match ty {
        RpcType::Bool => RpcValue::Bool(reader.read_u8().map_err(read_error)? != 0),
        RpcType::F32 => RpcValue::Float(f64::from(reader.read_f32::<B>().map_err(read_error)?)),
        RpcType::F64 => RpcValue::Float(reader.read_f64::<B>().map_err(read_error)?),
        RpcType::Str => RpcValue::Str(read_cstring(reader)?),
        RpcType::Vec(inner) => {
            let len = decode_int::<B, R>(reader, size_type)?;
            let len = usize::try_from(len)
                .map_err(|_| Error::Rpc(format!("invalid vector length {len}")))?;
            let mut items = Vec::with_capacity(len.min(MAX_STRING_LEN));
            for _ in 0..len {
                items.push(decode::<B, R>(reader, inner, size_type)?);
            }
            RpcValue::Vec(items)
        },
        int => RpcValue::Int(decode_int::<B, R>(reader, int)?),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Mock serial stream with separate read/write buffers.
    pub(crate) struct MockSerial {
        pub(crate) read_buf: VecDeque<u8>,
        pub(crate) write_buf: Vec<u8>,
    }

    impl MockSerial {
        pub(crate) fn new(response: &[u8]) -> Self {
            Self {
                read_buf: response
                    .iter()
                    .copied()
                    .collect(),
                write_buf: Vec::new(),
            }
        }

        pub(crate) fn push_response(&mut self, data: &[u8]) {
            self.read_buf
                .extend(data.iter().copied());
        }
    }

    impl Read for MockSerial {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.read_buf.is_empty() {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
            }
            let n = buf.len().min(self.read_buf.len());
            for b in buf.iter_mut().take(n) {
                *b = self.read_buf.pop_front().unwrap();
            }
            Ok(n)
        }
    }

    impl Write for MockSerial {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.write_buf
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Method table of the ICP programmer firmware.
    pub(crate) fn icp_method_table() -> Vec<u8> {
        let mut table = Vec::new();
        table.extend_from_slice(b"simpleRPC\0");
        table.extend_from_slice(&[3, 0, 0]);
        table.extend_from_slice(b"<H\0");
        for line in [
            ": ;phy_init: Enter ICP mode.",
            ": ;phy_reset: Leave ICP mode.",
            ": ;phy_stop: Release target pins.",
            "[B]: H H;icp_read: Read flash. @address: Address. @size: Bytes. @return: Data.",
            "H: H [B];icp_write: Write flash. @address: Address. @data: Data. @return: Count.",
            "?: H;icp_erase: Erase block. @address: Address. @return: Success.",
        ] {
            table.extend_from_slice(line.as_bytes());
            table.push(0);
        }
        table.push(0);
        table
    }

    #[test]
    fn test_parse_types() {
        assert_eq!(RpcType::parse("B").unwrap(), RpcType::U8);
        assert_eq!(RpcType::parse("L").unwrap(), RpcType::U32);
        assert_eq!(
            RpcType::parse("[H]").unwrap(),
            RpcType::Vec(Box::new(RpcType::U16))
        );
        assert!(RpcType::parse("(BB)").is_err());
        assert!(RpcType::parse("x").is_err());
    }

    #[test]
    fn test_parse_method_line() {
        let m = RpcMethod::parse(4, "B: H;flash_read: Read byte. @address: Addr.").unwrap();
        assert_eq!(m.index, 4);
        assert_eq!(m.name, "flash_read");
        assert_eq!(m.ret, Some(RpcType::U8));
        assert_eq!(m.params, vec![RpcType::U16]);
        assert!(m.doc.starts_with("Read byte."));

        let void = RpcMethod::parse(0, ": ;init: Initialize JTAG interface.").unwrap();
        assert_eq!(void.ret, None);
        assert!(void.params.is_empty());
    }

    #[test]
    fn test_connect_reads_method_table() {
        let rpc = SimpleRpc::connect(MockSerial::new(&icp_method_table())).unwrap();
        assert_eq!(rpc.version(), (3, 0, 0));
        assert_eq!(rpc.endianness(), Endianness::Little);
        assert_eq!(rpc.methods().len(), 6);
        assert_eq!(rpc.method("icp_erase").unwrap().index, 5);

        let port = rpc.into_port();
        assert_eq!(port.write_buf, vec![LIST_REQUEST]);
    }

    #[test]
    fn test_connect_rejects_other_protocol() {
        let result = SimpleRpc::connect(MockSerial::new(b"otherRPC\0\x03\x00\x00"));
        assert!(matches!(result, Err(Error::Rpc(_))));
    }

    #[test]
    fn test_connect_rejects_old_version() {
        let result = SimpleRpc::connect(MockSerial::new(b"simpleRPC\0\x02\x00\x00<H\0\0"));
        assert!(matches!(result, Err(Error::Rpc(_))));
    }

    #[test]
    fn test_call_packs_vector_little_endian() {
        let mut rpc = SimpleRpc::connect(MockSerial::new(&icp_method_table())).unwrap();
        rpc.port_mut().write_buf.clear();
        rpc.port_mut().push_response(&[3, 0]);

        let ret = rpc
            .call(
                "icp_write",
                &[RpcValue::from(0x1234u32), RpcValue::bytes(&[0xAA, 0xBB, 0xCC])],
            )
            .unwrap();

        assert_eq!(ret.as_u64().unwrap(), 3);
        assert_eq!(
            rpc.port_mut().write_buf,
            vec![4, 0x34, 0x12, 3, 0, 0xAA, 0xBB, 0xCC]
        );
    }

    #[test]
    fn test_call_decodes_byte_vector() {
        let mut rpc = SimpleRpc::connect(MockSerial::new(&icp_method_table())).unwrap();
        rpc.port_mut().push_response(&[2, 0, 0x12, 0x34]);

        let ret = rpc
            .call("icp_read", &[RpcValue::from(0u32), RpcValue::from(2usize)])
            .unwrap();
        assert_eq!(ret.to_bytes().unwrap(), vec![0x12, 0x34]);
    }

    #[test]
    fn test_call_void_reads_nothing() {
        let mut rpc = SimpleRpc::connect(MockSerial::new(&icp_method_table())).unwrap();
        assert_eq!(rpc.call("phy_init", &[]).unwrap(), RpcValue::Unit);
    }

    #[test]
    fn test_call_argument_out_of_range() {
        let mut rpc = SimpleRpc::connect(MockSerial::new(&icp_method_table())).unwrap();
        let result = rpc.call("icp_erase", &[RpcValue::from(0x1_0000u32)]);
        assert!(matches!(result, Err(Error::Rpc(_))));
    }

    #[test]
    fn test_call_unknown_method() {
        let mut rpc = SimpleRpc::connect(MockSerial::new(&icp_method_table())).unwrap();
        assert!(matches!(rpc.call("idcode", &[]), Err(Error::Rpc(_))));
    }

    #[test]
    fn test_missing_response_is_timeout() {
        let mut rpc = SimpleRpc::connect(MockSerial::new(&icp_method_table())).unwrap();
        let result = rpc.call("icp_erase", &[RpcValue::from(0u32)]);
        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[test]
    fn test_big_endian_device() {
        let mut table = Vec::new();
        table.extend_from_slice(b"simpleRPC\0\x03\x00\x00>I\0");
        table.extend_from_slice(b"I: I;echo: Echo a value.\0\0");
        let mut rpc = SimpleRpc::connect(MockSerial::new(&table)).unwrap();
        rpc.port_mut().write_buf.clear();
        rpc.port_mut().push_response(&[0x01, 0x02, 0x03, 0x04]);

        let ret = rpc.call("echo", &[RpcValue::from(0x0A0B_0C0Du32)]).unwrap();
        assert_eq!(ret, RpcValue::Int(0x0102_0304));
        assert_eq!(rpc.port_mut().write_buf, vec![0, 0x0A, 0x0B, 0x0C, 0x0D]);
    }
}
