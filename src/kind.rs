//! Value kind tags and per-kind payload codecs.
//!
//! [`ValueKind`] is the runtime discriminator the backend reports. Each kind
//! also has an uninhabited marker type implementing [`Kind`], which fixes the
//! native payload type and the binary encoding at compile time, so that
//! `Value<Dword>` and `Value<String>` are distinct types.

use crate::error::{RegistryError, Result};
use crate::utils::{decode_wide, decode_wide_terminated, encode_wide};
use byteorder::{BigEndian, ByteOrder, NativeEndian};
use std::borrow::Cow;
use std::fmt;

/// Registry value data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueKind {
    /// Binary data.
    Binary,

    /// 32-bit integer, native byte order.
    Dword,

    /// 32-bit big-endian integer.
    DwordBigEndian,

    /// String with environment variables.
    ExpandString,

    /// Symbolic link (Unicode).
    Link,

    /// Multiple strings.
    MultiString,

    /// No value type.
    None,

    /// 64-bit integer, native byte order.
    Qword,

    /// String (null-terminated).
    String,
}

impl ValueKind {
    /// Every supported kind, in declaration order.
    pub const ALL: [ValueKind; 9] = [
        ValueKind::Binary,
        ValueKind::Dword,
        ValueKind::DwordBigEndian,
        ValueKind::ExpandString,
        ValueKind::Link,
        ValueKind::MultiString,
        ValueKind::None,
        ValueKind::Qword,
        ValueKind::String,
    ];

    /// Parses a value kind from the backend's numeric tag.
    ///
    /// # Errors
    ///
    /// Tags outside the supported set (resource lists and vendor tags
    /// included) are rejected with [`RegistryError::UnsupportedKind`].
    pub fn from_u32(value: u32) -> Result<Self> {
        match value {
            0 => Ok(ValueKind::None),
            1 => Ok(ValueKind::String),
            2 => Ok(ValueKind::ExpandString),
            3 => Ok(ValueKind::Binary),
            4 => Ok(ValueKind::Dword),
            5 => Ok(ValueKind::DwordBigEndian),
            6 => Ok(ValueKind::Link),
            7 => Ok(ValueKind::MultiString),
            11 => Ok(ValueKind::Qword),
            _ => Err(RegistryError::UnsupportedKind(value)),
        }
    }

    /// Returns the backend's numeric tag for this kind.
    pub fn as_u32(self) -> u32 {
        match self {
            ValueKind::None => 0,
            ValueKind::String => 1,
            ValueKind::ExpandString => 2,
            ValueKind::Binary => 3,
            ValueKind::Dword => 4,
            ValueKind::DwordBigEndian => 5,
            ValueKind::Link => 6,
            ValueKind::MultiString => 7,
            ValueKind::Qword => 11,
        }
    }

    /// Returns the name of this value type.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::None => "REG_NONE",
            ValueKind::String => "REG_SZ",
            ValueKind::ExpandString => "REG_EXPAND_SZ",
            ValueKind::Binary => "REG_BINARY",
            ValueKind::Dword => "REG_DWORD",
            ValueKind::DwordBigEndian => "REG_DWORD_BIG_ENDIAN",
            ValueKind::Link => "REG_LINK",
            ValueKind::MultiString => "REG_MULTI_SZ",
            ValueKind::Qword => "REG_QWORD",
        }
    }

    /// Returns the encoded size for fixed-width kinds.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            ValueKind::Dword | ValueKind::DwordBigEndian => Some(4),
            ValueKind::Qword => Some(8),
            _ => Option::None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Compile-time description of one value kind.
///
/// Implemented only by the marker types in this module.
pub trait Kind: sealed::Sealed + Copy + fmt::Debug + PartialEq + Eq + 'static {
    /// Runtime tag of this kind.
    const KIND: ValueKind;

    /// Native payload type.
    type Payload: Clone + fmt::Debug + PartialEq;

    /// Encodes the payload into the bytes handed to the backend.
    fn encode(payload: &Self::Payload) -> Cow<'_, [u8]>;

    /// Decodes bytes read from the backend.
    fn decode(bytes: &[u8]) -> Result<Self::Payload>;
}

/// Opaque byte sequence (`REG_BINARY`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binary {}

/// 32-bit unsigned integer in native byte order (`REG_DWORD`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dword {}

/// 32-bit unsigned integer in big-endian order (`REG_DWORD_BIG_ENDIAN`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DwordBigEndian {}

/// Text with `%NAME%` placeholders (`REG_EXPAND_SZ`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandString {}

/// Symbolic link target, stored without terminator (`REG_LINK`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {}

/// Ordered list of strings (`REG_MULTI_SZ`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiString {}

/// Untyped bytes (`REG_NONE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum None {}

/// 64-bit unsigned integer in native byte order (`REG_QWORD`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qword {}

/// NUL-terminated text (`REG_SZ`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum String {}

impl sealed::Sealed for Binary {}
impl sealed::Sealed for Dword {}
impl sealed::Sealed for DwordBigEndian {}
impl sealed::Sealed for ExpandString {}
impl sealed::Sealed for Link {}
impl sealed::Sealed for MultiString {}
impl sealed::Sealed for None {}
impl sealed::Sealed for Qword {}
impl sealed::Sealed for String {}

fn require_len(bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() < expected {
        return Err(RegistryError::TruncatedData {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

impl Kind for Binary {
    const KIND: ValueKind = ValueKind::Binary;
    type Payload = Vec<u8>;

    fn encode(payload: &Vec<u8>) -> Cow<'_, [u8]> {
        Cow::Borrowed(payload.as_slice())
    }

    fn decode(bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

impl Kind for None {
    const KIND: ValueKind = ValueKind::None;
    type Payload = Vec<u8>;

    fn encode(payload: &Vec<u8>) -> Cow<'_, [u8]> {
        Cow::Borrowed(payload.as_slice())
    }

    fn decode(bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

impl Kind for Dword {
    const KIND: ValueKind = ValueKind::Dword;
    type Payload = u32;

    fn encode(payload: &u32) -> Cow<'_, [u8]> {
        let mut buf = [0u8; 4];
        NativeEndian::write_u32(&mut buf, *payload);
        Cow::Owned(buf.to_vec())
    }

    fn decode(bytes: &[u8]) -> Result<u32> {
        require_len(bytes, 4)?;
        Ok(NativeEndian::read_u32(bytes))
    }
}

impl Kind for DwordBigEndian {
    const KIND: ValueKind = ValueKind::DwordBigEndian;
    type Payload = u32;

    fn encode(payload: &u32) -> Cow<'_, [u8]> {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, *payload);
        Cow::Owned(buf.to_vec())
    }

    fn decode(bytes: &[u8]) -> Result<u32> {
        require_len(bytes, 4)?;
        Ok(BigEndian::read_u32(bytes))
    }
}

impl Kind for Qword {
    const KIND: ValueKind = ValueKind::Qword;
    type Payload = u64;

    fn encode(payload: &u64) -> Cow<'_, [u8]> {
        let mut buf = [0u8; 8];
        NativeEndian::write_u64(&mut buf, *payload);
        Cow::Owned(buf.to_vec())
    }

    fn decode(bytes: &[u8]) -> Result<u64> {
        require_len(bytes, 8)?;
        Ok(NativeEndian::read_u64(bytes))
    }
}

impl Kind for String {
    const KIND: ValueKind = ValueKind::String;
    type Payload = std::string::String;

    fn encode(payload: &std::string::String) -> Cow<'_, [u8]> {
        Cow::Owned(encode_wide(payload, true))
    }

    fn decode(bytes: &[u8]) -> Result<std::string::String> {
        decode_wide_terminated(bytes)
    }
}

impl Kind for ExpandString {
    const KIND: ValueKind = ValueKind::ExpandString;
    type Payload = std::string::String;

    fn encode(payload: &std::string::String) -> Cow<'_, [u8]> {
        Cow::Owned(encode_wide(payload, true))
    }

    fn decode(bytes: &[u8]) -> Result<std::string::String> {
        decode_wide_terminated(bytes)
    }
}

impl Kind for Link {
    const KIND: ValueKind = ValueKind::Link;
    type Payload = std::string::String;

    fn encode(payload: &std::string::String) -> Cow<'_, [u8]> {
        Cow::Owned(encode_wide(payload, false))
    }

    fn decode(bytes: &[u8]) -> Result<std::string::String> {
        decode_wide(bytes)
    }
}

impl Kind for MultiString {
    const KIND: ValueKind = ValueKind::MultiString;
    type Payload = Vec<std::string::String>;

    fn encode(payload: &Vec<std::string::String>) -> Cow<'_, [u8]> {
        let mut text = std::string::String::new();
        for element in payload {
            text.push_str(element);
            text.push('\0');
        }
        Cow::Owned(encode_wide(&text, true))
    }

    fn decode(bytes: &[u8]) -> Result<Vec<std::string::String>> {
        Ok(MultiString::split(&decode_wide(bytes)?))
    }
}

impl MultiString {
    /// Splits decoded multi-string text on NUL boundaries.
    ///
    /// Every element ends at a NUL. An empty element that reaches the end of
    /// the buffer is the list terminator and is dropped; empty elements
    /// anywhere else are kept. A final element missing its NUL is kept too.
    ///
    /// ```rust
    /// use reg_access::kind::MultiString;
    /// assert_eq!(MultiString::split("multi\0string\0\0"), ["multi", "string"]);
    /// assert_eq!(MultiString::split("a\0\0b\0\0"), ["a", "", "b"]);
    /// ```
    pub fn split(text: &str) -> Vec<std::string::String> {
        let mut elements = Vec::new();
        let mut rest = text;
        while !rest.is_empty() {
            match rest.find('\0') {
                Some(pos) => {
                    let element = &rest[..pos];
                    rest = &rest[pos + 1..];
                    if element.is_empty() && rest.is_empty() {
                        break;
                    }
                    elements.push(element.to_string());
                }
                Option::None => {
                    elements.push(rest.to_string());
                    break;
                }
            }
        }
        elements
    }
}
