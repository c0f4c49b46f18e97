//! Typed registry values.
//!
//! A [`Value<K>`] is a name plus the native payload of kind `K`. The payload
//! is stored as given; encoding happens only when bytes are requested.
//! [`ValueVariant`] is the dynamic counterpart produced by enumeration, with
//! one case per kind plus a case for sub-keys.

use crate::backend::RegistryBackend;
use crate::error::{RegistryError, Result};
use crate::iter::SubKey;
use crate::kind::{self, Kind, ValueKind};
use crate::utils::{decode_wide_units, validate_value_name};
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;

/// A named value of kind `K`.
///
/// # Examples
///
/// ```rust
/// use reg_access::kind::Dword;
/// use reg_access::Value;
///
/// # fn main() -> reg_access::Result<()> {
/// let value = Value::<Dword>::new("dwordValue", 0x4d2)?;
/// assert_eq!(*value.data(), 1234);
/// assert_eq!(value.byte_len(), 4);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Value<K: Kind> {
    name: String,
    data: K::Payload,
    kind: PhantomData<K>,
}

impl<K: Kind> Value<K> {
    /// Creates a value after validating its name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidName`] for an empty name, a name
    /// containing NUL, or one longer than the value name limit.
    pub fn new(name: impl Into<String>, data: K::Payload) -> Result<Self> {
        let name = name.into();
        validate_value_name(&name)?;
        Ok(Self::from_parts(name, data))
    }

    /// Creates a value from a name the backend already holds.
    pub(crate) fn from_parts(name: String, data: K::Payload) -> Self {
        Self {
            name,
            data,
            kind: PhantomData,
        }
    }

    /// Returns the value name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the decoded payload.
    pub fn data(&self) -> &K::Payload {
        &self.data
    }

    /// Consumes the value, returning its payload.
    pub fn into_data(self) -> K::Payload {
        self.data
    }

    /// Returns the kind tag.
    pub fn kind(&self) -> ValueKind {
        K::KIND
    }

    /// Returns the bytes written to the backend.
    pub fn to_bytes(&self) -> Cow<'_, [u8]> {
        K::encode(&self.data)
    }

    /// Returns the encoded length in bytes.
    pub fn byte_len(&self) -> usize {
        self.to_bytes().len()
    }
}

impl Value<kind::MultiString> {
    /// Iterates over the elements in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.data.iter().map(String::as_str)
    }
}

impl Value<kind::ExpandString> {
    /// Substitutes `%NAME%` placeholders through the backend.
    ///
    /// Sizes the result with one call, allocates exactly that many units and
    /// fills them with a second call. The result keeps this value's name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ExpansionInconsistent`] if the fill pass
    /// reports a different length than the sizing pass.
    pub fn expand(&self, backend: &dyn RegistryBackend) -> Result<Value<kind::String>> {
        let query_failed = |source| RegistryError::BackendQueryFailed {
            operation: "expand",
            target: self.name.clone(),
            source,
        };

        let required = backend
            .expand_environment_strings(&self.data, None)
            .map_err(query_failed)?;
        let mut buf = vec![0u16; required];
        let filled = backend
            .expand_environment_strings(&self.data, Some(&mut buf))
            .map_err(query_failed)?;
        if filled != required {
            return Err(RegistryError::ExpansionInconsistent {
                expected: required,
                actual: filled,
            });
        }

        let units = buf.strip_suffix(&[0]).unwrap_or(&buf);
        let text = decode_wide_units(units)?;
        Ok(Value::from_parts(self.name.clone(), text))
    }
}

/// A child of a key: a decoded value of any kind, or a sub-key.
#[derive(Debug, Clone)]
pub enum ValueVariant<'k> {
    /// `REG_BINARY`
    Binary(Value<kind::Binary>),
    /// `REG_DWORD`
    Dword(Value<kind::Dword>),
    /// `REG_DWORD_BIG_ENDIAN`
    DwordBigEndian(Value<kind::DwordBigEndian>),
    /// `REG_EXPAND_SZ`
    ExpandString(Value<kind::ExpandString>),
    /// `REG_LINK`
    Link(Value<kind::Link>),
    /// `REG_MULTI_SZ`
    MultiString(Value<kind::MultiString>),
    /// `REG_NONE`
    None(Value<kind::None>),
    /// `REG_QWORD`
    Qword(Value<kind::Qword>),
    /// `REG_SZ`
    String(Value<kind::String>),
    /// A sub-key, not yet opened.
    Key(SubKey<'k>),
}

impl<'k> ValueVariant<'k> {
    /// Decodes raw bytes into the case selected by `kind`.
    pub fn decode(name: String, kind: ValueKind, bytes: &[u8]) -> Result<Self> {
        fn typed<K: Kind>(name: String, bytes: &[u8]) -> Result<Value<K>> {
            Ok(Value::from_parts(name, K::decode(bytes)?))
        }

        Ok(match kind {
            ValueKind::Binary => ValueVariant::Binary(typed(name, bytes)?),
            ValueKind::Dword => ValueVariant::Dword(typed(name, bytes)?),
            ValueKind::DwordBigEndian => ValueVariant::DwordBigEndian(typed(name, bytes)?),
            ValueKind::ExpandString => ValueVariant::ExpandString(typed(name, bytes)?),
            ValueKind::Link => ValueVariant::Link(typed(name, bytes)?),
            ValueKind::MultiString => ValueVariant::MultiString(typed(name, bytes)?),
            ValueKind::None => ValueVariant::None(typed(name, bytes)?),
            ValueKind::Qword => ValueVariant::Qword(typed(name, bytes)?),
            ValueKind::String => ValueVariant::String(typed(name, bytes)?),
        })
    }

    /// Returns the value or sub-key name.
    pub fn name(&self) -> &str {
        match self {
            ValueVariant::Binary(v) => v.name(),
            ValueVariant::Dword(v) => v.name(),
            ValueVariant::DwordBigEndian(v) => v.name(),
            ValueVariant::ExpandString(v) => v.name(),
            ValueVariant::Link(v) => v.name(),
            ValueVariant::MultiString(v) => v.name(),
            ValueVariant::None(v) => v.name(),
            ValueVariant::Qword(v) => v.name(),
            ValueVariant::String(v) => v.name(),
            ValueVariant::Key(k) => k.name(),
        }
    }

    /// Returns the value kind, or `None` for a sub-key.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            ValueVariant::Binary(_) => Some(ValueKind::Binary),
            ValueVariant::Dword(_) => Some(ValueKind::Dword),
            ValueVariant::DwordBigEndian(_) => Some(ValueKind::DwordBigEndian),
            ValueVariant::ExpandString(_) => Some(ValueKind::ExpandString),
            ValueVariant::Link(_) => Some(ValueKind::Link),
            ValueVariant::MultiString(_) => Some(ValueKind::MultiString),
            ValueVariant::None(_) => Some(ValueKind::None),
            ValueVariant::Qword(_) => Some(ValueKind::Qword),
            ValueVariant::String(_) => Some(ValueKind::String),
            ValueVariant::Key(_) => Option::None,
        }
    }

    /// Returns true for the sub-key case.
    pub fn is_key(&self) -> bool {
        matches!(self, ValueVariant::Key(_))
    }

    /// Returns the sub-key placeholder, if this is one.
    pub fn as_key(&self) -> Option<&SubKey<'k>> {
        match self {
            ValueVariant::Key(k) => Some(k),
            _ => Option::None,
        }
    }

    /// Returns the encoded payload, or `None` for a sub-key.
    pub fn to_bytes(&self) -> Option<Cow<'_, [u8]>> {
        Some(match self {
            ValueVariant::Binary(v) => v.to_bytes(),
            ValueVariant::Dword(v) => v.to_bytes(),
            ValueVariant::DwordBigEndian(v) => v.to_bytes(),
            ValueVariant::ExpandString(v) => v.to_bytes(),
            ValueVariant::Link(v) => v.to_bytes(),
            ValueVariant::MultiString(v) => v.to_bytes(),
            ValueVariant::None(v) => v.to_bytes(),
            ValueVariant::Qword(v) => v.to_bytes(),
            ValueVariant::String(v) => v.to_bytes(),
            ValueVariant::Key(_) => return Option::None,
        })
    }
}

impl fmt::Display for ValueVariant<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueVariant::Binary(v) => f.write_str(&hex::encode_upper(v.data())),
            ValueVariant::None(v) => f.write_str(&hex::encode_upper(v.data())),
            ValueVariant::Dword(v) => write!(f, "{} (0x{:08X})", v.data(), v.data()),
            ValueVariant::DwordBigEndian(v) => write!(f, "{} (0x{:08X})", v.data(), v.data()),
            ValueVariant::Qword(v) => write!(f, "{} (0x{:016X})", v.data(), v.data()),
            ValueVariant::String(v) => f.write_str(v.data()),
            ValueVariant::ExpandString(v) => f.write_str(v.data()),
            ValueVariant::Link(v) => f.write_str(v.data()),
            ValueVariant::MultiString(v) => f.write_str(&v.data().join(", ")),
            ValueVariant::Key(k) => write!(f, "[{}]", k.name()),
        }
    }
}
