//! Lazily-typed value accessor.

use crate::error::{RegistryError, Result};
use crate::key::Key;
use crate::kind::{Kind, ValueKind};
use crate::value::{Value, ValueVariant};
use std::cell::Cell;

/// A named value of a key whose kind has not been checked yet.
///
/// Creating one makes no backend call. The stored kind is queried on first
/// need and cached in the accessor; decoding always reads fresh data.
#[derive(Debug)]
pub struct UnspecifiedValue<'k> {
    key: &'k Key,
    name: String,
    kind: Cell<Option<ValueKind>>,
}

impl<'k> UnspecifiedValue<'k> {
    pub(crate) fn new(key: &'k Key, name: String) -> Self {
        Self {
            key,
            name,
            kind: Cell::new(None),
        }
    }

    /// Value name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key the value belongs to.
    pub fn key(&self) -> &'k Key {
        self.key
    }

    /// Stored kind of the value, queried once and then cached.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if the value does not exist,
    /// [`RegistryError::UnsupportedKind`] for a tag outside [`ValueKind`].
    pub fn kind(&self) -> Result<ValueKind> {
        if let Some(kind) = self.kind.get() {
            return Ok(kind);
        }
        let kind = ValueKind::from_u32(self.key.query_kind(&self.name)?)?;
        self.kind.set(Some(kind));
        Ok(kind)
    }

    /// Returns true if the stored kind is `kind`.
    pub fn is(&self, kind: ValueKind) -> Result<bool> {
        Ok(self.kind()? == kind)
    }

    /// Returns true if the value currently exists.
    pub fn exists(&self) -> Result<bool> {
        match self.key.query_kind(&self.name) {
            Ok(tag) => {
                self.kind.set(ValueKind::from_u32(tag).ok());
                Ok(true)
            }
            Err(RegistryError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Reads and decodes the value as kind `K`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::KindMismatch`] if the stored kind is not `K`.
    pub fn decode_as<K: Kind>(&self) -> Result<Value<K>> {
        let (tag, bytes) = self.key.read_value(&self.name)?;
        let found = ValueKind::from_u32(tag)?;
        self.kind.set(Some(found));
        if found != K::KIND {
            return Err(RegistryError::KindMismatch {
                name: self.name.clone(),
                expected: K::KIND,
                found,
            });
        }
        Ok(Value::from_parts(self.name.clone(), K::decode(&bytes)?))
    }

    /// Reads and decodes the value as whatever kind it is stored as.
    pub fn decode(&self) -> Result<ValueVariant<'static>> {
        let (tag, bytes) = self.key.read_value(&self.name)?;
        let kind = ValueKind::from_u32(tag)?;
        self.kind.set(Some(kind));
        ValueVariant::decode(self.name.clone(), kind, &bytes)
    }

    /// Writes `value`'s payload under this accessor's name.
    ///
    /// The cached kind becomes `K`.
    pub fn set<K: Kind>(&self, value: &Value<K>) -> Result<()> {
        self.key.write_value(&self.name, K::KIND, &value.to_bytes())?;
        self.kind.set(Some(K::KIND));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RootKey;
    use crate::kind::{Binary, Dword, Qword};
    use crate::memory::MemoryBackend;
    use std::sync::Arc;

    fn root() -> Key {
        Key::predefined(Arc::new(MemoryBackend::new()), RootKey::CurrentUser)
    }

    #[test]
    fn test_accessor_is_lazy() {
        let key = root();
        let missing = key.value_of("missing");
        assert_eq!(missing.name(), "missing");
        assert!(!missing.exists().unwrap());
        assert!(matches!(missing.kind(), Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn test_set_then_decode() {
        let key = root();
        let value = key.value_of("dwordValue");
        value.set(&Value::<Dword>::new("ignored", 0x4d2).unwrap()).unwrap();
        assert_eq!(value.kind().unwrap(), ValueKind::Dword);
        assert!(value.is(ValueKind::Dword).unwrap());
        assert_eq!(*value.decode_as::<Dword>().unwrap().data(), 0x4d2);
        assert_eq!(value.decode_as::<Dword>().unwrap().name(), "dwordValue");
    }

    #[test]
    fn test_kind_mismatch() {
        let key = root();
        key.set_value(&Value::<Dword>::new("dwordValue", 1).unwrap())
            .unwrap();
        match key.value_of("dwordValue").decode_as::<Qword>() {
            Err(RegistryError::KindMismatch { expected, found, .. }) => {
                assert_eq!(expected, ValueKind::Qword);
                assert_eq!(found, ValueKind::Dword);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_set_updates_cached_kind() {
        let key = root();
        let value = key.value_of("changing");
        value.set(&Value::<Dword>::new("changing", 7).unwrap()).unwrap();
        assert!(value.is(ValueKind::Dword).unwrap());
        value.set(&Value::<Binary>::new("changing", vec![7]).unwrap()).unwrap();
        assert!(value.is(ValueKind::Binary).unwrap());
    }

    #[test]
    fn test_unsupported_tag() {
        let key = root();
        key.backend()
            .set_value(key.raw_handle().unwrap(), "link-ish", 8, &[0; 4])
            .unwrap();
        let value = key.value_of("link-ish");
        assert!(value.exists().unwrap());
        assert!(matches!(value.kind(), Err(RegistryError::UnsupportedKind(8))));
        assert!(matches!(value.decode(), Err(RegistryError::UnsupportedKind(8))));
    }

    #[test]
    fn test_decode_dispatches_on_kind() {
        let key = root();
        key.set_value(&Value::<Qword>::new("qwordValue", 0x162e).unwrap())
            .unwrap();
        match key.value_of("qwordValue").decode().unwrap() {
            ValueVariant::Qword(v) => assert_eq!(*v.data(), 0x162e),
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}
