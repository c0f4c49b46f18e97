//! Enumeration of a key's children.
//!
//! [`Children`] walks the sub-keys of a key (in backend order) and then its
//! values. The entry count is fixed by one [`ChildCount`] snapshot taken when
//! the iterator is created; mutations made during iteration are not
//! reflected in the count.

use crate::accessor::UnspecifiedValue;
use crate::backend::{ChildCount, RawHandle};
use crate::error::{RegistryError, Result};
use crate::key::Key;
use crate::utils::join_path;
use crate::value::ValueVariant;
use std::iter::FusedIterator;
use tracing::{error, trace};

/// A sub-key found during enumeration.
///
/// Nothing is opened until [`SubKey::open`] is called; the placeholder holds
/// only the parent and the name.
#[derive(Debug, Clone)]
pub struct SubKey<'k> {
    parent: &'k Key,
    name: String,
}

impl<'k> SubKey<'k> {
    pub(crate) fn new(parent: &'k Key, name: String) -> Self {
        Self { parent, name }
    }

    /// Name of the sub-key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The enumerated key.
    pub fn parent(&self) -> &'k Key {
        self.parent
    }

    /// Full display path of the sub-key.
    pub fn path(&self) -> String {
        join_path(self.parent.path(), &self.name)
    }

    /// Opens the sub-key.
    pub fn open(&self) -> Result<Key> {
        self.parent.child(&self.name)
    }

    /// Opens `path` below the sub-key without opening the sub-key itself.
    pub fn child(&self, path: &str) -> Result<Key> {
        if path.is_empty() {
            return self.open();
        }
        self.parent.child(&join_path(&self.name, path))
    }
}

/// Iterator over the sub-keys and then the values of a key.
///
/// Yields `Err` for entries that could not be read. After an
/// [`RegistryError::UnsupportedKind`] entry the iterator is exhausted.
#[derive(Debug, Clone)]
pub struct Children<'k> {
    key: &'k Key,
    handle: RawHandle,
    counts: ChildCount,
    front: u32,
    back: u32,
}

impl<'k> Children<'k> {
    pub(crate) fn new(key: &'k Key) -> Result<Self> {
        let handle = key.handle()?;
        let counts = key.child_counts()?;
        trace!(key = %key.path(), ?counts, "Starting enumeration");
        Ok(Self {
            key,
            handle,
            counts,
            front: 0,
            back: counts.total(),
        })
    }

    /// The snapshot the iterator was created with.
    pub fn counts(&self) -> ChildCount {
        self.counts
    }

    /// Index of the next entry from the front.
    pub fn position(&self) -> u32 {
        self.front
    }

    /// Past-the-end position for the same snapshot.
    ///
    /// `iter == iter.end()` holds exactly when nothing is left to yield from
    /// the front.
    pub fn end(&self) -> Children<'k> {
        Children {
            front: self.back,
            ..self.clone()
        }
    }

    fn entry(&self, index: u32) -> Result<ValueVariant<'k>> {
        let backend = self.key.backend();
        if index < self.counts.sub_keys {
            let name = backend.enum_key(self.handle, index).map_err(|source| {
                RegistryError::BackendQueryFailed {
                    operation: "enumerate sub-key",
                    target: self.key.path().to_string(),
                    source,
                }
            })?;
            trace!(index, name = %name, "Enumerated sub-key");
            Ok(ValueVariant::Key(SubKey::new(self.key, name)))
        } else {
            let value_index = index - self.counts.sub_keys;
            let name = backend
                .enum_value(self.handle, value_index)
                .map_err(|source| RegistryError::BackendQueryFailed {
                    operation: "enumerate value",
                    target: self.key.path().to_string(),
                    source,
                })?;
            trace!(index, name = %name, "Enumerated value");
            UnspecifiedValue::new(self.key, name).decode()
        }
    }

    fn checked(&mut self, entry: Result<ValueVariant<'k>>) -> Result<ValueVariant<'k>> {
        if let Err(RegistryError::UnsupportedKind(tag)) = &entry {
            error!(key = %self.key.path(), tag = *tag, "Unsupported value kind, ending enumeration");
            self.front = self.back;
        }
        entry
    }
}

impl PartialEq for Children<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle && self.front == other.front
    }
}

impl<'k> Iterator for Children<'k> {
    type Item = Result<ValueVariant<'k>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let index = self.front;
        self.front += 1;
        let entry = self.entry(index);
        Some(self.checked(entry))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back.saturating_sub(self.front) as usize;
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for Children<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        let entry = self.entry(self.back);
        Some(self.checked(entry))
    }
}

impl ExactSizeIterator for Children<'_> {}

impl FusedIterator for Children<'_> {}
