//! Open registry keys.
//!
//! A [`Key`] owns (or, for a predefined root, borrows) one backend handle and
//! the display path it was opened at. Owned handles are released exactly
//! once: by [`Key::close`] or when the key is dropped.

use crate::accessor::UnspecifiedValue;
use crate::backend::{AccessRights, KeyInfo, RawHandle, RegistryBackend, RootKey};
use crate::error::{BackendError, RegistryError, Result};
use crate::iter::Children;
use crate::kind::{self, Kind, ValueKind};
use crate::utils::{
    join_path, replace_last_component, validate_key_name, validate_key_path, validate_value_name,
};
use crate::value::Value;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, instrument, trace, warn};

pub use crate::backend::ChildCount;

/// How a [`Key`] holds its handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyHandle {
    /// Predefined root; never closed.
    Predefined(RawHandle),
    /// Issued by `open_key`/`create_key`; closed exactly once.
    Owned(RawHandle),
    /// Placeholder that refers to no key.
    Unopened,
}

/// An open registry key.
///
/// # Examples
///
/// ```rust
/// use reg_access::{MemoryBackend, Registry};
///
/// # fn main() -> reg_access::Result<()> {
/// let registry = Registry::new(MemoryBackend::new());
/// let software = registry.current_user().create("Software")?;
/// let vendor = software.create("Vendor")?;
/// assert_eq!(vendor.path(), "HKEY_CURRENT_USER\\Software\\Vendor");
/// assert_eq!(software.child_counts()?.sub_keys, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Key {
    backend: Arc<dyn RegistryBackend>,
    handle: KeyHandle,
    path: String,
}

impl Key {
    pub(crate) fn predefined(backend: Arc<dyn RegistryBackend>, root: RootKey) -> Self {
        Self {
            backend,
            handle: KeyHandle::Predefined(root.handle()),
            path: root.name().to_string(),
        }
    }

    fn owned(backend: Arc<dyn RegistryBackend>, handle: RawHandle, path: String) -> Self {
        Self {
            backend,
            handle: KeyHandle::Owned(handle),
            path,
        }
    }

    fn placeholder(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            handle: KeyHandle::Unopened,
            path: self.path.clone(),
        }
    }

    pub(crate) fn handle(&self) -> Result<RawHandle> {
        match self.handle {
            KeyHandle::Predefined(h) | KeyHandle::Owned(h) => Ok(h),
            KeyHandle::Unopened => Err(RegistryError::NotOpen(self.path.clone())),
        }
    }

    /// Display path, starting with the root name.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Backend this key was opened through.
    pub fn backend(&self) -> &Arc<dyn RegistryBackend> {
        &self.backend
    }

    /// Returns false for an unopened placeholder.
    pub fn is_open(&self) -> bool {
        self.handle != KeyHandle::Unopened
    }

    /// Returns true if dropping this key releases a backend handle.
    pub fn is_owned(&self) -> bool {
        matches!(self.handle, KeyHandle::Owned(_))
    }

    /// The backend handle, if any.
    pub fn raw_handle(&self) -> Option<RawHandle> {
        self.handle().ok()
    }

    /// Opens an existing key at `path` below this one.
    ///
    /// An empty `path` yields an unopened placeholder that owns nothing.
    ///
    /// # Errors
    ///
    /// [`RegistryError::OpenFailed`] if the key is missing or access is denied.
    #[instrument(skip(self), fields(parent = %self.path))]
    pub fn child(&self, path: &str) -> Result<Key> {
        if path.is_empty() {
            return Ok(self.placeholder());
        }
        validate_key_path(path)?;
        let parent = self.handle()?;
        let full_path = join_path(&self.path, path);

        let handle = self
            .backend
            .open_key(parent, path, AccessRights::DEFAULT)
            .map_err(|source| RegistryError::OpenFailed {
                path: full_path.clone(),
                source,
            })?;
        debug!(handle = %handle, "Opened child key");
        Ok(Key::owned(Arc::clone(&self.backend), handle, full_path))
    }

    /// Opens the key at `path`, creating it and any missing ancestors.
    #[instrument(skip(self), fields(parent = %self.path))]
    pub fn create(&self, path: &str) -> Result<Key> {
        validate_key_path(path)?;
        let parent = self.handle()?;
        let full_path = join_path(&self.path, path);

        let (handle, disposition) = self
            .backend
            .create_key(parent, path, AccessRights::DEFAULT)
            .map_err(|source| RegistryError::BackendWriteFailed {
                operation: "create key",
                target: full_path.clone(),
                source,
            })?;
        debug!(handle = %handle, ?disposition, "Created child key");
        Ok(Key::owned(Arc::clone(&self.backend), handle, full_path))
    }

    /// Accessor for the value `name`; no backend call is made yet.
    pub fn value_of(&self, name: impl Into<String>) -> UnspecifiedValue<'_> {
        UnspecifiedValue::new(self, name.into())
    }

    /// Writes a typed value under its own name.
    pub fn set_value<K: Kind>(&self, value: &Value<K>) -> Result<()> {
        self.write_value(value.name(), K::KIND, &value.to_bytes())
    }

    /// Deletes the value `name`. Deleting an absent value succeeds.
    pub fn delete_value(&self, name: &str) -> Result<()> {
        validate_value_name(name)?;
        let handle = self.handle()?;
        match self.backend.delete_value(handle, name) {
            Ok(()) => Ok(()),
            Err(BackendError::NotFound) => {
                debug!(key = %self.path, name, "Value already absent");
                Ok(())
            }
            Err(source) => Err(RegistryError::BackendDeleteFailed {
                target: join_path(&self.path, name),
                source,
            }),
        }
    }

    /// Deletes the sub-key at `path`.
    ///
    /// Without `recursive` the backend refuses keys that still have
    /// sub-keys. Deleting an absent key succeeds.
    pub fn remove(&self, path: &str, recursive: bool) -> Result<()> {
        validate_key_path(path)?;
        let handle = self.handle()?;
        let result = if recursive {
            self.backend.delete_tree(handle, Some(path))
        } else {
            self.backend.delete_key(handle, path)
        };
        match result {
            Ok(()) => {
                debug!(key = %self.path, path, recursive, "Removed sub-key");
                Ok(())
            }
            Err(BackendError::NotFound) => {
                debug!(key = %self.path, path, "Sub-key already absent");
                Ok(())
            }
            Err(source) => Err(RegistryError::BackendDeleteFailed {
                target: join_path(&self.path, path),
                source,
            }),
        }
    }

    /// Deletes every sub-key and value of this key, keeping the key itself.
    pub fn remove_subtree(&self) -> Result<()> {
        let handle = self.handle()?;
        self.backend
            .delete_tree(handle, None)
            .map_err(|source| RegistryError::BackendDeleteFailed {
                target: self.path.clone(),
                source,
            })
    }

    /// Renames this key. The display path follows the new name.
    pub fn rename(&mut self, new_name: &str) -> Result<()> {
        validate_key_name(new_name)?;
        let handle = self.handle()?;
        self.backend
            .rename_key(handle, None, new_name)
            .map_err(|source| RegistryError::BackendWriteFailed {
                operation: "rename key",
                target: self.path.clone(),
                source,
            })?;
        debug!(key = %self.path, new_name, "Renamed key");
        self.path = replace_last_component(&self.path, new_name);
        Ok(())
    }

    /// Renames the sub-key at `path` to `new_name`.
    pub fn rename_sub_key(&self, path: &str, new_name: &str) -> Result<()> {
        validate_key_path(path)?;
        validate_key_name(new_name)?;
        let handle = self.handle()?;
        self.backend
            .rename_key(handle, Some(path), new_name)
            .map_err(|source| RegistryError::BackendWriteFailed {
                operation: "rename key",
                target: join_path(&self.path, path),
                source,
            })
    }

    /// Child counts from one `query_info` call.
    pub fn child_counts(&self) -> Result<ChildCount> {
        Ok(self.info()?.counts)
    }

    /// Full key metadata.
    pub fn info(&self) -> Result<KeyInfo> {
        let handle = self.handle()?;
        self.backend
            .query_info(handle)
            .map_err(|source| RegistryError::BackendQueryFailed {
                operation: "query key info",
                target: self.path.clone(),
                source,
            })
    }

    /// When the key or its direct children last changed.
    pub fn last_write_time(&self) -> Result<DateTime<Utc>> {
        Ok(self.info()?.last_written)
    }

    /// Enumerates sub-keys, then values.
    pub fn iter(&self) -> Result<Children<'_>> {
        Children::new(self)
    }

    /// Blocks until pending writes to this key are durable.
    pub fn flush(&self) -> Result<()> {
        let handle = self.handle()?;
        self.backend
            .flush_key(handle)
            .map_err(|source| RegistryError::BackendWriteFailed {
                operation: "flush key",
                target: self.path.clone(),
                source,
            })?;
        debug!(key = %self.path, "Flushed key");
        Ok(())
    }

    /// Expands `%NAME%` placeholders through this key's backend.
    pub fn expand(&self, value: &Value<kind::ExpandString>) -> Result<Value<kind::String>> {
        value.expand(self.backend.as_ref())
    }

    /// Releases the handle now, reporting failure instead of logging it.
    pub fn close(mut self) -> Result<()> {
        match std::mem::replace(&mut self.handle, KeyHandle::Unopened) {
            KeyHandle::Owned(handle) => {
                self.backend
                    .close_key(handle)
                    .map_err(|source| RegistryError::BackendWriteFailed {
                        operation: "close key",
                        target: self.path.clone(),
                        source,
                    })?;
                debug!(key = %self.path, handle = %handle, "Closed key");
                Ok(())
            }
            KeyHandle::Predefined(_) | KeyHandle::Unopened => Ok(()),
        }
    }

    /// Kind tag of the value `name`, from a length-only query.
    pub(crate) fn query_kind(&self, name: &str) -> Result<u32> {
        let handle = self.handle()?;
        self.backend
            .query_value(handle, name, None)
            .map(|info| info.kind)
            .map_err(|source| self.value_query_error(name, source))
    }

    /// Reads kind and bytes of the value `name` with the length/fill protocol.
    pub(crate) fn read_value(&self, name: &str) -> Result<(u32, Vec<u8>)> {
        let handle = self.handle()?;
        let sized = self
            .backend
            .query_value(handle, name, None)
            .map_err(|source| self.value_query_error(name, source))?;

        let mut buf = vec![0u8; sized.len];
        let filled = self
            .backend
            .query_value(handle, name, Some(&mut buf))
            .map_err(|source| match source {
                BackendError::MoreData { required } => RegistryError::LengthMismatch {
                    name: name.to_string(),
                    expected: sized.len,
                    actual: required,
                },
                source => self.value_query_error(name, source),
            })?;

        if filled.len != sized.len || filled.kind != sized.kind {
            return Err(RegistryError::LengthMismatch {
                name: name.to_string(),
                expected: sized.len,
                actual: filled.len,
            });
        }
        trace!(key = %self.path, name, kind = filled.kind, len = filled.len, "Read value");
        Ok((filled.kind, buf))
    }

    pub(crate) fn write_value(&self, name: &str, kind: ValueKind, bytes: &[u8]) -> Result<()> {
        validate_value_name(name)?;
        let handle = self.handle()?;
        self.backend
            .set_value(handle, name, kind.as_u32(), bytes)
            .map_err(|source| RegistryError::BackendWriteFailed {
                operation: "set value",
                target: join_path(&self.path, name),
                source,
            })?;
        trace!(key = %self.path, name, %kind, len = bytes.len(), "Wrote value");
        Ok(())
    }

    fn value_query_error(&self, name: &str, source: BackendError) -> RegistryError {
        let target = join_path(&self.path, name);
        if source.is_not_found() {
            RegistryError::not_found("value", &target)
        } else {
            RegistryError::BackendQueryFailed {
                operation: "query value",
                target,
                source,
            }
        }
    }
}

impl Drop for Key {
    fn drop(&mut self) {
        if let KeyHandle::Owned(handle) = self.handle {
            if let Err(e) = self.backend.close_key(handle) {
                warn!(key = %self.path, handle = %handle, error = %e, "Failed to release key handle");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    fn setup() -> (Arc<MemoryBackend>, Key) {
        let backend = Arc::new(MemoryBackend::new());
        let root = Key::predefined(backend.clone(), RootKey::CurrentUser);
        (backend, root)
    }

    #[test]
    fn test_drop_releases_owned_handle() {
        let (backend, root) = setup();
        {
            let key = root.create("test").unwrap();
            assert!(key.is_owned());
            assert_eq!(backend.open_handle_count(), 1);
        }
        assert_eq!(backend.open_handle_count(), 0);
    }

    #[test]
    fn test_close_releases_once() {
        let (backend, root) = setup();
        let key = root.create("test").unwrap();
        key.close().unwrap();
        assert_eq!(backend.open_handle_count(), 0);
    }

    #[test]
    fn test_predefined_not_owned() {
        let (_, root) = setup();
        assert!(root.is_open());
        assert!(!root.is_owned());
        assert_eq!(root.raw_handle(), Some(RootKey::CurrentUser.handle()));
        root.close().unwrap();
    }

    #[test]
    fn test_empty_child_is_placeholder() {
        let (backend, root) = setup();
        let placeholder = root.child("").unwrap();
        assert!(!placeholder.is_open());
        assert_eq!(placeholder.raw_handle(), None);
        assert!(matches!(
            placeholder.child_counts(),
            Err(RegistryError::NotOpen(_))
        ));
        drop(placeholder);
        assert_eq!(backend.open_handle_count(), 0);
    }

    #[test]
    fn test_missing_child_reports_path() {
        let (_, root) = setup();
        match root.child("missing") {
            Err(RegistryError::OpenFailed { path, source }) => {
                assert_eq!(path, "HKEY_CURRENT_USER\\missing");
                assert_eq!(source, BackendError::NotFound);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_rename_updates_path() {
        let (_, root) = setup();
        let mut key = root.create("test\\oldName").unwrap();
        key.rename("newName").unwrap();
        assert_eq!(key.path(), "HKEY_CURRENT_USER\\test\\newName");
        assert!(root.child("test\\newName").is_ok());
        assert!(root.child("test\\oldName").is_err());
    }

    #[test]
    fn test_read_value_two_calls() {
        let (_, root) = setup();
        root.write_value("binaryValue", ValueKind::Binary, &[1, 2, 3, 4])
            .unwrap();
        let (tag, bytes) = root.read_value("binaryValue").unwrap();
        assert_eq!(tag, ValueKind::Binary.as_u32());
        assert_eq!(bytes, [1, 2, 3, 4]);
        assert!(matches!(
            root.read_value("missing"),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn test_remove_non_recursive_refuses_children() {
        let (_, root) = setup();
        root.create("parent\\child").unwrap();
        match root.remove("parent", false) {
            Err(e) => assert_eq!(e.backend_status(), Some(&BackendError::AccessDenied)),
            Ok(()) => panic!("non-recursive delete removed a key with children"),
        }
        root.remove("parent", true).unwrap();
        root.remove("parent", true).unwrap();
        assert!(root.child("parent").is_err());
    }

    #[test]
    fn test_flush_reaches_backend() {
        let (backend, root) = setup();
        root.flush().unwrap();
        assert_eq!(backend.flush_count(), 1);
    }
}
