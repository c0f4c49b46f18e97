//! The registry backend boundary.
//!
//! Everything that touches the store goes through [`RegistryBackend`]. The
//! typed layer never caches: each call on a [`Key`](crate::Key) maps to one
//! (or, for the length/fill protocol, two) backend calls.

use crate::error::BackendError;
use chrono::{DateTime, Utc};
use std::fmt;

/// Result of a backend primitive.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Opaque backend handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawHandle(pub u64);

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// The predefined root keys.
///
/// Their handles exist for the whole process and are never closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RootKey {
    /// `HKEY_CLASSES_ROOT`
    ClassesRoot,
    /// `HKEY_CURRENT_USER`
    CurrentUser,
    /// `HKEY_LOCAL_MACHINE`
    LocalMachine,
    /// `HKEY_USERS`
    Users,
}

impl RootKey {
    /// All predefined roots.
    pub const ALL: [RootKey; 4] = [
        RootKey::ClassesRoot,
        RootKey::CurrentUser,
        RootKey::LocalMachine,
        RootKey::Users,
    ];

    /// Returns the predefined handle value.
    pub fn handle(self) -> RawHandle {
        match self {
            RootKey::ClassesRoot => RawHandle(0x8000_0000),
            RootKey::CurrentUser => RawHandle(0x8000_0001),
            RootKey::LocalMachine => RawHandle(0x8000_0002),
            RootKey::Users => RawHandle(0x8000_0003),
        }
    }

    /// Returns the root for a predefined handle value.
    pub fn from_handle(handle: RawHandle) -> Option<Self> {
        Self::ALL.into_iter().find(|root| root.handle() == handle)
    }

    /// Returns the canonical root name.
    pub fn name(self) -> &'static str {
        match self {
            RootKey::ClassesRoot => "HKEY_CLASSES_ROOT",
            RootKey::CurrentUser => "HKEY_CURRENT_USER",
            RootKey::LocalMachine => "HKEY_LOCAL_MACHINE",
            RootKey::Users => "HKEY_USERS",
        }
    }
}

impl fmt::Display for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Access mask requested when opening or creating a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRights(pub u32);

impl AccessRights {
    /// Query value data.
    pub const QUERY_VALUE: u32 = 0x0001;

    /// Create or overwrite values.
    pub const SET_VALUE: u32 = 0x0002;

    /// Create sub-keys.
    pub const CREATE_SUB_KEY: u32 = 0x0004;

    /// Enumerate sub-keys.
    pub const ENUMERATE_SUB_KEYS: u32 = 0x0008;

    /// Change notifications.
    pub const NOTIFY: u32 = 0x0010;

    /// Create symbolic links.
    pub const CREATE_LINK: u32 = 0x0020;

    /// Delete the key.
    pub const DELETE: u32 = 0x0001_0000;

    /// Standard read rights.
    pub const READ: u32 = 0x0002_0019;

    /// Standard write rights.
    pub const WRITE: u32 = 0x0002_0006;

    /// Every right.
    pub const ALL_ACCESS: u32 = 0x000F_003F;

    /// Mask used by every open and create issued by this crate.
    pub const DEFAULT: AccessRights = AccessRights(Self::ALL_ACCESS);

    /// Creates an access mask from raw bits.
    pub fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns true if every bit of `right` is granted.
    pub fn allows(&self, right: u32) -> bool {
        (self.0 & right) == right
    }
}

/// Whether `create_key` made a new key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The key did not exist and was created.
    CreatedNew,
    /// The key already existed and was opened.
    OpenedExisting,
}

/// Snapshot of a key's children, taken by one `query_info` call.
///
/// Goes stale as soon as the tree is mutated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChildCount {
    /// Number of sub-keys.
    pub sub_keys: u32,
    /// Longest sub-key name, in UTF-16 units.
    pub sub_key_max_len: u32,
    /// Number of values.
    pub values: u32,
    /// Longest value name, in UTF-16 units.
    pub value_max_len: u32,
}

impl ChildCount {
    /// Total number of enumeration entries.
    ///
    /// Saturates at `u32::MAX` rather than wrapping.
    pub fn total(&self) -> u32 {
        self.sub_keys.saturating_add(self.values)
    }

    /// Returns true if the key has neither sub-keys nor values.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Full `query_info` result.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyInfo {
    /// Child counts and name lengths.
    pub counts: ChildCount,
    /// Largest value payload, in bytes.
    pub max_value_data_len: u32,
    /// Last modification of the key.
    pub last_written: DateTime<Utc>,
}

/// Kind tag and byte length of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueInfo {
    /// Raw kind tag.
    pub kind: u32,
    /// Payload length in bytes.
    pub len: usize,
}

/// Primitive operations of a hierarchical registry store.
///
/// Handles returned by `open_key`/`create_key` belong to the caller and are
/// released with `close_key`. Predefined root handles ([`RootKey::handle`])
/// are always valid and closing one is a no-op.
pub trait RegistryBackend: Send + Sync + fmt::Debug {
    /// Opens an existing key at `path` below `parent`.
    fn open_key(&self, parent: RawHandle, path: &str, access: AccessRights)
        -> BackendResult<RawHandle>;

    /// Opens the key at `path`, creating it and any missing ancestors.
    fn create_key(
        &self,
        parent: RawHandle,
        path: &str,
        access: AccessRights,
    ) -> BackendResult<(RawHandle, Disposition)>;

    /// Releases a handle.
    fn close_key(&self, handle: RawHandle) -> BackendResult<()>;

    /// Writes a value, replacing any value of the same name.
    fn set_value(&self, handle: RawHandle, name: &str, kind: u32, data: &[u8])
        -> BackendResult<()>;

    /// Queries a value.
    ///
    /// With `buf == None` only the kind and length are reported. With a
    /// buffer shorter than the data the call fails with
    /// [`BackendError::MoreData`]; otherwise the data is copied to the front
    /// of `buf`.
    fn query_value(&self, handle: RawHandle, name: &str, buf: Option<&mut [u8]>)
        -> BackendResult<ValueInfo>;

    /// Deletes a value.
    fn delete_value(&self, handle: RawHandle, name: &str) -> BackendResult<()>;

    /// Deletes a key that has no sub-keys.
    fn delete_key(&self, handle: RawHandle, path: &str) -> BackendResult<()>;

    /// Deletes `path` and everything below it, or with `None` every sub-key
    /// and value of `handle` itself.
    fn delete_tree(&self, handle: RawHandle, path: Option<&str>) -> BackendResult<()>;

    /// Name of the sub-key at `index`.
    fn enum_key(&self, handle: RawHandle, index: u32) -> BackendResult<String>;

    /// Name of the value at `index`.
    fn enum_value(&self, handle: RawHandle, index: u32) -> BackendResult<String>;

    /// Child counts and timestamps.
    fn query_info(&self, handle: RawHandle) -> BackendResult<KeyInfo>;

    /// Renames `path` below `handle`, or `handle` itself with `None`.
    fn rename_key(&self, handle: RawHandle, path: Option<&str>, new_name: &str)
        -> BackendResult<()>;

    /// Blocks until pending writes to the key are durable.
    fn flush_key(&self, handle: RawHandle) -> BackendResult<()>;

    /// Expands `%NAME%` placeholders in `src`.
    ///
    /// Returns the UTF-16 unit count of the result including its NUL
    /// terminator. The result is written only when `dst` is large enough.
    fn expand_environment_strings(&self, src: &str, dst: Option<&mut [u16]>)
        -> BackendResult<usize>;
}
