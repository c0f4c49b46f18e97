//! Error types for registry access operations.
//!
//! Two layers: [`BackendError`] is the status a [`RegistryBackend`] call
//! reports, and [`RegistryError`] is what the typed layer surfaces, carrying
//! the path or value name the failed call was about.
//!
//! [`RegistryBackend`]: crate::backend::RegistryBackend

use crate::kind::ValueKind;
use thiserror::Error;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Status reported by a registry backend primitive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The key or value does not exist.
    #[error("not found")]
    NotFound,

    /// The handle's access mask does not permit the operation.
    #[error("access denied")]
    AccessDenied,

    /// The handle is not open (or was never issued).
    #[error("invalid handle")]
    InvalidHandle,

    /// The handle refers to a key that has been deleted.
    #[error("key has been marked for deletion")]
    KeyDeleted,

    /// The supplied buffer is too small.
    #[error("more data is available: {required} bytes required")]
    MoreData {
        /// Bytes needed to hold the data.
        required: usize,
    },

    /// Enumeration index past the last entry.
    #[error("no more items")]
    NoMoreItems,

    /// A sibling with the requested name already exists.
    #[error("already exists")]
    AlreadyExists,

    /// Malformed request (bad name, depth limit, ...).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl BackendError {
    /// Returns true for the "does not exist" status.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound)
    }
}

/// Errors surfaced by the typed access layer.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A required key could not be opened.
    #[error("failed to open key '{path}': {source}")]
    OpenFailed {
        /// Full display path of the key.
        path: String,
        #[source]
        source: BackendError,
    },

    /// A write (set value, create, rename, flush) was rejected by the backend.
    #[error("{operation} failed on '{target}': {source}")]
    BackendWriteFailed {
        /// Backend operation that failed.
        operation: &'static str,
        /// Key path or value name the write targeted.
        target: String,
        #[source]
        source: BackendError,
    },

    /// A delete was rejected by the backend.
    #[error("delete failed on '{target}': {source}")]
    BackendDeleteFailed {
        /// Key path or value name the delete targeted.
        target: String,
        #[source]
        source: BackendError,
    },

    /// A query or enumeration call was rejected by the backend.
    #[error("{operation} failed on '{target}': {source}")]
    BackendQueryFailed {
        /// Backend operation that failed.
        operation: &'static str,
        /// Key path or value name the query targeted.
        target: String,
        #[source]
        source: BackendError,
    },

    /// The backend reported a kind tag outside the supported set.
    #[error("unsupported value kind tag: {0:#x}")]
    UnsupportedKind(u32),

    /// Placeholder expansion returned a different length on the fill pass.
    #[error("environment expansion inconsistent: sized {expected} units, filled {actual}")]
    ExpansionInconsistent {
        /// Length reported by the sizing pass.
        expected: usize,
        /// Length reported by the fill pass.
        actual: usize,
    },

    /// A value changed between the sizing and the fill query.
    #[error("value '{name}' changed while reading: sized {expected} bytes, filled {actual}")]
    LengthMismatch {
        /// Value name.
        name: String,
        /// Length reported by the sizing pass.
        expected: usize,
        /// Length reported by the fill pass.
        actual: usize,
    },

    /// The stored kind differs from the kind requested.
    #[error("value '{name}' is {found}, not {expected}")]
    KindMismatch {
        /// Value name.
        name: String,
        /// Requested kind.
        expected: ValueKind,
        /// Kind reported by the backend.
        found: ValueKind,
    },

    /// Key or value not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Payload shorter than its kind's fixed width.
    #[error("Truncated data: expected {expected} bytes, got {actual} bytes")]
    TruncatedData {
        /// Required byte count.
        expected: usize,
        /// Byte count present.
        actual: usize,
    },

    /// Wide string data is not valid UTF-16LE.
    #[error("Invalid UTF-16 string data ({len} bytes)")]
    InvalidUtf16 {
        /// Length of the offending byte sequence.
        len: usize,
    },

    /// A key path or value name failed validation.
    #[error("invalid name '{name}': {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Which rule it broke.
        reason: &'static str,
    },

    /// The key is an unopened placeholder.
    #[error("key '{0}' is not open")]
    NotOpen(String),

    /// The process-wide registry was already installed.
    #[error("process-wide registry already initialized")]
    AlreadyInitialized,
}

impl RegistryError {
    /// Creates a not found error with context about what was being searched.
    ///
    /// # Arguments
    ///
    /// * `item_type` - Type of item (e.g., "key", "value")
    /// * `name` - Name of the item that wasn't found
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use reg_access::error::RegistryError;
    /// let err = RegistryError::not_found("value", "DisplayName");
    /// assert_eq!(err.to_string(), "Not found: value 'DisplayName'");
    /// ```
    pub fn not_found(item_type: &str, name: &str) -> Self {
        Self::NotFound(format!("{} '{}'", item_type, name))
    }

    /// Creates an invalid name error.
    pub fn invalid_name(name: &str, reason: &'static str) -> Self {
        Self::InvalidName {
            name: name.to_string(),
            reason,
        }
    }

    /// Returns the backend status underlying this error, if any.
    pub fn backend_status(&self) -> Option<&BackendError> {
        match self {
            Self::OpenFailed { source, .. }
            | Self::BackendWriteFailed { source, .. }
            | Self::BackendDeleteFailed { source, .. }
            | Self::BackendQueryFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
