//! # Typed Registry Access
//!
//! A strongly typed access layer over a hierarchical, Windows-Registry-like
//! key/value store.
//!
//! ## Features
//!
//! - **Typed values**: every value kind is a marker type, so `Value<Dword>`
//!   and `Value<MultiString>` cannot be confused at compile time
//! - **Exact wire formats**: UTF-16LE strings with their terminators,
//!   native and big-endian dwords, double-NUL-terminated multi-strings
//! - **Scoped handles**: keys release their backend handle exactly once
//! - **Lazy enumeration**: sub-keys are yielded as placeholders and opened
//!   only on demand
//! - **Pluggable store**: any [`RegistryBackend`] works; [`MemoryBackend`]
//!   is an in-process store with the native store's observable rules
//!
//! ## Architecture
//!
//! 1. **Backend** ([`backend`]): raw handles and the primitive calls
//! 2. **Kinds** ([`kind`]): kind tags and byte encodings
//! 3. **Values** ([`value`]): named typed values and the closed variant
//! 4. **Keys** ([`key`], [`accessor`], [`iter`]): handles, lazy value
//!    access and enumeration
//! 5. **Registry** ([`registry`]): the roots, and an optional
//!    process-wide instance
//!
//! ## Value Encodings
//!
//! ```text
//! REG_SZ / REG_EXPAND_SZ   UTF-16LE text + one NUL unit
//! REG_LINK                 UTF-16LE text, no terminator
//! REG_MULTI_SZ             each string + NUL, then one more NUL
//! REG_DWORD / REG_QWORD    native-endian u32 / u64
//! REG_DWORD_BIG_ENDIAN     big-endian u32
//! REG_BINARY / REG_NONE    raw bytes
//! ```
//!
//! ## Examples
//!
//! ### Reading and writing values
//!
//! ```rust
//! use reg_access::kind::{Dword, MultiString};
//! use reg_access::{MemoryBackend, Registry, Value};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Registry::new(MemoryBackend::new());
//! let key = registry.current_user().create("Software\\Example")?;
//!
//! key.set_value(&Value::<Dword>::new("dwordValue", 0x4d2)?)?;
//! key.set_value(&Value::<MultiString>::new(
//!     "multiStringValue",
//!     vec!["multi".into(), "string".into()],
//! )?)?;
//!
//! let dword = key.value_of("dwordValue").decode_as::<Dword>()?;
//! assert_eq!(*dword.data(), 1234);
//!
//! let multi = key.value_of("multiStringValue").decode_as::<MultiString>()?;
//! assert_eq!(multi.iter().collect::<Vec<_>>(), ["multi", "string"]);
//! # Ok(())
//! # }
//! ```
//!
//! ### Enumerating a key
//!
//! ```rust
//! use reg_access::{MemoryBackend, Registry, ValueVariant};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Registry::new(MemoryBackend::new());
//! let key = registry.current_user().create("Software")?;
//! key.create("Vendor")?;
//!
//! for entry in key.iter()? {
//!     match entry? {
//!         ValueVariant::Key(sub) => println!("[{}]", sub.name()),
//!         value => println!("{} = {}", value.name(), value),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accessor;
pub mod backend;
pub mod error;
pub mod iter;
pub mod key;
pub mod kind;
pub mod memory;
pub mod registry;
pub mod utils;
pub mod value;

// Re-export main types for convenience
pub use accessor::UnspecifiedValue;
pub use backend::{
    AccessRights, ChildCount, Disposition, KeyInfo, RawHandle, RegistryBackend, RootKey,
};
pub use error::{BackendError, RegistryError, Result};
pub use iter::{Children, SubKey};
pub use key::Key;
pub use kind::{Kind, ValueKind};
pub use memory::{MemoryBackend, MemoryBackendBuilder};
pub use registry::{global, install, Registry};
pub use value::{Value, ValueVariant};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
