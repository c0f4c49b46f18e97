//! Entry point: a backend plus its predefined root keys.

use crate::backend::{RegistryBackend, RootKey};
use crate::error::{RegistryError, Result};
use crate::key::Key;
use std::sync::{Arc, OnceLock};
use tracing::info;

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// A registry store and the roots it exposes.
///
/// Cloning is cheap: clones share the backend.
#[derive(Debug, Clone)]
pub struct Registry {
    backend: Arc<dyn RegistryBackend>,
}

impl Registry {
    /// Wraps a backend.
    pub fn new<B: RegistryBackend + 'static>(backend: B) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    /// Wraps a backend that is already shared.
    pub fn from_arc(backend: Arc<dyn RegistryBackend>) -> Self {
        Self { backend }
    }

    /// The shared backend.
    pub fn backend(&self) -> &Arc<dyn RegistryBackend> {
        &self.backend
    }

    /// A predefined root key. Roots are never closed.
    pub fn root(&self, root: RootKey) -> Key {
        Key::predefined(Arc::clone(&self.backend), root)
    }

    /// `HKEY_CLASSES_ROOT`
    pub fn classes_root(&self) -> Key {
        self.root(RootKey::ClassesRoot)
    }

    /// `HKEY_CURRENT_USER`
    pub fn current_user(&self) -> Key {
        self.root(RootKey::CurrentUser)
    }

    /// `HKEY_LOCAL_MACHINE`
    pub fn local_machine(&self) -> Key {
        self.root(RootKey::LocalMachine)
    }

    /// `HKEY_USERS`
    pub fn users(&self) -> Key {
        self.root(RootKey::Users)
    }
}

/// Installs the process-wide registry.
///
/// # Errors
///
/// [`RegistryError::AlreadyInitialized`] on every call after the first; the
/// backend passed to such a call is dropped.
pub fn install<B: RegistryBackend + 'static>(backend: B) -> Result<&'static Registry> {
    let mut installed = false;
    let registry = GLOBAL.get_or_init(|| {
        installed = true;
        Registry::new(backend)
    });
    if !installed {
        return Err(RegistryError::AlreadyInitialized);
    }
    info!(backend = ?registry.backend, "Installed process-wide registry");
    Ok(registry)
}

/// The process-wide registry, if installed.
pub fn global() -> Option<&'static Registry> {
    GLOBAL.get()
}
