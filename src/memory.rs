//! In-process registry store.
//!
//! [`MemoryBackend`] implements [`RegistryBackend`] over an arena of nodes
//! guarded by a single `RwLock`, with a handle table mapping issued handles
//! to nodes and the access mask they were opened with. It follows the native
//! store's observable rules: case-insensitive names, sub-keys enumerated in
//! sorted order, values in insertion order, `AccessDenied` when deleting a key
//! that still has sub-keys, `KeyDeleted` for handles whose key is gone.

use crate::backend::{
    AccessRights, BackendResult, ChildCount, Disposition, KeyInfo, RawHandle, RegistryBackend,
    RootKey, ValueInfo,
};
use crate::error::BackendError;
use crate::utils::{wide_len, DEPTH_MAX, PATH_SEPARATOR};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// First handle value issued for opened keys.
const FIRST_HANDLE: u64 = 0x1000;

type NodeId = usize;

fn longest_name<'a>(names: impl Iterator<Item = &'a str>) -> u32 {
    names.map(wide_len).max().unwrap_or(0) as u32
}

#[derive(Debug, Clone)]
struct StoredValue {
    name: String,
    kind: u32,
    data: Vec<u8>,
}

#[derive(Debug)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    sub_keys: Vec<NodeId>,
    values: Vec<StoredValue>,
    last_written: DateTime<Utc>,
    deleted: bool,
    restricted: bool,
    open_handles: usize,
}

impl Node {
    fn new(name: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            sub_keys: Vec::new(),
            values: Vec::new(),
            last_written: Utc::now(),
            deleted: false,
            restricted: false,
            open_handles: 0,
        }
    }

    fn value_index(&self, name: &str) -> Option<usize> {
        self.values
            .iter()
            .position(|v| v.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenKey {
    node: NodeId,
    access: AccessRights,
}

impl OpenKey {
    fn require(&self, right: u32) -> BackendResult<()> {
        if self.access.allows(right) {
            Ok(())
        } else {
            Err(BackendError::AccessDenied)
        }
    }
}

#[derive(Debug)]
struct Tree {
    nodes: Vec<Node>,
    roots: HashMap<RawHandle, NodeId>,
    handles: HashMap<RawHandle, OpenKey>,
    /// Deleted slots with no open handle left, reused by `insert_child`.
    free: Vec<NodeId>,
    next_handle: u64,
    flushes: u64,
}

impl Tree {
    fn new() -> Self {
        let mut nodes = Vec::with_capacity(RootKey::ALL.len());
        let mut roots = HashMap::new();
        for root in RootKey::ALL {
            roots.insert(root.handle(), nodes.len());
            nodes.push(Node::new(root.name(), None));
        }
        Self {
            nodes,
            roots,
            handles: HashMap::new(),
            free: Vec::new(),
            next_handle: FIRST_HANDLE,
            flushes: 0,
        }
    }

    fn resolve(&self, handle: RawHandle) -> BackendResult<OpenKey> {
        let open = match self.roots.get(&handle) {
            Some(&node) => OpenKey {
                node,
                access: AccessRights::DEFAULT,
            },
            None => *self.handles.get(&handle).ok_or(BackendError::InvalidHandle)?,
        };
        if self.nodes[open.node].deleted {
            return Err(BackendError::KeyDeleted);
        }
        Ok(open)
    }

    fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[parent]
            .sub_keys
            .iter()
            .copied()
            .find(|&id| self.nodes[id].name.eq_ignore_ascii_case(name))
    }

    fn walk(&self, start: NodeId, path: &str) -> BackendResult<NodeId> {
        let mut node = start;
        if path.is_empty() {
            return Ok(node);
        }
        for component in path.split(PATH_SEPARATOR) {
            if component.is_empty() {
                return Err(BackendError::InvalidParameter(format!(
                    "empty component in '{}'",
                    path
                )));
            }
            node = self
                .find_child(node, component)
                .ok_or(BackendError::NotFound)?;
            if self.nodes[node].restricted {
                return Err(BackendError::AccessDenied);
            }
        }
        Ok(node)
    }

    fn depth(&self, mut node: NodeId) -> usize {
        let mut depth = 0;
        while let Some(parent) = self.nodes[node].parent {
            depth += 1;
            node = parent;
        }
        depth
    }

    fn sorted_position(&self, parent: NodeId, name: &str) -> usize {
        let key = name.to_ascii_lowercase();
        self.nodes[parent]
            .sub_keys
            .iter()
            .position(|&id| self.nodes[id].name.to_ascii_lowercase() > key)
            .unwrap_or(self.nodes[parent].sub_keys.len())
    }

    fn insert_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        let node = Node::new(name, Some(parent));
        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        let pos = self.sorted_position(parent, name);
        self.nodes[parent].sub_keys.insert(pos, id);
        self.touch(parent);
        id
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node].parent {
            self.nodes[parent].sub_keys.retain(|&id| id != node);
            self.touch(parent);
        }
        self.mark_deleted(node);
    }

    fn mark_deleted(&mut self, node: NodeId) {
        let mut pending = vec![node];
        while let Some(id) = pending.pop() {
            let entry = &mut self.nodes[id];
            entry.deleted = true;
            entry.name = String::new();
            entry.values = Vec::new();
            pending.append(&mut entry.sub_keys);
            if entry.open_handles == 0 {
                self.free.push(id);
            }
        }
    }

    fn release(&mut self, open: OpenKey) {
        let entry = &mut self.nodes[open.node];
        entry.open_handles -= 1;
        if entry.deleted && entry.open_handles == 0 {
            self.free.push(open.node);
        }
    }

    fn touch(&mut self, node: NodeId) {
        self.nodes[node].last_written = Utc::now();
    }

    fn issue(&mut self, node: NodeId, access: AccessRights) -> RawHandle {
        let handle = RawHandle(self.next_handle);
        self.next_handle += 4;
        self.nodes[node].open_handles += 1;
        self.handles.insert(handle, OpenKey { node, access });
        handle
    }
}

/// Registry store held entirely in memory.
///
/// # Examples
///
/// ```rust
/// use reg_access::{MemoryBackend, Registry};
/// use reg_access::kind::Dword;
///
/// # fn main() -> reg_access::Result<()> {
/// let registry = Registry::new(MemoryBackend::new());
/// let key = registry.current_user().create("Software\\Example")?;
/// key.value_of("dwordValue").set(&reg_access::Value::<Dword>::new("dwordValue", 1234)?)?;
/// assert_eq!(*key.value_of("dwordValue").decode_as::<Dword>()?.data(), 1234);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryBackend {
    tree: RwLock<Tree>,
    env: RwLock<HashMap<String, String>>,
    inherit_process_env: bool,
}

/// Builder for [`MemoryBackend`].
#[derive(Debug, Default)]
pub struct MemoryBackendBuilder {
    env: HashMap<String, String>,
    inherit_process_env: bool,
}

impl MemoryBackendBuilder {
    /// Defines a variable for `%NAME%` expansion.
    pub fn env_var(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.env
            .insert(name.as_ref().to_ascii_uppercase(), value.into());
        self
    }

    /// Falls back to the process environment for undefined variables.
    pub fn inherit_process_env(mut self, inherit: bool) -> Self {
        self.inherit_process_env = inherit;
        self
    }

    /// Builds the backend with the four predefined roots present and empty.
    pub fn build(self) -> MemoryBackend {
        MemoryBackend {
            tree: RwLock::new(Tree::new()),
            env: RwLock::new(self.env),
            inherit_process_env: self.inherit_process_env,
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Creates an empty store with no expansion variables.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Returns a builder.
    pub fn builder() -> MemoryBackendBuilder {
        MemoryBackendBuilder::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tree> {
        self.tree.read().expect("registry tree lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tree> {
        self.tree.write().expect("registry tree lock poisoned")
    }

    /// Number of handles issued and not yet closed.
    pub fn open_handle_count(&self) -> usize {
        self.read().handles.len()
    }

    /// Number of successful `flush_key` calls.
    pub fn flush_count(&self) -> u64 {
        self.read().flushes
    }

    /// Makes opens of `path` below `root` fail with `AccessDenied`.
    pub fn restrict(&self, root: RootKey, path: &str) -> BackendResult<()> {
        let mut tree = self.write();
        let start = tree.resolve(root.handle())?.node;
        let node = tree.walk(start, path)?;
        tree.nodes[node].restricted = true;
        Ok(())
    }

    /// Defines or replaces an expansion variable.
    pub fn set_env_var(&self, name: &str, value: impl Into<String>) {
        self.env
            .write()
            .expect("environment lock poisoned")
            .insert(name.to_ascii_uppercase(), value.into());
    }

    fn lookup_env(&self, name: &str) -> Option<String> {
        let defined = self
            .env
            .read()
            .expect("environment lock poisoned")
            .get(&name.to_ascii_uppercase())
            .cloned();
        match defined {
            Some(value) => Some(value),
            None if self.inherit_process_env => std::env::var(name).ok(),
            None => None,
        }
    }

    fn expand(&self, src: &str) -> String {
        let mut out = String::with_capacity(src.len());
        let mut rest = src;
        while let Some(start) = rest.find('%') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            match after.find('%') {
                Some(end) => {
                    let name = &after[..end];
                    match self.lookup_env(name).filter(|_| !name.is_empty()) {
                        Some(value) => {
                            out.push_str(&value);
                            rest = &after[end + 1..];
                        }
                        None => {
                            // Unknown names stay verbatim; the closing '%' may open the next one.
                            out.push('%');
                            out.push_str(name);
                            rest = &after[end..];
                        }
                    }
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

impl RegistryBackend for MemoryBackend {
    fn open_key(
        &self,
        parent: RawHandle,
        path: &str,
        access: AccessRights,
    ) -> BackendResult<RawHandle> {
        let mut tree = self.write();
        let start = tree.resolve(parent)?.node;
        let node = tree.walk(start, path)?;
        let handle = tree.issue(node, access);
        debug!(parent = %parent, path, handle = %handle, "Opened key");
        Ok(handle)
    }

    fn create_key(
        &self,
        parent: RawHandle,
        path: &str,
        access: AccessRights,
    ) -> BackendResult<(RawHandle, Disposition)> {
        let mut tree = self.write();
        let open = tree.resolve(parent)?;
        open.require(AccessRights::CREATE_SUB_KEY)?;

        let mut node = open.node;
        let mut disposition = Disposition::OpenedExisting;
        for component in path.split(PATH_SEPARATOR) {
            if component.is_empty() {
                return Err(BackendError::InvalidParameter(format!(
                    "empty component in '{}'",
                    path
                )));
            }
            node = match tree.find_child(node, component) {
                Some(id) if tree.nodes[id].restricted => return Err(BackendError::AccessDenied),
                Some(id) => id,
                None => {
                    if tree.depth(node) + 1 > DEPTH_MAX {
                        return Err(BackendError::InvalidParameter(format!(
                            "'{}' exceeds the maximum tree depth of {}",
                            path, DEPTH_MAX
                        )));
                    }
                    disposition = Disposition::CreatedNew;
                    tree.insert_child(node, component)
                }
            };
        }

        let handle = tree.issue(node, access);
        debug!(parent = %parent, path, handle = %handle, ?disposition, "Created key");
        Ok((handle, disposition))
    }

    fn close_key(&self, handle: RawHandle) -> BackendResult<()> {
        let mut tree = self.write();
        if tree.roots.contains_key(&handle) {
            return Ok(());
        }
        let open = tree
            .handles
            .remove(&handle)
            .ok_or(BackendError::InvalidHandle)?;
        tree.release(open);
        Ok(())
    }

    fn set_value(&self, handle: RawHandle, name: &str, kind: u32, data: &[u8]) -> BackendResult<()> {
        let mut tree = self.write();
        let open = tree.resolve(handle)?;
        open.require(AccessRights::SET_VALUE)?;

        let node = &mut tree.nodes[open.node];
        match node.value_index(name) {
            Some(i) => {
                let existing = &mut node.values[i];
                existing.kind = kind;
                existing.data = data.to_vec();
            }
            None => node.values.push(StoredValue {
                name: name.to_string(),
                kind,
                data: data.to_vec(),
            }),
        }
        tree.touch(open.node);
        Ok(())
    }

    fn query_value(
        &self,
        handle: RawHandle,
        name: &str,
        buf: Option<&mut [u8]>,
    ) -> BackendResult<ValueInfo> {
        let tree = self.read();
        let open = tree.resolve(handle)?;
        open.require(AccessRights::QUERY_VALUE)?;

        let node = &tree.nodes[open.node];
        let value = node
            .value_index(name)
            .map(|i| &node.values[i])
            .ok_or(BackendError::NotFound)?;
        if let Some(buf) = buf {
            if buf.len() < value.data.len() {
                return Err(BackendError::MoreData {
                    required: value.data.len(),
                });
            }
            buf[..value.data.len()].copy_from_slice(&value.data);
        }
        Ok(ValueInfo {
            kind: value.kind,
            len: value.data.len(),
        })
    }

    fn delete_value(&self, handle: RawHandle, name: &str) -> BackendResult<()> {
        let mut tree = self.write();
        let open = tree.resolve(handle)?;
        open.require(AccessRights::SET_VALUE)?;

        let node = &mut tree.nodes[open.node];
        let index = node.value_index(name).ok_or(BackendError::NotFound)?;
        node.values.remove(index);
        tree.touch(open.node);
        Ok(())
    }

    fn delete_key(&self, handle: RawHandle, path: &str) -> BackendResult<()> {
        let mut tree = self.write();
        let open = tree.resolve(handle)?;
        open.require(AccessRights::DELETE)?;
        if path.is_empty() {
            return Err(BackendError::InvalidParameter("empty sub-key path".into()));
        }

        let target = tree.walk(open.node, path)?;
        if !tree.nodes[target].sub_keys.is_empty() {
            return Err(BackendError::AccessDenied);
        }
        tree.detach(target);
        debug!(handle = %handle, path, "Deleted key");
        Ok(())
    }

    fn delete_tree(&self, handle: RawHandle, path: Option<&str>) -> BackendResult<()> {
        let mut tree = self.write();
        let open = tree.resolve(handle)?;
        open.require(AccessRights::DELETE)?;

        match path.filter(|p| !p.is_empty()) {
            Some(path) => {
                let target = tree.walk(open.node, path)?;
                tree.detach(target);
            }
            None => {
                let children = std::mem::take(&mut tree.nodes[open.node].sub_keys);
                for child in children {
                    tree.mark_deleted(child);
                }
                tree.nodes[open.node].values.clear();
                tree.touch(open.node);
            }
        }
        debug!(handle = %handle, ?path, "Deleted tree");
        Ok(())
    }

    fn enum_key(&self, handle: RawHandle, index: u32) -> BackendResult<String> {
        let tree = self.read();
        let open = tree.resolve(handle)?;
        open.require(AccessRights::ENUMERATE_SUB_KEYS)?;

        tree.nodes[open.node]
            .sub_keys
            .get(index as usize)
            .map(|&id| tree.nodes[id].name.clone())
            .ok_or(BackendError::NoMoreItems)
    }

    fn enum_value(&self, handle: RawHandle, index: u32) -> BackendResult<String> {
        let tree = self.read();
        let open = tree.resolve(handle)?;
        open.require(AccessRights::QUERY_VALUE)?;

        tree.nodes[open.node]
            .values
            .get(index as usize)
            .map(|v| v.name.clone())
            .ok_or(BackendError::NoMoreItems)
    }

    fn query_info(&self, handle: RawHandle) -> BackendResult<KeyInfo> {
        let tree = self.read();
        let open = tree.resolve(handle)?;
        open.require(AccessRights::QUERY_VALUE)?;

        let node = &tree.nodes[open.node];
        let counts = ChildCount {
            sub_keys: node.sub_keys.len() as u32,
            sub_key_max_len: longest_name(
                node.sub_keys.iter().map(|&id| tree.nodes[id].name.as_str()),
            ),
            values: node.values.len() as u32,
            value_max_len: longest_name(node.values.iter().map(|v| v.name.as_str())),
        };
        Ok(KeyInfo {
            counts,
            max_value_data_len: node.values.iter().map(|v| v.data.len()).max().unwrap_or(0)
                as u32,
            last_written: node.last_written,
        })
    }

    fn rename_key(
        &self,
        handle: RawHandle,
        path: Option<&str>,
        new_name: &str,
    ) -> BackendResult<()> {
        let mut tree = self.write();
        let open = tree.resolve(handle)?;
        open.require(AccessRights::WRITE)?;
        if new_name.is_empty() || new_name.contains(PATH_SEPARATOR) {
            return Err(BackendError::InvalidParameter(format!(
                "invalid key name '{}'",
                new_name
            )));
        }

        let target = match path.filter(|p| !p.is_empty()) {
            Some(path) => tree.walk(open.node, path)?,
            None => open.node,
        };
        let parent = tree.nodes[target].parent.ok_or(BackendError::AccessDenied)?;
        if let Some(sibling) = tree.find_child(parent, new_name) {
            if sibling != target {
                return Err(BackendError::AlreadyExists);
            }
        }

        tree.nodes[parent].sub_keys.retain(|&id| id != target);
        tree.nodes[target].name = new_name.to_string();
        let pos = tree.sorted_position(parent, new_name);
        tree.nodes[parent].sub_keys.insert(pos, target);
        tree.touch(parent);
        tree.touch(target);
        debug!(handle = %handle, ?path, new_name, "Renamed key");
        Ok(())
    }

    fn flush_key(&self, handle: RawHandle) -> BackendResult<()> {
        let mut tree = self.write();
        tree.resolve(handle)?;
        tree.flushes += 1;
        Ok(())
    }

    fn expand_environment_strings(&self, src: &str, dst: Option<&mut [u16]>) -> BackendResult<usize> {
        let units: Vec<u16> = self.expand(src).encode_utf16().collect();
        let required = units.len() + 1;
        if let Some(dst) = dst {
            if dst.len() >= required {
                dst[..units.len()].copy_from_slice(&units);
                dst[units.len()] = 0;
            }
        }
        Ok(required)
    }
}
