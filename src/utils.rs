//! Utility functions for wide-string conversion and name validation.

use crate::error::{RegistryError, Result};
use encoding_rs::UTF_16LE;

/// Maximum length of a single key name component, in characters.
pub const KEY_NAME_MAX: usize = 255;

/// Maximum length of a value name, in UTF-16 units.
pub const VALUE_NAME_MAX: usize = 16383;

/// Maximum depth of the key tree below a root.
pub const DEPTH_MAX: usize = 512;

/// Maximum number of path components a single open/create call may walk.
pub const DEPTH_MAX_IN_SINGLE_CALL: usize = 32;

/// Separator between key path components.
pub const PATH_SEPARATOR: char = '\\';

/// Encodes text as UTF-16LE bytes, optionally appending one NUL unit.
pub fn encode_wide(text: &str, terminate: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity((text.len() + 1) * 2);
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    if terminate {
        out.extend_from_slice(&[0, 0]);
    }
    out
}

/// Decodes UTF-16LE bytes verbatim.
///
/// No BOM sniffing and no NUL trimming: every unit in `data` is kept.
///
/// # Errors
///
/// Returns an error if the data length is odd or the units are not valid
/// UTF-16.
pub fn decode_wide(data: &[u8]) -> Result<String> {
    if data.is_empty() {
        return Ok(String::new());
    }

    // UTF-16 requires even number of bytes
    if data.len() % 2 != 0 {
        return Err(RegistryError::InvalidUtf16 { len: data.len() });
    }

    UTF_16LE
        .decode_without_bom_handling_and_without_replacement(data)
        .map(|decoded| decoded.into_owned())
        .ok_or(RegistryError::InvalidUtf16 { len: data.len() })
}

/// Decodes UTF-16 code units held in memory, such as an expansion buffer.
pub fn decode_wide_units(units: &[u16]) -> Result<String> {
    let bytes: Vec<u8> = units.iter().flat_map(|unit| unit.to_le_bytes()).collect();
    decode_wide(&bytes)
}

/// Decodes a NUL-terminated UTF-16LE string, stripping exactly one trailing NUL.
pub fn decode_wide_terminated(data: &[u8]) -> Result<String> {
    let mut text = decode_wide(data)?;
    if text.ends_with('\0') {
        text.pop();
    }
    Ok(text)
}

/// Number of UTF-16 units needed to store `text`.
pub fn wide_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Validates a value name before it reaches the backend.
pub fn validate_value_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RegistryError::invalid_name(name, "value name is empty"));
    }
    if name.contains('\0') {
        return Err(RegistryError::invalid_name(name, "value name contains NUL"));
    }
    if wide_len(name) > VALUE_NAME_MAX {
        return Err(RegistryError::invalid_name(name, "value name too long"));
    }
    Ok(())
}

/// Validates a single key name (no separators allowed).
pub fn validate_key_name(name: &str) -> Result<()> {
    if name.contains(PATH_SEPARATOR) {
        return Err(RegistryError::invalid_name(name, "key name contains a backslash"));
    }
    validate_component(name, name)
}

/// Validates a relative key path of one or more `\`-separated components.
pub fn validate_key_path(path: &str) -> Result<()> {
    let mut depth = 0;
    for component in path.split(PATH_SEPARATOR) {
        validate_component(path, component)?;
        depth += 1;
    }
    if depth > DEPTH_MAX_IN_SINGLE_CALL {
        return Err(RegistryError::invalid_name(path, "path has too many components"));
    }
    Ok(())
}

fn validate_component(path: &str, component: &str) -> Result<()> {
    if component.is_empty() {
        return Err(RegistryError::invalid_name(path, "empty path component"));
    }
    if component.contains('\0') {
        return Err(RegistryError::invalid_name(path, "key name contains NUL"));
    }
    if component.chars().count() > KEY_NAME_MAX {
        return Err(RegistryError::invalid_name(path, "key name too long"));
    }
    Ok(())
}

/// Joins a display path and a relative sub-path.
pub fn join_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}{}{}", parent, PATH_SEPARATOR, child)
    }
}

/// Replaces the last component of a display path.
pub fn replace_last_component(path: &str, new_name: &str) -> String {
    match path.rfind(PATH_SEPARATOR) {
        Some(pos) => join_path(&path[..pos], new_name),
        None => new_name.to_string(),
    }
}
