//! Enumeration tests: ordering, placeholders, and snapshot behaviour.

use reg_access::kind::{Binary, Dword, ExpandString, MultiString, Qword, String as Sz};
use reg_access::{
    Key, MemoryBackend, Registry, RegistryBackend, RegistryError, Value, ValueKind, ValueVariant,
};
use std::collections::BTreeSet;
use std::sync::Arc;

fn enum_keys_fixture() -> (Arc<MemoryBackend>, Registry, Key) {
    let backend = Arc::new(MemoryBackend::new());
    let registry = Registry::from_arc(backend.clone());
    let key = registry.current_user().create("test\\EnumKeys").unwrap();

    key.create("subkey").unwrap();
    key.set_value(&Value::<Binary>::new("binaryValue", vec![1, 2, 3, 4]).unwrap())
        .unwrap();
    key.set_value(&Value::<Dword>::new("dwordValue", 0x4d2).unwrap())
        .unwrap();
    key.set_value(&Value::<Qword>::new("qwordValue", 0x162e).unwrap())
        .unwrap();
    key.set_value(&Value::<Sz>::new("stringValue", "string value".into()).unwrap())
        .unwrap();
    key.set_value(
        &Value::<MultiString>::new("multiStringValue", vec!["multi".into(), "string".into()])
            .unwrap(),
    )
    .unwrap();
    key.set_value(&Value::<ExpandString>::new("UnexpandedStringValue", "%PATH%".into()).unwrap())
        .unwrap();

    (backend, registry, key)
}

#[test]
fn test_enum_keys_and_values() {
    let (_, _registry, key) = enum_keys_fixture();

    let mut names = BTreeSet::new();
    let mut kinds = BTreeSet::new();
    let mut sub_keys = Vec::new();
    for entry in key.iter().unwrap() {
        match entry.unwrap() {
            ValueVariant::Key(sub) => sub_keys.push(sub.name().to_string()),
            value => {
                names.insert(value.name().to_string());
                kinds.insert(value.kind().unwrap().as_u32());
            }
        }
    }

    assert_eq!(sub_keys, ["subkey"]);
    assert_eq!(names.len(), 6);
    assert_eq!(kinds.len(), 6);
}

#[test]
fn test_sub_keys_come_first_then_values_in_order() {
    let (_, _registry, key) = enum_keys_fixture();
    let names: Vec<String> = key
        .iter()
        .unwrap()
        .map(|entry| entry.unwrap().name().to_string())
        .collect();
    assert_eq!(
        names,
        [
            "subkey",
            "binaryValue",
            "dwordValue",
            "qwordValue",
            "stringValue",
            "multiStringValue",
            "UnexpandedStringValue",
        ]
    );
}

#[test]
fn test_enum_empty() {
    let backend = MemoryBackend::new();
    let registry = Registry::new(backend);
    let key = registry.current_user().create("test\\empty").unwrap();
    let iter = key.iter().unwrap();
    assert!(iter == iter.end());
    assert_eq!(iter.counts().total(), 0);
}

#[test]
fn test_exact_size() {
    let (_, _registry, key) = enum_keys_fixture();
    let mut iter = key.iter().unwrap();
    assert_eq!(iter.len(), 7);
    iter.next();
    iter.next_back();
    assert_eq!(iter.len(), 5);
}

#[test]
fn test_decoded_payloads() {
    let (_, _registry, key) = enum_keys_fixture();
    for entry in key.iter().unwrap() {
        match entry.unwrap() {
            ValueVariant::Dword(v) => assert_eq!(*v.data(), 1234),
            ValueVariant::Qword(v) => assert_eq!(*v.data(), 5678),
            ValueVariant::Binary(v) => assert_eq!(v.data(), &[1, 2, 3, 4]),
            ValueVariant::String(v) => assert_eq!(v.data(), "string value"),
            ValueVariant::ExpandString(v) => assert_eq!(v.data(), "%PATH%"),
            ValueVariant::MultiString(v) => {
                assert_eq!(v.iter().collect::<Vec<_>>(), ["multi", "string"])
            }
            ValueVariant::Key(sub) => assert_eq!(sub.name(), "subkey"),
            other => panic!("unexpected entry: {:?}", other),
        }
    }
}

#[test]
fn test_sub_key_placeholder_opens_without_leaking() {
    let (backend, _registry, key) = enum_keys_fixture();
    let before = backend.open_handle_count();

    let first = key.iter().unwrap().next().unwrap().unwrap();
    let sub = first.as_key().unwrap();
    assert_eq!(backend.open_handle_count(), before);

    let opened = sub.open().unwrap();
    assert_eq!(opened.path(), "HKEY_CURRENT_USER\\test\\EnumKeys\\subkey");
    assert_eq!(backend.open_handle_count(), before + 1);
    drop(opened);
    assert_eq!(backend.open_handle_count(), before);
}

#[test]
fn test_unsupported_kind_ends_enumeration() {
    let (backend, _registry, key) = enum_keys_fixture();
    // REG_RESOURCE_LIST, not part of the supported set.
    backend
        .set_value(key.raw_handle().unwrap(), "resourceList", 8, &[0; 16])
        .unwrap();
    key.set_value(&Value::<Dword>::new("afterUnsupported", 1).unwrap())
        .unwrap();

    let entries: Vec<_> = key.iter().unwrap().collect();
    let last = entries.last().unwrap();
    assert!(matches!(last, Err(RegistryError::UnsupportedKind(8))));
    assert_eq!(entries.len(), 8);
    assert!(entries[..7].iter().all(|e| e.is_ok()));
}

#[test]
fn test_unsupported_kind_reaches_end() {
    let (backend, _registry, key) = enum_keys_fixture();
    backend
        .set_value(key.raw_handle().unwrap(), "resourceList", 8, &[0; 16])
        .unwrap();
    key.set_value(&Value::<Dword>::new("afterUnsupported", 1).unwrap())
        .unwrap();

    let mut iter = key.iter().unwrap();
    assert_eq!(iter.by_ref().count(), 8);
    assert!(iter.next().is_none());
    assert_eq!(iter.len(), 0);
    assert!(iter == iter.end());
}

#[test]
fn test_snapshot_count_is_fixed() {
    let (_, _registry, key) = enum_keys_fixture();
    let mut iter = key.iter().unwrap();
    assert_eq!(iter.next().unwrap().unwrap().name(), "subkey");

    key.set_value(&Value::<Dword>::new("addedDuringIteration", 1).unwrap())
        .unwrap();
    assert_eq!(iter.by_ref().count(), 6);
}

#[test]
fn test_value_kinds_visible_from_accessor() {
    let (_, _registry, key) = enum_keys_fixture();
    let kinds: Vec<ValueKind> = key
        .iter()
        .unwrap()
        .filter_map(|entry| entry.unwrap().kind())
        .collect();
    assert_eq!(
        kinds,
        [
            ValueKind::Binary,
            ValueKind::Dword,
            ValueKind::Qword,
            ValueKind::String,
            ValueKind::MultiString,
            ValueKind::ExpandString,
        ]
    );
}
