//! Unit tests for kind tags and value encodings.

use reg_access::kind::{self, Kind, MultiString};
use reg_access::utils::{self, encode_wide};
use reg_access::*;

#[test]
fn test_limits() {
    assert_eq!(utils::KEY_NAME_MAX, 255);
    assert_eq!(utils::VALUE_NAME_MAX, 16383);
    assert_eq!(utils::DEPTH_MAX, 512);
    assert_eq!(utils::DEPTH_MAX_IN_SINGLE_CALL, 32);
}

#[test]
fn test_value_kind_names() {
    assert_eq!(ValueKind::None.name(), "REG_NONE");
    assert_eq!(ValueKind::String.name(), "REG_SZ");
    assert_eq!(ValueKind::ExpandString.name(), "REG_EXPAND_SZ");
    assert_eq!(ValueKind::Binary.name(), "REG_BINARY");
    assert_eq!(ValueKind::Dword.name(), "REG_DWORD");
    assert_eq!(ValueKind::DwordBigEndian.name(), "REG_DWORD_BIG_ENDIAN");
    assert_eq!(ValueKind::Link.name(), "REG_LINK");
    assert_eq!(ValueKind::MultiString.name(), "REG_MULTI_SZ");
    assert_eq!(ValueKind::Qword.name(), "REG_QWORD");
}

#[test]
fn test_value_kind_from_u32() {
    assert_eq!(ValueKind::from_u32(0).unwrap(), ValueKind::None);
    assert_eq!(ValueKind::from_u32(1).unwrap(), ValueKind::String);
    assert_eq!(ValueKind::from_u32(2).unwrap(), ValueKind::ExpandString);
    assert_eq!(ValueKind::from_u32(3).unwrap(), ValueKind::Binary);
    assert_eq!(ValueKind::from_u32(4).unwrap(), ValueKind::Dword);
    assert_eq!(ValueKind::from_u32(5).unwrap(), ValueKind::DwordBigEndian);
    assert_eq!(ValueKind::from_u32(6).unwrap(), ValueKind::Link);
    assert_eq!(ValueKind::from_u32(7).unwrap(), ValueKind::MultiString);
    assert_eq!(ValueKind::from_u32(11).unwrap(), ValueKind::Qword);
    assert!(ValueKind::from_u32(8).is_err());
    assert!(ValueKind::from_u32(9).is_err());
    assert!(ValueKind::from_u32(10).is_err());
}

#[test]
fn test_marker_kinds_match_tags() {
    assert_eq!(kind::Binary::KIND, ValueKind::Binary);
    assert_eq!(kind::Dword::KIND, ValueKind::Dword);
    assert_eq!(kind::DwordBigEndian::KIND, ValueKind::DwordBigEndian);
    assert_eq!(kind::ExpandString::KIND, ValueKind::ExpandString);
    assert_eq!(kind::Link::KIND, ValueKind::Link);
    assert_eq!(kind::MultiString::KIND, ValueKind::MultiString);
    assert_eq!(kind::None::KIND, ValueKind::None);
    assert_eq!(kind::Qword::KIND, ValueKind::Qword);
    assert_eq!(kind::String::KIND, ValueKind::String);
}

#[test]
fn test_binary_value_bytes() {
    let value = Value::<kind::Binary>::new("binaryValue", vec![0x01, 0x02, 0x03, 0x04]).unwrap();
    assert_eq!(&*value.to_bytes(), &[0x01, 0x02, 0x03, 0x04]);
    assert_eq!(value.kind(), ValueKind::Binary);
}

#[test]
fn test_dword_value_bytes() {
    let value = Value::<kind::Dword>::new("dwordValue", 0x4d2).unwrap();
    assert_eq!(&*value.to_bytes(), &0x4d2u32.to_ne_bytes());
    assert_eq!(value.byte_len(), 4);
}

#[test]
fn test_dword_big_endian_bytes() {
    let value = Value::<kind::DwordBigEndian>::new("be", 0x4d2).unwrap();
    assert_eq!(&*value.to_bytes(), &[0x00, 0x00, 0x04, 0xd2]);
}

#[test]
fn test_qword_value_bytes() {
    let value = Value::<kind::Qword>::new("qwordValue", 0x162e).unwrap();
    assert_eq!(&*value.to_bytes(), &0x162eu64.to_ne_bytes());
    assert_eq!(value.byte_len(), 8);
}

#[test]
fn test_string_value_bytes() {
    let value = Value::<kind::String>::new("stringValue", "string value".into()).unwrap();
    assert_eq!(value.to_bytes().into_owned(), encode_wide("string value", true));
}

#[test]
fn test_multi_string_bytes() {
    let value = Value::<kind::MultiString>::new(
        "multiStringValue",
        vec!["multi".into(), "string".into()],
    )
    .unwrap();
    assert_eq!(
        value.to_bytes().into_owned(),
        encode_wide("multi\0string\0\0", false)
    );
}

#[test]
fn test_multi_string_split() {
    assert_eq!(MultiString::split("multi\0string\0\0"), ["multi", "string"]);
    assert_eq!(MultiString::split("multi\0string\0"), ["multi", "string"]);
    assert_eq!(MultiString::split("a\0\0b\0\0"), ["a", "", "b"]);
}

#[test]
fn test_decode_rejects_short_dword() {
    assert!(matches!(
        ValueVariant::decode("dwordValue".into(), ValueKind::Dword, &[0x01, 0x02]),
        Err(RegistryError::TruncatedData {
            expected: 4,
            actual: 2
        })
    ));
}

#[test]
fn test_decode_odd_length_string() {
    assert!(matches!(
        ValueVariant::decode("stringValue".into(), ValueKind::String, &[0x41, 0x00, 0x42]),
        Err(RegistryError::InvalidUtf16 { len: 3 })
    ));
}

#[test]
fn test_variant_display() {
    let dword = ValueVariant::decode("d".into(), ValueKind::Dword, &1234u32.to_ne_bytes()).unwrap();
    assert_eq!(dword.to_string(), "1234 (0x000004D2)");

    let binary = ValueVariant::decode("b".into(), ValueKind::Binary, &[0xde, 0xad]).unwrap();
    assert_eq!(binary.to_string(), "DEAD");

    let multi = ValueVariant::decode(
        "m".into(),
        ValueKind::MultiString,
        &encode_wide("multi\0string\0\0", false),
    )
    .unwrap();
    assert_eq!(multi.to_string(), "multi, string");
}

#[test]
fn test_root_key_handles() {
    assert_eq!(RootKey::ClassesRoot.handle(), RawHandle(0x8000_0000));
    assert_eq!(RootKey::CurrentUser.handle(), RawHandle(0x8000_0001));
    assert_eq!(RootKey::LocalMachine.handle(), RawHandle(0x8000_0002));
    assert_eq!(RootKey::Users.handle(), RawHandle(0x8000_0003));
}
