//! Serializer Tests
//!
//! Tests for the built-in payload codecs, the serializer registry and
//! service descriptor validation.

use serde::{Deserialize, Serialize};
use tinyrpc::serialize::SerializerRegistry;
use tinyrpc::service::validate_descriptor;
use tinyrpc::{BincodeSerializer, Codec, JsonSerializer, RpcError, Serializer};

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct User {
    id: i64,
    name: String,
    tags: Vec<String>,
}

fn sample_user() -> User {
    User {
        id: 123,
        name: "ada".to_string(),
        tags: vec!["admin".to_string()],
    }
}

// =============================================================================
// Codec Tests
// =============================================================================

#[test]
fn test_codes_are_fixed() {
    assert_eq!(JsonSerializer.code(), 1);
    assert_eq!(BincodeSerializer.code(), 2);
    assert_eq!(Codec::JSON.code(), 1);
    assert_eq!(Codec::BINCODE.code(), 2);
    assert_eq!(Codec::default(), Codec::JSON);
}

#[test]
fn test_lookup_by_code_and_name() {
    assert_eq!(Codec::from_code(1), Some(Codec::JSON));
    assert_eq!(Codec::from_code(2), Some(Codec::BINCODE));
    assert_eq!(Codec::from_code(0), None);
    assert_eq!(Codec::from_code(9), None);

    assert_eq!(Codec::from_name("json"), Some(Codec::JSON));
    assert_eq!(Codec::from_name("BINCODE"), Some(Codec::BINCODE));
    assert_eq!(Codec::from_name("xml"), None);
}

#[test]
fn test_json_payload_is_plain_json() {
    let bytes = Codec::JSON.encode(&sample_user()).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert_eq!(text, r#"{"id":123,"name":"ada","tags":["admin"]}"#);
}

#[test]
fn test_each_codec_reads_its_own_output() {
    for codec in [Codec::JSON, Codec::BINCODE] {
        let bytes = codec.encode(&sample_user()).unwrap();
        let user: User = codec.decode(&bytes).unwrap();
        assert_eq!(user, sample_user(), "codec {}", codec.name());
    }
}

#[test]
fn test_decode_garbage_is_a_decode_error() {
    let json: tinyrpc::Result<User> = Codec::JSON.decode(b"not json");
    assert!(matches!(json, Err(RpcError::Decode(_))));

    let bincode: tinyrpc::Result<User> = Codec::BINCODE.decode(&[1, 2]);
    assert!(matches!(bincode, Err(RpcError::Decode(_))));
}

#[test]
fn test_codecs_are_not_interchangeable() {
    let bytes = Codec::BINCODE.encode(&sample_user()).unwrap();
    let decoded: tinyrpc::Result<User> = Codec::JSON.decode(&bytes);
    assert!(decoded.is_err());
}

// =============================================================================
// Registry Tests
// =============================================================================

#[test]
fn test_registry_lookup() {
    let mut registry = SerializerRegistry::with_serializer(Codec::JSON);
    registry.register(Codec::BINCODE).unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.codes(), vec![1, 2]);
    assert_eq!(registry.get(2), Some(&Codec::BINCODE));
    assert!(registry.contains(1));
    assert!(!registry.contains(3));
    assert!(registry.get(3).is_none());
}

#[test]
fn test_registry_rejects_duplicate_code() {
    let mut registry = SerializerRegistry::with_serializer(Codec::JSON);
    let err = registry.register(Codec::JSON).unwrap_err();

    assert!(matches!(err, RpcError::Config(_)));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_empty_registry() {
    let registry: SerializerRegistry<Codec> = SerializerRegistry::new();
    assert!(registry.is_empty());
    assert!(registry.codes().is_empty());
}

// =============================================================================
// Descriptor Validation Tests
// =============================================================================

#[test]
fn test_valid_descriptor() {
    validate_descriptor("user-service", ["GetById", "List"]).unwrap();
}

#[test]
fn test_descriptor_rejects_bad_names() {
    assert!(matches!(
        validate_descriptor("", ["GetById"]),
        Err(RpcError::Config(_))
    ));
    assert!(matches!(
        validate_descriptor("user\nservice", ["GetById"]),
        Err(RpcError::Config(_))
    ));
    assert!(matches!(
        validate_descriptor("user-service", ["Get\rById"]),
        Err(RpcError::Config(_))
    ));
    assert!(matches!(
        validate_descriptor("user-service", [""]),
        Err(RpcError::Config(_))
    ));
}

#[test]
fn test_descriptor_rejects_duplicate_methods() {
    assert!(matches!(
        validate_descriptor("user-service", ["GetById", "GetById"]),
        Err(RpcError::Config(_))
    ));
}

#[test]
fn test_descriptor_requires_a_method() {
    let none: [&str; 0] = [];
    assert!(matches!(
        validate_descriptor("user-service", none),
        Err(RpcError::Config(_))
    ));
}
