//! Tests for the conversion engine.

use super::*;
use crate::types::{EnumType, PrimitiveKind};
use std::net::Ipv4Addr;

fn int_list() -> TypeDescriptor {
    TypeDescriptor::list(TypeDescriptor::boxed(PrimitiveKind::I32))
}

fn skill_map() -> TypeDescriptor {
    TypeDescriptor::map(TypeDescriptor::string(), TypeDescriptor::boxed(PrimitiveKind::I32))
}

#[test]
fn strings_pass_through_untouched() {
    let converter = Converter::new();
    let value = converter.convert("  spaced  ", &TypeDescriptor::string()).unwrap();
    assert_eq!(value, Value::String("  spaced  ".to_string()));
}

#[test]
fn list_preserves_order_and_duplicates() {
    let converter = Converter::new();
    let value = converter.convert("1, 2, 3, 2", &int_list()).unwrap();
    assert_eq!(
        value,
        Value::List(vec![Value::I32(1), Value::I32(2), Value::I32(3), Value::I32(2)])
    );
}

#[test]
fn set_removes_duplicates_keeping_first_position() {
    let converter = Converter::new();
    let ty = TypeDescriptor::set(TypeDescriptor::string());
    let value = converter.convert("b, a, b, c", &ty).unwrap();
    assert_eq!(
        value,
        Value::Set(vec![
            Value::String("b".to_string()),
            Value::String("a".to_string()),
            Value::String("c".to_string()),
        ])
    );
}

#[test]
fn blank_input_yields_empty_containers() {
    let converter = Converter::new();
    assert_eq!(converter.convert("", &int_list()).unwrap(), Value::List(vec![]));
    assert_eq!(
        converter.convert("   ", &TypeDescriptor::set(TypeDescriptor::string())).unwrap(),
        Value::Set(vec![])
    );
    assert_eq!(converter.convert("", &skill_map()).unwrap(), Value::Map(vec![]));
    assert_eq!(
        converter.convert("", &TypeDescriptor::array(PrimitiveKind::I64)).unwrap(),
        Value::Array(vec![])
    );
}

#[test]
fn map_entries_keep_insertion_order() {
    let converter = Converter::new();
    let value = converter.convert("Skill1:7200, Skill2:3600", &skill_map()).unwrap();
    assert_eq!(
        value,
        Value::Map(vec![
            (Value::String("Skill1".to_string()), Value::I32(7200)),
            (Value::String("Skill2".to_string()), Value::I32(3600)),
        ])
    );
}

#[test]
fn map_skips_blank_entries() {
    let converter = Converter::new();
    let value = converter.convert("a:1,, b:2,", &skill_map()).unwrap();
    assert_eq!(value.get(&Value::String("b".to_string())), Some(&Value::I32(2)));
    if let Value::Map(entries) = value {
        assert_eq!(entries.len(), 2);
    }
}

#[test]
fn malformed_map_entry_is_named_in_error() {
    let converter = Converter::new();
    let err = converter.convert("Skill1;7200", &skill_map()).unwrap_err();
    assert!(err.reason.contains("'Skill1;7200'"), "reason: {}", err.reason);

    let err = converter.convert("a:1:2", &skill_map()).unwrap_err();
    assert!(err.reason.contains("'a:1:2'"));
}

#[test]
fn repeated_map_key_keeps_last_value() {
    let converter = Converter::new();
    let value = converter.convert("a:1, b:2, a:3", &skill_map()).unwrap();
    assert_eq!(
        value,
        Value::Map(vec![
            (Value::String("a".to_string()), Value::I32(3)),
            (Value::String("b".to_string()), Value::I32(2)),
        ])
    );
}

#[test]
fn nested_generic_shapes_convert_recursively() {
    let converter = Converter::new();
    let ty = TypeDescriptor::map(
        TypeDescriptor::string(),
        TypeDescriptor::set(TypeDescriptor::primitive(PrimitiveKind::I64)),
    );
    // Elements of the inner set cannot contain commas, so a single element per key.
    let value = converter.convert("a:0x10, b:010", &ty).unwrap();
    assert_eq!(
        value,
        Value::Map(vec![
            (Value::String("a".to_string()), Value::Set(vec![Value::I64(16)])),
            (Value::String("b".to_string()), Value::Set(vec![Value::I64(8)])),
        ])
    );
}

#[test]
fn element_failure_fails_whole_collection() {
    let converter = Converter::new();
    let err = converter.convert("1, two, 3", &int_list()).unwrap_err();
    assert_eq!(err.value, "two");
}

#[test]
fn enum_matches_exact_case_only() {
    let converter = Converter::new();
    let ty = TypeDescriptor::enumeration(EnumType::new("Mode", ["Fast", "Safe"]));
    assert_eq!(converter.convert("Fast", &ty).unwrap().variant(), Some("Fast"));
    let err = converter.convert("fast", &ty).unwrap_err();
    assert_eq!(err.type_name, "Mode");
}

#[test]
fn character_arrays_check_each_element() {
    let converter = Converter::new();
    let ty = TypeDescriptor::array(PrimitiveKind::Char);
    assert_eq!(
        converter.convert("a, b", &ty).unwrap(),
        Value::Array(vec![Value::Char('a'), Value::Char('b')])
    );
    assert!(converter.convert("a, bc", &ty).is_err());
}

#[test]
fn empty_primitive_fails_loudly() {
    let converter = Converter::new();
    let err = converter
        .convert("", &TypeDescriptor::primitive(PrimitiveKind::I32))
        .unwrap_err();
    assert_eq!(err.type_name, "i32");
    assert!(converter.convert("", &TypeDescriptor::boxed(PrimitiveKind::Bool)).is_err());
}

#[test]
fn exact_custom_converter_overrides_builtin_rule() {
    let mut converter = Converter::new();
    converter.register("i64", |_, raw| {
        let seconds: i64 = raw.trim().parse()?;
        Ok(Value::I64(seconds * 1000))
    });
    let value = converter
        .convert("5", &TypeDescriptor::primitive(PrimitiveKind::I64))
        .unwrap();
    assert_eq!(value, Value::I64(5000));
    assert!(converter.has_converter("i64"));
    assert!(!converter.has_converter("Long"));

    // Boxed i64 is a different registry key.
    let value = converter
        .convert("5", &TypeDescriptor::boxed(PrimitiveKind::I64))
        .unwrap();
    assert_eq!(value, Value::I64(5));
}

#[test]
fn custom_converter_receives_type_arguments() {
    let mut converter = Converter::new();
    converter.register("Pair", |ty, raw| {
        let args = ty.arguments();
        Ok(Value::String(format!("{}:{}:{}", args.len(), args[0], raw)))
    });
    let ty = TypeDescriptor::opaque(
        NamedType::new("Pair"),
        vec![TypeDescriptor::string(), TypeDescriptor::string()],
    );
    assert_eq!(
        converter.convert("x", &ty).unwrap(),
        Value::String("2:String:x".to_string())
    );
}

#[test]
fn custom_converter_errors_become_conversion_errors() {
    let mut converter = Converter::new();
    converter.register("Port", |_, _| anyhow::bail!("port out of range"));
    let err = converter
        .convert("70000", &TypeDescriptor::named(NamedType::new("Port")))
        .unwrap_err();
    assert_eq!(err.value, "70000");
    assert!(err.reason.contains("port out of range"));
    assert!(err.cause.is_some());
}

#[test]
fn recognized_factory_is_invoked() {
    let converter = Converter::new();
    let ty = TypeDescriptor::named(
        NamedType::new("Ipv4Addr").with_factory(StringFactory::from_str::<Ipv4Addr>("Ipv4Addr")),
    );
    let value = converter.convert("127.0.0.1", &ty).unwrap();
    assert_eq!(*value.downcast::<Ipv4Addr>().unwrap(), Ipv4Addr::LOCALHOST);
}

#[test]
fn factory_failure_is_a_conversion_error() {
    let converter = Converter::new();
    let ty = TypeDescriptor::named(
        NamedType::new("Ipv4Addr").with_factory(StringFactory::from_str::<Ipv4Addr>("Ipv4Addr")),
    );
    let err = converter.convert("not-an-ip", &ty).unwrap_err();
    assert_eq!(err.type_name, "Ipv4Addr");
}

#[test]
fn unrecognized_or_mistyped_factories_are_ignored() {
    let converter = Converter::new();
    let ty = TypeDescriptor::named(
        NamedType::new("Token")
            .with_factory(StringFactory::new("decode", "Token", |raw| {
                Ok(Value::String(raw.to_string()))
            }))
            .with_factory(StringFactory::new("parse", "Other", |raw| {
                Ok(Value::String(raw.to_string()))
            })),
    );
    let err = converter.convert("abc", &ty).unwrap_err();
    assert!(err.reason.contains("unsupported type 'Token'"));
}

#[test]
fn factory_returning_a_subtype_is_invoked() {
    let converter = Converter::new();
    let ty = TypeDescriptor::named(NamedType::new("IpAddr").with_factory(
        StringFactory::new("parse", "Loopback", |raw| {
            Ok(Value::String(format!("loopback:{}", raw)))
        })
        .assignable_to("IpAddr"),
    ));
    assert_eq!(
        converter.convert("lo", &ty).unwrap(),
        Value::String("loopback:lo".to_string())
    );
}

fn port() -> TypeDescriptor {
    TypeDescriptor::named(NamedType::new("Port").with_factory(StringFactory::from_str::<u16>("Port")))
}

#[test]
fn set_of_factory_values_removes_equal_items() {
    let converter = Converter::new();
    let value = converter.convert("80, 80, 443", &TypeDescriptor::set(port())).unwrap();
    let items = value.items().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(*items[0].downcast::<u16>().unwrap(), 80);
    assert_eq!(*items[1].downcast::<u16>().unwrap(), 443);
}

#[test]
fn map_with_factory_keys_merges_equal_keys() {
    let converter = Converter::new();
    let ty = TypeDescriptor::map(port(), TypeDescriptor::string());
    let value = converter.convert("80:a, 80:b", &ty).unwrap();
    let Value::Map(entries) = value else {
        panic!("expected a map");
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(*entries[0].0.downcast::<u16>().unwrap(), 80);
    assert_eq!(entries[0].1, Value::String("b".to_string()));
}

#[test]
fn factory_priority_follows_recognized_order() {
    let converter = Converter::new();
    let ty = TypeDescriptor::named(
        NamedType::new("Level")
            .with_factory(StringFactory::new("value_of", "Level", |_| {
                Ok(Value::String("value_of".to_string()))
            }))
            .with_factory(StringFactory::new("parse", "Level", |_| {
                Ok(Value::String("parse".to_string()))
            })),
    );
    assert_eq!(
        converter.convert("x", &ty).unwrap(),
        Value::String("parse".to_string())
    );
}

#[test]
fn factory_lookup_is_cached_per_type_name() {
    let converter = Converter::new();
    let ty = TypeDescriptor::named(
        NamedType::new("Ipv4Addr").with_factory(StringFactory::from_str::<Ipv4Addr>("Ipv4Addr")),
    );
    converter.convert("10.0.0.1", &ty).unwrap();
    assert!(converter.factories.get("Ipv4Addr").unwrap().is_some());

    let bare = TypeDescriptor::named(NamedType::new("Bare"));
    assert!(converter.convert("x", &bare).is_err());
    assert!(converter.factories.get("Bare").unwrap().is_none());
}

#[test]
fn supertype_scan_uses_first_registered_match() {
    let mut converter = Converter::new();
    converter.register("Sink", |_, raw| Ok(Value::String(format!("sink:{}", raw))));
    converter.register("Closeable", |_, raw| Ok(Value::String(format!("closeable:{}", raw))));

    let ty = TypeDescriptor::named(
        NamedType::new("FileSink")
            .with_supertype("Closeable")
            .with_supertype("Sink"),
    );
    assert_eq!(
        converter.convert("out.log", &ty).unwrap(),
        Value::String("sink:out.log".to_string())
    );
}

#[test]
fn unsupported_type_names_the_type() {
    let converter = Converter::new();
    let ty = TypeDescriptor::opaque(NamedType::new("Duration"), vec![]);
    let err = converter.convert("5s", &ty).unwrap_err();
    assert_eq!(err.type_name, "Duration");
    assert!(err.to_string().contains("register a custom converter"));
}

#[test]
fn custom_converter_for_collection_element_applies_inside_list() {
    let mut converter = Converter::new();
    converter.register("Upper", |_, raw| Ok(Value::String(raw.to_uppercase())));
    let ty = TypeDescriptor::list(TypeDescriptor::named(NamedType::new("Upper")));
    assert_eq!(
        converter.convert("a, b", &ty).unwrap(),
        Value::List(vec![Value::String("A".to_string()), Value::String("B".to_string())])
    );
}
