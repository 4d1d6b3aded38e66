//! Extractor Tests
//!
//! Tests for typed flag resolution against registered descriptors.

use std::time::Duration;

use cmdlink::command::{FlagDescriptor, FlagType, FlagValue, ValueKind};
use cmdlink::{CmdlinkError, CommandDescriptor, WireMessage};

fn command() -> CommandDescriptor {
    CommandDescriptor::new("test", "Flag fixture", |_, _| Ok(()))
        .required_int("count", "Required int")
        .optional_int("retries", "Optional int", 7)
        .optional_int64("limit", "Int64 default", 5)
        .optional_string("msg", "String default", "hi".to_string())
        .optional_uint64("big", "Uint64 default", u64::MAX)
        .required_int_list("xs", "Required int list")
        .optional_string_list("tags", "String list default", vec!["a".into(), "b".into()])
        .optional_duration("wait", "Duration default", Duration::from_secs(2))
        .optional_bool("verbose", "Bool default", false)
}

fn assert_flag_parse(result: cmdlink::Result<impl std::fmt::Debug>, expected_flag: &str) {
    match result {
        Err(CmdlinkError::FlagParse { flag, .. }) => assert_eq!(flag, expected_flag),
        other => panic!("Expected FlagParse for '{}', got {:?}", expected_flag, other),
    }
}

// =============================================================================
// Scalar Resolution
// =============================================================================

#[test]
fn test_required_int_parses_supplied_value() {
    let cmd = command();
    let msg = WireMessage::new("test").with_flag("count", ["42"]);
    assert_eq!(cmd.bind(&msg).int("count").unwrap(), 42);
}

#[test]
fn test_required_int_missing_fails() {
    let cmd = command();
    let msg = WireMessage::new("test");
    assert_flag_parse(cmd.bind(&msg).int("count"), "count");
}

#[test]
fn test_optional_int_uses_default_then_supplied() {
    let cmd = command();

    let msg = WireMessage::new("test");
    assert_eq!(cmd.bind(&msg).int("retries").unwrap(), 7);

    let msg = WireMessage::new("test").with_flag("retries", ["9"]);
    assert_eq!(cmd.bind(&msg).int("retries").unwrap(), 9);
}

#[test]
fn test_empty_value_list_falls_back_to_default() {
    let cmd = command();
    let msg = WireMessage::new("test").with_flag("retries", Vec::<String>::new());
    assert_eq!(cmd.bind(&msg).int("retries").unwrap(), 7);
}

#[test]
fn test_scalar_uses_first_of_several_values() {
    let cmd = command();
    let msg = WireMessage::new("test").with_flag("count", ["1", "2"]);
    assert_eq!(cmd.bind(&msg).int("count").unwrap(), 1);
}

#[test]
fn test_unparseable_value_fails() {
    let cmd = command();
    let msg = WireMessage::new("test").with_flag("count", ["forty-two"]);
    assert_flag_parse(cmd.bind(&msg).int("count"), "count");
}

#[test]
fn test_echo_default_and_override() {
    let cmd = command();

    let msg = WireMessage::new("test");
    assert_eq!(cmd.bind(&msg).string("msg").unwrap(), "hi");

    let msg = WireMessage::new("test").with_flag("msg", ["hello"]);
    assert_eq!(cmd.bind(&msg).string("msg").unwrap(), "hello");
}

#[test]
fn test_duration_flag() {
    let cmd = command();

    let msg = WireMessage::new("test");
    assert_eq!(cmd.bind(&msg).duration("wait").unwrap(), Duration::from_secs(2));

    let msg = WireMessage::new("test").with_flag("wait", ["1h 30m"]);
    assert_eq!(
        cmd.bind(&msg).duration("wait").unwrap(),
        Duration::from_secs(90 * 60)
    );

    let msg = WireMessage::new("test").with_flag("wait", ["250ms"]);
    assert_eq!(
        cmd.bind(&msg).duration("wait").unwrap(),
        Duration::from_millis(250)
    );

    let msg = WireMessage::new("test").with_flag("wait", ["soon"]);
    assert_flag_parse(cmd.bind(&msg).duration("wait"), "wait");
}

#[test]
fn test_bool_flag_spellings() {
    let cmd = command();
    for (raw, expected) in [("true", true), ("1", true), ("T", true), ("False", false), ("0", false)] {
        let msg = WireMessage::new("test").with_flag("verbose", [raw]);
        assert_eq!(cmd.bind(&msg).bool("verbose").unwrap(), expected, "raw {}", raw);
    }

    let msg = WireMessage::new("test").with_flag("verbose", ["yes"]);
    assert_flag_parse(cmd.bind(&msg).bool("verbose"), "verbose");
}

#[test]
fn test_float_flag_without_declaration() {
    let cmd = command();
    let msg = WireMessage::new("test").with_flag("ratio", ["0.25"]);
    assert_eq!(cmd.bind(&msg).float64("ratio").unwrap(), 0.25);

    let msg = WireMessage::new("test");
    assert_flag_parse(cmd.bind(&msg).float64("ratio"), "ratio");
}

// =============================================================================
// List Resolution
// =============================================================================

#[test]
fn test_int_list_parses_every_value() {
    let cmd = command();
    let msg = WireMessage::new("test").with_flag("xs", ["1", "2", "3"]);
    assert_eq!(cmd.bind(&msg).int_list("xs").unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_int_list_with_bad_element_fails() {
    let cmd = command();
    let msg = WireMessage::new("test").with_flag("xs", ["1", "2", "x"]);
    assert_flag_parse(cmd.bind(&msg).int_list("xs"), "xs");
}

#[test]
fn test_required_list_missing_fails() {
    let cmd = command();
    let msg = WireMessage::new("test");
    assert_flag_parse(cmd.bind(&msg).int_list("xs"), "xs");
}

#[test]
fn test_string_list_default() {
    let cmd = command();

    let msg = WireMessage::new("test");
    assert_eq!(cmd.bind(&msg).string_list("tags").unwrap(), ["a", "b"]);

    let msg = WireMessage::new("test").with_flag("tags", ["x"]);
    assert_eq!(cmd.bind(&msg).string_list("tags").unwrap(), ["x"]);
}

// =============================================================================
// Default Type Mismatch
// =============================================================================

#[test]
fn test_integer_default_converts_across_widths() {
    let cmd = command();
    let msg = WireMessage::new("test");

    // Declared int64, requested as int / uint
    assert_eq!(cmd.bind(&msg).int("limit").unwrap(), 5);
    assert_eq!(cmd.bind(&msg).uint("limit").unwrap(), 5);
}

#[test]
fn test_integer_default_out_of_range_is_unusable() {
    let cmd = command();
    let msg = WireMessage::new("test");
    assert_flag_parse(cmd.bind(&msg).int64("big"), "big");
}

#[test]
fn test_mismatched_default_falls_through_to_supplied() {
    let cmd = command();

    // String default requested as int: no usable default
    let msg = WireMessage::new("test");
    assert_flag_parse(cmd.bind(&msg).int("msg"), "msg");

    // ...but a supplied value still parses
    let msg = WireMessage::new("test").with_flag("msg", ["12"]);
    assert_eq!(cmd.bind(&msg).int("msg").unwrap(), 12);
}

#[test]
fn test_scalar_default_not_used_for_list_request() {
    let cmd = command();
    let msg = WireMessage::new("test");
    assert_flag_parse(cmd.bind(&msg).int_list("retries"), "retries");
}

// =============================================================================
// Extractor Accessors
// =============================================================================

#[test]
fn test_raw_and_has() {
    let cmd = command();
    let msg = WireMessage::new("test")
        .with_flag("count", ["3"])
        .with_flag("empty", Vec::<String>::new());
    let input = cmd.bind(&msg);

    assert_eq!(input.command(), "test");
    assert!(input.has("count"));
    assert!(!input.has("empty"));
    assert!(!input.has("absent"));
    assert_eq!(input.raw("count"), ["3"]);
    assert!(input.raw("absent").is_empty());
}

#[test]
fn test_generic_value_api() {
    let cmd = command();
    let msg = WireMessage::new("test").with_flag("xs", ["10", "20"]);
    let input = cmd.bind(&msg);

    let xs: Vec<u64> = input.values("xs").unwrap();
    assert_eq!(xs, vec![10, 20]);
    let retries: i64 = input.value("retries").unwrap();
    assert_eq!(retries, 7);
}

#[test]
fn test_flag_descriptor_types() {
    let cmd = command();

    let xs = cmd.flag("xs").unwrap();
    assert!(xs.is_required());
    assert_eq!(xs.flag_type(), FlagType::list(ValueKind::Int));

    let tags = cmd.flag("tags").unwrap();
    assert_eq!(
        tags.default_value(),
        Some(&FlagValue::StringList(vec!["a".into(), "b".into()]))
    );

    let custom = FlagDescriptor::optional("n", "", FlagValue::Uint(3));
    assert_eq!(custom.flag_type(), FlagType::scalar(ValueKind::Uint));
    assert!(!custom.is_required());
}
