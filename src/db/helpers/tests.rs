use super::*;
use serde_json::json;

#[test]
fn test_usize_to_i64() {
    assert_eq!(usize_to_i64(100), 100);
    assert_eq!(usize_to_i64(0), 0);
}

#[test]
fn test_i64_to_usize() {
    assert_eq!(i64_to_usize(100), 100);
    assert_eq!(i64_to_usize(-100), 0);
}

#[test]
fn test_parse_count_value() {
    assert_eq!(parse_count_value(&json!(12)), Some(12));
    assert_eq!(parse_count_value(&json!(" 7 ")), Some(7));
    assert_eq!(parse_count_value(&json!(true)), Some(1));
    assert_eq!(parse_count_value(&json!(-1)), None);
    assert_eq!(parse_count_value(&json!(null)), None);
}

#[test]
fn test_value_to_key_token() {
    assert_eq!(value_to_key_token(&json!(1)), Some("1".to_string()));
    assert_eq!(value_to_key_token(&json!("1")), Some("1".to_string()));
    assert_eq!(value_to_key_token(&json!(null)), None);
}

#[test]
fn test_integral_float_key_matches_integer_key() {
    assert_eq!(value_to_key_token(&json!(1.0)), Some("1".to_string()));
    assert_eq!(value_to_key_token(&json!(-0.0)), Some("0".to_string()));
    assert_eq!(value_to_key_token(&json!(1.5)), Some("1.5".to_string()));
    assert_eq!(
        number_to_decimal_string(&serde_json::Number::from(u64::MAX)),
        "18446744073709551615"
    );
}

#[test]
fn test_truncate_chars() {
    assert_eq!(truncate_chars("hello world", 5), "hello...");
    assert_eq!(truncate_chars("hi", 10), "hi");
}
