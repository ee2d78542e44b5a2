use super::*;
use chrono::{TimeZone, Utc};
use serde_json::json;

fn column(name: &str, column_type: &str) -> ColumnSchema {
    ColumnSchema {
        name: name.to_string(),
        data_type: column_type.split('(').next().unwrap_or_default().to_string(),
        column_type: column_type.to_string(),
        ..Default::default()
    }
}

#[test]
fn test_classify_big_integer_variants() {
    assert!(classify_column(&column("id", "bigint(20)")).is_big_integer);
    assert!(classify_column(&column("id", "bigint unsigned")).is_big_integer);
    assert!(classify_column(&column("id", "BIGINT")).is_big_integer);
    assert!(!classify_column(&column("id", "int(11)")).is_big_integer);
    assert!(!classify_column(&column("id", "tinyint(1)")).is_big_integer);
}

#[test]
fn test_classify_temporal_variants() {
    assert!(classify_column(&column("created_at", "datetime")).is_temporal);
    assert!(classify_column(&column("created_at", "datetime(3)")).is_temporal);
    assert!(classify_column(&column("updated_at", "timestamp")).is_temporal);
    assert!(classify_column(&column("birthday", "date")).is_temporal);
    assert!(!classify_column(&column("duration", "time")).is_temporal);
    assert!(!classify_column(&column("label", "varchar(255)")).is_temporal);
}

#[test]
fn test_big_integer_max_becomes_exact_string() {
    let info = classify_column(&column("id", "bigint(20)"));
    let value = coerce_value(Some(&info), json!(9223372036854775807i64));
    assert_eq!(value, json!("9223372036854775807"));

    let unsigned = coerce_value(Some(&info), json!(18446744073709551615u64));
    assert_eq!(unsigned, json!("18446744073709551615"));
}

#[test]
fn test_big_integer_string_is_untouched() {
    let info = classify_column(&column("id", "bigint"));
    let value = coerce_value(Some(&info), json!("9223372036854775807"));
    assert_eq!(value, json!("9223372036854775807"));
}

#[test]
fn test_temporal_iso_without_zone_is_canonicalized() {
    let info = classify_column(&column("created_at", "datetime"));
    let value = coerce_value(Some(&info), json!("2024-03-05T07:08:09.000"));
    assert_eq!(value, json!("2024-03-05 07:08:09"));
}

#[test]
fn test_temporal_iso_with_z_is_rendered_local() {
    let info = classify_column(&column("created_at", "timestamp"));
    let instant = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
    let expected = instant
        .with_timezone(&Local)
        .format(CANONICAL_DATETIME_FORMAT)
        .to_string();

    let value = coerce_value(Some(&info), json!("2024-03-05T07:08:09.000Z"));
    assert_eq!(value, json!(expected));
    assert!(!value.as_str().unwrap().ends_with('Z'));
}

#[test]
fn test_temporal_canonical_string_passes_through() {
    let info = classify_column(&column("created_at", "datetime"));
    let value = coerce_value(Some(&info), json!("2024-03-05 07:08:09"));
    assert_eq!(value, json!("2024-03-05 07:08:09"));
}

#[test]
fn test_untyped_and_null_values_pass_through() {
    assert_eq!(coerce_value(None, json!(1.5)), json!(1.5));
    let info = classify_column(&column("id", "bigint"));
    assert_eq!(coerce_value(Some(&info), serde_json::Value::Null), serde_json::Value::Null);
}

#[test]
fn test_coerce_row_uses_type_map() {
    let types = build_type_map(&classify_columns(&[
        column("id", "bigint"),
        column("name", "varchar(20)"),
    ]));
    let mut row = serde_json::Map::new();
    row.insert("id".to_string(), json!(42));
    row.insert("name".to_string(), json!("x"));

    let coerced = coerce_row(row, &types);
    assert_eq!(coerced.get("id"), Some(&json!("42")));
    assert_eq!(coerced.get("name"), Some(&json!("x")));
}

#[test]
fn test_merge_type_maps_widens_flags_from_either_side() {
    let left = classify_columns(&[column("id", "int(11)"), column("seen", "varchar(20)")]);
    let right = classify_columns(&[
        column("id", "bigint(20)"),
        column("seen", "datetime"),
        column("extra", "text"),
    ]);

    let merged = merge_type_maps(&left, &right);
    assert!(merged["id"].is_big_integer);
    assert_eq!(merged["id"].sql_type, "int(11)");
    assert!(merged["seen"].is_temporal);
    assert!(merged.contains_key("extra"));
}
