use super::*;

#[test]
fn test_table_diff_entry_derives_difference() {
    let entry = TableDiffEntry::new("orders", true, 10, true, 4);
    assert!(entry.different);
    assert_eq!(entry.difference, 6);

    let reversed = TableDiffEntry::new("orders", true, 4, true, 10);
    assert_eq!(reversed.difference, 6);
}

#[test]
fn test_table_diff_entry_same_counts() {
    let entry = TableDiffEntry::new("users", true, 7, true, 7);
    assert!(!entry.different);
    assert_eq!(entry.difference, 0);
    assert!(!entry.is_missing());
}

#[test]
fn test_table_diff_entry_missing_side_is_different() {
    let entry = TableDiffEntry::new("audit", true, 0, false, 0);
    assert!(entry.different);
    assert_eq!(entry.difference, 0);
    assert!(entry.is_missing());
}

#[test]
fn test_comparison_stats() {
    let entries = vec![
        TableDiffEntry::new("a", true, 1, true, 1),
        TableDiffEntry::new("b", true, 1, true, 2),
        TableDiffEntry::new("c", false, 0, true, 3),
    ];
    let stats = ComparisonStats::from_entries(&entries);
    assert_eq!(stats.total_tables, 3);
    assert_eq!(stats.different_tables, 2);
    assert_eq!(stats.same_tables, 1);
    assert_eq!(stats.missing_tables, 1);
}

#[test]
fn test_display_label_falls_back_to_database() {
    let cfg = ConnectionConfig::new("localhost", 3306, "root", "", "shop");
    assert_eq!(cfg.display_label(), "shop");
    let named = cfg.with_display_name("Production");
    assert_eq!(named.display_label(), "Production");
}

#[test]
fn test_connection_config_validate() {
    let mut cfg = ConnectionConfig::new("localhost", 3306, "root", "", "shop");
    assert!(cfg.validate().is_ok());
    cfg.port = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_connection_config_reads_connection_name() {
    let json = r#"{"connectionName":"Staging","host":"h","port":3306,"user":"u","database":"d"}"#;
    let cfg: ConnectionConfig = serde_json::from_str(json).unwrap();
    assert_eq!(cfg.display_name.as_deref(), Some("Staging"));
    assert_eq!(cfg.password, "");
}

#[test]
fn test_notify_progress_without_listener() {
    notify_progress(
        None,
        ProgressEvent {
            current: 1,
            total: 1,
            current_label: "t".to_string(),
            stage: CompareStage::CountingRows,
        },
    );

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    drop(rx);
    notify_progress(
        Some(&tx),
        ProgressEvent {
            current: 1,
            total: 1,
            current_label: "t".to_string(),
            stage: CompareStage::CountingRows,
        },
    );
}
