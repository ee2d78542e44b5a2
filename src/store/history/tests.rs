use super::*;
use crate::store::LocalStore;
use chrono::{Duration, Utc};

fn report(db1: &str, entries: Vec<TableDiffEntry>, offset_secs: i64) -> ComparisonReport {
    ComparisonReport {
        total_tables: entries.len(),
        entries,
        db1_name: db1.to_string(),
        db2_name: "replica".to_string(),
        db1_display_name: format!("{} (display)", db1),
        db2_display_name: "replica".to_string(),
        from_cache: false,
        generated_at: Utc::now() + Duration::seconds(offset_secs),
    }
}

#[tokio::test]
async fn test_append_and_read_history() {
    let store = LocalStore::open_in_memory().await.unwrap();
    let history = store.history();

    let entries = vec![
        TableDiffEntry::new("a", true, 1, true, 1),
        TableDiffEntry::new("b", true, 1, false, 0),
        TableDiffEntry::new("c", true, 5, true, 2),
    ];
    let id = history.append_comparison(&report("main", entries.clone(), 0)).await.unwrap();
    assert!(id > 0);

    let records = history.get_comparison_history(10).await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.db1_display_name, "main (display)");
    assert_eq!(record.entries, entries);
    assert_eq!(record.stats.total_tables, 3);
    assert_eq!(record.stats.different_tables, 2);
    assert_eq!(record.stats.same_tables, 1);
    assert_eq!(record.stats.missing_tables, 1);
}

#[tokio::test]
async fn test_history_is_newest_first_and_limited() {
    let store = LocalStore::open_in_memory().await.unwrap();
    let history = store.history();

    history.append_comparison(&report("old", vec![], -60)).await.unwrap();
    history.append_comparison(&report("new", vec![], 0)).await.unwrap();
    history.append_comparison(&report("older", vec![], -120)).await.unwrap();

    let records = history.get_comparison_history(2).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].db1_name, "new");
    assert_eq!(records[1].db1_name, "old");
}

#[tokio::test]
async fn test_history_display_name_falls_back_to_database() {
    let store = LocalStore::open_in_memory().await.unwrap();
    sqlx::query(
        "INSERT INTO comparison_history (db1_name, db2_name, total_tables, different_tables, same_tables, missing_tables, comparison_data) VALUES ('x', 'y', 0, 0, 0, 0, '[]')",
    )
    .execute(store.get_pool())
    .await
    .unwrap();

    let records = store.history().get_comparison_history(10).await.unwrap();
    assert_eq!(records[0].db1_display_name, "x");
    assert_eq!(records[0].db2_display_name, "y");
}
