use super::*;
use crate::db_types::TableDiffEntry;
use crate::store::LocalStore;

fn config(host: &str, database: &str) -> ConnectionConfig {
    ConnectionConfig::new(host, 3306, "root", "secret", database)
}

fn report(tag: &str) -> ComparisonReport {
    let entries = vec![TableDiffEntry::new(tag, true, 1, true, 2)];
    ComparisonReport {
        total_tables: entries.len(),
        entries,
        db1_name: "a".to_string(),
        db2_name: "b".to_string(),
        db1_display_name: "A".to_string(),
        db2_display_name: "B".to_string(),
        from_cache: false,
        generated_at: Utc::now(),
    }
}

#[test]
fn test_fingerprint_excludes_password_and_is_reversible() {
    let mut a = config("db.local", "shop");
    let fp = config_fingerprint(&a);
    a.password = "changed".to_string();
    assert_eq!(config_fingerprint(&a), fp);

    let decoded = BASE64_STANDARD.decode(&fp).unwrap();
    assert_eq!(String::from_utf8(decoded).unwrap(), "db.local:3306:root:shop");
}

#[test]
fn test_fingerprint_distinguishes_fields() {
    let a = config("db.local", "shop");
    let mut b = a.clone();
    b.port = 3307;
    assert_ne!(config_fingerprint(&a), config_fingerprint(&b));
}

#[tokio::test]
async fn test_cache_round_trip() {
    let store = LocalStore::open_in_memory().await.unwrap();
    let cache = store.cache();
    let (a, b) = (config("h1", "one"), config("h2", "two"));
    let r = report("orders");

    cache.put(&a, &b, &r).await.unwrap();
    let entry = cache.get(&a, &b).await.unwrap().unwrap();
    assert_eq!(entry.report, r);
    assert_eq!(entry.fingerprint1, config_fingerprint(&a));
}

#[tokio::test]
async fn test_cache_put_replaces_existing_entry() {
    let store = LocalStore::open_in_memory().await.unwrap();
    let cache = store.cache();
    let (a, b) = (config("h1", "one"), config("h2", "two"));

    cache.put(&a, &b, &report("first")).await.unwrap();
    cache.put(&a, &b, &report("second")).await.unwrap();

    let entry = cache.get(&a, &b).await.unwrap().unwrap();
    assert_eq!(entry.report.entries[0].table_name, "second");
    assert_eq!(cache.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_cache_is_pair_order_sensitive() {
    let store = LocalStore::open_in_memory().await.unwrap();
    let cache = store.cache();
    let (a, b) = (config("h1", "one"), config("h2", "two"));

    cache.put(&a, &b, &report("orders")).await.unwrap();
    assert!(cache.get(&b, &a).await.unwrap().is_none());
}

#[tokio::test]
async fn test_cache_clear_and_invalidate_all() {
    let store = LocalStore::open_in_memory().await.unwrap();
    let cache = store.cache();
    let (a, b, c) = (config("h1", "one"), config("h2", "two"), config("h3", "three"));

    cache.put(&a, &b, &report("x")).await.unwrap();
    cache.put(&a, &c, &report("y")).await.unwrap();

    assert_eq!(cache.clear(&a, &b).await.unwrap(), 1);
    assert!(cache.get(&a, &b).await.unwrap().is_none());
    assert!(cache.get(&a, &c).await.unwrap().is_some());

    cache.invalidate_all().await.unwrap();
    assert_eq!(cache.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_concurrent_puts_leave_one_entry() {
    let store = LocalStore::open_in_memory().await.unwrap();
    let (a, b) = (config("h1", "one"), config("h2", "two"));

    let first = store.cache();
    let second = store.cache();
    let (r1, r2) = (report("first"), report("second"));
    let (res1, res2) = tokio::join!(first.put(&a, &b, &r1), second.put(&a, &b, &r2));
    res1.unwrap();
    res2.unwrap();

    assert_eq!(store.cache().count().await.unwrap(), 1);
}
