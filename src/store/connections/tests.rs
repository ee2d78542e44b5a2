use super::*;
use crate::db::endpoint::resolve_config_pair;
use crate::store::LocalStore;

fn config(database: &str) -> ConnectionConfig {
    ConnectionConfig::new("db.internal", 3307, "app", "hunter2", database)
}

#[tokio::test]
async fn test_save_and_get_connection_config() {
    let store = LocalStore::open_in_memory().await.unwrap();
    let connections = store.connections();
    let ctx = ProjectContext::new(1);

    assert!(connections
        .get_connection_config(ctx, ConnectionSlot::Left)
        .await
        .unwrap()
        .is_none());

    connections
        .save_connection_config(ctx, ConnectionSlot::Left, &config("shop").with_display_name("Prod"))
        .await
        .unwrap();

    let loaded = connections
        .get_connection_config(ctx, ConnectionSlot::Left)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.display_name.as_deref(), Some("Prod"));
    assert_eq!(loaded.port, 3307);
    assert_eq!(loaded.password, "hunter2");
    assert_eq!(loaded.database, "shop");
}

#[tokio::test]
async fn test_display_name_defaults_per_slot() {
    let store = LocalStore::open_in_memory().await.unwrap();
    let connections = store.connections();
    let ctx = ProjectContext::new(1);

    connections
        .save_connection_config(ctx, ConnectionSlot::Right, &config("shop"))
        .await
        .unwrap();
    let loaded = connections
        .get_connection_config(ctx, ConnectionSlot::Right)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.display_name.as_deref(), Some("Database 2"));
}

#[tokio::test]
async fn test_save_replaces_slot_and_scopes_by_project() {
    let store = LocalStore::open_in_memory().await.unwrap();
    let connections = store.connections();
    let ctx = ProjectContext::new(1);

    connections
        .save_connection_config(ctx, ConnectionSlot::Left, &config("first"))
        .await
        .unwrap();
    connections
        .save_connection_config(ctx, ConnectionSlot::Left, &config("second"))
        .await
        .unwrap();
    connections
        .save_connection_config(ProjectContext::new(2), ConnectionSlot::Left, &config("other"))
        .await
        .unwrap();

    let listed = connections.list_connection_configs(ctx).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].database, "second");
    assert_eq!(listed[0].slot, "left");
}

#[tokio::test]
async fn test_save_rejects_invalid_config() {
    let store = LocalStore::open_in_memory().await.unwrap();
    let err = store
        .connections()
        .save_connection_config(ProjectContext::new(1), ConnectionSlot::Left, &config(""))
        .await
        .unwrap_err();
    assert!(matches!(err, DbSyncError::InvalidInput(_)));
}

#[tokio::test]
async fn test_resolve_pair_reports_missing_side() {
    let store = LocalStore::open_in_memory().await.unwrap();
    let connections = store.connections();
    let ctx = ProjectContext::new(1);

    connections
        .save_connection_config(ctx, ConnectionSlot::Left, &config("shop"))
        .await
        .unwrap();

    let err = resolve_config_pair(&connections, &ctx).await.unwrap_err();
    assert_eq!(
        err,
        DbSyncError::ConfigurationMissing("no connection configured for the right side".to_string())
    );

    connections
        .save_connection_config(ctx, ConnectionSlot::Right, &config("replica"))
        .await
        .unwrap();
    let (left, right) = resolve_config_pair(&connections, &ctx).await.unwrap();
    assert_eq!(left.database, "shop");
    assert_eq!(right.database, "replica");
}
