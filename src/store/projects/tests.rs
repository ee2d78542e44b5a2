use super::*;
use crate::db_types::{ConnectionConfig, ConnectionSlot, FilterSettings, ProjectContext};
use crate::store::LocalStore;

#[tokio::test]
async fn test_create_list_get_project() {
    let store = LocalStore::open_in_memory().await.unwrap();
    let projects = store.projects();

    let billing = projects.create_project("billing", Some("invoices")).await.unwrap();
    projects.create_project("analytics", None).await.unwrap();

    let listed = projects.list_projects().await.unwrap();
    let names: Vec<_> = listed.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["analytics", "billing"]);

    let loaded = projects.get_project(billing.id).await.unwrap().unwrap();
    assert_eq!(loaded.description.as_deref(), Some("invoices"));
    assert!(projects.get_project(9999).await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_or_blank_name_is_rejected() {
    let store = LocalStore::open_in_memory().await.unwrap();
    let projects = store.projects();

    projects.create_project("billing", None).await.unwrap();
    assert!(matches!(
        projects.create_project("billing", None).await.unwrap_err(),
        DbSyncError::InvalidInput(_)
    ));
    assert!(matches!(
        projects.create_project("   ", None).await.unwrap_err(),
        DbSyncError::InvalidInput(_)
    ));
}

#[tokio::test]
async fn test_delete_project_removes_scoped_data() {
    let store = LocalStore::open_in_memory().await.unwrap();
    let project = store.projects().create_project("billing", None).await.unwrap();
    let ctx = ProjectContext::new(project.id);

    store
        .connections()
        .save_connection_config(
            ctx,
            ConnectionSlot::Left,
            &ConnectionConfig::new("localhost", 3306, "root", "", "shop"),
        )
        .await
        .unwrap();
    store
        .filters()
        .save_table_filters(ctx, "shop", "orders", &[], &FilterSettings::default())
        .await
        .unwrap();

    assert!(store.projects().delete_project(project.id).await.unwrap());
    assert!(store
        .connections()
        .get_connection_config(ctx, ConnectionSlot::Left)
        .await
        .unwrap()
        .is_none());
    assert!(store
        .filters()
        .get_table_filters(ctx, "shop", "orders")
        .await
        .unwrap()
        .is_none());
    assert!(!store.projects().delete_project(project.id).await.unwrap());
}
