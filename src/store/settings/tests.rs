use super::*;
use crate::store::LocalStore;

#[tokio::test]
async fn test_set_and_get_setting() {
    let store = LocalStore::open_in_memory().await.unwrap();
    let settings = store.settings();

    settings.set_setting("theme", &"dark").await.unwrap();
    assert_eq!(
        settings.get_setting::<String>("theme").await.unwrap(),
        Some("dark".to_string())
    );

    settings.set_setting("theme", &"light").await.unwrap();
    assert_eq!(
        settings.get_setting::<String>("theme").await.unwrap(),
        Some("light".to_string())
    );
    assert_eq!(settings.get_setting::<String>("missing").await.unwrap(), None);
}

#[tokio::test]
async fn test_unreadable_setting_reads_as_absent() {
    let store = LocalStore::open_in_memory().await.unwrap();
    sqlx::query("INSERT INTO app_settings (key, value) VALUES ('broken', '{not json')")
        .execute(store.get_pool())
        .await
        .unwrap();

    let value = store
        .settings()
        .get_setting::<serde_json::Value>("broken")
        .await
        .unwrap();
    assert!(value.is_none());
}

#[tokio::test]
async fn test_engine_settings_round_trip() {
    let store = LocalStore::open_in_memory().await.unwrap();
    let settings = store.settings();

    assert_eq!(settings.get_engine_settings().await.unwrap(), EngineSettings::default());

    let custom = EngineSettings {
        default_record_limit: 100,
        query_timeout_secs: 5,
        ..EngineSettings::default()
    };
    settings.save_engine_settings(&custom).await.unwrap();
    assert_eq!(settings.get_engine_settings().await.unwrap(), custom);
}
