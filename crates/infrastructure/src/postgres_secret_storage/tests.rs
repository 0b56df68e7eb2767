use keyward_application::SecretStorage;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::PostgresSecretStorage;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres storage tests: {error}");
    }

    Some(pool)
}

#[tokio::test]
async fn put_overwrites_and_delete_is_idempotent() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let storage = PostgresSecretStorage::new(pool);
    let key = format!("test-{}/config", Uuid::new_v4());

    assert!(storage.put(key.as_str(), b"first".to_vec()).await.is_ok());
    assert!(storage.put(key.as_str(), b"second".to_vec()).await.is_ok());
    assert_eq!(
        storage.get(key.as_str()).await.unwrap_or_default(),
        Some(b"second".to_vec())
    );

    assert!(storage.delete(key.as_str()).await.is_ok());
    assert!(storage.delete(key.as_str()).await.is_ok());
    assert_eq!(storage.get(key.as_str()).await.unwrap_or_default(), None);
}

#[tokio::test]
async fn list_strips_prefix_and_sorts() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let storage = PostgresSecretStorage::new(pool);
    let prefix = format!("test-{}/role/", Uuid::new_v4());
    for group in ["ops", "deploy", "audit"] {
        let key = format!("{prefix}{group}");
        assert!(storage.put(key.as_str(), b"{}".to_vec()).await.is_ok());
    }

    let listed = storage.list(prefix.as_str()).await.unwrap_or_default();
    assert_eq!(
        listed,
        vec!["audit".to_owned(), "deploy".to_owned(), "ops".to_owned()]
    );
}
