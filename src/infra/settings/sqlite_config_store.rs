use crate::core::settings::{ConfigEntry, ConfigError, ConfigStore};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

/// Per-guild key/value settings.
pub struct SqliteConfigStore {
    pool: SqlitePool,
}

impl SqliteConfigStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS server_settings (
                guild_id INTEGER NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (guild_id, key)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ConfigStore for SqliteConfigStore {
    async fn load_all(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        let rows = sqlx::query("SELECT guild_id, key, value FROM server_settings")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ConfigError::StorageError(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| ConfigEntry {
                guild_id: row.get::<i64, _>("guild_id") as u64,
                key: row.get("key"),
                value: row.get("value"),
            })
            .collect())
    }

    async fn set(&self, guild_id: u64, key: &str, value: &str) -> Result<(), ConfigError> {
        sqlx::query(
            r#"
            INSERT INTO server_settings (guild_id, key, value) VALUES (?, ?, ?)
            ON CONFLICT(guild_id, key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(guild_id as i64)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| ConfigError::StorageError(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, guild_id: u64, key: &str) -> Result<bool, ConfigError> {
        let result = sqlx::query("DELETE FROM server_settings WHERE guild_id = ? AND key = ?")
            .bind(guild_id as i64)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| ConfigError::StorageError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::{ConfigKey, ServerConfigService};
    use crate::infra::database::{connect, memory_pool};
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn set_overwrites_and_delete_reports() {
        let store = SqliteConfigStore::new(memory_pool().await);
        store.migrate().await.unwrap();

        store.set(1, "log_channel_id", "10").await.unwrap();
        store.set(1, "log_channel_id", "11").await.unwrap();
        store.set(2, "log_channel_id", "20").await.unwrap();

        let mut entries = store.load_all().await.unwrap();
        entries.sort_by_key(|e| e.guild_id);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].value, "11");

        assert!(store.delete(1, "log_channel_id").await.unwrap());
        assert!(!store.delete(1, "log_channel_id").await.unwrap());
    }

    #[tokio::test]
    async fn settings_survive_reopening_the_database() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let pool = connect(&path).await.unwrap();
        let store = SqliteConfigStore::new(pool.clone());
        store.migrate().await.unwrap();
        let service = ServerConfigService::new(store);
        service.reload().await.unwrap();
        service.set_id(42, ConfigKey::WelcomeChannel, 777).await.unwrap();
        pool.close().await;

        let store = SqliteConfigStore::new(connect(&path).await.unwrap());
        store.migrate().await.unwrap();
        let service = ServerConfigService::new(store);
        service.reload().await.unwrap();

        assert_eq!(
            service.get_id(42, ConfigKey::WelcomeChannel).unwrap(),
            Some(777)
        );
    }
}
