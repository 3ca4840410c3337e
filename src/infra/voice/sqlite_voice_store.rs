use crate::core::voice::{VoiceError, VoiceStore};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

/// Ownership of temporary voice rooms.
pub struct SqliteVoiceStore {
    pool: SqlitePool,
}

impl SqliteVoiceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS voice_channels (
                channel_id INTEGER PRIMARY KEY,
                owner_id INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl VoiceStore for SqliteVoiceStore {
    async fn add_voice_channel(&self, channel_id: u64, owner_id: u64) -> Result<(), VoiceError> {
        sqlx::query(
            r#"
            INSERT INTO voice_channels (channel_id, owner_id) VALUES (?, ?)
            ON CONFLICT(channel_id) DO UPDATE SET owner_id = excluded.owner_id
            "#,
        )
        .bind(channel_id as i64)
        .bind(owner_id as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| VoiceError::StorageError(e.to_string()))?;

        Ok(())
    }

    async fn get_voice_owner(&self, channel_id: u64) -> Result<Option<u64>, VoiceError> {
        let row = sqlx::query("SELECT owner_id FROM voice_channels WHERE channel_id = ?")
            .bind(channel_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| VoiceError::StorageError(e.to_string()))?;

        Ok(row.map(|r| r.get::<i64, _>("owner_id") as u64))
    }

    async fn get_user_voice_channels(&self, owner_id: u64) -> Result<Vec<u64>, VoiceError> {
        let rows = sqlx::query(
            "SELECT channel_id FROM voice_channels WHERE owner_id = ? ORDER BY channel_id",
        )
        .bind(owner_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| VoiceError::StorageError(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|r| r.get::<i64, _>("channel_id") as u64)
            .collect())
    }

    async fn remove_voice_channel(&self, channel_id: u64) -> Result<bool, VoiceError> {
        let result = sqlx::query("DELETE FROM voice_channels WHERE channel_id = ?")
            .bind(channel_id as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| VoiceError::StorageError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::database::memory_pool;

    #[tokio::test]
    async fn ownership_lifecycle() {
        let store = SqliteVoiceStore::new(memory_pool().await);
        store.migrate().await.unwrap();

        store.add_voice_channel(100, 1).await.unwrap();
        store.add_voice_channel(101, 1).await.unwrap();
        assert_eq!(store.get_voice_owner(100).await.unwrap(), Some(1));
        assert_eq!(store.get_user_voice_channels(1).await.unwrap(), vec![100, 101]);

        // Claiming a room rewrites its owner.
        store.add_voice_channel(100, 2).await.unwrap();
        assert_eq!(store.get_voice_owner(100).await.unwrap(), Some(2));

        assert!(store.remove_voice_channel(100).await.unwrap());
        assert!(!store.remove_voice_channel(100).await.unwrap());
        assert_eq!(store.get_voice_owner(100).await.unwrap(), None);
    }
}
