use crate::core::moderation::{ModerationError, WarnRecord, WarnStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

pub struct SqliteWarnStore {
    pool: SqlitePool,
}

impl SqliteWarnStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS warns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                moderator_id INTEGER NOT NULL,
                reason TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_warns_user ON warns(user_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn row_to_warn(row: &SqliteRow) -> Result<WarnRecord, ModerationError> {
    let created_at: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| ModerationError::StorageError(format!("bad timestamp {created_at:?}: {e}")))?
        .with_timezone(&Utc);

    Ok(WarnRecord {
        id: row.get("id"),
        user_id: row.get::<i64, _>("user_id") as u64,
        moderator_id: row.get::<i64, _>("moderator_id") as u64,
        reason: row.get("reason"),
        created_at,
    })
}

#[async_trait]
impl WarnStore for SqliteWarnStore {
    async fn add_warn(
        &self,
        user_id: u64,
        moderator_id: u64,
        reason: &str,
    ) -> Result<WarnRecord, ModerationError> {
        let created_at = Utc::now();

        let row = sqlx::query(
            r#"
            INSERT INTO warns (user_id, moderator_id, reason, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(user_id as i64)
        .bind(moderator_id as i64)
        .bind(reason)
        .bind(created_at.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        Ok(WarnRecord {
            id: row.get("id"),
            user_id,
            moderator_id,
            reason: reason.to_string(),
            created_at,
        })
    }

    async fn get_warns(&self, user_id: u64) -> Result<Vec<WarnRecord>, ModerationError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, moderator_id, reason, created_at
            FROM warns
            WHERE user_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(user_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        rows.iter().map(row_to_warn).collect()
    }

    async fn remove_warn(&self, warn_id: i64) -> Result<bool, ModerationError> {
        let result = sqlx::query("DELETE FROM warns WHERE id = ?")
            .bind(warn_id)
            .execute(&self.pool)
            .await
            .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_warns(&self, user_id: u64) -> Result<u64, ModerationError> {
        let result = sqlx::query("DELETE FROM warns WHERE user_id = ?")
            .bind(user_id as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::database::memory_pool;

    async fn store() -> SqliteWarnStore {
        let store = SqliteWarnStore::new(memory_pool().await);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn warns_come_back_in_order() {
        let store = store().await;
        let first = store.add_warn(5, 1, "spam").await.unwrap();
        let second = store.add_warn(5, 2, "caps").await.unwrap();
        store.add_warn(6, 1, "other user").await.unwrap();

        let warns = store.get_warns(5).await.unwrap();
        assert_eq!(warns.len(), 2);
        assert_eq!(warns[0].id, first.id);
        assert_eq!(warns[1].reason, "caps");
        assert!(second.id > first.id);
        // Timestamps survive the round trip to the second.
        assert_eq!(warns[0].created_at.timestamp(), first.created_at.timestamp());
    }

    #[tokio::test]
    async fn remove_and_clear_report_what_they_did() {
        let store = store().await;
        let warn = store.add_warn(5, 1, "spam").await.unwrap();
        store.add_warn(5, 1, "again").await.unwrap();

        assert!(store.remove_warn(warn.id).await.unwrap());
        assert!(!store.remove_warn(warn.id).await.unwrap());
        assert_eq!(store.clear_warns(5).await.unwrap(), 1);
        assert_eq!(store.clear_warns(5).await.unwrap(), 0);
    }
}
