// Anti-spam state.
//
// Tables:
// - spam_config: per-guild settings (blocked words as a JSON array)
// - spam_messages: recent message hashes for frequency and repeat checks
// - spam_warnings: strike counts per member
// - spam_rate_limits: temporary blocks after tripping the rate limit

use crate::core::moderation::{MessageRecord, SpamConfig, SpamError, SpamStore, SpamType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

pub struct SqliteSpamStore {
    pool: SqlitePool,
}

fn storage(e: sqlx::Error) -> SpamError {
    SpamError::StorageError(e.to_string())
}

impl SqliteSpamStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS spam_config (
                guild_id INTEGER PRIMARY KEY,
                enabled BOOLEAN NOT NULL DEFAULT 1,
                max_messages_per_window INTEGER NOT NULL DEFAULT 5,
                rate_limit_window_secs INTEGER NOT NULL DEFAULT 5,
                rate_limit_block_secs INTEGER NOT NULL DEFAULT 30,
                max_duplicate_messages INTEGER NOT NULL DEFAULT 3,
                max_mentions_per_message INTEGER NOT NULL DEFAULT 5,
                max_caps_ratio REAL NOT NULL DEFAULT 0.7,
                caps_min_length INTEGER NOT NULL DEFAULT 10,
                blocked_words TEXT NOT NULL DEFAULT '[]',
                warnings_before_timeout INTEGER NOT NULL DEFAULT 3,
                timeout_duration_secs INTEGER NOT NULL DEFAULT 300
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS spam_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                guild_id INTEGER NOT NULL,
                content_hash INTEGER NOT NULL,
                sent_at_ms INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_spam_messages_user_guild
            ON spam_messages(user_id, guild_id, sent_at_ms)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS spam_warnings (
                user_id INTEGER NOT NULL,
                guild_id INTEGER NOT NULL,
                warning_count INTEGER NOT NULL DEFAULT 0,
                last_warning INTEGER NOT NULL,
                spam_type TEXT NOT NULL,
                PRIMARY KEY (user_id, guild_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS spam_rate_limits (
                user_id INTEGER NOT NULL,
                guild_id INTEGER NOT NULL,
                until_ms INTEGER NOT NULL,
                PRIMARY KEY (user_id, guild_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SpamStore for SqliteSpamStore {
    async fn record_message(
        &self,
        user_id: u64,
        guild_id: u64,
        record: MessageRecord,
    ) -> Result<(), SpamError> {
        sqlx::query(
            "INSERT INTO spam_messages (user_id, guild_id, content_hash, sent_at_ms) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id as i64)
        .bind(guild_id as i64)
        .bind(record.content_hash as i64)
        .bind(record.timestamp.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn get_recent_messages(
        &self,
        user_id: u64,
        guild_id: u64,
        since: DateTime<Utc>,
    ) -> Result<Vec<MessageRecord>, SpamError> {
        let rows = sqlx::query(
            r#"
            SELECT content_hash, sent_at_ms
            FROM spam_messages
            WHERE user_id = ? AND guild_id = ? AND sent_at_ms >= ?
            ORDER BY sent_at_ms DESC
            "#,
        )
        .bind(user_id as i64)
        .bind(guild_id as i64)
        .bind(since.timestamp_millis())
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        Ok(rows
            .iter()
            .map(|row| MessageRecord {
                content_hash: row.get::<i64, _>("content_hash") as u64,
                timestamp: DateTime::<Utc>::from_timestamp_millis(row.get("sent_at_ms"))
                    .unwrap_or_else(Utc::now),
            })
            .collect())
    }

    async fn add_warning(
        &self,
        user_id: u64,
        guild_id: u64,
        spam_type: SpamType,
    ) -> Result<u32, SpamError> {
        let row = sqlx::query(
            r#"
            INSERT INTO spam_warnings (user_id, guild_id, warning_count, last_warning, spam_type)
            VALUES (?, ?, 1, ?, ?)
            ON CONFLICT(user_id, guild_id) DO UPDATE SET
                warning_count = warning_count + 1,
                last_warning = excluded.last_warning,
                spam_type = excluded.spam_type
            RETURNING warning_count
            "#,
        )
        .bind(user_id as i64)
        .bind(guild_id as i64)
        .bind(Utc::now().timestamp())
        .bind(format!("{:?}", spam_type))
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;

        Ok(row.get::<i64, _>("warning_count") as u32)
    }

    async fn clear_warnings(&self, user_id: u64, guild_id: u64) -> Result<(), SpamError> {
        sqlx::query("DELETE FROM spam_warnings WHERE user_id = ? AND guild_id = ?")
            .bind(user_id as i64)
            .bind(guild_id as i64)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn is_rate_limited(&self, user_id: u64, guild_id: u64) -> Result<bool, SpamError> {
        let now = Utc::now().timestamp_millis();

        // Expired blocks are removed on the way past.
        sqlx::query(
            "DELETE FROM spam_rate_limits WHERE user_id = ? AND guild_id = ? AND until_ms <= ?",
        )
        .bind(user_id as i64)
        .bind(guild_id as i64)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        let row = sqlx::query("SELECT 1 FROM spam_rate_limits WHERE user_id = ? AND guild_id = ?")
            .bind(user_id as i64)
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        Ok(row.is_some())
    }

    async fn set_rate_limited(
        &self,
        user_id: u64,
        guild_id: u64,
        until: DateTime<Utc>,
    ) -> Result<(), SpamError> {
        sqlx::query(
            r#"
            INSERT INTO spam_rate_limits (user_id, guild_id, until_ms)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id, guild_id) DO UPDATE SET until_ms = excluded.until_ms
            "#,
        )
        .bind(user_id as i64)
        .bind(guild_id as i64)
        .bind(until.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn get_config(&self, guild_id: u64) -> Result<SpamConfig, SpamError> {
        let row = sqlx::query("SELECT * FROM spam_config WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        let Some(row) = row else {
            return Ok(SpamConfig::default());
        };

        let blocked_words: String = row.get("blocked_words");
        let blocked_words = serde_json::from_str(&blocked_words)
            .map_err(|e| SpamError::StorageError(format!("bad blocked word list: {e}")))?;

        Ok(SpamConfig {
            enabled: row.get("enabled"),
            max_messages_per_window: row.get::<i64, _>("max_messages_per_window") as u32,
            rate_limit_window_secs: row.get::<i64, _>("rate_limit_window_secs") as u64,
            rate_limit_block_secs: row.get::<i64, _>("rate_limit_block_secs") as u64,
            max_duplicate_messages: row.get::<i64, _>("max_duplicate_messages") as u32,
            max_mentions_per_message: row.get::<i64, _>("max_mentions_per_message") as u32,
            max_caps_ratio: row.get("max_caps_ratio"),
            caps_min_length: row.get::<i64, _>("caps_min_length") as usize,
            blocked_words,
            warnings_before_timeout: row.get::<i64, _>("warnings_before_timeout") as u32,
            timeout_duration_secs: row.get::<i64, _>("timeout_duration_secs") as u64,
        })
    }

    async fn save_config(&self, guild_id: u64, config: SpamConfig) -> Result<(), SpamError> {
        let blocked_words = serde_json::to_string(&config.blocked_words)
            .map_err(|e| SpamError::StorageError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO spam_config (
                guild_id, enabled, max_messages_per_window, rate_limit_window_secs,
                rate_limit_block_secs, max_duplicate_messages, max_mentions_per_message,
                max_caps_ratio, caps_min_length, blocked_words,
                warnings_before_timeout, timeout_duration_secs
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET
                enabled = excluded.enabled,
                max_messages_per_window = excluded.max_messages_per_window,
                rate_limit_window_secs = excluded.rate_limit_window_secs,
                rate_limit_block_secs = excluded.rate_limit_block_secs,
                max_duplicate_messages = excluded.max_duplicate_messages,
                max_mentions_per_message = excluded.max_mentions_per_message,
                max_caps_ratio = excluded.max_caps_ratio,
                caps_min_length = excluded.caps_min_length,
                blocked_words = excluded.blocked_words,
                warnings_before_timeout = excluded.warnings_before_timeout,
                timeout_duration_secs = excluded.timeout_duration_secs
            "#,
        )
        .bind(guild_id as i64)
        .bind(config.enabled)
        .bind(config.max_messages_per_window as i64)
        .bind(config.rate_limit_window_secs as i64)
        .bind(config.rate_limit_block_secs as i64)
        .bind(config.max_duplicate_messages as i64)
        .bind(config.max_mentions_per_message as i64)
        .bind(config.max_caps_ratio)
        .bind(config.caps_min_length as i64)
        .bind(blocked_words)
        .bind(config.warnings_before_timeout as i64)
        .bind(config.timeout_duration_secs as i64)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn cleanup_old_records(&self, older_than: DateTime<Utc>) -> Result<u64, SpamError> {
        let result = sqlx::query("DELETE FROM spam_messages WHERE sent_at_ms < ?")
            .bind(older_than.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::database::memory_pool;

    async fn store() -> SqliteSpamStore {
        let store = SqliteSpamStore::new(memory_pool().await);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn config_defaults_then_round_trips() {
        let store = store().await;
        assert_eq!(store.get_config(1).await.unwrap(), SpamConfig::default());

        let config = SpamConfig {
            enabled: false,
            max_caps_ratio: 0.5,
            blocked_words: vec!["scam".to_string(), "free nitro".to_string()],
            ..Default::default()
        };
        store.save_config(1, config.clone()).await.unwrap();
        assert_eq!(store.get_config(1).await.unwrap(), config);
        assert_eq!(store.get_config(2).await.unwrap(), SpamConfig::default());
    }

    #[tokio::test]
    async fn strikes_count_up_per_guild_and_clear() {
        let store = store().await;
        assert_eq!(store.add_warning(1, 9, SpamType::Caps).await.unwrap(), 1);
        assert_eq!(store.add_warning(1, 9, SpamType::RateLimit).await.unwrap(), 2);
        assert_eq!(store.add_warning(1, 8, SpamType::Caps).await.unwrap(), 1);

        store.clear_warnings(1, 9).await.unwrap();
        assert_eq!(store.add_warning(1, 9, SpamType::Caps).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn recent_messages_respect_the_window() {
        let store = store().await;
        let now = Utc::now();
        for (hash, age) in [(1, 60), (2, 2), (3, 0)] {
            store
                .record_message(
                    1,
                    9,
                    MessageRecord {
                        content_hash: hash,
                        timestamp: now - chrono::Duration::seconds(age),
                    },
                )
                .await
                .unwrap();
        }

        let recent = store
            .get_recent_messages(1, 9, now - chrono::Duration::seconds(5))
            .await
            .unwrap();
        let hashes: Vec<u64> = recent.iter().map(|m| m.content_hash).collect();
        assert_eq!(hashes, vec![3, 2]);

        assert_eq!(
            store
                .cleanup_old_records(now - chrono::Duration::seconds(30))
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn rate_limit_blocks_expire() {
        let store = store().await;
        store
            .set_rate_limited(1, 9, Utc::now() + chrono::Duration::seconds(30))
            .await
            .unwrap();
        assert!(store.is_rate_limited(1, 9).await.unwrap());
        assert!(!store.is_rate_limited(2, 9).await.unwrap());

        store
            .set_rate_limited(1, 9, Utc::now() - chrono::Duration::seconds(1))
            .await
            .unwrap();
        assert!(!store.is_rate_limited(1, 9).await.unwrap());
    }
}
