// Active chest events. Participants live in a JSON array column so a chest is
// a single row; joins append to it with one UPDATE.

use crate::core::events::{ActiveEvent, EventError, EventStore, ParticipantUpdate};
use crate::infra::economy::credit_coins;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS active_events (
                message_id INTEGER PRIMARY KEY,
                channel_id INTEGER NOT NULL,
                reward INTEGER NOT NULL,
                required_users INTEGER NOT NULL,
                users_list TEXT NOT NULL DEFAULT '[]',
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn storage(e: sqlx::Error) -> EventError {
    EventError::StorageError(e.to_string())
}

fn row_to_event(row: &SqliteRow) -> Result<ActiveEvent, EventError> {
    let message_id = row.get::<i64, _>("message_id") as u64;
    let users_list: String = row.get("users_list");

    let participants: Vec<u64> =
        serde_json::from_str(&users_list).map_err(|e| EventError::CorruptParticipants {
            message_id,
            reason: e.to_string(),
        })?;

    let created_at = DateTime::<Utc>::from_timestamp(row.get("created_at"), 0)
        .unwrap_or_else(Utc::now);

    Ok(ActiveEvent {
        message_id,
        channel_id: row.get::<i64, _>("channel_id") as u64,
        reward: row.get("reward"),
        required_users: row.get::<i64, _>("required_users") as usize,
        participants,
        created_at,
    })
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn create_event(
        &self,
        message_id: u64,
        channel_id: u64,
        reward: i64,
        required_users: usize,
    ) -> Result<ActiveEvent, EventError> {
        let created_at = Utc::now();

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO active_events
                (message_id, channel_id, reward, required_users, users_list, created_at)
            VALUES (?, ?, ?, ?, '[]', ?)
            "#,
        )
        .bind(message_id as i64)
        .bind(channel_id as i64)
        .bind(reward)
        .bind(required_users as i64)
        .bind(created_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(ActiveEvent {
            message_id,
            channel_id,
            reward,
            required_users,
            participants: Vec::new(),
            created_at,
        })
    }

    async fn get_event(&self, message_id: u64) -> Result<Option<ActiveEvent>, EventError> {
        let row = sqlx::query("SELECT * FROM active_events WHERE message_id = ?")
            .bind(message_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.as_ref().map(row_to_event).transpose()
    }

    async fn add_participant(
        &self,
        message_id: u64,
        user_id: u64,
    ) -> Result<Option<ParticipantUpdate>, EventError> {
        // RETURNING hands back the list exactly as this append left it, so two
        // simultaneous presses never see the same length.
        let appended = sqlx::query(
            r#"
            UPDATE active_events
            SET users_list = json_insert(users_list, '$[#]', ?)
            WHERE message_id = ?
              AND json_array_length(users_list) < required_users
              AND NOT EXISTS (
                  SELECT 1 FROM json_each(active_events.users_list) WHERE value = ?
              )
            RETURNING *
            "#,
        )
        .bind(user_id as i64)
        .bind(message_id as i64)
        .bind(user_id as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        if let Some(row) = appended {
            return Ok(Some(ParticipantUpdate {
                event: row_to_event(&row)?,
                newly_added: true,
            }));
        }

        // The chest is gone, full, or already has this user.
        Ok(self
            .get_event(message_id)
            .await?
            .map(|event| ParticipantUpdate {
                event,
                newly_added: false,
            }))
    }

    async fn delete_event(&self, message_id: u64) -> Result<bool, EventError> {
        let result = sqlx::query("DELETE FROM active_events WHERE message_id = ?")
            .bind(message_id as i64)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        Ok(result.rows_affected() > 0)
    }

    async fn complete_event(&self, message_id: u64) -> Result<Option<ActiveEvent>, EventError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        // The DELETE claims the chest; a concurrent press finds no row.
        let row = sqlx::query("DELETE FROM active_events WHERE message_id = ? RETURNING *")
            .bind(message_id as i64)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage)?;

        let Some(row) = row else {
            tx.rollback().await.map_err(storage)?;
            return Ok(None);
        };
        let event = row_to_event(&row)?;

        // Any failure drops `tx`, which rolls the DELETE back too.
        for &user_id in &event.participants {
            credit_coins(&mut tx, user_id, event.reward)
                .await
                .map_err(storage)?;
        }

        tx.commit().await.map_err(storage)?;
        Ok(Some(event))
    }

    async fn delete_stale_events(&self, cutoff: DateTime<Utc>) -> Result<u64, EventError> {
        let result = sqlx::query("DELETE FROM active_events WHERE created_at < ?")
            .bind(cutoff.timestamp())
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::economy::UserStore;
    use crate::infra::database::memory_pool;
    use crate::infra::economy::SqliteUserStore;

    async fn store() -> SqliteEventStore {
        let store = SqliteEventStore::new(memory_pool().await);
        store.migrate().await.unwrap();
        store
    }

    async fn with_users() -> (SqliteEventStore, SqliteUserStore) {
        let pool = memory_pool().await;
        let events = SqliteEventStore::new(pool.clone());
        events.migrate().await.unwrap();
        let users = SqliteUserStore::new(pool);
        users.migrate().await.unwrap();
        (events, users)
    }

    #[tokio::test]
    async fn participants_are_appended_once() {
        let store = store().await;
        store.create_event(500, 7, 100, 3).await.unwrap();

        let first = store.add_participant(500, 11).await.unwrap().unwrap();
        assert!(first.newly_added);
        assert_eq!(first.event.participants, vec![11]);

        let repeat = store.add_participant(500, 11).await.unwrap().unwrap();
        assert!(!repeat.newly_added);
        assert_eq!(repeat.event.participants, vec![11]);

        let second = store.add_participant(500, 12).await.unwrap().unwrap();
        assert_eq!(second.event.participants, vec![11, 12]);
        assert_eq!(second.event.required_users, 3);
        assert_eq!(second.event.reward, 100);
    }

    #[tokio::test]
    async fn full_chest_takes_no_more_participants() {
        let store = store().await;
        store.create_event(600, 7, 100, 2).await.unwrap();
        store.add_participant(600, 1).await.unwrap();
        store.add_participant(600, 2).await.unwrap();

        let late = store.add_participant(600, 3).await.unwrap().unwrap();
        assert!(!late.newly_added);
        assert_eq!(late.event.participants, vec![1, 2]);
    }

    #[tokio::test]
    async fn completion_pays_everyone_and_removes_the_row() {
        let (events, users) = with_users().await;
        events.create_event(700, 7, 100, 2).await.unwrap();
        events.add_participant(700, 10).await.unwrap();
        events.add_participant(700, 20).await.unwrap();
        users.add_coins(10, 5).await.unwrap();

        let done = events.complete_event(700).await.unwrap().unwrap();
        assert_eq!(done.participants, vec![10, 20]);
        assert_eq!(users.get_user(10).await.unwrap().coins, 105);
        assert_eq!(users.get_user(20).await.unwrap().coins, 100);

        // Second claim finds nothing and pays nothing.
        assert!(events.complete_event(700).await.unwrap().is_none());
        assert!(events.get_event(700).await.unwrap().is_none());
        assert_eq!(users.get_user(20).await.unwrap().coins, 100);
    }

    #[tokio::test]
    async fn failed_credit_rolls_back_the_whole_completion() {
        let (events, users) = with_users().await;
        events.create_event(800, 7, 100, 2).await.unwrap();
        events.add_participant(800, 10).await.unwrap();
        events.add_participant(800, 20).await.unwrap();

        // The second participant's row can't be written.
        sqlx::query(
            r#"
            CREATE TRIGGER reject_user_20 BEFORE INSERT ON users
            WHEN NEW.user_id = 20
            BEGIN SELECT RAISE(ABORT, 'write rejected'); END
            "#,
        )
        .execute(&events.pool)
        .await
        .unwrap();

        assert!(events.complete_event(800).await.is_err());
        let kept = events.get_event(800).await.unwrap().unwrap();
        assert_eq!(kept.participants, vec![10, 20]);
        assert_eq!(users.get_user(10).await.unwrap().coins, 0);

        sqlx::query("DROP TRIGGER reject_user_20")
            .execute(&events.pool)
            .await
            .unwrap();
        assert!(events.complete_event(800).await.unwrap().is_some());
        assert_eq!(users.get_user(10).await.unwrap().coins, 100);
        assert_eq!(users.get_user(20).await.unwrap().coins, 100);
    }

    #[tokio::test]
    async fn missing_event_yields_none() {
        let store = store().await;
        assert!(store.add_participant(1, 2).await.unwrap().is_none());
        assert!(store.get_event(1).await.unwrap().is_none());
        assert!(!store.delete_event(1).await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_list_is_reported() {
        let store = store().await;
        store.create_event(9, 1, 50, 2).await.unwrap();
        sqlx::query("UPDATE active_events SET users_list = 'oops' WHERE message_id = 9")
            .execute(&store.pool)
            .await
            .unwrap();

        let err = store.get_event(9).await.unwrap_err();
        assert!(matches!(
            err,
            EventError::CorruptParticipants { message_id: 9, .. }
        ));
    }

    #[tokio::test]
    async fn only_old_events_are_swept() {
        let store = store().await;
        store.create_event(1, 1, 50, 2).await.unwrap();
        store.create_event(2, 1, 50, 2).await.unwrap();
        sqlx::query("UPDATE active_events SET created_at = created_at - 200000 WHERE message_id = 1")
            .execute(&store.pool)
            .await
            .unwrap();

        let cutoff = Utc::now() - chrono::Duration::hours(24);
        assert_eq!(store.delete_stale_events(cutoff).await.unwrap(), 1);
        assert!(store.get_event(1).await.unwrap().is_none());
        assert!(store.get_event(2).await.unwrap().is_some());
    }
}
