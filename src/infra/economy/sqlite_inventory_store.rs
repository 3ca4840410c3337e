// Inventory stacks, one row per (user, item).

use crate::core::economy::{EconomyError, InventoryEntry, InventoryStore, ItemId};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

pub struct SqliteInventoryStore {
    pool: SqlitePool,
}

impl SqliteInventoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS inventory (
                user_id INTEGER NOT NULL,
                item_id TEXT NOT NULL,
                count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, item_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl InventoryStore for SqliteInventoryStore {
    async fn add_item(
        &self,
        user_id: u64,
        item_id: ItemId,
        quantity: i64,
    ) -> Result<(), EconomyError> {
        sqlx::query(
            r#"
            INSERT INTO inventory (user_id, item_id, count) VALUES (?, ?, ?)
            ON CONFLICT(user_id, item_id) DO UPDATE SET count = count + excluded.count
            "#,
        )
        .bind(user_id as i64)
        .bind(item_id.as_str())
        .bind(quantity)
        .execute(&self.pool)
        .await
        .map_err(|e| EconomyError::StorageError(e.to_string()))?;

        Ok(())
    }

    async fn remove_item(
        &self,
        user_id: u64,
        item_id: ItemId,
        quantity: i64,
    ) -> Result<bool, EconomyError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| EconomyError::StorageError(e.to_string()))?;

        let updated = sqlx::query(
            r#"
            UPDATE inventory SET count = count - ?
            WHERE user_id = ? AND item_id = ? AND count >= ?
            RETURNING count
            "#,
        )
        .bind(quantity)
        .bind(user_id as i64)
        .bind(item_id.as_str())
        .bind(quantity)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| EconomyError::StorageError(e.to_string()))?;

        let Some(row) = updated else {
            tx.rollback()
                .await
                .map_err(|e| EconomyError::StorageError(e.to_string()))?;
            return Ok(false);
        };

        if row.get::<i64, _>("count") <= 0 {
            sqlx::query("DELETE FROM inventory WHERE user_id = ? AND item_id = ?")
                .bind(user_id as i64)
                .bind(item_id.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| EconomyError::StorageError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| EconomyError::StorageError(e.to_string()))?;
        Ok(true)
    }

    async fn get_inventory(&self, user_id: u64) -> Result<Vec<InventoryEntry>, EconomyError> {
        let rows = sqlx::query(
            r#"
            SELECT item_id, count FROM inventory
            WHERE user_id = ? AND count > 0
            ORDER BY item_id
            "#,
        )
        .bind(user_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EconomyError::StorageError(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| InventoryEntry::new(row.get::<String, _>("item_id"), row.get("count")))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::database::memory_pool;

    async fn store() -> SqliteInventoryStore {
        let store = SqliteInventoryStore::new(memory_pool().await);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn stacks_merge_and_drain() {
        let store = store().await;
        store.add_item(1, ItemId::XpBoost, 1).await.unwrap();
        store.add_item(1, ItemId::XpBoost, 2).await.unwrap();

        let inventory = store.get_inventory(1).await.unwrap();
        assert_eq!(inventory, vec![InventoryEntry::new("xp_boost", 3)]);

        assert!(store.remove_item(1, ItemId::XpBoost, 3).await.unwrap());
        assert!(store.get_inventory(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn over_removal_is_refused() {
        let store = store().await;
        store.add_item(1, ItemId::RoleColor, 1).await.unwrap();

        assert!(!store.remove_item(1, ItemId::RoleColor, 2).await.unwrap());
        assert!(!store.remove_item(1, ItemId::CustomVoice, 1).await.unwrap());
        assert_eq!(store.get_inventory(1).await.unwrap()[0].count, 1);
    }

    #[tokio::test]
    async fn unknown_keys_are_still_listed() {
        let store = store().await;
        sqlx::query("INSERT INTO inventory (user_id, item_id, count) VALUES (1, 'retired_item', 2)")
            .execute(&store.pool)
            .await
            .unwrap();

        let inventory = store.get_inventory(1).await.unwrap();
        assert_eq!(inventory[0].item_key, "retired_item");
        assert_eq!(inventory[0].item_id, None);
    }
}
