// Inventory system for managing user items
//
// Items are stored as counts per (user, item). A row only exists while the
// count is at least one.

use super::item_definitions::ItemId;
use super::EconomyError;
use async_trait::async_trait;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// One stack of items in a user's inventory.
///
/// `item_key` is the raw stored key; `item_id` is `None` when the key no
/// longer matches a shop item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    pub item_key: String,
    pub item_id: Option<ItemId>,
    pub count: i64,
}

impl InventoryEntry {
    pub fn new(item_key: impl Into<String>, count: i64) -> Self {
        let item_key = item_key.into();
        Self {
            item_id: item_key.parse().ok(),
            item_key,
            count,
        }
    }
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Insert the stack or increase its count.
    async fn add_item(&self, user_id: u64, item_id: ItemId, quantity: i64)
        -> Result<(), EconomyError>;

    /// Decrease a stack, deleting it at zero.
    /// Returns false (and changes nothing) if the user holds fewer than `quantity`.
    async fn remove_item(
        &self,
        user_id: u64,
        item_id: ItemId,
        quantity: i64,
    ) -> Result<bool, EconomyError>;

    async fn get_inventory(&self, user_id: u64) -> Result<Vec<InventoryEntry>, EconomyError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct InventoryService<S: InventoryStore> {
    store: S,
}

impl<S: InventoryStore> InventoryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn add_item(
        &self,
        user_id: u64,
        item_id: ItemId,
        quantity: i64,
    ) -> Result<(), EconomyError> {
        if quantity <= 0 {
            return Err(EconomyError::InvalidAmount(quantity));
        }
        self.store.add_item(user_id, item_id, quantity).await
    }

    /// Consume items. Returns true if they were removed.
    pub async fn consume_item(
        &self,
        user_id: u64,
        item_id: ItemId,
        quantity: i64,
    ) -> Result<bool, EconomyError> {
        if quantity <= 0 {
            return Err(EconomyError::InvalidAmount(quantity));
        }
        self.store.remove_item(user_id, item_id, quantity).await
    }

    pub async fn item_count(&self, user_id: u64, item_id: ItemId) -> Result<i64, EconomyError> {
        let inventory = self.store.get_inventory(user_id).await?;
        Ok(inventory
            .iter()
            .find(|entry| entry.item_id == Some(item_id))
            .map(|entry| entry.count)
            .unwrap_or(0))
    }

    pub async fn get_inventory(&self, user_id: u64) -> Result<Vec<InventoryEntry>, EconomyError> {
        self.store.get_inventory(user_id).await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct InMemoryInventoryStore {
        items: Arc<Mutex<BTreeMap<(u64, String), i64>>>,
    }

    #[async_trait]
    impl InventoryStore for InMemoryInventoryStore {
        async fn add_item(
            &self,
            user_id: u64,
            item_id: ItemId,
            quantity: i64,
        ) -> Result<(), EconomyError> {
            let mut items = self.items.lock().unwrap();
            *items
                .entry((user_id, item_id.as_str().to_string()))
                .or_insert(0) += quantity;
            Ok(())
        }

        async fn remove_item(
            &self,
            user_id: u64,
            item_id: ItemId,
            quantity: i64,
        ) -> Result<bool, EconomyError> {
            let mut items = self.items.lock().unwrap();
            let key = (user_id, item_id.as_str().to_string());
            let held = items.get(&key).copied().unwrap_or(0);
            if held < quantity {
                return Ok(false);
            }
            if held == quantity {
                items.remove(&key);
            } else {
                items.insert(key, held - quantity);
            }
            Ok(true)
        }

        async fn get_inventory(&self, user_id: u64) -> Result<Vec<InventoryEntry>, EconomyError> {
            let items = self.items.lock().unwrap();
            Ok(items
                .iter()
                .filter(|((uid, _), _)| *uid == user_id)
                .map(|((_, key), count)| InventoryEntry::new(key.clone(), *count))
                .collect())
        }
    }

    #[tokio::test]
    async fn stacks_accumulate() {
        let service = InventoryService::new(InMemoryInventoryStore::default());

        service.add_item(1, ItemId::XpBoost, 1).await.unwrap();
        service.add_item(1, ItemId::XpBoost, 2).await.unwrap();

        assert_eq!(service.item_count(1, ItemId::XpBoost).await.unwrap(), 3);
        assert_eq!(service.item_count(2, ItemId::XpBoost).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn consuming_more_than_held_changes_nothing() {
        let service = InventoryService::new(InMemoryInventoryStore::default());
        service.add_item(1, ItemId::RoleColor, 2).await.unwrap();

        assert!(!service.consume_item(1, ItemId::RoleColor, 3).await.unwrap());
        assert_eq!(service.item_count(1, ItemId::RoleColor).await.unwrap(), 2);

        assert!(service.consume_item(1, ItemId::RoleColor, 2).await.unwrap());
        assert!(service.get_inventory(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_positive_quantities_are_rejected() {
        let service = InventoryService::new(InMemoryInventoryStore::default());
        assert!(matches!(
            service.add_item(1, ItemId::CoinsBoost, 0).await,
            Err(EconomyError::InvalidAmount(0))
        ));
    }

    #[test]
    fn unknown_keys_survive_parsing() {
        let entry = InventoryEntry::new("retired_item", 4);
        assert_eq!(entry.item_id, None);
        assert_eq!(entry.count, 4);
    }
}
