// Economy module - coins, shop items and inventories

mod economy_service;
pub mod inventory_service;
pub mod item_definitions;

pub use economy_service::{
    EconomyError, EconomyService, UserRecord, UserStore, UserUpdate, XpChange,
};
pub use inventory_service::{InventoryEntry, InventoryService, InventoryStore};
pub use item_definitions::{ItemId, ShopItem};

#[cfg(test)]
pub(crate) use economy_service::tests::InMemoryUserStore;
