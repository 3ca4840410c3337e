// Economy infrastructure - SQLite storage for balances, levels and items

mod sqlite_inventory_store;
mod sqlite_user_store;

pub use sqlite_inventory_store::SqliteInventoryStore;
pub use sqlite_user_store::SqliteUserStore;
pub(crate) use sqlite_user_store::credit_coins;
