// Shop item definitions
//
// Every purchasable item lives here. Inventory rows store `ItemId::as_str`,
// so renaming a variant's string breaks existing inventories.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Unique identifier for shop items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemId {
    RoleColor,
    XpBoost,
    CoinsBoost,
    CustomVoice,
}

impl ItemId {
    /// Convert item ID to string representation for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemId::RoleColor => "role_color",
            ItemId::XpBoost => "xp_boost",
            ItemId::CoinsBoost => "coins_boost",
            ItemId::CustomVoice => "custom_voice",
        }
    }

    /// Get all available item IDs, in shop order.
    pub fn all() -> Vec<ItemId> {
        vec![
            ItemId::RoleColor,
            ItemId::XpBoost,
            ItemId::CoinsBoost,
            ItemId::CustomVoice,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No shop item is stored as `{0}`")]
pub struct UnknownItemKey(pub String);

impl FromStr for ItemId {
    type Err = UnknownItemKey;

    /// Parse a storage key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "role_color" => Ok(ItemId::RoleColor),
            "xp_boost" => Ok(ItemId::XpBoost),
            "coins_boost" => Ok(ItemId::CoinsBoost),
            "custom_voice" => Ok(ItemId::CustomVoice),
            _ => Err(UnknownItemKey(s.to_string())),
        }
    }
}

/// Shop item with metadata.
#[derive(Debug, Clone)]
pub struct ShopItem {
    pub id: ItemId,
    pub name: &'static str,
    pub description: &'static str,
    pub price: i64,
    pub emoji: &'static str,
}

impl ShopItem {
    pub fn get(id: &ItemId) -> Self {
        let (name, description, price, emoji) = match id {
            ItemId::RoleColor => ("Role Color", "A unique coloured role for 30 days", 1000, "🎨"),
            ItemId::XpBoost => ("XP Boost", "Doubles XP gain for 7 days", 500, "⚡"),
            ItemId::CoinsBoost => ("Coin Boost", "Doubles coin gain for 7 days", 500, "💰"),
            ItemId::CustomVoice => ("VIP Voice", "A personal voice channel you can customise", 2000, "🔊"),
        };
        ShopItem {
            id: *id,
            name,
            description,
            price,
            emoji,
        }
    }

    /// Look up by storage key or by display name, case-insensitively.
    pub fn find(query: &str) -> Option<Self> {
        let query = query.trim().to_lowercase();
        query
            .parse::<ItemId>()
            .ok()
            .map(|id| ShopItem::get(&id))
            .or_else(|| {
                ShopItem::all()
                    .into_iter()
                    .find(|item| item.name.to_lowercase() == query)
            })
    }

    pub fn all() -> Vec<ShopItem> {
        ItemId::all().iter().map(ShopItem::get).collect()
    }
}
