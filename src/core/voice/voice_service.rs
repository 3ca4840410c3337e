// Temporary voice rooms - ownership records and the rules around them.
//
// Joining the trigger channel gets a member their own room. The room is
// deleted once it empties. Only the owner (or an admin) may lock, rename or
// limit it, and a room can be claimed only while its owner is away.

use async_trait::async_trait;
use thiserror::Error;

pub const ROOM_PREFIX: &str = "🔊┃";
pub const MAX_USER_LIMIT: u32 = 99;
pub const MAX_NAME_LEN: usize = 100;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// Where rooms are created, as configured for a guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceLayout {
    pub trigger_channel_id: u64,
    pub category_id: u64,
}

/// What to do when a member enters the trigger channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerAction {
    /// They already own a room with people in it.
    MoveToExisting { channel_id: u64 },
    CreateRoom { name: String },
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("This isn't a private room")]
    NotARoom,

    #[error("Only the room owner can do that")]
    NotOwner,

    #[error("You already own this room")]
    AlreadyOwner,

    #[error("The owner is still in the room")]
    OwnerPresent,

    #[error("User limit must be between 0 and 99, got {0}")]
    LimitOutOfRange(u32),

    #[error("Room name must be 1 to 100 characters")]
    InvalidName,
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

#[async_trait]
pub trait VoiceStore: Send + Sync {
    /// Record (or replace) the owner of a room.
    async fn add_voice_channel(&self, channel_id: u64, owner_id: u64) -> Result<(), VoiceError>;

    async fn get_voice_owner(&self, channel_id: u64) -> Result<Option<u64>, VoiceError>;

    async fn get_user_voice_channels(&self, owner_id: u64) -> Result<Vec<u64>, VoiceError>;

    /// Returns false if the channel wasn't tracked.
    async fn remove_voice_channel(&self, channel_id: u64) -> Result<bool, VoiceError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct VoiceService<S: VoiceStore> {
    store: S,
}

impl<S: VoiceStore> VoiceService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Decide what happens when `user_id` joins the trigger channel.
    /// `is_occupied` reports whether a channel currently has members.
    pub async fn on_trigger_join(
        &self,
        user_id: u64,
        display_name: &str,
        is_occupied: impl Fn(u64) -> bool + Send,
    ) -> Result<TriggerAction, VoiceError> {
        let owned = self.store.get_user_voice_channels(user_id).await?;
        if let Some(channel_id) = owned.into_iter().find(|&id| is_occupied(id)) {
            return Ok(TriggerAction::MoveToExisting { channel_id });
        }
        Ok(TriggerAction::CreateRoom {
            name: room_name(display_name),
        })
    }

    pub async fn register_room(&self, channel_id: u64, owner_id: u64) -> Result<(), VoiceError> {
        self.store.add_voice_channel(channel_id, owner_id).await?;
        tracing::info!(channel_id, owner_id, "Voice room created");
        Ok(())
    }

    pub async fn owner_of(&self, channel_id: u64) -> Result<Option<u64>, VoiceError> {
        self.store.get_voice_owner(channel_id).await
    }

    /// Forget a room that has been deleted.
    pub async fn release_room(&self, channel_id: u64) -> Result<bool, VoiceError> {
        let removed = self.store.remove_voice_channel(channel_id).await?;
        if removed {
            tracing::info!(channel_id, "Voice room released");
        }
        Ok(removed)
    }

    /// Check that `user_id` may manage `channel_id`. Returns the owner.
    pub async fn authorize(
        &self,
        channel_id: u64,
        user_id: u64,
        is_admin: bool,
    ) -> Result<u64, VoiceError> {
        let owner = self
            .store
            .get_voice_owner(channel_id)
            .await?
            .ok_or(VoiceError::NotARoom)?;
        if owner != user_id && !is_admin {
            return Err(VoiceError::NotOwner);
        }
        Ok(owner)
    }

    /// Take over a room whose owner has left it.
    pub async fn claim(
        &self,
        channel_id: u64,
        user_id: u64,
        owner_present: bool,
    ) -> Result<u64, VoiceError> {
        let previous = self
            .store
            .get_voice_owner(channel_id)
            .await?
            .ok_or(VoiceError::NotARoom)?;
        if previous == user_id {
            return Err(VoiceError::AlreadyOwner);
        }
        if owner_present {
            return Err(VoiceError::OwnerPresent);
        }
        self.store.add_voice_channel(channel_id, user_id).await?;
        tracing::info!(channel_id, previous, new_owner = user_id, "Voice room claimed");
        Ok(previous)
    }
}

/// Whether leaving `channel_id` could leave a room to clean up.
pub fn is_managed_room(layout: &VoiceLayout, channel_id: u64, parent_id: Option<u64>) -> bool {
    channel_id != layout.trigger_channel_id && parent_id == Some(layout.category_id)
}

pub fn room_name(display_name: &str) -> String {
    let budget = MAX_NAME_LEN - ROOM_PREFIX.chars().count();
    let name: String = display_name.chars().take(budget).collect();
    format!("{ROOM_PREFIX}{name}")
}

pub fn validate_limit(limit: u32) -> Result<u32, VoiceError> {
    if limit > MAX_USER_LIMIT {
        return Err(VoiceError::LimitOutOfRange(limit));
    }
    Ok(limit)
}

pub fn validate_name(name: &str) -> Result<&str, VoiceError> {
    let name = name.trim();
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(VoiceError::InvalidName);
    }
    Ok(name)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;

    #[derive(Default)]
    struct MockVoiceStore {
        rooms: DashMap<u64, u64>,
    }

    #[async_trait]
    impl VoiceStore for MockVoiceStore {
        async fn add_voice_channel(&self, channel_id: u64, owner_id: u64) -> Result<(), VoiceError> {
            self.rooms.insert(channel_id, owner_id);
            Ok(())
        }

        async fn get_voice_owner(&self, channel_id: u64) -> Result<Option<u64>, VoiceError> {
            Ok(self.rooms.get(&channel_id).map(|o| *o))
        }

        async fn get_user_voice_channels(&self, owner_id: u64) -> Result<Vec<u64>, VoiceError> {
            Ok(self
                .rooms
                .iter()
                .filter(|r| *r.value() == owner_id)
                .map(|r| *r.key())
                .collect())
        }

        async fn remove_voice_channel(&self, channel_id: u64) -> Result<bool, VoiceError> {
            Ok(self.rooms.remove(&channel_id).is_some())
        }
    }

    #[tokio::test]
    async fn trigger_join_reuses_a_busy_room() {
        let service = VoiceService::new(MockVoiceStore::default());

        let action = service.on_trigger_join(1, "Alex", |_| false).await.unwrap();
        assert_eq!(
            action,
            TriggerAction::CreateRoom {
                name: "🔊┃Alex".to_string()
            }
        );

        service.register_room(500, 1).await.unwrap();
        let action = service
            .on_trigger_join(1, "Alex", |id| id == 500)
            .await
            .unwrap();
        assert_eq!(action, TriggerAction::MoveToExisting { channel_id: 500 });
    }

    #[tokio::test]
    async fn only_owner_or_admin_may_manage() {
        let service = VoiceService::new(MockVoiceStore::default());
        service.register_room(500, 1).await.unwrap();

        assert_eq!(service.authorize(500, 1, false).await.unwrap(), 1);
        assert_eq!(service.authorize(500, 2, true).await.unwrap(), 1);
        assert!(matches!(
            service.authorize(500, 2, false).await,
            Err(VoiceError::NotOwner)
        ));
        assert!(matches!(
            service.authorize(501, 1, true).await,
            Err(VoiceError::NotARoom)
        ));
    }

    #[tokio::test]
    async fn claim_requires_absent_owner() {
        let service = VoiceService::new(MockVoiceStore::default());
        service.register_room(500, 1).await.unwrap();

        assert!(matches!(
            service.claim(500, 2, true).await,
            Err(VoiceError::OwnerPresent)
        ));
        assert!(matches!(
            service.claim(500, 1, false).await,
            Err(VoiceError::AlreadyOwner)
        ));
        assert_eq!(service.claim(500, 2, false).await.unwrap(), 1);
        assert_eq!(service.owner_of(500).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn released_rooms_are_forgotten() {
        let service = VoiceService::new(MockVoiceStore::default());
        service.register_room(500, 1).await.unwrap();

        assert!(service.release_room(500).await.unwrap());
        assert!(!service.release_room(500).await.unwrap());
        assert_eq!(service.owner_of(500).await.unwrap(), None);
    }

    #[test]
    fn managed_rooms_live_in_the_category_but_exclude_the_trigger() {
        let layout = VoiceLayout {
            trigger_channel_id: 10,
            category_id: 20,
        };
        assert!(is_managed_room(&layout, 11, Some(20)));
        assert!(!is_managed_room(&layout, 10, Some(20)));
        assert!(!is_managed_room(&layout, 11, Some(21)));
        assert!(!is_managed_room(&layout, 11, None));
    }

    #[test]
    fn limits_and_names_are_checked() {
        assert!(validate_limit(0).is_ok());
        assert!(validate_limit(99).is_ok());
        assert!(validate_limit(100).is_err());
        assert_eq!(validate_name("  Squad  ").unwrap(), "Squad");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(101)).is_err());
        assert_eq!(room_name(&"y".repeat(200)).chars().count(), MAX_NAME_LEN);
    }
}
