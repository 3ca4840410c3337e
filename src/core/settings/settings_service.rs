// Server settings - per-guild key/value configuration with an in-memory cache.
//
// Reads never touch storage. The cache is filled by `reload()`, which runs
// once at startup and again whenever an admin asks for it; writes go to
// storage first and then update the cache. Reloads and writes are serialized
// so a reload can't resurrect a snapshot taken before a write. Reading before
// the first reload is an error rather than an empty answer.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::Mutex;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// Every setting the bot understands. Values are channel or category ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    TicketCategory,
    VoiceCategory,
    VoiceTrigger,
    LogChannel,
    WelcomeChannel,
    EventsChannel,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 6] = [
        ConfigKey::TicketCategory,
        ConfigKey::VoiceCategory,
        ConfigKey::VoiceTrigger,
        ConfigKey::LogChannel,
        ConfigKey::WelcomeChannel,
        ConfigKey::EventsChannel,
    ];

    /// Storage key.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::TicketCategory => "ticket_category_id",
            ConfigKey::VoiceCategory => "voice_category_id",
            ConfigKey::VoiceTrigger => "voice_trigger_id",
            ConfigKey::LogChannel => "log_channel_id",
            ConfigKey::WelcomeChannel => "welcome_channel_id",
            ConfigKey::EventsChannel => "events_channel_id",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfigKey::TicketCategory => "Ticket category",
            ConfigKey::VoiceCategory => "Voice category",
            ConfigKey::VoiceTrigger => "Create-a-room channel",
            ConfigKey::LogChannel => "Log channel",
            ConfigKey::WelcomeChannel => "Welcome channel",
            ConfigKey::EventsChannel => "Events channel",
        }
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub guild_id: u64,
    pub key: String,
    pub value: String,
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Server settings have not been loaded yet")]
    NotLoaded,

    #[error("Setting {key} holds {value:?}, which is not a valid id")]
    InvalidValue { key: ConfigKey, value: String },

    #[error("Unknown setting {0:?}")]
    UnknownKey(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<ConfigEntry>, ConfigError>;

    /// Insert or replace.
    async fn set(&self, guild_id: u64, key: &str, value: &str) -> Result<(), ConfigError>;

    /// Returns false if the key wasn't set.
    async fn delete(&self, guild_id: u64, key: &str) -> Result<bool, ConfigError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ServerConfigService<S: ConfigStore> {
    store: S,
    cache: DashMap<(u64, String), String>,
    loaded: AtomicBool,
    // Held by reload for the whole load-and-swap, and by every write.
    writes: Mutex<()>,
}

impl<S: ConfigStore> ServerConfigService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: DashMap::new(),
            loaded: AtomicBool::new(false),
            writes: Mutex::new(()),
        }
    }

    /// Replace the cache with what storage holds. Returns the entry count.
    ///
    /// Rows with keys this build doesn't know are skipped.
    pub async fn reload(&self) -> Result<usize, ConfigError> {
        let _writes = self.writes.lock().await;
        let entries: Vec<ConfigEntry> = self
            .store
            .load_all()
            .await?
            .into_iter()
            .filter(|entry| match entry.key.parse::<ConfigKey>() {
                Ok(_) => true,
                Err(e) => {
                    tracing::warn!(guild_id = entry.guild_id, "Skipping stored setting: {}", e);
                    false
                }
            })
            .collect();

        // Overwrite in place rather than clear-then-fill so concurrent readers
        // never observe an empty cache.
        let fresh: HashSet<(u64, String)> = entries
            .iter()
            .map(|e| (e.guild_id, e.key.clone()))
            .collect();
        self.cache.retain(|k, _| fresh.contains(k));
        for entry in &entries {
            self.cache
                .insert((entry.guild_id, entry.key.clone()), entry.value.clone());
        }

        self.loaded.store(true, Ordering::Release);
        tracing::info!(entries = entries.len(), "Server settings loaded");
        Ok(entries.len())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    fn ensure_loaded(&self) -> Result<(), ConfigError> {
        if self.is_loaded() {
            Ok(())
        } else {
            Err(ConfigError::NotLoaded)
        }
    }

    /// Raw cached value.
    pub fn get(&self, guild_id: u64, key: ConfigKey) -> Result<Option<String>, ConfigError> {
        self.ensure_loaded()?;
        Ok(self
            .cache
            .get(&(guild_id, key.as_str().to_string()))
            .map(|v| v.clone()))
    }

    /// Cached value parsed as a Discord id.
    pub fn get_id(&self, guild_id: u64, key: ConfigKey) -> Result<Option<u64>, ConfigError> {
        match self.get(guild_id, key)? {
            None => Ok(None),
            Some(value) => value
                .parse::<u64>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue { key, value }),
        }
    }

    pub async fn set(&self, guild_id: u64, key: ConfigKey, value: &str) -> Result<(), ConfigError> {
        let _writes = self.writes.lock().await;
        self.store.set(guild_id, key.as_str(), value).await?;
        self.cache
            .insert((guild_id, key.as_str().to_string()), value.to_string());
        tracing::info!(guild_id, key = key.as_str(), value, "Setting updated");
        Ok(())
    }

    pub async fn set_id(&self, guild_id: u64, key: ConfigKey, id: u64) -> Result<(), ConfigError> {
        self.set(guild_id, key, &id.to_string()).await
    }

    pub async fn delete(&self, guild_id: u64, key: ConfigKey) -> Result<bool, ConfigError> {
        let _writes = self.writes.lock().await;
        self.delete_locked(guild_id, key).await
    }

    async fn delete_locked(&self, guild_id: u64, key: ConfigKey) -> Result<bool, ConfigError> {
        let existed = self.store.delete(guild_id, key.as_str()).await?;
        self.cache.remove(&(guild_id, key.as_str().to_string()));
        Ok(existed)
    }

    /// Remove every known setting for a guild. Returns how many were set.
    pub async fn reset(&self, guild_id: u64) -> Result<usize, ConfigError> {
        let _writes = self.writes.lock().await;
        let mut removed = 0;
        for key in ConfigKey::ALL {
            if self.delete_locked(guild_id, key).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// All known keys with their parsed values, for display.
    pub fn snapshot(&self, guild_id: u64) -> Result<Vec<(ConfigKey, Option<u64>)>, ConfigError> {
        ConfigKey::ALL
            .into_iter()
            .map(|key| Ok((key, self.get_id(guild_id, key)?)))
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct MockConfigStore {
        rows: Arc<DashMap<(u64, String), String>>,
    }

    #[async_trait]
    impl ConfigStore for MockConfigStore {
        async fn load_all(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
            Ok(self
                .rows
                .iter()
                .map(|r| ConfigEntry {
                    guild_id: r.key().0,
                    key: r.key().1.clone(),
                    value: r.value().clone(),
                })
                .collect())
        }

        async fn set(&self, guild_id: u64, key: &str, value: &str) -> Result<(), ConfigError> {
            self.rows
                .insert((guild_id, key.to_string()), value.to_string());
            Ok(())
        }

        async fn delete(&self, guild_id: u64, key: &str) -> Result<bool, ConfigError> {
            Ok(self.rows.remove(&(guild_id, key.to_string())).is_some())
        }
    }

    #[tokio::test]
    async fn reads_before_reload_fail() {
        let service = ServerConfigService::new(MockConfigStore::default());
        assert!(matches!(
            service.get(1, ConfigKey::LogChannel),
            Err(ConfigError::NotLoaded)
        ));

        service.reload().await.unwrap();
        assert_eq!(service.get(1, ConfigKey::LogChannel).unwrap(), None);
    }

    #[tokio::test]
    async fn writes_are_visible_immediately() {
        let service = ServerConfigService::new(MockConfigStore::default());
        service.reload().await.unwrap();

        service.set_id(1, ConfigKey::WelcomeChannel, 555).await.unwrap();
        assert_eq!(service.get_id(1, ConfigKey::WelcomeChannel).unwrap(), Some(555));
        assert_eq!(service.get_id(2, ConfigKey::WelcomeChannel).unwrap(), None);

        assert!(service.delete(1, ConfigKey::WelcomeChannel).await.unwrap());
        assert_eq!(service.get_id(1, ConfigKey::WelcomeChannel).unwrap(), None);
    }

    #[tokio::test]
    async fn reload_picks_up_external_changes() {
        let store = MockConfigStore::default();
        let service = ServerConfigService::new(store.clone());
        service.set_id(1, ConfigKey::LogChannel, 10).await.unwrap();
        service.reload().await.unwrap();

        // Another process edits the database behind our back.
        store.rows.remove(&(1, "log_channel_id".to_string()));
        store
            .rows
            .insert((1, "voice_trigger_id".to_string()), "77".to_string());

        assert_eq!(service.get_id(1, ConfigKey::LogChannel).unwrap(), Some(10));
        assert_eq!(service.reload().await.unwrap(), 1);
        assert_eq!(service.get_id(1, ConfigKey::LogChannel).unwrap(), None);
        assert_eq!(service.get_id(1, ConfigKey::VoiceTrigger).unwrap(), Some(77));
    }

    #[tokio::test]
    async fn garbage_values_are_reported() {
        let store = MockConfigStore::default();
        store
            .rows
            .insert((1, "events_channel_id".to_string()), "general".to_string());
        let service = ServerConfigService::new(store);
        service.reload().await.unwrap();

        assert!(matches!(
            service.get_id(1, ConfigKey::EventsChannel),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[tokio::test]
    async fn reset_clears_every_key() {
        let service = ServerConfigService::new(MockConfigStore::default());
        service.reload().await.unwrap();
        service.set_id(1, ConfigKey::LogChannel, 1).await.unwrap();
        service.set_id(1, ConfigKey::TicketCategory, 2).await.unwrap();

        assert_eq!(service.reset(1).await.unwrap(), 2);
        assert!(service
            .snapshot(1)
            .unwrap()
            .iter()
            .all(|(_, value)| value.is_none()));
    }

    #[test]
    fn keys_round_trip() {
        for key in ConfigKey::ALL {
            assert_eq!(key.as_str().parse::<ConfigKey>().unwrap(), key);
        }
        assert!(matches!(
            "prefix".parse::<ConfigKey>(),
            Err(ConfigError::UnknownKey(k)) if k == "prefix"
        ));
    }

    /// `load_all` reports when it has read storage, then waits to be released.
    #[derive(Clone, Default)]
    struct GatedStore {
        inner: MockConfigStore,
        entered: Arc<tokio::sync::Notify>,
        release: Arc<tokio::sync::Notify>,
    }

    #[async_trait]
    impl ConfigStore for GatedStore {
        async fn load_all(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
            let rows = self.inner.load_all().await?;
            self.entered.notify_one();
            self.release.notified().await;
            Ok(rows)
        }

        async fn set(&self, guild_id: u64, key: &str, value: &str) -> Result<(), ConfigError> {
            self.inner.set(guild_id, key, value).await
        }

        async fn delete(&self, guild_id: u64, key: &str) -> Result<bool, ConfigError> {
            self.inner.delete(guild_id, key).await
        }
    }

    #[tokio::test]
    async fn write_during_reload_is_not_lost() {
        let store = GatedStore::default();
        let service = Arc::new(ServerConfigService::new(store.clone()));

        let reloading = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.reload().await }
        });
        store.entered.notified().await;

        let writing = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.set_id(1, ConfigKey::LogChannel, 42).await }
        });
        tokio::task::yield_now().await;
        // The write waits for the reload instead of racing its snapshot.
        assert!(store.inner.rows.is_empty());

        store.release.notify_one();
        reloading.await.unwrap().unwrap();
        writing.await.unwrap().unwrap();

        assert_eq!(service.get_id(1, ConfigKey::LogChannel).unwrap(), Some(42));
    }

    #[tokio::test]
    async fn unknown_stored_keys_are_skipped() {
        let store = MockConfigStore::default();
        store
            .rows
            .insert((1, "log_channel_id".to_string()), "5".to_string());
        store
            .rows
            .insert((1, "legacy_prefix".to_string()), "!".to_string());
        let service = ServerConfigService::new(store);

        assert_eq!(service.reload().await.unwrap(), 1);
        assert_eq!(service.get_id(1, ConfigKey::LogChannel).unwrap(), Some(5));
    }
}
