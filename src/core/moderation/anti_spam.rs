// Anti-spam - automatic moderation of chat messages.
//
// Checks, in order: an active rate-limit block, blocked words, mention
// spam, shouting in caps, message frequency and repeated content. Each hit
// adds a strike; enough strikes within a guild turn into a timeout.
//
// NO Discord dependencies here - the handler passes plain ids and text.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// What the Discord layer should do about a message.
#[derive(Debug, Clone, PartialEq)]
pub enum SpamAction {
    None,
    /// Delete the message and record a strike.
    Warn {
        reason: String,
        warning_count: u32,
        warnings_before_timeout: u32,
    },
    /// Delete quietly; the user is still blocked from an earlier hit.
    DeleteMessage { reason: String },
    /// Delete and mute the member. Strikes are reset.
    Timeout { duration: Duration, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpamType {
    RateLimit,
    DuplicateContent,
    MentionSpam,
    Caps,
    BlockedWord,
    None,
}

impl SpamType {
    pub fn reason(self) -> &'static str {
        match self {
            SpamType::RateLimit => "Sending messages too quickly",
            SpamType::DuplicateContent => "Sending the same message repeatedly",
            SpamType::MentionSpam => "Too many mentions in one message",
            SpamType::Caps => "Writing in all caps",
            SpamType::BlockedWord => "Using a blocked word",
            SpamType::None => "Unknown",
        }
    }
}

impl fmt::Display for SpamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpamType::RateLimit => write!(f, "Rate Limit"),
            SpamType::DuplicateContent => write!(f, "Duplicate Content"),
            SpamType::MentionSpam => write!(f, "Mention Spam"),
            SpamType::Caps => write!(f, "Caps"),
            SpamType::BlockedWord => write!(f, "Blocked Word"),
            SpamType::None => write!(f, "None"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpamCheckResult {
    pub is_spam: bool,
    pub action: SpamAction,
    pub spam_type: SpamType,
}

impl SpamCheckResult {
    pub fn ok() -> Self {
        Self {
            is_spam: false,
            action: SpamAction::None,
            spam_type: SpamType::None,
        }
    }

    pub fn spam(spam_type: SpamType, action: SpamAction) -> Self {
        Self {
            is_spam: true,
            action,
            spam_type,
        }
    }
}

/// A recent message, kept just long enough for frequency and repeat checks.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub content_hash: u64,
    pub timestamp: DateTime<Utc>,
}

/// Per-guild anti-spam settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpamConfig {
    pub enabled: bool,
    pub max_messages_per_window: u32,
    pub rate_limit_window_secs: u64,
    /// How long a member who tripped the rate limit stays muted by deletion.
    pub rate_limit_block_secs: u64,
    /// Identical messages allowed inside the window.
    pub max_duplicate_messages: u32,
    pub max_mentions_per_message: u32,
    /// Share of letters that may be upper case before it counts as shouting.
    pub max_caps_ratio: f64,
    /// Shorter messages are never judged for caps.
    pub caps_min_length: usize,
    /// Lower-case substrings that get a message removed.
    pub blocked_words: Vec<String>,
    pub warnings_before_timeout: u32,
    pub timeout_duration_secs: u64,
}

impl Default for SpamConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_messages_per_window: 5,
            rate_limit_window_secs: 5,
            rate_limit_block_secs: 30,
            max_duplicate_messages: 3,
            max_mentions_per_message: 5,
            max_caps_ratio: 0.7,
            caps_min_length: 10,
            blocked_words: Vec::new(),
            warnings_before_timeout: 3,
            timeout_duration_secs: 300,
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum SpamError {
    #[error("Storage error: {0}")]
    StorageError(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

#[async_trait]
pub trait SpamStore: Send + Sync {
    async fn record_message(
        &self,
        user_id: u64,
        guild_id: u64,
        record: MessageRecord,
    ) -> Result<(), SpamError>;

    /// Messages from `since` onwards, newest first.
    async fn get_recent_messages(
        &self,
        user_id: u64,
        guild_id: u64,
        since: DateTime<Utc>,
    ) -> Result<Vec<MessageRecord>, SpamError>;

    /// Add a strike. Returns the new strike count.
    async fn add_warning(
        &self,
        user_id: u64,
        guild_id: u64,
        spam_type: SpamType,
    ) -> Result<u32, SpamError>;

    async fn clear_warnings(&self, user_id: u64, guild_id: u64) -> Result<(), SpamError>;

    async fn is_rate_limited(&self, user_id: u64, guild_id: u64) -> Result<bool, SpamError>;

    async fn set_rate_limited(
        &self,
        user_id: u64,
        guild_id: u64,
        until: DateTime<Utc>,
    ) -> Result<(), SpamError>;

    /// Stored settings, or the defaults when the guild has none.
    async fn get_config(&self, guild_id: u64) -> Result<SpamConfig, SpamError>;

    async fn save_config(&self, guild_id: u64, config: SpamConfig) -> Result<(), SpamError>;

    /// Drop message records older than `older_than`. Returns how many went.
    async fn cleanup_old_records(&self, older_than: DateTime<Utc>) -> Result<u64, SpamError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// How long message records are kept for the frequency checks.
const RECORD_RETENTION: Duration = Duration::from_secs(60 * 60);

pub struct AntiSpamService<S: SpamStore> {
    store: S,
}

impl<S: SpamStore> AntiSpamService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn hash_content(content: &str) -> u64 {
        let normalized = content.trim().to_lowercase();
        let mut hasher = DefaultHasher::new();
        normalized.hash(&mut hasher);
        hasher.finish()
    }

    pub async fn check_message(
        &self,
        user_id: u64,
        guild_id: u64,
        content: &str,
        mention_count: u32,
    ) -> Result<SpamCheckResult, SpamError> {
        let config = self.store.get_config(guild_id).await?;
        if !config.enabled {
            return Ok(SpamCheckResult::ok());
        }

        let now = Utc::now();

        if self.store.is_rate_limited(user_id, guild_id).await? {
            return Ok(SpamCheckResult::spam(
                SpamType::RateLimit,
                SpamAction::DeleteMessage {
                    reason: "You are temporarily rate limited".to_string(),
                },
            ));
        }

        // Single-message checks first.
        if let Some(spam_type) = content_violation(content, mention_count, &config) {
            return self.strike(user_id, guild_id, spam_type, &config).await;
        }

        let window_start = now - chrono::Duration::seconds(config.rate_limit_window_secs as i64);
        let recent = self
            .store
            .get_recent_messages(user_id, guild_id, window_start)
            .await?;

        if recent.len() >= config.max_messages_per_window as usize {
            let block_until = now + chrono::Duration::seconds(config.rate_limit_block_secs as i64);
            self.store
                .set_rate_limited(user_id, guild_id, block_until)
                .await?;
            return self
                .strike(user_id, guild_id, SpamType::RateLimit, &config)
                .await;
        }

        let content_hash = Self::hash_content(content);
        let duplicates = recent
            .iter()
            .filter(|m| m.content_hash == content_hash)
            .count();
        if duplicates >= config.max_duplicate_messages as usize {
            return self
                .strike(user_id, guild_id, SpamType::DuplicateContent, &config)
                .await;
        }

        self.store
            .record_message(
                user_id,
                guild_id,
                MessageRecord {
                    content_hash,
                    timestamp: now,
                },
            )
            .await?;

        Ok(SpamCheckResult::ok())
    }

    /// Add a strike and decide between a warning and a timeout.
    async fn strike(
        &self,
        user_id: u64,
        guild_id: u64,
        spam_type: SpamType,
        config: &SpamConfig,
    ) -> Result<SpamCheckResult, SpamError> {
        let warning_count = self.store.add_warning(user_id, guild_id, spam_type).await?;
        let reason = spam_type.reason();

        tracing::info!(user_id, guild_id, %spam_type, warning_count, "Spam detected");

        if warning_count >= config.warnings_before_timeout {
            self.store.clear_warnings(user_id, guild_id).await?;
            return Ok(SpamCheckResult::spam(
                spam_type,
                SpamAction::Timeout {
                    duration: Duration::from_secs(config.timeout_duration_secs),
                    reason: format!(
                        "{}. Received {} warnings.",
                        reason, config.warnings_before_timeout
                    ),
                },
            ));
        }

        Ok(SpamCheckResult::spam(
            spam_type,
            SpamAction::Warn {
                reason: reason.to_string(),
                warning_count,
                warnings_before_timeout: config.warnings_before_timeout,
            },
        ))
    }

    pub async fn get_config(&self, guild_id: u64) -> Result<SpamConfig, SpamError> {
        self.store.get_config(guild_id).await
    }

    pub async fn set_config(&self, guild_id: u64, config: SpamConfig) -> Result<(), SpamError> {
        self.store.save_config(guild_id, config).await
    }

    pub async fn set_enabled(&self, guild_id: u64, enabled: bool) -> Result<(), SpamError> {
        let mut config = self.store.get_config(guild_id).await?;
        config.enabled = enabled;
        self.store.save_config(guild_id, config).await
    }

    /// Add a blocked word. Returns false if it was already listed.
    pub async fn block_word(&self, guild_id: u64, word: &str) -> Result<bool, SpamError> {
        let word = word.trim().to_lowercase();
        let mut config = self.store.get_config(guild_id).await?;
        if word.is_empty() || config.blocked_words.contains(&word) {
            return Ok(false);
        }
        config.blocked_words.push(word);
        self.store.save_config(guild_id, config).await?;
        Ok(true)
    }

    /// Remove a blocked word. Returns false if it wasn't listed.
    pub async fn unblock_word(&self, guild_id: u64, word: &str) -> Result<bool, SpamError> {
        let word = word.trim().to_lowercase();
        let mut config = self.store.get_config(guild_id).await?;
        let before = config.blocked_words.len();
        config.blocked_words.retain(|w| *w != word);
        if config.blocked_words.len() == before {
            return Ok(false);
        }
        self.store.save_config(guild_id, config).await?;
        Ok(true)
    }

    pub async fn clear_user_warnings(&self, user_id: u64, guild_id: u64) -> Result<(), SpamError> {
        self.store.clear_warnings(user_id, guild_id).await
    }

    /// Forget message records nobody will look at again.
    pub async fn cleanup(&self) -> Result<u64, SpamError> {
        let max_age = chrono::Duration::from_std(RECORD_RETENTION)
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        self.store.cleanup_old_records(Utc::now() - max_age).await
    }
}

/// Checks that need only the message itself.
fn content_violation(content: &str, mention_count: u32, config: &SpamConfig) -> Option<SpamType> {
    let lowered = content.to_lowercase();
    if config
        .blocked_words
        .iter()
        .any(|word| !word.is_empty() && lowered.contains(word.as_str()))
    {
        return Some(SpamType::BlockedWord);
    }

    if mention_count > config.max_mentions_per_message {
        return Some(SpamType::MentionSpam);
    }

    if is_shouting(content, config) {
        return Some(SpamType::Caps);
    }

    None
}

fn is_shouting(content: &str, config: &SpamConfig) -> bool {
    let length = content.chars().count();
    if length < config.caps_min_length {
        return false;
    }
    let caps = content.chars().filter(|c| c.is_uppercase()).count();
    caps as f64 / length as f64 > config.max_caps_ratio
}

// ============================================================================
// TESTS
// ============================================================================
