// Warning service - core business logic for member warnings.
//
// Handles issuing, listing and clearing warnings plus the range checks for
// purge and slowmode. NO Discord dependencies here.

use super::moderation_models::{ModerationConfig, WarnOutcome, WarnRecord};
use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("You can't warn yourself")]
    SelfTarget,

    #[error("Target's role is equal to or above yours")]
    Hierarchy,

    #[error("Value {value} is outside the allowed range {min}..={max}")]
    OutOfRange { value: u64, min: u64, max: u64 },
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

#[async_trait]
pub trait WarnStore: Send + Sync {
    /// Append a warning and return it with its assigned id.
    async fn add_warn(
        &self,
        user_id: u64,
        moderator_id: u64,
        reason: &str,
    ) -> Result<WarnRecord, ModerationError>;

    /// All warnings for a user, oldest first.
    async fn get_warns(&self, user_id: u64) -> Result<Vec<WarnRecord>, ModerationError>;

    /// Delete one warning. Returns false if the id didn't exist.
    async fn remove_warn(&self, warn_id: i64) -> Result<bool, ModerationError>;

    /// Delete all of a user's warnings. Returns how many were removed.
    async fn clear_warns(&self, user_id: u64) -> Result<u64, ModerationError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ModerationService<S: WarnStore> {
    store: S,
    config: ModerationConfig,
}

impl<S: WarnStore> ModerationService<S> {
    pub fn new(store: S) -> Self {
        Self::new_with_config(store, ModerationConfig::default())
    }

    pub fn new_with_config(store: S, config: ModerationConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ModerationConfig {
        &self.config
    }

    pub async fn warn(
        &self,
        user_id: u64,
        moderator_id: u64,
        reason: Option<&str>,
    ) -> Result<WarnOutcome, ModerationError> {
        if user_id == moderator_id {
            return Err(ModerationError::SelfTarget);
        }

        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(self.config.default_reason);

        let record = self.store.add_warn(user_id, moderator_id, reason).await?;
        let total = self.store.get_warns(user_id).await?.len();

        tracing::info!(
            user_id,
            moderator_id,
            warn_id = record.id,
            total,
            "Warning issued"
        );

        Ok(WarnOutcome {
            record,
            total,
            max_warns: self.config.max_warns,
        })
    }

    pub async fn warns(&self, user_id: u64) -> Result<Vec<WarnRecord>, ModerationError> {
        self.store.get_warns(user_id).await
    }

    pub async fn remove_warn(&self, warn_id: i64) -> Result<bool, ModerationError> {
        self.store.remove_warn(warn_id).await
    }

    pub async fn clear_warns(&self, user_id: u64) -> Result<u64, ModerationError> {
        self.store.clear_warns(user_id).await
    }

    pub fn validate_purge(&self, amount: u64) -> Result<u64, ModerationError> {
        check_range(amount, &self.config.purge_range)
    }

    pub fn validate_slowmode(&self, seconds: u64) -> Result<u64, ModerationError> {
        check_range(seconds, &self.config.slowmode_range)
    }
}

/// A moderator may act on a target only if their top role sits strictly
/// higher. The guild owner can act on anyone.
pub fn check_hierarchy(
    moderator_top_role: u16,
    target_top_role: u16,
    moderator_is_owner: bool,
) -> Result<(), ModerationError> {
    if moderator_is_owner || moderator_top_role > target_top_role {
        Ok(())
    } else {
        Err(ModerationError::Hierarchy)
    }
}

fn check_range(
    value: u64,
    range: &std::ops::RangeInclusive<u64>,
) -> Result<u64, ModerationError> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ModerationError::OutOfRange {
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// In-memory store for testing
    struct MockWarnStore {
        warns: DashMap<i64, WarnRecord>,
        next_id: AtomicI64,
    }

    impl MockWarnStore {
        fn new() -> Self {
            Self {
                warns: DashMap::new(),
                next_id: AtomicI64::new(1),
            }
        }
    }

    #[async_trait]
    impl WarnStore for MockWarnStore {
        async fn add_warn(
            &self,
            user_id: u64,
            moderator_id: u64,
            reason: &str,
        ) -> Result<WarnRecord, ModerationError> {
            let record = WarnRecord {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                user_id,
                moderator_id,
                reason: reason.to_string(),
                created_at: Utc::now(),
            };
            self.warns.insert(record.id, record.clone());
            Ok(record)
        }

        async fn get_warns(&self, user_id: u64) -> Result<Vec<WarnRecord>, ModerationError> {
            let mut warns: Vec<_> = self
                .warns
                .iter()
                .filter(|w| w.user_id == user_id)
                .map(|w| w.clone())
                .collect();
            warns.sort_by_key(|w| w.id);
            Ok(warns)
        }

        async fn remove_warn(&self, warn_id: i64) -> Result<bool, ModerationError> {
            Ok(self.warns.remove(&warn_id).is_some())
        }

        async fn clear_warns(&self, user_id: u64) -> Result<u64, ModerationError> {
            let before = self.warns.len();
            self.warns.retain(|_, w| w.user_id != user_id);
            Ok((before - self.warns.len()) as u64)
        }
    }

    #[tokio::test]
    async fn warnings_count_towards_the_limit() {
        let service = ModerationService::new(MockWarnStore::new());

        let first = service.warn(10, 1, Some("spam")).await.unwrap();
        assert_eq!(first.total, 1);
        assert!(!first.limit_reached());

        service.warn(10, 1, None).await.unwrap();
        let third = service.warn(10, 2, Some("  ")).await.unwrap();
        assert_eq!(third.total, 3);
        assert!(third.limit_reached());
        assert_eq!(third.record.reason, "No reason provided");
    }

    #[tokio::test]
    async fn cannot_warn_yourself() {
        let service = ModerationService::new(MockWarnStore::new());
        assert!(matches!(
            service.warn(5, 5, None).await,
            Err(ModerationError::SelfTarget)
        ));
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let service = ModerationService::new(MockWarnStore::new());
        let a = service.warn(10, 1, Some("a")).await.unwrap();
        service.warn(10, 1, Some("b")).await.unwrap();
        service.warn(11, 1, Some("c")).await.unwrap();

        assert!(service.remove_warn(a.record.id).await.unwrap());
        assert!(!service.remove_warn(a.record.id).await.unwrap());

        assert_eq!(service.clear_warns(10).await.unwrap(), 1);
        assert!(service.warns(10).await.unwrap().is_empty());
        assert_eq!(service.warns(11).await.unwrap().len(), 1);
    }

    #[test]
    fn ranges_are_enforced() {
        let service = ModerationService::new(MockWarnStore::new());
        assert!(service.validate_purge(1).is_ok());
        assert!(service.validate_purge(100).is_ok());
        assert!(service.validate_purge(0).is_err());
        assert!(service.validate_purge(101).is_err());
        assert!(service.validate_slowmode(0).is_ok());
        assert!(matches!(
            service.validate_slowmode(21_601),
            Err(ModerationError::OutOfRange { max: 21_600, .. })
        ));
    }

    #[test]
    fn hierarchy_requires_a_higher_role() {
        assert!(check_hierarchy(5, 3, false).is_ok());
        assert!(check_hierarchy(3, 3, false).is_err());
        assert!(check_hierarchy(1, 9, true).is_ok());
    }
}
