// This is the leveling module - message XP, level arithmetic and level-up rewards.
// Like the rest of `core`, nothing here knows about Discord: the handler passes
// in a plain user id and gets back a `LevelUpEvent` it can announce.
//
// XP is stored as a cumulative total and the level is derived from it. Moving
// from level L to L+1 costs `XP_BASE * L`, so:
//   level 1 ->   0 XP
//   level 2 -> 100 XP
//   level 3 -> 300 XP
//   level 4 -> 600 XP

use crate::core::cooldowns::{CooldownKind, CooldownTracker};
use crate::core::economy::{EconomyError, UserRecord, UserStore};
use rand::Rng;
use std::time::Duration;
use thiserror::Error;

/// XP needed to go from level 1 to level 2; every next level costs one more multiple.
pub const XP_BASE: i64 = 100;

// ============================================================================
// LEVEL ARITHMETIC
// ============================================================================

/// XP required to advance from `level` to `level + 1`.
pub fn xp_for_level_up(level: i64) -> i64 {
    XP_BASE * level.max(1)
}

/// Cumulative XP at which `level` is reached.
pub fn xp_for_level(level: i64) -> i64 {
    let level = level.max(1);
    XP_BASE * (level - 1) * level / 2
}

/// Highest level whose threshold `xp` has reached. Never below 1.
pub fn level_from_xp(xp: i64) -> i64 {
    let mut level = 1;
    while xp >= xp_for_level(level + 1) {
        level += 1;
    }
    level
}

/// Where a user sits inside their current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelProgress {
    pub level: i64,
    /// XP earned since reaching `level`.
    pub current: i64,
    /// XP span of the whole level.
    pub required: i64,
}

impl LevelProgress {
    pub fn of(xp: i64) -> Self {
        let level = level_from_xp(xp);
        Self {
            level,
            current: xp - xp_for_level(level),
            required: xp_for_level_up(level),
        }
    }

    pub fn fraction(&self) -> f64 {
        if self.required <= 0 {
            return 0.0;
        }
        self.current as f64 / self.required as f64
    }

    pub fn remaining(&self) -> i64 {
        (self.required - self.current).max(0)
    }
}

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// Returned when an XP gain crosses one or more level thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelUpEvent {
    pub user_id: u64,
    pub old_level: i64,
    pub new_level: i64,
    pub total_xp: i64,
    /// Coins paid for the levels gained.
    pub coins_awarded: i64,
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum LevelingError {
    #[error("User is on cooldown. Time remaining: {0:?}")]
    OnCooldown(Duration),

    #[error("XP amount must be positive, got {0}")]
    InvalidAmount(i64),

    #[error(transparent)]
    Economy(#[from] EconomyError),
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct LevelingConfig {
    pub xp_min: i64,
    pub xp_max: i64,
    pub cooldown: Duration,
    /// Coins paid per level reached, multiplied by that level.
    pub coins_per_level: i64,
}

impl Default for LevelingConfig {
    fn default() -> Self {
        Self {
            xp_min: 5,
            xp_max: 15,
            cooldown: Duration::from_secs(60),
            coins_per_level: 50,
        }
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct LevelingService<S: UserStore> {
    store: S,
    config: LevelingConfig,
    cooldowns: CooldownTracker,
}

impl<S: UserStore> LevelingService<S> {
    pub fn new(store: S) -> Self {
        Self::new_with_config(store, LevelingConfig::default())
    }

    pub fn new_with_config(store: S, config: LevelingConfig) -> Self {
        Self {
            store,
            config,
            cooldowns: CooldownTracker::new(),
        }
    }

    /// Award message XP, at most once per cooldown window.
    ///
    /// - `Ok(Some(event))` if the user leveled up
    /// - `Ok(None)` if XP was awarded without a level up
    /// - `Err(LevelingError::OnCooldown)` if the user spoke too recently
    pub async fn process_message(&self, user_id: u64) -> Result<Option<LevelUpEvent>, LevelingError> {
        self.cooldowns
            .try_start(CooldownKind::MessageXp, user_id, self.config.cooldown)
            .map_err(LevelingError::OnCooldown)?;

        let amount = if self.config.xp_min >= self.config.xp_max {
            self.config.xp_min
        } else {
            rand::thread_rng().gen_range(self.config.xp_min..=self.config.xp_max)
        };

        self.award_xp(user_id, amount).await
    }

    /// Add XP from any source and pay out level-up coins.
    pub async fn award_xp(
        &self,
        user_id: u64,
        amount: i64,
    ) -> Result<Option<LevelUpEvent>, LevelingError> {
        if amount <= 0 {
            return Err(LevelingError::InvalidAmount(amount));
        }

        let change = self.store.add_xp(user_id, amount).await?;
        if !change.leveled_up() {
            return Ok(None);
        }

        let coins_awarded = self.level_up_reward(change.old_level, change.new_level);
        if coins_awarded > 0 {
            self.store.add_coins(user_id, coins_awarded).await?;
        }

        Ok(Some(LevelUpEvent {
            user_id,
            old_level: change.old_level,
            new_level: change.new_level,
            total_xp: change.total_xp,
            coins_awarded,
        }))
    }

    /// Coins for every level in `(old_level, new_level]`.
    pub fn level_up_reward(&self, old_level: i64, new_level: i64) -> i64 {
        ((old_level + 1)..=new_level)
            .map(|level| level * self.config.coins_per_level)
            .sum()
    }

    pub async fn get_user(&self, user_id: u64) -> Result<UserRecord, LevelingError> {
        Ok(self.store.get_user(user_id).await?)
    }

    /// Top users by level, then XP.
    pub async fn get_leaderboard(&self, limit: usize) -> Result<Vec<UserRecord>, LevelingError> {
        Ok(self.store.get_top_users(limit).await?)
    }

    /// Forget message cooldowns that have run out.
    pub fn prune_cooldowns(&self) -> usize {
        self.cooldowns.prune(CooldownKind::MessageXp, self.config.cooldown)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::economy::InMemoryUserStore;

    #[test]
    fn test_level_calculation() {
        assert_eq!(level_from_xp(0), 1);
        assert_eq!(level_from_xp(99), 1);
        assert_eq!(level_from_xp(100), 2);
        assert_eq!(level_from_xp(299), 2);
        assert_eq!(level_from_xp(300), 3);
        assert_eq!(level_from_xp(600), 4);
        assert_eq!(level_from_xp(-5), 1);
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(xp_for_level(1), 0);
        assert_eq!(xp_for_level(2), 100);
        assert_eq!(xp_for_level(5), 1000);
        assert_eq!(xp_for_level_up(4), 400);
    }

    #[test]
    fn progress_inside_a_level() {
        let progress = LevelProgress::of(350);
        assert_eq!(progress.level, 3);
        assert_eq!(progress.current, 50);
        assert_eq!(progress.required, 300);
        assert_eq!(progress.remaining(), 250);
        assert!((progress.fraction() - 1.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn reward_sums_every_level_gained() {
        let service = LevelingService::new(InMemoryUserStore::new());
        assert_eq!(service.level_up_reward(1, 2), 100);
        assert_eq!(service.level_up_reward(1, 3), 100 + 150);
        assert_eq!(service.level_up_reward(3, 3), 0);
    }

    #[tokio::test]
    async fn message_xp_respects_cooldown() {
        let service = LevelingService::new(InMemoryUserStore::new());

        service.process_message(1).await.unwrap();
        let xp = service.get_user(1).await.unwrap().xp;
        assert!((5..=15).contains(&xp));

        let err = service.process_message(1).await.unwrap_err();
        assert!(matches!(err, LevelingError::OnCooldown(_)));
        assert_eq!(service.get_user(1).await.unwrap().xp, xp);
    }

    #[tokio::test]
    async fn expired_message_cooldowns_are_pruned() {
        let config = LevelingConfig {
            cooldown: Duration::ZERO,
            ..LevelingConfig::default()
        };
        let service = LevelingService::new_with_config(InMemoryUserStore::new(), config);
        service.process_message(1).await.unwrap();
        service.process_message(2).await.unwrap();

        assert_eq!(service.prune_cooldowns(), 2);
        assert_eq!(service.prune_cooldowns(), 0);

        let slow = LevelingService::new(InMemoryUserStore::new());
        slow.process_message(3).await.unwrap();
        assert_eq!(slow.prune_cooldowns(), 0);
    }

    #[tokio::test]
    async fn crossing_a_threshold_pays_coins() {
        let service = LevelingService::new(InMemoryUserStore::new());

        assert!(service.award_xp(5, 90).await.unwrap().is_none());

        let event = service.award_xp(5, 250).await.unwrap().unwrap();
        assert_eq!(event.old_level, 1);
        assert_eq!(event.new_level, 3);
        assert_eq!(event.total_xp, 340);
        assert_eq!(event.coins_awarded, 250);

        let user = service.get_user(5).await.unwrap();
        assert_eq!(user.level, 3);
        assert_eq!(user.coins, 250);
    }

    #[tokio::test]
    async fn leaderboard_orders_by_level_then_xp() {
        let service = LevelingService::new(InMemoryUserStore::new());
        service.award_xp(1, 150).await.unwrap();
        service.award_xp(2, 320).await.unwrap();
        service.award_xp(3, 250).await.unwrap();

        let board = service.get_leaderboard(10).await.unwrap();
        let ids: Vec<u64> = board.iter().map(|u| u.user_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn leveling_error_messages_are_descriptive() {
        let storage = LevelingError::from(EconomyError::StorageError("db down".into()));
        assert!(storage.to_string().contains("db down"));
    }
}
