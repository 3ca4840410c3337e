// Economy system core - coins, XP bookkeeping and referral counts.
//
// One user record is shared by the whole bot (not per guild). Every balance
// change goes through the store as a single atomic update, so two handlers
// touching the same user can't lose each other's writes.

use crate::core::cooldowns::{CooldownKind, CooldownTracker};
use crate::core::leveling::level_from_xp;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// Progression state for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: u64,
    /// Cumulative XP; never decreases through normal play.
    pub xp: i64,
    /// Derived from `xp`, stored so the leaderboard can sort on it.
    pub level: i64,
    /// Clamped at zero by the store.
    pub coins: i64,
    pub invites: i64,
}

impl UserRecord {
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            xp: 0,
            level: 1,
            coins: 0,
            invites: 0,
        }
    }
}

/// Partial update: only the fields that are `Some` are written.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub xp: Option<i64>,
    pub level: Option<i64>,
    pub coins: Option<i64>,
    pub invites: Option<i64>,
}

impl UserUpdate {
    /// Clamp every field into its valid range. Setting `xp` without a
    /// `level` brings the level along with it.
    pub fn normalized(self) -> Self {
        let xp = self.xp.map(|xp| xp.max(0));
        let level = match (self.level, xp) {
            (Some(level), _) => Some(level.max(1)),
            (None, Some(xp)) => Some(level_from_xp(xp)),
            (None, None) => None,
        };
        Self {
            xp,
            level,
            coins: self.coins.map(|coins| coins.max(0)),
            invites: self.invites.map(|invites| invites.max(0)),
        }
    }
}

/// What happened to a user's level after an XP increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XpChange {
    pub user_id: u64,
    pub old_level: i64,
    pub new_level: i64,
    pub total_xp: i64,
}

impl XpChange {
    pub fn leveled_up(&self) -> bool {
        self.new_level > self.old_level
    }
}

#[derive(Debug, Clone)]
pub struct Payout {
    pub amount: i64,
    pub new_balance: i64,
}

#[derive(Debug, Clone)]
pub struct WorkShift {
    pub job: &'static str,
    pub emoji: &'static str,
    pub amount: i64,
    pub new_balance: i64,
}

#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub amount: i64,
    pub sender_balance: i64,
    pub recipient_balance: i64,
}

#[derive(Debug, Clone)]
pub struct CoinflipOutcome {
    pub won: bool,
    pub bet: i64,
    pub new_balance: i64,
}

const JOBS: [(&str, &str); 8] = [
    ("programmer", "💻"),
    ("doctor", "⚕️"),
    ("builder", "🏗️"),
    ("chef", "👨‍🍳"),
    ("teacher", "👨‍🏫"),
    ("artist", "🎨"),
    ("musician", "🎵"),
    ("driver", "🚗"),
];

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum EconomyError {
    #[error("Insufficient funds: need {required} coins, but only have {available}")]
    InsufficientFunds { required: i64, available: i64 },

    #[error("On cooldown for another {0:?}")]
    OnCooldown(Duration),

    #[error("Amount must be positive, got {0}")]
    InvalidAmount(i64),

    #[error("You can't send coins to yourself")]
    SelfTransfer,

    #[error("Storage error: {0}")]
    StorageError(String),
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

/// Persistence for user records.
///
/// Increments must be single statements on the backing store (`x = x + ?`),
/// never a read followed by a write.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch a user, inserting a zeroed record (level 1) first if missing.
    async fn get_user(&self, user_id: u64) -> Result<UserRecord, EconomyError>;

    /// Write only the supplied fields and return the resulting record.
    /// Implementations apply `UserUpdate::normalized` first.
    async fn update_user(&self, user_id: u64, update: UserUpdate)
        -> Result<UserRecord, EconomyError>;

    /// Add (or subtract) coins; the balance never drops below zero.
    /// Returns the new balance.
    async fn add_coins(&self, user_id: u64, delta: i64) -> Result<i64, EconomyError>;

    /// Subtract `amount` only if the user holds at least that much.
    /// Returns the new balance, or `None` when funds are insufficient.
    async fn spend_coins(&self, user_id: u64, amount: i64) -> Result<Option<i64>, EconomyError>;

    /// Take `stake` and credit `payout` in one conditional write that only
    /// applies when the balance covers the stake.
    /// Returns the new balance, or `None` when funds are insufficient.
    async fn settle_wager(
        &self,
        user_id: u64,
        stake: i64,
        payout: i64,
    ) -> Result<Option<i64>, EconomyError>;

    /// Move coins between two users in one transaction.
    /// Returns `(sender_balance, recipient_balance)`, or `None` when the
    /// sender can't cover the amount.
    async fn transfer_coins(
        &self,
        from: u64,
        to: u64,
        amount: i64,
    ) -> Result<Option<(i64, i64)>, EconomyError>;

    /// Add XP and recompute the stored level.
    async fn add_xp(&self, user_id: u64, delta: i64) -> Result<XpChange, EconomyError>;

    /// Bump the referral counter. Returns the new count.
    async fn add_invites(&self, user_id: u64, delta: i64) -> Result<i64, EconomyError>;

    /// Users ordered by level, then XP, both descending.
    async fn get_top_users(&self, limit: usize) -> Result<Vec<UserRecord>, EconomyError>;

    /// Users with at least one invite, most invites first.
    async fn get_top_inviters(&self, limit: usize) -> Result<Vec<UserRecord>, EconomyError>;
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct EconomyConfig {
    pub daily_min: i64,
    pub daily_max: i64,
    pub daily_cooldown: Duration,

    pub work_min: i64,
    pub work_max: i64,
    pub work_cooldown: Duration,

    pub coinflip_cooldown: Duration,

    /// Starter coins for new members.
    pub welcome_bonus: i64,

    /// Paid to the inviter when someone joins through their link.
    pub invite_reward: i64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            daily_min: 100,
            daily_max: 500,
            daily_cooldown: Duration::from_secs(24 * 60 * 60),
            work_min: 50,
            work_max: 150,
            work_cooldown: Duration::from_secs(60 * 60),
            coinflip_cooldown: Duration::from_secs(10),
            welcome_bonus: 100,
            invite_reward: 50,
        }
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct EconomyService<S: UserStore> {
    store: S,
    config: EconomyConfig,
    cooldowns: CooldownTracker,
}

impl<S: UserStore> EconomyService<S> {
    pub fn new(store: S) -> Self {
        Self::new_with_config(store, EconomyConfig::default())
    }

    pub fn new_with_config(store: S, config: EconomyConfig) -> Self {
        Self {
            store,
            config,
            cooldowns: CooldownTracker::new(),
        }
    }

    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    pub async fn get_user(&self, user_id: u64) -> Result<UserRecord, EconomyError> {
        self.store.get_user(user_id).await
    }

    pub async fn update_user(
        &self,
        user_id: u64,
        update: UserUpdate,
    ) -> Result<UserRecord, EconomyError> {
        self.store.update_user(user_id, update).await
    }

    /// Credit a positive amount and return the new balance.
    pub async fn award_coins(&self, user_id: u64, amount: i64) -> Result<i64, EconomyError> {
        if amount <= 0 {
            return Err(EconomyError::InvalidAmount(amount));
        }
        self.store.add_coins(user_id, amount).await
    }

    pub async fn claim_daily(&self, user_id: u64) -> Result<Payout, EconomyError> {
        let amount = roll(self.config.daily_min, self.config.daily_max);
        self.guarded_payout(CooldownKind::Daily, self.config.daily_cooldown, user_id, amount)
            .await
    }

    pub async fn work(&self, user_id: u64) -> Result<WorkShift, EconomyError> {
        let amount = roll(self.config.work_min, self.config.work_max);
        let (job, emoji) = *JOBS
            .choose(&mut rand::thread_rng())
            .unwrap_or(&JOBS[0]);

        let payout = self
            .guarded_payout(CooldownKind::Work, self.config.work_cooldown, user_id, amount)
            .await?;

        Ok(WorkShift {
            job,
            emoji,
            amount: payout.amount,
            new_balance: payout.new_balance,
        })
    }

    /// Time until the user may run a cooldown-gated command again.
    pub fn cooldown_remaining(&self, kind: CooldownKind, user_id: u64) -> Option<Duration> {
        let cooldown = match kind {
            CooldownKind::Daily => self.config.daily_cooldown,
            CooldownKind::Work => self.config.work_cooldown,
            CooldownKind::Coinflip => self.config.coinflip_cooldown,
            _ => return None,
        };
        self.cooldowns.remaining(kind, user_id, cooldown)
    }

    /// Forget expired daily, work and coinflip cooldowns.
    pub fn prune_cooldowns(&self) -> usize {
        [
            (CooldownKind::Daily, self.config.daily_cooldown),
            (CooldownKind::Work, self.config.work_cooldown),
            (CooldownKind::Coinflip, self.config.coinflip_cooldown),
        ]
        .into_iter()
        .map(|(kind, cooldown)| self.cooldowns.prune(kind, cooldown))
        .sum()
    }

    async fn guarded_payout(
        &self,
        kind: CooldownKind,
        cooldown: Duration,
        user_id: u64,
        amount: i64,
    ) -> Result<Payout, EconomyError> {
        self.cooldowns
            .try_start(kind, user_id, cooldown)
            .map_err(EconomyError::OnCooldown)?;

        match self.store.add_coins(user_id, amount).await {
            Ok(new_balance) => Ok(Payout {
                amount,
                new_balance,
            }),
            Err(e) => {
                // Don't make the user wait a day for a write that never happened.
                self.cooldowns.reset(kind, user_id);
                Err(e)
            }
        }
    }

    pub async fn transfer(
        &self,
        from: u64,
        to: u64,
        amount: i64,
    ) -> Result<TransferReceipt, EconomyError> {
        if amount <= 0 {
            return Err(EconomyError::InvalidAmount(amount));
        }
        if from == to {
            return Err(EconomyError::SelfTransfer);
        }

        match self.store.transfer_coins(from, to, amount).await? {
            Some((sender_balance, recipient_balance)) => Ok(TransferReceipt {
                amount,
                sender_balance,
                recipient_balance,
            }),
            None => Err(self.insufficient(from, amount).await),
        }
    }

    /// Settle a game of chance whose result is already known: the bet and
    /// the payout land in a single write, so a losing round can never push
    /// the balance negative and a winning one can't lose its payout.
    /// Returns the new balance.
    pub async fn settle_wager(
        &self,
        user_id: u64,
        bet: i64,
        payout: i64,
    ) -> Result<i64, EconomyError> {
        if bet <= 0 {
            return Err(EconomyError::InvalidAmount(bet));
        }
        if payout < 0 {
            return Err(EconomyError::InvalidAmount(payout));
        }
        match self.store.settle_wager(user_id, bet, payout).await? {
            Some(balance) => Ok(balance),
            None => Err(self.insufficient(user_id, bet).await),
        }
    }

    /// 50/50 double-or-nothing.
    pub async fn coinflip(&self, user_id: u64, bet: i64) -> Result<CoinflipOutcome, EconomyError> {
        if bet <= 0 {
            return Err(EconomyError::InvalidAmount(bet));
        }
        self.cooldowns
            .try_start(CooldownKind::Coinflip, user_id, self.config.coinflip_cooldown)
            .map_err(EconomyError::OnCooldown)?;

        let won = rand::thread_rng().gen_bool(0.5);
        let payout = if won { bet * 2 } else { 0 };

        match self.settle_wager(user_id, bet, payout).await {
            Ok(new_balance) => Ok(CoinflipOutcome {
                won,
                bet,
                new_balance,
            }),
            Err(e) => {
                self.cooldowns.reset(CooldownKind::Coinflip, user_id);
                Err(e)
            }
        }
    }

    /// Take the price of a purchase. Returns the new balance.
    pub async fn deduct_coins_for_purchase(
        &self,
        user_id: u64,
        amount: i64,
    ) -> Result<i64, EconomyError> {
        if amount <= 0 {
            return Err(EconomyError::InvalidAmount(amount));
        }
        match self.store.spend_coins(user_id, amount).await? {
            Some(balance) => Ok(balance),
            None => Err(self.insufficient(user_id, amount).await),
        }
    }

    /// Starter coins for someone who just joined.
    pub async fn grant_welcome_bonus(&self, user_id: u64) -> Result<i64, EconomyError> {
        self.award_coins(user_id, self.config.welcome_bonus).await
    }

    /// Credit an inviter with one referral and the invite reward.
    /// Returns the inviter's new referral count.
    pub async fn reward_inviter(&self, inviter_id: u64) -> Result<i64, EconomyError> {
        let invites = self.store.add_invites(inviter_id, 1).await?;
        self.award_coins(inviter_id, self.config.invite_reward)
            .await?;
        Ok(invites)
    }

    pub async fn invite_leaderboard(&self, limit: usize) -> Result<Vec<UserRecord>, EconomyError> {
        self.store.get_top_inviters(limit).await
    }

    async fn insufficient(&self, user_id: u64, required: i64) -> EconomyError {
        match self.store.get_user(user_id).await {
            Ok(user) => EconomyError::InsufficientFunds {
                required,
                available: user.coins,
            },
            Err(e) => e,
        }
    }
}

fn roll(min: i64, max: i64) -> i64 {
    if min >= max {
        return min;
    }
    rand::thread_rng().gen_range(min..=max)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// In-memory user store shared by the core tests.
    #[derive(Clone, Default)]
    pub(crate) struct InMemoryUserStore {
        users: Arc<Mutex<HashMap<u64, UserRecord>>>,
        /// When set, `add_coins` for this user fails as a broken database would.
        fail_credits_for: Arc<Mutex<Option<u64>>>,
    }

    impl InMemoryUserStore {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn fail_credits_for(&self, user_id: Option<u64>) {
            *self.fail_credits_for.lock().unwrap() = user_id;
        }

        fn with_user<T>(&self, user_id: u64, f: impl FnOnce(&mut UserRecord) -> T) -> T {
            let mut users = self.users.lock().unwrap();
            let user = users
                .entry(user_id)
                .or_insert_with(|| UserRecord::new(user_id));
            f(user)
        }
    }

    #[async_trait]
    impl UserStore for InMemoryUserStore {
        async fn get_user(&self, user_id: u64) -> Result<UserRecord, EconomyError> {
            Ok(self.with_user(user_id, |u| u.clone()))
        }

        async fn update_user(
            &self,
            user_id: u64,
            update: UserUpdate,
        ) -> Result<UserRecord, EconomyError> {
            let update = update.normalized();
            Ok(self.with_user(user_id, |u| {
                if let Some(xp) = update.xp {
                    u.xp = xp;
                }
                if let Some(level) = update.level {
                    u.level = level;
                }
                if let Some(coins) = update.coins {
                    u.coins = coins;
                }
                if let Some(invites) = update.invites {
                    u.invites = invites;
                }
                u.clone()
            }))
        }

        async fn add_coins(&self, user_id: u64, delta: i64) -> Result<i64, EconomyError> {
            if *self.fail_credits_for.lock().unwrap() == Some(user_id) {
                return Err(EconomyError::StorageError("disk I/O error".to_string()));
            }
            Ok(self.with_user(user_id, |u| {
                u.coins = (u.coins + delta).max(0);
                u.coins
            }))
        }

        async fn spend_coins(
            &self,
            user_id: u64,
            amount: i64,
        ) -> Result<Option<i64>, EconomyError> {
            Ok(self.with_user(user_id, |u| {
                (u.coins >= amount).then(|| {
                    u.coins -= amount;
                    u.coins
                })
            }))
        }

        async fn settle_wager(
            &self,
            user_id: u64,
            stake: i64,
            payout: i64,
        ) -> Result<Option<i64>, EconomyError> {
            Ok(self.with_user(user_id, |u| {
                (u.coins >= stake).then(|| {
                    u.coins = u.coins - stake + payout;
                    u.coins
                })
            }))
        }

        async fn transfer_coins(
            &self,
            from: u64,
            to: u64,
            amount: i64,
        ) -> Result<Option<(i64, i64)>, EconomyError> {
            let Some(sender) = self.spend_coins(from, amount).await? else {
                return Ok(None);
            };
            let recipient = self.add_coins(to, amount).await?;
            Ok(Some((sender, recipient)))
        }

        async fn add_xp(&self, user_id: u64, delta: i64) -> Result<XpChange, EconomyError> {
            Ok(self.with_user(user_id, |u| {
                let old_level = u.level;
                u.xp = (u.xp + delta).max(0);
                u.level = level_from_xp(u.xp);
                XpChange {
                    user_id,
                    old_level,
                    new_level: u.level,
                    total_xp: u.xp,
                }
            }))
        }

        async fn add_invites(&self, user_id: u64, delta: i64) -> Result<i64, EconomyError> {
            Ok(self.with_user(user_id, |u| {
                u.invites += delta;
                u.invites
            }))
        }

        async fn get_top_users(&self, limit: usize) -> Result<Vec<UserRecord>, EconomyError> {
            let mut users: Vec<_> = self.users.lock().unwrap().values().cloned().collect();
            users.sort_by(|a, b| b.level.cmp(&a.level).then(b.xp.cmp(&a.xp)));
            users.truncate(limit);
            Ok(users)
        }

        async fn get_top_inviters(&self, limit: usize) -> Result<Vec<UserRecord>, EconomyError> {
            let mut users: Vec<_> = self
                .users
                .lock()
                .unwrap()
                .values()
                .filter(|u| u.invites > 0)
                .cloned()
                .collect();
            users.sort_by(|a, b| b.invites.cmp(&a.invites));
            users.truncate(limit);
            Ok(users)
        }
    }

    fn service() -> EconomyService<InMemoryUserStore> {
        EconomyService::new(InMemoryUserStore::new())
    }

    #[tokio::test]
    async fn new_users_start_at_level_one_with_nothing() {
        let user = service().get_user(42).await.unwrap();
        assert_eq!(user, UserRecord::new(42));
    }

    #[tokio::test]
    async fn daily_pays_within_range_once() {
        let service = service();

        let payout = service.claim_daily(1).await.unwrap();
        assert!((100..=500).contains(&payout.amount));
        assert_eq!(payout.new_balance, payout.amount);

        let err = service.claim_daily(1).await.unwrap_err();
        assert!(matches!(err, EconomyError::OnCooldown(_)));
        assert!(service.cooldown_remaining(CooldownKind::Daily, 1).is_some());
    }

    #[tokio::test]
    async fn work_and_daily_have_separate_cooldowns() {
        let service = service();
        service.claim_daily(1).await.unwrap();

        let shift = service.work(1).await.unwrap();
        assert!((50..=150).contains(&shift.amount));
        assert!(JOBS.iter().any(|(job, _)| *job == shift.job));
    }

    #[tokio::test]
    async fn transfer_moves_coins() {
        let service = service();
        service.award_coins(1, 300).await.unwrap();

        let receipt = service.transfer(1, 2, 120).await.unwrap();
        assert_eq!(receipt.sender_balance, 180);
        assert_eq!(receipt.recipient_balance, 120);
    }

    #[tokio::test]
    async fn transfer_rejects_bad_requests() {
        let service = service();
        service.award_coins(1, 50).await.unwrap();

        assert!(matches!(
            service.transfer(1, 2, 0).await,
            Err(EconomyError::InvalidAmount(0))
        ));
        assert!(matches!(
            service.transfer(1, 1, 10).await,
            Err(EconomyError::SelfTransfer)
        ));
        match service.transfer(1, 2, 51).await {
            Err(EconomyError::InsufficientFunds {
                required,
                available,
            }) => {
                assert_eq!(required, 51);
                assert_eq!(available, 50);
            }
            other => panic!("expected insufficient funds, got {other:?}"),
        }
        assert_eq!(service.get_user(2).await.unwrap().coins, 0);
    }

    #[tokio::test]
    async fn coinflip_never_goes_negative() {
        let service = service();
        service.award_coins(1, 100).await.unwrap();

        let outcome = service.coinflip(1, 100).await.unwrap();
        if outcome.won {
            assert_eq!(outcome.new_balance, 200);
        } else {
            assert_eq!(outcome.new_balance, 0);
        }
        assert_eq!(service.get_user(1).await.unwrap().coins, outcome.new_balance);
    }

    #[tokio::test]
    async fn winning_flip_is_paid_even_when_plain_credits_fail() {
        let store = InMemoryUserStore::new();
        let service = EconomyService::new(store.clone());
        service.award_coins(1, 100).await.unwrap();
        // The bet and the payout go through one write, not a debit plus a credit.
        store.fail_credits_for(Some(1));

        let outcome = service.coinflip(1, 40).await.unwrap();
        let expected = if outcome.won { 140 } else { 60 };
        assert_eq!(outcome.new_balance, expected);
        assert_eq!(service.get_user(1).await.unwrap().coins, expected);
    }

    #[tokio::test]
    async fn wager_settles_stake_and_payout_together() {
        let service = service();
        service.award_coins(1, 50).await.unwrap();

        assert_eq!(service.settle_wager(1, 50, 150).await.unwrap(), 150);
        assert_eq!(service.settle_wager(1, 20, 0).await.unwrap(), 130);
        assert!(matches!(
            service.settle_wager(1, 500, 1_000).await,
            Err(EconomyError::InsufficientFunds {
                required: 500,
                available: 130
            })
        ));
        assert!(matches!(
            service.settle_wager(1, 0, 10).await,
            Err(EconomyError::InvalidAmount(0))
        ));
        assert_eq!(service.get_user(1).await.unwrap().coins, 130);
    }

    #[tokio::test]
    async fn pruning_forgets_finished_cooldowns_only() {
        let service = EconomyService::new_with_config(
            InMemoryUserStore::new(),
            EconomyConfig {
                work_cooldown: Duration::ZERO,
                ..Default::default()
            },
        );
        service.claim_daily(1).await.unwrap();
        service.work(1).await.unwrap();

        assert_eq!(service.prune_cooldowns(), 1);
        assert!(service.cooldown_remaining(CooldownKind::Daily, 1).is_some());
    }

    #[tokio::test]
    async fn coinflip_without_funds_does_not_start_cooldown() {
        let service = service();

        let err = service.coinflip(1, 10).await.unwrap_err();
        assert!(matches!(err, EconomyError::InsufficientFunds { .. }));
        assert!(service
            .cooldown_remaining(CooldownKind::Coinflip, 1)
            .is_none());
    }

    #[tokio::test]
    async fn purchase_requires_funds() {
        let service = service();
        service.award_coins(1, 600).await.unwrap();

        assert_eq!(service.deduct_coins_for_purchase(1, 500).await.unwrap(), 100);
        assert!(matches!(
            service.deduct_coins_for_purchase(1, 500).await,
            Err(EconomyError::InsufficientFunds { .. })
        ));
    }

    #[tokio::test]
    async fn inviter_gets_referral_and_reward() {
        let service = service();

        assert_eq!(service.reward_inviter(7).await.unwrap(), 1);
        assert_eq!(service.reward_inviter(7).await.unwrap(), 2);

        let inviter = service.get_user(7).await.unwrap();
        assert_eq!(inviter.invites, 2);
        assert_eq!(inviter.coins, 100);

        let board = service.invite_leaderboard(10).await.unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].user_id, 7);
    }

    #[tokio::test]
    async fn xp_update_carries_the_level_and_values_are_clamped() {
        let service = service();

        let user = service
            .update_user(
                4,
                UserUpdate {
                    xp: Some(5_000),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(user.level, 10);
        assert_eq!(user.level, level_from_xp(user.xp));

        let user = service
            .update_user(
                4,
                UserUpdate {
                    xp: Some(-50),
                    level: Some(0),
                    invites: Some(-3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!((user.xp, user.level, user.invites), (0, 1, 0));
        assert_eq!(user.level, level_from_xp(user.xp));
    }

    #[tokio::test]
    async fn partial_update_leaves_other_fields() {
        let service = service();
        service.award_coins(3, 40).await.unwrap();

        let user = service
            .update_user(
                3,
                UserUpdate {
                    level: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(user.level, 5);
        assert_eq!(user.coins, 40);
    }
}
