// Treasure chest events - group participation with a shared reward.
//
// A chest is posted with a join button. Each press adds the member once
// until the list is full; a press on a full chest removes it and pays everyone
// in the same store transaction. Chests nobody finishes are swept after a day.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// A chest waiting for participants, keyed by the message that carries its button.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveEvent {
    pub message_id: u64,
    pub channel_id: u64,
    /// Coins paid to every participant.
    pub reward: i64,
    pub required_users: usize,
    /// Join order; each id appears once.
    pub participants: Vec<u64>,
    pub created_at: DateTime<Utc>,
}

/// What `EventStore::add_participant` did.
#[derive(Debug, Clone)]
pub struct ParticipantUpdate {
    pub event: ActiveEvent,
    pub newly_added: bool,
}

/// Size and payout for a chest about to be spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChestSpec {
    pub required_users: usize,
    pub reward: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    /// The chest was already opened or never existed.
    NotFound,
    AlreadyJoined { current: usize, required: usize },
    Joined { current: usize, required: usize },
    /// Someone else's press opened the chest a moment earlier.
    Full,
    /// This press completed the chest; everyone listed has been paid.
    Completed { participants: Vec<u64>, reward: i64 },
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Corrupt participant list for event {message_id}: {reason}")]
    CorruptParticipants { message_id: u64, reason: String },
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create_event(
        &self,
        message_id: u64,
        channel_id: u64,
        reward: i64,
        required_users: usize,
    ) -> Result<ActiveEvent, EventError>;

    async fn get_event(&self, message_id: u64) -> Result<Option<ActiveEvent>, EventError>;

    /// Append `user_id` unless already present or the list is full, atomically.
    /// Returns `None` when the event doesn't exist.
    async fn add_participant(
        &self,
        message_id: u64,
        user_id: u64,
    ) -> Result<Option<ParticipantUpdate>, EventError>;

    /// Returns false if there was nothing to delete.
    async fn delete_event(&self, message_id: u64) -> Result<bool, EventError>;

    /// Remove the event and credit `reward` coins to every participant as one
    /// unit: either the row is gone and everyone is paid, or nothing changed.
    /// Returns the removed event, or `None` if it was already gone.
    async fn complete_event(&self, message_id: u64) -> Result<Option<ActiveEvent>, EventError>;

    /// Delete events created before `cutoff`. Returns how many were removed.
    async fn delete_stale_events(&self, cutoff: DateTime<Utc>) -> Result<u64, EventError>;
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct EventConfig {
    pub required_users: RangeInclusive<usize>,
    pub reward: RangeInclusive<i64>,
    /// Seconds between automatic spawns, picked uniformly per cycle.
    pub spawn_interval_secs: RangeInclusive<u64>,
    pub stale_after: Duration,
    pub cleanup_interval: Duration,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            required_users: 2..=6,
            reward: 50..=150,
            spawn_interval_secs: 3_600..=10_800,
            stale_after: Duration::from_secs(24 * 60 * 60),
            cleanup_interval: Duration::from_secs(60 * 60),
        }
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct EventService<S: EventStore> {
    store: S,
    config: EventConfig,
}

impl<S: EventStore> EventService<S> {
    pub fn new(store: S) -> Self {
        Self::new_with_config(store, EventConfig::default())
    }

    pub fn new_with_config(store: S, config: EventConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &EventConfig {
        &self.config
    }

    pub fn roll_chest(&self) -> ChestSpec {
        let mut rng = rand::thread_rng();
        ChestSpec {
            required_users: rng.gen_range(self.config.required_users.clone()),
            reward: rng.gen_range(self.config.reward.clone()),
        }
    }

    pub fn next_spawn_delay(&self) -> Duration {
        let secs = rand::thread_rng().gen_range(self.config.spawn_interval_secs.clone());
        Duration::from_secs(secs)
    }

    /// Record a chest once its message has been posted.
    pub async fn register_chest(
        &self,
        message_id: u64,
        channel_id: u64,
        spec: ChestSpec,
    ) -> Result<ActiveEvent, EventError> {
        let event = self
            .store
            .create_event(message_id, channel_id, spec.reward, spec.required_users)
            .await?;
        tracing::info!(
            message_id,
            channel_id,
            required = spec.required_users,
            reward = spec.reward,
            "Chest registered"
        );
        Ok(event)
    }

    pub async fn get(&self, message_id: u64) -> Result<Option<ActiveEvent>, EventError> {
        self.store.get_event(message_id).await
    }

    pub async fn join(&self, message_id: u64, user_id: u64) -> Result<JoinOutcome, EventError> {
        let Some(update) = self.store.add_participant(message_id, user_id).await? else {
            return Ok(JoinOutcome::NotFound);
        };

        let current = update.event.participants.len();
        let required = update.event.required_users;

        if current < required {
            return Ok(if update.newly_added {
                JoinOutcome::Joined { current, required }
            } else {
                JoinOutcome::AlreadyJoined { current, required }
            });
        }

        // Any press on a full chest may open it, so a completion whose payout
        // failed is retried by the next press. Only one caller gets the row.
        let Some(event) = self.store.complete_event(message_id).await? else {
            return Ok(JoinOutcome::Full);
        };

        tracing::info!(
            message_id,
            participants = event.participants.len(),
            reward = event.reward,
            "Chest opened"
        );

        Ok(JoinOutcome::Completed {
            participants: event.participants,
            reward: event.reward,
        })
    }

    /// Forget a chest whose message is gone. Nobody is paid.
    pub async fn discard(&self, message_id: u64) -> Result<bool, EventError> {
        let removed = self.store.delete_event(message_id).await?;
        if removed {
            tracing::info!(message_id, "Chest discarded");
        }
        Ok(removed)
    }

    /// Drop chests older than `stale_after`.
    pub async fn cleanup_stale(&self) -> Result<u64, EventError> {
        let max_age = chrono::Duration::from_std(self.config.stale_after)
            .unwrap_or_else(|_| chrono::Duration::hours(24));
        let removed = self.store.delete_stale_events(Utc::now() - max_age).await?;
        if removed > 0 {
            tracing::info!(removed, "Removed stale chests");
        }
        Ok(removed)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::economy::{InMemoryUserStore, UserStore};
    use dashmap::DashMap;

    #[derive(Default)]
    struct MockEventStore {
        events: DashMap<u64, ActiveEvent>,
        wallets: InMemoryUserStore,
    }

    #[async_trait]
    impl EventStore for MockEventStore {
        async fn create_event(
            &self,
            message_id: u64,
            channel_id: u64,
            reward: i64,
            required_users: usize,
        ) -> Result<ActiveEvent, EventError> {
            let event = ActiveEvent {
                message_id,
                channel_id,
                reward,
                required_users,
                participants: Vec::new(),
                created_at: Utc::now(),
            };
            self.events.insert(message_id, event.clone());
            Ok(event)
        }

        async fn get_event(&self, message_id: u64) -> Result<Option<ActiveEvent>, EventError> {
            Ok(self.events.get(&message_id).map(|e| e.clone()))
        }

        async fn add_participant(
            &self,
            message_id: u64,
            user_id: u64,
        ) -> Result<Option<ParticipantUpdate>, EventError> {
            Ok(self.events.get_mut(&message_id).map(|mut event| {
                let newly_added = !event.participants.contains(&user_id)
                    && event.participants.len() < event.required_users;
                if newly_added {
                    event.participants.push(user_id);
                }
                ParticipantUpdate {
                    event: event.clone(),
                    newly_added,
                }
            }))
        }

        async fn delete_event(&self, message_id: u64) -> Result<bool, EventError> {
            Ok(self.events.remove(&message_id).is_some())
        }

        async fn complete_event(
            &self,
            message_id: u64,
        ) -> Result<Option<ActiveEvent>, EventError> {
            let Some((_, event)) = self.events.remove(&message_id) else {
                return Ok(None);
            };
            // Undo partial credits and restore the row, like a rolled-back transaction.
            let mut paid = Vec::new();
            for &user_id in &event.participants {
                if let Err(e) = self.wallets.add_coins(user_id, event.reward).await {
                    for &done in &paid {
                        self.wallets.add_coins(done, -event.reward).await.unwrap();
                    }
                    self.events.insert(message_id, event);
                    return Err(EventError::StorageError(e.to_string()));
                }
                paid.push(user_id);
            }
            Ok(Some(event))
        }

        async fn delete_stale_events(&self, cutoff: DateTime<Utc>) -> Result<u64, EventError> {
            let before = self.events.len();
            self.events.retain(|_, e| e.created_at >= cutoff);
            Ok((before - self.events.len()) as u64)
        }
    }

    fn service() -> (EventService<MockEventStore>, InMemoryUserStore) {
        let store = MockEventStore::default();
        let wallets = store.wallets.clone();
        (EventService::new(store), wallets)
    }

    async fn coins(wallets: &InMemoryUserStore, user_id: u64) -> i64 {
        wallets.get_user(user_id).await.unwrap().coins
    }

    #[tokio::test]
    async fn chest_pays_everyone_when_full() {
        let (events, economy) = service();
        events
            .register_chest(
                100,
                1,
                ChestSpec {
                    required_users: 2,
                    reward: 75,
                },
            )
            .await
            .unwrap();

        assert_eq!(
            events.join(100, 7).await.unwrap(),
            JoinOutcome::Joined {
                current: 1,
                required: 2
            }
        );
        assert_eq!(
            events.join(100, 7).await.unwrap(),
            JoinOutcome::AlreadyJoined {
                current: 1,
                required: 2
            }
        );
        assert_eq!(
            events.join(100, 8).await.unwrap(),
            JoinOutcome::Completed {
                participants: vec![7, 8],
                reward: 75
            }
        );

        assert_eq!(coins(&economy, 7).await, 75);
        assert_eq!(coins(&economy, 8).await, 75);
        assert!(events.get(100).await.unwrap().is_none());
        assert_eq!(events.join(100, 9).await.unwrap(), JoinOutcome::NotFound);
    }

    #[tokio::test]
    async fn late_joiner_on_a_full_chest_is_not_paid() {
        let (events, economy) = service();
        let store = &events.store;
        store.create_event(5, 1, 50, 1).await.unwrap();
        // A full chest whose opening press never got to pay out.
        store.add_participant(5, 1).await.unwrap();

        assert_eq!(
            events.join(5, 2).await.unwrap(),
            JoinOutcome::Completed {
                participants: vec![1],
                reward: 50
            }
        );
        assert_eq!(coins(&economy, 1).await, 50);
        assert_eq!(coins(&economy, 2).await, 0);
        assert_eq!(events.join(5, 3).await.unwrap(), JoinOutcome::NotFound);
    }

    #[tokio::test]
    async fn failed_payout_leaves_the_chest_whole_for_a_retry() {
        let (events, economy) = service();
        events.store.create_event(9, 1, 100, 2).await.unwrap();
        assert!(matches!(
            events.join(9, 10).await.unwrap(),
            JoinOutcome::Joined { .. }
        ));

        // The second participant's credit fails mid-payout.
        economy.fail_credits_for(Some(20));
        assert!(events.join(9, 20).await.is_err());

        assert_eq!(coins(&economy, 10).await, 0);
        assert_eq!(coins(&economy, 20).await, 0);
        let stranded = events.get(9).await.unwrap().unwrap();
        assert_eq!(stranded.participants, vec![10, 20]);

        economy.fail_credits_for(None);
        assert_eq!(
            events.join(9, 20).await.unwrap(),
            JoinOutcome::Completed {
                participants: vec![10, 20],
                reward: 100
            }
        );
        assert_eq!(coins(&economy, 10).await, 100);
        assert_eq!(coins(&economy, 20).await, 100);
        assert!(events.get(9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn discarded_chest_pays_nobody() {
        let (events, economy) = service();
        events.store.create_event(3, 1, 80, 1).await.unwrap();

        assert!(events.discard(3).await.unwrap());
        assert!(!events.discard(3).await.unwrap());
        assert_eq!(events.join(3, 1).await.unwrap(), JoinOutcome::NotFound);
        assert_eq!(coins(&economy, 1).await, 0);
    }

    #[tokio::test]
    async fn stale_chests_are_swept() {
        let (events, _) = service();
        events.store.create_event(1, 1, 50, 3).await.unwrap();
        events.store.events.alter(&1, |_, mut e| {
            e.created_at = Utc::now() - chrono::Duration::days(2);
            e
        });
        events.store.create_event(2, 1, 50, 3).await.unwrap();

        assert_eq!(events.cleanup_stale().await.unwrap(), 1);
        assert!(events.get(1).await.unwrap().is_none());
        assert!(events.get(2).await.unwrap().is_some());
    }

    #[test]
    fn rolled_chests_stay_in_range() {
        let (events, _) = service();
        for _ in 0..50 {
            let spec = events.roll_chest();
            assert!((2..=6).contains(&spec.required_users));
            assert!((50..=150).contains(&spec.reward));
            let delay = events.next_spawn_delay().as_secs();
            assert!((3_600..=10_800).contains(&delay));
        }
    }
}
