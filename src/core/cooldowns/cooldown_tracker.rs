// In-process cooldowns for commands and passive rewards.
//
// Nothing here is persisted. A restart clears every cooldown.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Which action a cooldown belongs to. Each kind has its own clock per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CooldownKind {
    Daily,
    Work,
    Coinflip,
    Slots,
    Roulette,
    MessageXp,
}

/// Tracks the last time each (kind, user) pair fired.
#[derive(Default)]
pub struct CooldownTracker {
    last_used: DashMap<(CooldownKind, u64), Instant>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the cooldown if it has elapsed.
    ///
    /// Returns `Err(remaining)` without touching the clock when the user is
    /// still cooling down.
    pub fn try_start(
        &self,
        kind: CooldownKind,
        user_id: u64,
        cooldown: Duration,
    ) -> Result<(), Duration> {
        self.try_start_at(kind, user_id, cooldown, Instant::now())
    }

    fn try_start_at(
        &self,
        kind: CooldownKind,
        user_id: u64,
        cooldown: Duration,
        now: Instant,
    ) -> Result<(), Duration> {
        // The entry guard holds the shard lock, so two handlers racing on the
        // same user cannot both pass.
        match self.last_used.entry((kind, user_id)) {
            Entry::Occupied(mut occupied) => {
                let elapsed = now.saturating_duration_since(*occupied.get());
                if elapsed < cooldown {
                    return Err(cooldown - elapsed);
                }
                occupied.insert(now);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(now);
            }
        }
        Ok(())
    }

    /// Forget a cooldown, e.g. after the guarded action failed.
    pub fn reset(&self, kind: CooldownKind, user_id: u64) {
        self.last_used.remove(&(kind, user_id));
    }

    /// Drop every `kind` entry whose cooldown has run out. Returns how many went.
    pub fn prune(&self, kind: CooldownKind, cooldown: Duration) -> usize {
        self.prune_at(kind, cooldown, Instant::now())
    }

    fn prune_at(&self, kind: CooldownKind, cooldown: Duration, now: Instant) -> usize {
        let before = self.last_used.len();
        self.last_used.retain(|(entry_kind, _), last| {
            *entry_kind != kind || now.saturating_duration_since(*last) < cooldown
        });
        before.saturating_sub(self.last_used.len())
    }

    /// Time left before the user may act again, if any.
    pub fn remaining(&self, kind: CooldownKind, user_id: u64, cooldown: Duration) -> Option<Duration> {
        let last = *self.last_used.get(&(kind, user_id))?;
        let elapsed = last.elapsed();
        (elapsed < cooldown).then(|| cooldown - elapsed)
    }
}
