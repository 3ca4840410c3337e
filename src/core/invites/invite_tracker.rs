// Invite attribution - remembers how often each invite code has been used so
// that a new member can be credited to whoever's code just ticked up.

use dashmap::DashMap;
use std::collections::HashMap;

/// One invite code as reported by Discord.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteSnapshot {
    pub code: String,
    pub inviter_id: Option<u64>,
    pub uses: u64,
}

#[derive(Default)]
pub struct InviteTracker {
    // Guild ID -> (code -> uses)
    uses: DashMap<u64, HashMap<String, u64>>,
}

impl InviteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite what we know about a guild's invites.
    pub fn record(&self, guild_id: u64, invites: &[InviteSnapshot]) {
        self.uses.insert(guild_id, to_use_map(invites));
    }

    /// Compare fresh counts against the last snapshot, store the fresh counts,
    /// and return the inviter whose code gained a use.
    ///
    /// Codes created since the last snapshot count from zero.
    pub fn attribute_join(&self, guild_id: u64, fresh: &[InviteSnapshot]) -> Option<u64> {
        let mut entry = self.uses.entry(guild_id).or_default();
        let previous = &*entry;

        let inviter = fresh
            .iter()
            .find(|invite| invite.uses > previous.get(&invite.code).copied().unwrap_or(0))
            .and_then(|invite| invite.inviter_id);

        *entry = to_use_map(fresh);
        inviter
    }

    /// Drop a guild we are no longer in.
    pub fn forget(&self, guild_id: u64) {
        self.uses.remove(&guild_id);
    }
}

fn to_use_map(invites: &[InviteSnapshot]) -> HashMap<String, u64> {
    invites
        .iter()
        .map(|invite| (invite.code.clone(), invite.uses))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invite(code: &str, inviter: u64, uses: u64) -> InviteSnapshot {
        InviteSnapshot {
            code: code.to_string(),
            inviter_id: Some(inviter),
            uses,
        }
    }

    #[test]
    fn credits_the_code_that_moved() {
        let tracker = InviteTracker::new();
        tracker.record(1, &[invite("abc", 10, 3), invite("xyz", 20, 5)]);

        let inviter = tracker.attribute_join(1, &[invite("abc", 10, 3), invite("xyz", 20, 6)]);
        assert_eq!(inviter, Some(20));

        // Snapshot was refreshed, so the same counts attribute nothing.
        let inviter = tracker.attribute_join(1, &[invite("abc", 10, 3), invite("xyz", 20, 6)]);
        assert_eq!(inviter, None);
    }

    #[test]
    fn new_codes_count_from_zero() {
        let tracker = InviteTracker::new();
        tracker.record(1, &[]);

        assert_eq!(tracker.attribute_join(1, &[invite("new", 30, 1)]), Some(30));
        assert_eq!(tracker.attribute_join(1, &[invite("new", 30, 1)]), None);
    }

    #[test]
    fn unknown_guild_starts_empty() {
        let tracker = InviteTracker::new();
        assert_eq!(tracker.attribute_join(9, &[invite("a", 1, 0)]), None);
    }

    #[test]
    fn forgotten_guild_counts_from_zero_again() {
        let tracker = InviteTracker::new();
        tracker.record(1, &[invite("abc", 10, 4)]);
        tracker.record(2, &[invite("def", 20, 4)]);

        tracker.forget(1);

        assert_eq!(tracker.attribute_join(1, &[invite("abc", 10, 4)]), Some(10));
        assert_eq!(tracker.attribute_join(2, &[invite("def", 20, 4)]), None);
    }
}
