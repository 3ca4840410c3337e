// Moderation domain models - warnings and moderation limits.
//
// These are pure domain types with no Discord dependencies.

use chrono::{DateTime, Utc};
use std::ops::RangeInclusive;

/// One warning issued to a member. Records are append-only until removed.
#[derive(Debug, Clone, PartialEq)]
pub struct WarnRecord {
    pub id: i64,
    pub user_id: u64,
    pub moderator_id: u64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Result of issuing a warning.
#[derive(Debug, Clone)]
pub struct WarnOutcome {
    pub record: WarnRecord,
    /// Warnings the user holds now, including this one.
    pub total: usize,
    pub max_warns: usize,
}

impl WarnOutcome {
    pub fn limit_reached(&self) -> bool {
        self.total >= self.max_warns
    }
}

/// Limits for moderation commands.
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    /// Warnings before a member is flagged for a ban.
    pub max_warns: usize,
    pub purge_range: RangeInclusive<u64>,
    /// Slowmode bounds in seconds; Discord caps this at six hours.
    pub slowmode_range: RangeInclusive<u64>,
    pub default_reason: &'static str,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            max_warns: 3,
            purge_range: 1..=100,
            slowmode_range: 0..=21_600,
            default_reason: "No reason provided",
        }
    }
}
