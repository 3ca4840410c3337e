// Process-level settings read from the environment (and `.env`).
//
// Per-guild channel settings live in the database instead; see
// `core::settings`.

use thiserror::Error;

pub const DEFAULT_DATABASE_PATH: &str = "data/database.db";
pub const DEFAULT_EVENTS_CHANNEL_NAME: &str = "🎉・events";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Missing {0} environment variable! Create a .env file with your bot token.")]
    Missing(&'static str),

    #[error("{name} must be a Discord id, got {value:?}")]
    InvalidId { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct BotSettings {
    pub token: String,
    pub database_path: String,
    pub log_level: String,
    /// Bot owner; always treated as staff.
    pub owner_id: Option<u64>,
    /// Register commands in this guild only, for instant updates while developing.
    pub dev_guild_id: Option<u64>,
    /// Fallback channel name for chests when a guild has no events channel set.
    pub events_channel_name: String,
}

impl BotSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let non_empty = |name: &str| get(name).filter(|v| !v.trim().is_empty());

        let token = non_empty("DISCORD_TOKEN").ok_or(SettingsError::Missing("DISCORD_TOKEN"))?;

        Ok(Self {
            token,
            database_path: non_empty("DATABASE_PATH")
                .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
            log_level: non_empty("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            owner_id: parse_id("OWNER_ID", non_empty("OWNER_ID"))?,
            dev_guild_id: parse_id("DEV_GUILD_ID", non_empty("DEV_GUILD_ID"))?,
            events_channel_name: non_empty("EVENTS_CHANNEL_NAME")
                .unwrap_or_else(|| DEFAULT_EVENTS_CHANNEL_NAME.to_string()),
        })
    }

    pub fn is_owner(&self, user_id: u64) -> bool {
        self.owner_id == Some(user_id)
    }
}

fn parse_id(name: &'static str, value: Option<String>) -> Result<Option<u64>, SettingsError> {
    value
        .map(|v| {
            v.trim()
                .parse::<u64>()
                .map_err(|_| SettingsError::InvalidId { name, value: v })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<BotSettings, SettingsError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotSettings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn token_is_required() {
        assert_eq!(
            settings(&[]).unwrap_err(),
            SettingsError::Missing("DISCORD_TOKEN")
        );
        assert_eq!(
            settings(&[("DISCORD_TOKEN", "  ")]).unwrap_err(),
            SettingsError::Missing("DISCORD_TOKEN")
        );
    }

    #[test]
    fn defaults_fill_the_rest() {
        let s = settings(&[("DISCORD_TOKEN", "abc")]).unwrap();
        assert_eq!(s.database_path, DEFAULT_DATABASE_PATH);
        assert_eq!(s.log_level, "info");
        assert_eq!(s.owner_id, None);
        assert_eq!(s.events_channel_name, DEFAULT_EVENTS_CHANNEL_NAME);
    }

    #[test]
    fn ids_are_parsed() {
        let s = settings(&[
            ("DISCORD_TOKEN", "abc"),
            ("OWNER_ID", "123"),
            ("DEV_GUILD_ID", "456"),
        ])
        .unwrap();
        assert!(s.is_owner(123));
        assert_eq!(s.dev_guild_id, Some(456));

        let err = settings(&[("DISCORD_TOKEN", "abc"), ("OWNER_ID", "me")]).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidId { name: "OWNER_ID", .. }));
    }
}
