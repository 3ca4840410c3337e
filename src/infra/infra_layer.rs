// The infra module contains implementations of core traits.
// Every store shares one SQLite pool opened by `database::connect`.

#[path = "database/sqlite_pool.rs"]
pub mod database;

#[path = "economy/mod.rs"]
pub mod economy;

#[path = "events/sqlite_event_store.rs"]
pub mod events;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "settings/sqlite_config_store.rs"]
pub mod settings;

#[path = "voice/sqlite_voice_store.rs"]
pub mod voice;
