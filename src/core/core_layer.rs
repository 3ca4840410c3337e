// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "casino/casino_service.rs"]
pub mod casino;

#[path = "cooldowns/mod.rs"]
pub mod cooldowns;

#[path = "economy/mod.rs"]
pub mod economy;

#[path = "events/event_service.rs"]
pub mod events;

#[path = "invites/invite_tracker.rs"]
pub mod invites;

#[path = "leveling/leveling_service.rs"]
pub mod leveling;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "roles/role_catalog.rs"]
pub mod roles;

#[path = "settings/settings_service.rs"]
pub mod settings;

#[path = "tickets/ticket_rules.rs"]
pub mod tickets;

#[path = "voice/voice_service.rs"]
pub mod voice;
