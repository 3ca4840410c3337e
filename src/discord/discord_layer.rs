// Discord layer - commands and event handlers.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "handlers/event_router.rs"]
pub mod handlers;

#[path = "leveling/leveling_announcements.rs"]
pub mod leveling_announcements;

#[path = "moderation/commands.rs"]
pub mod moderation;

#[path = "moderation/spam_handler.rs"]
pub mod spam_handler;

#[path = "shared/bot_data.rs"]
pub mod bot_data;

#[path = "shared/confirm.rs"]
pub mod confirm;

#[path = "shared/embeds.rs"]
pub mod embeds;

// Re-export command types for convenience
pub use bot_data::{Context, Data, Error};
