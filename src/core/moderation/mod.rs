// Core moderation module - member warnings, moderation limits and anti-spam.

pub mod anti_spam;
pub mod moderation_models;
pub mod moderation_service;

pub use anti_spam::*;
pub use moderation_models::*;
pub use moderation_service::*;
