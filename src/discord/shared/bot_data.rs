// Shared state handed to every command and event handler.

use crate::config::BotSettings;
use crate::core::casino::CasinoService;
use crate::core::economy::{EconomyService, InventoryService};
use crate::core::events::EventService;
use crate::core::invites::InviteTracker;
use crate::core::leveling::LevelingService;
use crate::core::moderation::{AntiSpamService, ModerationService};
use crate::core::settings::{ConfigKey, ServerConfigService};
use crate::core::voice::{VoiceLayout, VoiceService};
use crate::infra::economy::{SqliteInventoryStore, SqliteUserStore};
use crate::infra::events::SqliteEventStore;
use crate::infra::moderation::{SqliteSpamStore, SqliteWarnStore};
use crate::infra::settings::SqliteConfigStore;
use crate::infra::voice::SqliteVoiceStore;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Type alias for our bot's context.
/// This is what every command receives as its first parameter.
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

#[derive(Clone)]
pub struct Data {
    pub economy: Arc<EconomyService<SqliteUserStore>>,
    pub inventory: Arc<InventoryService<SqliteInventoryStore>>,
    pub leveling: Arc<LevelingService<SqliteUserStore>>,
    pub casino: Arc<CasinoService<SqliteUserStore>>,
    pub events: Arc<EventService<SqliteEventStore>>,
    pub moderation: Arc<ModerationService<SqliteWarnStore>>,
    pub anti_spam: Arc<AntiSpamService<SqliteSpamStore>>,
    pub settings: Arc<ServerConfigService<SqliteConfigStore>>,
    pub voice: Arc<VoiceService<SqliteVoiceStore>>,
    pub invites: Arc<InviteTracker>,
    pub bot: Arc<BotSettings>,
}

impl Data {
    /// A configured channel id, or `None` when unset or unreadable.
    pub fn channel_setting(&self, guild_id: u64, key: ConfigKey) -> Option<serenity::ChannelId> {
        match self.settings.get_id(guild_id, key) {
            Ok(id) => id.map(serenity::ChannelId::new),
            Err(e) => {
                tracing::warn!(guild_id, key = key.as_str(), "Unusable setting: {}", e);
                None
            }
        }
    }

    pub fn voice_layout(&self, guild_id: u64) -> Option<VoiceLayout> {
        Some(VoiceLayout {
            trigger_channel_id: self.channel_setting(guild_id, ConfigKey::VoiceTrigger)?.get(),
            category_id: self.channel_setting(guild_id, ConfigKey::VoiceCategory)?.get(),
        })
    }

    /// Post to the guild's log channel, if one is set. Failures are only logged.
    pub async fn send_log(
        &self,
        http: &serenity::Http,
        guild_id: u64,
        embed: serenity::CreateEmbed,
    ) {
        let Some(channel) = self.channel_setting(guild_id, ConfigKey::LogChannel) else {
            return;
        };
        if let Err(e) = channel
            .send_message(http, serenity::CreateMessage::new().embed(embed))
            .await
        {
            tracing::warn!(guild_id, "Failed to write to log channel: {}", e);
        }
    }
}

pub fn guild_id(ctx: &Context<'_>) -> Result<u64, Error> {
    Ok(ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get())
}

pub async fn is_admin(ctx: &Context<'_>) -> bool {
    if ctx.data().bot.is_owner(ctx.author().id.get()) {
        return true;
    }
    ctx.author_member()
        .await
        .and_then(|member| member.permissions)
        .map(|p| p.administrator())
        .unwrap_or(false)
}

/// Moderators (manage messages), admins, and the configured bot owner.
pub fn interaction_is_staff(data: &Data, mci: &serenity::ComponentInteraction) -> bool {
    data.bot.is_owner(mci.user.id.get())
        || mci
            .member
            .as_ref()
            .and_then(|member| member.permissions)
            .map(|p| p.administrator() || p.manage_messages())
            .unwrap_or(false)
}

/// Best display name from the cache, falling back to a mention.
pub fn display_name_cached(ctx: &serenity::Context, guild_id: u64, user_id: u64) -> String {
    let user_id_s = serenity::UserId::new(user_id);

    if let Some(guild) = ctx.cache.guild(serenity::GuildId::new(guild_id)) {
        if let Some(member) = guild.members.get(&user_id_s) {
            return member.display_name().to_string();
        }
    }

    if let Some(user) = ctx.cache.user(user_id_s) {
        return user.name.clone();
    }

    format!("<@{}>", user_id)
}
