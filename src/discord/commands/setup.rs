// Server setup and per-guild configuration commands.

use crate::core::settings::ConfigKey;
use crate::discord::bot_data::guild_id;
use crate::discord::confirm::confirm;
use crate::discord::embeds;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;
use std::collections::HashMap;

const TICKET_CATEGORY: &str = "🎫 Tickets";
const VOICE_CATEGORY: &str = "🔊 Voice Rooms";
const VOICE_TRIGGER: &str = "➕ Create Room";
const LOG_CHANNEL: &str = "📋・logs";
const WELCOME_CHANNEL: &str = "👋・welcome";

type Channels = HashMap<serenity::ChannelId, serenity::GuildChannel>;

/// Reuse a channel with this exact name and kind, or create it.
async fn find_or_create(
    ctx: Context<'_>,
    guild: serenity::GuildId,
    channels: &Channels,
    name: &str,
    kind: serenity::ChannelType,
    parent: Option<serenity::ChannelId>,
    staff_only: bool,
) -> Result<(serenity::ChannelId, bool), Error> {
    if let Some(existing) = channels.values().find(|c| c.name == name && c.kind == kind) {
        return Ok((existing.id, false));
    }

    let mut builder = serenity::CreateChannel::new(name).kind(kind);
    if let Some(parent) = parent {
        builder = builder.category(parent);
    }
    if staff_only {
        builder = builder.permissions(vec![serenity::PermissionOverwrite {
            allow: serenity::Permissions::empty(),
            deny: serenity::Permissions::VIEW_CHANNEL,
            kind: serenity::PermissionOverwriteType::Role(serenity::RoleId::new(guild.get())),
        }]);
    }

    let created = guild.create_channel(ctx, builder).await?;
    tracing::info!(guild_id = guild.get(), channel = name, "Created channel during setup");
    Ok((created.id, true))
}

/// Create (or reuse) every channel the bot needs and remember them
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn setupserver(ctx: Context<'_>) -> Result<(), Error> {
    let guild = ctx.guild_id().ok_or("This command only works in servers")?;
    ctx.defer().await?;

    let channels = guild.channels(ctx).await?;
    let events_name = ctx.data().bot.events_channel_name.clone();
    let settings = &ctx.data().settings;

    use serenity::ChannelType::{Category, Text, Voice};

    let (ticket_category, t_new) =
        find_or_create(ctx, guild, &channels, TICKET_CATEGORY, Category, None, false).await?;
    let (voice_category, vc_new) =
        find_or_create(ctx, guild, &channels, VOICE_CATEGORY, Category, None, false).await?;
    let (trigger, tr_new) = find_or_create(
        ctx,
        guild,
        &channels,
        VOICE_TRIGGER,
        Voice,
        Some(voice_category),
        false,
    )
    .await?;
    let (log, log_new) =
        find_or_create(ctx, guild, &channels, LOG_CHANNEL, Text, None, true).await?;
    let (welcome, w_new) =
        find_or_create(ctx, guild, &channels, WELCOME_CHANNEL, Text, None, false).await?;
    let (events, e_new) =
        find_or_create(ctx, guild, &channels, &events_name, Text, None, false).await?;

    let results = [
        (ConfigKey::TicketCategory, ticket_category, t_new),
        (ConfigKey::VoiceCategory, voice_category, vc_new),
        (ConfigKey::VoiceTrigger, trigger, tr_new),
        (ConfigKey::LogChannel, log, log_new),
        (ConfigKey::WelcomeChannel, welcome, w_new),
        (ConfigKey::EventsChannel, events, e_new),
    ];

    let mut lines = Vec::new();
    for (key, channel, created) in results {
        settings.set_id(guild.get(), key, channel.get()).await?;
        let status = if created { "created" } else { "found" };
        lines.push(format!("**{}**: <#{}> ({})", key.label(), channel, status));
    }

    ctx.send(poise::CreateReply::default().embed(embeds::success(
        "🛠️ Server setup complete",
        lines.join("\n"),
    )))
    .await?;
    Ok(())
}

/// View or manage this server's bot settings
#[poise::command(
    slash_command,
    guild_only,
    subcommands("show", "reload", "reset"),
    required_permissions = "ADMINISTRATOR"
)]
pub async fn config(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Show the current settings
#[poise::command(slash_command, guild_only)]
pub async fn show(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;
    let snapshot = ctx.data().settings.snapshot(guild_id)?;

    let lines: Vec<String> = snapshot
        .into_iter()
        .map(|(key, value)| match value {
            Some(id) => format!("**{}**: <#{}>", key.label(), id),
            None => format!("**{}**: not set", key.label()),
        })
        .collect();

    ctx.send(embeds::private(embeds::info(
        "⚙️ Server settings",
        lines.join("\n"),
    )))
    .await?;
    Ok(())
}

/// Re-read settings from the database
#[poise::command(slash_command, guild_only)]
pub async fn reload(ctx: Context<'_>) -> Result<(), Error> {
    let count = ctx.data().settings.reload().await?;
    ctx.send(embeds::private(embeds::success(
        "🔄 Settings reloaded",
        format!("Loaded **{}** entries.", count),
    )))
    .await?;
    Ok(())
}

/// Forget every setting for this server
#[poise::command(slash_command, guild_only)]
pub async fn reset(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;
    let prompt = embeds::warning(
        "Reset settings?",
        "Every configured channel will be forgotten. Channels themselves are not deleted.",
    );
    if !confirm(ctx, prompt).await? {
        return Ok(());
    }

    let removed = ctx.data().settings.reset(guild_id).await?;
    ctx.send(embeds::private(embeds::success(
        "🧽 Settings reset",
        format!("Removed **{}** settings.", removed),
    )))
    .await?;
    Ok(())
}

async fn set_channel(
    ctx: Context<'_>,
    key: ConfigKey,
    channel: serenity::GuildChannel,
) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;
    ctx.data()
        .settings
        .set_id(guild_id, key, channel.id.get())
        .await?;
    ctx.send(embeds::private(embeds::success(
        "✅ Saved",
        format!("**{}** is now <#{}>.", key.label(), channel.id),
    )))
    .await?;
    Ok(())
}

/// Choose where moderation logs go
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn setlog(
    ctx: Context<'_>,
    #[description = "Log channel"]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
) -> Result<(), Error> {
    set_channel(ctx, ConfigKey::LogChannel, channel).await
}

/// Choose where new members are greeted
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn setwelcome(
    ctx: Context<'_>,
    #[description = "Welcome channel"]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
) -> Result<(), Error> {
    set_channel(ctx, ConfigKey::WelcomeChannel, channel).await
}

/// Choose where treasure chests appear
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn setevents(
    ctx: Context<'_>,
    #[description = "Events channel"]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
) -> Result<(), Error> {
    set_channel(ctx, ConfigKey::EventsChannel, channel).await
}
