// Moderation slash commands: warnings, kicks, bans, channel tools and the
// anti-spam settings.

use crate::core::moderation::{check_hierarchy, ModerationError, SpamConfig, WarnRecord};
use crate::discord::bot_data::guild_id;
use crate::discord::confirm::confirm;
use crate::discord::embeds;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

const BULK_DELETE_MAX_AGE_DAYS: i64 = 14;

/// Refuse to act on members whose top role is not below the moderator's.
async fn ensure_outranks(ctx: Context<'_>, target: &serenity::Member) -> Result<(), Error> {
    let author = ctx.author_member().await.ok_or("Could not load your member data")?;

    // The cache guard can't be held across an await, so read everything at once.
    let (mod_position, target_position, is_owner) = {
        let guild = ctx.guild().ok_or("This server isn't cached yet")?;
        let position = |member: &serenity::Member| {
            guild
                .member_highest_role(member)
                .map(|role| role.position)
                .unwrap_or(0)
        };
        (
            position(&*author),
            position(target),
            guild.owner_id == ctx.author().id,
        )
    };

    check_hierarchy(mod_position, target_position, is_owner)?;
    Ok(())
}

/// Tell the member what happened. They may have DMs closed, which is fine.
async fn notify(ctx: Context<'_>, user: &serenity::User, embed: serenity::CreateEmbed) {
    if let Err(e) = user
        .direct_message(ctx, serenity::CreateMessage::new().embed(embed))
        .await
    {
        tracing::debug!(user_id = user.id.get(), "Could not DM member: {}", e);
    }
}

fn describe_warn(warn: &WarnRecord) -> String {
    format!(
        "**#{}** <t:{}:d> by <@{}>\n{}",
        warn.id,
        warn.created_at.timestamp(),
        warn.moderator_id,
        warn.reason
    )
}

/// Warn a member
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn warn(
    ctx: Context<'_>,
    #[description = "Member to warn"] user: serenity::User,
    #[description = "Why"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;
    if user.bot {
        ctx.send(embeds::private(embeds::error("Bots can't be warned.")))
            .await?;
        return Ok(());
    }

    let outcome = match ctx
        .data()
        .moderation
        .warn(user.id.get(), ctx.author().id.get(), reason.as_deref())
        .await
    {
        Ok(outcome) => outcome,
        Err(e @ ModerationError::SelfTarget) => {
            ctx.send(embeds::private(embeds::error(e.to_string())))
                .await?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let mut embed = embeds::warning(
        "⚠️ Warning issued",
        format!("<@{}> has been warned.", user.id),
    )
    .field("Reason", &outcome.record.reason, false)
    .field(
        "Warnings",
        format!("{}/{}", outcome.total, outcome.max_warns),
        true,
    )
    .field("Moderator", format!("<@{}>", ctx.author().id), true);

    if outcome.limit_reached() {
        embed = embed.field(
            "🚨 Limit reached",
            "This member has hit the warning limit. Consider `/ban`.",
            false,
        );
    }

    ctx.send(poise::CreateReply::default().embed(embed.clone()))
        .await?;

    let guild_name = ctx
        .guild()
        .map(|g| g.name.clone())
        .unwrap_or_else(|| "the server".to_string());
    notify(
        ctx,
        &user,
        embeds::warning(
            format!("⚠️ You were warned in {}", guild_name),
            format!(
                "**Reason:** {}\n**Warnings:** {}/{}",
                outcome.record.reason, outcome.total, outcome.max_warns
            ),
        ),
    )
    .await;

    ctx.data()
        .send_log(ctx.http(), guild_id, embed)
        .await;
    Ok(())
}

/// List a member's warnings
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn warns(
    ctx: Context<'_>,
    #[description = "Member to check (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let target = user.as_ref().unwrap_or_else(|| ctx.author());
    let warns = ctx.data().moderation.warns(target.id.get()).await?;
    let max = ctx.data().moderation.config().max_warns;

    let description = if warns.is_empty() {
        "No warnings. ✨".to_string()
    } else {
        warns.iter().map(describe_warn).collect::<Vec<_>>().join("\n\n")
    };

    let embed = embeds::info(
        format!("📋 Warnings for {} ({}/{})", target.name, warns.len(), max),
        description,
    );
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Remove a single warning by its id
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn delwarn(
    ctx: Context<'_>,
    #[description = "Warning id (see /warns)"] id: i64,
) -> Result<(), Error> {
    if ctx.data().moderation.remove_warn(id).await? {
        ctx.send(poise::CreateReply::default().embed(embeds::success(
            "✅ Warning removed",
            format!("Warning **#{}** was deleted.", id),
        )))
        .await?;
    } else {
        ctx.send(embeds::private(embeds::error(format!(
            "There is no warning with id **#{}**.",
            id
        ))))
        .await?;
    }
    Ok(())
}

/// Remove every warning a member has
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn clearwarns(
    ctx: Context<'_>,
    #[description = "Member to clear"] user: serenity::User,
) -> Result<(), Error> {
    let prompt = embeds::warning(
        "Clear warnings?",
        format!("All warnings for <@{}> will be deleted.", user.id),
    );
    if !confirm(ctx, prompt).await? {
        return Ok(());
    }

    let removed = ctx.data().moderation.clear_warns(user.id.get()).await?;
    ctx.send(poise::CreateReply::default().embed(embeds::success(
        "✅ Warnings cleared",
        format!("Removed **{}** warnings from <@{}>.", removed, user.id),
    )))
    .await?;
    Ok(())
}

/// Kick a member
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "KICK_MEMBERS",
    required_bot_permissions = "KICK_MEMBERS"
)]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "Member to kick"] user: serenity::User,
    #[description = "Why"] reason: Option<String>,
) -> Result<(), Error> {
    let guild = ctx.guild_id().ok_or("This command only works in servers")?;
    let reason = reason.unwrap_or_else(|| ctx.data().moderation.config().default_reason.to_string());

    if user.id == ctx.author().id {
        ctx.send(embeds::private(embeds::error("You can't kick yourself.")))
            .await?;
        return Ok(());
    }
    let member = guild.member(ctx, user.id).await?;
    if let Err(e) = ensure_outranks(ctx, &member).await {
        ctx.send(embeds::private(embeds::error(e.to_string())))
            .await?;
        return Ok(());
    }

    let prompt = embeds::warning(
        "Kick member?",
        format!("<@{}> will be kicked.\n**Reason:** {}", user.id, reason),
    );
    if !confirm(ctx, prompt).await? {
        return Ok(());
    }

    notify(
        ctx,
        &user,
        embeds::warning("👢 You were kicked", format!("**Reason:** {}", reason)),
    )
    .await;
    guild.kick_with_reason(ctx, user.id, &reason).await?;
    tracing::info!(user_id = user.id.get(), moderator = ctx.author().id.get(), "Member kicked");

    let embed = embeds::success(
        "👢 Member kicked",
        format!("<@{}> was kicked by <@{}>.", user.id, ctx.author().id),
    )
    .field("Reason", &reason, false);
    ctx.send(poise::CreateReply::default().embed(embed.clone()))
        .await?;
    ctx.data().send_log(ctx.http(), guild.get(), embed).await;
    Ok(())
}

/// Ban a member
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "BAN_MEMBERS",
    required_bot_permissions = "BAN_MEMBERS"
)]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "Member to ban"] user: serenity::User,
    #[description = "Why"] reason: Option<String>,
    #[description = "Delete their messages from the last N days (0-7)"]
    #[min = 0]
    #[max = 7]
    delete_days: Option<u8>,
) -> Result<(), Error> {
    let guild = ctx.guild_id().ok_or("This command only works in servers")?;
    let reason = reason.unwrap_or_else(|| ctx.data().moderation.config().default_reason.to_string());

    if user.id == ctx.author().id {
        ctx.send(embeds::private(embeds::error("You can't ban yourself.")))
            .await?;
        return Ok(());
    }
    // Users who already left can still be banned; only members have roles to compare.
    if let Ok(member) = guild.member(ctx, user.id).await {
        if let Err(e) = ensure_outranks(ctx, &member).await {
            ctx.send(embeds::private(embeds::error(e.to_string())))
                .await?;
            return Ok(());
        }
    }

    let prompt = embeds::warning(
        "Ban member?",
        format!("<@{}> will be banned.\n**Reason:** {}", user.id, reason),
    );
    if !confirm(ctx, prompt).await? {
        return Ok(());
    }

    notify(
        ctx,
        &user,
        embeds::error(format!("🔨 You were banned.\n**Reason:** {}", reason)),
    )
    .await;
    guild
        .ban_with_reason(ctx, user.id, delete_days.unwrap_or(0), &reason)
        .await?;
    tracing::info!(user_id = user.id.get(), moderator = ctx.author().id.get(), "Member banned");

    let embed = embeds::success(
        "🔨 Member banned",
        format!("<@{}> was banned by <@{}>.", user.id, ctx.author().id),
    )
    .field("Reason", &reason, false);
    ctx.send(poise::CreateReply::default().embed(embed.clone()))
        .await?;
    ctx.data().send_log(ctx.http(), guild.get(), embed).await;
    Ok(())
}

/// Lift a ban
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "BAN_MEMBERS",
    required_bot_permissions = "BAN_MEMBERS"
)]
pub async fn unban(
    ctx: Context<'_>,
    #[description = "User id to unban"] user_id: String,
) -> Result<(), Error> {
    let guild = ctx.guild_id().ok_or("This command only works in servers")?;
    let Ok(id) = user_id.trim().parse::<u64>() else {
        ctx.send(embeds::private(embeds::error("That isn't a valid user id.")))
            .await?;
        return Ok(());
    };

    if let Err(e) = guild.unban(ctx, serenity::UserId::new(id)).await {
        tracing::debug!(user_id = id, "Unban failed: {}", e);
        ctx.send(embeds::private(embeds::error(
            "Couldn't unban that user. Are they actually banned?",
        )))
        .await?;
        return Ok(());
    }

    let embed = embeds::success("🔓 User unbanned", format!("<@{}> can join again.", id));
    ctx.send(poise::CreateReply::default().embed(embed.clone()))
        .await?;
    ctx.data().send_log(ctx.http(), guild.get(), embed).await;
    Ok(())
}

/// Bulk delete recent messages
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_MESSAGES",
    required_bot_permissions = "MANAGE_MESSAGES"
)]
pub async fn purge(
    ctx: Context<'_>,
    #[description = "How many messages (1-100)"] amount: u64,
) -> Result<(), Error> {
    let amount = match ctx.data().moderation.validate_purge(amount) {
        Ok(amount) => amount,
        Err(e) => {
            ctx.send(embeds::private(embeds::error(e.to_string())))
                .await?;
            return Ok(());
        }
    };

    ctx.defer_ephemeral().await?;

    let channel = ctx.channel_id();
    let cutoff = chrono::Utc::now() - chrono::Duration::days(BULK_DELETE_MAX_AGE_DAYS);
    let ids: Vec<serenity::MessageId> = channel
        .messages(ctx, serenity::GetMessages::new().limit(amount as u8))
        .await?
        .into_iter()
        // Discord refuses to bulk delete anything older than two weeks.
        .filter(|m| m.timestamp.unix_timestamp() > cutoff.timestamp())
        .map(|m| m.id)
        .collect();

    if !ids.is_empty() {
        channel.delete_messages(ctx, &ids).await?;
    }
    tracing::info!(channel_id = channel.get(), deleted = ids.len(), "Purged messages");

    ctx.send(embeds::private(embeds::success(
        "🧹 Purged",
        format!("Deleted **{}** messages.", ids.len()),
    )))
    .await?;
    Ok(())
}

/// Set the channel's slowmode
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_CHANNELS",
    required_bot_permissions = "MANAGE_CHANNELS"
)]
pub async fn slowmode(
    ctx: Context<'_>,
    #[description = "Seconds between messages (0 turns it off)"] seconds: u64,
) -> Result<(), Error> {
    let seconds = match ctx.data().moderation.validate_slowmode(seconds) {
        Ok(seconds) => seconds,
        Err(e) => {
            ctx.send(embeds::private(embeds::error(e.to_string())))
                .await?;
            return Ok(());
        }
    };

    ctx.channel_id()
        .edit(
            ctx,
            serenity::EditChannel::new().rate_limit_per_user(seconds as u16),
        )
        .await?;

    let message = if seconds == 0 {
        "Slowmode is off.".to_string()
    } else {
        format!("Members can post once every **{}** seconds.", seconds)
    };
    ctx.send(poise::CreateReply::default().embed(embeds::success("🐢 Slowmode", message)))
        .await?;
    Ok(())
}

// ============================================================================
// ANTI-SPAM
// ============================================================================

fn spam_status_embed(config: &SpamConfig) -> serenity::CreateEmbed {
    let blocked = if config.blocked_words.is_empty() {
        "None".to_string()
    } else {
        config
            .blocked_words
            .iter()
            .map(|w| format!("`{}`", w))
            .collect::<Vec<_>>()
            .join(", ")
    };

    serenity::CreateEmbed::new()
        .title("🛡️ Anti-Spam Status")
        .color(if config.enabled {
            embeds::SUCCESS
        } else {
            embeds::ERROR
        })
        .field(
            "Status",
            if config.enabled {
                "✅ Enabled"
            } else {
                "❌ Disabled"
            },
            false,
        )
        .field(
            "Rate Limit",
            format!(
                "{} messages / {} seconds\nBlock duration: {} seconds",
                config.max_messages_per_window,
                config.rate_limit_window_secs,
                config.rate_limit_block_secs
            ),
            true,
        )
        .field(
            "Duplicates",
            format!("{} identical messages", config.max_duplicate_messages),
            true,
        )
        .field(
            "Mentions",
            format!("{} per message", config.max_mentions_per_message),
            true,
        )
        .field(
            "Caps",
            format!(
                "Over {:.0}% in messages of {}+ characters",
                config.max_caps_ratio * 100.0,
                config.caps_min_length
            ),
            true,
        )
        .field("Blocked words", blocked, false)
        .field(
            "Escalation",
            format!(
                "{} warnings → {} minute timeout",
                config.warnings_before_timeout,
                config.timeout_duration_secs / 60
            ),
            false,
        )
}

/// Anti-spam settings for this server
#[poise::command(
    slash_command,
    guild_only,
    subcommands(
        "antispam_status",
        "antispam_enable",
        "antispam_disable",
        "antispam_config",
        "blockword",
        "unblockword",
        "clear_strikes"
    ),
    subcommand_required,
    required_permissions = "MANAGE_MESSAGES"
)]
pub async fn antispam(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Show the current anti-spam settings
#[poise::command(slash_command, guild_only, rename = "status")]
pub async fn antispam_status(ctx: Context<'_>) -> Result<(), Error> {
    let config = ctx.data().anti_spam.get_config(guild_id(&ctx)?).await?;
    ctx.send(poise::CreateReply::default().embed(spam_status_embed(&config)))
        .await?;
    Ok(())
}

/// Turn anti-spam on
#[poise::command(slash_command, guild_only, rename = "enable")]
pub async fn antispam_enable(ctx: Context<'_>) -> Result<(), Error> {
    ctx.data()
        .anti_spam
        .set_enabled(guild_id(&ctx)?, true)
        .await?;
    ctx.send(poise::CreateReply::default().embed(embeds::success(
        "🛡️ Anti-spam enabled",
        "Messages are being checked again.",
    )))
    .await?;
    Ok(())
}

/// Turn anti-spam off
#[poise::command(slash_command, guild_only, rename = "disable")]
pub async fn antispam_disable(ctx: Context<'_>) -> Result<(), Error> {
    ctx.data()
        .anti_spam
        .set_enabled(guild_id(&ctx)?, false)
        .await?;
    ctx.send(poise::CreateReply::default().embed(embeds::warning(
        "🛡️ Anti-spam disabled",
        "Messages are no longer checked.",
    )))
    .await?;
    Ok(())
}

/// Change anti-spam thresholds
#[allow(clippy::too_many_arguments)]
#[poise::command(slash_command, guild_only, rename = "config")]
pub async fn antispam_config(
    ctx: Context<'_>,
    #[description = "Max messages in the rate limit window (default: 5)"]
    #[min = 1]
    max_messages: Option<u32>,
    #[description = "Rate limit window in seconds (default: 5)"]
    #[min = 1]
    window_secs: Option<u64>,
    #[description = "Block after hitting the rate limit, in seconds (default: 30)"]
    block_secs: Option<u64>,
    #[description = "Identical messages allowed (default: 3)"]
    #[min = 1]
    max_duplicates: Option<u32>,
    #[description = "Mentions allowed per message (default: 5)"] max_mentions: Option<u32>,
    #[description = "Caps percentage that counts as shouting (default: 70)"]
    #[min = 1]
    #[max = 100]
    caps_percent: Option<u32>,
    #[description = "Warnings before a timeout (default: 3)"]
    #[min = 1]
    max_warnings: Option<u32>,
    #[description = "Timeout length in seconds (default: 300)"]
    #[min = 60]
    timeout_secs: Option<u64>,
) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;
    let mut config = ctx.data().anti_spam.get_config(guild_id).await?;

    if let Some(v) = max_messages {
        config.max_messages_per_window = v;
    }
    if let Some(v) = window_secs {
        config.rate_limit_window_secs = v;
    }
    if let Some(v) = block_secs {
        config.rate_limit_block_secs = v;
    }
    if let Some(v) = max_duplicates {
        config.max_duplicate_messages = v;
    }
    if let Some(v) = max_mentions {
        config.max_mentions_per_message = v;
    }
    if let Some(v) = caps_percent {
        config.max_caps_ratio = f64::from(v) / 100.0;
    }
    if let Some(v) = max_warnings {
        config.warnings_before_timeout = v;
    }
    if let Some(v) = timeout_secs {
        config.timeout_duration_secs = v;
    }

    ctx.data()
        .anti_spam
        .set_config(guild_id, config.clone())
        .await?;
    ctx.send(poise::CreateReply::default().embed(spam_status_embed(&config)))
        .await?;
    Ok(())
}

/// Remove messages containing a word
#[poise::command(slash_command, guild_only)]
pub async fn blockword(
    ctx: Context<'_>,
    #[description = "Word or phrase (case-insensitive)"] word: String,
) -> Result<(), Error> {
    let reply = if ctx.data().anti_spam.block_word(guild_id(&ctx)?, &word).await? {
        embeds::success("🚫 Word blocked", format!("Messages containing `{}` will be removed.", word.trim()))
    } else {
        embeds::warning("Nothing changed", "That word is empty or already blocked.")
    };
    ctx.send(embeds::private(reply)).await?;
    Ok(())
}

/// Allow a blocked word again
#[poise::command(slash_command, guild_only)]
pub async fn unblockword(
    ctx: Context<'_>,
    #[description = "Word or phrase to allow"] word: String,
) -> Result<(), Error> {
    let reply = if ctx.data().anti_spam.unblock_word(guild_id(&ctx)?, &word).await? {
        embeds::success("✅ Word allowed", format!("`{}` is no longer blocked.", word.trim()))
    } else {
        embeds::warning("Nothing changed", "That word wasn't blocked.")
    };
    ctx.send(embeds::private(reply)).await?;
    Ok(())
}

/// Reset a member's spam strikes (their /warns stay)
#[poise::command(slash_command, guild_only)]
pub async fn clear_strikes(
    ctx: Context<'_>,
    #[description = "Member to reset"] user: serenity::User,
) -> Result<(), Error> {
    ctx.data()
        .anti_spam
        .clear_user_warnings(user.id.get(), guild_id(&ctx)?)
        .await?;
    ctx.send(poise::CreateReply::default().embed(embeds::success(
        "✅ Strikes cleared",
        format!("<@{}> starts from zero spam strikes.", user.id),
    )))
    .await?;
    Ok(())
}
