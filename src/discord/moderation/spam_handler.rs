// Turns anti-spam verdicts into Discord actions: deleted messages, channel
// notices, timeouts, warning records and log channel entries.

use crate::core::moderation::{SpamAction, SpamCheckResult};
use crate::discord::embeds::{self, format_duration};
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

/// Check a message for spam and act on it.
///
/// Returns `true` if the message was spam and has been dealt with.
pub async fn handle_message_for_spam(
    ctx: &serenity::Context,
    data: &Data,
    msg: &serenity::Message,
) -> Result<bool, Error> {
    if msg.author.bot {
        return Ok(false);
    }
    let Some(guild_id) = msg.guild_id else {
        return Ok(false);
    };
    if is_exempt(ctx, data, msg, guild_id) {
        return Ok(false);
    }

    let mention_count = (msg.mentions.len() + msg.mention_roles.len()) as u32;
    let result = data
        .anti_spam
        .check_message(msg.author.id.get(), guild_id.get(), &msg.content, mention_count)
        .await?;

    if !result.is_spam {
        return Ok(false);
    }

    apply_spam_action(ctx, data, msg, guild_id, &result).await?;
    Ok(true)
}

/// Admins, the server owner and the bot owner are never auto-moderated.
fn is_exempt(
    ctx: &serenity::Context,
    data: &Data,
    msg: &serenity::Message,
    guild_id: serenity::GuildId,
) -> bool {
    if data.bot.is_owner(msg.author.id.get()) {
        return true;
    }
    let Some(guild) = ctx.cache.guild(guild_id) else {
        return false;
    };
    if guild.owner_id == msg.author.id {
        return true;
    }
    msg.member.as_ref().is_some_and(|member| {
        member.roles.iter().any(|role_id| {
            guild
                .roles
                .get(role_id)
                .is_some_and(|role| role.permissions.administrator())
        })
    })
}

async fn delete(ctx: &serenity::Context, msg: &serenity::Message, reason: &str) {
    if let Err(e) = msg.delete(&ctx.http).await {
        tracing::warn!(message_id = msg.id.get(), "Failed to delete spam message ({}): {}", reason, e);
    }
}

async fn say(ctx: &serenity::Context, msg: &serenity::Message, text: String) {
    if let Err(e) = msg.channel_id.say(&ctx.http, text).await {
        tracing::warn!("Failed to send spam notice: {}", e);
    }
}

/// Store the strike as a regular warning and post it to the log channel.
async fn record_warning(
    ctx: &serenity::Context,
    data: &Data,
    msg: &serenity::Message,
    guild_id: serenity::GuildId,
    title: &str,
    reason: &str,
) -> Result<(), Error> {
    let bot_id = ctx.cache.current_user().id.get();
    let outcome = data
        .moderation
        .warn(msg.author.id.get(), bot_id, Some(&format!("Auto-mod: {}", reason)))
        .await?;

    let embed = embeds::warning(title, format!("<@{}> in <#{}>", msg.author.id, msg.channel_id))
        .field("Reason", &outcome.record.reason, false)
        .field(
            "Warnings",
            format!("{}/{}", outcome.total, outcome.max_warns),
            true,
        );
    data.send_log(&ctx.http, guild_id.get(), embed).await;
    Ok(())
}

async fn apply_spam_action(
    ctx: &serenity::Context,
    data: &Data,
    msg: &serenity::Message,
    guild_id: serenity::GuildId,
    result: &SpamCheckResult,
) -> Result<(), Error> {
    match &result.action {
        SpamAction::None => {}

        SpamAction::DeleteMessage { reason } => delete(ctx, msg, reason).await,

        SpamAction::Warn {
            reason,
            warning_count,
            warnings_before_timeout,
        } => {
            delete(ctx, msg, reason).await;

            let remaining = warnings_before_timeout.saturating_sub(*warning_count);
            say(
                ctx,
                msg,
                format!(
                    "⚠️ <@{}> **Spam Warning** ({}/{}): {}\n\
                     You have {} warning{} remaining before timeout.",
                    msg.author.id,
                    warning_count,
                    warnings_before_timeout,
                    reason,
                    remaining,
                    if remaining == 1 { "" } else { "s" }
                ),
            )
            .await;

            record_warning(ctx, data, msg, guild_id, "🛡️ Auto-mod warning", reason).await?;
        }

        SpamAction::Timeout { duration, reason } => {
            delete(ctx, msg, reason).await;

            let until = serenity::Timestamp::from_unix_timestamp(
                chrono::Utc::now().timestamp() + duration.as_secs() as i64,
            )
            .map_err(|e| format!("bad timeout timestamp: {e}"))?;

            let muted = guild_id
                .edit_member(
                    &ctx.http,
                    msg.author.id,
                    serenity::EditMember::new().disable_communication_until_datetime(until),
                )
                .await;

            match muted {
                Ok(_) => {
                    say(
                        ctx,
                        msg,
                        format!(
                            "🔇 <@{}> has been timed out for {}: {}",
                            msg.author.id,
                            format_duration(*duration),
                            reason
                        ),
                    )
                    .await;
                }
                Err(e) => tracing::error!(user_id = msg.author.id.get(), "Failed to time out member: {}", e),
            }

            record_warning(ctx, data, msg, guild_id, "🔇 Auto-mod timeout", reason).await?;
        }
    }

    tracing::info!(
        user_id = msg.author.id.get(),
        guild_id = guild_id.get(),
        spam_type = %result.spam_type,
        "Spam handled"
    );
    Ok(())
}
