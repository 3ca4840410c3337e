// Non-command Discord events, routed to the feature that owns them.

use crate::core::leveling::LevelingError;
use crate::discord::commands::{events, invites, roles, tickets, voice, welcome};
use crate::discord::leveling_announcements::send_level_up_embed;
use crate::discord::spam_handler::handle_message_for_spam;
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

async fn on_message(
    ctx: &serenity::Context,
    data: &Data,
    message: &serenity::Message,
) -> Result<(), Error> {
    // Ignore bots (including ourselves) and DMs
    if message.author.bot || message.guild_id.is_none() {
        return Ok(());
    }

    // Spam earns no XP.
    if handle_message_for_spam(ctx, data, message).await? {
        return Ok(());
    }

    match data.leveling.process_message(message.author.id.get()).await {
        Ok(Some(level_up)) => {
            tracing::info!(
                user_id = level_up.user_id,
                old_level = level_up.old_level,
                new_level = level_up.new_level,
                total_xp = level_up.total_xp,
                "User leveled up"
            );
            if let Err(err) = send_level_up_embed(ctx, message, &level_up).await {
                tracing::warn!("Failed to send level-up embed: {err}");
            }
        }
        Ok(None) => {}
        // Spoke too recently; nothing to award.
        Err(LevelingError::OnCooldown(_)) => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn on_component(
    ctx: &serenity::Context,
    data: &Data,
    mci: &serenity::ComponentInteraction,
) -> Result<(), Error> {
    let custom_id = mci.data.custom_id.as_str();
    match custom_id {
        events::JOIN_BUTTON => events::handle_chest_join(ctx, data, mci).await,
        tickets::CREATE_BUTTON => tickets::handle_create(ctx, data, mci).await,
        tickets::CLOSE_BUTTON => tickets::handle_close(ctx, data, mci).await,
        id if id.starts_with(roles::BUTTON_PREFIX) => roles::handle_role_button(ctx, data, mci).await,
        // Confirm prompts and other collectors handle their own buttons.
        _ => Ok(()),
    }
}

/// Event handler for non-command Discord events.
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    let result = match event {
        serenity::FullEvent::Message { new_message } => on_message(ctx, data, new_message).await,
        serenity::FullEvent::MessageDelete {
            deleted_message_id, ..
        } => {
            // A deleted chest message can no longer be completed.
            match data.events.discard(deleted_message_id.get()).await {
                Ok(_) => Ok(()),
                Err(e) => Err(e.into()),
            }
        }
        serenity::FullEvent::GuildCreate { guild, .. } => {
            invites::snapshot_guild(&ctx.http, data, guild.id).await;
            Ok(())
        }
        serenity::FullEvent::GuildDelete { incomplete, .. } => {
            // Unavailable guilds come back; only forget ones we left.
            if !incomplete.unavailable {
                data.invites.forget(incomplete.id.get());
            }
            Ok(())
        }
        serenity::FullEvent::InviteCreate { data: invite } => {
            if let Some(guild_id) = invite.guild_id {
                invites::snapshot_guild(&ctx.http, data, guild_id).await;
            }
            Ok(())
        }
        serenity::FullEvent::InviteDelete { data: invite } => {
            if let Some(guild_id) = invite.guild_id {
                invites::snapshot_guild(&ctx.http, data, guild_id).await;
            }
            Ok(())
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            welcome::handle_member_join(ctx, data, new_member).await
        }
        serenity::FullEvent::GuildMemberRemoval { guild_id, user, .. } => {
            welcome::handle_member_remove(ctx, data, *guild_id, user).await
        }
        serenity::FullEvent::VoiceStateUpdate { old, new } => {
            voice::handle_voice_state_update(ctx, data, old.as_ref(), new).await
        }
        serenity::FullEvent::InteractionCreate {
            interaction: serenity::Interaction::Component(mci),
        } => on_component(ctx, data, mci).await,
        _ => Ok(()),
    };

    // Handler errors are logged here, never propagated.
    if let Err(e) = result {
        tracing::error!(event = event.snake_case_name(), "Event handler failed: {}", e);
    }
    Ok(())
}
