// Temporary voice rooms: creation from the trigger channel, cleanup, and
// the `/voice` controls for room owners.

use crate::core::voice::{is_managed_room, validate_limit, validate_name, TriggerAction, VoiceError};
use crate::discord::bot_data::{guild_id, is_admin};
use crate::discord::embeds;
use crate::discord::{Context, Data, Error};
use poise::serenity_prelude as serenity;
use std::collections::HashSet;
use std::time::Duration;

const EMPTY_ROOM_GRACE: Duration = Duration::from_secs(5);

fn owner_overwrite(user: serenity::UserId) -> serenity::PermissionOverwrite {
    serenity::PermissionOverwrite {
        allow: serenity::Permissions::MANAGE_CHANNELS
            | serenity::Permissions::MOVE_MEMBERS
            | serenity::Permissions::CONNECT,
        deny: serenity::Permissions::empty(),
        kind: serenity::PermissionOverwriteType::Member(user),
    }
}

fn everyone(guild: serenity::GuildId) -> serenity::PermissionOverwriteType {
    serenity::PermissionOverwriteType::Role(serenity::RoleId::new(guild.get()))
}

/// The voice channel a member is sitting in, according to the cache.
fn voice_channel_of(
    ctx: &serenity::Context,
    guild: serenity::GuildId,
    user: serenity::UserId,
) -> Option<serenity::ChannelId> {
    ctx.cache.guild(guild)?.voice_states.get(&user)?.channel_id
}

fn occupants(
    ctx: &serenity::Context,
    guild: serenity::GuildId,
    channel: serenity::ChannelId,
) -> Vec<serenity::UserId> {
    ctx.cache
        .guild(guild)
        .map(|g| {
            g.voice_states
                .values()
                .filter(|state| state.channel_id == Some(channel))
                .map(|state| state.user_id)
                .collect()
        })
        .unwrap_or_default()
}

fn parent_of(
    ctx: &serenity::Context,
    guild: serenity::GuildId,
    channel: serenity::ChannelId,
) -> Option<u64> {
    ctx.cache
        .guild(guild)?
        .channels
        .get(&channel)?
        .parent_id
        .map(|p| p.get())
}

/// Manage your private voice room
#[poise::command(
    slash_command,
    guild_only,
    subcommands("lock", "unlock", "limit", "rename", "claim", "panel")
)]
pub async fn voice(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// The room the author is in, if they may manage it. Replies on refusal.
async fn managed_room(ctx: Context<'_>) -> Result<Option<serenity::ChannelId>, Error> {
    let guild = serenity::GuildId::new(guild_id(&ctx)?);
    let Some(channel) = voice_channel_of(ctx.serenity_context(), guild, ctx.author().id) else {
        ctx.send(embeds::private(embeds::error("Join your voice room first.")))
            .await?;
        return Ok(None);
    };

    let admin = is_admin(&ctx).await;
    match ctx
        .data()
        .voice
        .authorize(channel.get(), ctx.author().id.get(), admin)
        .await
    {
        Ok(_) => Ok(Some(channel)),
        Err(e @ (VoiceError::NotARoom | VoiceError::NotOwner)) => {
            ctx.send(embeds::private(embeds::error(e.to_string())))
                .await?;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Stop anyone new from joining
#[poise::command(slash_command, guild_only)]
pub async fn lock(ctx: Context<'_>) -> Result<(), Error> {
    let Some(channel) = managed_room(ctx).await? else {
        return Ok(());
    };
    let guild = serenity::GuildId::new(guild_id(&ctx)?);

    channel
        .create_permission(
            ctx,
            serenity::PermissionOverwrite {
                allow: serenity::Permissions::empty(),
                deny: serenity::Permissions::CONNECT,
                kind: everyone(guild),
            },
        )
        .await?;

    ctx.send(embeds::private(embeds::success("🔒 Locked", "Nobody else can join.")))
        .await?;
    Ok(())
}

/// Let everyone join again
#[poise::command(slash_command, guild_only)]
pub async fn unlock(ctx: Context<'_>) -> Result<(), Error> {
    let Some(channel) = managed_room(ctx).await? else {
        return Ok(());
    };
    let guild = serenity::GuildId::new(guild_id(&ctx)?);

    channel.delete_permission(ctx, everyone(guild)).await?;

    ctx.send(embeds::private(embeds::success("🔓 Unlocked", "Anyone can join now.")))
        .await?;
    Ok(())
}

/// Set how many people fit in the room (0 for no limit)
#[poise::command(slash_command, guild_only)]
pub async fn limit(
    ctx: Context<'_>,
    #[description = "Maximum members, 0 to 99"] limit: u32,
) -> Result<(), Error> {
    let limit = match validate_limit(limit) {
        Ok(limit) => limit,
        Err(e) => {
            ctx.send(embeds::private(embeds::error(e.to_string())))
                .await?;
            return Ok(());
        }
    };
    let Some(channel) = managed_room(ctx).await? else {
        return Ok(());
    };

    channel
        .edit(ctx, serenity::EditChannel::new().user_limit(limit))
        .await?;

    let text = if limit == 0 {
        "The room has no member limit.".to_string()
    } else {
        format!("At most **{}** members can join.", limit)
    };
    ctx.send(embeds::private(embeds::success("👥 Limit updated", text)))
        .await?;
    Ok(())
}

/// Give the room a new name
#[poise::command(slash_command, guild_only)]
pub async fn rename(
    ctx: Context<'_>,
    #[description = "New room name"] name: String,
) -> Result<(), Error> {
    let name = match validate_name(&name) {
        Ok(name) => name.to_string(),
        Err(e) => {
            ctx.send(embeds::private(embeds::error(e.to_string())))
                .await?;
            return Ok(());
        }
    };
    let Some(channel) = managed_room(ctx).await? else {
        return Ok(());
    };

    channel
        .edit(ctx, serenity::EditChannel::new().name(&name))
        .await?;

    ctx.send(embeds::private(embeds::success(
        "✏️ Renamed",
        format!("The room is now called **{}**.", name),
    )))
    .await?;
    Ok(())
}

/// Take over a room whose owner has left
#[poise::command(slash_command, guild_only)]
pub async fn claim(ctx: Context<'_>) -> Result<(), Error> {
    let guild = serenity::GuildId::new(guild_id(&ctx)?);
    let author = ctx.author().id;
    let Some(channel) = voice_channel_of(ctx.serenity_context(), guild, author) else {
        ctx.send(embeds::private(embeds::error("Join the voice room first.")))
            .await?;
        return Ok(());
    };

    let present = occupants(ctx.serenity_context(), guild, channel);
    let owner = ctx.data().voice.owner_of(channel.get()).await?;
    let owner_present = owner.is_some_and(|o| present.iter().any(|u| u.get() == o));

    match ctx
        .data()
        .voice
        .claim(channel.get(), author.get(), owner_present)
        .await
    {
        Ok(previous) => {
            channel
                .delete_permission(
                    ctx,
                    serenity::PermissionOverwriteType::Member(serenity::UserId::new(previous)),
                )
                .await?;
            channel.create_permission(ctx, owner_overwrite(author)).await?;
            ctx.send(poise::CreateReply::default().embed(embeds::success(
                "👑 Room claimed",
                format!("<@{}> now owns this room.", author),
            )))
            .await?;
        }
        Err(e @ (VoiceError::NotARoom | VoiceError::AlreadyOwner | VoiceError::OwnerPresent)) => {
            ctx.send(embeds::private(embeds::error(e.to_string())))
                .await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Show who owns your room and who is in it
#[poise::command(slash_command, guild_only)]
pub async fn panel(ctx: Context<'_>) -> Result<(), Error> {
    let guild = serenity::GuildId::new(guild_id(&ctx)?);
    let Some(channel) = voice_channel_of(ctx.serenity_context(), guild, ctx.author().id) else {
        ctx.send(embeds::private(embeds::error("Join a voice room first.")))
            .await?;
        return Ok(());
    };
    let Some(owner) = ctx.data().voice.owner_of(channel.get()).await? else {
        ctx.send(embeds::private(embeds::error(VoiceError::NotARoom.to_string())))
            .await?;
        return Ok(());
    };

    let members = occupants(ctx.serenity_context(), guild, channel);
    let member_list = members
        .iter()
        .map(|u| format!("<@{}>", u))
        .collect::<Vec<_>>()
        .join(", ");

    let embed = embeds::info("🎛️ Voice Room", format!("<#{}>", channel))
        .field("Owner", format!("<@{}>", owner), true)
        .field("Members", members.len().to_string(), true)
        .field("Inside", member_list, false)
        .footer(serenity::CreateEmbedFooter::new(
            "/voice lock · unlock · limit · rename · claim",
        ));

    ctx.send(embeds::private(embed)).await?;
    Ok(())
}

async fn create_room(
    ctx: &serenity::Context,
    data: &Data,
    guild: serenity::GuildId,
    category: u64,
    user: serenity::UserId,
    display_name: &str,
) -> Result<(), Error> {
    let occupied: HashSet<u64> = ctx
        .cache
        .guild(guild)
        .map(|g| {
            g.voice_states
                .values()
                .filter_map(|state| state.channel_id.map(|c| c.get()))
                .collect()
        })
        .unwrap_or_default();

    let action = data
        .voice
        .on_trigger_join(user.get(), display_name, |id| occupied.contains(&id))
        .await?;

    let target = match action {
        TriggerAction::MoveToExisting { channel_id } => serenity::ChannelId::new(channel_id),
        TriggerAction::CreateRoom { name } => {
            let room = guild
                .create_channel(
                    ctx,
                    serenity::CreateChannel::new(name)
                        .kind(serenity::ChannelType::Voice)
                        .category(serenity::ChannelId::new(category))
                        .permissions(vec![owner_overwrite(user)]),
                )
                .await?;
            data.voice.register_room(room.id.get(), user.get()).await?;
            room.id
        }
    };

    guild.move_member(ctx, user, target).await?;
    Ok(())
}

async fn cleanup_room(
    ctx: &serenity::Context,
    data: &Data,
    guild: serenity::GuildId,
    channel: serenity::ChannelId,
) -> Result<(), Error> {
    if data.voice.owner_of(channel.get()).await?.is_none() {
        return Ok(());
    }
    if !occupants(ctx, guild, channel).is_empty() {
        return Ok(());
    }

    // Someone may rejoin right away.
    tokio::time::sleep(EMPTY_ROOM_GRACE).await;
    if !occupants(ctx, guild, channel).is_empty() {
        return Ok(());
    }

    if let Err(e) = channel.delete(ctx).await {
        tracing::warn!(channel_id = channel.get(), "Could not delete empty room: {}", e);
    }
    data.voice.release_room(channel.get()).await?;
    Ok(())
}

pub async fn handle_voice_state_update(
    ctx: &serenity::Context,
    data: &Data,
    old: Option<&serenity::VoiceState>,
    new: &serenity::VoiceState,
) -> Result<(), Error> {
    let Some(guild) = new.guild_id else {
        return Ok(());
    };
    let Some(layout) = data.voice_layout(guild.get()) else {
        return Ok(());
    };

    let left = old.and_then(|state| state.channel_id);
    if left == new.channel_id {
        return Ok(());
    }

    if new.channel_id.map(|c| c.get()) == Some(layout.trigger_channel_id) {
        let display_name = new
            .member
            .as_ref()
            .map(|m| m.display_name().to_string())
            .unwrap_or_else(|| new.user_id.to_string());
        create_room(ctx, data, guild, layout.category_id, new.user_id, &display_name).await?;
    }

    if let Some(left) = left {
        if is_managed_room(&layout, left.get(), parent_of(ctx, guild, left)) {
            cleanup_room(ctx, data, guild, left).await?;
        }
    }
    Ok(())
}
