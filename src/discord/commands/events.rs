// Treasure chests: spawning, the join button, and the background loops.

use crate::core::events::{ChestSpec, JoinOutcome};
use crate::core::settings::ConfigKey;
use crate::discord::embeds::{self, format_number};
use crate::discord::{Context, Data, Error};
use poise::serenity_prelude as serenity;

pub const JOIN_BUTTON: &str = "chest_join";

fn chest_embed(spec: ChestSpec, joined: usize) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title("🎁 A treasure chest appeared!")
        .description(format!(
            "It takes **{}** adventurers to open it.\nEveryone who helps gets **{}** 🪙.",
            spec.required_users,
            format_number(spec.reward)
        ))
        .field(
            "Adventurers",
            format!("{}/{}", joined, spec.required_users),
            true,
        )
        .color(embeds::GOLD)
}

fn join_row(disabled: bool) -> Vec<serenity::CreateActionRow> {
    vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(JOIN_BUTTON)
            .label("Join")
            .emoji('🗝')
            .style(serenity::ButtonStyle::Success)
            .disabled(disabled),
    ])]
}

/// Post a chest in `channel` and start tracking it.
pub async fn spawn_chest(
    http: &serenity::Http,
    data: &Data,
    channel: serenity::ChannelId,
) -> Result<(), Error> {
    let spec = data.events.roll_chest();
    let message = channel
        .send_message(
            http,
            serenity::CreateMessage::new()
                .embed(chest_embed(spec, 0))
                .components(join_row(false)),
        )
        .await?;
    data.events
        .register_chest(message.id.get(), channel.get(), spec)
        .await?;
    Ok(())
}

/// Spawn a chest right here
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn testevent(ctx: Context<'_>) -> Result<(), Error> {
    spawn_chest(ctx.http(), ctx.data(), ctx.channel_id()).await?;
    ctx.send(embeds::private(embeds::success(
        "🎁 Chest spawned",
        "A test chest is waiting for adventurers.",
    )))
    .await?;
    Ok(())
}

fn events_channel(
    ctx: &serenity::Context,
    data: &Data,
    guild: serenity::GuildId,
) -> Option<serenity::ChannelId> {
    if let Some(channel) = data.channel_setting(guild.get(), ConfigKey::EventsChannel) {
        return Some(channel);
    }
    let name = &data.bot.events_channel_name;
    ctx.cache.guild(guild).and_then(|g| {
        g.channels
            .values()
            .find(|c| &c.name == name && c.kind == serenity::ChannelType::Text)
            .map(|c| c.id)
    })
}

/// Drop a chest into every guild's events channel, forever, at random intervals.
pub async fn run_chest_spawner(ctx: serenity::Context, data: Data) {
    loop {
        tokio::time::sleep(data.events.next_spawn_delay()).await;

        for guild in ctx.cache.guilds() {
            let Some(channel) = events_channel(&ctx, &data, guild) else {
                continue;
            };
            if let Err(e) = spawn_chest(&ctx.http, &data, channel).await {
                tracing::warn!(guild_id = guild.get(), "Failed to spawn chest: {}", e);
            }
        }
    }
}

/// Periodic housekeeping for chests and other in-memory state.
pub async fn run_stale_cleanup(data: Data) {
    let mut interval = tokio::time::interval(data.events.config().cleanup_interval);
    loop {
        interval.tick().await;
        if let Err(e) = data.events.cleanup_stale().await {
            tracing::error!("Chest cleanup failed: {}", e);
        }
        match data.anti_spam.cleanup().await {
            Ok(removed) if removed > 0 => tracing::debug!(removed, "Old spam history cleared"),
            Ok(_) => {}
            Err(e) => tracing::error!("Spam history cleanup failed: {}", e),
        }

        let pruned = data.economy.prune_cooldowns()
            + data.leveling.prune_cooldowns()
            + data.casino.prune_cooldowns();
        if pruned > 0 {
            tracing::debug!(pruned, "Expired cooldowns pruned");
        }
    }
}

async fn respond(
    ctx: &serenity::Context,
    mci: &serenity::ComponentInteraction,
    embed: serenity::CreateEmbed,
) -> Result<(), Error> {
    mci.create_response(
        ctx,
        serenity::CreateInteractionResponse::Message(
            serenity::CreateInteractionResponseMessage::new()
                .embed(embed)
                .ephemeral(true),
        ),
    )
    .await?;
    Ok(())
}

async fn disable_button(ctx: &serenity::Context, mci: &serenity::ComponentInteraction) {
    let edit = serenity::EditMessage::new().components(join_row(true));
    if let Err(e) = mci.channel_id.edit_message(ctx, mci.message.id, edit).await {
        tracing::debug!(message_id = mci.message.id.get(), "Could not disable chest: {}", e);
    }
}

pub async fn handle_chest_join(
    ctx: &serenity::Context,
    data: &Data,
    mci: &serenity::ComponentInteraction,
) -> Result<(), Error> {
    let message_id = mci.message.id.get();
    let outcome = data.events.join(message_id, mci.user.id.get()).await?;

    match outcome {
        JoinOutcome::NotFound | JoinOutcome::Full => {
            respond(ctx, mci, embeds::error("This chest has already been opened.")).await?;
            disable_button(ctx, mci).await;
        }
        JoinOutcome::AlreadyJoined { current, required } => {
            respond(
                ctx,
                mci,
                embeds::warning(
                    "Already in",
                    format!("You're already waiting at this chest ({}/{}).", current, required),
                ),
            )
            .await?;
        }
        JoinOutcome::Joined { current, required } => {
            respond(
                ctx,
                mci,
                embeds::success(
                    "🗝 Joined",
                    format!("You joined the chest! ({}/{})", current, required),
                ),
            )
            .await?;

            if let Some(event) = data.events.get(message_id).await? {
                let spec = ChestSpec {
                    required_users: event.required_users,
                    reward: event.reward,
                };
                let edit = serenity::EditMessage::new().embed(chest_embed(spec, current));
                if let Err(e) = mci.channel_id.edit_message(ctx, mci.message.id, edit).await {
                    tracing::debug!(message_id, "Could not update chest counter: {}", e);
                }
            }
        }
        JoinOutcome::Completed {
            participants,
            reward,
        } => {
            let winners = participants
                .iter()
                .map(|id| format!("<@{}>", id))
                .collect::<Vec<_>>()
                .join(", ");
            let opened = serenity::CreateEmbed::new()
                .title("🎉 The chest is open!")
                .description(format!(
                    "{} each received **{}** 🪙.",
                    winners,
                    format_number(reward)
                ))
                .color(embeds::SUCCESS);

            mci.create_response(
                ctx,
                serenity::CreateInteractionResponse::UpdateMessage(
                    serenity::CreateInteractionResponseMessage::new()
                        .embed(opened)
                        .components(join_row(true)),
                ),
            )
            .await?;
        }
    }
    Ok(())
}
