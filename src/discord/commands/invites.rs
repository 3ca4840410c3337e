// Invite tracking: who brought whom, and the commands to show it.

use crate::core::invites::InviteSnapshot;
use crate::discord::bot_data::{display_name_cached, guild_id};
use crate::discord::embeds::{self, format_number, rank_marker};
use crate::discord::{Context, Data, Error};
use poise::serenity_prelude as serenity;

const LEADERBOARD_SIZE: usize = 10;

/// Show how many members someone has invited
#[poise::command(slash_command, guild_only)]
pub async fn invites(
    ctx: Context<'_>,
    #[description = "User to check (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let target = user.as_ref().unwrap_or_else(|| ctx.author());
    let record = ctx.data().economy.get_user(target.id.get()).await?;

    let reward = ctx.data().economy.config().invite_reward;
    let embed = embeds::info(
        format!("📨 {}'s Invites", target.name),
        format!(
            "**{}** members invited\n🪙 {} coins earned from invites",
            record.invites,
            format_number(record.invites * reward)
        ),
    )
    .thumbnail(target.face());

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Top inviters
#[poise::command(slash_command, guild_only)]
pub async fn inviteleaderboard(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;
    let top = ctx
        .data()
        .economy
        .invite_leaderboard(LEADERBOARD_SIZE)
        .await?;

    let description = if top.is_empty() {
        "Nobody has invited anyone yet.".to_string()
    } else {
        top.iter()
            .enumerate()
            .map(|(i, user)| {
                format!(
                    "{} {} - **{}** invites",
                    rank_marker(i + 1),
                    display_name_cached(ctx.serenity_context(), guild_id, user.user_id),
                    user.invites
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    ctx.send(
        poise::CreateReply::default().embed(
            serenity::CreateEmbed::new()
                .title("🏆 Invite Leaderboard")
                .description(description)
                .color(embeds::GOLD),
        ),
    )
    .await?;
    Ok(())
}

async fn fetch_snapshots(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
) -> Result<Vec<InviteSnapshot>, serenity::Error> {
    let invites = guild_id.invites(http).await?;
    Ok(invites
        .into_iter()
        .map(|invite| InviteSnapshot {
            code: invite.code,
            inviter_id: invite.inviter.map(|u| u.id.get()),
            uses: invite.uses,
        })
        .collect())
}

/// Remember current invite counts for a guild. Needs Manage Server.
pub async fn snapshot_guild(http: &serenity::Http, data: &Data, guild_id: serenity::GuildId) {
    match fetch_snapshots(http, guild_id).await {
        Ok(snapshots) => {
            data.invites.record(guild_id.get(), &snapshots);
            tracing::debug!(guild_id = guild_id.get(), codes = snapshots.len(), "Invites cached");
        }
        Err(e) => tracing::warn!(guild_id = guild_id.get(), "Could not read invites: {}", e),
    }
}

/// Work out who invited a new member and pay them. Returns the inviter.
pub async fn credit_inviter(
    http: &serenity::Http,
    data: &Data,
    guild_id: serenity::GuildId,
    new_member: u64,
) -> Option<u64> {
    let fresh = match fetch_snapshots(http, guild_id).await {
        Ok(fresh) => fresh,
        Err(e) => {
            tracing::warn!(guild_id = guild_id.get(), "Could not read invites: {}", e);
            return None;
        }
    };

    let inviter = data
        .invites
        .attribute_join(guild_id.get(), &fresh)
        .filter(|&inviter| inviter != new_member)?;

    match data.economy.reward_inviter(inviter).await {
        Ok(total) => {
            tracing::info!(inviter, new_member, total, "Invite credited");
            Some(inviter)
        }
        Err(e) => {
            tracing::error!(inviter, "Failed to reward inviter: {}", e);
            None
        }
    }
}
