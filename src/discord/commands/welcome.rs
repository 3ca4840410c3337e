// Greetings for new members and goodbyes for leavers.

use crate::core::settings::ConfigKey;
use crate::discord::bot_data::guild_id;
use crate::discord::commands::invites::credit_inviter;
use crate::discord::embeds::{self, format_number};
use crate::discord::{Context, Data, Error};
use poise::serenity_prelude as serenity;

fn welcome_embed(
    user: &serenity::User,
    guild_name: &str,
    member_count: u64,
    bonus: i64,
    inviter: Option<u64>,
) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(format!("👋 Welcome to {}!", guild_name))
        .description(format!(
            "Hey <@{}>, glad you're here! You're member **#{}**.\n\n\
             🪙 You've been given **{}** starter coins.\n\
             🎮 Grab your game roles in the role panel and say hi!",
            user.id,
            member_count,
            format_number(bonus)
        ))
        .color(embeds::SUCCESS)
        .thumbnail(user.face())
        .timestamp(serenity::Timestamp::now());

    if let Some(inviter) = inviter {
        embed = embed.field("Invited by", format!("<@{}>", inviter), true);
    }
    embed
}

/// Preview the welcome message
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn testwelcome(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;
    let (guild_name, member_count) = ctx
        .guild()
        .map(|g| (g.name.clone(), g.member_count))
        .unwrap_or_else(|| ("the server".to_string(), 0));

    let embed = welcome_embed(
        ctx.author(),
        &guild_name,
        member_count,
        ctx.data().economy.config().welcome_bonus,
        None,
    );

    let target = ctx
        .data()
        .channel_setting(guild_id, ConfigKey::WelcomeChannel)
        .map(|c| format!("Would be posted in <#{}>.", c))
        .unwrap_or_else(|| "No welcome channel set; use `/setwelcome`.".to_string());

    ctx.send(
        poise::CreateReply::default()
            .content(target)
            .embed(embed)
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

pub async fn handle_member_join(
    ctx: &serenity::Context,
    data: &Data,
    member: &serenity::Member,
) -> Result<(), Error> {
    if member.user.bot {
        return Ok(());
    }

    let user_id = member.user.id.get();
    let guild_id = member.guild_id;

    let bonus = data.economy.config().welcome_bonus;
    if let Err(e) = data.economy.grant_welcome_bonus(user_id).await {
        tracing::error!(user_id, "Failed to grant welcome bonus: {}", e);
    }

    let inviter = credit_inviter(&ctx.http, data, guild_id, user_id).await;

    let (guild_name, member_count) = ctx
        .cache
        .guild(guild_id)
        .map(|g| (g.name.clone(), g.member_count))
        .unwrap_or_else(|| ("the server".to_string(), 0));

    if let Some(channel) = data.channel_setting(guild_id.get(), ConfigKey::WelcomeChannel) {
        let embed = welcome_embed(&member.user, &guild_name, member_count, bonus, inviter);
        channel
            .send_message(&ctx.http, serenity::CreateMessage::new().embed(embed))
            .await?;
    }

    data.send_log(
        &ctx.http,
        guild_id.get(),
        embeds::info(
            "📥 Member joined",
            format!("<@{}> ({})", user_id, member.user.name),
        ),
    )
    .await;

    Ok(())
}

pub async fn handle_member_remove(
    ctx: &serenity::Context,
    data: &Data,
    guild_id: serenity::GuildId,
    user: &serenity::User,
) -> Result<(), Error> {
    if user.bot {
        return Ok(());
    }

    if let Some(channel) = data.channel_setting(guild_id.get(), ConfigKey::WelcomeChannel) {
        let embed = serenity::CreateEmbed::new()
            .title("👋 Goodbye")
            .description(format!("**{}** has left the server. See you around!", user.name))
            .color(embeds::WARNING)
            .thumbnail(user.face());
        channel
            .send_message(&ctx.http, serenity::CreateMessage::new().embed(embed))
            .await?;
    }

    data.send_log(
        &ctx.http,
        guild_id.get(),
        embeds::warning(
            "📤 Member left",
            format!("<@{}> ({})", user.id, user.name),
        ),
    )
    .await;

    Ok(())
}
