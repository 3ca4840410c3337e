// Discord commands for the leveling system.
//
// This layer is THIN - no business logic, just translation.

use crate::core::leveling::LevelProgress;
use crate::discord::bot_data::{display_name_cached, guild_id};
use crate::discord::embeds::{self, build_progress_bar, format_number, level_color, rank_marker};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

const LEADERBOARD_SIZE: usize = 10;

/// Show your current level and XP.
#[poise::command(slash_command, guild_only)]
pub async fn rank(
    ctx: Context<'_>,
    #[description = "User to check (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let target_user = user.as_ref().unwrap_or_else(|| ctx.author());

    if target_user.bot {
        ctx.say("Bots don't have levels! 🤖").await?;
        return Ok(());
    }

    let record = ctx.data().leveling.get_user(target_user.id.get()).await?;
    let progress = LevelProgress::of(record.xp);

    let embed = serenity::CreateEmbed::new()
        .title(format!("📈 {}", target_user.name))
        .color(level_color(record.level))
        .thumbnail(target_user.face())
        .field("Level", format!("**{}**", record.level), true)
        .field("Total XP", format!("**{}**", format_number(record.xp)), true)
        .field("Coins", format!("🪙 {}", format_number(record.coins)), true)
        .field(
            "Progress",
            format!(
                "{}/{} XP\n{}",
                format_number(progress.current),
                format_number(progress.required),
                build_progress_bar(progress.fraction(), 15)
            ),
            false,
        )
        .field(
            "XP to next level",
            format_number(progress.remaining()),
            false,
        );

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Display the top members by level and XP.
#[poise::command(slash_command, guild_only)]
pub async fn top(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;
    let users = ctx.data().leveling.get_leaderboard(LEADERBOARD_SIZE).await?;

    if users.is_empty() {
        ctx.send(poise::CreateReply::default().embed(embeds::info(
            "📊 Leaderboard",
            "Nobody has earned any XP yet. Start chatting!",
        )))
        .await?;
        return Ok(());
    }

    let author_id = ctx.author().id.get();
    let mut description = String::new();
    for (index, user) in users.iter().enumerate() {
        let name = display_name_cached(ctx.serenity_context(), guild_id, user.user_id);
        let name = if user.user_id == author_id {
            format!("**{}** (You)", name)
        } else {
            name
        };
        description.push_str(&format!(
            "{} {}\nLevel {} | {} XP\n\n",
            rank_marker(index + 1),
            name,
            user.level,
            format_number(user.xp)
        ));
    }

    let embed = serenity::CreateEmbed::new()
        .title("📊 Leaderboard")
        .description(description)
        .color(embeds::GOLD);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
