use crate::core::leveling::{LevelProgress, LevelUpEvent};
use crate::discord::embeds::{build_progress_bar, format_number, level_color};
use poise::serenity_prelude::{self as serenity, builder::CreateMessage};
use rand::seq::SliceRandom;

/// Announce a level-up in the channel where it happened.
pub async fn send_level_up_embed(
    ctx: &serenity::Context,
    message: &serenity::Message,
    level_up: &LevelUpEvent,
) -> Result<(), serenity::Error> {
    let progress = LevelProgress::of(level_up.total_xp);

    let embed = serenity::CreateEmbed::new()
        .title("🎉 Level Up!")
        .description(format!(
            "<@{}> reached level **{}**!",
            level_up.user_id, level_up.new_level
        ))
        .color(level_color(level_up.new_level))
        .thumbnail(message.author.face())
        .field("Total XP", format_number(level_up.total_xp), true)
        .field(
            "Reward",
            format!("🪙 {} coins", format_number(level_up.coins_awarded)),
            true,
        )
        .field(
            "Progress",
            format!(
                "{}/{} XP\n{}",
                progress.current,
                progress.required,
                build_progress_bar(progress.fraction(), 18)
            ),
            false,
        )
        .footer(serenity::CreateEmbedFooter::new(random_flavor_line()));

    message
        .channel_id
        .send_message(ctx, CreateMessage::new().embed(embed))
        .await
        .map(|_| ())
}

fn random_flavor_line() -> &'static str {
    const FLAVOR_LINES: [&str; 4] = [
        "Keep the streak going!",
        "Your grind is paying off.",
        "Another level, another flex.",
        "That XP bar never stood a chance.",
    ];

    FLAVOR_LINES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FLAVOR_LINES[0])
}
