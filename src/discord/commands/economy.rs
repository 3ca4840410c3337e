// Discord commands for the economy system
//
// Same shape as every command file:
// 1. Extract primitive data from Discord types
// 2. Call core service
// 3. Format the response

use crate::core::cooldowns::CooldownKind;
use crate::core::economy::EconomyError;
use crate::core::leveling::LevelProgress;
use crate::discord::embeds::{self, build_progress_bar, format_duration, format_number};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Check your coin balance
#[poise::command(slash_command, guild_only)]
pub async fn balance(
    ctx: Context<'_>,
    #[description = "User to check balance for (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let target_user = user.as_ref().unwrap_or_else(|| ctx.author());

    if target_user.bot {
        ctx.say("Bots don't have wallets! 🤖").await?;
        return Ok(());
    }

    let record = ctx.data().economy.get_user(target_user.id.get()).await?;
    let progress = LevelProgress::of(record.xp);

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("💰 {}'s Wallet", target_user.name))
        .color(embeds::GOLD)
        .thumbnail(target_user.face())
        .field(
            "Balance",
            format!("🪙 **{}** coins", format_number(record.coins)),
            true,
        )
        .field("Level", format!("**{}**", record.level), true)
        .field("XP", format_number(record.xp), true)
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
        .footer(serenity::CreateEmbedFooter::new(
            "Use /daily and /work to earn more!",
        ));

    if target_user.id == ctx.author().id {
        let economy = &ctx.data().economy;
        let timers = [("/daily", CooldownKind::Daily), ("/work", CooldownKind::Work)]
            .into_iter()
            .map(|(name, kind)| {
                match economy.cooldown_remaining(kind, target_user.id.get()) {
                    Some(left) => format!("{} in {}", name, format_duration(left)),
                    None => format!("{} ready", name),
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        embed = embed.field("Cooldowns", timers, false);
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Claim your daily coin reward
#[poise::command(slash_command, guild_only)]
pub async fn daily(ctx: Context<'_>) -> Result<(), Error> {
    let user = ctx.author();
    if user.bot {
        return Ok(());
    }

    match ctx.data().economy.claim_daily(user.id.get()).await {
        Ok(payout) => {
            let embed = embeds::success(
                "✅ Daily Reward Claimed!",
                format!("You received **{}** coins!", format_number(payout.amount)),
            )
            .field(
                "New Balance",
                format!("🪙 {}", format_number(payout.new_balance)),
                true,
            )
            .footer(serenity::CreateEmbedFooter::new(
                "Come back tomorrow for more!",
            ));
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(EconomyError::OnCooldown(remaining)) => {
            ctx.send(embeds::private(embeds::warning(
                "⏰ Daily Reward Already Claimed",
                format!("Come back in **{}**.", format_duration(remaining)),
            )))
            .await?;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

/// Work a shift for some coins
#[poise::command(slash_command, guild_only)]
pub async fn work(ctx: Context<'_>) -> Result<(), Error> {
    let user = ctx.author();
    if user.bot {
        return Ok(());
    }

    match ctx.data().economy.work(user.id.get()).await {
        Ok(shift) => {
            let embed = embeds::success(
                format!("{} Shift complete", shift.emoji),
                format!(
                    "You worked as a **{}** and earned **{}** coins.",
                    shift.job,
                    format_number(shift.amount)
                ),
            )
            .field(
                "New Balance",
                format!("🪙 {}", format_number(shift.new_balance)),
                true,
            );
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(EconomyError::OnCooldown(remaining)) => {
            ctx.send(embeds::private(embeds::warning(
                "😴 You're tired",
                format!("You can work again in **{}**.", format_duration(remaining)),
            )))
            .await?;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

/// Send coins to another member
#[poise::command(slash_command, guild_only)]
pub async fn give(
    ctx: Context<'_>,
    #[description = "Who gets the coins"] user: serenity::User,
    #[description = "How many coins"]
    #[min = 1]
    amount: i64,
) -> Result<(), Error> {
    if user.bot {
        ctx.send(embeds::private(embeds::error("Bots don't need coins! 🤖")))
            .await?;
        return Ok(());
    }

    let sender = ctx.author().id.get();
    match ctx
        .data()
        .economy
        .transfer(sender, user.id.get(), amount)
        .await
    {
        Ok(receipt) => {
            tracing::info!(
                from = sender,
                to = user.id.get(),
                amount = receipt.amount,
                "Coins transferred"
            );
            let embed = embeds::success(
                "💸 Transfer complete",
                format!(
                    "You sent **{}** coins to <@{}>.",
                    format_number(receipt.amount),
                    user.id
                ),
            )
            .field(
                "Your Balance",
                format!("🪙 {}", format_number(receipt.sender_balance)),
                true,
            );
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(
            e @ (EconomyError::InsufficientFunds { .. }
            | EconomyError::InvalidAmount(_)
            | EconomyError::SelfTransfer),
        ) => {
            ctx.send(embeds::private(embeds::error(e.to_string())))
                .await?;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

/// Double or nothing
#[poise::command(slash_command, guild_only)]
pub async fn coinflip(
    ctx: Context<'_>,
    #[description = "Coins to bet"]
    #[min = 1]
    bet: i64,
) -> Result<(), Error> {
    let user_id = ctx.author().id.get();

    match ctx.data().economy.coinflip(user_id, bet).await {
        Ok(flip) => {
            let embed = if flip.won {
                embeds::success(
                    "🪙 Heads! You win",
                    format!("You won **{}** coins!", format_number(flip.bet)),
                )
            } else {
                serenity::CreateEmbed::new()
                    .title("🪙 Tails! You lose")
                    .description(format!("You lost **{}** coins.", format_number(flip.bet)))
                    .color(embeds::ERROR)
            }
            .field(
                "Balance",
                format!("🪙 {}", format_number(flip.new_balance)),
                true,
            );
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(EconomyError::OnCooldown(remaining)) => {
            ctx.send(embeds::private(embeds::warning(
                "⏳ Slow down",
                format!("Flip again in **{}**.", format_duration(remaining)),
            )))
            .await?;
        }
        Err(e @ (EconomyError::InsufficientFunds { .. } | EconomyError::InvalidAmount(_))) => {
            ctx.send(embeds::private(embeds::error(e.to_string())))
                .await?;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
