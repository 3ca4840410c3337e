// Discord commands for the casino games

use crate::core::casino::{CasinoError, RouletteBet};
use crate::core::economy::EconomyError;
use crate::discord::embeds::{self, format_duration, format_number};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Player-facing casino errors become a private reply; everything else bubbles up.
async fn reply_to_casino_error(ctx: Context<'_>, error: CasinoError) -> Result<(), Error> {
    match error {
        CasinoError::OnCooldown(remaining) => {
            ctx.send(embeds::private(embeds::warning(
                "⏳ Slow down",
                format!("Play again in **{}**.", format_duration(remaining)),
            )))
            .await?;
        }
        e @ (CasinoError::BetTooSmall(_)
        | CasinoError::InvalidChoice(_)
        | CasinoError::Economy(EconomyError::InsufficientFunds { .. })
        | CasinoError::Economy(EconomyError::InvalidAmount(_))) => {
            ctx.send(embeds::private(embeds::error(e.to_string()))).await?;
        }
        e => return Err(e.into()),
    }
    Ok(())
}

fn result_embed(title: &str, won: bool, body: String) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title)
        .description(body)
        .color(if won { embeds::SUCCESS } else { embeds::ERROR })
}

/// Spin the slot machine
#[poise::command(slash_command, guild_only)]
pub async fn slots(
    ctx: Context<'_>,
    #[description = "Coins to bet"]
    #[min = 1]
    bet: i64,
) -> Result<(), Error> {
    let spin = match ctx.data().casino.slots(ctx.author().id.get(), bet).await {
        Ok(spin) => spin,
        Err(e) => return reply_to_casino_error(ctx, e).await,
    };

    let reels = format!("**[ {} | {} | {} ]**", spin.reels[0], spin.reels[1], spin.reels[2]);
    let body = if spin.multiplier > 0 {
        format!(
            "{}\n\n**{}x!** You won **{}** coins.",
            reels,
            spin.multiplier,
            format_number(spin.payout)
        )
    } else {
        format!("{}\n\nNo match. You lost **{}** coins.", reels, format_number(spin.bet))
    };

    let embed = result_embed("🎰 Slots", spin.multiplier > 0, body).field(
        "Balance",
        format!("🪙 {}", format_number(spin.new_balance)),
        true,
    );
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Bet on the roulette wheel
#[poise::command(slash_command, guild_only)]
pub async fn roulette(
    ctx: Context<'_>,
    #[description = "Coins to bet"]
    #[min = 1]
    bet: i64,
    #[description = "red, black, green or a number from 0 to 36"] choice: String,
) -> Result<(), Error> {
    let bet_on = match choice.parse::<RouletteBet>() {
        Ok(bet_on) => bet_on,
        Err(e) => return reply_to_casino_error(ctx, e).await,
    };

    let spin = match ctx
        .data()
        .casino
        .roulette(ctx.author().id.get(), bet, bet_on)
        .await
    {
        Ok(spin) => spin,
        Err(e) => return reply_to_casino_error(ctx, e).await,
    };

    let landed = format!("The ball landed on {} **{}**.", spin.color.emoji(), spin.landed);
    let body = if spin.multiplier > 0 {
        format!(
            "{}\n\nYour bet on **{}** pays **{}x**: **{}** coins!",
            landed,
            spin.bet_on,
            spin.multiplier,
            format_number(spin.payout)
        )
    } else {
        format!(
            "{}\n\nYour bet on **{}** lost **{}** coins.",
            landed,
            spin.bet_on,
            format_number(spin.bet)
        )
    };

    let embed = result_embed("🎡 Roulette", spin.multiplier > 0, body).field(
        "Balance",
        format!("🪙 {}", format_number(spin.new_balance)),
        true,
    );
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
