// Yes/no buttons for destructive commands.

use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;
use std::time::Duration;

const CONFIRM_TIMEOUT: Duration = Duration::from_secs(30);

/// Show `embed` with Confirm/Cancel buttons and wait for the invoking user.
/// Returns false on cancel or timeout. The buttons are removed either way.
pub async fn confirm(ctx: Context<'_>, embed: serenity::CreateEmbed) -> Result<bool, Error> {
    let confirm_id = format!("{}_confirm", ctx.id());
    let cancel_id = format!("{}_cancel", ctx.id());

    let components = vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(&confirm_id)
            .label("Confirm")
            .style(serenity::ButtonStyle::Danger),
        serenity::CreateButton::new(&cancel_id)
            .label("Cancel")
            .style(serenity::ButtonStyle::Secondary),
    ])];

    let handle = ctx
        .send(
            poise::CreateReply::default()
                .embed(embed.clone())
                .components(components)
                .ephemeral(true),
        )
        .await?;
    let msg_id = handle.message().await?.id;

    let press = serenity::ComponentInteractionCollector::new(ctx)
        .author_id(ctx.author().id)
        .channel_id(ctx.channel_id())
        .timeout(CONFIRM_TIMEOUT)
        .filter(move |mci| mci.message.id == msg_id)
        .await;

    let confirmed = match press {
        Some(mci) => {
            mci.create_response(ctx, serenity::CreateInteractionResponse::Acknowledge)
                .await?;
            mci.data.custom_id == confirm_id
        }
        None => false,
    };

    let footer = if confirmed { "Confirmed" } else { "Cancelled" };
    handle
        .edit(
            ctx,
            poise::CreateReply::default()
                .embed(embed.footer(serenity::CreateEmbedFooter::new(footer)))
                .components(Vec::new()),
        )
        .await?;

    Ok(confirmed)
}
