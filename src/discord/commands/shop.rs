// Discord commands for the shop system

use crate::core::economy::{EconomyError, ShopItem};
use crate::discord::embeds::{self, format_number};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// View available items in the shop
#[poise::command(slash_command, guild_only)]
pub async fn shop(ctx: Context<'_>) -> Result<(), Error> {
    let mut embed = serenity::CreateEmbed::new()
        .title("🛒 Shop")
        .description("Spend your coins on perks!")
        .color(0x5865F2); // Blurple

    for item in ShopItem::all() {
        let field_value = format!(
            "{} **{}** coins\n{}\n\n💰 Use `/buy {}` to purchase",
            item.emoji,
            format_number(item.price),
            item.description,
            item.id.as_str()
        );
        embed = embed.field(item.name, field_value, false);
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Purchase an item from the shop
#[poise::command(slash_command, guild_only)]
pub async fn buy(
    ctx: Context<'_>,
    #[description = "Item to purchase"]
    #[autocomplete = "autocomplete_items"]
    item: String,
) -> Result<(), Error> {
    let user = ctx.author();
    if user.bot {
        return Ok(());
    }
    let user_id = user.id.get();

    let Some(item) = ShopItem::find(&item) else {
        ctx.send(embeds::private(embeds::error(format!(
            "Unknown item: `{}`. See `/shop` for what's on sale.",
            item
        ))))
        .await?;
        return Ok(());
    };

    let new_balance = match ctx
        .data()
        .economy
        .deduct_coins_for_purchase(user_id, item.price)
        .await
    {
        Ok(balance) => balance,
        Err(EconomyError::InsufficientFunds {
            required,
            available,
        }) => {
            let embed = serenity::CreateEmbed::new()
                .title("❌ Insufficient Funds")
                .description(format!(
                    "You need **{}** coins but only have **{}**.\n\n💡 Use `/daily` to earn more coins!",
                    format_number(required),
                    format_number(available)
                ))
                .color(embeds::ERROR);
            ctx.send(embeds::private(embed)).await?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = ctx.data().inventory.add_item(user_id, item.id, 1).await {
        // The coins are already gone; give them back before reporting.
        tracing::error!(user_id, item = item.id.as_str(), "Failed to deliver item: {}", e);
        ctx.data().economy.award_coins(user_id, item.price).await?;
        return Err(e.into());
    }

    tracing::info!(user_id, item = item.id.as_str(), price = item.price, "Item purchased");

    let embed = embeds::success(
        "✅ Purchase Successful!",
        format!(
            "{} **{}** purchased for **{}** coins!\n\n💰 New balance: **{}** coins",
            item.emoji,
            item.name,
            format_number(item.price),
            format_number(new_balance)
        ),
    );
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show what you (or someone else) own
#[poise::command(slash_command, guild_only)]
pub async fn inventory(
    ctx: Context<'_>,
    #[description = "User to check (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let target = user.as_ref().unwrap_or_else(|| ctx.author());
    let items = ctx.data().inventory.get_inventory(target.id.get()).await?;

    if items.is_empty() {
        let embed = serenity::CreateEmbed::new()
            .title(format!("🎒 {}'s Inventory", target.name))
            .description("Nothing here yet!\n\n💡 Use `/shop` to see available items.")
            .color(embeds::WARNING);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        return Ok(());
    }

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("🎒 {}'s Inventory", target.name))
        .color(0x5865F2);

    for entry in items {
        match entry.item_id {
            Some(id) => {
                let shop_item = ShopItem::get(&id);
                embed = embed.field(
                    shop_item.name,
                    format!(
                        "{} **Quantity:** {}\n{}",
                        shop_item.emoji, entry.count, shop_item.description
                    ),
                    false,
                );
            }
            // Items that have since left the shop still show up.
            None => {
                embed = embed.field(
                    entry.item_key,
                    format!("📦 **Quantity:** {}", entry.count),
                    false,
                );
            }
        }
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Autocomplete function for item names
async fn autocomplete_items<'a>(
    _ctx: Context<'_>,
    partial: &'a str,
) -> impl Iterator<Item = String> + 'a {
    let partial = partial.to_lowercase();
    ShopItem::all()
        .into_iter()
        .filter(move |item| {
            item.id.as_str().contains(&partial) || item.name.to_lowercase().contains(&partial)
        })
        .map(|item| item.id.as_str().to_string())
}
