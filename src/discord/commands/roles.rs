// Game role panel: buttons that toggle self-assignable roles.

use crate::core::roles::{find_by_custom_id, panel_rows, toggle_for, PanelStyle, Toggle};
use crate::discord::embeds;
use crate::discord::{Context, Data, Error};
use poise::serenity_prelude as serenity;

pub const BUTTON_PREFIX: &str = "role_";

fn button_style(style: PanelStyle) -> serenity::ButtonStyle {
    match style {
        PanelStyle::Primary => serenity::ButtonStyle::Primary,
        PanelStyle::Secondary => serenity::ButtonStyle::Secondary,
        PanelStyle::Success => serenity::ButtonStyle::Success,
        PanelStyle::Danger => serenity::ButtonStyle::Danger,
    }
}

fn panel_components() -> Vec<serenity::CreateActionRow> {
    panel_rows()
        .into_iter()
        .map(|row| {
            serenity::CreateActionRow::Buttons(
                row.iter()
                    .map(|role| {
                        serenity::CreateButton::new(role.custom_id)
                            .label(role.label)
                            .emoji(serenity::ReactionType::Unicode(role.emoji.to_string()))
                            .style(button_style(role.style))
                    })
                    .collect(),
            )
        })
        .collect()
}

/// Post the game role panel in this channel
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn rolemenu(ctx: Context<'_>) -> Result<(), Error> {
    let embed = embeds::info(
        "🎮 Pick your games",
        "Press a button to get the matching role. Press it again to drop it.",
    );

    ctx.channel_id()
        .send_message(
            ctx,
            serenity::CreateMessage::new()
                .embed(embed)
                .components(panel_components()),
        )
        .await?;
    ctx.send(embeds::private(embeds::success(
        "✅ Role panel posted",
        "Members can now pick their roles.",
    )))
    .await?;
    Ok(())
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

pub async fn handle_role_button(
    ctx: &serenity::Context,
    _data: &Data,
    mci: &serenity::ComponentInteraction,
) -> Result<(), Error> {
    let Some(game_role) = find_by_custom_id(&mci.data.custom_id) else {
        return Ok(());
    };
    let (Some(guild), Some(member)) = (mci.guild_id, mci.member.as_ref()) else {
        return Ok(());
    };

    let role_id = ctx.cache.guild(guild).and_then(|g| {
        g.roles
            .values()
            .find(|r| r.name == game_role.role_name)
            .map(|r| r.id)
    });
    let Some(role_id) = role_id else {
        tracing::warn!(guild_id = guild.get(), role = game_role.role_name, "Panel role missing");
        return respond(
            ctx,
            mci,
            embeds::error(format!(
                "The role **{}** doesn't exist on this server. Ask an admin to create it.",
                game_role.role_name
            )),
        )
        .await;
    };

    let embed = match toggle_for(member.roles.contains(&role_id)) {
        Toggle::Add => {
            member.add_role(ctx, role_id).await?;
            embeds::success(
                "✅ Role added",
                format!("You now have **{}**.", game_role.role_name),
            )
        }
        Toggle::Remove => {
            member.remove_role(ctx, role_id).await?;
            embeds::info(
                "➖ Role removed",
                format!("**{}** was taken off.", game_role.role_name),
            )
        }
    };
    respond(ctx, mci, embed).await
}
