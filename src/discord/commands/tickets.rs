// Support tickets: the panel, the create/close buttons, and member management.

use crate::core::settings::ConfigKey;
use crate::core::tickets::{
    creator_from_topic, ensure_can_close, ensure_can_open, ensure_can_remove, find_open_ticket,
    render_transcript, ticket_channel_name, ticket_topic, TranscriptHeader, TranscriptLine,
};
use crate::discord::bot_data::interaction_is_staff;
use crate::discord::embeds;
use crate::discord::{Context, Data, Error};
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use std::time::Duration;

pub const CREATE_BUTTON: &str = "ticket_create";
pub const CLOSE_BUTTON: &str = "ticket_close";

const CLOSE_DELAY: Duration = Duration::from_secs(5);
const TRANSCRIPT_MESSAGE_LIMIT: usize = 500;

fn member_access() -> serenity::Permissions {
    serenity::Permissions::VIEW_CHANNEL
        | serenity::Permissions::SEND_MESSAGES
        | serenity::Permissions::READ_MESSAGE_HISTORY
        | serenity::Permissions::ATTACH_FILES
}

fn to_utc(timestamp: serenity::Timestamp) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp.unix_timestamp(), 0).unwrap_or_else(Utc::now)
}

/// Post the ticket panel in this channel
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn ticketpanel(ctx: Context<'_>) -> Result<(), Error> {
    let embed = embeds::info(
        "🎫 Support",
        "Need help from the staff? Press the button below and a private channel \
         will be opened just for you.",
    );
    let components = vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(CREATE_BUTTON)
            .label("Open a ticket")
            .emoji('📩')
            .style(serenity::ButtonStyle::Primary),
    ])];

    ctx.channel_id()
        .send_message(
            ctx,
            serenity::CreateMessage::new()
                .embed(embed)
                .components(components),
        )
        .await?;
    ctx.send(embeds::private(embeds::success(
        "✅ Panel posted",
        "Members can now open tickets here.",
    )))
    .await?;
    Ok(())
}

/// Give another member access to this ticket
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn addticket(
    ctx: Context<'_>,
    #[description = "Member to add"] user: serenity::User,
) -> Result<(), Error> {
    let channel = ctx.guild_channel().await.ok_or("Could not load this channel")?;
    if creator_from_topic(channel.topic.as_deref()).is_none() {
        ctx.send(embeds::private(embeds::error("This channel isn't a ticket.")))
            .await?;
        return Ok(());
    }

    channel
        .create_permission(
            ctx,
            serenity::PermissionOverwrite {
                allow: member_access(),
                deny: serenity::Permissions::empty(),
                kind: serenity::PermissionOverwriteType::Member(user.id),
            },
        )
        .await?;

    ctx.send(poise::CreateReply::default().embed(embeds::success(
        "➕ Member added",
        format!("<@{}> can now see this ticket.", user.id),
    )))
    .await?;
    Ok(())
}

/// Remove a member's access to this ticket
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn removeticket(
    ctx: Context<'_>,
    #[description = "Member to remove"] user: serenity::User,
) -> Result<(), Error> {
    let channel = ctx.guild_channel().await.ok_or("Could not load this channel")?;
    if let Err(e) = ensure_can_remove(channel.topic.as_deref(), user.id.get()) {
        ctx.send(embeds::private(embeds::error(e.to_string())))
            .await?;
        return Ok(());
    }

    channel
        .delete_permission(ctx, serenity::PermissionOverwriteType::Member(user.id))
        .await?;

    ctx.send(poise::CreateReply::default().embed(embeds::success(
        "➖ Member removed",
        format!("<@{}> no longer has access to this ticket.", user.id),
    )))
    .await?;
    Ok(())
}

async fn reply_private(
    ctx: &serenity::Context,
    mci: &serenity::ComponentInteraction,
    embed: serenity::CreateEmbed,
) -> Result<(), Error> {
    mci.edit_response(ctx, serenity::EditInteractionResponse::new().embed(embed))
        .await?;
    Ok(())
}

pub async fn handle_create(
    ctx: &serenity::Context,
    data: &Data,
    mci: &serenity::ComponentInteraction,
) -> Result<(), Error> {
    mci.defer_ephemeral(ctx).await?;
    let guild = mci.guild_id.ok_or("Tickets only work in servers")?;
    let user = &mci.user;

    let Some(category) = data.channel_setting(guild.get(), ConfigKey::TicketCategory) else {
        return reply_private(
            ctx,
            mci,
            embeds::error("Tickets aren't set up yet. Ask an admin to run `/setupserver`."),
        )
        .await;
    };

    let channels = guild.channels(ctx).await?;
    let existing = find_open_ticket(
        channels
            .values()
            .filter(|c| c.parent_id == Some(category))
            .map(|c| (c.id.get(), c.topic.as_deref())),
        user.id.get(),
    );
    if let Err(e) = ensure_can_open(existing) {
        return reply_private(ctx, mci, embeds::error(e.to_string())).await;
    }

    let staff_roles: Vec<serenity::RoleId> = ctx
        .cache
        .guild(guild)
        .map(|g| {
            g.roles
                .values()
                .filter(|r| r.permissions.manage_messages() || r.permissions.administrator())
                .map(|r| r.id)
                .collect()
        })
        .unwrap_or_default();

    let mut overwrites = vec![
        serenity::PermissionOverwrite {
            allow: serenity::Permissions::empty(),
            deny: serenity::Permissions::VIEW_CHANNEL,
            kind: serenity::PermissionOverwriteType::Role(serenity::RoleId::new(guild.get())),
        },
        serenity::PermissionOverwrite {
            allow: member_access(),
            deny: serenity::Permissions::empty(),
            kind: serenity::PermissionOverwriteType::Member(user.id),
        },
        serenity::PermissionOverwrite {
            allow: member_access() | serenity::Permissions::MANAGE_CHANNELS,
            deny: serenity::Permissions::empty(),
            kind: serenity::PermissionOverwriteType::Member(ctx.cache.current_user().id),
        },
    ];
    overwrites.extend(staff_roles.into_iter().map(|role| serenity::PermissionOverwrite {
        allow: member_access(),
        deny: serenity::Permissions::empty(),
        kind: serenity::PermissionOverwriteType::Role(role),
    }));

    let channel = guild
        .create_channel(
            ctx,
            serenity::CreateChannel::new(ticket_channel_name(&user.name))
                .kind(serenity::ChannelType::Text)
                .category(category)
                .topic(ticket_topic(user.id.get()))
                .permissions(overwrites),
        )
        .await?;

    let controls = vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(CLOSE_BUTTON)
            .label("Close ticket")
            .emoji('🔒')
            .style(serenity::ButtonStyle::Danger),
    ])];
    channel
        .send_message(
            ctx,
            serenity::CreateMessage::new()
                .content(format!("<@{}>", user.id))
                .embed(embeds::info(
                    "🎫 Ticket opened",
                    "Describe your problem and a staff member will be with you shortly.",
                ))
                .components(controls),
        )
        .await?;

    tracing::info!(user_id = user.id.get(), channel_id = channel.id.get(), "Ticket opened");
    reply_private(
        ctx,
        mci,
        embeds::success("✅ Ticket created", format!("Head over to <#{}>.", channel.id)),
    )
    .await
}

async fn collect_transcript(
    ctx: &serenity::Context,
    channel: serenity::ChannelId,
) -> Result<Vec<TranscriptLine>, Error> {
    let mut messages: Vec<serenity::Message> = Vec::new();
    let mut before: Option<serenity::MessageId> = None;

    while messages.len() < TRANSCRIPT_MESSAGE_LIMIT {
        let mut request = serenity::GetMessages::new().limit(100);
        if let Some(before) = before {
            request = request.before(before);
        }
        let batch = channel.messages(ctx, request).await?;
        let Some(oldest) = batch.last() else {
            break;
        };
        before = Some(oldest.id);
        let done = batch.len() < 100;
        messages.extend(batch);
        if done {
            break;
        }
    }

    // Discord returns newest first.
    Ok(messages
        .into_iter()
        .rev()
        .map(|m| TranscriptLine {
            sent_at: to_utc(m.timestamp),
            author: m.author.name,
            content: m.content,
        })
        .collect())
}

pub async fn handle_close(
    ctx: &serenity::Context,
    data: &Data,
    mci: &serenity::ComponentInteraction,
) -> Result<(), Error> {
    mci.defer_ephemeral(ctx).await?;
    let guild = mci.guild_id.ok_or("Tickets only work in servers")?;
    let channel = mci
        .channel_id
        .to_channel(ctx)
        .await?
        .guild()
        .ok_or("Not a server channel")?;

    let is_staff = interaction_is_staff(data, mci);
    let creator = match ensure_can_close(channel.topic.as_deref(), mci.user.id.get(), is_staff) {
        Ok(creator) => creator,
        Err(e) => return reply_private(ctx, mci, embeds::error(e.to_string())).await,
    };

    reply_private(
        ctx,
        mci,
        embeds::warning("🔒 Closing", "This ticket will be deleted in 5 seconds."),
    )
    .await?;

    let lines = collect_transcript(ctx, channel.id).await?;
    let transcript = render_transcript(
        &TranscriptHeader {
            channel_name: &channel.name,
            opened_at: to_utc(channel.id.created_at()),
            closed_at: Utc::now(),
            closed_by: &mci.user.name,
        },
        &lines,
    );

    if let Some(log) = data.channel_setting(guild.get(), ConfigKey::LogChannel) {
        let file = serenity::CreateAttachment::bytes(
            transcript.into_bytes(),
            format!("{}.txt", channel.name),
        );
        let embed = embeds::info(
            "🎫 Ticket closed",
            format!(
                "**{}** opened by <@{}>, closed by <@{}>.",
                channel.name, creator, mci.user.id
            ),
        );
        if let Err(e) = log
            .send_message(ctx, serenity::CreateMessage::new().embed(embed).add_file(file))
            .await
        {
            tracing::warn!(guild_id = guild.get(), "Failed to post transcript: {}", e);
        }
    }

    tokio::time::sleep(CLOSE_DELAY).await;
    channel.delete(ctx).await?;
    tracing::info!(channel_id = channel.id.get(), creator, closed_by = mci.user.id.get(), "Ticket closed");
    Ok(())
}
