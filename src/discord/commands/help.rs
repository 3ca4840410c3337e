use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;
use std::collections::HashMap;

// Category definitions with emojis and order
const CATEGORY_ORDER: &[&str] = &[
    "Economy",
    "Leveling",
    "Community",
    "Moderation",
    "Server Setup",
];

fn get_category_emoji(category: &str) -> &'static str {
    match category {
        "Economy" => "🪙",
        "Leveling" => "📈",
        "Community" => "🎮",
        "Moderation" => "🛡️",
        "Server Setup" => "🛠️",
        _ => "•",
    }
}

struct CommandMetadata {
    category: &'static str,
    priority: i32,
    description: Option<&'static str>,
    note: Option<&'static str>,
}

fn get_command_metadata(name: &str) -> CommandMetadata {
    let (category, priority, description, note) = match name {
        "balance" => ("Economy", 100, Some("Check your coins, level and XP."), None),
        "daily" => ("Economy", 95, Some("Claim your daily coins once every 24 hours."), None),
        "work" => ("Economy", 90, Some("Take a shift for some coins every hour."), None),
        "give" => ("Economy", 80, Some("Send coins to another member."), None),
        "coinflip" => (
            "Economy",
            75,
            Some("Bet coins on a coin toss."),
            Some("Win and your bet comes back doubled."),
        ),
        "slots" => (
            "Economy",
            74,
            Some("Spin three reels for a payout."),
            Some("Pairs pay 2x, triples 5x and up to 20x for 💎💎💎."),
        ),
        "roulette" => (
            "Economy",
            72,
            Some("Bet on a color or a number."),
            Some("Red or black pays 2x, green 14x and a single number 36x."),
        ),
        "shop" => ("Economy", 70, Some("Browse items you can buy."), None),
        "buy" => ("Economy", 65, Some("Buy an item from the shop."), None),
        "inventory" => ("Economy", 60, Some("See the items you own."), None),

        "rank" => ("Leveling", 100, Some("Your level and progress to the next one."), None),
        "top" => ("Leveling", 90, Some("The top 10 members by level."), None),

        "invites" => ("Community", 100, Some("How many members someone has invited."), None),
        "inviteleaderboard" => ("Community", 95, Some("Top inviters."), None),
        "voice" => (
            "Community",
            90,
            Some("Manage your private voice room."),
            Some("Subcommands: lock, unlock, limit, rename, claim, panel"),
        ),

        "warn" => ("Moderation", 100, Some("Warn a member."), None),
        "warns" => ("Moderation", 95, Some("List a member's warnings."), None),
        "delwarn" => ("Moderation", 90, Some("Remove a single warning."), None),
        "clearwarns" => ("Moderation", 85, Some("Remove all of a member's warnings."), None),
        "kick" => ("Moderation", 80, Some("Kick a member."), None),
        "ban" => ("Moderation", 75, Some("Ban a user."), None),
        "unban" => ("Moderation", 70, Some("Lift a ban by user id."), None),
        "purge" => (
            "Moderation",
            65,
            Some("Bulk delete recent messages."),
            Some("Messages older than 14 days are skipped."),
        ),
        "slowmode" => ("Moderation", 60, Some("Set a channel's slowmode."), None),
        "antispam" => (
            "Moderation",
            55,
            Some("Configure automatic spam protection."),
            Some("Subcommands: status, enable, disable, config, blockword, unblockword, clear_strikes"),
        ),
        "addticket" => ("Moderation", 50, Some("Add a member to this ticket."), None),
        "removeticket" => ("Moderation", 45, Some("Remove a member from this ticket."), None),

        "setupserver" => (
            "Server Setup",
            100,
            Some("Create or reuse every channel the bot needs."),
            None,
        ),
        "config" => (
            "Server Setup",
            90,
            Some("View, reload or reset this server's settings."),
            Some("Subcommands: show, reload, reset"),
        ),
        "setlog" => ("Server Setup", 80, Some("Choose the log channel."), None),
        "setwelcome" => ("Server Setup", 75, Some("Choose the welcome channel."), None),
        "setevents" => ("Server Setup", 70, Some("Choose where chests appear."), None),
        "ticketpanel" => ("Server Setup", 60, Some("Post the ticket panel."), None),
        "rolemenu" => ("Server Setup", 55, Some("Post the game role panel."), None),
        "testwelcome" => ("Server Setup", 20, Some("Preview the welcome message."), None),
        "testevent" => ("Server Setup", 10, Some("Spawn a treasure chest here."), None),

        _ => ("Community", 0, None, None),
    };

    CommandMetadata {
        category,
        priority,
        description,
        note,
    }
}

/// Show a categorized list of commands.
#[poise::command(slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let mut categories: HashMap<&str, Vec<(i32, String)>> = HashMap::new();

    for command in &ctx.framework().options().commands {
        if command.hide_in_help || command.name == "help" {
            continue;
        }

        let metadata = get_command_metadata(&command.name);

        let description = metadata
            .description
            .or(command.description.as_deref())
            .or(command.help_text.as_deref())
            .unwrap_or("No description provided.");

        let mut entry = format!("• **/{}** - {}", command.name, description);

        if let Some(note) = metadata.note {
            entry.push_str(&format!("\n  ⤷ {}", note));
        }

        categories
            .entry(metadata.category)
            .or_default()
            .push((metadata.priority, entry));
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("GameFun Realms Command Guide")
        .description(
            "Use slash commands with `/`. \
            Commands are grouped by what they do, most used first.",
        )
        .color(serenity::Colour::from_rgb(88, 101, 242))
        .timestamp(serenity::Timestamp::now());

    if let Ok(user) = ctx.framework().bot_id.to_user(&ctx).await {
        embed = embed.thumbnail(user.face());
    }

    // Sort categories based on defined order, then alphabetically for others
    let mut sorted_categories: Vec<_> = categories.keys().cloned().collect();
    sorted_categories.sort_by(|a, b| {
        let pos_a = CATEGORY_ORDER.iter().position(|&x| x == *a).unwrap_or(999);
        let pos_b = CATEGORY_ORDER.iter().position(|&x| x == *b).unwrap_or(999);
        pos_a.cmp(&pos_b).then(a.cmp(b))
    });

    for category in sorted_categories {
        if let Some(entries) = categories.get_mut(category) {
            // Priority descending, then name
            entries.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

            let title = format!("{} {}", get_category_emoji(category), category);
            let formatted_entries: Vec<String> = entries.iter().map(|(_, s)| s.clone()).collect();

            for (i, chunk) in chunk_entries(&formatted_entries).iter().enumerate() {
                let field_name = if i == 0 {
                    title.clone()
                } else {
                    format!("{} (cont.)", title)
                };

                embed = embed.field(field_name, chunk.join("\n"), false);
            }
        }
    }

    embed = embed.footer(serenity::CreateEmbedFooter::new(
        "Need a hand? Open a ticket or ping a moderator.",
    ));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

fn chunk_entries(entries: &[String]) -> Vec<Vec<String>> {
    let mut chunks = Vec::new();
    let mut current_chunk = Vec::new();
    let mut current_length = 0;

    for entry in entries {
        let entry_len = entry.len();
        // Discord field value limit is 1024. We leave a bit of buffer.
        if current_length + entry_len + 1 > 1000 && !current_chunk.is_empty() {
            chunks.push(current_chunk);
            current_chunk = Vec::new();
            current_length = 0;
        }

        current_chunk.push(entry.clone());
        current_length += entry_len + 1;
    }

    if !current_chunk.is_empty() {
        chunks.push(current_chunk);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_lists_split_under_field_limit() {
        let entries: Vec<String> = (0..40).map(|i| format!("{:0>40}", i)).collect();
        let chunks = chunk_entries(&entries);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.join("\n").len() <= 1024);
        }
        assert_eq!(chunks.iter().map(Vec::len).sum::<usize>(), 40);
    }

    #[test]
    fn unknown_commands_fall_back_to_community() {
        let meta = get_command_metadata("something_new");
        assert_eq!(meta.category, "Community");
        assert!(meta.description.is_none());
        assert!(CATEGORY_ORDER.contains(&get_command_metadata("purge").category));
    }
}
