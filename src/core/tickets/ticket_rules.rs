// Support tickets - naming, ownership and transcript rules.
//
// A ticket is a private text channel in the ticket category whose topic
// holds the creator's user id. There is no table for tickets; the channel
// itself is the record.

use chrono::{DateTime, Utc};
use thiserror::Error;

const TRANSCRIPT_TIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TicketError {
    #[error("This channel isn't a ticket")]
    NotATicket,

    #[error("You already have an open ticket: <#{0}>")]
    AlreadyOpen(u64),

    #[error("Only the ticket creator or staff can do that")]
    NotAllowed,

    #[error("The ticket creator can't be removed from their own ticket")]
    CannotRemoveCreator,
}

/// Channel name for a member's ticket: `ticket-<name>`, lowercased, with
/// anything Discord would reject turned into dashes.
pub fn ticket_channel_name(username: &str) -> String {
    let mut slug = String::new();
    for c in username.to_lowercase().chars() {
        if c.is_alphanumeric() || c == '_' {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    let slug = if slug.is_empty() { "member" } else { slug };
    let name: String = format!("ticket-{slug}").chars().take(100).collect();
    name
}

/// The topic written on a new ticket channel.
pub fn ticket_topic(creator_id: u64) -> String {
    creator_id.to_string()
}

/// Creator id stored in a ticket channel's topic.
pub fn creator_from_topic(topic: Option<&str>) -> Option<u64> {
    topic?.trim().parse().ok()
}

/// Find a member's open ticket among `(channel_id, topic)` pairs from the ticket category.
pub fn find_open_ticket<'a>(
    channels: impl IntoIterator<Item = (u64, Option<&'a str>)>,
    user_id: u64,
) -> Option<u64> {
    channels
        .into_iter()
        .find(|(_, topic)| creator_from_topic(*topic) == Some(user_id))
        .map(|(channel_id, _)| channel_id)
}

pub fn ensure_can_open(existing: Option<u64>) -> Result<(), TicketError> {
    match existing {
        Some(channel_id) => Err(TicketError::AlreadyOpen(channel_id)),
        None => Ok(()),
    }
}

/// Only the creator or staff (manage messages) may close a ticket.
pub fn ensure_can_close(
    topic: Option<&str>,
    user_id: u64,
    is_staff: bool,
) -> Result<u64, TicketError> {
    let creator = creator_from_topic(topic).ok_or(TicketError::NotATicket)?;
    if creator == user_id || is_staff {
        Ok(creator)
    } else {
        Err(TicketError::NotAllowed)
    }
}

pub fn ensure_can_remove(topic: Option<&str>, target_id: u64) -> Result<(), TicketError> {
    let creator = creator_from_topic(topic).ok_or(TicketError::NotATicket)?;
    if creator == target_id {
        return Err(TicketError::CannotRemoveCreator);
    }
    Ok(())
}

/// One message as it appears in a transcript.
#[derive(Debug, Clone)]
pub struct TranscriptLine {
    pub sent_at: DateTime<Utc>,
    pub author: String,
    pub content: String,
}

pub struct TranscriptHeader<'a> {
    pub channel_name: &'a str,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub closed_by: &'a str,
}

/// Plain-text transcript, oldest message first.
pub fn render_transcript(header: &TranscriptHeader<'_>, lines: &[TranscriptLine]) -> String {
    let mut out = String::new();
    out.push_str(&format!("TICKET TRANSCRIPT: {}\n", header.channel_name));
    out.push_str(&format!(
        "OPENED: {}\n",
        header.opened_at.format(TRANSCRIPT_TIME_FORMAT)
    ));
    out.push_str(&format!(
        "CLOSED: {}\n",
        header.closed_at.format(TRANSCRIPT_TIME_FORMAT)
    ));
    out.push_str(&format!("CLOSED BY: {}\n", header.closed_by));
    out.push_str(&"=".repeat(50));
    out.push_str("\n\n");

    let body: Vec<String> = lines
        .iter()
        .map(|line| {
            let content = if line.content.trim().is_empty() {
                "[attachment/embed]"
            } else {
                line.content.as_str()
            };
            format!(
                "[{}] {}: {}",
                line.sent_at.format(TRANSCRIPT_TIME_FORMAT),
                line.author,
                content
            )
        })
        .collect();
    out.push_str(&body.join("\n"));
    out
}
