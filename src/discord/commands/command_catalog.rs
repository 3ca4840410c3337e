// Discord commands module.
// Each feature gets its own command file.

pub mod casino;
pub mod economy;
pub mod events;
pub mod help;
pub mod invites;
pub mod leveling;
pub mod roles;
pub mod setup;
pub mod shop;
pub mod tickets;
pub mod voice;
pub mod welcome;

pub mod presence;

use crate::discord::{Data, Error};

/// Every slash command the bot registers.
pub fn all() -> Vec<poise::Command<Data, Error>> {
    use crate::discord::moderation;

    vec![
        help::help(),
        economy::balance(),
        economy::daily(),
        economy::work(),
        economy::give(),
        economy::coinflip(),
        casino::slots(),
        casino::roulette(),
        shop::shop(),
        shop::buy(),
        shop::inventory(),
        leveling::rank(),
        leveling::top(),
        invites::invites(),
        invites::inviteleaderboard(),
        voice::voice(),
        moderation::warn(),
        moderation::warns(),
        moderation::delwarn(),
        moderation::clearwarns(),
        moderation::kick(),
        moderation::ban(),
        moderation::unban(),
        moderation::purge(),
        moderation::slowmode(),
        moderation::antispam(),
        tickets::ticketpanel(),
        tickets::addticket(),
        tickets::removeticket(),
        setup::setupserver(),
        setup::config(),
        setup::setlog(),
        setup::setwelcome(),
        setup::setevents(),
        roles::rolemenu(),
        welcome::testwelcome(),
        events::testevent(),
    ]
}
