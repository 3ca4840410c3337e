// Bot presence.
//
// Only Discord SDK types live here (Context, ActivityData, OnlineStatus).

use poise::serenity_prelude as serenity;

pub const DEFAULT_ACTIVITY: &str = "GameFun Realms";

pub fn set_playing(ctx: &serenity::Context, what: &str) {
    let activity = serenity::ActivityData::playing(what);
    ctx.set_presence(Some(activity), serenity::OnlineStatus::Online);
}

/// Called once the bot is ready.
pub fn on_ready(ctx: &serenity::Context) {
    set_playing(ctx, DEFAULT_ACTIVITY);
}
