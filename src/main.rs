// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (SQLite stores)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Start the background chest loops

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "config/bot_settings.rs"]
mod config;
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::config::BotSettings;
use crate::core::casino::CasinoService;
use crate::core::economy::{EconomyService, InventoryService};
use crate::core::events::EventService;
use crate::core::invites::InviteTracker;
use crate::core::leveling::LevelingService;
use crate::core::moderation::{AntiSpamService, ModerationService};
use crate::core::settings::ServerConfigService;
use crate::core::voice::VoiceService;
use crate::discord::commands::{events, presence};
use crate::discord::{embeds, Data, Error};
use crate::infra::economy::{SqliteInventoryStore, SqliteUserStore};
use crate::infra::events::SqliteEventStore;
use crate::infra::moderation::{SqliteSpamStore, SqliteWarnStore};
use crate::infra::settings::SqliteConfigStore;
use crate::infra::voice::SqliteVoiceStore;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!(
                command = %ctx.command().qualified_name,
                user_id = ctx.author().id.get(),
                "Command failed: {}",
                error
            );
            let reply = embeds::private(embeds::error(
                "Something went wrong while running that command. Please try again later.",
            ));
            if let Err(e) = ctx.send(reply).await {
                tracing::warn!("Could not report command error: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                tracing::error!("Error while handling error: {}", e);
            }
        }
    }
}

/// Open the database, run migrations and wire up every service.
async fn build_data(settings: BotSettings) -> anyhow::Result<Data> {
    let pool = infra::database::connect(&settings.database_path).await?;

    let users = SqliteUserStore::new(pool.clone());
    users.migrate().await?;
    let inventory_store = SqliteInventoryStore::new(pool.clone());
    inventory_store.migrate().await?;
    let event_store = SqliteEventStore::new(pool.clone());
    event_store.migrate().await?;
    let warn_store = SqliteWarnStore::new(pool.clone());
    warn_store.migrate().await?;
    let spam_store = SqliteSpamStore::new(pool.clone());
    spam_store.migrate().await?;
    let config_store = SqliteConfigStore::new(pool.clone());
    config_store.migrate().await?;
    let voice_store = SqliteVoiceStore::new(pool);
    voice_store.migrate().await?;

    let economy = Arc::new(EconomyService::new(users.clone()));
    let server_settings = Arc::new(ServerConfigService::new(config_store));
    let loaded = server_settings.reload().await?;
    tracing::info!(entries = loaded, "Server settings loaded");

    Ok(Data {
        casino: Arc::new(CasinoService::new(Arc::clone(&economy))),
        economy,
        inventory: Arc::new(InventoryService::new(inventory_store)),
        leveling: Arc::new(LevelingService::new(users)),
        events: Arc::new(EventService::new(event_store)),
        moderation: Arc::new(ModerationService::new(warn_store)),
        anti_spam: Arc::new(AntiSpamService::new(spam_store)),
        settings: server_settings,
        voice: Arc::new(VoiceService::new(voice_store)),
        invites: Arc::new(InviteTracker::new()),
        bot: Arc::new(settings),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let settings = BotSettings::from_env()?;

    // RUST_LOG wins over LOG_LEVEL when both are set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let token = settings.token.clone();
    let dev_guild = settings.dev_guild_id;
    let data = build_data(settings).await?;

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // XP needs to see messages
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_VOICE_STATES
        | serenity::GatewayIntents::GUILD_INVITES;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: discord::commands::all(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(discord::handlers::event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                tracing::info!(user = %ready.user.name, guilds = ready.guilds.len(), "Connected");

                match dev_guild {
                    Some(guild_id) => {
                        poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            serenity::GuildId::new(guild_id),
                        )
                        .await?;
                        tracing::info!(guild_id, "Commands registered in development guild");
                    }
                    None => {
                        // Global registration can take a while to propagate.
                        poise::builtins::register_globally(ctx, &framework.options().commands)
                            .await?;
                        tracing::info!("Commands registered globally");
                    }
                }

                presence::on_ready(ctx);

                tokio::spawn(events::run_chest_spawner(ctx.clone(), data.clone()));
                tokio::spawn(events::run_stale_cleanup(data.clone()));

                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    client.start().await?;
    Ok(())
}
