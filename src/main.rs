//! Binary entry point: wires the database, the Telegram platform, the train
//! registry, and the health server together, then runs the dispatcher.

use anyhow::Result;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use raid_train_bot::bot::handlers::BotHandler;
use raid_train_bot::bot::AppContext;
use raid_train_bot::config::Config;
use raid_train_bot::database::connection::DatabaseManager;
use raid_train_bot::platform::hub::MarkerHub;
use raid_train_bot::platform::telegram::TelegramPlatform;
use raid_train_bot::platform::ChatPlatform;
use raid_train_bot::services::candidates::DbCandidateSource;
use raid_train_bot::services::health::HealthService;
use raid_train_bot::services::travel::BeelineTravel;
use raid_train_bot::services::{RaidCandidateSource, TravelTimeService};
use raid_train_bot::train::{Registry, TrainDeps};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "raid_train_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    info!("Starting Raid Train Bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Using database {} and HTTP port {}",
        config.database_url, config.http_port
    );

    let db = DatabaseManager::new(&config.database_url).await?;
    db.run_migrations().await?;
    let db = Arc::new(db);
    info!("Database ready");

    let bot = Bot::new(&config.telegram_bot_token);
    let hub = Arc::new(MarkerHub::new());
    let platform: Arc<dyn ChatPlatform> =
        Arc::new(TelegramPlatform::new(bot.clone(), hub.clone()));
    let travel: Arc<dyn TravelTimeService> = Arc::new(BeelineTravel::new(config.travel_speed_kmh));
    let candidates: Arc<dyn RaidCandidateSource> =
        Arc::new(DbCandidateSource::new(db.pool.clone()));
    let registry = Arc::new(Registry::new());
    let handler = BotHandler::new(AppContext {
        registry: registry.clone(),
        deps: TrainDeps {
            pool: db.pool.clone(),
            platform,
            travel,
            candidates,
            raids: registry.raids.clone(),
            poll_window: config.poll_window,
            prompt_timeout: config.first_choice_timeout,
        },
        hub,
    });
    info!("Telegram bot wired up");

    let health_service = HealthService::new(db, registry);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to port {}: {}", config.http_port, e))?;
    info!("Health endpoints listening on port {}", config.http_port);

    let bot_task = tokio::spawn(async move {
        let storage: Arc<InMemStorage<()>> = InMemStorage::new();
        Dispatcher::builder(bot, handler.schema())
            .dependencies(dptree::deps![storage])
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    });

    let health_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health_service.router).await {
            tracing::error!("Health server error: {}", e);
        }
    });

    // Either task finishing means we are shutting down.
    tokio::select! {
        result = bot_task => {
            if let Err(e) = result {
                tracing::error!("Bot task error: {}", e);
            }
        }
        result = health_task => {
            if let Err(e) = result {
                tracing::error!("Health task error: {}", e);
            }
        }
    }

    info!("Application stopped");
    Ok(())
}
