//! Access Reconciler server binary.
//!
//! Loads configuration, wires the stores and gateways, runs the expiration
//! sweeper in the background and serves the HTTP API until ctrl-c.

use std::error::Error;
use std::sync::Arc;

use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing::{error, info};

use access_reconciler::adapters::http::{app, AppState};
use access_reconciler::adapters::{
    DiscordAccessGateway, DiscordConfig, InMemorySubscriberStore, PodiaCommerceGateway, PodiaConfig,
    PostgresSubscriberStore,
};
use access_reconciler::application::handlers::{
    ChatIdentityResolver, EventRouter, ExpirationSweeper, ReconciliationEngine,
};
use access_reconciler::config::{AppConfig, DatabaseConfig, ValidationError};
use access_reconciler::domain::catalog::ProductCatalog;
use access_reconciler::domain::webhook::WebhookVerifier;
use access_reconciler::observability::{init_tracing, LogFormat};
use access_reconciler::ports::{AccessGateway, SubscriberStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server.log_level, LogFormat::for_production(config.is_production()));
    config.validate()?;

    let catalog = Arc::new(ProductCatalog::load(&config.catalog.path)?);
    info!(path = %config.catalog.path.display(), "Product catalog loaded");

    let store = subscriber_store(&config.database).await?;

    let commerce_token = required_secret(&config.commerce.api_token, "COMMERCE__API_TOKEN")?;
    let commerce = Arc::new(PodiaCommerceGateway::new(
        PodiaConfig::new(commerce_token)
            .with_base_url(&config.commerce.api_base_url)
            .with_timeout(config.commerce.call_timeout()),
    )?);

    let bot_token = required_secret(&config.access.bot_token, "ACCESS__BOT_TOKEN")?;
    let discord = DiscordAccessGateway::new(
        DiscordConfig::new(bot_token, &config.access.guild_id)
            .with_base_url(&config.access.api_base_url)
            .with_timeout(config.access.call_timeout()),
    )?;
    if let Err(e) = discord.connect().await {
        // Stays not-ready; mutations are still attempted per request.
        error!(error = %e, "Chat gateway connection failed");
    }
    let access: Arc<dyn AccessGateway> = Arc::new(discord);

    let engine = Arc::new(ReconciliationEngine::new(
        catalog.clone(),
        store.clone(),
        commerce.clone(),
        access.clone(),
        config.access.call_timeout(),
    ));
    let resolver = Arc::new(ChatIdentityResolver::new(
        store.clone(),
        commerce,
        config.commerce.call_timeout(),
    ));
    let verifier = config.commerce.webhook_secret.clone().map(WebhookVerifier::new);
    let event_router = Arc::new(EventRouter::new(
        engine.clone(),
        store.clone(),
        resolver.clone(),
        catalog,
        verifier,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweeper_task = if config.sweeper.enabled {
        let sweeper =
            ExpirationSweeper::new(store.clone(), engine.clone(), config.sweeper.sweeper_config());
        Some(tokio::spawn(async move { sweeper.run(shutdown_rx).await }))
    } else {
        info!("Expiration sweeper disabled");
        None
    };

    let state = AppState {
        store,
        access_gateway: access,
        engine,
        resolver,
        event_router,
    };

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, environment = ?config.server.environment, "Listening");

    axum::serve(listener, app(state, config.server.request_timeout()))
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if let Some(task) = sweeper_task {
        if let Err(e) = task.await {
            error!(error = %e, "Expiration sweeper task failed");
        }
    }

    info!("Stopped");
    Ok(())
}

/// PostgreSQL when a URL is configured, otherwise in-memory.
async fn subscriber_store(
    config: &DatabaseConfig,
) -> Result<Arc<dyn SubscriberStore>, Box<dyn Error>> {
    let Some(url) = &config.url else {
        info!("No database configured, subscribers are kept in memory");
        return Ok(Arc::new(InMemorySubscriberStore::new()));
    };

    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(url)
        .await?;
    let store = PostgresSubscriberStore::new(pool);
    if config.run_migrations {
        store.migrate().await?;
        info!("Database migrations applied");
    }
    Ok(Arc::new(store))
}

fn required_secret(
    value: &Option<SecretString>,
    name: &'static str,
) -> Result<SecretString, ValidationError> {
    value.clone().ok_or(ValidationError::MissingRequired(name))
}
