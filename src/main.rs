use dotenvy::dotenv;
use paydesk::codes::InMemoryRateLimitStore;
use paydesk::config::Settings;
use paydesk::engine::DialogueEngine;
use paydesk::outbound::{CloudApiSender, LoggingSender, MessageSender};
use paydesk::resolver::{CodeResolver, FixtureCodeResolver, HttpCodeResolver};
use paydesk::session::InMemorySessionStore;
use paydesk::webhook::{self, AppState};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    init_logging();

    info!("Starting PayDesk bot...");

    let settings = init_settings();

    let resolver = init_resolver(&settings);
    let sender = init_sender(&settings);

    let engine = Arc::new(DialogueEngine::new(
        Arc::new(InMemorySessionStore::new()),
        Arc::new(InMemoryRateLimitStore::new()),
        resolver,
    ));

    let sweepers = engine.spawn_sweepers();
    info!("Background sweepers started");

    let state = Arc::new(AppState {
        engine,
        sender,
        verify_token: settings.verify_token.clone(),
    });

    let app = webhook::router(state);
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    info!("Webhook server listening on {}", settings.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweepers.shutdown().await;
    info!("PayDesk bot stopped");

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_resolver(settings: &Settings) -> Arc<dyn CodeResolver> {
    match &settings.resolver_base_url {
        Some(base_url) => {
            info!("Using HTTP code resolver at {}", base_url);
            Arc::new(HttpCodeResolver::new(
                base_url.clone(),
                settings.resolver_api_key.clone(),
            ))
        }
        None => {
            warn!("RESOLVER_BASE_URL not set; using fixture codes (simulation mode)");
            Arc::new(FixtureCodeResolver::with_test_codes())
        }
    }
}

fn init_sender(settings: &Settings) -> Arc<dyn MessageSender> {
    match (&settings.phone_number_id, &settings.channel_token) {
        (Some(phone_number_id), Some(token)) => {
            info!("Using Cloud API sender for number id {}", phone_number_id);
            Arc::new(CloudApiSender::new(phone_number_id, token.clone()))
        }
        _ => {
            warn!("CHANNEL_TOKEN/PHONE_NUMBER_ID not set; logging outbound messages instead");
            Arc::new(LoggingSender::new())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
