use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vip_webhook::{
    config::{Config, LogFormat},
    routes::create_router,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Configuration first: it decides the log format
    let config = Config::load()?;

    init_tracing(config.logging.format);

    tracing::info!("Starting VIP subscription webhook (vip-webhook)");
    tracing::info!(
        "Loaded configuration - Server: {}:{}, entitlement policy: {:?}",
        config.server.host,
        config.server.port,
        config.webhook.entitlement_policy
    );

    // Initialize application state
    let state = AppState::new(config.clone()).await?;

    tracing::info!("Initialized application state");

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,vip_webhook=debug,tower_http=info".into());

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
