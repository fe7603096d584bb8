use crate::{
    config::Config,
    services::{SignatureVerifier, WebhookService},
    store::{SeaOrmSubscriptionStore, SubscriptionStore},
};
use migration::{Migrator, MigratorTrait};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub webhook_service: Arc<WebhookService>,
    pub signature_verifier: Arc<SignatureVerifier>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        // Connect to database once; the pool is shared by every request
        let db = sea_orm::Database::connect(&config.database.url).await?;

        if config.database.run_migrations {
            Migrator::up(&db, None).await?;
            tracing::info!("Applied pending database migrations");
        }

        let store = Arc::new(SeaOrmSubscriptionStore::new(db));

        Self::with_store(config, store)
    }

    /// Build state around an already constructed store
    ///
    /// Fails when signature verification is on without a usable server key.
    pub fn with_store(
        config: Config,
        store: Arc<dyn SubscriptionStore>,
    ) -> Result<Self, anyhow::Error> {
        config.webhook.validate()?;

        let webhook_service = Arc::new(WebhookService::new(
            store,
            config.webhook.entitlement_policy,
        ));

        let signature_verifier = match config.webhook.server_key.as_deref() {
            Some(key) if config.webhook.verify_signature => SignatureVerifier::new(key),
            _ => {
                tracing::warn!("Webhook signature verification is disabled");
                SignatureVerifier::disabled()
            }
        };

        Ok(Self {
            webhook_service,
            signature_verifier: Arc::new(signature_verifier),
            config: Arc::new(config),
        })
    }
}
