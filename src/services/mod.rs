// Service modules
pub mod signature_service;
pub mod webhook_service;

pub use signature_service::SignatureVerifier;
pub use webhook_service::{ProcessedWebhook, WebhookService};
