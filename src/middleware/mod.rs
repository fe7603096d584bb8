// Middleware modules
pub mod logging;
pub mod signature;

// Export logging middleware
pub use logging::logging_middleware;

// Export webhook signature middleware
pub use signature::webhook_signature_middleware;
