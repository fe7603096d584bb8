//! Persistence for subscriptions and user entitlements.
//!
//! The webhook pipeline only ever needs two writes: insert one subscription and
//! merge an entitlement into one user. [`SubscriptionStore`] is that seam; the
//! Postgres implementation is used in production and the in-memory one in tests.

pub mod memory;
pub mod sea_orm_store;

pub use memory::InMemorySubscriptionStore;
pub use sea_orm_store::SeaOrmSubscriptionStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{error::Result, models::common::EntitlementPolicy};

/// Subscription row ready to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubscription {
    pub id: Uuid,
    pub user_id: String,
    pub provider: String,
    pub plan: String,
    pub amount_sar: f64,
    pub status: String,
    pub started_at: time::OffsetDateTime,
    pub expires_at: time::OffsetDateTime,
    pub provider_reference: Option<String>,
    pub provider_payload: serde_json::Value,
}

/// Fields merged into the user row; everything else on the row is left alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitlementUpdate {
    pub vip_expires_at: time::OffsetDateTime,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A subscription with the same provider reference already exists.
    /// Carries what is needed to re-apply its entitlement.
    Duplicate {
        existing_id: Uuid,
        user_id: String,
        expires_at: time::OffsetDateTime,
    },
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Insert a new subscription. Never updates an existing row.
    async fn insert_subscription(&self, subscription: NewSubscription) -> Result<InsertOutcome>;

    /// Upsert the entitlement fields on a user, creating the user if needed
    async fn merge_entitlement(
        &self,
        user_id: &str,
        update: EntitlementUpdate,
        policy: EntitlementPolicy,
    ) -> Result<()>;
}
