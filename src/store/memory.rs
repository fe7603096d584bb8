use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EntitlementUpdate, InsertOutcome, NewSubscription, SubscriptionStore};
use crate::{error::Result, models::common::EntitlementPolicy};

/// In-memory store for tests and local runs
///
/// Cloning shares the same underlying data.
#[derive(Default, Clone)]
pub struct InMemorySubscriptionStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    // Insertion order is kept so tests can inspect writes in sequence
    subscriptions: RwLock<Vec<NewSubscription>>,
    users: RwLock<HashMap<String, UserRecord>>,
}

/// Snapshot of a user row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Option<String>,
    pub vip_expires_at: Option<time::OffsetDateTime>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored subscriptions, oldest first
    pub async fn subscriptions(&self) -> Vec<NewSubscription> {
        self.inner.subscriptions.read().await.clone()
    }

    pub async fn subscription(&self, id: Uuid) -> Option<NewSubscription> {
        self.inner
            .subscriptions
            .read()
            .await
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    pub async fn user(&self, user_id: &str) -> Option<UserRecord> {
        self.inner.users.read().await.get(user_id).cloned()
    }

    /// Insert or replace a user row wholesale
    pub async fn seed_user(&self, user: UserRecord) {
        self.inner.users.write().await.insert(user.id.clone(), user);
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn insert_subscription(&self, subscription: NewSubscription) -> Result<InsertOutcome> {
        let mut subscriptions = self.inner.subscriptions.write().await;

        if let Some(reference) = subscription.provider_reference.as_deref() {
            let existing = subscriptions
                .iter()
                .find(|s| s.provider_reference.as_deref() == Some(reference));

            if let Some(existing) = existing {
                return Ok(InsertOutcome::Duplicate {
                    existing_id: existing.id,
                    user_id: existing.user_id.clone(),
                    expires_at: existing.expires_at,
                });
            }
        }

        subscriptions.push(subscription);
        Ok(InsertOutcome::Inserted)
    }

    async fn merge_entitlement(
        &self,
        user_id: &str,
        update: EntitlementUpdate,
        policy: EntitlementPolicy,
    ) -> Result<()> {
        let mut users = self.inner.users.write().await;
        let user = users.entry(user_id.to_string()).or_insert_with(|| UserRecord {
            id: user_id.to_string(),
            ..Default::default()
        });

        user.vip_expires_at = Some(policy.resolve(user.vip_expires_at, update.vip_expires_at));
        user.role = Some(update.role);

        Ok(())
    }
}
