use anyhow::anyhow;
use async_trait::async_trait;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use tracing::{debug, instrument};

use super::{EntitlementUpdate, InsertOutcome, NewSubscription, SubscriptionStore};
use crate::{
    error::{ApiError, Result},
    models::common::EntitlementPolicy,
};

/// Postgres-backed store built on the shared connection pool
#[derive(Clone)]
pub struct SeaOrmSubscriptionStore {
    db: DatabaseConnection,
}

impl SeaOrmSubscriptionStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SubscriptionStore for SeaOrmSubscriptionStore {
    #[instrument(skip(self, subscription), fields(subscription_id = %subscription.id))]
    async fn insert_subscription(&self, subscription: NewSubscription) -> Result<InsertOutcome> {
        let reference = subscription.provider_reference.clone();

        let new_subscription = entity::subscriptions::ActiveModel {
            id: Set(subscription.id),
            user_id: Set(subscription.user_id),
            provider: Set(subscription.provider),
            plan: Set(subscription.plan),
            amount_sar: Set(subscription.amount_sar),
            status: Set(subscription.status),
            started_at: Set(subscription.started_at),
            expires_at: Set(subscription.expires_at),
            provider_reference: Set(subscription.provider_reference),
            provider_payload: Set(subscription.provider_payload),
        };

        // A redelivered reference hits the unique index and inserts nothing
        // instead of erroring; rows without a reference never conflict
        let inserted = entity::subscriptions::Entity::insert(new_subscription)
            .on_conflict(
                OnConflict::column(entity::subscriptions::Column::ProviderReference)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        if inserted > 0 {
            return Ok(InsertOutcome::Inserted);
        }

        let reference = reference.ok_or_else(|| {
            ApiError::Internal(anyhow!(
                "Subscription {} was not inserted and has no provider reference",
                subscription.id
            ))
        })?;

        let existing = entity::subscriptions::Entity::find()
            .filter(entity::subscriptions::Column::ProviderReference.eq(reference.as_str()))
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                ApiError::Internal(anyhow!(
                    "Failed to read subscription after conflict for reference {}",
                    reference
                ))
            })?;

        debug!(
            reference = %reference,
            existing_id = %existing.id,
            "Provider reference already recorded"
        );

        Ok(InsertOutcome::Duplicate {
            existing_id: existing.id,
            user_id: existing.user_id,
            expires_at: existing.expires_at,
        })
    }

    #[instrument(skip(self, update))]
    async fn merge_entitlement(
        &self,
        user_id: &str,
        update: EntitlementUpdate,
        policy: EntitlementPolicy,
    ) -> Result<()> {
        let now = time::OffsetDateTime::now_utc();

        // Columns left NotSet are omitted from the INSERT, so a new row picks
        // up column defaults and an existing row keeps its values
        let entitlement = entity::users::ActiveModel {
            id: Set(user_id.to_string()),
            role: Set(Some(update.role)),
            vip_expires_at: Set(Some(update.vip_expires_at)),
            updated_at: Set(now),
            ..Default::default()
        };

        let mut on_conflict = OnConflict::column(entity::users::Column::Id);
        on_conflict.update_columns([
            entity::users::Column::Role,
            entity::users::Column::UpdatedAt,
        ]);

        match policy {
            EntitlementPolicy::Overwrite => {
                on_conflict.update_column(entity::users::Column::VipExpiresAt);
            }
            EntitlementPolicy::ExtendOnly => {
                // GREATEST skips NULL, so a first grant still lands
                on_conflict.value(
                    entity::users::Column::VipExpiresAt,
                    Expr::cust(
                        r#"GREATEST("users"."vip_expires_at", "excluded"."vip_expires_at")"#,
                    ),
                );
            }
        }

        entity::users::Entity::insert(entitlement)
            .on_conflict(on_conflict)
            .exec_without_returning(&self.db)
            .await?;

        Ok(())
    }
}
