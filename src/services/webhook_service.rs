use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{ApiError, Result},
    models::{
        common::{EntitlementPolicy, PlanCode, SubscriptionStatus, UserRole, PAYMENT_PROVIDER},
        webhook::WebhookPayload,
    },
    store::{EntitlementUpdate, InsertOutcome, NewSubscription, SubscriptionStore},
};

/// Turns a payment notification into a subscription row and a VIP entitlement
pub struct WebhookService {
    store: Arc<dyn SubscriptionStore>,
    policy: EntitlementPolicy,
}

/// Result of a fully applied notification
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedWebhook {
    pub subscription_id: Uuid,
    pub user_id: String,
    pub plan: PlanCode,
    pub amount_sar: f64,
    pub started_at: time::OffsetDateTime,
    pub expires_at: time::OffsetDateTime,
}

impl WebhookService {
    pub fn new(store: Arc<dyn SubscriptionStore>, policy: EntitlementPolicy) -> Self {
        Self { store, policy }
    }

    /// Process a notification using the current time as its start
    pub async fn process(&self, raw: serde_json::Value) -> Result<ProcessedWebhook> {
        self.process_at(raw, time::OffsetDateTime::now_utc()).await
    }

    /// Process a notification as if received at `now`
    ///
    /// The subscription insert and the entitlement merge are separate writes.
    /// When the merge fails the subscription stays stored and the error carries
    /// its id. A redelivery of the same `tran_ref` re-applies the stored
    /// subscription's expiry (never shortening it) before reporting the
    /// duplicate, so a provider retry repairs a failed merge.
    #[instrument(skip(self, raw))]
    pub async fn process_at(
        &self,
        raw: serde_json::Value,
        now: time::OffsetDateTime,
    ) -> Result<ProcessedWebhook> {
        if !raw.is_object() {
            return Err(ApiError::BadRequest(
                "Webhook payload must be a JSON object".to_string(),
            ));
        }

        let payload: WebhookPayload = serde_json::from_value(raw.clone())
            .map_err(|e| ApiError::BadRequest(format!("Invalid webhook payload: {}", e)))?;

        payload
            .validate()
            .map_err(|e| ApiError::Validation(format!("Validation error: {}", e)))?;

        let user_id = payload
            .resolve_user_id()
            .ok_or_else(|| {
                ApiError::Validation(
                    "Missing user identifier (userId, customer_id or uid)".to_string(),
                )
            })?
            .to_string();
        let plan = payload.resolve_plan();
        let amount_sar = payload.resolve_amount().map_err(ApiError::Validation)?;
        let provider_reference = payload.resolve_provider_reference().map(str::to_string);

        if !plan.is_recognized() {
            warn!(
                user_id = %user_id,
                plan = %plan,
                "Unrecognized plan code, subscription grants no time"
            );
        }

        let started_at = now;
        let expires_at = started_at + plan.duration();
        let subscription_id = Uuid::new_v4();

        let outcome = self
            .store
            .insert_subscription(NewSubscription {
                id: subscription_id,
                user_id: user_id.clone(),
                provider: PAYMENT_PROVIDER.to_string(),
                plan: plan.as_str().to_string(),
                amount_sar,
                status: SubscriptionStatus::Active.as_str().to_string(),
                started_at,
                expires_at,
                provider_reference: provider_reference.clone(),
                provider_payload: raw,
            })
            .await?;

        if let InsertOutcome::Duplicate {
            existing_id,
            user_id: existing_user_id,
            expires_at: existing_expires_at,
        } = outcome
        {
            warn!(
                user_id = %existing_user_id,
                existing_id = %existing_id,
                "Duplicate webhook delivery, re-applying stored entitlement"
            );
            // ExtendOnly so a stale redelivery cannot undo a later purchase
            self.apply_entitlement(
                existing_id,
                &existing_user_id,
                existing_expires_at,
                EntitlementPolicy::ExtendOnly,
            )
            .await?;
            return Err(ApiError::DuplicateDelivery {
                reference: provider_reference.unwrap_or_default(),
                existing_id,
            });
        }

        self.apply_entitlement(subscription_id, &user_id, expires_at, self.policy)
            .await?;

        info!(
            subscription_id = %subscription_id,
            user_id = %user_id,
            plan = %plan,
            amount_sar = amount_sar,
            expires_at = %expires_at,
            "Recorded subscription and granted VIP entitlement"
        );

        Ok(ProcessedWebhook {
            subscription_id,
            user_id,
            plan,
            amount_sar,
            started_at,
            expires_at,
        })
    }

    async fn apply_entitlement(
        &self,
        subscription_id: Uuid,
        user_id: &str,
        expires_at: time::OffsetDateTime,
        policy: EntitlementPolicy,
    ) -> Result<()> {
        let update = EntitlementUpdate {
            vip_expires_at: expires_at,
            role: UserRole::Vip.as_str().to_string(),
        };

        // Logged here as well as in the response path: a request that timed
        // out has no response left to log it
        self.store
            .merge_entitlement(user_id, update, policy)
            .await
            .map_err(|e| {
                error!(
                    subscription_id = %subscription_id,
                    user_id = %user_id,
                    error = %e,
                    "Entitlement merge failed, subscription is stored"
                );
                ApiError::EntitlementWrite {
                    subscription_id,
                    source: Box::new(e),
                }
            })
    }
}
