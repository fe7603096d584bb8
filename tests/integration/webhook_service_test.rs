use serde_json::json;
use std::sync::{atomic::Ordering, Arc};
use time::macros::datetime;
use vip_webhook::{
    models::common::{EntitlementPolicy, PlanCode},
    store::{memory::UserRecord, InMemorySubscriptionStore},
    ApiError,
};

use crate::helpers::{service_with, FailingInsertStore, FailingMergeStore, FlakyMergeStore};

const NOW: time::OffsetDateTime = datetime!(2026-10-16 12:00 UTC);

#[tokio::test]
async fn test_recognized_plans_map_to_exact_durations() {
    let store = InMemorySubscriptionStore::new();
    let service = service_with(Arc::new(store.clone()), EntitlementPolicy::Overwrite);

    for (plan, days) in [("30d", 30), ("90d", 90), ("180d", 180), ("year", 365)] {
        let result = service
            .process_at(json!({"userId": "u1", "plan": plan}), NOW)
            .await
            .unwrap();

        assert_eq!(result.started_at, NOW);
        assert_eq!(
            result.expires_at - result.started_at,
            time::Duration::days(days),
            "plan {plan}"
        );
        assert_eq!(
            (result.expires_at - result.started_at).whole_milliseconds(),
            i128::from(days) * 24 * 3600 * 1000
        );
    }
}

#[tokio::test]
async fn test_unrecognized_plan_is_stored_with_zero_duration() {
    let store = InMemorySubscriptionStore::new();
    let service = service_with(Arc::new(store.clone()), EntitlementPolicy::Overwrite);

    let result = service
        .process_at(json!({"userId": "u1", "plan": "weekly"}), NOW)
        .await
        .unwrap();

    assert_eq!(result.plan, PlanCode::Other("weekly".to_string()));
    assert_eq!(result.expires_at, result.started_at);

    let stored = store.subscription(result.subscription_id).await.unwrap();
    assert_eq!(stored.plan, "weekly");
    assert_eq!(stored.expires_at, stored.started_at);

    // Already expired at creation, but the user is still written
    let user = store.user("u1").await.unwrap();
    assert_eq!(user.vip_expires_at, Some(NOW));
}

#[tokio::test]
async fn test_padded_or_numeric_plan_is_kept_verbatim() {
    let store = InMemorySubscriptionStore::new();
    let service = service_with(Arc::new(store.clone()), EntitlementPolicy::Overwrite);

    let padded = service
        .process_at(json!({"userId": "u1", "plan": " 90d"}), NOW)
        .await
        .unwrap();
    assert_eq!(padded.plan, PlanCode::Other(" 90d".to_string()));
    assert_eq!(padded.expires_at, NOW);

    let numeric = service
        .process_at(json!({"userId": "u1", "plan": 90}), NOW)
        .await
        .unwrap();
    assert_eq!(numeric.plan, PlanCode::Other("90".to_string()));
    assert_eq!(numeric.expires_at, NOW);

    let stored = store.subscription(numeric.subscription_id).await.unwrap();
    assert_eq!(stored.plan, "90");
    assert_eq!(stored.provider_payload["plan"], 90);
}

#[tokio::test]
async fn test_ninety_day_scenario() {
    let store = InMemorySubscriptionStore::new();
    let service = service_with(Arc::new(store.clone()), EntitlementPolicy::Overwrite);
    let payload = json!({"userId": "u1", "plan": "90d", "amount": 150});

    let result = service.process_at(payload.clone(), NOW).await.unwrap();

    let subscription = store.subscription(result.subscription_id).await.unwrap();
    assert_eq!(subscription.user_id, "u1");
    assert_eq!(subscription.provider, "paytabs");
    assert_eq!(subscription.plan, "90d");
    assert_eq!(subscription.amount_sar, 150.0);
    assert_eq!(subscription.status, "active");
    assert_eq!(subscription.started_at, NOW);
    assert_eq!(subscription.expires_at, NOW + time::Duration::days(90));
    assert_eq!(subscription.provider_payload, payload);

    let user = store.user("u1").await.unwrap();
    assert_eq!(user.role.as_deref(), Some("vip"));
    assert_eq!(user.vip_expires_at, Some(subscription.expires_at));
}

#[tokio::test]
async fn test_customer_id_with_defaults() {
    let store = InMemorySubscriptionStore::new();
    let service = service_with(Arc::new(store.clone()), EntitlementPolicy::Overwrite);

    let result = service
        .process_at(json!({"customer_id": "u2"}), NOW)
        .await
        .unwrap();

    let subscription = store.subscription(result.subscription_id).await.unwrap();
    assert_eq!(subscription.user_id, "u2");
    assert_eq!(subscription.plan, "30d");
    assert_eq!(subscription.amount_sar, 0.0);
    assert_eq!(subscription.expires_at, NOW + time::Duration::days(30));
}

#[tokio::test]
async fn test_identifier_priority_across_fields() {
    let store = InMemorySubscriptionStore::new();
    let service = service_with(Arc::new(store.clone()), EntitlementPolicy::Overwrite);

    let all = service
        .process_at(json!({"userId": "a", "customer_id": "b", "uid": "c"}), NOW)
        .await
        .unwrap();
    assert_eq!(all.user_id, "a");

    let fallback = service
        .process_at(json!({"customer_id": "b", "uid": "c"}), NOW)
        .await
        .unwrap();
    assert_eq!(fallback.user_id, "b");

    let last = service
        .process_at(json!({"userId": "", "uid": "c"}), NOW)
        .await
        .unwrap();
    assert_eq!(last.user_id, "c");

    assert!(store.user("a").await.is_some());
    assert!(store.user("b").await.is_some());
    assert!(store.user("c").await.is_some());
}

#[tokio::test]
async fn test_empty_payload_is_rejected_without_writes() {
    let store = InMemorySubscriptionStore::new();
    let service = service_with(Arc::new(store.clone()), EntitlementPolicy::Overwrite);

    let result = service.process_at(json!({}), NOW).await;

    assert!(matches!(result, Err(ApiError::Validation(_))));
    assert!(store.subscriptions().await.is_empty());
}

#[tokio::test]
async fn test_non_object_payload_is_bad_request() {
    let store = InMemorySubscriptionStore::new();
    let service = service_with(Arc::new(store.clone()), EntitlementPolicy::Overwrite);

    let result = service.process_at(json!(["u1", "90d"]), NOW).await;
    assert!(matches!(result, Err(ApiError::BadRequest(_))));

    let result = service.process_at(json!({"userId": 42}), NOW).await;
    assert!(matches!(result, Err(ApiError::BadRequest(_))));

    assert!(store.subscriptions().await.is_empty());
}

#[tokio::test]
async fn test_invalid_amount_is_validation_error() {
    let store = InMemorySubscriptionStore::new();
    let service = service_with(Arc::new(store.clone()), EntitlementPolicy::Overwrite);

    let result = service
        .process_at(json!({"userId": "u1", "amount": "free"}), NOW)
        .await;

    assert!(matches!(result, Err(ApiError::Validation(_))));
    assert!(store.subscriptions().await.is_empty());
}

#[tokio::test]
async fn test_replayed_payload_without_reference_creates_two_subscriptions() {
    let store = InMemorySubscriptionStore::new();
    let service = service_with(Arc::new(store.clone()), EntitlementPolicy::Overwrite);
    let payload = json!({"userId": "u1", "plan": "30d", "amount": 50});

    let first = service.process_at(payload.clone(), NOW).await.unwrap();
    let second = service.process_at(payload, NOW).await.unwrap();

    assert_ne!(first.subscription_id, second.subscription_id);
    assert_eq!(store.subscriptions().await.len(), 2);
}

#[tokio::test]
async fn test_replayed_reference_is_duplicate_delivery() {
    let store = InMemorySubscriptionStore::new();
    let service = service_with(Arc::new(store.clone()), EntitlementPolicy::Overwrite);
    let payload = json!({"userId": "u1", "plan": "90d", "tran_ref": "TST2105900091"});

    let first = service.process_at(payload.clone(), NOW).await.unwrap();
    let replay = service
        .process_at(payload, NOW + time::Duration::minutes(5))
        .await;

    match replay {
        Err(ApiError::DuplicateDelivery {
            reference,
            existing_id,
        }) => {
            assert_eq!(reference, "TST2105900091");
            assert_eq!(existing_id, first.subscription_id);
        }
        other => panic!("expected duplicate delivery, got {:?}", other),
    }

    assert_eq!(store.subscriptions().await.len(), 1);
    // The replay must not move the entitlement
    let user = store.user("u1").await.unwrap();
    assert_eq!(user.vip_expires_at, Some(first.expires_at));
}

#[tokio::test]
async fn test_merge_preserves_existing_user_fields() {
    let store = InMemorySubscriptionStore::new();
    store
        .seed_user(UserRecord {
            id: "u1".to_string(),
            email: Some("u1@example.com".to_string()),
            display_name: Some("Layla".to_string()),
            role: Some("member".to_string()),
            vip_expires_at: None,
        })
        .await;
    let service = service_with(Arc::new(store.clone()), EntitlementPolicy::Overwrite);

    let result = service
        .process_at(json!({"userId": "u1", "plan": "year"}), NOW)
        .await
        .unwrap();

    let user = store.user("u1").await.unwrap();
    assert_eq!(user.email.as_deref(), Some("u1@example.com"));
    assert_eq!(user.display_name.as_deref(), Some("Layla"));
    assert_eq!(user.role.as_deref(), Some("vip"));
    assert_eq!(user.vip_expires_at, Some(result.expires_at));
}

#[tokio::test]
async fn test_overwrite_policy_lets_later_delivery_shorten_entitlement() {
    let store = InMemorySubscriptionStore::new();
    let service = service_with(Arc::new(store.clone()), EntitlementPolicy::Overwrite);

    service
        .process_at(json!({"userId": "u1", "plan": "year"}), NOW)
        .await
        .unwrap();
    let shorter = service
        .process_at(json!({"userId": "u1", "plan": "30d"}), NOW)
        .await
        .unwrap();

    let user = store.user("u1").await.unwrap();
    assert_eq!(user.vip_expires_at, Some(shorter.expires_at));
}

#[tokio::test]
async fn test_extend_only_policy_keeps_longer_entitlement() {
    let store = InMemorySubscriptionStore::new();
    let service = service_with(Arc::new(store.clone()), EntitlementPolicy::ExtendOnly);

    let longer = service
        .process_at(json!({"userId": "u1", "plan": "year"}), NOW)
        .await
        .unwrap();
    service
        .process_at(json!({"userId": "u1", "plan": "30d"}), NOW)
        .await
        .unwrap();

    let user = store.user("u1").await.unwrap();
    assert_eq!(user.vip_expires_at, Some(longer.expires_at));
    // Both deliveries are still recorded
    assert_eq!(store.subscriptions().await.len(), 2);
}

#[tokio::test]
async fn test_failed_merge_leaves_subscription_persisted() {
    let inner = InMemorySubscriptionStore::new();
    let store = Arc::new(FailingMergeStore::new(inner.clone()));
    let service = service_with(store.clone(), EntitlementPolicy::Overwrite);

    let result = service
        .process_at(json!({"userId": "u1", "plan": "90d"}), NOW)
        .await;

    let subscription_id = match result {
        Err(ApiError::EntitlementWrite {
            subscription_id, ..
        }) => subscription_id,
        other => panic!("expected entitlement write failure, got {:?}", other),
    };

    assert_eq!(store.merge_attempts.load(Ordering::SeqCst), 1);
    let persisted = inner.subscription(subscription_id).await.unwrap();
    assert_eq!(persisted.user_id, "u1");
    assert!(inner.user("u1").await.is_none());
}

#[tokio::test]
async fn test_redelivery_repairs_entitlement_after_failed_merge() {
    let inner = InMemorySubscriptionStore::new();
    let store = Arc::new(FlakyMergeStore::new(inner.clone()));
    let service = service_with(store.clone(), EntitlementPolicy::Overwrite);
    let payload = json!({"userId": "u1", "plan": "90d", "tran_ref": "TST2105900092"});

    let first = service.process_at(payload.clone(), NOW).await;
    let subscription_id = match first {
        Err(ApiError::EntitlementWrite {
            subscription_id, ..
        }) => subscription_id,
        other => panic!("expected entitlement write failure, got {:?}", other),
    };
    assert!(inner.user("u1").await.is_none());

    // Provider retries the same transaction later
    let retry = service
        .process_at(payload, NOW + time::Duration::minutes(10))
        .await;
    match retry {
        Err(ApiError::DuplicateDelivery { existing_id, .. }) => {
            assert_eq!(existing_id, subscription_id);
        }
        other => panic!("expected duplicate delivery, got {:?}", other),
    }

    assert_eq!(store.merge_attempts.load(Ordering::SeqCst), 2);
    assert_eq!(inner.subscriptions().await.len(), 1);
    let user = inner.user("u1").await.unwrap();
    assert_eq!(user.role.as_deref(), Some("vip"));
    assert_eq!(user.vip_expires_at, Some(NOW + time::Duration::days(90)));
}

#[tokio::test]
async fn test_stale_redelivery_never_shortens_newer_entitlement() {
    let store = InMemorySubscriptionStore::new();
    let service = service_with(Arc::new(store.clone()), EntitlementPolicy::Overwrite);
    let short = json!({"userId": "u1", "plan": "30d", "tran_ref": "TST-A"});

    service.process_at(short.clone(), NOW).await.unwrap();
    let year = service
        .process_at(json!({"userId": "u1", "plan": "year", "tran_ref": "TST-B"}), NOW)
        .await
        .unwrap();

    let replay = service.process_at(short, NOW).await;
    assert!(matches!(replay, Err(ApiError::DuplicateDelivery { .. })));

    let user = store.user("u1").await.unwrap();
    assert_eq!(user.vip_expires_at, Some(year.expires_at));
}

#[tokio::test]
async fn test_failed_insert_skips_merge() {
    let store = Arc::new(FailingInsertStore::default());
    let service = service_with(store.clone(), EntitlementPolicy::Overwrite);

    let result = service
        .process_at(json!({"userId": "u1", "plan": "90d"}), NOW)
        .await;

    assert!(matches!(result, Err(ApiError::Database(_))));
    assert_eq!(store.merge_attempts.load(Ordering::SeqCst), 0);
}
