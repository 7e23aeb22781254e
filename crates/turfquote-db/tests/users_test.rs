//! Integration tests for the `users` queries.
//!
//! Each test runs against its own migrated database on the shared
//! PostgreSQL provided by `turfquote-test-utils`.

use turfquote_db::config::DbConfig;
use turfquote_db::models::SubscriptionTier;
use turfquote_db::pool;
use turfquote_db::queries::users::{self, ConflictField, NewUser, UserConflict};
use turfquote_test_utils::TestDb;

#[tokio::test]
async fn create_and_get_user() {
    let db = TestDb::create().await;

    let new = NewUser {
        external_id: "user_2abc".to_owned(),
        email: "jane@example.com".to_owned(),
        first_name: "Jane".to_owned(),
        last_name: "Doe".to_owned(),
        subscription_tier: SubscriptionTier::Free,
    };
    let created = users::create_user(&db.pool, &new)
        .await
        .expect("create_user should succeed");

    assert_eq!(created.external_id, "user_2abc");
    assert_eq!(created.email, "jane@example.com");
    assert_eq!(created.display_name(), "Jane Doe");
    assert_eq!(created.subscription_tier, SubscriptionTier::Free);
    assert_eq!(created.customer_id, "");

    let fetched = users::get_user(&db.pool, "user_2abc")
        .await
        .expect("get_user should succeed")
        .expect("user should exist");
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.created_at, created.created_at);

    db.teardown().await;
}

#[tokio::test]
async fn get_missing_user_returns_none() {
    let db = TestDb::create().await;

    let missing = users::get_user(&db.pool, "user_nobody")
        .await
        .expect("get_user should succeed");
    assert!(missing.is_none());

    db.teardown().await;
}

#[tokio::test]
async fn names_default_to_empty() {
    let db = TestDb::create().await;

    let user = db.seed_user("user_bare").await;
    assert_eq!(user.first_name, "");
    assert_eq!(user.last_name, "");
    assert_eq!(user.display_name(), "");
    assert_eq!(user.subscription_tier, SubscriptionTier::Free);

    db.teardown().await;
}

#[tokio::test]
async fn duplicate_external_id_is_rejected() {
    let db = TestDb::create().await;

    db.seed_user("user_dup").await;
    let again = NewUser {
        external_id: "user_dup".to_owned(),
        email: "other@example.com".to_owned(),
        ..NewUser::default()
    };
    let err = users::create_user(&db.pool, &again).await.unwrap_err();
    let conflict = err
        .downcast_ref::<UserConflict>()
        .expect("duplicate should be a UserConflict");
    assert_eq!(conflict.field, ConflictField::ExternalId);
    assert_eq!(err.to_string(), "user user_dup already exists");

    db.teardown().await;
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let db = TestDb::create().await;

    db.seed_user("user_one").await;
    let clash = NewUser {
        external_id: "user_two".to_owned(),
        email: "user_one@example.com".to_owned(),
        ..NewUser::default()
    };
    let err = users::create_user(&db.pool, &clash).await.unwrap_err();
    let conflict = err
        .downcast_ref::<UserConflict>()
        .expect("duplicate email should be a UserConflict");
    assert_eq!(conflict.field, ConflictField::Email);
    assert_eq!(conflict.value, "user_one@example.com");

    db.teardown().await;
}

#[tokio::test]
async fn update_subscription_tier_changes_tier() {
    let db = TestDb::create().await;

    let user = db.seed_user("user_upgrade").await;
    let updated =
        users::update_subscription_tier(&db.pool, "user_upgrade", SubscriptionTier::Premium)
            .await
            .expect("update should succeed");

    assert_eq!(updated.id, user.id);
    assert_eq!(updated.subscription_tier, SubscriptionTier::Premium);
    assert!(updated.updated_at >= user.updated_at);

    let fetched = users::get_user(&db.pool, "user_upgrade")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.subscription_tier, SubscriptionTier::Premium);

    db.teardown().await;
}

#[tokio::test]
async fn update_subscription_tier_for_missing_user_fails() {
    let db = TestDb::create().await;

    let err = users::update_subscription_tier(&db.pool, "user_ghost", SubscriptionTier::Basic)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not found"), "unexpected: {err}");

    db.teardown().await;
}

#[tokio::test]
async fn insert_if_absent_keeps_first_row() {
    let db = TestDb::create().await;

    let first = NewUser {
        external_id: "user_once".to_owned(),
        email: "once@example.com".to_owned(),
        first_name: "First".to_owned(),
        ..NewUser::default()
    };
    let created = users::insert_user_if_absent(&db.pool, &first)
        .await
        .unwrap()
        .expect("first insert should store the row");

    let second = NewUser {
        first_name: "Second".to_owned(),
        ..first.clone()
    };
    let skipped = users::insert_user_if_absent(&db.pool, &second).await.unwrap();
    assert!(skipped.is_none());

    let stored = users::get_user(&db.pool, "user_once").await.unwrap().unwrap();
    assert_eq!(stored.id, created.id);
    assert_eq!(stored.first_name, "First");

    db.teardown().await;
}

#[tokio::test]
async fn insert_if_absent_concurrent_deliveries_store_one_row() {
    let db = TestDb::create().await;

    let new = NewUser {
        external_id: "user_race".to_owned(),
        email: "race@example.com".to_owned(),
        ..NewUser::default()
    };
    let (a, b) = tokio::join!(
        users::insert_user_if_absent(&db.pool, &new),
        users::insert_user_if_absent(&db.pool, &new),
    );
    let stored = [a.unwrap(), b.unwrap()];
    assert_eq!(stored.iter().filter(|u| u.is_some()).count(), 1);

    db.teardown().await;
}

#[tokio::test]
async fn insert_if_absent_reports_email_conflict() {
    let db = TestDb::create().await;

    db.seed_user("user_owner").await;
    let clash = NewUser {
        external_id: "user_intruder".to_owned(),
        email: "user_owner@example.com".to_owned(),
        ..NewUser::default()
    };
    let err = users::insert_user_if_absent(&db.pool, &clash)
        .await
        .unwrap_err();
    let conflict = err.downcast_ref::<UserConflict>().unwrap();
    assert_eq!(conflict.field, ConflictField::Email);

    db.teardown().await;
}

#[tokio::test]
async fn count_by_tier_lists_every_tier() {
    let db = TestDb::create().await;

    db.seed_user("user_a").await;
    db.seed_user("user_b").await;
    users::update_subscription_tier(&db.pool, "user_b", SubscriptionTier::Premium)
        .await
        .unwrap();

    let counts = users::count_by_tier(&db.pool).await.expect("should count");
    assert_eq!(
        counts,
        vec![
            (SubscriptionTier::Free, 1),
            (SubscriptionTier::Basic, 0),
            (SubscriptionTier::Premium, 1),
        ]
    );

    db.teardown().await;
}

#[tokio::test]
async fn prepare_database_is_idempotent_on_existing_db() {
    let db = TestDb::create().await;
    db.seed_user("user_existing").await;

    let report = pool::prepare_database(&DbConfig::new(db.url.clone()))
        .await
        .expect("prepare should succeed");
    assert_eq!(report.database, db.name);
    assert!(!report.created);
    assert_eq!(report.migrations, pool::MIGRATOR.iter().count());
    assert_eq!(report.users_by_tier[0], (SubscriptionTier::Free, 1));

    db.teardown().await;
}
