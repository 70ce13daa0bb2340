//! Entitlement engine tests: whitelist, blacklist, HWID and stats

use chrono::{Duration, Utc};
use rstest::rstest;

use keygate::db::EntitlementRepository;
use keygate::models::{is_active_at, BlacklistTerm, EntitlementStatus, MAX_DURATION_DAYS};
use keygate::utils::AppError;

use crate::common::*;

#[tokio::test]
async fn test_whitelist_activates_user() {
    let app = TestApp::new().await;
    let entitlements = app.state.entitlements();

    let entitlement = entitlements.whitelist(ids::USER_ID, "buyer", 30).await.unwrap();
    assert_eq!(entitlement.status, EntitlementStatus::Active);
    assert!(entitlement.hwid.is_none());
    assert!(entitlement.expires_at > Utc::now() + Duration::days(29));
    assert!(entitlements.is_active(ids::USER_ID).await.unwrap());
}

#[rstest]
#[case(0)]
#[case(-5)]
#[tokio::test]
async fn test_whitelist_rejects_non_positive_days(#[case] days: i64) {
    let app = TestApp::new().await;
    let err = app
        .state
        .entitlements()
        .whitelist(ids::USER_ID, "buyer", days)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert!(app.state.entitlements().get_user(ids::USER_ID).await.unwrap().is_none());
}

#[rstest]
#[case(MAX_DURATION_DAYS + 1)]
#[case(1_000_000_000)]
#[case(i64::MAX)]
#[tokio::test]
async fn test_whitelist_rejects_days_beyond_limit(#[case] days: i64) {
    let app = TestApp::new().await;
    let err = app
        .state
        .entitlements()
        .whitelist(ids::USER_ID, "buyer", days)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert!(app.state.entitlements().get_user(ids::USER_ID).await.unwrap().is_none());
}

#[tokio::test]
async fn test_whitelist_accepts_longest_window() {
    let app = TestApp::new().await;
    let entitlement = app
        .state
        .entitlements()
        .whitelist(ids::USER_ID, "buyer", MAX_DURATION_DAYS)
        .await
        .unwrap();
    assert!(entitlement.expires_at > Utc::now() + Duration::days(MAX_DURATION_DAYS - 1));
}

#[tokio::test]
async fn test_rewhitelist_replaces_window_and_keeps_hwid() {
    let app = TestApp::new().await;
    let entitlements = app.state.entitlements();
    let first = entitlements.whitelist(ids::USER_ID, "buyer", 30).await.unwrap();
    entitlements.bind_hwid(ids::USER_ID, "HWID-ABC").await.unwrap();

    let second = entitlements.whitelist(ids::USER_ID, "buyer", 2).await.unwrap();
    assert!(second.expires_at < first.expires_at);
    assert_eq!(second.hwid.as_deref(), Some("HWID-ABC"));
    assert_eq!(second.created_at, first.created_at);
}

#[tokio::test]
async fn test_expired_entitlement_is_inactive() {
    let app = TestApp::new().await;
    let now = Utc::now();
    EntitlementRepository::new(&app.state.db)
        .upsert_grant(ids::USER_ID, "buyer", now - Duration::seconds(1), now - Duration::days(3))
        .await
        .unwrap();

    let entitlements = app.state.entitlements();
    let stored = entitlements.get_user(ids::USER_ID).await.unwrap().unwrap();
    // Expiry is lazy: the stored flag never changes
    assert_eq!(stored.status, EntitlementStatus::Active);
    assert!(!entitlements.is_active(ids::USER_ID).await.unwrap());
}

#[tokio::test]
async fn test_entitlement_inactive_exactly_at_expiry() {
    let app = TestApp::new().await;
    let entitlement = app
        .state
        .entitlements()
        .whitelist(ids::USER_ID, "buyer", 1)
        .await
        .unwrap();

    let at = entitlement.expires_at;
    assert!(is_active_at(Some(&entitlement), None, at - Duration::microseconds(1)));
    assert!(!is_active_at(Some(&entitlement), None, at));
}

#[tokio::test]
async fn test_blacklist_masks_without_touching_entitlement() {
    let app = TestApp::new().await;
    let entitlements = app.state.entitlements();
    entitlements.whitelist(ids::USER_ID, "buyer", 30).await.unwrap();

    let entry = entitlements
        .blacklist(ids::USER_ID, "buyer", 0, "sharing keys")
        .await
        .unwrap();
    assert_eq!(entry.term, BlacklistTerm::Permanent);

    assert!(!entitlements.is_active(ids::USER_ID).await.unwrap());
    assert!(entitlements.is_blacklisted(ids::USER_ID).await.unwrap());
    let stored = entitlements.get_user(ids::USER_ID).await.unwrap().unwrap();
    assert_eq!(stored.status, EntitlementStatus::Active);

    entitlements.unblacklist(ids::USER_ID).await.unwrap();
    assert!(entitlements.is_active(ids::USER_ID).await.unwrap());
}

#[tokio::test]
async fn test_timed_blacklist() {
    let app = TestApp::new().await;
    let entitlements = app.state.entitlements();

    let entry = entitlements
        .blacklist(ids::USER_ID, "buyer", 3, "spam")
        .await
        .unwrap();
    let until = entry.term.unblacklist_at().unwrap();
    assert!(until > Utc::now() + Duration::days(2));
    assert!(entry.is_in_effect_at(until - Duration::seconds(1)));
    assert!(!entry.is_in_effect_at(until));

    let info = entitlements.blacklist_info(ids::USER_ID).await.unwrap().unwrap();
    assert_eq!(info.reason, "spam");
}

#[tokio::test]
async fn test_reblacklist_replaces_entry() {
    let app = TestApp::new().await;
    let entitlements = app.state.entitlements();
    entitlements.blacklist(ids::USER_ID, "buyer", 0, "first").await.unwrap();
    entitlements.blacklist(ids::USER_ID, "buyer", 5, "second").await.unwrap();

    let info = entitlements.blacklist_info(ids::USER_ID).await.unwrap().unwrap();
    assert_eq!(info.reason, "second");
    assert!(!info.term.is_permanent());
}

#[tokio::test]
async fn test_blacklist_rejects_negative_days() {
    let app = TestApp::new().await;
    let err = app
        .state
        .entitlements()
        .blacklist(ids::USER_ID, "buyer", -1, "nope")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[rstest]
#[case(MAX_DURATION_DAYS + 1)]
#[case(i64::MAX)]
#[tokio::test]
async fn test_blacklist_rejects_days_beyond_limit(#[case] days: i64) {
    let app = TestApp::new().await;
    let entitlements = app.state.entitlements();
    let err = entitlements
        .blacklist(ids::USER_ID, "buyer", days, "x")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert!(!entitlements.is_blacklisted(ids::USER_ID).await.unwrap());
}

#[tokio::test]
async fn test_unblacklist_unknown_user() {
    let app = TestApp::new().await;
    let err = app
        .state
        .entitlements()
        .unblacklist(ids::USER_ID)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "User is not blacklisted");
}

#[tokio::test]
async fn test_bind_hwid_rules() {
    let app = TestApp::new().await;
    let entitlements = app.state.entitlements();

    let err = entitlements.bind_hwid(ids::USER_ID, "HWID-1").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    entitlements.whitelist(ids::USER_ID, "buyer", 30).await.unwrap();
    let bound = entitlements.bind_hwid(ids::USER_ID, "HWID-1").await.unwrap();
    assert_eq!(bound.hwid.as_deref(), Some("HWID-1"));

    // Same value again is fine, a different one is not
    entitlements.bind_hwid(ids::USER_ID, "HWID-1").await.unwrap();
    let err = entitlements.bind_hwid(ids::USER_ID, "HWID-2").await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    entitlements.reset_hwid(ids::USER_ID, "manager").await.unwrap();
    let rebound = entitlements.bind_hwid(ids::USER_ID, "HWID-2").await.unwrap();
    assert_eq!(rebound.hwid.as_deref(), Some("HWID-2"));
}

#[tokio::test]
async fn test_bind_hwid_requires_active_user() {
    let app = TestApp::new().await;
    let entitlements = app.state.entitlements();
    entitlements.whitelist(ids::USER_ID, "buyer", 30).await.unwrap();
    entitlements.blacklist(ids::USER_ID, "buyer", 0, "fraud").await.unwrap();

    let err = entitlements.bind_hwid(ids::USER_ID, "HWID-1").await.unwrap_err();
    assert!(matches!(err, AppError::NotAuthorized(_)));

    let err = entitlements.bind_hwid(ids::USER_ID, "bad hwid!").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn test_reset_hwid_unknown_user() {
    let app = TestApp::new().await;
    let err = app
        .state
        .entitlements()
        .reset_hwid(ids::USER_ID, "manager")
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "User not found in the database");
}

#[tokio::test]
async fn test_self_reset_hwid_follows_flag() {
    let app = TestApp::new().await;
    let entitlements = app.state.entitlements();
    entitlements.whitelist(ids::USER_ID, "buyer", 30).await.unwrap();
    entitlements.bind_hwid(ids::USER_ID, "HWID-1").await.unwrap();

    let err = entitlements.self_reset_hwid(ids::USER_ID).await.unwrap_err();
    assert!(matches!(err, AppError::FeatureDisabled(_)));

    let mut config = test_config();
    config.bot.enable_self_hwid_reset = true;
    let app = TestApp::with_config(config).await;
    let entitlements = app.state.entitlements();
    entitlements.whitelist(ids::USER_ID, "buyer", 30).await.unwrap();
    entitlements.bind_hwid(ids::USER_ID, "HWID-1").await.unwrap();

    entitlements.self_reset_hwid(ids::USER_ID).await.unwrap();
    let stored = entitlements.get_user(ids::USER_ID).await.unwrap().unwrap();
    assert!(stored.hwid.is_none());
}

#[tokio::test]
async fn test_stats_counts() {
    let app = TestApp::new().await;
    let entitlements = app.state.entitlements();
    entitlements.whitelist(ids::USER_ID, "buyer", 30).await.unwrap();
    entitlements.whitelist(ids::OTHER_USER_ID, "stranger", 30).await.unwrap();
    entitlements
        .blacklist(ids::OTHER_USER_ID, "stranger", 0, "abuse")
        .await
        .unwrap();
    app.state.keys().seed_demo_keys().await.unwrap();
    app.state
        .keys()
        .redeem(ids::MANAGER_ID, "manager", "DEMO-KEY-1")
        .await
        .unwrap();

    let stats = entitlements.stats(ids::OTHER_USER_ID).await.unwrap();
    assert!(!stats.active);
    assert_eq!(stats.blacklist.unwrap().reason, "abuse");
    assert_eq!(stats.total_active_users, 2);
    assert_eq!(stats.total_keys, 5);
    assert_eq!(stats.redeemed_keys, 1);
}
