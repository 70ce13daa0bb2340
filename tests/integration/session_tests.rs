//! API key and login session tests

use keygate::db::SessionRepository;
use keygate::models::SessionSource;
use keygate::services::sessions::hash_api_key;
use keygate::utils::AppError;

use crate::common::*;

#[tokio::test]
async fn test_issued_key_is_stored_as_digest() {
    let app = TestApp::new().await;
    let issued = app
        .state
        .sessions()
        .create_api_key(ids::PRIMARY_OWNER_ID, ids::USER_ID)
        .await
        .unwrap();

    assert_eq!(issued.key.len(), 50);
    assert_eq!(issued.api_key.user_id, ids::USER_ID);
    assert_eq!(issued.api_key.created_by, ids::PRIMARY_OWNER_ID);
    assert!(issued.key.starts_with(&issued.api_key.key_prefix));

    let repo = SessionRepository::new(&app.state.db);
    let found = repo
        .find_api_key_by_hash(&hash_api_key(&issued.key))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, issued.api_key.id);
    assert!(repo.find_api_key_by_hash(&issued.key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_login_opens_session() {
    let app = TestApp::new().await;
    let sessions = app.state.sessions();
    let issued = sessions
        .create_api_key(ids::PRIMARY_OWNER_ID, ids::USER_ID)
        .await
        .unwrap();

    let session = sessions.login(ids::USER_ID, "buyer", &issued.key).await.unwrap();
    assert_eq!(session.source, SessionSource::ApiKey(issued.api_key.id));
    assert!(sessions.is_logged_in(ids::USER_ID).await.unwrap());

    let err = sessions
        .login(ids::USER_ID, "buyer", &issued.key)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn test_login_with_unknown_key() {
    let app = TestApp::new().await;
    let sessions = app.state.sessions();

    let err = sessions
        .login(ids::USER_ID, "buyer", &"x".repeat(50))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Invalid API key");

    let err = sessions.login(ids::USER_ID, "buyer", "short").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(!sessions.is_logged_in(ids::USER_ID).await.unwrap());
}

#[tokio::test]
async fn test_login_with_someone_elses_key() {
    let app = TestApp::new().await;
    let sessions = app.state.sessions();
    let issued = sessions
        .create_api_key(ids::PRIMARY_OWNER_ID, ids::USER_ID)
        .await
        .unwrap();

    let err = sessions
        .login(ids::OTHER_USER_ID, "stranger", &issued.key)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotAuthorized(_)));
    assert!(!sessions.is_logged_in(ids::OTHER_USER_ID).await.unwrap());
}

#[tokio::test]
async fn test_revoke_removes_keys_and_session() {
    let app = TestApp::new().await;
    let sessions = app.state.sessions();
    let first = sessions
        .create_api_key(ids::PRIMARY_OWNER_ID, ids::USER_ID)
        .await
        .unwrap();
    sessions
        .create_api_key(ids::PRIMARY_OWNER_ID, ids::USER_ID)
        .await
        .unwrap();
    sessions.login(ids::USER_ID, "buyer", &first.key).await.unwrap();

    let summary = sessions.revoke(ids::USER_ID).await.unwrap();
    assert_eq!(summary.api_keys_removed, 2);
    assert!(summary.session_removed);
    assert!(!sessions.is_logged_in(ids::USER_ID).await.unwrap());

    let err = sessions.login(ids::USER_ID, "buyer", &first.key).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let summary = sessions.revoke(ids::USER_ID).await.unwrap();
    assert_eq!(summary.api_keys_removed, 0);
    assert!(!summary.session_removed);
}

#[tokio::test]
async fn test_revoke_closes_redeemed_key_session() {
    let app = TestApp::new().await;
    app.state.keys().seed_demo_keys().await.unwrap();
    app.state
        .keys()
        .redeem(ids::USER_ID, "buyer", "DEMO-KEY-2")
        .await
        .unwrap();

    let summary = app.state.sessions().revoke(ids::USER_ID).await.unwrap();
    assert_eq!(summary.api_keys_removed, 0);
    assert!(summary.session_removed);
}
