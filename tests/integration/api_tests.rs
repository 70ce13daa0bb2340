//! HTTP ingress tests: health probes, signatures and the JSON surface

use axum::http::StatusCode;
use serde_json::json;

use keygate::api::{BindHwidResponse, DatabaseProbe, PlatformMode, Readiness};
use keygate::models::Reply;

use crate::common::*;

mod health {
    use super::*;

    #[tokio::test]
    async fn test_probes() {
        let app = TestApp::new().await;
        app.get("/api/v1/health/live").await.expect_status(StatusCode::OK);

        for uri in ["/api/v1/health", "/api/v1/health/ready"] {
            let response = app.get(uri).await;
            response.expect_status(StatusCode::OK);
            let report: Readiness = response.json();
            assert!(report.ready);
            assert_eq!(report.database, DatabaseProbe::Up);
            assert_eq!(report.platform, PlatformMode::Disabled);
        }
    }

    #[tokio::test]
    async fn test_readiness_fails_once_the_pool_is_closed() {
        let app = TestApp::new().await;
        app.state.db.close().await;

        let response = app.get("/api/v1/health/ready").await;
        response.expect_status(StatusCode::SERVICE_UNAVAILABLE);
        let report: Readiness = response.json();
        assert!(!report.ready);
        assert!(matches!(report.database, DatabaseProbe::Down(_)));

        app.get("/api/v1/health/live").await.expect_status(StatusCode::OK);
    }
}

mod interactions {
    use super::*;

    #[tokio::test]
    async fn test_signed_interaction_runs_command() {
        let app = TestApp::new().await;
        let payload = whitelist_payload(
            &ActorFixtures::primary_owner(),
            &ActorFixtures::user(),
            30,
        );

        let response = app.post_signed("/api/v1/interactions", payload).await;
        response.expect_status(StatusCode::OK);
        let reply: Reply = response.json();
        assert!(!reply.ephemeral);
        assert!(reply.content.contains("you have been whitelisted!"));
        assert!(app.state.entitlements().is_active(ids::USER_ID).await.unwrap());
    }

    #[tokio::test]
    async fn test_domain_errors_are_replies() {
        let app = TestApp::new().await;
        let payload = whitelist_payload(&ActorFixtures::user(), &ActorFixtures::other_user(), 30);

        let response = app.post_signed("/api/v1/interactions", payload).await;
        response.expect_status(StatusCode::OK);
        let reply: Reply = response.json();
        assert!(reply.ephemeral);
        assert!(reply.content.starts_with("❌"));
    }

    #[tokio::test]
    async fn test_missing_signature_is_rejected() {
        let app = TestApp::new().await;
        let payload = whitelist_payload(
            &ActorFixtures::primary_owner(),
            &ActorFixtures::user(),
            30,
        );

        let response = app
            .post_with_signature("/api/v1/interactions", payload.to_string(), None)
            .await;
        response.expect_status(StatusCode::UNAUTHORIZED);
        assert!(app.state.entitlements().get_user(ids::USER_ID).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tampered_body_is_rejected() {
        let app = TestApp::new().await;
        let signed = whitelist_payload(&ActorFixtures::primary_owner(), &ActorFixtures::user(), 1);
        let signature = keygate::middleware::sign(TEST_SIGNING_SECRET, signed.to_string().as_bytes());
        let tampered = whitelist_payload(
            &ActorFixtures::primary_owner(),
            &ActorFixtures::user(),
            365,
        );

        app.post_with_signature(
            "/api/v1/interactions",
            tampered.to_string(),
            Some(&signature),
        )
        .await
        .expect_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_wrong_secret_is_rejected() {
        let app = TestApp::new().await;
        let payload = whitelist_payload(&ActorFixtures::primary_owner(), &ActorFixtures::user(), 1)
            .to_string();
        let signature = keygate::middleware::sign("some_other_secret_value", payload.as_bytes());

        app.post_with_signature("/api/v1/interactions", payload, Some(&signature))
            .await
            .expect_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_event_is_bad_request() {
        let app = TestApp::new().await;
        let response = app
            .post_signed("/api/v1/interactions", json!({"actor": "nobody"}))
            .await;
        response.expect_status(StatusCode::BAD_REQUEST);
        let json: serde_json::Value = response.json();
        assert_eq!(json["error"], "invalid_input");
    }
}

mod hwid {
    use super::*;

    #[tokio::test]
    async fn test_bind_hwid_endpoint() {
        let app = TestApp::new().await;
        app.state
            .entitlements()
            .whitelist(ids::USER_ID, "buyer", 30)
            .await
            .unwrap();

        let response = app
            .post_signed(
                "/api/v1/hwid/bind",
                json!({"user_id": ids::USER_ID, "hwid": "HWID-XYZ"}),
            )
            .await;
        response.expect_status(StatusCode::OK);
        let bound: BindHwidResponse = response.json();
        assert_eq!(bound.hwid, "HWID-XYZ");

        app.post_signed(
            "/api/v1/hwid/bind",
            json!({"user_id": ids::USER_ID, "hwid": "HWID-OTHER"}),
        )
        .await
        .expect_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_bind_hwid_unknown_user() {
        let app = TestApp::new().await;
        app.post_signed(
            "/api/v1/hwid/bind",
            json!({"user_id": ids::USER_ID, "hwid": "HWID-XYZ"}),
        )
        .await
        .expect_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bind_hwid_blacklisted_user() {
        let app = TestApp::new().await;
        let entitlements = app.state.entitlements();
        entitlements.whitelist(ids::USER_ID, "buyer", 30).await.unwrap();
        entitlements.blacklist(ids::USER_ID, "buyer", 0, "fraud").await.unwrap();

        app.post_signed(
            "/api/v1/hwid/bind",
            json!({"user_id": ids::USER_ID, "hwid": "HWID-XYZ"}),
        )
        .await
        .expect_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_bind_hwid_validation() {
        let app = TestApp::new().await;
        app.post_signed("/api/v1/hwid/bind", json!({"user_id": "", "hwid": "x"}))
            .await
            .expect_status(StatusCode::BAD_REQUEST);
    }
}
