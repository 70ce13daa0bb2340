//! Interaction dispatcher tests: gating, reply text and deliveries

use keygate::models::{
    Actor, Command, ComponentId, DeliveryReport, Interaction, InboundEvent, OwnerAction,
    REDEEM_MODAL_ID,
};

use crate::common::*;

/// Issue an API key to `actor` and log them in
async fn log_in(app: &TestApp, actor: &Actor) {
    let issued = app
        .state
        .sessions()
        .create_api_key(ids::PRIMARY_OWNER_ID, &actor.id)
        .await
        .unwrap();
    app.state
        .sessions()
        .login(&actor.id, &actor.display_name, &issued.key)
        .await
        .unwrap();
}

fn whitelist_cmd(target: &Actor, days: Option<i64>) -> Command {
    Command::Whitelist {
        user: user_ref(target),
        days,
    }
}

#[tokio::test]
async fn test_generate_api_then_login() {
    let app = TestApp::new().await;
    let user = ActorFixtures::user();

    let reply = app
        .dispatch(command_event(
            &ActorFixtures::manager(),
            Command::GenerateApi {
                user: user_ref(&user),
            },
        ))
        .await;
    assert!(reply.ephemeral);
    assert!(reply.content.starts_with("✅ **API Key Generated**"));
    assert_eq!(reply.delivery, Some(DeliveryReport::Delivered));

    let dms = app.platform.direct_messages_to(ids::USER_ID);
    assert_eq!(dms.len(), 1);
    assert!(dms[0].0.contains("Test Guild"));
    let key = dms[0]
        .0
        .split("```")
        .nth(1)
        .expect("key in code block")
        .to_string();

    let reply = app
        .dispatch(command_event(&user, Command::Login { apikey: key }))
        .await;
    assert!(reply.content.starts_with("✅ **Login Successful!**"));
    assert!(app.state.sessions().is_logged_in(ids::USER_ID).await.unwrap());
}

#[tokio::test]
async fn test_generate_api_reports_failed_dm() {
    let app = TestApp::new().await;
    app.platform.set_failing(true);

    let reply = app
        .dispatch(command_event(
            &ActorFixtures::primary_owner(),
            Command::GenerateApi {
                user: user_ref(&ActorFixtures::user()),
            },
        ))
        .await;

    assert!(reply.content.starts_with("❌ Could not DM"));
    assert!(matches!(reply.delivery, Some(DeliveryReport::Failed { .. })));
    // The key exists even though delivery failed
    assert!(reply.content.contains("API Key: `"));
}

#[tokio::test]
async fn test_generate_api_requires_manager_role() {
    let app = TestApp::new().await;
    let reply = app
        .dispatch(command_event(
            &ActorFixtures::user(),
            Command::GenerateApi {
                user: user_ref(&ActorFixtures::other_user()),
            },
        ))
        .await;
    assert!(reply.content.starts_with("❌ You need the Manager role"));
    assert!(app.platform.calls().is_empty());
}

#[tokio::test]
async fn test_whitelist_gating() {
    let app = TestApp::new().await;
    let manager = ActorFixtures::manager();
    let user = ActorFixtures::user();

    // Role alone is not enough
    let reply = app.dispatch(command_event(&manager, whitelist_cmd(&user, Some(7)))).await;
    assert!(reply.content.starts_with("🔒 **Authentication Required!**"));
    assert!(app.state.entitlements().get_user(ids::USER_ID).await.unwrap().is_none());

    log_in(&app, &manager).await;
    let reply = app.dispatch(command_event(&manager, whitelist_cmd(&user, Some(7)))).await;
    assert!(!reply.ephemeral);
    assert_eq!(
        reply.content,
        format!(
            "<@{}> you have been whitelisted! go to panel to use script.",
            ids::USER_ID
        )
    );
    assert!(app.state.entitlements().is_active(ids::USER_ID).await.unwrap());
}

#[tokio::test]
async fn test_whitelist_rejects_zero_days() {
    let app = TestApp::new().await;
    let reply = app
        .dispatch(command_event(
            &ActorFixtures::primary_owner(),
            whitelist_cmd(&ActorFixtures::user(), Some(0)),
        ))
        .await;
    assert_eq!(reply.content, "❌ Days must be a positive number");
}

#[tokio::test]
async fn test_whitelist_rejects_days_beyond_limit() {
    let app = TestApp::new().await;
    let reply = app
        .dispatch(command_event(
            &ActorFixtures::primary_owner(),
            whitelist_cmd(&ActorFixtures::user(), Some(1_000_000_000)),
        ))
        .await;
    assert_eq!(reply.content, "❌ Days cannot exceed 36500");
    assert!(app.state.entitlements().get_user(ids::USER_ID).await.unwrap().is_none());
}

#[tokio::test]
async fn test_blacklist_and_stats() {
    let app = TestApp::new().await;
    let owner = ActorFixtures::primary_owner();
    let user = ActorFixtures::user();

    app.dispatch(command_event(&owner, whitelist_cmd(&user, None))).await;
    let reply = app
        .dispatch(command_event(
            &owner,
            Command::Blacklist {
                user: user_ref(&user),
                days: 0,
                reason: "chargeback".to_string(),
            },
        ))
        .await;
    assert!(reply.content.contains("you have been blacklisted!⛔️"));

    // Stats need a session only, so the reason stays readable
    log_in(&app, &user).await;
    let reply = app
        .dispatch(component_event(&user, ComponentId::GetStats))
        .await;
    assert!(reply.content.contains("Your Status: ❌ Inactive"));
    assert!(reply.content.contains("Reason: chargeback"));
    assert!(reply.content.contains("Duration: Permanent"));

    // Whitelisted buttons are refused
    let reply = app
        .dispatch(component_event(&user, ComponentId::GetScript))
        .await;
    assert_eq!(reply.content, "❌ Your whitelist has expired or is inactive.");
}

#[tokio::test]
async fn test_gen_keys_sends_attachment() {
    let app = TestApp::new().await;
    let user = ActorFixtures::user();

    let reply = app
        .dispatch(command_event(
            &ActorFixtures::primary_owner(),
            Command::GenKeys {
                user: user_ref(&user),
                amount: 3,
                days: Some(14),
            },
        ))
        .await;
    assert!(reply.content.contains("**3** keys"));
    assert_eq!(reply.delivery, Some(DeliveryReport::Delivered));

    let dms = app.platform.direct_messages_to(ids::USER_ID);
    let attachment = dms[0].1.clone().expect("keys attached");
    assert!(attachment.filename.starts_with("keys-buyer-"));
    assert!(attachment.filename.ends_with(".txt"));
    let body = String::from_utf8(attachment.bytes).unwrap();
    let codes: Vec<&str> = body.lines().collect();
    assert_eq!(codes.len(), 3);
    for code in codes {
        let key = app.state.keys().get(code).await.unwrap().unwrap();
        assert_eq!(key.duration_days, 14);
        assert_eq!(key.created_by, ids::PRIMARY_OWNER_ID);
    }
}

#[tokio::test]
async fn test_list_keys() {
    let app = TestApp::new().await;
    let owner = ActorFixtures::primary_owner();

    let reply = app.dispatch(command_event(&owner, Command::ListKeys)).await;
    assert_eq!(reply.content, "📋 No keys found.");

    app.state.keys().seed_demo_keys().await.unwrap();
    let reply = app.dispatch(command_event(&owner, Command::ListKeys)).await;
    assert!(reply.content.contains("⏳ `DEMO-KEY-1` - unused (30d)"));
    assert!(reply.content.ends_with("Showing 5 of 5 keys"));
}

#[tokio::test]
async fn test_redeem_flow_through_panel() {
    let app = TestApp::new().await;
    app.state.keys().seed_demo_keys().await.unwrap();
    let user = ActorFixtures::user();

    let reply = app
        .dispatch(component_event(&user, ComponentId::RedeemKey))
        .await;
    let modal = reply.modal.expect("redeem opens a modal");
    assert_eq!(modal.custom_id, REDEEM_MODAL_ID);

    let reply = app.dispatch(redeem_modal_event(&user, "DEMO-KEY-3")).await;
    assert!(reply.content.starts_with("🔑 **Key Redeemed Successfully!**"));
    assert!(reply.content.contains("24-hour access"));

    // Logged in now: the script resolves to the redeemed key
    let reply = app
        .dispatch(component_event(&user, ComponentId::GetScript))
        .await;
    assert_eq!(reply.content, "✅ Script sent to your DMs!");
    let dms = app.platform.direct_messages_to(ids::USER_ID);
    let script = dms.last().unwrap().1.clone().unwrap();
    assert_eq!(script.filename, "loader.lua");
    assert!(String::from_utf8(script.bytes).unwrap().contains("DEMO-KEY-3"));

    // A second redeem is refused
    let reply = app
        .dispatch(component_event(&user, ComponentId::RedeemKey))
        .await;
    assert!(reply.modal.is_none());
    assert!(reply.content.contains("already logged in"));
}

#[tokio::test]
async fn test_owner_cannot_redeem() {
    let app = TestApp::new().await;
    app.state.keys().seed_demo_keys().await.unwrap();

    let reply = app
        .dispatch(redeem_modal_event(&ActorFixtures::primary_owner(), "DEMO-KEY-1"))
        .await;
    assert!(reply.content.starts_with("❌ You are already logged in"));
}

#[tokio::test]
async fn test_redeem_modal_validation() {
    let app = TestApp::new().await;
    let user = ActorFixtures::user();

    let reply = app.dispatch(redeem_modal_event(&user, "   ")).await;
    assert_eq!(reply.content, "❌ Please enter a key");

    let reply = app.dispatch(redeem_modal_event(&user, "UNKNOWN")).await;
    assert_eq!(reply.content, "❌ Invalid key");

    let reply = app
        .dispatch(InboundEvent {
            actor: user,
            guild_name: None,
            interaction: Interaction::ModalSubmit {
                custom_id: "something_else".to_string(),
                values: Default::default(),
            },
        })
        .await;
    assert_eq!(reply.content, "❌ Unknown form");
}

#[tokio::test]
async fn test_panel_buttons_require_login() {
    let app = TestApp::new().await;
    let user = ActorFixtures::user();
    app.state
        .entitlements()
        .whitelist(ids::USER_ID, "buyer", 30)
        .await
        .unwrap();

    for button in [
        ComponentId::GetScript,
        ComponentId::ResetHwid,
        ComponentId::GetRole,
        ComponentId::GetStats,
        ComponentId::CheckStatus,
    ] {
        let reply = app.dispatch(component_event(&user, button)).await;
        assert!(
            reply.content.starts_with("🔒 **Authentication Required!**"),
            "{:?} should need a session",
            button
        );
    }
}

#[tokio::test]
async fn test_self_reset_hwid_button_disabled() {
    let app = TestApp::new().await;
    let user = ActorFixtures::user();
    app.state
        .entitlements()
        .whitelist(ids::USER_ID, "buyer", 30)
        .await
        .unwrap();
    log_in(&app, &user).await;

    let reply = app
        .dispatch(component_event(&user, ComponentId::ResetHwid))
        .await;
    assert_eq!(
        reply.content,
        "❌ Self-service HWID reset is disabled. Contact an administrator."
    );
}

#[tokio::test]
async fn test_get_role_creates_fallback_buyer_role() {
    let app = TestApp::new().await;
    let user = ActorFixtures::user();
    app.state
        .entitlements()
        .whitelist(ids::USER_ID, "buyer", 30)
        .await
        .unwrap();
    log_in(&app, &user).await;

    let reply = app
        .dispatch(component_event(&user, ComponentId::GetRole))
        .await;
    assert_eq!(reply.content, "✅ Buyer role has been assigned to you!");
    assert_eq!(app.platform.roles_assigned_to(ids::USER_ID), vec!["role-1"]);
}

#[tokio::test]
async fn test_set_panel_posts_and_uses_configured_roles() {
    let app = TestApp::new().await;
    let reply = app
        .dispatch(command_event(
            &ActorFixtures::manager(),
            Command::SetPanel {
                channel: ids::PANEL_CHANNEL_ID.to_string(),
                script: "return \"{{KEY}}\"".to_string(),
                buyer_role: ids::BUYER_ROLE_ID.to_string(),
                manager_role: ids::MANAGER_ROLE_ID.to_string(),
            },
        ))
        .await;
    assert_eq!(
        reply.content,
        format!("✅ Panel configured successfully in <#{}>!", ids::PANEL_CHANNEL_ID)
    );

    let panel = app.state.panel().get().await.unwrap().unwrap();
    assert!(panel.panel_message_id.is_some());

    let user = ActorFixtures::user();
    app.state
        .entitlements()
        .whitelist(ids::USER_ID, "buyer", 30)
        .await
        .unwrap();
    log_in(&app, &user).await;
    app.dispatch(component_event(&user, ComponentId::GetRole)).await;
    assert_eq!(
        app.platform.roles_assigned_to(ids::USER_ID),
        vec![ids::BUYER_ROLE_ID]
    );

    // Whitelist replies now point at the panel channel
    let reply = app
        .dispatch(command_event(
            &ActorFixtures::primary_owner(),
            whitelist_cmd(&ActorFixtures::other_user(), Some(1)),
        ))
        .await;
    assert!(reply.content.contains(&format!("go to <#{}>", ids::PANEL_CHANNEL_ID)));
}

#[tokio::test]
async fn test_set_panel_failed_post_keeps_config() {
    let app = TestApp::new().await;
    app.platform.set_failing(true);

    let reply = app
        .dispatch(command_event(
            &ActorFixtures::primary_owner(),
            Command::SetPanel {
                channel: ids::PANEL_CHANNEL_ID.to_string(),
                script: "{{KEY}}".to_string(),
                buyer_role: ids::BUYER_ROLE_ID.to_string(),
                manager_role: ids::MANAGER_ROLE_ID.to_string(),
            },
        ))
        .await;
    assert!(matches!(reply.delivery, Some(DeliveryReport::Failed { .. })));

    let panel = app.state.panel().get().await.unwrap().unwrap();
    assert_eq!(panel.channel_id, ids::PANEL_CHANNEL_ID);
    assert!(panel.panel_message_id.is_none());
}

#[tokio::test]
async fn test_status_and_panel_commands() {
    let app = TestApp::new().await;
    let user = ActorFixtures::user();
    log_in(&app, &user).await;

    let reply = app.dispatch(command_event(&user, Command::Status)).await;
    assert_eq!(reply.content, "❌ You are not whitelisted.");

    app.state
        .entitlements()
        .whitelist(ids::USER_ID, "buyer", 30)
        .await
        .unwrap();
    let reply = app.dispatch(command_event(&user, Command::Status)).await;
    assert!(reply.content.contains("Status: ✅ Active"));
    assert!(reply.content.contains("Blacklisted: ✅ No"));
    assert!(reply.content.contains("HWID: Not set"));

    let reply = app.dispatch(command_event(&user, Command::Panel)).await;
    assert!(reply.content.starts_with("🎮 **User Control Panel**"));
}

#[tokio::test]
async fn test_revoke_api_command() {
    let app = TestApp::new().await;
    let user = ActorFixtures::user();
    log_in(&app, &user).await;

    let reply = app
        .dispatch(command_event(
            &ActorFixtures::primary_owner(),
            Command::RevokeApi {
                user: user_ref(&user),
            },
        ))
        .await;
    assert_eq!(
        reply.content,
        "✅ Revoked **1** API key(s) for **buyer** and closed their session."
    );
    assert!(!app.state.sessions().is_logged_in(ids::USER_ID).await.unwrap());
}

#[tokio::test]
async fn test_owner_whitelist_command() {
    let app = TestApp::new().await;
    let owner = ActorFixtures::primary_owner();
    let user = ActorFixtures::user();

    let reply = app
        .dispatch(command_event(
            &owner,
            Command::OwnerWl {
                user: user_ref(&user),
                action: OwnerAction::Add,
            },
        ))
        .await;
    assert!(reply.content.starts_with("👑 **Owner Added**"));

    let reply = app
        .dispatch(command_event(
            &user,
            Command::OwnerWl {
                user: user_ref(&owner),
                action: OwnerAction::Remove,
            },
        ))
        .await;
    assert_eq!(reply.content, "❌ The primary owner cannot be removed");

    let reply = app
        .dispatch(command_event(
            &ActorFixtures::other_user(),
            Command::OwnerWl {
                user: user_ref(&user),
                action: OwnerAction::Remove,
            },
        ))
        .await;
    assert_eq!(reply.content, "❌ Only owners can use this command");
}
