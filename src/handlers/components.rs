//! Panel button and modal handlers

use std::collections::HashMap;

use super::delivery;
use super::text::{active_label, grant_window, hwid_label, relative, role_mention};
use crate::models::{
    Actor, ComponentId, ModalPrompt, Reply, RoleRef, REDEEM_KEY_FIELD, REDEEM_MODAL_ID,
};
use crate::platform::Attachment;
use crate::utils::{AppError, AppResult};
use crate::AppState;

/// Role handed out by `get_role` when no panel is configured
const FALLBACK_BUYER_ROLE: &str = "Buyer";

const SCRIPT_FILENAME: &str = "loader.lua";

pub(super) async fn handle_component(
    state: &AppState,
    actor: &Actor,
    component: ComponentId,
) -> AppResult<Reply> {
    if component.requires_whitelist() {
        require_whitelisted(state, actor).await?;
    } else if component.requires_login() {
        state.authority().require_authenticated(actor).await?;
    }

    match component {
        ComponentId::GetScript => get_script(state, actor).await,
        ComponentId::ResetHwid => {
            state.entitlements().self_reset_hwid(&actor.id).await?;
            Ok(Reply::private("✅ Your HWID has been reset successfully!"))
        }
        ComponentId::GetRole => get_role(state, actor).await,
        ComponentId::RedeemKey => {
            require_can_redeem(state, actor).await?;
            Ok(Reply::modal(ModalPrompt::redeem_key()))
        }
        ComponentId::GetStats => get_stats(state, actor).await,
        ComponentId::CheckStatus => check_status(state, actor).await,
    }
}

pub(super) async fn handle_modal(
    state: &AppState,
    actor: &Actor,
    custom_id: &str,
    values: &HashMap<String, String>,
) -> AppResult<Reply> {
    if custom_id != REDEEM_MODAL_ID {
        return Err(AppError::invalid_input("Unknown form"));
    }
    let code = values
        .get(REDEEM_KEY_FIELD)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::invalid_input("Please enter a key"))?;

    require_can_redeem(state, actor).await?;

    let keys = state.keys();
    let entitlement = keys.redeem(&actor.id, &actor.display_name, code).await?;
    let key_days = keys.get(code).await?.map(|k| k.duration_days);

    Ok(Reply::private(format!(
        "🔑 **Key Redeemed Successfully!**\n\n\
         You have gained {} access to the script!\n\n\
         Your access will expire {}\n\nEnjoy using the script!",
        grant_window(&state.config.bot, key_days),
        relative(entitlement.expires_at)
    )))
}

/// Panel buttons other than redeem: logged in (or owner) and active
async fn require_whitelisted(state: &AppState, actor: &Actor) -> AppResult<()> {
    state.authority().require_authenticated(actor).await?;
    if !state.entitlements().is_active(&actor.id).await? {
        return Err(AppError::not_authorized(
            "Your whitelist has expired or is inactive.",
        ));
    }
    Ok(())
}

/// Redeem is for guests: no session, not an owner, no active entitlement
async fn require_can_redeem(state: &AppState, actor: &Actor) -> AppResult<()> {
    if state.sessions().is_logged_in(&actor.id).await?
        || state.authority().is_owner(&actor.id).await?
    {
        return Err(AppError::conflict(
            "You are already logged in. You cannot redeem another key.",
        ));
    }
    if state.entitlements().is_active(&actor.id).await? {
        return Err(AppError::conflict(
            "You already have an active session. Please wait for it to expire or contact an admin.",
        ));
    }
    Ok(())
}

async fn get_script(state: &AppState, actor: &Actor) -> AppResult<Reply> {
    let script = state.panel().resolve_script(&actor.id).await?;

    let report = delivery(
        &state
            .platform
            .send_direct_message(
                &actor.id,
                "📜 **Here's your script!**\n\nCopy and use the script below:",
                Some(Attachment::text(SCRIPT_FILENAME, &script)),
            )
            .await,
        "script dm",
    );

    let content = if report.is_delivered() {
        "✅ Script sent to your DMs!"
    } else {
        "❌ Could not send DM. Please enable DMs from server members."
    };
    Ok(Reply::private(content).with_delivery(report))
}

async fn get_role(state: &AppState, actor: &Actor) -> AppResult<Reply> {
    let platform = &state.platform;

    match state.panel().get().await? {
        Some(config) => {
            let result = if actor.has_role_id(&config.buyer_role_id) {
                Ok(())
            } else {
                platform.assign_role(&actor.id, &config.buyer_role_id).await
            };
            let report = delivery(&result, "buyer role");
            let content = if report.is_delivered() {
                format!(
                    "✅ {} role has been assigned to you!",
                    role_mention(&config.buyer_role_id)
                )
            } else {
                "❌ Could not assign the buyer role. Please contact an administrator.".to_string()
            };
            Ok(Reply::private(content).with_delivery(report))
        }
        None => {
            let result = if actor.has_role_named(FALLBACK_BUYER_ROLE) {
                Ok(())
            } else {
                assign_fallback_role(state, actor).await
            };
            let report = delivery(&result, "buyer role");
            let content = if report.is_delivered() {
                "✅ Buyer role has been assigned to you!"
            } else {
                "❌ Could not assign the buyer role. Please contact an administrator."
            };
            Ok(Reply::private(content).with_delivery(report))
        }
    }
}

/// Find or create the `Buyer` role, then assign it
async fn assign_fallback_role(state: &AppState, actor: &Actor) -> AppResult<()> {
    let platform = &state.platform;
    let role: RoleRef = match platform.find_role_by_name(FALLBACK_BUYER_ROLE).await? {
        Some(role) => role,
        None => platform.create_role(FALLBACK_BUYER_ROLE).await?,
    };
    platform.assign_role(&actor.id, &role.id).await
}

async fn get_stats(state: &AppState, actor: &Actor) -> AppResult<Reply> {
    let stats = state.entitlements().stats(&actor.id).await?;

    let mut message = String::from("**📊 Your Statistics**\n\n");
    message.push_str(&format!("Your Status: {}\n", active_label(stats.active)));
    message.push_str(&format!("Your HWID: {}\n", hwid_label(stats.hwid.as_deref())));
    if let Some(expires_at) = stats.expires_at {
        message.push_str(&format!("Expires: {}\n", relative(expires_at)));
    }

    if let Some(entry) = &stats.blacklist {
        message.push_str("\n⛔️ **BLACKLISTED**\n");
        message.push_str(&format!("Reason: {}\n", entry.reason));
        match entry.term.unblacklist_at() {
            None => message.push_str("Duration: Permanent\n"),
            Some(at) => message.push_str(&format!("Duration: Until {}\n", relative(at))),
        }
    }

    message.push_str(&format!("\nTotal Active Users: {}\n", stats.total_active_users));
    message.push_str(&format!("Total Keys: {}\n", stats.total_keys));
    message.push_str(&format!("Redeemed Keys: {}", stats.redeemed_keys));

    Ok(Reply::private(message))
}

async fn check_status(state: &AppState, actor: &Actor) -> AppResult<Reply> {
    let entitlements = state.entitlements();
    let entitlement = entitlements
        .get_user(&actor.id)
        .await?
        .ok_or_else(|| AppError::not_found("You are not whitelisted."))?;
    let active = entitlements.is_active(&actor.id).await?;

    Ok(Reply::private(format!(
        "📊 **Your Status**\n\nStatus: {}\nExpires: {}\nHWID: {}",
        active_label(active),
        relative(entitlement.expires_at),
        hwid_label(entitlement.hwid.as_deref())
    )))
}
