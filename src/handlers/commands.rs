//! Slash command handlers

use chrono::Utc;
use tracing::warn;

use super::delivery;
use super::text::{
    active_label, channel_mention, hwid_label, key_list, panel_mention, relative, user_mention,
    PANEL_MESSAGE,
};
use crate::models::{Actor, Command, OwnerAction, Reply, SetPanelRequest, UserRef};
use crate::platform::Attachment;
use crate::utils::{AppError, AppResult};
use crate::AppState;

pub(super) async fn handle(
    state: &AppState,
    actor: &Actor,
    guild_name: Option<&str>,
    command: Command,
) -> AppResult<Reply> {
    let default_days = state.config.bot.default_duration_days;

    match command {
        Command::GenerateApi { user } => generate_api(state, actor, guild_name, &user).await,
        Command::Login { apikey } => login(state, actor, &apikey).await,
        Command::SetPanel {
            channel,
            script,
            buyer_role,
            manager_role,
        } => {
            let req = SetPanelRequest {
                channel_id: channel,
                script_template: script,
                buyer_role_id: buyer_role,
                manager_role_id: manager_role,
            };
            set_panel(state, actor, req).await
        }
        Command::Whitelist { user, days } => {
            whitelist(state, actor, &user, days.unwrap_or(default_days)).await
        }
        Command::Blacklist { user, days, reason } => {
            blacklist(state, actor, &user, days, &reason).await
        }
        Command::Unblacklist { user } => unblacklist(state, actor, &user).await,
        Command::ForceResetHwid { user } => force_reset_hwid(state, actor, &user).await,
        Command::CreateKey { code, days } => {
            create_key(state, actor, &code, days.unwrap_or(default_days)).await
        }
        Command::GenKeys { user, amount, days } => {
            gen_keys(state, actor, &user, amount, days.unwrap_or(default_days)).await
        }
        Command::ListKeys => list_keys(state, actor).await,
        Command::RevokeApi { user } => revoke_api(state, actor, &user).await,
        Command::Panel => panel(state, actor).await,
        Command::Status => status(state, actor).await,
        Command::OwnerWl { user, action } => owner_wl(state, actor, &user, action).await,
    }
}

/// Manager role only, no login
async fn require_manager_role(state: &AppState, actor: &Actor) -> AppResult<()> {
    if state.authority().has_manager_role(actor).await? {
        Ok(())
    } else {
        Err(AppError::not_authorized(
            "You need the Manager role to use this command.",
        ))
    }
}

async fn generate_api(
    state: &AppState,
    actor: &Actor,
    guild_name: Option<&str>,
    user: &UserRef,
) -> AppResult<Reply> {
    require_manager_role(state, actor).await?;

    let issued = state.sessions().create_api_key(&actor.id, &user.id).await?;

    let dm = format!(
        "🔑 **Your API Key**\n\n\
         You've been given access to **{}**!\n\n\
         **You must use this API key to access the bot.**\n\n\
         ```{}```\n\
         Use `/login <apikey>` in the server to activate your access.\n\n\
         Keep this key safe and do not share it!",
        guild_name.unwrap_or("the server"),
        issued.key
    );
    let report = delivery(
        &state
            .platform
            .send_direct_message(&user.id, &dm, None)
            .await,
        "api key dm",
    );

    let content = if report.is_delivered() {
        format!(
            "✅ **API Key Generated**\n\nAPI key sent to **{}** via DM!\n\nKey: `{}`",
            user.display_name, issued.key
        )
    } else {
        format!(
            "❌ Could not DM **{}**. They may have DMs disabled.\n\nAPI Key: `{}`",
            user.display_name, issued.key
        )
    };
    Ok(Reply::private(content).with_delivery(report))
}

async fn login(state: &AppState, actor: &Actor, api_key: &str) -> AppResult<Reply> {
    state
        .sessions()
        .login(&actor.id, &actor.display_name, api_key)
        .await?;

    Ok(Reply::private(
        "✅ **Login Successful!**\n\n\
         You are now authenticated with your API key and can use all bot commands!\n\n\
         Use `/panel` to access your control panel",
    ))
}

async fn set_panel(state: &AppState, actor: &Actor, req: SetPanelRequest) -> AppResult<Reply> {
    require_manager_role(state, actor).await?;

    let panel = state.panel();
    let config = panel.set(&req).await?;

    let posted = state
        .platform
        .send_message(&config.channel_id, PANEL_MESSAGE)
        .await;
    if let Ok(message_id) = &posted {
        if let Err(err) = panel.set_message_id(message_id).await {
            warn!(error = %err, message_id = %message_id, "Failed to record panel message");
        }
    }
    let report = delivery(&posted, "panel post");

    let channel = channel_mention(&config.channel_id);
    let content = if report.is_delivered() {
        format!("✅ Panel configured successfully in {}!", channel)
    } else {
        format!(
            "❌ Panel configuration saved, but posting it failed. \
             Make sure I have permission to send messages in {}.",
            channel
        )
    };
    Ok(Reply::private(content).with_delivery(report))
}

async fn whitelist(state: &AppState, actor: &Actor, user: &UserRef, days: i64) -> AppResult<Reply> {
    state.authority().require_manager(actor).await?;

    state
        .entitlements()
        .whitelist(&user.id, &user.display_name, days)
        .await?;
    let panel = state.panel().get().await?;

    Ok(Reply::public(format!(
        "{} you have been whitelisted! go to {} to use script.",
        user_mention(&user.id),
        panel_mention(panel.as_ref())
    )))
}

async fn blacklist(
    state: &AppState,
    actor: &Actor,
    user: &UserRef,
    days: i64,
    reason: &str,
) -> AppResult<Reply> {
    state.authority().require_manager(actor).await?;

    state
        .entitlements()
        .blacklist(&user.id, &user.display_name, days, reason)
        .await?;
    let panel = state.panel().get().await?;

    Ok(Reply::public(format!(
        "{} you have been blacklisted!⛔️ go to {} click on stats to see the reason.",
        user_mention(&user.id),
        panel_mention(panel.as_ref())
    )))
}

async fn unblacklist(state: &AppState, actor: &Actor, user: &UserRef) -> AppResult<Reply> {
    state.authority().require_manager(actor).await?;
    state.entitlements().unblacklist(&user.id).await?;

    Ok(Reply::public(format!(
        "✅ **{}** has been removed from the blacklist.",
        user.display_name
    )))
}

async fn force_reset_hwid(state: &AppState, actor: &Actor, user: &UserRef) -> AppResult<Reply> {
    state.authority().require_manager(actor).await?;
    state
        .entitlements()
        .reset_hwid(&user.id, &actor.display_name)
        .await?;

    Ok(Reply::public(format!(
        "✅ **HWID Reset**\n\n**{}**'s HWID has been reset!",
        user.display_name
    )))
}

async fn create_key(state: &AppState, actor: &Actor, code: &str, days: i64) -> AppResult<Reply> {
    state.authority().require_manager(actor).await?;
    let key = state.keys().create_key(code, days, &actor.id).await?;

    Ok(Reply::private(format!(
        "✅ **Key Created**\n\nCode: `{}`\nDuration: {} days",
        key.code, key.duration_days
    )))
}

async fn gen_keys(
    state: &AppState,
    actor: &Actor,
    user: &UserRef,
    amount: i64,
    days: i64,
) -> AppResult<Reply> {
    state.authority().require_manager(actor).await?;

    let keys = state.keys().generate_batch(amount, days, &actor.id).await?;
    let codes: Vec<&str> = keys.iter().map(|k| k.code.as_str()).collect();

    let dm = format!(
        "🎁 **You have been rewarded free keys to the script!**\n\n\
         You received **{}** keys, each valid for **{} days**.\n\n\
         The keys are attached as a text file below.",
        keys.len(),
        days
    );
    let attachment = Attachment::text(
        format!("keys-{}-{}.txt", user.display_name, Utc::now().timestamp()),
        &codes.join("\n"),
    );
    let report = delivery(
        &state
            .platform
            .send_direct_message(&user.id, &dm, Some(attachment))
            .await,
        "key batch dm",
    );

    let content = if report.is_delivered() {
        format!(
            "✅ Successfully generated and sent **{}** keys to **{}** via DM!\n\n\
             Each key is valid for **{} days**.",
            keys.len(),
            user.display_name,
            days
        )
    } else {
        format!(
            "❌ Could not DM **{}**. They may have DMs disabled.\n\n\
             **{}** keys were created but could not be delivered.",
            user.display_name,
            keys.len()
        )
    };
    Ok(Reply::private(content).with_delivery(report))
}

async fn list_keys(state: &AppState, actor: &Actor) -> AppResult<Reply> {
    state.authority().require_manager(actor).await?;

    let keys = state.keys().list_all().await?;
    if keys.is_empty() {
        return Ok(Reply::private("📋 No keys found."));
    }
    Ok(Reply::private(key_list(&keys)))
}

async fn revoke_api(state: &AppState, actor: &Actor, user: &UserRef) -> AppResult<Reply> {
    state.authority().require_manager(actor).await?;
    let summary = state.sessions().revoke(&user.id).await?;

    let session = if summary.session_removed {
        " and closed their session"
    } else {
        ""
    };
    Ok(Reply::private(format!(
        "✅ Revoked **{}** API key(s) for **{}**{}.",
        summary.api_keys_removed, user.display_name, session
    )))
}

async fn panel(state: &AppState, actor: &Actor) -> AppResult<Reply> {
    state.authority().require_authenticated(actor).await?;

    let entitlements = state.entitlements();
    let entitlement = match entitlements.get_user(&actor.id).await? {
        Some(e) if entitlements.is_active(&actor.id).await? => e,
        _ => {
            return Err(AppError::not_authorized(
                "You are not whitelisted. Please contact an administrator.",
            ))
        }
    };

    Ok(Reply::private(format!(
        "🎮 **User Control Panel**\n\n\
         Status: {}\nExpires: {}\nHWID: {}",
        active_label(true),
        relative(entitlement.expires_at),
        hwid_label(entitlement.hwid.as_deref())
    )))
}

async fn status(state: &AppState, actor: &Actor) -> AppResult<Reply> {
    state.authority().require_authenticated(actor).await?;

    let entitlements = state.entitlements();
    let entitlement = entitlements
        .get_user(&actor.id)
        .await?
        .ok_or_else(|| AppError::not_found("You are not whitelisted."))?;
    let active = entitlements.is_active(&actor.id).await?;
    let blacklisted = entitlements.is_blacklisted(&actor.id).await?;

    Ok(Reply::private(format!(
        "📊 **Whitelist Status**\n\n\
         Status: {}\nBlacklisted: {}\nExpires: {}\nHWID: {}",
        active_label(active),
        if blacklisted { "🚫 Yes" } else { "✅ No" },
        relative(entitlement.expires_at),
        hwid_label(entitlement.hwid.as_deref())
    )))
}

async fn owner_wl(
    state: &AppState,
    actor: &Actor,
    user: &UserRef,
    action: OwnerAction,
) -> AppResult<Reply> {
    let authority = state.authority();

    let content = match action {
        OwnerAction::Add => {
            if authority.add_owner(actor, user).await? {
                format!(
                    "👑 **Owner Added**\n\n**{}** has been added as an owner!\n\n\
                     • Use all commands without API key\n\
                     • Add/remove other owners\n\
                     • Full bot access",
                    user.display_name
                )
            } else {
                format!("👑 **{}** is already an owner.", user.display_name)
            }
        }
        OwnerAction::Remove => {
            if authority.remove_owner(actor, &user.id).await? {
                format!(
                    "👑 **Owner Removed**\n\n**{}** has been removed as an owner.",
                    user.display_name
                )
            } else {
                format!("👑 **{}** is not an owner.", user.display_name)
            }
        }
    };
    Ok(Reply::public(content))
}
