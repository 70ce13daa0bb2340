//! Interaction dispatcher
//!
//! Maps an [`InboundEvent`] onto core operations and renders the outcome as
//! a plain-text [`Reply`]. Errors never escape: they become a short message
//! for the actor. Platform deliveries run after the mutation has committed
//! and are reported, not retried.

mod commands;
mod components;
mod text;

use tracing::{debug, error, info_span, warn, Instrument};

use crate::models::{DeliveryReport, InboundEvent, Interaction, Reply};
use crate::utils::{AppError, AppResult};
use crate::AppState;

/// Handle one inbound event end to end
pub async fn handle_event(state: &AppState, event: InboundEvent) -> Reply {
    let InboundEvent {
        actor,
        guild_name,
        interaction,
    } = event;

    let kind = match &interaction {
        Interaction::Command { command } => command.name().to_string(),
        Interaction::Component { custom_id } => format!("{:?}", custom_id),
        Interaction::ModalSubmit { custom_id, .. } => custom_id.clone(),
    };
    let span = info_span!("interaction", actor_id = %actor.id, kind = %kind);

    async move {
        let result = match interaction {
            Interaction::Command { command } => {
                commands::handle(state, &actor, guild_name.as_deref(), command).await
            }
            Interaction::Component { custom_id } => {
                components::handle_component(state, &actor, custom_id).await
            }
            Interaction::ModalSubmit { custom_id, values } => {
                components::handle_modal(state, &actor, &custom_id, &values).await
            }
        };

        result.unwrap_or_else(|err| render_error(&err))
    }
    .instrument(span)
    .await
}

/// User-facing text for a failed operation
pub fn render_error(err: &AppError) -> Reply {
    match err {
        AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
            error!(error = %err, error_type = err.kind(), "Interaction failed");
        }
        _ => debug!(error = %err, error_type = err.kind(), "Interaction rejected"),
    }

    match err {
        AppError::NotAuthenticated(_) => Reply::private(format!(
            "🔒 **Authentication Required!**\n\n{}",
            err.user_message()
        )),
        _ => Reply::private(format!("❌ {}", err.user_message())),
    }
}

/// Turn the result of a platform call into a delivery report
pub(crate) fn delivery<T>(result: &AppResult<T>, what: &str) -> DeliveryReport {
    match result {
        Ok(_) => DeliveryReport::Delivered,
        Err(err) => {
            warn!(error = %err, what, "Delivery failed");
            DeliveryReport::Failed {
                reason: err.user_message(),
            }
        }
    }
}
