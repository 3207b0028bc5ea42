//! Telegram update handling: authorize, rate-limit, serialize per owner,
//! run the command, send the reply.

use std::sync::Arc;

use teloxide::prelude::*;

use slb_core::{
    domain::{OwnerId, UserId},
    security::is_authorized,
};

use crate::router::AppState;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    // The entire inbound surface is text commands; ignore everything else.
    let Some(text) = msg.text().map(|s| s.to_string()) else {
        return Ok(());
    };

    let user_id = msg.from().map(|u| UserId(u.id.0 as i64));
    let owner = OwnerId(msg.chat.id.0);

    if !is_authorized(user_id, &state.cfg.telegram_allowed_users) {
        tracing::warn!(user = ?user_id, chat = owner.0, "unauthorized sender");
        let _ = bot
            .send_message(
                msg.chat.id,
                "Unauthorized. Contact the bot owner for access.",
            )
            .await;
        return Ok(());
    }

    if let Some(user) = user_id {
        let limited = { state.rate_limiter.lock().await.check(user) };
        if let Some(wait) = limited {
            let secs = wait.as_secs().max(1);
            let _ = bot
                .send_message(
                    msg.chat.id,
                    format!("⏳ Slow down a little — try again in {secs}s."),
                )
                .await;
            return Ok(());
        }
    }

    // One command at a time per owner.
    let _guard = state.owner_locks.lock_owner(owner).await;

    let reply = state.handler.handle(owner, &text).await;
    tracing::info!(
        owner = owner.0,
        command = text.split_whitespace().next().unwrap_or(""),
        "handled command"
    );

    if let Err(e) = state.messenger.send_html(owner, &reply).await {
        tracing::error!(owner = owner.0, error = %e, "failed to send reply");
    }

    Ok(())
}
