use std::{collections::HashMap, sync::Arc};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::{Mutex, OwnedMutexGuard};

use slb_core::{
    commands::CommandHandler, config::Config, domain::OwnerId, messaging::MessagingPort,
    security::RateLimiter,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub handler: Arc<CommandHandler>,
    pub messenger: Arc<dyn MessagingPort>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
    pub owner_locks: Arc<OwnerLocks>,
}

/// One async mutex per owner, created lazily. Commands for the same owner
/// run one at a time; different owners proceed in parallel.
#[derive(Default)]
pub struct OwnerLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl OwnerLocks {
    pub async fn lock_owner(&self, owner: OwnerId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(owner.0)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub async fn run_polling(cfg: Arc<Config>, handler: Arc<CommandHandler>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        tracing::info!(username = me.username(), "shopping-list bot started");
    }
    if cfg.telegram_allowed_users.is_empty() {
        tracing::info!("no allowlist configured; bot is open to everyone");
    } else {
        tracing::info!(
            allowed_users = cfg.telegram_allowed_users.len(),
            "allowlist active"
        );
    }
    tracing::info!(store = %cfg.store_file.display(), "list store");

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));

    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        handler,
        messenger,
        rate_limiter: Arc::new(Mutex::new(RateLimiter::new(
            cfg.rate_limit_enabled,
            cfg.rate_limit_requests,
            cfg.rate_limit_window,
        ))),
        owner_locks: Arc::new(OwnerLocks::default()),
    });

    let tree = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, tree)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
