use std::sync::Arc;

use slb_core::{commands::CommandHandler, config::Config, store::ListStore};

#[tokio::main]
async fn main() -> Result<(), slb_core::Error> {
    slb_core::logging::init("slb")?;

    let cfg = Arc::new(Config::load()?);
    let store = Arc::new(ListStore::open(cfg.store_file.clone())?);
    let handler = Arc::new(CommandHandler::new(store));

    slb_telegram::router::run_polling(cfg, handler)
        .await
        .map_err(|e| slb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
