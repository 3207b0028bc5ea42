//! Cross-messenger port (Telegram today; other transports later).

use async_trait::async_trait;

use crate::{domain::OwnerId, Result};

/// Capabilities of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_html: bool,
    pub max_message_len: usize,
}

/// Hexagonal port for messaging.
///
/// The bot sends exactly one text reply per inbound command, so the port
/// stays small; richer transport features belong to the adapter.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_html(&self, owner: OwnerId, html: &str) -> Result<()>;
}
