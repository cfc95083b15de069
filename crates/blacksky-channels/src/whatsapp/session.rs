//! Send side of a WhatsApp connection.

use async_trait::async_trait;
use blacksky_core::{error::BlackskyError, traits::Session};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tracing::info;
use wacore_binary::jid::Jid;
use whatsapp_rust::client::Client;

/// WhatsApp caps a single text message at 4096 characters.
const MAX_MESSAGE_LEN: usize = 4096;

pub(super) type ClientSlot = Arc<Mutex<Option<Arc<Client>>>>;
pub(super) type SentIds = Arc<Mutex<HashSet<String>>>;

pub struct WhatsAppSession {
    /// Set once the client reports `Connected`.
    client: ClientSlot,
    /// IDs of messages we sent, so their echoes are not dispatched.
    sent_ids: SentIds,
    run: AbortHandle,
}

impl WhatsAppSession {
    pub(super) fn new(client: ClientSlot, sent_ids: SentIds, run: AbortHandle) -> Self {
        Self {
            client,
            sent_ids,
            run,
        }
    }
}

#[async_trait]
impl Session for WhatsAppSession {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), BlackskyError> {
        let client = self
            .client
            .lock()
            .await
            .clone()
            .ok_or_else(|| BlackskyError::Transport("whatsapp client not connected".into()))?;

        let jid: Jid = chat_id
            .parse()
            .map_err(|e| BlackskyError::Transport(format!("invalid JID '{chat_id}': {e}")))?;

        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            let msg = waproto::whatsapp::Message {
                conversation: Some(chunk.to_string()),
                ..Default::default()
            };
            let msg_id = client
                .send_message(jid.clone(), msg)
                .await
                .map_err(|e| BlackskyError::Transport(format!("whatsapp send failed: {e}")))?;
            self.sent_ids.lock().await.insert(msg_id);
        }
        Ok(())
    }

    /// Drops the local link. The caller clears the stored session so the
    /// next connect pairs again.
    async fn logout(&self) -> Result<(), BlackskyError> {
        info!("whatsapp: logging out");
        self.disconnect().await
    }

    async fn disconnect(&self) -> Result<(), BlackskyError> {
        *self.client.lock().await = None;
        self.run.abort();
        Ok(())
    }
}

/// Split a long message into chunks within `max_len` bytes, preferring to
/// break after a newline.
pub(super) fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    if text.len() <= max_len {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let break_at = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .map(|i| start + i + 1)
                .unwrap_or(end)
        } else {
            end
        };
        chunks.push(&text[start..break_at]);
        start = break_at;
    }
    chunks
}
