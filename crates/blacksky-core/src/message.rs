use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JID server used by WhatsApp group chats.
pub const GROUP_SERVER: &str = "g.us";

/// A normalized inbound chat message, one per transport event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: Uuid,
    /// Transport name (e.g. "whatsapp", "console").
    pub channel: String,
    /// Opaque chat address. Group chats end in `@g.us`.
    pub chat_id: String,
    /// Platform-specific sender address.
    pub sender_id: String,
    /// Human-readable sender name (WhatsApp push name).
    pub sender_name: Option<String>,
    /// Message text, if the event carried any.
    pub raw_text: Option<String>,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl InboundMessage {
    /// Build a text message stamped with the current time.
    pub fn new(
        channel: &str,
        chat_id: impl Into<String>,
        sender_id: impl Into<String>,
        raw_text: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            chat_id: chat_id.into(),
            sender_id: sender_id.into(),
            sender_name: None,
            raw_text,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// The chat context this message arrived in.
    pub fn context(&self) -> ChatContext {
        ChatContext::from_chat_id(&self.chat_id)
    }
}

/// Conversation metadata relevant to command gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatContext {
    pub is_group: bool,
}

impl ChatContext {
    pub const DIRECT: Self = Self { is_group: false };
    pub const GROUP: Self = Self { is_group: true };

    /// Derive the context from the chat address suffix.
    pub fn from_chat_id(chat_id: &str) -> Self {
        let is_group = chat_id
            .rsplit_once('@')
            .map(|(_, server)| server == GROUP_SERVER)
            .unwrap_or(false);
        Self { is_group }
    }
}

/// Extract the user part of a JID: `"5511999@s.whatsapp.net"` and
/// `"5511999:12@s.whatsapp.net"` both yield `"5511999"`.
pub fn jid_user(jid: &str) -> &str {
    let user = jid.split('@').next().unwrap_or(jid);
    let user = user.split(':').next().unwrap_or(user);
    user.trim_start_matches('+')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_detection_by_suffix() {
        assert!(ChatContext::from_chat_id("120363001234567890@g.us").is_group);
        assert!(!ChatContext::from_chat_id("5511999887766@s.whatsapp.net").is_group);
        assert!(!ChatContext::from_chat_id("5511999887766").is_group);
        assert!(!ChatContext::from_chat_id("123@lid").is_group);
    }

    #[test]
    fn test_jid_user_strips_server_and_device() {
        assert_eq!(jid_user("5511999887766@s.whatsapp.net"), "5511999887766");
        assert_eq!(jid_user("5511999887766:12@s.whatsapp.net"), "5511999887766");
        assert_eq!(jid_user("+5511999887766"), "5511999887766");
    }

    #[test]
    fn test_new_message_context() {
        let msg = InboundMessage::new("console", "g1@g.us", "u1", Some(".ping".into()));
        assert!(msg.context().is_group);
        assert!(msg.timestamp > 0);
    }
}
