//! Conversion of incoming WhatsApp messages into [`InboundMessage`]s.

use blacksky_core::{config::WhatsAppConfig, message::InboundMessage};
use tracing::debug;
use waproto::whatsapp::Message;

/// Filter and convert one message event. `None` means the event is dropped.
pub(super) fn to_inbound(
    msg: &Message,
    info: &wacore::types::message::MessageInfo,
    config: &WhatsAppConfig,
) -> Option<InboundMessage> {
    let sender_user = info.source.sender.user.as_str();
    if !accepts(config, info.source.is_from_me, sender_user) {
        debug!(
            "whatsapp: filtered message from {sender_user} (from_me={})",
            info.source.is_from_me
        );
        return None;
    }

    let mut inbound = InboundMessage::new(
        "whatsapp",
        info.source.chat.to_string(),
        info.source.sender.to_string(),
        extract_text(msg),
    );
    inbound.sender_name = if info.push_name.is_empty() {
        Some(sender_user.to_string())
    } else {
        Some(info.push_name.clone())
    };
    Some(inbound)
}

/// Whether a message from `sender_user` should reach the dispatcher.
pub(super) fn accepts(config: &WhatsAppConfig, is_from_me: bool, sender_user: &str) -> bool {
    if is_from_me && !config.self_commands {
        return false;
    }
    config.allowed_users.is_empty()
        || config
            .allowed_users
            .iter()
            .any(|u| u.trim().trim_start_matches('+') == sender_user)
}

/// Text of a message, looking through device-sent, ephemeral and view-once
/// wrappers. Image captions count as text.
pub(super) fn extract_text(msg: &Message) -> Option<String> {
    let inner = msg
        .device_sent_message
        .as_ref()
        .and_then(|d| d.message.as_deref())
        .or_else(|| {
            msg.ephemeral_message
                .as_ref()
                .and_then(|e| e.message.as_deref())
        })
        .or_else(|| {
            msg.view_once_message
                .as_ref()
                .and_then(|v| v.message.as_deref())
        })
        .unwrap_or(msg);

    inner
        .conversation
        .as_deref()
        .or_else(|| {
            inner
                .extended_text_message
                .as_ref()
                .and_then(|e| e.text.as_deref())
        })
        .or_else(|| {
            inner
                .image_message
                .as_ref()
                .and_then(|i| i.caption.as_deref())
        })
        .map(str::to_string)
}
