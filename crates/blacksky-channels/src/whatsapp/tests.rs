use super::events::{accepts, extract_text};
use super::session::split_message;
use blacksky_core::config::WhatsAppConfig;
use wacore_binary::jid::{Jid, JidExt};

#[test]
fn test_split_short_message() {
    assert_eq!(split_message("hello", 4096), vec!["hello"]);
}

#[test]
fn test_split_long_message_on_newlines() {
    let text = "a\n".repeat(3000);
    let chunks = split_message(&text, 4096);
    assert!(chunks.len() >= 2);
    for chunk in &chunks {
        assert!(chunk.len() <= 4096);
        assert!(chunk.ends_with('\n'));
    }
    assert_eq!(chunks.concat(), text);
}

#[test]
fn test_split_respects_char_boundaries() {
    let text = "é".repeat(3000);
    let chunks = split_message(&text, 4095);
    assert_eq!(chunks.concat(), text);
    assert!(chunks.iter().all(|c| c.len() <= 4095));
}

#[test]
fn test_group_jid_detection_matches_library() {
    let group: Jid = "120363001234567890@g.us".parse().unwrap();
    assert!(group.is_group());
    assert!(blacksky_core::message::ChatContext::from_chat_id(&group.to_string()).is_group);

    let personal: Jid = "5511999887766@s.whatsapp.net".parse().unwrap();
    assert!(!personal.is_group());
}

#[test]
fn test_extract_plain_conversation() {
    let msg = waproto::whatsapp::Message {
        conversation: Some(".ping".to_string()),
        ..Default::default()
    };
    assert_eq!(extract_text(&msg).as_deref(), Some(".ping"));
    assert_eq!(extract_text(&waproto::whatsapp::Message::default()), None);
}

#[test]
fn test_accepts_filters() {
    let open = WhatsAppConfig::default();
    assert!(accepts(&open, false, "5511999887766"));
    assert!(!accepts(&open, true, "5511999887766"));

    let selfish = WhatsAppConfig {
        self_commands: true,
        ..Default::default()
    };
    assert!(accepts(&selfish, true, "5511999887766"));

    let restricted = WhatsAppConfig {
        allowed_users: vec!["+5511999887766".into()],
        ..Default::default()
    };
    assert!(accepts(&restricted, false, "5511999887766"));
    assert!(!accepts(&restricted, false, "5511000000000"));
}
