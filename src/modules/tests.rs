use super::*;
use async_trait::async_trait;
use blacksky_commands::{
    parse_records, CommandCatalog, CommandRegistry, ModuleAdapter, RegistryOptions, Role,
};
use blacksky_core::{error::BlackskyError, message::InboundMessage};
use rand::{rngs::StdRng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;

const SENDER: &str = "5511000000009@s.whatsapp.net";

#[derive(Default)]
struct RecordingSession {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl Session for RecordingSession {
    async fn send_text(&self, _chat_id: &str, text: &str) -> Result<(), BlackskyError> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn logout(&self) -> Result<(), BlackskyError> {
        Ok(())
    }
}

async fn loaded_registry() -> Arc<CommandRegistry> {
    let records: Vec<_> = BUNDLED_CATALOG
        .iter()
        .flat_map(|(_, json)| parse_records(json).unwrap())
        .collect();
    let registry = CommandRegistry::new(
        Arc::new(CommandCatalog::from_records(records)),
        RegistryOptions::default(),
    );
    registry.load(all(Instant::now())).await;
    registry
}

async fn run(registry: &CommandRegistry, chat: &str, text: &str) -> Vec<String> {
    let mut words = text.split_whitespace();
    let name = words.next().unwrap();
    let args = words.map(str::to_string).collect();
    let entry = registry.get(name).unwrap();
    let session = Arc::new(RecordingSession::default());
    let msg = InboundMessage::new("test", chat, SENDER, Some(text.into()));
    entry
        .handler
        .execute(session.clone(), msg, args)
        .await
        .unwrap();
    let sent = session.sent.lock().unwrap().clone();
    sent
}

#[test]
fn test_format_uptime() {
    assert_eq!(format_uptime_for(59), "Up 0h 0m 59s");
    assert_eq!(format_uptime_for(3 * 3600 + 125), "Up 3h 2m 5s");
    assert_eq!(format_uptime_for(2 * 86_400 + 61), "Up 2d 0h 1m 1s");
}

fn format_uptime_for(secs: u64) -> String {
    general::format_uptime(Duration::from_secs(secs))
}

#[test]
fn test_parse_sides() {
    assert_eq!(fun::parse_sides(None), Ok(6));
    assert_eq!(fun::parse_sides(Some("20")), Ok(20));
    assert_eq!(fun::parse_sides(Some("d12")), Ok(12));
    assert!(fun::parse_sides(Some("1")).is_err());
    assert!(fun::parse_sides(Some("1001")).is_err());
    assert!(fun::parse_sides(Some("many")).is_err());
}

#[test]
fn test_roll_stays_in_range() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let v = fun::roll(&mut rng, 6);
        assert!((1..=6).contains(&v));
    }
}

#[test]
fn test_split_options() {
    assert_eq!(
        fun::split_options("pizza | sushi |  | tacos "),
        vec!["pizza", "sushi", "tacos"]
    );
    assert!(fun::split_options("").is_empty());
}

#[test]
fn test_every_module_normalizes() {
    let mut found = Vec::new();
    for module in all(Instant::now()) {
        let raw = module.export().unwrap();
        let normalized = ModuleAdapter::normalize(raw, module.name()).unwrap();
        let mut names: Vec<String> = normalized.commands.into_iter().map(|(n, _)| n).collect();
        names.sort();
        found.push((normalized.category, names));
    }
    assert_eq!(
        found,
        vec![
            ("general".to_string(), vec!["echo".to_string(), "ping".into(), "uptime".into()]),
            ("fun".to_string(), vec!["choose".to_string(), "coin".into(), "dice".into()]),
            ("group".to_string(), vec!["groupinfo".to_string(), "rules".into(), "whoami".into()]),
        ]
    );
}

#[test]
fn test_bundled_catalog_parses() {
    for (file, json) in BUNDLED_CATALOG {
        let records = parse_records(json)
            .unwrap_or_else(|e| panic!("{file} is not a valid catalog: {e}"));
        assert!(!records.is_empty(), "{file} is empty");
    }
}

#[tokio::test]
async fn test_catalog_applies_to_shipped_commands() {
    let registry = loaded_registry().await;
    let rules = registry.get("rules").unwrap();
    assert!(rules.group_only);
    assert_eq!(rules.required_role, Role::Admin);
    assert_eq!(registry.get("uptime").unwrap().cooldown_secs, 10);
    assert_eq!(registry.get("dice").unwrap().category, "fun");

    let categories = registry.snapshot().categories();
    let counts: Vec<(&str, usize)> = categories
        .iter()
        .map(|(c, e)| (c.as_str(), e.len()))
        .collect();
    assert_eq!(
        counts,
        vec![("fun", 3), ("general", 4), ("group", 3), ("owner", 1)]
    );
}

#[tokio::test]
async fn test_echo_and_choose_reply() {
    let registry = loaded_registry().await;
    let chat = "5511000000009@s.whatsapp.net";
    assert_eq!(
        run(&registry, chat, "echo hello  there").await,
        vec!["hello there"]
    );
    assert_eq!(
        run(&registry, chat, "echo").await,
        vec!["Usage: echo <text>"]
    );
    assert_eq!(
        run(&registry, chat, "choose a").await,
        vec!["Give me at least two options separated by |"]
    );
    let pick = run(&registry, chat, "choose red | blue").await;
    assert!(pick[0] == "I choose: red" || pick[0] == "I choose: blue");
}

#[tokio::test]
async fn test_ping_and_dice_reply() {
    let registry = loaded_registry().await;
    let chat = "5511000000009@s.whatsapp.net";
    assert!(run(&registry, chat, "ping").await[0].starts_with("pong ("));
    let roll = run(&registry, chat, "dice 20").await;
    assert!(roll[0].starts_with("🎲 d20: "));
    assert_eq!(
        run(&registry, chat, "dice 1").await,
        vec!["Sides must be a number between 2 and 1000"]
    );
}

#[tokio::test]
async fn test_groupinfo_describes_chat() {
    let registry = loaded_registry().await;
    let reply = run(&registry, "120363001234567890@g.us", "groupinfo").await;
    assert_eq!(
        reply,
        vec!["Chat: 120363001234567890@g.us\nType: group\nVia: test"]
    );
}
