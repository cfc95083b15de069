//! Games of chance. Exported as `{ commands, category, init }`.

use super::reply;
use blacksky_commands::{handler_fn, init_fn, CommandModule, Export, ExportTable};
use blacksky_core::{message::InboundMessage, traits::Session};
use rand::Rng;
use std::sync::Arc;
use tracing::debug;

const DEFAULT_SIDES: u32 = 6;
const MAX_SIDES: u32 = 1000;

pub struct Fun;

impl CommandModule for Fun {
    fn name(&self) -> &str {
        "fun"
    }

    fn export(&self) -> anyhow::Result<Export> {
        let commands = ExportTable::new()
            .command("dice", handler_fn(dice))
            .command("coin", handler_fn(coin))
            .command("choose", handler_fn(choose));
        Ok(ExportTable::new()
            .table("commands", commands)
            .value("category", serde_json::json!("fun"))
            .init(init_fn(|| async {
                debug!("fun: ready");
                Ok(true)
            }))
            .into())
    }
}

async fn dice(
    session: Arc<dyn Session>,
    msg: InboundMessage,
    args: Vec<String>,
) -> anyhow::Result<()> {
    let text = match parse_sides(args.first().map(String::as_str)) {
        Ok(sides) => {
            let value = roll(&mut rand::thread_rng(), sides);
            format!("🎲 d{sides}: {value}")
        }
        Err(e) => e,
    };
    reply(&session, &msg.chat_id, &text).await
}

async fn coin(
    session: Arc<dyn Session>,
    msg: InboundMessage,
    _args: Vec<String>,
) -> anyhow::Result<()> {
    let side = if rand::thread_rng().gen_bool(0.5) {
        "heads"
    } else {
        "tails"
    };
    reply(&session, &msg.chat_id, &format!("🪙 {side}")).await
}

async fn choose(
    session: Arc<dyn Session>,
    msg: InboundMessage,
    args: Vec<String>,
) -> anyhow::Result<()> {
    let options = split_options(&args.join(" "));
    let text = if options.len() < 2 {
        "Give me at least two options separated by |".to_string()
    } else {
        let pick = rand::thread_rng().gen_range(0..options.len());
        format!("I choose: {}", options[pick])
    };
    reply(&session, &msg.chat_id, &text).await
}

pub(super) fn parse_sides(arg: Option<&str>) -> Result<u32, String> {
    let Some(arg) = arg else {
        return Ok(DEFAULT_SIDES);
    };
    match arg.trim_start_matches(['d', 'D']).parse::<u32>() {
        Ok(n) if (2..=MAX_SIDES).contains(&n) => Ok(n),
        _ => Err(format!("Sides must be a number between 2 and {MAX_SIDES}")),
    }
}

pub(super) fn roll(rng: &mut impl Rng, sides: u32) -> u32 {
    rng.gen_range(1..=sides)
}

pub(super) fn split_options(text: &str) -> Vec<String> {
    text.split('|')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
