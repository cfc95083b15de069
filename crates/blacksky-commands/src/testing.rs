//! Shared fixtures for unit tests.

use crate::entry::{handler_fn, init_fn, CommandHandler, HandlerEntry, ModuleInit, Role};
use crate::module::{CommandModule, Export};
use async_trait::async_trait;
use blacksky_core::{error::BlackskyError, message::InboundMessage, traits::Session};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) fn noop() -> Arc<dyn CommandHandler> {
    handler_fn(|_, _, _| async { Ok(()) })
}

pub(crate) fn ok_init() -> Arc<dyn ModuleInit> {
    init_fn(|| async { Ok(true) })
}

pub(crate) fn entry(name: &str) -> HandlerEntry {
    HandlerEntry {
        name: name.to_string(),
        handler: noop(),
        cooldown_secs: 3,
        required_role: Role::User,
        group_only: false,
        category: "test".to_string(),
        enabled: true,
        description: None,
        usage: None,
        module: "test".to_string(),
    }
}

/// Handler that counts invocations.
#[derive(Default)]
pub(crate) struct Counter(pub AtomicUsize);

impl Counter {
    pub fn calls(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandHandler for Counter {
    async fn execute(
        &self,
        _session: Arc<dyn Session>,
        _message: InboundMessage,
        _args: Vec<String>,
    ) -> anyhow::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Session that records every outbound text.
#[derive(Default)]
pub(crate) struct RecordingSession {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSession {
    pub fn texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }
}

#[async_trait]
impl Session for RecordingSession {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), BlackskyError> {
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn logout(&self) -> Result<(), BlackskyError> {
        Ok(())
    }
}

/// Module whose export always fails.
pub(crate) struct BrokenModule(pub &'static str);

impl CommandModule for BrokenModule {
    fn name(&self) -> &str {
        self.0
    }

    fn export(&self) -> anyhow::Result<Export> {
        anyhow::bail!("syntax error in module source")
    }
}
