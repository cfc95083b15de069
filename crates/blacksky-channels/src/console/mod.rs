//! Line-oriented transport over stdin/stdout for local development.
//!
//! Every input line is one message from the configured sender in a direct
//! chat. Lines starting with `@group ` are delivered from a group chat instead.

mod session;


pub use session::ConsoleSession;

use async_trait::async_trait;
use blacksky_core::{
    error::BlackskyError,
    message::InboundMessage,
    traits::{Connection, CredentialStore, Transport, TransportEvent},
};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Chat address used for direct console messages.
pub const DIRECT_CHAT: &str = "console@s.whatsapp.net";
/// Chat address used for `@group` console messages.
pub const GROUP_CHAT: &str = "console@g.us";

const GROUP_MARKER: &str = "@group ";

type Input = Box<dyn AsyncBufRead + Send + Unpin>;
pub(crate) type Output = Arc<tokio::sync::Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

pub struct ConsoleTransport {
    sender_id: String,
    input: Mutex<Option<Input>>,
    output: Output,
}

impl ConsoleTransport {
    /// Console bound to the process stdin and stdout.
    pub fn stdio(sender_id: impl Into<String>) -> Self {
        Self::with_io(
            sender_id,
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
        )
    }

    pub fn with_io(
        sender_id: impl Into<String>,
        input: impl AsyncBufRead + Send + Unpin + 'static,
        output: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            input: Mutex::new(Some(Box::new(input))),
            output: Arc::new(tokio::sync::Mutex::new(Box::new(output))),
        }
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    fn name(&self) -> &str {
        "console"
    }

    async fn connect(
        &self,
        _credentials: &dyn CredentialStore,
    ) -> Result<Connection, BlackskyError> {
        let input = self
            .input
            .lock()
            .map_err(|_| BlackskyError::Transport("console input lock poisoned".into()))?
            .take()
            .ok_or_else(|| BlackskyError::Transport("console input already attached".into()))?;

        let (tx, rx) = mpsc::channel(64);
        let sender_id = self.sender_id.clone();
        tokio::spawn(async move {
            if tx.send(TransportEvent::Connected).await.is_err() {
                return;
            }
            let mut lines = input.lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Some(msg) = parse_line(&line, &sender_id) else {
                            continue;
                        };
                        if tx.send(TransportEvent::Message(msg)).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) => {
                        info!("console: input closed");
                        break;
                    }
                    Err(e) => {
                        // Input cannot be reattached, so a reconnect would never succeed.
                        warn!("console: read failed, ignoring further input: {e}");
                        break;
                    }
                }
            }
            // Keep the connection open until the gateway lets go of it.
            tx.closed().await;
            debug!("console: connection dropped");
        });

        Ok(Connection {
            session: Arc::new(ConsoleSession::new(self.output.clone())),
            events: rx,
        })
    }
}

/// Turn one input line into a message. Blank lines are dropped.
pub(crate) fn parse_line(line: &str, sender_id: &str) -> Option<InboundMessage> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }
    let (chat, text) = match line.strip_prefix(GROUP_MARKER) {
        Some(rest) => (GROUP_CHAT, rest),
        None => (DIRECT_CHAT, line),
    };
    let mut msg = InboundMessage::new("console", chat, sender_id, Some(text.to_string()));
    msg.sender_name = Some("console".to_string());
    Some(msg)
}
