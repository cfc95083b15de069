use crate::{error::BlackskyError, message::InboundMessage};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Why a transport connection closed, as reported by the client library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseInfo {
    /// Protocol status code, when the library exposes one.
    pub code: Option<u16>,
    /// Free-form reason text.
    pub reason: String,
}

impl CloseInfo {
    pub fn new(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// Lifecycle and message events emitted by a live connection.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A pairing QR payload to be scanned with the phone.
    Qr(String),
    /// Authentication finished and the socket is usable.
    Connected,
    /// An inbound chat message.
    Message(InboundMessage),
    /// The connection closed.
    Closed(CloseInfo),
}

/// An authenticated chat session: the send side of a connection.
#[async_trait]
pub trait Session: Send + Sync {
    /// Send a text message to a chat address.
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), BlackskyError>;

    /// Log the linked device out, invalidating the stored credentials.
    async fn logout(&self) -> Result<(), BlackskyError>;

    /// Tear down the socket without logging out.
    async fn disconnect(&self) -> Result<(), BlackskyError> {
        Ok(())
    }
}

/// One established connection: the session handle plus its event stream.
pub struct Connection {
    pub session: Arc<dyn Session>,
    pub events: mpsc::Receiver<TransportEvent>,
}

/// Chat transport: the library that speaks the wire protocol.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Human-readable transport name.
    fn name(&self) -> &str;

    /// Open a new connection using whatever credentials the store holds.
    async fn connect(&self, credentials: &dyn CredentialStore)
        -> Result<Connection, BlackskyError>;
}

/// Persistent authentication material (the paired-device session).
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Where the transport keeps its session data.
    fn location(&self) -> String;

    /// Whether any credentials are stored.
    async fn exists(&self) -> bool;

    /// Remove stored credentials so the next connect pairs from scratch.
    async fn clear(&self) -> Result<(), BlackskyError>;
}
