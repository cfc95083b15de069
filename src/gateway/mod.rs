//! Session gateway: owns the single transport connection, tracks its state
//! and decides how to recover when it closes.

mod policy;
mod timer;

#[cfg(test)]
mod tests;

pub use policy::{Decision, DisconnectKind, ReconnectPolicy};
pub use timer::ReconnectTimer;

use blacksky_channels::generate_qr_terminal;
use blacksky_core::{
    error::BlackskyError,
    message::InboundMessage,
    traits::{CloseInfo, Connection, CredentialStore, Session, Transport, TransportEvent},
};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

/// Connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected,
    /// Setup failed, or retries are exhausted (terminal once `run` returns).
    Error,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub retry_count: u32,
    pub last_disconnect_reason: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: SessionStatus::Disconnected,
            retry_count: 0,
            last_disconnect_reason: None,
        }
    }
}

/// A message paired with the session it arrived on, for replies.
pub type Inbound = (Arc<dyn Session>, InboundMessage);

pub struct SessionGateway {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
    policy: ReconnectPolicy,
    state: watch::Sender<SessionState>,
    /// Count of successful connections.
    ready: watch::Sender<u64>,
    timer: ReconnectTimer,
    render_qr: bool,
}

impl SessionGateway {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            transport,
            credentials,
            policy,
            state: watch::Sender::new(SessionState::default()),
            ready: watch::Sender::new(0),
            timer: ReconnectTimer::new(),
            render_qr: true,
        }
    }

    /// Print pairing QR codes to the terminal (on by default).
    pub fn with_qr_rendering(mut self, enabled: bool) -> Self {
        self.render_qr = enabled;
        self
    }

    /// Observe successful connections. The value counts them.
    pub fn ready(&self) -> watch::Receiver<u64> {
        self.ready.subscribe()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Connect and keep the session alive, forwarding every inbound message.
    ///
    /// Returns `Ok` once `inbound`'s receiver is dropped, or an error when the
    /// retry budget is exhausted.
    pub async fn run(&self, inbound: mpsc::Sender<Inbound>) -> Result<(), BlackskyError> {
        let (wake_tx, mut wake_rx) = mpsc::channel::<()>(1);
        info!(
            "gateway: starting on {} (session: {})",
            self.transport.name(),
            self.credentials.location()
        );

        loop {
            self.state.send_modify(|s| s.status = SessionStatus::Connecting);

            let decision = match self.transport.connect(self.credentials.as_ref()).await {
                Ok(conn) => match self.drive(conn, &inbound).await {
                    Some(decision) => decision,
                    None => return Ok(()),
                },
                Err(e) => {
                    error!("gateway: connect failed: {e}");
                    self.state.send_modify(|s| s.status = SessionStatus::Error);
                    self.apply(DisconnectKind::Unknown, &format!("connect failed: {e}"))
                        .await
                }
            };

            match decision {
                Decision::Reconnect { delay, .. } => {
                    self.timer.schedule(delay, wake_tx.clone());
                    wake_rx.recv().await;
                }
                Decision::GiveUp => {
                    let state = self.state();
                    error!(
                        "gateway: giving up after {} retries (last: {})",
                        state.retry_count,
                        state.last_disconnect_reason.as_deref().unwrap_or("none")
                    );
                    return Err(BlackskyError::Transport(format!(
                        "reconnect attempts exhausted after {} retries",
                        state.retry_count
                    )));
                }
            }
        }
    }

    /// Pump one connection's events until it closes. `None` means shut down.
    async fn drive(&self, conn: Connection, inbound: &mpsc::Sender<Inbound>) -> Option<Decision> {
        let Connection {
            session,
            mut events,
        } = conn;

        let close = loop {
            match events.recv().await {
                Some(TransportEvent::Qr(code)) => self.on_qr(&code),
                Some(TransportEvent::Connected) => self.on_connected(),
                Some(TransportEvent::Message(msg)) => {
                    if inbound.send((session.clone(), msg)).await.is_err() {
                        info!("gateway: dispatcher gone, disconnecting");
                        let _ = session.disconnect().await;
                        self.state.send_modify(|s| s.status = SessionStatus::Disconnected);
                        return None;
                    }
                }
                Some(TransportEvent::Closed(info)) => break info,
                None => break CloseInfo::new(None, "connection closed"),
            }
        };

        if let Err(e) = session.disconnect().await {
            warn!("gateway: teardown failed: {e}");
        }
        Some(self.on_close(&close).await)
    }

    fn on_qr(&self, code: &str) {
        info!("gateway: pairing QR received, scan it with WhatsApp > Linked devices");
        if !self.render_qr {
            return;
        }
        match generate_qr_terminal(code) {
            Ok(qr) => println!("\n{qr}"),
            Err(e) => warn!("gateway: cannot render QR: {e}"),
        }
    }

    fn on_connected(&self) {
        self.timer.cancel();
        self.state.send_modify(|s| {
            s.status = SessionStatus::Connected;
            s.retry_count = 0;
        });
        self.ready.send_modify(|n| *n += 1);
        info!("gateway: connected via {}", self.transport.name());
    }

    /// Classify a close and apply the reconnect policy.
    pub async fn on_close(&self, info: &CloseInfo) -> Decision {
        let kind = DisconnectKind::classify(info);
        let reason = match info.code {
            Some(code) => format!("{kind} ({code}: {})", info.reason),
            None => format!("{kind} ({})", info.reason),
        };
        self.state
            .send_modify(|s| s.status = SessionStatus::Disconnected);
        self.apply(kind, &reason).await
    }

    async fn apply(&self, kind: DisconnectKind, reason: &str) -> Decision {
        let mut decision = Decision::GiveUp;
        self.state.send_modify(|s| {
            s.last_disconnect_reason = Some(reason.to_string());
            decision = self.policy.decide(kind, &mut s.retry_count);
            if decision == Decision::GiveUp {
                s.status = SessionStatus::Error;
            }
        });

        match decision {
            Decision::Reconnect {
                delay,
                clear_credentials: true,
            } => {
                warn!("gateway: session logged out, clearing credentials for a fresh pairing");
                if let Err(e) = self.credentials.clear().await {
                    error!("gateway: failed to clear credentials: {e}");
                }
                info!("gateway: reconnecting in {}ms", delay.as_millis());
            }
            Decision::Reconnect { delay, .. } => {
                warn!(
                    "gateway: disconnected: {reason}; retry {} in {}ms",
                    self.state.borrow().retry_count,
                    delay.as_millis()
                );
            }
            Decision::GiveUp => {}
        }
        decision
    }
}
