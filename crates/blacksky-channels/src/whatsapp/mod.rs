//! WhatsApp transport via `whatsapp-rust` (WhatsApp Web multi-device protocol).
//!
//! Pairing is done by scanning a QR code. The session is persisted to
//! `{credentials}/whatsapp.db`, where `{credentials}` is the credential
//! store's location.

mod events;
mod session;

#[cfg(test)]
mod tests;

pub use session::WhatsAppSession;

use async_trait::async_trait;
use blacksky_core::{
    config::WhatsAppConfig,
    error::BlackskyError,
    traits::{CloseInfo, Connection, CredentialStore, Transport, TransportEvent},
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use wacore::types::events::Event;
use whatsapp_rust::bot::Bot;
use whatsapp_rust::store::SqliteStore;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

/// Close code reported when the phone unlinks this device.
const LOGGED_OUT_CODE: u16 = 401;

pub struct WhatsAppTransport {
    config: WhatsAppConfig,
}

impl WhatsAppTransport {
    pub fn new(config: WhatsAppConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Transport for WhatsAppTransport {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn connect(
        &self,
        credentials: &dyn CredentialStore,
    ) -> Result<Connection, BlackskyError> {
        let session_dir = PathBuf::from(credentials.location());
        tokio::fs::create_dir_all(&session_dir).await?;
        let db_path = session_dir.join("whatsapp.db").to_string_lossy().to_string();
        info!("whatsapp: connecting (session: {db_path})");

        let store = SqliteStore::new(&db_path)
            .await
            .map_err(|e| BlackskyError::Transport(format!("whatsapp store init failed: {e}")))?;
        let backend = Arc::new(store);

        let (tx, rx) = mpsc::channel(64);
        let client: session::ClientSlot = Arc::new(Mutex::new(None));
        let sent_ids: session::SentIds = Arc::new(Mutex::new(HashSet::new()));

        let tx_events = tx.clone();
        let client_for_event = client.clone();
        let sent_for_event = sent_ids.clone();
        let config = self.config.clone();

        let mut bot = Bot::builder()
            .with_backend(backend)
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .on_event(move |event, wa_client| {
                let tx = tx_events.clone();
                let client_store = client_for_event.clone();
                let sent_ids = sent_for_event.clone();
                let config = config.clone();
                async move {
                    let forwarded = match event {
                        Event::PairingQrCode { code, .. } => {
                            info!("whatsapp: QR code generated (scan to pair)");
                            Some(TransportEvent::Qr(code))
                        }
                        Event::PairSuccess(_) => {
                            info!("whatsapp: pairing successful");
                            None
                        }
                        Event::PairError(e) => {
                            warn!("whatsapp: pairing failed: {e:?}");
                            Some(TransportEvent::Closed(CloseInfo::new(
                                None,
                                format!("pairing failed: {e:?}"),
                            )))
                        }
                        Event::Connected(_) => {
                            *client_store.lock().await = Some(wa_client);
                            Some(TransportEvent::Connected)
                        }
                        Event::Disconnected(_) => {
                            *client_store.lock().await = None;
                            Some(TransportEvent::Closed(CloseInfo::new(
                                None,
                                "connection closed",
                            )))
                        }
                        Event::LoggedOut(_) => {
                            *client_store.lock().await = None;
                            Some(TransportEvent::Closed(CloseInfo::new(
                                Some(LOGGED_OUT_CODE),
                                "logged out",
                            )))
                        }
                        Event::Message(msg, msg_info) => {
                            if sent_ids.lock().await.remove(&msg_info.id) {
                                debug!("whatsapp: skipping own echo {}", msg_info.id);
                                None
                            } else {
                                events::to_inbound(&msg, &msg_info, &config)
                                    .map(TransportEvent::Message)
                            }
                        }
                        _ => None,
                    };
                    if let Some(event) = forwarded {
                        if tx.send(event).await.is_err() {
                            debug!("whatsapp: event receiver dropped");
                        }
                    }
                }
            })
            .build()
            .await
            .map_err(|e| BlackskyError::Transport(format!("whatsapp bot build failed: {e}")))?;

        let run = bot
            .run()
            .await
            .map_err(|e| BlackskyError::Transport(format!("whatsapp bot run failed: {e}")))?;
        let abort = run.abort_handle();

        // Report the end of the client task as a close, unless we aborted it.
        tokio::spawn(async move {
            if let Err(e) = run.await {
                if e.is_cancelled() {
                    return;
                }
                warn!("whatsapp: client task failed: {e}");
            }
            let closed = CloseInfo::new(None, "connection closed");
            let _ = tx.send(TransportEvent::Closed(closed)).await;
        });

        Ok(Connection {
            session: Arc::new(WhatsAppSession::new(client, sent_ids, abort)),
            events: rx,
        })
    }
}
