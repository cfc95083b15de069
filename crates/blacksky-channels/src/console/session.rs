use super::Output;
use async_trait::async_trait;
use blacksky_core::{error::BlackskyError, traits::Session};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Send side of a console connection: replies are written one per line,
/// tagged with the chat they were addressed to.
pub struct ConsoleSession {
    output: Output,
}

impl ConsoleSession {
    pub(crate) fn new(output: Output) -> Self {
        Self { output }
    }
}

#[async_trait]
impl Session for ConsoleSession {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), BlackskyError> {
        let mut out = self.output.lock().await;
        out.write_all(format!("[{chat_id}] {text}\n").as_bytes())
            .await?;
        out.flush().await?;
        Ok(())
    }

    async fn logout(&self) -> Result<(), BlackskyError> {
        info!("console: logout requested, nothing to unlink");
        Ok(())
    }
}
