use serde::{Deserialize, Serialize};

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    pub whatsapp: Option<WhatsAppConfig>,
}

/// WhatsApp channel config.
///
/// Session data is stored at `{data_dir}/whatsapp_session/`.
/// Pairing is done by scanning a QR code (like WhatsApp Web).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WhatsAppConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Phone numbers whose messages are processed (e.g. `["5511999887766"]`). Empty = everyone.
    #[serde(default)]
    pub allowed_users: Vec<String>,
    /// Also process messages the linked account sends itself.
    #[serde(default)]
    pub self_commands: bool,
}
