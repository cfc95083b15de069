//! # blacksky-channels
//!
//! Chat transports for Blacksky. The console transport is always available;
//! the WhatsApp Web transport is behind the `whatsapp-web` feature.

pub mod console;
pub mod credentials;
pub mod qr;
#[cfg(feature = "whatsapp-web")]
pub mod whatsapp;

pub use console::ConsoleTransport;
pub use credentials::FileCredentialStore;
pub use qr::generate_qr_terminal;
#[cfg(feature = "whatsapp-web")]
pub use whatsapp::WhatsAppTransport;
