//! WhatsApp HTTP API (WAHA) client library.
//!
//! This crate provides a small Rust client for sending text messages through a
//! WAHA-compatible gateway. Every failure mode of a send (network errors,
//! non-2xx responses, unreadable bodies) is folded into [`SendOutcome`] so a
//! caller looping over many recipients can log and move on.
//!
//! # Example
//!
//! ```no_run
//! use waha_client::{SendOutcome, WahaClient, WahaConfig};
//!
//! # async fn example() -> Result<(), waha_client::GatewayError> {
//! let config = WahaConfig::new("http://localhost:3000/api").with_api_key("secret");
//! let client = WahaClient::new(config)?;
//!
//! match client.send_text("600111222", "Hola Ana").await {
//!     SendOutcome::Sent { message_id } => println!("sent: {:?}", message_id),
//!     SendOutcome::Failed { error } => eprintln!("failed: {}", error),
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::WahaClient;
pub use config::{WahaConfig, DEFAULT_SESSION};
pub use error::GatewayError;
pub use types::{chat_id, normalize_phone, SendOutcome, SendTextRequest};

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
