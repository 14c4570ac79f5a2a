//! Bulk WhatsApp campaign dispatcher.
//!
//! Takes a campaign, a message template and the gateway configuration, and
//! delivers one personalized message per recipient:
//!
//! - sends are strictly sequential, with a random delay between messages and
//!   a longer pause after each randomly sized batch
//! - recipients already in the message log for the campaign are skipped, so a
//!   re-run does not message them twice
//! - the campaign status is re-read between recipients; pausing it from the
//!   outside stops the run
//! - per-recipient failures are logged and counted, never fatal
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use campaign_dispatcher::{DispatchEngine, DispatchRequest, SqliteStore, Stores, WahaConnector};
//! use database::Database;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect("sqlite:clinic.db?mode=rwc").await?;
//! db.migrate().await?;
//!
//! let stores = Stores::shared(Arc::new(SqliteStore::new(db)));
//! let engine = DispatchEngine::new(stores, Arc::new(WahaConnector));
//!
//! let summary = engine
//!     .run(DispatchRequest::new("spring-checkup", "tpl-checkup"))
//!     .await?;
//! println!("{}", summary.message());
//! # Ok(())
//! # }
//! ```

pub mod audience;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod memory;
pub mod model;
pub mod notifier;
pub mod pacing;
pub mod sqlite;
pub mod state;
pub mod store;
pub mod template;

pub use audience::{AudienceResolver, MAX_AUDIENCE};
pub use config::{DispatchConfig, GatewaySettings, PacingConfig};
pub use engine::{DispatchEngine, EngineOptions, PreparedRun};
pub use error::{DispatchError, Result, StoreError};
pub use gateway::{GatewayConnector, MessageGateway, SendOutcome, WahaConnector};
pub use ledger::DeliveryLedger;
pub use model::{
    AudienceFilter, AudienceFilters, DispatchRequest, DispatchResponse, Recipient, RunOutcome,
    RunSummary,
};
pub use notifier::{AdminNotifier, Notice};
pub use pacing::{random_delay, RateController};
pub use sqlite::SqliteStore;
pub use state::{CampaignStateStore, Counters};
pub use store::{CampaignStore, ClientStore, ConfigStore, MessageLogStore, Stores, TemplateStore};

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
