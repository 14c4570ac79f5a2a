//! SQLite persistence layer for the clinic campaign dispatcher.
//!
//! This crate provides async database operations for clients, message
//! templates, system settings, campaigns and the message log using SQLx with
//! SQLite.
//!
//! # Example
//!
//! ```no_run
//! use database::{campaign, models::NewCampaign, Database};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:clinic.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     // Create a campaign
//!     let new = NewCampaign {
//!         id: "spring-checkup".to_string(),
//!         name: "Spring check-up".to_string(),
//!         template_id: "tpl-checkup".to_string(),
//!         ..Default::default()
//!     };
//!     let stored = campaign::create_campaign(db.pool(), &new).await?;
//!     println!("{} is {}", stored.id, stored.status);
//!
//!     Ok(())
//! }
//! ```

pub mod campaign;
pub mod client;
pub mod error;
pub mod message_log;
pub mod models;
pub mod settings;
pub mod template;

pub use error::{DatabaseError, Result};
pub use models::{
    Campaign, CampaignStatus, CampaignUpdate, Client, DeliveryStatus, MessageLog,
    MessageTemplate, NewCampaign, NewMessageLog, Setting,
};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 10;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// // File database
    /// let db = database::Database::connect("sqlite:data/clinic.db?mode=rwc").await?;
    ///
    /// // In-memory database (for testing)
    /// let db = database::Database::connect("sqlite::memory:").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // Every connection to `:memory:` is a separate database.
        let pool_size = if url.contains(":memory:") { 1 } else { pool_size };

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
