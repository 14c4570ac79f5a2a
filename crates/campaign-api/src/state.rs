//! Application state shared across handlers.

use campaign_dispatcher::DispatchEngine;
use database::Database;
use tokio_util::task::TaskTracker;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Database,
    /// Campaign dispatch engine.
    pub engine: DispatchEngine,
    /// Background campaign runs.
    pub runs: TaskTracker,
}

impl AppState {
    /// Create new application state.
    pub fn new(db: Database, engine: DispatchEngine) -> Self {
        Self {
            db,
            engine,
            runs: TaskTracker::new(),
        }
    }

    /// Wait for every background run to return.
    pub async fn drain(&self) {
        self.runs.close();
        self.runs.wait().await;
    }
}
