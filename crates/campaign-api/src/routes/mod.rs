//! Route handlers for the campaign API.

pub mod campaigns;
pub mod dispatch;
pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/campaigns", get(campaigns::list))
        .route("/api/campaigns/dispatch", post(dispatch::dispatch))
        .route("/api/campaigns/:id", get(campaigns::show))
}
