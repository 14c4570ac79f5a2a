//! Campaign read routes.

use axum::extract::{Path, State};
use axum::Json;
use database::{campaign, Campaign};

use crate::error::Result;
use crate::state::AppState;

/// All campaigns, newest first.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Campaign>>> {
    Ok(Json(campaign::list_campaigns(state.db.pool()).await?))
}

/// One campaign with its status and counters.
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Campaign>> {
    Ok(Json(campaign::get_campaign(state.db.pool(), &id).await?))
}
