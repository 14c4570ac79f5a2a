//! Campaign dispatch route.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use campaign_dispatcher::{DispatchError, DispatchRequest, DispatchResponse, RunSummary};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::error::Result;
use crate::state::AppState;

/// Query options for a dispatch.
#[derive(Debug, Default, Deserialize)]
pub struct DispatchQuery {
    /// Run to completion before answering.
    #[serde(default)]
    pub wait: bool,
}

/// Dispatch reply. `summary` is only present for waited runs.
#[derive(Debug, Serialize)]
pub struct DispatchReply {
    #[serde(flatten)]
    pub response: DispatchResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
}

/// Start a campaign run.
///
/// Preconditions are checked before answering. The run itself continues in
/// the background unless `?wait=true` is given.
pub async fn dispatch(
    State(state): State<AppState>,
    Query(query): Query<DispatchQuery>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<DispatchReply>)> {
    let Json(payload) = payload.map_err(|e| DispatchError::Payload(e.body_text()))?;
    let request = DispatchRequest::from_json(payload)?;
    let prepared = state.engine.prepare(request).await?;
    let campaign_id = prepared.campaign_id().to_string();

    if query.wait {
        let summary = state.engine.execute(prepared).await?;
        return Ok((
            StatusCode::OK,
            Json(DispatchReply {
                response: DispatchResponse::ok(summary.message()),
                summary: Some(summary),
            }),
        ));
    }

    let audience = prepared.audience_len();
    let engine = state.engine.clone();
    state.runs.spawn(async move {
        if let Err(e) = engine.execute(prepared).await {
            error!(error = %e, "Background campaign run failed");
        }
    });
    info!(campaign_id = %campaign_id, audience, "Campaign dispatch accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(DispatchReply {
            response: DispatchResponse::ok(format!(
                "Campaign {} started for {} recipients",
                campaign_id, audience
            )),
            summary: None,
        }),
    ))
}
