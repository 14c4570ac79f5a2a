//! Campaign state store: lifecycle status and running counters.
//!
//! The engine never trusts a cached status. Every continuation decision goes
//! back to the store.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::gateway::SendOutcome;
use crate::model::{Campaign, CampaignStatus, CampaignUpdate};
use crate::store::CampaignStore;

/// Campaign counters. Only ever increase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub processed: i64,
    pub succeeded: i64,
    pub failed: i64,
}

impl Counters {
    /// Counters as currently stored on a campaign.
    pub fn from_campaign(campaign: &Campaign) -> Self {
        Self {
            processed: campaign.processed_count,
            succeeded: campaign.success_count,
            failed: campaign.failed_count,
        }
    }

    /// Count one attempt.
    pub fn record(&mut self, outcome: &SendOutcome) {
        self.processed += 1;
        if outcome.is_sent() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Typed access to the campaign document.
#[derive(Clone)]
pub struct CampaignStateStore {
    campaigns: Arc<dyn CampaignStore>,
}

impl CampaignStateStore {
    pub fn new(campaigns: Arc<dyn CampaignStore>) -> Self {
        Self { campaigns }
    }

    pub async fn get(&self, id: &str) -> Result<Campaign, StoreError> {
        self.campaigns.get_campaign(id).await
    }

    pub async fn update(&self, id: &str, update: CampaignUpdate) -> Result<Campaign, StoreError> {
        let update = CampaignUpdate {
            last_updated_at: update.last_updated_at.or_else(|| Some(Utc::now())),
            ..update
        };
        self.campaigns.update_campaign(id, &update).await
    }

    /// Fresh read of the stored status.
    pub async fn current_status(&self, id: &str) -> Result<CampaignStatus, StoreError> {
        Ok(self.get(id).await?.status)
    }

    /// `pending`/`paused` -> `running`, stamping `started_at`.
    pub async fn mark_running(&self, id: &str) -> Result<Campaign, StoreError> {
        let now = Utc::now();
        let campaign = self
            .update(
                id,
                CampaignUpdate {
                    status: Some(CampaignStatus::Running),
                    started_at: Some(now),
                    last_updated_at: Some(now),
                    ..Default::default()
                },
            )
            .await?;
        info!(campaign_id = id, "Campaign running");
        Ok(campaign)
    }

    /// Persist counters after one recipient.
    pub async fn save_counters(&self, id: &str, counters: &Counters) -> Result<(), StoreError> {
        self.update(id, counters_update(counters)).await?;
        debug!(
            campaign_id = id,
            processed = counters.processed,
            succeeded = counters.succeeded,
            failed = counters.failed,
            "Counters saved"
        );
        Ok(())
    }

    /// `running` -> `completed` with final counters.
    pub async fn mark_completed(&self, id: &str, counters: &Counters) -> Result<Campaign, StoreError> {
        let now = Utc::now();
        let campaign = self
            .update(
                id,
                CampaignUpdate {
                    status: Some(CampaignStatus::Completed),
                    completed_at: Some(now),
                    last_updated_at: Some(now),
                    ..counters_update(counters)
                },
            )
            .await?;
        info!(campaign_id = id, "Campaign completed");
        Ok(campaign)
    }

    /// Move a live campaign to `failed` with the error that ended the run.
    ///
    /// `completed` and `failed` campaigns are returned unchanged. When the
    /// status cannot be read the write is still attempted.
    pub async fn mark_failed(&self, id: &str, error_message: &str) -> Result<Campaign, StoreError> {
        match self.get(id).await {
            Ok(campaign)
                if matches!(
                    campaign.status,
                    CampaignStatus::Completed | CampaignStatus::Failed
                ) =>
            {
                warn!(campaign_id = id, status = %campaign.status, "Campaign already finished, not marking failed");
                return Ok(campaign);
            }
            Ok(_) => {}
            Err(e) => debug!(campaign_id = id, error = %e, "Status unavailable before marking failed"),
        }
        self.update(
            id,
            CampaignUpdate {
                status: Some(CampaignStatus::Failed),
                error_message: Some(error_message.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    /// `running` -> `paused`, only if the campaign is still running.
    /// Returns the status the campaign ends up in.
    pub async fn pause_if_running(&self, id: &str) -> Result<CampaignStatus, StoreError> {
        let status = self.current_status(id).await?;
        if status != CampaignStatus::Running {
            return Ok(status);
        }
        self.update(
            id,
            CampaignUpdate {
                status: Some(CampaignStatus::Paused),
                ..Default::default()
            },
        )
        .await?;
        info!(campaign_id = id, "Campaign paused");
        Ok(CampaignStatus::Paused)
    }
}

fn counters_update(counters: &Counters) -> CampaignUpdate {
    CampaignUpdate {
        processed_count: Some(counters.processed),
        success_count: Some(counters.succeeded),
        failed_count: Some(counters.failed),
        ..Default::default()
    }
}
