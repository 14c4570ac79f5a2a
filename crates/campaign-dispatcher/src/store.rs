//! Store interfaces consumed by the dispatcher.
//!
//! Abstracted so the engine can run against SQLite in production and
//! in-memory stores in tests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::DispatchConfig;
use crate::error::StoreError;
use crate::model::{
    AudienceFilter, Campaign, CampaignUpdate, MessageLog, MessageTemplate, NewMessageLog,
    Recipient,
};

/// Source of campaign audiences.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// List reachable clients matching every filter, at most `limit` of them.
    async fn list_clients(
        &self,
        filters: &[AudienceFilter],
        limit: usize,
    ) -> Result<Vec<Recipient>, StoreError>;

    /// Count reachable clients matching every filter.
    async fn count_clients(&self, filters: &[AudienceFilter]) -> Result<u64, StoreError>;
}

/// Source of message templates.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get_template(&self, id: &str) -> Result<MessageTemplate, StoreError>;
}

/// Source of dispatcher configuration.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get_config(&self) -> Result<DispatchConfig, StoreError>;
}

/// Campaign documents.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn get_campaign(&self, id: &str) -> Result<Campaign, StoreError>;

    /// Apply a partial update and return the stored document.
    async fn update_campaign(
        &self,
        id: &str,
        update: &CampaignUpdate,
    ) -> Result<Campaign, StoreError>;
}

/// Append-only message log.
#[async_trait]
pub trait MessageLogStore: Send + Sync {
    /// One zero-based page of a campaign's log entries, oldest first.
    async fn list_logs(
        &self,
        campaign_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<MessageLog>, StoreError>;

    async fn append_log(&self, entry: &NewMessageLog) -> Result<(), StoreError>;
}

/// The full set of stores a dispatch engine talks to.
#[derive(Clone)]
pub struct Stores {
    pub clients: Arc<dyn ClientStore>,
    pub templates: Arc<dyn TemplateStore>,
    pub config: Arc<dyn ConfigStore>,
    pub campaigns: Arc<dyn CampaignStore>,
    pub logs: Arc<dyn MessageLogStore>,
}

impl Stores {
    /// Use one backend for every store.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: ClientStore + TemplateStore + ConfigStore + CampaignStore + MessageLogStore + 'static,
    {
        Self {
            clients: store.clone(),
            templates: store.clone(),
            config: store.clone(),
            campaigns: store.clone(),
            logs: store,
        }
    }
}
