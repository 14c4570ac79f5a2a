//! Store implementations backed by the `database` crate.

use async_trait::async_trait;
use database::{campaign, client, message_log, settings, template, Database};

use crate::config::DispatchConfig;
use crate::error::StoreError;
use crate::model::{
    included_tags, AudienceFilter, Campaign, CampaignUpdate, MessageLog, MessageTemplate,
    NewMessageLog, Recipient,
};
use crate::store::{CampaignStore, ClientStore, ConfigStore, MessageLogStore, TemplateStore};

/// All dispatcher stores over one SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl ClientStore for SqliteStore {
    async fn list_clients(
        &self,
        filters: &[AudienceFilter],
        limit: usize,
    ) -> Result<Vec<Recipient>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let clients = client::list_clients(self.db.pool(), &included_tags(filters), limit).await?;
        Ok(clients.into_iter().filter_map(Recipient::from_client).collect())
    }

    async fn count_clients(&self, filters: &[AudienceFilter]) -> Result<u64, StoreError> {
        let count = client::count_clients(self.db.pool(), &included_tags(filters)).await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

#[async_trait]
impl TemplateStore for SqliteStore {
    async fn get_template(&self, id: &str) -> Result<MessageTemplate, StoreError> {
        Ok(template::get_template(self.db.pool(), id).await?)
    }
}

#[async_trait]
impl ConfigStore for SqliteStore {
    async fn get_config(&self) -> Result<DispatchConfig, StoreError> {
        let raw = settings::load_settings(self.db.pool()).await?;
        Ok(DispatchConfig::from_settings(&raw))
    }
}

#[async_trait]
impl CampaignStore for SqliteStore {
    async fn get_campaign(&self, id: &str) -> Result<Campaign, StoreError> {
        Ok(campaign::get_campaign(self.db.pool(), id).await?)
    }

    async fn update_campaign(
        &self,
        id: &str,
        update: &CampaignUpdate,
    ) -> Result<Campaign, StoreError> {
        Ok(campaign::update_campaign(self.db.pool(), id, update).await?)
    }
}

#[async_trait]
impl MessageLogStore for SqliteStore {
    async fn list_logs(
        &self,
        campaign_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<MessageLog>, StoreError> {
        Ok(message_log::list_logs_page(self.db.pool(), campaign_id, page, page_size).await?)
    }

    async fn append_log(&self, entry: &NewMessageLog) -> Result<(), StoreError> {
        message_log::append_log(self.db.pool(), entry).await?;
        Ok(())
    }
}
