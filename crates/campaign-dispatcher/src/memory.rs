//! In-memory stores and a scripted gateway.
//!
//! Used by the test suites and for local dry runs. The stores can be told to
//! fail specific operations to exercise the engine's failure handling.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::config::{DispatchConfig, GatewaySettings};
use crate::error::{DispatchError, StoreError};
use crate::gateway::{GatewayConnector, MessageGateway, SendOutcome};
use crate::model::{
    included_tags, AudienceFilter, Campaign, CampaignStatus, CampaignUpdate, DeliveryStatus,
    MessageLog, MessageTemplate, NewMessageLog, Recipient,
};
use crate::store::{CampaignStore, ClientStore, ConfigStore, MessageLogStore, TemplateStore};

/// An operation the memory store can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    ClientQueries,
    ConfigReads,
    CampaignReads,
    /// Updates that carry no status change.
    CounterUpdates,
    LedgerReads,
    LogAppends,
}

#[derive(Default)]
struct Inner {
    clients: Vec<database::Client>,
    templates: HashMap<String, MessageTemplate>,
    config: DispatchConfig,
    campaigns: HashMap<String, Campaign>,
    logs: Vec<MessageLog>,
    faults: HashSet<Fault>,
}

/// Every store trait over plain collections.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

/// A `pending` campaign with zeroed counters.
pub fn pending_campaign(id: &str, template_id: &str) -> Campaign {
    Campaign {
        id: id.to_string(),
        name: id.to_string(),
        template_id: template_id.to_string(),
        audience_filters: None,
        status: CampaignStatus::Pending,
        estimated_recipients: None,
        processed_count: 0,
        success_count: 0,
        failed_count: 0,
        started_at: None,
        completed_at: None,
        last_updated_at: None,
        error_message: None,
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock only happens in a failing test.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self, fault: Fault) -> Result<(), StoreError> {
        if self.lock().faults.contains(&fault) {
            return Err(StoreError::Backend(format!("injected fault: {:?}", fault)));
        }
        Ok(())
    }

    pub fn set_config(&self, config: DispatchConfig) {
        self.lock().config = config;
    }

    pub fn add_client(&self, id: &str, name: &str, phone: Option<&str>, tags: &str) {
        self.lock().clients.push(database::Client {
            id: id.to_string(),
            name: name.to_string(),
            phone: phone.map(str::to_string),
            tags: tags.to_string(),
        });
    }

    pub fn add_template(&self, id: &str, body: &str) {
        self.lock().templates.insert(
            id.to_string(),
            MessageTemplate {
                id: id.to_string(),
                name: id.to_string(),
                body: body.to_string(),
            },
        );
    }

    pub fn insert_campaign(&self, campaign: Campaign) {
        self.lock().campaigns.insert(campaign.id.clone(), campaign);
    }

    /// Append a prior delivery attempt.
    pub fn add_log(&self, campaign_id: &str, phone: &str, status: DeliveryStatus) {
        let mut inner = self.lock();
        let id = inner.logs.len() as i64 + 1;
        inner.logs.push(MessageLog {
            id,
            campaign_id: campaign_id.to_string(),
            client_id: format!("client-{}", phone),
            client_phone: phone.to_string(),
            template_id: String::new(),
            status,
            error_message: None,
            sent_at: chrono::Utc::now(),
            waha_message_id: None,
        });
    }

    /// Change a campaign's status the way an admin would.
    pub fn set_status(&self, campaign_id: &str, status: CampaignStatus) {
        if let Some(campaign) = self.lock().campaigns.get_mut(campaign_id) {
            campaign.status = status;
        }
    }

    pub fn campaign(&self, id: &str) -> Option<Campaign> {
        self.lock().campaigns.get(id).cloned()
    }

    /// Log entries for one campaign, oldest first.
    pub fn logs_for(&self, campaign_id: &str) -> Vec<MessageLog> {
        self.lock()
            .logs
            .iter()
            .filter(|l| l.campaign_id == campaign_id)
            .cloned()
            .collect()
    }

    pub fn inject(&self, fault: Fault) {
        self.lock().faults.insert(fault);
    }

    pub fn clear(&self, fault: Fault) {
        self.lock().faults.remove(&fault);
    }
}

fn matches_filters(client: &database::Client, filters: &[AudienceFilter]) -> bool {
    let wanted: Vec<String> = included_tags(filters)
        .into_iter()
        .map(|t| t.to_lowercase())
        .collect();
    if wanted.is_empty() {
        return true;
    }
    let tags = client.tags.to_lowercase();
    wanted.iter().any(|t| tags.contains(t.as_str()))
}

#[async_trait]
impl ClientStore for MemoryStore {
    async fn list_clients(
        &self,
        filters: &[AudienceFilter],
        limit: usize,
    ) -> Result<Vec<Recipient>, StoreError> {
        self.check(Fault::ClientQueries)?;
        Ok(self
            .lock()
            .clients
            .iter()
            .filter(|c| matches_filters(c, filters))
            .filter_map(|c| Recipient::from_client(c.clone()))
            .take(limit)
            .collect())
    }

    async fn count_clients(&self, filters: &[AudienceFilter]) -> Result<u64, StoreError> {
        self.check(Fault::ClientQueries)?;
        Ok(self
            .lock()
            .clients
            .iter()
            .filter(|c| matches_filters(c, filters))
            .filter(|c| c.phone.as_deref().is_some_and(|p| !p.trim().is_empty()))
            .count() as u64)
    }
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn get_template(&self, id: &str) -> Result<MessageTemplate, StoreError> {
        self.lock()
            .templates
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "Template",
                id: id.to_string(),
            })
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn get_config(&self) -> Result<DispatchConfig, StoreError> {
        self.check(Fault::ConfigReads)?;
        Ok(self.lock().config.clone())
    }
}

#[async_trait]
impl CampaignStore for MemoryStore {
    async fn get_campaign(&self, id: &str) -> Result<Campaign, StoreError> {
        self.check(Fault::CampaignReads)?;
        self.lock()
            .campaigns
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "Campaign",
                id: id.to_string(),
            })
    }

    async fn update_campaign(
        &self,
        id: &str,
        update: &CampaignUpdate,
    ) -> Result<Campaign, StoreError> {
        if update.status.is_none() {
            self.check(Fault::CounterUpdates)?;
        }

        let mut inner = self.lock();
        let campaign = inner
            .campaigns
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "Campaign",
                id: id.to_string(),
            })?;

        if let Some(status) = update.status {
            campaign.status = status;
        }
        if let Some(n) = update.processed_count {
            campaign.processed_count = n;
        }
        if let Some(n) = update.success_count {
            campaign.success_count = n;
        }
        if let Some(n) = update.failed_count {
            campaign.failed_count = n;
        }
        if update.started_at.is_some() {
            campaign.started_at = update.started_at;
        }
        if update.completed_at.is_some() {
            campaign.completed_at = update.completed_at;
        }
        if update.last_updated_at.is_some() {
            campaign.last_updated_at = update.last_updated_at;
        }
        if update.error_message.is_some() {
            campaign.error_message = update.error_message.clone();
        }
        Ok(campaign.clone())
    }
}

#[async_trait]
impl MessageLogStore for MemoryStore {
    async fn list_logs(
        &self,
        campaign_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<MessageLog>, StoreError> {
        self.check(Fault::LedgerReads)?;
        Ok(self
            .lock()
            .logs
            .iter()
            .filter(|l| l.campaign_id == campaign_id)
            .skip(page as usize * page_size as usize)
            .take(page_size as usize)
            .cloned()
            .collect())
    }

    async fn append_log(&self, entry: &NewMessageLog) -> Result<(), StoreError> {
        self.check(Fault::LogAppends)?;
        let mut inner = self.lock();
        let id = inner.logs.len() as i64 + 1;
        inner.logs.push(MessageLog {
            id,
            campaign_id: entry.campaign_id.clone(),
            client_id: entry.client_id.clone(),
            client_phone: entry.client_phone.clone(),
            template_id: entry.template_id.clone(),
            status: entry.status,
            error_message: entry.error_message.clone(),
            sent_at: entry.sent_at,
            waha_message_id: entry.waha_message_id.clone(),
        });
        Ok(())
    }
}

/// A message handed to the scripted gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub phone: String,
    pub text: String,
}

type SendHook = Box<dyn Fn(&SentMessage, usize) + Send + Sync>;

/// Gateway that records every send and answers from a script.
///
/// Successful sends get ids `m1`, `m2`, ... in call order.
#[derive(Default)]
pub struct ScriptedGateway {
    sent: Mutex<Vec<SentMessage>>,
    fail_all: Option<String>,
    failing_phones: HashMap<String, String>,
    hook: Option<SendHook>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every send with `error`.
    pub fn always_fail(mut self, error: impl Into<String>) -> Self {
        self.fail_all = Some(error.into());
        self
    }

    /// Fail sends to one phone.
    pub fn fail_phone(mut self, phone: impl Into<String>, error: impl Into<String>) -> Self {
        self.failing_phones.insert(phone.into(), error.into());
        self
    }

    /// Run `hook` after each send with the message and the total sends so far.
    pub fn on_send(mut self, hook: impl Fn(&SentMessage, usize) + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Everything sent so far, in order.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Messages sent to one phone.
    pub fn sent_to(&self, phone: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|m| m.phone == phone)
            .map(|m| m.text)
            .collect()
    }
}

#[async_trait]
impl MessageGateway for ScriptedGateway {
    async fn send_text(&self, phone: &str, text: &str) -> SendOutcome {
        let message = SentMessage {
            phone: phone.to_string(),
            text: text.to_string(),
        };
        let count = {
            let mut sent = self.sent.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            sent.push(message.clone());
            sent.len()
        };

        let outcome = if let Some(ref error) = self.fail_all {
            SendOutcome::Failed {
                error: error.clone(),
            }
        } else if let Some(error) = self.failing_phones.get(phone) {
            SendOutcome::Failed {
                error: error.clone(),
            }
        } else {
            SendOutcome::Sent {
                message_id: Some(format!("m{}", count)),
            }
        };

        if let Some(ref hook) = self.hook {
            hook(&message, count);
        }
        outcome
    }
}

/// Connector that always hands out the same scripted gateway.
pub struct ScriptedConnector {
    gateway: Arc<ScriptedGateway>,
    sessions: Mutex<Vec<String>>,
}

impl ScriptedConnector {
    pub fn new(gateway: Arc<ScriptedGateway>) -> Self {
        Self {
            gateway,
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Session names requested so far.
    pub fn sessions(&self) -> Vec<String> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl GatewayConnector for ScriptedConnector {
    fn connect(
        &self,
        _settings: &GatewaySettings,
        session: &str,
    ) -> Result<Arc<dyn MessageGateway>, DispatchError> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(session.to_string());
        Ok(self.gateway.clone())
    }
}
