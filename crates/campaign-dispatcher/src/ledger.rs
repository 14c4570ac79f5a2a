//! Delivery ledger: who has already been contacted for a campaign.
//!
//! The ledger is read page by page with a hard cap on how many entries are
//! scanned. Campaigns with more prior attempts than the cap may contact some
//! recipients a second time.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};
use waha_client::normalize_phone;

use crate::error::StoreError;
use crate::model::{DeliveryStatus, NewMessageLog};
use crate::store::MessageLogStore;

/// Entries fetched per page.
pub const LEDGER_PAGE_SIZE: u32 = 100;
/// Maximum entries scanned when building the contacted set.
pub const LEDGER_MAX_ENTRIES: usize = 5_000;

/// Reads and appends the per-campaign message log.
#[derive(Clone)]
pub struct DeliveryLedger {
    logs: Arc<dyn MessageLogStore>,
    skip_only_successful: bool,
}

impl DeliveryLedger {
    /// Any prior attempt, sent or failed, counts as contacted.
    pub fn new(logs: Arc<dyn MessageLogStore>) -> Self {
        Self {
            logs,
            skip_only_successful: false,
        }
    }

    /// Count only prior `sent` entries as contacted, so failed recipients
    /// are retried on the next run.
    pub fn skip_only_successful(mut self, enabled: bool) -> Self {
        self.skip_only_successful = enabled;
        self
    }

    /// Phones already contacted for `campaign_id`, in
    /// [`normalize_phone`] form.
    pub async fn already_contacted(&self, campaign_id: &str) -> Result<HashSet<String>, StoreError> {
        let mut phones = HashSet::new();
        let mut scanned = 0usize;
        let mut page = 0u32;

        loop {
            let entries = self
                .logs
                .list_logs(campaign_id, page, LEDGER_PAGE_SIZE)
                .await?;
            let fetched = entries.len();
            scanned += fetched;

            phones.extend(
                entries
                    .into_iter()
                    .filter(|e| !self.skip_only_successful || e.status == DeliveryStatus::Sent)
                    .map(|e| normalize_phone(&e.client_phone)),
            );

            if fetched < LEDGER_PAGE_SIZE as usize {
                break;
            }
            if scanned >= LEDGER_MAX_ENTRIES {
                warn!(
                    campaign_id,
                    scanned, "Ledger scan cap reached; older recipients may be contacted again"
                );
                break;
            }
            page += 1;
        }

        debug!(campaign_id, scanned, contacted = phones.len(), "Ledger loaded");
        Ok(phones)
    }

    /// Append one delivery attempt.
    ///
    /// Callers log the error and keep going; a lost entry must not stop a run.
    pub async fn record(&self, entry: &NewMessageLog) -> Result<(), StoreError> {
        self.logs.append_log(entry).await
    }
}
