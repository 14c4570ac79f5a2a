//! Dispatch engine: drives one campaign run from `pending`/`paused` to a
//! terminal state.
//!
//! A run has two phases. [`DispatchEngine::prepare`] checks preconditions and
//! resolves the audience without touching campaign state. [`DispatchEngine::execute`]
//! moves the campaign to `running`, sends one message per recipient and
//! finalizes. Any store failure during execution marks the campaign `failed`.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use waha_client::normalize_phone;

use crate::audience::AudienceResolver;
use crate::config::DispatchConfig;
use crate::error::{DispatchError, StoreError};
use crate::gateway::{GatewayConnector, MessageGateway};
use crate::ledger::DeliveryLedger;
use crate::model::{
    AudienceFilter, AudienceFilters, Campaign, CampaignStatus, DeliveryStatus, DispatchRequest,
    MessageTemplate, NewMessageLog, Recipient, RunOutcome, RunSummary,
};
use crate::notifier::{AdminNotifier, Notice};
use crate::pacing::RateController;
use crate::state::{CampaignStateStore, Counters};
use crate::store::Stores;
use crate::template::render;

/// Tunables that are not part of the stored configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Re-read the campaign status before the first attempted recipient and
    /// then every this many attempted recipients.
    pub status_check_every: NonZeroUsize,
    /// Treat only prior successful sends as already contacted.
    pub skip_only_successful: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            status_check_every: NonZeroUsize::MIN,
            skip_only_successful: false,
        }
    }
}

/// Everything needed to execute a run, gathered without side effects.
pub struct PreparedRun {
    campaign: Campaign,
    template: MessageTemplate,
    config: DispatchConfig,
    filters: Vec<AudienceFilter>,
    audience: Vec<Recipient>,
    gateway: Arc<dyn MessageGateway>,
}

impl PreparedRun {
    pub fn campaign_id(&self) -> &str {
        &self.campaign.id
    }

    /// Number of resolved recipients, before deduplication.
    pub fn audience_len(&self) -> usize {
        self.audience.len()
    }

    fn notifier(&self) -> AdminNotifier {
        AdminNotifier::new(self.gateway.clone(), self.config.admin_phone_numbers.clone())
    }
}

impl std::fmt::Debug for PreparedRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedRun")
            .field("campaign_id", &self.campaign.id)
            .field("template_id", &self.template.id)
            .field("filters", &self.filters)
            .field("audience", &self.audience.len())
            .finish()
    }
}

/// Why a precondition step stopped.
enum Halt {
    /// Report to the caller, leave the campaign alone.
    Reject(DispatchError),
    /// Mark the campaign failed.
    Fail(String),
}

impl From<DispatchError> for Halt {
    fn from(err: DispatchError) -> Self {
        Halt::Reject(err)
    }
}

impl From<StoreError> for Halt {
    fn from(err: StoreError) -> Self {
        Halt::Fail(err.to_string())
    }
}

/// Why the send loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    Exhausted,
    /// Someone else changed the campaign status.
    External(CampaignStatus),
    Shutdown,
}

/// Orchestrates campaign runs.
#[derive(Clone)]
pub struct DispatchEngine {
    stores: Stores,
    connector: Arc<dyn GatewayConnector>,
    options: EngineOptions,
    shutdown: CancellationToken,
}

impl DispatchEngine {
    /// Create an engine with default options.
    pub fn new(stores: Stores, connector: Arc<dyn GatewayConnector>) -> Self {
        Self {
            stores,
            connector,
            options: EngineOptions::default(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Stop in-flight runs when `token` is cancelled. Stopped runs leave
    /// their campaign `paused`.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    fn state(&self) -> CampaignStateStore {
        CampaignStateStore::new(self.stores.campaigns.clone())
    }

    /// Prepare and execute a run.
    pub async fn run(&self, request: DispatchRequest) -> Result<RunSummary, DispatchError> {
        let prepared = self.prepare(request).await?;
        self.execute(prepared).await
    }

    /// Validate the request and load everything a run needs. Campaign state
    /// is only touched if a store fails outright, in which case the campaign
    /// is marked `failed`.
    pub async fn prepare(&self, request: DispatchRequest) -> Result<PreparedRun, DispatchError> {
        request.validate()?;
        let campaign_id = request.campaign_id.trim().to_string();

        let config = match self.stores.config.get_config().await {
            Ok(config) => config,
            Err(e) => return Err(self.fail_prepare(&campaign_id, None, &e.to_string()).await),
        };
        let settings = config.gateway_settings()?;
        let gateway = self.connector.connect(&settings, request.session())?;

        match self
            .load_run(&campaign_id, &request, config.clone(), gateway.clone())
            .await
        {
            Ok(prepared) => {
                info!(
                    campaign_id = %campaign_id,
                    audience = prepared.audience.len(),
                    "Campaign run prepared"
                );
                Ok(prepared)
            }
            Err(Halt::Reject(e)) => {
                warn!(campaign_id = %campaign_id, error = %e, "Campaign run rejected");
                Err(e)
            }
            Err(Halt::Fail(message)) => {
                let notifier = AdminNotifier::new(gateway, config.admin_phone_numbers);
                Err(self
                    .fail_prepare(&campaign_id, Some(&notifier), &message)
                    .await)
            }
        }
    }

    async fn load_run(
        &self,
        campaign_id: &str,
        request: &DispatchRequest,
        config: DispatchConfig,
        gateway: Arc<dyn MessageGateway>,
    ) -> Result<PreparedRun, Halt> {
        let campaign = match self.state().get(campaign_id).await {
            Ok(c) => c,
            Err(StoreError::NotFound { .. }) => {
                return Err(DispatchError::Precondition(format!(
                    "campaign {} not found",
                    campaign_id
                ))
                .into())
            }
            Err(e) => return Err(e.into()),
        };

        if !campaign.status.is_startable() {
            return Err(not_startable(campaign_id, campaign.status).into());
        }

        let template_id = request.template_id.trim();
        let template = match self.stores.templates.get_template(template_id).await {
            Ok(t) => t,
            Err(StoreError::NotFound { .. }) => {
                return Err(DispatchError::Precondition(format!(
                    "template {} not found",
                    template_id
                ))
                .into())
            }
            Err(e) => return Err(e.into()),
        };

        let filters = audience_filters(request, &campaign)?;
        let audience = AudienceResolver::new(self.stores.clients.clone())
            .resolve(&filters)
            .await?;

        Ok(PreparedRun {
            campaign,
            template,
            config,
            filters,
            audience,
            gateway,
        })
    }

    /// Run a prepared campaign to completion, an external stop, or failure.
    pub async fn execute(&self, run: PreparedRun) -> Result<RunSummary, DispatchError> {
        let notifier = run.notifier();
        match self.drive(&run, &notifier).await {
            Ok(summary) => {
                info!(
                    campaign_id = %summary.campaign_id,
                    outcome = ?summary.outcome,
                    attempted = summary.attempted,
                    skipped = summary.skipped,
                    "Campaign run finished"
                );
                Ok(summary)
            }
            Err(e) => Err(self
                .fail_run(run.campaign_id(), Some(&notifier), &e.to_string())
                .await),
        }
    }

    async fn drive(
        &self,
        run: &PreparedRun,
        notifier: &AdminNotifier,
    ) -> Result<RunSummary, StoreError> {
        let campaign_id = run.campaign_id();
        let state = self.state();

        let estimated_recipients = match run.campaign.estimated_recipients {
            Some(n) => u64::try_from(n).ok(),
            None => match AudienceResolver::new(self.stores.clients.clone())
                .estimate(&run.filters)
                .await
            {
                Ok(n) => Some(n),
                Err(e) => {
                    warn!(campaign_id, error = %e, "Audience estimate unavailable");
                    None
                }
            },
        };
        notifier
            .notify(&Notice::Started {
                campaign: run.campaign.name.clone(),
                estimated_recipients,
            })
            .await;

        let campaign = state.mark_running(campaign_id).await?;
        let mut counters = Counters::from_campaign(&campaign);

        let ledger = DeliveryLedger::new(self.stores.logs.clone())
            .skip_only_successful(self.options.skip_only_successful);
        let mut contacted = ledger.already_contacted(campaign_id).await?;

        let (exit, attempted, skipped) = self
            .send_loop(run, notifier, &state, &ledger, &mut contacted, &mut counters)
            .await?;

        let outcome = match exit {
            LoopExit::Shutdown => {
                let status = state.pause_if_running(campaign_id).await?;
                RunOutcome::Stopped(status)
            }
            LoopExit::External(status) => {
                info!(campaign_id, %status, "Campaign stopped externally");
                RunOutcome::Stopped(status)
            }
            LoopExit::Exhausted => {
                let status = state.current_status(campaign_id).await?;
                if status == CampaignStatus::Running {
                    state.mark_completed(campaign_id, &counters).await?;
                    notifier
                        .notify(&Notice::Completed {
                            campaign: run.campaign.name.clone(),
                            succeeded: counters.succeeded,
                            failed: counters.failed,
                            skipped,
                        })
                        .await;
                    RunOutcome::Completed
                } else {
                    info!(campaign_id, %status, "Campaign status changed before completion");
                    RunOutcome::Stopped(status)
                }
            }
        };

        Ok(RunSummary {
            campaign_id: campaign_id.to_string(),
            outcome,
            attempted,
            skipped,
            processed: counters.processed,
            succeeded: counters.succeeded,
            failed: counters.failed,
        })
    }

    /// The per-recipient loop. Returns how it ended, attempts and skips.
    async fn send_loop(
        &self,
        run: &PreparedRun,
        notifier: &AdminNotifier,
        state: &CampaignStateStore,
        ledger: &DeliveryLedger,
        contacted: &mut HashSet<String>,
        counters: &mut Counters,
    ) -> Result<(LoopExit, u64, u64), StoreError> {
        let campaign_id = run.campaign_id();
        let check_every = self.options.status_check_every.get();
        let notify_every = run.config.notification_interval;

        let mut rate = RateController::new(run.config.pacing.clone());
        let mut attempted = 0u64;
        let mut skipped = 0u64;
        let mut since_notice = 0u32;

        for (index, recipient) in run.audience.iter().enumerate() {
            let phone_key = normalize_phone(&recipient.phone);
            if contacted.contains(&phone_key) {
                skipped += 1;
                debug!(campaign_id, phone = %recipient.phone, "Already contacted, skipping");
                continue;
            }

            if self.shutdown.is_cancelled() {
                return Ok((LoopExit::Shutdown, attempted, skipped));
            }
            if attempted as usize % check_every == 0 {
                let status = state.current_status(campaign_id).await?;
                if status != CampaignStatus::Running {
                    return Ok((LoopExit::External(status), attempted, skipped));
                }
            }

            if !self.wait(rate.message_delay()).await {
                return Ok((LoopExit::Shutdown, attempted, skipped));
            }

            let text = render(&run.template.body, recipient);
            let outcome = run.gateway.send_text(&recipient.phone, &text).await;
            attempted += 1;
            contacted.insert(phone_key);

            match outcome.error() {
                None => debug!(campaign_id, phone = %recipient.phone, "Message sent"),
                Some(error) => {
                    warn!(campaign_id, phone = %recipient.phone, error, "Message failed")
                }
            }

            let entry = NewMessageLog {
                campaign_id: campaign_id.to_string(),
                client_id: recipient.id.clone(),
                client_phone: recipient.phone.clone(),
                template_id: run.template.id.clone(),
                status: if outcome.is_sent() {
                    DeliveryStatus::Sent
                } else {
                    DeliveryStatus::Failed
                },
                error_message: outcome.error().map(str::to_string),
                sent_at: Utc::now(),
                waha_message_id: outcome.message_id().map(str::to_string),
            };
            if let Err(e) = ledger.record(&entry).await {
                warn!(campaign_id, phone = %recipient.phone, error = %e, "Message log write failed");
            }

            counters.record(&outcome);
            if let Err(e) = state.save_counters(campaign_id, counters).await {
                warn!(campaign_id, error = %e, "Counter update failed");
            }

            if outcome.is_sent() && notify_every > 0 {
                since_notice += 1;
                if since_notice >= notify_every {
                    notifier
                        .notify(&Notice::Progress {
                            campaign: run.campaign.name.clone(),
                            succeeded: counters.succeeded,
                            failed: counters.failed,
                        })
                        .await;
                    since_notice = 0;
                }
            }

            if let Some(pause) = rate.record_processed() {
                let is_last = index + 1 == run.audience.len();
                if !is_last {
                    info!(campaign_id, ?pause, "Batch pause");
                    if !self.wait(pause).await {
                        return Ok((LoopExit::Shutdown, attempted, skipped));
                    }
                }
            }
        }

        Ok((LoopExit::Exhausted, attempted, skipped))
    }

    /// Sleep for `duration`. Returns false if shutdown fired first.
    async fn wait(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.shutdown.is_cancelled();
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.shutdown.cancelled() => false,
        }
    }

    /// Failure path for `prepare`. Only a campaign that could have been
    /// started by this request is marked failed; anything else is left as is.
    async fn fail_prepare(
        &self,
        campaign_id: &str,
        notifier: Option<&AdminNotifier>,
        message: &str,
    ) -> DispatchError {
        match self.state().current_status(campaign_id).await {
            Ok(status) if status.is_startable() => {
                self.fail_run(campaign_id, notifier, message).await
            }
            Ok(status) => {
                warn!(campaign_id, %status, error = message, "Campaign run rejected");
                not_startable(campaign_id, status)
            }
            Err(e) => {
                error!(campaign_id, error = %e, cause = message, "Campaign run failed before start");
                DispatchError::RunFailure(message.to_string())
            }
        }
    }

    /// Mark the campaign failed, tell admins if possible, and build the
    /// caller-facing error.
    async fn fail_run(
        &self,
        campaign_id: &str,
        notifier: Option<&AdminNotifier>,
        message: &str,
    ) -> DispatchError {
        error!(campaign_id, error = message, "Campaign run failed");

        let name = match self.state().mark_failed(campaign_id, message).await {
            Ok(campaign) => campaign.name,
            Err(e) => {
                error!(campaign_id, error = %e, "Could not mark campaign failed");
                campaign_id.to_string()
            }
        };

        if let Some(notifier) = notifier {
            notifier
                .notify(&Notice::Failed {
                    campaign: name,
                    error: message.to_string(),
                })
                .await;
        }

        DispatchError::RunFailure(message.to_string())
    }
}

fn not_startable(campaign_id: &str, status: CampaignStatus) -> DispatchError {
    DispatchError::Precondition(format!(
        "campaign {} is {}; only pending or paused campaigns can start",
        campaign_id, status
    ))
}

/// Filters from the request, else the ones stored on the campaign.
fn audience_filters(
    request: &DispatchRequest,
    campaign: &Campaign,
) -> Result<Vec<AudienceFilter>, DispatchError> {
    if let Some(ref filters) = request.audience_filters {
        return Ok(filters.to_filters());
    }
    match campaign.audience_filters.as_deref() {
        Some(raw) => AudienceFilters::from_stored(raw)
            .map(|f| f.to_filters())
            .map_err(|e| {
                DispatchError::Precondition(format!(
                    "campaign {} has unreadable audience filters: {}",
                    campaign.id, e
                ))
            }),
        None => Ok(Vec::new()),
    }
}
