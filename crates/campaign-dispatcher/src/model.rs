//! Dispatch request, audience and run-summary types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DispatchError;

pub use database::{
    Campaign, CampaignStatus, CampaignUpdate, DeliveryStatus, MessageLog, MessageTemplate,
    NewMessageLog,
};

/// A single audience filter criterion.
///
/// Multiple filters narrow the audience together; each kind decides how it
/// matches a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AudienceFilter {
    /// Client carries any of these tags (case-insensitive keyword match).
    TagsInclude(Vec<String>),
}

/// Wire shape of `audienceFilters`, as sent by callers and stored on campaigns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudienceFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags_include: Option<Vec<String>>,
}

impl AudienceFilters {
    /// Convert to typed filters, dropping blank and empty criteria.
    pub fn to_filters(&self) -> Vec<AudienceFilter> {
        let mut filters = Vec::new();
        if let Some(ref tags) = self.tags_include {
            let tags: Vec<String> = tags
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            if !tags.is_empty() {
                filters.push(AudienceFilter::TagsInclude(tags));
            }
        }
        filters
    }

    /// Parse the JSON text stored on a campaign.
    pub fn from_stored(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw)
    }
}

/// Merge every tag-inclusion criterion into one keyword list.
pub fn included_tags(filters: &[AudienceFilter]) -> Vec<String> {
    filters
        .iter()
        .flat_map(|f| match f {
            AudienceFilter::TagsInclude(tags) => tags.iter().cloned(),
        })
        .collect()
}

/// A resolved audience member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: String,
    pub phone: String,
    pub name: Option<String>,
}

impl Recipient {
    /// Project a stored client, if it has a phone number.
    pub fn from_client(client: database::Client) -> Option<Self> {
        let phone = client.phone?.trim().to_string();
        if phone.is_empty() {
            return None;
        }
        let name = Some(client.name.trim().to_string()).filter(|n| !n.is_empty());
        Some(Self {
            id: client.id,
            phone,
            name,
        })
    }
}

/// Invocation payload that starts a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    #[serde(default)]
    pub campaign_id: String,
    #[serde(default)]
    pub template_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience_filters: Option<AudienceFilters>,
}

impl DispatchRequest {
    /// Create a request for a campaign and template.
    pub fn new(campaign_id: impl Into<String>, template_id: impl Into<String>) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            template_id: template_id.into(),
            ..Default::default()
        }
    }

    /// Set the gateway session name.
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session_name = Some(session.into());
        self
    }

    /// Set explicit audience filters.
    pub fn with_filters(mut self, filters: AudienceFilters) -> Self {
        self.audience_filters = Some(filters);
        self
    }

    /// Decode a raw JSON payload, reporting any problem as a payload error.
    pub fn from_json(value: Value) -> Result<Self, DispatchError> {
        let request: Self = serde_json::from_value(value)
            .map_err(|e| DispatchError::Payload(e.to_string()))?;
        request.validate()?;
        Ok(request)
    }

    /// Check required fields.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.campaign_id.trim().is_empty() {
            return Err(DispatchError::Payload("campaignId is required".to_string()));
        }
        if self.template_id.trim().is_empty() {
            return Err(DispatchError::Payload("templateId is required".to_string()));
        }
        Ok(())
    }

    /// Session name to send from, defaulting to the gateway default.
    pub fn session(&self) -> &str {
        self.session_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(waha_client::DEFAULT_SESSION)
    }
}

/// Response returned to the invoker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchResponse {
    /// A successful response.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    /// A failed response.
    pub fn failed(error: &DispatchError) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.to_string()),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The audience was exhausted and the campaign is now `completed`.
    Completed,
    /// The loop stopped early; the campaign was left in this status.
    Stopped(CampaignStatus),
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub campaign_id: String,
    pub outcome: RunOutcome,
    /// Recipients attempted during this run.
    pub attempted: u64,
    /// Recipients skipped because they were already contacted.
    pub skipped: u64,
    /// Campaign totals after the run.
    pub processed: i64,
    pub succeeded: i64,
    pub failed: i64,
}

impl RunSummary {
    /// Human-readable one-liner.
    pub fn message(&self) -> String {
        match self.outcome {
            RunOutcome::Completed => format!(
                "Campaign {} completed: {} sent, {} failed, {} skipped",
                self.campaign_id, self.succeeded, self.failed, self.skipped
            ),
            RunOutcome::Stopped(status) => format!(
                "Campaign {} stopped while {} after {} attempts ({} sent, {} failed)",
                self.campaign_id, status, self.attempted, self.succeeded, self.failed
            ),
        }
    }
}
