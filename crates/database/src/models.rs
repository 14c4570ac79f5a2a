//! Database models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

/// Raised when a stored enum column holds an unknown value.
#[derive(Debug, Clone, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

/// Lifecycle status of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Pending,
    Paused,
    Running,
    Completed,
    Failed,
}

impl CampaignStatus {
    /// Column value for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Pending => "pending",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Running => "running",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Failed => "failed",
        }
    }

    /// Whether a run may start from this status.
    pub fn is_startable(&self) -> bool {
        matches!(self, CampaignStatus::Pending | CampaignStatus::Paused)
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CampaignStatus::Pending),
            "paused" => Ok(CampaignStatus::Paused),
            "running" => Ok(CampaignStatus::Running),
            "completed" => Ok(CampaignStatus::Completed),
            "failed" => Ok(CampaignStatus::Failed),
            other => Err(UnknownVariant {
                kind: "campaign status",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for CampaignStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Outcome recorded for a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl DeliveryStatus {
    /// Column value for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(DeliveryStatus::Sent),
            "failed" => Ok(DeliveryStatus::Failed),
            other => Err(UnknownVariant {
                kind: "delivery status",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for DeliveryStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A clinic client that can receive campaign messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: String,
    pub name: String,
    /// Phone number as entered at the front desk.
    pub phone: Option<String>,
    /// Comma-separated tags (e.g., "vip,dermatology").
    pub tags: String,
}

/// A message template with `{{name}}`-style placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MessageTemplate {
    pub id: String,
    pub name: String,
    pub body: String,
}

/// A key/value system setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

/// A bulk-send campaign document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub template_id: String,
    /// Stored audience filters as JSON text.
    pub audience_filters: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: CampaignStatus,
    pub estimated_recipients: Option<i64>,
    pub processed_count: i64,
    pub success_count: i64,
    pub failed_count: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

/// Fields for inserting a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewCampaign {
    pub id: String,
    pub name: String,
    pub template_id: String,
    pub audience_filters: Option<String>,
    pub estimated_recipients: Option<i64>,
}

/// Partial campaign update. `None` leaves the column unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CampaignUpdate {
    pub status: Option<CampaignStatus>,
    pub processed_count: Option<i64>,
    pub success_count: Option<i64>,
    pub failed_count: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl CampaignUpdate {
    /// Whether the update would change nothing.
    pub fn is_empty(&self) -> bool {
        *self == CampaignUpdate::default()
    }
}

/// A stored delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MessageLog {
    pub id: i64,
    pub campaign_id: String,
    pub client_id: String,
    pub client_phone: String,
    pub template_id: String,
    #[sqlx(try_from = "String")]
    pub status: DeliveryStatus,
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
    pub waha_message_id: Option<String>,
}

/// Fields for appending a delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessageLog {
    pub campaign_id: String,
    pub client_id: String,
    pub client_phone: String,
    pub template_id: String,
    pub status: DeliveryStatus,
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
    pub waha_message_id: Option<String>,
}
