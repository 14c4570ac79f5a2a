//! Operational notices to clinic admins over WhatsApp.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::gateway::{MessageGateway, SendOutcome};

/// An operational event worth telling admins about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Started {
        campaign: String,
        estimated_recipients: Option<u64>,
    },
    Progress {
        campaign: String,
        succeeded: i64,
        failed: i64,
    },
    Completed {
        campaign: String,
        succeeded: i64,
        failed: i64,
        skipped: u64,
    },
    Failed {
        campaign: String,
        error: String,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Started {
                campaign,
                estimated_recipients: Some(n),
            } => write!(f, "Campaign \"{}\" started for ~{} recipients.", campaign, n),
            Notice::Started { campaign, .. } => write!(f, "Campaign \"{}\" started.", campaign),
            Notice::Progress {
                campaign,
                succeeded,
                failed,
            } => write!(
                f,
                "Campaign \"{}\" progress: {} sent, {} failed.",
                campaign, succeeded, failed
            ),
            Notice::Completed {
                campaign,
                succeeded,
                failed,
                skipped,
            } => write!(
                f,
                "Campaign \"{}\" completed: {} sent, {} failed, {} already contacted.",
                campaign, succeeded, failed, skipped
            ),
            Notice::Failed { campaign, error } => {
                write!(f, "Campaign \"{}\" failed: {}", campaign, error)
            }
        }
    }
}

/// Broadcasts notices to every configured admin phone.
#[derive(Clone)]
pub struct AdminNotifier {
    gateway: Arc<dyn MessageGateway>,
    admins: Vec<String>,
}

impl AdminNotifier {
    pub fn new(gateway: Arc<dyn MessageGateway>, admins: Vec<String>) -> Self {
        Self { gateway, admins }
    }

    /// Send `notice` to every admin. Failures are logged per admin and never
    /// stop the remaining sends. Returns how many admins were reached.
    pub async fn notify(&self, notice: &Notice) -> usize {
        if self.admins.is_empty() {
            return 0;
        }

        let text = notice.to_string();
        let mut delivered = 0;
        for admin in &self.admins {
            match self.gateway.send_text(admin, &text).await {
                SendOutcome::Sent { .. } => {
                    delivered += 1;
                    debug!(admin = %admin, "Admin notified");
                }
                SendOutcome::Failed { error } => {
                    warn!(admin = %admin, error = %error, "Admin notification failed");
                }
            }
        }
        delivered
    }
}
