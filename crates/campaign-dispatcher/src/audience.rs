//! Audience resolution.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{DispatchError, StoreError};
use crate::model::{AudienceFilter, Recipient};
use crate::store::ClientStore;

/// Upper bound on recipients per run.
pub const MAX_AUDIENCE: usize = 5_000;

/// Resolves filter criteria into a bounded list of recipients.
#[derive(Clone)]
pub struct AudienceResolver {
    clients: Arc<dyn ClientStore>,
    limit: usize,
}

impl AudienceResolver {
    /// Create a resolver capped at [`MAX_AUDIENCE`].
    pub fn new(clients: Arc<dyn ClientStore>) -> Self {
        Self {
            clients,
            limit: MAX_AUDIENCE,
        }
    }

    /// Override the cap.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Resolve the audience. No filters means every reachable client.
    pub async fn resolve(&self, filters: &[AudienceFilter]) -> Result<Vec<Recipient>, DispatchError> {
        let mut recipients = self
            .clients
            .list_clients(filters, self.limit)
            .await
            .map_err(DispatchError::AudienceResolution)?;

        // Stores are asked for `limit`; trim in case one ignores it.
        recipients.truncate(self.limit);

        info!(
            filters = filters.len(),
            recipients = recipients.len(),
            "Audience resolved"
        );
        Ok(recipients)
    }

    /// Size of the audience before the cap, for notices.
    pub async fn estimate(&self, filters: &[AudienceFilter]) -> Result<u64, StoreError> {
        let count = self.clients.count_clients(filters).await?;
        debug!(count, "Audience estimate");
        Ok(count)
    }
}
