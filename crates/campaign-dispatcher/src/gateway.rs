//! Messaging gateway seam.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use waha_client::{WahaClient, WahaConfig};

pub use waha_client::SendOutcome;

use crate::config::GatewaySettings;
use crate::error::DispatchError;

/// Sends one text message and reports the normalized outcome.
///
/// Implementations must not fail past this boundary: every failure is a
/// [`SendOutcome::Failed`].
#[async_trait]
pub trait MessageGateway: Send + Sync {
    async fn send_text(&self, phone: &str, text: &str) -> SendOutcome;
}

#[async_trait]
impl MessageGateway for WahaClient {
    async fn send_text(&self, phone: &str, text: &str) -> SendOutcome {
        WahaClient::send_text(self, phone, text).await
    }
}

/// Builds a gateway from the configuration snapshot of a run.
pub trait GatewayConnector: Send + Sync {
    fn connect(
        &self,
        settings: &GatewaySettings,
        session: &str,
    ) -> Result<Arc<dyn MessageGateway>, DispatchError>;
}

/// Connects to a WAHA gateway over HTTP.
#[derive(Debug, Clone, Default)]
pub struct WahaConnector;

impl GatewayConnector for WahaConnector {
    fn connect(
        &self,
        settings: &GatewaySettings,
        session: &str,
    ) -> Result<Arc<dyn MessageGateway>, DispatchError> {
        let config = WahaConfig::new(settings.api_url.clone())
            .with_api_key(settings.api_key.clone())
            .with_session(session);
        debug!(?config, "Building WAHA client");

        let client =
            WahaClient::new(config).map_err(|e| DispatchError::Configuration(e.to_string()))?;
        Ok(Arc::new(client))
    }
}
