//! Configuration types for waha-client.

/// Session name used when none is given.
pub const DEFAULT_SESSION: &str = "default";

/// Configuration for connecting to a WAHA gateway.
#[derive(Clone)]
pub struct WahaConfig {
    /// Base URL of the gateway API (e.g., "http://localhost:3000/api").
    pub base_url: String,
    /// Value for the `X-Api-Key` header, if the gateway requires one.
    pub api_key: Option<String>,
    /// WhatsApp session to send from.
    pub session: String,
}

impl WahaConfig {
    /// Create a new configuration with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            session: DEFAULT_SESSION.to_string(),
        }
    }

    /// Set the API key. Blank keys are treated as absent.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key = api_key.into();
        self.api_key = if key.trim().is_empty() { None } else { Some(key) };
        self
    }

    /// Set the session name. Blank names keep the default session.
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        let session = session.into();
        if !session.trim().is_empty() {
            self.session = session;
        }
        self
    }

    /// Get the send-text endpoint URL.
    pub fn send_text_url(&self) -> String {
        format!("{}/sendText", self.base_url.trim_end_matches('/'))
    }
}

impl std::fmt::Debug for WahaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WahaConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("session", &self.session)
            .finish()
    }
}
