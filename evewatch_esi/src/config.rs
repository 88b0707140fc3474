use std::time::Duration;

use crate::{
    errors::{EsiError, EsiResult},
    request::Language,
};

pub const DEFAULT_BASE_URL: &str = "https://esi.evetech.net";
pub const DEFAULT_USER_AGENT: &str = "evewatch/0.1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EsiConfig {
    pub user_agent: String,
    /// Scheme plus host of the ESI cluster. Production is HTTPS; tests
    /// point this at a local fixture server.
    pub base_url: String,
    pub language: Language,
    pub timeout: Duration,
}

impl Default for EsiConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            language: Language::English,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl EsiConfig {
    pub fn validate(&self) -> EsiResult<()> {
        if self.user_agent.trim().is_empty() {
            return Err(EsiError::InvalidConfig("user_agent must be set"));
        }
        if self.base_url.trim().is_empty() {
            return Err(EsiError::InvalidConfig("base_url must be set"));
        }
        if self.timeout.is_zero() {
            return Err(EsiError::InvalidConfig("timeout must be positive"));
        }
        Ok(())
    }
}
