//! Agent configuration.

use parley_stanza::{ParleyError, Result};
use std::time::Duration;

/// Tunables of the presence manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentConfig {
    /// Upper bound on waiting for the reply to a `subscribe`. The outcome
    /// of that send is not checked either way.
    pub subscribe_reply_wait_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            subscribe_reply_wait_ms: 1000,
        }
    }
}

impl AgentConfig {
    /// Defaults overridden by `PARLEY_SUBSCRIBE_WAIT_MS`.
    pub fn from_env() -> Result<Self> {
        let mut config = AgentConfig::default();
        if let Some(ms) = env_parse("PARLEY_SUBSCRIBE_WAIT_MS")? {
            config.subscribe_reply_wait_ms = ms;
        }
        Ok(config)
    }

    #[inline]
    #[must_use]
    pub fn subscribe_reply_wait(&self) -> Duration {
        Duration::from_millis(self.subscribe_reply_wait_ms)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ParleyError::Config(format!("{key}={raw:?} is not a valid value"))),
        Err(_) => Ok(None),
    }
}
