//! Session configuration.
//!
//! Durations are expressed in milliseconds on the wire. Missing fields take
//! their defaults, so `{}` is a valid configuration.
//!
//! ```ignore
//! let config = SyncConfig::from_json(r#"{ "cooldown_ms": 500, "poll_interval_ms": 10000 }"#)?;
//! let config = SyncConfig::default().with_cooldown(Duration::from_millis(250));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// How long a key absorbs new intents after it settles.
    #[serde(rename = "cooldown_ms", with = "millis")]
    pub cooldown: Duration,
    /// Interval between background refreshes.
    #[serde(rename = "poll_interval_ms", with = "millis")]
    pub poll_interval: Duration,
    /// Poll even while a mutation is in flight.
    pub poll_while_pending: bool,
    /// Refetch everything after the server reports a missing entity.
    pub refetch_on_conflict: bool,
    /// Panic on internal invariant violations instead of self-healing.
    pub strict_invariants: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_millis(1000),
            poll_interval: Duration::from_secs(30),
            poll_while_pending: true,
            refetch_on_conflict: true,
            strict_invariants: cfg!(debug_assertions),
        }
    }
}

impl SyncConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SyncConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(SyncError::Config("poll_interval_ms must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_poll_while_pending(mut self, enabled: bool) -> Self {
        self.poll_while_pending = enabled;
        self
    }

    pub fn with_refetch_on_conflict(mut self, enabled: bool) -> Self {
        self.refetch_on_conflict = enabled;
        self
    }

    pub fn with_strict_invariants(mut self, strict: bool) -> Self {
        self.strict_invariants = strict;
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
