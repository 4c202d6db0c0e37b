//! Sheet Configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SheetError};

/// Payment sheet configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetConfig {
    /// Heading shown above the top section
    #[serde(default = "default_heading")]
    pub heading: String,

    /// Where remembered details are kept (None = in memory)
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Give up on collector readiness after this long (None = wait forever)
    #[serde(default)]
    pub ready_timeout_ms: Option<u64>,

    /// Buffered events per listener
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_heading() -> String { "Web Payment".into() }
fn default_event_capacity() -> usize { 32 }

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            heading: default_heading(),
            store_path: None,
            ready_timeout_ms: None,
            event_capacity: default_event_capacity(),
        }
    }
}

impl SheetConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(heading) = std::env::var("PAYMENT_SHEET_HEADING") {
            config.heading = heading;
        }
        if let Ok(path) = std::env::var("PAYMENT_SHEET_STORE") {
            config.store_path = (!path.is_empty()).then(|| PathBuf::from(path));
        }
        if let Ok(ms) = std::env::var("PAYMENT_SHEET_READY_TIMEOUT_MS") {
            let ms = ms.parse().map_err(|_| {
                SheetError::Config(format!("PAYMENT_SHEET_READY_TIMEOUT_MS is not a number: {}", ms))
            })?;
            config.ready_timeout_ms = Some(ms);
        }
        if let Ok(capacity) = std::env::var("PAYMENT_SHEET_EVENT_CAPACITY") {
            config.event_capacity = capacity.parse().map_err(|_| {
                SheetError::Config(format!("PAYMENT_SHEET_EVENT_CAPACITY is not a number: {}", capacity))
            })?;
        }

        Ok(config)
    }

    pub fn ready_timeout(&self) -> Option<Duration> {
        self.ready_timeout_ms.map(Duration::from_millis)
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SheetConfig::default();
        assert_eq!(config.heading, "Web Payment");
        assert_eq!(config.event_capacity, 32);
        assert!(config.ready_timeout().is_none());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: SheetConfig = serde_json::from_str(r#"{"ready_timeout_ms": 5}"#).unwrap();
        assert_eq!(config.ready_timeout(), Some(Duration::from_millis(5)));
        assert_eq!(config.heading, "Web Payment");
    }
}
