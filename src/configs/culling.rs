use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CullingConfig {
    /// Minutes between idle-culling cycles. Unset or non-positive means 5.
    #[serde(default)]
    pub span_minutes: Option<i64>,
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl CullingConfig {
    pub fn interval(&self) -> Duration {
        let minutes = match self.span_minutes {
            Some(m) if m > 0 => m as u64,
            _ => default_span_minutes(),
        };
        Duration::from_secs(minutes.min(MAX_SPAN_MINUTES).saturating_mul(60))
    }
}

impl Default for CullingConfig {
    fn default() -> Self {
        Self {
            span_minutes: None,
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

/// One year. Longer spans would overflow the timer's deadline.
const MAX_SPAN_MINUTES: u64 = 60 * 24 * 365;

fn default_span_minutes() -> u64 {
    5
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}
