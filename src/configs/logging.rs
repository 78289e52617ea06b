use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: Option<String>,
    /// Extra `EnvFilter` directives appended after the level.
    pub filters: Option<String>,
}
