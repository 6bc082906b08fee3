use serde::{Deserialize, Serialize};

/// Tunables for the lifecycle engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest accepted chunk payload in bytes. `None` accepts any size.
    pub max_chunk_bytes: Option<usize>,
}

impl EngineConfig {
    pub fn with_max_chunk_bytes(max: usize) -> Self {
        Self {
            max_chunk_bytes: Some(max),
        }
    }
}
