//! Worker pool sizing

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Upper bound on concurrent node operations such as parallel destroys
    pub user_threads: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { user_threads: 8 }
    }
}
