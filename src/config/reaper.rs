//! Incidental resource reaper configuration

use crate::poll::{PolicyError, RetryPolicy};
use crate::reaper::GroupNamingConvention;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReaperConfig {
    pub enabled: bool,
    /// Attempts per group while deletes report the resource in use
    pub max_attempts: u32,
    pub retry_interval_ms: u64,
    pub max_concurrent_groups: usize,
    /// Leading segment of generated resource names
    pub name_prefix: String,
    pub delimiter: char,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            retry_interval_ms: 1000,
            max_concurrent_groups: 4,
            name_prefix: "stratus".to_string(),
            delimiter: '#',
        }
    }
}

impl ReaperConfig {
    pub fn retry_policy(&self) -> Result<RetryPolicy, PolicyError> {
        RetryPolicy::attempts(self.max_attempts, Duration::from_millis(self.retry_interval_ms))
    }

    pub fn naming(&self) -> GroupNamingConvention {
        GroupNamingConvention::new(&self.name_prefix, self.delimiter)
    }
}
