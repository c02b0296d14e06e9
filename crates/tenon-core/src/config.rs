//! Tunables for a [`CommandManager`](crate::CommandManager).

use serde::{Deserialize, Serialize};

/// Default number of retained parse plans.
pub const DEFAULT_PLAN_CACHE_CAPACITY: usize = 256;

/// Manager configuration. Usually embedded in a host application's config
/// file under a `[manager]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Maximum number of cached plans. Zero disables plan retention.
    pub plan_cache_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            plan_cache_capacity: DEFAULT_PLAN_CACHE_CAPACITY,
        }
    }
}
