use crate::errors::ClusterError;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter, clock};
use serde_derive::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

pub type ApiRateLimiter = RateLimiter<NotKeyed, InMemoryState, clock::DefaultClock, NoOpMiddleware>;

/// Bounded polling used while waiting for remote resources to show up.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitSettings {
    pub max_attempts: usize,
    pub interval_in_ms: u64,
}

impl WaitSettings {
    pub fn new(max_attempts: usize, interval_in_ms: u64) -> Self {
        WaitSettings {
            max_attempts,
            interval_in_ms,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApiRateLimitSettings {
    pub reads_per_minute: u32,
    pub writes_per_minute: u32,
    #[serde(default = "default_admission_timeout_in_sec")]
    pub admission_timeout_in_sec: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AksHandlerSettings {
    pub subscription_id: String,
    pub location: String,
    pub resource_group: String,
    #[serde(default = "default_zone")]
    pub zone: String,
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    #[serde(default = "default_max_pods_per_node")]
    pub max_pods_per_node: i32,
    #[serde(default = "default_max_node_pools")]
    pub max_node_pools: usize,
    #[serde(default = "default_true")]
    pub cleanup_on_failure: bool,
    #[serde(default = "default_node_pool_wait")]
    pub node_pool_wait: WaitSettings,
    #[serde(default = "default_base_resource_wait")]
    pub base_resource_wait: WaitSettings,
    #[serde(default)]
    pub api_rate_limit: Option<ApiRateLimitSettings>,
}

fn default_zone() -> String {
    "1".to_string()
}

fn default_admin_username() -> String {
    "cb-user".to_string()
}

fn default_max_pods_per_node() -> i32 {
    110
}

fn default_max_node_pools() -> usize {
    100
}

fn default_true() -> bool {
    true
}

fn default_node_pool_wait() -> WaitSettings {
    WaitSettings::new(100, 4000)
}

fn default_base_resource_wait() -> WaitSettings {
    WaitSettings::new(240, 1000)
}

fn default_admission_timeout_in_sec() -> u64 {
    10 * 60
}

fn invalid_field(field_name: &str, message: &str) -> ClusterError {
    ClusterError::InvalidSettings {
        field_name: field_name.to_string(),
        message: message.to_string(),
    }
}

impl AksHandlerSettings {
    pub fn new(subscription_id: &str, location: &str, resource_group: &str) -> Self {
        AksHandlerSettings {
            subscription_id: subscription_id.to_string(),
            location: location.to_string(),
            resource_group: resource_group.to_string(),
            zone: default_zone(),
            admin_username: default_admin_username(),
            max_pods_per_node: default_max_pods_per_node(),
            max_node_pools: default_max_node_pools(),
            cleanup_on_failure: true,
            node_pool_wait: default_node_pool_wait(),
            base_resource_wait: default_base_resource_wait(),
            api_rate_limit: None,
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self, ClusterError> {
        let settings: AksHandlerSettings =
            serde_json::from_str(content).map_err(|e| invalid_field("<document>", &e.to_string()))?;
        settings.validate()?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ClusterError> {
        for (field_name, value) in [
            ("subscription_id", &self.subscription_id),
            ("location", &self.location),
            ("resource_group", &self.resource_group),
            ("admin_username", &self.admin_username),
        ] {
            if value.trim().is_empty() {
                return Err(invalid_field(field_name, "must not be empty"));
            }
        }

        if self.max_pods_per_node <= 0 {
            return Err(invalid_field("max_pods_per_node", "must be greater than 0"));
        }
        if self.max_node_pools == 0 {
            return Err(invalid_field("max_node_pools", "must be greater than 0"));
        }
        if self.node_pool_wait.max_attempts == 0 {
            return Err(invalid_field("node_pool_wait.max_attempts", "must be greater than 0"));
        }
        if self.base_resource_wait.max_attempts == 0 {
            return Err(invalid_field("base_resource_wait.max_attempts", "must be greater than 0"));
        }
        if let Some(limits) = &self.api_rate_limit {
            if limits.reads_per_minute == 0 {
                return Err(invalid_field("api_rate_limit.reads_per_minute", "must be greater than 0"));
            }
            if limits.writes_per_minute == 0 {
                return Err(invalid_field("api_rate_limit.writes_per_minute", "must be greater than 0"));
            }
        }

        Ok(())
    }

    /// Node resource group AKS creates for the cluster infrastructure.
    pub fn node_resource_group(&self, cluster_name: &str) -> String {
        format!("CB_{}_{}_{}", self.resource_group, cluster_name, self.location)
    }

    pub fn admission_timeout(&self) -> Duration {
        Duration::from_secs(
            self.api_rate_limit
                .map(|l| l.admission_timeout_in_sec)
                .unwrap_or_else(default_admission_timeout_in_sec),
        )
    }

    /// Read and write limiters, `None` when no rate limit is configured.
    pub fn rate_limiters(&self) -> Result<(Option<Arc<ApiRateLimiter>>, Option<Arc<ApiRateLimiter>>), ClusterError> {
        let limits = match &self.api_rate_limit {
            Some(limits) => limits,
            None => return Ok((None, None)),
        };

        let reads = NonZeroU32::new(limits.reads_per_minute)
            .ok_or_else(|| invalid_field("api_rate_limit.reads_per_minute", "must be greater than 0"))?;
        let writes = NonZeroU32::new(limits.writes_per_minute)
            .ok_or_else(|| invalid_field("api_rate_limit.writes_per_minute", "must be greater than 0"))?;

        Ok((
            Some(Arc::from(RateLimiter::direct(Quota::per_minute(reads)))),
            Some(Arc::from(RateLimiter::direct(Quota::per_minute(writes)))),
        ))
    }
}
