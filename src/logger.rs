use crate::errors::ClusterError;
use std::time::Duration;
use strum_macros::Display;
use tracing::{error, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum CallResourceType {
    #[strum(serialize = "CLUSTER")]
    Cluster,
    #[strum(serialize = "NODEGROUP")]
    NodeGroup,
}

/// Audit record of one public call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallLogInfo {
    pub cloud_os: String,
    pub region: String,
    pub resource_type: CallResourceType,
    pub resource_name: String,
    pub api_name: String,
}

impl CallLogInfo {
    pub fn new(region: &str, resource_type: CallResourceType, resource_name: &str, api_name: &str) -> Self {
        CallLogInfo {
            cloud_os: "AZURE".to_string(),
            region: region.to_string(),
            resource_type,
            resource_name: resource_name.to_string(),
            api_name: api_name.to_string(),
        }
    }
}

/// Side channel recording call outcomes. Must never change control flow.
pub trait CallLogger: Send + Sync {
    fn log_info(&self, call: &CallLogInfo, elapsed: Duration);
    fn log_error(&self, call: &CallLogInfo, error: &ClusterError);
    fn clone_dyn(&self) -> Box<dyn CallLogger>;
}

impl Clone for Box<dyn CallLogger> {
    fn clone(&self) -> Self {
        self.clone_dyn()
    }
}

#[derive(Clone)]
pub struct StdIoCallLogger {}

impl StdIoCallLogger {
    pub fn new() -> StdIoCallLogger {
        StdIoCallLogger {}
    }
}

impl Default for StdIoCallLogger {
    fn default() -> Self {
        StdIoCallLogger::new()
    }
}

impl CallLogger for StdIoCallLogger {
    fn log_info(&self, call: &CallLogInfo, elapsed: Duration) {
        tracing::span!(
            tracing::Level::INFO,
            "call_logger",
            cloud_os = call.cloud_os.as_str(),
            region = call.region.as_str(),
            resource_type = call.resource_type.to_string().as_str(),
            resource_name = call.resource_name.as_str(),
            api_name = call.api_name.as_str(),
        )
        .in_scope(|| {
            info!("{} succeeded in {} ms", call.api_name, elapsed.as_millis());
        });
    }

    fn log_error(&self, call: &CallLogInfo, error: &ClusterError) {
        tracing::span!(
            tracing::Level::INFO,
            "call_logger",
            cloud_os = call.cloud_os.as_str(),
            region = call.region.as_str(),
            resource_type = call.resource_type.to_string().as_str(),
            resource_name = call.resource_name.as_str(),
            api_name = call.api_name.as_str(),
        )
        .in_scope(|| {
            error!("{} failed ({}): {}", call.api_name, error.kind(), error);
        });
    }

    fn clone_dyn(&self) -> Box<dyn CallLogger> {
        Box::new(self.clone())
    }
}
