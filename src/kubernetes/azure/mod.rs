use crate::errors::ClusterError;
use crate::io_models::settings::{AksHandlerSettings, ApiRateLimiter, WaitSettings};
use crate::io_models::{ClusterSpec, Iid, NodeGroupSpec};
use crate::kubernetes::ClusterHandler;
use crate::logger::{CallLogInfo, CallLogger, CallResourceType};
use crate::models::{Cluster, NodeGroup};
use crate::runtime::block_on;
use crate::services::azure::clients::{AzureClients, SdkError};
use crate::services::azure::resource_id::{self, ResourceKind};
use crate::services::azure::sdk_types::ManagedCluster;
use retry::OperationResult;
use retry::delay::Fixed;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

pub mod assembler;
pub mod network;
pub mod node_group;
pub mod provisioning;
pub mod validation;

pub const OWNER_CLUSTER_TAG_KEY: &str = "ownerCluster";
pub const SCALE_SET_OWNER_TAG_KEY: &str = "aks-managed-poolName";
pub const SSH_KEY_TAG_KEY: &str = "sshkey";
pub const CREATED_AT_TAG_KEY: &str = "createdAt";
pub const CLUSTER_ADMIN_ROLE: &str = "clusterAdmin";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ApiCallKind {
    Read,
    Write,
}

/// AKS implementation of [`ClusterHandler`].
pub struct AksClusterHandler {
    settings: AksHandlerSettings,
    clients: AzureClients,
    call_logger: Box<dyn CallLogger>,
    read_rate_limiter: Option<Arc<ApiRateLimiter>>,
    write_rate_limiter: Option<Arc<ApiRateLimiter>>,
}

impl AksClusterHandler {
    pub fn new(
        settings: AksHandlerSettings,
        clients: AzureClients,
        call_logger: Box<dyn CallLogger>,
    ) -> Result<Self, ClusterError> {
        settings.validate()?;
        let (read_rate_limiter, write_rate_limiter) = settings.rate_limiters()?;

        Ok(AksClusterHandler {
            settings,
            clients,
            call_logger,
            read_rate_limiter,
            write_rate_limiter,
        })
    }

    pub fn settings(&self) -> &AksHandlerSettings {
        &self.settings
    }

    fn wait_for_a_slot_in_admission_control(&self, call_kind: ApiCallKind) -> Result<(), ClusterError> {
        if let Some(rate_limiter) = match call_kind {
            ApiCallKind::Read => &self.read_rate_limiter,
            ApiCallKind::Write => &self.write_rate_limiter,
        } {
            let timeout = self.settings.admission_timeout();
            let start = Instant::now();

            loop {
                if start.elapsed() > timeout {
                    return Err(ClusterError::AdmissionControlCannotProceedAfterSeveralTries);
                }

                if rate_limiter.check().is_err() {
                    std::thread::sleep(Duration::from_secs(3));
                    continue;
                }

                break;
            }
        }

        Ok(())
    }

    fn call<T>(
        &self,
        call_kind: ApiCallKind,
        operation: &str,
        future: impl Future<Output = Result<T, SdkError>>,
    ) -> Result<Option<T>, ClusterError> {
        self.wait_for_a_slot_in_admission_control(call_kind)?;
        debug!("calling `{}`", operation);

        match block_on(future) {
            Ok(value) => Ok(Some(value)),
            Err(SdkError::NotFound { .. }) => Ok(None),
            Err(e) => Err(ClusterError::remote(operation, e)),
        }
    }

    /// Read call where a missing resource is an expected answer.
    fn read_optional<T>(
        &self,
        operation: &str,
        future: impl Future<Output = Result<T, SdkError>>,
    ) -> Result<Option<T>, ClusterError> {
        self.call(ApiCallKind::Read, operation, future)
    }

    fn read<T>(&self, operation: &str, future: impl Future<Output = Result<T, SdkError>>) -> Result<T, ClusterError> {
        self.read_optional(operation, future)?.ok_or_else(|| ClusterError::RemoteOperation {
            operation: operation.to_string(),
            raw_error_message: "resource not found".to_string(),
        })
    }

    fn write<T>(&self, operation: &str, future: impl Future<Output = Result<T, SdkError>>) -> Result<T, ClusterError> {
        self.call(ApiCallKind::Write, operation, future)?
            .ok_or_else(|| ClusterError::RemoteOperation {
                operation: operation.to_string(),
                raw_error_message: "resource not found".to_string(),
            })
    }

    /// Polls `probe` until it yields a value. Remote failures are retried, anything else aborts.
    fn wait_for<T>(
        &self,
        wait: WaitSettings,
        resource: &str,
        mut probe: impl FnMut() -> Result<Option<T>, ClusterError>,
    ) -> Result<T, ClusterError> {
        let timeout = || ClusterError::WaitTimeout {
            resource: resource.to_string(),
        };

        let result = retry::retry(
            Fixed::from_millis(wait.interval_in_ms).take(wait.max_attempts.saturating_sub(1)),
            || match probe() {
                Ok(Some(value)) => OperationResult::Ok(value),
                Ok(None) => OperationResult::Retry(timeout()),
                Err(e) if e.kind() == crate::errors::ErrorKind::RemoteOperation => OperationResult::Retry(e),
                Err(e) => OperationResult::Err(e),
            },
        );

        match result {
            Ok(value) => Ok(value),
            Err(retry::Error { error, tries, .. }) => match error {
                ClusterError::WaitTimeout { .. } | ClusterError::RemoteOperation { .. } => {
                    error!("gave up waiting for {} after {} tries, last error: {}", resource, tries, error);
                    Err(timeout())
                }
                other => Err(other),
            },
        }
    }

    /// Resource group and name of a cluster IID; a system id carries its own resource group.
    fn cluster_address(&self, cluster_iid: &Iid) -> Result<(String, String), ClusterError> {
        let name = cluster_iid.resolve_name(ResourceKind::ManagedCluster)?;
        let resource_group = match cluster_iid.system_id.is_empty() {
            true => self.settings.resource_group.to_string(),
            false => resource_id::resource_group(&cluster_iid.system_id)?,
        };

        Ok((resource_group, name))
    }

    fn raw_cluster(&self, cluster_iid: &Iid) -> Result<ManagedCluster, ClusterError> {
        let (resource_group, name) = self.cluster_address(cluster_iid)?;

        self.read_optional(
            "managed_clusters.get",
            self.clients.managed_clusters.get(&resource_group, &name),
        )?
        .ok_or(ClusterError::ClusterNotFound { cluster: name })
    }

    fn check_kubernetes_version(&self, version: &str) -> Result<(), ClusterError> {
        let available = self.read(
            "managed_clusters.list_kubernetes_versions",
            self.clients
                .managed_clusters
                .list_kubernetes_versions(&self.settings.location),
        )?;

        if !available.iter().any(|v| v == version) {
            return Err(ClusterError::UnsupportedKubernetesVersion {
                version: version.to_string(),
                available,
            });
        }

        Ok(())
    }

    /// Runs one public operation and records its outcome in the call log.
    fn logged<T>(
        &self,
        resource_type: CallResourceType,
        resource_name: &str,
        api_name: &str,
        operation: impl FnOnce() -> Result<T, ClusterError>,
    ) -> Result<T, ClusterError> {
        let call = CallLogInfo::new(&self.settings.location, resource_type, resource_name, api_name);
        let start = Instant::now();

        let result = operation();
        match &result {
            Ok(_) => self.call_logger.log_info(&call, start.elapsed()),
            Err(e) => {
                error!("{} `{}` failed: {}", api_name, resource_name, e);
                self.call_logger.log_error(&call, e);
            }
        }

        result
    }
}

impl ClusterHandler for AksClusterHandler {
    fn create_cluster(&self, cluster_spec: ClusterSpec) -> Result<Cluster, ClusterError> {
        let cluster_name = cluster_spec.iid.name_id.to_string();
        self.logged(CallResourceType::Cluster, &cluster_name, "CreateCluster()", || {
            self.provision_cluster(&cluster_spec)
        })
    }

    fn list_cluster(&self) -> Result<Vec<Cluster>, ClusterError> {
        self.logged(CallResourceType::Cluster, "", "ListCluster()", || {
            let clusters = self.read(
                "managed_clusters.list_by_resource_group",
                self.clients
                    .managed_clusters
                    .list_by_resource_group(&self.settings.resource_group),
            )?;
            info!("{} cluster(s) found in `{}`", clusters.len(), self.settings.resource_group);

            clusters.iter().map(|c| self.assemble_cluster(c)).collect()
        })
    }

    fn get_cluster(&self, cluster_iid: &Iid) -> Result<Cluster, ClusterError> {
        self.logged(CallResourceType::Cluster, &cluster_iid.to_string(), "GetCluster()", || {
            let cluster = self.raw_cluster(cluster_iid)?;
            self.assemble_cluster(&cluster)
        })
    }

    fn delete_cluster(&self, cluster_iid: &Iid) -> Result<(), ClusterError> {
        self.logged(CallResourceType::Cluster, &cluster_iid.to_string(), "DeleteCluster()", || {
            let (resource_group, name) = self.cluster_address(cluster_iid)?;
            self.call(
                ApiCallKind::Write,
                "managed_clusters.delete",
                self.clients.managed_clusters.delete(&resource_group, &name),
            )?
            .ok_or(ClusterError::ClusterNotFound { cluster: name })
        })
    }

    fn add_node_group(&self, cluster_iid: &Iid, node_group_spec: NodeGroupSpec) -> Result<NodeGroup, ClusterError> {
        let node_group_name = node_group_spec.iid.name_id.to_string();
        self.logged(CallResourceType::NodeGroup, &node_group_name, "AddNodeGroup()", || {
            self.add_node_pool(cluster_iid, &node_group_spec)
        })
    }

    fn set_node_group_auto_scaling(
        &self,
        cluster_iid: &Iid,
        node_group_iid: &Iid,
        on: bool,
    ) -> Result<NodeGroup, ClusterError> {
        self.logged(
            CallResourceType::NodeGroup,
            &node_group_iid.to_string(),
            "SetNodeGroupAutoScaling()",
            || self.toggle_node_pool_auto_scaling(cluster_iid, node_group_iid, on),
        )
    }

    fn change_node_group_scaling(
        &self,
        cluster_iid: &Iid,
        node_group_iid: &Iid,
        desired_node_size: i32,
        min_node_size: i32,
        max_node_size: i32,
    ) -> Result<NodeGroup, ClusterError> {
        self.logged(
            CallResourceType::NodeGroup,
            &node_group_iid.to_string(),
            "ChangeNodeGroupScaling()",
            || self.resize_node_pool(cluster_iid, node_group_iid, desired_node_size, min_node_size, max_node_size),
        )
    }

    fn remove_node_group(&self, cluster_iid: &Iid, node_group_iid: &Iid) -> Result<(), ClusterError> {
        self.logged(
            CallResourceType::NodeGroup,
            &node_group_iid.to_string(),
            "RemoveNodeGroup()",
            || self.remove_node_pool(cluster_iid, node_group_iid),
        )
    }

    fn upgrade_cluster(&self, cluster_iid: &Iid, new_version: &str) -> Result<Cluster, ClusterError> {
        self.logged(CallResourceType::Cluster, &cluster_iid.to_string(), "UpgradeCluster()", || {
            self.upgrade(cluster_iid, new_version)
        })
    }
}
