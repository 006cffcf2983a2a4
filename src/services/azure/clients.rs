use crate::services::azure::sdk_types::{
    AgentPool, ManagedCluster, SecurityGroup, SecurityRule, SshPublicKeyResource, VirtualMachineScaleSet,
    VirtualMachineScaleSetVm, VirtualMachineSize, VirtualNetwork,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Clone, Error, Debug, PartialEq, Eq)]
pub enum SdkError {
    #[error("Resource `{resource}` not found")]
    NotFound { resource: String },
    #[error("Conflict on resource `{resource}`: {raw_error_message:?}")]
    Conflict {
        resource: String,
        raw_error_message: String,
    },
    #[error("Request throttled by the management API")]
    Throttled,
    #[error("Request failed: {raw_error_message:?}")]
    Failed { raw_error_message: String },
}

/// Managed Kubernetes service. Mutating calls resolve once the long running operation is done.
#[async_trait]
pub trait ManagedClustersClient: Send + Sync {
    async fn list_kubernetes_versions(&self, location: &str) -> Result<Vec<String>, SdkError>;
    async fn get(&self, resource_group: &str, cluster_name: &str) -> Result<ManagedCluster, SdkError>;
    async fn list_by_resource_group(&self, resource_group: &str) -> Result<Vec<ManagedCluster>, SdkError>;
    async fn create_or_update(
        &self,
        resource_group: &str,
        cluster_name: &str,
        cluster: ManagedCluster,
    ) -> Result<ManagedCluster, SdkError>;
    async fn delete(&self, resource_group: &str, cluster_name: &str) -> Result<(), SdkError>;
    /// Raw kubeconfig of the given access role.
    async fn get_access_profile(
        &self,
        resource_group: &str,
        cluster_name: &str,
        role_name: &str,
    ) -> Result<Vec<u8>, SdkError>;
}

#[async_trait]
pub trait AgentPoolsClient: Send + Sync {
    async fn get(&self, resource_group: &str, cluster_name: &str, pool_name: &str) -> Result<AgentPool, SdkError>;
    async fn list(&self, resource_group: &str, cluster_name: &str) -> Result<Vec<AgentPool>, SdkError>;
    async fn create_or_update(
        &self,
        resource_group: &str,
        cluster_name: &str,
        pool_name: &str,
        pool: AgentPool,
    ) -> Result<AgentPool, SdkError>;
    async fn delete(&self, resource_group: &str, cluster_name: &str, pool_name: &str) -> Result<(), SdkError>;
}

#[async_trait]
pub trait VirtualNetworksClient: Send + Sync {
    async fn get(&self, resource_group: &str, vnet_name: &str) -> Result<VirtualNetwork, SdkError>;
    async fn list(&self, resource_group: &str) -> Result<Vec<VirtualNetwork>, SdkError>;
}

#[async_trait]
pub trait VirtualMachineScaleSetsClient: Send + Sync {
    async fn list(&self, resource_group: &str) -> Result<Vec<VirtualMachineScaleSet>, SdkError>;
    async fn list_vms(
        &self,
        resource_group: &str,
        scale_set_name: &str,
    ) -> Result<Vec<VirtualMachineScaleSetVm>, SdkError>;
}

#[async_trait]
pub trait VirtualMachineSizesClient: Send + Sync {
    async fn list(&self, location: &str) -> Result<Vec<VirtualMachineSize>, SdkError>;
}

#[async_trait]
pub trait SecurityGroupsClient: Send + Sync {
    async fn get(&self, resource_group: &str, security_group_name: &str) -> Result<SecurityGroup, SdkError>;
    async fn list(&self, resource_group: &str) -> Result<Vec<SecurityGroup>, SdkError>;
}

#[async_trait]
pub trait SecurityRulesClient: Send + Sync {
    async fn create_or_update(
        &self,
        resource_group: &str,
        security_group_name: &str,
        rule_name: &str,
        rule: SecurityRule,
    ) -> Result<SecurityRule, SdkError>;
}

#[async_trait]
pub trait SshPublicKeysClient: Send + Sync {
    async fn get(&self, resource_group: &str, key_name: &str) -> Result<SshPublicKeyResource, SdkError>;
    async fn list(&self, resource_group: &str) -> Result<Vec<SshPublicKeyResource>, SdkError>;
}

/// Every management client the AKS handler talks to.
#[derive(Clone)]
pub struct AzureClients {
    pub managed_clusters: Arc<dyn ManagedClustersClient>,
    pub agent_pools: Arc<dyn AgentPoolsClient>,
    pub virtual_networks: Arc<dyn VirtualNetworksClient>,
    pub scale_sets: Arc<dyn VirtualMachineScaleSetsClient>,
    pub vm_sizes: Arc<dyn VirtualMachineSizesClient>,
    pub security_groups: Arc<dyn SecurityGroupsClient>,
    pub security_rules: Arc<dyn SecurityRulesClient>,
    pub ssh_public_keys: Arc<dyn SshPublicKeysClient>,
}
