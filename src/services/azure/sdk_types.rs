//! Subset of the ARM resource model used by the AKS handler.
//! Every field is optional as the management API may omit any of them.

use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;

pub type Tags = HashMap<String, String>;

pub const PROVISIONING_STATE_SUCCEEDED: &str = "Succeeded";
pub const POWER_STATE_RUNNING: &str = "Running";
pub const NETWORK_PLUGIN_AZURE: &str = "azure";
pub const NETWORK_PLUGIN_KUBENET: &str = "kubenet";
pub const SECURITY_RULE_DIRECTION_INBOUND: &str = "Inbound";
pub const SECURITY_RULE_DIRECTION_OUTBOUND: &str = "Outbound";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SubResource {
    pub id: Option<String>,
}

// Container service

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagedCluster {
    pub id: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub tags: Option<Tags>,
    pub sku: Option<ManagedClusterSku>,
    pub identity: Option<ManagedClusterIdentity>,
    pub properties: Option<ManagedClusterProperties>,
}

impl ManagedCluster {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.as_ref().and_then(|t| t.get(key)).map(|v| v.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagedClusterSku {
    pub name: Option<String>,
    pub tier: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagedClusterIdentity {
    #[serde(rename = "type")]
    pub identity_type: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagedClusterProperties {
    pub kubernetes_version: Option<String>,
    #[serde(rename = "enableRBAC")]
    pub enable_rbac: Option<bool>,
    pub dns_prefix: Option<String>,
    pub fqdn: Option<String>,
    pub node_resource_group: Option<String>,
    pub provisioning_state: Option<String>,
    pub power_state: Option<PowerState>,
    pub agent_pool_profiles: Option<Vec<ManagedClusterAgentPoolProfile>>,
    pub network_profile: Option<NetworkProfile>,
    pub linux_profile: Option<LinuxProfile>,
    pub addon_profiles: Option<HashMap<String, ManagedClusterAddonProfile>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PowerState {
    pub code: Option<String>,
}

/// Agent pool settings, shared by cluster profiles and standalone agent pools.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentPoolProperties {
    pub count: Option<i32>,
    pub min_count: Option<i32>,
    pub max_count: Option<i32>,
    pub enable_auto_scaling: Option<bool>,
    pub vm_size: Option<String>,
    #[serde(rename = "osDiskSizeGB")]
    pub os_disk_size_gb: Option<i32>,
    pub os_type: Option<String>,
    #[serde(rename = "type")]
    pub pool_type: Option<String>,
    pub mode: Option<String>,
    pub max_pods: Option<i32>,
    pub availability_zones: Option<Vec<String>>,
    #[serde(rename = "enableNodePublicIP")]
    pub enable_node_public_ip: Option<bool>,
    #[serde(rename = "vnetSubnetID")]
    pub vnet_subnet_id: Option<String>,
    pub orchestrator_version: Option<String>,
    pub provisioning_state: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagedClusterAgentPoolProfile {
    pub name: Option<String>,
    #[serde(flatten)]
    pub properties: AgentPoolProperties,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentPool {
    pub id: Option<String>,
    pub name: Option<String>,
    pub properties: Option<AgentPoolProperties>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkProfile {
    pub network_plugin: Option<String>,
    pub network_policy: Option<String>,
    pub service_cidr: Option<String>,
    #[serde(rename = "dnsServiceIP")]
    pub dns_service_ip: Option<String>,
    pub docker_bridge_cidr: Option<String>,
    pub load_balancer_sku: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct LinuxProfile {
    pub admin_username: Option<String>,
    pub ssh: Option<SshConfiguration>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SshConfiguration {
    pub public_keys: Option<Vec<SshPublicKey>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SshPublicKey {
    pub key_data: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagedClusterAddonProfile {
    pub enabled: Option<bool>,
    pub config: Option<HashMap<String, String>>,
}

// Network

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct VirtualNetwork {
    pub id: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub properties: Option<VirtualNetworkProperties>,
}

impl VirtualNetwork {
    pub fn subnets(&self) -> &[Subnet] {
        self.properties
            .as_ref()
            .and_then(|p| p.subnets.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct VirtualNetworkProperties {
    pub address_space: Option<AddressSpace>,
    pub subnets: Option<Vec<Subnet>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressSpace {
    pub address_prefixes: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Subnet {
    pub id: Option<String>,
    pub name: Option<String>,
    pub properties: Option<SubnetProperties>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SubnetProperties {
    pub address_prefix: Option<String>,
    pub ip_configurations: Option<Vec<SubResource>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityGroup {
    pub id: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub tags: Option<Tags>,
    pub properties: Option<SecurityGroupProperties>,
}

impl SecurityGroup {
    pub fn rules(&self) -> &[SecurityRule] {
        self.properties
            .as_ref()
            .and_then(|p| p.security_rules.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityGroupProperties {
    pub security_rules: Option<Vec<SecurityRule>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityRule {
    pub id: Option<String>,
    pub name: Option<String>,
    pub properties: Option<SecurityRuleProperties>,
}

impl SecurityRule {
    pub fn direction(&self) -> Option<&str> {
        self.properties.as_ref().and_then(|p| p.direction.as_deref())
    }

    pub fn priority(&self) -> Option<i32> {
        self.properties.as_ref().and_then(|p| p.priority)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityRuleProperties {
    pub description: Option<String>,
    pub protocol: Option<String>,
    pub source_port_range: Option<String>,
    pub destination_port_range: Option<String>,
    pub source_address_prefix: Option<String>,
    pub destination_address_prefix: Option<String>,
    pub access: Option<String>,
    pub priority: Option<i32>,
    pub direction: Option<String>,
}

// Compute

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct VirtualMachineScaleSet {
    pub id: Option<String>,
    pub name: Option<String>,
    pub tags: Option<Tags>,
    pub sku: Option<ScaleSetSku>,
    pub properties: Option<VirtualMachineScaleSetProperties>,
}

impl VirtualMachineScaleSet {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.as_ref().and_then(|t| t.get(key)).map(|v| v.as_str())
    }

    pub fn provisioning_state(&self) -> Option<&str> {
        self.properties.as_ref().and_then(|p| p.provisioning_state.as_deref())
    }

    pub fn storage_profile(&self) -> Option<&StorageProfile> {
        self.properties
            .as_ref()
            .and_then(|p| p.virtual_machine_profile.as_ref())
            .and_then(|p| p.storage_profile.as_ref())
    }

    /// Security group attached to the primary NIC configuration.
    pub fn primary_security_group_id(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.virtual_machine_profile.as_ref())
            .and_then(|p| p.network_profile.as_ref())
            .and_then(|p| p.network_interface_configurations.as_ref())
            .and_then(|configurations| {
                configurations
                    .iter()
                    .filter_map(|c| c.properties.as_ref())
                    .find(|p| p.primary.unwrap_or(false))
            })
            .and_then(|p| p.network_security_group.as_ref())
            .and_then(|sg| sg.id.as_deref())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScaleSetSku {
    pub name: Option<String>,
    pub capacity: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct VirtualMachineScaleSetProperties {
    pub provisioning_state: Option<String>,
    pub virtual_machine_profile: Option<VirtualMachineScaleSetVmProfile>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct VirtualMachineScaleSetVmProfile {
    pub storage_profile: Option<StorageProfile>,
    pub network_profile: Option<ScaleSetNetworkProfile>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageProfile {
    pub image_reference: Option<ImageReference>,
    pub os_disk: Option<OsDisk>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageReference {
    pub id: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct OsDisk {
    #[serde(rename = "diskSizeGB")]
    pub disk_size_gb: Option<i32>,
    pub managed_disk: Option<ManagedDiskParameters>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagedDiskParameters {
    pub storage_account_type: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScaleSetNetworkProfile {
    pub network_interface_configurations: Option<Vec<NetworkInterfaceConfiguration>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkInterfaceConfiguration {
    pub name: Option<String>,
    pub properties: Option<NetworkInterfaceConfigurationProperties>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkInterfaceConfigurationProperties {
    pub primary: Option<bool>,
    pub network_security_group: Option<SubResource>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct VirtualMachineScaleSetVm {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct VirtualMachineSize {
    pub name: Option<String>,
    pub number_of_cores: Option<i32>,
    #[serde(rename = "memoryInMB")]
    pub memory_in_mb: Option<i32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SshPublicKeyResource {
    pub id: Option<String>,
    pub name: Option<String>,
    pub properties: Option<SshPublicKeyResourceProperties>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SshPublicKeyResourceProperties {
    pub public_key: Option<String>,
}
