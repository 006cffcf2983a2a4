use crate::errors::ClusterError;
use crate::io_models::{Iid, KeyValue};
use crate::kubernetes::azure::{
    AksClusterHandler, CLUSTER_ADMIN_ROLE, CREATED_AT_TAG_KEY, SCALE_SET_OWNER_TAG_KEY, SSH_KEY_TAG_KEY,
};
use crate::models::{AccessInfo, AddonsInfo, Cluster, ClusterStatus, NetworkInfo, NodeGroup, NodeGroupStatus};
use crate::services::azure::resource_id::{self, ResourceKind};
use crate::services::azure::sdk_types::{
    AgentPool, ManagedCluster, NETWORK_PLUGIN_AZURE, NETWORK_PLUGIN_KUBENET, POWER_STATE_RUNNING,
    PROVISIONING_STATE_SUCCEEDED, VirtualMachineScaleSet, VirtualNetwork,
};
use chrono::{DateTime, Utc};
use serde_derive::Deserialize;
use tracing::{debug, warn};

/// An agent pool joined with the scale set backing it. Rebuilt on every read.
#[derive(Clone, Debug, PartialEq)]
pub struct NodePoolPair {
    pub agent_pool: AgentPool,
    pub scale_set: VirtualMachineScaleSet,
}

impl NodePoolPair {
    pub fn pool_name(&self) -> &str {
        self.agent_pool.name.as_deref().unwrap_or_default()
    }
}

pub fn cluster_status(cluster: &ManagedCluster) -> ClusterStatus {
    let properties = match &cluster.properties {
        Some(properties) => properties,
        None => return ClusterStatus::Inactive,
    };
    let power_state = properties.power_state.as_ref().and_then(|p| p.code.as_deref());

    match properties.provisioning_state.as_deref() {
        Some("Creating") | Some("Starting") => ClusterStatus::Creating,
        Some("Deleting") => ClusterStatus::Deleting,
        Some("Updating") | Some("Upgrading") | Some("Scaling") | Some("InProgress") => ClusterStatus::Updating,
        Some(PROVISIONING_STATE_SUCCEEDED) if power_state == Some(POWER_STATE_RUNNING) => ClusterStatus::Active,
        _ => ClusterStatus::Inactive,
    }
}

pub fn node_group_status(scale_set: &VirtualMachineScaleSet) -> NodeGroupStatus {
    match scale_set.provisioning_state() {
        Some("Creating") => NodeGroupStatus::Creating,
        Some("Deleting") => NodeGroupStatus::Deleting,
        Some("Updating") | Some("Upgrading") | Some("Scaling") | Some("InProgress") => NodeGroupStatus::Updating,
        Some(PROVISIONING_STATE_SUCCEEDED) => NodeGroupStatus::Active,
        _ => NodeGroupStatus::Inactive,
    }
}

/// Pairs each pool with the scale set tagged with its name. Pools without one are dropped.
pub fn pair_node_pools(agent_pools: Vec<AgentPool>, scale_sets: &[VirtualMachineScaleSet]) -> Vec<NodePoolPair> {
    agent_pools
        .into_iter()
        .filter_map(|agent_pool| {
            let pool_name = agent_pool.name.as_deref()?;
            let scale_set = scale_sets
                .iter()
                .find(|s| s.tag(SCALE_SET_OWNER_TAG_KEY) == Some(pool_name))?
                .clone();
            Some(NodePoolPair { agent_pool, scale_set })
        })
        .collect()
}

pub fn disk_type_from_storage_account_type(storage_account_type: &str) -> String {
    match storage_account_type {
        "Premium_LRS" => "PremiumSSD".to_string(),
        "StandardSSD_LRS" => "StandardSSD".to_string(),
        "Standard_LRS" => "HDD".to_string(),
        other => other.to_string(),
    }
}

pub fn addons_info(cluster: &ManagedCluster) -> Result<AddonsInfo, ClusterError> {
    let profiles = match cluster.properties.as_ref().and_then(|p| p.addon_profiles.as_ref()) {
        Some(profiles) => profiles,
        None => return Ok(AddonsInfo::default()),
    };

    let mut names: Vec<&String> = profiles.keys().collect();
    names.sort();

    let mut key_values = Vec::with_capacity(names.len());
    for name in names {
        let enabled = profiles[name]
            .enabled
            .ok_or_else(|| ClusterError::AddonAssemblyFailed { addon: name.to_string() })?;
        key_values.push(KeyValue::new(name, if enabled { "Enabled" } else { "Disabled" }));
    }

    Ok(AddonsInfo { key_values })
}

/// Key pair named by the cluster tag; its id is rebuilt from the cluster id.
pub fn cluster_ssh_key_iid(cluster: &ManagedCluster) -> Iid {
    let key_name = match cluster.tag(SSH_KEY_TAG_KEY) {
        Some(name) if !name.is_empty() => name,
        _ => return Iid::default(),
    };

    let cluster_id = cluster.id.as_deref().unwrap_or_default();
    match (resource_id::subscription(cluster_id), resource_id::resource_group(cluster_id)) {
        (Ok(subscription), Ok(resource_group)) => Iid::new(
            key_name,
            &format!(
                "/subscriptions/{subscription}/resourceGroups/{resource_group}/providers/Microsoft.Compute/sshPublicKeys/{key_name}"
            ),
        ),
        _ => Iid::from_name(key_name),
    }
}

pub fn node_group_from_pair(pair: &NodePoolPair, key_pair_iid: &Iid, nodes: Vec<Iid>) -> NodeGroup {
    let pool_properties = pair.agent_pool.properties.clone().unwrap_or_default();
    let storage_profile = pair.scale_set.storage_profile();
    let os_disk = storage_profile.and_then(|s| s.os_disk.as_ref());
    let image_id = storage_profile
        .and_then(|s| s.image_reference.as_ref())
        .and_then(|i| i.id.as_deref())
        .unwrap_or_default();

    NodeGroup {
        iid: Iid::new(
            pair.pool_name(),
            pair.agent_pool.id.as_deref().unwrap_or_default(),
        ),
        image_iid: Iid::new(image_id, image_id),
        vm_spec_name: pair
            .scale_set
            .sku
            .as_ref()
            .and_then(|s| s.name.clone())
            .unwrap_or_default(),
        root_disk_type: os_disk
            .and_then(|d| d.managed_disk.as_ref())
            .and_then(|m| m.storage_account_type.as_deref())
            .map(disk_type_from_storage_account_type)
            .unwrap_or_default(),
        root_disk_size: os_disk
            .and_then(|d| d.disk_size_gb)
            .map(|size| size.to_string())
            .unwrap_or_default(),
        key_pair_iid: key_pair_iid.clone(),
        status: node_group_status(&pair.scale_set),
        on_auto_scaling: pool_properties.enable_auto_scaling.unwrap_or(false),
        desired_node_size: pool_properties.count.unwrap_or(0),
        min_node_size: pool_properties.min_count.unwrap_or(0),
        max_node_size: pool_properties.max_count.unwrap_or(0),
        nodes,
        key_values: vec![],
    }
}

/// Azure CNI: the subnet comes from the pool profiles, security groups from the pools' NICs.
pub fn cni_network_info(cluster: &ManagedCluster, pairs: &[NodePoolPair]) -> Result<NetworkInfo, ClusterError> {
    let subnet_id = cluster
        .properties
        .as_ref()
        .and_then(|p| p.agent_pool_profiles.as_ref())
        .and_then(|profiles| {
            profiles
                .iter()
                .find_map(|profile| profile.properties.vnet_subnet_id.as_deref())
        })
        .ok_or_else(|| ClusterError::assembly("no agent pool profile references a subnet"))?;

    let vpc_id = resource_id::virtual_network_id_from_subnet_id(subnet_id)?;
    let vpc_name = resource_id::name_by_kind(subnet_id, ResourceKind::VirtualNetwork)?;
    let subnet_name = resource_id::name_by_kind(subnet_id, ResourceKind::Subnet)?;

    let mut security_group_iids: Vec<Iid> = vec![];
    for pair in pairs {
        let security_group_id = pair.scale_set.primary_security_group_id().ok_or_else(|| {
            ClusterError::assembly(format!(
                "scale set of node pool `{}` has no primary NIC security group",
                pair.pool_name()
            ))
        })?;
        if security_group_iids
            .iter()
            .any(|iid| iid.system_id.eq_ignore_ascii_case(security_group_id))
        {
            continue;
        }
        let security_group_name = resource_id::name_by_kind(security_group_id, ResourceKind::NetworkSecurityGroup)?;
        security_group_iids.push(Iid::new(&security_group_name, security_group_id));
    }

    Ok(NetworkInfo {
        vpc_iid: Iid::new(&vpc_name, &vpc_id),
        subnet_iids: vec![Iid::new(&subnet_name, subnet_id)],
        security_group_iids,
        key_values: vec![KeyValue::new("networkPlugin", NETWORK_PLUGIN_AZURE)],
    })
}

/// Kubenet: the first virtual network of the node resource group, with all its subnets.
pub fn kubenet_network_info(virtual_networks: &[VirtualNetwork]) -> Result<NetworkInfo, ClusterError> {
    let vpc = virtual_networks
        .first()
        .ok_or_else(|| ClusterError::assembly("node resource group holds no virtual network"))?;

    Ok(NetworkInfo {
        vpc_iid: Iid::new(
            vpc.name.as_deref().unwrap_or_default(),
            vpc.id.as_deref().unwrap_or_default(),
        ),
        subnet_iids: vpc
            .subnets()
            .iter()
            .map(|s| Iid::new(s.name.as_deref().unwrap_or_default(), s.id.as_deref().unwrap_or_default()))
            .collect(),
        security_group_iids: vec![],
        key_values: vec![KeyValue::new("networkPlugin", NETWORK_PLUGIN_KUBENET)],
    })
}

#[derive(Deserialize, Debug, Default)]
struct KubeConfig {
    #[serde(default)]
    clusters: Vec<KubeConfigClusterEntry>,
}

#[derive(Deserialize, Debug)]
struct KubeConfigClusterEntry {
    name: String,
    cluster: KubeConfigCluster,
}

#[derive(Deserialize, Debug)]
struct KubeConfigCluster {
    #[serde(default)]
    server: String,
}

pub fn access_info_from_kubeconfig(cluster_name: &str, kubeconfig: &[u8]) -> Result<AccessInfo, ClusterError> {
    let content = String::from_utf8(kubeconfig.to_vec())
        .map_err(|e| ClusterError::assembly(format!("kubeconfig is not valid UTF-8: {e}")))?;
    let parsed: KubeConfig = serde_yaml::from_str(&content)
        .map_err(|e| ClusterError::assembly(format!("cannot parse kubeconfig: {e}")))?;

    let endpoint = parsed
        .clusters
        .iter()
        .find(|c| c.name == cluster_name)
        .map(|c| c.cluster.server.to_string())
        .unwrap_or_default();

    Ok(AccessInfo {
        endpoint,
        kubeconfig: content,
    })
}

fn created_at(cluster: &ManagedCluster) -> Option<DateTime<Utc>> {
    cluster
        .tag(CREATED_AT_TAG_KEY)
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

fn sorted_tags(cluster: &ManagedCluster) -> Vec<KeyValue> {
    let mut tags: Vec<KeyValue> = cluster
        .tags
        .iter()
        .flatten()
        .map(|(k, v)| KeyValue::new(k, v))
        .collect();
    tags.sort_by(|a, b| a.key.cmp(&b.key));
    tags
}

impl AksClusterHandler {
    pub(super) fn cluster_location(cluster: &ManagedCluster) -> Result<(String, String), ClusterError> {
        let cluster_id = cluster
            .id
            .as_deref()
            .ok_or_else(|| ClusterError::assembly("cluster has no id"))?;
        let name = cluster
            .name
            .clone()
            .ok_or_else(|| ClusterError::assembly("cluster has no name"))?;

        Ok((resource_id::resource_group(cluster_id)?, name))
    }

    pub(super) fn node_resource_group_of(cluster: &ManagedCluster) -> Result<String, ClusterError> {
        cluster
            .properties
            .as_ref()
            .and_then(|p| p.node_resource_group.clone())
            .filter(|rg| !rg.is_empty())
            .ok_or_else(|| ClusterError::assembly("cluster has no node resource group"))
    }

    pub(super) fn raw_node_pool_pairs(&self, cluster: &ManagedCluster) -> Result<Vec<NodePoolPair>, ClusterError> {
        let (resource_group, cluster_name) = Self::cluster_location(cluster)?;
        let node_resource_group = Self::node_resource_group_of(cluster)?;

        let agent_pools = self.read(
            "agent_pools.list",
            self.clients.agent_pools.list(&resource_group, &cluster_name),
        )?;
        let scale_sets = self.read(
            "scale_sets.list",
            self.clients.scale_sets.list(&node_resource_group),
        )?;

        let pool_count = agent_pools.len();
        let pairs = pair_node_pools(agent_pools, &scale_sets);
        if pairs.len() < pool_count {
            debug!(
                "cluster `{}`: {} agent pool(s) without a backing scale set ignored",
                cluster_name,
                pool_count - pairs.len()
            );
        }

        Ok(pairs)
    }

    pub(super) fn assemble_node_group(
        &self,
        pair: &NodePoolPair,
        key_pair_iid: &Iid,
        node_resource_group: &str,
    ) -> Result<NodeGroup, ClusterError> {
        let scale_set_name = pair.scale_set.name.as_deref().unwrap_or_default();
        let nodes = self
            .read(
                "scale_sets.list_vms",
                self.clients.scale_sets.list_vms(node_resource_group, scale_set_name),
            )?
            .into_iter()
            .map(|vm| {
                Iid::new(
                    vm.name.as_deref().unwrap_or_default(),
                    vm.id.as_deref().unwrap_or_default(),
                )
            })
            .collect();

        Ok(node_group_from_pair(pair, key_pair_iid, nodes))
    }

    fn assemble_network(&self, cluster: &ManagedCluster, pairs: &[NodePoolPair]) -> Result<NetworkInfo, ClusterError> {
        let network_plugin = cluster
            .properties
            .as_ref()
            .and_then(|p| p.network_profile.as_ref())
            .and_then(|n| n.network_plugin.as_deref());

        match network_plugin {
            Some(NETWORK_PLUGIN_AZURE) => cni_network_info(cluster, pairs),
            Some(NETWORK_PLUGIN_KUBENET) | None => {
                let node_resource_group = Self::node_resource_group_of(cluster)?;
                let virtual_networks = self.read(
                    "virtual_networks.list",
                    self.clients.virtual_networks.list(&node_resource_group),
                )?;
                kubenet_network_info(&virtual_networks)
            }
            Some(other) => Err(ClusterError::assembly(format!("unsupported network plugin `{other}`"))),
        }
    }

    fn assemble_access_info(&self, resource_group: &str, cluster_name: &str) -> AccessInfo {
        let kubeconfig = self.read(
            "managed_clusters.get_access_profile",
            self.clients
                .managed_clusters
                .get_access_profile(resource_group, cluster_name, CLUSTER_ADMIN_ROLE),
        );

        match kubeconfig.and_then(|k| access_info_from_kubeconfig(cluster_name, &k)) {
            Ok(access_info) => access_info,
            Err(e) => {
                warn!("cannot read access info of cluster `{}`: {}", cluster_name, e);
                AccessInfo::default()
            }
        }
    }

    /// Rebuilds the normalized cluster model from the provider objects.
    pub(super) fn assemble_cluster(&self, cluster: &ManagedCluster) -> Result<Cluster, ClusterError> {
        let (resource_group, cluster_name) = Self::cluster_location(cluster)?;
        let node_resource_group = Self::node_resource_group_of(cluster)?;

        let pairs = self.raw_node_pool_pairs(cluster)?;
        let key_pair_iid = cluster_ssh_key_iid(cluster);
        let node_groups = pairs
            .iter()
            .map(|pair| self.assemble_node_group(pair, &key_pair_iid, &node_resource_group))
            .collect::<Result<Vec<NodeGroup>, ClusterError>>()?;

        let network = self.assemble_network(cluster, &pairs)?;
        let addons = addons_info(cluster)?;
        let access_info = self.assemble_access_info(&resource_group, &cluster_name);

        let mut key_values = vec![];
        if !key_pair_iid.name_id.is_empty() {
            key_values.push(KeyValue::new(SSH_KEY_TAG_KEY, &key_pair_iid.name_id));
        }

        Ok(Cluster {
            iid: Iid::new(&cluster_name, cluster.id.as_deref().unwrap_or_default()),
            version: cluster
                .properties
                .as_ref()
                .and_then(|p| p.kubernetes_version.clone())
                .unwrap_or_default(),
            network,
            node_groups,
            access_info,
            addons,
            status: cluster_status(cluster),
            created_at: created_at(cluster),
            key_values,
            tags: sorted_tags(cluster),
        })
    }
}
