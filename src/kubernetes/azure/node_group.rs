use crate::errors::ClusterError;
use crate::io_models::{Iid, NodeGroupSpec};
use crate::kubernetes::azure::AksClusterHandler;
use crate::kubernetes::azure::assembler::cluster_ssh_key_iid;
use crate::kubernetes::azure::provisioning::agent_pool_properties;
use crate::kubernetes::azure::validation::{ValidationCatalog, check_node_group_scale_valid};
use crate::models::NodeGroup;
use crate::services::azure::sdk_types::{AgentPool, AgentPoolProperties, ManagedCluster, PROVISIONING_STATE_SUCCEEDED};
use tracing::info;

/// First pool the IID designates, by system id when set, else by name.
pub fn find_agent_pool<'a>(agent_pools: &'a [AgentPool], node_group_iid: &Iid) -> Option<&'a AgentPool> {
    agent_pools.iter().find(|pool| {
        node_group_iid.matches(
            pool.name.as_deref().unwrap_or_default(),
            pool.id.as_deref().unwrap_or_default(),
        )
    })
}

/// Subnet the cluster's existing pools are attached to.
pub fn cluster_subnet_id(cluster: &ManagedCluster) -> Option<&str> {
    cluster
        .properties
        .as_ref()
        .and_then(|p| p.agent_pool_profiles.as_ref())
        .and_then(|profiles| {
            profiles
                .iter()
                .find_map(|profile| profile.properties.vnet_subnet_id.as_deref())
        })
}

/// Turning autoscaling on bounds the pool to `1..=count`; turning it off drops the bounds.
pub fn toggled_pool_properties(current: &AgentPoolProperties, on: bool) -> AgentPoolProperties {
    let mut properties = current.clone();
    properties.provisioning_state = None;
    properties.enable_auto_scaling = Some(on);
    if on {
        properties.min_count = Some(1);
        properties.max_count = properties.count;
    } else {
        properties.min_count = None;
        properties.max_count = None;
    }
    properties
}

pub fn resized_pool_properties(current: &AgentPoolProperties, desired: i32, min: i32, max: i32) -> AgentPoolProperties {
    let mut properties = current.clone();
    properties.provisioning_state = None;
    properties.count = Some(desired);
    properties.min_count = Some(min);
    properties.max_count = Some(max);
    properties
}

impl AksClusterHandler {
    fn agent_pools_of(&self, cluster: &ManagedCluster) -> Result<Vec<AgentPool>, ClusterError> {
        let (resource_group, cluster_name) = Self::cluster_location(cluster)?;
        self.read(
            "agent_pools.list",
            self.clients.agent_pools.list(&resource_group, &cluster_name),
        )
    }

    fn existing_agent_pool(&self, cluster: &ManagedCluster, node_group_iid: &Iid) -> Result<AgentPool, ClusterError> {
        let agent_pools = self.agent_pools_of(cluster)?;
        find_agent_pool(&agent_pools, node_group_iid)
            .cloned()
            .ok_or_else(|| ClusterError::NodeGroupNotFound {
                node_group: node_group_iid.to_string(),
            })
    }

    /// Re-reads the cluster and assembles the node group backed by `pool_name`.
    fn reassemble_node_group(&self, cluster_iid: &Iid, pool_name: &str) -> Result<NodeGroup, ClusterError> {
        let cluster = self.raw_cluster(cluster_iid)?;
        let node_resource_group = Self::node_resource_group_of(&cluster)?;
        let pair = self
            .raw_node_pool_pairs(&cluster)?
            .into_iter()
            .find(|p| p.pool_name() == pool_name)
            .ok_or_else(|| ClusterError::NodeGroupNotFound {
                node_group: pool_name.to_string(),
            })?;

        self.assemble_node_group(&pair, &cluster_ssh_key_iid(&cluster), &node_resource_group)
    }

    fn update_agent_pool(
        &self,
        cluster: &ManagedCluster,
        pool: &AgentPool,
        properties: AgentPoolProperties,
    ) -> Result<AgentPool, ClusterError> {
        let (resource_group, cluster_name) = Self::cluster_location(cluster)?;
        let pool_name = pool.name.as_deref().unwrap_or_default();

        self.write(
            "agent_pools.create_or_update",
            self.clients.agent_pools.create_or_update(
                &resource_group,
                &cluster_name,
                pool_name,
                AgentPool {
                    id: pool.id.clone(),
                    name: pool.name.clone(),
                    properties: Some(properties),
                },
            ),
        )
    }

    pub(super) fn add_node_pool(&self, cluster_iid: &Iid, node_group_spec: &NodeGroupSpec) -> Result<NodeGroup, ClusterError> {
        let pool_name = node_group_spec.iid.name_id.as_str();
        if pool_name.is_empty() {
            return Err(ClusterError::MissingName { index: 0 });
        }

        let cluster = self.raw_cluster(cluster_iid)?;
        let (resource_group, cluster_name) = Self::cluster_location(&cluster)?;

        let ssh_keys = self.validate_node_group_specs(std::slice::from_ref(node_group_spec))?;
        let cluster_key = cluster_ssh_key_iid(&cluster);
        if cluster_key.is_empty() {
            return Err(ClusterError::ClusterSshKeyMissing { cluster: cluster_name });
        }
        if !ValidationCatalog::new(&[], &ssh_keys).same_ssh_key(&cluster_key, &node_group_spec.key_pair_iid) {
            return Err(ClusterError::InconsistentSshKey {
                node_group: pool_name.to_string(),
            });
        }

        let agent_pools = self.agent_pools_of(&cluster)?;
        if agent_pools.iter().any(|p| p.name.as_deref() == Some(pool_name)) {
            return Err(ClusterError::NodeGroupAlreadyExists {
                node_group: pool_name.to_string(),
            });
        }

        let subnet_id = cluster_subnet_id(&cluster)
            .ok_or_else(|| ClusterError::assembly(format!("cluster `{cluster_name}` has no subnet reference")))?;
        let properties = agent_pool_properties(node_group_spec, subnet_id, &self.settings)?;

        info!("adding node pool `{}` to cluster `{}`", pool_name, cluster_name);
        self.write(
            "agent_pools.create_or_update",
            self.clients.agent_pools.create_or_update(
                &resource_group,
                &cluster_name,
                pool_name,
                AgentPool {
                    id: None,
                    name: Some(pool_name.to_string()),
                    properties: Some(properties),
                },
            ),
        )?;

        let pairs = self.wait_for_node_pool_pairs(&cluster, &[pool_name])?;
        let pair = pairs
            .iter()
            .find(|p| p.pool_name() == pool_name)
            .ok_or_else(|| ClusterError::NodeGroupNotFound {
                node_group: pool_name.to_string(),
            })?;

        self.assemble_node_group(pair, &cluster_key, &Self::node_resource_group_of(&cluster)?)
    }

    pub(super) fn remove_node_pool(&self, cluster_iid: &Iid, node_group_iid: &Iid) -> Result<(), ClusterError> {
        let cluster = self.raw_cluster(cluster_iid)?;
        let (resource_group, cluster_name) = Self::cluster_location(&cluster)?;
        let pool = self.existing_agent_pool(&cluster, node_group_iid)?;
        let pool_name = pool.name.as_deref().unwrap_or_default();

        info!("removing node pool `{}` from cluster `{}`", pool_name, cluster_name);
        self.write(
            "agent_pools.delete",
            self.clients.agent_pools.delete(&resource_group, &cluster_name, pool_name),
        )
    }

    pub(super) fn resize_node_pool(
        &self,
        cluster_iid: &Iid,
        node_group_iid: &Iid,
        desired_node_size: i32,
        min_node_size: i32,
        max_node_size: i32,
    ) -> Result<NodeGroup, ClusterError> {
        check_node_group_scale_valid(desired_node_size, min_node_size, max_node_size)?;

        let cluster = self.raw_cluster(cluster_iid)?;
        let pool = self.existing_agent_pool(&cluster, node_group_iid)?;
        let pool_name = pool.name.clone().unwrap_or_default();
        let current = pool.properties.clone().unwrap_or_default();
        if !current.enable_auto_scaling.unwrap_or(false) {
            return Err(ClusterError::AutoscalingDisabled { node_group: pool_name });
        }

        info!(
            "resizing node pool `{}` to desired={} min={} max={}",
            pool_name, desired_node_size, min_node_size, max_node_size
        );
        self.update_agent_pool(
            &cluster,
            &pool,
            resized_pool_properties(&current, desired_node_size, min_node_size, max_node_size),
        )?;

        self.reassemble_node_group(cluster_iid, &pool_name)
    }

    pub(super) fn toggle_node_pool_auto_scaling(
        &self,
        cluster_iid: &Iid,
        node_group_iid: &Iid,
        on: bool,
    ) -> Result<NodeGroup, ClusterError> {
        let cluster = self.raw_cluster(cluster_iid)?;
        let pool = self.existing_agent_pool(&cluster, node_group_iid)?;
        let pool_name = pool.name.clone().unwrap_or_default();
        let current = pool.properties.clone().unwrap_or_default();

        if current.enable_auto_scaling.unwrap_or(false) == on {
            return Err(ClusterError::NoOpToggle {
                node_group: pool_name,
                enabled: on,
            });
        }
        let provisioning_state = current.provisioning_state.clone().unwrap_or_default();
        if provisioning_state != PROVISIONING_STATE_SUCCEEDED {
            return Err(ClusterError::PoolBusy {
                node_group: pool_name,
                provisioning_state,
            });
        }

        info!("setting autoscaling of node pool `{}` to {}", pool_name, on);
        self.update_agent_pool(&cluster, &pool, toggled_pool_properties(&current, on))?;

        self.reassemble_node_group(cluster_iid, &pool_name)
    }
}
