use crate::errors::{CleanupFailure, ClusterError};
use crate::io_models::settings::AksHandlerSettings;
use crate::io_models::{ClusterSpec, Iid, KeyValue, NetworkSpec, NodeGroupSpec};
use crate::kubernetes::azure::assembler::{NodePoolPair, cluster_status, node_group_status};
use crate::kubernetes::azure::network::build_network_profile;
use crate::kubernetes::azure::validation::{ValidationCatalog, validate_node_groups};
use crate::kubernetes::azure::{
    AksClusterHandler, CREATED_AT_TAG_KEY, OWNER_CLUSTER_TAG_KEY, SSH_KEY_TAG_KEY,
};
use crate::models::{Cluster, ClusterStatus, NodeGroupStatus};
use crate::services::azure::resource_id::{self, ResourceKind};
use crate::services::azure::sdk_types::{
    AgentPoolProperties, LinuxProfile, ManagedCluster, ManagedClusterAddonProfile, ManagedClusterAgentPoolProfile,
    ManagedClusterIdentity, ManagedClusterProperties, ManagedClusterSku, SECURITY_RULE_DIRECTION_INBOUND,
    SECURITY_RULE_DIRECTION_OUTBOUND, SecurityGroup, SecurityRule, SshConfiguration, SshPublicKey,
    SshPublicKeyResource, Subnet, Tags, VirtualMachineSize,
};
use chrono::Utc;
use std::collections::HashMap;
use tracing::{info, warn};

/// Base priority rule copies are appended after when the target group has none.
pub const INITIAL_RULE_PRIORITY: i32 = 100;
/// Inbound rules from this priority on are shifted to stay clear of the AKS base rules.
pub const AKS_BASE_RULE_PRIORITY: i32 = 500;
const AKS_BASE_RULE_SHIFT: i32 = 100;

pub fn dns_prefix(cluster_name: &str) -> String {
    format!("{cluster_name}-dns")
}

fn parse_root_disk_size(node_group: &NodeGroupSpec) -> Result<Option<i32>, ClusterError> {
    match node_group.root_disk_size.as_str() {
        "" | "default" => Ok(None),
        size => size.parse::<i32>().map(Some).map_err(|_| ClusterError::InvalidDiskSize {
            node_group: node_group.iid.name_id.to_string(),
            disk_size: size.to_string(),
        }),
    }
}

/// Agent pool settings for a node group; autoscaling bounds are left out when autoscaling is off.
pub fn agent_pool_properties(
    node_group: &NodeGroupSpec,
    subnet_id: &str,
    settings: &AksHandlerSettings,
) -> Result<AgentPoolProperties, ClusterError> {
    let (min_count, max_count) = match node_group.on_auto_scaling {
        true => (Some(node_group.min_node_size), Some(node_group.max_node_size)),
        false => (None, None),
    };

    Ok(AgentPoolProperties {
        count: Some(node_group.desired_node_size),
        min_count,
        max_count,
        enable_auto_scaling: Some(node_group.on_auto_scaling),
        vm_size: Some(node_group.vm_spec_name.to_string()),
        os_disk_size_gb: parse_root_disk_size(node_group)?,
        os_type: Some("Linux".to_string()),
        pool_type: Some("VirtualMachineScaleSets".to_string()),
        mode: Some("System".to_string()),
        max_pods: Some(settings.max_pods_per_node),
        availability_zones: Some(vec![settings.zone.to_string()]),
        enable_node_public_ip: Some(true),
        vnet_subnet_id: Some(subnet_id.to_string()),
        orchestrator_version: None,
        provisioning_state: None,
    })
}

pub fn cluster_tags(ssh_key_name: &str, cluster_name: &str, extra_tags: &[KeyValue]) -> Tags {
    let mut tags = HashMap::new();
    tags.insert(SSH_KEY_TAG_KEY.to_string(), ssh_key_name.to_string());
    tags.insert(CREATED_AT_TAG_KEY.to_string(), Utc::now().timestamp().to_string());
    tags.insert(OWNER_CLUSTER_TAG_KEY.to_string(), cluster_name.to_string());
    for tag in extra_tags {
        tags.insert(tag.key.to_string(), tag.value.to_string());
    }
    tags
}

pub fn prepared_addon_profiles() -> HashMap<String, ManagedClusterAddonProfile> {
    let mut addons = HashMap::new();
    addons.insert(
        "httpApplicationRouting".to_string(),
        ManagedClusterAddonProfile {
            enabled: Some(true),
            config: None,
        },
    );
    addons
}

pub fn linux_profile(admin_username: &str, ssh_key: &SshPublicKeyResource) -> Result<LinuxProfile, ClusterError> {
    let key_data = ssh_key
        .properties
        .as_ref()
        .and_then(|p| p.public_key.clone())
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ClusterError::SshKeyNotFound {
            key: ssh_key.name.clone().unwrap_or_default(),
        })?;

    Ok(LinuxProfile {
        admin_username: Some(admin_username.to_string()),
        ssh: Some(SshConfiguration {
            public_keys: Some(vec![SshPublicKey {
                key_data: Some(key_data),
            }]),
        }),
    })
}

fn copied_rule(rule: &SecurityRule, priority: i32) -> SecurityRule {
    let mut properties = rule.properties.clone().unwrap_or_default();
    properties.priority = Some(priority);

    SecurityRule {
        id: None,
        name: rule.name.clone(),
        properties: Some(properties),
    }
}

fn highest_priority(security_group: &SecurityGroup, direction: &str) -> i32 {
    security_group
        .rules()
        .iter()
        .filter(|r| r.direction() == Some(direction))
        .filter_map(|r| r.priority())
        .max()
        .unwrap_or(INITIAL_RULE_PRIORITY)
}

/// Rules of `source` to write into `target`: inbound first, then outbound, each direction
/// numbered after the highest priority `target` already uses for it.
pub fn plan_rule_copies(source: &SecurityGroup, target: &SecurityGroup) -> Result<Vec<SecurityRule>, ClusterError> {
    let mut inbound = vec![];
    let mut outbound = vec![];
    for rule in source.rules() {
        match rule.direction() {
            Some(SECURITY_RULE_DIRECTION_INBOUND) => inbound.push(rule),
            Some(SECURITY_RULE_DIRECTION_OUTBOUND) => outbound.push(rule),
            other => {
                return Err(ClusterError::assembly(format!(
                    "security rule `{}` has an invalid direction `{}`",
                    rule.name.as_deref().unwrap_or_default(),
                    other.unwrap_or_default()
                )));
            }
        }
    }

    let mut copies = Vec::with_capacity(inbound.len() + outbound.len());

    let mut next = highest_priority(target, SECURITY_RULE_DIRECTION_INBOUND) + 1;
    for rule in inbound {
        let requested = match rule.priority() {
            Some(p) if p >= AKS_BASE_RULE_PRIORITY => p + AKS_BASE_RULE_SHIFT,
            Some(p) => p,
            None => next,
        };
        let priority = requested.max(next);
        copies.push(copied_rule(rule, priority));
        next = priority + 1;
    }

    let mut next = highest_priority(target, SECURITY_RULE_DIRECTION_OUTBOUND) + 1;
    for rule in outbound {
        let priority = rule.priority().unwrap_or(next).max(next);
        copies.push(copied_rule(rule, priority));
        next = priority + 1;
    }

    Ok(copies)
}

impl AksClusterHandler {
    fn validation_data(&self) -> Result<(Vec<VirtualMachineSize>, Vec<SshPublicKeyResource>), ClusterError> {
        let vm_sizes = self.read(
            "vm_sizes.list",
            self.clients.vm_sizes.list(&self.settings.location),
        )?;
        let ssh_keys = self.read(
            "ssh_public_keys.list",
            self.clients.ssh_public_keys.list(&self.settings.resource_group),
        )?;

        Ok((vm_sizes, ssh_keys))
    }

    /// Validates the node groups against the live VM size and key catalogs, returning the keys.
    pub(super) fn validate_node_group_specs(
        &self,
        node_groups: &[NodeGroupSpec],
    ) -> Result<Vec<SshPublicKeyResource>, ClusterError> {
        let (vm_sizes, ssh_keys) = self.validation_data()?;
        validate_node_groups(
            node_groups,
            &ValidationCatalog::new(&vm_sizes, &ssh_keys),
            self.settings.max_node_pools,
        )?;

        Ok(ssh_keys)
    }

    pub(super) fn resource_group_of(&self, iid: &Iid) -> Result<String, ClusterError> {
        match iid.system_id.is_empty() {
            true => Ok(self.settings.resource_group.to_string()),
            false => resource_id::resource_group(&iid.system_id),
        }
    }

    fn target_subnet(&self, network: &NetworkSpec) -> Result<Subnet, ClusterError> {
        if network.subnet_iids.len() != 1 {
            return Err(ClusterError::MultipleOrZeroSubnets {
                count: network.subnet_iids.len(),
            });
        }
        let subnet_name = network.subnet_iids[0].resolve_name(ResourceKind::Subnet)?;
        let vpc_name = network.vpc_iid.resolve_name(ResourceKind::VirtualNetwork)?;
        let vpc_resource_group = self.resource_group_of(&network.vpc_iid)?;

        let vpc = self
            .read_optional(
                "virtual_networks.get",
                self.clients.virtual_networks.get(&vpc_resource_group, &vpc_name),
            )?
            .ok_or_else(|| ClusterError::VpcNotFound { vpc: vpc_name.to_string() })?;

        vpc.subnets()
            .iter()
            .find(|s| s.name.as_deref() == Some(subnet_name.as_str()))
            .cloned()
            .ok_or(ClusterError::SubnetNotFound {
                subnet: subnet_name,
                vpc: vpc_name,
            })
    }

    fn managed_cluster_request(
        &self,
        cluster_spec: &ClusterSpec,
        subnet: &Subnet,
        ssh_keys: &[SshPublicKeyResource],
    ) -> Result<ManagedCluster, ClusterError> {
        let cluster_name = cluster_spec.iid.name_id.as_str();
        let subnet_id = subnet
            .id
            .as_deref()
            .ok_or_else(|| ClusterError::assembly("target subnet has no id"))?;

        let agent_pool_profiles = cluster_spec
            .node_groups
            .iter()
            .map(|ng| {
                Ok(ManagedClusterAgentPoolProfile {
                    name: Some(ng.iid.name_id.to_string()),
                    properties: agent_pool_properties(ng, subnet_id, &self.settings)?,
                })
            })
            .collect::<Result<Vec<_>, ClusterError>>()?;

        let network_profile = build_network_profile(subnet, &cluster_spec.node_groups, self.settings.max_pods_per_node)?;

        // all node groups share the first group's key
        let key_iid = &cluster_spec.node_groups[0].key_pair_iid;
        let ssh_key = ssh_keys
            .iter()
            .find(|k| {
                key_iid.matches(
                    k.name.as_deref().unwrap_or_default(),
                    k.id.as_deref().unwrap_or_default(),
                )
            })
            .ok_or_else(|| ClusterError::SshKeyNotFound { key: key_iid.to_string() })?;
        let linux_profile = linux_profile(&self.settings.admin_username, ssh_key)?;
        let ssh_key_name = ssh_key.name.clone().unwrap_or_default();

        Ok(ManagedCluster {
            id: None,
            name: Some(cluster_name.to_string()),
            location: Some(self.settings.location.to_string()),
            tags: Some(cluster_tags(&ssh_key_name, cluster_name, &cluster_spec.tags)),
            sku: Some(ManagedClusterSku {
                name: Some("Base".to_string()),
                tier: Some("Standard".to_string()),
            }),
            identity: Some(ManagedClusterIdentity {
                identity_type: Some("SystemAssigned".to_string()),
            }),
            properties: Some(ManagedClusterProperties {
                kubernetes_version: Some(cluster_spec.version.to_string()),
                enable_rbac: Some(true),
                dns_prefix: Some(dns_prefix(cluster_name)),
                fqdn: None,
                node_resource_group: Some(self.settings.node_resource_group(cluster_name)),
                provisioning_state: None,
                power_state: None,
                agent_pool_profiles: Some(agent_pool_profiles),
                network_profile: Some(network_profile),
                linux_profile: Some(linux_profile),
                addon_profiles: Some(prepared_addon_profiles()),
            }),
        })
    }

    /// Waits until every named pool is backed by a scale set.
    pub(super) fn wait_for_node_pool_pairs(
        &self,
        cluster: &ManagedCluster,
        pool_names: &[&str],
    ) -> Result<Vec<NodePoolPair>, ClusterError> {
        let cluster_name = cluster.name.as_deref().unwrap_or_default();
        self.wait_for(
            self.settings.node_pool_wait,
            &format!("node pools of cluster `{cluster_name}`"),
            || {
                let pairs = self.raw_node_pool_pairs(cluster)?;
                let ready = pool_names
                    .iter()
                    .all(|name| pairs.iter().any(|p| p.pool_name() == *name));
                Ok(ready.then_some(pairs))
            },
        )
    }

    fn propagate_security_groups(
        &self,
        pairs: &[NodePoolPair],
        source_security_group_iids: &[Iid],
    ) -> Result<(), ClusterError> {
        let mut target_ids: Vec<String> = vec![];
        for pair in pairs {
            let security_group_id = pair.scale_set.primary_security_group_id().ok_or_else(|| {
                ClusterError::assembly(format!(
                    "scale set of node pool `{}` has no primary NIC security group",
                    pair.pool_name()
                ))
            })?;
            if !target_ids.iter().any(|id| id.eq_ignore_ascii_case(security_group_id)) {
                target_ids.push(security_group_id.to_string());
            }
        }

        for source_iid in source_security_group_iids {
            let source_name = source_iid.resolve_name(ResourceKind::NetworkSecurityGroup)?;
            let source_resource_group = self.resource_group_of(source_iid)?;
            let source = self
                .read_optional(
                    "security_groups.get",
                    self.clients.security_groups.get(&source_resource_group, &source_name),
                )?
                .ok_or_else(|| ClusterError::SecurityGroupNotFound {
                    security_group: source_iid.to_string(),
                })?;

            for target_id in &target_ids {
                let target_resource_group = resource_id::resource_group(target_id)?;
                let target_name = resource_id::name_by_kind(target_id, ResourceKind::NetworkSecurityGroup)?;
                let target = self
                    .read_optional(
                        "security_groups.get",
                        self.clients.security_groups.get(&target_resource_group, &target_name),
                    )?
                    .ok_or_else(|| ClusterError::SecurityGroupNotFound {
                        security_group: target_id.to_string(),
                    })?;

                let rules = plan_rule_copies(&source, &target)?;
                info!(
                    "copying {} rule(s) from security group `{}` to `{}`",
                    rules.len(),
                    source_name,
                    target_name
                );
                for rule in rules {
                    let rule_name = rule.name.clone().unwrap_or_default();
                    self.write(
                        "security_rules.create_or_update",
                        self.clients.security_rules.create_or_update(
                            &target_resource_group,
                            &target_name,
                            &rule_name,
                            rule,
                        ),
                    )?;
                }
            }
        }

        Ok(())
    }

    fn finish_cluster_creation(&self, cluster_spec: &ClusterSpec) -> Result<Cluster, ClusterError> {
        let cluster_iid = Iid::from_name(&cluster_spec.iid.name_id);
        let created = self.wait_for(
            self.settings.base_resource_wait,
            &format!("cluster `{}`", cluster_spec.iid.name_id),
            || match self.raw_cluster(&cluster_iid) {
                Ok(cluster) => Ok(Some(cluster)),
                Err(ClusterError::ClusterNotFound { .. }) => Ok(None),
                Err(e) => Err(e),
            },
        )?;

        let pool_names: Vec<&str> = cluster_spec
            .node_groups
            .iter()
            .map(|ng| ng.iid.name_id.as_str())
            .collect();
        let pairs = self.wait_for_node_pool_pairs(&created, &pool_names)?;
        self.propagate_security_groups(&pairs, &cluster_spec.network.security_group_iids)?;

        let cluster = self.raw_cluster(&cluster_iid)?;
        self.assemble_cluster(&cluster)
    }

    pub(super) fn provision_cluster(&self, cluster_spec: &ClusterSpec) -> Result<Cluster, ClusterError> {
        let cluster_name = cluster_spec.iid.name_id.as_str();
        if cluster_name.is_empty() {
            return Err(ClusterError::InvalidIid {
                resource_kind: ResourceKind::ManagedCluster.to_string(),
            });
        }

        // nothing is created on the provider side before this point
        self.check_kubernetes_version(&cluster_spec.version)?;
        let ssh_keys = self.validate_node_group_specs(&cluster_spec.node_groups)?;
        let subnet = self.target_subnet(&cluster_spec.network)?;
        let request = self.managed_cluster_request(cluster_spec, &subnet, &ssh_keys)?;

        info!("creating cluster `{}` in `{}`", cluster_name, self.settings.resource_group);
        self.write(
            "managed_clusters.create_or_update",
            self.clients
                .managed_clusters
                .create_or_update(&self.settings.resource_group, cluster_name, request),
        )?;

        match self.finish_cluster_creation(cluster_spec) {
            Ok(cluster) => Ok(cluster),
            Err(primary) if self.settings.cleanup_on_failure => {
                warn!("cluster `{}` creation failed, deleting it: {}", cluster_name, primary);
                match self.write(
                    "managed_clusters.delete",
                    self.clients
                        .managed_clusters
                        .delete(&self.settings.resource_group, cluster_name),
                ) {
                    Ok(()) => Err(primary),
                    Err(cleanup) => Err(ClusterError::WithCleanupFailure(CleanupFailure::new(primary, cleanup))),
                }
            }
            Err(primary) => Err(primary),
        }
    }

    pub(super) fn upgrade(&self, cluster_iid: &Iid, new_version: &str) -> Result<Cluster, ClusterError> {
        self.check_kubernetes_version(new_version)?;

        let cluster = self.raw_cluster(cluster_iid)?;
        let (resource_group, cluster_name) = Self::cluster_location(&cluster)?;

        let status = cluster_status(&cluster);
        if status != ClusterStatus::Active {
            return Err(ClusterError::ClusterNotActive {
                cluster: cluster_name,
                status: status.to_string(),
            });
        }
        for pair in self.raw_node_pool_pairs(&cluster)? {
            if node_group_status(&pair.scale_set) != NodeGroupStatus::Active {
                return Err(ClusterError::NodeGroupNotActive {
                    cluster: cluster_name,
                    node_group: pair.pool_name().to_string(),
                });
            }
        }

        let mut request = cluster.clone();
        if let Some(properties) = request.properties.as_mut() {
            properties.kubernetes_version = Some(new_version.to_string());
        }
        info!("upgrading cluster `{}` to {}", cluster_name, new_version);
        self.write(
            "managed_clusters.create_or_update",
            self.clients
                .managed_clusters
                .create_or_update(&resource_group, &cluster_name, request),
        )?;

        let upgraded = self.raw_cluster(&Iid::new(&cluster_name, cluster.id.as_deref().unwrap_or_default()))?;
        self.assemble_cluster(&upgraded)
    }
}
