use crate::io_models::{Iid, KeyValue};
use chrono::{DateTime, Utc};
use derivative::Derivative;
use serde_derive::Serialize;
use strum_macros::Display;

#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, Display)]
pub enum ClusterStatus {
    Creating,
    Active,
    Updating,
    Deleting,
    #[default]
    Inactive,
}

#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, Display)]
pub enum NodeGroupStatus {
    Creating,
    Active,
    Updating,
    Deleting,
    #[default]
    Inactive,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct NetworkInfo {
    pub vpc_iid: Iid,
    pub subnet_iids: Vec<Iid>,
    pub security_group_iids: Vec<Iid>,
    pub key_values: Vec<KeyValue>,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AddonsInfo {
    pub key_values: Vec<KeyValue>,
}

impl AddonsInfo {
    pub fn get(&self, addon: &str) -> Option<&str> {
        self.key_values
            .iter()
            .find(|kv| kv.key == addon)
            .map(|kv| kv.value.as_str())
    }
}

#[derive(Serialize, Clone, Default, PartialEq, Eq, Derivative)]
#[derivative(Debug)]
pub struct AccessInfo {
    pub endpoint: String,
    #[derivative(Debug = "ignore")]
    pub kubeconfig: String,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeGroup {
    pub iid: Iid,
    pub image_iid: Iid,
    pub vm_spec_name: String,
    pub root_disk_type: String,
    pub root_disk_size: String,
    pub key_pair_iid: Iid,
    pub status: NodeGroupStatus,
    pub on_auto_scaling: bool,
    pub desired_node_size: i32,
    pub min_node_size: i32,
    pub max_node_size: i32,
    pub nodes: Vec<Iid>,
    pub key_values: Vec<KeyValue>,
}

/// Cluster as read back from the provider. Never mutated in place: every operation re-fetches it.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Cluster {
    pub iid: Iid,
    pub version: String,
    pub network: NetworkInfo,
    pub node_groups: Vec<NodeGroup>,
    pub access_info: AccessInfo,
    pub addons: AddonsInfo,
    pub status: ClusterStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub key_values: Vec<KeyValue>,
    pub tags: Vec<KeyValue>,
}

impl Cluster {
    pub fn node_group(&self, name: &str) -> Option<&NodeGroup> {
        self.node_groups.iter().find(|ng| ng.iid.name_id == name)
    }
}
