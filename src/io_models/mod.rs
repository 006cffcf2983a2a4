pub mod settings;

use crate::errors::ClusterError;
use crate::services::azure::resource_id::{self, ResourceKind};
use serde_derive::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Dual identifier: a human name and the opaque id assigned by the cloud provider.
/// Either side may be empty, never both once resolved.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Iid {
    #[serde(default)]
    pub name_id: String,
    #[serde(default)]
    pub system_id: String,
}

impl Iid {
    pub fn new(name_id: &str, system_id: &str) -> Self {
        Iid {
            name_id: name_id.to_string(),
            system_id: system_id.to_string(),
        }
    }

    pub fn from_name(name_id: &str) -> Self {
        Iid::new(name_id, "")
    }

    pub fn from_system_id(system_id: &str) -> Self {
        Iid::new("", system_id)
    }

    pub fn is_empty(&self) -> bool {
        self.name_id.is_empty() && self.system_id.is_empty()
    }

    /// Tells whether a provider resource (`name`, `id`) is the one this IID points to.
    /// The system id wins when present; Azure resource ids are case insensitive.
    pub fn matches(&self, name: &str, id: &str) -> bool {
        if !self.system_id.is_empty() {
            return self.system_id.eq_ignore_ascii_case(id);
        }
        !self.name_id.is_empty() && self.name_id == name
    }

    /// Resolves the resource name: parsed from the system id when present, else the name.
    pub fn resolve_name(&self, kind: ResourceKind) -> Result<String, ClusterError> {
        if !self.system_id.is_empty() {
            return resource_id::name_by_kind(&self.system_id, kind);
        }
        if !self.name_id.is_empty() {
            return Ok(self.name_id.to_string());
        }

        Err(ClusterError::InvalidIid {
            resource_kind: kind.to_string(),
        })
    }
}

impl Display for Iid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.name_id.is_empty(), self.system_id.is_empty()) {
            (false, true) => write!(f, "{}", self.name_id),
            (true, false) => write!(f, "{}", self.system_id),
            _ => write!(f, "{} ({})", self.name_id, self.system_id),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: &str, value: &str) -> Self {
        KeyValue {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct NetworkSpec {
    #[serde(default)]
    pub vpc_iid: Iid,
    #[serde(default)]
    pub subnet_iids: Vec<Iid>,
    #[serde(default)]
    pub security_group_iids: Vec<Iid>,
}

/// Requested node group. Sizes are signed to mirror the provider API (unset = 0).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeGroupSpec {
    pub iid: Iid,
    #[serde(default)]
    pub image_iid: Iid,
    #[serde(default)]
    pub vm_spec_name: String,
    #[serde(default)]
    pub root_disk_type: String,
    #[serde(default)]
    pub root_disk_size: String,
    #[serde(default)]
    pub key_pair_iid: Iid,
    #[serde(default)]
    pub on_auto_scaling: bool,
    #[serde(default)]
    pub desired_node_size: i32,
    #[serde(default)]
    pub min_node_size: i32,
    #[serde(default)]
    pub max_node_size: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterSpec {
    pub iid: Iid,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub network: NetworkSpec,
    #[serde(default)]
    pub node_groups: Vec<NodeGroupSpec>,
    #[serde(default)]
    pub tags: Vec<KeyValue>,
}
