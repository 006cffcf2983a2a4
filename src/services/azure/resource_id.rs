use crate::errors::ClusterError;
use strum_macros::Display;

/// Resource types addressed through ARM ids, e.g.
/// `/subscriptions/{s}/resourceGroups/{rg}/providers/Microsoft.Network/virtualNetworks/{vnet}/subnets/{subnet}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum ResourceKind {
    #[strum(serialize = "managed cluster")]
    ManagedCluster,
    #[strum(serialize = "agent pool")]
    AgentPool,
    #[strum(serialize = "virtual network")]
    VirtualNetwork,
    #[strum(serialize = "subnet")]
    Subnet,
    #[strum(serialize = "network security group")]
    NetworkSecurityGroup,
    #[strum(serialize = "ssh public key")]
    SshPublicKey,
    #[strum(serialize = "virtual machine scale set")]
    VirtualMachineScaleSet,
}

impl ResourceKind {
    /// ARM path segment preceding the resource name.
    pub fn segment(&self) -> &'static str {
        match self {
            ResourceKind::ManagedCluster => "managedClusters",
            ResourceKind::AgentPool => "agentPools",
            ResourceKind::VirtualNetwork => "virtualNetworks",
            ResourceKind::Subnet => "subnets",
            ResourceKind::NetworkSecurityGroup => "networkSecurityGroups",
            ResourceKind::SshPublicKey => "sshPublicKeys",
            ResourceKind::VirtualMachineScaleSet => "virtualMachineScaleSets",
        }
    }
}

fn value_after_segment<'a>(resource_id: &'a str, segment: &str) -> Option<&'a str> {
    let mut parts = resource_id.split('/').filter(|p| !p.is_empty());
    while let Some(part) = parts.next() {
        if part.eq_ignore_ascii_case(segment) {
            return parts.next();
        }
    }

    None
}

fn invalid(resource_id: &str, expected: &str) -> ClusterError {
    ClusterError::InvalidResourceId {
        resource_id: resource_id.to_string(),
        expected: expected.to_string(),
    }
}

pub fn name_by_kind(resource_id: &str, kind: ResourceKind) -> Result<String, ClusterError> {
    value_after_segment(resource_id, kind.segment())
        .map(|name| name.to_string())
        .ok_or_else(|| invalid(resource_id, kind.segment()))
}

pub fn resource_group(resource_id: &str) -> Result<String, ClusterError> {
    value_after_segment(resource_id, "resourceGroups")
        .map(|name| name.to_string())
        .ok_or_else(|| invalid(resource_id, "resourceGroups"))
}

pub fn subscription(resource_id: &str) -> Result<String, ClusterError> {
    value_after_segment(resource_id, "subscriptions")
        .map(|name| name.to_string())
        .ok_or_else(|| invalid(resource_id, "subscriptions"))
}

/// Strips a child segment from a subnet id to get its virtual network id.
pub fn virtual_network_id_from_subnet_id(subnet_id: &str) -> Result<String, ClusterError> {
    let lowered = subnet_id.to_ascii_lowercase();
    match lowered.rfind("/subnets/") {
        Some(idx) if idx > 0 => Ok(subnet_id[..idx].to_string()),
        _ => Err(invalid(subnet_id, "subnets")),
    }
}
