use crate::errors::ClusterError;
use crate::io_models::{Iid, NodeGroupSpec};
use crate::services::azure::sdk_types::{SshPublicKeyResource, VirtualMachineSize};

pub const MIN_VM_SPEC_CORES: i32 = 2;
pub const MAX_NODE_SIZE: i32 = 1000;
const SUPPORTED_DISK_TYPE: &str = "PremiumSSD";

/// Provider data the validator looks things up in.
pub struct ValidationCatalog<'a> {
    pub vm_sizes: &'a [VirtualMachineSize],
    pub ssh_keys: &'a [SshPublicKeyResource],
}

impl<'a> ValidationCatalog<'a> {
    pub fn new(vm_sizes: &'a [VirtualMachineSize], ssh_keys: &'a [SshPublicKeyResource]) -> Self {
        ValidationCatalog { vm_sizes, ssh_keys }
    }

    fn vm_size(&self, name: &str) -> Option<&VirtualMachineSize> {
        self.vm_sizes.iter().find(|s| s.name.as_deref() == Some(name))
    }

    /// Provider id of a key pair: the system id when set, else looked up by name.
    fn ssh_key_id(&self, key: &Iid) -> Option<String> {
        if !key.system_id.is_empty() {
            return Some(key.system_id.to_string());
        }
        if key.name_id.is_empty() {
            return None;
        }
        self.ssh_keys
            .iter()
            .find(|k| k.name.as_deref() == Some(key.name_id.as_str()))
            .and_then(|k| k.id.clone())
    }

    /// Compares on the fields both sides carry, falls back to resolving provider ids.
    pub fn same_ssh_key(&self, reference: &Iid, other: &Iid) -> bool {
        if reference.is_empty() || other.is_empty() {
            return false;
        }
        if !reference.name_id.is_empty() && !other.name_id.is_empty() {
            return reference.name_id == other.name_id;
        }
        if !reference.system_id.is_empty() && !other.system_id.is_empty() {
            return reference.system_id.eq_ignore_ascii_case(&other.system_id);
        }

        match (self.ssh_key_id(reference), self.ssh_key_id(other)) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(&b),
            _ => false,
        }
    }
}

/// Checks a whole node group list before anything is sent to the provider.
/// Stops at the first violation.
pub fn validate_node_groups(
    node_groups: &[NodeGroupSpec],
    catalog: &ValidationCatalog,
    max_node_pools: usize,
) -> Result<(), ClusterError> {
    if node_groups.is_empty() {
        return Err(ClusterError::EmptyNodeGroups);
    }
    if node_groups.len() > max_node_pools {
        return Err(ClusterError::TooManyNodeGroups {
            count: node_groups.len(),
            max: max_node_pools,
        });
    }

    let reference_key = &node_groups[0].key_pair_iid;
    for (index, node_group) in node_groups.iter().enumerate() {
        validate_node_group(index, node_group, reference_key, catalog)?;
    }

    Ok(())
}

fn validate_node_group(
    index: usize,
    node_group: &NodeGroupSpec,
    reference_key: &Iid,
    catalog: &ValidationCatalog,
) -> Result<(), ClusterError> {
    let name = node_group.iid.name_id.as_str();
    if name.is_empty() {
        return Err(ClusterError::MissingName { index });
    }
    if node_group.vm_spec_name.is_empty() {
        return Err(ClusterError::MissingSpec {
            node_group: name.to_string(),
        });
    }
    if !node_group.image_iid.is_empty() {
        return Err(ClusterError::ImageNotSupported {
            node_group: name.to_string(),
        });
    }

    if index == 0 {
        if reference_key.is_empty() {
            return Err(ClusterError::MissingSshKey {
                node_group: name.to_string(),
            });
        }
    } else if !catalog.same_ssh_key(reference_key, &node_group.key_pair_iid) {
        return Err(ClusterError::InconsistentSshKey {
            node_group: name.to_string(),
        });
    }

    let vm_size = catalog
        .vm_size(&node_group.vm_spec_name)
        .ok_or_else(|| ClusterError::SpecNotFound {
            node_group: name.to_string(),
            vm_spec_name: node_group.vm_spec_name.to_string(),
        })?;
    let cores = vm_size.number_of_cores.unwrap_or(0);
    if cores < MIN_VM_SPEC_CORES {
        return Err(ClusterError::SpecTooSmall {
            node_group: name.to_string(),
            vm_spec_name: node_group.vm_spec_name.to_string(),
            cores,
        });
    }

    validate_root_disk(node_group)?;
    validate_sizes(node_group)
}

fn validate_root_disk(node_group: &NodeGroupSpec) -> Result<(), ClusterError> {
    let disk_type = node_group.root_disk_type.as_str();
    if !(disk_type.is_empty() || disk_type == "default" || disk_type.eq_ignore_ascii_case(SUPPORTED_DISK_TYPE)) {
        return Err(ClusterError::UnsupportedDiskType {
            node_group: node_group.iid.name_id.to_string(),
            disk_type: disk_type.to_string(),
        });
    }

    let disk_size = node_group.root_disk_size.as_str();
    if !(disk_size.is_empty() || disk_size == "default") && disk_size.parse::<i32>().is_err() {
        return Err(ClusterError::InvalidDiskSize {
            node_group: node_group.iid.name_id.to_string(),
            disk_size: disk_size.to_string(),
        });
    }

    Ok(())
}

fn validate_sizes(node_group: &NodeGroupSpec) -> Result<(), ClusterError> {
    let name = node_group.iid.name_id.to_string();
    let (desired, min, max) = (
        node_group.desired_node_size,
        node_group.min_node_size,
        node_group.max_node_size,
    );

    if !node_group.on_auto_scaling {
        if min > 0 || max > 0 {
            return Err(ClusterError::MinRequiresAutoscaling { node_group: name });
        }
        return Ok(());
    }

    if min < 1 {
        return Err(ClusterError::AutoscalingRequiresMin { node_group: name });
    }
    if max < min {
        return Err(ClusterError::MaxLessThanMin {
            node_group: name,
            min,
            max,
        });
    }
    if desired < min {
        return Err(ClusterError::DesiredLessThanMin {
            node_group: name,
            desired,
            min,
        });
    }
    if desired > max {
        return Err(ClusterError::DesiredGreaterThanMax {
            node_group: name,
            desired,
            max,
        });
    }
    if max > MAX_NODE_SIZE {
        return Err(ClusterError::MaxTooLarge { node_group: name, max });
    }

    Ok(())
}

/// Bounds given to a resize request.
pub fn check_node_group_scale_valid(desired: i32, min: i32, max: i32) -> Result<(), ClusterError> {
    if min < 1 {
        return Err(ClusterError::ScalingMinBelowOne { min });
    }
    if min > desired {
        return Err(ClusterError::ScalingMinAboveDesired { min, desired });
    }
    if min > max {
        return Err(ClusterError::ScalingMinAboveMax { min, max });
    }
    if desired > max {
        return Err(ClusterError::ScalingDesiredAboveMax { desired, max });
    }

    Ok(())
}
