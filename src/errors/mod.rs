use crate::services::azure::clients::SdkError;
use std::fmt::{Display, Formatter};
use strum_macros::Display as StrumDisplay;
use thiserror::Error;

/// Conceptual error families, independent from the cloud provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, StrumDisplay)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    RemoteOperation,
    Assembly,
    Rollback,
}

/// A failure that happened after a remote mutation, followed by a failed compensating action.
/// Both errors are kept, primary first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CleanupFailure {
    primary: Box<ClusterError>,
    cleanup: Box<ClusterError>,
}

impl CleanupFailure {
    pub fn new(primary: ClusterError, cleanup: ClusterError) -> Self {
        CleanupFailure {
            primary: Box::new(primary),
            cleanup: Box::new(cleanup),
        }
    }

    pub fn primary(&self) -> &ClusterError {
        &self.primary
    }

    pub fn cleanup(&self) -> &ClusterError {
        &self.cleanup
    }

    /// Component errors in occurrence order.
    pub fn errors(&self) -> Vec<&ClusterError> {
        vec![self.primary.as_ref(), self.cleanup.as_ref()]
    }
}

impl Display for CleanupFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / cleanup also failed: {}", self.primary, self.cleanup)
    }
}

#[derive(Clone, Error, Debug, PartialEq, Eq)]
pub enum ClusterError {
    // request validation
    #[error("Node group list is empty")]
    EmptyNodeGroups,
    #[error("Too many node groups: {count} requested, at most {max} allowed")]
    TooManyNodeGroups { count: usize, max: usize },
    #[error("Node group #{index} has no name")]
    MissingName { index: usize },
    #[error("Node group `{node_group}` has no VM spec name")]
    MissingSpec { node_group: String },
    #[error("Node group `{node_group}` sets an image, managed clusters do not support image designation")]
    ImageNotSupported { node_group: String },
    #[error("Node group `{node_group}` has no SSH key")]
    MissingSshKey { node_group: String },
    #[error("SSH key of node group `{node_group}` differs from the cluster SSH key, all node groups must share it")]
    InconsistentSshKey { node_group: String },
    #[error("VM spec `{vm_spec_name}` of node group `{node_group}` doesn't exist in this location")]
    SpecNotFound { node_group: String, vm_spec_name: String },
    #[error("VM spec `{vm_spec_name}` of node group `{node_group}` has {cores} core(s), at least 2 are required")]
    SpecTooSmall {
        node_group: String,
        vm_spec_name: String,
        cores: i32,
    },
    #[error("Root disk type `{disk_type}` of node group `{node_group}` is not supported, use `default` or `PremiumSSD`")]
    UnsupportedDiskType { node_group: String, disk_type: String },
    #[error("Root disk size `{disk_size}` of node group `{node_group}` is not an integer")]
    InvalidDiskSize { node_group: String, disk_size: String },
    #[error("Node group `{node_group}` enables autoscaling, min node size must be at least 1")]
    AutoscalingRequiresMin { node_group: String },
    #[error("Node group `{node_group}` sets min/max node size, autoscaling must be enabled")]
    MinRequiresAutoscaling { node_group: String },
    #[error("Node group `{node_group}` max node size ({max}) must be greater than or equal to min node size ({min})")]
    MaxLessThanMin { node_group: String, min: i32, max: i32 },
    #[error("Node group `{node_group}` desired node size ({desired}) must be greater than or equal to min node size ({min})")]
    DesiredLessThanMin {
        node_group: String,
        desired: i32,
        min: i32,
    },
    #[error("Node group `{node_group}` desired node size ({desired}) must be lower than or equal to max node size ({max})")]
    DesiredGreaterThanMax {
        node_group: String,
        desired: i32,
        max: i32,
    },
    #[error("Node group `{node_group}` max node size ({max}) must be 1000 or less")]
    MaxTooLarge { node_group: String, max: i32 },
    #[error("Min node size ({min}) must be at least 1 when autoscaling")]
    ScalingMinBelowOne { min: i32 },
    #[error("Min node size ({min}) cannot be greater than desired node size ({desired})")]
    ScalingMinAboveDesired { min: i32, desired: i32 },
    #[error("Min node size ({min}) cannot be greater than max node size ({max})")]
    ScalingMinAboveMax { min: i32, max: i32 },
    #[error("Desired node size ({desired}) cannot be greater than max node size ({max})")]
    ScalingDesiredAboveMax { desired: i32, max: i32 },
    #[error("Kubernetes version `{version}` is not supported, available versions: {}", available.join(", "))]
    UnsupportedKubernetesVersion { version: String, available: Vec<String> },
    #[error("Managed clusters use exactly one subnet, {count} given")]
    MultipleOrZeroSubnets { count: usize },
    #[error("Invalid {resource_kind} IID: both name and system id are empty")]
    InvalidIid { resource_kind: String },
    #[error("Invalid resource id `{resource_id}`: missing `{expected}` segment")]
    InvalidResourceId { resource_id: String, expected: String },
    #[error("Invalid CIDR `{cidr}`: {raw_error_message:?}")]
    InvalidCidr { cidr: String, raw_error_message: String },
    #[error("Every service CIDR candidate (10.0.0.0/16 to 10.255.0.0/16, 172.16.0.0/16 to 172.29.0.0/16) overlaps subnet `{subnet_cidr}`")]
    NoAvailableServiceCidr { subnet_cidr: String },
    #[error("Subnet is not large enough for all node pools: {available} addresses available, {required} required")]
    InsufficientSubnetCapacity { available: i64, required: i64 },
    #[error("Invalid settings field `{field_name}`: {message}")]
    InvalidSettings { field_name: String, message: String },

    // missing resources
    #[error("Cluster `{cluster}` not found")]
    ClusterNotFound { cluster: String },
    #[error("Node group `{node_group}` not found")]
    NodeGroupNotFound { node_group: String },
    #[error("Virtual network `{vpc}` not found")]
    VpcNotFound { vpc: String },
    #[error("Subnet `{subnet}` not found in virtual network `{vpc}`")]
    SubnetNotFound { subnet: String, vpc: String },
    #[error("Security group `{security_group}` not found")]
    SecurityGroupNotFound { security_group: String },
    #[error("SSH key `{key}` not found")]
    SshKeyNotFound { key: String },
    #[error("Cluster `{cluster}` carries no SSH key tag")]
    ClusterSshKeyMissing { cluster: String },

    // state conflicts
    #[error("Node group `{node_group}` already exists")]
    NodeGroupAlreadyExists { node_group: String },
    #[error("Node group `{node_group}` autoscaling is already {}", if *enabled { "enabled" } else { "disabled" })]
    NoOpToggle { node_group: String, enabled: bool },
    #[error("Node group `{node_group}` is currently `{provisioning_state}`, it cannot be changed now")]
    PoolBusy {
        node_group: String,
        provisioning_state: String,
    },
    #[error("Node group `{node_group}` doesn't have autoscaling enabled")]
    AutoscalingDisabled { node_group: String },
    #[error("Cluster `{cluster}` status is `{status}`, it must be Active")]
    ClusterNotActive { cluster: String, status: String },
    #[error("Node group `{node_group}` of cluster `{cluster}` must be Active")]
    NodeGroupNotActive { cluster: String, node_group: String },

    // provider calls
    #[error("Provider call `{operation}` failed: {raw_error_message:?}")]
    RemoteOperation {
        operation: String,
        raw_error_message: String,
    },
    #[error("Gave up waiting for {resource}")]
    WaitTimeout { resource: String },
    #[error("Admission control cannot proceed after several tries")]
    AdmissionControlCannotProceedAfterSeveralTries,

    // read-back
    #[error("Cannot assemble cluster model: {message}")]
    Assembly { message: String },
    #[error("Cannot assemble addon `{addon}`: enabled flag is missing")]
    AddonAssemblyFailed { addon: String },

    #[error("{0}")]
    WithCleanupFailure(CleanupFailure),
}

impl ClusterError {
    pub fn remote(operation: &str, error: SdkError) -> Self {
        ClusterError::RemoteOperation {
            operation: operation.to_string(),
            raw_error_message: error.to_string(),
        }
    }

    pub fn assembly(message: impl Into<String>) -> Self {
        ClusterError::Assembly {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ClusterError::EmptyNodeGroups
            | ClusterError::TooManyNodeGroups { .. }
            | ClusterError::MissingName { .. }
            | ClusterError::MissingSpec { .. }
            | ClusterError::ImageNotSupported { .. }
            | ClusterError::MissingSshKey { .. }
            | ClusterError::InconsistentSshKey { .. }
            | ClusterError::SpecNotFound { .. }
            | ClusterError::SpecTooSmall { .. }
            | ClusterError::UnsupportedDiskType { .. }
            | ClusterError::InvalidDiskSize { .. }
            | ClusterError::AutoscalingRequiresMin { .. }
            | ClusterError::MinRequiresAutoscaling { .. }
            | ClusterError::MaxLessThanMin { .. }
            | ClusterError::DesiredLessThanMin { .. }
            | ClusterError::DesiredGreaterThanMax { .. }
            | ClusterError::MaxTooLarge { .. }
            | ClusterError::ScalingMinBelowOne { .. }
            | ClusterError::ScalingMinAboveDesired { .. }
            | ClusterError::ScalingMinAboveMax { .. }
            | ClusterError::ScalingDesiredAboveMax { .. }
            | ClusterError::UnsupportedKubernetesVersion { .. }
            | ClusterError::MultipleOrZeroSubnets { .. }
            | ClusterError::InvalidIid { .. }
            | ClusterError::InvalidResourceId { .. }
            | ClusterError::InvalidCidr { .. }
            | ClusterError::NoAvailableServiceCidr { .. }
            | ClusterError::InsufficientSubnetCapacity { .. }
            | ClusterError::InvalidSettings { .. } => ErrorKind::Validation,
            ClusterError::ClusterNotFound { .. }
            | ClusterError::NodeGroupNotFound { .. }
            | ClusterError::VpcNotFound { .. }
            | ClusterError::SubnetNotFound { .. }
            | ClusterError::SecurityGroupNotFound { .. }
            | ClusterError::SshKeyNotFound { .. }
            | ClusterError::ClusterSshKeyMissing { .. } => ErrorKind::NotFound,
            ClusterError::NodeGroupAlreadyExists { .. }
            | ClusterError::NoOpToggle { .. }
            | ClusterError::PoolBusy { .. }
            | ClusterError::AutoscalingDisabled { .. }
            | ClusterError::ClusterNotActive { .. }
            | ClusterError::NodeGroupNotActive { .. } => ErrorKind::Conflict,
            ClusterError::RemoteOperation { .. }
            | ClusterError::WaitTimeout { .. }
            | ClusterError::AdmissionControlCannotProceedAfterSeveralTries => ErrorKind::RemoteOperation,
            ClusterError::Assembly { .. } | ClusterError::AddonAssemblyFailed { .. } => ErrorKind::Assembly,
            ClusterError::WithCleanupFailure(_) => ErrorKind::Rollback,
        }
    }
}
