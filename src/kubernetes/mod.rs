use crate::errors::ClusterError;
use crate::io_models::{ClusterSpec, Iid, NodeGroupSpec};
use crate::models::{Cluster, NodeGroup};

pub mod azure;

/// Managed Kubernetes operations every cloud driver exposes.
/// Calls are blocking and return once the provider reports completion.
pub trait ClusterHandler: Send + Sync {
    fn create_cluster(&self, cluster_spec: ClusterSpec) -> Result<Cluster, ClusterError>;
    fn list_cluster(&self) -> Result<Vec<Cluster>, ClusterError>;
    fn get_cluster(&self, cluster_iid: &Iid) -> Result<Cluster, ClusterError>;
    fn delete_cluster(&self, cluster_iid: &Iid) -> Result<(), ClusterError>;

    fn add_node_group(&self, cluster_iid: &Iid, node_group_spec: NodeGroupSpec) -> Result<NodeGroup, ClusterError>;
    fn set_node_group_auto_scaling(
        &self,
        cluster_iid: &Iid,
        node_group_iid: &Iid,
        on: bool,
    ) -> Result<NodeGroup, ClusterError>;
    fn change_node_group_scaling(
        &self,
        cluster_iid: &Iid,
        node_group_iid: &Iid,
        desired_node_size: i32,
        min_node_size: i32,
        max_node_size: i32,
    ) -> Result<NodeGroup, ClusterError>;
    fn remove_node_group(&self, cluster_iid: &Iid, node_group_iid: &Iid) -> Result<(), ClusterError>;

    fn upgrade_cluster(&self, cluster_iid: &Iid, new_version: &str) -> Result<Cluster, ClusterError>;
}
