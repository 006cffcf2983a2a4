use crate::helpers::azure::{FakeAzure, cluster_spec, handler, node_group_spec, ssh_key_id};
use crate::helpers::utilities::engine_run_test;
use function_name::named;
use spider_engine::errors::ClusterError;
use spider_engine::io_models::Iid;
use spider_engine::kubernetes::ClusterHandler;
use spider_engine::kubernetes::azure::AksClusterHandler;
use spider_engine::models::NodeGroupStatus;

fn cluster_with_one_pool() -> (FakeAzure, AksClusterHandler) {
    let fake = FakeAzure::with_defaults("10.0.0.0/20");
    let handler = handler(&fake);
    handler.create_cluster(cluster_spec("c1")).expect("cluster must be created");
    fake.clear_calls();

    (fake, handler)
}

#[test]
#[named]
fn toggling_autoscaling_to_the_current_state_is_refused() {
    engine_run_test(|| {
        let (fake, handler) = cluster_with_one_pool();
        let cluster = Iid::from_name("c1");
        let pool = Iid::from_name("pool1");

        let disabled = handler
            .set_node_group_auto_scaling(&cluster, &pool, false)
            .expect("first toggle must succeed");
        assert!(!disabled.on_auto_scaling);
        assert_eq!((disabled.min_node_size, disabled.max_node_size), (0, 0));

        let mutations = fake.mutations().len();
        assert_eq!(
            handler.set_node_group_auto_scaling(&cluster, &pool, false),
            Err(ClusterError::NoOpToggle {
                node_group: "pool1".to_string(),
                enabled: false,
            })
        );
        assert_eq!(fake.mutations().len(), mutations);

        let enabled = handler
            .set_node_group_auto_scaling(&cluster, &pool, true)
            .expect("toggle back must succeed");
        assert!(enabled.on_auto_scaling);
        assert_eq!(
            (enabled.min_node_size, enabled.desired_node_size, enabled.max_node_size),
            (1, 3, 3)
        );

        function_name!().to_string()
    })
}

#[test]
#[named]
fn toggling_a_busy_pool_is_refused() {
    engine_run_test(|| {
        let (fake, handler) = cluster_with_one_pool();
        fake.set_pool_provisioning_state("c1", "pool1", "Updating");

        assert_eq!(
            handler.set_node_group_auto_scaling(&Iid::from_name("c1"), &Iid::from_name("pool1"), false),
            Err(ClusterError::PoolBusy {
                node_group: "pool1".to_string(),
                provisioning_state: "Updating".to_string(),
            })
        );
        assert!(fake.mutations().is_empty());

        function_name!().to_string()
    })
}

#[test]
#[named]
fn invalid_scaling_is_refused_before_any_remote_call() {
    engine_run_test(|| {
        let (fake, handler) = cluster_with_one_pool();

        assert_eq!(
            handler.change_node_group_scaling(&Iid::from_name("c1"), &Iid::from_name("pool1"), 2, 5, 10),
            Err(ClusterError::ScalingMinAboveDesired { min: 5, desired: 2 })
        );
        assert!(fake.calls().is_empty());

        function_name!().to_string()
    })
}

#[test]
#[named]
fn change_node_group_scaling() {
    engine_run_test(|| {
        let (fake, handler) = cluster_with_one_pool();
        let cluster = Iid::from_name("c1");
        let pool = Iid::from_name("pool1");

        let resized = handler
            .change_node_group_scaling(&cluster, &pool, 4, 2, 8)
            .expect("resize must succeed");
        assert_eq!(
            (resized.desired_node_size, resized.min_node_size, resized.max_node_size),
            (4, 2, 8)
        );
        assert_eq!(resized.nodes.len(), 4);
        assert_eq!(resized.status, NodeGroupStatus::Active);
        assert_eq!(fake.mutations(), vec!["agent_pools.create_or_update pool1".to_string()]);

        handler
            .set_node_group_auto_scaling(&cluster, &pool, false)
            .expect("disabling autoscaling must succeed");
        assert_eq!(
            handler.change_node_group_scaling(&cluster, &pool, 4, 2, 8),
            Err(ClusterError::AutoscalingDisabled {
                node_group: "pool1".to_string()
            })
        );

        function_name!().to_string()
    })
}

#[test]
#[named]
fn add_and_remove_node_group() {
    engine_run_test(|| {
        let (fake, handler) = cluster_with_one_pool();
        let cluster = Iid::from_name("c1");
        let mut spec = node_group_spec("pool2");
        spec.desired_node_size = 2;
        spec.max_node_size = 3;

        let added = handler
            .add_node_group(&cluster, spec.clone())
            .expect("node group must be added");
        assert_eq!(added.iid.name_id, "pool2");
        assert_eq!(added.desired_node_size, 2);
        assert_eq!(added.nodes.len(), 2);
        assert_eq!(added.key_pair_iid.name_id, "k1");

        let node_groups: Vec<String> = handler
            .get_cluster(&cluster)
            .expect("cluster")
            .node_groups
            .into_iter()
            .map(|ng| ng.iid.name_id)
            .collect();
        assert_eq!(node_groups, vec!["pool1".to_string(), "pool2".to_string()]);

        assert_eq!(
            handler.add_node_group(&cluster, spec),
            Err(ClusterError::NodeGroupAlreadyExists {
                node_group: "pool2".to_string()
            })
        );

        // pools are addressable by system id as well
        handler
            .remove_node_group(&cluster, &Iid::from_system_id(&added.iid.system_id))
            .expect("node group must be removed");
        assert!(fake.agent_pool("c1", "pool2").is_none());
        assert_eq!(
            handler.remove_node_group(&cluster, &Iid::from_name("pool2")),
            Err(ClusterError::NodeGroupNotFound {
                node_group: "pool2".to_string()
            })
        );

        function_name!().to_string()
    })
}

#[test]
#[named]
fn added_node_group_must_share_the_cluster_ssh_key() {
    engine_run_test(|| {
        let (fake, handler) = cluster_with_one_pool();
        let cluster = Iid::from_name("c1");

        let mut other_key = node_group_spec("pool2");
        other_key.key_pair_iid = Iid::from_name("k2");
        assert_eq!(
            handler.add_node_group(&cluster, other_key),
            Err(ClusterError::InconsistentSshKey {
                node_group: "pool2".to_string()
            })
        );

        let mut unnamed = node_group_spec("");
        unnamed.iid = Iid::default();
        assert_eq!(
            handler.add_node_group(&cluster, unnamed),
            Err(ClusterError::MissingName { index: 0 })
        );
        assert!(fake.mutations().is_empty());

        let mut by_id = node_group_spec("pool3");
        by_id.key_pair_iid = Iid::from_system_id(&ssh_key_id("k1"));
        handler
            .add_node_group(&cluster, by_id)
            .expect("same key given by id must be accepted");

        function_name!().to_string()
    })
}

#[test]
#[named]
fn node_group_operations_on_unknown_cluster() {
    engine_run_test(|| {
        let (_fake, handler) = cluster_with_one_pool();

        assert_eq!(
            handler.remove_node_group(&Iid::from_name("c9"), &Iid::from_name("pool1")),
            Err(ClusterError::ClusterNotFound {
                cluster: "c9".to_string()
            })
        );
        assert_eq!(
            handler.set_node_group_auto_scaling(&Iid::from_name("c1"), &Iid::from_name("pool9"), false),
            Err(ClusterError::NodeGroupNotFound {
                node_group: "pool9".to_string()
            })
        );

        function_name!().to_string()
    })
}
