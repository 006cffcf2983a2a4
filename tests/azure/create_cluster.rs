use crate::helpers::azure::{
    FakeAzure, KUBERNETES_VERSION, NODE_SECURITY_GROUP_NAME, RESOURCE_GROUP, cluster_spec, handler,
    handler_with_settings, node_group_spec, node_resource_group, node_security_group_id, security_rule,
    test_settings,
};
use crate::helpers::utilities::engine_run_test;
use function_name::named;
use spider_engine::errors::{ClusterError, ErrorKind};
use spider_engine::io_models::{Iid, KeyValue};
use spider_engine::kubernetes::ClusterHandler;
use spider_engine::models::{ClusterStatus, NodeGroupStatus};
use spider_engine::services::azure::sdk_types::{SecurityGroup, SecurityGroupProperties};

fn rule_priorities(fake: &FakeAzure, cluster_name: &str) -> Vec<(String, String, i32)> {
    let security_group = fake
        .security_group(&node_resource_group(cluster_name), NODE_SECURITY_GROUP_NAME)
        .expect("node security group must exist");
    let mut rules: Vec<(String, String, i32)> = security_group
        .rules()
        .iter()
        .map(|r| {
            (
                r.name.clone().unwrap_or_default(),
                r.direction().unwrap_or_default().to_string(),
                r.priority().unwrap_or_default(),
            )
        })
        .collect();
    rules.sort();
    rules
}

#[test]
#[named]
fn create_cluster_with_undersized_subnet_fails_before_any_mutation() {
    engine_run_test(|| {
        // 110 pods * (5 + 1) nodes = 660 addresses, a /24 only offers 251
        let fake = FakeAzure::with_defaults("10.0.1.0/24");
        let handler = handler(&fake);

        let result = handler.create_cluster(cluster_spec("c1"));

        assert_eq!(
            result,
            Err(ClusterError::InsufficientSubnetCapacity {
                available: 251,
                required: 660,
            })
        );
        assert!(fake.mutations().is_empty());
        assert!(fake.cluster("c1").is_none());

        function_name!().to_string()
    })
}

#[test]
#[named]
fn create_cluster_returns_assembled_cluster() {
    engine_run_test(|| {
        let fake = FakeAzure::with_defaults("10.0.0.0/20");
        let handler = handler(&fake);
        let mut spec = cluster_spec("c1");
        spec.tags = vec![KeyValue::new("env", "dev")];

        let cluster = handler.create_cluster(spec).expect("cluster must be created");

        assert_eq!(cluster.iid.name_id, "c1");
        assert_eq!(cluster.version, KUBERNETES_VERSION);
        assert_eq!(cluster.status, ClusterStatus::Active);
        assert_eq!(cluster.node_groups.len(), 1);

        let node_group = &cluster.node_groups[0];
        assert_eq!(node_group.iid.name_id, "pool1");
        assert_eq!(node_group.desired_node_size, 3);
        assert_eq!((node_group.min_node_size, node_group.max_node_size), (1, 5));
        assert!(node_group.on_auto_scaling);
        assert_eq!(node_group.status, NodeGroupStatus::Active);
        assert_eq!(node_group.vm_spec_name, "Standard_D4s_v3");
        assert_eq!(node_group.nodes.len(), 3);
        assert_eq!(node_group.key_pair_iid.name_id, "k1");

        assert_eq!(cluster.network.vpc_iid.name_id, "vnet-1");
        assert_eq!(
            cluster.network.subnet_iids.iter().map(|s| s.name_id.as_str()).collect::<Vec<_>>(),
            vec!["subnet-1"]
        );
        assert_eq!(
            cluster.network.security_group_iids,
            vec![Iid::new(NODE_SECURITY_GROUP_NAME, &node_security_group_id("c1"))]
        );
        assert_eq!(cluster.addons.get("httpApplicationRouting"), Some("Enabled"));
        assert_eq!(
            cluster.access_info.endpoint,
            "https://c1-dns.hcp.koreacentral.azmk8s.io:443"
        );
        assert!(cluster.created_at.is_some());
        assert!(cluster.key_values.contains(&KeyValue::new("sshkey", "k1")));
        assert!(cluster.tags.contains(&KeyValue::new("env", "dev")));
        assert!(cluster.tags.contains(&KeyValue::new("ownerCluster", "c1")));

        // what was actually sent to the provider
        let stored = fake.cluster("c1").expect("stored cluster");
        let properties = stored.properties.expect("cluster properties");
        let network_profile = properties.network_profile.expect("network profile");
        assert_eq!(network_profile.service_cidr.as_deref(), Some("10.1.0.0/16"));
        assert_eq!(network_profile.dns_service_ip.as_deref(), Some("10.1.0.10"));
        assert_eq!(network_profile.docker_bridge_cidr.as_deref(), Some("172.17.0.1/16"));
        assert_eq!(network_profile.network_plugin.as_deref(), Some("azure"));
        assert_eq!(properties.dns_prefix.as_deref(), Some("c1-dns"));
        assert_eq!(properties.node_resource_group, Some(node_resource_group("c1")));
        assert_eq!(properties.enable_rbac, Some(true));
        assert_eq!(
            properties
                .linux_profile
                .and_then(|l| l.admin_username),
            Some("cb-user".to_string())
        );

        function_name!().to_string()
    })
}

#[test]
#[named]
fn create_cluster_copies_security_rules_onto_node_security_group() {
    engine_run_test(|| {
        let fake = FakeAzure::with_defaults("10.0.0.0/20");
        let handler = handler(&fake);

        handler.create_cluster(cluster_spec("c1")).expect("cluster must be created");

        assert_eq!(
            rule_priorities(&fake, "c1"),
            vec![
                ("egress".to_string(), "Outbound".to_string(), 101),
                ("ssh".to_string(), "Inbound".to_string(), 101),
                ("web".to_string(), "Inbound".to_string(), 700),
            ]
        );

        function_name!().to_string()
    })
}

#[test]
#[named]
fn create_cluster_numbers_copied_rules_after_existing_ones() {
    engine_run_test(|| {
        let fake = FakeAzure::with_defaults("10.0.0.0/20");
        fake.state().security_groups.push((
            node_resource_group("c1"),
            SecurityGroup {
                id: Some(node_security_group_id("c1")),
                name: Some(NODE_SECURITY_GROUP_NAME.to_string()),
                location: None,
                tags: None,
                properties: Some(SecurityGroupProperties {
                    security_rules: Some(vec![security_rule("existing", "Inbound", 300)]),
                }),
            },
        ));
        let handler = handler(&fake);

        handler.create_cluster(cluster_spec("c1")).expect("cluster must be created");

        assert_eq!(
            rule_priorities(&fake, "c1"),
            vec![
                ("egress".to_string(), "Outbound".to_string(), 101),
                ("existing".to_string(), "Inbound".to_string(), 300),
                ("ssh".to_string(), "Inbound".to_string(), 301),
                ("web".to_string(), "Inbound".to_string(), 700),
            ]
        );

        function_name!().to_string()
    })
}

#[test]
#[named]
fn create_cluster_validation_errors_do_not_mutate() {
    engine_run_test(|| {
        let fake = FakeAzure::with_defaults("10.0.0.0/20");
        let handler = handler(&fake);

        let mut unsupported_version = cluster_spec("c1");
        unsupported_version.version = "1.20.0".to_string();
        assert!(matches!(
            handler.create_cluster(unsupported_version),
            Err(ClusterError::UnsupportedKubernetesVersion { .. })
        ));

        let mut no_subnet = cluster_spec("c1");
        no_subnet.network.subnet_iids = vec![];
        assert_eq!(
            handler.create_cluster(no_subnet),
            Err(ClusterError::MultipleOrZeroSubnets { count: 0 })
        );

        let mut two_keys = cluster_spec("c1");
        let mut second = node_group_spec("pool2");
        second.key_pair_iid = Iid::from_name("k2");
        two_keys.node_groups.push(second);
        assert_eq!(
            handler.create_cluster(two_keys),
            Err(ClusterError::InconsistentSshKey {
                node_group: "pool2".to_string()
            })
        );

        let mut small_spec = cluster_spec("c1");
        small_spec.node_groups[0].vm_spec_name = "Standard_B1s".to_string();
        assert!(matches!(
            handler.create_cluster(small_spec),
            Err(ClusterError::SpecTooSmall { .. })
        ));

        let mut unknown_subnet = cluster_spec("c1");
        unknown_subnet.network.subnet_iids = vec![Iid::from_name("subnet-9")];
        assert_eq!(
            handler.create_cluster(unknown_subnet),
            Err(ClusterError::SubnetNotFound {
                subnet: "subnet-9".to_string(),
                vpc: "vnet-1".to_string(),
            })
        );

        assert!(fake.mutations().is_empty());

        function_name!().to_string()
    })
}

#[test]
#[named]
fn failed_rule_copy_deletes_the_new_cluster() {
    engine_run_test(|| {
        let fake = FakeAzure::with_defaults("10.0.0.0/20");
        fake.fail_on("security_rules.create_or_update");
        let handler = handler(&fake);

        let error = handler
            .create_cluster(cluster_spec("c1"))
            .expect_err("rule copy must fail");

        assert_eq!(error.kind(), ErrorKind::RemoteOperation);
        assert!(fake.cluster("c1").is_none());
        assert!(fake.mutations().contains(&"managed_clusters.delete c1".to_string()));

        function_name!().to_string()
    })
}

#[test]
#[named]
fn failed_cleanup_keeps_both_errors() {
    engine_run_test(|| {
        let fake = FakeAzure::with_defaults("10.0.0.0/20");
        fake.fail_on("security_rules.create_or_update");
        fake.fail_on("managed_clusters.delete");
        let handler = handler(&fake);

        let error = handler
            .create_cluster(cluster_spec("c1"))
            .expect_err("rule copy must fail");

        assert_eq!(error.kind(), ErrorKind::Rollback);
        match error {
            ClusterError::WithCleanupFailure(failure) => {
                assert!(matches!(
                    failure.primary(),
                    ClusterError::RemoteOperation { operation, .. } if operation == "security_rules.create_or_update"
                ));
                assert!(matches!(
                    failure.cleanup(),
                    ClusterError::RemoteOperation { operation, .. } if operation == "managed_clusters.delete"
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(fake.cluster("c1").is_some());

        function_name!().to_string()
    })
}

#[test]
#[named]
fn failed_creation_without_cleanup_leaves_the_cluster() {
    engine_run_test(|| {
        let fake = FakeAzure::with_defaults("10.0.0.0/20");
        fake.fail_on("security_rules.create_or_update");
        let mut settings = test_settings();
        settings.cleanup_on_failure = false;
        let handler = handler_with_settings(&fake, settings);

        assert!(handler.create_cluster(cluster_spec("c1")).is_err());
        assert!(fake.cluster("c1").is_some());
        assert!(
            !fake
                .mutations()
                .iter()
                .any(|m| m.starts_with("managed_clusters.delete"))
        );
        assert_eq!(
            fake.state().clusters.iter().filter(|(rg, _)| rg == RESOURCE_GROUP).count(),
            1
        );

        function_name!().to_string()
    })
}
