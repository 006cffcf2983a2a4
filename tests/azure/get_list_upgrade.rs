use crate::helpers::azure::{
    FakeAzure, LOCATION, NEXT_KUBERNETES_VERSION, RESOURCE_GROUP, cluster_id, cluster_spec, handler,
    node_resource_group, resource_id,
};
use crate::helpers::utilities::engine_run_test;
use function_name::named;
use spider_engine::errors::ClusterError;
use spider_engine::io_models::{Iid, KeyValue};
use spider_engine::kubernetes::ClusterHandler;
use spider_engine::models::ClusterStatus;
use spider_engine::services::azure::sdk_types::{Subnet, VirtualNetwork, VirtualNetworkProperties};

#[test]
#[named]
fn get_cluster_by_name_or_system_id() {
    engine_run_test(|| {
        let fake = FakeAzure::with_defaults("10.0.0.0/20");
        let handler = handler(&fake);
        let created = handler.create_cluster(cluster_spec("c1")).expect("cluster must be created");

        let by_name = handler.get_cluster(&Iid::from_name("c1")).expect("cluster by name");
        let by_id = handler
            .get_cluster(&Iid::from_system_id(&created.iid.system_id))
            .expect("cluster by system id");

        assert_eq!(created.iid.system_id, cluster_id("c1"));
        assert_eq!(by_name, created);
        assert_eq!(by_id, created);
        assert_eq!(
            handler.get_cluster(&Iid::from_name("c9")),
            Err(ClusterError::ClusterNotFound {
                cluster: "c9".to_string()
            })
        );
        assert_eq!(
            handler.get_cluster(&Iid::default()),
            Err(ClusterError::InvalidIid {
                resource_kind: "managed cluster".to_string()
            })
        );

        function_name!().to_string()
    })
}

#[test]
#[named]
fn list_and_delete_clusters() {
    engine_run_test(|| {
        let fake = FakeAzure::with_defaults("10.0.0.0/20");
        let handler = handler(&fake);
        handler.create_cluster(cluster_spec("c1")).expect("c1 must be created");
        handler.create_cluster(cluster_spec("c2")).expect("c2 must be created");

        let names: Vec<String> = handler
            .list_cluster()
            .expect("clusters")
            .into_iter()
            .map(|c| c.iid.name_id)
            .collect();
        assert_eq!(names, vec!["c1".to_string(), "c2".to_string()]);

        handler.delete_cluster(&Iid::from_name("c1")).expect("c1 must be deleted");
        assert!(fake.cluster("c1").is_none());
        assert_eq!(
            handler.delete_cluster(&Iid::from_name("c1")),
            Err(ClusterError::ClusterNotFound {
                cluster: "c1".to_string()
            })
        );
        assert_eq!(handler.list_cluster().expect("clusters").len(), 1);

        function_name!().to_string()
    })
}

#[test]
#[named]
fn upgrade_cluster() {
    engine_run_test(|| {
        let fake = FakeAzure::with_defaults("10.0.0.0/20");
        let handler = handler(&fake);
        handler.create_cluster(cluster_spec("c1")).expect("cluster must be created");
        let cluster = Iid::from_name("c1");

        assert!(matches!(
            handler.upgrade_cluster(&cluster, "1.20.0"),
            Err(ClusterError::UnsupportedKubernetesVersion { .. })
        ));

        let upgraded = handler
            .upgrade_cluster(&cluster, NEXT_KUBERNETES_VERSION)
            .expect("upgrade must succeed");
        assert_eq!(upgraded.version, NEXT_KUBERNETES_VERSION);
        assert_eq!(upgraded.status, ClusterStatus::Active);
        assert_eq!(upgraded.node_groups.len(), 1);
        assert_eq!(
            fake.cluster("c1")
                .and_then(|c| c.properties)
                .and_then(|p| p.kubernetes_version),
            Some(NEXT_KUBERNETES_VERSION.to_string())
        );

        function_name!().to_string()
    })
}

#[test]
#[named]
fn upgrade_requires_active_cluster_and_node_groups() {
    engine_run_test(|| {
        let fake = FakeAzure::with_defaults("10.0.0.0/20");
        let handler = handler(&fake);
        handler.create_cluster(cluster_spec("c1")).expect("cluster must be created");
        fake.clear_calls();
        let cluster = Iid::from_name("c1");

        for (_, scale_set) in fake.state().scale_sets.iter_mut() {
            if let Some(properties) = scale_set.properties.as_mut() {
                properties.provisioning_state = Some("Updating".to_string());
            }
        }
        assert_eq!(
            handler.upgrade_cluster(&cluster, NEXT_KUBERNETES_VERSION),
            Err(ClusterError::NodeGroupNotActive {
                cluster: "c1".to_string(),
                node_group: "pool1".to_string(),
            })
        );

        for (_, stored) in fake.state().clusters.iter_mut() {
            if let Some(properties) = stored.properties.as_mut() {
                properties.provisioning_state = Some("Upgrading".to_string());
            }
        }
        assert_eq!(
            handler.upgrade_cluster(&cluster, NEXT_KUBERNETES_VERSION),
            Err(ClusterError::ClusterNotActive {
                cluster: "c1".to_string(),
                status: "Updating".to_string(),
            })
        );
        assert!(fake.mutations().is_empty());

        function_name!().to_string()
    })
}

#[test]
#[named]
fn kubenet_cluster_network_comes_from_node_resource_group() {
    engine_run_test(|| {
        let fake = FakeAzure::with_defaults("10.0.0.0/20");
        let handler = handler(&fake);
        handler.create_cluster(cluster_spec("c1")).expect("cluster must be created");

        {
            let mut state = fake.state();
            for (_, stored) in state.clusters.iter_mut() {
                if let Some(network_profile) = stored.properties.as_mut().and_then(|p| p.network_profile.as_mut()) {
                    network_profile.network_plugin = Some("kubenet".to_string());
                }
            }
            let node_rg = node_resource_group("c1");
            let vnet_id = resource_id(&node_rg, "Microsoft.Network/virtualNetworks/aks-vnet-1234");
            state.virtual_networks.push((
                node_rg,
                VirtualNetwork {
                    id: Some(vnet_id.clone()),
                    name: Some("aks-vnet-1234".to_string()),
                    location: Some(LOCATION.to_string()),
                    properties: Some(VirtualNetworkProperties {
                        address_space: None,
                        subnets: Some(vec![Subnet {
                            id: Some(format!("{vnet_id}/subnets/aks-subnet")),
                            name: Some("aks-subnet".to_string()),
                            properties: None,
                        }]),
                    }),
                },
            ));
        }

        let cluster = handler.get_cluster(&Iid::from_name("c1")).expect("cluster");
        assert_eq!(cluster.network.vpc_iid.name_id, "aks-vnet-1234");
        assert_eq!(
            cluster
                .network
                .subnet_iids
                .iter()
                .map(|s| s.name_id.as_str())
                .collect::<Vec<_>>(),
            vec!["aks-subnet"]
        );
        assert!(cluster.network.security_group_iids.is_empty());
        assert_eq!(cluster.network.key_values, vec![KeyValue::new("networkPlugin", "kubenet")]);
        assert!(cluster.iid.system_id.contains(RESOURCE_GROUP));

        function_name!().to_string()
    })
}

#[test]
#[named]
fn tags_are_returned_sorted() {
    engine_run_test(|| {
        let fake = FakeAzure::with_defaults("10.0.0.0/20");
        let handler = handler(&fake);
        let mut spec = cluster_spec("c1");
        spec.tags = vec![KeyValue::new("team", "infra"), KeyValue::new("env", "dev")];

        let cluster = handler.create_cluster(spec).expect("cluster must be created");
        let keys: Vec<&str> = cluster.tags.iter().map(|kv| kv.key.as_str()).collect();
        assert_eq!(keys, vec!["createdAt", "env", "ownerCluster", "sshkey", "team"]);

        let expected = hashmap! {
            "env" => "dev",
            "team" => "infra",
            "ownerCluster" => "c1",
            "sshkey" => "k1",
        };
        for (key, value) in expected {
            assert!(cluster.tags.contains(&KeyValue::new(key, value)), "missing tag {key}");
        }

        function_name!().to_string()
    })
}
