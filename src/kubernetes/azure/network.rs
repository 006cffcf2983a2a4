use crate::errors::ClusterError;
use crate::io_models::NodeGroupSpec;
use crate::services::azure::sdk_types::{NETWORK_PLUGIN_AZURE, NetworkProfile, Subnet};
use ipnet::{IpNet, Ipv4Net};
use std::net::Ipv4Addr;

/// Addresses Azure keeps for itself in every subnet.
pub const AZURE_RESERVED_IPS: i64 = 5;

const DOCKER_BRIDGE_ADDRESS: Ipv4Addr = Ipv4Addr::new(172, 17, 0, 1);
const DOCKER_BRIDGE_FALLBACK_ADDRESS: Ipv4Addr = Ipv4Addr::new(172, 18, 0, 1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceNetwork {
    pub service_cidr: Ipv4Net,
    pub dns_service_ip: Ipv4Addr,
    pub docker_bridge_cidr: Ipv4Net,
}

fn parse_ipv4_cidr(cidr: &str) -> Result<Ipv4Net, ClusterError> {
    let invalid = |message: String| ClusterError::InvalidCidr {
        cidr: cidr.to_string(),
        raw_error_message: message,
    };

    match cidr.trim().parse::<IpNet>() {
        Ok(IpNet::V4(net)) => Ok(net.trunc()),
        Ok(IpNet::V6(_)) => Err(invalid("only IPv4 subnets are supported".to_string())),
        Err(e) => Err(invalid(e.to_string())),
    }
}

fn overlaps(a: &Ipv4Net, b: &Ipv4Net) -> bool {
    a.contains(&b.network()) || b.contains(&a.network())
}

/// Service CIDR candidates, in the order they are tried.
pub fn service_cidr_candidates() -> impl Iterator<Item = Ipv4Net> {
    let ten = (0..=255u8).map(|i| Ipv4Addr::new(10, i, 0, 0));
    let one_seven_two = (16..=29u8).map(|i| Ipv4Addr::new(172, i, 0, 0));

    ten.chain(one_seven_two).filter_map(|address| Ipv4Net::new(address, 16).ok())
}

/// Picks the first service CIDR not overlapping the subnet and derives the DNS service IP
/// and docker bridge from it.
pub fn derive_service_network(subnet_cidr: &str) -> Result<ServiceNetwork, ClusterError> {
    let subnet = parse_ipv4_cidr(subnet_cidr)?;

    let service_cidr = service_cidr_candidates()
        .find(|candidate| !overlaps(candidate, &subnet))
        .ok_or_else(|| ClusterError::NoAvailableServiceCidr {
            subnet_cidr: subnet_cidr.to_string(),
        })?;

    let [a, b, c, _] = service_cidr.network().octets();
    let dns_service_ip = Ipv4Addr::new(a, b, c, 10);

    let bridge_address = match service_cidr.contains(&DOCKER_BRIDGE_ADDRESS) {
        true => DOCKER_BRIDGE_FALLBACK_ADDRESS,
        false => DOCKER_BRIDGE_ADDRESS,
    };
    let docker_bridge_cidr = Ipv4Net::new(bridge_address, 16).map_err(|e| ClusterError::InvalidCidr {
        cidr: bridge_address.to_string(),
        raw_error_message: e.to_string(),
    })?;

    Ok(ServiceNetwork {
        service_cidr,
        dns_service_ip,
        docker_bridge_cidr,
    })
}

/// Pessimistic check: every node of every group at its max size gets `max_pods_per_node` pod IPs.
pub fn check_subnet_capacity(
    subnet_cidr: &str,
    ips_in_use: usize,
    node_groups: &[NodeGroupSpec],
    max_pods_per_node: i32,
) -> Result<(), ClusterError> {
    let subnet = parse_ipv4_cidr(subnet_cidr)?;

    let host_bits = 32 - u32::from(subnet.prefix_len());
    let available = 2i64.pow(host_bits) - (AZURE_RESERVED_IPS + ips_in_use as i64);
    let required: i64 = node_groups
        .iter()
        .map(|ng| i64::from(max_pods_per_node) * (i64::from(ng.max_node_size) + 1))
        .sum();

    if available < required {
        return Err(ClusterError::InsufficientSubnetCapacity { available, required });
    }

    Ok(())
}

/// Azure CNI network profile for a cluster living in `subnet`.
pub fn build_network_profile(
    subnet: &Subnet,
    node_groups: &[NodeGroupSpec],
    max_pods_per_node: i32,
) -> Result<NetworkProfile, ClusterError> {
    let properties = subnet.properties.as_ref();
    let subnet_cidr = properties
        .and_then(|p| p.address_prefix.as_deref())
        .ok_or_else(|| ClusterError::InvalidCidr {
            cidr: "".to_string(),
            raw_error_message: format!(
                "subnet `{}` has no address prefix",
                subnet.name.as_deref().unwrap_or_default()
            ),
        })?;
    let ips_in_use = properties
        .and_then(|p| p.ip_configurations.as_ref())
        .map(|c| c.len())
        .unwrap_or(0);

    check_subnet_capacity(subnet_cidr, ips_in_use, node_groups, max_pods_per_node)?;
    let service_network = derive_service_network(subnet_cidr)?;

    Ok(NetworkProfile {
        network_plugin: Some(NETWORK_PLUGIN_AZURE.to_string()),
        network_policy: Some("azure".to_string()),
        service_cidr: Some(service_network.service_cidr.to_string()),
        dns_service_ip: Some(service_network.dns_service_ip.to_string()),
        docker_bridge_cidr: Some(service_network.docker_bridge_cidr.to_string()),
        load_balancer_sku: Some("standard".to_string()),
    })
}
