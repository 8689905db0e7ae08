/*
* Translation between an allocated subnet and the network config fragment
* consumed by downstream provisioning.
*
* Both directions are pure.
*/

use super::SUBNET_PREFIX;

use ipnet::{IpNet, Ipv4Net};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::str::FromStr;

// Error handling
use fpnd_error::NetError;
use log::trace;

/// A route entry: the attached subnet, or the default route via the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub target: Ipv4Net,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<Ipv4Addr>,
}

/// Config fragment derived from a subnet.
/// Field names are relied upon by other systems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub net_routes: Vec<Route>,
    /// Peer host interface, e.g. `10.0.0.2/30`.
    pub host: Ipv4Net,
    /// Gateway interface, e.g. `10.0.0.1/30`.
    pub gateway: Ipv4Net,
}

impl NetworkConfig {
    pub fn host_addr(&self) -> Ipv4Addr {
        self.host.addr()
    }
    pub fn gateway_addr(&self) -> Ipv4Addr {
        self.gateway.addr()
    }
    /// The subnet this config was derived from.
    pub fn subnet(&self) -> Ipv4Net {
        self.host.trunc()
    }
    /// Derive a config straight from a cidr string.
    pub fn from_cidr(cidr: &str) -> Result<Self, NetError> {
        subnet_to_config(parse_subnet(cidr)?)
    }
}

/// Parse any cidr string, leaving shape validation to `subnet_to_config`.
pub fn parse_subnet(cidr: &str) -> Result<IpNet, NetError> {
    IpNet::from_str(cidr.trim()).map_err(|_| NetError::InvalidSubnet(cidr.to_owned()))
}

/// Derive the config fragment of a /30 IPv4 network.
/// The first usable host is the gateway, the second one the peer host.
pub fn subnet_to_config<N: Into<IpNet>>(subnet: N) -> Result<NetworkConfig, NetError> {
    let net = match subnet.into() {
        IpNet::V4(net) => net,
        IpNet::V6(net) => return Err(NetError::InvalidSubnet(net.to_string())),
    };
    // Host bits set means an interface, not a network.
    if net.prefix_len() != SUBNET_PREFIX || net.addr() != net.network() {
        return Err(NetError::InvalidSubnet(net.to_string()));
    }

    let mut hosts = net.hosts();
    let (gate_addr, host_addr) = match (hosts.next(), hosts.next()) {
        (Some(gate), Some(host)) => (gate, host),
        _ => return Err(NetError::InvalidSubnet(net.to_string())),
    };
    let gateway = Ipv4Net::new(gate_addr, SUBNET_PREFIX)
        .map_err(|_| NetError::InvalidSubnet(net.to_string()))?;
    let host = Ipv4Net::new(host_addr, SUBNET_PREFIX)
        .map_err(|_| NetError::InvalidSubnet(net.to_string()))?;

    let net_routes = vec![
        Route {
            target: net,
            via: None,
        },
        Route {
            target: Ipv4Net::new_assert(Ipv4Addr::UNSPECIFIED, 0),
            via: Some(gate_addr),
        },
    ];

    trace!("netcfg for {}: host {} gateway {}", net, host, gateway);
    Ok(NetworkConfig {
        net_routes,
        host,
        gateway,
    })
}

/// Recover the subnet a bare host or gateway address belongs to.
pub fn address_to_subnet(addr: &str) -> Result<Ipv4Net, NetError> {
    let trimmed = addr.trim();
    if trimmed.contains('/') {
        return Err(NetError::InvalidAddress(addr.to_owned()));
    }
    let ip = Ipv4Addr::from_str(trimmed).map_err(|_| NetError::InvalidAddress(addr.to_owned()))?;
    host_to_subnet(ip)
}

/// Same as `address_to_subnet` for an already parsed address.
/// Network and broadcast addresses are not valid interface addresses.
pub fn host_to_subnet(ip: Ipv4Addr) -> Result<Ipv4Net, NetError> {
    let iface =
        Ipv4Net::new(ip, SUBNET_PREFIX).map_err(|_| NetError::InvalidAddress(ip.to_string()))?;
    if ip == iface.network() || ip == iface.broadcast() {
        return Err(NetError::InvalidAddress(ip.to_string()));
    }
    Ok(iface.trunc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::pool::partition;
    use ipnet::Ipv6Net;
    use miette::{IntoDiagnostic, Result};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn config_of_first_subnet() -> Result<()> {
        let cfg = NetworkConfig::from_cidr("10.0.0.0/30")?;

        assert_eq!(cfg.gateway_addr(), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(cfg.host_addr(), Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(cfg.host.to_string(), "10.0.0.2/30");
        assert_eq!(cfg.gateway.to_string(), "10.0.0.1/30");

        let value = serde_json::to_value(&cfg).into_diagnostic()?;
        assert_eq!(
            value,
            json!({
                "net_routes": [
                    {"target": "10.0.0.0/30"},
                    {"target": "0.0.0.0/0", "via": "10.0.0.1"}
                ],
                "host": "10.0.0.2/30",
                "gateway": "10.0.0.1/30"
            })
        );
        Ok(())
    }

    #[test]
    fn reject_wrong_shapes() -> Result<()> {
        for cidr in ["10.0.0.0/24", "10.0.0.0/31", "10.0.0.0/32", "10.0.0.1/30", "fd00::/126"] {
            let res = NetworkConfig::from_cidr(cidr);
            assert!(
                matches!(res, Err(NetError::InvalidSubnet(_))),
                "{cidr} should be rejected"
            );
        }
        assert!(matches!(
            parse_subnet("not a subnet"),
            Err(NetError::InvalidSubnet(_))
        ));

        let v6 = Ipv6Net::from_str("fd00::/30").into_diagnostic()?;
        assert!(matches!(
            subnet_to_config(v6),
            Err(NetError::InvalidSubnet(_))
        ));
        Ok(())
    }

    #[test]
    fn host_address_maps_back_to_subnet() -> Result<()> {
        let parent = Ipv4Net::from_str("10.0.0.0/24").into_diagnostic()?;
        for subnet in partition(parent)? {
            let cfg = subnet_to_config(subnet)?;
            assert_eq!(address_to_subnet(&cfg.host_addr().to_string())?, subnet);
            assert_eq!(host_to_subnet(cfg.gateway_addr())?, subnet);
            assert_eq!(cfg.subnet(), subnet);
        }
        Ok(())
    }

    #[test]
    fn reject_non_host_addresses() {
        for addr in ["10.0.0.0", "10.0.0.3", "10.0.0.2/30", "10.0.0", "fd00::2", ""] {
            assert!(
                matches!(address_to_subnet(addr), Err(NetError::InvalidAddress(_))),
                "{addr} should be rejected"
            );
        }
    }
}
