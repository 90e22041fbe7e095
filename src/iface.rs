use std::net::{Ipv4Addr, Ipv6Addr};

/// A network interface the engine sends and receives on, with the addresses
/// grouped per IP family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetInterface {
    /// Interface name, e.g. `eth0`.
    pub name: String,
    /// OS interface index; used to join and pin IPv6 multicast.
    pub index: u32,
    /// IPv4 addresses assigned to the interface.
    pub v4: Vec<Ipv4Addr>,
    /// IPv6 addresses assigned to the interface.
    pub v6: Vec<Ipv6Addr>,
}

impl NetInterface {
    pub(crate) fn has_v4(&self) -> bool {
        !self.v4.is_empty()
    }

    pub(crate) fn has_v6(&self) -> bool {
        !self.v6.is_empty()
    }
}

// is_link_local_v6 reports whether ip is a fe80::/10 unicast address.
pub(crate) fn is_link_local_v6(ip: &Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xffc0) == 0xfe80
}

/// list_multicast_interfaces enumerates the host interfaces that are usable
/// for mDNS: configured (up) and not loopback-only. Addresses are grouped
/// per interface name.
pub fn list_multicast_interfaces() -> Vec<NetInterface> {
    let addrs = match if_addrs::get_if_addrs() {
        Ok(addrs) => addrs,
        Err(err) => {
            log::warn!("failed to enumerate network interfaces: {err}");
            return vec![];
        }
    };

    let mut interfaces: Vec<NetInterface> = vec![];
    for addr in addrs {
        if addr.is_loopback() {
            continue;
        }
        let idx = match interfaces.iter().position(|i| i.name == addr.name) {
            Some(idx) => idx,
            None => {
                interfaces.push(NetInterface {
                    name: addr.name.clone(),
                    index: addr.index.unwrap_or(0),
                    ..Default::default()
                });
                interfaces.len() - 1
            }
        };
        let iface = &mut interfaces[idx];
        match addr.ip() {
            std::net::IpAddr::V4(ip) => iface.v4.push(ip),
            std::net::IpAddr::V6(ip) => iface.v6.push(ip),
        }
    }

    interfaces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_local_v6() {
        assert!(is_link_local_v6(&"fe80::1".parse().unwrap()));
        assert!(!is_link_local_v6(&"2001:db8::1".parse().unwrap()));
        assert!(!is_link_local_v6(&"::1".parse().unwrap()));
    }

    #[test]
    fn test_list_multicast_interfaces_no_loopback() {
        for iface in list_multicast_interfaces() {
            assert!(iface.v4.iter().all(|ip| !ip.is_loopback()));
            assert!(iface.v6.iter().all(|ip| !ip.is_loopback()));
        }
    }
}
