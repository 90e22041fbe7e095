use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use tokio::sync::{mpsc, watch};

// trim_dot strips leading and trailing dots from a DNS label sequence.
pub(crate) fn trim_dot(s: &str) -> &str {
    s.trim_matches('.')
}

/// ServiceRecord identifies a DNS-SD service class: the service type (e.g.
/// `_workstation._tcp`), the domain (almost always `local`) and, for a
/// targeted lookup, the instance name.
///
/// The derived FQDNs are computed once at construction:
///
/// - service name: `<service>.<domain>.`
/// - service instance name: `<instance>.<service>.<domain>.` (empty when no
///   instance is set)
/// - service type name: `_services._dns-sd._udp.<domain>.` (the DNS-SD
///   service-type enumeration name)
#[derive(Debug, Clone)]
pub struct ServiceRecord {
    /// Instance name, empty when browsing a whole service type.
    pub instance: String,
    /// Service type, e.g. `_workstation._tcp`.
    pub service: String,
    /// Browse domain, e.g. `local`.
    pub domain: String,
    /// Optional service subtypes; only the first is queried.
    pub subtypes: Vec<String>,

    // Cached derived names.
    service_name: String,
    service_instance_name: String,
    service_type_name: String,
}

impl ServiceRecord {
    pub fn new(instance: &str, service: &str, domain: &str, subtypes: &[String]) -> Self {
        let service_name = format!("{}.{}.", trim_dot(service), trim_dot(domain));
        let service_instance_name = if instance.is_empty() {
            String::new()
        } else {
            format!("{}.{}", trim_dot(instance), service_name)
        };
        let service_type_name = format!("_services._dns-sd._udp.{}.", trim_dot(domain));

        ServiceRecord {
            instance: instance.to_owned(),
            service: service.to_owned(),
            domain: domain.to_owned(),
            subtypes: subtypes.to_vec(),
            service_name,
            service_instance_name,
            service_type_name,
        }
    }

    /// `<service>.<domain>.`
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// `<instance>.<service>.<domain>.`, or empty when no instance is set.
    pub fn service_instance_name(&self) -> &str {
        &self.service_instance_name
    }

    /// `_services._dns-sd._udp.<domain>.`
    pub fn service_type_name(&self) -> &str {
        &self.service_type_name
    }
}

/// ServiceEntry is a discovered service instance, assembled from the PTR,
/// SRV, TXT and A/AAAA records seen for it.
#[derive(Debug, Clone, Default)]
pub struct ServiceEntry {
    /// Instance name with the service suffix removed, e.g. `Office Printer`.
    pub instance: String,
    /// Service type, e.g. `_workstation._tcp`.
    pub service: String,
    /// Browse domain.
    pub domain: String,
    /// Target host FQDN from the SRV record, with trailing dot.
    pub host_name: String,
    /// Service port from the SRV record.
    pub port: u16,
    /// TXT record strings, in wire order.
    pub text: Vec<String>,
    /// Record time-to-live in seconds; always non-zero on delivery.
    pub ttl: u32,
    /// Resolved IPv4 addresses.
    pub addr_ipv4: Vec<Ipv4Addr>,
    /// Resolved IPv6 addresses.
    pub addr_ipv6: Vec<Ipv6Addr>,

    // Source address of the datagram that carried the SRV record, used as a
    // fallback when no A/AAAA record arrives.
    pub(crate) src_addr: Option<IpAddr>,
}

impl ServiceEntry {
    pub(crate) fn new(instance: &str, service: &str, domain: &str) -> Self {
        ServiceEntry {
            instance: instance.to_owned(),
            service: service.to_owned(),
            domain: domain.to_owned(),
            ..Default::default()
        }
    }
}

// LookupParams is the per-session context: the record being matched, the
// consumer's entry stream and the probe-stop signal. It is owned by the
// scheduler task; dropping it closes the entry stream.
pub(crate) struct LookupParams {
    pub(crate) record: ServiceRecord,
    pub(crate) entries: mpsc::Sender<ServiceEntry>,
    pub(crate) stop_probing: watch::Sender<bool>,
    pub(crate) is_browsing: bool,
}

impl LookupParams {
    // disable_probing tells the periodic-query activity that a match has
    // been delivered. Idempotent.
    pub(crate) fn disable_probing(&self) {
        let _ = self.stop_probing.send(true);
    }
}
