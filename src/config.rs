use std::sync::Arc;

use tokio::net::UdpSocket;

use crate::iface::NetInterface;

/// IP families the engine listens on.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpListen {
    /// IPv4 only.
    V4,
    /// IPv6 only.
    V6,
    /// Both families. Note that typical mDNS responses carried over IPv4
    /// still contain both A and AAAA records, so this does not filter the
    /// kind of addresses a `ServiceEntry` resolves to.
    #[default]
    V4AndV6,
}

impl IpListen {
    pub(crate) fn v4(&self) -> bool {
        matches!(self, IpListen::V4 | IpListen::V4AndV6)
    }

    pub(crate) fn v6(&self) -> bool {
        matches!(self, IpListen::V6 | IpListen::V4AndV6)
    }
}

/// Pre-built sockets supplied by the caller.
///
/// Sockets handed in here are borrowed: the engine receives on them for the
/// lifetime of a session but never closes them, so the caller can manage
/// their lifecycle (and must keep its own `Arc` clones alive for as long as
/// it wants them open).
#[derive(Default, Clone)]
pub struct CustomSockets {
    /// IPv4 multicast receiver, bound to the mDNS port.
    pub v4_multicast: Option<Arc<UdpSocket>>,
    /// IPv6 multicast receiver, bound to the mDNS port.
    pub v6_multicast: Option<Arc<UdpSocket>>,
    /// Per-interface IPv4 unicast receivers.
    pub v4_unicast: Vec<Arc<UdpSocket>>,
    /// Per-interface IPv6 unicast receivers.
    pub v6_unicast: Vec<Arc<UdpSocket>>,
}

/// Configuration for [`Discovery`](crate::Discovery). Read-only once the
/// engine is constructed.
///
/// ```rust
/// use mdns_discovery::{DiscoveryConfig, IpListen};
///
/// let config = DiscoveryConfig::default()
///     .with_listen_on(IpListen::V4)
///     .with_unicast(true);
/// ```
#[derive(Default, Clone)]
pub struct DiscoveryConfig {
    /// IP families to open multicast receivers for. Default: both.
    pub listen_on: IpListen,

    /// Interfaces to send and receive on. Empty means every usable
    /// multicast interface on the host.
    pub interfaces: Vec<NetInterface>,

    /// Also bind a unicast receiver on each interface address, for
    /// responders that reply directly instead of via the multicast group.
    /// Default: off.
    pub enable_unicast: bool,

    /// Caller-supplied sockets. When set, the engine uses these instead of
    /// opening its own and will not close them on teardown.
    pub custom: Option<CustomSockets>,
}

impl DiscoveryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the IP families to listen on.
    pub fn with_listen_on(mut self, listen_on: IpListen) -> Self {
        self.listen_on = listen_on;
        self
    }

    /// Restrict the engine to the given interfaces.
    pub fn with_interfaces(mut self, interfaces: Vec<NetInterface>) -> Self {
        self.interfaces = interfaces;
        self
    }

    /// Enable or disable the per-interface unicast receivers.
    pub fn with_unicast(mut self, enable: bool) -> Self {
        self.enable_unicast = enable;
        self
    }

    /// Use caller-managed sockets instead of opening new ones.
    pub fn with_custom_sockets(mut self, custom: CustomSockets) -> Self {
        self.custom = Some(custom);
        self
    }
}
