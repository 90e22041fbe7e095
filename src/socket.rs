use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};

use crate::error::{Error, Result};
use crate::iface::{is_link_local_v6, NetInterface};

/// The standard mDNS port (5353).
pub const MDNS_PORT: u16 = 5353;

/// The IPv4 mDNS multicast group (224.0.0.251).
pub const MDNS_GROUP_V4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);

/// The IPv6 mDNS multicast group (ff02::fb).
pub const MDNS_GROUP_V6: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0xfb);

// Receive buffer size requested for every socket. Bursts of mDNS responses
// on busy networks overflow the default buffer and drop records.
const RECV_BUFFER_SIZE: usize = 1024 * 1024;

// A socket together with its ownership: sockets the engine opened are closed
// when the session tears down (the last Arc drops inside the engine);
// caller-supplied sockets are shared and survive the session.
pub(crate) enum ManagedSocket {
    Owned(UdpSocket),
    Borrowed(Arc<tokio::net::UdpSocket>),
}

impl ManagedSocket {
    // into_async converts the socket for use with the tokio reactor. Must be
    // called within a runtime context.
    pub(crate) fn into_async(self) -> io::Result<Arc<tokio::net::UdpSocket>> {
        match self {
            ManagedSocket::Owned(sock) => Ok(Arc::new(tokio::net::UdpSocket::from_std(sock)?)),
            ManagedSocket::Borrowed(sock) => Ok(sock),
        }
    }
}

// new_reuse_socket opens a nonblocking UDP socket with address and (where
// the platform has it) port reuse, and a widened receive buffer.
fn new_reuse_socket(domain: Domain) -> io::Result<Socket> {
    let sock = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;

    // Other mDNS stacks (Avahi, Bonjour) share the port; reuse is the floor
    // requirement on every platform.
    sock.set_reuse_address(true)?;

    // SO_REUSEPORT exists on most Unixes but not on Windows; where present
    // a failure is advisory only.
    #[cfg(all(unix, not(target_os = "solaris"), not(target_os = "illumos")))]
    if let Err(err) = sock.set_reuse_port(true) {
        log::warn!("failed to set SO_REUSEPORT: {err}");
    }

    if let Err(err) = sock.set_recv_buffer_size(RECV_BUFFER_SIZE) {
        log::warn!("failed to widen receive buffer: {err}");
    }

    sock.set_nonblocking(true)?;
    Ok(sock)
}

// join_multicast_v4 binds an IPv4 socket to the mDNS wildcard address and
// joins the group on every given interface. At least one join must succeed.
pub(crate) fn join_multicast_v4(interfaces: &[NetInterface]) -> Result<UdpSocket> {
    let sock = new_reuse_socket(Domain::IPV4)?;
    let _ = sock.set_multicast_ttl_v4(255);

    let addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, MDNS_PORT).into();
    sock.bind(&addr.into())?;

    let mut joined = 0;
    for iface in interfaces.iter().filter(|i| i.has_v4()) {
        match sock.join_multicast_v4(&MDNS_GROUP_V4, &iface.v4[0]) {
            Ok(()) => joined += 1,
            Err(err) => {
                log::warn!("udp4: join on {} failed: {err}", iface.name);
            }
        }
    }
    if joined == 0 {
        return Err(Error::ErrJoinMulticast { family: "udp4" });
    }

    Ok(sock.into())
}

// join_multicast_v6 is the IPv6 counterpart; groups are joined by interface
// index.
pub(crate) fn join_multicast_v6(interfaces: &[NetInterface]) -> Result<UdpSocket> {
    let sock = new_reuse_socket(Domain::IPV6)?;
    sock.set_only_v6(true)?;
    let _ = sock.set_multicast_hops_v6(255);

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, MDNS_PORT).into();
    sock.bind(&addr.into())?;

    let mut joined = 0;
    for iface in interfaces.iter().filter(|i| i.has_v6()) {
        match sock.join_multicast_v6(&MDNS_GROUP_V6, iface.index) {
            Ok(()) => joined += 1,
            Err(err) => {
                log::warn!("udp6: join on {} failed: {err}", iface.name);
            }
        }
    }
    if joined == 0 {
        return Err(Error::ErrJoinMulticast { family: "udp6" });
    }

    Ok(sock.into())
}

// unicast_listeners binds one socket per eligible interface unicast address.
// Some responders reply directly to the querier instead of the group; these
// sockets catch those replies. Individual bind failures only cost that
// address.
pub(crate) fn unicast_listeners(
    interfaces: &[NetInterface],
    listen_v4: bool,
    listen_v6: bool,
) -> (Vec<UdpSocket>, Vec<UdpSocket>) {
    let mut v4_listeners = vec![];
    let mut v6_listeners = vec![];

    for iface in interfaces {
        if listen_v4 {
            for ip in &iface.v4 {
                if ip.is_loopback() || ip.is_multicast() || ip.is_link_local() {
                    continue;
                }
                match bind_unicast(Domain::IPV4, SocketAddr::from((*ip, MDNS_PORT))) {
                    Ok(sock) => v4_listeners.push(sock),
                    Err(err) => {
                        log::warn!("failed to bind unicast listener on {ip}: {err}");
                    }
                }
            }
        }
        if listen_v6 {
            for ip in &iface.v6 {
                if ip.is_loopback() || ip.is_multicast() || is_link_local_v6(ip) {
                    continue;
                }
                match bind_unicast(Domain::IPV6, SocketAddr::from((*ip, MDNS_PORT))) {
                    Ok(sock) => v6_listeners.push(sock),
                    Err(err) => {
                        log::warn!("failed to bind unicast listener on {ip}: {err}");
                    }
                }
            }
        }
    }

    (v4_listeners, v6_listeners)
}

fn bind_unicast(domain: Domain, addr: SocketAddr) -> io::Result<UdpSocket> {
    let sock = new_reuse_socket(domain)?;
    sock.bind(&addr.into())?;
    Ok(sock.into())
}
