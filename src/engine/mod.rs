pub(crate) mod correlate;

#[cfg(test)]
mod correlate_test;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use socket2::SockRef;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::config::DiscoveryConfig;
use crate::error::{Error, Result};
use crate::iface::{self, NetInterface};
use crate::message::header::Header;
use crate::message::name::Name;
use crate::message::question::Question;
use crate::message::{DnsType, Message, DNSCLASS_INET};
use crate::service::{LookupParams, ServiceEntry, ServiceRecord};
use crate::socket::{self, ManagedSocket, MDNS_GROUP_V4, MDNS_GROUP_V6, MDNS_PORT};
use correlate::Correlator;

// Upper bound of a DNS message the engine accepts over UDP.
const MAX_MESSAGE_SIZE: usize = 65536;

// Capacity of the receiver -> scheduler envelope channel. Receivers
// back-pressure on it rather than buffering unboundedly.
const MESSAGE_CHANNEL_SIZE: usize = 256;

// Capacity of the entry stream handed to the consumer.
const ENTRY_CHANNEL_SIZE: usize = 16;

// Probe cadence: exponential backoff from 4s towards a 60s ceiling, with no
// elapsed-time cap.
const QUERY_INITIAL_INTERVAL: Duration = Duration::from_secs(4);
const QUERY_MAX_INTERVAL: Duration = Duration::from_secs(60);
const QUERY_BACKOFF_MULTIPLIER: f64 = 1.5;

// A parsed DNS message tagged with the datagram source address. Lives only
// on the way from a receiver task to the scheduler.
pub(crate) struct MessageEnvelope {
    pub(crate) msg: Message,
    pub(crate) src: SocketAddr,
}

// The session's sockets after conversion for the tokio reactor, plus the
// interfaces queries fan out over.
struct SessionSockets {
    v4: Option<Arc<UdpSocket>>,
    v6: Option<Arc<UdpSocket>>,
    unicast: Vec<Arc<UdpSocket>>,
    interfaces: Vec<NetInterface>,
}

/// The mDNS/DNS-SD discovery engine.
///
/// `Discovery::new` opens the multicast (and optionally unicast) receivers;
/// [`browse`](Discovery::browse) or [`lookup`](Discovery::lookup) then runs
/// a single discovery session on them. The session owns the sockets: engine-
/// opened sockets are closed when the session tears down, caller-supplied
/// ones (via [`CustomSockets`](crate::CustomSockets)) are left open.
///
/// ```rust,no_run
/// use mdns_discovery::{Discovery, DiscoveryConfig};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn run() -> mdns_discovery::Result<()> {
/// let cancel = CancellationToken::new();
/// let discovery = Discovery::new(DiscoveryConfig::default())?;
/// let mut entries = discovery
///     .browse(cancel.clone(), "_workstation._tcp", "local", &[])
///     .await?;
/// while let Some(entry) = entries.recv().await {
///     println!("{}: {:?}", entry.instance, entry.addr_ipv4);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Discovery {
    v4: Option<ManagedSocket>,
    v6: Option<ManagedSocket>,
    v4_unicast: Vec<ManagedSocket>,
    v6_unicast: Vec<ManagedSocket>,
    interfaces: Vec<NetInterface>,
}

impl Discovery {
    /// Opens the engine's sockets according to `config`.
    ///
    /// A family that cannot join the multicast group on any interface is
    /// logged and disabled; construction fails with
    /// [`Error::ErrTransportUnavailable`] only when no family remains, or
    /// with [`Error::ErrNoInterface`] when interface enumeration comes up
    /// empty.
    pub fn new(config: DiscoveryConfig) -> Result<Self> {
        let interfaces = if config.interfaces.is_empty() {
            iface::list_multicast_interfaces()
        } else {
            config.interfaces.clone()
        };

        if let Some(custom) = config.custom {
            return Ok(Discovery {
                v4: custom.v4_multicast.map(ManagedSocket::Borrowed),
                v6: custom.v6_multicast.map(ManagedSocket::Borrowed),
                v4_unicast: custom
                    .v4_unicast
                    .into_iter()
                    .map(ManagedSocket::Borrowed)
                    .collect(),
                v6_unicast: custom
                    .v6_unicast
                    .into_iter()
                    .map(ManagedSocket::Borrowed)
                    .collect(),
                interfaces,
            });
        }

        if interfaces.is_empty() {
            return Err(Error::ErrNoInterface);
        }

        let v4 = if config.listen_on.v4() {
            match socket::join_multicast_v4(&interfaces) {
                Ok(sock) => Some(ManagedSocket::Owned(sock)),
                Err(err) => {
                    log::warn!("udp4 transport unavailable: {err}");
                    None
                }
            }
        } else {
            None
        };

        let v6 = if config.listen_on.v6() {
            match socket::join_multicast_v6(&interfaces) {
                Ok(sock) => Some(ManagedSocket::Owned(sock)),
                Err(err) => {
                    log::warn!("udp6 transport unavailable: {err}");
                    None
                }
            }
        } else {
            None
        };

        if v4.is_none() && v6.is_none() {
            return Err(Error::ErrTransportUnavailable);
        }

        let (mut v4_unicast, mut v6_unicast) = (vec![], vec![]);
        if config.enable_unicast {
            let (v4_socks, v6_socks) = socket::unicast_listeners(
                &interfaces,
                config.listen_on.v4(),
                config.listen_on.v6(),
            );
            v4_unicast = v4_socks.into_iter().map(ManagedSocket::Owned).collect();
            v6_unicast = v6_socks.into_iter().map(ManagedSocket::Owned).collect();
        }

        Ok(Discovery {
            v4,
            v6,
            v4_unicast,
            v6_unicast,
            interfaces,
        })
    }

    /// Browse continuously for all instances of a service type.
    ///
    /// Entries appear on the returned stream as they are discovered, until
    /// `cancel` fires; periodic probing continues for the whole session.
    /// An empty `domain` defaults to `local`.
    pub async fn browse(
        self,
        cancel: CancellationToken,
        service: &str,
        domain: &str,
        subtypes: &[String],
    ) -> Result<mpsc::Receiver<ServiceEntry>> {
        let record = ServiceRecord::new("", service, default_domain(domain), subtypes);
        self.start_session(cancel, record, true).await
    }

    /// Look up a single named service instance.
    ///
    /// Probing stops after the first matching entry is delivered; the
    /// session keeps receiving (e.g. late AAAA records for a fresh
    /// announcement) until `cancel` fires. An empty `domain` defaults to
    /// `local`.
    pub async fn lookup(
        self,
        cancel: CancellationToken,
        instance: &str,
        service: &str,
        domain: &str,
    ) -> Result<mpsc::Receiver<ServiceEntry>> {
        let record = ServiceRecord::new(instance, service, default_domain(domain), &[]);
        self.start_session(cancel, record, false).await
    }

    async fn start_session(
        self,
        cancel: CancellationToken,
        record: ServiceRecord,
        is_browsing: bool,
    ) -> Result<mpsc::Receiver<ServiceEntry>> {
        // Internal failures unwind via a child token without requiring the
        // caller's token to fire.
        let cancel = cancel.child_token();

        let mut unicast = vec![];
        for sock in self.v4_unicast.into_iter().chain(self.v6_unicast) {
            unicast.push(sock.into_async()?);
        }
        let sockets = Arc::new(SessionSockets {
            v4: self.v4.map(ManagedSocket::into_async).transpose()?,
            v6: self.v6.map(ManagedSocket::into_async).transpose()?,
            unicast,
            interfaces: self.interfaces,
        });

        let (msg_tx, msg_rx) = mpsc::channel(MESSAGE_CHANNEL_SIZE);
        for sock in sockets
            .v4
            .iter()
            .chain(sockets.v6.iter())
            .chain(sockets.unicast.iter())
        {
            tokio::spawn(recv_loop(sock.clone(), msg_tx.clone(), cancel.clone()));
        }
        // The scheduler must observe channel closure when every receiver has
        // exited, not hold it open itself.
        drop(msg_tx);

        let (entry_tx, entry_rx) = mpsc::channel(ENTRY_CHANNEL_SIZE);
        let (stop_tx, stop_rx) = watch::channel(false);
        let params = LookupParams {
            record: record.clone(),
            entries: entry_tx,
            stop_probing: stop_tx,
            is_browsing,
        };

        tokio::spawn(mainloop(cancel.clone(), params, msg_rx));

        // The initial probe runs before returning; a pack failure is the
        // only fatal outcome, per-interface write failures are not.
        if let Err(err) = send_query(&sockets, &record).await {
            cancel.cancel();
            return Err(err);
        }

        let query_cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = periodic_query(query_cancel.clone(), sockets, record, stop_rx).await {
                log::error!("periodic query failed: {err}");
                query_cancel.cancel();
            }
        });

        Ok(entry_rx)
    }
}

fn default_domain(domain: &str) -> &str {
    if domain.is_empty() {
        "local"
    } else {
        domain
    }
}

// recv_loop reads datagrams off one socket, decodes them and forwards the
// envelopes to the scheduler. Exits on cancellation or read error.
async fn recv_loop(
    socket: Arc<UdpSocket>,
    msg_tx: mpsc::Sender<MessageEnvelope>,
    cancel: CancellationToken,
) {
    let mut buf = vec![0u8; MAX_MESSAGE_SIZE];
    loop {
        let (n, src) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            res = socket.recv_from(&mut buf) => match res {
                Ok(v) => v,
                Err(err) => {
                    log::warn!("mdns: socket read failed: {err}");
                    return;
                }
            },
        };

        // Port 5353 sees plenty of traffic that is not well-formed DNS;
        // drop it and keep reading.
        let mut msg = Message::default();
        if let Err(err) = msg.unpack(&buf[..n]) {
            log::warn!("mdns: [{src}] failed to unpack packet: {err}");
            continue;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            res = msg_tx.send(MessageEnvelope { msg, src }) => {
                if res.is_err() {
                    return;
                }
            }
        }
    }
}

// mainloop is the scheduler: it owns the correlator state and is the single
// producer of the consumer's entry stream. Dropping `params` on exit closes
// the stream exactly once.
async fn mainloop(
    cancel: CancellationToken,
    params: LookupParams,
    mut msg_rx: mpsc::Receiver<MessageEnvelope>,
) {
    let mut correlator = Correlator::new(params.record.clone());
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            envelope = msg_rx.recv() => {
                let Some(envelope) = envelope else {
                    // Every receiver has exited; nothing more can arrive.
                    return;
                };
                for entry in correlator.handle_message(&envelope) {
                    if params.entries.send(entry).await.is_err() {
                        // Consumer dropped the stream; the session has no
                        // audience left.
                        cancel.cancel();
                        return;
                    }
                    if !params.is_browsing {
                        params.disable_probing();
                    }
                }
            }
        }
    }
}

// periodic_query re-probes with exponential backoff until the session is
// cancelled or a lookup match stops it.
async fn periodic_query(
    cancel: CancellationToken,
    sockets: Arc<SessionSockets>,
    record: ServiceRecord,
    mut stop_rx: watch::Receiver<bool>,
) -> Result<()> {
    let mut backoff = Backoff::new(QUERY_INITIAL_INTERVAL, QUERY_MAX_INTERVAL);
    loop {
        // With no elapsed-time cap this branch cannot trigger today; it is
        // kept as a hard failure should a cap ever be configured.
        let Some(wait) = backoff.next_interval() else {
            return Err(Error::ErrBackoffExhausted);
        };

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = stop_rx.changed() => return Ok(()),
            _ = cancel.cancelled() => return Ok(()),
        }

        send_query(&sockets, &record).await?;
    }
}

// build_query assembles the question section for the session:
// SRV+TXT for an instance lookup, PTR on the first subtype for a subtype
// browse, PTR on the service name otherwise.
fn build_query(record: &ServiceRecord) -> Result<Vec<u8>> {
    let questions = if !record.instance.is_empty() {
        vec![
            Question {
                name: Name::new(record.service_instance_name())?,
                typ: DnsType::Srv,
                class: DNSCLASS_INET,
            },
            Question {
                name: Name::new(record.service_instance_name())?,
                typ: DnsType::Txt,
                class: DNSCLASS_INET,
            },
        ]
    } else if !record.subtypes.is_empty() {
        vec![Question {
            name: Name::new(&record.subtypes[0])?,
            typ: DnsType::Ptr,
            class: DNSCLASS_INET,
        }]
    } else {
        vec![Question {
            name: Name::new(record.service_name())?,
            typ: DnsType::Ptr,
            class: DNSCLASS_INET,
        }]
    };

    let mut msg = Message {
        // recursion_desired stays cleared: mDNS queries are never recursive.
        header: Header::default(),
        questions,
        ..Default::default()
    };
    msg.pack()
}

// send_query packs the probe once and fans it out over every interface on
// each open family. The egress interface is pinned on the socket before
// each write; pin and write failures cost only that interface.
async fn send_query(sockets: &SessionSockets, record: &ServiceRecord) -> Result<()> {
    let buf = build_query(record)?;

    if let Some(v4) = &sockets.v4 {
        let mut sent = false;
        for iface in sockets.interfaces.iter().filter(|i| i.has_v4()) {
            if let Err(err) = SockRef::from(v4.as_ref()).set_multicast_if_v4(&iface.v4[0]) {
                log::warn!("mdns: failed to pin multicast interface {}: {err}", iface.name);
            }
            match v4.send_to(&buf, (MDNS_GROUP_V4, MDNS_PORT)).await {
                Ok(_) => sent = true,
                Err(err) => {
                    log::warn!("mdns: udp4 send on {} failed: {err}", iface.name);
                }
            }
        }
        if !sent {
            // No interface carried the probe (common with caller-supplied
            // test sockets); a plain send still reaches the default route.
            if let Err(err) = v4.send_to(&buf, (MDNS_GROUP_V4, MDNS_PORT)).await {
                log::warn!("mdns: udp4 send failed: {err}");
            }
        }
    }

    if let Some(v6) = &sockets.v6 {
        let mut sent = false;
        for iface in sockets.interfaces.iter().filter(|i| i.has_v6()) {
            if let Err(err) = SockRef::from(v6.as_ref()).set_multicast_if_v6(iface.index) {
                log::warn!("mdns: failed to pin multicast interface {}: {err}", iface.name);
            }
            match v6.send_to(&buf, (MDNS_GROUP_V6, MDNS_PORT)).await {
                Ok(_) => sent = true,
                Err(err) => {
                    log::warn!("mdns: udp6 send on {} failed: {err}", iface.name);
                }
            }
        }
        if !sent {
            if let Err(err) = v6.send_to(&buf, (MDNS_GROUP_V6, MDNS_PORT)).await {
                log::warn!("mdns: udp6 send failed: {err}");
            }
        }
    }

    Ok(())
}

// Backoff yields successive wait intervals, growing geometrically up to a
// ceiling. next_interval returns None once the optional elapsed-time cap is
// spent.
pub(crate) struct Backoff {
    current: Duration,
    max: Duration,
    max_elapsed: Option<Duration>,
    elapsed: Duration,
}

impl Backoff {
    pub(crate) fn new(initial: Duration, max: Duration) -> Self {
        Backoff {
            current: initial,
            max,
            max_elapsed: None,
            elapsed: Duration::ZERO,
        }
    }

    pub(crate) fn next_interval(&mut self) -> Option<Duration> {
        if let Some(cap) = self.max_elapsed {
            if self.elapsed >= cap {
                return None;
            }
        }
        let wait = self.current;
        self.elapsed += wait;
        self.current = self.current.mul_f64(QUERY_BACKOFF_MULTIPLIER).min(self.max);
        Some(wait)
    }
}
