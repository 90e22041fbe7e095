//! # mdns-discovery
//!
//! An mDNS / DNS-SD service discovery client engine.
//!
//! The engine sends PTR (browse) or SRV+TXT (lookup) questions to the
//! link-local multicast groups (`224.0.0.251` / `ff02::fb`, port 5353),
//! listens on every usable interface, and correlates the PTR, SRV, TXT, A
//! and AAAA records it receives into [`ServiceEntry`] values delivered on a
//! bounded channel.
//!
//! ## Browsing
//!
//! ```rust,no_run
//! use mdns_discovery::{Discovery, DiscoveryConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> mdns_discovery::Result<()> {
//! let cancel = CancellationToken::new();
//! let discovery = Discovery::new(DiscoveryConfig::default())?;
//! let mut entries = discovery
//!     .browse(cancel.clone(), "_workstation._tcp", "local", &[])
//!     .await?;
//!
//! while let Some(entry) = entries.recv().await {
//!     println!(
//!         "{} at {}:{} {:?}",
//!         entry.instance, entry.host_name, entry.port, entry.addr_ipv4
//!     );
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Browsing runs until the cancellation token fires, re-probing with
//! exponential backoff. A [`lookup`](Discovery::lookup) targets one named
//! instance instead and stops probing once it has been delivered.
//!
//! Entries are delivered at most once per session while alive; a TTL=0
//! goodbye clears the slate so a later re-announcement is delivered again.

#![warn(rust_2018_idioms)]

mod config;
mod engine;
mod error;
mod iface;
pub(crate) mod message;
mod service;
mod socket;

pub use config::{CustomSockets, DiscoveryConfig, IpListen};
pub use engine::Discovery;
pub use error::{Error, Result};
pub use iface::{list_multicast_interfaces, NetInterface};
pub use service::{ServiceEntry, ServiceRecord};
pub use socket::{MDNS_GROUP_V4, MDNS_GROUP_V6, MDNS_PORT};
