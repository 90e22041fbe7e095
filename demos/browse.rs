//! Continuous DNS-SD browse.
//!
//! Discovers every instance of a service type on the local link and prints
//! entries as they appear:
//!
//! ```
//! cargo run --example browse -- --service _workstation._tcp
//! ```
//!
//! Use `--service _services._dns-sd._udp` to enumerate the service types
//! advertised on the link instead.

use clap::Parser;
use tokio_util::sync::CancellationToken;

use mdns_discovery::{Discovery, DiscoveryConfig, IpListen};

#[derive(Parser, Debug)]
#[command(name = "browse")]
#[command(about = "Browse the local link for DNS-SD service instances")]
struct Args {
    /// Service type to browse for
    #[arg(long, default_value = "_workstation._tcp")]
    service: String,

    /// Browse domain
    #[arg(long, default_value = "local")]
    domain: String,

    /// Service subtype to restrict the browse to (e.g.
    /// _printer._sub._http._tcp.local.)
    #[arg(long)]
    subtype: Option<String>,

    /// Listen on IPv4 only
    #[arg(long)]
    ipv4_only: bool,

    /// Listen on IPv6 only
    #[arg(long)]
    ipv6_only: bool,

    /// Also listen for unicast replies on each interface address
    #[arg(long)]
    unicast: bool,

    /// Stop after this many seconds (0 = run until interrupted)
    #[arg(long, default_value = "0")]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let listen_on = match (args.ipv4_only, args.ipv6_only) {
        (true, false) => IpListen::V4,
        (false, true) => IpListen::V6,
        _ => IpListen::V4AndV6,
    };

    let config = DiscoveryConfig::default()
        .with_listen_on(listen_on)
        .with_unicast(args.unicast);
    let discovery = Discovery::new(config)?;

    let cancel = CancellationToken::new();
    if args.timeout > 0 {
        let cancel = cancel.clone();
        let timeout = std::time::Duration::from_secs(args.timeout);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            cancel.cancel();
        });
    }

    let subtypes: Vec<String> = args.subtype.into_iter().collect();
    let mut entries = discovery
        .browse(cancel.clone(), &args.service, &args.domain, &subtypes)
        .await?;

    log::info!("browsing for {}.{}.", args.service, args.domain);
    while let Some(entry) = entries.recv().await {
        println!(
            "{instance} -> {host}:{port} v4={v4:?} v6={v6:?} txt={txt:?} ttl={ttl}",
            instance = entry.instance,
            host = entry.host_name,
            port = entry.port,
            v4 = entry.addr_ipv4,
            v6 = entry.addr_ipv6,
            txt = entry.text,
            ttl = entry.ttl,
        );
    }

    Ok(())
}
