//! One-shot DNS-SD instance lookup.
//!
//! Resolves a single named service instance and exits once it has been
//! delivered:
//!
//! ```
//! cargo run --example lookup -- --instance "Office Printer" --service _ipp._tcp
//! ```

use std::time::Duration;

use clap::Parser;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use mdns_discovery::{Discovery, DiscoveryConfig};

#[derive(Parser, Debug)]
#[command(name = "lookup")]
#[command(about = "Resolve a single DNS-SD service instance")]
struct Args {
    /// Instance name to resolve
    #[arg(long)]
    instance: String,

    /// Service type of the instance
    #[arg(long, default_value = "_workstation._tcp")]
    service: String,

    /// Browse domain
    #[arg(long, default_value = "local")]
    domain: String,

    /// Give up after this many seconds
    #[arg(long, default_value = "10")]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let discovery = Discovery::new(DiscoveryConfig::default())?;

    let cancel = CancellationToken::new();
    let mut entries = discovery
        .lookup(cancel.clone(), &args.instance, &args.service, &args.domain)
        .await?;

    log::info!(
        "looking up {}.{}.{}.",
        args.instance,
        args.service,
        args.domain
    );

    let result = timeout(Duration::from_secs(args.timeout), entries.recv()).await;
    cancel.cancel();

    match result {
        Ok(Some(entry)) => {
            println!(
                "{instance} -> {host}:{port} v4={v4:?} v6={v6:?} txt={txt:?}",
                instance = entry.instance,
                host = entry.host_name,
                port = entry.port,
                v4 = entry.addr_ipv4,
                v6 = entry.addr_ipv6,
                txt = entry.text,
            );
            Ok(())
        }
        Ok(None) => Err("entry stream closed unexpectedly".into()),
        Err(_) => Err(format!("no answer within {} seconds", args.timeout).into()),
    }
}
