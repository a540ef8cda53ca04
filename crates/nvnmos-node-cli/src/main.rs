//! Demo driver for `nvnmos-node`: builds a [`NodeConfig`], starts a
//! [`NmosNode`], adds the two example SDPs from spec scenarios 2 and 4, and
//! activates the sender. Not part of the library's public contract.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use nvnmos_node::config::{AssetTags, NodeConfig};
use nvnmos_node::NmosNode;

const VIDEO_SDP: &str = "v=0\r\n\
o=- 123456 1 IN IP4 192.0.2.10\r\n\
s=sink-0\r\n\
i=Example video flow\r\n\
t=0 0\r\n\
a=x-nvnmos-id:sink-0\r\n\
a=x-nvnmos-group-hint:tag1\r\n\
m=video 5020 RTP/AVP 96\r\n\
c=IN IP4 233.252.0.0/32\r\n\
a=x-nvnmos-iface-ip:192.0.2.10\r\n\
a=x-nvnmos-src-port:5020\r\n\
a=ts-refclk:ptp=IEEE1588-2008:AC-DE-48-23-45-67-01-9F:42\r\n\
a=mediaclk:direct=0\r\n\
a=fmtp:96 sampling=YCbCr-4:2:2; width=1920; height=1080\r\n";

const AUDIO_SDP: &str = "v=0\r\no=- 1 1 IN IP4 192.0.2.10\r\ns=r-0\r\nt=0 0\r\n\
a=x-nvnmos-id:r-0\r\nm=audio 6000 RTP/AVP 97\r\nc=IN IP4 239.1.1.1/32\r\n\
a=x-nvnmos-iface-ip:192.0.2.10\r\na=rtpmap:97 L24/48000/2\r\n";

/// Starts a single NMOS node with two canned resources and lets it run
/// until interrupted.
#[derive(Parser, Debug)]
struct Args {
    /// Seed string IdGen derives every resource UUID from.
    #[arg(long, default_value = "nmos-api.local:8080")]
    seed: String,

    /// Node hostname; a `.local` suffix selects mDNS discovery, anything
    /// else selects unicast DNS-SD.
    #[arg(long, default_value = "nmos-api.local")]
    hostname: String,

    /// HTTP port the NodeAPI listens on.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Host interface address senders/receivers may bind to.
    #[arg(long, default_value = "192.0.2.10")]
    interface: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = NodeConfig {
        hostname: args.hostname,
        host_addresses: vec![args.interface],
        http_port: args.port,
        label: "nvnmos-node demo".to_string(),
        description: "Demo driver instance".to_string(),
        asset_tags: AssetTags {
            manufacturer: "nvnmos".to_string(),
            product: "nvnmos-node".to_string(),
            instance_id: "demo-0".to_string(),
            functions: Vec::new(),
        },
        seed: args.seed,
        initial_senders: vec![VIDEO_SDP.to_string()],
        initial_receivers: vec![AUDIO_SDP.to_string()],
        log_level: nvnmos_node::config::LOG_INFO,
        log_categories: Vec::new(),
    };

    let node = NmosNode::create(
        config,
        |internal_id, sdp| {
            tracing::info!(internal_id, sdp_len = sdp.len(), "activation callback invoked");
        },
        None,
    )
    .context("failed to start nvnmos node")?;

    node.activate("sink-0", VIDEO_SDP).context("failed to activate sink-0")?;

    tracing::info!("node running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await.context("failed to wait for ctrl-c")?;

    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
