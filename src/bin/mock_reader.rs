//! RFRain Mock Reader Binary
//!
//! Runs a reference reader that speaks the realtime protocol over TCP or UDP.

use std::thread;
use std::time::Duration;

use clap::Parser;
use rfrain_realtime::network::MockReader;
use rfrain_realtime::{TagMode, TransportKind};
use tracing_subscriber::{fmt, EnvFilter};

/// RFRain Mock Reader
#[derive(Parser, Debug)]
#[command(name = "rfrain-mock")]
#[command(about = "Reference RFRain reader for local testing")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:11111")]
    listen: String,

    /// Serve over UDP instead of TCP
    #[arg(short, long)]
    udp: bool,

    /// Milliseconds between tag events while started (0 disables them)
    #[arg(short, long, default_value = "3000")]
    tag_interval_ms: u64,

    /// Initial tag mode (EMBEDDED_TID_MEM, EMBEDDED_EPC_TID_MEM, EMBEDDED_ALL)
    #[arg(long, default_value = "EMBEDDED_ALL")]
    tag_mode: TagMode,

    /// Stop after this many seconds (runs until killed when omitted)
    #[arg(short, long)]
    duration_secs: Option<u64>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rfrain_realtime=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();
    let kind = if args.udp { TransportKind::Udp } else { TransportKind::Tcp };
    let interval = (args.tag_interval_ms > 0).then(|| Duration::from_millis(args.tag_interval_ms));

    tracing::info!("RFRain mock reader v{}", rfrain_realtime::VERSION);

    let mock = match MockReader::start_with(kind, &args.listen, interval) {
        Ok(mock) => mock,
        Err(e) => {
            tracing::error!("Failed to start mock reader on {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };
    let tag_mode = args.tag_mode;
    mock.update(|state| state.tag_mode = tag_mode);

    match args.duration_secs {
        Some(secs) => thread::sleep(Duration::from_secs(secs)),
        None => loop {
            thread::sleep(Duration::from_secs(60));
        },
    }

    tracing::info!("Received {} commands", mock.commands().len());
    mock.shutdown();
    tracing::info!("Mock reader stopped");
}
