//! RFRain CLI Client
//!
//! Command-line interface for querying and configuring a reader.

use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use rfrain_realtime::{
    Config, Mode, ReadMode, ReaderClient, Result, TagMode, Target, TransportKind,
};
use tracing_subscriber::{fmt, EnvFilter};

/// RFRain CLI
#[derive(Parser, Debug)]
#[command(name = "rfrain-cli")]
#[command(about = "CLI for RFRain realtime readers")]
#[command(version)]
struct Args {
    /// Reader address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:11111")]
    reader: String,

    /// Talk to the reader over UDP instead of TCP
    #[arg(short, long)]
    udp: bool,

    /// Local UDP bind address (defaults to 0.0.0.0:<reader port>)
    #[arg(long)]
    bind: Option<String>,

    /// Per-attempt acknowledgement timeout in milliseconds
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    /// Do not mute tag events around commands
    #[arg(long)]
    no_mute: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show every setting the reader reports
    Info,

    /// Start streaming tag events
    Start,

    /// Stop streaming tag events
    Stop,

    /// Show the reader status (on/stop)
    Status,

    /// Get one setting
    Get {
        #[command(subcommand)]
        setting: Setting,
    },

    /// Change one setting (reader must be stopped)
    Set {
        #[command(subcommand)]
        setting: Assignment,
    },

    /// Start the reader and print tag events
    Watch {
        /// Seconds to watch for
        #[arg(short, long, default_value = "10")]
        secs: u64,

        /// Leave the reader running afterwards
        #[arg(long)]
        keep_running: bool,
    },
}

#[derive(Subcommand, Debug)]
enum Setting {
    Id,
    Identity,
    Mode,
    Region,
    Power,
    Subzones,
    Monitor,
    Target,
    Readmode,
    Tagmode,
    Mute,
}

#[derive(Subcommand, Debug)]
enum Assignment {
    /// Reader and group name
    Identity { reader: String, group: String },

    /// Discover, AutoCheckIn, ServerMode, ServerModeEnhanced or WriteMode
    Mode { mode: Mode },

    /// Transmit power in dBm (10-30)
    Power { level: u8 },

    /// Antenna port (1-4) and its name (up to 8 characters)
    Subzone { port: u8, name: String },

    /// Monitor time in seconds (1-3000)
    Monitor { seconds: u16 },

    /// Target-A, Target-B, Target-AB or Target-BA
    Target { target: Target },

    /// S0, S1, S2 or S3
    Readmode { mode: ReadMode },

    /// EMBEDDED_TID_MEM, EMBEDDED_EPC_TID_MEM or EMBEDDED_ALL
    Tagmode { mode: TagMode },

    /// on or off
    Mute { setting: String },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,rfrain_realtime=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let mut builder = Config::builder()
        .reader_addr(&args.reader)
        .transport(if args.udp { TransportKind::Udp } else { TransportKind::Tcp })
        .ack_timeout_ms(args.timeout_ms)
        .mute_gating(!args.no_mute);
    if let Some(bind) = &args.bind {
        builder = builder.udp_bind_addr(bind);
    }

    if let Err(e) = run(builder.build(), args.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(config: Config, command: Commands) -> Result<()> {
    let client = ReaderClient::new(config)?;
    let version = client.connect()?;
    println!("connected, version: {}", version);

    match command {
        Commands::Info => {
            println!("id:        {}", client.get_id()?);
            let (reader, group) = client.get_identity()?;
            println!("identity:  {} {}", reader, group);
            println!("mode:      {}", client.get_mode()?);
            println!("region:    {}", client.get_region()?);
            println!("power:     {} dBm", client.get_power()?);
            println!("subzones:  {}", client.get_subzones()?.join(", "));
            println!("monitor:   {} s", client.get_monitor()?);
            println!("target:    {}", client.get_target()?);
            println!("readmode:  {}", client.get_read_mode()?);
            println!("tagmode:   {}", client.get_tag_mode()?);
            println!("status:    {}", client.get_status()?);
            println!("muted:     {}", client.get_mute()?);
        }
        Commands::Start => {
            client.start_reader()?;
            println!("reader started");
        }
        Commands::Stop => {
            client.stop_reader()?;
            println!("reader stopped");
        }
        Commands::Status => println!("{}", client.get_status()?),
        Commands::Get { setting } => get(&client, setting)?,
        Commands::Set { setting } => {
            set(&client, setting)?;
            println!("ok");
        }
        Commands::Watch { secs, keep_running } => watch(&client, secs, keep_running)?,
    }

    client.disconnect();
    Ok(())
}

fn get(client: &ReaderClient, setting: Setting) -> Result<()> {
    match setting {
        Setting::Id => println!("{}", client.get_id()?),
        Setting::Identity => {
            let (reader, group) = client.get_identity()?;
            println!("{} {}", reader, group);
        }
        Setting::Mode => println!("{}", client.get_mode()?),
        Setting::Region => println!("{}", client.get_region()?),
        Setting::Power => println!("{} dBm", client.get_power()?),
        Setting::Subzones => {
            for (port, name) in client.get_subzones()?.iter().enumerate() {
                println!("{}: {}", port + 1, name);
            }
        }
        Setting::Monitor => println!("{}", client.get_monitor()?),
        Setting::Target => println!("{}", client.get_target()?),
        Setting::Readmode => println!("{}", client.get_read_mode()?),
        Setting::Tagmode => println!("{}", client.get_tag_mode()?),
        Setting::Mute => println!("{}", if client.get_mute()? { "on" } else { "off" }),
    }
    Ok(())
}

fn set(client: &ReaderClient, assignment: Assignment) -> Result<()> {
    match assignment {
        Assignment::Identity { reader, group } => client.set_identity(&reader, &group),
        Assignment::Mode { mode } => client.set_mode(mode),
        Assignment::Power { level } => client.set_power(level),
        Assignment::Subzone { port, name } => client.set_subzone(port, &name),
        Assignment::Monitor { seconds } => client.set_monitor(seconds),
        Assignment::Target { target } => client.set_target(target),
        Assignment::Readmode { mode } => client.set_read_mode(mode),
        Assignment::Tagmode { mode } => client.set_tag_mode(mode),
        Assignment::Mute { setting } => match setting.as_str() {
            "on" => client.set_mute(true),
            "off" => client.set_mute(false),
            other => Err(rfrain_realtime::ReaderError::Validation(format!(
                "mute must be on or off, got {}",
                other
            ))),
        },
    }
}

fn watch(client: &ReaderClient, secs: u64, keep_running: bool) -> Result<()> {
    let tags = client.tag_channel(1024);
    client.start_reader()?;

    let deadline = Instant::now() + Duration::from_secs(secs);
    let mut seen = 0usize;
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match tags.recv_timeout(remaining) {
            Ok(tag) => {
                seen += 1;
                println!("--- tag {} ---\n{}", seen, tag);
            }
            Err(_) => break,
        }
    }
    println!("{} tag events", seen);

    client.clear_tag_handler();
    if !keep_running {
        client.stop_reader()?;
    }
    Ok(())
}
