//! ipheth probe tool
//!
//! Binds an attached iPhone or iPad in tethering mode from userspace, using
//! the same driver core as the kernel-side adaptation, and reports what it
//! finds: hardware address, bulk pipes, carrier state and received frames.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use ipheth_common::{LinkEvent, MonitorBridge, MonitorCommand, create_monitor_bridge, setup_logging};
use ipheth_driver::{IphoneSession, UsbNetDriver};
use ipheth_host::config::{self, HostConfig};
use ipheth_host::usb::{RusbHost, TetherDevice, find_devices, select, spawn_monitor_worker};
use ipheth_protocol::TransferError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "ipheth-probe")]
#[command(
    author,
    version,
    about = "ipheth probe - Bind and monitor iPhone USB tethering from userspace"
)]
#[command(long_about = "
Binds the tethering interface of an attached iPhone or iPad with the ipheth
driver core and reports hardware address, bulk pipes and carrier state.

EXAMPLES:
    # List tethering devices
    ipheth-probe list

    # Bind the first device and print its link details
    ipheth-probe info

    # Watch the carrier until Ctrl+C
    ipheth-probe monitor

    # Dump ten received frames with the alignment pad stripped
    ipheth-probe capture --count 10

    # Pick a device by location
    ipheth-probe --bus 1 --address 7 info

CONFIGURATION:
    The probe looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/ipheth/probe.toml
    3. /etc/ipheth/probe.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<String>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// Bus number of the device to use
    #[arg(long, value_name = "BUS", global = true)]
    bus: Option<u8>,

    /// Address of the device to use
    #[arg(long, value_name = "ADDRESS", global = true)]
    address: Option<u8>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List attached tethering devices
    List,
    /// Bind a device and print its link details
    Info,
    /// Monitor the carrier until interrupted
    Monitor,
    /// Read received frames and print them after rx fixup
    Capture {
        /// Number of frames to capture
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,

        /// Per-read timeout in milliseconds
        #[arg(long, default_value_t = 1000, value_name = "MS")]
        timeout_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = HostConfig::default();
        let path = HostConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = if let Some(ref path) = args.config {
        config::load_config(path).context("Failed to load configuration")?
    } else {
        HostConfig::load_or_default()
    };

    let log_level = args.log_level.as_deref().unwrap_or(&config.host.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("{}", ipheth_host::banner());

    match args.command.unwrap_or(Command::List) {
        Command::List => list_devices_mode(&config),
        Command::Info => {
            let device = find_device(&config, args.bus, args.address)?;
            let reset = config.usb.reset_on_bind;
            tokio::task::spawn_blocking(move || info_mode(device, reset))
                .await
                .context("Info task panicked")?
        }
        Command::Monitor => {
            let device = find_device(&config, args.bus, args.address)?;
            monitor_mode(device, &config).await
        }
        Command::Capture { count, timeout_ms } => {
            let device = find_device(&config, args.bus, args.address)?;
            capture_mode(device, count, Duration::from_millis(timeout_ms)).await
        }
    }
}

fn enumerate(config: &HostConfig) -> Result<Vec<TetherDevice>> {
    let filters = config.extra_filters()?;
    let context = rusb::Context::new().context("Failed to create USB context")?;
    find_devices(&context, &filters).context("Failed to enumerate USB devices")
}

fn find_device(config: &HostConfig, bus: Option<u8>, address: Option<u8>) -> Result<TetherDevice> {
    select(enumerate(config)?, bus, address)
        .ok_or_else(|| anyhow!("No tethering device found (is Personal Hotspot enabled?)"))
}

/// List devices mode - print the devices the driver can bind and exit
fn list_devices_mode(config: &HostConfig) -> Result<()> {
    let devices = enumerate(config)?;

    if devices.is_empty() {
        println!("No tethering devices found.");
        return Ok(());
    }

    println!("Tethering devices:");
    for device in &devices {
        println!("  {}", device);
    }
    println!("\nTotal: {} device(s)", devices.len());
    Ok(())
}

/// Bind, optionally reset, check the carrier once and unbind
fn info_mode(device: TetherDevice, reset_on_bind: bool) -> Result<()> {
    println!("{}", device);

    let mut host = RusbHost::open(device.device).context("Failed to open device")?;
    let mut session = IphoneSession::new();
    session.bind(&mut host).context("Failed to bind device")?;

    let result = (|| -> Result<()> {
        if reset_on_bind {
            session
                .reset(&mut host)
                .context("Failed to select tethering alternate setting")?;
        }

        let carrier = session
            .check_connect(&mut host)
            .context("Carrier check failed")?;

        if let Some(mac) = session.mac_address() {
            println!("  MAC address: {}", mac);
        }
        if let Some(pipes) = session.pipes() {
            println!("  Bulk pipes:  {}", pipes);
        }
        println!("  Carrier:     {}", carrier);
        Ok(())
    })();

    session.unbind(&mut host);
    result
}

/// Run the monitor worker and print link events until Ctrl+C
async fn monitor_mode(device: TetherDevice, config: &HostConfig) -> Result<()> {
    println!("Monitoring {}", device);

    let host = RusbHost::open(device.device).context("Failed to open device")?;
    let (bridge, worker) = create_monitor_bridge();
    let handle = spawn_monitor_worker(host, worker, &config.monitor, config.usb.reset_on_bind)
        .context("Failed to spawn monitor worker thread")?;

    let result = tokio::select! {
        result = print_link_events(&bridge) => result,
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            shutdown_monitor(&bridge).await
        }
    };

    match handle.join() {
        Ok(Ok(_host)) => info!("Monitor worker exited cleanly"),
        Ok(Err(e)) => warn!("Monitor worker stopped: {}", e),
        Err(e) => error!("Monitor worker panicked: {:?}", e),
    }

    result
}

async fn print_link_events(bridge: &MonitorBridge) -> Result<()> {
    loop {
        match bridge.recv_event().await? {
            LinkEvent::Bound { mac, pipes } => println!("bound: {} ({})", mac, pipes),
            LinkEvent::BindFailed { error } => return Err(anyhow!("Bind failed: {}", error)),
            LinkEvent::Carrier { state, changed } => {
                if changed {
                    println!("carrier: {}", state);
                } else {
                    println!("carrier: {} (unchanged)", state);
                }
            }
            LinkEvent::CheckFailed { error, transient } => {
                println!(
                    "carrier check failed{}: {}",
                    if transient { " (transient)" } else { "" },
                    error
                );
            }
            LinkEvent::Unbound => {
                println!("unbound");
                return Ok(());
            }
        }
    }
}

/// Ask the worker to stop and wait for its unbind
async fn shutdown_monitor(bridge: &MonitorBridge) -> Result<()> {
    bridge
        .send_command(MonitorCommand::Shutdown)
        .await
        .context("Failed to send shutdown command")?;

    loop {
        if let LinkEvent::Unbound = bridge.recv_event().await? {
            println!("unbound");
            return Ok(());
        }
    }
}

/// Capture frames on a blocking thread until `count` are read or Ctrl+C
async fn capture_mode(device: TetherDevice, count: usize, timeout: Duration) -> Result<()> {
    let stop = Arc::new(AtomicBool::new(false));

    let mut task = {
        let stop = stop.clone();
        tokio::task::spawn_blocking(move || capture_frames(device, count, timeout, &stop))
    };

    let captured = tokio::select! {
        result = &mut task => result.context("Capture task panicked")??,
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, stopping capture...");
            stop.store(true, Ordering::Relaxed);
            task.await.context("Capture task panicked")??
        }
    };

    println!("Captured {} frame(s)", captured);
    Ok(())
}

fn capture_frames(
    device: TetherDevice,
    count: usize,
    timeout: Duration,
    stop: &AtomicBool,
) -> Result<usize> {
    let mut host = RusbHost::open(device.device).context("Failed to open device")?;
    let mut session = IphoneSession::new();
    session.bind(&mut host).context("Failed to bind device")?;

    let result = (|| -> Result<usize> {
        session
            .reset(&mut host)
            .context("Failed to select tethering alternate setting")?;
        let pipes = session
            .pipes()
            .ok_or_else(|| anyhow!("Session has no bulk pipes"))?;
        let buffer_size = session.protocol().rx_buffer_size;

        let mut captured = 0;
        while captured < count && !stop.load(Ordering::Relaxed) {
            let mut frame = match host.read_frame(pipes.input, buffer_size, timeout) {
                Ok(frame) => frame,
                Err(TransferError::Timeout) => continue,
                Err(e) => return Err(e).context("Bulk read failed"),
            };

            if let Err(e) = session.rx_fixup(&mut frame) {
                warn!("Dropping frame: {}", e);
                continue;
            }

            captured += 1;
            println!("frame {} ({} bytes): {}", captured, frame.len(), hex(&frame));
        }
        Ok(captured)
    })();

    session.unbind(&mut host);
    result
}

fn hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
