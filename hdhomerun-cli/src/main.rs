use std::io::Write;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hdhomerun_sdk::{
    ChannelFormat, DiscoverMode, DiscoveryOptions, HdHomeRunDevice, HdHomeRunSystem, PollerConfig,
};
use hdhomerun_state::logging::{self, LoggingMode};
use tracing::{info, warn};

mod output;

use output::Format;

/// HDHomeRun command line tool
///
/// Discovers tuners on the local network (or talks to the hosts given with
/// --host), then inspects or controls them.
#[derive(Parser, Debug)]
#[command(name = "hdhomerun")]
#[command(about = "Discover, inspect and control HDHomeRun tuners")]
#[command(version)]
pub struct Args {
    /// Device address to use instead of discovery (repeatable)
    #[arg(long = "host", global = true)]
    pub hosts: Vec<String>,

    /// Discovery mechanism
    #[arg(long, value_enum, default_value_t = Mode::Auto, global = true)]
    pub mode: Mode,

    /// Network interface to send UDP discovery from
    #[arg(long, global = true)]
    pub interface: Option<String>,

    /// Broadcast address for UDP discovery
    #[arg(long, global = true)]
    pub broadcast: Option<IpAddr>,

    /// UDP discovery window in milliseconds
    #[arg(long, default_value = "1000", global = true)]
    pub discovery_timeout: u64,

    /// Device request timeout in milliseconds
    #[arg(long, default_value = "2500", global = true)]
    pub timeout: u64,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text, global = true)]
    pub format: Format,

    /// How tuned channels are shown: name, number or number_name
    #[arg(long, default_value = "name", global = true)]
    pub channel_format: ChannelFormat,

    /// Log to stderr (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List devices on the network
    Discover,
    /// Show names, firmware and lineup of a device
    Info { device: String },
    /// Show what each tuner is doing
    Status { device: String },
    /// Read a control variable, e.g. /tuner0/status
    Get { device: String, name: String },
    /// Write a control variable
    Set {
        device: String,
        name: String,
        value: String,
    },
    /// Restart a device
    Restart { device: String },
    /// Start a channel scan
    Scan {
        device: String,
        /// Channel source, e.g. Antenna or Cable
        source: String,
        /// Follow the scan until it finishes
        #[arg(long)]
        wait: bool,
        /// Seconds between progress checks with --wait
        #[arg(long, default_value = "2")]
        interval: u64,
    },
    /// Poll devices and print changes until interrupted
    Watch {
        /// Only watch this device
        device: Option<String>,
    },
    /// Print a redacted diagnostics snapshot
    Diagnostics { device: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Auto,
    Http,
    Udp,
}

impl From<Mode> for DiscoverMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Auto => DiscoverMode::Auto,
            Mode::Http => DiscoverMode::Http,
            Mode::Udp => DiscoverMode::Udp,
        }
    }
}

impl Args {
    /// Validate command line arguments
    pub fn validate(&self) -> Result<()> {
        if self.discovery_timeout == 0 {
            bail!("Discovery timeout must be positive");
        }

        if self.timeout == 0 {
            bail!("Request timeout must be positive");
        }

        if let Command::Scan { interval: 0, .. } = self.command {
            bail!("Scan interval must be positive");
        }

        Ok(())
    }

    pub fn discovery_options(&self) -> DiscoveryOptions {
        let mut options = DiscoveryOptions::default()
            .with_mode(self.mode.into())
            .with_udp_timeout(Duration::from_millis(self.discovery_timeout))
            .with_http_timeout(Duration::from_millis(self.timeout));
        if let Some(interface) = &self.interface {
            options = options.with_interface(interface.clone());
        }
        if let Some(address) = self.broadcast {
            options = options.with_broadcast_address(address);
        }
        options
    }

    pub fn poller_config(&self) -> PollerConfig {
        let timeout = Duration::from_millis(self.timeout);
        PollerConfig::new()
            .with_timeouts(timeout, timeout)
            .with_channel_format(self.channel_format)
    }

    pub fn logging_mode(&self) -> Option<LoggingMode> {
        match self.verbose {
            0 => None,
            1 => Some(LoggingMode::Development),
            _ => Some(LoggingMode::Debug),
        }
    }
}

/// Run blocking SDK calls off the async runtime
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("Blocking task failed")
}

fn emit(text: Result<String>) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text?.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

async fn open_system(args: &Args) -> Result<Arc<HdHomeRunSystem>> {
    let hosts = args.hosts.clone();
    let discovery = args.discovery_options();
    let config = args.poller_config();

    let system = blocking(move || {
        if hosts.is_empty() {
            info!("Discovering devices...");
            HdHomeRunSystem::discover(discovery, config)
        } else {
            info!("Connecting to {}", hosts.join(", "));
            HdHomeRunSystem::connect(&hosts, discovery, config)
        }
    })
    .await?
    .context("Failed to find devices")?;

    if system.device_ids().is_empty() {
        bail!(
            "No HDHomeRun devices found. Please check:\n\
             - Devices are powered on\n\
             - Devices are on the same network\n\
             - Firewall settings allow UDP port 65001"
        );
    }

    info!("Found {} device(s)", system.device_ids().len());
    Ok(Arc::new(system))
}

fn select(system: &HdHomeRunSystem, key: &str) -> Result<HdHomeRunDevice> {
    system.find(key).ok_or_else(|| {
        anyhow!(
            "Device '{}' not found. Available devices:\n{}",
            key,
            output::device_list(&system.state_store().devices())
        )
    })
}

async fn run(args: Args) -> Result<()> {
    let format = args.format;
    let channel_format = args.channel_format;
    let system = open_system(&args).await?;

    match args.command {
        Command::Discover => {
            let refresh = Arc::clone(&system);
            for (id, e) in blocking(move || refresh.refresh_all()).await? {
                warn!("Could not refresh {}: {}", id, e);
            }
            emit(output::devices(&system.state_store().devices(), format))
        }
        Command::Info { device } => {
            let device = select(&system, &device)?;
            let state = blocking(move || device.gather_details().and_then(|_| device.state()))
                .await?
                .context("Failed to read device details")?;
            emit(output::info(&state, format))
        }
        Command::Status { device } => {
            let device = select(&system, &device)?;
            let state = blocking(move || device.refresh_tuner_status().and_then(|_| device.state()))
                .await?
                .context("Failed to read tuner status")?;
            emit(output::status(&state, channel_format, format))
        }
        Command::Get { device, name } => {
            let device = select(&system, &device)?;
            let variable = name.clone();
            let value = blocking(move || device.get_variable(&variable))
                .await?
                .with_context(|| format!("Failed to read {}", name))?;
            emit(output::variable(&name, &value, format))
        }
        Command::Set { device, name, value } => {
            let device = select(&system, &device)?;
            let variable = name.clone();
            let reported = blocking(move || device.set_variable(&variable, &value))
                .await?
                .with_context(|| format!("Failed to write {}", name))?;
            emit(output::variable(&name, &reported, format))
        }
        Command::Restart { device } => {
            let device = select(&system, &device)?;
            let id = device.id;
            blocking(move || device.restart())
                .await?
                .context("Failed to restart device")?;
            emit(output::message(&format!("Restarting {}", id), format))
        }
        Command::Scan {
            device,
            source,
            wait,
            interval,
        } => {
            let device = select(&system, &device)?;
            scan(device, source, wait, Duration::from_secs(interval), format).await
        }
        Command::Watch { device } => watch(system, device, channel_format, format).await,
        Command::Diagnostics { device } => {
            let device = select(&system, &device)?;
            let snapshot = blocking(move || {
                if let Err(e) = device.gather_details() {
                    warn!("Details refresh failed: {}", e);
                }
                if let Err(e) = device.refresh_tuner_status() {
                    warn!("Tuner status refresh failed: {}", e);
                }
                device.diagnostics()
            })
            .await?
            .context("Failed to build diagnostics")?;
            emit(Ok(format!("{}\n", serde_json::to_string_pretty(&snapshot)?)))
        }
    }
}

async fn scan(
    device: HdHomeRunDevice,
    source: String,
    wait: bool,
    interval: Duration,
    format: Format,
) -> Result<()> {
    let id = device.id;
    let handle = device.clone();
    blocking(move || handle.start_channel_scan(&source))
        .await?
        .context("Failed to start channel scan")?;

    if !wait {
        return emit(output::message(&format!("Channel scan started on {}", id), format));
    }

    let mut follower = ScanFollower::default();
    loop {
        tokio::time::sleep(interval).await;
        let handle = device.clone();
        let started = follower.started;
        let state = blocking(move || {
            // Until the device reports the scan, re-read the lineup status in full
            let refreshed = if started {
                handle.refresh_scan_progress()
            } else {
                handle.gather_details()
            };
            refreshed.and_then(|_| handle.state())
        })
        .await?
        .context("Failed to read scan progress")?;

        let scanning = state.channel_scanning() == Some(true);
        match follower.observe(scanning, state.scan_progress) {
            ScanStep::Waiting => {}
            ScanStep::Running(progress) => {
                if format == Format::Text {
                    emit(Ok(format!("Scanning {}: {}%\n", id, progress)))?;
                }
            }
            ScanStep::Finished => {
                let found = state.channel_counts().total;
                return emit(output::message(
                    &format!("Channel scan finished on {}: {} channel(s)", id, found),
                    format,
                ));
            }
        }
    }
}

/// Checks allowed before a scan that never showed up counts as finished
const SCAN_START_CHECKS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanStep {
    /// The device has not reported the scan yet
    Waiting,
    Running(u8),
    Finished,
}

/// Tracks `scan --wait` across progress checks
#[derive(Debug, Default)]
struct ScanFollower {
    started: bool,
    checks: u32,
}

impl ScanFollower {
    fn observe(&mut self, scanning: bool, progress: Option<u8>) -> ScanStep {
        self.checks += 1;
        if scanning {
            self.started = true;
            ScanStep::Running(progress.unwrap_or(0))
        } else if self.started || self.checks >= SCAN_START_CHECKS {
            ScanStep::Finished
        } else {
            ScanStep::Waiting
        }
    }
}

async fn watch(
    system: Arc<HdHomeRunSystem>,
    device: Option<String>,
    channel_format: ChannelFormat,
    format: Format,
) -> Result<()> {
    if let Some(key) = device {
        let keep = select(&system, &key)?.id;
        for id in system.device_ids().into_iter().filter(|id| *id != keep) {
            system.remove_device(&id);
        }
    }

    let store = system.state_store().clone();
    for id in store.device_ids() {
        store.watch_all(&id);
    }
    system.start_polling()?;
    info!("Watching {} device(s), press Ctrl+C to stop", store.len());

    let stop = Arc::new(AtomicBool::new(false));
    let printer = {
        let stop = Arc::clone(&stop);
        let events = store.iter();
        tokio::task::spawn_blocking(move || -> Result<()> {
            while !stop.load(Ordering::Relaxed) {
                let Some(event) = events.recv_timeout(Duration::from_millis(250)) else {
                    continue;
                };
                if let Some(state) = store.device(&event.device_id) {
                    emit(output::change(&event, &state, channel_format, format))?;
                }
            }
            Ok(())
        })
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    info!("Stopping");
    stop.store(true, Ordering::Relaxed);
    system.stop_polling();

    printer.await.context("Event printer failed")?
}

fn init_logging(args: &Args) -> Result<()> {
    let result = match args.logging_mode() {
        Some(mode) => logging::init_logging(mode),
        None => logging::init_logging_from_env(),
    };
    result.context("Failed to initialize logging")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    args.validate()?;
    init_logging(&args)?;
    run(args).await
}
