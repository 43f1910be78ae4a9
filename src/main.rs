use anyhow::{bail, Context, Result};
use athena_monitor::entities::{binary_sensor_states, sensor_states};
use athena_monitor::{AthenaConfig, MonitorEvent, MonitorRuntime, PrinterClient, PrinterCommand, SENSORS};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "athena-monitor")]
#[command(about = "Monitor and control an Athena II resin 3D printer")]
#[command(version)]
#[command(long_about = "Polls an Athena II printer's HTTP API for status and analytic metrics, \
exposes them as normalized sensor values, captures rotated camera stills and sends print \
control commands. Can also serve everything over a small local HTTP API.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "athena.toml", global = true, help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, global = true, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, global = true, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, global = true, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", global = true, help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Printer host, overriding the configuration file
    #[arg(long, global = true)]
    host: Option<String>,

    /// Printer port, overriding the configuration file
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Validate configuration, check the printer answers, and exit
    #[arg(long, help = "Validate configuration and probe the printer, then exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh once and print every sensor
    Status,
    /// Poll continuously and log each snapshot until interrupted
    Watch,
    /// Save one rotated camera frame
    Snapshot {
        #[arg(short, long, default_value = "athena.jpg")]
        output: PathBuf,
    },
    /// Send a print control command
    Command {
        /// pause_print, resume_print, cancel_print, set_auto_shutdown, start_print, shutdown or reboot
        name: String,
        /// Plate to print (start_print)
        #[arg(long)]
        plate_id: Option<String>,
        /// Enable or disable auto shutdown (set_auto_shutdown)
        #[arg(long)]
        enabled: Option<String>,
    },
    /// Check that the printer is reachable
    Probe,
    /// Poll continuously and serve the local HTTP API
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting Athena monitor v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let mut config = AthenaConfig::load_from_file(&args.config).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;
    if let Some(host) = &args.host {
        config.printer.host = host.clone();
    }
    if let Some(port) = args.port {
        config.printer.port = port;
    }

    if args.validate_config {
        std::process::exit(validate_config(&config).await);
    }

    let exit_code = match args.command.unwrap_or(Command::Watch) {
        Command::Status => run_status(config).await?,
        Command::Watch => run_watch(config).await?,
        Command::Snapshot { output } => run_snapshot(config, output).await?,
        Command::Command {
            name,
            plate_id,
            enabled,
        } => run_command(config, &name, plate_id.or(enabled)).await?,
        Command::Probe => run_probe(&config).await?,
        Command::Serve => run_serve(config).await?,
    };

    info!("Athena monitor exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

async fn validate_config(config: &AthenaConfig) -> i32 {
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        return 1;
    }
    println!("✓ Configuration is valid");

    match run_probe(config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("✗ {}", e);
            1
        }
    }
}

async fn run_probe(config: &AthenaConfig) -> Result<i32> {
    config.validate()?;
    let client = PrinterClient::new(&config.printer)?;

    match client.probe(config.polling.status_timeout()).await {
        Ok(info) => {
            println!(
                "✓ Connected to {} at {} (firmware {})",
                info.hostname,
                client.base_url(),
                info.version
            );
            Ok(0)
        }
        Err(e) if e.is_connectivity() => {
            eprintln!("✗ Cannot connect to {}: {}", client.base_url(), e);
            Ok(1)
        }
        Err(e) => {
            eprintln!("✗ Invalid response from {}: {}", client.base_url(), e);
            Ok(1)
        }
    }
}

async fn run_status(config: AthenaConfig) -> Result<i32> {
    let runtime = MonitorRuntime::new(config)?;
    let coordinator = runtime.coordinator();

    if let Err(e) = coordinator.refresh().await {
        eprintln!("✗ {}", e);
        return Ok(1);
    }

    let snapshot = coordinator.snapshot();
    let available = coordinator.is_available();
    let device = runtime
        .dispatcher()
        .registry()
        .get(runtime.device_id())
        .map(|device| device.device_info());

    if let Some(device) = device {
        println!(
            "{} [{} {}, firmware {}]",
            device.name,
            device.manufacturer,
            device.model,
            device.sw_version.as_deref().unwrap_or("unknown")
        );
    }

    let width = SENSORS.iter().map(|d| d.name.len()).max().unwrap_or(0);
    for state in sensor_states(snapshot.as_deref(), available) {
        let unit = state.unit.map(|u| format!(" {}", u)).unwrap_or_default();
        if state.value.is_unknown() {
            println!("{:width$}  {}", state.name, state.value, width = width);
        } else {
            println!("{:width$}  {}{}", state.name, state.value, unit, width = width);
        }
    }
    for state in binary_sensor_states(snapshot.as_deref(), available) {
        println!(
            "{:width$}  {}",
            state.name,
            if state.is_on { "on" } else { "off" },
            width = width
        );
    }

    Ok(0)
}

async fn run_watch(config: AthenaConfig) -> Result<i32> {
    let mut runtime = MonitorRuntime::new(config)?;
    let mut events = runtime.events().subscribe();

    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(MonitorEvent::SnapshotUpdated { snapshot }) => {
                    let progress = SENSORS
                        .iter()
                        .find(|d| d.key == "print_progress")
                        .map(|d| d.value(&snapshot).to_string())
                        .unwrap_or_default();
                    info!(
                        status = %snapshot.status(),
                        progress = %progress,
                        fields = snapshot.len(),
                        "Snapshot updated"
                    );
                }
                Ok(event) => info!("{}", event.description()),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("Event listener lagged, {} events dropped", missed);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    runtime.start_polling().await;
    runtime.run_until_shutdown().await;
    Ok(runtime.shutdown().await)
}

async fn run_snapshot(config: AthenaConfig, output: PathBuf) -> Result<i32> {
    let runtime = MonitorRuntime::new(config)?;

    let Some(jpeg) = runtime.camera().get_image().await else {
        eprintln!("✗ No camera frame could be captured");
        return Ok(1);
    };

    tokio::fs::write(&output, jpeg.as_slice())
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("✓ Saved {} bytes to {}", jpeg.len(), output.display());
    Ok(0)
}

async fn run_command(config: AthenaConfig, name: &str, argument: Option<String>) -> Result<i32> {
    let command = PrinterCommand::parse(name, argument.as_deref())?;
    let runtime = MonitorRuntime::new(config)?;

    match runtime
        .dispatcher()
        .execute(runtime.device_id(), &command)
        .await
    {
        Ok(()) => {
            println!("✓ {} sent", command.service_name());
            Ok(0)
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            Ok(1)
        }
    }
}

#[cfg(feature = "server")]
async fn run_serve(config: AthenaConfig) -> Result<i32> {
    let mut runtime = MonitorRuntime::new(config)?;
    runtime.start_polling().await;
    runtime.start_server()?;
    runtime.run_until_shutdown().await;
    Ok(runtime.shutdown().await)
}

#[cfg(not(feature = "server"))]
async fn run_serve(_config: AthenaConfig) -> Result<i32> {
    bail!("This build does not include the local API server (enable the `server` feature)")
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Determine log level based on flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("athena_monitor={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") | None => fmt::layer()
            .compact()
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => bail!("Unknown log format '{}' (expected json, pretty or compact)", format),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    let mut config = AthenaConfig::default();
    config.printer.host = "192.168.1.50".to_string();

    println!("# Athena monitor configuration file");
    println!("# Every value can be overridden with ATHENA_<SECTION>__<KEY>, e.g. ATHENA_PRINTER__HOST");
    println!("# rotation: Upright, Rotate90, Rotate180 or Rotate270");
    println!();
    println!("{}", config.to_toml()?);
    Ok(())
}
