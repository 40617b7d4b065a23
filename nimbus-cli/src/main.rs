//! NIMBUS CLI
//!
//! Lists OpenStack regions and zones and manages Nova compute services.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use nimbus_cache::CacheConfig;
use nimbus_core::constants::{DEFAULT_SESSION_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS};
use nimbus_core::types::{OsService, State};
use nimbus_core::{AuthFailureSlot, NimbusError};
use nimbus_location::{LocationConfig, LocationModule, MemoizedLocations};
use nimbus_nova::{NovaApi, NovaConfig, OsServicesApi};

/// NIMBUS - OpenStack Nova service management
#[derive(Parser)]
#[command(name = "nimbus")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Pre-issued Keystone token
    #[arg(long, env = "OS_AUTH_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Location config file (JSON)
    #[arg(long, env = "NIMBUS_LOCATIONS", global = true)]
    locations: Option<PathBuf>,

    /// Compute endpoint, used when no location file is given
    #[arg(long, env = "NOVA_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Region id for --endpoint
    #[arg(long = "endpoint-region", env = "NOVA_REGION", default_value = "RegionOne", global = true)]
    endpoint_region: String,

    /// Seconds discovery lookups stay memoized
    #[arg(long, env = "NIMBUS_SESSION_INTERVAL", default_value_t = DEFAULT_SESSION_INTERVAL_SECS, global = true)]
    session_interval: u64,

    /// Request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured regions and their endpoints
    Regions,

    /// List configured zones per region
    Zones,

    /// Manage compute services
    Services {
        #[command(subcommand)]
        action: ServicesCommand,
    },
}

#[derive(Subcommand)]
enum ServicesCommand {
    /// List services
    List {
        /// Region (defaults to the configured default region)
        #[arg(short, long)]
        region: Option<String>,
        /// Only show services on this host
        #[arg(long)]
        host: Option<String>,
        /// Only show this binary
        #[arg(long)]
        binary: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Enable a service
    Enable {
        #[command(flatten)]
        target: ServiceTarget,
    },

    /// Disable a service
    Disable {
        #[command(flatten)]
        target: ServiceTarget,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args)]
struct ServiceTarget {
    /// Host running the service
    #[arg(long)]
    host: String,
    /// Service binary, e.g. nova-compute
    #[arg(long)]
    binary: String,
    /// Region (defaults to the configured default region)
    #[arg(short, long)]
    region: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "nimbus=debug,info"
    } else {
        "nimbus=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let locations = connect_locations(&cli.connection)?;

    let result = match cli.command {
        Commands::Regions => cmd_regions(&locations).await,
        Commands::Zones => cmd_zones(&locations).await,
        Commands::Services { action } => {
            let nova = connect_nova(&cli.connection, locations)?;
            match action {
                ServicesCommand::List { region, host, binary, json } => {
                    cmd_list(&nova, region, host.as_deref(), binary.as_deref(), json).await
                }
                ServicesCommand::Enable { target } => cmd_enable(&nova, target).await,
                ServicesCommand::Disable { target, yes } => cmd_disable(&nova, target, yes).await,
            }
        }
    };

    if let Some(hint) = result.as_ref().err().and_then(failure_hint) {
        eprintln!("{}", hint.red().bold());
    }
    result
}

/// Follow-up advice for failures the user can act on.
fn failure_hint(err: &anyhow::Error) -> Option<&'static str> {
    let err = err.downcast_ref::<NimbusError>()?;
    if err.is_authorization_failure() {
        Some("Authorization denied. Refresh OS_AUTH_TOKEN and retry.")
    } else if err.is_recoverable() {
        Some("Nova is unreachable or overloaded. Retry shortly.")
    } else if matches!(err, NimbusError::ExtensionNotAvailable { .. }) {
        Some("This region does not manage compute services through os-services.")
    } else {
        None
    }
}

fn location_config(args: &ConnectionArgs) -> Result<LocationConfig> {
    if let Some(path) = &args.locations {
        debug!(path = %path.display(), "Loading location config");
        return LocationConfig::from_json_file(path)
            .with_context(|| format!("Failed to load locations from {}", path.display()));
    }

    let Some(endpoint) = &args.endpoint else {
        bail!("No locations configured: pass --locations or --endpoint (NIMBUS_LOCATIONS / NOVA_ENDPOINT)");
    };
    let config = LocationConfig::single_region(&args.endpoint_region, endpoint);
    config.validate().context("Invalid --endpoint")?;
    Ok(config)
}

fn connect_locations(args: &ConnectionArgs) -> Result<MemoizedLocations> {
    let config = location_config(args)?;
    let cache = CacheConfig::with_ttl_seconds(args.session_interval);
    Ok(LocationModule::from_config(config, AuthFailureSlot::new(), &cache))
}

fn connect_nova(args: &ConnectionArgs, locations: MemoizedLocations) -> Result<NovaApi> {
    let token = args
        .token
        .clone()
        .context("No token: pass --token or set OS_AUTH_TOKEN")?;
    let config = NovaConfig::new(token)
        .with_timeout(args.timeout)
        .with_session_interval(args.session_interval);
    NovaApi::new(config, locations).context("Failed to build Nova client")
}

/// Runs `work` behind a spinner.
async fn with_spinner<T>(message: String, work: impl Future<Output = T>) -> Result<T> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message);
    let out = work.await;
    pb.finish_and_clear();
    Ok(out)
}

async fn services_api(nova: &NovaApi, region: Option<String>) -> Result<(String, OsServicesApi)> {
    let region = match region {
        Some(region) => region,
        None => nova.default_region().await.context("No default region configured; pass --region")?,
    };

    let api = with_spinner(
        format!("Discovering extensions in {}...", region),
        nova.require_os_services_api(&region),
    )
    .await??;
    Ok((region, api))
}

/// List regions
async fn cmd_regions(locations: &MemoizedLocations) -> Result<()> {
    let default = locations.implicit_region_id.get().await.ok();

    println!("{}", "Regions:".cyan().bold());
    for region in locations.region_ids.get().await? {
        let uri = locations.region_uri(&region).await?;
        let marker = if default.as_deref() == Some(region.as_str()) {
            " (default)".green().to_string()
        } else {
            String::new()
        };
        println!("   {}{} {}", region.yellow(), marker, uri.as_str().dimmed());
    }

    Ok(())
}

/// List zones
async fn cmd_zones(locations: &MemoizedLocations) -> Result<()> {
    println!("{}", "Zones:".cyan().bold());
    for region in locations.region_ids.get().await? {
        let zones = locations.zones_in(&region).await?;
        println!("   {}", region.yellow());
        if zones.is_empty() {
            println!("      {}", "(none)".dimmed());
        }
        for zone in zones {
            let uri = locations.zone_uri(&zone).await?;
            println!("      {} {}", zone, uri.as_str().dimmed());
        }
    }

    Ok(())
}

/// List services
async fn cmd_list(
    nova: &NovaApi,
    region: Option<String>,
    host: Option<&str>,
    binary: Option<&str>,
    json: bool,
) -> Result<()> {
    let (region, api) = services_api(nova, region).await?;

    let services = with_spinner(format!("Listing services in {}...", region), api.list()).await??;
    let services: Vec<OsService> = services
        .into_iter()
        .filter(|s| host.map_or(true, |h| s.host() == h))
        .filter(|s| binary.map_or(true, |b| s.binary() == b))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&services)?);
        return Ok(());
    }

    if services.is_empty() {
        println!("{}", "No services found.".yellow());
        return Ok(());
    }

    println!("{} {}", "Services in".cyan().bold(), region.cyan().bold());
    println!(
        "   {:<20} {:<24} {:<12} {:<10} {:<6} {}",
        "BINARY".dimmed(),
        "HOST".dimmed(),
        "ZONE".dimmed(),
        "STATUS".dimmed(),
        "STATE".dimmed(),
        "UPDATED".dimmed()
    );
    for service in &services {
        print_service(service);
    }

    Ok(())
}

fn print_service(service: &OsService) {
    let status = if service.status().is_enabled() {
        service.status().value().green()
    } else {
        service.status().value().red()
    };
    let state = match service.state() {
        Some(State::Up) => "up".green(),
        Some(State::Down) => "down".red(),
        Some(State::Unrecognized) | None => "-".dimmed(),
    };
    let updated = service
        .updated()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".into());

    println!(
        "   {:<20} {:<24} {:<12} {:<10} {:<6} {}",
        service.binary(),
        service.host(),
        service.zone().unwrap_or("-"),
        status,
        state,
        updated.dimmed()
    );
}

/// Enable a service
async fn cmd_enable(nova: &NovaApi, target: ServiceTarget) -> Result<()> {
    let (_, api) = services_api(nova, target.region).await?;

    match api.enable(&target.host, &target.binary).await? {
        Some(service) => {
            println!("{} {} on {}", "✅ Enabled".green().bold(), service.binary(), service.host());
        }
        None => bail!("No service {} on host {}", target.binary, target.host),
    }

    Ok(())
}

/// Disable a service
async fn cmd_disable(nova: &NovaApi, target: ServiceTarget, yes: bool) -> Result<()> {
    let (region, api) = services_api(nova, target.region).await?;

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Disable {} on {} in {}? The scheduler will stop placing instances there.",
                target.binary, target.host, region
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("{}", "Aborted.".yellow());
            return Ok(());
        }
    }

    match api.disable(&target.host, &target.binary).await? {
        Some(service) => {
            println!("{} {} on {}", "⛔ Disabled".red().bold(), service.binary(), service.host());
        }
        None => bail!("No service {} on host {}", target.binary, target.host),
    }

    Ok(())
}
