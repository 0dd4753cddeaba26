//! envsig CLI
//!
//! Environmental hazard signals for Bangladesh, aggregated from public
//! upstreams and served through a short-lived cache.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use envsig_core::{BoundingBox, Severity, SignalKind, SignalPoint, Summary};
use envsig_runtime::{CacheState, Engine, EngineConfig, Nearby, Snapshot};

#[derive(Parser)]
#[command(name = "envsig")]
#[command(author, version, about = "envsig: environmental hazard signal aggregation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "ENVSIG_CONFIG")]
    config: Option<PathBuf>,

    /// Serve synthetic data instead of calling upstreams
    #[arg(long, global = true)]
    synthetic: bool,

    /// Print JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    /// Verbosity level (0-3)
    #[arg(short, long, global = true, default_value = "1")]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Every current signal with a summary
    All,

    /// Signals of one kind (seismic, thermal, hydrological, soil)
    Kind { kind: SignalKind },

    /// Signals inside a latitude/longitude box
    #[command(allow_negative_numbers = true)]
    Bounds {
        south: f64,
        west: f64,
        north: f64,
        east: f64,
    },

    /// Signals in a named region, e.g. Dhaka
    Region { name: String },

    /// Signals inside the country boundary
    Country,

    /// Signals near a position
    #[command(allow_negative_numbers = true)]
    Near {
        latitude: f64,
        longitude: f64,

        /// Search radius in km; without it only the nearest signal is shown
        #[arg(short, long)]
        radius: Option<f64>,
    },

    /// Run a new aggregation cycle regardless of cache age
    Refresh,

    /// Summary counts, optionally for one kind
    Stats {
        #[arg(short, long)]
        kind: Option<SignalKind>,
    },

    /// List configured providers
    Providers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if cli.synthetic {
        config = config.with_synthetic();
    }

    let engine = Engine::from_config(&config)?;
    let output = Output { json: cli.json };

    match cli.command {
        Commands::All => output.snapshot(&engine.get_all().await)?,
        Commands::Refresh => output.snapshot(&engine.refresh().await)?,
        Commands::Kind { kind } => {
            let cached = is_cached(&engine);
            output.points(&engine.get_by_kind(kind).await, cached)?
        }
        Commands::Bounds {
            south,
            west,
            north,
            east,
        } => {
            let bounds = BoundingBox::new(south, west, north, east)?;
            let cached = is_cached(&engine);
            output.points(&engine.get_in_bounds(bounds).await, cached)?
        }
        Commands::Region { name } => {
            if engine.regions().get(&name).is_none() {
                let known: Vec<&str> = engine.regions().iter().map(|r| r.name.as_str()).collect();
                eprintln!("Unknown region '{}'. Known regions: {}", name, known.join(", "));
            }
            let cached = is_cached(&engine);
            output.points(&engine.get_by_region(&name).await, cached)?
        }
        Commands::Country => {
            let cached = is_cached(&engine);
            output.points(&engine.get_within_boundary().await, cached)?
        }
        Commands::Near {
            latitude,
            longitude,
            radius,
        } => {
            let cached = is_cached(&engine);
            let nearby = match radius {
                Some(km) => engine.get_within_radius((latitude, longitude), km).await,
                None => engine
                    .nearest((latitude, longitude))
                    .await
                    .into_iter()
                    .collect(),
            };
            output.nearby(&nearby, cached)?
        }
        Commands::Stats { kind } => {
            let snapshot = engine.get_all().await;
            let summary = match kind {
                Some(kind) => {
                    let points: Vec<SignalPoint> = snapshot
                        .points
                        .iter()
                        .filter(|p| p.is_kind(kind))
                        .cloned()
                        .collect();
                    Engine::stats(&points)
                }
                None => snapshot.summary,
            };
            output.summary(&summary)?
        }
        Commands::Providers => {
            for provider in engine.providers() {
                println!(
                    "{:<14} {:<14} {}",
                    provider.name(),
                    provider.kind().to_string(),
                    provider.source()
                );
            }
        }
    }

    Ok(())
}

fn is_cached(engine: &Engine) -> bool {
    let state = engine.cache_state();
    debug!("Cache is {} before query", state);
    state == CacheState::Fresh
}

struct Output {
    json: bool,
}

impl Output {
    fn snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(snapshot)?);
            return Ok(());
        }

        print_points(&snapshot.points);
        println!();
        print_summary(&snapshot.summary);

        let age = chrono::Utc::now() - snapshot.captured_at;
        println!(
            "\nCaptured {} ({}s ago){}{}",
            snapshot.captured_at.format("%Y-%m-%d %H:%M:%S UTC"),
            age.num_seconds(),
            if snapshot.cached { ", from cache" } else { "" },
            if snapshot.degraded { ", DEGRADED" } else { "" },
        );
        for failure in &snapshot.errors {
            println!("  {} failed: {}", failure.provider, failure.error);
        }
        Ok(())
    }

    fn points(&self, points: &[SignalPoint], cached: bool) -> Result<()> {
        if self.json {
            let body = serde_json::json!({ "points": points, "cached": cached });
            println!("{}", serde_json::to_string_pretty(&body)?);
        } else {
            print_points(points);
            println!("\n{} signals", points.len());
        }
        Ok(())
    }

    fn nearby(&self, nearby: &[Nearby], cached: bool) -> Result<()> {
        if self.json {
            let body = serde_json::json!({ "points": nearby, "cached": cached });
            println!("{}", serde_json::to_string_pretty(&body)?);
            return Ok(());
        }

        for n in nearby {
            print!("{:>8.1} km  ", n.distance_km);
            print_point(&n.point);
        }
        if nearby.is_empty() {
            println!("No signals found");
        }
        Ok(())
    }

    fn summary(&self, summary: &Summary) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(summary)?);
        } else {
            print_summary(summary);
        }
        Ok(())
    }
}

fn print_points(points: &[SignalPoint]) {
    let mut sorted: Vec<&SignalPoint> = points.iter().collect();
    sorted.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.id.cmp(&b.id)));
    for point in sorted {
        print_point(point);
    }
}

fn print_point(point: &SignalPoint) {
    println!(
        "{:<8} {:<12} {:>8.2} {:<3} {:>8.4},{:<9.4} {}",
        point.severity.to_string(),
        point.kind.to_string(),
        point.value,
        point.kind.unit(),
        point.latitude,
        point.longitude,
        point.description
    );
}

fn print_summary(summary: &Summary) {
    println!("Total: {}", summary.total);
    let tiers: Vec<String> = Severity::ALL
        .iter()
        .rev()
        .map(|s| format!("{} {}", summary.severity(*s), s))
        .collect();
    println!("  By severity: {}", tiers.join(", "));
    let kinds: Vec<String> = SignalKind::ALL
        .iter()
        .map(|k| format!("{} {}", summary.kind(*k), k))
        .collect();
    println!("  By kind: {}", kinds.join(", "));
    let sources: Vec<String> = summary
        .by_source
        .iter()
        .map(|(source, count)| format!("{} {}", count, source))
        .collect();
    println!("  By source: {}", sources.join(", "));
}
