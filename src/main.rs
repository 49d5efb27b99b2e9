//! # corridor-traffic CLI
//!
//! Command-line front end for the corridor_traffic library.
//! Samples one point, watches one point, or analyzes a straight-line route.

use clap::{Parser, Subcommand};
use corridor_traffic::format::{format_route_time, format_travel_time};
use corridor_traffic::http::DEFAULT_BASE_URL;
use corridor_traffic::{
    Coordinate, HttpTrafficProvider, MonitorConfig, PollState, PollingController, Result,
    RouteAnalyzer, RouteSummary, TrafficError, TrafficSample, TrafficSampler,
};
use log::{error, info};
use std::sync::Arc;

/// Command-line interface for corridor-traffic
#[derive(Parser)]
#[command(name = "corridor-traffic")]
#[command(about = "Road congestion sampling, monitoring and route analysis")]
#[command(long_about = "Queries a congestion provider and reports change-filtered metrics:
  corridor-traffic sample 28.61 77.21                  # One-shot reading
  corridor-traffic watch 28.61 77.21 --ticks 6         # Monitor, print changes only
  corridor-traffic route 28.60 77.20 28.65 77.25       # Aggregate a route

Configuration:
  --config monitor.json    # {\"poll_interval_ms\": 10000, \"checkpoint_count\": 5, ...}
  --interval-ms / --checkpoints / --timeout-ms override individual fields")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Provider endpoint
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Background refresh interval in milliseconds
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    /// Checkpoints sampled along a route, endpoints included
    #[arg(long, global = true)]
    checkpoints: Option<usize>,

    /// Per-request provider timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch traffic once for a coordinate
    Sample {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
    },
    /// Monitor a coordinate, printing only changed readings
    Watch {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
        /// Stop after this many refresh intervals (default: until Ctrl-C)
        #[arg(long)]
        ticks: Option<u32>,
    },
    /// Analyze congestion along the straight line between two coordinates
    Route {
        #[arg(allow_negative_numbers = true)]
        start_lat: f64,
        #[arg(allow_negative_numbers = true)]
        start_lon: f64,
        #[arg(allow_negative_numbers = true)]
        end_lat: f64,
        #[arg(allow_negative_numbers = true)]
        end_lon: f64,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("❌ Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .init();

    let config = resolve_config(&cli)?;
    let provider = HttpTrafficProvider::new(&cli.base_url, config.provider_timeout())?;
    info!(
        "🚦 corridor-traffic: provider {} (interval {}ms, {} checkpoints)",
        provider.base_url(),
        config.poll_interval_ms,
        config.checkpoint_count
    );

    match cli.command {
        Command::Sample { lat, lon } => {
            let sampler = TrafficSampler::from_config(provider, &config);
            let coord = Coordinate::new(lat, lon);
            info!("[Sample] querying {} (timeout {:?})", coord, sampler.timeout());
            let sample = sampler.sample(coord).await?;
            print_sample(&sample);
        }
        Command::Watch { lat, lon, ticks } => {
            watch(provider, &config, Coordinate::new(lat, lon), ticks).await?;
        }
        Command::Route { start_lat, start_lon, end_lat, end_lon, json } => {
            let analyzer = RouteAnalyzer::from_config(provider, &config);
            let summary = analyzer
                .analyze(Coordinate::new(start_lat, start_lon), Coordinate::new(end_lat, end_lon))
                .await?;
            if json {
                let text = serde_json::to_string_pretty(&summary)
                    .map_err(|e| TrafficError::MalformedResponse(e.to_string()))?;
                println!("{text}");
            } else {
                print_route(&summary);
            }
        }
    }

    Ok(())
}

/// Config file first, then flag overrides.
fn resolve_config(cli: &Cli) -> Result<MonitorConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| TrafficError::InvalidArgument(format!("cannot read {path}: {e}")))?;
            MonitorConfig::from_json_str(&text)?
        }
        None => MonitorConfig::default(),
    };

    if let Some(interval_ms) = cli.interval_ms {
        config.poll_interval_ms = interval_ms;
    }
    if let Some(checkpoints) = cli.checkpoints {
        config.checkpoint_count = checkpoints;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.provider_timeout_ms = timeout_ms;
    }
    config.validate()?;
    Ok(config)
}

async fn watch(
    provider: HttpTrafficProvider,
    config: &MonitorConfig,
    coord: Coordinate,
    ticks: Option<u32>,
) -> Result<()> {
    let sampler = TrafficSampler::from_config(provider, config);
    let observer = Arc::new(|state: &PollState, background: bool| match state {
        PollState::Success(sample) => {
            if background {
                eprintln!("✨ Traffic data updated");
            }
            print_sample(sample);
        }
        PollState::Error(message) => eprintln!("❌ {message}"),
        PollState::Idle | PollState::Loading => {}
    });
    let mut controller = PollingController::with_observer(sampler, observer);

    controller.start_auto_refresh(coord, config.poll_interval()).await?;

    match ticks {
        Some(ticks) => {
            // Land between ticks so the last refresh has had time to finish
            let wait = config.poll_interval() * ticks + config.poll_interval() / 2;
            tokio::time::sleep(wait).await;
        }
        None => {
            tokio::signal::ctrl_c()
                .await
                .map_err(|e| TrafficError::InvalidArgument(format!("cannot listen for Ctrl-C: {e}")))?;
        }
    }

    controller.stop_auto_refresh().await;
    Ok(())
}

fn print_sample(sample: &TrafficSample) {
    let level = sample.live_level();
    println!(
        "[{}] {} | congestion {}% ({}) | {} km/h (free flow {} km/h) | travel {} | road {} | closed: {} | confidence {}% | {} segment points",
        sample.sampled_at.format("%H:%M:%S"),
        sample.coordinate,
        sample.congestion_score,
        level.label,
        sample.current_speed,
        sample.free_flow_speed,
        format_travel_time(sample.current_travel_time),
        sample.road_class,
        if sample.road_closure { "yes" } else { "no" },
        sample.confidence,
        sample.segment_point_count,
    );
}

fn print_route(summary: &RouteSummary) {
    println!(
        "Congestion: {:.0}% ({}, {})",
        summary.average_congestion,
        summary.congestion_level.label,
        summary.congestion_level.tier.color_hex()
    );
    println!("Distance:   {:.2} km", summary.distance_km);
    println!("Time:       {}", format_route_time(summary.estimated_travel_time_min));
    println!("Avg speed:  {:.0} km/h", summary.average_speed);
    println!(
        "Checkpoints: {} usable, {} discarded",
        summary.valid_checkpoint_count, summary.discarded_checkpoint_count
    );
}
