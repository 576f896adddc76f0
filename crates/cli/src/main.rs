//! JVM Triage CLI
//!
//! A command-line tool for finding bottlenecks in a fleet of JVM services
//! from Prometheus metrics and Pyroscope profiles.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use triage_lib::{
    Diagnoser, MetricsSource, ProfileKind, ProfileSource, PrometheusClient, PyroscopeClient,
    Section,
};

use commands::{bottleneck, diagnose, diff, fleet, health, hotspots, triage};

const DEFAULT_PROMETHEUS_URL: &str = "http://localhost:9090";
const DEFAULT_PYROSCOPE_URL: &str = "http://localhost:4040";

/// JVM Triage CLI
#[derive(Parser)]
#[command(name = "jvmt")]
#[command(author, version, about = "Bottleneck triage for JVM services", long_about = None)]
pub struct Cli {
    /// Prometheus URL (can also be set via PROMETHEUS_URL env var)
    #[arg(long, env = "PROMETHEUS_URL", global = true)]
    pub prometheus_url: Option<String>,

    /// Pyroscope URL (can also be set via PYROSCOPE_URL env var)
    #[arg(long, env = "PYROSCOPE_URL", global = true)]
    pub pyroscope_url: Option<String>,

    /// Treat Prometheus as unreachable
    #[arg(long, global = true)]
    pub no_prometheus: bool,

    /// Treat Pyroscope as unreachable
    #[arg(long, global = true)]
    pub no_pyroscope: bool,

    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check JVM health (CPU, heap, GC, threads) of every service
    Health,

    /// Classify the root-cause bottleneck of every service
    Bottleneck {
        /// Only this service (container or profiling name)
        #[arg(long, short)]
        service: Option<String>,

        /// Cutoff overrides, e.g. "cpu=0.4 latency_ms=800"
        #[arg(long)]
        threshold: Option<String>,
    },

    /// Rank hotspots in a flamebearer render response
    Hotspots {
        /// Render response file (reads stdin if not specified)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Number of functions to show
        #[arg(long, default_value_t = 20)]
        top: usize,

        /// Unit of the profile values
        #[arg(long, value_enum, default_value = "samples")]
        unit: hotspots::Unit,

        /// Package prefix of application code
        #[arg(long, env = "JVMT_APP_PREFIX")]
        app_prefix: Option<String>,

        /// Only show application code
        #[arg(long)]
        user_code: bool,

        /// Only show functions starting with this prefix
        #[arg(long)]
        filter: Option<String>,
    },

    /// Diagnose an application from its profiles alone
    Triage {
        /// Profiling application name
        app: String,

        /// Profile types to inspect
        #[arg(long, default_value = "cpu,alloc")]
        types: String,

        /// Number of top functions per profile type
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Window start (epoch seconds, default one hour ago)
        #[arg(long)]
        from: Option<i64>,

        /// Window end (epoch seconds, default now)
        #[arg(long)]
        until: Option<i64>,
    },

    /// Compare a baseline window with the current window
    Diff {
        /// Profiling application name
        app: String,

        /// Profile type
        #[arg(long = "type", default_value = "cpu")]
        kind: ProfileKind,

        /// Baseline window start (epoch seconds)
        #[arg(long)]
        baseline_from: i64,

        /// Baseline window end (epoch seconds)
        #[arg(long)]
        baseline_until: i64,

        /// Current window start (epoch seconds, default one hour ago)
        #[arg(long)]
        from: Option<i64>,

        /// Current window end (epoch seconds, default now)
        #[arg(long)]
        until: Option<i64>,

        /// Maximum number of changed functions
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Rank functions that are hot across the fleet
    Fleet {
        /// Profile type
        #[arg(long = "type", default_value = "cpu")]
        kind: ProfileKind,

        /// Maximum number of functions
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Combined report: JVM health, HTTP traffic, profile hotspots and alerts
    Diagnose {
        /// Sections to collect: all, or a comma list of health,http,profiles,alerts
        #[arg(long, default_value = "all")]
        section: String,

        /// Only this service (container or profiling name)
        #[arg(long, short)]
        service: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Build the backend clients; flags win over the config file
fn build_diagnoser(cli: &Cli, config: &config::Config) -> Result<Diagnoser> {
    let metrics: Option<Arc<dyn MetricsSource>> = if cli.no_prometheus {
        None
    } else {
        let url = cli
            .prometheus_url
            .as_deref()
            .or(config.prometheus_url.as_deref())
            .unwrap_or(DEFAULT_PROMETHEUS_URL);
        Some(Arc::new(
            PrometheusClient::new(url).context("Invalid Prometheus URL")?,
        ))
    };

    let profiles: Option<Arc<dyn ProfileSource>> = if cli.no_pyroscope {
        None
    } else {
        let url = cli
            .pyroscope_url
            .as_deref()
            .or(config.pyroscope_url.as_deref())
            .unwrap_or(DEFAULT_PYROSCOPE_URL);
        Some(Arc::new(
            PyroscopeClient::new(url).context("Invalid Pyroscope URL")?,
        ))
    };

    Ok(Diagnoser::new(metrics, profiles).with_service_map(config.service_map.clone()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = config::Config::load()?;
    let diagnoser = build_diagnoser(&cli, &config)?;

    // Execute command
    match &cli.command {
        Commands::Health => {
            health::show_health(&diagnoser, cli.format).await?;
        }
        Commands::Bottleneck { service, threshold } => {
            let cutoffs = config.cutoffs(threshold.as_deref())?;
            bottleneck::show_bottlenecks(&diagnoser, cutoffs, service.as_deref(), cli.format).await?;
        }
        Commands::Hotspots {
            file,
            top,
            unit,
            app_prefix,
            user_code,
            filter,
        } => {
            let app_prefix = app_prefix
                .clone()
                .or_else(|| config.app_prefix.clone())
                .unwrap_or_else(|| triage_lib::hotspot::DEFAULT_APP_PREFIX.to_string());
            let options = hotspots::HotspotOptions {
                top: *top,
                unit: *unit,
                app_prefix,
                user_code: *user_code,
                filter: filter.clone(),
            };
            hotspots::show_hotspots(file.as_deref(), &options, cli.format)?;
        }
        Commands::Triage {
            app,
            types,
            limit,
            from,
            until,
        } => {
            let kinds = ProfileKind::parse_list(types)?;
            triage::show_triage(&diagnoser, app, &kinds, *limit, *from, *until, cli.format).await?;
        }
        Commands::Diff {
            app,
            kind,
            baseline_from,
            baseline_until,
            from,
            until,
            limit,
        } => {
            let request = diff::DiffRequest {
                kind: *kind,
                baseline_from: *baseline_from,
                baseline_until: *baseline_until,
                from: *from,
                until: *until,
                limit: *limit,
            };
            diff::show_diff(&diagnoser, app, &request, cli.format).await?;
        }
        Commands::Fleet { kind, limit } => {
            fleet::show_fleet(&diagnoser, *kind, *limit, cli.format).await?;
        }
        Commands::Diagnose { section, service } => {
            let sections = Section::parse_list(section)?;
            diagnose::show_diagnosis(&diagnoser, &sections, service.as_deref(), cli.format).await?;
        }
    }

    Ok(())
}
