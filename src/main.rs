//! CLI entry point for the county COVID-19 map generator.
//!
//! Every subcommand builds the weekly per-capita dataset from the configured
//! inputs, then draws weekly maps, encodes the movie, or writes the rate table.

use anyhow::Result;
use clap::{Parser, Subcommand};
use covid_county_maps::{
    config::PipelineConfig,
    dataset::Dataset,
    output::{print_json, print_pretty, save_rate_table},
    render::{Ffmpeg, MovieRenderer, StaticMapRenderer, TextOptions, VideoEncoder},
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "covid_county_maps")]
#[command(about = "Weekly per-capita COVID-19 case maps for US counties", long_about = None)]
struct Cli {
    /// Population estimates CSV (overrides COVID_MAPS_POPULATION)
    #[arg(long, global = true)]
    population: Option<PathBuf>,

    /// County boundary GeoJSON (overrides COVID_MAPS_BOUNDARIES)
    #[arg(long, global = true)]
    boundaries: Option<PathBuf>,

    /// Cumulative case time series CSV (overrides COVID_MAPS_CASES)
    #[arg(long, global = true)]
    cases: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the dataset and optionally draw one map per week
    Maps {
        /// 1 to draw the weekly maps, 0 to only build the dataset
        #[arg(value_parser = clap::value_parser!(u8).range(0..=1))]
        render: u8,
    },
    /// Render the weekly maps as one movie
    Movie,
    /// Write the merged weekly rate table as CSV
    Table {
        /// Destination CSV (defaults to COVID_MAPS_TABLE)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/covid_county_maps.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("covid_county_maps.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let mut config = PipelineConfig::from_env()?;
    if let Some(path) = cli.population {
        config.population_path = path;
    }
    if let Some(path) = cli.boundaries {
        config.boundaries_path = path;
    }
    if let Some(path) = cli.cases {
        config.cases_path = path;
    }

    match cli.command {
        Commands::Maps { render } => {
            let dataset = build_dataset(&config)?;
            if render == 1 {
                let renderer = StaticMapRenderer::new(TextOptions::from(&config));
                let written = renderer.render_all(&dataset, &config.maps_dir)?;
                info!(maps = written.len(), dir = %config.maps_dir.display(), "Weekly maps rendered");
            } else {
                info!("Rendering disabled, dataset built only");
            }
        }
        Commands::Movie => {
            // probe the encoder before spending time on the dataset
            let encoder = Ffmpeg::default();
            encoder.check_available()?;
            let renderer = MovieRenderer::new(encoder, TextOptions::from(&config));
            let dataset = build_dataset(&config)?;
            renderer.render(&dataset, &config.movie_path)?;
        }
        Commands::Table { output } => {
            let dataset = build_dataset(&config)?;
            let path = output.unwrap_or_else(|| config.table_path.clone());
            save_rate_table(&path, &dataset)?;
        }
    }

    Ok(())
}

/// Loads all inputs and logs the join summary.
#[tracing::instrument(skip_all)]
fn build_dataset(config: &PipelineConfig) -> Result<Dataset> {
    let dataset = Dataset::load(config)?;
    print_pretty(&dataset.stats);
    print_json(&dataset.stats)?;
    Ok(dataset)
}
