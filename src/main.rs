use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vigil::{pipeline, MonitorConfig, TimeSemantics};

#[derive(Parser)]
#[command(name = "vigil", about = "Check vehicle telemetry logs against STL safety properties", version)]
struct Cli {
    /// Telemetry CSV log with a `time` column [default: discrete_stl_data.csv]
    input: Option<PathBuf>,

    /// JSON file the results are appended to [default: stl_result/stl_results.json]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Time semantics of the evaluation
    #[arg(short, long, value_enum)]
    mode: Option<TimeSemantics>,

    /// Identifier written into every result record
    #[arg(long)]
    vehicle_id: Option<u64>,

    /// Seconds a signal may spend outside its envelope before the envelope property fails
    #[arg(short, long)]
    window: Option<f64>,

    /// Discard previously stored results instead of appending to them
    #[arg(long)]
    fresh: bool,
}

impl Cli {
    fn into_config(self) -> Result<MonitorConfig> {
        let mut config = match &self.config {
            Some(path) => MonitorConfig::from_file(path)
                .with_context(|| format!("could not load configuration from {}", path.display()))?,
            None => MonitorConfig::default(),
        };

        config.input = self.input.or(config.input);
        config.output = self.output.or(config.output);
        config.mode = self.mode.or(config.mode);
        config.vehicle_id = self.vehicle_id.or(config.vehicle_id);
        config.window_time = self.window.or(config.window_time);

        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let fresh = cli.fresh;
    let mut config = cli.into_config()?.resolve().context("invalid configuration")?;
    config.fresh = fresh;

    let mut report = pipeline::run(&config);

    if let Some(err) = report.persist_error.take() {
        return Err(err).with_context(|| format!("could not save results to {}", config.output.display()));
    }

    if report.has_data() {
        info!(
            records = report.records.len(),
            failures = report.failures.len(),
            stored = report.stored.unwrap_or_default(),
            "run complete"
        );
    }

    Ok(())
}
