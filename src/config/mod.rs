#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use toml_config::{EtlConfig, LayerFailurePolicy};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "geolayer-etl")]
#[command(about = "Geocode addresses and summarize overlay layer matches per postal code")]
pub struct CliConfig {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Newline-delimited address list
    #[arg(short, long)]
    pub input: Option<String>,

    /// Directory for results.json / results.csv
    #[arg(long)]
    pub output_path: Option<String>,

    /// What to do when a single layer query fails
    #[arg(long, value_enum)]
    pub on_layer_failure: Option<LayerFailurePolicy>,

    /// Number of addresses processed in parallel
    #[arg(long)]
    pub concurrency: Option<usize>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage after each phase")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 載入設定檔（若有）並套用命令列覆蓋
    pub fn resolve(&self) -> Result<EtlConfig> {
        let mut config = match &self.config {
            Some(path) => EtlConfig::from_file(path)?,
            None => EtlConfig::default(),
        };

        if let Some(input) = &self.input {
            config.input.path = input.clone();
        }
        if let Some(output_path) = &self.output_path {
            config.load.output_path = output_path.clone();
        }
        if let Some(policy) = self.on_layer_failure {
            config.feature_server.on_layer_failure = policy;
        }
        if let Some(concurrency) = self.concurrency {
            config.performance.concurrent_addresses = concurrency;
        }

        Ok(config)
    }
}
