use anyhow::Context;
use clap::Parser;
use geolayer_etl::domain::ports::{Geocoder, LayerQuery};
use geolayer_etl::utils::{logger, validation::Validate};
use geolayer_etl::{EtlConfig, FeatureServerClient, NominatimGeocoder, TracingObserver};
use std::sync::Arc;

/// 單筆地址查詢：地理編碼後列出命中的圖層，不寫任何輸出檔
#[derive(Parser)]
#[command(name = "probe-address")]
#[command(about = "Geocode one address and print its layer matches as JSON")]
struct Args {
    /// Address to look up
    address: String,

    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let config = match &args.config {
        Some(path) => EtlConfig::from_file(path)
            .with_context(|| format!("failed to load config file '{}'", path))?,
        None => EtlConfig::default(),
    };
    config.validate().context("invalid configuration")?;

    let geocoder = NominatimGeocoder::new(config.geocoder.clone())?;
    let layer_query = FeatureServerClient::new(config.feature_server.clone())?
        .with_observer(Arc::new(TracingObserver));

    let geocode = geocoder
        .geocode(&args.address)
        .await
        .with_context(|| format!("geocoding '{}'", args.address))?;
    tracing::info!(
        "📍 lat: {}, lon: {}, zip: {}",
        geocode.lat,
        geocode.lon,
        geocode.zip.as_deref().unwrap_or("<none>")
    );

    let result = layer_query
        .query_layers(&args.address, geocode.lat, geocode.lon, geocode.zip.as_deref())
        .await
        .context("querying feature server layers")?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
