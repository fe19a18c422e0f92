use clap::Parser;
use geolayer_etl::utils::error::ErrorSeverity;
use geolayer_etl::utils::{logger, validation::Validate};
use geolayer_etl::{
    CliConfig, EtlEngine, FeatureServerClient, GeoLayerPipeline, LocalStorage, NominatimGeocoder,
    TracingObserver,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting geolayer-etl CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證配置
    let config = match cli.resolve().and_then(|config| config.validate().map(|_| config)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let observer = Arc::new(TracingObserver);
    let geocoder = NominatimGeocoder::new(config.geocoder.clone())?;
    let layer_query =
        FeatureServerClient::new(config.feature_server.clone())?.with_observer(observer.clone());

    // input.path 依目前工作目錄解析，輸出寫到 output_path
    let source = LocalStorage::current_dir();
    let sink = LocalStorage::new(config.load.output_path.clone());
    let pipeline = GeoLayerPipeline::new(source, sink, geocoder, layer_query, config)
        .with_observer(observer);

    let engine = EtlEngine::new_with_monitoring(pipeline, cli.monitor);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ ETL process completed successfully!");
            println!("✅ ETL process completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
