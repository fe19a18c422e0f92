use crate::domain::model::{GeocodeResult, LayerQueryResult};
use crate::domain::ports::PipelineObserver;
use crate::utils::error::EtlError;

/// 以 tracing 輸出 pipeline 事件
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn addresses_loaded(&self, count: usize) {
        tracing::info!("📋 Loaded {} addresses", count);
    }

    fn address_started(&self, index: usize, address: &str) {
        tracing::info!("🔎 [{}] Geocoding address: {}", index + 1, address);
    }

    fn geocoded(&self, address: &str, geocode: &GeocodeResult) {
        tracing::debug!(
            "📍 {} -> lat: {}, lon: {}, zip: {}",
            address,
            geocode.lat,
            geocode.lon,
            geocode.zip.as_deref().unwrap_or("<none>")
        );
    }

    fn layer_failed(&self, layer: &str, error: &EtlError) {
        tracing::warn!("⚠️ Layer {} skipped: {}", layer, error);
    }

    fn layers_matched(&self, result: &LayerQueryResult) {
        if result.layers.is_empty() {
            tracing::info!("➖ {} matched no layers", result.address);
        } else {
            tracing::info!("✅ {} matched layers: {}", result.address, result.layers.join(", "));
        }
    }

    fn address_failed(&self, address: &str, error: &EtlError) {
        tracing::error!("❌ Error processing '{}': {}", address, error);
    }

    fn outputs_written(&self, paths: &[String]) {
        for path in paths {
            tracing::info!("💾 Wrote {}", path);
        }
    }
}
