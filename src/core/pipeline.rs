use crate::adapters::TracingObserver;
use crate::config::toml_config::{EtlConfig, InputConfig};
use crate::core::aggregate::aggregate_with;
use crate::core::output::{build_archive, render_results_json, render_summary_csv};
use crate::core::{ConfigProvider, Pipeline, Storage, TransformResult};
use crate::domain::model::{AddressOutcome, FailedAddress, LayerQueryResult};
use crate::domain::ports::{Geocoder, LayerQuery, PipelineObserver};
use crate::utils::error::{EtlError, Result};
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;

/// 將輸入文字切成地址列表
///
/// 每行一筆；空行預設保留（會在地理編碼時失敗並被記錄）。
pub fn parse_addresses(text: &str, input: &InputConfig) -> Vec<String> {
    text.split('\n')
        .map(|line| {
            if input.trim_carriage_return {
                line.strip_suffix('\r').unwrap_or(line)
            } else {
                line
            }
        })
        .filter(|line| !input.skip_blank_lines || !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// 地址 → 地理編碼 → 圖層查詢 → 郵遞區號彙總
pub struct GeoLayerPipeline<S: Storage, G: Geocoder, L: LayerQuery> {
    source: S,
    sink: S,
    geocoder: G,
    layer_query: L,
    config: EtlConfig,
    observer: Arc<dyn PipelineObserver>,
}

impl<S: Storage, G: Geocoder, L: LayerQuery> GeoLayerPipeline<S, G, L> {
    pub fn new(source: S, sink: S, geocoder: G, layer_query: L, config: EtlConfig) -> Self {
        Self {
            source,
            sink,
            geocoder,
            layer_query,
            config,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// 處理單一地址；錯誤在此攔截並轉成失敗項目，不影響後續地址
    pub async fn process_address(&self, index: usize, address: String) -> AddressOutcome {
        self.observer.address_started(index, &address);

        match self.lookup(&address).await {
            Ok(outcome) => {
                self.observer.layers_matched(&outcome);
                AddressOutcome::Matched(outcome)
            }
            Err(e) => {
                self.observer.address_failed(&address, &e);
                AddressOutcome::Failed(FailedAddress {
                    error: e.to_string(),
                    address,
                })
            }
        }
    }

    async fn lookup(&self, address: &str) -> Result<LayerQueryResult> {
        let geocode = self.geocoder.geocode(address).await?;
        self.observer.geocoded(address, &geocode);

        self.layer_query
            .query_layers(address, geocode.lat, geocode.lon, geocode.zip.as_deref())
            .await
    }
}

#[async_trait::async_trait]
impl<S: Storage, G: Geocoder, L: LayerQuery> Pipeline for GeoLayerPipeline<S, G, L> {
    async fn extract(&self) -> Result<Vec<String>> {
        let path = self.config.input_path();
        tracing::debug!("Reading addresses from: {}", path);

        let bytes = self.source.read_file(path).await?;
        let text = String::from_utf8(bytes).map_err(|e| EtlError::ConfigError {
            message: format!("input file '{}' is not valid UTF-8: {}", path, e),
        })?;

        let addresses = parse_addresses(&text, &self.config.input);
        self.observer.addresses_loaded(addresses.len());
        Ok(addresses)
    }

    async fn transform(&self, addresses: Vec<String>) -> Result<TransformResult> {
        let concurrency = self.config.concurrent_addresses().max(1);

        // buffered 保持輸入順序；concurrency = 1 時逐筆處理
        let results: Vec<AddressOutcome> = stream::iter(addresses.into_iter().enumerate())
            .map(|(index, address)| self.process_address(index, address))
            .buffered(concurrency)
            .collect()
            .await;

        let summary = aggregate_with(&results, self.config.aggregate.zip_normalization);

        Ok(TransformResult { results, summary })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let json = render_results_json(&result.results)?;
        let csv = render_summary_csv(&result.summary)?;

        let results_name = self.config.results_filename();
        let summary_name = self.config.summary_filename();

        self.sink.write_file(results_name, json.as_bytes()).await?;
        self.sink.write_file(summary_name, csv.as_bytes()).await?;

        let output_dir = self.config.output_path();
        let mut written = vec![
            format!("{}/{}", output_dir, results_name),
            format!("{}/{}", output_dir, summary_name),
        ];

        if let Some(archive) = self.config.archive() {
            let data = build_archive(&[
                (results_name, json.as_bytes()),
                (summary_name, csv.as_bytes()),
            ])?;
            self.sink.write_file(&archive.filename, &data).await?;
            written.push(format!("{}/{}", output_dir, archive.filename));
        }

        self.observer.outputs_written(&written);
        Ok(output_dir.to_string())
    }
}
