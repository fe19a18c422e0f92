use crate::domain::model::{GeocodeResult, LayerQueryResult, TransformResult};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn results_filename(&self) -> &str;
    fn summary_filename(&self) -> &str;
    fn concurrent_addresses(&self) -> usize;
}

/// 地址 → 座標 + 郵遞區號
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// 找不到候選時回傳 `AddressNotFound`，任何 HTTP 失敗回傳 `UpstreamError`
    async fn geocode(&self, address: &str) -> Result<GeocodeResult>;
}

/// 以座標查詢每個設定圖層是否有相交的 feature
#[async_trait]
pub trait LayerQuery: Send + Sync {
    async fn query_layers(
        &self,
        address: &str,
        lat: f64,
        lon: f64,
        zip: Option<&str>,
    ) -> Result<LayerQueryResult>;
}

/// Pipeline 事件回報介面，取代散落各處的 console 輸出
///
/// 所有方法都有空的預設實作，只需覆寫關心的事件。
pub trait PipelineObserver: Send + Sync {
    fn addresses_loaded(&self, _count: usize) {}
    fn address_started(&self, _index: usize, _address: &str) {}
    fn geocoded(&self, _address: &str, _geocode: &GeocodeResult) {}
    fn layer_failed(&self, _layer: &str, _error: &EtlError) {}
    fn layers_matched(&self, _result: &LayerQueryResult) {}
    fn address_failed(&self, _address: &str, _error: &EtlError) {}
    fn outputs_written(&self, _paths: &[String]) {}
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<String>>;
    async fn transform(&self, addresses: Vec<String>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
