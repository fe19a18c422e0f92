use crate::config::toml_config::{FeatureServerConfig, LayerDefinition, LayerFailurePolicy};
use crate::domain::model::LayerQueryResult;
use crate::domain::ports::{LayerQuery, PipelineObserver};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use std::time::Duration;

const SERVICE: &str = "feature_server";
/// WGS84
const SPATIAL_REFERENCE: &str = "4326";

/// 欄位缺少或為 `null` 時都視為空陣列
fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubLayerBlock {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub features: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// FeatureServer `/query` 回應；`layers` 可能不存在、為 `null` 或為空
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureServerResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub layers: Vec<SubLayerBlock>,
    #[serde(default)]
    pub error: Option<ServerErrorBody>,
}

impl FeatureServerResponse {
    /// 有 feature 的子圖層數量，每個都會記錄一次圖層名稱
    pub fn matching_blocks(&self) -> usize {
        self.layers.iter().filter(|b| !b.features.is_empty()).count()
    }
}

/// ArcGIS FeatureServer 空間相交查詢客戶端
pub struct FeatureServerClient {
    config: FeatureServerConfig,
    client: Client,
    observer: Option<Arc<dyn PipelineObserver>>,
}

impl FeatureServerClient {
    pub fn new(config: FeatureServerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| EtlError::upstream(SERVICE, e))?;

        Ok(Self {
            config,
            client,
            observer: None,
        })
    }

    /// 在 skip 模式下回報失敗的圖層
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn layers(&self) -> &[LayerDefinition] {
        &self.config.layers
    }

    pub async fn query_layer(
        &self,
        layer: &LayerDefinition,
        lat: f64,
        lon: f64,
    ) -> Result<FeatureServerResponse> {
        let layer_defs = format!(r#"{{"{}":"1=1"}}"#, layer.id);

        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("f", "json".to_string()),
                ("geometry", format!("{},{}", lon, lat)),
                ("geometryType", "esriGeometryPoint".to_string()),
                ("inSR", SPATIAL_REFERENCE.to_string()),
                ("spatialRel", "esriSpatialRelIntersects".to_string()),
                ("outFields", "*".to_string()),
                ("returnGeometry", "false".to_string()),
                ("outSR", SPATIAL_REFERENCE.to_string()),
                ("where", "1=1".to_string()),
                ("layerDefs", layer_defs),
            ])
            .send()
            .await
            .map_err(|e| EtlError::upstream(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::upstream(
                SERVICE,
                format!("layer {} ({}): HTTP {}", layer.id, layer.name, status),
            ));
        }

        let body: FeatureServerResponse = response
            .json()
            .await
            .map_err(|e| EtlError::upstream(SERVICE, e))?;

        // ArcGIS 會以 200 回傳錯誤內容
        if let Some(error) = &body.error {
            return Err(EtlError::upstream(
                SERVICE,
                format!(
                    "layer {} ({}): code {} {}",
                    layer.id,
                    layer.name,
                    error.code.unwrap_or_default(),
                    error.message.as_deref().unwrap_or("unknown error")
                ),
            ));
        }

        Ok(body)
    }
}

#[async_trait]
impl LayerQuery for FeatureServerClient {
    async fn query_layers(
        &self,
        address: &str,
        lat: f64,
        lon: f64,
        zip: Option<&str>,
    ) -> Result<LayerQueryResult> {
        tracing::debug!("Querying {} layers at lat: {}, lon: {}", self.config.layers.len(), lat, lon);

        let responses = join_all(
            self.config
                .layers
                .iter()
                .map(|layer| self.query_layer(layer, lat, lon)),
        )
        .await;

        let mut result = LayerQueryResult {
            address: address.to_string(),
            zip: zip.map(str::to_string),
            lat,
            lon,
            layers: Vec::new(),
        };

        for (layer, response) in self.config.layers.iter().zip(responses) {
            let response = match response {
                Ok(response) => response,
                Err(e) => match self.config.on_layer_failure {
                    LayerFailurePolicy::Abort => return Err(e),
                    LayerFailurePolicy::Skip => {
                        if let Some(observer) = &self.observer {
                            observer.layer_failed(&layer.name, &e);
                        }
                        continue;
                    }
                },
            };

            // 不去重：每個有 feature 的子圖層各記一次
            for _ in 0..response.matching_blocks() {
                result.layers.push(layer.name.clone());
            }
        }

        Ok(result)
    }
}
