use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 地理編碼結果：座標與反查所得的郵遞區號
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub lat: f64,
    pub lon: f64,
    pub zip: Option<String>,
}

/// 單一地址的圖層查詢結果
///
/// `layers` 依設定的圖層順序排列；同一圖層若有多個子圖層回傳 feature，會重複出現。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerQueryResult {
    pub address: String,
    pub zip: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub layers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedAddress {
    pub address: String,
    pub error: String,
}

/// 每筆地址的處理結果，成功與失敗都會寫入 JSON 輸出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddressOutcome {
    Failed(FailedAddress),
    Matched(LayerQueryResult),
}

impl AddressOutcome {
    pub fn address(&self) -> &str {
        match self {
            AddressOutcome::Matched(result) => &result.address,
            AddressOutcome::Failed(failed) => &failed.address,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AddressOutcome::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZipAggregate {
    pub layers: u64,
    pub no_layers: u64,
}

/// 郵遞區號彙總，保留首次出現的順序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZipSummary {
    order: Vec<Option<String>>,
    buckets: HashMap<Option<String>, ZipAggregate>,
}

impl ZipSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket_mut(&mut self, zip: Option<String>) -> &mut ZipAggregate {
        if !self.buckets.contains_key(&zip) {
            self.order.push(zip.clone());
        }
        self.buckets.entry(zip).or_default()
    }

    pub fn get(&self, zip: Option<&str>) -> Option<&ZipAggregate> {
        self.buckets.get(&zip.map(str::to_string))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, &ZipAggregate)> {
        self.order
            .iter()
            .filter_map(|zip| self.buckets.get(zip).map(|agg| (zip.as_deref(), agg)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// 與插入順序無關的比較用
    pub fn as_map(&self) -> &HashMap<Option<String>, ZipAggregate> {
        &self.buckets
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub results: Vec<AddressOutcome>,
    pub summary: ZipSummary,
}

impl TransformResult {
    pub fn matched_count(&self) -> usize {
        self.results.iter().filter(|r| !r.is_error()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_error()).count()
    }
}
