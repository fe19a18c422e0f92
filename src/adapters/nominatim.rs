use crate::config::toml_config::GeocoderConfig;
use crate::domain::model::GeocodeResult;
use crate::domain::ports::Geocoder;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const SERVICE: &str = "nominatim";

/// Nominatim 以字串回傳座標，少數部署會回傳數字，兩者都接受
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Coordinate {
    Number(f64),
    Text(String),
}

impl Coordinate {
    pub fn to_f64(&self) -> Result<f64> {
        match self {
            Coordinate::Number(value) => Ok(*value),
            Coordinate::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|e| EtlError::upstream(SERVICE, format!("invalid coordinate '{}': {}", text, e))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchCandidate {
    pub lat: Coordinate,
    pub lon: Coordinate,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressDetail {
    #[serde(default)]
    pub postcode: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReversePlace {
    #[serde(default)]
    pub address: Option<AddressDetail>,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Nominatim 以 HTTP 200 回傳的錯誤訊息，例如 "Unable to geocode"
    #[serde(default)]
    pub error: Option<String>,
}

impl ReversePlace {
    pub fn postcode(&self) -> Option<String> {
        self.address.as_ref().and_then(|a| a.postcode.clone())
    }
}

/// 反向地理編碼回應：可能是單一物件，也可能是只含一個物件的陣列
///
/// `into_place` 將兩種形狀正規化成同一個 [`ReversePlace`]。空陣列、帶 `error` 的回應、
/// 或缺少 `address` 的物件都視為上游錯誤；只有 `address` 內缺少 `postcode` 時才得到 `zip = None`。
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ReverseResponse {
    Many(Vec<ReversePlace>),
    Single(ReversePlace),
}

impl ReverseResponse {
    pub fn into_place(self) -> Result<ReversePlace> {
        let place = match self {
            ReverseResponse::Single(place) => place,
            ReverseResponse::Many(places) => places
                .into_iter()
                .next()
                .ok_or_else(|| EtlError::upstream(SERVICE, "reverse lookup returned an empty list"))?,
        };

        if let Some(error) = &place.error {
            return Err(EtlError::upstream(
                SERVICE,
                format!("reverse lookup failed: {}", error),
            ));
        }
        if place.address.is_none() {
            return Err(EtlError::upstream(
                SERVICE,
                "reverse lookup response has no address detail",
            ));
        }

        Ok(place)
    }
}

/// 使用 OpenStreetMap Nominatim 的地理編碼器
pub struct NominatimGeocoder {
    config: GeocoderConfig,
    client: Client,
}

impl NominatimGeocoder {
    pub fn new(config: GeocoderConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| EtlError::upstream(SERVICE, e))?;

        Ok(Self { config, client })
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<T> {
        tracing::debug!("Making Nominatim request to: {}", endpoint);

        let response = self
            .client
            .get(endpoint)
            .query(query)
            .send()
            .await
            .map_err(|e| EtlError::upstream(SERVICE, e))?;

        let status = response.status();
        tracing::debug!("Nominatim response status: {}", status);
        if !status.is_success() {
            return Err(EtlError::upstream(SERVICE, format!("HTTP {}", status)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| EtlError::upstream(SERVICE, e))
    }

    /// 正向查詢，最多取一筆候選
    pub async fn search(&self, address: &str) -> Result<Option<SearchCandidate>> {
        let candidates: Vec<SearchCandidate> = self
            .get_json(
                &self.config.search_endpoint,
                &[
                    ("q", address.to_string()),
                    ("format", "json".to_string()),
                    ("limit", "1".to_string()),
                    ("email", self.config.contact_email.clone()),
                ],
            )
            .await?;

        Ok(candidates.into_iter().next())
    }

    pub async fn reverse(&self, lat: f64, lon: f64) -> Result<ReversePlace> {
        let response: ReverseResponse = self
            .get_json(
                &self.config.reverse_endpoint,
                &[
                    ("lat", lat.to_string()),
                    ("lon", lon.to_string()),
                    ("format", "json".to_string()),
                    ("zoom", self.config.zoom.to_string()),
                    ("addressdetails", "1".to_string()),
                ],
            )
            .await?;

        response.into_place()
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeocodeResult> {
        let candidate = self
            .search(address)
            .await?
            .ok_or_else(|| EtlError::AddressNotFound {
                address: address.to_string(),
            })?;

        let lat = candidate.lat.to_f64()?;
        let lon = candidate.lon.to_f64()?;
        tracing::debug!("Geocoded lat: {}, lon: {}", lat, lon);

        let place = self.reverse(lat, lon).await?;

        Ok(GeocodeResult {
            lat,
            lon,
            zip: place.postcode(),
        })
    }
}
