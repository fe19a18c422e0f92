use crate::core::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_REVERSE_ENDPOINT: &str = "https://nominatim.openstreetmap.org/reverse";
pub const DEFAULT_FEATURE_SERVER_ENDPOINT: &str = "https://gis.carb.arb.ca.gov/hosting/rest/services/Hosted/Priority_Populations_2023_Update/FeatureServer/query";
pub const DEFAULT_CONTACT_EMAIL: &str = "cameronpaczek@gmail.com";
pub const DEFAULT_USER_AGENT: &str = "GIS Search/1.0 (cameronpaczek@gmail.com)";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    pub input: InputConfig,
    pub geocoder: GeocoderConfig,
    pub feature_server: FeatureServerConfig,
    pub aggregate: AggregateConfig,
    pub load: LoadConfig,
    pub performance: PerformanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub path: String,
    pub skip_blank_lines: bool,
    pub trim_carriage_return: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: "addresses.txt".to_string(),
            skip_blank_lines: false,
            trim_carriage_return: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub search_endpoint: String,
    pub reverse_endpoint: String,
    pub contact_email: String,
    pub user_agent: String,
    pub zoom: u8,
    pub timeout_seconds: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            search_endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            reverse_endpoint: DEFAULT_REVERSE_ENDPOINT.to_string(),
            contact_email: DEFAULT_CONTACT_EMAIL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            zoom: 18,
            timeout_seconds: 30,
        }
    }
}

/// 圖層 (layerId, displayName)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDefinition {
    pub id: u32,
    pub name: String,
}

impl LayerDefinition {
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

/// 單一圖層查詢失敗時的處理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum LayerFailurePolicy {
    /// 任一圖層失敗即放棄整個地址
    #[default]
    Abort,
    /// 略過失敗的圖層，保留其他圖層結果
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureServerConfig {
    pub endpoint: String,
    pub timeout_seconds: u64,
    pub on_layer_failure: LayerFailurePolicy,
    pub layers: Vec<LayerDefinition>,
}

impl Default for FeatureServerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_FEATURE_SERVER_ENDPOINT.to_string(),
            timeout_seconds: 30,
            on_layer_failure: LayerFailurePolicy::Abort,
            layers: default_layers(),
        }
    }
}

pub fn default_layers() -> Vec<LayerDefinition> {
    vec![
        LayerDefinition::new(0, "Disadvantaged_Communities_TribalLands"),
        LayerDefinition::new(1, "Buffer_Low_income_Communities"),
        LayerDefinition::new(3, "Disadvantaged_Communities_CES4"),
        LayerDefinition::new(5, "Low_income_Communities"),
    ]
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZipNormalization {
    /// 原樣使用反查得到的郵遞區號
    #[default]
    Raw,
    /// ZIP+4 截成前五碼
    FiveDigit,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    pub zip_normalization: ZipNormalization,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub output_path: String,
    pub results_filename: String,
    pub summary_filename: String,
    pub archive: Option<ArchiveConfig>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            results_filename: "results.json".to_string(),
            summary_filename: "results.csv".to_string(),
            archive: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    pub enabled: bool,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub concurrent_addresses: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            concurrent_addresses: 1,
        }
    }
}

impl EtlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CONTACT_EMAIL})，未設定的變數保留原字串
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        use crate::utils::validation::{
            validate_no_unresolved_placeholder, validate_non_empty_string, validate_path,
            validate_positive_number, validate_url,
        };

        // 先擋下未展開的 ${VAR}，避免佔位字串被當成聯絡資訊送出
        for (field, value) in [
            ("input.path", &self.input.path),
            ("geocoder.search_endpoint", &self.geocoder.search_endpoint),
            ("geocoder.reverse_endpoint", &self.geocoder.reverse_endpoint),
            ("geocoder.user_agent", &self.geocoder.user_agent),
            ("geocoder.contact_email", &self.geocoder.contact_email),
            ("feature_server.endpoint", &self.feature_server.endpoint),
            ("load.output_path", &self.load.output_path),
        ] {
            validate_no_unresolved_placeholder(field, value)?;
        }

        validate_path("input.path", &self.input.path)?;

        validate_url("geocoder.search_endpoint", &self.geocoder.search_endpoint)?;
        validate_url("geocoder.reverse_endpoint", &self.geocoder.reverse_endpoint)?;
        validate_non_empty_string("geocoder.user_agent", &self.geocoder.user_agent)?;
        validate_non_empty_string("geocoder.contact_email", &self.geocoder.contact_email)?;
        validate_positive_number(
            "geocoder.timeout_seconds",
            self.geocoder.timeout_seconds as usize,
            1,
        )?;

        validate_url("feature_server.endpoint", &self.feature_server.endpoint)?;
        validate_positive_number(
            "feature_server.timeout_seconds",
            self.feature_server.timeout_seconds as usize,
            1,
        )?;
        self.validate_layers()?;

        validate_path("load.output_path", &self.load.output_path)?;
        validate_path("load.results_filename", &self.load.results_filename)?;
        validate_path("load.summary_filename", &self.load.summary_filename)?;
        if let Some(archive) = self.load.archive.as_ref().filter(|a| a.enabled) {
            validate_path("load.archive.filename", &archive.filename)?;
        }

        validate_positive_number(
            "performance.concurrent_addresses",
            self.performance.concurrent_addresses,
            1,
        )?;

        Ok(())
    }

    fn validate_layers(&self) -> Result<()> {
        let layers = &self.feature_server.layers;
        if layers.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "feature_server.layers".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for layer in layers {
            crate::utils::validation::validate_non_empty_string(
                "feature_server.layers.name",
                &layer.name,
            )?;
            if !seen.insert(layer.id) {
                return Err(EtlError::InvalidConfigValueError {
                    field: "feature_server.layers.id".to_string(),
                    value: layer.id.to_string(),
                    reason: "Duplicate layer id".to_string(),
                });
            }
        }
        Ok(())
    }

    /// 是否輸出 ZIP 壓縮檔
    pub fn archive(&self) -> Option<&ArchiveConfig> {
        self.load.archive.as_ref().filter(|a| a.enabled)
    }
}

impl ConfigProvider for EtlConfig {
    fn input_path(&self) -> &str {
        &self.input.path
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn results_filename(&self) -> &str {
        &self.load.results_filename
    }

    fn summary_filename(&self) -> &str {
        &self.load.summary_filename
    }

    fn concurrent_addresses(&self) -> usize {
        self.performance.concurrent_addresses
    }
}

impl Validate for EtlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_toml_matches_reference_defaults() {
        let config = EtlConfig::from_toml_str("").unwrap();

        assert_eq!(config.input.path, "addresses.txt");
        assert_eq!(config.geocoder.search_endpoint, DEFAULT_SEARCH_ENDPOINT);
        assert_eq!(config.feature_server.endpoint, DEFAULT_FEATURE_SERVER_ENDPOINT);
        assert_eq!(config.feature_server.layers, default_layers());
        assert_eq!(
            config.feature_server.on_layer_failure,
            LayerFailurePolicy::Abort
        );
        assert_eq!(config.aggregate.zip_normalization, ZipNormalization::Raw);
        assert_eq!(config.results_filename(), "results.json");
        assert_eq!(config.summary_filename(), "results.csv");
        assert_eq!(config.concurrent_addresses(), 1);
        assert!(config.archive().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_custom_layers_and_policies() {
        let toml_content = r#"
[input]
path = "data/addresses.txt"
skip_blank_lines = true

[feature_server]
endpoint = "https://gis.example.com/FeatureServer/query"
on_layer_failure = "skip"

[[feature_server.layers]]
id = 6
name = "Buffer_Low_income_Household"

[[feature_server.layers]]
id = 7
name = "Low_income_Household"

[aggregate]
zip_normalization = "five_digit"

[load]
output_path = "./out"

[load.archive]
enabled = true
filename = "bundle.zip"
"#;

        let config = EtlConfig::from_toml_str(toml_content).unwrap();

        assert!(config.input.skip_blank_lines);
        assert_eq!(config.feature_server.layers.len(), 2);
        assert_eq!(config.feature_server.layers[1], LayerDefinition::new(7, "Low_income_Household"));
        assert_eq!(config.feature_server.on_layer_failure, LayerFailurePolicy::Skip);
        assert_eq!(config.aggregate.zip_normalization, ZipNormalization::FiveDigit);
        assert_eq!(config.output_path(), "./out");
        assert_eq!(config.archive().unwrap().filename, "bundle.zip");
        // 未設定的欄位沿用預設
        assert_eq!(config.geocoder.zoom, 18);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("GEOLAYER_TEST_EMAIL", "ops@example.com");

        let toml_content = r#"
[geocoder]
contact_email = "${GEOLAYER_TEST_EMAIL}"
user_agent = "Test/1.0 (${GEOLAYER_TEST_UNSET_VAR})"
"#;

        let config = EtlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.geocoder.contact_email, "ops@example.com");
        assert_eq!(
            config.geocoder.user_agent,
            "Test/1.0 (${GEOLAYER_TEST_UNSET_VAR})"
        );

        std::env::remove_var("GEOLAYER_TEST_EMAIL");
    }

    #[test]
    fn test_config_validation_rejects_bad_values() {
        let bad_url = EtlConfig::from_toml_str(
            r#"
[feature_server]
endpoint = "invalid-url"
"#,
        )
        .unwrap();
        assert!(bad_url.validate().is_err());

        let duplicate_layers = EtlConfig::from_toml_str(
            r#"
[[feature_server.layers]]
id = 1
name = "A"

[[feature_server.layers]]
id = 1
name = "B"
"#,
        )
        .unwrap();
        assert!(matches!(
            duplicate_layers.validate(),
            Err(EtlError::InvalidConfigValueError { .. })
        ));

        let mut no_layers = EtlConfig::default();
        no_layers.feature_server.layers.clear();
        assert!(matches!(
            no_layers.validate(),
            Err(EtlError::MissingConfigError { .. })
        ));

        let mut zero_concurrency = EtlConfig::default();
        zero_concurrency.performance.concurrent_addresses = 0;
        assert!(zero_concurrency.validate().is_err());
    }

    #[test]
    fn test_unresolved_placeholder_fails_validation() {
        let config = EtlConfig::from_toml_str(
            r#"
[geocoder]
contact_email = "${GEOLAYER_TEST_NEVER_SET_EMAIL}"
user_agent = "GIS Search/1.0 (${GEOLAYER_TEST_NEVER_SET_EMAIL})"
"#,
        )
        .unwrap();

        assert_eq!(config.geocoder.contact_email, "${GEOLAYER_TEST_NEVER_SET_EMAIL}");
        match config.validate() {
            Err(EtlError::InvalidConfigValueError { field, .. }) => {
                assert_eq!(field, "geocoder.user_agent");
            }
            other => panic!("expected unresolved placeholder error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = EtlConfig::from_toml_str("[feature_server\nendpoint = 1").unwrap_err();
        assert!(matches!(err, EtlError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let example = include_str!("../../geolayer.example.toml")
            .replace("${GEOCODER_CONTACT_EMAIL}", "ops@example.com");
        let config = EtlConfig::from_toml_str(&example).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.feature_server.layers, default_layers());
        assert!(config.archive().is_none());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[input]\npath = \"from-file.txt\"\n")
            .unwrap();

        let config = EtlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.input_path(), "from-file.txt");
    }
}
