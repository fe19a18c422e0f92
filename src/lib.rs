pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::LocalStorage, CliConfig};

pub use adapters::{FeatureServerClient, NominatimGeocoder, TracingObserver};
pub use config::toml_config::EtlConfig;
pub use core::{etl::EtlEngine, pipeline::GeoLayerPipeline};
pub use utils::error::{EtlError, Result};
