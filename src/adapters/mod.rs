// Adapters layer: concrete implementations for external systems (geocoder, feature server, logging).

pub mod feature_server;
pub mod nominatim;
pub mod observer;

pub use feature_server::FeatureServerClient;
pub use nominatim::NominatimGeocoder;
pub use observer::TracingObserver;
