pub mod airports;
pub mod route_lookup;
pub mod tracking_site;

use crate::enrichment::airports::AirportDirectory;
use crate::http::{HttpClient, HttpError};

use thiserror::Error;

pub const DEFAULT_ROUTE_LOOKUP_URL: &str = "https://api.adsbdb.com";
pub const DEFAULT_TRACKING_SITE_URL: &str = "https://www.flightaware.com";

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("Unexpected response: {0}")]
    Parse(String),

    #[error("{0}")]
    Missing(&'static str),
}

#[derive(Debug, PartialEq, Clone, serde::Serialize)]
pub struct AirportSummary {
    pub code: String,
    pub location: String,
}

impl AirportSummary {
    #[must_use]
    pub fn new(code: &str, location: &str) -> Self {
        AirportSummary {
            code: code.to_string(),
            location: location.to_string(),
        }
    }
}

#[derive(Debug, PartialEq, Clone, serde::Serialize)]
pub struct RouteInfo {
    pub from: AirportSummary,
    pub to: AirportSummary,
}

#[derive(Debug, PartialEq, Clone, serde::Serialize)]
pub struct TrackingInfo {
    #[serde(rename = "useCache")]
    pub use_cache: bool,
    pub blocked: bool,
    #[serde(rename = "planeImage", skip_serializing_if = "Option::is_none")]
    pub plane_image: Option<String>,
    pub from: AirportSummary,
    pub to: AirportSummary,
}

/// Outcome of one provider lookup. Either provider data or an error, never both.
#[derive(Debug, PartialEq, Clone, serde::Serialize)]
#[serde(untagged)]
pub enum EnrichmentResult {
    Route(RouteInfo),
    Tracking(TrackingInfo),
    Error { error: String },
}

impl EnrichmentResult {
    pub fn error(reason: impl Into<String>) -> Self {
        EnrichmentResult::Error {
            error: reason.into(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, EnrichmentResult::Error { .. })
    }
}

/// An external source of route or flight metadata.
///
/// `check` must not fail: any problem is reported as [`EnrichmentResult::Error`].
pub trait EnrichmentService: Send {
    fn name(&self) -> &'static str;

    fn init(&mut self) {}

    fn check(&mut self, identity: &str, secondary_identity: &str) -> EnrichmentResult;
}

/// Shared dependencies handed to every provider constructor.
#[derive(Clone)]
pub struct ServiceContext {
    pub http: std::sync::Arc<dyn HttpClient>,
    pub airports: std::sync::Arc<AirportDirectory>,
    pub route_lookup_url: String,
    pub tracking_site_url: String,
    /// Providers that persist state put their files here. `None` keeps them in memory.
    pub cache_dir: Option<std::path::PathBuf>,
}

type ServiceConstructor = fn(&ServiceContext) -> Box<dyn EnrichmentService>;

fn route_lookup_service(context: &ServiceContext) -> Box<dyn EnrichmentService> {
    Box::new(route_lookup::RouteLookupService::new(
        context.http.clone(),
        context.airports.clone(),
        &context.route_lookup_url,
    ))
}

fn tracking_site_service(context: &ServiceContext) -> Box<dyn EnrichmentService> {
    let service =
        tracking_site::TrackingSiteService::new(context.http.clone(), &context.tracking_site_url);
    match &context.cache_dir {
        Some(dir) => Box::new(service.with_cache_file(dir.join(tracking_site::CACHE_FILE_NAME))),
        None => Box::new(service),
    }
}

const REGISTRY: [(&str, ServiceConstructor); 2] = [
    (route_lookup::NAME, route_lookup_service),
    (tracking_site::NAME, tracking_site_service),
];

#[must_use]
pub fn known_services() -> Vec<&'static str> {
    REGISTRY.iter().map(|(name, _)| *name).collect()
}

/// Builds and initializes the providers named in a comma separated list, in order.
///
/// Unknown names are logged and skipped.
#[must_use]
pub fn build_services(enabled: &str, context: &ServiceContext) -> Vec<Box<dyn EnrichmentService>> {
    let mut services = Vec::new();
    for requested in enabled.split(',') {
        let requested = requested.trim();
        if requested.is_empty() {
            continue;
        }

        let Some((_, constructor)) = REGISTRY
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(requested))
        else {
            log::warn!(
                "Unknown enrichment service '{requested}', expected one of {:?}",
                known_services()
            );
            continue;
        };

        let mut service = constructor(context);
        service.init();
        log::info!("Enrichment service enabled: {}", service.name());
        services.push(service);
    }
    services
}

#[cfg(test)]
mod tests {
    use super::airports::AirportDirectory;
    use super::{build_services, EnrichmentResult, ServiceContext};
    use crate::http::testing::ScriptedHttpClient;

    fn context() -> ServiceContext {
        ServiceContext {
            http: std::sync::Arc::new(ScriptedHttpClient::new()),
            airports: std::sync::Arc::new(AirportDirectory::default()),
            route_lookup_url: String::from("http://adsbdb.test"),
            tracking_site_url: String::from("http://flightaware.test"),
            cache_dir: None,
        }
    }

    #[test]
    fn when_building_from_list_then_services_keep_configured_order() {
        let services = build_services(" FlightAware , adsbdb", &context());
        let names: Vec<&str> = services.iter().map(|service| service.name()).collect();
        assert_eq!(names, vec!["flightAware", "adsbdb"]);
    }

    #[test]
    fn when_list_has_unknown_or_blank_names_then_they_are_skipped() {
        let services = build_services("adsbdb,,radarbox,", &context());
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].name(), "adsbdb");
    }

    #[test]
    fn when_list_is_empty_then_no_services_are_built() {
        assert!(build_services("", &context()).is_empty());
    }

    #[test]
    fn when_error_result_serialized_then_only_error_key_is_present() {
        let value = serde_json::to_value(EnrichmentResult::error("lookup failed"))
            .expect("serializable");
        assert_eq!(value, serde_json::json!({"error": "lookup failed"}));
    }
}
